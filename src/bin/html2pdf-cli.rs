use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "html2pdf-cli")]
#[command(about = "Client for the HTML to PDF conversion service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4000")]
    url: String,

    /// Path prefix the service serves stored files under
    #[arg(long, default_value = "/uploads")]
    prefix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an HTML file and convert it
    Convert {
        /// HTML document to upload
        file: PathBuf,

        /// Download the generated PDF to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check service liveness
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Convert { file, output } => {
            let body = tokio::fs::read(&file).await?;
            let part = Part::bytes(body)
                .file_name(file_name_of(&file))
                .mime_str("text/html")?;
            let form = Form::new().part("file", part);

            let res = client.post(format!("{}/upload", base)).multipart(form).send().await?;
            let Some(json) = print_response(res).await? else {
                return Ok(());
            };

            if let (Some(output), Some(pdf_file)) = (output, json["data"]["pdfFile"].as_str()) {
                let prefix = cli.prefix.trim_matches('/');
                let pdf = client
                    .get(format!("{}/{}/{}", base, prefix, file_name_of(Path::new(pdf_file))))
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                tokio::fs::write(&output, &pdf).await?;
                eprintln!("Saved {} bytes to {}", pdf.len(), output.display());
            }
        }
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.html".to_string())
}

async fn print_response(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(None);
    }

    let json: Value = serde_json::from_str(&text)?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(Some(json))
}
