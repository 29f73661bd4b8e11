//! HTML to PDF conversion service.
//!
//! Accepts an HTML upload over HTTP, renders it with headless Chromium and
//! stores the PDF next to the uploads, where it is served back as a static file.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod storage;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
