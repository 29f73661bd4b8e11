//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, request span)
//!     → upload.rs (POST /upload: store → render → respond → clean up)
//!       or ServeDir (GET /uploads/{name})
//!     → response.rs (JSON envelope, error → status mapping)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upload;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use response::{ApiError, ApiResponse};
pub use server::{AppState, HttpServer};
