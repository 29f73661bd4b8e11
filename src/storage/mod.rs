//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! multipart upload
//!     → names.rs (sanitize, timestamp)
//!     → store.rs (create-new write into the flat directory)
//!     → StoredUpload guard (deleted on drop unless kept)
//!
//! failed conversion with retention on:
//!     → reaper.rs registry
//!
//! reaper.rs (start + every interval):
//!     → scan directory → delete `{millis}-…` inputs older than max age
//! ```
//!
//! # Design Decisions
//! - One flat directory for inputs and outputs
//! - Names never reuse an existing file; same-millisecond collisions get a counter
//! - Client-supplied names are reduced to `[A-Za-z0-9._-]`

pub mod names;
pub mod reaper;
pub mod store;

pub use names::{Clock, FixedClock, SystemClock};
pub use reaper::{Reaper, RetainedInputs};
pub use store::{ConversionResult, StorageError, StoredUpload, UploadStore};
