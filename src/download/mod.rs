//! Result downloads.
//!
//! Once a job has completed, its [`DownloadTarget`](crate::resolve::DownloadTarget)
//! can be fetched at any time, independently of the controller that
//! produced it.
//!
//! # Features
//!
//! - Streaming downloads into a `.part` staging file, renamed on success
//! - `Content-Disposition` filename takes precedence over the derived name
//! - Duplicate filename handling (adds numeric suffix)
//! - Cancellation through a `CancellationToken`
//!
//! # Example
//!
//! ```no_run
//! use converter_core::download::DownloadExecutor;
//! use converter_core::http_client::HttpTimeouts;
//! use converter_core::resolve::resolve_download_target;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let payload = serde_json::json!({"converted_file": "/media/converted_files/42_report.pdf"});
//! let target = resolve_download_target(&payload, "http://127.0.0.1:8000", ".jpg")?;
//! let executor = DownloadExecutor::new("./converted", HttpTimeouts::default())?;
//! let saved = executor.download(&target, None).await?;
//! println!("Downloaded: {}", saved.path.display());
//! # Ok(())
//! # }
//! ```

mod error;
mod executor;
mod filename;

pub use error::DownloadError;
pub use executor::{DownloadExecutor, SavedDownload};
