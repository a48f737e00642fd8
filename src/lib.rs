//! Converter Core Library
//!
//! Client side of a document-conversion service: validates local files
//! against a conversion kind, uploads them, follows the conversion to a
//! result (synchronously or by polling), and downloads the converted file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`kind`] - Conversion kinds and their constraint profiles
//! - [`validate`] - File-set validation against a profile
//! - [`upload`] - Multipart upload and status transport with cancellation
//! - [`resolve`] - Result normalization and download target derivation
//! - [`job`] - Job controller: lifecycle, polling, timeout, events
//! - [`download`] - Streaming result downloads
//! - [`config`] - Client configuration and the defaults file

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod http_client;
pub mod job;
pub mod kind;
pub mod resolve;
#[cfg(test)]
pub mod test_support;
pub mod upload;
pub(crate) mod user_agent;
pub mod validate;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, FileConfig};
pub use download::{DownloadError, DownloadExecutor, SavedDownload};
pub use http_client::{ClientBuildError, HttpTimeouts};
pub use job::{
    CancelReason, ErrorKind, Job, JobController, JobError, JobEvent, JobHandle, JobState,
    SubmitError,
};
pub use kind::{ConstraintProfile, ConversionKind, HtmlMode, ImageFormat};
pub use resolve::{ConversionResult, DownloadTarget, ResolveError, resolve_download_target};
pub use upload::{ConversionTransport, CsrfSource, HttpTransport, RawResponse, TransportError};
pub use validate::{FileSet, Rejection, SelectedFile, validate};
