//! Fetches a resolved download target and saves it to disk.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use url::Url;

use super::error::DownloadError;
use super::filename::{
    parse_content_disposition, resolve_unique_path, sanitize_filename, staging_filename,
};
use crate::http_client::{ClientBuildError, HttpTimeouts, build_http_client};
use crate::resolve::DownloadTarget;

/// Staging names tried before giving up on a crowded directory.
const MAX_STAGING_ATTEMPTS: u32 = 1000;

/// A saved result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDownload {
    /// Final path of the file.
    pub path: PathBuf,
    /// Bytes written.
    pub bytes: u64,
}

/// Downloads converted files into one output directory.
///
/// Holds no per-download state: overlapping downloads each stream into their
/// own staging file, and a failed download can simply be retried.
///
/// # Example
///
/// ```no_run
/// use converter_core::download::DownloadExecutor;
/// use converter_core::http_client::HttpTimeouts;
/// use converter_core::resolve::DownloadTarget;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let executor = DownloadExecutor::new("./converted", HttpTimeouts::default())?;
/// let target = DownloadTarget {
///     url: "http://127.0.0.1:8000/media/out/7_report.html".to_string(),
///     filename: "report.html".to_string(),
/// };
/// let saved = executor.download(&target, None).await?;
/// println!("Saved to: {}", saved.path.display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DownloadExecutor {
    client: Client,
    output_dir: PathBuf,
}

impl DownloadExecutor {
    /// Creates an executor writing into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn new(
        output_dir: impl Into<PathBuf>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self::from_client(build_http_client(timeouts, None)?, output_dir))
    }

    /// Creates an executor that sends cookies from `jar`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn with_cookie_jar(
        output_dir: impl Into<PathBuf>,
        timeouts: HttpTimeouts,
        jar: Arc<Jar>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self::from_client(
            build_http_client(timeouts, Some(jar))?,
            output_dir,
        ))
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: Client, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
        }
    }

    /// Directory files are saved to.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Downloads `target`.
    ///
    /// The final name is the `Content-Disposition` filename when the server
    /// sends one, else `target.filename`; either way it is sanitized and
    /// made unique in the output directory.
    ///
    /// # Errors
    ///
    /// [`DownloadError::Status`] for non-2xx responses,
    /// [`DownloadError::Aborted`] when `cancel` fires, and network or IO
    /// errors otherwise. No staging file is left behind on error.
    #[instrument(skip(self, target, cancel), fields(url = %target.url))]
    pub async fn download(
        &self,
        target: &DownloadTarget,
        cancel: Option<&CancellationToken>,
    ) -> Result<SavedDownload, DownloadError> {
        let url = target.url.as_str();
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let token = cancel.cloned().unwrap_or_default();
        if token.is_cancelled() {
            return Err(DownloadError::aborted(url));
        }

        let response = tokio::select! {
            biased;
            () = token.cancelled() => return Err(DownloadError::aborted(url)),
            response = self.client.get(url).send() => {
                response.map_err(|e| DownloadError::network(url, e))?
            }
        };
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::status(url, status.as_u16()));
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_disposition)
            .unwrap_or_else(|| target.filename.clone());
        let filename = sanitize_filename(&filename);
        debug!(filename = %filename, "resolved download filename");

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| DownloadError::io(self.output_dir.clone(), e))?;
        let (staging_path, file) = create_staging_file(&self.output_dir, &filename).await?;

        let streamed = tokio::select! {
            biased;
            () = token.cancelled() => Err(DownloadError::aborted(url)),
            result = stream_to_file(file, response, url, &staging_path) => result,
        };
        let bytes = match streamed {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %staging_path.display(), "removing staging file after error");
                tokio::fs::remove_file(&staging_path).await.ok();
                return Err(e);
            }
        };

        let final_path = resolve_unique_path(&self.output_dir, &filename);
        if let Err(e) = tokio::fs::rename(&staging_path, &final_path).await {
            tokio::fs::remove_file(&staging_path).await.ok();
            return Err(DownloadError::io(final_path, e));
        }

        info!(path = %final_path.display(), bytes, "download complete");
        Ok(SavedDownload {
            path: final_path,
            bytes,
        })
    }
}

/// Creates a staging file no other download is using.
async fn create_staging_file(dir: &Path, filename: &str) -> Result<(PathBuf, File), DownloadError> {
    let mut last_path = dir.join(staging_filename(filename, 0));
    for attempt in 0..MAX_STAGING_ATTEMPTS {
        let path = dir.join(staging_filename(filename, attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => last_path = path,
            Err(e) => return Err(DownloadError::io(path, e)),
        }
    }
    Err(DownloadError::io(
        last_path,
        std::io::Error::new(IoErrorKind::AlreadyExists, "no free staging file name"),
    ))
}

/// Streams the response body to `file`, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
