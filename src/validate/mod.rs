//! File-set validation against a conversion kind's constraint profile.
//!
//! Validation is pure: it inspects names, declared media types and sizes and
//! never reads file contents or touches the input. Checks run in a fixed
//! order and stop at the first failure:
//!
//! 1. file count
//! 2. per-file type (media type OR extension)
//! 3. per-file size
//! 4. aggregate size

mod error;

use std::path::{Path, PathBuf};

pub use error::Rejection;

use crate::kind::ConstraintProfile;

/// Backing storage of a [`SelectedFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Read from disk when the upload body is built.
    Path(PathBuf),
    /// Already in memory.
    Memory(Vec<u8>),
}

/// A file picked for conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Display name, including extension.
    pub name: String,
    /// Media type as reported by whatever picked the file, if any.
    pub media_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Where the content lives.
    pub source: FileSource,
}

impl SelectedFile {
    /// Creates an in-memory file. The media type is guessed from the name.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            media_type: guess_media_type(&name).map(str::to_string),
            size: bytes.len() as u64,
            name,
            source: FileSource::Memory(bytes),
        }
    }

    /// Builds a file from disk metadata without reading its content.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the path cannot be inspected or is not a
    /// regular file.
    pub async fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            media_type: guess_media_type(&name).map(str::to_string),
            size: metadata.len(),
            name,
            source: FileSource::Path(path),
        })
    }

    /// Overrides the declared media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: Option<&str>) -> Self {
        self.media_type = media_type.map(str::to_string);
        self
    }

    /// Lowercase extension with leading dot, if the name has one.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    /// Loads the file content.
    ///
    /// # Errors
    ///
    /// Returns the IO error if a path-backed file cannot be read.
    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes.clone()),
            FileSource::Path(path) => tokio::fs::read(path).await,
        }
    }
}

/// Ordered files submitted together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<SelectedFile>,
}

impl FileSet {
    /// Wraps the files in selection order.
    #[must_use]
    pub fn new(files: Vec<SelectedFile>) -> Self {
        Self { files }
    }

    /// Builds a set from paths on disk, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns the first IO error together with the path that caused it.
    pub async fn from_paths<P: AsRef<Path>>(
        paths: &[P],
    ) -> Result<Self, (PathBuf, std::io::Error)> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref().to_path_buf();
            let file = SelectedFile::from_path(path.clone())
                .await
                .map_err(|e| (path, e))?;
            files.push(file);
        }
        Ok(Self { files })
    }

    /// Files in selection order.
    #[must_use]
    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true when nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sum of all file sizes, saturating.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files
            .iter()
            .fold(0u64, |acc, file| acc.saturating_add(file.size))
    }
}

impl From<Vec<SelectedFile>> for FileSet {
    fn from(files: Vec<SelectedFile>) -> Self {
        Self::new(files)
    }
}

/// Checks a file set against a profile.
///
/// # Errors
///
/// Returns the first [`Rejection`] found, in check order.
pub fn validate(files: &FileSet, profile: &ConstraintProfile) -> Result<(), Rejection> {
    let count = files.len();
    if count == 0 {
        return Err(Rejection::Empty);
    }
    if !profile.is_multi_file && count != 1 {
        return Err(Rejection::SingleFileOnly { count });
    }
    if profile.is_multi_file && count > profile.max_file_count {
        return Err(Rejection::TooManyFiles {
            count,
            max: profile.max_file_count,
        });
    }

    for file in files.files() {
        if !is_accepted_type(file, profile) {
            return Err(Rejection::UnsupportedType {
                name: file.name.clone(),
                accepted: profile.accepted_extensions.join("/"),
            });
        }
    }

    for file in files.files() {
        if file.size > profile.max_file_bytes {
            return Err(Rejection::FileTooLarge {
                name: file.name.clone(),
                size: file.size,
                max: profile.max_file_bytes,
            });
        }
    }

    let total = files.total_bytes();
    if total > profile.max_total_bytes {
        return Err(Rejection::TotalTooLarge {
            total,
            max: profile.max_total_bytes,
        });
    }

    Ok(())
}

// Browsers leave the media type empty for some formats, so either signal is
// enough.
fn is_accepted_type(file: &SelectedFile, profile: &ConstraintProfile) -> bool {
    let mime_ok = file.media_type.as_deref().is_some_and(|mt| {
        let essence = mt.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        profile.accepted_mime_types.contains(&essence.as_str())
    });
    let ext_ok = file
        .extension()
        .is_some_and(|ext| profile.accepted_extensions.contains(&ext.as_str()));
    mime_ok || ext_ok
}

pub(crate) fn extension_of(name: &str) -> Option<String> {
    let dot = name.rfind('.')?;
    let ext = &name[dot..];
    (ext.len() > 1).then(|| ext.to_ascii_lowercase())
}

/// Media type a file picker would report for a name, if known.
#[must_use]
pub fn guess_media_type(name: &str) -> Option<&'static str> {
    match extension_of(name)?.as_str() {
        ".pdf" => Some("application/pdf"),
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".png" => Some("image/png"),
        ".webp" => Some("image/webp"),
        ".html" | ".htm" => Some("text/html"),
        ".docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        ".zip" => Some("application/zip"),
        _ => None,
    }
}
