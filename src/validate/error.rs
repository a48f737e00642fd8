//! Rejection reasons produced by file-set validation.

use thiserror::Error;

/// Why a file set was refused for a conversion kind.
///
/// Every variant renders a message suitable for showing to the person who
/// picked the files; variants that concern a single file name it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// No files were selected.
    #[error("please select at least one file")]
    Empty,

    /// More than one file was given to a single-file kind.
    #[error("only one file can be converted at a time ({count} selected)")]
    SingleFileOnly {
        /// Number of files that were selected.
        count: usize,
    },

    /// A multi-file kind received more files than it accepts.
    #[error("maximum {max} files allowed ({count} selected)")]
    TooManyFiles {
        /// Number of files that were selected.
        count: usize,
        /// Profile ceiling.
        max: usize,
    },

    /// Neither the media type nor the extension is accepted.
    #[error("{name}: only {accepted} files are allowed")]
    UnsupportedType {
        /// Offending file name.
        name: String,
        /// Human list of accepted extensions, e.g. `.jpg/.jpeg`.
        accepted: String,
    },

    /// A single file exceeds the per-file ceiling.
    #[error("{name} is too large ({size} bytes, max {max} bytes)")]
    FileTooLarge {
        /// Offending file name.
        name: String,
        /// Size of the file in bytes.
        size: u64,
        /// Per-file ceiling in bytes.
        max: u64,
    },

    /// The set as a whole exceeds the aggregate ceiling.
    #[error("total files size too large ({total} bytes, max {max} bytes)")]
    TotalTooLarge {
        /// Sum of all file sizes in bytes.
        total: u64,
        /// Aggregate ceiling in bytes.
        max: u64,
    },
}

impl Rejection {
    /// Returns the offending file name when the rejection concerns one file.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::UnsupportedType { name, .. } | Self::FileTooLarge { name, .. } => Some(name),
            _ => None,
        }
    }
}
