//! Conversion kinds and their constraint profiles.
//!
//! Every supported transform is described by a [`ConversionKind`]. The kind
//! decides which endpoint is called, how files are attached to the multipart
//! body, which files are accepted, what the output extension is, and whether
//! the result arrives in the upload response or through status polling.
//!
//! # Example
//!
//! ```
//! use converter_core::kind::{ConversionKind, ImageFormat};
//!
//! let kind = ConversionKind::PdfToImage { format: ImageFormat::Png };
//! assert_eq!(kind.endpoint_slug(), "pdf-to-png");
//! assert_eq!(kind.output_extension(), ".png");
//! assert!(!kind.profile().is_async);
//! ```

use std::fmt;

/// One mebibyte, the unit every size limit is expressed in.
pub const MIB: u64 = 1024 * 1024;

/// Raster format produced by PDF→image conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG output.
    Jpg,
    /// PNG output.
    Png,
    /// WebP output.
    Webp,
}

impl ImageFormat {
    /// Returns the stable lowercase label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

/// Output style requested from the PDF→HTML converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HtmlMode {
    /// Keep layout and styling.
    #[default]
    Formatted,
    /// Plain text content wrapped in minimal markup.
    Clean,
}

impl HtmlMode {
    /// Returns the value sent in the `conversion_type` form field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Formatted => "formatted",
            Self::Clean => "clean",
        }
    }
}

impl std::str::FromStr for HtmlMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "formatted" => Ok(Self::Formatted),
            "clean" => Ok(Self::Clean),
            other => Err(format!("invalid html mode: {other}")),
        }
    }
}

/// A supported source→target transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// One or more JPEG images combined into a PDF.
    ImageToPdf,
    /// A PDF rasterized to images (a ZIP bundle for multi-page input).
    PdfToImage {
        /// Requested raster format.
        format: ImageFormat,
    },
    /// A PDF converted to HTML by a background worker.
    PdfToHtml {
        /// Requested output style.
        mode: HtmlMode,
    },
    /// A PDF converted to a Word document.
    PdfToWord {
        /// Keep embedded graphics in the output document.
        preserve_graphics: bool,
    },
    /// Up to twenty PNG images combined into a PDF.
    MultiImageToPdf,
}

/// Limits and flags that parameterize validation and upload for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintProfile {
    /// Lowercase extensions (with leading dot) accepted for input files.
    pub accepted_extensions: &'static [&'static str],
    /// Lowercase media types accepted for input files.
    pub accepted_mime_types: &'static [&'static str],
    /// Per-file size ceiling in bytes.
    pub max_file_bytes: u64,
    /// Ceiling for the sum of all file sizes in bytes.
    pub max_total_bytes: u64,
    /// Maximum number of files for multi-file kinds.
    pub max_file_count: usize,
    /// Whether more than one file may be submitted.
    pub is_multi_file: bool,
    /// Whether the result is obtained by polling a status endpoint.
    pub is_async: bool,
}

const PDF_EXTENSIONS: &[&str] = &[".pdf"];
const PDF_MIME_TYPES: &[&str] = &["application/pdf"];

const SINGLE_PDF: ConstraintProfile = ConstraintProfile {
    accepted_extensions: PDF_EXTENSIONS,
    accepted_mime_types: PDF_MIME_TYPES,
    max_file_bytes: 20 * MIB,
    max_total_bytes: 20 * MIB,
    max_file_count: 1,
    is_multi_file: false,
    is_async: false,
};

const JPEG_IMAGES: ConstraintProfile = ConstraintProfile {
    accepted_extensions: &[".jpg", ".jpeg"],
    accepted_mime_types: &["image/jpeg", "image/jpg"],
    max_file_bytes: 20 * MIB,
    max_total_bytes: 100 * MIB,
    max_file_count: 50,
    is_multi_file: true,
    is_async: false,
};

const PNG_IMAGES: ConstraintProfile = ConstraintProfile {
    accepted_extensions: &[".png"],
    accepted_mime_types: &["image/png"],
    max_file_bytes: 10 * MIB,
    max_total_bytes: 200 * MIB,
    max_file_count: 20,
    is_multi_file: true,
    is_async: false,
};

impl ConversionKind {
    /// Every kind, in the order the CLI lists them.
    pub const ALL: [Self; 7] = [
        Self::ImageToPdf,
        Self::MultiImageToPdf,
        Self::PdfToImage {
            format: ImageFormat::Jpg,
        },
        Self::PdfToImage {
            format: ImageFormat::Png,
        },
        Self::PdfToImage {
            format: ImageFormat::Webp,
        },
        Self::PdfToHtml {
            mode: HtmlMode::Formatted,
        },
        Self::PdfToWord {
            preserve_graphics: true,
        },
    ];

    /// Returns the constraint profile for this kind.
    #[must_use]
    pub fn profile(&self) -> ConstraintProfile {
        match self {
            Self::ImageToPdf => JPEG_IMAGES,
            Self::MultiImageToPdf => PNG_IMAGES,
            Self::PdfToImage { .. } | Self::PdfToWord { .. } => SINGLE_PDF,
            Self::PdfToHtml { .. } => ConstraintProfile {
                is_async: true,
                ..SINGLE_PDF
            },
        }
    }

    /// Path segment under `/api/` that accepts uploads for this kind.
    #[must_use]
    pub fn endpoint_slug(&self) -> &'static str {
        match self {
            Self::ImageToPdf => "jpg-to-pdf",
            Self::MultiImageToPdf => "png-to-pdf",
            Self::PdfToImage {
                format: ImageFormat::Jpg,
            } => "pdf-to-jpg",
            Self::PdfToImage {
                format: ImageFormat::Png,
            } => "pdf-to-png",
            Self::PdfToImage {
                format: ImageFormat::Webp,
            } => "pdf-to-webp",
            Self::PdfToHtml { .. } => "pdf-to-html",
            Self::PdfToWord { .. } => "pdf-to-word",
        }
    }

    /// Extension (with leading dot) of the artifact this kind produces.
    #[must_use]
    pub fn output_extension(&self) -> &'static str {
        match self {
            Self::ImageToPdf | Self::MultiImageToPdf => ".pdf",
            Self::PdfToImage { format } => match format {
                ImageFormat::Jpg => ".jpg",
                ImageFormat::Png => ".png",
                ImageFormat::Webp => ".webp",
            },
            Self::PdfToHtml { .. } => ".html",
            Self::PdfToWord { .. } => ".docx",
        }
    }

    /// Multipart field name used for each file part.
    #[must_use]
    pub fn file_field(&self) -> &'static str {
        if self.profile().is_multi_file {
            "files"
        } else {
            "file"
        }
    }

    /// Scalar form fields sent alongside the files.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::PdfToHtml { mode } => vec![("conversion_type", mode.as_str().to_string())],
            Self::PdfToWord { preserve_graphics } => {
                vec![("preserve_graphics", preserve_graphics.to_string())]
            }
            _ => Vec::new(),
        }
    }

    /// Stable label, identical to the endpoint slug.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.endpoint_slug()
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ConversionKind {
    type Err = String;

    /// Parses an endpoint slug. Variant options (HTML mode, graphics) take
    /// their defaults and can be adjusted afterwards.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.endpoint_slug() == wanted)
            .ok_or_else(|| format!("invalid conversion kind: {s}"))
    }
}
