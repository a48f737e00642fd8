//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use converter_core::{ConversionKind, HtmlMode};

/// Convert documents with a remote conversion service.
///
/// Uploads the given files, follows the conversion to its result and saves
/// the converted file into the output directory.
#[derive(Parser, Debug)]
#[command(name = "converter")]
#[command(author, version, about)]
pub struct Args {
    /// Conversion to run (jpg-to-pdf, png-to-pdf, pdf-to-jpg, pdf-to-png,
    /// pdf-to-webp, pdf-to-html, pdf-to-word)
    pub kind: ConversionKind,

    /// Files to convert, in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Backend origin, e.g. http://127.0.0.1:8000
    #[arg(long)]
    pub origin: Option<String>,

    /// Directory converted files are saved to (default: current directory)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Anti-forgery token sent with the upload (default: read from the
    /// service cookie)
    #[arg(long)]
    pub csrf_token: Option<String>,

    /// Output style for pdf-to-html (formatted or clean)
    #[arg(long)]
    pub html_mode: Option<HtmlMode>,

    /// Drop embedded graphics for pdf-to-word
    #[arg(long)]
    pub no_preserve_graphics: bool,

    /// Give up on the conversion after this many seconds (1-3600)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: Option<u64>,

    /// Interval between status checks in milliseconds (100-60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(100..=60000))]
    pub poll_interval_ms: Option<u64>,

    /// Print the download URL instead of saving the file
    #[arg(long)]
    pub no_download: bool,

    /// Print a JSON summary of the job on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
