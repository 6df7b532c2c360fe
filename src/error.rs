//! Error types for the paper2slide library.
//!
//! A run is all-or-nothing: every failure in any of the four stages is fatal
//! and surfaces as one [`PaperSlideError`]. There is no page-level or
//! figure-level partial success, so unlike a per-item error type there is
//! nothing to collect alongside a successful result.
//!
//! Variants carry the path or URL involved and, where one exists, the
//! underlying error as `#[source]` so callers (and `anyhow` in the CLI) can
//! print the full chain.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2slide library.
#[derive(Debug, Error)]
pub enum PaperSlideError {
    // ── Lookup errors ─────────────────────────────────────────────────────
    /// The identifier cannot name an arXiv paper.
    #[error("Invalid arXiv identifier '{input}': {reason}")]
    InvalidIdentifier { input: String, reason: String },

    /// The request could not be sent or the body could not be read.
    #[error("Request to '{url}' failed: {source}\nCheck your internet connection.")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Request to '{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The request exceeded the configured timeout.
    #[error("Request timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The query succeeded but returned no entry for the identifier.
    #[error("arXiv has no paper with identifier '{id}'")]
    PaperNotFound { id: String },

    /// arXiv answered with its error entry instead of a paper.
    #[error("arXiv API error: {message}")]
    ArxivApi { message: String },

    /// The Atom feed could not be parsed.
    #[error("Malformed arXiv feed: {0}")]
    FeedParse(String),

    /// The downloaded file does not start with the PDF magic bytes.
    #[error("Downloaded file is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF could not be loaded or its page tree is broken.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// No embedded figure object qualified for extraction.
    #[error("No figures found in '{path}': no form XObject carries the /{marker} marker")]
    NoFiguresFound { path: PathBuf, marker: String },

    /// lopdf failed to serialise a document.
    #[error("Failed to serialise PDF '{path}': {detail}")]
    PdfWrite { path: PathBuf, detail: String },

    // ── Filesystem errors ─────────────────────────────────────────────────
    /// A working directory could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template file is missing or unreadable.
    #[error("Failed to read template '{path}': {source}\nCheck --templates points at a slide template directory.")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A generated file could not be written.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem failure on a known path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaperSlideError {
    /// Map a `reqwest` failure to `DownloadTimeout` or `Http`.
    pub(crate) fn from_reqwest(url: &str, secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PaperSlideError::DownloadTimeout {
                url: url.to_string(),
                secs,
            }
        } else {
            PaperSlideError::Http {
                url: url.to_string(),
                source: e,
            }
        }
    }
}
