//! Error types for the PDF reader MCP server

use thiserror::Error;

/// Result type alias for the PDF reader MCP server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the PDF reader MCP server
#[derive(Error, Debug)]
pub enum Error {
    /// Path resolves outside the sandbox root
    #[error("Path escapes the sandbox: {path}")]
    PathViolation { path: String },

    /// Resolved path does not exist
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// A file was expected but the path is not a regular file
    #[error("Not a file: {path}")]
    NotAFile { path: String },

    /// A directory was expected but the path is not a directory
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// File exists in-bounds but cannot be loaded as a PDF
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// Requested page number outside the document's actual range
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Caller-supplied paths are echoed back; OS and library details are
    /// omitted. Full details should be logged via tracing before calling
    /// this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PathViolation { path } => format!("Path escapes the sandbox: {}", path),
            Error::NotFound { path } => format!("Path not found: {}", path),
            Error::NotAFile { path } => format!("Not a file: {}", path),
            Error::NotADirectory { path } => format!("Not a directory: {}", path),
            Error::InvalidPdf { reason } => format!("Invalid PDF file: {}", reason),
            Error::PageOutOfRange { page, page_count } => {
                format!("Page {} out of range (document has {} pages)", page, page_count)
            }
            Error::Io(_) => "I/O error".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
        }
    }

    /// Machine-readable error kind, stable across releases, so callers can
    /// react to failures without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::PathViolation { .. } => "path_violation",
            Error::NotFound { .. } => "not_found",
            Error::NotAFile { .. } => "not_a_file",
            Error::NotADirectory { .. } => "not_a_directory",
            Error::InvalidPdf { .. } => "load_error",
            Error::PageOutOfRange { .. } => "page_out_of_range",
            Error::Io(_) => "io",
            Error::Pdfium { .. } => "internal",
        }
    }
}
