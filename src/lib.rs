//! PDF Reader MCP Server Library
//!
//! MCP tools for inspecting PDF documents inside a sandboxed root directory:
//! - `read_pdf_text`: extract text (and optionally tables) from a PDF
//! - `get_pdf_info`: read document metadata and page count
//! - `list_pdfs_in_directory`: list PDF files under a directory
//!
//! Every path a caller supplies is resolved against the configured root and
//! rejected if it escapes it.

pub mod error;
pub mod pdf;
pub mod sandbox;
pub mod server;

pub use error::{Error, Result};
pub use server::{
    run_server, run_server_with_config, ListPdfsParams, ListPdfsResult, PdfInfoParams,
    PdfInfoResult, PdfServer, ReadPdfTextParams, ReadPdfTextResult, ServerConfig,
};
