//! PDF processing layer
//!
//! This module provides text, table, and metadata extraction using PDFium.

mod reader;
mod table;

pub use reader::{
    extract_pages, load_pdf_bytes, read_document_info, DocumentInfo, ExtractedPage,
    PageSelection, PdfMetadataInfo,
};
pub use table::TableGrid;
