//! PDF text, table, and metadata extraction on top of PDFium

use crate::error::{Error, Result};
use crate::pdf::table::{self, CharBox, Edge, TableGrid};
use pdfium_render::prelude::*;
use std::path::Path;

/// Y distance within which characters belong to the same line
const Y_TOLERANCE: f32 = 5.0;
/// X gap beyond which consecutive characters get a separating space
const SPACE_THRESHOLD: f32 = 10.0;

/// A character with its position on the page, in PDF coordinates
/// (origin bottom-left, y grows upward)
#[derive(Debug, Clone)]
pub struct CharInfo {
    pub ch: char,
    /// X coordinate (left edge)
    pub x: f32,
    /// Y coordinate (top edge)
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Which pages of a document to extract
#[derive(Debug, Clone)]
pub enum PageSelection {
    All,
    /// Specific 1-indexed page numbers, in the order they were requested
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Resolve to concrete 1-indexed page numbers, validating every number
    /// against the document before any extraction starts. Request order is
    /// preserved; duplicates collapse to their first occurrence.
    pub fn resolve(&self, page_count: u32) -> Result<Vec<u32>> {
        match self {
            PageSelection::All => Ok((1..=page_count).collect()),
            PageSelection::Pages(requested) => {
                let mut pages: Vec<u32> = Vec::with_capacity(requested.len());
                for &page in requested {
                    if page < 1 || page > page_count {
                        return Err(Error::PageOutOfRange { page, page_count });
                    }
                    if !pages.contains(&page) {
                        pages.push(page);
                    }
                }
                Ok(pages)
            }
        }
    }
}

/// Text (and optionally tables) extracted from one page
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// Page number (1-indexed)
    pub page: u32,
    pub text: String,
    /// Present only when table extraction was requested
    pub tables: Option<Vec<TableGrid>>,
}

/// Document information dictionary values
#[derive(Debug, Clone, Default)]
pub struct PdfMetadataInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// Structural facts plus metadata for a document
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub page_count: u32,
    pub metadata: PdfMetadataInfo,
}

/// Bind a fresh PDFium instance per call (the library is not thread-safe)
fn create_pdfium() -> Result<Pdfium> {
    // Try to bind to a locally provided library first, then the system one
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

/// Map PDFium errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::InvalidPdf {
                reason: "Document is password protected".to_string(),
            }
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

/// Reject data that cannot be a PDF before handing it to the engine
fn ensure_pdf_header(data: &[u8]) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

/// Read a PDF file's bytes from an already-resolved path, rejecting files
/// that cannot be PDFs before the engine sees them
pub fn load_pdf_bytes(path: &Path) -> Result<Vec<u8>> {
    let has_pdf_extension = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !has_pdf_extension {
        return Err(Error::InvalidPdf {
            reason: "Not a PDF file (expected a .pdf extension)".to_string(),
        });
    }

    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Err(Error::InvalidPdf {
            reason: "File is empty".to_string(),
        });
    }
    ensure_pdf_header(&data)?;

    Ok(data)
}

/// Extract text (and optionally tables) from the selected pages.
///
/// Every requested page number is validated against the document before any
/// page is touched, so an out-of-range request extracts nothing at all.
/// Returns the document's total page count alongside the extracted pages,
/// which come back in request order.
pub fn extract_pages(
    data: &[u8],
    selection: &PageSelection,
    extract_tables: bool,
) -> Result<(u32, Vec<ExtractedPage>)> {
    ensure_pdf_header(data)?;

    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(map_pdfium_error)?;

    let pages = document.pages();
    let page_count = pages.len() as u32;
    let selected = selection.resolve(page_count)?;

    let mut results = Vec::with_capacity(selected.len());
    for page_num in selected {
        let page = pages.get((page_num - 1) as u16).map_err(|e| Error::Pdfium {
            reason: format!("Failed to get page {}: {}", page_num, e),
        })?;

        let chars = collect_chars(&page);

        let tables = if extract_tables {
            let page_height = page.height().value;
            let char_boxes = to_char_boxes(&chars, page_height);
            let edges = collect_ruling_edges(&page, page_height);
            Some(table::detect_tables(edges, &char_boxes))
        } else {
            None
        };

        results.push(ExtractedPage {
            page: page_num,
            text: assemble_page_text(chars),
            tables,
        });
    }

    Ok((page_count, results))
}

/// Read page count and document metadata without extracting any text
pub fn read_document_info(data: &[u8]) -> Result<DocumentInfo> {
    ensure_pdf_header(data)?;

    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(map_pdfium_error)?;

    Ok(DocumentInfo {
        page_count: document.pages().len() as u32,
        metadata: extract_metadata(&document),
    })
}

fn extract_metadata(document: &PdfDocument) -> PdfMetadataInfo {
    let meta = document.metadata();
    PdfMetadataInfo {
        title: meta
            .get(PdfDocumentMetadataTagType::Title)
            .map(|t| t.value().to_string()),
        author: meta
            .get(PdfDocumentMetadataTagType::Author)
            .map(|t| t.value().to_string()),
        subject: meta
            .get(PdfDocumentMetadataTagType::Subject)
            .map(|t| t.value().to_string()),
        creator: meta
            .get(PdfDocumentMetadataTagType::Creator)
            .map(|t| t.value().to_string()),
        producer: meta
            .get(PdfDocumentMetadataTagType::Producer)
            .map(|t| t.value().to_string()),
        creation_date: meta
            .get(PdfDocumentMetadataTagType::CreationDate)
            .map(|t| t.value().to_string()),
        modification_date: meta
            .get(PdfDocumentMetadataTagType::ModificationDate)
            .map(|t| t.value().to_string()),
    }
}

/// Collect every character on the page with its loose bounding box.
/// A page with no text object yields an empty list.
fn collect_chars(page: &PdfPage) -> Vec<CharInfo> {
    let text_obj = match page.text() {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };

    let mut chars = Vec::new();
    for segment in text_obj.segments().iter() {
        if let Ok(char_iter) = segment.chars() {
            for char_result in char_iter.iter() {
                if let Some(c) = char_result.unicode_char() {
                    if let Ok(bounds) = char_result.loose_bounds() {
                        chars.push(CharInfo {
                            ch: c,
                            x: bounds.left().value,
                            y: bounds.top().value,
                            width: bounds.width().value,
                            height: bounds.height().value,
                        });
                    }
                }
            }
        }
    }
    chars
}

/// Order characters into lines (top to bottom, left to right) and join them,
/// inserting a space wherever consecutive characters sit more than a word
/// gap apart.
fn assemble_page_text(mut chars: Vec<CharInfo>) -> String {
    if chars.is_empty() {
        return String::new();
    }

    // Top of page first: Y descends in PDF coordinates, then X ascending
    chars.sort_by(|a, b| {
        let y_cmp = b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal);
        if y_cmp == std::cmp::Ordering::Equal {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            y_cmp
        }
    });

    // Characters within Y_TOLERANCE of the line anchor stay on that line
    let mut lines: Vec<Vec<CharInfo>> = Vec::new();
    let mut current_line: Vec<CharInfo> = Vec::new();
    let mut current_y: Option<f32> = None;

    for c in chars {
        match current_y {
            Some(cur_y) if (cur_y - c.y).abs() <= Y_TOLERANCE => {
                current_line.push(c);
            }
            _ => {
                if !current_line.is_empty() {
                    lines.push(current_line);
                }
                current_y = Some(c.y);
                current_line = vec![c];
            }
        }
    }
    if !current_line.is_empty() {
        lines.push(current_line);
    }

    let mut result = String::new();
    for mut line in lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut prev_x: Option<f32> = None;
        for c in line {
            if let Some(px) = prev_x {
                if c.x - px > SPACE_THRESHOLD && c.ch != ' ' {
                    result.push(' ');
                }
            }
            result.push(c.ch);
            prev_x = Some(c.x);
        }
        result.push('\n');
    }

    result.trim_end().to_string()
}

/// Convert collected characters into top-origin boxes for table detection
fn to_char_boxes(chars: &[CharInfo], page_height: f32) -> Vec<CharBox> {
    chars
        .iter()
        .map(|c| CharBox {
            ch: c.ch,
            x0: c.x,
            top: page_height - c.y,
            x1: c.x + c.width,
            bottom: page_height - c.y + c.height,
        })
        .collect()
}

/// Harvest ruling-line edges from the page's path objects, converted to
/// top-origin coordinates
fn collect_ruling_edges(page: &PdfPage, page_height: f32) -> Vec<Edge> {
    let mut edges = Vec::new();
    for object in page.objects().iter() {
        if let Some(path_object) = object.as_path_object() {
            if let Ok(bounds) = path_object.bounds() {
                let x0 = bounds.left().value;
                let x1 = bounds.right().value;
                let top = page_height - bounds.top().value;
                let bottom = page_height - bounds.bottom().value;
                edges.extend(table::edges_from_bounds(x0, top, x1, bottom));
            }
        }
    }
    edges
}
