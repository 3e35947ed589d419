//! Sandbox-confined filesystem access

pub mod lister;
pub mod resolver;

pub use lister::{list_pdfs, ListOptions, PdfFileEntry};
pub use resolver::Sandbox;
