//! PDF Tools Gateway
//!
//! An HTTP service for page-level PDF tools (extract, delete, reorder,
//! rotate, split, merge, stamping) done in-process with `lopdf`, and for
//! format conversions delegated to external engines such as LibreOffice,
//! poppler, Tesseract, Ghostscript and qpdf.

pub mod archive;
pub mod config;
pub mod converter;
pub mod engines;
pub mod handlers;
pub mod image_processor;
pub mod page_selector;
pub mod pdf_processor;
pub mod routes;
pub mod types;
pub mod upload;
pub mod workspace;

pub use config::GatewayConfig;
pub use converter::DocumentConverter;
pub use types::*;
