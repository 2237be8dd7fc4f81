//! # pdf-extractor
//!
//! Converts PDF documents into markdown for ingestion by AI assistants.
//!
//! The work is text-layout reconstruction: reading order across multi-column
//! pages, removal of running headers and footers, heading detection,
//! de-hyphenation, typography cleanup, table rendering and size-bounded chunking.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf_extractor::{to_markdown, Config};
//!
//! fn main() -> pdf_extractor::Result<()> {
//!     let markdown = to_markdown("manual.pdf", &Config::default())?;
//!     println!("{}", markdown);
//!     Ok(())
//! }
//! ```
//!
//! ## Batches
//!
//! ```no_run
//! use pdf_extractor::{Config, Extractor};
//!
//! let config = Config::load("config.yaml")?;
//! let extractor = Extractor::new(config)?;
//! let report = extractor.process_dir("input/pdfs")?;
//! println!("{} succeeded, {} failed", report.succeeded(), report.failed());
//! # Ok::<(), pdf_extractor::Error>(())
//! ```
//!
//! ## Structure
//!
//! - [`parser`]: the PDF-parsing collaborator (lopdf), producing positioned blocks and tables
//! - [`cache`]: raw extractions keyed by content hash
//! - [`layout`]: reading order and header/footer detection
//! - [`render`]: cleaning, headings, tables, markdown and chunking
//! - [`pipeline`]: pages in, [`Document`] out
//! - [`extract`]: files and batches, output artifacts and the index

pub mod cache;
pub mod config;
pub mod detect;
pub mod error;
pub mod extract;
pub mod layout;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use cache::{file_hash, CacheStore, JsonFileCache, MemoryCache};
pub use config::{Config, Preset};
pub use detect::{is_pdf, validate_pdf};
pub use error::{Error, ErrorKind, Result};
pub use extract::{BatchReport, Extraction, Extractor, FileFailure, FileReport, FileSummary};
pub use layout::{HeaderFooterDetector, LayoutAnalyzer};
pub use model::{BBox, Document, DocumentStats, Element, Page, RawExtraction, Table, TextBlock};
pub use parser::{LopdfSource, PdfSource};
pub use pipeline::Pipeline;
pub use render::{Chunk, Chunker};

use std::path::Path;

/// Extract a PDF file into a [`Document`] without caching or writing files.
///
/// # Example
///
/// ```no_run
/// use pdf_extractor::{extract_document, Config};
///
/// let doc = extract_document("manual.pdf", &Config::default()).unwrap();
/// println!("Pages: {}", doc.page_count());
/// ```
pub fn extract_document<P: AsRef<Path>>(path: P, config: &Config) -> Result<Document> {
    let path = path.as_ref();
    validate_pdf(path)?;
    let pipeline = Pipeline::new(config)?;
    let raw = LopdfSource::new().extract(path, &config.extraction)?;
    Ok(pipeline.run(&raw))
}

/// Convert a PDF file to markdown.
///
/// # Example
///
/// ```no_run
/// use pdf_extractor::{to_markdown, Config, Preset};
///
/// let config = Config::default().with_preset(Preset::Simple);
/// let markdown = to_markdown("manual.pdf", &config).unwrap();
/// std::fs::write("manual.md", markdown).unwrap();
/// ```
pub fn to_markdown<P: AsRef<Path>>(path: P, config: &Config) -> Result<String> {
    Ok(extract_document(path, config)?.to_markdown())
}
