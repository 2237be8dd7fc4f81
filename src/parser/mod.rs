//! PDF parsing collaborator.
//!
//! Turns a PDF file into positioned [`TextBlock`]s and [`Table`]s per page:
//!
//! 1. [`PdfBackend`] gives access to pages, boxes, content streams and fonts.
//! 2. [`ContentInterpreter`] runs a page's content stream into text spans and
//!    ruling edges, in top-left page coordinates.
//! 3. Spans are grouped into lines and lines into blocks.
//! 4. [`TableFinder`] detects tables from edges or text alignment.
//!
//! [`TextBlock`]: crate::model::TextBlock
//! [`Table`]: crate::model::Table

mod backend;
mod blocks;
mod content;
mod tables;

pub use backend::{
    decode_text_simple, ContentOp, FontMetrics, LopdfBackend, PageBox, PageId, PdfBackend, PdfValue,
};
pub use blocks::{group_into_blocks, group_into_lines, TextLine};
pub use content::{is_spaceless_script_char, ContentInterpreter, Edge, Orientation, PageObjects, TextSpan};
pub use tables::TableFinder;

use std::path::Path;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::model::{Page, RawExtraction};

/// Source of raw page content for one PDF.
///
/// The pipeline only depends on this trait, so tests and alternative parsers can
/// stand in for the lopdf-based implementation.
pub trait PdfSource: Send + Sync {
    /// Extract all pages of the file.
    ///
    /// File-level failures (unreadable, not a PDF, encrypted) are errors; a page
    /// that fails to parse is returned empty.
    fn extract(&self, path: &Path, config: &ExtractionConfig) -> Result<RawExtraction>;
}

/// [`PdfSource`] using lopdf.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfSource;

impl LopdfSource {
    pub fn new() -> Self {
        Self
    }

    /// Extract pages from an already loaded backend.
    pub fn extract_backend<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        config: &ExtractionConfig,
    ) -> RawExtraction {
        let finder = TableFinder::new(&config.table_settings);
        let pages = backend
            .pages()
            .into_iter()
            .map(|(number, id)| {
                let page_box = backend.media_box(id);
                match extract_page(backend, &finder, number, id, page_box) {
                    Ok(page) => page,
                    Err(e) => {
                        log::warn!("Page {}: extraction failed, page left empty: {}", number, e);
                        Page::new(number, page_box.width(), page_box.height())
                    }
                }
            })
            .collect();
        RawExtraction::new(pages)
    }
}

impl PdfSource for LopdfSource {
    fn extract(&self, path: &Path, config: &ExtractionConfig) -> Result<RawExtraction> {
        let backend = LopdfBackend::load_file(path)?;
        let extraction = self.extract_backend(&backend, config);
        log::debug!(
            "{}: {} pages, {} blocks, {} tables",
            path.display(),
            extraction.page_count(),
            extraction.block_count(),
            extraction.table_count()
        );
        Ok(extraction)
    }
}

fn extract_page<B: PdfBackend + ?Sized>(
    backend: &B,
    finder: &TableFinder,
    number: u32,
    id: PageId,
    page_box: PageBox,
) -> Result<Page> {
    let mut page = Page::new(number, page_box.width(), page_box.height());

    let data = backend.page_content(id)?;
    let ops = backend.decode_content(&data)?;
    let objects = ContentInterpreter::new(backend, id, page_box).run(&ops);

    let visible: Vec<TextSpan> = objects
        .spans
        .iter()
        .filter(|s| !s.text.trim().is_empty())
        .cloned()
        .collect();
    for table in finder.find(number, &visible, &objects.edges) {
        page.add_table(table);
    }

    let lines = group_into_lines(objects.spans);
    for block in group_into_blocks(lines, number) {
        if !block.text.trim().is_empty() {
            page.add_block(block);
        }
    }
    Ok(page)
}
