//! Pipeline orchestration: raw pages in, assembled [`Document`] out.

use crate::config::{Config, ExtractionConfig};
use crate::error::Result;
use crate::layout::{HeaderFooterDetector, LayoutAnalyzer, MarginZone, Suppressions};
use crate::model::{BlockId, Document, DocumentStats, Page, RawExtraction, TextBlock};
use crate::render::MarkdownRenderer;

/// Runs layout analysis, header/footer removal, cleaning, classification and
/// table rendering over the pages of one document.
///
/// A pipeline holds no per-document state and can be shared between threads.
pub struct Pipeline {
    extraction: ExtractionConfig,
    remove_headers: bool,
    remove_footers: bool,
    page_separator: String,
    layout: LayoutAnalyzer,
    header_footer: HeaderFooterDetector,
    renderer: MarkdownRenderer,
}

impl Pipeline {
    /// Build the pipeline components from a configuration.
    ///
    /// Fails when the configuration does not validate.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extraction: config.extraction.clone(),
            remove_headers: config.markdown.text_cleaning.remove_headers,
            remove_footers: config.markdown.text_cleaning.remove_footers,
            page_separator: config.output.page_separator.clone(),
            layout: LayoutAnalyzer::new(&config.extraction),
            header_footer: HeaderFooterDetector::new(&config.extraction),
            renderer: MarkdownRenderer::new(&config.markdown)?,
        })
    }

    /// Process a raw extraction.
    pub fn run(&self, extraction: &RawExtraction) -> Document {
        self.process(&extraction.pages)
    }

    /// Process pages in document order.
    pub fn process(&self, pages: &[Page]) -> Document {
        let mut stats = DocumentStats::new();
        stats.total_pages = pages.len();

        let prepared: Vec<Page> = pages.iter().map(|p| self.prepare_page(p)).collect();
        for page in &prepared {
            stats.text_blocks += page.blocks.len();
            stats.tables += page.tables.len();
            stats.flagged_blocks += page.blocks.iter().filter(|b| b.has_indicator).count();
        }

        let suppressions = if self.extraction.detect_headers_footers {
            self.header_footer.detect(&prepared)
        } else {
            Suppressions::new()
        };

        let contents = prepared
            .iter()
            .map(|page| {
                let blocks = self.visible_blocks(page, &suppressions, &mut stats);
                self.renderer
                    .render_page(page.number, &blocks, &page.blocks, &page.tables, &mut stats)
            })
            .collect();

        log::debug!(
            "Assembled {} pages: {} blocks, {} tables, {} headings, {} suppressed",
            stats.total_pages,
            stats.text_blocks,
            stats.tables,
            stats.headings,
            stats.suppressed_blocks
        );

        Document {
            pages: contents,
            stats,
            page_separator: self.page_separator.clone(),
        }
    }

    /// Apply the length filter, flag indicator blocks and put blocks in reading order.
    fn prepare_page(&self, page: &Page) -> Page {
        let mut blocks: Vec<TextBlock> = page
            .blocks
            .iter()
            .filter(|b| b.text_len() >= self.extraction.min_text_length)
            .cloned()
            .collect();

        for block in &mut blocks {
            block.has_indicator = self
                .extraction
                .block_indicators
                .iter()
                .any(|indicator| !indicator.is_empty() && block.text.contains(indicator.as_str()));
        }

        if self.extraction.sort_blocks {
            let order = self.layout.reading_order(&blocks, page.width);
            let mut slots: Vec<Option<TextBlock>> = blocks.into_iter().map(Some).collect();
            blocks = order.into_iter().filter_map(|i| slots[i].take()).collect();
        }

        Page {
            number: page.number,
            width: page.width,
            height: page.height,
            blocks,
            tables: page.tables.clone(),
        }
    }

    /// Blocks that survive header/footer suppression and table overlap.
    fn visible_blocks<'a>(
        &self,
        page: &'a Page,
        suppressions: &Suppressions,
        stats: &mut DocumentStats,
    ) -> Vec<&'a TextBlock> {
        let mut visible = Vec::with_capacity(page.blocks.len());
        for (index, block) in page.blocks.iter().enumerate() {
            let id = BlockId {
                page: page.number,
                index,
            };
            let removed = match suppressions.get(&id) {
                Some(MarginZone::Header) => self.remove_headers,
                Some(MarginZone::Footer) => self.remove_footers,
                None => false,
            };
            if removed {
                stats.suppressed_blocks += 1;
                continue;
            }

            if self.renderer.renders_tables() {
                let (cx, cy) = block.bbox.center();
                if page.tables.iter().any(|t| t.bbox.contains_point(cx, cy)) {
                    log::debug!("Page {}: block {} lies inside a table", page.number, index);
                    continue;
                }
            }
            visible.push(block);
        }
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Element, Table};

    fn block(page: u32, x0: f32, y0: f32, x1: f32, y1: f32, text: &str) -> TextBlock {
        TextBlock::new(page, BBox::new(x0, y0, x1, y1), text)
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.extraction.min_text_length = 3;
        config
    }

    #[test]
    fn test_default_config_keeps_short_headings() {
        let mut page = Page::letter(1);
        page.add_block(block(1, 50.0, 100.0, 550.0, 120.0, "CHAPTER 3"));
        page.add_block(block(1, 50.0, 130.0, 550.0, 150.0, "The hero attacks the goblin."));
        let doc = Pipeline::new(&Config::default()).unwrap().process(&[page]);
        assert_eq!(doc.stats.headings, 1);
        assert_eq!(doc.to_markdown(), "# CHAPTER 3\n\nThe hero attacks the goblin.\n");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.extraction.header_footer_repeat_ratio = 1.5;
        assert!(Pipeline::new(&config).is_err());
    }

    #[test]
    fn test_short_blocks_dropped() {
        let mut page = Page::letter(1);
        page.add_block(block(1, 50.0, 100.0, 550.0, 120.0, "ok"));
        page.add_block(block(1, 50.0, 130.0, 550.0, 150.0, "A longer paragraph."));
        let doc = Pipeline::new(&config()).unwrap().process(&[page]);
        assert_eq!(doc.stats.text_blocks, 1);
        assert_eq!(doc.to_markdown(), "A longer paragraph.\n");
    }

    #[test]
    fn test_two_columns_in_order() {
        let mut page = Page::letter(1);
        page.add_block(block(1, 320.0, 100.0, 560.0, 200.0, "right column text"));
        page.add_block(block(1, 50.0, 300.0, 290.0, 400.0, "left column bottom"));
        page.add_block(block(1, 50.0, 100.0, 290.0, 200.0, "left column top"));
        let doc = Pipeline::new(&config()).unwrap().process(&[page]);
        assert_eq!(
            doc.to_markdown(),
            "left column top\n\nleft column bottom\n\nright column text\n"
        );
    }

    #[test]
    fn test_extraction_order_kept_without_sorting() {
        let mut config = config();
        config.extraction.sort_blocks = false;
        let mut page = Page::letter(1);
        page.add_block(block(1, 50.0, 300.0, 550.0, 320.0, "second on page"));
        page.add_block(block(1, 50.0, 100.0, 550.0, 120.0, "first on page"));
        let doc = Pipeline::new(&config).unwrap().process(&[page]);
        assert_eq!(doc.to_markdown(), "second on page\n\nfirst on page\n");
    }

    fn pages_with_footer(count: u32) -> Vec<Page> {
        (1..=count)
            .map(|n| {
                let mut page = Page::letter(n);
                page.add_block(block(n, 50.0, 20.0, 550.0, 35.0, "Monster Manual"));
                page.add_block(block(n, 50.0, 200.0, 550.0, 260.0, &format!("Body of page {}.", n)));
                page.add_block(block(n, 250.0, 760.0, 350.0, 775.0, &format!("Page {} of {}", n, count)));
                page
            })
            .collect()
    }

    #[test]
    fn test_headers_and_footers_removed() {
        let doc = Pipeline::new(&config()).unwrap().process(&pages_with_footer(4));
        assert_eq!(doc.stats.suppressed_blocks, 8);
        let markdown = doc.to_markdown();
        assert!(!markdown.contains("Monster Manual"));
        assert!(!markdown.contains("of 4"));
        assert!(markdown.contains("Body of page 3."));
        assert!(markdown.contains("<!-- page 2 -->"));
    }

    #[test]
    fn test_keep_headers_when_disabled() {
        let mut config = config();
        config.markdown.text_cleaning.remove_headers = false;
        let doc = Pipeline::new(&config).unwrap().process(&pages_with_footer(4));
        assert_eq!(doc.stats.suppressed_blocks, 4);
        let markdown = doc.to_markdown();
        assert!(markdown.contains("Monster Manual"));
        assert!(!markdown.contains("of 4"));
    }

    #[test]
    fn test_detection_disabled() {
        let mut config = config();
        config.extraction.detect_headers_footers = false;
        let doc = Pipeline::new(&config).unwrap().process(&pages_with_footer(4));
        assert_eq!(doc.stats.suppressed_blocks, 0);
        assert!(doc.to_markdown().contains("Page 4 of 4"));
    }

    #[test]
    fn test_table_replaces_its_text() {
        let mut page = Page::letter(1);
        page.add_block(block(1, 50.0, 100.0, 550.0, 120.0, "Equipment prices follow."));
        page.add_block(block(1, 60.0, 205.0, 300.0, 215.0, "Rope 1 gp"));
        page.add_table(Table::new(
            1,
            BBox::new(50.0, 200.0, 550.0, 240.0),
            vec![
                vec!["Item".into(), "Cost".into()],
                vec!["Rope".into(), "1 gp".into()],
            ],
        ));
        let doc = Pipeline::new(&config()).unwrap().process(&[page]);
        assert_eq!(doc.stats.tables, 1);
        let elements: Vec<&Element> = doc.elements().collect();
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements[1], Element::Table { .. }));
        assert!(!doc.to_markdown().contains("Rope 1 gp"));
    }

    #[test]
    fn test_indicator_blocks_flagged() {
        let mut config = config();
        config.extraction.block_indicators = vec!["Armor Class".into()];
        let mut page = Page::letter(1);
        page.add_block(block(1, 50.0, 100.0, 550.0, 120.0, "Armor Class 15"));
        page.add_block(block(1, 50.0, 130.0, 550.0, 150.0, "Plain text here."));
        let doc = Pipeline::new(&config).unwrap().process(&[page]);
        assert_eq!(doc.stats.flagged_blocks, 1);
        let flagged: Vec<bool> = doc
            .elements()
            .filter_map(|e| match e {
                Element::Paragraph { flagged, .. } => Some(*flagged),
                _ => None,
            })
            .collect();
        assert_eq!(flagged, vec![true, false]);
    }
}
