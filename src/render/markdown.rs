//! Markdown assembly of a single page.

use crate::config::MarkdownConfig;
use crate::error::Result;
use crate::model::{DocumentStats, Element, PageContent, Table, TextBlock};

use super::{body_font_size, render_table, HeadingClassifier, InlineFormatter, TextNormalizer};

/// Turns a page's ordered, filtered blocks and its tables into [`PageContent`].
pub struct MarkdownRenderer {
    normalizer: TextNormalizer,
    formatter: InlineFormatter,
    classifier: HeadingClassifier,
    render_tables: bool,
}

impl MarkdownRenderer {
    /// Create a renderer from markdown settings.
    ///
    /// Fails when a heading pattern does not compile.
    pub fn new(config: &MarkdownConfig) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::from_config(&config.text_cleaning),
            formatter: InlineFormatter::new(config),
            classifier: HeadingClassifier::new(config)?,
            render_tables: config.text_cleaning.render_tables,
        })
    }

    /// Whether detected tables are rendered.
    pub fn renders_tables(&self) -> bool {
        self.render_tables
    }

    /// Render one page.
    ///
    /// `blocks` must already be in reading order with suppressed blocks removed.
    /// `body_blocks` is the page's full block list, used for the modal font size.
    /// With de-hyphenation on, a word split across two consecutive blocks is
    /// rejoined and the continuation becomes part of the first block.
    /// Tables follow the text; a table that cannot be rendered is logged, counted
    /// in `stats.skipped_tables` and left out.
    pub fn render_page(
        &self,
        number: u32,
        blocks: &[&TextBlock],
        body_blocks: &[TextBlock],
        tables: &[Table],
        stats: &mut DocumentStats,
    ) -> PageContent {
        let mut content = PageContent::new(number);
        let body_size = body_font_size(body_blocks);

        for (block, text) in self.block_texts(blocks) {
            self.render_block(block, &text, body_size, &mut content.elements, stats);
        }

        if self.render_tables {
            for (i, table) in tables.iter().enumerate() {
                match render_table(table) {
                    Ok(markdown) => content.elements.push(Element::Table { markdown }),
                    Err(e) => {
                        log::warn!("Skipping table {} on page {}: {}", i + 1, number, e);
                        stats.skipped_tables += 1;
                    }
                }
            }
        }

        content
    }

    /// Normalized text per block, with hyphenated block breaks joined.
    fn block_texts<'a>(&self, blocks: &[&'a TextBlock]) -> Vec<(&'a TextBlock, String)> {
        let dehyphenate = self.normalizer.options().dehyphenate;
        let mut texts: Vec<(&TextBlock, String)> = Vec::with_capacity(blocks.len());
        for &block in blocks {
            let text = self.normalizer.normalize(&block.text);
            if dehyphenate && text.chars().next().is_some_and(char::is_lowercase) {
                if let Some((_, previous)) = texts.last_mut() {
                    if let Some(stem_len) = hyphen_break(previous) {
                        previous.truncate(stem_len);
                        previous.push_str(&text);
                        continue;
                    }
                }
            }
            texts.push((block, text));
        }
        texts
    }

    fn render_block(
        &self,
        block: &TextBlock,
        text: &str,
        body_size: Option<f32>,
        elements: &mut Vec<Element>,
        stats: &mut DocumentStats,
    ) {
        let lines: Vec<&str> = text.lines().collect();

        // The size hint describes the whole block; only single-line blocks can be
        // promoted by it.
        let non_empty = lines.iter().filter(|l| !l.trim().is_empty()).count();
        let font_size = if non_empty == 1 { block.font_size } else { None };

        let flagged = block.has_indicator;
        let mut paragraph: Vec<String> = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                flush_paragraph(&mut paragraph, elements, flagged);
                continue;
            }
            let formatted = self.formatter.apply(line);
            let heading = self.classifier.classify(&formatted, font_size, body_size);
            if heading.is_heading() {
                flush_paragraph(&mut paragraph, elements, flagged);
                stats.headings += 1;
                elements.push(Element::Heading {
                    level: heading.level,
                    text: heading.text,
                });
            } else {
                paragraph.push(formatted.trim_end().to_string());
            }
        }
        flush_paragraph(&mut paragraph, elements, flagged);
    }
}

/// Byte length of the word stem when `text` ends in `letter '-'`.
fn hyphen_break(text: &str) -> Option<usize> {
    let stem = text.trim_end().strip_suffix('-')?;
    stem.chars().last().filter(|c| c.is_alphabetic())?;
    Some(stem.len())
}

fn flush_paragraph(paragraph: &mut Vec<String>, elements: &mut Vec<Element>, flagged: bool) {
    if !paragraph.is_empty() {
        elements.push(Element::Paragraph {
            text: paragraph.join("\n"),
            flagged,
        });
        paragraph.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn block(text: &str) -> TextBlock {
        TextBlock::new(1, BBox::new(50.0, 100.0, 550.0, 140.0), text)
    }

    fn render(config: &MarkdownConfig, blocks: &[TextBlock], tables: &[Table]) -> (PageContent, DocumentStats) {
        let renderer = MarkdownRenderer::new(config).unwrap();
        let refs: Vec<&TextBlock> = blocks.iter().collect();
        let mut stats = DocumentStats::new();
        let page = renderer.render_page(1, &refs, blocks, tables, &mut stats);
        (page, stats)
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let blocks = vec![
            block("CHAPTER 3"),
            block("COMBAT OPTIONS\nThe hero attacks.\nThe goblin flees."),
        ];
        let (page, stats) = render(&MarkdownConfig::default(), &blocks, &[]);
        assert_eq!(
            page.elements,
            vec![
                Element::Heading {
                    level: 1,
                    text: "CHAPTER 3".into()
                },
                Element::Heading {
                    level: 2,
                    text: "COMBAT OPTIONS".into()
                },
                Element::Paragraph {
                    text: "The hero attacks.\nThe goblin flees.".into(),
                    flagged: false
                },
            ]
        );
        assert_eq!(stats.headings, 2);
    }

    #[test]
    fn test_blank_line_splits_paragraphs() {
        let (page, _) = render(
            &MarkdownConfig::default(),
            &[block("First part.\n\n\nSecond part.")],
            &[],
        );
        assert_eq!(page.elements.len(), 2);
        assert_eq!(page.to_markdown(), "First part.\n\nSecond part.");
    }

    #[test]
    fn test_flagged_block() {
        let mut b = block("Note: this is important.");
        b.has_indicator = true;
        let (page, _) = render(&MarkdownConfig::default(), &[b], &[]);
        assert!(matches!(
            page.elements[0],
            Element::Paragraph { flagged: true, .. }
        ));
    }

    #[test]
    fn test_font_size_heading_single_line_only() {
        let blocks = vec![
            block("Spells and Rituals").with_font_size(18.0),
            block("Two big lines\nof display text").with_font_size(18.0),
            block("Plenty of ordinary body text sits on this page to set the modal size.")
                .with_font_size(10.0),
        ];
        let (page, _) = render(&MarkdownConfig::default(), &blocks, &[]);
        assert_eq!(
            page.elements[0],
            Element::Heading {
                level: 3,
                text: "Spells and Rituals".into()
            }
        );
        assert!(matches!(page.elements[1], Element::Paragraph { .. }));
    }

    #[test]
    fn test_tables_follow_text_and_bad_tables_are_skipped() {
        let good = Table::new(
            1,
            BBox::default(),
            vec![vec!["a".into(), "b".into()], vec!["1".into(), "2".into()]],
        );
        let bad = Table::new(1, BBox::default(), vec![]);
        let (page, stats) = render(
            &MarkdownConfig::default(),
            &[block("Body text.")],
            &[bad, good],
        );
        assert_eq!(page.elements.len(), 2);
        assert!(matches!(page.elements[1], Element::Table { .. }));
        assert_eq!(stats.skipped_tables, 1);
    }

    #[test]
    fn test_tables_disabled() {
        let mut config = MarkdownConfig::default();
        config.text_cleaning.render_tables = false;
        let table = Table::new(1, BBox::default(), vec![vec!["a".into()]]);
        let (page, stats) = render(&config, &[], &[table]);
        assert!(page.elements.is_empty());
        assert_eq!(stats.skipped_tables, 0);
    }

    #[test]
    fn test_word_split_across_blocks_is_rejoined() {
        let blocks = vec![
            block("The adventurers explore the docu-"),
            block("ment archive of the ancient city."),
            block("Anglo-"),
            block("Saxon runes stay apart."),
        ];
        let (page, _) = render(&MarkdownConfig::default(), &blocks, &[]);
        assert_eq!(
            page.to_markdown(),
            "The adventurers explore the document archive of the ancient city.\n\nAnglo-\n\nSaxon runes stay apart."
        );
    }

    #[test]
    fn test_block_break_kept_without_dehyphenation() {
        let mut config = MarkdownConfig::default();
        config.text_cleaning.dehyphenate = false;
        let blocks = vec![block("explore the docu-"), block("ment archive")];
        let (page, _) = render(&config, &blocks, &[]);
        assert_eq!(page.elements.len(), 2);
    }

    #[test]
    fn test_hyphen_break() {
        assert_eq!(hyphen_break("the docu-"), Some(8));
        assert_eq!(hyphen_break("the docu- "), Some(8));
        assert_eq!(hyphen_break("1990-"), None);
        assert_eq!(hyphen_break("-"), None);
        assert_eq!(hyphen_break("plain"), None);
    }
}
