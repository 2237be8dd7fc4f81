//! Running header and footer detection.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ExtractionConfig;
use crate::model::{BBox, BlockId, Page};

static PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bpage\s*\d+(\s*(of|/)\s*\d+)?\b").unwrap());
static N_OF_M: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\s*(of|/)\s*\d+\b").unwrap());
static TRAILING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\d+$").unwrap());

/// Which margin a block sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginZone {
    Header,
    Footer,
}

/// Confirmed header/footer blocks, keyed by block identity.
pub type Suppressions = HashMap<BlockId, MarginZone>;

/// Margin text normalized for comparison, with every place it occurred.
#[derive(Debug, Clone, Default)]
pub struct HeaderFooterCandidate {
    /// Normalized text shared by all occurrences
    pub text: String,
    /// Pages the text appeared on
    pub pages: BTreeSet<u32>,
    /// Every occurrence and its zone
    pub occurrences: Vec<(BlockId, MarginZone)>,
}

impl HeaderFooterCandidate {
    /// Number of distinct pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Finds text that repeats in the top or bottom margin across pages.
#[derive(Debug, Clone)]
pub struct HeaderFooterDetector {
    margin: f32,
    repeat_ratio: f32,
    min_pages: usize,
}

impl HeaderFooterDetector {
    /// Create a detector from extraction settings.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            margin: config.header_footer_margin,
            repeat_ratio: config.header_footer_repeat_ratio,
            min_pages: config.header_footer_min_pages,
        }
    }

    /// Override the margin fraction.
    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    /// Override the repetition threshold.
    pub fn with_repeat_ratio(mut self, ratio: f32) -> Self {
        self.repeat_ratio = ratio;
        self
    }

    /// Override the minimum page count.
    pub fn with_min_pages(mut self, pages: usize) -> Self {
        self.min_pages = pages;
        self
    }

    /// Zone of a box on a page of the given height, if it lies fully inside a margin.
    pub fn zone(&self, bbox: &BBox, page_height: f32) -> Option<MarginZone> {
        if page_height <= 0.0 {
            return None;
        }
        if bbox.y1 <= page_height * self.margin {
            Some(MarginZone::Header)
        } else if bbox.y0 >= page_height * (1.0 - self.margin) {
            Some(MarginZone::Footer)
        } else {
            None
        }
    }

    /// Group margin blocks by normalized text.
    pub fn candidates(&self, pages: &[Page]) -> Vec<HeaderFooterCandidate> {
        let mut groups: HashMap<String, HeaderFooterCandidate> = HashMap::new();
        for page in pages {
            for (index, block) in page.blocks.iter().enumerate() {
                let Some(zone) = self.zone(&block.bbox, page.height) else {
                    continue;
                };
                let key = normalize_margin_text(&block.text);
                let candidate = groups
                    .entry(key.clone())
                    .or_insert_with(|| HeaderFooterCandidate {
                        text: key,
                        ..Default::default()
                    });
                candidate.pages.insert(page.number);
                candidate.occurrences.push((
                    BlockId {
                        page: page.number,
                        index,
                    },
                    zone,
                ));
            }
        }

        let mut candidates: Vec<_> = groups.into_values().collect();
        candidates.sort_by(|a, b| a.text.cmp(&b.text));
        candidates
    }

    /// Blocks that belong to a repeating header or footer.
    ///
    /// A candidate is confirmed when it appears on more than
    /// `repeat_ratio * pages.len()` pages. Documents shorter than the minimum page
    /// count never have anything suppressed.
    pub fn detect(&self, pages: &[Page]) -> Suppressions {
        let mut suppressed = Suppressions::new();
        if pages.is_empty() || pages.len() < self.min_pages {
            log::debug!(
                "Header/footer detection skipped: {} pages (minimum {})",
                pages.len(),
                self.min_pages
            );
            return suppressed;
        }

        let threshold = self.repeat_ratio * pages.len() as f32;
        for candidate in self.candidates(pages) {
            if candidate.page_count() as f32 > threshold {
                log::debug!(
                    "Repeating margin text {:?} on {} of {} pages",
                    candidate.text,
                    candidate.page_count(),
                    pages.len()
                );
                suppressed.extend(candidate.occurrences);
            }
        }
        suppressed
    }
}

/// Normalize margin text so that running headers compare equal across pages.
///
/// Lowercases, collapses whitespace, removes page markers ("page 3", "3 of 10")
/// and trailing numbers, and trims surrounding punctuation.
pub fn normalize_margin_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let collapsed = lower.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_marker = PAGE_MARKER.replace_all(&collapsed, "");
    let without_counter = N_OF_M.replace_all(&without_marker, "");
    let trimmed = trim_symbols(&without_counter);
    let without_number = TRAILING_NUMBER.replace(trimmed, "");
    let result = trim_symbols(&without_number);
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn trim_symbols(text: &str) -> &str {
    text.trim_matches(|c: char| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextBlock;

    fn detector() -> HeaderFooterDetector {
        HeaderFooterDetector::new(&ExtractionConfig::default())
    }

    fn page_with(number: u32, blocks: Vec<(&str, f32, f32)>) -> Page {
        let mut page = Page::new(number, 600.0, 800.0);
        for (text, y0, y1) in blocks {
            page.add_block(TextBlock::new(number, BBox::new(50.0, y0, 550.0, y1), text));
        }
        page
    }

    #[test]
    fn test_normalize_margin_text() {
        assert_eq!(normalize_margin_text("42"), "");
        assert_eq!(normalize_margin_text("Page 42"), "");
        assert_eq!(normalize_margin_text("page 1"), "");
        assert_eq!(normalize_margin_text("Page 3 of 10"), "");
        assert_eq!(normalize_margin_text("Document Title"), "document title");
        assert_eq!(normalize_margin_text("Chapter 5"), "chapter");
        assert_eq!(normalize_margin_text("  Fabula   Ultima | 12 "), "fabula ultima");
        assert_eq!(normalize_margin_text("- 7 -"), "");
    }

    #[test]
    fn test_zones() {
        let d = detector();
        assert_eq!(
            d.zone(&BBox::new(0.0, 10.0, 100.0, 70.0), 800.0),
            Some(MarginZone::Header)
        );
        assert_eq!(
            d.zone(&BBox::new(0.0, 730.0, 100.0, 780.0), 800.0),
            Some(MarginZone::Footer)
        );
        // Crosses into the body.
        assert_eq!(d.zone(&BBox::new(0.0, 60.0, 100.0, 120.0), 800.0), None);
        assert_eq!(d.zone(&BBox::new(0.0, 300.0, 100.0, 320.0), 800.0), None);
    }

    #[test]
    fn test_page_of_n_footer_suppressed_one_off_kept() {
        let pages: Vec<Page> = (1..=10)
            .map(|n| {
                let footer = format!("Page {n} of 10");
                let mut page = page_with(n, vec![("Body text of the page.", 200.0, 400.0)]);
                page.add_block(TextBlock::new(
                    n,
                    BBox::new(250.0, 760.0, 350.0, 775.0),
                    footer,
                ));
                if n == 4 {
                    page.add_block(TextBlock::new(
                        n,
                        BBox::new(50.0, 740.0, 200.0, 755.0),
                        "Special errata notice",
                    ));
                }
                page
            })
            .collect();

        let suppressed = detector().detect(&pages);
        assert_eq!(suppressed.len(), 10);
        for n in 1..=10 {
            assert_eq!(
                suppressed.get(&BlockId { page: n, index: 1 }),
                Some(&MarginZone::Footer)
            );
        }
        assert!(!suppressed.contains_key(&BlockId { page: 4, index: 2 }));
        assert!(!suppressed.contains_key(&BlockId { page: 1, index: 0 }));
    }

    #[test]
    fn test_body_text_never_suppressed() {
        let pages: Vec<Page> = (1..=5)
            .map(|n| page_with(n, vec![("Repeated body line", 300.0, 320.0)]))
            .collect();
        assert!(detector().detect(&pages).is_empty());
    }

    #[test]
    fn test_repetition_threshold() {
        // Header on exactly half of the pages is not "more than half".
        let pages: Vec<Page> = (1..=4)
            .map(|n| {
                if n <= 2 {
                    page_with(n, vec![("Running Title", 10.0, 30.0)])
                } else {
                    page_with(n, vec![])
                }
            })
            .collect();
        assert!(detector().detect(&pages).is_empty());
        assert_eq!(detector().with_repeat_ratio(0.4).detect(&pages).len(), 2);
    }

    #[test]
    fn test_single_page_keeps_margins() {
        let pages = vec![page_with(1, vec![("Running Title", 10.0, 30.0)])];
        assert!(detector().detect(&pages).is_empty());
        assert_eq!(detector().with_min_pages(1).detect(&pages).len(), 1);
    }

    #[test]
    fn test_two_page_header_suppressed() {
        let pages: Vec<Page> = (1..=2)
            .map(|n| {
                page_with(
                    n,
                    vec![
                        ("Monster Manual Running Header", 20.0, 40.0),
                        ("Body text of the page.", 200.0, 400.0),
                    ],
                )
            })
            .collect();
        let suppressed = detector().detect(&pages);
        assert_eq!(suppressed.len(), 2);
        for n in 1..=2 {
            assert_eq!(
                suppressed.get(&BlockId { page: n, index: 0 }),
                Some(&MarginZone::Header)
            );
        }
        assert!(detector().with_min_pages(3).detect(&pages).is_empty());
    }

    #[test]
    fn test_candidates_grouped_across_pages() {
        let pages: Vec<Page> = (1..=3)
            .map(|n| page_with(n, vec![("Running Title", 10.0, 30.0)]))
            .map(|mut p| {
                p.blocks[0].text = format!("Running Title {}", p.number);
                p
            })
            .collect();
        let candidates = detector().candidates(&pages);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "running title");
        assert_eq!(candidates[0].page_count(), 3);
    }
}
