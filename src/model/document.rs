//! Document-level types.

use super::Page;
use serde::{Deserialize, Serialize};

/// What the parsing collaborator returns for one file; also the cached value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Pages in document order
    pub pages: Vec<Page>,
}

impl RawExtraction {
    /// Create an extraction from pages.
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total text blocks over all pages, before any filtering.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }

    /// Total detected tables over all pages.
    pub fn table_count(&self) -> usize {
        self.pages.iter().map(|p| p.tables.len()).sum()
    }
}

/// One piece of assembled page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Heading line; level 1 (chapter), 2 (section) or 3 (font-size).
    Heading { level: u8, text: String },
    /// Body text of one block.
    Paragraph {
        text: String,
        /// The source block contained a block indicator
        #[serde(default)]
        flagged: bool,
    },
    /// A rendered markdown table.
    Table { markdown: String },
}

impl Element {
    /// Markdown text of this element, without surrounding blank lines.
    pub fn to_markdown(&self) -> String {
        match self {
            Element::Heading { level, text } => {
                format!("{} {}", "#".repeat(usize::from(*level).max(1)), text)
            }
            Element::Paragraph { text, .. } => text.clone(),
            Element::Table { markdown } => markdown.clone(),
        }
    }
}

/// Assembled content of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// Page number (1-indexed)
    pub number: u32,

    /// Elements in reading order; tables follow the page's text
    pub elements: Vec<Element>,
}

impl PageContent {
    /// Create empty page content.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            elements: Vec::new(),
        }
    }

    /// Markdown of the page body.
    pub fn to_markdown(&self) -> String {
        self.elements
            .iter()
            .map(Element::to_markdown)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Statistics collected while assembling a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStats {
    /// Total number of pages
    pub total_pages: usize,

    /// Text blocks kept after the minimum-length filter
    pub text_blocks: usize,

    /// Tables detected by the parsing collaborator
    pub tables: usize,

    /// Heading elements emitted
    pub headings: usize,

    /// Blocks removed as repeating headers or footers
    pub suppressed_blocks: usize,

    /// Blocks containing a block indicator
    pub flagged_blocks: usize,

    /// Tables that could not be rendered
    pub skipped_tables: usize,
}

impl DocumentStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }
}

/// The cleaned, ordered and classified content of a whole PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Pages in document order
    pub pages: Vec<PageContent>,

    /// Derived statistics
    pub stats: DocumentStats,

    /// Marker inserted between pages; `{page}` becomes the following page number
    pub page_separator: String,
}

impl Document {
    /// Get the number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Check if no page produced any element.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.elements.is_empty())
    }

    /// Iterate over all elements in order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.pages.iter().flat_map(|p| p.elements.iter())
    }

    /// Assemble the final markdown text.
    ///
    /// Elements are separated by one blank line; the page separator sits between
    /// pages as its own paragraph. The result ends with exactly one newline, or is
    /// empty when there is no content.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 && !self.page_separator.is_empty() {
                let marker = self
                    .page_separator
                    .replace("{page}", &page.number.to_string());
                push_paragraph(&mut out, marker.trim());
            }
            push_paragraph(&mut out, &page.to_markdown());
        }

        let trimmed = out.trim();
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}\n", trimmed)
        }
    }
}

fn push_paragraph(out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: u32, elements: Vec<Element>) -> PageContent {
        PageContent { number, elements }
    }

    fn para(text: &str) -> Element {
        Element::Paragraph {
            text: text.into(),
            flagged: false,
        }
    }

    #[test]
    fn test_element_markdown() {
        let h = Element::Heading {
            level: 2,
            text: "COMBAT".into(),
        };
        assert_eq!(h.to_markdown(), "## COMBAT");
        assert_eq!(para("body").to_markdown(), "body");
    }

    #[test]
    fn test_document_markdown_with_separator() {
        let doc = Document {
            pages: vec![
                page(
                    1,
                    vec![
                        Element::Heading {
                            level: 1,
                            text: "CHAPTER 1".into(),
                        },
                        para("First page."),
                    ],
                ),
                page(2, vec![para("Second page.")]),
            ],
            stats: DocumentStats::default(),
            page_separator: "<!-- page {page} -->".into(),
        };
        assert_eq!(
            doc.to_markdown(),
            "# CHAPTER 1\n\nFirst page.\n\n<!-- page 2 -->\n\nSecond page.\n"
        );
    }

    #[test]
    fn test_document_markdown_without_separator() {
        let doc = Document {
            pages: vec![page(1, vec![para("a")]), page(2, vec![]), page(3, vec![para("b")])],
            stats: DocumentStats::default(),
            page_separator: String::new(),
        };
        assert_eq!(doc.to_markdown(), "a\n\nb\n");
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::default();
        assert!(doc.is_empty());
        assert_eq!(doc.to_markdown(), "");
    }
}
