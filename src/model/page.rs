//! Page-level types.

use super::{BBox, Table};
use serde::{Deserialize, Serialize};

/// A positioned run of text produced by the parsing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Bounding box in page coordinates
    pub bbox: BBox,

    /// Page number (1-indexed)
    pub page: u32,

    /// Raw text; lines are separated by `\n`
    pub text: String,

    /// Dominant font size in points, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Set when the text contains one of the configured block indicators
    #[serde(default)]
    pub has_indicator: bool,
}

impl TextBlock {
    /// Create a block without a font-size hint.
    pub fn new(page: u32, bbox: BBox, text: impl Into<String>) -> Self {
        Self {
            bbox,
            page,
            text: text.into(),
            font_size: None,
            has_indicator: false,
        }
    }

    /// Attach a font-size hint.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    /// Number of characters in the trimmed text.
    pub fn text_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// Identity of a block within a document: page number and index in that page's block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    pub page: u32,
    pub index: usize,
}

/// A single page as delivered by the parsing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Text blocks, in extraction order
    pub blocks: Vec<TextBlock>,

    /// Tables detected on the page
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Page {
    /// Create a new empty page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            blocks: Vec::new(),
            tables: Vec::new(),
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0)
    }

    /// Add a text block.
    pub fn add_block(&mut self, block: TextBlock) {
        self.blocks.push(block);
    }

    /// Add a detected table.
    pub fn add_table(&mut self, table: Table) {
        self.tables.push(table);
    }

    /// Check if the page has no text and no tables.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.tables.is_empty()
    }

    /// Get page dimensions as (width, height) tuple.
    pub fn dimensions(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}
