//! Table types.

use super::BBox;
use serde::{Deserialize, Serialize};

/// A table detected on a page: a grid of cell strings.
///
/// Rows may have different lengths as delivered; [`Table::column_count`] is the
/// widest row and renderers pad shorter rows with empty cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Page number (1-indexed)
    pub page: u32,

    /// Bounding box in page coordinates
    pub bbox: BBox,

    /// Cell text, row-major; the first row is the header
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create a new table.
    pub fn new(page: u32, bbox: BBox, rows: Vec<Vec<String>>) -> Self {
        Self { page, bbox, rows }
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get cell text, `None` when outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}
