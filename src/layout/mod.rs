//! Page layout analysis.
//!
//! - [`LayoutAnalyzer`] turns a page's unordered blocks into reading order.
//! - [`HeaderFooterDetector`] finds running headers and footers across pages.

mod header_footer;
mod reading_order;

pub use header_footer::{
    normalize_margin_text, HeaderFooterCandidate, HeaderFooterDetector, MarginZone, Suppressions,
};
pub use reading_order::LayoutAnalyzer;
