//! Document model types.
//!
//! [`Page`], [`TextBlock`] and [`Table`] are what the parsing collaborator
//! produces; [`Document`] is the assembled, cleaned result of the pipeline.

mod document;
mod geometry;
mod page;
mod table;

pub use document::{Document, DocumentStats, Element, PageContent, RawExtraction};
pub use geometry::BBox;
pub use page::{BlockId, Page, TextBlock};
pub use table::Table;
