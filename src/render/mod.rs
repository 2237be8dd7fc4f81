//! Text cleaning, classification and markdown generation.

mod chunk;
mod cleanup;
mod formatting;
mod heading;
mod markdown;
mod table;

pub use chunk::{Chunk, Chunker};
pub use cleanup::{dehyphenate, normalize_quotes, normalize_whitespace, NormalizeOptions, TextNormalizer};
pub use formatting::InlineFormatter;
pub use heading::{body_font_size, Heading, HeadingClassifier, FONT_SIZE_LEVEL};
pub use markdown::MarkdownRenderer;
pub use table::render_table;
