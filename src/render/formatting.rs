//! Inline formatting: bullets, bold and italic markers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{Formatting, MarkdownConfig};

static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[\u{2022}\u{00B7}\u{25AA}]\s*").unwrap());
static BOLD_STARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^*])\*([^*\s](?:[^*]*[^*\s])?)\*([^*]|$)").unwrap());
static ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w])_([^_\s](?:[^_]*[^_\s])?)_([^\w]|$)").unwrap());

/// Applies the `preserve_formatting` rules to one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineFormatter {
    keep_bold: bool,
    keep_italic: bool,
    keep_lists: bool,
}

impl InlineFormatter {
    /// Create a formatter from markdown settings.
    pub fn new(config: &MarkdownConfig) -> Self {
        Self {
            keep_bold: config.preserves(Formatting::Bold),
            keep_italic: config.preserves(Formatting::Italic),
            keep_lists: config.preserves(Formatting::Lists),
        }
    }

    /// Keep everything.
    pub fn preserve_all() -> Self {
        Self {
            keep_bold: true,
            keep_italic: true,
            keep_lists: true,
        }
    }

    /// Rewrite a single line.
    ///
    /// Leading bullets become `- ` list markers, or are dropped when lists are not
    /// kept. Bold and italic markers are stripped unless kept.
    pub fn apply(&self, line: &str) -> String {
        let marker = if self.keep_lists { "- " } else { "" };
        let mut result = BULLET.replace(line, marker).into_owned();

        if !self.keep_bold {
            result = BOLD_STARS.replace_all(&result, "$1").into_owned();
            result = BOLD_UNDERSCORES.replace_all(&result, "$1").into_owned();
        }

        if !self.keep_italic {
            result = replace_until_stable(&ITALIC_STAR, &result);
            result = replace_until_stable(&ITALIC_UNDERSCORE, &result);
        }

        result
    }
}

/// Adjacent spans share their delimiter character, so one pass can miss every
/// other span.
fn replace_until_stable(re: &Regex, text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = re.replace_all(&current, "$1$2$3").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}
