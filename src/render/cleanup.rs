//! Text normalization for extracted blocks.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::TextCleaning;

static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Which normalization steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// NFC, ligature expansion and compatibility characters
    pub unicode: bool,
    /// Join words hyphenated across a line break
    pub dehyphenate: bool,
    /// Curly quotes to straight quotes
    pub quotes: bool,
    /// Collapse spaces and blank lines
    pub whitespace: bool,
}

impl NormalizeOptions {
    /// Every step enabled.
    pub fn all() -> Self {
        Self {
            unicode: true,
            dehyphenate: true,
            quotes: true,
            whitespace: true,
        }
    }

    /// Every step disabled.
    pub fn none() -> Self {
        Self {
            unicode: false,
            dehyphenate: false,
            quotes: false,
            whitespace: false,
        }
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl From<&TextCleaning> for NormalizeOptions {
    fn from(cleaning: &TextCleaning) -> Self {
        Self {
            unicode: cleaning.normalize_unicode,
            dehyphenate: cleaning.dehyphenate,
            quotes: cleaning.normalize_quotes,
            whitespace: cleaning.normalize_whitespace,
        }
    }
}

/// Cleans raw block text.
///
/// Steps run in a fixed order: Unicode, de-hyphenation, quotes, whitespace.
/// Disabled steps are skipped.
pub struct TextNormalizer {
    options: NormalizeOptions,
    ligature_map: Vec<(char, &'static str)>,
    compat_map: Vec<(char, &'static str)>,
}

impl TextNormalizer {
    /// Create a normalizer with the given options.
    pub fn new(options: NormalizeOptions) -> Self {
        Self {
            options,
            ligature_map: vec![
                ('\u{FB00}', "ff"),
                ('\u{FB01}', "fi"),
                ('\u{FB02}', "fl"),
                ('\u{FB03}', "ffi"),
                ('\u{FB04}', "ffl"),
                ('\u{FB05}', "st"),
                ('\u{FB06}', "st"),
            ],
            compat_map: vec![
                ('\u{00A0}', " "), // no-break space
                ('\u{202F}', " "), // narrow no-break space
                ('\u{2026}', "..."),
                ('\u{00AD}', ""), // soft hyphen
                ('\u{200B}', ""),
                ('\u{200C}', ""),
                ('\u{200D}', ""),
                ('\u{FEFF}', ""),
            ],
        }
    }

    /// Create a normalizer from the configured cleaning toggles.
    pub fn from_config(cleaning: &TextCleaning) -> Self {
        Self::new(NormalizeOptions::from(cleaning))
    }

    /// The active options.
    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    /// Normalize one block of text.
    pub fn normalize(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.options.unicode {
            result = self.normalize_unicode(&result);
        }

        if self.options.dehyphenate {
            result = dehyphenate(&result);
        }

        if self.options.quotes {
            result = normalize_quotes(&result);
        }

        if self.options.whitespace {
            result = normalize_whitespace(&result);
        }

        result
    }

    fn normalize_unicode(&self, text: &str) -> String {
        let nfc: String = text.nfc().collect();
        let mut out = String::with_capacity(nfc.len());
        for c in nfc.chars() {
            if let Some((_, rep)) = self.ligature_map.iter().find(|(l, _)| *l == c) {
                out.push_str(rep);
            } else if let Some((_, rep)) = self.compat_map.iter().find(|(k, _)| *k == c) {
                out.push_str(rep);
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(NormalizeOptions::default())
    }
}

/// Join words split by a hyphen at the end of a line.
///
/// `letter '-' '\n' lowercase` becomes the two letters joined (`\r\n` counts as a
/// line break too). The continuation
/// must start the next line directly; indentation disqualifies the join. Trailing
/// spaces after the hyphen are layout noise and are dropped with it. The previous
/// output character is checked, so chains such as `a-\nb-\nc` collapse in one
/// pass and a second pass changes nothing.
pub fn dehyphenate(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '-' && out.chars().last().is_some_and(char::is_alphabetic) {
            let mut j = i + 1;
            while matches!(chars.get(j), Some(' ') | Some('\t')) {
                j += 1;
            }
            if chars.get(j) == Some(&'\r') {
                j += 1;
            }
            if chars.get(j) == Some(&'\n') && chars.get(j + 1).is_some_and(|n| n.is_lowercase()) {
                i = j + 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Replace curly quotes with straight quotes. Dashes are left alone.
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            other => other,
        })
        .collect()
}

/// Collapse runs of spaces/tabs, strip trailing whitespace on each line and keep at
/// most one blank line in a row.
pub fn normalize_whitespace(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let collapsed = SPACE_RUNS.replace_all(&unified, " ");
    let lines: Vec<&str> = collapsed.lines().map(str::trim_end).collect();
    let joined = lines.join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim_matches('\n').to_string()
}
