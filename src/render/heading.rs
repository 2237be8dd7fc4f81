//! Heading classification.

use std::collections::HashMap;

use regex::Regex;

use crate::config::MarkdownConfig;
use crate::error::{Error, Result};
use crate::model::TextBlock;

/// Result of classifying one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 = chapter, 2 = section, 3 = font-size heading, 0 = body text
    pub level: u8,
    /// The line text, trimmed
    pub text: String,
}

impl Heading {
    /// Whether the line is a heading at all.
    pub fn is_heading(&self) -> bool {
        self.level > 0
    }
}

/// Level assigned to lines that only qualify by font size.
pub const FONT_SIZE_LEVEL: u8 = 3;

/// Decides whether a line is a chapter heading, a section heading or body text.
///
/// Chapter patterns are tried first, then section patterns, each in list order.
/// A line with no pattern match can still become a heading when its font is at
/// least `heading_font_ratio` times the page's body size; explicit patterns
/// always win over font size.
#[derive(Debug, Clone)]
pub struct HeadingClassifier {
    chapter_patterns: Vec<Regex>,
    section_patterns: Vec<Regex>,
    font_ratio: f32,
    max_length: usize,
}

impl HeadingClassifier {
    /// Compile the configured patterns.
    pub fn new(config: &MarkdownConfig) -> Result<Self> {
        Ok(Self {
            chapter_patterns: compile(&config.chapter_patterns)?,
            section_patterns: compile(&config.section_patterns)?,
            font_ratio: config.heading_font_ratio,
            max_length: config.max_heading_length,
        })
    }

    /// Classify a normalized line.
    ///
    /// `font_size` is the line's size hint and `body_size` the page's modal body
    /// size; either may be missing, which disables the font-size rule.
    pub fn classify(&self, line: &str, font_size: Option<f32>, body_size: Option<f32>) -> Heading {
        let text = line.trim();
        let heading = |level| Heading {
            level,
            text: text.to_string(),
        };

        if text.is_empty() {
            return heading(0);
        }
        if self.chapter_patterns.iter().any(|re| re.is_match(text)) {
            return heading(1);
        }
        if self.section_patterns.iter().any(|re| re.is_match(text)) {
            return heading(2);
        }
        if self.is_large_font(text, font_size, body_size) {
            return heading(FONT_SIZE_LEVEL);
        }
        heading(0)
    }

    fn is_large_font(&self, text: &str, font_size: Option<f32>, body_size: Option<f32>) -> bool {
        if self.font_ratio <= 0.0 || text.chars().count() > self.max_length {
            return false;
        }
        // A heading needs at least one letter; "42" in a big font is a page number.
        if !text.chars().any(char::is_alphabetic) {
            return false;
        }
        match (font_size, body_size) {
            (Some(size), Some(body)) if body > 0.0 => size >= body * self.font_ratio,
            _ => false,
        }
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|source| Error::Pattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Modal font size of a page's blocks, weighted by text length.
///
/// Sizes are bucketed to 0.5pt. Returns `None` when no block carries a size hint.
pub fn body_font_size(blocks: &[TextBlock]) -> Option<f32> {
    let mut histogram: HashMap<i32, usize> = HashMap::new();
    for block in blocks {
        if let Some(size) = block.font_size.filter(|s| *s > 0.0) {
            let key = (size * 2.0).round() as i32;
            *histogram.entry(key).or_insert(0) += block.text_len().max(1);
        }
    }
    histogram
        .into_iter()
        .max_by(|(ka, ca), (kb, cb)| ca.cmp(cb).then(kb.cmp(ka)))
        .map(|(key, _)| key as f32 / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn classifier() -> HeadingClassifier {
        HeadingClassifier::new(&MarkdownConfig::default()).unwrap()
    }

    #[test]
    fn test_chapter_section_body() {
        let c = classifier();
        assert_eq!(c.classify("CHAPTER 3", None, None).level, 1);
        assert_eq!(c.classify("Chapter 12: The Road", None, None).level, 1);
        assert_eq!(c.classify("COMBAT OPTIONS", None, None).level, 2);
        assert_eq!(c.classify("The hero attacks.", None, None).level, 0);
        assert!(!c.classify("", None, None).is_heading());
    }

    #[test]
    fn test_chapter_patterns_win_over_section() {
        // "CHAPTER" alone would match the all-caps section pattern too.
        let c = HeadingClassifier::new(&MarkdownConfig {
            chapter_patterns: vec![r"^CHAPTER".into()],
            ..MarkdownConfig::default()
        })
        .unwrap();
        assert_eq!(c.classify("CHAPTER", None, None).level, 1);
    }

    #[test]
    fn test_heading_text_is_trimmed() {
        let h = classifier().classify("  COMBAT OPTIONS  ", None, None);
        assert_eq!(h.text, "COMBAT OPTIONS");
    }

    #[test]
    fn test_font_size_candidate() {
        let c = classifier();
        assert_eq!(
            c.classify("Spells and Rituals", Some(16.0), Some(10.0)).level,
            FONT_SIZE_LEVEL
        );
        assert_eq!(c.classify("Spells and Rituals", Some(11.0), Some(10.0)).level, 0);
        assert_eq!(c.classify("Spells and Rituals", Some(16.0), None).level, 0);
        assert_eq!(c.classify("42", Some(20.0), Some(10.0)).level, 0);
    }

    #[test]
    fn test_pattern_beats_font_size() {
        let c = classifier();
        // Big font, but the chapter pattern decides the level.
        assert_eq!(c.classify("CHAPTER 2", Some(30.0), Some(10.0)).level, 1);
        assert_eq!(c.classify("BESTIARY", Some(30.0), Some(10.0)).level, 2);
    }

    #[test]
    fn test_font_rule_disabled() {
        let c = HeadingClassifier::new(&MarkdownConfig {
            heading_font_ratio: 0.0,
            ..MarkdownConfig::default()
        })
        .unwrap();
        assert_eq!(c.classify("Spells", Some(30.0), Some(10.0)).level, 0);
    }

    #[test]
    fn test_long_lines_are_not_font_headings() {
        let c = classifier();
        let long = "word ".repeat(40);
        assert_eq!(c.classify(&long, Some(30.0), Some(10.0)).level, 0);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = HeadingClassifier::new(&MarkdownConfig {
            section_patterns: vec!["([".into()],
            ..MarkdownConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn test_body_font_size() {
        let blocks = vec![
            TextBlock::new(1, BBox::default(), "A long paragraph of body text here.")
                .with_font_size(10.0),
            TextBlock::new(1, BBox::default(), "Another body paragraph.").with_font_size(10.2),
            TextBlock::new(1, BBox::default(), "Title").with_font_size(18.0),
            TextBlock::new(1, BBox::default(), "no hint"),
        ];
        assert_eq!(body_font_size(&blocks), Some(10.0));
        assert_eq!(body_font_size(&[]), None);
    }
}
