//! Grouping of text spans into lines and lines into blocks.

use std::cmp::Ordering;

use crate::model::{BBox, TextBlock};

use super::content::{is_spaceless_script_char, TextSpan};

/// Fallback line spacing when a page has too few lines to measure.
const DEFAULT_LINE_SPACING: f32 = 12.0;

/// One visual line, or one column's piece of it.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Spans sorted by x
    pub spans: Vec<TextSpan>,
    pub baseline: f32,
    /// Character-weighted mean font size
    pub font_size: f32,
    pub bbox: BBox,
}

impl TextLine {
    /// Create a line from spans on one baseline.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));

        let total_chars: usize = spans.iter().map(|s| s.text.chars().count()).sum();
        let font_size = if total_chars > 0 {
            spans
                .iter()
                .map(|s| s.font_size * s.text.chars().count() as f32)
                .sum::<f32>()
                / total_chars as f32
        } else {
            spans.first().map(|s| s.font_size).unwrap_or(0.0)
        };

        let bbox = spans
            .iter()
            .map(|s| BBox::new(s.x0, s.top(), s.x1, s.bottom()))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        let baseline = spans.first().map(|s| s.baseline).unwrap_or(0.0);

        Self {
            spans,
            baseline,
            font_size,
            bbox,
        }
    }

    /// Text of the line with spaces inserted at visible gaps.
    pub fn text(&self) -> String {
        let mut result = String::new();
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x0 - prev.x1;
                let char_count = span.text.chars().count();
                let avg_char_width = if char_count > 0 && span.width() > 0.0 {
                    span.width() / char_count as f32
                } else {
                    span.font_size * 0.5
                };

                let prev_last = prev.text.chars().last();
                let curr_first = span.text.chars().next();
                let both_spaceless = prev_last.is_some_and(is_spaceless_script_char)
                    && curr_first.is_some_and(is_spaceless_script_char);
                let has_space = prev_last.is_some_and(char::is_whitespace)
                    || curr_first.is_some_and(char::is_whitespace);

                if gap > avg_char_width * 0.2 && !both_spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }
        result
    }
}

/// Group spans sharing a baseline (within 30% of the font size) into lines, and
/// split each line wherever the horizontal gap is wide enough to be a gutter.
pub fn group_into_lines(spans: Vec<TextSpan>) -> Vec<TextLine> {
    let mut spans = spans;
    spans.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
    });

    let mut rows: Vec<Vec<TextSpan>> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.baseline - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                }
                current_y = Some(span.baseline);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }

    let mut lines = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));
        let mut segment: Vec<TextSpan> = Vec::new();
        for span in row {
            if let Some(prev) = segment.last() {
                let gutter = (prev.font_size.max(span.font_size) * 1.5).max(10.0);
                if span.x0 - prev.x1 > gutter {
                    lines.push(TextLine::from_spans(std::mem::take(&mut segment)));
                }
            }
            segment.push(span);
        }
        if !segment.is_empty() {
            lines.push(TextLine::from_spans(segment));
        }
    }
    lines
}

/// A block under construction.
struct OpenBlock {
    lines: Vec<TextLine>,
    bbox: BBox,
}

impl OpenBlock {
    fn last(&self) -> &TextLine {
        &self.lines[self.lines.len() - 1]
    }

    /// Whether `line` continues this block: directly below the last line,
    /// overlapping it horizontally, with a similar font size and left edge.
    fn accepts(&self, line: &TextLine, max_step: f32) -> bool {
        let last = self.last();
        let step = line.baseline - last.baseline;
        if step <= 0.0 || step > max_step {
            return false;
        }
        if line.bbox.horizontal_overlap(&self.bbox) <= 0.0 {
            return false;
        }
        if (line.font_size - last.font_size).abs() > 1.0 {
            return false;
        }
        (line.bbox.x0 - last.bbox.x0).abs() <= 20.0
    }

    fn into_block(self, page: u32) -> TextBlock {
        let text = self
            .lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n");
        let chars: usize = self.lines.iter().map(|l| l.text().chars().count()).sum();
        let font_size = if chars > 0 {
            self.lines
                .iter()
                .map(|l| l.font_size * l.text().chars().count() as f32)
                .sum::<f32>()
                / chars as f32
        } else {
            self.last().font_size
        };
        let mut block = TextBlock::new(page, self.bbox, text);
        if font_size > 0.0 {
            block = block.with_font_size(font_size);
        }
        block
    }
}

/// Group lines into paragraph blocks.
///
/// A new block starts when the vertical step exceeds 1.5 times the page's
/// average line spacing, the font size changes by more than 1pt, or the left
/// edge moves by more than 20pt.
pub fn group_into_blocks(lines: Vec<TextLine>, page: u32) -> Vec<TextBlock> {
    let mut lines = lines;
    lines.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });

    let max_step = average_line_spacing(&lines) * 1.5;
    let mut blocks: Vec<OpenBlock> = Vec::new();

    for line in lines {
        match blocks.iter_mut().rev().find(|b| b.accepts(&line, max_step)) {
            Some(block) => {
                block.bbox = block.bbox.union(&line.bbox);
                block.lines.push(line);
            }
            None => blocks.push(OpenBlock {
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    blocks.into_iter().map(|b| b.into_block(page)).collect()
}

/// Mean distance between each line and the nearest overlapping line above it.
fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let mut spacings = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let above = lines[..i]
            .iter()
            .rev()
            .filter(|l| l.baseline < line.baseline - 0.1)
            .find(|l| l.bbox.horizontal_overlap(&line.bbox) > 0.0);
        if let Some(above) = above {
            spacings.push(line.baseline - above.baseline);
        }
    }
    if spacings.is_empty() {
        return DEFAULT_LINE_SPACING;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}
