//! Size-bounded splitting of assembled markdown.

use serde::{Deserialize, Serialize};

/// One slice of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Ordinal, starting at 1
    pub index: usize,
    pub text: String,
}

impl Chunk {
    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Splits markdown at paragraph boundaries under a byte budget.
///
/// The document is cut into units: a paragraph together with the blank lines that
/// follow it. A run of table lines is never broken, even across blank lines inside
/// the run. Units are packed greedily; a unit larger than the budget becomes a
/// chunk of its own. Concatenating the chunks yields the input exactly.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    budget: Option<usize>,
}

impl Chunker {
    /// `None` (or zero) disables chunking.
    pub fn new(budget: Option<usize>) -> Self {
        Self {
            budget: budget.filter(|b| *b > 0),
        }
    }

    /// The byte budget, if any.
    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    /// Split `text` into chunks.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }
        let Some(budget) = self.budget else {
            return vec![Chunk {
                index: 1,
                text: text.to_string(),
            }];
        };

        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();
        for unit in split_units(text) {
            if !current.is_empty() && current.len() + unit.len() > budget {
                pieces.push(std::mem::take(&mut current));
            }
            current.push_str(unit);
        }
        if !current.is_empty() {
            pieces.push(current);
        }

        log::debug!("Chunked {} bytes into {} chunks", text.len(), pieces.len());
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk { index: i + 1, text })
            .collect()
    }
}

/// Cut `text` into atomic units whose concatenation is `text`.
fn split_units(text: &str) -> Vec<&str> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut units = Vec::new();
    let mut start = 0usize;
    let mut offset = 0usize;

    for (i, line) in lines.iter().enumerate() {
        offset += line.len();
        if is_blank(line) {
            // A blank line ends the unit when the next line starts a new paragraph,
            // unless it sits between two table lines.
            let next = lines.get(i + 1);
            let next_is_content = next.is_some_and(|l| !is_blank(l));
            let inside_table = next.is_some_and(|l| is_table_line(l))
                && previous_content(&lines[..i]).is_some_and(is_table_line);
            if next_is_content && !inside_table {
                units.push(&text[start..offset]);
                start = offset;
            }
        }
    }
    if start < text.len() {
        units.push(&text[start..]);
    }
    units
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn previous_content<'a>(lines: &[&'a str]) -> Option<&'a str> {
    lines.iter().rev().find(|l| !is_blank(l)).copied()
}
