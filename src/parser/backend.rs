//! PDF backend abstraction layer.
//!
//! The content interpreter only sees [`PdfBackend`]; `lopdf` types stay in
//! [`LopdfBackend`].

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use crate::error::{Error, Result};

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

impl PdfValue {
    /// Numeric value, if the operand is a number.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            PdfValue::Integer(i) => Some(*i as f32),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Build an operation; used by tests and synthetic streams.
    pub fn new(operator: &str, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.to_string(),
            operands,
        }
    }

    /// Numeric operand at `index`, if present.
    pub fn number(&self, index: usize) -> Option<f32> {
        self.operands.get(index).and_then(PdfValue::as_number)
    }
}

/// The page's MediaBox in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    /// US Letter, used when a page declares no usable MediaBox.
    pub const LETTER: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Convert a user-space point to top-left page coordinates.
    pub fn to_top_left(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.x0, self.y1 - y)
    }
}

/// Glyph advance widths of a font, in thousandths of a text-space unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    /// Bytes per character code (2 for composite fonts)
    pub code_length: usize,
    pub first_char: u32,
    pub widths: Vec<f32>,
    /// Width used for codes outside the table
    pub default_width: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            code_length: 1,
            first_char: 0,
            widths: Vec::new(),
            default_width: 500.0,
        }
    }
}

impl FontMetrics {
    /// Character codes of a shown string.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.code_length == 2 {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [b] => u32::from(*b),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }

    /// Advance width of one code.
    pub fn width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

/// Abstract interface for PDF document access.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// The page's MediaBox, inherited from ancestors when not set on the page.
    fn media_box(&self, page: PageId) -> PageBox;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Widths of a font from the page's resources.
    fn font_metrics(&self, page: PageId, font_name: &[u8]) -> FontMetrics;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path).map_err(Error::from)?;
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(Error::from)?;
        Ok(Self { doc })
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).unwrap_or(obj),
            _ => obj,
        }
    }

    fn number(&self, obj: &Object) -> Option<f32> {
        match self.resolve(obj) {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    fn page_fonts(&self, page: PageId) -> BTreeMap<Vec<u8>, &Dictionary> {
        match self.doc.get_page_fonts(page) {
            Ok(fonts) => fonts,
            Err(e) => {
                log::debug!("No fonts for page {:?}: {}", page, e);
                BTreeMap::new()
            }
        }
    }

    fn composite_metrics(&self, font: &Dictionary) -> FontMetrics {
        let mut metrics = FontMetrics {
            code_length: 2,
            default_width: 1000.0,
            ..FontMetrics::default()
        };
        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|o| self.resolve(o).as_array().ok())
            .and_then(|a| a.first())
            .and_then(|o| match self.resolve(o) {
                Object::Dictionary(d) => Some(d),
                _ => None,
            });
        let Some(descendant) = descendant else {
            return metrics;
        };
        if let Some(dw) = descendant.get(b"DW").ok().and_then(|o| self.number(o)) {
            metrics.default_width = dw;
        }

        // W array: `c [w1 w2 ...]` or `c_first c_last w`. Flattened into a dense
        // table starting at the lowest code.
        let Some(w) = descendant
            .get(b"W")
            .ok()
            .and_then(|o| self.resolve(o).as_array().ok())
        else {
            return metrics;
        };
        let mut entries: Vec<(u32, f32)> = Vec::new();
        let mut i = 0;
        while i < w.len() {
            let Some(start) = self.number(&w[i]).map(|n| n as u32) else {
                break;
            };
            match w.get(i + 1).map(|o| self.resolve(o)) {
                Some(Object::Array(list)) => {
                    for (k, width) in list.iter().enumerate() {
                        if let Some(width) = self.number(width) {
                            entries.push((start + k as u32, width));
                        }
                    }
                    i += 2;
                }
                Some(end) => {
                    let end = self.number(end).map(|n| n as u32).unwrap_or(start);
                    let width = w.get(i + 2).and_then(|o| self.number(o)).unwrap_or(metrics.default_width);
                    // Cap pathological ranges.
                    for code in start..=end.min(start + 0xFFFF) {
                        entries.push((code, width));
                    }
                    i += 3;
                }
                None => break,
            }
        }
        if let Some(first) = entries.iter().map(|(c, _)| *c).min() {
            let last = entries.iter().map(|(c, _)| *c).max().unwrap_or(first);
            let mut widths = vec![0.0; (last - first + 1) as usize];
            for (code, width) in entries {
                widths[(code - first) as usize] = width;
            }
            metrics.first_char = first;
            metrics.widths = widths;
        }
        metrics
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> PageBox {
        let mut current = self.doc.get_dictionary(page).ok();
        // Bounded walk up the page tree.
        for _ in 0..32 {
            let Some(dict) = current else {
                break;
            };
            if let Ok(obj) = dict.get(b"MediaBox") {
                if let Ok(array) = self.resolve(obj).as_array() {
                    let values: Vec<f32> = array.iter().filter_map(|o| self.number(o)).collect();
                    if let [a, b, c, d] = values[..] {
                        let page_box = PageBox {
                            x0: a.min(c),
                            y0: b.min(d),
                            x1: a.max(c),
                            y1: b.max(d),
                        };
                        if page_box.width() > 0.0 && page_box.height() > 0.0 {
                            return page_box;
                        }
                    }
                }
            }
            current = dict
                .get(b"Parent")
                .ok()
                .and_then(|p| p.as_reference().ok())
                .and_then(|r| self.doc.get_dictionary(r).ok());
        }
        PageBox::LETTER
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
        self.doc
            .get_page_content(page)
            .map_err(|e| Error::PdfParse(format!("content stream of page {:?}: {}", page, e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content =
            lopdf::content::Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn font_metrics(&self, page: PageId, font_name: &[u8]) -> FontMetrics {
        let fonts = self.page_fonts(page);
        let Some(font) = fonts.get(font_name) else {
            return FontMetrics::default();
        };

        let subtype = font.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        if subtype == Some(b"Type0".as_slice()) {
            return self.composite_metrics(font);
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| self.number(o))
            .unwrap_or(0.0) as u32;
        let widths = font
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o).as_array().ok())
            .map(|a| a.iter().map(|w| self.number(w).unwrap_or(0.0)).collect())
            .unwrap_or_default();
        FontMetrics {
            code_length: 1,
            first_char,
            widths,
            default_width: 500.0,
        }
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        let fonts = self.page_fonts(page);
        if let Some(font_dict) = fonts.get(font_name) {
            if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                    return text;
                }
            }
        }
        decode_text_simple(bytes)
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        // 0xE9 = 'é' in Latin-1
        assert_eq!(decode_text_simple(&[0x48, 0x65, 0x6C, 0x6C, 0xE9]), "Hellé");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }

    #[test]
    fn test_value_numbers() {
        assert_eq!(PdfValue::Integer(42).as_number(), Some(42.0));
        assert_eq!(PdfValue::Real(1.5).as_number(), Some(1.5));
        assert_eq!(PdfValue::Other.as_number(), None);
        let op = ContentOp::new("Td", vec![PdfValue::Integer(3), PdfValue::Real(-2.0)]);
        assert_eq!(op.number(1), Some(-2.0));
        assert_eq!(op.number(2), None);
    }

    #[test]
    fn test_page_box_conversion() {
        let page_box = PageBox {
            x0: 10.0,
            y0: 20.0,
            x1: 610.0,
            y1: 820.0,
        };
        assert_eq!(page_box.width(), 600.0);
        assert_eq!(page_box.to_top_left(10.0, 820.0), (0.0, 0.0));
        assert_eq!(page_box.to_top_left(110.0, 720.0), (100.0, 100.0));
    }

    #[test]
    fn test_font_metrics_widths() {
        let metrics = FontMetrics {
            code_length: 1,
            first_char: 32,
            widths: vec![250.0, 333.0],
            default_width: 500.0,
        };
        assert_eq!(metrics.width(32), 250.0);
        assert_eq!(metrics.width(33), 333.0);
        assert_eq!(metrics.width(65), 500.0);
        assert_eq!(metrics.width(10), 500.0);

        let composite = FontMetrics {
            code_length: 2,
            ..FontMetrics::default()
        };
        assert_eq!(composite.codes(&[0x00, 0x41, 0x01, 0x02]), vec![0x41, 0x0102]);
    }
}
