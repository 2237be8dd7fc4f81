//! Content stream interpretation: positioned text spans and ruling edges.
//!
//! Coordinates of everything produced here are top-left based, relative to the
//! page's MediaBox.

use std::collections::HashMap;

use super::backend::{ContentOp, FontMetrics, PageBox, PageId, PdfBackend, PdfValue};

/// Segments shorter than this (in points) along the other axis count as straight.
const AXIS_TOLERANCE: f32 = 1.0;
/// Filled rectangles thinner than this are drawn rules, not boxes.
const RULE_THICKNESS: f32 = 3.0;

/// A run of text drawn by one show operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    /// Left edge
    pub x0: f32,
    /// Right edge, from glyph advances
    pub x1: f32,
    /// Baseline, measured from the top of the page
    pub baseline: f32,
    /// Effective font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Approximate top of the glyphs.
    pub fn top(&self) -> f32 {
        self.baseline - self.font_size * 0.8
    }

    /// Approximate bottom of the glyphs.
    pub fn bottom(&self) -> f32 {
        self.baseline + self.font_size * 0.2
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.top() + self.bottom()) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An axis-aligned ruling segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
    pub orientation: Orientation,
    /// Derived from a rectangle rather than a stroked line
    pub from_rect: bool,
}

impl Edge {
    pub fn length(&self) -> f32 {
        match self.orientation {
            Orientation::Horizontal => self.x1 - self.x0,
            Orientation::Vertical => self.bottom - self.top,
        }
    }

    fn horizontal(x0: f32, x1: f32, y: f32, from_rect: bool) -> Self {
        Self {
            x0: x0.min(x1),
            top: y,
            x1: x0.max(x1),
            bottom: y,
            orientation: Orientation::Horizontal,
            from_rect,
        }
    }

    fn vertical(x: f32, y0: f32, y1: f32, from_rect: bool) -> Self {
        Self {
            x0: x,
            top: y0.min(y1),
            x1: x,
            bottom: y0.max(y1),
            orientation: Orientation::Vertical,
            from_rect,
        }
    }
}

/// Everything extracted from one page's content stream.
#[derive(Debug, Clone, Default)]
pub struct PageObjects {
    pub spans: Vec<TextSpan>,
    pub edges: Vec<Edge>,
}

/// Affine matrix `[a b c d e f]` as used by PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn from_op(op: &ContentOp) -> Option<Self> {
        Some(Self {
            a: op.number(0)?,
            b: op.number(1)?,
            c: op.number(2)?,
            d: op.number(3)?,
            e: op.number(4)?,
            f: op.number(5)?,
        })
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// `self` applied first, then `other`.
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Walks a page's content operations, tracking graphics and text state.
pub struct ContentInterpreter<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    page: PageId,
    page_box: PageBox,
    metrics: HashMap<Vec<u8>, FontMetrics>,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text: TextState,
    text_matrix: Matrix,
    line_matrix: Matrix,
    path: Vec<Vec<(f32, f32)>>,
    pending_rects: Vec<(f32, f32, f32, f32)>,
    output: PageObjects,
}

impl<'a, B: PdfBackend + ?Sized> ContentInterpreter<'a, B> {
    pub fn new(backend: &'a B, page: PageId, page_box: PageBox) -> Self {
        Self {
            backend,
            page,
            page_box,
            metrics: HashMap::new(),
            state: GraphicsState {
                ctm: Matrix::IDENTITY,
            },
            stack: Vec::new(),
            text: TextState::default(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            path: Vec::new(),
            pending_rects: Vec::new(),
            output: PageObjects::default(),
        }
    }

    /// Interpret the operations and return the collected spans and edges.
    pub fn run(mut self, ops: &[ContentOp]) -> PageObjects {
        for op in ops {
            self.execute(op);
        }
        log::debug!(
            "Page {:?}: {} spans, {} edges",
            self.page,
            self.output.spans.len(),
            self.output.edges.len()
        );
        self.output
    }

    fn execute(&mut self, op: &ContentOp) {
        match op.operator.as_str() {
            // Graphics state
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_op(op) {
                    self.state.ctm = m.then(&self.state.ctm);
                }
            }

            // Text objects and state
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "ET" => {}
            "Tf" => {
                if let Some(PdfValue::Name(name)) = op.operands.first() {
                    self.text.font = name.clone();
                }
                if let Some(size) = op.number(1) {
                    self.text.font_size = size;
                }
            }
            "Tc" => self.text.char_spacing = op.number(0).unwrap_or(0.0),
            "Tw" => self.text.word_spacing = op.number(0).unwrap_or(0.0),
            "Tz" => self.text.horizontal_scale = op.number(0).unwrap_or(100.0) / 100.0,
            "TL" => self.text.leading = op.number(0).unwrap_or(0.0),
            "Ts" => self.text.rise = op.number(0).unwrap_or(0.0),

            // Positioning
            "Td" | "TD" => {
                let tx = op.number(0).unwrap_or(0.0);
                let ty = op.number(1).unwrap_or(0.0);
                if op.operator == "TD" {
                    self.text.leading = -ty;
                }
                self.move_line(tx, ty);
            }
            "Tm" => {
                if let Some(m) = Matrix::from_op(op) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),

            // Showing
            "Tj" => {
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = op.operands.first() {
                    self.show(items);
                }
            }
            "'" => {
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }
            "\"" => {
                self.text.word_spacing = op.number(0).unwrap_or(self.text.word_spacing);
                self.text.char_spacing = op.number(1).unwrap_or(self.text.char_spacing);
                self.next_line();
                if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                    self.show(&[PdfValue::Str(bytes.clone())]);
                }
            }

            // Path construction
            "m" => {
                if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                    let p = self.device_point(x, y);
                    self.path.push(vec![p]);
                }
            }
            "l" => {
                if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                    let p = self.device_point(x, y);
                    match self.path.last_mut() {
                        Some(sub) => sub.push(p),
                        None => self.path.push(vec![p]),
                    }
                }
            }
            "h" => {
                if let Some(sub) = self.path.last_mut() {
                    if let Some(&first) = sub.first() {
                        sub.push(first);
                    }
                }
            }
            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) =
                    (op.number(0), op.number(1), op.number(2), op.number(3))
                {
                    let corners = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)];
                    let points: Vec<(f32, f32)> =
                        corners.iter().map(|&(px, py)| self.device_point(px, py)).collect();
                    let xs = points.iter().map(|p| p.0);
                    let ys = points.iter().map(|p| p.1);
                    let x0 = xs.clone().fold(f32::MAX, f32::min);
                    let x1 = xs.fold(f32::MIN, f32::max);
                    let y0 = ys.clone().fold(f32::MAX, f32::min);
                    let y1 = ys.fold(f32::MIN, f32::max);
                    self.pending_rects.push((x0, y0, x1, y1));
                }
            }

            // Path painting
            "S" | "s" => self.paint(true, false),
            "f" | "F" | "f*" => self.paint(false, true),
            "B" | "B*" | "b" | "b*" => self.paint(true, true),
            "n" => self.clear_path(),

            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translation(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.text.leading;
        self.move_line(0.0, -leading);
    }

    fn device_point(&self, x: f32, y: f32) -> (f32, f32) {
        let (ux, uy) = self.state.ctm.apply(x, y);
        self.page_box.to_top_left(ux, uy)
    }

    fn font_metrics(&mut self) -> &FontMetrics {
        let font = self.text.font.clone();
        let backend = self.backend;
        let page = self.page;
        self.metrics
            .entry(font)
            .or_insert_with_key(|name| backend.font_metrics(page, name))
    }

    /// Show strings and kerning adjustments, emitting one span.
    fn show(&mut self, items: &[PdfValue]) {
        let metrics = self.font_metrics().clone();
        let size = self.text.font_size;
        let scale = self.text.horizontal_scale;
        let start = self.text_matrix;
        let mut combined = String::new();
        let mut advance = 0.0f32;

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let decoded = self.backend.decode_text(self.page, &self.text.font, bytes);
                    combined.push_str(&decoded);
                    for code in metrics.codes(bytes) {
                        let mut w = metrics.width(code) / 1000.0 * size + self.text.char_spacing;
                        if code == 32 && metrics.code_length == 1 {
                            w += self.text.word_spacing;
                        }
                        advance += w * scale;
                    }
                }
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjustment = item.as_number().unwrap_or(0.0);
                    advance -= adjustment / 1000.0 * size * scale;
                    // A large negative adjustment is a word break.
                    if -adjustment > 200.0 && needs_space(&combined) {
                        combined.push(' ');
                    }
                }
                _ => {}
            }
        }

        self.text_matrix = Matrix::translation(advance, 0.0).then(&self.text_matrix);

        if combined.trim().is_empty() {
            return;
        }

        let rendering = start.then(&self.state.ctm);
        let (sx, sy) = rendering.apply(0.0, self.text.rise);
        let (ex, _) = Matrix::translation(advance, 0.0)
            .then(&rendering)
            .apply(0.0, self.text.rise);
        let (x_start, baseline) = self.page_box.to_top_left(sx, sy);
        let (x_end, _) = self.page_box.to_top_left(ex, sy);
        let font_size = (size * rendering.vertical_scale()).abs();

        self.output.spans.push(TextSpan {
            text: combined,
            x0: x_start.min(x_end),
            x1: x_start.max(x_end),
            baseline,
            font_size: if font_size > 0.0 { font_size } else { size.abs() },
        });
    }

    fn paint(&mut self, stroke: bool, fill: bool) {
        let rects = std::mem::take(&mut self.pending_rects);
        for (x0, y0, x1, y1) in rects {
            let (w, h) = (x1 - x0, y1 - y0);
            if fill && !stroke && h <= RULE_THICKNESS && w > h {
                // Thin filled bar: a horizontal rule.
                let y = (y0 + y1) / 2.0;
                self.output.edges.push(Edge::horizontal(x0, x1, y, true));
            } else if fill && !stroke && w <= RULE_THICKNESS && h > w {
                let x = (x0 + x1) / 2.0;
                self.output.edges.push(Edge::vertical(x, y0, y1, true));
            } else {
                self.output.edges.push(Edge::horizontal(x0, x1, y0, true));
                self.output.edges.push(Edge::horizontal(x0, x1, y1, true));
                self.output.edges.push(Edge::vertical(x0, y0, y1, true));
                self.output.edges.push(Edge::vertical(x1, y0, y1, true));
            }
        }

        let path = std::mem::take(&mut self.path);
        for sub in path {
            for pair in sub.windows(2) {
                let ((ax, ay), (bx, by)) = (pair[0], pair[1]);
                if (ay - by).abs() <= AXIS_TOLERANCE && (ax - bx).abs() > AXIS_TOLERANCE {
                    self.output
                        .edges
                        .push(Edge::horizontal(ax, bx, (ay + by) / 2.0, false));
                } else if (ax - bx).abs() <= AXIS_TOLERANCE && (ay - by).abs() > AXIS_TOLERANCE {
                    self.output
                        .edges
                        .push(Edge::vertical((ax + bx) / 2.0, ay, by, false));
                }
            }
        }
    }

    fn clear_path(&mut self) {
        self.path.clear();
        self.pending_rects.clear();
    }
}

fn needs_space(text: &str) -> bool {
    match text.chars().last() {
        Some(c) => !c.is_whitespace() && !is_spaceless_script_char(c),
        None => false,
    }
}

/// Scripts written without spaces between words (Han, kana, CJK punctuation).
/// Hangul is not included; Korean uses word spaces.
pub fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2EBEF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x3000..=0x303F)
}
