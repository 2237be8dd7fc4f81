//! Table detection.
//!
//! Two strategies, chosen by [`TableSettings`]:
//!
//! - **Lattice** (`lines`, `lines_strict`): ruling edges are snapped, merged and
//!   intersected; rectangular cells between intersections are grouped into tables
//!   and text is assigned to cells by centre point.
//! - **Stream** (`text`): rows of text whose left edges line up in at least two
//!   columns over several consecutive rows.
//!
//! When the horizontal and vertical strategies differ, lattice detection runs
//! first and stream detection only when it found nothing.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{TableSettings, TableStrategy};
use crate::model::{BBox, Table};

use super::content::{Edge, Orientation, TextSpan};

const SNAP_TOLERANCE: f32 = 3.0;
const JOIN_TOLERANCE: f32 = 3.0;
const INTERSECTION_TOLERANCE: f32 = 3.0;

/// Finds tables on one page.
#[derive(Debug, Clone)]
pub struct TableFinder {
    settings: TableSettings,
    stream: StreamConfig,
}

impl TableFinder {
    pub fn new(settings: &TableSettings) -> Self {
        Self {
            settings: settings.clone(),
            stream: StreamConfig {
                min_rows: settings.min_words_vertical.max(2),
                min_columns: settings.min_words_horizontal.max(2),
                ..StreamConfig::default()
            },
        }
    }

    /// Detect the tables of a page from its spans and ruling edges.
    pub fn find(&self, page: u32, spans: &[TextSpan], edges: &[Edge]) -> Vec<Table> {
        let uses_edges = self.settings.vertical_strategy.uses_edges()
            || self.settings.horizontal_strategy.uses_edges();
        let uses_text = self.settings.vertical_strategy == TableStrategy::Text
            || self.settings.horizontal_strategy == TableStrategy::Text;

        let mut tables = Vec::new();
        if uses_edges {
            tables = self.find_lattice(page, spans, edges);
        }
        if tables.is_empty() && uses_text {
            tables = find_stream(page, spans, &self.stream);
        }
        if !tables.is_empty() {
            log::debug!("Page {}: {} tables detected", page, tables.len());
        }
        tables
    }

    /// Edges allowed by the per-axis strategy and the minimum length.
    fn usable_edges(&self, edges: &[Edge]) -> Vec<Edge> {
        edges
            .iter()
            .filter(|e| {
                let strategy = match e.orientation {
                    Orientation::Horizontal => self.settings.horizontal_strategy,
                    Orientation::Vertical => self.settings.vertical_strategy,
                };
                match strategy {
                    TableStrategy::Lines => true,
                    TableStrategy::LinesStrict => !e.from_rect,
                    TableStrategy::Text => false,
                }
            })
            .filter(|e| e.length() >= self.settings.edge_min_length)
            .copied()
            .collect()
    }

    fn find_lattice(&self, page: u32, spans: &[TextSpan], edges: &[Edge]) -> Vec<Table> {
        let edges = self.usable_edges(edges);
        if edges.is_empty() {
            return Vec::new();
        }
        let edges = join_edges(snap_edges(edges, SNAP_TOLERANCE), JOIN_TOLERANCE);
        let points = intersections(&edges, INTERSECTION_TOLERANCE);
        let cells = cells_from_intersections(&points);
        group_cells(cells)
            .into_iter()
            .filter_map(|group| cells_to_table(page, &group, spans))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Lattice
// ---------------------------------------------------------------------------

/// Snap near-collinear edges to the mean of their cluster.
pub fn snap_edges(edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    let (mut horizontals, mut verticals): (Vec<Edge>, Vec<Edge>) = edges
        .into_iter()
        .partition(|e| e.orientation == Orientation::Horizontal);

    snap_group(&mut horizontals, tolerance, |e| e.top, |e, v| {
        e.top = v;
        e.bottom = v;
    });
    snap_group(&mut verticals, tolerance, |e| e.x0, |e, v| {
        e.x0 = v;
        e.x1 = v;
    });

    horizontals.extend(verticals);
    horizontals
}

fn snap_group<K, S>(edges: &mut [Edge], tolerance: f32, key: K, mut set: S)
where
    K: Fn(&Edge) -> f32,
    S: FnMut(&mut Edge, f32),
{
    edges.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
    let mut start = 0;
    for i in 1..=edges.len() {
        if i == edges.len() || key(&edges[i]) - key(&edges[start]) > tolerance {
            let mean = edges[start..i].iter().map(&key).sum::<f32>() / (i - start) as f32;
            for edge in &mut edges[start..i] {
                set(edge, mean);
            }
            start = i;
        }
    }
}

/// Merge overlapping or nearly touching collinear segments.
pub fn join_edges(edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    let mut by_line: BTreeMap<(u8, i64), Vec<Edge>> = BTreeMap::new();
    for edge in edges {
        let (axis, position) = match edge.orientation {
            Orientation::Horizontal => (0, edge.top),
            Orientation::Vertical => (1, edge.x0),
        };
        by_line.entry((axis, float_key(position))).or_default().push(edge);
    }

    let mut result = Vec::new();
    for (_, mut group) in by_line {
        let span = |e: &Edge| match e.orientation {
            Orientation::Horizontal => (e.x0, e.x1),
            Orientation::Vertical => (e.top, e.bottom),
        };
        group.sort_by(|a, b| span(a).0.partial_cmp(&span(b).0).unwrap_or(Ordering::Equal));

        let mut current = group[0];
        for edge in group.into_iter().skip(1) {
            let (start, end) = span(&edge);
            let (_, current_end) = span(&current);
            if start <= current_end + tolerance {
                if end > current_end {
                    match current.orientation {
                        Orientation::Horizontal => current.x1 = end,
                        Orientation::Vertical => current.bottom = end,
                    }
                }
                current.from_rect &= edge.from_rect;
            } else {
                result.push(current);
                current = edge;
            }
        }
        result.push(current);
    }
    result
}

/// Points where a horizontal and a vertical edge cross (within tolerance).
pub fn intersections(edges: &[Edge], tolerance: f32) -> Vec<(f32, f32)> {
    let horizontals = edges.iter().filter(|e| e.orientation == Orientation::Horizontal);
    let verticals: Vec<&Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Vertical)
        .collect();

    let mut points = Vec::new();
    for h in horizontals {
        for v in &verticals {
            if v.x0 >= h.x0 - tolerance
                && v.x0 <= h.x1 + tolerance
                && h.top >= v.top - tolerance
                && h.top <= v.bottom + tolerance
            {
                points.push((v.x0, h.top));
            }
        }
    }
    points.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then(a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
    });
    points.dedup_by(|a, b| float_key(a.0) == float_key(b.0) && float_key(a.1) == float_key(b.1));
    points
}

/// Rectangles whose four corners are all intersections, between adjacent grid lines.
pub fn cells_from_intersections(points: &[(f32, f32)]) -> Vec<BBox> {
    let present: HashSet<(i64, i64)> = points
        .iter()
        .map(|(x, y)| (float_key(*x), float_key(*y)))
        .collect();
    let xs = sorted_unique(points.iter().map(|p| p.0));
    let ys = sorted_unique(points.iter().map(|p| p.1));
    let has = |x: f32, y: f32| present.contains(&(float_key(x), float_key(y)));

    let mut cells = Vec::new();
    for yi in 0..ys.len().saturating_sub(1) {
        for xi in 0..xs.len().saturating_sub(1) {
            let (x0, x1, top, bottom) = (xs[xi], xs[xi + 1], ys[yi], ys[yi + 1]);
            if has(x0, top) && has(x1, top) && has(x0, bottom) && has(x1, bottom) {
                cells.push(BBox::new(x0, top, x1, bottom));
            }
        }
    }
    cells
}

/// Group cells sharing a border into tables (union-find).
fn group_cells(cells: Vec<BBox>) -> Vec<Vec<BBox>> {
    let n = cells.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if share_border(&cells[i], &cells[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<BBox>> = BTreeMap::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(cell);
    }
    let mut groups: Vec<Vec<BBox>> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        let (ba, bb) = (union_all(a), union_all(b));
        ba.y0
            .partial_cmp(&bb.y0)
            .unwrap_or(Ordering::Equal)
            .then(ba.x0.partial_cmp(&bb.x0).unwrap_or(Ordering::Equal))
    });
    groups
}

fn share_border(a: &BBox, b: &BBox) -> bool {
    let eps = 1e-3;
    let vertical = ((a.x1 - b.x0).abs() < eps || (a.x0 - b.x1).abs() < eps)
        && a.y0 < b.y1 + eps
        && b.y0 < a.y1 + eps;
    let horizontal = ((a.y1 - b.y0).abs() < eps || (a.y0 - b.y1).abs() < eps)
        && a.x0 < b.x1 + eps
        && b.x0 < a.x1 + eps;
    vertical || horizontal
}

/// Lay a cell group out on its grid and fill in the text.
///
/// Groups that form a single cell (a framed paragraph) are not tables.
fn cells_to_table(page: u32, cells: &[BBox], spans: &[TextSpan]) -> Option<Table> {
    if cells.len() < 2 {
        return None;
    }
    let xs = sorted_unique(cells.iter().flat_map(|c| [c.x0, c.x1]));
    let ys = sorted_unique(cells.iter().flat_map(|c| [c.y0, c.y1]));
    let column_of: HashMap<i64, usize> = xs.iter().enumerate().map(|(i, x)| (float_key(*x), i)).collect();
    let row_of: HashMap<i64, usize> = ys.iter().enumerate().map(|(i, y)| (float_key(*y), i)).collect();

    let (n_rows, n_cols) = (ys.len() - 1, xs.len() - 1);
    let mut grid = vec![vec![String::new(); n_cols]; n_rows];
    for cell in cells {
        let (Some(&r), Some(&c)) = (row_of.get(&float_key(cell.y0)), column_of.get(&float_key(cell.x0))) else {
            continue;
        };
        if r < n_rows && c < n_cols {
            grid[r][c] = text_inside(cell, spans);
        }
    }

    Some(Table::new(page, union_all(cells), grid))
}

/// Text of the spans whose centre lies in `bbox`, one line per baseline.
fn text_inside(bbox: &BBox, spans: &[TextSpan]) -> String {
    let mut inside: Vec<&TextSpan> = spans
        .iter()
        .filter(|s| {
            let (cx, cy) = s.center();
            bbox.contains_point(cx, cy)
        })
        .collect();
    inside.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<Vec<&str>> = Vec::new();
    let mut last_baseline: Option<f32> = None;
    for span in inside {
        let same_line = last_baseline.is_some_and(|b| (span.baseline - b).abs() <= span.font_size * 0.3);
        if !same_line {
            lines.push(Vec::new());
            last_baseline = Some(span.baseline);
        }
        if let Some(line) = lines.last_mut() {
            line.push(span.text.trim());
        }
    }
    lines
        .iter()
        .map(|words| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn union_all(cells: &[BBox]) -> BBox {
    cells
        .iter()
        .copied()
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default()
}

fn sorted_unique(values: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut keys: Vec<i64> = values.map(float_key).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.into_iter().map(|k| k as f32 / 1000.0).collect()
}

/// Integer key preserving three decimals, for grouping floats.
fn float_key(v: f32) -> i64 {
    (v * 1000.0).round() as i64
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StreamConfig {
    min_rows: usize,
    min_columns: usize,
    /// Above this, rows are probably prose split into words
    max_columns: usize,
    /// Row grouping tolerance as a fraction of the font size
    y_tolerance_factor: f32,
    min_alignment_ratio: f32,
    /// Left edges closer than this share a column
    min_column_gap: f32,
    /// Spans closer than this fraction of the font size form one chunk
    chunk_gap_factor: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            chunk_gap_factor: 1.0,
        }
    }
}

/// Text chunks sharing a baseline.
#[derive(Debug, Clone)]
struct Row {
    chunks: Vec<TextSpan>,
}

const BUCKET: f32 = 5.0;
const ALIGN_TOLERANCE: f32 = 5.0;

fn find_stream(page: u32, spans: &[TextSpan], config: &StreamConfig) -> Vec<Table> {
    let rows = group_rows(spans, config);
    if rows.len() < config.min_rows {
        return Vec::new();
    }
    let columns = detect_columns(&rows, config);
    if columns.len() < config.min_columns {
        return Vec::new();
    }

    let mut tables = Vec::new();
    for (start, end) in table_regions(&rows, &columns, config) {
        let region = &rows[start..=end];
        let columns = detect_columns(region, config);
        if columns.len() < config.min_columns || columns.len() > config.max_columns {
            log::debug!("Stream region rejected: {} columns", columns.len());
            continue;
        }
        if is_list_pattern(region, &columns) {
            log::debug!("Stream region rejected: list pattern");
            continue;
        }
        tables.push(region_to_table(page, region, &columns));
    }
    tables
}

/// Group spans into rows, then merge spans inside a row that are too close to
/// be separate cells.
fn group_rows(spans: &[TextSpan], config: &StreamConfig) -> Vec<Row> {
    let mut sorted = spans.to_vec();
    sorted.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
    });

    let mut rows: Vec<Vec<TextSpan>> = Vec::new();
    let mut current_y: Option<f32> = None;
    for span in sorted {
        let tolerance = span.font_size * config.y_tolerance_factor;
        if current_y.is_some_and(|y| (span.baseline - y).abs() <= tolerance) {
            if let Some(row) = rows.last_mut() {
                row.push(span);
                continue;
            }
        }
        current_y = Some(span.baseline);
        rows.push(vec![span]);
    }

    rows.into_iter()
        .map(|mut row| {
            row.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));
            let mut chunks: Vec<TextSpan> = Vec::new();
            for span in row {
                if let Some(last) = chunks.last_mut() {
                    let gap = span.x0 - last.x1;
                    if gap <= span.font_size * config.chunk_gap_factor {
                        if gap > span.font_size * 0.1 {
                            last.text.push(' ');
                        }
                        last.text.push_str(&span.text);
                        last.x1 = last.x1.max(span.x1);
                        continue;
                    }
                }
                chunks.push(span);
            }
            Row { chunks }
        })
        .collect()
}

/// Left edges shared by enough multi-chunk rows, merged when closer than the
/// minimum column gap.
fn detect_columns(rows: &[Row], config: &StreamConfig) -> Vec<f32> {
    let multi: Vec<&Row> = rows.iter().filter(|r| r.chunks.len() >= 2).collect();
    if multi.len() < config.min_rows {
        return Vec::new();
    }

    let mut counts: HashMap<i32, usize> = HashMap::new();
    for row in &multi {
        let buckets: HashSet<i32> = row
            .chunks
            .iter()
            .map(|c| (c.x0 / BUCKET).round() as i32)
            .collect();
        for bucket in buckets {
            *counts.entry(bucket).or_insert(0) += 1;
        }
    }

    let min_occurrences = ((multi.len() as f32 * config.min_alignment_ratio) as usize).max(2);
    let mut edges: Vec<f32> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_occurrences)
        .map(|(bucket, _)| bucket as f32 * BUCKET)
        .collect();
    edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut merged: Vec<f32> = Vec::new();
    for edge in edges {
        if merged.last().map_or(true, |last| edge - last >= config.min_column_gap) {
            merged.push(edge);
        }
    }
    merged
}

/// Runs of consecutive multi-chunk rows aligned with the columns.
fn table_regions(rows: &[Row], columns: &[f32], config: &StreamConfig) -> Vec<(usize, usize)> {
    let mut regions = Vec::new();
    let mut start: Option<usize> = None;

    for (i, row) in rows.iter().enumerate() {
        let aligned = row.chunks.len() >= 2 && alignment_score(row, columns) >= config.min_alignment_ratio;
        match (aligned, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= config.min_rows {
                    regions.push((s, i - 1));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if rows.len() - s >= config.min_rows {
            regions.push((s, rows.len() - 1));
        }
    }
    regions
}

fn alignment_score(row: &Row, columns: &[f32]) -> f32 {
    if row.chunks.is_empty() {
        return 0.0;
    }
    let aligned = row
        .chunks
        .iter()
        .filter(|c| columns.iter().any(|col| (c.x0 - col).abs() <= ALIGN_TOLERANCE))
        .count();
    aligned as f32 / row.chunks.len() as f32
}

fn region_to_table(page: u32, rows: &[Row], columns: &[f32]) -> Table {
    let grid: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
            for chunk in &row.chunks {
                cells[column_for(chunk.x0, columns)].push(chunk.text.trim());
            }
            cells.into_iter().map(|parts| parts.join(" ")).collect()
        })
        .collect();

    let bbox = rows
        .iter()
        .flat_map(|r| r.chunks.iter())
        .map(|c| BBox::new(c.x0, c.top(), c.x1, c.bottom()))
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();

    Table::new(page, bbox, grid)
}

/// Column whose start is the last one at or left of `x` (with a little slack).
fn column_for(x: f32, columns: &[f32]) -> usize {
    columns
        .iter()
        .rposition(|&start| x >= start - ALIGN_TOLERANCE)
        .unwrap_or(0)
}

/// Rows led by bullets or numbers are a list, not a table.
fn is_list_pattern(rows: &[Row], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }
    let mut bullets = 0;
    let mut numbers = 0;
    for row in rows {
        if let Some(first) = row.chunks.first() {
            let text = first.text.trim();
            if is_bullet_marker(text) {
                bullets += 1;
            } else if is_number_marker(text) {
                numbers += 1;
            }
        }
    }
    let total = rows.len() as f32;
    bullets as f32 / total >= 0.5 || (columns.len() == 2 && (bullets + numbers) as f32 / total >= 0.5)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
