//! Reading-order reconstruction for multi-column pages.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::ExtractionConfig;
use crate::model::{BBox, TextBlock};

/// Orders a page's text blocks the way a person reads them: columns left to
/// right, each column top to bottom.
///
/// Blocks at least `page_width * (1 - column_threshold)` wide span the page; they
/// cut the page into horizontal bands and are emitted between them. Inside a band
/// two blocks share a column when their horizontal overlap exceeds
/// `column_threshold` of the narrower block's width (closed transitively).
#[derive(Debug, Clone, Copy)]
pub struct LayoutAnalyzer {
    column_threshold: f32,
}

impl LayoutAnalyzer {
    /// Create an analyzer from extraction settings.
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_threshold(config.column_threshold)
    }

    /// Create an analyzer with an explicit column threshold (0..1).
    pub fn with_threshold(column_threshold: f32) -> Self {
        Self {
            column_threshold: column_threshold.clamp(0.0, 1.0),
        }
    }

    /// Compute the reading order of `blocks` as indices into the slice.
    ///
    /// The result is a permutation: every index appears exactly once.
    pub fn reading_order(&self, blocks: &[TextBlock], page_width: f32) -> Vec<usize> {
        if blocks.is_empty() {
            return Vec::new();
        }

        let full_width = page_width * (1.0 - self.column_threshold);
        let (mut spanning, rest): (Vec<usize>, Vec<usize>) = (0..blocks.len())
            .partition(|&i| page_width > 0.0 && blocks[i].bbox.width() >= full_width);
        spanning.sort_by(|&a, &b| top_left_cmp(&blocks[a].bbox, &blocks[b].bbox).then(a.cmp(&b)));

        // Band k holds the blocks below spanning block k-1 and above spanning block k.
        let mut bands: Vec<Vec<usize>> = vec![Vec::new(); spanning.len() + 1];
        for i in rest {
            let y0 = blocks[i].bbox.y0;
            let band = spanning.partition_point(|&s| blocks[s].bbox.y0 <= y0);
            bands[band].push(i);
        }

        let mut order = Vec::with_capacity(blocks.len());
        for (k, band) in bands.iter().enumerate() {
            order.extend(self.order_band(blocks, band));
            if let Some(&s) = spanning.get(k) {
                order.push(s);
            }
        }

        log::debug!(
            "Reading order: {} blocks, {} full-width",
            blocks.len(),
            spanning.len()
        );
        order
    }

    /// Order one band: cluster into columns, then columns left to right.
    fn order_band(&self, blocks: &[TextBlock], band: &[usize]) -> Vec<usize> {
        if band.len() <= 1 {
            return band.to_vec();
        }

        let mut parent: Vec<usize> = (0..band.len()).collect();
        for a in 0..band.len() {
            for b in (a + 1)..band.len() {
                if self.same_column(&blocks[band[a]].bbox, &blocks[band[b]].bbox) {
                    union(&mut parent, a, b);
                }
            }
        }

        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (pos, &idx) in band.iter().enumerate() {
            let root = find(&mut parent, pos);
            groups.entry(root).or_default().push(idx);
        }

        let mut columns: Vec<Vec<usize>> = groups.into_values().collect();
        for column in &mut columns {
            column.sort_by(|&a, &b| top_left_cmp(&blocks[a].bbox, &blocks[b].bbox).then(a.cmp(&b)));
        }
        columns.sort_by(|a, b| {
            let (ax, ay) = column_origin(blocks, a);
            let (bx, by) = column_origin(blocks, b);
            ax.total_cmp(&bx).then(ay.total_cmp(&by))
        });

        if columns.len() > 1 {
            log::debug!("Band with {} columns", columns.len());
        }
        columns.into_iter().flatten().collect()
    }

    fn same_column(&self, a: &BBox, b: &BBox) -> bool {
        let overlap = a.horizontal_overlap(b);
        let narrower = a.width().min(b.width());
        if narrower <= f32::EPSILON {
            overlap >= 0.0
        } else {
            overlap > self.column_threshold * narrower
        }
    }
}

/// Top-to-bottom, then left-to-right.
fn top_left_cmp(a: &BBox, b: &BBox) -> Ordering {
    a.y0.total_cmp(&b.y0).then(a.x0.total_cmp(&b.x0))
}

/// Minimum x0 and minimum y0 of a column.
fn column_origin(blocks: &[TextBlock], column: &[usize]) -> (f32, f32) {
    column.iter().fold((f32::MAX, f32::MAX), |(x, y), &i| {
        (x.min(blocks[i].bbox.x0), y.min(blocks[i].bbox.y0))
    })
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}
