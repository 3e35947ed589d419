//! Lattice table detection from page ruling lines
//!
//! Works entirely in top-origin page coordinates (y grows downward). The
//! caller harvests character boxes and path-object bounds from the page and
//! converts them before calling in; everything here is pure geometry.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Cluster radius when snapping near-collinear edges, in points
const SNAP_TOLERANCE: f32 = 3.0;
/// Maximum gap bridged when merging collinear segments, in points
const JOIN_TOLERANCE: f32 = 3.0;
/// Slack allowed when intersecting perpendicular edges, in points
const INTERSECTION_TOLERANCE: f32 = 3.0;
/// Edges shorter than this carry no ruling information
const MIN_EDGE_LENGTH: f32 = 3.0;
/// Path bounds at most this thick are treated as a single ruling line
const MAX_LINE_THICKNESS: f32 = 2.0;
/// Same-line grouping tolerance for text inside a cell, in points
const CELL_Y_TOLERANCE: f32 = 5.0;
/// X gap that separates words inside a cell, in points
const CELL_SPACE_THRESHOLD: f32 = 10.0;

/// Axis alignment of a ruling edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A ruling-line segment in top-origin coordinates.
/// Horizontal edges have `top == bottom`; vertical edges have `x0 == x1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
    pub orientation: Orientation,
}

/// A character with its bounding box, in top-origin coordinates
#[derive(Debug, Clone)]
pub struct CharBox {
    pub ch: char,
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

/// One detected table: rows of cells, `None` where the grid has no cell
/// (e.g. under a merged region), empty string for a cell with no text.
pub type TableGrid = Vec<Vec<Option<String>>>;

/// A cell bounded by four intersection corners
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    x0: f32,
    top: f32,
    x1: f32,
    bottom: f32,
}

/// Detect ruled tables on a page and fill their cells with text.
///
/// The pipeline follows the classic lattice strategy: snap near-collinear
/// edges together, merge collinear fragments, intersect horizontals with
/// verticals, keep grid cells whose four corners all exist, group connected
/// cells into tables, then assign each cell the characters whose centers
/// fall inside it. Tables come back top-to-bottom, left-to-right; rows
/// top-to-bottom; columns left-to-right.
pub fn detect_tables(edges: Vec<Edge>, chars: &[CharBox]) -> Vec<TableGrid> {
    let edges: Vec<Edge> = edges
        .into_iter()
        .filter(|e| edge_length(e) >= MIN_EDGE_LENGTH)
        .collect();
    if edges.is_empty() {
        return Vec::new();
    }

    let edges = snap_edges(edges, SNAP_TOLERANCE);
    let edges = join_edges(edges, JOIN_TOLERANCE);
    let points = edges_to_intersections(&edges, INTERSECTION_TOLERANCE);
    let cells = intersections_to_cells(&points);
    let tables = cells_to_tables(cells);

    tables
        .iter()
        .map(|table| table_to_grid(table, chars))
        .collect()
}

/// Convert one path object's bounding box into ruling edges.
///
/// Thin bounds collapse to a single line edge on their center line; anything
/// larger contributes its four borders (covering both stroked rectangles and
/// filled cell shading). Dot-sized marks are ignored.
pub fn edges_from_bounds(x0: f32, top: f32, x1: f32, bottom: f32) -> Vec<Edge> {
    let width = x1 - x0;
    let height = bottom - top;

    if width <= MAX_LINE_THICKNESS && height <= MAX_LINE_THICKNESS {
        return Vec::new();
    }

    if height <= MAX_LINE_THICKNESS {
        let y = (top + bottom) / 2.0;
        return vec![Edge {
            x0,
            top: y,
            x1,
            bottom: y,
            orientation: Orientation::Horizontal,
        }];
    }

    if width <= MAX_LINE_THICKNESS {
        let x = (x0 + x1) / 2.0;
        return vec![Edge {
            x0: x,
            top,
            x1: x,
            bottom,
            orientation: Orientation::Vertical,
        }];
    }

    vec![
        Edge {
            x0,
            top,
            x1,
            bottom: top,
            orientation: Orientation::Horizontal,
        },
        Edge {
            x0,
            top: bottom,
            x1,
            bottom,
            orientation: Orientation::Horizontal,
        },
        Edge {
            x0,
            top,
            x1: x0,
            bottom,
            orientation: Orientation::Vertical,
        },
        Edge {
            x0: x1,
            top,
            x1,
            bottom,
            orientation: Orientation::Vertical,
        },
    ]
}

fn edge_length(edge: &Edge) -> f32 {
    match edge.orientation {
        Orientation::Horizontal => edge.x1 - edge.x0,
        Orientation::Vertical => edge.bottom - edge.top,
    }
}

/// Quantize a coordinate for exact grouping after snapping
fn float_key(v: f32) -> i64 {
    (v * 1000.0).round() as i64
}

/// Cluster edges along their perpendicular axis and move each cluster to its
/// mean, so slightly misaligned rulings land on the same grid line.
fn snap_edges(edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    let (mut horizontals, mut verticals): (Vec<Edge>, Vec<Edge>) = edges
        .into_iter()
        .partition(|e| e.orientation == Orientation::Horizontal);

    snap_axis(&mut horizontals, tolerance, |e| e.top, |e, v| {
        e.top = v;
        e.bottom = v;
    });
    snap_axis(&mut verticals, tolerance, |e| e.x0, |e, v| {
        e.x0 = v;
        e.x1 = v;
    });

    horizontals.append(&mut verticals);
    horizontals
}

fn snap_axis<F, G>(edges: &mut [Edge], tolerance: f32, key: F, mut set: G)
where
    F: Fn(&Edge) -> f32,
    G: FnMut(&mut Edge, f32),
{
    if edges.is_empty() {
        return;
    }

    edges.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal));

    let mut start = 0;
    for i in 1..=edges.len() {
        let cluster_ends =
            i == edges.len() || (key(&edges[i]) - key(&edges[start])).abs() > tolerance;
        if cluster_ends {
            let mean = (start..i).map(|j| key(&edges[j])).sum::<f32>() / (i - start) as f32;
            for edge in &mut edges[start..i] {
                set(edge, mean);
            }
            start = i;
        }
    }
}

/// Merge overlapping or nearly-touching collinear segments into one edge per
/// uninterrupted run.
fn join_edges(edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    let (horizontals, verticals): (Vec<Edge>, Vec<Edge>) = edges
        .into_iter()
        .partition(|e| e.orientation == Orientation::Horizontal);

    let mut result = join_axis(
        horizontals,
        |e| e.top,
        |e| (e.x0, e.x1),
        |line, start, end| Edge {
            x0: start,
            top: line,
            x1: end,
            bottom: line,
            orientation: Orientation::Horizontal,
        },
        tolerance,
    );
    result.extend(join_axis(
        verticals,
        |e| e.x0,
        |e| (e.top, e.bottom),
        |line, start, end| Edge {
            x0: line,
            top: start,
            x1: line,
            bottom: end,
            orientation: Orientation::Vertical,
        },
        tolerance,
    ));
    result
}

fn join_axis<K, S, B>(edges: Vec<Edge>, key: K, span: S, build: B, tolerance: f32) -> Vec<Edge>
where
    K: Fn(&Edge) -> f32,
    S: Fn(&Edge) -> (f32, f32),
    B: Fn(f32, f32, f32) -> Edge,
{
    // Snapping already made collinear keys identical, so exact grouping by
    // quantized key is safe here.
    let mut groups: BTreeMap<i64, Vec<Edge>> = BTreeMap::new();
    for edge in edges {
        groups.entry(float_key(key(&edge))).or_default().push(edge);
    }

    let mut result = Vec::new();
    for group in groups.into_values() {
        let line = key(&group[0]);
        let mut spans: Vec<(f32, f32)> = group.iter().map(&span).collect();
        spans.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let (mut start, mut end) = spans[0];
        for &(s, e) in &spans[1..] {
            if s <= end + tolerance {
                end = end.max(e);
            } else {
                result.push(build(line, start, end));
                start = s;
                end = e;
            }
        }
        result.push(build(line, start, end));
    }
    result
}

/// Grid points where a vertical edge crosses a horizontal one, with
/// tolerance so rulings that stop just short of each other still intersect.
fn edges_to_intersections(edges: &[Edge], tolerance: f32) -> Vec<(f32, f32)> {
    let horizontals: Vec<&Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal)
        .collect();
    let verticals: Vec<&Edge> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Vertical)
        .collect();

    let mut points = Vec::new();
    let mut seen = HashSet::new();

    for h in &horizontals {
        let y = h.top;
        for v in &verticals {
            let x = v.x0;
            if x >= h.x0 - tolerance
                && x <= h.x1 + tolerance
                && y >= v.top - tolerance
                && y <= v.bottom + tolerance
                && seen.insert((float_key(x), float_key(y)))
            {
                points.push((x, y));
            }
        }
    }

    points
}

/// Form a cell for every adjacent row/column pair whose four corner points
/// all exist.
fn intersections_to_cells(points: &[(f32, f32)]) -> Vec<Cell> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut xs: Vec<i64> = points.iter().map(|&(x, _)| float_key(x)).collect();
    xs.sort_unstable();
    xs.dedup();
    let mut ys: Vec<i64> = points.iter().map(|&(_, y)| float_key(y)).collect();
    ys.sort_unstable();
    ys.dedup();

    let grid: HashSet<(i64, i64)> = points
        .iter()
        .map(|&(x, y)| (float_key(x), float_key(y)))
        .collect();

    let mut cells = Vec::new();
    for yi in 0..ys.len().saturating_sub(1) {
        for xi in 0..xs.len().saturating_sub(1) {
            let (left, right) = (xs[xi], xs[xi + 1]);
            let (top, bottom) = (ys[yi], ys[yi + 1]);
            if grid.contains(&(left, top))
                && grid.contains(&(right, top))
                && grid.contains(&(left, bottom))
                && grid.contains(&(right, bottom))
            {
                cells.push(Cell {
                    x0: left as f32 / 1000.0,
                    top: top as f32 / 1000.0,
                    x1: right as f32 / 1000.0,
                    bottom: bottom as f32 / 1000.0,
                });
            }
        }
    }
    cells
}

/// Group cells that share a boundary into tables (union-find), ordered
/// top-to-bottom then left-to-right.
fn cells_to_tables(cells: Vec<Cell>) -> Vec<Vec<Cell>> {
    if cells.is_empty() {
        return Vec::new();
    }

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
            if cells_share_boundary(&cells[i], &cells[j]) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<Cell>> = HashMap::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(cell);
    }

    let mut tables: Vec<Vec<Cell>> = groups.into_values().collect();
    tables.sort_by(|a, b| {
        let (a_top, a_x0) = table_origin(a);
        let (b_top, b_x0) = table_origin(b);
        a_top
            .partial_cmp(&b_top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a_x0.partial_cmp(&b_x0).unwrap_or(std::cmp::Ordering::Equal))
    });
    tables
}

fn table_origin(cells: &[Cell]) -> (f32, f32) {
    let top = cells.iter().map(|c| c.top).fold(f32::INFINITY, f32::min);
    let x0 = cells.iter().map(|c| c.x0).fold(f32::INFINITY, f32::min);
    (top, x0)
}

fn cells_share_boundary(a: &Cell, b: &Cell) -> bool {
    let shares_vertical = (float_key(a.x1) == float_key(b.x0)
        || float_key(b.x1) == float_key(a.x0))
        && a.top <= b.bottom
        && b.top <= a.bottom;
    let shares_horizontal = (float_key(a.bottom) == float_key(b.top)
        || float_key(b.bottom) == float_key(a.top))
        && a.x0 <= b.x1
        && b.x0 <= a.x1;
    shares_vertical || shares_horizontal
}

/// Lay a table's cells out on their row/column grid and fill in text.
/// Grid positions no cell covers come back as `None`.
fn table_to_grid(cells: &[Cell], chars: &[CharBox]) -> TableGrid {
    let mut row_keys: Vec<i64> = cells.iter().map(|c| float_key(c.top)).collect();
    row_keys.sort_unstable();
    row_keys.dedup();
    let mut col_keys: Vec<i64> = cells.iter().map(|c| float_key(c.x0)).collect();
    col_keys.sort_unstable();
    col_keys.dedup();

    let index: HashMap<(i64, i64), &Cell> = cells
        .iter()
        .map(|c| ((float_key(c.top), float_key(c.x0)), c))
        .collect();

    row_keys
        .iter()
        .map(|&rk| {
            col_keys
                .iter()
                .map(|&ck| index.get(&(rk, ck)).map(|cell| cell_text(cell, chars)))
                .collect()
        })
        .collect()
}

/// Gather the characters whose centers fall inside the cell and lay them out
/// as text: same-line characters get spaces on word gaps, lines are joined
/// with newlines. A cell with no characters yields an empty string.
fn cell_text(cell: &Cell, chars: &[CharBox]) -> String {
    let mut inside: Vec<&CharBox> = chars
        .iter()
        .filter(|c| {
            let cx = (c.x0 + c.x1) / 2.0;
            let cy = (c.top + c.bottom) / 2.0;
            cx >= cell.x0 && cx <= cell.x1 && cy >= cell.top && cy <= cell.bottom
        })
        .collect();

    if inside.is_empty() {
        return String::new();
    }

    inside.sort_by(|a, b| {
        a.top
            .partial_cmp(&b.top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut text = String::new();
    let mut line_top = inside[0].top;
    let mut prev_x1: Option<f32> = None;

    for c in inside {
        if (c.top - line_top).abs() > CELL_Y_TOLERANCE {
            text.push('\n');
            line_top = c.top;
            prev_x1 = None;
        }
        if let Some(px) = prev_x1 {
            if c.x0 - px > CELL_SPACE_THRESHOLD && c.ch != ' ' {
                text.push(' ');
            }
        }
        text.push(c.ch);
        prev_x1 = Some(c.x1);
    }

    text.trim().to_string()
}
