use ahash::AHashMap;
use geo::{Contains, Coord, InteriorPoint, LineString, MultiPolygon, Polygon};
use ndarray::Array2;
use smallvec::SmallVec;

/// Grid vertex `(x = col, y = row)`.
type Vertex = (i64, i64);

/// Lazily yields one polygon per 4-connected region of equal-valued valid
/// cells, in row-major order of each region's first cell. Polygons are in
/// pixel space: `x` = column, `y` = row, cell `(r, c)` spans `[c, c+1] x [r, r+1]`.
pub(crate) struct Polygonizer<'a, F: Fn(f64) -> bool> {
    values: &'a Array2<f64>,
    is_valid: F,
    visited: Array2<bool>,
    cursor: usize,
}

impl<'a, F: Fn(f64) -> bool> Polygonizer<'a, F> {
    pub(crate) fn new(values: &'a Array2<f64>, is_valid: F) -> Self {
        Self { values, is_valid, visited: Array2::from_elem(values.dim(), false), cursor: 0 }
    }

    /// Is `(row, col)` a valid cell holding exactly `value`?
    #[inline]
    fn same(&self, row: i64, col: i64, value: f64) -> bool {
        let (rows, cols) = self.values.dim();
        if row < 0 || col < 0 || row as usize >= rows || col as usize >= cols {
            return false;
        }
        let v = self.values[[row as usize, col as usize]];
        (self.is_valid)(v) && v == value
    }

    /// Flood-fill the region containing `(row, col)`, marking it visited.
    fn collect_region(&mut self, row: usize, col: usize, value: f64) -> Vec<(i64, i64)> {
        let mut cells = Vec::new();
        let mut stack = vec![(row as i64, col as i64)];
        self.visited[[row, col]] = true;
        while let Some((r, c)) = stack.pop() {
            cells.push((r, c));
            for (nr, nc) in [(r - 1, c), (r + 1, c), (r, c - 1), (r, c + 1)] {
                if self.same(nr, nc, value) && !self.visited[[nr as usize, nc as usize]] {
                    self.visited[[nr as usize, nc as usize]] = true;
                    stack.push((nr, nc));
                }
            }
        }
        cells
    }

    /// Directed boundary edges of a region, each cell side facing a non-member.
    /// The region lies on the same side of every edge.
    fn boundary_edges(&self, cells: &[(i64, i64)], value: f64) -> Vec<(Vertex, Vertex)> {
        let mut edges = Vec::new();
        for &(r, c) in cells {
            if !self.same(r - 1, c, value) { edges.push(((c + 1, r), (c, r))); }
            if !self.same(r, c - 1, value) { edges.push(((c, r), (c, r + 1))); }
            if !self.same(r + 1, c, value) { edges.push(((c, r + 1), (c + 1, r + 1))); }
            if !self.same(r, c + 1, value) { edges.push(((c + 1, r + 1), (c + 1, r))); }
        }
        edges
    }
}

impl<F: Fn(f64) -> bool> Iterator for Polygonizer<'_, F> {
    type Item = (f64, MultiPolygon<f64>);

    fn next(&mut self) -> Option<Self::Item> {
        let (rows, cols) = self.values.dim();
        while self.cursor < rows * cols {
            let (row, col) = (self.cursor / cols, self.cursor % cols);
            self.cursor += 1;

            let value = self.values[[row, col]];
            if self.visited[[row, col]] || !(self.is_valid)(value) {
                continue;
            }
            let cells = self.collect_region(row, col, value);
            let edges = self.boundary_edges(&cells, value);
            return Some((value, assemble(trace_rings(&edges))));
        }
        None
    }
}

#[inline]
fn direction(edge: &(Vertex, Vertex)) -> (i64, i64) {
    (edge.1.0 - edge.0.0, edge.1.1 - edge.0.1)
}

/// Chain directed edges into closed rings.
///
/// Where two member cells touch only at a corner, the shared vertex has two
/// outgoing edges; the ring turns toward the region's side there. A hole that
/// touches the outside at such a corner comes out as one self-touching ring,
/// which the repair pass downstream splits.
fn trace_rings(edges: &[(Vertex, Vertex)]) -> Vec<Vec<Vertex>> {
    let mut outgoing: AHashMap<Vertex, SmallVec<[usize; 2]>> = AHashMap::with_capacity(edges.len());
    for (i, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.0).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if used[first] { continue; }

        let mut ring = vec![edges[first].0];
        let mut current = first;
        loop {
            used[current] = true;
            let (dx, dy) = direction(&edges[current]);
            let Some(options) = outgoing.get(&edges[current].1) else { break };
            let next = if options.len() == 1 { options[0] } else {
                // Turn toward the region: negative cross product with the incoming direction.
                options.iter().copied()
                    .find(|&j| { let (ex, ey) = direction(&edges[j]); dx * ey - dy * ex < 0 })
                    .unwrap_or(options[0])
            };
            if next == first || used[next] {
                break;
            }
            ring.push(edges[next].0);
            current = next;
        }
        rings.push(ring);
    }
    rings
}

/// Drop vertices in the middle of straight runs and close the ring.
fn to_linestring(ring: &[Vertex]) -> LineString<f64> {
    let n = ring.len();
    let mut coords: Vec<Coord<f64>> = (0..n)
        .filter(|&i| {
            let (p, v, q) = (ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]);
            (v.0 - p.0) * (q.1 - v.1) - (v.1 - p.1) * (q.0 - v.0) != 0
        })
        .map(|i| Coord { x: ring[i].0 as f64, y: ring[i].1 as f64 })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString(coords)
}

/// Twice the signed area; outer rings are negative in pixel space (rows grow downward).
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n).map(|i| { let (a, b) = (ring[i], ring[(i + 1) % n]); a.0 * b.1 - b.0 * a.1 }).sum()
}

/// Group rings into polygons: outer rings become shells, the rest holes of
/// the shell that contains them.
fn assemble(rings: Vec<Vec<Vertex>>) -> MultiPolygon<f64> {
    let (outer, holes): (Vec<_>, Vec<_>) = rings.into_iter()
        .filter(|ring| ring.len() >= 3)
        .partition(|ring| signed_area2(ring) < 0);

    let mut shells: Vec<(LineString<f64>, Vec<LineString<f64>>)> = outer.iter()
        .map(|ring| (to_linestring(ring), Vec::new()))
        .collect();

    for hole in holes {
        let hole = to_linestring(&hole);
        let owner = if shells.len() == 1 { 0 } else {
            Polygon::new(hole.clone(), Vec::new()).interior_point()
                .and_then(|pt| shells.iter().position(|(shell, _)| Polygon::new(shell.clone(), Vec::new()).contains(&pt)))
                .unwrap_or(0)
        };
        if let Some((_, interiors)) = shells.get_mut(owner) {
            interiors.push(hole);
        }
    }

    MultiPolygon::new(shells.into_iter().map(|(shell, holes)| Polygon::new(shell, holes)).collect())
}
