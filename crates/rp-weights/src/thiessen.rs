//! Thiessen (Voronoi) cells around LSM grid points.

use geo::{Coord, LineString, Polygon, Rect};
use ndarray::Array2;
use rp_core::{wrap_longitude, CellIndex};
use rp_grid::LsmGrid;
use rstar::{RTree, RTreeObject, AABB};

/// Thiessen cell of one grid point, in geographic degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCell {
    pub cell: CellIndex,
    pub lon: f64,
    pub lat: f64,
    pub polygon: Polygon<f64>,
}

#[derive(Debug, Clone, Copy)]
struct CellEnvelope {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for CellEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Cells for a selection of grid points, indexed by bounding box.
#[derive(Debug)]
pub struct Tessellation {
    cells: Vec<GridCell>,
    tree: RTree<CellEnvelope>,
}

impl Tessellation {
    /// Build cells for `points`, which must lie on `grid`.
    pub fn new(grid: &LsmGrid, points: &[CellIndex]) -> Self {
        let cells: Vec<GridCell> = match grid {
            LsmGrid::Rectilinear { lon, lat } => {
                let xb = axis_bounds(lon, true);
                let yb = axis_bounds(lat, false);
                points
                    .iter()
                    .map(|&cell| {
                        let (x0, x1) = xb[cell.lon];
                        let (y0, y1) = yb[cell.lat];
                        let rect = Rect::new(
                            Coord { x: x0, y: y0.max(-90.0) },
                            Coord { x: x1, y: y1.min(90.0) },
                        );
                        GridCell {
                            cell,
                            lon: lon[cell.lon],
                            lat: lat[cell.lat],
                            polygon: rect.to_polygon(),
                        }
                    })
                    .collect()
            }
            LsmGrid::Curvilinear { lon, lat } => points
                .iter()
                .map(|&cell| GridCell {
                    cell,
                    lon: lon[[cell.lat, cell.lon]],
                    lat: lat[[cell.lat, cell.lon]],
                    polygon: curvilinear_cell(lon, lat, cell),
                })
                .collect(),
        };

        let envelopes = cells
            .iter()
            .enumerate()
            .filter_map(|(slot, c)| {
                let coords = c.polygon.exterior().coords();
                let (mut lo, mut hi) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
                for p in coords {
                    lo = [lo[0].min(p.x), lo[1].min(p.y)];
                    hi = [hi[0].max(p.x), hi[1].max(p.y)];
                }
                (lo[0] <= hi[0]).then(|| CellEnvelope {
                    slot,
                    envelope: AABB::from_corners(lo, hi),
                })
            })
            .collect();

        Tessellation {
            cells,
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells whose bounding box meets `bounds`.
    pub fn candidates<'a>(&'a self, bounds: &Rect<f64>) -> impl Iterator<Item = &'a GridCell> + 'a {
        let query = AABB::from_corners(
            [bounds.min().x, bounds.min().y],
            [bounds.max().x, bounds.max().y],
        );
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(move |e| &self.cells[e.slot])
    }
}

/// `(low, high)` edges of each point's cell along one axis: midpoints to
/// the neighbours, half a spacing beyond the first and last point.
pub(crate) fn axis_bounds(axis: &[f64], periodic: bool) -> Vec<(f64, f64)> {
    let step = |a: f64, b: f64| if periodic { wrap_longitude(b - a) } else { b - a };
    let n = axis.len();
    (0..n)
        .map(|i| {
            let before = (i > 0).then(|| step(axis[i - 1], axis[i]));
            let after = (i + 1 < n).then(|| step(axis[i], axis[i + 1]));
            let before = before.or(after).unwrap_or(0.0);
            let after = after.unwrap_or(before);
            let a = axis[i] - before / 2.0;
            let b = axis[i] + after / 2.0;
            (a.min(b), a.max(b))
        })
        .collect()
}

/// Bounding square of the point clipped by the perpendicular bisectors of
/// its 8 lattice neighbours. Neighbours missing at the lattice edge are
/// mirrored through the point.
fn curvilinear_cell(lon: &Array2<f64>, lat: &Array2<f64>, cell: CellIndex) -> Polygon<f64> {
    let (ny, nx) = lon.dim();
    let (j, i) = (cell.lat as isize, cell.lon as isize);
    let p = (lon[[cell.lat, cell.lon]], lat[[cell.lat, cell.lon]]);
    let at = |jj: isize, ii: isize| {
        let inside = jj >= 0 && ii >= 0 && (jj as usize) < ny && (ii as usize) < nx;
        inside.then(|| {
            let (jj, ii) = (jj as usize, ii as usize);
            (p.0 + wrap_longitude(lon[[jj, ii]] - p.0), lat[[jj, ii]])
        })
    };

    let mut neighbours = Vec::with_capacity(8);
    for dj in -1..=1 {
        for di in -1..=1 {
            if dj == 0 && di == 0 {
                continue;
            }
            let q = at(j + dj, i + di)
                .or_else(|| at(j - dj, i - di).map(|m| (2.0 * p.0 - m.0, 2.0 * p.1 - m.1)));
            if let Some(q) = q {
                neighbours.push(q);
            }
        }
    }

    let half = neighbours
        .iter()
        .map(|q| (q.0 - p.0).abs().max((q.1 - p.1).abs()))
        .fold(0.0, f64::max);
    let mut ring = vec![
        (p.0 - half, p.1 - half),
        (p.0 + half, p.1 - half),
        (p.0 + half, p.1 + half),
        (p.0 - half, p.1 + half),
    ];
    for q in neighbours {
        ring = clip_half_plane(&ring, p, q);
    }

    let coords: Vec<Coord<f64>> = ring
        .into_iter()
        .map(|(x, y)| Coord {
            x,
            y: y.clamp(-90.0, 90.0),
        })
        .collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Sutherland-Hodgman step: keep the part of a convex ring closer to `p`
/// than to `q`.
fn clip_half_plane(ring: &[(f64, f64)], p: (f64, f64), q: (f64, f64)) -> Vec<(f64, f64)> {
    let d = (q.0 - p.0, q.1 - p.1);
    let m = ((p.0 + q.0) / 2.0, (p.1 + q.1) / 2.0);
    let side = |v: (f64, f64)| (v.0 - m.0) * d.0 + (v.1 - m.1) * d.1;

    let mut out = Vec::with_capacity(ring.len() + 1);
    for k in 0..ring.len() {
        let a = ring[k];
        let b = ring[(k + 1) % ring.len()];
        let (sa, sb) = (side(a), side(b));
        if sa <= 0.0 {
            out.push(a);
        }
        if (sa < 0.0 && sb > 0.0) || (sa > 0.0 && sb < 0.0) {
            let t = sa / (sa - sb);
            out.push((a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1)));
        }
    }
    out
}
