//! Regions of interest discovered by segmentation

use serde::{Deserialize, Serialize};

/// A 2D coordinate in image pixels
pub type Point = [f64; 2];

/// A closed boundary ring; the last point connects back to the first
pub type Ring = Vec<Point>;

/// A segmented region with its sequential identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Sequential id, 0-based, in the order the backend returned regions
    pub id: usize,

    /// Boundary rings; more than one means the region is not contiguous
    pub rings: Vec<Ring>,
}

impl Region {
    /// Assign sequential ids to regions in backend order
    pub fn number(rings: Vec<Vec<Ring>>) -> Vec<Region> {
        rings
            .into_iter()
            .enumerate()
            .map(|(id, rings)| Region { id, rings })
            .collect()
    }

    /// Whether the region resolved to more than one disjoint ring
    pub fn is_fragmented(&self) -> bool {
        self.rings.len() > 1
    }

    /// Centroid of the first ring
    ///
    /// Degenerate rings (zero area) fall back to the mean of their vertices.
    pub fn centroid(&self) -> Option<Point> {
        let ring = self.rings.first()?;
        if ring.is_empty() {
            return None;
        }

        let mut area2 = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        for (a, b) in edges(ring) {
            let cross = a[0] * b[1] - b[0] * a[1];
            area2 += cross;
            cx += (a[0] + b[0]) * cross;
            cy += (a[1] + b[1]) * cross;
        }

        if area2.abs() < f64::EPSILON {
            let n = ring.len() as f64;
            let sx: f64 = ring.iter().map(|p| p[0]).sum();
            let sy: f64 = ring.iter().map(|p| p[1]).sum();
            return Some([sx / n, sy / n]);
        }

        Some([cx / (3.0 * area2), cy / (3.0 * area2)])
    }

    /// Whether `point` falls inside any of the region's rings
    pub fn contains(&self, point: Point) -> bool {
        self.rings.iter().any(|ring| ring_contains(ring, point))
    }

    /// Shortest distance between the first rings of two regions
    ///
    /// Overlapping or nested outlines are at distance zero.
    pub fn distance_to(&self, other: &Region) -> Option<f64> {
        let a = self.rings.first()?;
        let b = other.rings.first()?;
        if a.is_empty() || b.is_empty() {
            return None;
        }
        if ring_contains(a, b[0]) || ring_contains(b, a[0]) {
            return Some(0.0);
        }

        let mut best = f64::INFINITY;
        for (p, q) in edges(a) {
            for (r, s) in edges(b) {
                best = best.min(segment_distance(p, q, r, s));
            }
        }
        Some(best)
    }
}

/// Iterate the closed edges of a ring
fn edges(ring: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    let n = ring.len();
    (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// Even-odd point-in-polygon test
fn ring_contains(ring: &[Point], point: Point) -> bool {
    let [x, y] = point;
    let mut inside = false;
    for (a, b) in edges(ring) {
        if (a[1] > y) != (b[1] > y) {
            let cross_x = a[0] + (y - a[1]) * (b[0] - a[0]) / (b[1] - a[1]);
            if x < cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len2 = dx * dx + dy * dy;
    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0)
    };
    let px = a[0] + t * dx - p[0];
    let py = a[1] + t * dy - p[1];
    (px * px + py * py).sqrt()
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

fn segments_intersect(p: Point, q: Point, r: Point, s: Point) -> bool {
    let d1 = orientation(r, s, p);
    let d2 = orientation(r, s, q);
    let d3 = orientation(p, q, r);
    let d4 = orientation(p, q, s);
    ((d1 > 0.0) != (d2 > 0.0)) && ((d3 > 0.0) != (d4 > 0.0))
}

fn segment_distance(p: Point, q: Point, r: Point, s: Point) -> f64 {
    if segments_intersect(p, q, r, s) {
        return 0.0;
    }
    point_segment_distance(p, r, s)
        .min(point_segment_distance(q, r, s))
        .min(point_segment_distance(r, p, q))
        .min(point_segment_distance(s, p, q))
}
