//! Farm boundary validation and planar measurement.
//!
//! Rings are projected onto a local equirectangular plane centred on the
//! vertex centroid: `x = R·Δlon·cos(lat₀)`, `y = R·Δlat`. Area, containment
//! and edge distance are all computed in that plane, so a boundary and the
//! points tested against it always share one frame.

use std::collections::BTreeSet;

use feluda_core::enums::LocationFlag;
use feluda_core::geo::GeoPoint;

use crate::error::GeometryError;

/// Mean Earth radius (IUGG), metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub const SQ_M_PER_HECTARE: f64 = 10_000.0;

/// Rings enclosing less than this are degenerate.
const MIN_AREA_M2: f64 = 1e-6;

/// Relative tolerance for treating a cross product as zero.
const COLLINEAR_TOLERANCE: f64 = 1e-12;

/// Points closer than this to an edge count as on the boundary.
const ON_EDGE_M: f64 = 1e-6;

/// Area in hectares of a boundary ring.
///
/// # Errors
///
/// Returns [`GeometryError`] if the ring is invalid; no area is computed.
pub fn measure(vertices: &[GeoPoint]) -> Result<f64, GeometryError> {
    Boundary::new(vertices).map(|b| b.area_ha())
}

/// Append the first vertex if the ring is not already closed.
#[must_use]
pub fn close_ring(vertices: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut ring = vertices.to_vec();
    if let (Some(first), Some(last)) = (vertices.first(), vertices.last()) {
        if first != last || vertices.len() == 1 {
            ring.push(*first);
        }
    }
    ring
}

/// Whether `point` lies inside (or on) the ring.
///
/// # Errors
///
/// Returns [`GeometryError`] if the ring is invalid.
pub fn contains(vertices: &[GeoPoint], point: GeoPoint) -> Result<bool, GeometryError> {
    Ok(Boundary::new(vertices)?.contains(point))
}

/// Minimum distance in metres from `point` to any edge of the ring.
///
/// # Errors
///
/// Returns [`GeometryError`] if the ring is invalid.
pub fn distance_to_boundary_m(
    vertices: &[GeoPoint],
    point: GeoPoint,
) -> Result<f64, GeometryError> {
    Ok(Boundary::new(vertices)?.distance_to_edge_m(point))
}

// ── Boundary ───────────────────────────────────────────────────────

/// A validated, simple, non-degenerate boundary ring.
#[derive(Debug, Clone)]
pub struct Boundary {
    /// Closed counter-clockwise ring, consecutive duplicates removed.
    ring: Vec<GeoPoint>,
    plane: Plane,
    /// Projected open ring (no closing vertex).
    projected: Vec<Xy>,
    area_m2: f64,
}

impl Boundary {
    /// Validate and measure a ring. The closing vertex is optional and a
    /// clockwise ring is reversed to counter-clockwise.
    ///
    /// # Errors
    ///
    /// - [`GeometryError::InvalidCoordinate`] for a non-finite or out-of-range vertex
    /// - [`GeometryError::TooFewVertices`] below three distinct vertices
    /// - [`GeometryError::Degenerate`] for collinear or negligible rings
    /// - [`GeometryError::SelfIntersecting`] if two edges cross or overlap
    pub fn new(vertices: &[GeoPoint]) -> Result<Self, GeometryError> {
        for (index, p) in vertices.iter().enumerate() {
            if !p.is_valid() {
                return Err(GeometryError::InvalidCoordinate {
                    index,
                    lat: p.lat,
                    lon: p.lon,
                });
            }
        }

        let mut open = open_ring(vertices);
        let distinct = open
            .iter()
            .map(|p| ((p.lat + 0.0).to_bits(), (p.lon + 0.0).to_bits()))
            .collect::<BTreeSet<_>>()
            .len();
        if distinct < 3 {
            return Err(GeometryError::TooFewVertices { distinct });
        }

        let plane = Plane::centred_on(&open);
        let mut projected: Vec<Xy> = open.iter().map(|p| plane.project(*p)).collect();

        if fan_area(&projected) < MIN_AREA_M2 {
            return Err(GeometryError::Degenerate);
        }
        if let Some((first_edge, second_edge)) = first_intersection(&projected) {
            return Err(GeometryError::SelfIntersecting {
                first_edge,
                second_edge,
            });
        }
        let signed_m2 = shoelace(&projected);
        if signed_m2.abs() < MIN_AREA_M2 {
            return Err(GeometryError::Degenerate);
        }
        if signed_m2 < 0.0 {
            open.reverse();
            projected.reverse();
        }

        let mut ring = open;
        ring.push(ring[0]);
        Ok(Self {
            ring,
            plane,
            projected,
            area_m2: signed_m2.abs(),
        })
    }

    /// The closed ring.
    #[must_use]
    pub fn ring(&self) -> &[GeoPoint] {
        &self.ring
    }

    #[must_use]
    pub fn into_ring(self) -> Vec<GeoPoint> {
        self.ring
    }

    #[must_use]
    pub const fn area_m2(&self) -> f64 {
        self.area_m2
    }

    #[must_use]
    pub fn area_ha(&self) -> f64 {
        self.area_m2 / SQ_M_PER_HECTARE
    }

    /// Ray-casting containment. Points on an edge are inside.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        let q = self.plane.project(point);
        if self.distance_from(q) <= ON_EDGE_M {
            return true;
        }
        let mut inside = false;
        for (a, b) in edges(&self.projected) {
            if (a.y > q.y) != (b.y > q.y) {
                let x_cross = (b.x - a.x) * (q.y - a.y) / (b.y - a.y) + a.x;
                if q.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Minimum point–segment distance to the ring, metres.
    #[must_use]
    pub fn distance_to_edge_m(&self, point: GeoPoint) -> f64 {
        self.distance_from(self.plane.project(point))
    }

    /// Classify an application location against this boundary.
    #[must_use]
    pub fn classify(&self, point: GeoPoint, tolerance_m: f64) -> LocationFlag {
        if self.contains(point) {
            LocationFlag::Inside
        } else if self.distance_to_edge_m(point) <= tolerance_m {
            LocationFlag::NearBoundary
        } else {
            LocationFlag::Outside
        }
    }

    fn distance_from(&self, q: Xy) -> f64 {
        edges(&self.projected)
            .map(|(a, b)| segment_distance(q, a, b))
            .fold(f64::INFINITY, f64::min)
    }
}

// ── Planar frame ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Plane {
    lat0: f64,
    lon0: f64,
    cos_lat0: f64,
}

impl Plane {
    fn centred_on(points: &[GeoPoint]) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let n = points.len() as f64;
        let lat0 = points.iter().map(|p| p.lat).sum::<f64>() / n;
        // Unwrap longitudes around the first vertex so rings spanning the
        // antimeridian centre correctly.
        let reference = points[0].lon;
        let lon0 = points
            .iter()
            .map(|p| reference + wrap_degrees(p.lon - reference))
            .sum::<f64>()
            / n;
        Self {
            lat0,
            lon0,
            cos_lat0: lat0.to_radians().cos(),
        }
    }

    fn project(self, p: GeoPoint) -> Xy {
        Xy {
            x: EARTH_RADIUS_M * wrap_degrees(p.lon - self.lon0).to_radians() * self.cos_lat0,
            y: EARTH_RADIUS_M * (p.lat - self.lat0).to_radians(),
        }
    }
}

fn wrap_degrees(d: f64) -> f64 {
    if d > 180.0 {
        d - 360.0
    } else if d < -180.0 {
        d + 360.0
    } else {
        d
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Xy {
    x: f64,
    y: f64,
}

impl Xy {
    fn sub(self, o: Self) -> Self {
        Self {
            x: self.x - o.x,
            y: self.y - o.y,
        }
    }

    fn cross(self, o: Self) -> f64 {
        self.x.mul_add(o.y, -(self.y * o.x))
    }

    fn dot(self, o: Self) -> f64 {
        self.x.mul_add(o.x, self.y * o.y)
    }

    fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }
}

// ── Ring helpers ───────────────────────────────────────────────────

/// Drop consecutive duplicates and the closing vertex.
fn open_ring(vertices: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut open = vertices.to_vec();
    open.dedup();
    while open.len() > 1 && open.first() == open.last() {
        open.pop();
    }
    open
}

fn edges(points: &[Xy]) -> impl Iterator<Item = (Xy, Xy)> + '_ {
    let n = points.len();
    (0..n).map(move |i| (points[i], points[(i + 1) % n]))
}

fn shoelace(points: &[Xy]) -> f64 {
    edges(points).map(|(a, b)| a.cross(b)).sum::<f64>() / 2.0
}

/// Sum of absolute triangle-fan areas; zero only when every vertex is
/// collinear with the first.
fn fan_area(points: &[Xy]) -> f64 {
    let origin = points[0];
    points
        .windows(2)
        .map(|w| w[0].sub(origin).cross(w[1].sub(origin)).abs())
        .sum::<f64>()
        / 2.0
}

fn orientation(a: Xy, b: Xy, c: Xy) -> f64 {
    let ab = b.sub(a);
    let ac = c.sub(a);
    let cross = ab.cross(ac);
    if cross.abs() <= COLLINEAR_TOLERANCE * ab.norm() * ac.norm() {
        0.0
    } else {
        cross
    }
}

fn on_segment(a: Xy, b: Xy, p: Xy) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: Xy, p2: Xy, p3: Xy, p4: Xy) -> bool {
    let d1 = orientation(p3, p4, p1);
    let d2 = orientation(p3, p4, p2);
    let d3 = orientation(p1, p2, p3);
    let d4 = orientation(p1, p2, p4);

    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return true;
    }
    (d1 == 0.0 && on_segment(p3, p4, p1))
        || (d2 == 0.0 && on_segment(p3, p4, p2))
        || (d3 == 0.0 && on_segment(p1, p2, p3))
        || (d4 == 0.0 && on_segment(p1, p2, p4))
}

/// Adjacent edges sharing `shared` fold back over each other.
fn folds_back(shared: Xy, a: Xy, c: Xy) -> bool {
    let u = a.sub(shared);
    let v = c.sub(shared);
    orientation(shared, a, c) == 0.0 && u.dot(v) > 0.0
}

/// First pair of intersecting edges `(i, j)`, `i < j`, in edge order.
fn first_intersection(points: &[Xy]) -> Option<(usize, usize)> {
    let n = points.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let (a1, a2) = (points[i], points[(i + 1) % n]);
            let (b1, b2) = (points[j], points[(j + 1) % n]);
            let hit = if j == i + 1 {
                folds_back(a2, a1, b2)
            } else if i == 0 && j == n - 1 {
                folds_back(a1, a2, b1)
            } else {
                segments_intersect(a1, a2, b1, b2)
            };
            if hit {
                return Some((i, j));
            }
        }
    }
    None
}

fn segment_distance(p: Xy, a: Xy, b: Xy) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.dot(ab);
    if len_sq == 0.0 {
        return p.sub(a).norm();
    }
    let t = (p.sub(a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let closest = Xy {
        x: t.mul_add(ab.x, a.x),
        y: t.mul_add(ab.y, a.y),
    };
    p.sub(closest).norm()
}
