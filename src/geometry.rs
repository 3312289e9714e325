//! Planar geometry kernel for the nesting algorithms.
//!
//! Everything operates on simple polygons stored as an ordered vertex ring
//! without a duplicated closing vertex. After [`Polygon::normalize`] a
//! polygon is counter-clockwise (positive signed area), free of adjacent
//! duplicate vertices and has at least 3 vertices, unless it is empty.
//!
//! Two tolerances are used throughout:
//! - [`GEO_EPS`] for parametric/area computations,
//! - [`POINT_TOL`] for vertex coincidence.

use nalgebra as na;

pub type Point2D = na::Point2<f64>;
pub type Vector2D = na::Vector2<f64>;

/// Tolerance for parametric intersection tests and signed-area degeneracy.
pub const GEO_EPS: f64 = 1e-9;

/// Tolerance under which two points are considered the same vertex.
pub const POINT_TOL: f64 = 1e-6;

/// Componentwise point coincidence within `tol`.
pub fn nearly_equal(a: &Point2D, b: &Point2D, tol: f64) -> bool {
    approx::abs_diff_eq!(a.x, b.x, epsilon = tol) && approx::abs_diff_eq!(a.y, b.y, epsilon = tol)
}

/// Angle of `v` mapped into `[0, 2π)`.
pub fn vec_angle_2pi(v: &Vector2D) -> f64 {
    let a = v.y.atan2(v.x);
    if a < 0.0 {
        a + 2.0 * std::f64::consts::PI
    } else {
        a
    }
}

/// Distance from `p` to the segment `[a, b]`.
pub fn point_segment_distance(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < GEO_EPS * GEO_EPS {
        return na::distance(p, a);
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    na::distance(p, &(a + ab * t))
}

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle with non-negative extents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn top(&self) -> f64 {
        self.y + self.h
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// GEO_EPS-tolerant point containment, boundary included.
    pub fn contains(&self, p: &Point2D) -> bool {
        p.x >= self.x - GEO_EPS
            && p.x <= self.right() + GEO_EPS
            && p.y >= self.y - GEO_EPS
            && p.y <= self.top() + GEO_EPS
    }

    /// Strict interior overlap. Rectangles that merely share an edge do not
    /// intersect.
    pub fn intersects(&self, o: &Rect) -> bool {
        self.x < o.right() - GEO_EPS
            && self.right() > o.x + GEO_EPS
            && self.y < o.top() - GEO_EPS
            && self.top() > o.y + GEO_EPS
    }

    pub fn expanded(&self, d: f64) -> Rect {
        Rect::new(self.x - d, self.y - d, self.w + 2.0 * d, self.h + 2.0 * d)
    }

    pub fn from_points(pts: &[Point2D]) -> Rect {
        let Some(first) = pts.first() else {
            return Rect::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in pts {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

// ---------------------------------------------------------------------------
// Polygon
// ---------------------------------------------------------------------------

/// A simple polygon, possibly non-convex. The ring is implicitly closed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub verts: Vec<Point2D>,
}

impl Polygon {
    pub fn new(verts: Vec<Point2D>) -> Self {
        Self { verts }
    }

    /// Builds a polygon from `(x, y)` pairs. Mostly a test convenience.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| Point2D::new(x, y)).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.verts.len()
    }

    /// Shoelace sum. Positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        let n = self.verts.len();
        if n < 3 {
            return 0.0;
        }
        let mut a = 0.0;
        for i in 0..n {
            let p = &self.verts[i];
            let q = &self.verts[(i + 1) % n];
            a += p.coords.perp(&q.coords);
        }
        a * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn make_ccw(&mut self) {
        if !self.is_ccw() {
            self.verts.reverse();
        }
    }

    pub fn make_cw(&mut self) {
        if self.is_ccw() {
            self.verts.reverse();
        }
    }

    /// Area centroid. Degenerate polygons (|area| < GEO_EPS) fall back to
    /// the vertex mean.
    pub fn centroid(&self) -> Point2D {
        if self.verts.is_empty() {
            return Point2D::origin();
        }
        let a = self.signed_area();
        if a.abs() < GEO_EPS {
            let sum = self
                .verts
                .iter()
                .fold(Vector2D::zeros(), |acc, p| acc + p.coords);
            return Point2D::origin() + sum / self.verts.len() as f64;
        }
        let n = self.verts.len();
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let p = &self.verts[i];
            let q = &self.verts[(i + 1) % n];
            let f = p.coords.perp(&q.coords);
            cx += (p.x + q.x) * f;
            cy += (p.y + q.y) * f;
        }
        Point2D::new(cx / (6.0 * a), cy / (6.0 * a))
    }

    pub fn bounding_box(&self) -> Rect {
        Rect::from_points(&self.verts)
    }

    /// Index of the reference vertex: lowest y, ties broken leftmost.
    pub fn ref_vertex_index(&self) -> usize {
        let mut idx = 0;
        for (i, v) in self.verts.iter().enumerate().skip(1) {
            let best = &self.verts[idx];
            if v.y < best.y || (v.y == best.y && v.x < best.x) {
                idx = i;
            }
        }
        idx
    }

    pub fn ref_vertex(&self) -> Point2D {
        self.verts[self.ref_vertex_index()]
    }

    /// Drops adjacent duplicates and a wrap-around duplicate of the first
    /// vertex.
    pub fn remove_duplicates(&mut self, tol: f64) {
        if self.verts.len() < 2 {
            return;
        }
        let mut res: Vec<Point2D> = Vec::with_capacity(self.verts.len());
        res.push(self.verts[0]);
        for v in &self.verts[1..] {
            if !nearly_equal(v, res.last().unwrap(), tol) {
                res.push(*v);
            }
        }
        if res.len() > 1 && nearly_equal(res.last().unwrap(), &res[0], tol) {
            res.pop();
        }
        self.verts = res;
    }

    /// Canonical form: CCW orientation, no duplicate vertices.
    pub fn normalize(&mut self) {
        self.remove_duplicates(POINT_TOL);
        self.make_ccw();
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Polygon {
        let d = Vector2D::new(dx, dy);
        Polygon::new(self.verts.iter().map(|p| p + d).collect())
    }

    pub fn rotated_around(&self, angle_deg: f64, pivot: &Point2D) -> Polygon {
        let rot = na::Rotation2::new(angle_deg.to_radians());
        Polygon::new(self.verts.iter().map(|p| pivot + rot * (p - pivot)).collect())
    }

    /// Point reflection through the origin, `(x, y) -> (-x, -y)`.
    pub fn reflected(&self) -> Polygon {
        Polygon::new(self.verts.iter().map(|p| Point2D::new(-p.x, -p.y)).collect())
    }

    /// Even-odd ray casting. Boundary points are not considered inside.
    pub fn contains_point(&self, p: &Point2D) -> bool {
        let n = self.verts.len();
        let mut inside = false;
        let mut j = n.wrapping_sub(1);
        for i in 0..n {
            let vi = &self.verts[i];
            let vj = &self.verts[j];
            if ((vi.y > p.y) != (vj.y > p.y))
                && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Proper interior crossing of two segments. Parallel segments never
    /// intersect here, including collinear overlap; callers that care rely
    /// on the bbox-coincidence fallback in [`Polygon::intersects`].
    pub fn segments_intersect(a1: &Point2D, a2: &Point2D, b1: &Point2D, b2: &Point2D) -> bool {
        let da = a2 - a1;
        let db = b2 - b1;
        let denom = da.perp(&db);
        if denom.abs() < GEO_EPS {
            return false;
        }
        let t = (b1 - a1).perp(&db) / denom;
        let u = (b1 - a1).perp(&da) / denom;
        t > GEO_EPS && t < 1.0 - GEO_EPS && u > GEO_EPS && u < 1.0 - GEO_EPS
    }

    /// Contour overlap test: AABB pre-filter, identical-bbox shortcut, edge
    /// crossings, then mutual containment sampled over a few vertices.
    pub fn intersects(&self, other: &Polygon) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        let bb1 = self.bounding_box();
        let bb2 = other.bounding_box();
        if !bb1.intersects(&bb2) {
            return false;
        }

        // Identically overlaid contours have parallel edges everywhere and
        // no proper crossing. Near-coincident bounding boxes are treated as
        // overlap outright.
        if (bb1.x - bb2.x).abs() < 0.5
            && (bb1.y - bb2.y).abs() < 0.5
            && (bb1.w - bb2.w).abs() < 0.5
            && (bb1.h - bb2.h).abs() < 0.5
        {
            return true;
        }

        let n1 = self.verts.len();
        let n2 = other.verts.len();
        for i in 0..n1 {
            for j in 0..n2 {
                if Self::segments_intersect(
                    &self.verts[i],
                    &self.verts[(i + 1) % n1],
                    &other.verts[j],
                    &other.verts[(j + 1) % n2],
                ) {
                    return true;
                }
            }
        }

        // One contour may lie entirely inside the other. Checking a handful
        // of vertices per side also covers non-convex shapes whose first
        // vertex happens to sit outside.
        for v in self.verts.iter().take(n1.min(5)) {
            if other.contains_point(v) {
                return true;
            }
        }
        for v in other.verts.iter().take(n2.min(5)) {
            if self.contains_point(v) {
                return true;
            }
        }

        false
    }

    /// Minimum distance between contours, zero when they overlap.
    pub fn distance_to(&self, other: &Polygon) -> f64 {
        if self.intersects(other) {
            return 0.0;
        }
        let n1 = self.verts.len();
        let n2 = other.verts.len();
        let mut min_dist = f64::INFINITY;
        for i in 0..n1 {
            for j in 0..n2 {
                min_dist = min_dist.min(point_segment_distance(
                    &self.verts[i],
                    &other.verts[j],
                    &other.verts[(j + 1) % n2],
                ));
                min_dist = min_dist.min(point_segment_distance(
                    &other.verts[j],
                    &self.verts[i],
                    &self.verts[(i + 1) % n1],
                ));
            }
        }
        min_dist
    }

    /// Graham scan. Pivot is the lowest-then-leftmost point, collinear
    /// points are kept ordered by distance. The hull is CCW.
    pub fn convex_hull(mut pts: Vec<Point2D>) -> Polygon {
        let n = pts.len();
        if n < 3 {
            return Polygon::new(pts);
        }

        let mut bot = 0;
        for i in 1..n {
            if pts[i].y < pts[bot].y || (pts[i].y == pts[bot].y && pts[i].x < pts[bot].x) {
                bot = i;
            }
        }
        pts.swap(0, bot);
        let pivot = pts[0];

        pts[1..].sort_by(|a, b| {
            let da = a - pivot;
            let db = b - pivot;
            let c = da.perp(&db);
            if c.abs() > GEO_EPS {
                // Positive cross product means `a` comes first in CCW order.
                0.0_f64.total_cmp(&c)
            } else {
                da.norm_squared().total_cmp(&db.norm_squared())
            }
        });

        let mut hull: Vec<Point2D> = Vec::with_capacity(n);
        for p in pts {
            while hull.len() >= 2 {
                let a = hull[hull.len() - 2];
                let b = hull[hull.len() - 1];
                if (b - a).perp(&(p - a)) <= GEO_EPS {
                    hull.pop();
                } else {
                    break;
                }
            }
            hull.push(p);
        }
        Polygon::new(hull)
    }

    pub fn to_convex_hull(&self) -> Polygon {
        Self::convex_hull(self.verts.clone())
    }

    pub fn is_convex(&self) -> bool {
        let n = self.verts.len();
        if n < 3 {
            return false;
        }
        let mut sign = 0i8;
        for i in 0..n {
            let e1 = self.verts[(i + 1) % n] - self.verts[i];
            let e2 = self.verts[(i + 2) % n] - self.verts[(i + 1) % n];
            let c = e1.perp(&e2);
            if c.abs() < GEO_EPS {
                continue;
            }
            let s = if c > 0.0 { 1 } else { -1 };
            if sign == 0 {
                sign = s;
            } else if s != sign {
                return false;
            }
        }
        true
    }

    /// Douglas-Peucker simplification preserving the first and last vertex.
    pub fn simplified(&self, eps: f64) -> Polygon {
        let n = self.verts.len();
        if n <= 4 {
            return self.clone();
        }
        let mut keep = vec![false; n];
        keep[0] = true;
        keep[n - 1] = true;
        dp_step(&self.verts, 0, n - 1, eps, &mut keep);
        Polygon::new(
            self.verts
                .iter()
                .zip(&keep)
                .filter(|(_, &k)| k)
                .map(|(p, _)| *p)
                .collect(),
        )
    }

    /// Minkowski sum of two convex polygons by merging edge sequences from
    /// the lowest vertices, O(n + m).
    pub fn minkowski_sum_convex(mut a: Polygon, mut b: Polygon) -> Polygon {
        a.make_ccw();
        b.make_ccw();

        let ia = a.ref_vertex_index();
        let ib = b.ref_vertex_index();
        let na = a.verts.len();
        let nb = b.verts.len();

        let mut result: Vec<Point2D> = Vec::with_capacity(na + nb);
        let (mut i, mut j) = (0usize, 0usize);
        while i < na || j < nb {
            let ci = i.min(na - 1);
            let cj = j.min(nb - 1);
            let pa = a.verts[(ia + ci) % na];
            let pb = b.verts[(ib + cj) % nb];
            result.push(Point2D::new(pa.x + pb.x, pa.y + pb.y));
            let ea = a.verts[(ia + ci + 1) % na] - a.verts[(ia + ci) % na];
            let eb = b.verts[(ib + cj + 1) % nb] - b.verts[(ib + cj) % nb];
            let c = ea.perp(&eb);
            if i >= na {
                j += 1;
            } else if j >= nb {
                i += 1;
            } else if c > GEO_EPS {
                i += 1;
            } else if c < -GEO_EPS {
                j += 1;
            } else {
                i += 1;
                j += 1;
            }
        }

        let mut r = Polygon::new(result);
        r.remove_duplicates(POINT_TOL);
        r
    }
}

fn dp_step(pts: &[Point2D], s: usize, e: usize, eps: f64, keep: &mut [bool]) {
    if e <= s + 1 {
        return;
    }
    let a = pts[s];
    let b = pts[e];
    let ab = b - a;
    let len = ab.norm();
    let mut max_d = 0.0;
    let mut idx = s;
    for (i, p) in pts.iter().enumerate().take(e).skip(s + 1) {
        let d = if len < GEO_EPS {
            (p - a).norm()
        } else {
            ab.perp(&(p - a)).abs() / len
        };
        if d > max_d {
            max_d = d;
            idx = i;
        }
    }
    if max_d > eps {
        keep[idx] = true;
        dp_step(pts, s, idx, eps, keep);
        dp_step(pts, idx, e, eps, keep);
    }
}
