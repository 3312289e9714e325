//! No-Fit Polygon computation and the related placement primitives.
//!
//! The NFP of a fixed polygon A and a moving polygon B is the locus of
//! positions of B's local origin (for a normalized part, its bounding-box
//! lower-left) at which B touches A without overlapping it; positions
//! strictly inside the NFP cause overlap.
//!
//! For two convex polygons the orbital method is exact: the sorted merge of
//! A's edges with B's negated edges traces the boundary of the Minkowski
//! sum A ⊕ (−B). Non-convex inputs go through a conservative route: each
//! polygon is fan-decomposed into triangles from its centroid, the orbital
//! NFP is computed for every pair of triangle hulls and the convex hull of
//! all partial NFP vertices is returned. This over-approximates the
//! forbidden region, so it can reject legal placements but never admits an
//! overlapping one.

use std::collections::HashMap;

use tracing::warn;

use crate::geometry::{vec_angle_2pi, Point2D, Polygon, Rect, Vector2D, GEO_EPS, POINT_TOL};

/// Cache of NFPs in the fixed part's local frame, keyed by
/// [`nfp_key`]. Single-writer during a phase; merged across phases by the
/// owner.
pub type NfpCache = HashMap<String, Polygon>;

/// Canonical cache key for a (fixed, moving) pair under given rotations.
pub fn nfp_key(fixed_id: i32, fixed_angle: f64, moving_id: i32, moving_angle: f64) -> String {
    format!("{fixed_id}_{fixed_angle:.1}__{moving_id}_{moving_angle:.1}")
}

/// The region in which a bounding box of size `(part_bb.w, part_bb.h)` can
/// have its lower-left corner so the whole box stays inside `area`.
/// `None` when the part does not fit in either dimension.
pub fn inner_fit_rect(area: &Rect, part_bb: &Rect) -> Option<Rect> {
    let w = area.w - part_bb.w;
    let h = area.h - part_bb.h;
    if w < -GEO_EPS || h < -GEO_EPS {
        return None;
    }
    Some(Rect::new(area.x, area.y, w.max(0.0), h.max(0.0)))
}

/// Offsets a contour outward by `dist` using averaged adjacent-edge
/// normals, which preserves concavities (a convex-hull based offset would
/// destroy them). The offset at a vertex is the normalized average of the
/// two edge normals scaled to `dist`; a degenerate edge falls back to the
/// surviving normal. If the offset ring collapses or self-intersects the
/// original polygon is returned unchanged.
pub fn inflate(p: &Polygon, dist: f64) -> Polygon {
    let n = p.verts.len();
    if n < 3 {
        return p.clone();
    }

    let mut cp = p.clone();
    cp.make_ccw();

    let mut offset_verts: Vec<Point2D> = Vec::with_capacity(n);
    for i in 0..n {
        let a = cp.verts[(i + n - 1) % n];
        let b = cp.verts[i];
        let c = cp.verts[(i + 1) % n];

        let e1 = b - a;
        let e2 = c - b;
        let l1 = e1.norm();
        let l2 = e2.norm();
        if l1 < GEO_EPS || l2 < GEO_EPS {
            offset_verts.push(b);
            continue;
        }

        // Outward normal of a CCW edge is its right-hand perpendicular.
        let n1 = Vector2D::new(e1.y / l1, -e1.x / l1);
        let n2 = Vector2D::new(e2.y / l2, -e2.x / l2);

        let avg = (n1 + n2) * 0.5;
        let alen = avg.norm();
        let dir = if alen < GEO_EPS { n1 } else { avg / alen };
        offset_verts.push(b + dir * dist);
    }

    let mut result = Polygon::new(offset_verts);
    result.remove_duplicates(POINT_TOL);
    if result.len() < 3 || !is_simple(&result) {
        return p.clone();
    }
    result.make_ccw();
    result
}

// Proper self-crossing between any two non-adjacent edges.
fn is_simple(p: &Polygon) -> bool {
    let n = p.verts.len();
    for i in 0..n {
        for j in (i + 1)..n {
            if j == i || (j + 1) % n == i || (i + 1) % n == j {
                continue;
            }
            if Polygon::segments_intersect(
                &p.verts[i],
                &p.verts[(i + 1) % n],
                &p.verts[j],
                &p.verts[(j + 1) % n],
            ) {
                return false;
            }
        }
    }
    true
}

/// Orbital NFP of two CCW convex polygons, O(n + m).
///
/// Walks A's edges merged with B's negated edges in polar-angle order,
/// ties resolved in favour of the fixed polygon. The cursor starts at the
/// lowest vertex of A ⊕ (−B), which is `A[lowest] + (−B)[lowest]`, so the
/// traced ring is the sum boundary itself: the positions of B's local
/// origin at which B touches A. Every NFP vertex is a difference
/// `a_i − b_j` of input vertices.
pub fn convex_orbital_nfp(a: &Polygon, b: &Polygon) -> Polygon {
    let na = a.verts.len();
    let nb = b.verts.len();
    if na < 3 || nb < 3 {
        return Polygon::default();
    }

    let start_a = a.ref_vertex_index();
    let start_b = b.ref_vertex_index();
    let neg_b_low = b.reflected().ref_vertex();
    let start_pos = Point2D::new(
        a.verts[start_a].x + neg_b_low.x,
        a.verts[start_a].y + neg_b_low.y,
    );

    struct EdgeVec {
        v: Vector2D,
        angle: f64,
        moving: bool,
    }

    let mut edges: Vec<EdgeVec> = Vec::with_capacity(na + nb);
    for i in 0..na {
        let v = a.verts[(start_a + i + 1) % na] - a.verts[(start_a + i) % na];
        if v.norm_squared() < GEO_EPS * GEO_EPS {
            continue;
        }
        edges.push(EdgeVec {
            v,
            angle: vec_angle_2pi(&v),
            moving: false,
        });
    }
    for j in 0..nb {
        let v = -(b.verts[(start_b + j + 1) % nb] - b.verts[(start_b + j) % nb]);
        if v.norm_squared() < GEO_EPS * GEO_EPS {
            continue;
        }
        edges.push(EdgeVec {
            v,
            angle: vec_angle_2pi(&v),
            moving: true,
        });
    }

    edges.sort_by(|a, b| {
        if (a.angle - b.angle).abs() > 1e-9 {
            a.angle.total_cmp(&b.angle)
        } else {
            a.moving.cmp(&b.moving)
        }
    });

    let mut nfp_verts: Vec<Point2D> = Vec::with_capacity(na + nb + 1);
    nfp_verts.push(start_pos);
    let mut cur = start_pos;
    for e in &edges {
        cur += e.v;
        nfp_verts.push(cur);
    }

    let mut nfp = Polygon::new(nfp_verts);
    nfp.remove_duplicates(POINT_TOL);
    nfp
}

/// NFP of `fixed` vs `moving`, both in the fixed polygon's local frame.
///
/// Convex pairs use the exact orbital method. Non-convex inputs use the
/// conservative decomposition described in the module docs; if every
/// partial NFP degenerates the hull-vs-hull orbital NFP is used as a last
/// resort. Returns `None` when either input has fewer than 3 usable
/// vertices.
pub fn compute_nfp(fixed: &Polygon, moving: &Polygon) -> Option<Polygon> {
    let mut a = fixed.clone();
    a.make_ccw();
    a.remove_duplicates(POINT_TOL);
    let mut b = moving.clone();
    b.make_ccw();
    b.remove_duplicates(POINT_TOL);

    if a.len() < 3 || b.len() < 3 {
        return None;
    }

    if a.is_convex() && b.is_convex() {
        let mut nfp = convex_orbital_nfp(&a, &b);
        nfp.make_ccw();
        return Some(nfp);
    }

    let parts_a = fan_decompose(&a);
    let parts_b = fan_decompose(&b);

    let mut all_verts: Vec<Point2D> = Vec::new();
    for pa in &parts_a {
        for pb in &parts_b {
            let mut ha = pa.to_convex_hull();
            let mut hb = pb.to_convex_hull();
            ha.make_ccw();
            hb.make_ccw();
            if ha.len() < 3 || hb.len() < 3 {
                continue;
            }
            let partial = convex_orbital_nfp(&ha, &hb);
            all_verts.extend_from_slice(&partial.verts);
        }
    }

    if all_verts.is_empty() {
        // Every decomposition pair degenerated. Fall back to the hulls of
        // the whole polygons, which is still conservative.
        warn!("all partial NFPs empty, falling back to hull-vs-hull NFP");
        let mut ha = a.to_convex_hull();
        let mut hb = b.to_convex_hull();
        ha.make_ccw();
        hb.make_ccw();
        let mut nfp = convex_orbital_nfp(&ha, &hb);
        nfp.make_ccw();
        return if nfp.is_empty() { None } else { Some(nfp) };
    }

    let mut nfp = Polygon::convex_hull(all_verts);
    nfp.make_ccw();
    if nfp.is_empty() {
        warn!("non-convex NFP degenerated to an empty polygon");
        return None;
    }
    Some(nfp)
}

// Triangle fan from the centroid; convex polygons pass through unchanged.
// Slivers below the area tolerance are discarded.
fn fan_decompose(p: &Polygon) -> Vec<Polygon> {
    let n = p.verts.len();
    if n < 3 {
        return Vec::new();
    }
    if p.is_convex() {
        return vec![p.clone()];
    }

    let c = p.centroid();
    let mut parts = Vec::with_capacity(n);
    for i in 0..n {
        let mut tri = Polygon::new(vec![c, p.verts[i], p.verts[(i + 1) % n]]);
        if tri.area() > GEO_EPS {
            tri.make_ccw();
            parts.push(tri);
        }
    }
    if parts.is_empty() {
        parts.push(p.clone());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(side: f64) -> Polygon {
        Polygon::from_coords(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)])
    }

    #[test]
    fn key_formats_one_decimal() {
        assert_eq!(nfp_key(3, 90.0, 7, 0.0), "3_90.0__7_0.0");
        assert_eq!(nfp_key(1, 0.0, 1, 270.0), "1_0.0__1_270.0");
    }

    #[test]
    fn ifr_of_fitting_and_oversized_part() {
        let area = Rect::new(10.0, 10.0, 100.0, 50.0);
        let ifr = inner_fit_rect(&area, &Rect::new(0.0, 0.0, 40.0, 20.0)).unwrap();
        assert_eq!(ifr, Rect::new(10.0, 10.0, 60.0, 30.0));

        // Exact fit collapses to a single point.
        let exact = inner_fit_rect(&area, &Rect::new(0.0, 0.0, 100.0, 50.0)).unwrap();
        assert_abs_diff_eq!(exact.w, 0.0);
        assert_abs_diff_eq!(exact.h, 0.0);

        assert!(inner_fit_rect(&area, &Rect::new(0.0, 0.0, 101.0, 20.0)).is_none());
    }

    #[test]
    fn nfp_of_two_squares_is_their_sum_box() {
        let a = square(10.0);
        let b = square(10.0);
        let nfp = compute_nfp(&a, &b).unwrap();
        let bb = nfp.bounding_box();
        // Positions of B's lower-left vertex touching A span [-10, 10]^2.
        assert_abs_diff_eq!(bb.x, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bb.y, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bb.w, 20.0, epsilon = 1e-9);
        assert_abs_diff_eq!(bb.h, 20.0, epsilon = 1e-9);
        assert!(nfp.is_ccw());
    }

    #[test]
    fn convex_nfp_vertices_are_vertex_differences() {
        let a = Polygon::from_coords(&[(0.0, 0.0), (8.0, 0.0), (4.0, 6.0)]);
        let b = Polygon::from_coords(&[(0.0, 0.0), (5.0, 0.0), (5.0, 3.0), (0.0, 3.0)]);
        let nfp = compute_nfp(&a, &b).unwrap();
        for v in &nfp.verts {
            let matched = a.verts.iter().any(|av| {
                b.verts
                    .iter()
                    .any(|bv| (av.x - bv.x - v.x).abs() < 1e-6 && (av.y - bv.y - v.y).abs() < 1e-6)
            });
            assert!(matched, "NFP vertex {v:?} is not a vertex difference");
        }
    }

    #[test]
    fn non_convex_nfp_is_conservative() {
        let l_shape = Polygon::from_coords(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 4.0),
            (4.0, 4.0),
            (4.0, 10.0),
            (0.0, 10.0),
        ]);
        let b = square(3.0);
        let nfp = compute_nfp(&l_shape, &b).unwrap();

        // The conservative NFP must cover the NFP of the convex hulls.
        let hull_nfp = compute_nfp(&l_shape.to_convex_hull(), &b).unwrap();
        let bb = nfp.bounding_box();
        let hull_bb = hull_nfp.bounding_box();
        assert!(bb.x <= hull_bb.x + 1e-6);
        assert!(bb.y <= hull_bb.y + 1e-6);
        assert!(bb.right() >= hull_bb.right() - 1e-6);
        assert!(bb.top() >= hull_bb.top() - 1e-6);
    }

    #[test]
    fn degenerate_inputs_yield_none() {
        let sliver = Polygon::from_coords(&[(0.0, 0.0), (10.0, 0.0)]);
        assert!(compute_nfp(&sliver, &square(5.0)).is_none());
        assert!(compute_nfp(&square(5.0), &sliver).is_none());
    }

    #[test]
    fn inflate_grows_square_outward() {
        let p = square(10.0);
        let inflated = inflate(&p, 5.0);
        let bb = inflated.bounding_box();
        // Corner vertices move 5 units along the averaged diagonal normal,
        // so each side extends by 5/sqrt(2).
        let d = 5.0 / 2.0_f64.sqrt();
        assert_abs_diff_eq!(bb.x, -d, epsilon = 1e-9);
        assert_abs_diff_eq!(bb.y, -d, epsilon = 1e-9);
        assert_abs_diff_eq!(bb.w, 10.0 + 2.0 * d, epsilon = 1e-9);
        assert!(inflated.is_ccw());
        assert!(inflated.area() > p.area());
    }

    #[test]
    fn inflate_preserves_concavity() {
        let l_shape = Polygon::from_coords(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 4.0),
            (4.0, 4.0),
            (4.0, 10.0),
            (0.0, 10.0),
        ]);
        let inflated = inflate(&l_shape, 0.5);
        assert_eq!(inflated.len(), l_shape.len());
        assert!(!inflated.is_convex());
    }

    #[test]
    fn inflate_degenerate_returns_original() {
        let sliver = Polygon::from_coords(&[(0.0, 0.0), (10.0, 0.0)]);
        assert_eq!(inflate(&sliver, 2.0), sliver);
    }
}
