//! A sheet holds placed parts and answers the placement query.
//!
//! `find_best_placement` implements the NFP-driven Bottom-Left search:
//!
//! 1. compute the IFR, the admissible region for the part's bounding-box
//!    lower-left on this sheet,
//! 2. compute the NFP against every placed part; positions strictly inside
//!    any NFP overlap that part,
//! 3. evaluate candidate positions (IFR corners, NFP vertices, an adaptive
//!    grid) and keep the Bottom-Left best, scored as `10·y + 0.7·x`.
//!
//! The minimum gap between parts is folded into the NFPs by inflating the
//! fixed contour before the NFP computation, so the validity predicate only
//! has to test plain contour intersection.

use tracing::{debug, warn};

use crate::algorithms::nfp::{self, NfpCache};
use crate::geometry::{Point2D, Polygon, Rect, GEO_EPS};
use crate::part::{Part, PlacedPart};

const MAX_GRID: f64 = 30.0;
const MAX_CANDIDATES_PER_ANGLE: usize = 10_000;

/// A successful placement decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub pos: Point2D,
    pub angle: f64,
}

/// One physical sheet: dimensions, the border margin, the inter-part gap
/// and the parts already fixed on it.
#[derive(Clone, Debug)]
pub struct Sheet {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub gap: f64,
    pub placed: Vec<PlacedPart>,
}

impl Sheet {
    pub fn new(width: f64, height: f64, margin: f64, gap: f64) -> Self {
        Self {
            width,
            height,
            margin,
            gap,
            placed: Vec::new(),
        }
    }

    /// Sheet rectangle shrunk by the margin on all sides.
    pub fn usable_area(&self) -> Rect {
        Rect::new(
            self.margin,
            self.margin,
            self.width - 2.0 * self.margin,
            self.height - 2.0 * self.margin,
        )
    }

    fn ifr(&self, part: &Part, angle: f64) -> Option<Rect> {
        nfp::inner_fit_rect(&self.usable_area(), &part.bounding_box_rotated(angle))
    }

    /// NFP of a placed part against `moving` at `moving_angle`, in sheet
    /// coordinates. Cached in the fixed part's local frame so the entry is
    /// reusable wherever that part ends up on a sheet.
    fn nfp_for(
        &self,
        fixed: &PlacedPart,
        moving: &Part,
        moving_angle: f64,
        cache: &mut NfpCache,
    ) -> Option<Polygon> {
        let key = nfp::nfp_key(fixed.part_id, fixed.angle, moving.id, moving_angle);
        let fixed_bb = fixed.shape.bounding_box();

        if let Some(hit) = cache.get(&key) {
            if hit.is_empty() {
                return None;
            }
            return Some(hit.translated(fixed_bb.x, fixed_bb.y));
        }

        let mut fixed_local = fixed.shape.translated(-fixed_bb.x, -fixed_bb.y);
        let moving_local = moving.transformed_shape(moving_angle);

        if self.gap > GEO_EPS {
            fixed_local = nfp::inflate(&fixed_local, self.gap);
        }

        // The NFP is origin-referenced and the moving contour is
        // normalized, so NFP positions are directly the candidate
        // bounding-box lower-left positions.
        let entry = nfp::compute_nfp(&fixed_local, &moving_local).unwrap_or_default();
        if entry.is_empty() {
            warn!(
                fixed = fixed.part_id,
                moving = moving.id,
                "empty NFP cached for pair"
            );
        }

        let out = if entry.is_empty() {
            None
        } else {
            Some(entry.translated(fixed_bb.x, fixed_bb.y))
        };
        cache.insert(key, entry);
        out
    }

    // IFR corners first (the lower-left one is the Bottom-Left optimum when
    // free), then every NFP vertex that falls inside the IFR.
    fn candidate_points(ifr: &Rect, nfps: &[(Polygon, Rect)]) -> Vec<Point2D> {
        let mut candidates = vec![
            Point2D::new(ifr.x, ifr.y),
            Point2D::new(ifr.right(), ifr.y),
            Point2D::new(ifr.x, ifr.top()),
            Point2D::new(ifr.right(), ifr.top()),
        ];
        let expanded = ifr.expanded(GEO_EPS);
        for (nfp, _) in nfps {
            for v in &nfp.verts {
                if expanded.contains(v) {
                    candidates.push(*v);
                }
            }
        }
        candidates
    }

    /// Whether `shape` (already in sheet coordinates) can be fixed on this
    /// sheet: inside the usable area, no edge leaving it, and no contour
    /// intersection with any placed part. The gap is already encoded in the
    /// NFPs, so a plain intersection test suffices here.
    pub fn can_place(&self, shape: &Polygon) -> bool {
        let ua = self.usable_area();
        let bb = shape.bounding_box();

        if bb.x < ua.x - GEO_EPS
            || bb.y < ua.y - GEO_EPS
            || bb.right() > ua.right() + GEO_EPS
            || bb.top() > ua.top() + GEO_EPS
        {
            return false;
        }

        let expanded = ua.expanded(GEO_EPS);
        if !shape.verts.iter().all(|v| expanded.contains(v)) {
            return false;
        }

        // A concave contour can have all vertices inside while an edge
        // bulges across the border.
        let corners = [
            Point2D::new(ua.x, ua.y),
            Point2D::new(ua.right(), ua.y),
            Point2D::new(ua.right(), ua.top()),
            Point2D::new(ua.x, ua.top()),
        ];
        let n = shape.verts.len();
        for i in 0..n {
            let a = &shape.verts[i];
            let b = &shape.verts[(i + 1) % n];
            for e in 0..4 {
                if Polygon::segments_intersect(a, b, &corners[e], &corners[(e + 1) % 4]) {
                    return false;
                }
            }
        }

        for pp in &self.placed {
            let pbb = pp.shape.bounding_box();
            if !bb.intersects(&pbb.expanded(self.gap + GEO_EPS)) {
                continue;
            }
            if shape.intersects(&pp.shape) {
                return false;
            }
        }
        true
    }

    /// Bottom-Left placement search over the allowed angles.
    ///
    /// Returns the position and angle minimizing `10·y + 0.7·x`, or `None`
    /// when no candidate is feasible. A candidate within one length unit of
    /// the IFR bottom cannot be beaten meaningfully, which permits the
    /// early exits on both the candidate and the angle loop.
    pub fn find_best_placement(
        &self,
        part: &Part,
        angles: &[f64],
        cache: &mut NfpCache,
    ) -> Option<Placement> {
        // First part on the sheet: the IFR lower-left corner is provably
        // the Bottom-Left optimum, so take the first angle that fits.
        if self.placed.is_empty() {
            for &angle in angles {
                let Some(ifr) = self.ifr(part, angle) else {
                    continue;
                };
                let pos = Point2D::new(ifr.x, ifr.y);
                let shape_at = part.transformed_shape(angle).translated(pos.x, pos.y);
                if self.can_place(&shape_at) {
                    debug!(angle, x = pos.x, y = pos.y, "empty sheet, bottom-left corner");
                    return Some(Placement { pos, angle });
                }
            }
            return None;
        }

        let mut best: Option<Placement> = None;
        let mut best_score = f64::INFINITY;

        for &angle in angles {
            let Some(ifr) = self.ifr(part, angle) else {
                continue;
            };

            let part_shape = part.transformed_shape(angle);
            let part_bb = part_shape.bounding_box();

            // NFPs with their bounding boxes for the O(1) pre-filter.
            let mut nfps: Vec<(Polygon, Rect)> = Vec::with_capacity(self.placed.len());
            for pp in &self.placed {
                if let Some(nfp) = self.nfp_for(pp, part, angle, cache) {
                    let bb = nfp.bounding_box();
                    nfps.push((nfp, bb));
                }
            }

            let mut candidates = Self::candidate_points(&ifr, &nfps);

            // Adaptive grid, at most MAX_GRID steps per axis.
            if ifr.w > GEO_EPS && ifr.h > GEO_EPS {
                let step_min = self.gap.max(part_bb.w.min(part_bb.h) * 0.125);
                let step_x = step_min.max(ifr.w / MAX_GRID);
                let step_y = step_min.max(ifr.h / MAX_GRID);
                if step_x > GEO_EPS && step_y > GEO_EPS {
                    let mut y = ifr.y;
                    while y <= ifr.top() + GEO_EPS {
                        let mut x = ifr.x;
                        while x <= ifr.right() + GEO_EPS {
                            candidates.push(Point2D::new(x, y));
                            x += step_x;
                        }
                        y += step_y;
                    }
                }
            }

            let ifr_expanded = ifr.expanded(GEO_EPS);
            let early_exit_y = ifr.y + 1.0;
            let mut cnt_total = 0usize;
            let mut cnt_pass_nfp = 0usize;
            let mut cnt_pass_place = 0usize;

            for pos in &candidates {
                if !ifr_expanded.contains(pos) {
                    continue;
                }
                cnt_total += 1;
                if cnt_total > MAX_CANDIDATES_PER_ANGLE {
                    warn!(angle, "candidate limit reached, abandoning angle");
                    break;
                }

                let in_nfp = nfps.iter().any(|(nfp, bb)| {
                    bb.expanded(GEO_EPS).contains(pos) && nfp.contains_point(pos)
                });
                if in_nfp {
                    continue;
                }
                cnt_pass_nfp += 1;

                let shape_at = part_shape.translated(pos.x, pos.y);
                if !self.can_place(&shape_at) {
                    continue;
                }
                cnt_pass_place += 1;

                let score = pos.y * 10.0 + pos.x * 0.7;
                if score < best_score {
                    best_score = score;
                    best = Some(Placement { pos: *pos, angle });
                    // A position at the very bottom of the IFR cannot be
                    // improved upon.
                    if pos.y <= early_exit_y {
                        break;
                    }
                }
            }

            debug!(
                angle,
                nfps = nfps.len(),
                candidates = cnt_total,
                pass_nfp = cnt_pass_nfp,
                pass_place = cnt_pass_place,
                found = best.is_some(),
                "placement search"
            );

            if let Some(b) = &best {
                if b.pos.y <= ifr.y + 1.0 {
                    break;
                }
            }
        }

        best
    }

    /// Fixes `part` on the sheet at the given position and rotation.
    pub fn place(&mut self, part: &Part, pos: Point2D, angle_deg: f64) {
        self.placed.push(part.place(pos, angle_deg));
    }

    pub fn placed_area(&self) -> f64 {
        self.placed.iter().map(|pp| pp.shape.area()).sum()
    }

    /// Placed area over usable area, in `[0, 1]` for sane inputs.
    pub fn utilization(&self) -> f64 {
        let ua = self.usable_area().area();
        if ua > 0.0 {
            self.placed_area() / ua
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square_part(id: i32, side: f64) -> Part {
        let shape = Polygon::from_coords(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]);
        Part::new(id, format!("sq{id}"), shape)
    }

    #[test]
    fn empty_sheet_places_in_corner() {
        let sheet = Sheet::new(100.0, 100.0, 0.0, 0.0);
        let part = square_part(1, 10.0);
        let mut cache = NfpCache::new();
        let pl = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        assert_abs_diff_eq!(pl.pos.x, 0.0);
        assert_abs_diff_eq!(pl.pos.y, 0.0);
        assert_abs_diff_eq!(pl.angle, 0.0);
    }

    #[test]
    fn margin_shifts_the_corner() {
        let sheet = Sheet::new(100.0, 100.0, 10.0, 0.0);
        let part = square_part(1, 10.0);
        let mut cache = NfpCache::new();
        let pl = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        assert_abs_diff_eq!(pl.pos.x, 10.0);
        assert_abs_diff_eq!(pl.pos.y, 10.0);
    }

    #[test]
    fn oversized_part_has_no_placement() {
        let sheet = Sheet::new(10.0, 10.0, 0.0, 0.0);
        let part = square_part(1, 20.0);
        let mut cache = NfpCache::new();
        assert!(sheet
            .find_best_placement(&part, &[0.0, 90.0], &mut cache)
            .is_none());
    }

    #[test]
    fn exact_fit_places_at_margin_corner() {
        let sheet = Sheet::new(120.0, 120.0, 10.0, 0.0);
        let part = square_part(1, 100.0);
        let mut cache = NfpCache::new();
        let pl = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        assert_abs_diff_eq!(pl.pos.x, 10.0);
        assert_abs_diff_eq!(pl.pos.y, 10.0);
    }

    #[test]
    fn second_part_does_not_overlap() {
        let mut sheet = Sheet::new(100.0, 100.0, 0.0, 0.0);
        let part = square_part(1, 10.0);
        let mut cache = NfpCache::new();

        let p1 = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        sheet.place(&part, p1.pos, p1.angle);
        let p2 = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        sheet.place(&part, p2.pos, p2.angle);

        assert_eq!(sheet.placed.len(), 2);
        assert!(!sheet.placed[0].shape.intersects(&sheet.placed[1].shape));
    }

    #[test]
    fn gap_is_respected_between_parts() {
        let mut sheet = Sheet::new(100.0, 20.0, 0.0, 5.0);
        let part = square_part(1, 10.0);
        let mut cache = NfpCache::new();

        let p1 = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        sheet.place(&part, p1.pos, p1.angle);
        let p2 = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        sheet.place(&part, p2.pos, p2.angle);

        let d = sheet.placed[0].shape.distance_to(&sheet.placed[1].shape);
        assert!(d >= 5.0 - 1e-6, "distance {d} below the configured gap");
    }

    #[test]
    fn can_place_rejects_out_of_bounds() {
        let sheet = Sheet::new(50.0, 50.0, 5.0, 0.0);
        let shape =
            Polygon::from_coords(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(!sheet.can_place(&shape));
        assert!(sheet.can_place(&shape.translated(5.0, 5.0)));
    }

    #[test]
    fn utilization_counts_placed_area() {
        let mut sheet = Sheet::new(100.0, 100.0, 0.0, 0.0);
        assert_abs_diff_eq!(sheet.utilization(), 0.0);
        let part = square_part(1, 10.0);
        sheet.place(&part, Point2D::new(0.0, 0.0), 0.0);
        assert_abs_diff_eq!(sheet.utilization(), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn nfp_cache_fills_and_hits() {
        let mut sheet = Sheet::new(100.0, 100.0, 0.0, 0.0);
        let part = square_part(1, 10.0);
        let mut cache = NfpCache::new();

        let p1 = sheet.find_best_placement(&part, &[0.0], &mut cache).unwrap();
        sheet.place(&part, p1.pos, p1.angle);
        sheet.find_best_placement(&part, &[0.0], &mut cache);
        let entries = cache.len();
        assert!(entries >= 1);

        // A repeated query adds nothing new.
        sheet.find_best_placement(&part, &[0.0], &mut cache);
        assert_eq!(cache.len(), entries);
        assert!(cache.contains_key(&nfp::nfp_key(1, 0.0, 1, 0.0)));
    }
}
