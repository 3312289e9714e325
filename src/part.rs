//! Part templates and their placed instances.
//!
//! A [`Part`] is a loader-produced template in local coordinates: after
//! [`Part::normalize`] the lower-left corner of its bounding box sits at the
//! origin and its engraving marks are shifted by the same offset. Placing a
//! part produces a [`PlacedPart`] that owns the transformed geometry in
//! sheet coordinates; it keeps no reference back to the template.

use crate::geometry::{Point2D, Polygon, Rect, GEO_EPS};

/// Template of a part to nest, in normalized local coordinates.
#[derive(Clone, Debug)]
pub struct Part {
    pub id: i32,
    pub name: String,
    /// Outer cut contour. Invariant after `normalize`: CCW with the
    /// bounding-box lower-left at (0, 0).
    pub shape: Polygon,
    /// Engraving contours in the same local frame as `shape`.
    pub marks: Vec<Polygon>,
    pub required_count: u32,
    pub placed_count: u32,
}

impl Part {
    pub fn new(id: i32, name: impl Into<String>, shape: Polygon) -> Self {
        Self {
            id,
            name: name.into(),
            shape,
            marks: Vec::new(),
            required_count: 1,
            placed_count: 0,
        }
    }

    pub fn with_marks(mut self, marks: Vec<Polygon>) -> Self {
        self.marks = marks;
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.required_count = count;
        self
    }

    pub fn area(&self) -> f64 {
        self.shape.area()
    }

    pub fn bounding_box(&self) -> Rect {
        self.shape.bounding_box()
    }

    pub fn bounding_box_rotated(&self, angle_deg: f64) -> Rect {
        self.transformed_shape(angle_deg).bounding_box()
    }

    pub fn is_fully_placed(&self) -> bool {
        self.placed_count >= self.required_count
    }

    pub fn reset_placement(&mut self) {
        self.placed_count = 0;
    }

    /// Makes the shape CCW and shifts shape and marks so that the shape's
    /// bounding-box lower-left lands at the origin.
    pub fn normalize(&mut self) {
        if self.shape.is_empty() {
            return;
        }
        self.shape.make_ccw();
        let bb = self.shape.bounding_box();
        let (dx, dy) = (-bb.x, -bb.y);
        self.shape = self.shape.translated(dx, dy);
        for m in &mut self.marks {
            *m = m.translated(dx, dy);
        }
    }

    /// Contour rotated by `angle_deg` around the shape centroid, then
    /// re-normalized so the rotated bounding box starts at the origin.
    pub fn transformed_shape(&self, angle_deg: f64) -> Polygon {
        if angle_deg.abs() < GEO_EPS {
            return self.shape.clone();
        }
        let pivot = self.shape.centroid();
        let rotated = self.shape.rotated_around(angle_deg, &pivot);
        let bb = rotated.bounding_box();
        rotated.translated(-bb.x, -bb.y)
    }

    /// Produces the placed instance at `pos` (sheet coordinates of the
    /// transformed bounding-box lower-left) under `angle_deg`.
    pub fn place(&self, pos: Point2D, angle_deg: f64) -> PlacedPart {
        let transformed = self.transformed_shape(angle_deg);
        let shape = transformed.translated(pos.x, pos.y);

        // Marks rotate around the same centroid pivot as the shape and then
        // receive the shape's pre-normalization bbox offset plus `pos`, so
        // the mark-to-contour relation survives the rotation.
        let marks = if angle_deg.abs() > GEO_EPS {
            let pivot = self.shape.centroid();
            let rot_bb = self.shape.rotated_around(angle_deg, &pivot).bounding_box();
            let off_x = -rot_bb.x + pos.x;
            let off_y = -rot_bb.y + pos.y;
            self.marks
                .iter()
                .map(|m| m.rotated_around(angle_deg, &pivot).translated(off_x, off_y))
                .collect()
        } else {
            self.marks
                .iter()
                .map(|m| m.translated(pos.x, pos.y))
                .collect()
        };

        PlacedPart {
            part_id: self.id,
            shape,
            marks,
            position: pos,
            angle: angle_deg,
        }
    }
}

/// A part instance fixed on a sheet, geometry already in sheet coordinates.
#[derive(Clone, Debug)]
pub struct PlacedPart {
    pub part_id: i32,
    pub shape: Polygon,
    pub marks: Vec<Polygon>,
    /// Lower-left corner of the transformed bounding box.
    pub position: Point2D,
    /// Rotation applied at placement, in degrees.
    pub angle: f64,
}
