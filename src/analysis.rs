//! Quality metrics for a finished nesting run: utilization aggregates and
//! the technology-card quantities used by downstream reporting.

use itertools::Itertools;

use crate::sheet::Sheet;

/// Aggregated manufacturing quantities for a set of filled sheets.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TechCard {
    /// Sum of all placed contour perimeters, in length units.
    pub total_cut_length: f64,
    /// `total_cut_length / cutting_speed`, in seconds.
    pub estimated_cut_time: f64,
    /// Gross sheet area consumed, `sheet_area × sheets`.
    pub material_used: f64,
    pub material_waste: f64,
    pub waste_percent: f64,
    pub sheets_used: usize,
    pub parts_placed: usize,
    pub parts_total: usize,
}

impl TechCard {
    pub fn compute(
        sheets: &[Sheet],
        parts_placed: usize,
        parts_total: usize,
        sheet_width: f64,
        sheet_height: f64,
        cutting_speed: f64,
    ) -> Self {
        let total_cut_length = total_cut_length(sheets);
        let material_used = sheet_width * sheet_height * sheets.len() as f64;
        let placed_area: f64 = sheets.iter().map(Sheet::placed_area).sum();
        let material_waste = material_used - placed_area;
        Self {
            total_cut_length,
            estimated_cut_time: if cutting_speed > 0.0 {
                total_cut_length / cutting_speed
            } else {
                0.0
            },
            material_used,
            material_waste,
            waste_percent: if material_used > 0.0 {
                material_waste * 100.0 / material_used
            } else {
                0.0
            },
            sheets_used: sheets.len(),
            parts_placed,
            parts_total,
        }
    }
}

/// Perimeter of every placed cut contour across all sheets.
pub fn total_cut_length(sheets: &[Sheet]) -> f64 {
    let mut length = 0.0;
    for sheet in sheets {
        for pp in &sheet.placed {
            for (a, b) in pp.shape.verts.iter().circular_tuple_windows::<(_, _)>() {
                length += nalgebra::distance(a, b);
            }
        }
    }
    length
}

/// Mean per-sheet utilization, zero for an empty run.
pub fn average_utilization(sheets: &[Sheet]) -> f64 {
    if sheets.is_empty() {
        return 0.0;
    }
    sheets.iter().map(Sheet::utilization).sum::<f64>() / sheets.len() as f64
}
