//! Greedy multi-sheet packer.
//!
//! Parts are ordered by descending area and poured onto sheets one at a
//! time; whatever does not fit is carried over to the next sheet. The loop
//! stops when a whole pass places nothing, which leaves genuinely
//! unplaceable parts in the remainder instead of spinning on fresh sheets.

use itertools::Itertools;
use tracing::{debug, info};

use crate::algorithms::nfp::NfpCache;
use crate::part::Part;
use crate::sheet::Sheet;
use crate::CancelToken;

/// Fills one sheet from `parts` in the given order. Returns the parts that
/// did not fit.
pub fn fill_sheet<'a>(
    sheet: &mut Sheet,
    parts: &[&'a Part],
    angles: &[f64],
    cache: &mut NfpCache,
    cancel: &CancelToken,
) -> Vec<&'a Part> {
    let mut unplaced = Vec::new();
    for &part in parts {
        if cancel.is_cancelled() {
            unplaced.push(part);
            continue;
        }
        match sheet.find_best_placement(part, angles, cache) {
            Some(pl) => sheet.place(part, pl.pos, pl.angle),
            None => unplaced.push(part),
        }
    }
    unplaced
}

/// Largest-area-first packing over as many sheets as needed.
pub fn nest_greedy(
    parts: &[Part],
    template: &Sheet,
    angles: &[f64],
    cache: &mut NfpCache,
    cancel: &CancelToken,
    mut report: impl FnMut(i32, &str),
) -> Vec<Sheet> {
    let mut remaining: Vec<&Part> = parts
        .iter()
        .sorted_by(|a, b| b.area().total_cmp(&a.area()))
        .collect_vec();

    let total = remaining.len();
    let mut done = 0usize;
    let mut sheets: Vec<Sheet> = Vec::new();

    while !remaining.is_empty() && !cancel.is_cancelled() {
        let mut sheet = template.clone();
        sheet.placed.clear();
        let next = fill_sheet(&mut sheet, &remaining, angles, cache, cancel);

        if next.len() == remaining.len() {
            info!(unplaced = next.len(), "no part fits on a fresh sheet");
            report(100, "remaining parts do not fit on the sheet");
            break;
        }

        done += remaining.len() - next.len();
        remaining = next;
        debug!(
            sheet = sheets.len() + 1,
            placed = sheet.placed.len(),
            utilization = sheet.utilization(),
            "sheet filled"
        );
        sheets.push(sheet);

        let pct = if total > 0 {
            (done * 100 / total) as i32
        } else {
            100
        };
        report(
            pct,
            &format!("greedy nesting | sheet {} | {done}/{total} parts", sheets.len()),
        );
    }

    sheets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn square_part(id: i32, side: f64) -> Part {
        let shape = Polygon::from_coords(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]);
        Part::new(id, format!("sq{id}"), shape)
    }

    #[test]
    fn packs_four_squares_on_one_sheet() {
        let parts: Vec<Part> = (0..4).map(|i| square_part(i, 10.0)).collect();
        let template = Sheet::new(30.0, 30.0, 0.0, 0.0);
        let mut cache = NfpCache::new();
        let sheets = nest_greedy(
            &parts,
            &template,
            &[0.0],
            &mut cache,
            &CancelToken::new(),
            |_, _| {},
        );
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].placed.len(), 4);
    }

    #[test]
    fn overflow_rolls_to_second_sheet() {
        let parts: Vec<Part> = (0..3).map(|i| square_part(i, 10.0)).collect();
        // Only two 10-squares fit per 20x10 sheet.
        let template = Sheet::new(20.0, 10.0, 0.0, 0.0);
        let mut cache = NfpCache::new();
        let sheets = nest_greedy(
            &parts,
            &template,
            &[0.0],
            &mut cache,
            &CancelToken::new(),
            |_, _| {},
        );
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].placed.len(), 2);
        assert_eq!(sheets[1].placed.len(), 1);
    }

    #[test]
    fn unplaceable_part_yields_no_sheets() {
        let parts = vec![square_part(0, 20.0)];
        let template = Sheet::new(10.0, 10.0, 0.0, 0.0);
        let mut cache = NfpCache::new();
        let sheets = nest_greedy(
            &parts,
            &template,
            &[0.0, 90.0],
            &mut cache,
            &CancelToken::new(),
            |_, _| {},
        );
        assert!(sheets.is_empty());
    }

    #[test]
    fn largest_parts_go_first() {
        let parts = vec![square_part(0, 5.0), square_part(1, 10.0)];
        let template = Sheet::new(40.0, 40.0, 0.0, 0.0);
        let mut cache = NfpCache::new();
        let sheets = nest_greedy(
            &parts,
            &template,
            &[0.0],
            &mut cache,
            &CancelToken::new(),
            |_, _| {},
        );
        assert_eq!(sheets[0].placed[0].part_id, 1);
        assert_eq!(sheets[0].placed[1].part_id, 0);
    }
}
