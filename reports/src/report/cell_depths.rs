use std::collections::BTreeMap;

use crate::core::domain::ContextRow;
use crate::spacetime::CellAssignment;

/// Maximum depth bin observed in each cell.
///
/// Context rows whose spatial key is not part of `cells` are ignored.
pub fn build_cell_depths(context: &[ContextRow], cells: &CellAssignment) -> BTreeMap<usize, f64> {
    let mut depths: BTreeMap<usize, f64> = BTreeMap::new();
    for row in context {
        let Some(cell_id) = cells.cell_id(&row.h3_index) else {
            continue;
        };
        depths
            .entry(cell_id)
            .and_modify(|max| *max = max.max(row.depth_bin))
            .or_insert(row.depth_bin);
    }
    depths
}
