//! Heatmap row remapping.
//!
//! Каждая строка heatmap: блок из `num_cols` ячеек `[col, row, value]`. При слиянии
//! допущенные строки переносятся на позицию курсора: колонка и строка пересчитываются
//! по позиции, из исходной ячейки берётся только value.
//!
//! NOTE: исходная x-координата ячейки отбрасывается. Это корректно, пока `xcats`
//! одинаковы во всех снапшотах; для неоднородных категорий не проверено.

use anyhow::{anyhow, Result};
use serde_json::{json, Value};

/// Remap the rows at `admitted` (row positions in the source) onto the running cursor.
///
/// Returns the new cells and the advanced cursor
/// (`last_row_index + admitted.len()`).
pub fn remap(
    admitted: &[usize],
    source: &[Value],
    last_row_index: usize,
    num_cols: usize,
) -> Result<(Vec<Value>, usize)> {
    let mut cells = Vec::with_capacity(admitted.len() * num_cols);
    for (k, &row) in admitted.iter().enumerate() {
        let start = row * num_cols;
        for j in 0..num_cols {
            let cell = source.get(start + j).ok_or_else(|| {
                anyhow!(
                    "heatmap row {} truncated: need cell {} of {}",
                    row,
                    start + j,
                    source.len()
                )
            })?;
            let value = cell_value(cell)
                .ok_or_else(|| anyhow!("heatmap cell {} is not [x, y, value]", start + j))?;
            cells.push(json!([j, last_row_index + k, value]));
        }
    }
    Ok((cells, last_row_index + admitted.len()))
}

fn cell_value(cell: &Value) -> Option<Value> {
    cell.as_array().and_then(|a| a.get(2)).cloned()
}
