//! CSC (compressed sparse column) ↔ SVT conversion (C5), 2-D only.
//!
//! CSC's `pointer`/`row_indices` pair is 0-based (matching the internal,
//! already-materialized form this format represents), unlike COO's 1-based
//! external coordinates. Conversion goes through the same (row, col, value)
//! triple representation `coo.rs` already builds and walks, since the tree's
//! internal shape is an implementation detail independent of which external
//! format produced it.

use crate::coo::{coo_to_svt, svt_to_coo};
use crate::error::{EngineError, Result};
use crate::kind::{ElementBuffer, ElementKind};
use crate::node::Svt;

/// `csc_to_svt`: builds a 2-D SVT from a CSC triple.
pub fn csc_to_svt(
    nrows: u32,
    ncols: u32,
    kind: ElementKind,
    pointer: &[i64],
    row_indices: &[i64],
    x: ElementBuffer,
) -> Result<Svt> {
    if pointer.len() != ncols as usize + 1 {
        return Err(EngineError::ShapeMismatch(format!(
            "csc pointer array must have length ncols + 1 = {}, got {}",
            ncols as usize + 1,
            pointer.len()
        )));
    }
    if pointer.windows(2).any(|w| w[0] > w[1]) {
        return Err(EngineError::InvalidIndex {
            offset: 0,
            reason: "csc pointer array must be non-decreasing".to_string(),
        });
    }
    let nnz = *pointer.last().unwrap_or(&0);
    if pointer[0] != 0 {
        return Err(EngineError::InvalidIndex {
            offset: 0,
            reason: "csc pointer array must start at 0".to_string(),
        });
    }
    if row_indices.len() as i64 != nnz || x.len() as i64 != nnz {
        return Err(EngineError::ShapeMismatch(
            "csc row_indices and x must both have length pointer[ncols]".to_string(),
        ));
    }

    let mut rows_1based = Vec::with_capacity(nnz as usize);
    let mut cols_1based = Vec::with_capacity(nnz as usize);
    for col in 0..ncols as usize {
        let start = pointer[col] as usize;
        let end = pointer[col + 1] as usize;
        for idx in start..end {
            let row = row_indices[idx];
            if row < 0 || row as u32 >= nrows {
                return Err(EngineError::IndexOutOfBounds {
                    dim: 0,
                    coord: row,
                    size: nrows,
                });
            }
            rows_1based.push(row + 1);
            cols_1based.push(col as i64 + 1);
        }
    }

    coo_to_svt(
        vec![nrows, ncols],
        kind,
        &[rows_1based, cols_1based],
        x,
    )
}

/// `svt_to_csc`: walks a 2-D SVT and re-groups its entries by column to
/// build the CSC triple.
pub fn svt_to_csc(svt: &Svt) -> Result<(Vec<i64>, Vec<i64>, ElementBuffer)> {
    if svt.ndim() != 2 {
        return Err(EngineError::ShapeMismatch(format!(
            "csc conversion is 2-D only, array has {} dimensions",
            svt.ndim()
        )));
    }
    let ncols = svt.dim[1] as usize;
    let (coords, values) = svt_to_coo(svt)?;
    let nnz = values.len();

    let mut order: Vec<usize> = (0..nnz).collect();
    order.sort_by_key(|&i| (coords[1][i], coords[0][i]));

    let mut pointer = vec![0i64; ncols + 1];
    for &i in &order {
        let col = (coords[1][i] - 1) as usize;
        pointer[col + 1] += 1;
    }
    for c in 0..ncols {
        pointer[c + 1] += pointer[c];
    }

    let mut row_indices = Vec::with_capacity(nnz);
    let mut x = ElementBuffer::with_capacity(svt.kind, nnz);
    for &i in &order {
        row_indices.push(coords[0][i] - 1);
        x.push(values.get(i));
    }

    Ok((pointer, row_indices, x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_small_csc() {
        // 3x3, nonzeros at (row 0, col 1) and (row 2, col 1), 0-based.
        let pointer = vec![0, 0, 2, 2];
        let row_indices = vec![0, 2];
        let x = ElementBuffer::Int32(vec![5, 9]);
        let svt = csc_to_svt(3, 3, ElementKind::Int32, &pointer, &row_indices, x.clone()).unwrap();
        assert_eq!(svt.nnz(), 2);
        let (out_pointer, out_rows, out_x) = svt_to_csc(&svt).unwrap();
        assert_eq!(out_pointer, pointer);
        assert_eq!(out_rows, row_indices);
        assert_eq!(out_x, x);
    }

    #[test]
    fn rejects_wrong_pointer_length() {
        let pointer = vec![0, 0];
        let err = csc_to_svt(
            3,
            3,
            ElementKind::Int32,
            &pointer,
            &[],
            ElementBuffer::Int32(vec![]),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch(_)));
    }

    #[test]
    fn rejects_non_monotonic_pointer() {
        let pointer = vec![0, 3, 1];
        let err = csc_to_svt(
            3,
            2,
            ElementKind::Int32,
            &pointer,
            &[0, 1, 2],
            ElementBuffer::Int32(vec![1, 2, 3]),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidIndex { .. }));
    }

    #[test]
    fn rejects_non_2d_on_export() {
        let svt = Svt::empty(vec![2, 2, 2], ElementKind::Int32);
        assert!(matches!(
            svt_to_csc(&svt).unwrap_err(),
            EngineError::ShapeMismatch(_)
        ));
    }
}
