//! Dense array ↔ SVT conversion (C6): recursive descent over a flat,
//! column-major buffer.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::coo::build_tree_from_leaves;
use crate::error::{EngineError, Result};
use crate::kind::{ElementBuffer, ElementKind};
use crate::leaf::{append_to_appendable_leaf, finalize_leaf, new_leaf};
use crate::node::{Svt, SvtNode};

/// Column-major strides for `dim`: `strides[0] == 1`, `strides[d] ==
/// strides[d-1] * dim[d-1]`.
fn strides(dim: &[u32]) -> Vec<u64> {
    let mut s = vec![1u64; dim.len()];
    for d in 1..dim.len() {
        s[d] = s[d - 1] * dim[d - 1] as u64;
    }
    s
}

/// `dense_to_svt`: scans a flat, column-major buffer and builds the sparse
/// tree from its nonzero entries.
pub fn dense_to_svt(dim: Vec<u32>, kind: ElementKind, buffer: ElementBuffer) -> Result<Svt> {
    tracing::trace!(ndim = dim.len(), len = buffer.len(), "dense_to_svt");
    if buffer.kind() != kind {
        return Err(EngineError::TypeMismatch {
            expected: kind,
            got: buffer.kind(),
        });
    }
    let size: u64 = dim.iter().map(|&d| d as u64).product();
    if buffer.len() as u64 != size {
        return Err(EngineError::ShapeMismatch(format!(
            "dense buffer length {} does not match shape product {}",
            buffer.len(),
            size
        )));
    }
    if size == 0 {
        return Ok(Svt::empty(dim, kind));
    }

    let depth = dim.len() - 1;
    let strides = strides(&dim);

    // Pass 1: locate nonzero entries and their leaf path, counting per leaf.
    let mut nonzero: Vec<(Vec<u32>, u32, usize)> = Vec::new();
    let mut counts: FxHashMap<Vec<u32>, usize> = FxHashMap::default();
    for idx in 0..buffer.len() {
        let value = buffer.get(idx);
        if value.is_zero() {
            continue;
        }
        let remaining = idx as u64;
        let mut coord = vec![0u32; dim.len()];
        for d in 0..dim.len() {
            coord[d] = ((remaining / strides[d]) % dim[d] as u64) as u32;
        }
        let path = coord[..depth].to_vec();
        let position = coord[depth];
        *counts.entry(path.clone()).or_insert(0) += 1;
        nonzero.push((path, position, idx));
    }

    // Pass 2: allocate sized leaves and fill them.
    let mut appendables: FxHashMap<Vec<u32>, _> = counts
        .iter()
        .map(|(path, &n)| (path.clone(), new_leaf(kind, n)))
        .collect();
    for (path, position, idx) in &nonzero {
        let leaf = appendables
            .get_mut(path)
            .expect("path was counted in pass 1");
        append_to_appendable_leaf(leaf, *position, buffer.get(*idx));
    }
    let leaves = appendables
        .into_iter()
        .map(|(path, leaf)| (path, finalize_leaf(leaf)))
        .collect();

    let root = build_tree_from_leaves(&dim, leaves);
    Ok(Svt { dim, kind, root })
}

/// `svt_to_dense`: walks the tree, writing each nonzero into a freshly
/// zeroed, column-major buffer.
pub fn svt_to_dense(svt: &Svt) -> Result<ElementBuffer> {
    let size: u64 = svt.dim.iter().map(|&d| d as u64).product();
    if size > usize::MAX as u64 {
        return Err(EngineError::ShapeMismatch(
            "dense materialization exceeds addressable memory".to_string(),
        ));
    }
    let mut buffer = zero_buffer(svt.kind, size as usize);
    let strides = strides(&svt.dim);
    let mut path = Vec::with_capacity(svt.ndim().saturating_sub(1));
    walk(&svt.root, &mut path, &strides, &mut buffer);
    Ok(buffer)
}

fn zero_buffer(kind: ElementKind, len: usize) -> ElementBuffer {
    let mut buf = ElementBuffer::with_capacity(kind, len);
    for _ in 0..len {
        buf.push(crate::kind::Element::zero(kind));
    }
    buf
}

fn walk(node: &SvtNode, path: &mut Vec<u32>, strides: &[u64], buffer: &mut ElementBuffer) {
    match node {
        SvtNode::Empty => {}
        SvtNode::Interior(children) => {
            for (c, child) in children.iter().enumerate() {
                path.push(c as u32);
                walk(child, path, strides, buffer);
                path.pop();
            }
        }
        SvtNode::Leaf(leaf) => {
            let base: u64 = path
                .iter()
                .enumerate()
                .map(|(d, &coord)| coord as u64 * strides[d])
                .sum();
            let leaf_stride = strides[path.len()];
            let (positions, leaf_values, len) = crate::leaf::split_leaf(leaf);
            for i in 0..len {
                let offset = base + positions[i] as u64 * leaf_stride;
                buffer.copy_one(offset as usize, leaf_values, i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_small_2d_dense_array() {
        // column-major 2x3: columns are (1,0), (0,5), (0,0)
        let dim = vec![2, 3];
        let buffer = ElementBuffer::Int32(vec![1, 0, 0, 5, 0, 0]);
        let svt = dense_to_svt(dim.clone(), ElementKind::Int32, buffer.clone()).unwrap();
        assert_eq!(svt.nnz(), 2);
        let out = svt_to_dense(&svt).unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn all_zero_dense_is_empty_svt() {
        let dim = vec![2, 2];
        let buffer = ElementBuffer::Int32(vec![0, 0, 0, 0]);
        let svt = dense_to_svt(dim, ElementKind::Int32, buffer).unwrap();
        assert_eq!(svt.nnz(), 0);
    }

    #[test]
    fn rejects_mismatched_buffer_length() {
        let dim = vec![2, 2];
        let buffer = ElementBuffer::Int32(vec![1, 2, 3]);
        assert!(matches!(
            dense_to_svt(dim, ElementKind::Int32, buffer).unwrap_err(),
            EngineError::ShapeMismatch(_)
        ));
    }

    #[test]
    fn one_dimensional_dense_round_trip() {
        let dim = vec![4];
        let buffer = ElementBuffer::Float64(vec![0.0, 2.5, 0.0, 7.0]);
        let svt = dense_to_svt(dim, ElementKind::Float64, buffer.clone()).unwrap();
        let out = svt_to_dense(&svt).unwrap();
        assert_eq!(out, buffer);
    }
}
