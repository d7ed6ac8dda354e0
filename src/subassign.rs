//! Scattered subassignment (C7): the two-pass dispatch/absorb engine that
//! applies a batch of `L` scattered writes to an existing SVT, returning a
//! new SVT that shares every untouched branch with the original.
//!
//! Pass 1 ("dispatch") groups the incoming writes by destination leaf path,
//! the same grouping `coo.rs` performs when building a tree from scratch.
//! Pass 2 ("absorb") walks from the root, touching only the branches pass 1
//! marked: interior nodes along a touched path are shallow-cloned via
//! `Rc::make_mut` (the original tree keeps its own reference, so the clone
//! always happens — this is the copy-on-descend rule expressed directly
//! through `Rc`'s clone-on-write contract), and the destination leaf is
//! merged with the incoming leaf, last-write-within-the-batch already
//! resolved by `finalize_leaf`'s stable sort.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::coo::build_prefix_sets;
use crate::error::{EngineError, Result};
use crate::index::IndexSource;
use crate::kind::ElementBuffer;
use crate::leaf::{append_to_appendable_leaf, finalize_leaf, merge_leaves, new_leaf, Leaf};
use crate::node::{Svt, SvtNode};

/// Applies `writes` (resolved through `svt.dim`) carrying `values` to `svt`,
/// returning the updated array. A no-op (`L == 0`) returns a structural copy
/// of `svt` sharing its entire tree.
pub fn subassign(svt: &Svt, writes: &dyn IndexSource, values: ElementBuffer) -> Result<Svt> {
    if values.kind() != svt.kind {
        return Err(EngineError::TypeMismatch {
            expected: svt.kind,
            got: values.kind(),
        });
    }
    let l = writes.len();
    if values.len() != l {
        return Err(EngineError::ShapeMismatch(format!(
            "subassignment index count {} does not match value count {}",
            l,
            values.len()
        )));
    }
    if l == 0 {
        return Ok(svt.clone());
    }
    let size: u64 = svt.dim.iter().map(|&d| d as u64).product();
    if size == 0 {
        return Err(EngineError::IndexOutOfBounds {
            dim: 0,
            coord: 1,
            size: 0,
        });
    }

    let depth = svt.ndim() - 1;
    trace!(l, nnz_before = svt.nnz(), depth, "subassign: begin");

    if depth == 0 {
        return subassign_1d(svt, writes, values);
    }

    // Pass 1: dispatch. Group writes by leaf path, counting per leaf so
    // pass 2 can allocate each incoming leaf at its final size up front.
    let mut resolved: Vec<(Vec<u32>, u32)> = Vec::with_capacity(l);
    let mut counts: FxHashMap<Vec<u32>, usize> = FxHashMap::default();
    for i in 0..l {
        let full = writes.coords_at(i, &svt.dim)?;
        let (path, position) = full.split_at(depth);
        let path = path.to_vec();
        *counts.entry(path.clone()).or_insert(0) += 1;
        resolved.push((path, position[0]));
    }
    for &n in counts.values() {
        if n as u64 > crate::error::INT32_MAX as u64 {
            return Err(EngineError::TooManyAssignments {
                count: n as u64,
                limit: crate::error::INT32_MAX,
            });
        }
    }

    let mut appendables: FxHashMap<Vec<u32>, _> = counts
        .iter()
        .map(|(path, &n)| (path.clone(), new_leaf(svt.kind, n)))
        .collect();
    for (i, (path, position)) in resolved.iter().enumerate() {
        let leaf = appendables
            .get_mut(path)
            .expect("path was counted in pass 1");
        append_to_appendable_leaf(leaf, *position, values.get(i));
    }
    let incoming: FxHashMap<Vec<u32>, Leaf> = appendables
        .into_iter()
        .map(|(path, leaf)| (path, finalize_leaf(leaf)))
        .collect();

    trace!(touched_leaves = incoming.len(), "subassign: dispatch complete");

    let touched = build_prefix_sets(depth, incoming.keys());

    // Pass 2: absorb. Descend from the root, cloning only touched branches.
    let mut new_root = Rc::clone(&svt.root);
    let mut path = Vec::with_capacity(depth);
    absorb(&mut new_root, 0, depth, &mut path, &svt.dim, &incoming, &touched);

    trace!(nnz_after = new_root.nnz(), "subassign: absorb complete");

    Ok(Svt {
        dim: svt.dim.clone(),
        kind: svt.kind,
        root: new_root,
    })
}

fn absorb(
    node: &mut Rc<SvtNode>,
    d: usize,
    depth: usize,
    path: &mut Vec<u32>,
    dim: &[u32],
    incoming: &FxHashMap<Vec<u32>, Leaf>,
    touched: &[FxHashSet<Vec<u32>>],
) {
    if d == depth {
        let merged = match &**node {
            SvtNode::Leaf(existing) => merge_leaves(
                existing,
                incoming.get(path).expect("touched leaf path must be in incoming map"),
            ),
            SvtNode::Empty => incoming
                .get(path)
                .cloned()
                .expect("touched leaf path must be in incoming map"),
            SvtNode::Interior(_) => unreachable!("tree depth exceeds dim.len() - 1"),
        };
        *node = if merged.is_empty() {
            Rc::new(SvtNode::Empty)
        } else {
            Rc::new(SvtNode::Leaf(merged))
        };
        return;
    }

    let width = dim[d] as usize;
    let owned = Rc::make_mut(node);
    if matches!(owned, SvtNode::Empty) {
        *owned = SvtNode::Interior(vec![Rc::new(SvtNode::Empty); width]);
    }
    let children = match owned {
        SvtNode::Interior(children) => children,
        _ => unreachable!("tree depth exceeds dim.len() - 1"),
    };
    for c in 0..width {
        path.push(c as u32);
        if touched[d + 1].contains(path) {
            absorb(&mut children[c], d + 1, depth, path, dim, incoming, touched);
        }
        path.pop();
    }
}

/// The 1-D fast path of spec.md §4.10: a 1-D SVT's root is a bare leaf, so
/// every write lands in the same leaf and the general per-path grouping
/// machinery is unnecessary overhead.
fn subassign_1d(svt: &Svt, writes: &dyn IndexSource, values: ElementBuffer) -> Result<Svt> {
    let l = values.len();
    if l as u64 > crate::error::INT32_MAX as u64 {
        return Err(EngineError::TooManyAssignments {
            count: l as u64,
            limit: crate::error::INT32_MAX,
        });
    }
    let mut incoming = new_leaf(svt.kind, l);
    for i in 0..l {
        let full = writes.coords_at(i, &svt.dim)?;
        append_to_appendable_leaf(&mut incoming, full[0], values.get(i));
    }
    let incoming = finalize_leaf(incoming);

    let merged = match &*svt.root {
        SvtNode::Leaf(existing) => merge_leaves(existing, &incoming),
        SvtNode::Empty => incoming,
        SvtNode::Interior(_) => unreachable!("a 1-D svt's root is always Leaf or Empty"),
    };
    let root = if merged.is_empty() {
        Rc::new(SvtNode::Empty)
    } else {
        Rc::new(SvtNode::Leaf(merged))
    };
    Ok(Svt {
        dim: svt.dim.clone(),
        kind: svt.kind,
        root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MindexSource;
    use crate::kind::ElementKind;

    fn mindex(cols: Vec<Vec<i64>>) -> MindexSource {
        MindexSource { coords: cols }
    }

    #[test]
    fn no_op_on_empty_batch_shares_root() {
        let svt = Svt::empty(vec![3, 3], ElementKind::Int32);
        let writes = mindex(vec![vec![], vec![]]);
        let out = subassign(&svt, &writes, ElementBuffer::Int32(vec![])).unwrap();
        assert!(Rc::ptr_eq(&svt.root, &out.root));
    }

    #[test]
    fn writes_into_a_fresh_2d_array() {
        let svt = Svt::empty(vec![3, 3], ElementKind::Int32);
        let writes = mindex(vec![vec![1, 2], vec![1, 2]]);
        let out = subassign(&svt, &writes, ElementBuffer::Int32(vec![5, 9])).unwrap();
        assert_eq!(out.nnz(), 2);
    }

    #[test]
    fn last_write_wins_within_a_batch() {
        let svt = Svt::empty(vec![2, 2], ElementKind::Int32);
        let writes = mindex(vec![vec![1, 1], vec![1, 1]]);
        let out = subassign(&svt, &writes, ElementBuffer::Int32(vec![1, 2])).unwrap();
        assert_eq!(out.nnz(), 1);
        let (_, values) = crate::coo::svt_to_coo(&out).unwrap();
        assert_eq!(values, ElementBuffer::Int32(vec![2]));
    }

    #[test]
    fn zero_write_deletes_existing_entry() {
        let base = crate::coo::coo_to_svt(
            vec![2, 2],
            ElementKind::Int32,
            &[vec![1], vec![1]],
            ElementBuffer::Int32(vec![5]),
        )
        .unwrap();
        let writes = mindex(vec![vec![1], vec![1]]);
        let out = subassign(&base, &writes, ElementBuffer::Int32(vec![0])).unwrap();
        assert_eq!(out.nnz(), 0);
    }

    #[test]
    fn untouched_branch_is_structurally_shared() {
        let base = crate::coo::coo_to_svt(
            vec![4, 4],
            ElementKind::Int32,
            &[vec![1, 4], vec![1, 4]],
            ElementBuffer::Int32(vec![1, 2]),
        )
        .unwrap();
        let original_branch = match &*base.root {
            SvtNode::Interior(children) => Rc::clone(&children[3]),
            _ => panic!("expected interior root"),
        };
        let writes = mindex(vec![vec![1], vec![1]]);
        let out = subassign(&base, &writes, ElementBuffer::Int32(vec![99])).unwrap();
        let updated_branch = match &*out.root {
            SvtNode::Interior(children) => Rc::clone(&children[3]),
            _ => panic!("expected interior root"),
        };
        assert!(Rc::ptr_eq(&original_branch, &updated_branch));
    }

    #[test]
    fn one_dimensional_fast_path_merges_in_place() {
        let base = crate::coo::coo_to_svt(
            vec![5],
            ElementKind::Int32,
            &[vec![1, 3]],
            ElementBuffer::Int32(vec![10, 30]),
        )
        .unwrap();
        let writes = mindex(vec![vec![2]]);
        let out = subassign(&base, &writes, ElementBuffer::Int32(vec![20])).unwrap();
        assert_eq!(out.nnz(), 3);
    }

    #[test]
    fn zero_sized_dimension_rejects_nonempty_batch() {
        let svt = Svt::empty(vec![0, 3], ElementKind::Int32);
        let writes = mindex(vec![vec![1], vec![1]]);
        let err = subassign(&svt, &writes, ElementBuffer::Int32(vec![1])).unwrap_err();
        assert!(matches!(err, EngineError::IndexOutOfBounds { .. }));
    }
}
