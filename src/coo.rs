//! COO (coordinate-list) ↔ SVT conversion (C4): two-pass construction from a
//! coordinate list, and recursive extraction back into one.

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EngineError, Result};
use crate::index::{IndexSource, MindexSource};
use crate::kind::{ElementBuffer, ElementKind};
use crate::leaf::{finalize_leaf, new_leaf, Leaf};
use crate::node::{Svt, SvtNode};

/// `coo_to_svt`: builds an SVT from a 1-based per-dimension coordinate list
/// and a parallel value buffer.
///
/// Pass 1 ("grow"): resolves and validates every coordinate, groups write
/// offsets by the path of interior coordinates (everything but the last
/// dimension), and records which interior branches must exist.
/// Pass 2 ("fill"): allocates one appendable leaf per distinct path sized to
/// its final count, appends every value, then finalizes leaves and builds
/// the interior fan-out bottom-up, pruning branches no leaf touches.
pub fn coo_to_svt(
    dim: Vec<u32>,
    kind: ElementKind,
    coords: &[Vec<i64>],
    values: ElementBuffer,
) -> Result<Svt> {
    tracing::trace!(ndim = dim.len(), nnz = values.len(), "coo_to_svt");
    if values.kind() != kind {
        return Err(EngineError::TypeMismatch {
            expected: kind,
            got: values.kind(),
        });
    }
    if coords.len() != dim.len() {
        return Err(EngineError::ShapeMismatch(format!(
            "coo supplies {} coordinate column(s), array has {} dimension(s)",
            coords.len(),
            dim.len()
        )));
    }
    let nnz = values.len();
    if coords.iter().any(|c| c.len() != nnz) {
        return Err(EngineError::ShapeMismatch(
            "coo coordinate columns must all have length equal to the value count".to_string(),
        ));
    }
    if nnz as u64 > crate::error::INT32_MAX as u64 {
        return Err(EngineError::TooManyNonzeros {
            nnz: nnz as u64,
            limit: crate::error::INT32_MAX,
        });
    }
    if nnz == 0 {
        return Ok(Svt::empty(dim, kind));
    }
    let size: u64 = dim.iter().map(|&d| d as u64).product();
    if size == 0 {
        return Err(EngineError::IndexOutOfBounds {
            dim: 0,
            coord: 1,
            size: 0,
        });
    }

    let source = MindexSource {
        coords: coords.to_vec(),
    };
    if source.len() != nnz {
        return Err(EngineError::ShapeMismatch(
            "coo coordinate columns must all have length equal to the value count".to_string(),
        ));
    }

    let depth = dim.len() - 1;

    // Pass 1: resolve every coordinate and count entries per leaf path.
    let mut resolved: Vec<(Vec<u32>, u32)> = Vec::with_capacity(nnz);
    let mut counts: FxHashMap<Vec<u32>, usize> = FxHashMap::default();
    for i in 0..nnz {
        let full = source.coords_at(i, &dim)?;
        let (path, position) = full.split_at(depth);
        let path = path.to_vec();
        *counts.entry(path.clone()).or_insert(0) += 1;
        resolved.push((path, position[0]));
    }

    // Pass 2: allocate sized appendable leaves and fill them.
    let mut appendables: FxHashMap<Vec<u32>, _> = counts
        .iter()
        .map(|(path, &n)| (path.clone(), new_leaf(kind, n)))
        .collect();
    for (i, (path, position)) in resolved.iter().enumerate() {
        let leaf = appendables
            .get_mut(path)
            .expect("path was counted in pass 1");
        crate::leaf::append_to_appendable_leaf(leaf, *position, values.get(i));
    }
    let leaves: FxHashMap<Vec<u32>, Leaf> = appendables
        .into_iter()
        .map(|(path, leaf)| (path, finalize_leaf(leaf)))
        .collect();

    let root = build_tree_from_leaves(&dim, leaves);

    Ok(Svt { dim, kind, root })
}

/// Builds the interior/leaf tree from a map of leaf path to finalized leaf,
/// pruning branches no leaf touches. Shared by every constructor that ends
/// up with a flat set of leaves keyed by path (COO, dense).
pub(crate) fn build_tree_from_leaves(dim: &[u32], leaves: FxHashMap<Vec<u32>, Leaf>) -> Rc<SvtNode> {
    let depth = dim.len() - 1;
    if depth == 0 {
        return leaves
            .get(&Vec::new())
            .filter(|l| !l.is_empty())
            .map(|l| Rc::new(SvtNode::Leaf(l.clone())))
            .unwrap_or_else(|| Rc::new(SvtNode::Empty));
    }
    let prefix_sets = build_prefix_sets(depth, leaves.keys());
    let mut path = Vec::with_capacity(depth);
    build_node(0, depth, &mut path, dim, &leaves, &prefix_sets)
}

pub(crate) fn build_prefix_sets<'a>(
    depth: usize,
    leaf_paths: impl Iterator<Item = &'a Vec<u32>>,
) -> Vec<FxHashSet<Vec<u32>>> {
    let mut sets: Vec<FxHashSet<Vec<u32>>> = (0..=depth).map(|_| FxHashSet::default()).collect();
    for path in leaf_paths {
        for d in 0..=depth {
            sets[d].insert(path[..d].to_vec());
        }
    }
    sets
}

fn build_node(
    d: usize,
    depth: usize,
    path: &mut Vec<u32>,
    dim: &[u32],
    leaves: &FxHashMap<Vec<u32>, Leaf>,
    prefix_sets: &[FxHashSet<Vec<u32>>],
) -> Rc<SvtNode> {
    if d == depth {
        return match leaves.get(path) {
            Some(leaf) if !leaf.is_empty() => Rc::new(SvtNode::Leaf(leaf.clone())),
            _ => Rc::new(SvtNode::Empty),
        };
    }
    let mut children = Vec::with_capacity(dim[d] as usize);
    for c in 0..dim[d] {
        path.push(c);
        let child = if prefix_sets[d + 1].contains(path) {
            build_node(d + 1, depth, path, dim, leaves, prefix_sets)
        } else {
            Rc::new(SvtNode::Empty)
        };
        path.pop();
        children.push(child);
    }
    Rc::new(SvtNode::Interior(children))
}

/// `svt_to_coo`: recursively walks the tree in path order, emitting a
/// 1-based per-dimension coordinate list and a parallel value buffer.
pub fn svt_to_coo(svt: &Svt) -> Result<(Vec<Vec<i64>>, ElementBuffer)> {
    let nnz = svt.nnz();
    if nnz as u64 > crate::error::INT32_MAX as u64 {
        return Err(EngineError::TooManyNonzeros {
            nnz: nnz as u64,
            limit: crate::error::INT32_MAX,
        });
    }
    let ndim = svt.ndim();
    let mut coords: Vec<Vec<i64>> = vec![Vec::with_capacity(nnz); ndim];
    let mut values = ElementBuffer::with_capacity(svt.kind, nnz);

    let mut path = Vec::with_capacity(ndim.saturating_sub(1));
    walk(&svt.root, &mut path, &mut coords, &mut values);

    Ok((coords, values))
}

fn walk(
    node: &SvtNode,
    path: &mut Vec<u32>,
    coords: &mut [Vec<i64>],
    values: &mut ElementBuffer,
) {
    match node {
        SvtNode::Empty => {}
        SvtNode::Interior(children) => {
            for (c, child) in children.iter().enumerate() {
                path.push(c as u32);
                walk(child, path, coords, values);
                path.pop();
            }
        }
        SvtNode::Leaf(leaf) => {
            let (positions, leaf_values, len) = crate::leaf::split_leaf(leaf);
            for i in 0..len {
                for (d, &coord) in path.iter().enumerate() {
                    coords[d].push(coord as i64 + 1);
                }
                coords[path.len()].push(positions[i] as i64 + 1);
                values.push(leaf_values.get(i));
            }
        }
    }
}
