//! Property-based tests for round-trip and invariant properties (spec.md §8).

use proptest::collection::vec as pvec;
use proptest::prelude::*;
use svt::{coo_to_svt, dense_to_svt, subassign, svt_to_coo, svt_to_dense, ElementBuffer, ElementKind, MindexSource};

/// Generates a column-major dense buffer for a fixed 4x4 shape with roughly
/// half its entries zero.
fn dense_buffer_strategy() -> impl Strategy<Value = Vec<i32>> {
    pvec(prop_oneof![Just(0i32), -20..20i32], 16)
}

proptest! {
    #[test]
    fn dense_round_trip_is_lossless(buffer in dense_buffer_strategy()) {
        let dim = vec![4u32, 4u32];
        let svt = dense_to_svt(dim, ElementKind::Int32, ElementBuffer::Int32(buffer.clone())).unwrap();
        let out = svt_to_dense(&svt).unwrap();
        prop_assert_eq!(out, ElementBuffer::Int32(buffer));
    }

    #[test]
    fn coo_round_trip_preserves_nonzero_count(
        rows in pvec(1..5i64, 1..10),
        cols in pvec(1..5i64, 1..10),
    ) {
        // Truncate to the shorter of the two coordinate columns and pair
        // with distinct positions by using the index as the value so
        // collisions are detectable.
        let n = rows.len().min(cols.len());
        let rows = rows[..n].to_vec();
        let cols = cols[..n].to_vec();
        let values = ElementBuffer::Int32((0..n as i32).map(|v| v + 1).collect());

        let svt = coo_to_svt(vec![5, 5], ElementKind::Int32, &[rows, cols], values).unwrap();
        let (coords, values) = svt_to_coo(&svt).unwrap();
        prop_assert!(svt.nnz() <= n);
        prop_assert_eq!(coords[0].len(), values.len());
    }

    #[test]
    fn subassign_with_empty_batch_is_identity(
        rows in pvec(1..5i64, 0..6),
        cols in pvec(1..5i64, 0..6),
    ) {
        let n = rows.len().min(cols.len());
        let rows = rows[..n].to_vec();
        let cols = cols[..n].to_vec();
        let values = ElementBuffer::Int32((0..n as i32).map(|v| v + 1).collect());
        let base = coo_to_svt(vec![5, 5], ElementKind::Int32, &[rows, cols], values).unwrap();

        let writes = MindexSource { coords: vec![vec![], vec![]] };
        let out = subassign(&base, &writes, ElementBuffer::Int32(vec![])).unwrap();
        prop_assert_eq!(out, base);
    }

    #[test]
    fn subassign_is_idempotent_for_a_single_write(
        row in 1..5i64,
        col in 1..5i64,
        value in -50..50i32,
    ) {
        let base = svt::Svt::empty(vec![5, 5], ElementKind::Int32);
        let writes = MindexSource { coords: vec![vec![row], vec![col]] };
        let once = subassign(&base, &writes, ElementBuffer::Int32(vec![value])).unwrap();
        let writes_again = MindexSource { coords: vec![vec![row], vec![col]] };
        let twice = subassign(&once, &writes_again, ElementBuffer::Int32(vec![value])).unwrap();
        prop_assert_eq!(once, twice);
    }
}
