//! Index resolution (§4.9, §6): turning an external write batch's index
//! representation (per-dimension coordinate vectors, "Mindex", or a single
//! linear-offset vector, "Lindex") into validated 0-based per-dimension
//! coordinates the subassignment engine can route on.

use crate::error::{EngineError, Result};

/// Resolves one write's coordinates for a given `dim` shape, producing
/// 0-based per-dimension positions (outermost dimension first).
pub trait IndexSource {
    /// Number of writes in the batch.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves write `i`'s coordinates, validating bounds. `dim.len()` must
    /// equal the number of dimensions.
    fn coords_at(&self, i: usize, dim: &[u32]) -> Result<Vec<u32>>;
}

/// One coordinate vector per dimension, each of length `L`, already 1-based
/// per the external interface's convention (§6). Each inner vector's `i`-th
/// entry is the 1-based coordinate for write `i` along that dimension.
pub struct MindexSource {
    pub coords: Vec<Vec<i64>>,
}

impl IndexSource for MindexSource {
    fn len(&self) -> usize {
        self.coords.first().map_or(0, |c| c.len())
    }

    fn coords_at(&self, i: usize, dim: &[u32]) -> Result<Vec<u32>> {
        if self.coords.len() != dim.len() {
            return Err(EngineError::ShapeMismatch(format!(
                "mindex supplies {} dimension(s), array has {}",
                self.coords.len(),
                dim.len()
            )));
        }
        let mut out = Vec::with_capacity(dim.len());
        for (d, column) in self.coords.iter().enumerate() {
            let raw = column[i];
            out.push(validate_one_based(raw, d, dim[d])?);
        }
        Ok(out)
    }
}

/// A single linear (column-major) 1-based offset per write, decomposed into
/// per-dimension coordinates via stride division.
pub struct LindexSource {
    pub offsets: Vec<f64>,
}

impl IndexSource for LindexSource {
    fn len(&self) -> usize {
        self.offsets.len()
    }

    fn coords_at(&self, i: usize, dim: &[u32]) -> Result<Vec<u32>> {
        let raw = self.offsets[i];
        if !raw.is_finite() {
            return Err(EngineError::InvalidIndex {
                offset: i,
                reason: "lindex value is not finite".to_string(),
            });
        }
        if raw.fract() != 0.0 {
            return Err(EngineError::InvalidIndex {
                offset: i,
                reason: "lindex value is not an integer".to_string(),
            });
        }
        let linear = raw as i64;
        if linear < 1 {
            return Err(EngineError::InvalidIndex {
                offset: i,
                reason: "lindex value is not positive".to_string(),
            });
        }
        let size: u64 = dim.iter().map(|&d| d as u64).product();
        if linear as u64 > size {
            return Err(EngineError::IndexOutOfBounds {
                dim: 0,
                coord: linear,
                size: size.min(u32::MAX as u64) as u32,
            });
        }
        let mut remaining = (linear - 1) as u64;
        let mut out = Vec::with_capacity(dim.len());
        for &extent in dim {
            out.push((remaining % extent as u64) as u32);
            remaining /= extent as u64;
        }
        Ok(out)
    }
}

fn validate_one_based(raw: i64, dim: usize, size: u32) -> Result<u32> {
    if raw < 1 || raw as u64 > size as u64 {
        return Err(EngineError::IndexOutOfBounds {
            dim,
            coord: raw,
            size,
        });
    }
    Ok((raw - 1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mindex_resolves_zero_based() {
        let src = MindexSource {
            coords: vec![vec![1, 2], vec![3, 1]],
        };
        assert_eq!(src.coords_at(0, &[5, 5]).unwrap(), vec![0, 2]);
        assert_eq!(src.coords_at(1, &[5, 5]).unwrap(), vec![1, 0]);
    }

    #[test]
    fn mindex_rejects_out_of_bounds() {
        let src = MindexSource {
            coords: vec![vec![10]],
        };
        assert!(matches!(
            src.coords_at(0, &[5]),
            Err(EngineError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn lindex_decomposes_column_major() {
        let src = LindexSource {
            offsets: vec![1.0, 6.0],
        };
        // shape 3x4: offset 1 -> (0,0), offset 6 -> row 5 1-based -> (1,1)
        assert_eq!(src.coords_at(0, &[3, 4]).unwrap(), vec![0, 0]);
        assert_eq!(src.coords_at(1, &[3, 4]).unwrap(), vec![2, 1]);
    }

    #[test]
    fn lindex_rejects_non_integer() {
        let src = LindexSource { offsets: vec![1.5] };
        assert!(matches!(
            src.coords_at(0, &[4]),
            Err(EngineError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn lindex_rejects_non_finite() {
        let src = LindexSource {
            offsets: vec![f64::NAN],
        };
        assert!(matches!(
            src.coords_at(0, &[4]),
            Err(EngineError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn lindex_rejects_zero_and_negative_as_invalid_not_out_of_bounds() {
        let src = LindexSource {
            offsets: vec![0.0, -1.0],
        };
        assert!(matches!(
            src.coords_at(0, &[4]),
            Err(EngineError::InvalidIndex { .. })
        ));
        assert!(matches!(
            src.coords_at(1, &[4]),
            Err(EngineError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn lindex_rejects_upper_bound_violation_as_out_of_bounds() {
        let src = LindexSource {
            offsets: vec![17.0],
        };
        assert!(matches!(
            src.coords_at(0, &[4, 4]),
            Err(EngineError::IndexOutOfBounds { .. })
        ));
    }
}
