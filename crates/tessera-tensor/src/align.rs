//! Shape alignment for broadcasting binary operations.
//!
//! Shapes are aligned from the innermost dimension outward. A dimension that
//! only exists in the higher-rank operand counts as size 1 in the other, and a
//! size-1 dimension broadcasts against any size. Every broadcasting operation
//! reads its operands through [`wrap_index_1d`].

use crate::{shape::Shape, tensor::Tensor, TensorError};

/// The result of aligning two shapes for an elementwise binary operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aligned {
    /// The first operand's sizes, padded with leading 1s to the output rank.
    pub a: Shape,
    /// The second operand's sizes, padded with leading 1s to the output rank.
    pub b: Shape,
    /// The broadcast output shape.
    pub out: Shape,
}

/// Pads `shape` with leading 1s up to `rank` dimensions.
///
/// A 0-dim shape holds no elements, so it pads with 0s instead: it only
/// aligns with shapes whose dimensions are all 1 or 0, and the result is
/// empty.
fn pad_to_rank(shape: &Shape, rank: usize) -> Vec<usize> {
    let fill = if shape.num_dims() == 0 { 0 } else { 1 };
    let mut sizes = vec![fill; rank - shape.num_dims()];
    sizes.extend_from_slice(shape.sizes());
    sizes
}

/// Aligns two shapes for a broadcasting binary operation.
///
/// # Arguments
///
/// * `a` - The shape of the first operand.
/// * `b` - The shape of the second operand.
///
/// # Returns
///
/// Both shapes padded to a common rank and the output shape, whose every
/// dimension is the max of the two operands. A size-1 dimension against an
/// empty one gives 0.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] naming the first (innermost)
/// dimension whose sizes differ while neither is 1.
///
/// # Example
///
/// ```
/// use tessera_tensor::{align::align_shapes, Shape, TensorError};
///
/// let al = align_shapes(&Shape::new(&[3, 1]), &Shape::new(&[1, 4])).unwrap();
/// assert_eq!(al.out.sizes(), &[3, 4]);
///
/// let err = align_shapes(&Shape::new(&[3, 2]), &Shape::new(&[1, 4])).unwrap_err();
/// assert_eq!(err, TensorError::shape_mismatch(1, 2, 4));
/// ```
pub fn align_shapes(a: &Shape, b: &Shape) -> Result<Aligned, TensorError> {
    let rank = a.num_dims().max(b.num_dims());
    let asz = pad_to_rank(a, rank);
    let bsz = pad_to_rank(b, rank);
    let mut out = vec![0; rank];
    for dim in (0..rank).rev() {
        let (ad, bd) = (asz[dim], bsz[dim]);
        if ad != bd && ad != 1 && bd != 1 {
            return Err(TensorError::shape_mismatch(dim, ad, bd));
        }
        out[dim] = if ad == 1 { bd } else { ad };
    }
    Ok(Aligned {
        a: Shape::from(asz),
        b: Shape::from(bsz),
        out: Shape::from(out),
    })
}

/// Aligns the shapes of two tensors. See [`align_shapes`].
pub fn align_tensors(a: &dyn Tensor, b: &dyn Tensor) -> Result<Aligned, TensorError> {
    align_shapes(&a.shape(), &b.shape())
}

/// Aligns `b` to be assigned into `a` (as in `a[...] = b`).
///
/// Only `b` may broadcast: `a` is never resized, so a size in `b` must either
/// match `a` or be 1.
///
/// # Returns
///
/// `a` and `b` padded to a common rank.
///
/// # Errors
///
/// Returns [`TensorError::ShapeMismatch`] if `b` can not broadcast into `a`.
pub fn align_for_assign(a: &Shape, b: &Shape) -> Result<(Shape, Shape), TensorError> {
    let rank = a.num_dims().max(b.num_dims());
    let asz = pad_to_rank(a, rank);
    let bsz = pad_to_rank(b, rank);
    for dim in (0..rank).rev() {
        let (ad, bd) = (asz[dim], bsz[dim]);
        if ad != bd && bd != 1 {
            return Err(TensorError::shape_mismatch(dim, ad, bd));
        }
    }
    Ok((Shape::from(asz), Shape::from(bsz)))
}

/// Computes the flat offset into a tensor of `shape` for a coordinate of the
/// broadcast output shape.
///
/// Coordinates are right-aligned against `shape`: extra leading coordinates
/// belong to dimensions `shape` does not have and are ignored. Coordinates on
/// a size-1 dimension are projected to 0.
///
/// # Panics
///
/// Panics if `coords` has fewer entries than `shape` has dimensions, or if a
/// coordinate on a dimension of size > 1 is out of range.
///
/// # Example
///
/// ```
/// use tessera_tensor::{align::wrap_index_1d, Shape};
///
/// let shape = Shape::new(&[3, 1]);
/// assert_eq!(wrap_index_1d(&shape, &[2, 3]), 2);
/// assert_eq!(wrap_index_1d(&shape, &[5, 2, 0]), 2);
/// ```
pub fn wrap_index_1d(shape: &Shape, coords: &[usize]) -> usize {
    let nd = shape.num_dims();
    assert!(
        coords.len() >= nd,
        "wrap_index_1d: got {} coordinates for a shape with {} dimensions",
        coords.len(),
        nd
    );
    let coords = &coords[coords.len() - nd..];
    let mut offset = 0;
    for (dim, ((&c, &size), &stride)) in coords
        .iter()
        .zip(shape.sizes())
        .zip(shape.strides())
        .enumerate()
    {
        if size == 1 {
            continue;
        }
        assert!(
            c < size,
            "wrap_index_1d: index {c} out of range for dimension {dim} of size {size}"
        );
        offset += c * stride;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_broadcast() -> Result<(), TensorError> {
        let al = align_shapes(&Shape::new(&[3, 1]), &Shape::new(&[1, 4]))?;
        assert_eq!(al.out.sizes(), &[3, 4]);
        assert_eq!(al.a.sizes(), &[3, 1]);
        assert_eq!(al.b.sizes(), &[1, 4]);
        Ok(())
    }

    #[test]
    fn test_align_mismatch() {
        let res = align_shapes(&Shape::new(&[3, 2]), &Shape::new(&[1, 4]));
        assert_eq!(
            res,
            Err(TensorError::ShapeMismatch { dim: 1, a: 2, b: 4 })
        );
    }

    #[test]
    fn test_align_different_ranks() -> Result<(), TensorError> {
        let al = align_shapes(&Shape::new(&[4]), &Shape::new(&[2, 3, 1]))?;
        assert_eq!(al.a.sizes(), &[1, 1, 4]);
        assert_eq!(al.out.sizes(), &[2, 3, 4]);

        let res = align_shapes(&Shape::new(&[5, 4]), &Shape::new(&[2, 3, 4]));
        assert_eq!(res, Err(TensorError::shape_mismatch(1, 5, 3)));
        Ok(())
    }

    #[test]
    fn test_align_validity_exhaustive() {
        for a in 1..4 {
            for b in 1..4 {
                let res = align_shapes(&Shape::new(&[2, a]), &Shape::new(&[b]));
                let valid = a == b || a == 1 || b == 1;
                assert_eq!(res.is_ok(), valid, "a={a} b={b}");
                if let Ok(al) = res {
                    assert_eq!(al.out.sizes(), &[2, a.max(b)]);
                }
            }
        }
    }

    #[test]
    fn test_align_zero_dim() -> Result<(), TensorError> {
        let empty = Shape::new(&[]);
        let res = align_shapes(&empty, &Shape::new(&[3]));
        assert_eq!(res, Err(TensorError::shape_mismatch(0, 0, 3)));

        let res = align_shapes(&Shape::new(&[2, 1]), &empty);
        assert_eq!(res, Err(TensorError::shape_mismatch(0, 2, 0)));

        let al = align_shapes(&Shape::new(&[1, 1]), &empty)?;
        assert_eq!(al.out.sizes(), &[0, 0]);
        assert_eq!(al.out.len(), 0);

        let al = align_shapes(&empty, &empty)?;
        assert_eq!(al.out.len(), 0);

        assert!(align_for_assign(&Shape::new(&[3]), &empty).is_err());
        Ok(())
    }

    #[test]
    fn test_align_for_assign() -> Result<(), TensorError> {
        let (a, b) = align_for_assign(&Shape::new(&[3, 4]), &Shape::new(&[4]))?;
        assert_eq!(a.sizes(), &[3, 4]);
        assert_eq!(b.sizes(), &[1, 4]);

        let res = align_for_assign(&Shape::new(&[3, 1]), &Shape::new(&[3, 4]));
        assert_eq!(res, Err(TensorError::shape_mismatch(1, 1, 4)));

        let res = align_for_assign(&Shape::new(&[4]), &Shape::new(&[2, 4]));
        assert_eq!(res, Err(TensorError::shape_mismatch(0, 1, 2)));
        Ok(())
    }

    #[test]
    fn test_wrap_projection() {
        let shape = Shape::new(&[2, 1, 3]);
        for i in 0..2 {
            for j in 0..5 {
                for k in 0..3 {
                    assert_eq!(
                        wrap_index_1d(&shape, &[i, j, k]),
                        shape.index_to_1d(&[i, 0, k])
                    );
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "out of range for dimension 0")]
    fn test_wrap_out_of_range() {
        wrap_index_1d(&Shape::new(&[2, 1]), &[2, 0]);
    }
}
