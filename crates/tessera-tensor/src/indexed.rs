use std::fmt;

use crate::{
    number::Number,
    shape::Shape,
    tensor::{copy_element, new_of_type, sealed, DataType, Tensor, TensorError, Values},
};

/// A gathering view whose elements are arbitrary coordinates into a source
/// tensor.
///
/// The innermost dimension of the index tensor holds one full source
/// coordinate, so its size must equal the source's number of dimensions. The
/// outer dimensions of the index tensor form the view's shape; a 1-D index
/// tensor (a single coordinate) gives a view of shape `[1]`.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{Indexed, Int, Number, Tensor};
///
/// let t = Int::from_shape_vec(&[2, 2], vec![1, 2, 3, 4]).unwrap();
/// let idx = Number::<usize>::from_shape_vec(&[2, 2], vec![1, 0, 0, 1]).unwrap();
/// let g = Indexed::new(t, idx).unwrap();
/// assert_eq!(g.shape().sizes(), &[2]);
/// assert_eq!(g.int_1d(0), 3);
/// assert_eq!(g.int_1d(1), 2);
/// ```
#[derive(Clone)]
pub struct Indexed<V: Tensor> {
    tensor: V,
    indexes: Number<usize>,
}

impl<V: Tensor> Indexed<V> {
    /// Creates a view reading `tensor` at the coordinates held by `indexes`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DimensionMismatch`] if the innermost size of
    /// `indexes` is not the number of source dimensions.
    pub fn new(tensor: V, indexes: Number<usize>) -> Result<Self, TensorError> {
        let nd = tensor.num_dims();
        let idx_shape = indexes.shape();
        if idx_shape.sizes().last() != Some(&nd) {
            return Err(TensorError::dimension_mismatch(
                "innermost index dimension must hold one coordinate per source dimension",
                &[nd],
                &idx_shape.sizes().last().map_or_else(Vec::new, |&n| vec![n]),
            ));
        }
        Ok(Self { tensor, indexes })
    }

    /// The source tensor.
    pub fn source(&self) -> &V {
        &self.tensor
    }

    /// The index tensor. It is a handle, so writes through it change the view.
    pub fn indexes(&self) -> &Number<usize> {
        &self.indexes
    }

    /// The source coordinate behind flat view element `i`.
    pub fn source_indexes(&self, i: usize) -> Vec<usize> {
        let nd = self.tensor.num_dims();
        self.indexes
            .with_slice(|idx| idx[i * nd..(i + 1) * nd].to_vec())
    }

    fn source_indexes_at(&self, coords: &[usize]) -> Vec<usize> {
        self.source_indexes(self.shape().index_to_1d(coords))
    }
}

impl<V: Tensor> sealed::Sealed for Indexed<V> {}

impl<V: Tensor> Tensor for Indexed<V> {
    fn shape(&self) -> Shape {
        let sizes = self.indexes.shape().sizes().to_vec();
        match sizes.split_last() {
            Some((_, outer)) if !outer.is_empty() => Shape::new(outer),
            _ => Shape::new(&[1]),
        }
    }

    fn data_type(&self) -> DataType {
        self.tensor.data_type()
    }

    fn float(&self, coords: &[usize]) -> f64 {
        self.tensor.float(&self.source_indexes_at(coords))
    }

    fn set_float(&self, coords: &[usize], val: f64) {
        self.tensor.set_float(&self.source_indexes_at(coords), val)
    }

    fn float_1d(&self, i: usize) -> f64 {
        self.tensor.float(&self.source_indexes(i))
    }

    fn set_float_1d(&self, i: usize, val: f64) {
        self.tensor.set_float(&self.source_indexes(i), val)
    }

    fn int(&self, coords: &[usize]) -> i64 {
        self.tensor.int(&self.source_indexes_at(coords))
    }

    fn set_int(&self, coords: &[usize], val: i64) {
        self.tensor.set_int(&self.source_indexes_at(coords), val)
    }

    fn int_1d(&self, i: usize) -> i64 {
        self.tensor.int(&self.source_indexes(i))
    }

    fn set_int_1d(&self, i: usize, val: i64) {
        self.tensor.set_int(&self.source_indexes(i), val)
    }

    fn string_value(&self, coords: &[usize]) -> String {
        self.tensor.string_value(&self.source_indexes_at(coords))
    }

    fn set_string(&self, coords: &[usize], val: &str) {
        self.tensor.set_string(&self.source_indexes_at(coords), val)
    }

    fn string_1d(&self, i: usize) -> String {
        self.tensor.string_value(&self.source_indexes(i))
    }

    fn set_string_1d(&self, i: usize, val: &str) {
        self.tensor.set_string(&self.source_indexes(i), val)
    }

    fn as_values(&self) -> Box<dyn Values> {
        let shape = self.shape();
        let src_shape = self.tensor.shape();
        let out = new_of_type(self.data_type(), shape.sizes());
        for i in 0..shape.len() {
            let si = src_shape.index_to_1d(&self.source_indexes(i));
            copy_element(&out, i, &self.tensor, si);
        }
        out
    }
}

impl<V: Tensor> fmt::Debug for Indexed<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexed")
            .field("tensor", &self.tensor)
            .field("indexes", &self.indexes)
            .finish()
    }
}

impl<V: Tensor> fmt::Display for Indexed<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::format::write_tensor(f, self)
    }
}
