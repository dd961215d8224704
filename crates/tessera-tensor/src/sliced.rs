use std::cmp::Ordering;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    shape::Shape,
    tensor::{copy_element, new_of_type, sealed, DataType, Tensor, TensorError, Values},
};

/// A view that selects and reorders indexes independently along every
/// dimension of a source tensor.
///
/// Dimension `d` of the view has one entry per index in its list, and each
/// entry reads index `indexes[d][i]` of the source. A `None` list is the full
/// identity range of that dimension. The result has no guaranteed contiguous
/// layout, so `Sliced` is neither row-major nor a sub-space provider.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{Int, Sliced, Tensor};
///
/// let t = Int::from_shape_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
/// let s = Sliced::with_indexes(t, vec![Some(vec![1]), Some(vec![2, 0])]).unwrap();
/// assert_eq!(s.shape().sizes(), &[1, 2]);
/// assert_eq!(s.int(&[0, 0]), 6);
/// assert_eq!(s.int(&[0, 1]), 4);
/// ```
#[derive(Clone)]
pub struct Sliced<V: Tensor> {
    tensor: V,
    indexes: Vec<Option<Vec<usize>>>,
}

impl<V: Tensor> Sliced<V> {
    /// Creates an identity view over every dimension of `tensor`.
    pub fn new(tensor: V) -> Self {
        let indexes = vec![None; tensor.num_dims()];
        Self { tensor, indexes }
    }

    /// Creates a view with one optional index list per source dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DimensionMismatch`] if the number of lists is not
    /// the number of source dimensions.
    pub fn with_indexes(tensor: V, indexes: Vec<Option<Vec<usize>>>) -> Result<Self, TensorError> {
        let nd = tensor.num_dims();
        if indexes.len() != nd {
            return Err(TensorError::dimension_mismatch(
                "one index list is needed per source dimension",
                &[nd],
                &[indexes.len()],
            ));
        }
        Ok(Self { tensor, indexes })
    }

    /// The source tensor.
    pub fn source(&self) -> &V {
        &self.tensor
    }

    /// The index list of dimension `dim`, if any.
    pub fn indexes(&self, dim: usize) -> Option<&[usize]> {
        self.indexes[dim].as_deref()
    }

    /// The source index behind view index `i` of dimension `dim`.
    pub fn source_index(&self, dim: usize, i: usize) -> usize {
        match &self.indexes[dim] {
            Some(idx) => idx[i],
            None => i,
        }
    }

    /// Resets every dimension to its full identity range.
    pub fn sequential(&mut self) {
        self.indexes.iter_mut().for_each(|idx| *idx = None);
    }

    /// Materializes the identity list of dimension `dim` if it has none yet.
    pub fn indexes_needed(&mut self, dim: usize) -> &mut Vec<usize> {
        let size = self.tensor.dim_size(dim);
        self.indexes[dim].get_or_insert_with(|| (0..size).collect())
    }

    /// Removes indexes that are out of range for the source, in every
    /// dimension. Call after the source shrinks.
    pub fn valid_indexes(&mut self) {
        let shape = self.tensor.shape();
        for (dim, idx) in self.indexes.iter_mut().enumerate() {
            if let Some(idx) = idx {
                let size = shape.dim_size(dim);
                let before = idx.len();
                idx.retain(|&i| i < size);
                if idx.len() < before {
                    log::warn!(
                        "dropped {} indexes beyond size {size} of dimension {dim}",
                        before - idx.len()
                    );
                }
            }
        }
    }

    /// Keeps the indexes of dimension `dim` for which `f` returns true. `f`
    /// receives the source, the dimension and a source index.
    pub fn filter(&mut self, dim: usize, mut f: impl FnMut(&V, usize, usize) -> bool) {
        self.indexes_needed(dim);
        let tensor = &self.tensor;
        if let Some(idx) = &mut self.indexes[dim] {
            idx.retain(|&i| f(tensor, dim, i));
        }
    }

    /// Stable-sorts the indexes of dimension `dim` with `cmp`, which receives
    /// the source, the dimension and two source indexes.
    pub fn sort_dim_func(
        &mut self,
        dim: usize,
        mut cmp: impl FnMut(&V, usize, usize, usize) -> Ordering,
    ) {
        self.indexes_needed(dim);
        let tensor = &self.tensor;
        if let Some(idx) = &mut self.indexes[dim] {
            idx.sort_by(|&a, &b| cmp(tensor, dim, a, b));
        }
    }

    /// Shuffles the indexes of dimension `dim` with the thread-local generator.
    pub fn permuted(&mut self, dim: usize) {
        self.permuted_with(dim, &mut rand::rng());
    }

    /// Shuffles the indexes of dimension `dim` with the given generator.
    pub fn permuted_with<R: Rng + ?Sized>(&mut self, dim: usize, rng: &mut R) {
        self.indexes_needed(dim).shuffle(rng);
    }

    fn source_coords(&self, coords: &[usize]) -> Vec<usize> {
        coords
            .iter()
            .enumerate()
            .map(|(dim, &c)| self.source_index(dim, c))
            .collect()
    }

    fn source_coords_1d(&self, i: usize) -> Vec<usize> {
        self.source_coords(&self.shape().index_from_1d(i))
    }
}

impl<V: Tensor> sealed::Sealed for Sliced<V> {}

impl<V: Tensor> Tensor for Sliced<V> {
    fn shape(&self) -> Shape {
        let src = self.tensor.shape();
        let sizes: Vec<usize> = self
            .indexes
            .iter()
            .enumerate()
            .map(|(dim, idx)| idx.as_ref().map_or(src.dim_size(dim), Vec::len))
            .collect();
        Shape::from(sizes)
    }

    fn data_type(&self) -> DataType {
        self.tensor.data_type()
    }

    fn num_dims(&self) -> usize {
        self.indexes.len()
    }

    fn float(&self, coords: &[usize]) -> f64 {
        self.tensor.float(&self.source_coords(coords))
    }

    fn set_float(&self, coords: &[usize], val: f64) {
        self.tensor.set_float(&self.source_coords(coords), val)
    }

    fn float_1d(&self, i: usize) -> f64 {
        self.tensor.float(&self.source_coords_1d(i))
    }

    fn set_float_1d(&self, i: usize, val: f64) {
        self.tensor.set_float(&self.source_coords_1d(i), val)
    }

    fn int(&self, coords: &[usize]) -> i64 {
        self.tensor.int(&self.source_coords(coords))
    }

    fn set_int(&self, coords: &[usize], val: i64) {
        self.tensor.set_int(&self.source_coords(coords), val)
    }

    fn int_1d(&self, i: usize) -> i64 {
        self.tensor.int(&self.source_coords_1d(i))
    }

    fn set_int_1d(&self, i: usize, val: i64) {
        self.tensor.set_int(&self.source_coords_1d(i), val)
    }

    fn string_value(&self, coords: &[usize]) -> String {
        self.tensor.string_value(&self.source_coords(coords))
    }

    fn set_string(&self, coords: &[usize], val: &str) {
        self.tensor.set_string(&self.source_coords(coords), val)
    }

    fn string_1d(&self, i: usize) -> String {
        self.tensor.string_value(&self.source_coords_1d(i))
    }

    fn set_string_1d(&self, i: usize, val: &str) {
        self.tensor.set_string(&self.source_coords_1d(i), val)
    }

    fn as_values(&self) -> Box<dyn Values> {
        let shape = self.shape();
        let src_shape = self.tensor.shape();
        let out = new_of_type(self.data_type(), shape.sizes());
        for i in 0..shape.len() {
            let coords = self.source_coords(&shape.index_from_1d(i));
            copy_element(&out, i, &self.tensor, src_shape.index_to_1d(&coords));
        }
        out
    }
}

impl<V: Tensor> fmt::Debug for Sliced<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sliced")
            .field("tensor", &self.tensor)
            .field("indexes", &self.indexes)
            .finish()
    }
}

impl<V: Tensor> fmt::Display for Sliced<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::format::write_tensor(f, self)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{Float64, Int, Strings};

    fn grid() -> Result<Int, TensorError> {
        Int::from_shape_vec(&[3, 4], (0..12).collect())
    }

    #[test]
    fn test_sliced_identity() -> Result<(), TensorError> {
        let t = grid()?;
        let s = Sliced::new(t.clone());
        assert_eq!(s.shape(), t.shape());
        for i in 0..t.len() {
            assert_eq!(s.int_1d(i), t.int_1d(i));
        }
        Ok(())
    }

    #[test]
    fn test_sliced_select_and_write() -> Result<(), TensorError> {
        let t = grid()?;
        let s = Sliced::with_indexes(t.clone(), vec![Some(vec![2, 0]), Some(vec![3, 1])])?;
        assert_eq!(s.shape().sizes(), &[2, 2]);
        let flat: Vec<i64> = (0..s.len()).map(|i| s.int_1d(i)).collect();
        assert_eq!(flat, vec![11, 9, 3, 1]);

        s.set_int_1d(1, -9);
        assert_eq!(t.int(&[2, 1]), -9);
        s.set_string(&[1, 0], "30");
        assert_eq!(t.int(&[0, 3]), 30);
        Ok(())
    }

    #[test]
    fn test_sliced_wrong_list_count() -> Result<(), TensorError> {
        let res = Sliced::with_indexes(grid()?, vec![None]);
        assert!(matches!(res, Err(TensorError::DimensionMismatch { .. })));
        Ok(())
    }

    #[test]
    fn test_sliced_filter_sort_sequential() -> Result<(), TensorError> {
        let mut s = Sliced::new(grid()?);
        s.filter(1, |_, _, i| i % 2 == 1);
        assert_eq!(s.indexes(1), Some(&[1, 3][..]));

        s.sort_dim_func(0, |t, _, a, b| t.int(&[b, 0]).cmp(&t.int(&[a, 0])));
        assert_eq!(s.indexes(0), Some(&[2, 1, 0][..]));
        assert_eq!(s.int(&[0, 1]), 11);

        s.sequential();
        assert_eq!(s.indexes(0), None);
        assert_eq!(s.shape().sizes(), &[3, 4]);
        Ok(())
    }

    #[test]
    fn test_sliced_valid_indexes() -> Result<(), TensorError> {
        let t = grid()?;
        let mut s = Sliced::with_indexes(t.clone(), vec![Some(vec![2, 0, 1]), None])?;
        t.set_num_rows(2);
        s.valid_indexes();
        assert_eq!(s.indexes(0), Some(&[0, 1][..]));
        Ok(())
    }

    #[test]
    fn test_sliced_permuted() -> Result<(), TensorError> {
        let mut s = Sliced::new(grid()?);
        s.permuted_with(1, &mut StdRng::seed_from_u64(3));
        let mut idx = s.indexes(1).map(<[usize]>::to_vec).unwrap_or_default();
        idx.sort_unstable();
        assert_eq!(idx, vec![0, 1, 2, 3]);
        Ok(())
    }

    #[test]
    fn test_sliced_as_values() -> Result<(), TensorError> {
        let t = Float64::from_shape_vec(&[2, 2], vec![1., 2., 3., 4.])?;
        let s = Sliced::with_indexes(t, vec![Some(vec![1, 1, 0]), Some(vec![1])])?;
        let vals = s.as_values();
        assert_eq!(vals.shape().sizes(), &[3, 1]);
        assert_eq!(vals.data_type(), DataType::Float64);
        let flat: Vec<f64> = (0..vals.len()).map(|i| vals.float_1d(i)).collect();
        assert_eq!(flat, vec![4., 4., 2.]);

        let names = Strings::from_vec(vec!["x".into(), "y".into()]);
        let s = Sliced::with_indexes(names, vec![Some(vec![1, 0])])?;
        assert_eq!(s.as_values().string_1d(0), "y");
        Ok(())
    }
}
