use std::fmt;

use crate::{
    boolean::Bool,
    shape::Shape,
    tensor::{copy_element, new_of_type, sealed, DataType, Tensor, TensorError, Values},
};

/// A view that hides the elements of a source tensor where a [`Bool`] mask is
/// false.
///
/// Hidden elements read as missing: NaN as a float, 0 as an integer and the
/// empty string. Writes to hidden elements are dropped without error, so bulk
/// loops over a masked view never abort on them.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{Bool, Float64, Masked, Tensor};
///
/// let t = Float64::from_vec(vec![1., 2., 3., 4.]);
/// let mask = Bool::from_vec(vec![true, false, true, false]);
/// let m = Masked::with_mask(t, mask).unwrap();
/// assert!(m.float_1d(1).is_nan());
/// assert_eq!(m.as_values().len(), 2);
/// ```
#[derive(Clone)]
pub struct Masked<V: Tensor> {
    tensor: V,
    mask: Bool,
}

impl<V: Tensor> Masked<V> {
    /// Creates a view with every element visible.
    pub fn new(tensor: V) -> Self {
        let mask = Bool::new(tensor.shape().sizes());
        mask.fill(true);
        Self { tensor, mask }
    }

    /// Creates a view using `mask`, which must have the source's shape.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::DimensionMismatch`] if the shapes differ.
    pub fn with_mask(tensor: V, mask: Bool) -> Result<Self, TensorError> {
        let (shape, mask_shape) = (tensor.shape(), mask.shape());
        if shape != mask_shape {
            return Err(TensorError::dimension_mismatch(
                "mask shape must match the source shape",
                shape.sizes(),
                mask_shape.sizes(),
            ));
        }
        Ok(Self { tensor, mask })
    }

    /// The source tensor.
    pub fn source(&self) -> &V {
        &self.tensor
    }

    /// The mask. It is a handle, so writes through it change the view.
    pub fn mask(&self) -> &Bool {
        &self.mask
    }

    /// Re-derives the whole mask from `f`, which receives the source and a flat
    /// element index.
    pub fn filter(&mut self, mut f: impl FnMut(&V, usize) -> bool) {
        for i in 0..self.tensor.len() {
            self.mask.set_value_1d(i, f(&self.tensor, i));
        }
    }

    /// Resizes the mask to the source's current shape. Elements that did not
    /// exist before are visible.
    pub fn sync_shape(&mut self) {
        let shape = self.tensor.shape();
        let old = self.mask.len();
        self.mask.set_shape_sizes(shape.sizes());
        for i in old..shape.len() {
            self.mask.set_value_1d(i, true);
        }
    }

    fn visible(&self, i: usize) -> bool {
        self.mask.value_1d(i)
    }

    fn visible_at(&self, coords: &[usize]) -> bool {
        self.mask.value(coords)
    }
}

impl<V: Tensor> sealed::Sealed for Masked<V> {}

impl<V: Tensor> Tensor for Masked<V> {
    fn shape(&self) -> Shape {
        self.tensor.shape()
    }

    fn data_type(&self) -> DataType {
        self.tensor.data_type()
    }

    fn num_dims(&self) -> usize {
        self.tensor.num_dims()
    }

    fn len(&self) -> usize {
        self.tensor.len()
    }

    fn float(&self, coords: &[usize]) -> f64 {
        if self.visible_at(coords) {
            self.tensor.float(coords)
        } else {
            f64::NAN
        }
    }

    fn set_float(&self, coords: &[usize], val: f64) {
        if self.visible_at(coords) {
            self.tensor.set_float(coords, val)
        }
    }

    fn float_1d(&self, i: usize) -> f64 {
        if self.visible(i) {
            self.tensor.float_1d(i)
        } else {
            f64::NAN
        }
    }

    fn set_float_1d(&self, i: usize, val: f64) {
        if self.visible(i) {
            self.tensor.set_float_1d(i, val)
        }
    }

    fn int(&self, coords: &[usize]) -> i64 {
        if self.visible_at(coords) {
            self.tensor.int(coords)
        } else {
            0
        }
    }

    fn set_int(&self, coords: &[usize], val: i64) {
        if self.visible_at(coords) {
            self.tensor.set_int(coords, val)
        }
    }

    fn int_1d(&self, i: usize) -> i64 {
        if self.visible(i) {
            self.tensor.int_1d(i)
        } else {
            0
        }
    }

    fn set_int_1d(&self, i: usize, val: i64) {
        if self.visible(i) {
            self.tensor.set_int_1d(i, val)
        }
    }

    fn string_value(&self, coords: &[usize]) -> String {
        if self.visible_at(coords) {
            self.tensor.string_value(coords)
        } else {
            String::new()
        }
    }

    fn set_string(&self, coords: &[usize], val: &str) {
        if self.visible_at(coords) {
            self.tensor.set_string(coords, val)
        }
    }

    fn string_1d(&self, i: usize) -> String {
        if self.visible(i) {
            self.tensor.string_1d(i)
        } else {
            String::new()
        }
    }

    fn set_string_1d(&self, i: usize, val: &str) {
        if self.visible(i) {
            self.tensor.set_string_1d(i, val)
        }
    }

    /// Compacts the visible elements, in flat order, into a new 1-D tensor.
    fn as_values(&self) -> Box<dyn Values> {
        let keep: Vec<usize> = (0..self.tensor.len()).filter(|&i| self.visible(i)).collect();
        let out = new_of_type(self.data_type(), &[keep.len()]);
        for (di, &si) in keep.iter().enumerate() {
            copy_element(&out, di, &self.tensor, si);
        }
        out
    }
}

impl<V: Tensor> fmt::Debug for Masked<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Masked")
            .field("tensor", &self.tensor)
            .field("mask", &self.mask)
            .finish()
    }
}

impl<V: Tensor> fmt::Display for Masked<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::format::write_tensor(f, self)
    }
}
