use std::fmt;

/// Computes the strides for a row-major (C-contiguous) tensor layout.
///
/// Strides define how many elements to skip in memory to move along each dimension.
/// For row-major layout, the rightmost dimension has stride 1, and each dimension's
/// stride is the product of all dimensions to its right.
///
/// # Arguments
///
/// * `sizes` - The dimension sizes, outer-to-inner.
///
/// # Returns
///
/// A vector of strides corresponding to each dimension.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::shape::get_strides_from_shape;
///
/// assert_eq!(get_strides_from_shape(&[2, 3]), vec![3, 1]);
/// assert_eq!(get_strides_from_shape(&[2, 3, 4]), vec![12, 4, 1]);
/// ```
pub fn get_strides_from_shape(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; sizes.len()];
    let mut stride = 1;
    for i in (0..sizes.len()).rev() {
        strides[i] = stride;
        stride *= sizes[i];
    }
    strides
}

/// The sizes of each dimension of a tensor, outer-to-inner (row-major).
///
/// The last dimension varies fastest in memory. Strides are derived from the
/// sizes and cached so that index conversion does not recompute them.
///
/// An empty list of sizes is a valid shape with zero elements.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::Shape;
///
/// let shape = Shape::new(&[2, 3, 4]);
/// assert_eq!(shape.len(), 24);
/// assert_eq!(shape.index_to_1d(&[1, 2, 3]), 23);
/// assert_eq!(shape.index_from_1d(23), vec![1, 2, 3]);
/// assert_eq!(shape.row_cell_size(), (2, 12));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    sizes: Vec<usize>,
    strides: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimension sizes.
    pub fn new(sizes: &[usize]) -> Self {
        Self {
            sizes: sizes.to_vec(),
            strides: get_strides_from_shape(sizes),
        }
    }

    /// Replaces the dimension sizes, recomputing the strides.
    pub fn set_sizes(&mut self, sizes: &[usize]) {
        self.sizes.clear();
        self.sizes.extend_from_slice(sizes);
        self.strides = get_strides_from_shape(sizes);
    }

    /// The dimension sizes, outer-to-inner.
    #[inline]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The row-major strides, one per dimension.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// The number of dimensions.
    #[inline]
    pub fn num_dims(&self) -> usize {
        self.sizes.len()
    }

    /// The size of dimension `dim`.
    ///
    /// # Panics
    ///
    /// Panics if `dim >= self.num_dims()`.
    #[inline]
    pub fn dim_size(&self, dim: usize) -> usize {
        self.sizes[dim]
    }

    /// The total number of elements, which is zero for a shape with no dimensions.
    #[inline]
    pub fn len(&self) -> usize {
        if self.sizes.is_empty() {
            return 0;
        }
        self.sizes.iter().product()
    }

    /// Returns true if the shape holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if both shapes have identical sizes.
    pub fn is_equal(&self, other: &Shape) -> bool {
        self.sizes == other.sizes
    }

    /// Splits the shape into the outermost "row" dimension and the flattened
    /// size of the remaining "cell" dimensions.
    ///
    /// A shape without dimensions reports a single row of zero cells, so that
    /// `rows * cells == len()` always holds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tessera_tensor::Shape;
    ///
    /// assert_eq!(Shape::new(&[5]).row_cell_size(), (5, 1));
    /// assert_eq!(Shape::new(&[5, 2, 3]).row_cell_size(), (5, 6));
    /// assert_eq!(Shape::new(&[]).row_cell_size(), (1, 0));
    /// ```
    pub fn row_cell_size(&self) -> (usize, usize) {
        match self.sizes.split_first() {
            None => (1, 0),
            Some((&rows, rest)) => (rows, rest.iter().product()),
        }
    }

    /// Converts a full coordinate into a flat row-major offset.
    ///
    /// # Panics
    ///
    /// Panics if the number of coordinates does not match the number of
    /// dimensions, or if any coordinate is out of range for its dimension.
    pub fn index_to_1d(&self, coords: &[usize]) -> usize {
        assert_eq!(
            coords.len(),
            self.sizes.len(),
            "index_to_1d: got {} coordinates for a shape with {} dimensions",
            coords.len(),
            self.sizes.len()
        );
        let mut offset = 0;
        for (dim, ((&idx, &size), &stride)) in coords
            .iter()
            .zip(self.sizes.iter())
            .zip(self.strides.iter())
            .enumerate()
        {
            assert!(
                idx < size,
                "index_to_1d: index {idx} out of range for dimension {dim} of size {size}"
            );
            offset += idx * stride;
        }
        offset
    }

    /// Converts a flat row-major offset back into a full coordinate. This is the
    /// exact inverse of [`Shape::index_to_1d`].
    ///
    /// # Panics
    ///
    /// Panics if `offset >= self.len()`.
    pub fn index_from_1d(&self, offset: usize) -> Vec<usize> {
        let len = self.len();
        assert!(
            offset < len,
            "index_from_1d: offset {offset} out of range for shape of length {len}"
        );
        let mut coords = vec![0; self.sizes.len()];
        let mut rem = offset;
        for (coord, &stride) in coords.iter_mut().zip(self.strides.iter()) {
            *coord = rem / stride;
            rem %= stride;
        }
        coords
    }
}

impl From<Vec<usize>> for Shape {
    fn from(sizes: Vec<usize>) -> Self {
        let strides = get_strides_from_shape(&sizes);
        Self { sizes, strides }
    }
}

impl From<&[usize]> for Shape {
    fn from(sizes: &[usize]) -> Self {
        Self::new(sizes)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.sizes)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.sizes)
    }
}

/// Concatenates the dimensions of two shapes, `a` outermost.
pub fn add_shapes(a: &Shape, b: &Shape) -> Shape {
    let mut sizes = Vec::with_capacity(a.num_dims() + b.num_dims());
    sizes.extend_from_slice(a.sizes());
    sizes.extend_from_slice(b.sizes());
    Shape::from(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(get_strides_from_shape(&[]), Vec::<usize>::new());
        assert_eq!(get_strides_from_shape(&[4]), vec![1]);
        assert_eq!(get_strides_from_shape(&[2, 3, 4]), vec![12, 4, 1]);
    }

    #[test]
    fn test_len() {
        assert_eq!(Shape::new(&[]).len(), 0);
        assert!(Shape::new(&[]).is_empty());
        assert_eq!(Shape::new(&[3, 0]).len(), 0);
        assert_eq!(Shape::new(&[3, 4]).len(), 12);
    }

    #[test]
    fn test_index_bijection() {
        for sizes in [vec![7], vec![2, 3], vec![3, 1, 4], vec![2, 2, 2, 5]] {
            let shape = Shape::new(&sizes);
            for offset in 0..shape.len() {
                let coords = shape.index_from_1d(offset);
                assert_eq!(shape.index_to_1d(&coords), offset);
            }
        }
    }

    #[test]
    fn test_row_cell_size() {
        assert_eq!(Shape::new(&[2, 3]).row_cell_size(), (2, 3));
        assert_eq!(Shape::new(&[4]).row_cell_size(), (4, 1));
        assert_eq!(Shape::new(&[0, 3, 2]).row_cell_size(), (0, 6));
    }

    #[test]
    fn test_set_sizes() {
        let mut shape = Shape::new(&[2, 3]);
        shape.set_sizes(&[4, 5, 6]);
        assert_eq!(shape.sizes(), &[4, 5, 6]);
        assert_eq!(shape.strides(), &[30, 6, 1]);
        assert!(shape.is_equal(&Shape::from(vec![4, 5, 6])));
    }

    #[test]
    fn test_add_shapes() {
        let s = add_shapes(&Shape::new(&[2]), &Shape::new(&[3, 4]));
        assert_eq!(s.sizes(), &[2, 3, 4]);
        assert_eq!(s.to_string(), "[2, 3, 4]");
    }

    #[test]
    #[should_panic(expected = "out of range for dimension 1")]
    fn test_index_out_of_range() {
        Shape::new(&[2, 3]).index_to_1d(&[1, 3]);
    }

    #[test]
    #[should_panic]
    fn test_offset_out_of_range() {
        Shape::new(&[2, 3]).index_from_1d(6);
    }
}
