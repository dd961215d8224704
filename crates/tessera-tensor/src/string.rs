use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::{
    number::sub_space_layout,
    shape::Shape,
    storage::{read_lock, write_lock, TensorStorage},
    tensor::{
        append_row_of, row_tensor_of, sealed, set_row_tensor_of, DataType, RowMajor, SubSpace,
        Tensor, TensorError, Values,
    },
};

fn parse_float(s: &str) -> f64 {
    s.trim().parse().unwrap_or(0.0)
}

fn parse_int(s: &str) -> i64 {
    let s = s.trim();
    s.parse::<i64>()
        .unwrap_or_else(|_| s.parse::<f64>().map_or(0, |v| v as i64))
}

/// Dense, contiguous, row-major storage of strings.
///
/// Numeric reads parse the stored text and yield 0 when it is not a number.
/// Like [`crate::Number`], a `Strings` tensor is a handle and [`Clone`] shares
/// the underlying buffer.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{Strings, Tensor};
///
/// let t = Strings::from_vec(vec!["3.5".into(), "abc".into()]);
/// assert_eq!(t.float_1d(0), 3.5);
/// assert_eq!(t.int_1d(1), 0);
/// ```
pub struct Strings {
    shape: Arc<RwLock<Shape>>,
    storage: TensorStorage<String>,
}

impl Strings {
    /// Creates a tensor of empty strings with the given dimension sizes.
    pub fn new(sizes: &[usize]) -> Self {
        let shape = Shape::new(sizes);
        let data = vec![String::new(); shape.len()];
        Self::from_parts(shape, TensorStorage::from_vec(data))
    }

    fn from_parts(shape: Shape, storage: TensorStorage<String>) -> Self {
        Self {
            shape: Arc::new(RwLock::new(shape)),
            storage,
        }
    }

    /// Creates a tensor with the given dimension sizes from a vector.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] if the length of `data` does not
    /// match the number of elements of the shape.
    pub fn from_shape_vec(sizes: &[usize], data: Vec<String>) -> Result<Self, TensorError> {
        let shape = Shape::new(sizes);
        if shape.len() != data.len() {
            return Err(TensorError::invalid_shape(shape.len(), data.len()));
        }
        Ok(Self::from_parts(shape, TensorStorage::from_vec(data)))
    }

    /// Creates a 1-D tensor from a vector.
    pub fn from_vec(data: Vec<String>) -> Self {
        let shape = Shape::new(&[data.len()]);
        Self::from_parts(shape, TensorStorage::from_vec(data))
    }

    /// Returns a copy of the elements in row-major order.
    pub fn to_vec(&self) -> Vec<String> {
        self.storage.to_vec()
    }

    /// Returns an independent copy with its own buffer and shape.
    pub fn deep_clone(&self) -> Self {
        Self::from_parts(self.shape(), self.storage.deep_clone())
    }

    fn index(&self, coords: &[usize]) -> usize {
        read_lock(&self.shape).index_to_1d(coords)
    }

    /// The flat index of `cell` in `row`. Panics if `cell` is not a cell of a row.
    fn row_offset(&self, row: usize, cell: usize) -> usize {
        let cells = read_lock(&self.shape).row_cell_size().1;
        assert!(cell < cells, "cell {cell} out of range for rows of {cells} cells");
        row * cells + cell
    }
}

impl Clone for Strings {
    /// Creates another handle onto the same buffer and shape.
    fn clone(&self) -> Self {
        Self {
            shape: Arc::clone(&self.shape),
            storage: self.storage.clone(),
        }
    }
}

impl sealed::Sealed for Strings {}

impl Tensor for Strings {
    fn shape(&self) -> Shape {
        read_lock(&self.shape).clone()
    }

    fn data_type(&self) -> DataType {
        DataType::String
    }

    fn num_dims(&self) -> usize {
        read_lock(&self.shape).num_dims()
    }

    fn dim_size(&self, dim: usize) -> usize {
        read_lock(&self.shape).dim_size(dim)
    }

    fn len(&self) -> usize {
        read_lock(&self.shape).len()
    }

    fn row_cell_size(&self) -> (usize, usize) {
        read_lock(&self.shape).row_cell_size()
    }

    fn float(&self, coords: &[usize]) -> f64 {
        self.float_1d(self.index(coords))
    }

    fn set_float(&self, coords: &[usize], val: f64) {
        self.set_float_1d(self.index(coords), val)
    }

    fn float_1d(&self, i: usize) -> f64 {
        self.storage.read(|s| parse_float(&s[i]))
    }

    fn set_float_1d(&self, i: usize, val: f64) {
        self.storage.set(i, val.to_string())
    }

    fn int(&self, coords: &[usize]) -> i64 {
        self.int_1d(self.index(coords))
    }

    fn set_int(&self, coords: &[usize], val: i64) {
        self.set_int_1d(self.index(coords), val)
    }

    fn int_1d(&self, i: usize) -> i64 {
        self.storage.read(|s| parse_int(&s[i]))
    }

    fn set_int_1d(&self, i: usize, val: i64) {
        self.storage.set(i, val.to_string())
    }

    fn string_value(&self, coords: &[usize]) -> String {
        self.storage.get(self.index(coords))
    }

    fn set_string(&self, coords: &[usize], val: &str) {
        self.storage.set(self.index(coords), val.to_string())
    }

    fn string_1d(&self, i: usize) -> String {
        self.storage.get(i)
    }

    fn set_string_1d(&self, i: usize, val: &str) {
        self.storage.set(i, val.to_string())
    }

    fn as_values(&self) -> Box<dyn Values> {
        self.clone_values()
    }
}

impl RowMajor for Strings {
    fn float_row(&self, row: usize, cell: usize) -> f64 {
        self.float_1d(self.row_offset(row, cell))
    }

    fn set_float_row(&self, row: usize, cell: usize, val: f64) {
        self.set_float_1d(self.row_offset(row, cell), val)
    }

    fn int_row(&self, row: usize, cell: usize) -> i64 {
        self.int_1d(self.row_offset(row, cell))
    }

    fn set_int_row(&self, row: usize, cell: usize, val: i64) {
        self.set_int_1d(self.row_offset(row, cell), val)
    }

    fn string_row(&self, row: usize, cell: usize) -> String {
        self.string_1d(self.row_offset(row, cell))
    }

    fn set_string_row(&self, row: usize, cell: usize, val: &str) {
        self.set_string_1d(self.row_offset(row, cell), val)
    }

    fn row_tensor(&self, row: usize) -> Box<dyn Values> {
        row_tensor_of(self, row)
    }

    fn set_row_tensor(&self, row: usize, vals: &dyn Values) -> Result<(), TensorError> {
        set_row_tensor_of(self, row, vals)
    }

    fn append_row(&self, vals: &dyn Values) -> Result<(), TensorError> {
        append_row_of(self, vals)
    }
}

impl Values for Strings {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_values(&self) -> Box<dyn Values> {
        Box::new(self.deep_clone())
    }

    fn set_shape_sizes(&self, sizes: &[usize]) {
        let mut shape = write_lock(&self.shape);
        shape.set_sizes(sizes);
        self.storage.resize_with(shape.len(), String::new);
    }

    fn set_zeros(&self) {
        self.storage.write(|s| s.iter_mut().for_each(String::clear))
    }

    fn copy_cells_from(&self, src: &dyn Values, to: usize, from: usize, n: usize) {
        let cells = match src.as_any().downcast_ref::<Strings>() {
            Some(same) => same.storage.range_to_vec(from, n),
            None => (from..from + n).map(|i| src.string_1d(i)).collect(),
        };
        self.storage
            .write(|dst| dst[to..to + n].clone_from_slice(&cells));
    }
}

impl SubSpace for Strings {
    fn sub_space(&self, offs: &[usize]) -> Self {
        let (start, sizes) = sub_space_layout(&read_lock(&self.shape), offs);
        let len = sizes.iter().product();
        match self.storage.view(start, len) {
            Ok(storage) => Self::from_parts(Shape::from(sizes), storage),
            Err(err) => panic!("sub_space: {err}"),
        }
    }
}

impl fmt::Debug for Strings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strings")
            .field("shape", &self.shape())
            .field("storage", &self.storage)
            .finish()
    }
}

impl fmt::Display for Strings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::format::write_tensor(f, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Int;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_strings_coercion() {
        let t = Strings::new(&[4]);
        t.set_float_1d(0, 2.5);
        t.set_int_1d(1, -3);
        t.set_string_1d(2, " 7.9 ");
        assert_eq!(t.string_1d(0), "2.5");
        assert_eq!(t.int_1d(1), -3);
        assert_eq!(t.int_1d(2), 7);
        assert_eq!(t.float_1d(3), 0.0);
    }

    #[test]
    fn test_strings_sub_space() -> Result<(), TensorError> {
        let t = Strings::from_shape_vec(&[2, 2], strings(&["a", "b", "c", "d"]))?;
        let row = t.sub_space(&[1]);
        assert_eq!(row.to_vec(), strings(&["c", "d"]));
        row.set_string_1d(0, "z");
        assert_eq!(t.string_value(&[1, 0]), "z");
        Ok(())
    }

    #[test]
    fn test_strings_append_from_numbers() -> Result<(), TensorError> {
        let t = Strings::from_vec(strings(&["x"]));
        t.append_from(&Int::from_vec(vec![1, 2]))?;
        assert_eq!(t.to_vec(), strings(&["x", "1", "2"]));
        t.set_zeros();
        assert_eq!(t.to_vec(), strings(&["", "", ""]));
        Ok(())
    }
}
