use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::{
    shape::Shape,
    storage::{read_lock, write_lock, TensorStorage},
    tensor::{
        append_row_of, row_tensor_of, sealed, set_row_tensor_of, DataType, RowMajor, Tensor,
        TensorError, Values,
    },
};

const WORD_BITS: usize = u64::BITS as usize;

#[inline]
fn words_for(len: usize) -> usize {
    len.div_ceil(WORD_BITS)
}

/// Parses the string forms accepted for booleans: `true`/`false` in any case,
/// or a number that is non-zero.
pub fn parse_bool(s: &str) -> bool {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        return true;
    }
    if s.eq_ignore_ascii_case("false") {
        return false;
    }
    s.parse::<f64>().map(|v| v != 0.0).unwrap_or(false)
}

/// Dense boolean tensor stored at one bit per element.
///
/// Bit-packed storage has no addressable sub-range, so `Bool` does not
/// implement [`crate::SubSpace`]. Like [`crate::Number`], a `Bool` is a handle
/// and [`Clone`] shares the underlying bits.
///
/// Numeric reads return 1/0, and numeric writes store `true` for any non-zero
/// value.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{Bool, Tensor};
///
/// let mask = Bool::from_vec(vec![true, false, true]);
/// assert_eq!(mask.float_1d(0), 1.0);
/// assert_eq!(mask.string_1d(1), "false");
/// assert_eq!(mask.count_true(), 2);
/// ```
pub struct Bool {
    shape: Arc<RwLock<Shape>>,
    bits: TensorStorage<u64>,
}

impl Bool {
    /// Creates an all-false tensor with the given dimension sizes.
    pub fn new(sizes: &[usize]) -> Self {
        let shape = Shape::new(sizes);
        let bits = TensorStorage::from_vec(vec![0; words_for(shape.len())]);
        Self {
            shape: Arc::new(RwLock::new(shape)),
            bits,
        }
    }

    /// Creates a tensor with the given dimension sizes from a vector.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::InvalidShape`] if the length of `data` does not
    /// match the number of elements of the shape.
    pub fn from_shape_vec(sizes: &[usize], data: Vec<bool>) -> Result<Self, TensorError> {
        let out = Self::new(sizes);
        if out.len() != data.len() {
            return Err(TensorError::invalid_shape(out.len(), data.len()));
        }
        out.bits.write(|words| {
            for (i, v) in data.into_iter().enumerate() {
                if v {
                    words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
                }
            }
        });
        Ok(out)
    }

    /// Creates a 1-D tensor from a vector.
    pub fn from_vec(data: Vec<bool>) -> Self {
        let out = Self::new(&[data.len()]);
        out.bits.write(|words| {
            for (i, v) in data.into_iter().enumerate() {
                if v {
                    words[i / WORD_BITS] |= 1 << (i % WORD_BITS);
                }
            }
        });
        out
    }

    /// The value at flat index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn value_1d(&self, i: usize) -> bool {
        self.check_index(i);
        self.bits
            .read(|words| words[i / WORD_BITS] & (1 << (i % WORD_BITS)) != 0)
    }

    /// Sets the value at flat index `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn set_value_1d(&self, i: usize, val: bool) {
        self.check_index(i);
        self.bits.write(|words| {
            let mask = 1 << (i % WORD_BITS);
            if val {
                words[i / WORD_BITS] |= mask;
            } else {
                words[i / WORD_BITS] &= !mask;
            }
        })
    }

    /// The value at `coords`.
    pub fn value(&self, coords: &[usize]) -> bool {
        let i = read_lock(&self.shape).index_to_1d(coords);
        self.value_1d(i)
    }

    /// Sets the value at `coords`.
    pub fn set_value(&self, coords: &[usize], val: bool) {
        let i = read_lock(&self.shape).index_to_1d(coords);
        self.set_value_1d(i, val)
    }

    /// Sets every element to `val`.
    pub fn fill(&self, val: bool) {
        let len = self.len();
        self.bits.write(|words| {
            words.fill(if val { u64::MAX } else { 0 });
            clear_tail(words, len);
        })
    }

    /// The number of `true` elements.
    pub fn count_true(&self) -> usize {
        self.bits
            .read(|words| words.iter().map(|w| w.count_ones() as usize).sum())
    }

    /// Returns the values in row-major order.
    pub fn to_vec(&self) -> Vec<bool> {
        (0..self.len()).map(|i| self.value_1d(i)).collect()
    }

    /// Returns an independent copy with its own bits and shape.
    pub fn deep_clone(&self) -> Self {
        Self {
            shape: Arc::new(RwLock::new(self.shape())),
            bits: self.bits.deep_clone(),
        }
    }

    fn check_index(&self, i: usize) {
        let len = self.len();
        assert!(i < len, "index {i} out of range for Bool of length {len}");
    }

    /// The flat index of `cell` in `row`. Panics if `cell` is not a cell of a row.
    fn row_offset(&self, row: usize, cell: usize) -> usize {
        let cells = read_lock(&self.shape).row_cell_size().1;
        assert!(cell < cells, "cell {cell} out of range for rows of {cells} cells");
        row * cells + cell
    }
}

/// Clears the bits at and beyond `len` in the last word, so that regrowing
/// exposes `false` elements.
fn clear_tail(words: &mut [u64], len: usize) {
    let rem = len % WORD_BITS;
    if rem != 0 {
        if let Some(last) = words.get_mut(len / WORD_BITS) {
            *last &= (1 << rem) - 1;
        }
    }
}

impl Clone for Bool {
    /// Creates another handle onto the same bits and shape.
    fn clone(&self) -> Self {
        Self {
            shape: Arc::clone(&self.shape),
            bits: self.bits.clone(),
        }
    }
}

impl sealed::Sealed for Bool {}

impl Tensor for Bool {
    fn shape(&self) -> Shape {
        read_lock(&self.shape).clone()
    }

    fn data_type(&self) -> DataType {
        DataType::Bool
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
        f64::from(u8::from(self.value(coords)))
    }

    fn set_float(&self, coords: &[usize], val: f64) {
        self.set_value(coords, val != 0.0)
    }

    fn float_1d(&self, i: usize) -> f64 {
        f64::from(u8::from(self.value_1d(i)))
    }

    fn set_float_1d(&self, i: usize, val: f64) {
        self.set_value_1d(i, val != 0.0)
    }

    fn int(&self, coords: &[usize]) -> i64 {
        i64::from(self.value(coords))
    }

    fn set_int(&self, coords: &[usize], val: i64) {
        self.set_value(coords, val != 0)
    }

    fn int_1d(&self, i: usize) -> i64 {
        i64::from(self.value_1d(i))
    }

    fn set_int_1d(&self, i: usize, val: i64) {
        self.set_value_1d(i, val != 0)
    }

    fn string_value(&self, coords: &[usize]) -> String {
        self.value(coords).to_string()
    }

    fn set_string(&self, coords: &[usize], val: &str) {
        self.set_value(coords, parse_bool(val))
    }

    fn string_1d(&self, i: usize) -> String {
        self.value_1d(i).to_string()
    }

    fn set_string_1d(&self, i: usize, val: &str) {
        self.set_value_1d(i, parse_bool(val))
    }

    fn as_values(&self) -> Box<dyn Values> {
        self.clone_values()
    }
}

impl RowMajor for Bool {
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

impl Values for Bool {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_values(&self) -> Box<dyn Values> {
        Box::new(self.deep_clone())
    }

    fn set_shape_sizes(&self, sizes: &[usize]) {
        let mut shape = write_lock(&self.shape);
        shape.set_sizes(sizes);
        let len = shape.len();
        self.bits.write(|words| clear_tail(words, len));
        self.bits.resize_with(words_for(len), || 0);
    }

    fn set_zeros(&self) {
        self.bits.write(|words| words.fill(0))
    }

    fn copy_cells_from(&self, src: &dyn Values, to: usize, from: usize, n: usize) {
        let cells: Vec<bool> = match src.as_any().downcast_ref::<Bool>() {
            Some(same) => (from..from + n).map(|i| same.value_1d(i)).collect(),
            None if src.is_string() => (from..from + n)
                .map(|i| parse_bool(&src.string_1d(i)))
                .collect(),
            None => (from..from + n).map(|i| src.float_1d(i) != 0.0).collect(),
        };
        for (k, v) in cells.into_iter().enumerate() {
            self.set_value_1d(to + k, v);
        }
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bool")
            .field("shape", &self.shape())
            .field("bits", &self.bits)
            .finish()
    }
}

impl fmt::Display for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::format::write_tensor(f, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Float64, Strings};

    #[test]
    fn test_bool_bits_across_words() {
        let b = Bool::new(&[130]);
        b.set_value_1d(0, true);
        b.set_value_1d(63, true);
        b.set_value_1d(64, true);
        b.set_value_1d(129, true);
        assert_eq!(b.count_true(), 4);
        assert!(b.value_1d(64));
        assert!(!b.value_1d(65));
        b.set_value_1d(64, false);
        assert_eq!(b.count_true(), 3);
    }

    #[test]
    fn test_bool_coercions() {
        let b = Bool::new(&[2, 2]);
        b.set_float(&[0, 1], 0.5);
        b.set_int(&[1, 0], 0);
        b.set_string(&[1, 1], "TRUE");
        assert_eq!(b.float(&[0, 1]), 1.0);
        assert_eq!(b.int(&[1, 0]), 0);
        assert_eq!(b.string_value(&[1, 1]), "true");
        assert_eq!(b.string_1d(0), "false");
        assert!(parse_bool("1"));
        assert!(!parse_bool("no"));
    }

    #[test]
    fn test_bool_resize_clears_tail() {
        let b = Bool::from_vec(vec![true; 10]);
        b.set_shape_sizes(&[4]);
        assert_eq!(b.count_true(), 4);
        b.set_shape_sizes(&[10]);
        assert_eq!(b.to_vec()[..4], [true; 4]);
        assert_eq!(b.to_vec()[4..], [false; 6]);
    }

    #[test]
    fn test_bool_fill() {
        let b = Bool::new(&[70]);
        b.fill(true);
        assert_eq!(b.count_true(), 70);
        b.set_zeros();
        assert_eq!(b.count_true(), 0);
    }

    #[test]
    fn test_bool_copy_from() -> Result<(), TensorError> {
        let b = Bool::new(&[4]);
        b.copy_from(&Float64::from_vec(vec![0.0, 2.0, -1.0, 0.0]));
        assert_eq!(b.to_vec(), vec![false, true, true, false]);

        b.copy_from(&Strings::from_vec(vec!["false".into(), "true".into()]));
        assert_eq!(b.to_vec(), vec![false, true, true, false]);

        let other = Bool::from_shape_vec(&[2, 2], vec![true, true, false, false])?;
        b.append_from(&Bool::from_vec(vec![true]))?;
        assert_eq!(b.len(), 5);
        assert!(other.value(&[0, 1]));
        Ok(())
    }

    #[test]
    fn test_bool_from_shape_vec_mismatch() {
        let res = Bool::from_shape_vec(&[3], vec![true]);
        assert_eq!(res.err(), Some(TensorError::invalid_shape(3, 1)));
    }
}
