use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::{
    boolean::Bool,
    number::{Number, NumberType},
    shape::Shape,
    string::Strings,
};

/// An error type for tensor operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// Two shapes can not be broadcast against each other.
    ///
    /// Sizes at `dim` differ and neither of them is 1. The dimension index is
    /// counted outer-to-inner on the aligned (output) shape.
    #[error("Shape mismatch at dimension {dim}: {a} vs {b} (sizes must be equal or one of them 1)")]
    ShapeMismatch {
        /// The output dimension that failed to align.
        dim: usize,
        /// The size of the first operand at `dim`.
        a: usize,
        /// The size of the second operand at `dim`.
        b: usize,
    },

    /// The cell size of the source does not match the destination.
    ///
    /// Row-wise growth (`append_from`, `append_row`, `set_row_tensor`) requires
    /// both tensors to have the same number of cells per row.
    #[error("Cell size mismatch: destination has {expected} cells per row, source has {actual}")]
    CellSizeMismatch {
        /// Cells per row of the destination.
        expected: usize,
        /// Cells per row of the source.
        actual: usize,
    },

    /// Tensor shape does not match the provided data.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Index exceeds tensor bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// Tensor dimensions incompatible for the requested operation.
    ///
    /// # Examples
    /// - A mask whose shape differs from the masked tensor
    /// - An index tensor whose innermost size is not the source rank
    #[error("Dimension mismatch: {message}. Expected shape: {expected}, got: {actual}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },

    /// Operation not supported for this tensor configuration.
    #[error("Unsupported operation: {operation} - {reason}")]
    UnsupportedOperation {
        /// Name of the operation that failed
        operation: String,
        /// Reason why the operation is not supported
        reason: String,
    },
}

impl TensorError {
    /// Creates a ShapeMismatch error for a failed alignment.
    pub fn shape_mismatch(dim: usize, a: usize, b: usize) -> Self {
        Self::ShapeMismatch { dim, a, b }
    }

    /// Creates a CellSizeMismatch error.
    pub fn cell_size_mismatch(expected: usize, actual: usize) -> Self {
        Self::CellSizeMismatch { expected, actual }
    }

    /// Creates an InvalidShape error with clear context.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates an IndexOutOfBounds error with clear context.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Creates a DimensionMismatch error with formatted shapes.
    pub fn dimension_mismatch(
        message: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }

    /// Creates an UnsupportedOperation error with context.
    pub fn unsupported_operation(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error comes from incompatible sizes in data that
    /// may have been provided by an end user (as opposed to calling code).
    pub fn is_size_error(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch { .. } | Self::CellSizeMismatch { .. } | Self::InvalidShape { .. }
        )
    }
}

/// The native storage kind of a tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `f32`
    Float32,
    /// `f64`
    Float64,
    /// `i8`
    Int8,
    /// `i16`
    Int16,
    /// `i32`
    Int32,
    /// `i64`
    Int64,
    /// `isize`
    Isize,
    /// `u8`
    Uint8,
    /// `u16`
    Uint16,
    /// `u32`
    Uint32,
    /// `u64`
    Uint64,
    /// `usize`
    Usize,
    /// bit-packed `bool`
    Bool,
    /// `String`
    String,
}

impl DataType {
    /// Returns true for floating point kinds.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Returns true for integer kinds.
    pub fn is_int(self) -> bool {
        !self.is_float() && !matches!(self, Self::Bool | Self::String)
    }

    /// Returns true for the string kind.
    pub fn is_string(self) -> bool {
        self == Self::String
    }

    /// The name used when formatting tensors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Int8 => "Int8",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Isize => "Isize",
            Self::Uint8 => "Uint8",
            Self::Uint16 => "Uint16",
            Self::Uint32 => "Uint32",
            Self::Uint64 => "Uint64",
            Self::Usize => "Usize",
            Self::Bool => "Bool",
            Self::String => "String",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// The read/write contract shared by every tensor: owning [`Values`] and views.
///
/// Every element can be read and written through three coercions (float, int
/// and string) regardless of the native storage kind. Writes take `&self`:
/// tensors are handles onto shared buffers, and a write through any handle or
/// view is visible through all of them.
///
/// Coordinates are full, outer-to-inner, and must be in range: an out-of-range
/// coordinate is a bug in the calling code and panics.
pub trait Tensor: sealed::Sealed + fmt::Debug + Send + Sync {
    /// The logical shape of the tensor.
    fn shape(&self) -> Shape;

    /// The native storage kind of the tensor.
    fn data_type(&self) -> DataType;

    /// The number of dimensions.
    fn num_dims(&self) -> usize {
        self.shape().num_dims()
    }

    /// The size of dimension `dim`.
    fn dim_size(&self, dim: usize) -> usize {
        self.shape().dim_size(dim)
    }

    /// The total number of elements.
    fn len(&self) -> usize {
        self.shape().len()
    }

    /// Returns true if the tensor holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The outer row count and the flattened cell count of the other dimensions.
    fn row_cell_size(&self) -> (usize, usize) {
        self.shape().row_cell_size()
    }

    /// Returns true if the tensor stores strings.
    fn is_string(&self) -> bool {
        self.data_type().is_string()
    }

    /// Reads the element at `coords` as a float.
    fn float(&self, coords: &[usize]) -> f64;

    /// Writes a float at `coords`, converting it to the native kind.
    fn set_float(&self, coords: &[usize], val: f64);

    /// Reads the element at flat row-major index `i` as a float.
    fn float_1d(&self, i: usize) -> f64;

    /// Writes a float at flat row-major index `i`.
    fn set_float_1d(&self, i: usize, val: f64);

    /// Reads the element at `coords` as an integer.
    fn int(&self, coords: &[usize]) -> i64;

    /// Writes an integer at `coords`.
    fn set_int(&self, coords: &[usize], val: i64);

    /// Reads the element at flat index `i` as an integer.
    fn int_1d(&self, i: usize) -> i64;

    /// Writes an integer at flat index `i`.
    fn set_int_1d(&self, i: usize, val: i64);

    /// Reads the element at `coords` as a string.
    fn string_value(&self, coords: &[usize]) -> String;

    /// Writes a string at `coords`, parsing it for non-string kinds.
    fn set_string(&self, coords: &[usize], val: &str);

    /// Reads the element at flat index `i` as a string.
    fn string_1d(&self, i: usize) -> String;

    /// Writes a string at flat index `i`.
    fn set_string_1d(&self, i: usize, val: &str);

    /// Materializes the tensor into new, contiguous, owning storage of the same
    /// data type. The result does not alias the source.
    fn as_values(&self) -> Box<dyn Values>;
}

/// Tensors whose outermost dimension addresses contiguous rows of cells.
pub trait RowMajor: Tensor {
    /// The number of rows (size of the outermost dimension).
    fn num_rows(&self) -> usize {
        self.row_cell_size().0
    }

    /// Reads cell `cell` of row `row` as a float.
    fn float_row(&self, row: usize, cell: usize) -> f64;

    /// Writes cell `cell` of row `row` as a float.
    fn set_float_row(&self, row: usize, cell: usize, val: f64);

    /// Reads cell `cell` of row `row` as an integer.
    fn int_row(&self, row: usize, cell: usize) -> i64;

    /// Writes cell `cell` of row `row` as an integer.
    fn set_int_row(&self, row: usize, cell: usize, val: i64);

    /// Reads cell `cell` of row `row` as a string.
    fn string_row(&self, row: usize, cell: usize) -> String;

    /// Writes cell `cell` of row `row` as a string.
    fn set_string_row(&self, row: usize, cell: usize, val: &str);

    /// Copies the cells of `row` into a new tensor shaped like one row.
    fn row_tensor(&self, row: usize) -> Box<dyn Values>;

    /// Overwrites the cells of `row` with the values of `vals`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CellSizeMismatch`] if `vals` does not hold exactly
    /// one row of cells.
    fn set_row_tensor(&self, row: usize, vals: &dyn Values) -> Result<(), TensorError>;

    /// Adds one row at the end holding the values of `vals`.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CellSizeMismatch`] if `vals` does not hold exactly
    /// one row of cells.
    fn append_row(&self, vals: &dyn Values) -> Result<(), TensorError>;
}

/// Owning, contiguous, row-major storage: [`Number`], [`Bool`] and [`Strings`].
pub trait Values: RowMajor {
    /// Type-erased access for same-type fast paths.
    fn as_any(&self) -> &dyn Any;

    /// Returns a deep copy of the tensor with the same concrete type.
    fn clone_values(&self) -> Box<dyn Values>;

    /// Reshapes the tensor, growing or truncating the buffer as needed.
    ///
    /// Existing elements keep their flat position and new elements are zero.
    ///
    /// # Panics
    ///
    /// Panics if called on a sub-space view.
    fn set_shape_sizes(&self, sizes: &[usize]);

    /// Sets the number of rows, keeping the cell shape.
    ///
    /// Growing keeps all existing rows. Shrinking keeps the allocation, so
    /// resetting a large pre-allocated tensor to 0 rows and regrowing is cheap.
    fn set_num_rows(&self, rows: usize) {
        let mut sizes = self.shape().sizes().to_vec();
        match sizes.first_mut() {
            Some(first) => *first = rows,
            None => sizes.push(rows),
        }
        self.set_shape_sizes(&sizes);
    }

    /// Sets every element to its zero value.
    fn set_zeros(&self);

    /// Copies `n` flat elements from `src[from..]` into `self[to..]`, coercing
    /// between storage kinds when they differ.
    ///
    /// # Panics
    ///
    /// Panics if either range is out of bounds.
    fn copy_cells_from(&self, src: &dyn Values, to: usize, from: usize, n: usize);

    /// Copies elements from `src` in flat order, up to the shorter of the two.
    fn copy_from(&self, src: &dyn Values) {
        let n = self.len().min(src.len());
        self.copy_cells_from(src, 0, 0, n);
    }

    /// Appends the rows of `src` to the end of this tensor.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CellSizeMismatch`] if the cell sizes differ.
    fn append_from(&self, src: &dyn Values) -> Result<(), TensorError> {
        let (rows, cells) = self.row_cell_size();
        let (src_rows, src_cells) = src.row_cell_size();
        if cells != src_cells {
            return Err(TensorError::cell_size_mismatch(cells, src_cells));
        }
        // snapshot before resizing, since src may share our buffer
        let src = src.clone_values();
        self.set_num_rows(rows + src_rows);
        self.copy_cells_from(&*src, rows * cells, 0, src_rows * src_cells);
        Ok(())
    }
}

/// Values that can hand out zero-copy views over a trailing sub-space.
///
/// Bit-packed [`Bool`] storage has no addressable sub-range and does not
/// implement this trait.
pub trait SubSpace: Values + Sized {
    /// Returns a view sharing this tensor's buffer that covers every dimension
    /// after the `offs` prefix.
    ///
    /// With `offs = [r]` the result is row `r`; with two offsets on a 3-D tensor
    /// the result is the 1-D cell vector at `[offs[0], offs[1], ..]`.
    ///
    /// # Panics
    ///
    /// Panics if `offs` is empty, covers all dimensions, or is out of range.
    fn sub_space(&self, offs: &[usize]) -> Self;
}

/// Creates zero-filled owning storage of the given kind and shape.
pub fn new_of_type(data_type: DataType, sizes: &[usize]) -> Box<dyn Values> {
    match data_type {
        DataType::Float32 => Box::new(Number::<f32>::new(sizes)),
        DataType::Float64 => Box::new(Number::<f64>::new(sizes)),
        DataType::Int8 => Box::new(Number::<i8>::new(sizes)),
        DataType::Int16 => Box::new(Number::<i16>::new(sizes)),
        DataType::Int32 => Box::new(Number::<i32>::new(sizes)),
        DataType::Int64 => Box::new(Number::<i64>::new(sizes)),
        DataType::Isize => Box::new(Number::<isize>::new(sizes)),
        DataType::Uint8 => Box::new(Number::<u8>::new(sizes)),
        DataType::Uint16 => Box::new(Number::<u16>::new(sizes)),
        DataType::Uint32 => Box::new(Number::<u32>::new(sizes)),
        DataType::Uint64 => Box::new(Number::<u64>::new(sizes)),
        DataType::Usize => Box::new(Number::<usize>::new(sizes)),
        DataType::Bool => Box::new(Bool::new(sizes)),
        DataType::String => Box::new(Strings::new(sizes)),
    }
}

/// Copies one element between tensors using the coercion that loses the
/// least information for the destination kind.
pub(crate) fn copy_element(dst: &dyn Tensor, di: usize, src: &dyn Tensor, si: usize) {
    let (dt, st) = (dst.data_type(), src.data_type());
    if dt.is_string() || st.is_string() {
        dst.set_string_1d(di, &src.string_1d(si));
    } else if dt.is_float() || st.is_float() {
        dst.set_float_1d(di, src.float_1d(si));
    } else {
        dst.set_int_1d(di, src.int_1d(si));
    }
}

/// Reads `src[from..from + n]` into a vector of native values, for coercing
/// copies into a buffer of kind `T`.
pub(crate) fn gather_numbers<T: NumberType>(src: &dyn Values, from: usize, n: usize) -> Vec<T> {
    let st = src.data_type();
    if st.is_float() || st.is_string() || T::DATA_TYPE.is_float() {
        (from..from + n).map(|i| T::from_f64(src.float_1d(i))).collect()
    } else {
        (from..from + n).map(|i| T::from_i64(src.int_1d(i))).collect()
    }
}

/// The cell sizes of one row of `shape`, used for row tensors.
pub(crate) fn row_sizes(shape: &Shape) -> Vec<usize> {
    if shape.num_dims() <= 1 {
        vec![1]
    } else {
        shape.sizes()[1..].to_vec()
    }
}

/// Copies one row of `src` into a new tensor of the same kind.
pub(crate) fn row_tensor_of(src: &dyn Values, row: usize) -> Box<dyn Values> {
    let shape = src.shape();
    let (_, cells) = shape.row_cell_size();
    let out = new_of_type(src.data_type(), &row_sizes(&shape));
    out.copy_cells_from(src, 0, row * cells, cells);
    out
}

/// Overwrites one row of `dst` with the cells of `vals`.
pub(crate) fn set_row_tensor_of(
    dst: &dyn Values,
    row: usize,
    vals: &dyn Values,
) -> Result<(), TensorError> {
    let (_, cells) = dst.row_cell_size();
    if vals.len() != cells {
        return Err(TensorError::cell_size_mismatch(cells, vals.len()));
    }
    // snapshot before writing, since vals may share our buffer
    let vals = vals.clone_values();
    dst.copy_cells_from(&*vals, row * cells, 0, cells);
    Ok(())
}

/// Appends one row holding the cells of `vals` to `dst`.
pub(crate) fn append_row_of(dst: &dyn Values, vals: &dyn Values) -> Result<(), TensorError> {
    let (rows, cells) = dst.row_cell_size();
    if vals.len() != cells {
        return Err(TensorError::cell_size_mismatch(cells, vals.len()));
    }
    let vals = vals.clone_values();
    dst.set_num_rows(rows + 1);
    dst.copy_cells_from(&*vals, rows * cells, 0, cells);
    Ok(())
}

impl<V: Values + ?Sized> sealed::Sealed for Box<V> {}

impl<V: Values + ?Sized> Tensor for Box<V> {
    fn shape(&self) -> Shape {
        (**self).shape()
    }
    fn data_type(&self) -> DataType {
        (**self).data_type()
    }
    fn num_dims(&self) -> usize {
        (**self).num_dims()
    }
    fn dim_size(&self, dim: usize) -> usize {
        (**self).dim_size(dim)
    }
    fn len(&self) -> usize {
        (**self).len()
    }
    fn row_cell_size(&self) -> (usize, usize) {
        (**self).row_cell_size()
    }
    fn float(&self, coords: &[usize]) -> f64 {
        (**self).float(coords)
    }
    fn set_float(&self, coords: &[usize], val: f64) {
        (**self).set_float(coords, val)
    }
    fn float_1d(&self, i: usize) -> f64 {
        (**self).float_1d(i)
    }
    fn set_float_1d(&self, i: usize, val: f64) {
        (**self).set_float_1d(i, val)
    }
    fn int(&self, coords: &[usize]) -> i64 {
        (**self).int(coords)
    }
    fn set_int(&self, coords: &[usize], val: i64) {
        (**self).set_int(coords, val)
    }
    fn int_1d(&self, i: usize) -> i64 {
        (**self).int_1d(i)
    }
    fn set_int_1d(&self, i: usize, val: i64) {
        (**self).set_int_1d(i, val)
    }
    fn string_value(&self, coords: &[usize]) -> String {
        (**self).string_value(coords)
    }
    fn set_string(&self, coords: &[usize], val: &str) {
        (**self).set_string(coords, val)
    }
    fn string_1d(&self, i: usize) -> String {
        (**self).string_1d(i)
    }
    fn set_string_1d(&self, i: usize, val: &str) {
        (**self).set_string_1d(i, val)
    }
    fn as_values(&self) -> Box<dyn Values> {
        (**self).as_values()
    }
}

impl<V: Values + ?Sized> RowMajor for Box<V> {
    fn num_rows(&self) -> usize {
        (**self).num_rows()
    }
    fn float_row(&self, row: usize, cell: usize) -> f64 {
        (**self).float_row(row, cell)
    }
    fn set_float_row(&self, row: usize, cell: usize, val: f64) {
        (**self).set_float_row(row, cell, val)
    }
    fn int_row(&self, row: usize, cell: usize) -> i64 {
        (**self).int_row(row, cell)
    }
    fn set_int_row(&self, row: usize, cell: usize, val: i64) {
        (**self).set_int_row(row, cell, val)
    }
    fn string_row(&self, row: usize, cell: usize) -> String {
        (**self).string_row(row, cell)
    }
    fn set_string_row(&self, row: usize, cell: usize, val: &str) {
        (**self).set_string_row(row, cell, val)
    }
    fn row_tensor(&self, row: usize) -> Box<dyn Values> {
        (**self).row_tensor(row)
    }
    fn set_row_tensor(&self, row: usize, vals: &dyn Values) -> Result<(), TensorError> {
        (**self).set_row_tensor(row, vals)
    }
    fn append_row(&self, vals: &dyn Values) -> Result<(), TensorError> {
        (**self).append_row(vals)
    }
}

impl<V: Values + ?Sized> Values for Box<V> {
    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }
    fn clone_values(&self) -> Box<dyn Values> {
        (**self).clone_values()
    }
    fn set_shape_sizes(&self, sizes: &[usize]) {
        (**self).set_shape_sizes(sizes)
    }
    fn set_num_rows(&self, rows: usize) {
        (**self).set_num_rows(rows)
    }
    fn set_zeros(&self) {
        (**self).set_zeros()
    }
    fn copy_cells_from(&self, src: &dyn Values, to: usize, from: usize, n: usize) {
        (**self).copy_cells_from(src, to, from, n)
    }
    fn copy_from(&self, src: &dyn Values) {
        (**self).copy_from(src)
    }
    fn append_from(&self, src: &dyn Values) -> Result<(), TensorError> {
        (**self).append_from(src)
    }
}
