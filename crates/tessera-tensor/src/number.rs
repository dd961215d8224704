use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use num_traits::{NumCast, ToPrimitive, Zero};

use crate::{
    shape::Shape,
    storage::{read_lock, write_lock, TensorStorage},
    tensor::{
        append_row_of, gather_numbers, row_tensor_of, sealed, set_row_tensor_of, DataType,
        RowMajor, SubSpace, Tensor, TensorError, Values,
    },
};

/// Numeric element kinds that can back a [`Number`] tensor.
///
/// Conversions follow the coercion contract of the engine: floats are
/// truncated toward zero when stored into integer kinds, and values that do
/// not fit (including NaN) store zero.
pub trait NumberType:
    NumCast + Zero + Copy + PartialOrd + Default + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The storage kind reported by tensors of this element type.
    const DATA_TYPE: DataType;

    /// Converts from a float, truncating for integer kinds.
    fn from_f64(v: f64) -> Self {
        <Self as NumCast>::from(v).unwrap_or_else(Self::zero)
    }

    /// Converts from an integer.
    fn from_i64(v: i64) -> Self {
        <Self as NumCast>::from(v).unwrap_or_else(Self::zero)
    }

    /// Converts to a float.
    fn as_f64(self) -> f64 {
        ToPrimitive::to_f64(&self).unwrap_or(f64::NAN)
    }

    /// Converts to an integer; NaN and out-of-range values give zero.
    fn as_i64(self) -> i64 {
        ToPrimitive::to_i64(&self).unwrap_or(0)
    }

    /// Parses a string, storing zero when it is not a number.
    fn parse_str(s: &str) -> Self {
        let s = s.trim();
        if !Self::DATA_TYPE.is_float() {
            if let Ok(v) = s.parse::<i64>() {
                return Self::from_i64(v);
            }
        }
        s.parse::<f64>().map(Self::from_f64).unwrap_or_else(|_| Self::zero())
    }
}

macro_rules! impl_number_type {
    ($($t:ty => $dt:ident),* $(,)?) => {
        $(
            impl NumberType for $t {
                const DATA_TYPE: DataType = DataType::$dt;
            }
        )*
    };
}

impl_number_type!(
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    isize => Isize,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    usize => Usize,
);

/// Dense, contiguous, row-major storage of numbers of kind `T`.
///
/// `Number` is a handle: [`Clone`] is O(1) and the clone shares both the
/// buffer and the shape with the original, which is how views alias their
/// source. Use [`Number::deep_clone`] or [`Values::clone_values`] for an
/// independent copy.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{Float64, Tensor, RowMajor};
///
/// let t = Float64::from_shape_vec(&[2, 3], vec![1., 2., 3., 4., 5., 6.]).unwrap();
/// assert_eq!(t.float(&[1, 0]), 4.0);
/// assert_eq!(t.float_row(1, 2), 6.0);
///
/// let alias = t.clone();
/// alias.set_float_1d(0, 10.0);
/// assert_eq!(t.float_1d(0), 10.0);
/// ```
pub struct Number<T: NumberType> {
    shape: Arc<RwLock<Shape>>,
    storage: TensorStorage<T>,
}

/// Tensor of `f64`.
pub type Float64 = Number<f64>;
/// Tensor of `f32`.
pub type Float32 = Number<f32>;
/// Tensor of `i64`.
pub type Int = Number<i64>;
/// Tensor of `i32`.
pub type Int32 = Number<i32>;
/// Tensor of `u32`.
pub type Uint32 = Number<u32>;
/// Tensor of `u8`.
pub type Byte = Number<u8>;

impl<T: NumberType> Number<T> {
    /// Creates a zero-filled tensor with the given dimension sizes.
    pub fn new(sizes: &[usize]) -> Self {
        let shape = Shape::new(sizes);
        let data = vec![T::zero(); shape.len()];
        Self::from_parts(shape, TensorStorage::from_vec(data))
    }

    fn from_parts(shape: Shape, storage: TensorStorage<T>) -> Self {
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
    pub fn from_shape_vec(sizes: &[usize], data: Vec<T>) -> Result<Self, TensorError> {
        let shape = Shape::new(sizes);
        if shape.len() != data.len() {
            return Err(TensorError::invalid_shape(shape.len(), data.len()));
        }
        Ok(Self::from_parts(shape, TensorStorage::from_vec(data)))
    }

    /// Creates a 1-D tensor from a vector.
    pub fn from_vec(data: Vec<T>) -> Self {
        let shape = Shape::new(&[data.len()]);
        Self::from_parts(shape, TensorStorage::from_vec(data))
    }

    /// Creates a 1-D tensor holding a single value.
    pub fn from_scalar(value: T) -> Self {
        Self::from_vec(vec![value])
    }

    /// Returns a copy of the elements in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        self.storage.to_vec()
    }

    /// Returns an independent copy with its own buffer and shape.
    pub fn deep_clone(&self) -> Self {
        Self::from_parts(self.shape(), self.storage.deep_clone())
    }

    /// The shared buffer behind this tensor.
    pub fn storage(&self) -> &TensorStorage<T> {
        &self.storage
    }

    /// Runs `f` with the elements as a slice.
    pub fn with_slice<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        self.storage.read(f)
    }

    /// Runs `f` with the elements as a mutable slice.
    pub fn with_slice_mut<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> R {
        self.storage.write(f)
    }

    /// The native value at `coords`.
    pub fn value(&self, coords: &[usize]) -> T {
        let i = read_lock(&self.shape).index_to_1d(coords);
        self.storage.get(i)
    }

    /// Sets the native value at `coords`.
    pub fn set_value(&self, coords: &[usize], val: T) {
        let i = read_lock(&self.shape).index_to_1d(coords);
        self.storage.set(i, val)
    }

    /// The native value at flat index `i`.
    #[inline]
    pub fn value_1d(&self, i: usize) -> T {
        self.storage.get(i)
    }

    /// Sets the native value at flat index `i`.
    #[inline]
    pub fn set_value_1d(&self, i: usize, val: T) {
        self.storage.set(i, val)
    }

    /// Sets every element to `val`.
    pub fn fill(&self, val: T) {
        self.storage.write(|s| s.fill(val))
    }

    /// The flat index of `cell` in `row`. Panics if `cell` is not a cell of a row.
    fn row_offset(&self, row: usize, cell: usize) -> usize {
        let cells = read_lock(&self.shape).row_cell_size().1;
        assert!(cell < cells, "cell {cell} out of range for rows of {cells} cells");
        row * cells + cell
    }
}

impl<T: NumberType> Clone for Number<T> {
    /// Creates another handle onto the same buffer and shape.
    fn clone(&self) -> Self {
        Self {
            shape: Arc::clone(&self.shape),
            storage: self.storage.clone(),
        }
    }
}

impl<T: NumberType> sealed::Sealed for Number<T> {}

impl<T: NumberType> Tensor for Number<T> {
    fn shape(&self) -> Shape {
        read_lock(&self.shape).clone()
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
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
        self.value(coords).as_f64()
    }

    fn set_float(&self, coords: &[usize], val: f64) {
        self.set_value(coords, T::from_f64(val))
    }

    fn float_1d(&self, i: usize) -> f64 {
        self.storage.get(i).as_f64()
    }

    fn set_float_1d(&self, i: usize, val: f64) {
        self.storage.set(i, T::from_f64(val))
    }

    fn int(&self, coords: &[usize]) -> i64 {
        self.value(coords).as_i64()
    }

    fn set_int(&self, coords: &[usize], val: i64) {
        self.set_value(coords, T::from_i64(val))
    }

    fn int_1d(&self, i: usize) -> i64 {
        self.storage.get(i).as_i64()
    }

    fn set_int_1d(&self, i: usize, val: i64) {
        self.storage.set(i, T::from_i64(val))
    }

    fn string_value(&self, coords: &[usize]) -> String {
        self.value(coords).to_string()
    }

    fn set_string(&self, coords: &[usize], val: &str) {
        self.set_value(coords, T::parse_str(val))
    }

    fn string_1d(&self, i: usize) -> String {
        self.storage.get(i).to_string()
    }

    fn set_string_1d(&self, i: usize, val: &str) {
        self.storage.set(i, T::parse_str(val))
    }

    fn as_values(&self) -> Box<dyn Values> {
        self.clone_values()
    }
}

impl<T: NumberType> RowMajor for Number<T> {
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

impl<T: NumberType> Values for Number<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_values(&self) -> Box<dyn Values> {
        Box::new(self.deep_clone())
    }

    fn set_shape_sizes(&self, sizes: &[usize]) {
        let mut shape = write_lock(&self.shape);
        shape.set_sizes(sizes);
        self.storage.resize_with(shape.len(), T::zero);
    }

    fn set_zeros(&self) {
        self.fill(T::zero())
    }

    fn copy_cells_from(&self, src: &dyn Values, to: usize, from: usize, n: usize) {
        let cells = match src.as_any().downcast_ref::<Number<T>>() {
            Some(same) => same.storage.range_to_vec(from, n),
            None => gather_numbers::<T>(src, from, n),
        };
        self.storage
            .write(|dst| dst[to..to + n].copy_from_slice(&cells));
    }
}

impl<T: NumberType> SubSpace for Number<T> {
    fn sub_space(&self, offs: &[usize]) -> Self {
        let (start, sizes) = sub_space_layout(&read_lock(&self.shape), offs);
        let len = sizes.iter().product();
        match self.storage.view(start, len) {
            Ok(storage) => Self::from_parts(Shape::from(sizes), storage),
            Err(err) => panic!("sub_space: {err}"),
        }
    }
}

/// Computes the flat start offset and trailing sizes of a sub-space.
pub(crate) fn sub_space_layout(shape: &Shape, offs: &[usize]) -> (usize, Vec<usize>) {
    let nd = shape.num_dims();
    assert!(
        !offs.is_empty() && offs.len() < nd,
        "sub_space: {} offsets given for a tensor with {} dimensions",
        offs.len(),
        nd
    );
    let mut start = 0;
    for (dim, (&off, (&size, &stride))) in offs
        .iter()
        .zip(shape.sizes().iter().zip(shape.strides()))
        .enumerate()
    {
        assert!(
            off < size,
            "sub_space: offset {off} out of range for dimension {dim} of size {size}"
        );
        start += off * stride;
    }
    (start, shape.sizes()[offs.len()..].to_vec())
}

impl<T: NumberType> fmt::Debug for Number<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Number")
            .field("data_type", &T::DATA_TYPE)
            .field("shape", &self.shape())
            .field("storage", &self.storage)
            .finish()
    }
}

impl<T: NumberType> fmt::Display for Number<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::format::write_tensor(f, self)
    }
}
