use std::cmp::Ordering;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    shape::Shape,
    tensor::{new_of_type, sealed, DataType, SubSpace, Tensor, TensorError, Values},
};

/// Switches for [`Rows::filter_string`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Drop matching rows instead of keeping them.
    pub exclude: bool,
    /// Match on substring containment instead of equality.
    pub contains: bool,
    /// Compare case-insensitively.
    pub ignore_case: bool,
}

/// A row-reordering view over a [`Values`] tensor.
///
/// View row `i` reads source row `indexes[i]`. With no index list the view is
/// the identity and reads the source directly. Rows may be repeated, dropped
/// and reordered freely without touching the source buffer, and writes go
/// through to the source.
///
/// # Examples
///
/// ```rust
/// use tessera_tensor::{Float64, Rows, Tensor};
///
/// let t = Float64::from_shape_vec(&[2, 3], vec![1., 2., 3., 4., 5., 6.]).unwrap();
/// let rows = Rows::new(t, Some(vec![1, 0]));
/// assert_eq!(rows.float_row(0, 1), 5.0);
/// assert_eq!(rows.float(&[1, 2]), 3.0);
/// ```
#[derive(Clone)]
pub struct Rows<V: Values> {
    tensor: V,
    indexes: Option<Vec<usize>>,
}

impl<V: Values> Rows<V> {
    /// Creates a view over `tensor`. `None` is the identity order.
    pub fn new(tensor: V, indexes: Option<Vec<usize>>) -> Self {
        Self { tensor, indexes }
    }

    /// The source tensor.
    pub fn source(&self) -> &V {
        &self.tensor
    }

    /// The explicit index list, if any.
    pub fn indexes(&self) -> Option<&[usize]> {
        self.indexes.as_deref()
    }

    /// Consumes the view and returns the source tensor.
    pub fn into_source(self) -> V {
        self.tensor
    }

    /// The source row behind view row `i`.
    pub fn row_index(&self, i: usize) -> usize {
        match &self.indexes {
            Some(idx) => idx[i],
            None => i,
        }
    }

    /// The number of rows in the view.
    pub fn num_rows(&self) -> usize {
        match &self.indexes {
            Some(idx) => idx.len(),
            None => self.tensor.row_cell_size().0,
        }
    }

    /// Resets the view to the identity order over all source rows.
    pub fn sequential(&mut self) {
        self.indexes = None;
    }

    /// Materializes the identity index list if there is none yet, so that the
    /// list can be edited in place.
    pub fn indexes_needed(&mut self) -> &mut Vec<usize> {
        let rows = self.tensor.row_cell_size().0;
        self.indexes.get_or_insert_with(|| (0..rows).collect())
    }

    /// Drops the rows whose first cell reads as NaN.
    pub fn exclude_missing(&mut self) {
        self.filter(|t, row| !t.float_row(row, 0).is_nan());
    }

    /// Shuffles the row order with the thread-local generator.
    pub fn permuted(&mut self) {
        self.permuted_with(&mut rand::rng());
    }

    /// Shuffles the row order with the given generator.
    pub fn permuted_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.indexes_needed().shuffle(rng);
    }

    /// Sorts the rows by their first cell.
    ///
    /// Numeric and bool sources compare as floats, with NaN after every other
    /// value. String sources compare lexically.
    pub fn sort(&mut self, ascending: bool) {
        self.sort_func(|t, a, b| compare_first_cells(t, a, b, ascending));
    }

    /// Sorts the rows with `cmp`, which receives the source and two source row
    /// indexes. The relative order of equal rows is unspecified.
    pub fn sort_func(&mut self, mut cmp: impl FnMut(&V, usize, usize) -> Ordering) {
        self.indexes_needed();
        let tensor = &self.tensor;
        if let Some(idx) = &mut self.indexes {
            idx.sort_unstable_by(|&a, &b| cmp(tensor, a, b));
        }
    }

    /// Stable version of [`Rows::sort`].
    pub fn sort_stable(&mut self, ascending: bool) {
        self.sort_stable_func(|t, a, b| compare_first_cells(t, a, b, ascending));
    }

    /// Stable version of [`Rows::sort_func`].
    pub fn sort_stable_func(&mut self, mut cmp: impl FnMut(&V, usize, usize) -> Ordering) {
        self.indexes_needed();
        let tensor = &self.tensor;
        if let Some(idx) = &mut self.indexes {
            idx.sort_by(|&a, &b| cmp(tensor, a, b));
        }
    }

    /// Sorts the index list itself, restoring source order for the rows that
    /// remain in the view.
    pub fn sort_indexes(&mut self) {
        if let Some(idx) = &mut self.indexes {
            idx.sort_unstable();
        }
    }

    /// Keeps only the rows for which `f` returns true. `f` receives the source
    /// and a source row index.
    pub fn filter(&mut self, mut f: impl FnMut(&V, usize) -> bool) {
        self.indexes_needed();
        let tensor = &self.tensor;
        if let Some(idx) = &mut self.indexes {
            idx.retain(|&row| f(tensor, row));
        }
    }

    /// Filters the rows by comparing the string value of their first cell
    /// against `s`.
    pub fn filter_string(&mut self, s: &str, opts: FilterOptions) {
        let lower = s.to_lowercase();
        self.filter(|t, row| {
            let val = t.string_row(row, 0);
            let matched = match (opts.contains, opts.ignore_case) {
                (false, false) => val == s,
                (false, true) => val.to_lowercase() == lower,
                (true, false) => val.contains(s),
                (true, true) => val.to_lowercase().contains(&lower),
            };
            matched != opts.exclude
        });
    }

    /// Removes indexes that are out of range for the source, keeping the order
    /// of the others. Call after the source shrinks.
    pub fn valid_indexes(&mut self) {
        let rows = self.tensor.row_cell_size().0;
        if let Some(idx) = &mut self.indexes {
            let before = idx.len();
            idx.retain(|&row| row < rows);
            let lost = before - idx.len();
            if lost > 0 {
                log::warn!("dropped {lost} row indexes beyond the {rows} source rows");
            }
        }
    }

    /// Adds `n` new zero rows to the source and to the end of the view.
    pub fn add_rows(&mut self, n: usize) {
        let rows = self.tensor.row_cell_size().0;
        self.tensor.set_num_rows(rows + n);
        if let Some(idx) = &mut self.indexes {
            idx.extend(rows..rows + n);
        }
    }

    /// Adds `n` new zero rows to the source and places them at view row `at`.
    ///
    /// # Panics
    ///
    /// Panics if `at > self.num_rows()`.
    pub fn insert_rows(&mut self, at: usize, n: usize) {
        let rows = self.tensor.row_cell_size().0;
        self.indexes_needed();
        self.tensor.set_num_rows(rows + n);
        if let Some(idx) = &mut self.indexes {
            idx.splice(at..at, rows..rows + n);
        }
    }

    /// Removes view rows `at..at + n`. The source keeps its rows.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn delete_rows(&mut self, at: usize, n: usize) {
        self.indexes_needed().drain(at..at + n);
    }

    /// Swaps view rows `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.indexes_needed().swap(i, j);
    }

    /// Reads cell `cell` of view row `row` as a float.
    pub fn float_row(&self, row: usize, cell: usize) -> f64 {
        self.tensor.float_row(self.row_index(row), cell)
    }

    /// Writes cell `cell` of view row `row` as a float.
    pub fn set_float_row(&self, row: usize, cell: usize, val: f64) {
        self.tensor.set_float_row(self.row_index(row), cell, val)
    }

    /// Reads cell `cell` of view row `row` as an integer.
    pub fn int_row(&self, row: usize, cell: usize) -> i64 {
        self.tensor.int_row(self.row_index(row), cell)
    }

    /// Writes cell `cell` of view row `row` as an integer.
    pub fn set_int_row(&self, row: usize, cell: usize, val: i64) {
        self.tensor.set_int_row(self.row_index(row), cell, val)
    }

    /// Reads cell `cell` of view row `row` as a string.
    pub fn string_row(&self, row: usize, cell: usize) -> String {
        self.tensor.string_row(self.row_index(row), cell)
    }

    /// Writes cell `cell` of view row `row` as a string.
    pub fn set_string_row(&self, row: usize, cell: usize, val: &str) {
        self.tensor.set_string_row(self.row_index(row), cell, val)
    }

    /// Copies the cells of view row `row` into a new tensor.
    pub fn row_tensor(&self, row: usize) -> Box<dyn Values> {
        self.tensor.row_tensor(self.row_index(row))
    }

    /// Overwrites the cells of view row `row` in the source.
    ///
    /// # Errors
    ///
    /// Returns [`TensorError::CellSizeMismatch`] if `vals` does not hold one
    /// row of cells.
    pub fn set_row_tensor(&self, row: usize, vals: &dyn Values) -> Result<(), TensorError> {
        self.tensor.set_row_tensor(self.row_index(row), vals)
    }

    fn source_1d(&self, i: usize) -> usize {
        match &self.indexes {
            None => i,
            Some(idx) => {
                let cells = self.tensor.row_cell_size().1;
                idx[i / cells] * cells + i % cells
            }
        }
    }

    fn source_coords(&self, coords: &[usize]) -> Vec<usize> {
        let mut src = coords.to_vec();
        if let Some(first) = src.first_mut() {
            *first = self.row_index(*first);
        }
        src
    }
}

impl<V: SubSpace> Rows<V> {
    /// Returns view row `row` as a zero-copy sub-space of the source row it
    /// maps to. Writes through it reach the source.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of range or the source has fewer than two
    /// dimensions.
    pub fn sub_space(&self, row: usize) -> V {
        self.tensor.sub_space(&[self.row_index(row)])
    }
}

fn compare_first_cells(t: &dyn Values, a: usize, b: usize, ascending: bool) -> Ordering {
    let ord = if t.data_type() == DataType::String {
        t.string_row(a, 0).cmp(&t.string_row(b, 0))
    } else {
        let (x, y) = (t.float_row(a, 0), t.float_row(b, 0));
        match (x.is_nan(), y.is_nan()) {
            (true, true) => Ordering::Equal,
            // missing values go last in both directions
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => x.total_cmp(&y),
        }
    };
    if ascending {
        ord
    } else {
        ord.reverse()
    }
}

impl<V: Values> sealed::Sealed for Rows<V> {}

impl<V: Values> Tensor for Rows<V> {
    fn shape(&self) -> Shape {
        let mut sizes = self.tensor.shape().sizes().to_vec();
        if let Some(first) = sizes.first_mut() {
            *first = self.num_rows();
        }
        Shape::from(sizes)
    }

    fn data_type(&self) -> DataType {
        self.tensor.data_type()
    }

    fn num_dims(&self) -> usize {
        self.tensor.num_dims()
    }

    fn row_cell_size(&self) -> (usize, usize) {
        (self.num_rows(), self.tensor.row_cell_size().1)
    }

    fn float(&self, coords: &[usize]) -> f64 {
        self.tensor.float(&self.source_coords(coords))
    }

    fn set_float(&self, coords: &[usize], val: f64) {
        self.tensor.set_float(&self.source_coords(coords), val)
    }

    fn float_1d(&self, i: usize) -> f64 {
        self.tensor.float_1d(self.source_1d(i))
    }

    fn set_float_1d(&self, i: usize, val: f64) {
        self.tensor.set_float_1d(self.source_1d(i), val)
    }

    fn int(&self, coords: &[usize]) -> i64 {
        self.tensor.int(&self.source_coords(coords))
    }

    fn set_int(&self, coords: &[usize], val: i64) {
        self.tensor.set_int(&self.source_coords(coords), val)
    }

    fn int_1d(&self, i: usize) -> i64 {
        self.tensor.int_1d(self.source_1d(i))
    }

    fn set_int_1d(&self, i: usize, val: i64) {
        self.tensor.set_int_1d(self.source_1d(i), val)
    }

    fn string_value(&self, coords: &[usize]) -> String {
        self.tensor.string_value(&self.source_coords(coords))
    }

    fn set_string(&self, coords: &[usize], val: &str) {
        self.tensor.set_string(&self.source_coords(coords), val)
    }

    fn string_1d(&self, i: usize) -> String {
        self.tensor.string_1d(self.source_1d(i))
    }

    fn set_string_1d(&self, i: usize, val: &str) {
        self.tensor.set_string_1d(self.source_1d(i), val)
    }

    fn as_values(&self) -> Box<dyn Values> {
        if self.indexes.is_none() {
            return self.tensor.clone_values();
        }
        let shape = self.shape();
        let cells = shape.row_cell_size().1;
        let out = new_of_type(self.data_type(), shape.sizes());
        for row in 0..self.num_rows() {
            out.copy_cells_from(&self.tensor, row * cells, self.row_index(row) * cells, cells);
        }
        out
    }
}

impl<V: Values> fmt::Debug for Rows<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("tensor", &self.tensor)
            .field("indexes", &self.indexes)
            .finish()
    }
}

impl<V: Values> fmt::Display for Rows<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::format::write_tensor(f, self)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{Float64, Int, RowMajor, Strings};

    fn grid() -> Result<Float64, TensorError> {
        Float64::from_shape_vec(&[2, 3], vec![1., 2., 3., 4., 5., 6.])
    }

    fn names(v: &[&str]) -> Strings {
        Strings::from_vec(v.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_rows_reorder() -> Result<(), TensorError> {
        let rows = Rows::new(grid()?, Some(vec![1, 0]));
        assert_eq!(rows.float_row(0, 1), 5.0);
        assert_eq!(rows.float(&[1, 0]), 1.0);
        assert_eq!(rows.float_1d(2), 6.0);
        assert_eq!(rows.shape().sizes(), &[2, 3]);
        Ok(())
    }

    #[test]
    fn test_rows_identity_matches_source() -> Result<(), TensorError> {
        let t = grid()?;
        let rows = Rows::new(t.clone(), None);
        for i in 0..t.len() {
            assert_eq!(rows.float_1d(i), t.float_1d(i));
        }
        assert_eq!(rows.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn test_rows_identity_writes_match_source() -> Result<(), TensorError> {
        let direct = grid()?;
        let mut rows = Rows::new(grid()?, None);

        rows.set_float_row(1, 2, 60.5);
        direct.set_float_row(1, 2, 60.5);
        rows.set_string_1d(1, "-7");
        direct.set_string_1d(1, "-7");
        rows.set_int(&[0, 0], 9);
        direct.set_int(&[0, 0], 9);
        rows.add_rows(2);
        direct.set_num_rows(4);
        rows.set_float_row(3, 1, 11.0);
        direct.set_float_row(3, 1, 11.0);

        assert_eq!(rows.indexes(), None);
        assert_eq!(rows.shape(), direct.shape());
        for i in 0..direct.len() {
            assert_eq!(rows.float_1d(i), direct.float_1d(i));
            assert_eq!(rows.string_1d(i), direct.string_1d(i));
        }
        assert_eq!(rows.source().to_vec(), direct.to_vec());
        Ok(())
    }

    #[test]
    fn test_rows_sub_space_aliases_mapped_row() -> Result<(), TensorError> {
        let t = grid()?;
        let rows = Rows::new(t.clone(), Some(vec![1, 0]));
        let first = rows.sub_space(0);
        assert_eq!(first.to_vec(), vec![4., 5., 6.]);

        first.set_float_1d(1, 50.0);
        assert_eq!(t.to_vec(), vec![1., 2., 3., 4., 50., 6.]);
        assert_eq!(rows.float_row(0, 1), 50.0);
        Ok(())
    }

    #[test]
    fn test_rows_zero_dim_source_shape() {
        let t = Float64::new(&[]);
        let mut rows = Rows::new(t.clone(), None);
        assert_eq!(rows.shape(), t.shape());
        rows.indexes_needed();
        assert_eq!(rows.shape(), t.shape());
        assert_eq!(rows.len(), 0);
    }

    #[test]
    fn test_rows_write_through() -> Result<(), TensorError> {
        let t = grid()?;
        let rows = Rows::new(t.clone(), Some(vec![1]));
        rows.set_float_row(0, 0, 40.0);
        rows.set_int(&[0, 2], 60);
        assert_eq!(t.to_vec(), vec![1., 2., 3., 40., 5., 60.]);
        Ok(())
    }

    #[test]
    fn test_rows_sort() {
        let t = Float64::from_vec(vec![3.0, f64::NAN, 1.0, 2.0]);
        let mut rows = Rows::new(t, None);
        rows.sort(true);
        assert_eq!(rows.indexes(), Some(&[2, 3, 0, 1][..]));
        rows.sort(false);
        assert_eq!(rows.indexes(), Some(&[0, 3, 2, 1][..]));
        rows.sort_indexes();
        assert_eq!(rows.indexes(), Some(&[0, 1, 2, 3][..]));
    }

    #[test]
    fn test_rows_sort_stable_strings() {
        let mut rows = Rows::new(names(&["b", "a", "b", "a"]), None);
        rows.sort_stable(true);
        assert_eq!(rows.indexes(), Some(&[1, 3, 0, 2][..]));

        rows.sort_stable_func(|t, a, b| t.string_row(b, 0).cmp(&t.string_row(a, 0)));
        assert_eq!(rows.indexes(), Some(&[0, 2, 1, 3][..]));
    }

    #[test]
    fn test_rows_filter_string() {
        let src = names(&["Apple", "apple pie", "banana"]);
        let opts = |exclude, contains, ignore_case| FilterOptions {
            exclude,
            contains,
            ignore_case,
        };
        let cases = [
            ("apple pie", opts(false, false, false), vec![1]),
            ("APPLE", opts(false, false, true), vec![0]),
            ("apple", opts(false, true, false), vec![1]),
            ("APPLE", opts(false, true, true), vec![0, 1]),
            ("banana", opts(true, false, false), vec![0, 1]),
            ("apple", opts(true, true, true), vec![2]),
        ];
        for (needle, opts, expected) in cases {
            let mut rows = Rows::new(src.clone(), None);
            rows.filter_string(needle, opts);
            assert_eq!(rows.indexes(), Some(&expected[..]), "{needle} {opts:?}");
        }
    }

    #[test]
    fn test_rows_exclude_missing() {
        let mut rows = Rows::new(Float64::from_vec(vec![1.0, f64::NAN, 3.0]), None);
        rows.exclude_missing();
        assert_eq!(rows.indexes(), Some(&[0, 2][..]));
    }

    #[test]
    fn test_rows_valid_indexes() {
        let t = Int::from_vec(vec![1, 2, 3, 4]);
        let mut rows = Rows::new(t.clone(), Some(vec![3, 0, 2, 1]));
        t.set_num_rows(2);
        rows.valid_indexes();
        assert_eq!(rows.indexes(), Some(&[0, 1][..]));
    }

    #[test]
    fn test_rows_add_insert_delete() -> Result<(), TensorError> {
        let t = Int::from_shape_vec(&[2, 2], vec![1, 2, 3, 4])?;
        let mut rows = Rows::new(t.clone(), Some(vec![1]));
        rows.add_rows(1);
        assert_eq!(rows.indexes(), Some(&[1, 2][..]));
        assert_eq!(t.shape().sizes(), &[3, 2]);

        rows.insert_rows(0, 2);
        assert_eq!(rows.indexes(), Some(&[3, 4, 1, 2][..]));
        assert_eq!(t.num_rows(), 5);
        assert_eq!(rows.int_row(2, 1), 4);

        rows.delete_rows(0, 3);
        assert_eq!(rows.indexes(), Some(&[2][..]));
        assert_eq!(t.num_rows(), 5);

        let mut seq = Rows::new(t.clone(), None);
        seq.add_rows(1);
        assert_eq!(seq.indexes(), None);
        assert_eq!(seq.num_rows(), 6);
        Ok(())
    }

    #[test]
    fn test_rows_swap_and_permute() {
        let mut rows = Rows::new(Int::from_vec((0..10).collect()), None);
        rows.swap(0, 9);
        assert_eq!(rows.int_row(0, 0), 9);

        let mut rng = StdRng::seed_from_u64(7);
        rows.permuted_with(&mut rng);
        let mut seen: Vec<usize> = rows.indexes().map(<[usize]>::to_vec).unwrap_or_default();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_rows_row_tensors() -> Result<(), TensorError> {
        let t = grid()?;
        let rows = Rows::new(t.clone(), Some(vec![1, 1, 0]));
        let row = rows.row_tensor(0);
        assert_eq!(row.shape().sizes(), &[3]);
        assert_eq!(row.float_1d(2), 6.0);

        rows.set_row_tensor(2, &Float64::from_vec(vec![7., 8., 9.]))?;
        assert_eq!(t.to_vec(), vec![7., 8., 9., 4., 5., 6.]);

        let res = rows.set_row_tensor(0, &Float64::from_vec(vec![1.]));
        assert_eq!(res, Err(TensorError::cell_size_mismatch(3, 1)));
        Ok(())
    }

    #[test]
    fn test_rows_as_values() -> Result<(), TensorError> {
        let rows = Rows::new(grid()?, Some(vec![1, 1, 0]));
        let vals = rows.as_values();
        assert_eq!(vals.shape().sizes(), &[3, 3]);
        let flat: Vec<f64> = (0..vals.len()).map(|i| vals.float_1d(i)).collect();
        assert_eq!(flat, vec![4., 5., 6., 4., 5., 6., 1., 2., 3.]);
        Ok(())
    }
}
