use std::fmt;

use crate::tensor::Tensor;

// dimensions longer than this are elided to their first 3 and last element
const MAX_DIM_SHOWN: usize = 8;

fn visible(size: usize) -> Vec<Option<usize>> {
    if size > MAX_DIM_SHOWN {
        vec![Some(0), Some(1), Some(2), None, Some(size - 1)]
    } else {
        (0..size).map(Some).collect()
    }
}

fn cell_text(t: &dyn Tensor, i: usize) -> String {
    if t.data_type().is_float() {
        let v = t.float_1d(i);
        if v.is_nan() {
            "NaN".to_string()
        } else {
            format!("{v:.4}")
        }
    } else {
        t.string_1d(i)
    }
}

fn collect_cells(
    t: &dyn Tensor,
    sizes: &[usize],
    strides: &[usize],
    base: usize,
    out: &mut Vec<String>,
) {
    let Some((&size, rest)) = sizes.split_first() else {
        out.push(cell_text(t, base));
        return;
    };
    for j in visible(size).into_iter().flatten() {
        collect_cells(t, rest, &strides[1..], base + j * strides[0], out);
    }
}

struct Layout<'a> {
    t: &'a dyn Tensor,
    sizes: &'a [usize],
    strides: &'a [usize],
    width: usize,
}

impl Layout<'_> {
    fn render(&self, dim: usize, base: usize, out: &mut String) {
        let nd = self.sizes.len();
        let separator = if dim + 1 < nd {
            format!(",{}{}", "\n".repeat(nd - 1 - dim), " ".repeat(dim + 1))
        } else {
            ",".to_string()
        };
        out.push('[');
        for (k, item) in visible(self.sizes[dim]).into_iter().enumerate() {
            if k > 0 {
                out.push_str(&separator);
            }
            match item {
                None => out.push_str("..."),
                Some(j) if dim + 1 == nd => {
                    let text = cell_text(self.t, base + j * self.strides[dim]);
                    out.push_str(&format!("{text:>width$}", width = self.width));
                }
                Some(j) => self.render(dim + 1, base + j * self.strides[dim], out),
            }
        }
        out.push(']');
    }
}

/// Writes the elements of `t` as nested, bracketed rows.
///
/// Elements are right-aligned to the widest visible element. Floats print
/// with 4 decimals. Dimensions longer than 8 show their first 3 elements,
/// `...`, and the last one.
pub(crate) fn write_tensor(f: &mut fmt::Formatter<'_>, t: &dyn Tensor) -> fmt::Result {
    let shape = t.shape();
    if shape.num_dims() == 0 {
        return f.write_str("[]");
    }
    let mut cells = Vec::new();
    collect_cells(t, shape.sizes(), shape.strides(), 0, &mut cells);
    let width = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);

    let layout = Layout {
        t,
        sizes: shape.sizes(),
        strides: shape.strides(),
        width,
    };
    let mut out = String::new();
    layout.render(0, 0, &mut out);
    f.write_str(&out)
}

#[cfg(test)]
mod tests {
    use crate::{Bool, Float64, Int, Strings, TensorError};

    #[test]
    fn display_2d() -> Result<(), TensorError> {
        let t = Int::from_shape_vec(&[2, 2], vec![5, 6, 7, 8])?;
        let disp = t.to_string();
        let lines = disp.lines().collect::<Vec<_>>();

        #[rustfmt::skip]
        assert_eq!(lines.as_slice(),
        ["[[5,6],",
         " [7,8]]"]);
        Ok(())
    }

    #[test]
    fn display_3d() -> Result<(), TensorError> {
        let t = Int::from_shape_vec(&[2, 2, 2], (1..=8).map(|v| v * 3).collect())?;
        let disp = t.to_string();
        let lines = disp.lines().collect::<Vec<_>>();

        #[rustfmt::skip]
        assert_eq!(lines.as_slice(),
        ["[[[ 3, 6],",
         "  [ 9,12]],",
         "",
         " [[15,18],",
         "  [21,24]]]"]);
        Ok(())
    }

    #[test]
    fn display_float_and_missing() {
        let t = Float64::from_vec(vec![1.5, f64::NAN, -0.25]);
        assert_eq!(t.to_string(), "[ 1.5000,    NaN,-0.2500]");
    }

    #[test]
    fn display_long_dim() {
        let t = Int::from_vec((0..20).collect());
        assert_eq!(t.to_string(), "[ 0, 1, 2,...,19]");
    }

    #[test]
    fn display_strings_and_bools() {
        let s = Strings::from_vec(vec!["a".into(), "bcd".into()]);
        assert_eq!(s.to_string(), "[  a,bcd]");
        let b = Bool::from_vec(vec![true, false]);
        assert_eq!(b.to_string(), "[ true,false]");
        assert_eq!(Float64::new(&[]).to_string(), "[]");
    }
}
