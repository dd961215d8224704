use std::cmp::Ordering;

use tessera_tensor::{
    align_for_assign, align_tensors, wrap_index_1d, Float64, Tensor, Values,
};

use crate::{error::TensorOpsError, vectorize::Vectorizer};

/// Broadcasting binary arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `a + b`, or concatenation when both operands are strings.
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
}

impl BinaryOp {
    /// Every binary operation.
    pub const ALL: [BinaryOp; 4] = [Self::Add, Self::Sub, Self::Mul, Self::Div];

    /// The registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
        }
    }

    /// Applies the operation to two floats.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
        }
    }
}

/// Broadcasting comparisons producing bools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `a < b`
    Less,
    /// `a > b`
    Greater,
    /// `a == b`
    Equal,
}

impl CompareOp {
    /// Every comparison.
    pub const ALL: [CompareOp; 3] = [Self::Less, Self::Greater, Self::Equal];

    /// The registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Less => "less",
            Self::Greater => "greater",
            Self::Equal => "equal",
        }
    }

    fn holds(self, ord: Option<Ordering>) -> bool {
        matches!(
            (self, ord),
            (Self::Less, Some(Ordering::Less))
                | (Self::Greater, Some(Ordering::Greater))
                | (Self::Equal, Some(Ordering::Equal))
        )
    }
}

/// Elementwise math on one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `|a|`
    Abs,
    /// `sqrt(a)`
    Sqrt,
    /// `e^a`
    Exp,
    /// `ln(a)`
    Ln,
    /// `sin(a)`
    Sin,
    /// `cos(a)`
    Cos,
    /// `-a`
    Neg,
}

impl UnaryOp {
    /// Every unary operation.
    pub const ALL: [UnaryOp; 7] = [
        Self::Abs,
        Self::Sqrt,
        Self::Exp,
        Self::Ln,
        Self::Sin,
        Self::Cos,
        Self::Neg,
    ];

    /// The registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Neg => "neg",
        }
    }

    /// Applies the operation to a float.
    pub fn apply(self, a: f64) -> f64 {
        match self {
            Self::Abs => a.abs(),
            Self::Sqrt => a.sqrt(),
            Self::Exp => a.exp(),
            Self::Ln => a.ln(),
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Neg => -a,
        }
    }

    // rough cost estimates for the serial/parallel decision
    fn flops(self) -> usize {
        match self {
            Self::Abs | Self::Neg => 1,
            Self::Sqrt => 4,
            Self::Exp | Self::Ln | Self::Sin | Self::Cos => 20,
        }
    }
}

/// Reductions of a whole tensor to one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    /// Sum of the non-NaN values.
    Sum,
    /// Mean of the non-NaN values.
    Mean,
    /// Smallest non-NaN value.
    Min,
    /// Largest non-NaN value.
    Max,
    /// Number of non-NaN values.
    Count,
}

impl AggOp {
    /// Every aggregate.
    pub const ALL: [AggOp; 5] = [Self::Sum, Self::Mean, Self::Min, Self::Max, Self::Count];

    /// The registry name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

/// Writes `vals` into `out`, using a bulk copy when `out` stores `f64`.
fn write_floats(out: &dyn Values, vals: &[f64]) {
    match out.as_any().downcast_ref::<Float64>() {
        Some(dst) => dst.with_slice_mut(|s| s.copy_from_slice(vals)),
        None => vals
            .iter()
            .enumerate()
            .for_each(|(i, &v)| out.set_float_1d(i, v)),
    }
}

/// Applies a broadcasting binary operation and stores the result in `out`.
///
/// `out` is reshaped to the broadcast shape. It may alias either operand:
/// every result is computed before `out` is written.
///
/// # Arguments
///
/// * `vz` - The vectorizer running the per-element loop.
/// * `op` - The operation.
/// * `a` - The first operand.
/// * `b` - The second operand.
/// * `out` - The destination tensor.
///
/// # Errors
///
/// Returns [`TensorOpsError::TensorError`] if the shapes can not be broadcast.
///
/// # Example
///
/// ```
/// use tessera_tensor::{Float64, Tensor};
/// use tessera_tensor_ops::{ops::{binary, BinaryOp}, vectorize::Vectorizer};
///
/// let a = Float64::from_shape_vec(&[3, 1], vec![1., 2., 3.]).unwrap();
/// let b = Float64::from_shape_vec(&[1, 4], vec![10., 20., 30., 40.]).unwrap();
/// let out = Float64::new(&[0]);
/// binary(&Vectorizer::default(), BinaryOp::Add, &a, &b, &out).unwrap();
/// assert_eq!(out.shape().sizes(), &[3, 4]);
/// assert_eq!(out.float(&[2, 3]), 43.0);
/// ```
pub fn binary(
    vz: &Vectorizer,
    op: BinaryOp,
    a: &dyn Tensor,
    b: &dyn Tensor,
    out: &dyn Values,
) -> Result<(), TensorOpsError> {
    let al = align_tensors(a, b)?;
    let n = al.out.len();

    if op == BinaryOp::Add && a.is_string() && b.is_string() {
        let vals = vz.map(n, 2, |i| {
            let coords = al.out.index_from_1d(i);
            let mut s = a.string_1d(wrap_index_1d(&al.a, &coords));
            s.push_str(&b.string_1d(wrap_index_1d(&al.b, &coords)));
            s
        });
        out.set_shape_sizes(al.out.sizes());
        for (i, s) in vals.iter().enumerate() {
            out.set_string_1d(i, s);
        }
        return Ok(());
    }

    let vals = vz.map(n, 1, |i| {
        let coords = al.out.index_from_1d(i);
        op.apply(
            a.float_1d(wrap_index_1d(&al.a, &coords)),
            b.float_1d(wrap_index_1d(&al.b, &coords)),
        )
    });
    out.set_shape_sizes(al.out.sizes());
    write_floats(out, &vals);
    Ok(())
}

/// `out = a + b` with broadcasting. See [`binary`].
pub fn add(vz: &Vectorizer, a: &dyn Tensor, b: &dyn Tensor, out: &dyn Values) -> Result<(), TensorOpsError> {
    binary(vz, BinaryOp::Add, a, b, out)
}

/// `out = a - b` with broadcasting. See [`binary`].
pub fn sub(vz: &Vectorizer, a: &dyn Tensor, b: &dyn Tensor, out: &dyn Values) -> Result<(), TensorOpsError> {
    binary(vz, BinaryOp::Sub, a, b, out)
}

/// `out = a * b` with broadcasting. See [`binary`].
pub fn mul(vz: &Vectorizer, a: &dyn Tensor, b: &dyn Tensor, out: &dyn Values) -> Result<(), TensorOpsError> {
    binary(vz, BinaryOp::Mul, a, b, out)
}

/// `out = a / b` with broadcasting. See [`binary`].
pub fn div(vz: &Vectorizer, a: &dyn Tensor, b: &dyn Tensor, out: &dyn Values) -> Result<(), TensorOpsError> {
    binary(vz, BinaryOp::Div, a, b, out)
}

/// Compares `a` and `b` elementwise with broadcasting and stores the outcome
/// in `out` (usually a [`tessera_tensor::Bool`]).
///
/// Two string operands compare lexically; anything else compares as floats,
/// where a NaN operand makes every comparison false.
///
/// # Errors
///
/// Returns [`TensorOpsError::TensorError`] if the shapes can not be broadcast.
pub fn compare(
    vz: &Vectorizer,
    op: CompareOp,
    a: &dyn Tensor,
    b: &dyn Tensor,
    out: &dyn Values,
) -> Result<(), TensorOpsError> {
    let al = align_tensors(a, b)?;
    let strings = a.is_string() && b.is_string();
    let vals = vz.map(al.out.len(), 1, |i| {
        let coords = al.out.index_from_1d(i);
        let (ai, bi) = (wrap_index_1d(&al.a, &coords), wrap_index_1d(&al.b, &coords));
        let ord = if strings {
            Some(a.string_1d(ai).cmp(&b.string_1d(bi)))
        } else {
            a.float_1d(ai).partial_cmp(&b.float_1d(bi))
        };
        op.holds(ord)
    });
    out.set_shape_sizes(al.out.sizes());
    for (i, v) in vals.into_iter().enumerate() {
        out.set_float_1d(i, if v { 1.0 } else { 0.0 });
    }
    Ok(())
}

/// `out = a < b`. See [`compare`].
pub fn less(vz: &Vectorizer, a: &dyn Tensor, b: &dyn Tensor, out: &dyn Values) -> Result<(), TensorOpsError> {
    compare(vz, CompareOp::Less, a, b, out)
}

/// `out = a > b`. See [`compare`].
pub fn greater(vz: &Vectorizer, a: &dyn Tensor, b: &dyn Tensor, out: &dyn Values) -> Result<(), TensorOpsError> {
    compare(vz, CompareOp::Greater, a, b, out)
}

/// `out = a == b`. See [`compare`].
pub fn equal(vz: &Vectorizer, a: &dyn Tensor, b: &dyn Tensor, out: &dyn Values) -> Result<(), TensorOpsError> {
    compare(vz, CompareOp::Equal, a, b, out)
}

/// Applies `op` to every element of `a` and stores the result in `out`, which
/// is reshaped to the shape of `a`.
pub fn unary(vz: &Vectorizer, op: UnaryOp, a: &dyn Tensor, out: &dyn Values) {
    let vals = vz.map(a.len(), op.flops(), |i| op.apply(a.float_1d(i)));
    out.set_shape_sizes(a.shape().sizes());
    write_floats(out, &vals);
}

/// Assigns `src` into `dst`, broadcasting `src` over the shape of `dst`.
///
/// `dst` keeps its shape. Values are coerced to the kind of `dst`: strings
/// when either side stores strings, integers when both are integer kinds, and
/// floats otherwise.
///
/// # Errors
///
/// Returns [`TensorOpsError::TensorError`] if `src` can not broadcast into
/// `dst`.
pub fn assign(vz: &Vectorizer, dst: &dyn Values, src: &dyn Tensor) -> Result<(), TensorOpsError> {
    let (dsh, ssh) = align_for_assign(&dst.shape(), &src.shape())?;
    let n = dsh.len();
    let src_index = |i: usize| wrap_index_1d(&ssh, &dsh.index_from_1d(i));
    let (dt, st) = (dst.data_type(), src.data_type());

    if dt.is_string() || st.is_string() {
        let vals = vz.map(n, 2, |i| src.string_1d(src_index(i)));
        for (i, s) in vals.iter().enumerate() {
            dst.set_string_1d(i, s);
        }
    } else if dt.is_int() && st.is_int() {
        let vals = vz.map(n, 1, |i| src.int_1d(src_index(i)));
        for (i, v) in vals.into_iter().enumerate() {
            dst.set_int_1d(i, v);
        }
    } else {
        let vals = vz.map(n, 1, |i| src.float_1d(src_index(i)));
        write_floats(dst, &vals);
    }
    Ok(())
}

/// Reduces every element of `a` to one value, skipping NaN.
///
/// The loop is serial so that float sums are reproducible. Sum and count of
/// an empty input are 0; mean, min and max of an empty input are NaN.
///
/// # Example
///
/// ```
/// use tessera_tensor::Float64;
/// use tessera_tensor_ops::ops::{aggregate, AggOp};
///
/// let t = Float64::from_vec(vec![1.0, f64::NAN, 5.0]);
/// assert_eq!(aggregate(AggOp::Mean, &t), 3.0);
/// assert_eq!(aggregate(AggOp::Count, &t), 2.0);
/// ```
pub fn aggregate(op: AggOp, a: &dyn Tensor) -> f64 {
    let vals = (0..a.len()).map(|i| a.float_1d(i)).filter(|v| !v.is_nan());
    match op {
        AggOp::Sum => vals.sum(),
        AggOp::Count => vals.count() as f64,
        AggOp::Mean => {
            let (sum, count) = vals.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        }
        AggOp::Min => vals.reduce(f64::min).unwrap_or(f64::NAN),
        AggOp::Max => vals.reduce(f64::max).unwrap_or(f64::NAN),
    }
}

/// Stores [`aggregate`] of `a` in `out`, which is reshaped to `[1]`.
pub fn aggregate_into(op: AggOp, a: &dyn Tensor, out: &dyn Values) {
    out.set_shape_sizes(&[1]);
    out.set_float_1d(0, aggregate(op, a));
}
