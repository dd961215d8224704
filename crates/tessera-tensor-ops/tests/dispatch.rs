use approx::assert_relative_eq;
use tessera_tensor::{
    Bool, Float64, Int, Masked, Rows, Sliced, Strings, SubSpace, Tensor, TensorError, Values,
};
use tessera_tensor_ops::{
    ops, ExecutionStrategy, Func, FuncRegistry, TensorOpsError, VectorizeConfig, Vectorizer,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn floats(t: &dyn Tensor) -> Vec<f64> {
    (0..t.len()).map(|i| t.float_1d(i)).collect()
}

#[test]
fn call_by_name_over_views() -> Result<(), TensorOpsError> {
    init_logger();
    let reg = FuncRegistry::with_defaults();
    let t = Float64::from_shape_vec(&[3, 2], vec![1., 2., 3., 4., 5., 6.])?;
    let rows = Rows::new(t.clone(), Some(vec![2, 0, 1]));
    let col = Sliced::with_indexes(t, vec![None, Some(vec![1])])?;

    // reordered rows minus the unordered second column
    let out = reg.call_out("sub", &[&rows, &col])?;
    assert_eq!(out[0].shape().sizes(), &[3, 2]);
    assert_eq!(floats(&out[0]), vec![3., 4., -3., -2., -3., -2.]);
    Ok(())
}

#[test]
fn broadcast_error_surfaces_through_registry() {
    let reg = FuncRegistry::with_defaults();
    let a = Float64::new(&[3, 2]);
    let b = Float64::new(&[1, 4]);
    let out = Float64::new(&[0]);
    assert_eq!(
        reg.call("mul", &[&a, &b], &[&out]),
        Err(TensorOpsError::TensorError(TensorError::shape_mismatch(
            1, 2, 4
        )))
    );
}

#[test]
fn rows_view_as_operand() -> Result<(), TensorOpsError> {
    let reg = FuncRegistry::with_defaults();
    let t = Float64::from_shape_vec(&[2, 3], vec![1., 2., 3., 4., 5., 6.])?;
    let rows = Rows::new(t, Some(vec![1, 0]));
    let out = reg.call_out("mul", &[&rows, &Float64::from_scalar(10.0)])?;
    assert_eq!(out[0].shape().sizes(), &[2, 3]);
    assert_eq!(floats(&out[0]), vec![40., 50., 60., 10., 20., 30.]);
    Ok(())
}

#[test]
fn masked_cells_are_skipped_by_aggregates() -> Result<(), TensorOpsError> {
    let reg = FuncRegistry::with_defaults();
    let t = Float64::from_vec(vec![1., 2., 3., 4.]);
    let m = Masked::with_mask(t, Bool::from_vec(vec![true, false, true, false]))?;
    let mean = reg.call_out("mean", &[&m])?;
    assert_relative_eq!(mean[0].float_1d(0), 2.0);
    let count = reg.call_out("count", &[&m])?;
    assert_eq!(count[0].int_1d(0), 2);
    Ok(())
}

#[test]
fn comparisons_fill_bool_outputs() -> Result<(), TensorOpsError> {
    let reg = FuncRegistry::with_defaults();
    let names = Strings::from_vec(vec!["ann".into(), "bob".into(), "cy".into()]);
    let out = Bool::new(&[0]);
    reg.call("less", &[&names, &Strings::from_vec(vec!["bz".into()])], &[&out])?;
    assert_eq!(out.to_vec(), vec![true, true, false]);
    Ok(())
}

#[test]
fn custom_function_with_private_pool() -> Result<(), TensorOpsError> {
    let vz = Vectorizer::new(ExecutionStrategy::Fixed(2), VectorizeConfig::default())?;
    let mut reg = FuncRegistry::new(vz);
    reg.add_func(Func::new("square_plus", 2, 1, |vz, ins, outs| {
        let (a, b) = (ins[0], ins[1]);
        let vals = vz.map(a.len(), 2, |i| {
            let v = a.float_1d(i);
            v * v + b.float_1d(0)
        });
        outs[0].set_shape_sizes(a.shape().sizes());
        for (i, v) in vals.into_iter().enumerate() {
            outs[0].set_float_1d(i, v);
        }
        Ok(())
    }));
    assert_eq!(reg.names(), vec!["square_plus"]);

    let a = Int::from_vec((0..1000).collect());
    let out = Int::new(&[0]);
    reg.call("square_plus", &[&a, &Int::from_scalar(1)], &[&out])?;
    assert_eq!(out.len(), 1000);
    assert_eq!(out.int_1d(999), 998_002);
    Ok(())
}

#[test]
fn in_place_update_through_shared_handle() -> Result<(), TensorOpsError> {
    let vz = Vectorizer::default();
    let t = Float64::from_vec((0..500).map(f64::from).collect());
    let alias = t.clone();
    ops::add(&vz, &t, &Float64::from_scalar(1.0), &alias)?;
    assert_relative_eq!(t.float_1d(499), 500.0);
    ops::unary(&vz, ops::UnaryOp::Neg, &alias, &t);
    assert_relative_eq!(alias.float_1d(0), -1.0);
    Ok(())
}

#[test]
fn ops_write_into_sub_space_row() -> Result<(), TensorOpsError> {
    let vz = Vectorizer::default();
    let t = Float64::from_shape_vec(&[2, 3], vec![1., 2., 3., 4., 5., 6.])?;
    let row = t.sub_space(&[1]);
    ops::mul(&vz, &row, &Float64::from_scalar(2.0), &row)?;
    assert_eq!(t.to_vec(), vec![1., 2., 3., 8., 10., 12.]);

    ops::unary(&vz, ops::UnaryOp::Neg, &t.sub_space(&[0]), &row);
    ops::less(&vz, &row, &Float64::from_scalar(-1.5), &t.sub_space(&[0]))?;
    assert_eq!(t.to_vec(), vec![0., 1., 1., -1., -2., -3.]);
    Ok(())
}

#[test]
fn call_out_concatenates_strings() -> Result<(), TensorOpsError> {
    let reg = FuncRegistry::with_defaults();
    let a = Strings::from_vec(vec!["a".into(), "b".into()]);
    let b = Strings::from_vec(vec!["!".into()]);
    let out = reg.call_out("add", &[&a, &b])?;
    assert!(out[0].is_string());
    assert_eq!(out[0].string_1d(0), "a!");
    assert_eq!(out[0].string_1d(1), "b!");
    Ok(())
}
