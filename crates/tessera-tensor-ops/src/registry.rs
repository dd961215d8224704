use std::{collections::HashMap, fmt, sync::Arc};

use tessera_tensor::{new_of_type, DataType, Tensor, Values};

use crate::{
    error::TensorOpsError,
    ops::{self, AggOp, BinaryOp, CompareOp, UnaryOp},
    vectorize::Vectorizer,
};

/// The signature shared by every registered function.
///
/// Inputs are read only. Outputs are reshaped and written by the function.
pub type FuncFn = dyn Fn(&Vectorizer, &[&dyn Tensor], &[&dyn Values]) -> Result<(), TensorOpsError>
    + Send
    + Sync;

/// A named tensor function with a fixed number of inputs and outputs.
#[derive(Clone)]
pub struct Func {
    name: String,
    num_in: usize,
    num_out: usize,
    out_type: Option<DataType>,
    fun: Arc<FuncFn>,
}

impl Func {
    /// Wraps `fun` as a function taking `num_in` inputs and `num_out` outputs.
    pub fn new<F>(name: impl Into<String>, num_in: usize, num_out: usize, fun: F) -> Self
    where
        F: Fn(&Vectorizer, &[&dyn Tensor], &[&dyn Values]) -> Result<(), TensorOpsError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            num_in,
            num_out,
            out_type: None,
            fun: Arc::new(fun),
        }
    }

    /// Fixes the kind of the outputs allocated by [`FuncRegistry::call_out`].
    pub fn with_out_type(mut self, data_type: DataType) -> Self {
        self.out_type = Some(data_type);
        self
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of inputs.
    pub fn num_in(&self) -> usize {
        self.num_in
    }

    /// The number of outputs.
    pub fn num_out(&self) -> usize {
        self.num_out
    }

    /// The fixed output kind, if any.
    pub fn out_type(&self) -> Option<DataType> {
        self.out_type
    }

    /// Calls the function after checking the argument counts.
    ///
    /// # Errors
    ///
    /// Returns [`TensorOpsError::ArgCount`] if `inputs` or `outputs` has the
    /// wrong length, else whatever the function returns.
    pub fn call(
        &self,
        vz: &Vectorizer,
        inputs: &[&dyn Tensor],
        outputs: &[&dyn Values],
    ) -> Result<(), TensorOpsError> {
        self.check_count("input", self.num_in, inputs.len())?;
        self.check_count("output", self.num_out, outputs.len())?;
        (self.fun)(vz, inputs, outputs)
    }

    fn check_count(
        &self,
        kind: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), TensorOpsError> {
        if expected != actual {
            return Err(TensorOpsError::ArgCount {
                name: self.name.clone(),
                kind,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Func {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Func")
            .field("name", &self.name)
            .field("num_in", &self.num_in)
            .field("num_out", &self.num_out)
            .field("out_type", &self.out_type)
            .finish()
    }
}

/// A name-keyed table of tensor functions sharing one [`Vectorizer`].
///
/// Functions are added while the registry is being set up (it takes
/// `&mut self`) and looked up by name afterwards. Wrap a finished registry in
/// an `Arc` to share it between threads.
///
/// # Examples
///
/// ```
/// use tessera_tensor::{Float64, Tensor};
/// use tessera_tensor_ops::registry::FuncRegistry;
///
/// let reg = FuncRegistry::with_defaults();
/// let a = Float64::from_vec(vec![1.0, 4.0]);
/// let out = reg.call_out("sqrt", &[&a]).unwrap();
/// assert_eq!(out[0].float_1d(1), 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FuncRegistry {
    funcs: HashMap<String, Func>,
    vectorizer: Vectorizer,
}

impl FuncRegistry {
    /// Creates an empty registry using `vectorizer` for every call.
    pub fn new(vectorizer: Vectorizer) -> Self {
        Self {
            funcs: HashMap::new(),
            vectorizer,
        }
    }

    /// Creates a registry with the built-in functions and the default
    /// [`Vectorizer`].
    pub fn with_defaults() -> Self {
        let mut reg = Self::default();
        register_defaults(&mut reg);
        reg
    }

    /// The vectorizer used by [`FuncRegistry::call`].
    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    /// Adds `func`, replacing any function already registered under its name.
    pub fn add_func(&mut self, func: Func) {
        if let Some(old) = self.funcs.insert(func.name.clone(), func) {
            log::debug!("replaced tensor function {}", old.name);
        }
    }

    /// Looks up a function by name.
    ///
    /// # Errors
    ///
    /// Returns [`TensorOpsError::FuncNotFound`] if no function has that name.
    pub fn func_by_name(&self, name: &str) -> Result<&Func, TensorOpsError> {
        self.funcs
            .get(name)
            .ok_or_else(|| TensorOpsError::FuncNotFound(name.to_string()))
    }

    /// Calls the function `name` with caller-provided outputs.
    pub fn call(
        &self,
        name: &str,
        inputs: &[&dyn Tensor],
        outputs: &[&dyn Values],
    ) -> Result<(), TensorOpsError> {
        self.func_by_name(name)?
            .call(&self.vectorizer, inputs, outputs)
    }

    /// Calls the function `name` and returns freshly allocated outputs.
    ///
    /// Outputs have the function's fixed kind (see [`Func::with_out_type`]).
    /// Without one, they store strings when any input does and `f64`
    /// otherwise, so string results such as concatenation survive. Use
    /// [`FuncRegistry::call`] to choose the output kinds yourself.
    pub fn call_out(
        &self,
        name: &str,
        inputs: &[&dyn Tensor],
    ) -> Result<Vec<Box<dyn Values>>, TensorOpsError> {
        let func = self.func_by_name(name)?;
        let data_type = match func.out_type {
            Some(data_type) => data_type,
            None if inputs.iter().any(|t| t.is_string()) => DataType::String,
            None => DataType::Float64,
        };
        let outs: Vec<Box<dyn Values>> = (0..func.num_out)
            .map(|_| new_of_type(data_type, &[0]))
            .collect();
        let refs: Vec<&dyn Values> = outs.iter().map(|o| &**o).collect();
        func.call(&self.vectorizer, inputs, &refs)?;
        Ok(outs)
    }

    /// The registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The number of registered functions.
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Returns true if no function is registered.
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

/// Registers the built-in operations of [`crate::ops`] under their names:
/// the binary operations and comparisons take two inputs, the unary
/// operations and aggregates take one, and every function has one output.
pub fn register_defaults(reg: &mut FuncRegistry) {
    for op in BinaryOp::ALL {
        reg.add_func(Func::new(op.name(), 2, 1, move |vz, ins, outs| {
            ops::binary(vz, op, ins[0], ins[1], outs[0])
        }));
    }
    for op in CompareOp::ALL {
        reg.add_func(
            Func::new(op.name(), 2, 1, move |vz, ins, outs| {
                ops::compare(vz, op, ins[0], ins[1], outs[0])
            })
            .with_out_type(DataType::Bool),
        );
    }
    for op in UnaryOp::ALL {
        reg.add_func(
            Func::new(op.name(), 1, 1, move |vz, ins, outs| {
                ops::unary(vz, op, ins[0], outs[0]);
                Ok(())
            })
            .with_out_type(DataType::Float64),
        );
    }
    for op in AggOp::ALL {
        reg.add_func(
            Func::new(op.name(), 1, 1, move |_, ins, outs| {
                ops::aggregate_into(op, ins[0], outs[0]);
                Ok(())
            })
            .with_out_type(DataType::Float64),
        );
    }
    log::debug!("registered {} built-in tensor functions", reg.len());
}
