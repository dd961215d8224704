#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for tensor operations.
///
/// Defines [`TensorOpsError`] for handling failures during tensor computations.
pub mod error;

/// Built-in elementwise operations, comparisons and aggregates.
///
/// Binary operations and comparisons broadcast their operands with
/// [`tessera_tensor::align_tensors`]. Every operation writes into a
/// caller-provided output, which may alias an input.
pub mod ops;

/// Registry of named tensor functions.
///
/// Provides [`FuncRegistry`], which maps a name to a [`Func`] with a fixed
/// number of inputs and outputs.
pub mod registry;

/// Serial and parallel execution of per-index functions.
///
/// Provides [`Vectorizer`], which decides from the element count and an
/// estimated per-element cost whether a loop runs on rayon.
pub mod vectorize;

pub use error::TensorOpsError;
pub use registry::{register_defaults, Func, FuncRegistry};
pub use vectorize::{n_from_max, ExecutionStrategy, VectorizeConfig, Vectorizer};
