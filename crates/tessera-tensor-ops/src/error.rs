use tessera_tensor::TensorError;
use thiserror::Error;

/// An error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorOpsError {
    /// No function is registered under the requested name.
    #[error("Function not found: {0}")]
    FuncNotFound(String),

    /// A function was called with the wrong number of tensors.
    #[error("Function {name} takes {expected} {kind} tensors, got {actual}")]
    ArgCount {
        /// The function name.
        name: String,
        /// `"input"` or `"output"`.
        kind: &'static str,
        /// The number of tensors the function takes.
        expected: usize,
        /// The number of tensors passed.
        actual: usize,
    },

    /// Tensor error
    #[error("Error with the tensor: {0}")]
    TensorError(#[from] TensorError),

    /// The private thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}
