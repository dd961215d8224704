#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `tessera-tensor` is the n-dimensional tensor engine underneath the tessera data
//! packages (statistics, tables, plotting and the expression transpiler). It provides
//! dynamically shaped, row-major storage for numbers, bools and strings, composable
//! views that re-index a tensor without copying it, and the broadcasting rules used by
//! every elementwise operation.
//!
//! # Architecture
//!
//! The crate is organized into several key components:
//!
//! - **Shape**: Dimension sizes and row-major strides, with flat/coordinate conversion
//! - **Values**: Owning storage ([`Number`], [`Bool`], [`Strings`]) behind shared handles
//! - **Views**: [`Rows`], [`Sliced`], [`Masked`] and [`Indexed`] re-index a source tensor
//! - **Align**: Shape broadcasting for binary operations
//!
//! # Key Features
//!
//! - **Uniform access**: Every tensor reads and writes as float, int or string
//! - **Shared handles**: Cloning a tensor is O(1) and aliases the same buffer
//! - **Zero-copy views**: Views hold a handle of their source and write through to it
//! - **Thread-safe**: All tensors are Send + Sync, so operations can fan out on rayon
//!
//! # Quick Start
//!
//! Creating and reading tensors:
//!
//! ```rust
//! use tessera_tensor::{Float64, RowMajor, Tensor};
//!
//! let t = Float64::from_shape_vec(&[2, 3], vec![1., 2., 3., 4., 5., 6.]).unwrap();
//! assert_eq!(t.float(&[1, 2]), 6.0);
//! assert_eq!(t.string_row(0, 1), "2");
//! assert_eq!(t.row_cell_size(), (2, 3));
//! ```
//!
//! Handles share their buffer:
//!
//! ```rust
//! use tessera_tensor::{Int, Tensor};
//!
//! let a = Int::from_vec(vec![1, 2, 3]);
//! let b = a.clone();
//! b.set_int_1d(0, 10);
//! assert_eq!(a.int_1d(0), 10);
//!
//! // deep_clone detaches
//! let c = a.deep_clone();
//! c.set_int_1d(0, 0);
//! assert_eq!(a.int_1d(0), 10);
//! ```
//!
//! Working with views:
//!
//! ```rust
//! use tessera_tensor::{Float64, Rows, Tensor};
//!
//! let t = Float64::from_vec(vec![3., 1., 2.]);
//! let mut rows = Rows::new(t, None);
//! rows.sort(true);
//! let sorted = rows.as_values();
//! assert_eq!(sorted.float_1d(0), 1.0);
//! ```
//!
//! # Type Aliases
//!
//! - [`Float64`], [`Float32`]: Floating point tensors
//! - [`Int`], [`Int32`]: Signed integer tensors
//! - [`Uint32`], [`Byte`]: Unsigned integer tensors

/// Align module containing shape broadcasting for binary operations.
///
/// Every broadcasting operation reads its operands through
/// [`align::wrap_index_1d`].
pub mod align;

/// Bool module containing bit-packed boolean storage.
pub mod boolean;

mod format;

/// Indexed module containing the coordinate gathering view.
pub mod indexed;

/// Masked module containing the boolean masking view.
pub mod masked;

/// Number module containing numeric storage generic over the element type.
pub mod number;

/// Rows module containing the row-reordering view.
pub mod rows;

/// Serde module for JSON/other format serialization and deserialization.
///
/// This module provides serialization support for shapes and owning tensors
/// when the `serde` feature is enabled. Views serialize through `as_values`.
#[cfg(feature = "serde")]
pub mod serde;

/// Shape module containing dimension sizes, strides and index conversion.
pub mod shape;

/// Sliced module containing the per-dimension selection view.
pub mod sliced;

/// Storage module containing the shared, lockable element buffer.
///
/// This module provides [`storage::TensorStorage`], which every owning tensor
/// and sub-space view holds.
pub mod storage;

/// String module containing string storage.
pub mod string;

/// Tensor module containing the access traits, data types and error types.
///
/// This module provides the [`tensor::Tensor`], [`tensor::RowMajor`],
/// [`tensor::Values`] and [`tensor::SubSpace`] traits.
pub mod tensor;

pub use crate::align::{align_for_assign, align_shapes, align_tensors, wrap_index_1d, Aligned};
pub use crate::boolean::{parse_bool, Bool};
pub use crate::indexed::Indexed;
pub use crate::masked::Masked;
pub use crate::number::{Byte, Float32, Float64, Int, Int32, Number, NumberType, Uint32};
pub use crate::rows::{FilterOptions, Rows};
pub use crate::shape::{add_shapes, Shape};
pub use crate::sliced::Sliced;
pub use crate::storage::TensorStorage;
pub use crate::string::Strings;
pub use crate::tensor::{
    new_of_type, DataType, RowMajor, SubSpace, Tensor, TensorError, Values,
};
