//! Common types and utilities for the gridcheck workspace.
//!
//! This crate provides the foundational pieces shared by the kernel engine
//! and the CLI harness: the error taxonomy, element-type abstractions,
//! validated problem descriptors, and small integer math helpers.

pub mod element;
pub mod error;
pub mod math;
pub mod problem;

pub use element::{Element, ElementType};
pub use error::{GridError, Result};
pub use math::{ceil_div, is_power_of_two};
pub use problem::{MatmulProblem, MatrixProblem, VectorProblem};
