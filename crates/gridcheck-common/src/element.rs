//! Element types supported by the kernels.
//!
//! The element type is a compile-time choice: the engine is generic over
//! [`Element`], and the runtime [`ElementType`] tag travels with launch
//! arguments so byte-oriented device backends know how to interpret buffer
//! contents.

use bytemuck::Pod;
use std::fmt;

/// Runtime tag for the element type of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
    /// 32-bit signed integer.
    I32,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn byte_size(self) -> usize {
        match self {
            ElementType::F32 | ElementType::I32 => 4,
            ElementType::F64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::F32 => write!(f, "f32"),
            ElementType::F64 => write!(f, "f64"),
            ElementType::I32 => write!(f, "i32"),
        }
    }
}

/// Scalar element the kernels operate on.
///
/// Implementations must agree between the device compute function and the
/// sequential host oracle, so verification compares like with like. Integer
/// arithmetic wraps on both sides for the same reason.
pub trait Element:
    Pod + Copy + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Runtime tag matching `Self`.
    const ELEMENT_TYPE: ElementType;
    /// Additive identity.
    const ZERO: Self;

    fn add(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;

    /// Element-wise comparison: exact for integers, within `tolerance`
    /// for floating point.
    fn almost_eq(self, other: Self, tolerance: f64) -> bool;
}

impl Element for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;
    const ZERO: Self = 0.0;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }

    #[inline]
    fn almost_eq(self, other: Self, tolerance: f64) -> bool {
        (f64::from(self) - f64::from(other)).abs() <= tolerance
    }
}

impl Element for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::F64;
    const ZERO: Self = 0.0;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }

    #[inline]
    fn almost_eq(self, other: Self, tolerance: f64) -> bool {
        (self - other).abs() <= tolerance
    }
}

impl Element for i32 {
    const ELEMENT_TYPE: ElementType = ElementType::I32;
    const ZERO: Self = 0;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self.wrapping_mul(rhs)
    }

    #[inline]
    fn almost_eq(self, other: Self, _tolerance: f64) -> bool {
        self == other
    }
}
