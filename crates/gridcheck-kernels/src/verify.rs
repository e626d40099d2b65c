//! Element-wise verification of a computed result against the host oracle.
//!
//! Integers compare exactly; floating point within a caller-supplied
//! absolute tolerance. The scan stops at the first mismatch, which is kept
//! for diagnostics. Verification never mutates its inputs, so running it
//! twice yields the same outcome.

use gridcheck_common::Element;

/// First mismatching element, formatted for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub index: usize,
    pub computed: String,
    pub expected: String,
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Pass,
    Fail(Mismatch),
}

impl Verification {
    pub fn passed(&self) -> bool {
        matches!(self, Verification::Pass)
    }
}

/// Compare `computed` against `expected` within `tolerance`.
///
/// Slices must be the same length; the harness constructs both from the
/// same problem descriptor.
pub fn verify<E: Element>(computed: &[E], expected: &[E], tolerance: f64) -> Verification {
    debug_assert_eq!(computed.len(), expected.len());
    for (i, (&got, &want)) in computed.iter().zip(expected).enumerate() {
        if !got.almost_eq(want, tolerance) {
            return Verification::Fail(Mismatch {
                index: i,
                computed: got.to_string(),
                expected: want.to_string(),
            });
        }
    }
    Verification::Pass
}
