//! Small helpers shared by the `#[cfg(test)]` modules scattered through the
//! crate. Kept crate-private.

use crate::Float;

/// Compares two floats for near-equality, tolerant of accumulated
/// floating-point error from FFTs and trigonometric sums.
pub fn equal_floats(a: Float, b: Float) -> bool {
    (a - b).abs() < 1e-10
}

/// Same as [`equal_floats`], but with an explicit tolerance.
pub fn close(a: Float, b: Float, tol: Float) -> bool {
    (a - b).abs() < tol
}
