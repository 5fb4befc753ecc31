//! Maximum-intensity projections of a (D,V,H) stack.

use ndarray::{Array2, ArrayView3, Axis};

/// Project along D: collapses (D,V,H) to a (V,H) image.
pub fn mip_d(stack: &ArrayView3<'_, f32>) -> Array2<f32> {
    debug_assert!(stack.len() > 0);
    stack.fold_axis(Axis(0), f32::NEG_INFINITY, |acc, v| acc.max(*v))
}

/// Project along V: collapses (D,V,H) to a (D,H) image.
pub fn mip_v(stack: &ArrayView3<'_, f32>) -> Array2<f32> {
    debug_assert!(stack.len() > 0);
    stack.fold_axis(Axis(1), f32::NEG_INFINITY, |acc, v| acc.max(*v))
}

/// Project along H: collapses (D,V,H) to a (D,V) image.
pub fn mip_h(stack: &ArrayView3<'_, f32>) -> Array2<f32> {
    debug_assert!(stack.len() > 0);
    stack.fold_axis(Axis(2), f32::NEG_INFINITY, |acc, v| acc.max(*v))
}
