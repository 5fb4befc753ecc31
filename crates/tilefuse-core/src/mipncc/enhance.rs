//! Piecewise-linear grey-level enhancement driven by the cumulative
//! histogram, applied to each stack before projection when enabled.

use ndarray::{Array3, ArrayView3};

use crate::error::{Result, StitchError};

use super::NccParams;

const HIST_BINS: usize = 4096;

/// Remap a stack's grey levels through the breakpoints
/// `(enhance_percents[i], enhance_levels[i])`.
///
/// A voxel whose cumulative fraction falls in
/// `(percents[i-1], percents[i]]` is mapped linearly between
/// `levels[i-1]` and `levels[i]` (with an implicit `(0.0, 0.0)` first
/// breakpoint). `percents` must end at exactly 1.0.
pub fn enhance_stack(stack: &ArrayView3<'_, f32>, params: &NccParams) -> Result<Array3<f32>> {
    let percents = &params.enhance_percents;
    let levels = &params.enhance_levels;
    validate_breakpoints(percents, levels)?;

    // Cumulative histogram over [0,1].
    let mut hist = [0u64; HIST_BINS];
    for &v in stack.iter() {
        let bin = (v.clamp(0.0, 1.0) * (HIST_BINS - 1) as f32) as usize;
        hist[bin] += 1;
    }
    let total = stack.len() as f64;
    let mut cumulative = [0.0f32; HIST_BINS];
    let mut acc = 0u64;
    for (bin, &count) in hist.iter().enumerate() {
        acc += count;
        cumulative[bin] = (acc as f64 / total) as f32;
    }

    // One output level per histogram bin.
    let mut lut = [0.0f32; HIST_BINS];
    for bin in 0..HIST_BINS {
        lut[bin] = remap_fraction(cumulative[bin], percents, levels);
    }

    Ok(stack.map(|&v| {
        let bin = (v.clamp(0.0, 1.0) * (HIST_BINS - 1) as f32) as usize;
        lut[bin]
    }))
}

fn validate_breakpoints(percents: &[f32], levels: &[f32]) -> Result<()> {
    if percents.is_empty() || percents.len() != levels.len() {
        return Err(StitchError::InvalidInput(format!(
            "enhancement needs matching non-empty breakpoint lists, got {} percents and {} levels",
            percents.len(),
            levels.len()
        )));
    }
    if (percents[percents.len() - 1] - 1.0).abs() > f32::EPSILON {
        return Err(StitchError::InvalidInput(
            "last enhancement percent must be 1.0".into(),
        ));
    }
    let mut prev = 0.0f32;
    for &p in percents {
        if p <= prev || p > 1.0 {
            return Err(StitchError::InvalidInput(
                "enhancement percents must be strictly increasing in (0, 1]".into(),
            ));
        }
        prev = p;
    }
    Ok(())
}

fn remap_fraction(fraction: f32, percents: &[f32], levels: &[f32]) -> f32 {
    let mut lo_p = 0.0f32;
    let mut lo_c = 0.0f32;
    for (i, &p) in percents.iter().enumerate() {
        if fraction <= p {
            let span = p - lo_p;
            let t = if span > f32::EPSILON {
                (fraction - lo_p) / span
            } else {
                1.0
            };
            return lo_c + t * (levels[i] - lo_c);
        }
        lo_p = p;
        lo_c = levels[i];
    }
    levels[levels.len() - 1]
}
