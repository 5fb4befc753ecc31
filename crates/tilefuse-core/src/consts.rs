/// Axis indices used throughout coordinate triplets: V (rows), H (columns),
/// D (slices). Stacks are stored depth-major, each slice row-major.
pub const AXIS_V: usize = 0;
pub const AXIS_H: usize = 1;
pub const AXIS_D: usize = 2;

/// Minimum number of tile pairs to use pair-level Rayon parallelism.
pub const PARALLEL_PAIR_THRESHOLD: usize = 4;

/// Weight assigned to a graph edge whose consensus reliability is not
/// positive. Reliable edges weigh `1/reliability`, so weights lie in
/// `[1, UNRELIABLE_WEIGHT]`.
pub const UNRELIABLE_WEIGHT: f32 = 1.0e7;

/// Hard cap on the per-axis width search range; `w_range_thr_*` never
/// exceeds `NCC_WIDTH_MAX - 1`.
pub const NCC_WIDTH_MAX: i32 = 30;

/// Small epsilon to avoid division by zero in floating-point comparisons.
pub const EPSILON: f32 = 1e-10;
