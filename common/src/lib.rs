pub mod file_format;
pub mod log_setup;
mod shared_fn;

pub use shared_fn::SharedFn;

/// Tolerance for treating a floating-point sum of squares as zero.
pub const EPSILON: f64 = 1e-9;
