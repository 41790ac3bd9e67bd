//! Time-indexed spline policy with pluggable interpolation kernels.

mod kernel;
mod policy;

pub use kernel::SplineKind;
pub use policy::SplinePolicy;
