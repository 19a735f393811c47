//! Mathematical utilities: least squares, window statistics, quadrature and a
//! derivative-free minimizer.

pub mod neldermead;
pub mod ols;
pub mod quad;
pub mod stats;

pub use neldermead::*;
pub use ols::*;
pub use quad::*;
pub use stats::*;
