//! Kinetic fitting orchestration.
//!
//! Responsibilities:
//!
//! - estimate the absorbance baseline and local rate constants
//! - calibrate each rate law by linearized regression and by integrated least squares
//! - select the best candidate using BIC + guardrails

pub mod baseline;
pub mod integrated;
pub mod linear;
pub mod rates;
pub mod seeds;
pub mod selection;

#[cfg(test)]
pub(crate) mod testdata;

pub use baseline::*;
pub use integrated::*;
pub use linear::*;
pub use rates::*;
pub use seeds::*;
pub use selection::*;
