//! Simulated instruments and synthetic datasets.
//!
//! These stand in for the spectrometer and temperature controller during
//! development and for demonstrating the fitting pipeline end to end.

pub mod plant;
pub mod replay;
pub mod synthetic;

pub use plant::*;
pub use replay::*;
pub use synthetic::*;
