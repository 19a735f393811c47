//! Absorbance-driven temperature-ramp control.
//!
//! - `history`: windowed absorbance statistics
//! - `pid`: the ramp-rate regulator
//! - `controller`: the tick-based state machine
//! - `instrument`: the hardware seam (readout, commands, clock)
//! - `runner`: the sampling loop tying them together

pub mod controller;
pub mod history;
pub mod instrument;
pub mod pid;
pub mod runner;

pub use controller::*;
pub use history::*;
pub use instrument::*;
pub use pid::*;
pub use runner::*;
