//! Instrument seam: absorbance readout, temperature controller, and time.
//!
//! The controller never talks to hardware directly. A [`RampInstrument`]
//! provides absorbance readings and accepts temperature-controller commands; a
//! [`Clock`] provides time and sleeping so the same loop can run in real time
//! or fast-forwarded against a simulation.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("Instrument '{0}' is not connected.")]
    Disconnected(String),
    #[error("Unreadable instrument value: {0}")]
    Unreadable(String),
    #[error("Command '{command}' rejected: {reason}")]
    Rejected { command: String, reason: String },
}

/// A command in the temperature controller's syntax.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TempCommand {
    /// Ramp rate in °C/min (`0` means "no ramp limit").
    RampRate(f64),
    /// Target temperature in °C.
    Target(f64),
}

impl fmt::Display for TempCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TempCommand::RampRate(r) => write!(f, "[F1 RR S {r:.2}]"),
            TempCommand::Target(t) => write!(f, "[F1 TT S {t:.2}]"),
        }
    }
}

/// Absorbance readout plus temperature controller.
pub trait RampInstrument {
    /// Current absorbance, `Ok(None)` when no valid reading is available.
    fn read_absorbance(&mut self, now_s: f64) -> Result<Option<f64>, InstrumentError>;

    fn send(&mut self, command: &TempCommand) -> Result<(), InstrumentError>;

    /// Sample temperature (°C), when the instrument can measure it.
    fn read_temperature(&mut self, _now_s: f64) -> Option<f64> {
        None
    }

    /// `true` once the instrument has no more data to offer.
    fn finished(&self, _now_s: f64) -> bool {
        false
    }
}

/// Source of time for the control loop (seconds since start).
pub trait Clock {
    fn now_s(&self) -> f64;
    fn sleep(&mut self, seconds: f64);
}

/// Fast-forward clock: sleeping just advances time.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_s: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SimClock {
    fn now_s(&self) -> f64 {
        self.now_s
    }

    fn sleep(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.now_s += seconds;
        }
    }
}

/// Real-time clock.
#[derive(Debug, Clone)]
pub struct WallClock {
    start: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for WallClock {
    fn now_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn sleep(&mut self, seconds: f64) {
        if seconds > 0.0 && seconds.is_finite() {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_controller_syntax() {
        assert_eq!(TempCommand::RampRate(2.0).to_string(), "[F1 RR S 2.00]");
        assert_eq!(TempCommand::Target(67.456).to_string(), "[F1 TT S 67.46]");
        assert_eq!(TempCommand::RampRate(-1.0).to_string(), "[F1 RR S -1.00]");
    }

    #[test]
    fn sim_clock_advances_only_forward() {
        let mut c = SimClock::new();
        c.sleep(0.5);
        c.sleep(-3.0);
        assert_eq!(c.now_s(), 0.5);
    }
}
