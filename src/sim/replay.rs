//! Replays a recorded dataset as if it were a live instrument.
//!
//! Absorbance and temperature are linearly interpolated in time. Commands are
//! recorded but have no effect on the replayed data.

use crate::control::{InstrumentError, RampInstrument, TempCommand};
use crate::domain::RampPoint;
use crate::error::AppError;

pub struct ReplayInstrument {
    points: Vec<RampPoint>,
    commands: Vec<TempCommand>,
}

impl ReplayInstrument {
    /// `points` must be sorted by time (as produced by ingest).
    pub fn new(points: Vec<RampPoint>) -> Result<Self, AppError> {
        if points.len() < 2 {
            return Err(AppError::new(3, "Replay needs at least two data points."));
        }
        Ok(Self { points, commands: Vec::new() })
    }

    pub fn duration_s(&self) -> f64 {
        self.points.last().map(|p| p.time_s).unwrap_or(0.0)
    }

    pub fn commands(&self) -> &[TempCommand] {
        &self.commands
    }

    fn interpolate(&self, now_s: f64, value: impl Fn(&RampPoint) -> f64) -> Option<f64> {
        if now_s < 0.0 || now_s > self.duration_s() {
            return None;
        }
        let i = self.points.partition_point(|p| p.time_s <= now_s);
        if i == 0 {
            return Some(value(&self.points[0]));
        }
        if i >= self.points.len() {
            return self.points.last().map(&value);
        }
        let (a, b) = (&self.points[i - 1], &self.points[i]);
        let u = (now_s - a.time_s) / (b.time_s - a.time_s);
        Some(value(a) + u * (value(b) - value(a)))
    }
}

impl RampInstrument for ReplayInstrument {
    fn read_absorbance(&mut self, now_s: f64) -> Result<Option<f64>, InstrumentError> {
        Ok(self.interpolate(now_s, |p| p.absorbance))
    }

    fn send(&mut self, command: &TempCommand) -> Result<(), InstrumentError> {
        self.commands.push(*command);
        Ok(())
    }

    fn read_temperature(&mut self, now_s: f64) -> Option<f64> {
        self.interpolate(now_s, |p| p.temperature_c())
    }

    fn finished(&self, now_s: f64) -> bool {
        now_s > self.duration_s()
    }
}
