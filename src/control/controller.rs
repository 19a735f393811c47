//! Absorbance-driven ramp controller.
//!
//! The controller steers the temperature so that absorbance grows at a fixed
//! reference slope `S_ref = expected_max_abs / (switch_time_hrs · 60)` AU/min:
//!
//! ```text
//! FastLinearRamp ──slope ≥ S_ref──▶ ProportionalControl ──limit for N ticks──▶ Hold
//!                                                                                 │
//!                              Done ◀── Cool ◀──────── absorbance stable ─────────┘
//! ```
//!
//! Every tick produces a [`ControlUpdate`] and a pair of controller commands
//! (ramp rate, then target).

use serde::Serialize;

use crate::control::history::{AbsorbanceHistory, HISTORY_CAPACITY};
use crate::control::instrument::TempCommand;
use crate::control::pid::{Pid, PidGains};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlState {
    FastLinearRamp,
    ProportionalControl,
    Hold,
    Cool,
    Done,
}

impl ControlState {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlState::FastLinearRamp => "FAST_LINEAR_RAMP",
            ControlState::ProportionalControl => "PROPORTIONAL_CONTROL",
            ControlState::Hold => "HOLD",
            ControlState::Cool => "COOL",
            ControlState::Done => "DONE",
        }
    }
}

/// Controller settings. Temperatures in °C, rates in °C/min.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub start_temp_c: f64,
    pub max_temp_c: f64,
    pub fast_ramp: f64,
    pub cool_ramp: f64,
    pub pid: PidGains,
    /// Control period (s).
    pub tick_s: f64,
    /// Absorbance sampling interval within a tick (s).
    pub sample_interval_s: f64,
    /// Window of the control slope estimate (s).
    pub slope_window_s: f64,
    /// Window of the reported median absorbance (s).
    pub median_window_s: f64,
    pub expected_max_abs: f64,
    pub switch_time_hrs: f64,
    pub stability_window_min: f64,
    pub stability_max_range_au: f64,
    pub stability_max_slope: f64,
    pub plateau_ticks: usize,
    /// Ticks of fast ramp taken back when switching to proportional control.
    pub backoff_ticks: f64,
    pub history_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            start_temp_c: 45.0,
            max_temp_c: 100.0,
            fast_ramp: 2.0,
            cool_ramp: -1.0,
            pid: PidGains::default(),
            tick_s: 30.0,
            sample_interval_s: 0.1,
            slope_window_s: 30.0,
            median_window_s: 30.0,
            expected_max_abs: 1.0,
            switch_time_hrs: 5.0,
            stability_window_min: 10.0,
            stability_max_range_au: 0.05,
            stability_max_slope: 0.005,
            plateau_ticks: 3,
            backoff_ticks: 2.0,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// Reference absorbance slope (AU/min).
    pub fn s_ref(&self) -> f64 {
        self.expected_max_abs / (self.switch_time_hrs * 60.0)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.tick_s > 0.0 && self.sample_interval_s > 0.0 && self.sample_interval_s <= self.tick_s) {
            return Err("Need 0 < sample interval <= tick period.".to_string());
        }
        if !(self.max_temp_c > self.start_temp_c) {
            return Err(format!(
                "Max temperature ({}) must exceed start temperature ({}).",
                self.max_temp_c, self.start_temp_c
            ));
        }
        if !(self.switch_time_hrs > 0.0 && self.expected_max_abs > 0.0) {
            return Err("Expected max absorbance and switch time must be positive.".to_string());
        }
        if !(self.fast_ramp > 0.0) {
            return Err("Fast ramp must be positive.".to_string());
        }
        if !(self.pid.out_min < self.pid.out_max) {
            return Err("Minimum ramp must be below maximum ramp.".to_string());
        }
        Ok(())
    }
}

/// One control tick, as logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlUpdate {
    pub time_s: f64,
    pub state: ControlState,
    pub absorbance: f64,
    pub slope_au_per_min: f64,
    pub temp_target_c: f64,
    pub ramp_rate_c_per_min: f64,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct RampController {
    config: ControllerConfig,
    state: ControlState,
    pid: Pid,
    target_c: f64,
    ramp: f64,
    plateau_counter: usize,
}

impl RampController {
    pub fn new(config: ControllerConfig) -> Self {
        let pid = Pid::new(config.pid);
        Self {
            state: ControlState::FastLinearRamp,
            target_c: config.start_temp_c,
            ramp: config.fast_ramp,
            plateau_counter: 0,
            pid,
            config,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn target_c(&self) -> f64 {
        self.target_c
    }

    pub fn ramp(&self) -> f64 {
        self.ramp
    }

    /// Commands for the current setpoint: ramp rate first, then target.
    pub fn commands(&self) -> [TempCommand; 2] {
        [TempCommand::RampRate(self.ramp), TempCommand::Target(self.target_c)]
    }

    fn track_plateau(&mut self, error: f64) {
        let cfg = &self.config;
        let at_limit = (self.target_c >= cfg.max_temp_c && self.ramp > 0.0)
            || (self.ramp >= cfg.pid.out_max && error > 0.0);
        if at_limit {
            self.plateau_counter += 1;
        } else {
            self.plateau_counter = 0;
        }
    }

    /// Run one control step at `now_s` using the absorbance collected so far.
    pub fn tick(&mut self, now_s: f64, history: &AbsorbanceHistory) -> ControlUpdate {
        let cfg = self.config.clone();
        let s_ref = cfg.s_ref();
        let dt_min = cfg.tick_s / 60.0;

        let absorbance = history.median_since(now_s - cfg.median_window_s).unwrap_or(0.0);
        let slope = history.slope_since(now_s - cfg.slope_window_s).unwrap_or(0.0);
        let mut notes = String::new();

        match self.state {
            ControlState::FastLinearRamp => {
                self.ramp = cfg.fast_ramp;
                self.target_c = (self.target_c + self.ramp * dt_min).min(cfg.max_temp_c);
                if slope >= s_ref {
                    self.state = ControlState::ProportionalControl;
                    self.pid.reset();
                    self.plateau_counter = 0;
                    self.target_c = (self.target_c - cfg.backoff_ticks * cfg.fast_ramp * dt_min)
                        .max(cfg.start_temp_c);
                    self.ramp = 0.0;
                    notes.push_str("→ proportional control");
                } else {
                    self.track_plateau(s_ref - slope);
                    if self.plateau_counter >= cfg.plateau_ticks {
                        self.enter_hold(&mut notes);
                    }
                }
            }
            ControlState::ProportionalControl => {
                let error = s_ref - slope;
                self.ramp = self.pid.update(error, dt_min);
                self.target_c = (self.target_c + self.ramp * dt_min).clamp(cfg.start_temp_c, cfg.max_temp_c);
                self.track_plateau(error);
                if self.plateau_counter >= cfg.plateau_ticks {
                    self.enter_hold(&mut notes);
                }
            }
            ControlState::Hold => {
                self.ramp = 0.0;
                self.target_c = cfg.max_temp_c;
                let cutoff = now_s - cfg.stability_window_min * 60.0;
                let spread = history.range_since(cutoff);
                let slope_long = history.slope_since(cutoff).unwrap_or(0.0);
                if let Some(spread) = spread {
                    if spread < cfg.stability_max_range_au && slope_long.abs() < cfg.stability_max_slope {
                        self.state = ControlState::Cool;
                        self.ramp = cfg.cool_ramp;
                        self.target_c = cfg.start_temp_c;
                        notes.push_str("Stable → COOL");
                    }
                }
            }
            ControlState::Cool => {
                self.ramp = 0.0;
                self.target_c = cfg.start_temp_c;
                self.state = ControlState::Done;
                notes.push_str("Cooled → DONE");
            }
            ControlState::Done => {
                self.ramp = 0.0;
                self.target_c = cfg.start_temp_c;
            }
        }

        ControlUpdate {
            time_s: now_s,
            state: self.state,
            absorbance,
            slope_au_per_min: slope,
            temp_target_c: self.target_c,
            ramp_rate_c_per_min: self.ramp,
            notes,
        }
    }

    fn enter_hold(&mut self, notes: &mut String) {
        self.state = ControlState::Hold;
        self.ramp = 0.0;
        self.target_c = self.config.max_temp_c;
        self.plateau_counter = 0;
        notes.push_str("Reached limit → HOLD");
    }
}
