//! Discrete PID regulator for the ramp rate.
//!
//! The controlled quantity is the absorbance slope (AU/min); the output is a
//! ramp rate (°C/min). Time steps are expressed in minutes.

/// PID gains and limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Anti-windup clamp on the accumulated integral (`±integral_limit`).
    pub integral_limit: f64,
    pub out_min: f64,
    pub out_max: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 80.0,
            ki: 10.0,
            kd: 5.0,
            integral_limit: 0.01,
            out_min: -10.0,
            out_max: 10.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self { gains, integral: 0.0, prev_error: 0.0 }
    }

    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Clear the integral and derivative memory.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    /// Advance by `dt_min` minutes with error `error`; returns the clamped output.
    pub fn update(&mut self, error: f64, dt_min: f64) -> f64 {
        if !(dt_min > 0.0) || !error.is_finite() {
            return 0.0_f64.clamp(self.gains.out_min, self.gains.out_max);
        }
        let g = &self.gains;

        self.integral = (self.integral + error * dt_min).clamp(-g.integral_limit, g.integral_limit);
        let derivative = (error - self.prev_error) / dt_min;
        self.prev_error = error;

        let out = g.kp * error + g.ki * self.integral + g.kd * derivative;
        out.clamp(g.out_min, g.out_max)
    }
}
