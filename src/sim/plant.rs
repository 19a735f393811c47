//! Simulated sample holder, cuvette and spectrometer.
//!
//! The holder moves toward the commanded target at the commanded ramp rate
//! (a zero rate means "no ramp limit", modelled as a first-order approach).
//! The sample lags the holder with its own time constant, and the absorbance
//! follows first-order Eyring kinetics at the sample temperature.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};

use crate::control::{InstrumentError, RampInstrument, TempCommand};
use crate::domain::{celsius_to_kelvin, KineticParams, RateLaw};
use crate::error::AppError;
use crate::models::{eyring_from_activation, rate_constant};

/// Longest internal integration step (s).
const MAX_SUBSTEP_S: f64 = 1.0;

/// Physical parameters of the simulation.
#[derive(Debug, Clone)]
pub struct PlantConfig {
    pub start_temp_c: f64,
    pub dh_kj_mol: f64,
    pub ds_j_mol_k: f64,
    pub a0: f64,
    pub a_inf: f64,
    /// Standard deviation of the absorbance read noise (AU).
    pub noise_sd: f64,
    /// Time constant of the holder when no ramp rate is set (s).
    pub holder_tau_s: f64,
    /// Time constant of the sample following the holder (s).
    pub sample_tau_s: f64,
    pub seed: u64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            start_temp_c: 45.0,
            dh_kj_mol: 100.0,
            ds_j_mol_k: -30.0,
            a0: 0.2,
            a_inf: 1.0,
            noise_sd: 0.0005,
            holder_tau_s: 60.0,
            sample_tau_s: 30.0,
            seed: 42,
        }
    }
}

pub struct SimulatedInstrument {
    params: KineticParams,
    holder_tau_s: f64,
    sample_tau_s: f64,
    holder_c: f64,
    sample_c: f64,
    /// Unreacted fraction `exp(-Φ)`.
    remaining: f64,
    last_s: f64,
    ramp: f64,
    target_c: f64,
    rng: StdRng,
    noise: Option<Normal<f64>>,
    commands: Vec<TempCommand>,
}

impl SimulatedInstrument {
    pub fn new(cfg: &PlantConfig) -> Result<Self, AppError> {
        if !(cfg.holder_tau_s > 0.0 && cfg.sample_tau_s > 0.0) {
            return Err(AppError::new(2, "Simulation time constants must be positive."));
        }
        let noise = if cfg.noise_sd > 0.0 {
            Some(
                Normal::new(0.0, cfg.noise_sd)
                    .map_err(|e| AppError::new(2, format!("Noise distribution error: {e}")))?,
            )
        } else if cfg.noise_sd == 0.0 {
            None
        } else {
            return Err(AppError::new(2, "Noise must be >= 0."));
        };

        let t_ref_k = celsius_to_kelvin(cfg.start_temp_c);
        let (energy_j_mol, ln_k_ref) = eyring_from_activation(cfg.dh_kj_mol * 1000.0, cfg.ds_j_mol_k, t_ref_k);
        Ok(Self {
            params: KineticParams { a0: cfg.a0, a_inf: cfg.a_inf, energy_j_mol, ln_k_ref, t_ref_k },
            holder_tau_s: cfg.holder_tau_s,
            sample_tau_s: cfg.sample_tau_s,
            holder_c: cfg.start_temp_c,
            sample_c: cfg.start_temp_c,
            remaining: 1.0,
            last_s: 0.0,
            ramp: 0.0,
            target_c: cfg.start_temp_c,
            rng: StdRng::seed_from_u64(cfg.seed),
            noise,
            commands: Vec::new(),
        })
    }

    /// Commands received so far.
    pub fn commands(&self) -> &[TempCommand] {
        &self.commands
    }

    pub fn holder_temperature_c(&self) -> f64 {
        self.holder_c
    }

    /// Fraction of the reaction completed.
    pub fn conversion(&self) -> f64 {
        1.0 - self.remaining
    }

    fn advance(&mut self, now_s: f64) {
        let mut left = now_s - self.last_s;
        while left > 0.0 {
            let h = left.min(MAX_SUBSTEP_S);
            let diff = self.target_c - self.holder_c;
            if self.ramp != 0.0 {
                let max_step = self.ramp.abs() / 60.0 * h;
                self.holder_c += diff.clamp(-max_step, max_step);
            } else {
                self.holder_c += diff * (1.0 - (-h / self.holder_tau_s).exp());
            }
            self.sample_c += (self.holder_c - self.sample_c) * (1.0 - (-h / self.sample_tau_s).exp());

            let k = rate_constant(RateLaw::Eyring, &self.params, celsius_to_kelvin(self.sample_c));
            self.remaining *= (-k * h).exp();
            left -= h;
        }
        self.last_s = self.last_s.max(now_s);
    }
}

impl RampInstrument for SimulatedInstrument {
    fn read_absorbance(&mut self, now_s: f64) -> Result<Option<f64>, InstrumentError> {
        self.advance(now_s);
        let p = &self.params;
        let clean = p.a0 + (p.a_inf - p.a0) * (1.0 - self.remaining);
        let noise = match &self.noise {
            Some(n) => n.sample(&mut self.rng),
            None => 0.0,
        };
        Ok(Some(clean + noise))
    }

    fn send(&mut self, command: &TempCommand) -> Result<(), InstrumentError> {
        match *command {
            TempCommand::RampRate(r) => self.ramp = r,
            TempCommand::Target(t) => self.target_c = t,
        }
        self.commands.push(*command);
        Ok(())
    }

    fn read_temperature(&mut self, now_s: f64) -> Option<f64> {
        self.advance(now_s);
        Some(self.sample_c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{run_controller, ControlState, ControllerConfig, RampController, RunOptions, SimClock, StopReason};

    fn quiet() -> PlantConfig {
        PlantConfig { noise_sd: 0.0, ..PlantConfig::default() }
    }

    #[test]
    fn holder_follows_ramp_rate_and_sample_lags() {
        let mut sim = SimulatedInstrument::new(&quiet()).unwrap();
        sim.send(&TempCommand::RampRate(2.0)).unwrap();
        sim.send(&TempCommand::Target(60.0)).unwrap();
        let t = sim.read_temperature(120.0).unwrap();
        assert!((sim.holder_temperature_c() - 49.0).abs() < 1e-9);
        assert!(t < 49.0 && t > 45.0);
    }

    #[test]
    fn zero_ramp_means_first_order_approach() {
        let mut sim = SimulatedInstrument::new(&quiet()).unwrap();
        sim.send(&TempCommand::RampRate(0.0)).unwrap();
        sim.send(&TempCommand::Target(55.0)).unwrap();
        sim.read_absorbance(60.0).unwrap();
        let expected = 55.0 - 10.0 * (-1.0_f64).exp();
        assert!((sim.holder_temperature_c() - expected).abs() < 1e-6);
    }

    #[test]
    fn absorbance_is_seeded_and_reproducible() {
        let cfg = PlantConfig::default();
        let mut a = SimulatedInstrument::new(&cfg).unwrap();
        let mut b = SimulatedInstrument::new(&cfg).unwrap();
        for i in 0..5 {
            let t = i as f64;
            assert_eq!(a.read_absorbance(t).unwrap(), b.read_absorbance(t).unwrap());
        }
    }

    #[test]
    fn controller_completes_a_simulated_run() {
        let ctl_cfg = ControllerConfig { sample_interval_s: 1.0, ..ControllerConfig::default() };
        let mut controller = RampController::new(ctl_cfg);
        let mut sim = SimulatedInstrument::new(&PlantConfig::default()).unwrap();
        let mut clock = SimClock::new();
        let opts = RunOptions { max_ticks: Some(3000), trace_every_s: Some(30.0), verbose: false };

        let run = run_controller(&mut controller, &mut sim, &mut clock, &opts, &mut std::io::sink()).unwrap();
        assert_eq!(run.stop, StopReason::Done);
        assert!(sim.conversion() > 0.95);
        assert!(run.updates.iter().any(|u| u.state == ControlState::ProportionalControl));
        assert!(run.updates.iter().any(|u| u.state == ControlState::Hold));
        assert!(run.trace.len() > 100);
        assert_eq!(sim.commands().len(), 2 * (run.ticks + 1));
    }
}
