//! Temperature dependence of the rate constant.
//!
//! Both laws are evaluated in a reference-temperature form so the fitted
//! parameters stay well conditioned:
//!
//! - Eyring:    `k(T) = k_ref · (T/T_ref) · exp(-ΔH‡/R · (1/T - 1/T_ref))`
//! - Arrhenius: `k(T) = k_ref · exp(-Ea/R · (1/T - 1/T_ref))`
//!
//! The textbook Eyring form `k = (k_B T / h) · exp(ΔS‡/R) · exp(-ΔH‡/(R T))`
//! is recovered through [`activation`].

use crate::domain::{Activation, KineticParams, RateLaw};

/// Boltzmann constant (J/K).
pub const BOLTZMANN: f64 = 1.380649e-23;
/// Planck constant (J·s).
pub const PLANCK: f64 = 6.62607015e-34;
/// Molar gas constant (J/(mol·K)).
pub const GAS_CONSTANT: f64 = 8.314462618;
/// Temperature at which ΔG‡ is reported (K).
pub const STANDARD_TEMPERATURE_K: f64 = 298.15;

/// `ln(k_B / h)`, the intercept offset of an Eyring plot.
pub fn ln_kb_over_h() -> f64 {
    (BOLTZMANN / PLANCK).ln()
}

/// Natural log of the rate constant (1/s) at `t_k`.
pub fn ln_rate_constant(law: RateLaw, energy_j_mol: f64, ln_k_ref: f64, t_ref_k: f64, t_k: f64) -> f64 {
    let arrhenius_term = -energy_j_mol / GAS_CONSTANT * (1.0 / t_k - 1.0 / t_ref_k);
    match law {
        RateLaw::Eyring => ln_k_ref + (t_k / t_ref_k).ln() + arrhenius_term,
        RateLaw::Arrhenius => ln_k_ref + arrhenius_term,
    }
}

/// Rate constant (1/s) at `t_k`.
pub fn rate_constant(law: RateLaw, params: &KineticParams, t_k: f64) -> f64 {
    ln_rate_constant(law, params.energy_j_mol, params.ln_k_ref, params.t_ref_k, t_k).exp()
}

/// Half-life (s) of a first-order reaction at `t_k`.
pub fn half_life(law: RateLaw, params: &KineticParams, t_k: f64) -> f64 {
    std::f64::consts::LN_2 / rate_constant(law, params, t_k)
}

/// Reference-form parameters `(energy_j_mol, ln_k_ref)` from a linearized-plot line.
///
/// The line is `y = intercept + slope / T`, with `y = ln(k/T)` for Eyring and
/// `y = ln k` for Arrhenius.
pub fn from_linear(law: RateLaw, slope: f64, intercept: f64, t_ref_k: f64) -> (f64, f64) {
    let energy = -slope * GAS_CONSTANT;
    let ln_at_ref = intercept + slope / t_ref_k;
    let ln_k_ref = match law {
        RateLaw::Eyring => ln_at_ref + t_ref_k.ln(),
        RateLaw::Arrhenius => ln_at_ref,
    };
    (energy, ln_k_ref)
}

/// Reference-form parameters `(ΔH‡, ln k_ref)` from textbook Eyring parameters.
pub fn eyring_from_activation(dh_j_mol: f64, ds_j_mol_k: f64, t_ref_k: f64) -> (f64, f64) {
    let ln_k_ref = (BOLTZMANN * t_ref_k / PLANCK).ln() + ds_j_mol_k / GAS_CONSTANT
        - dh_j_mol / (GAS_CONSTANT * t_ref_k);
    (dh_j_mol, ln_k_ref)
}

/// Textbook activation parameters for reporting.
pub fn activation(law: RateLaw, params: &KineticParams) -> Activation {
    let e = params.energy_j_mol;
    let t_ref = params.t_ref_k;
    match law {
        RateLaw::Eyring => {
            // ΔS‡ = R · (ln(k_ref · h / (k_B · T_ref)) + ΔH‡ / (R · T_ref))
            let ds = GAS_CONSTANT * (params.ln_k_ref - (BOLTZMANN * t_ref / PLANCK).ln())
                + e / t_ref;
            let dg = e - STANDARD_TEMPERATURE_K * ds;
            Activation::Eyring {
                dh_kj_mol: e / 1000.0,
                ds_j_mol_k: ds,
                dg_298_kj_mol: dg / 1000.0,
            }
        }
        RateLaw::Arrhenius => Activation::Arrhenius {
            ea_kj_mol: e / 1000.0,
            ln_a: params.ln_k_ref + e / (GAS_CONSTANT * t_ref),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(law: RateLaw) -> KineticParams {
        let (e, ln_k_ref) = match law {
            RateLaw::Eyring => eyring_from_activation(100_000.0, -30.0, 340.0),
            RateLaw::Arrhenius => (90_000.0, -9.0),
        };
        KineticParams {
            a0: 0.1,
            a_inf: 1.0,
            energy_j_mol: e,
            ln_k_ref,
            t_ref_k: 340.0,
        }
    }

    #[test]
    fn eyring_reference_form_matches_textbook_form() {
        let p = params(RateLaw::Eyring);
        for t in [300.0, 340.0, 373.15] {
            let textbook = BOLTZMANN * t / PLANCK * (-30.0 / GAS_CONSTANT).exp()
                * (-100_000.0 / (GAS_CONSTANT * t)).exp();
            assert_relative_eq!(rate_constant(RateLaw::Eyring, &p, t), textbook, max_relative = 1e-10);
        }
    }

    #[test]
    fn eyring_activation_round_trips() {
        let p = params(RateLaw::Eyring);
        match activation(RateLaw::Eyring, &p) {
            Activation::Eyring { dh_kj_mol, ds_j_mol_k, dg_298_kj_mol } => {
                assert_relative_eq!(dh_kj_mol, 100.0, max_relative = 1e-12);
                assert_relative_eq!(ds_j_mol_k, -30.0, epsilon = 1e-8);
                assert_relative_eq!(dg_298_kj_mol, 100.0 + 298.15 * 30.0 / 1000.0, epsilon = 1e-8);
            }
            other => panic!("unexpected activation {other:?}"),
        }
    }

    #[test]
    fn arrhenius_prefactor_is_rate_at_infinite_temperature() {
        let p = params(RateLaw::Arrhenius);
        let Activation::Arrhenius { ln_a, ea_kj_mol } = activation(RateLaw::Arrhenius, &p) else {
            panic!("expected Arrhenius activation");
        };
        assert_relative_eq!(ea_kj_mol, 90.0, max_relative = 1e-12);
        let t = 350.0;
        let k = (ln_a - 90_000.0 / (GAS_CONSTANT * t)).exp();
        assert_relative_eq!(rate_constant(RateLaw::Arrhenius, &p, t), k, max_relative = 1e-10);
    }

    #[test]
    fn linear_line_maps_to_same_rate_constants() {
        // Eyring line: ln(k/T) = ln(kB/h) + ΔS/R - ΔH/(R T)
        let slope = -100_000.0 / GAS_CONSTANT;
        let intercept = ln_kb_over_h() - 30.0 / GAS_CONSTANT;
        let (e, ln_k_ref) = from_linear(RateLaw::Eyring, slope, intercept, 340.0);
        let p = KineticParams { energy_j_mol: e, ln_k_ref, ..params(RateLaw::Eyring) };
        let reference = params(RateLaw::Eyring);
        for t in [320.0, 360.0] {
            assert_relative_eq!(
                rate_constant(RateLaw::Eyring, &p, t),
                rate_constant(RateLaw::Eyring, &reference, t),
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn half_life_is_ln2_over_k() {
        let p = params(RateLaw::Arrhenius);
        let k = rate_constant(RateLaw::Arrhenius, &p, 340.0);
        assert_relative_eq!(half_life(RateLaw::Arrhenius, &p, 340.0) * k, std::f64::consts::LN_2);
        assert_relative_eq!(k, (-9.0_f64).exp(), max_relative = 1e-12);
    }
}
