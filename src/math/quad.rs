//! Numerical quadrature over sampled traces.

/// Cumulative trapezoid integral of `f` over the abscissae `t`.
///
/// The output has the same length as the inputs and starts at `0`. `t` must be
/// non-decreasing; the caller guarantees this (ramp points are time-sorted).
pub fn cumulative_trapezoid(t: &[f64], f: &[f64]) -> Vec<f64> {
    let n = t.len().min(f.len());
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }
    let mut acc = 0.0;
    out.push(acc);
    for i in 1..n {
        acc += 0.5 * (f[i] + f[i - 1]) * (t[i] - t[i - 1]);
        out.push(acc);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_a_linear_function_exactly() {
        let t: Vec<f64> = (0..=10).map(|i| i as f64 * 0.5).collect();
        let f: Vec<f64> = t.iter().map(|x| 2.0 * x + 1.0).collect();
        let phi = cumulative_trapezoid(&t, &f);
        // ∫0^5 (2x + 1) dx = 25 + 5
        assert!((phi[10] - 30.0).abs() < 1e-12);
        assert_eq!(phi[0], 0.0);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(cumulative_trapezoid(&[], &[]).is_empty());
    }
}
