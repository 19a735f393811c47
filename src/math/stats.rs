//! Small descriptive statistics over windows of samples.
//!
//! All helpers are deterministic and allocation-light; they are used both by the
//! fitter (slopes for rate points, MAD scale for Huber weights) and by the ramp
//! controller (median/slope/range of recent absorbance).

use std::cmp::Ordering;

/// Median of `values`, sorting them in place.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Median of an iterator of values.
pub fn median(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut v: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    median_mut(&mut v)
}

/// Ordinary least-squares slope of `ys` against `xs`.
///
/// Returns `None` for fewer than two points or zero variance in `xs`.
pub fn linear_slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = xs[..n].iter().sum::<f64>() / n as f64;
    let my = ys[..n].iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        num += (x - mx) * (y - my);
        den += (x - mx) * (x - mx);
    }
    if den == 0.0 || !den.is_finite() {
        return None;
    }
    let slope = num / den;
    slope.is_finite().then_some(slope)
}

/// Spread (`max - min`) of the values.
pub fn range(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut any = false;
    for v in values.into_iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
        any = true;
    }
    any.then_some(hi - lo)
}

/// Huber IRLS weights.
///
/// Residual scale comes from the MAD (median absolute deviation), which keeps the
/// weighting robust and deterministic. Weights never drop below `1e-3` of their
/// base value so no observation vanishes entirely.
pub fn huber_reweight(w_base: &[f64], residuals: &[f64], k: f64) -> Vec<f64> {
    let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).filter(|v| v.is_finite()).collect();
    let mad = median_mut(&mut abs).unwrap_or(0.0);
    let scale = (mad / 0.6745).max(1e-12);
    let cutoff = (k.max(1e-6)) * scale;

    let min_factor = 1e-3;
    w_base
        .iter()
        .zip(residuals.iter())
        .map(|(&w0, &r)| {
            let ar = r.abs();
            let factor = if ar <= cutoff || !ar.is_finite() { 1.0 } else { cutoff / ar };
            (w0 * factor).max(w0 * min_factor)
        })
        .collect()
}
