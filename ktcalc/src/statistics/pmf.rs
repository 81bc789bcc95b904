//! Counting probabilities, evaluated in log space so that large trial counts
//! (long damage tails under Feel No Pain) stay finite.

use statrs::function::factorial::{ln_binomial, ln_factorial};

/// Probability of observing exactly `counts[i]` outcomes of category `i` in
/// `n` independent trials with per-trial probabilities `probabilities`.
pub fn multinomial_probability(n: u32, counts: &[u32], probabilities: &[f64]) -> f64 {
    debug_assert_eq!(counts.len(), probabilities.len());
    debug_assert_eq!(counts.iter().sum::<u32>(), n);

    let mut ln_p = ln_factorial(n as u64);
    for (&k, &p) in counts.iter().zip(probabilities.iter()) {
        if k == 0 {
            continue;
        }
        if p <= 0.0 {
            return 0.0;
        }
        ln_p += k as f64 * p.ln() - ln_factorial(k as u64);
    }
    ln_p.exp()
}

pub fn binomial_coefficient(n: u32, k: u32) -> f64 {
    if k > n {
        return 0.0;
    }
    ln_binomial(n as u64, k as u64).exp().round()
}

/// Probability of exactly `k` successes in `n` trials with success chance `p`.
pub fn binomial_probability(n: u32, k: u32, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    // ln(0) is not usable, so the degenerate chances are handled directly
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }
    let ln_p = ln_binomial(n as u64, k as u64) + k as f64 * p.ln() + (n - k) as f64 * (1.0 - p).ln();
    ln_p.exp()
}
