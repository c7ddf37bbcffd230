//! Discrete distributions used by the significance model.
//!
//! Only the inverse cumulative probability is needed: the smallest `k` with `P(X <= k) >= p`.
//! The mass function is accumulated in log space starting a few standard deviations below the mean,
//! so that a mean in the thousands does not underflow `exp(-mean)`.
use crate::error::{PeakCallError, Result};
use std::f64::consts::PI;

const LANCZOS_G: f64 = 7f64;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];
// The mass below mean - TAIL_SD * sd is far smaller than any tail we ask for.
const TAIL_SD: f64 = 12f64;

/// Natural log of the gamma function (Lanczos approximation).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        PI.ln() - (PI * x).sin().abs().ln() - ln_gamma(1f64 - x)
    } else {
        let x = x - 1f64;
        let t = x + LANCZOS_G + 0.5;
        let series = LANCZOS_COEFFS
            .iter()
            .enumerate()
            .skip(1)
            .fold(LANCZOS_COEFFS[0], |acc, (i, c)| acc + c / (x + i as f64));
        0.5 * (2f64 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
    }
}

fn logaddexp(x: f64, y: f64) -> f64 {
    let (max, min) = if x < y { (y, x) } else { (x, y) };
    if min == f64::NEG_INFINITY {
        max
    } else {
        max + (min - max).exp().ln_1p()
    }
}

fn check_probability(p: f64) -> Result<()> {
    if (0f64..1f64).contains(&p) {
        Ok(())
    } else {
        let msg = format!("cumulative probability {} is out of [0,1)", p);
        Err(PeakCallError::Computation(msg))
    }
}

fn lower_start(mean: f64, sd: f64) -> u64 {
    (mean - TAIL_SD * sd - 5f64).floor().max(0f64) as u64
}

#[derive(Debug, Clone, Copy)]
pub struct Poisson {
    mean: f64,
}

impl Poisson {
    pub fn new(mean: f64) -> Result<Self> {
        if mean.is_finite() && 0f64 < mean {
            Ok(Self { mean })
        } else {
            let msg = format!("Poisson mean must be positive, found {}", mean);
            Err(PeakCallError::Computation(msg))
        }
    }
    pub fn mean(&self) -> f64 {
        self.mean
    }
    pub fn ln_pmf(&self, k: u64) -> f64 {
        k as f64 * self.mean.ln() - self.mean - ln_gamma(k as f64 + 1f64)
    }
    pub fn inverse_cdf(&self, p: f64) -> Result<u64> {
        check_probability(p)?;
        let ln_p = p.ln();
        let sd = self.mean.sqrt();
        let start = lower_start(self.mean, sd);
        let limit = (self.mean + 100f64 * sd + 100f64).ceil() as u64;
        let ln_mean = self.mean.ln();
        let mut ln_pmf = self.ln_pmf(start);
        let mut ln_cdf = f64::NEG_INFINITY;
        for k in start..limit {
            ln_cdf = logaddexp(ln_cdf, ln_pmf);
            if ln_p <= ln_cdf {
                return Ok(k);
            }
            ln_pmf += ln_mean - ((k + 1) as f64).ln();
        }
        Ok(limit)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Binomial {
    trials: u64,
    prob: f64,
}

impl Binomial {
    pub fn new(trials: u64, prob: f64) -> Result<Self> {
        if (0f64..=1f64).contains(&prob) {
            Ok(Self { trials, prob })
        } else {
            let msg = format!("success probability must be in [0,1], found {}", prob);
            Err(PeakCallError::Computation(msg))
        }
    }
    pub fn ln_pmf(&self, k: u64) -> f64 {
        if self.trials < k {
            return f64::NEG_INFINITY;
        }
        let (n, k) = (self.trials as f64, k as f64);
        let ln_choose = ln_gamma(n + 1f64) - ln_gamma(k + 1f64) - ln_gamma(n - k + 1f64);
        ln_choose + k * self.prob.ln() + (n - k) * (-self.prob).ln_1p()
    }
    pub fn inverse_cdf(&self, p: f64) -> Result<u64> {
        check_probability(p)?;
        if self.prob == 0f64 || self.trials == 0 {
            return Ok(0);
        } else if self.prob == 1f64 {
            return Ok(self.trials);
        }
        let ln_p = p.ln();
        let mean = self.trials as f64 * self.prob;
        let sd = (mean * (1f64 - self.prob)).sqrt();
        let start = lower_start(mean, sd).min(self.trials);
        let ln_odds = self.prob.ln() - (-self.prob).ln_1p();
        let mut ln_pmf = self.ln_pmf(start);
        let mut ln_cdf = f64::NEG_INFINITY;
        for k in start..self.trials {
            ln_cdf = logaddexp(ln_cdf, ln_pmf);
            if ln_p <= ln_cdf {
                return Ok(k);
            }
            ln_pmf += ((self.trials - k) as f64).ln() - ((k + 1) as f64).ln() + ln_odds;
        }
        Ok(self.trials)
    }
}
