//! Temperature-adjusted sampling from a probability vector.
//!
//! `adjust` reweights each entry as `exp(ln(p) / T)` and renormalizes. Low
//! temperatures sharpen toward the arg-max, high ones flatten toward uniform
//! over the entries that had any mass. Zero entries stay zero at every
//! temperature.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SampleError {
    #[error("empty distribution")]
    Empty,

    #[error("probability {value} at index {index} is not a finite non-negative number")]
    InvalidProbability { index: usize, value: f64 },

    #[error("distribution has no mass")]
    ZeroMass,

    #[error("temperature must be finite and positive, got {0}")]
    InvalidTemperature(f64),
}

/// Reweight `distribution` by `temperature` and renormalize to sum to one.
pub fn adjust(distribution: &[f64], temperature: f64) -> Result<Vec<f64>, SampleError> {
    if distribution.is_empty() {
        return Err(SampleError::Empty);
    }
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(SampleError::InvalidTemperature(temperature));
    }
    if let Some((index, &value)) = distribution
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.is_finite() && **p >= 0.0))
    {
        return Err(SampleError::InvalidProbability { index, value });
    }

    let logits: Vec<f64> = distribution
        .iter()
        .map(|&p| if p > 0.0 { p.ln() / temperature } else { f64::NEG_INFINITY })
        .collect();

    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(SampleError::ZeroMass);
    }

    // Shift by the max so tiny temperatures don't underflow every entry
    let weights: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let total: f64 = weights.iter().sum();

    Ok(weights.into_iter().map(|w| w / total).collect())
}

/// Draws indices from temperature-adjusted distributions.
pub struct Sampler {
    rng: StdRng,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler {
    /// Seeded from the operating system.
    pub fn new() -> Self {
        Sampler {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible draws for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Sampler {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn sample(&mut self, distribution: &[f64], temperature: f64) -> Result<usize, SampleError> {
        let probabilities = adjust(distribution, temperature)?;

        // Weighted random selection via CDF walk
        let draw: f64 = self.rng.random();
        let mut cumulative = 0.0;
        for (i, &p) in probabilities.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                return Ok(i);
            }
        }

        // Rounding left the total a hair under the draw
        Ok(probabilities.iter().rposition(|&p| p > 0.0).unwrap_or(0))
    }
}
