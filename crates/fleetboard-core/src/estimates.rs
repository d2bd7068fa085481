//! Placeholder estimates
//!
//! Some figures in the reports (segment growth, per-contract scores, payment
//! punctuality) have no data behind them in a contract snapshot. They are
//! drawn from this source so the stand-in is explicit: `Random` mimics the
//! spread of real values, `Fixed` returns midpoints and is fully
//! deterministic. Callers flag every field produced here.

use crate::config::EstimatesConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How placeholder values are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EstimateMode {
    /// Uniform draws over the documented ranges
    #[default]
    Random,
    /// Range midpoints, no randomness
    Fixed,
}

/// Source of placeholder values
#[derive(Debug, Clone)]
pub struct Estimates {
    mode: EstimateMode,
    rng: StdRng,
}

impl Estimates {
    pub fn from_config(config: &EstimatesConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mode: config.mode,
            rng,
        }
    }

    /// Deterministic midpoints
    pub fn fixed() -> Self {
        Self {
            mode: EstimateMode::Fixed,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Reproducible random draws
    pub fn seeded(seed: u64) -> Self {
        Self {
            mode: EstimateMode::Random,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn mode(&self) -> EstimateMode {
        self.mode
    }

    fn sample(&mut self, low: f64, high: f64) -> f64 {
        match self.mode {
            EstimateMode::Random => self.rng.gen_range(low..high),
            EstimateMode::Fixed => (low + high) / 2.0,
        }
    }

    /// Period-over-period growth of a segment, percent in [-5, 15)
    pub fn segment_growth_rate(&mut self) -> f64 {
        self.sample(-5.0, 15.0)
    }

    /// Overall contract performance, [70, 100)
    pub fn performance_score(&mut self) -> f64 {
        self.sample(70.0, 100.0)
    }

    /// [80, 100)
    pub fn retention_score(&mut self) -> f64 {
        self.sample(80.0, 100.0)
    }

    /// [90, 100)
    pub fn compliance_score(&mut self) -> f64 {
        self.sample(90.0, 100.0)
    }

    /// Percent of the term the vehicle was on hire, [60, 90)
    pub fn utilization_rate(&mut self) -> f64 {
        self.sample(60.0, 90.0)
    }

    /// Days late for one installment; `None` when paid on time.
    /// One in ten installments is late by 1..=15 days.
    pub fn days_late(&mut self) -> Option<u32> {
        match self.mode {
            EstimateMode::Random if self.rng.gen_bool(0.1) => Some(self.rng.gen_range(1..=15)),
            _ => None,
        }
    }

    /// Bernoulli trial; never fires in `Fixed` mode
    pub fn chance(&mut self, probability: f64) -> bool {
        match self.mode {
            EstimateMode::Random => self.rng.gen_bool(probability.clamp(0.0, 1.0)),
            EstimateMode::Fixed => false,
        }
    }
}

impl Default for Estimates {
    fn default() -> Self {
        Self::from_config(&EstimatesConfig::default())
    }
}
