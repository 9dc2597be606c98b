//! Fitness keyed on the joint state of a set of sites.
//!
//! A signature is the tuple of states a genome carries at the tracked sites
//! (an epitope, say). The factor keeps one value per signature present in
//! the population and refreshes it every generation with a mark-and-sweep
//! pass: values are stored positive between generations, a scan of the pool
//! flips every observed signature's value negative, and the sweep drops the
//! entries still positive (signatures that went extinct) and flips the rest
//! back.

use std::collections::HashMap;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::factor::{FitnessFactor, StateChange};
use crate::errors::FitnessError;
use crate::genome::{GenePool, MISSING_STATE};

/// How a signature's stored value turns into a fitness penalty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// Penalty grows with the number of generations since the signature
    /// first appeared: `-decline_rate * age`.
    Age { decline_rate: f64 },
    /// Penalty proportional to the signature's current share of the
    /// population: `-shape * frequency`.
    Frequency { shape: f64 },
    /// Penalty proportional to accumulated exposure, where exposure decays
    /// by `decay` each generation and gains the signature's current
    /// frequency: `-penalty * exposure`.
    Exposure { penalty: f64, decay: f64 },
}

impl SignaturePolicy {
    fn validate(&self) -> Result<(), FitnessError> {
        let ok = match *self {
            Self::Age { decline_rate } => decline_rate.is_finite() && decline_rate >= 0.0,
            Self::Frequency { shape } => shape.is_finite() && shape >= 0.0,
            Self::Exposure { penalty, decay } => {
                penalty.is_finite() && penalty >= 0.0 && (0.0..=1.0).contains(&decay)
            }
        };
        if ok {
            Ok(())
        } else {
            Err(FitnessError::InvalidParameter(format!("{self:?}")))
        }
    }
}

/// Fitness factor driven by per-signature history.
#[derive(Debug, Clone)]
pub struct SignatureFitness {
    name: String,
    feature: usize,
    sites: Vec<usize>,
    policy: SignaturePolicy,
    /// Stored values (positive outside `update_generation`): birth
    /// generation plus one for `Age`, copy count for `Frequency`, exposure
    /// for `Exposure`.
    table: HashMap<Vec<u8>, f64>,
    generation: usize,
    population_size: usize,
}

impl SignatureFitness {
    pub fn new(
        name: impl Into<String>,
        feature: usize,
        sites: Vec<usize>,
        policy: SignaturePolicy,
    ) -> Result<Self, FitnessError> {
        policy.validate()?;
        if sites.is_empty() {
            return Err(FitnessError::InvalidParameter(
                "signature factor needs at least one site".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            feature,
            sites,
            policy,
            table: HashMap::new(),
            generation: 0,
            population_size: 0,
        })
    }

    pub fn sites(&self) -> &[usize] {
        &self.sites
    }

    /// Number of signatures currently tracked.
    pub fn signature_count(&self) -> usize {
        self.table.len()
    }

    /// Log fitness of a signature, zero if it is not tracked.
    pub fn signature_log_fitness(&self, signature: &[u8]) -> f64 {
        self.table
            .get(signature)
            .map_or(0.0, |&value| self.value_to_log_fitness(value))
    }

    fn value_to_log_fitness(&self, value: f64) -> f64 {
        match self.policy {
            SignaturePolicy::Age { decline_rate } => {
                let born = value - 1.0;
                -decline_rate * (self.generation as f64 - born).max(0.0)
            }
            SignaturePolicy::Frequency { shape } => {
                if self.population_size == 0 {
                    0.0
                } else {
                    -shape * value / self.population_size as f64
                }
            }
            SignaturePolicy::Exposure { penalty, .. } => -penalty * value,
        }
    }

    /// Mark one observation of `signature` carried by `copies` viruses.
    fn observe(&mut self, signature: &[u8], copies: usize) {
        let generation = self.generation as f64;
        let share = if self.population_size == 0 {
            0.0
        } else {
            copies as f64 / self.population_size as f64
        };
        let policy = self.policy;

        if let Some(value) = self.table.get_mut(signature) {
            let unmarked = *value > 0.0;
            *value = match policy {
                SignaturePolicy::Age { .. } => -value.abs(),
                SignaturePolicy::Frequency { .. } if unmarked => -(copies as f64),
                SignaturePolicy::Frequency { .. } => *value - copies as f64,
                SignaturePolicy::Exposure { decay, .. } if unmarked => -(*value * decay + share),
                SignaturePolicy::Exposure { .. } => *value - share,
            };
            return;
        }

        let initial = match policy {
            SignaturePolicy::Age { .. } => generation + 1.0,
            SignaturePolicy::Frequency { .. } => copies as f64,
            SignaturePolicy::Exposure { .. } => share,
        };
        self.table.insert(signature.to_vec(), -initial);
    }

    /// Drop unmarked signatures and restore the sign of marked ones.
    fn sweep(&mut self) {
        self.table.retain(|_, value| {
            if *value < 0.0 {
                *value = -*value;
                true
            } else {
                false
            }
        });
    }

    fn signature_of(&self, states: &[u8], out: &mut Vec<u8>) {
        out.clear();
        out.extend(
            self.sites
                .iter()
                .map(|&site| states.get(site).copied().unwrap_or(MISSING_STATE)),
        );
    }
}

impl FitnessFactor for SignatureFitness {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature(&self) -> Option<usize> {
        Some(self.feature)
    }

    fn compute_log_fitness(&self, states: &[u8]) -> f64 {
        let mut signature = Vec::with_capacity(self.sites.len());
        self.signature_of(states, &mut signature);
        self.signature_log_fitness(&signature)
    }

    fn log_fitness_change(&self, _change: &StateChange) -> f64 {
        0.0
    }

    fn is_incremental(&self) -> bool {
        false
    }

    fn update_generation(
        &mut self,
        generation: usize,
        pool: &GenePool,
        _rng: &mut dyn RngCore,
    ) -> bool {
        self.generation = generation;
        self.population_size = pool.population_size();

        let mut signature = Vec::with_capacity(self.sites.len());
        for (_, genome) in pool.live_genomes() {
            genome.site_states(self.feature, &self.sites, &mut signature);
            // Observations with every site missing are dropped: the genome
            // no longer carries the tracked region.
            if signature.iter().all(|&s| s == MISSING_STATE) {
                continue;
            }
            self.observe(&signature, genome.frequency());
        }
        self.sweep();
        true
    }
}
