use rand::{Rng, RngCore};

use super::factor::{FitnessFactor, StateChange};
use crate::errors::FitnessError;
use crate::genome::GenePool;

/// Log fitness of each state at each site, stored row-major.
///
/// Sites beyond the table and unknown states contribute zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFitnessTable {
    alphabet: usize,
    values: Vec<f64>,
}

impl SiteFitnessTable {
    /// Build from explicit per-site rows of log fitness values.
    pub fn new(alphabet: usize, rows: Vec<Vec<f64>>) -> Result<Self, FitnessError> {
        let mut values = Vec::with_capacity(rows.len() * alphabet);
        for (site, row) in rows.into_iter().enumerate() {
            if row.len() != alphabet {
                return Err(FitnessError::InvalidParameter(format!(
                    "site {site} has {} states, expected {alphabet}",
                    row.len()
                )));
            }
            if row.iter().any(|v| v.is_nan()) {
                return Err(FitnessError::InvalidParameter(format!(
                    "site {site} has a NaN fitness value"
                )));
            }
            values.extend(row);
        }
        Ok(Self { alphabet, values })
    }

    /// Reference states have log fitness zero; every other state at a site
    /// has `ln(1 - s)`. `s = 1` makes non-reference states lethal.
    pub fn from_reference(
        alphabet: usize,
        reference: &[u8],
        selection_coefficient: f64,
    ) -> Result<Self, FitnessError> {
        if !(0.0..=1.0).contains(&selection_coefficient) {
            return Err(FitnessError::InvalidParameter(format!(
                "selection coefficient {selection_coefficient} outside [0, 1]"
            )));
        }
        let penalty = (1.0 - selection_coefficient).ln();
        let mut values = vec![penalty; reference.len() * alphabet];
        for (site, &state) in reference.iter().enumerate() {
            if (state as usize) < alphabet {
                values[site * alphabet + state as usize] = 0.0;
            }
        }
        Ok(Self { alphabet, values })
    }

    pub fn alphabet(&self) -> usize {
        self.alphabet
    }

    pub fn sites(&self) -> usize {
        if self.alphabet == 0 {
            0
        } else {
            self.values.len() / self.alphabet
        }
    }

    #[inline]
    pub fn get(&self, site: usize, state: u8) -> f64 {
        let state = state as usize;
        if state >= self.alphabet {
            return 0.0;
        }
        self.values
            .get(site * self.alphabet + state)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row(&self, site: usize) -> &[f64] {
        let start = (site * self.alphabet).min(self.values.len());
        let end = (start + self.alphabet).min(self.values.len());
        &self.values[start..end]
    }

    fn swap(&mut self, site: usize, a: usize, b: usize) {
        let base = site * self.alphabet;
        self.values.swap(base + a, base + b);
    }

    fn sum(&self, states: &[u8]) -> f64 {
        states
            .iter()
            .take(self.sites())
            .enumerate()
            .map(|(site, &state)| self.get(site, state))
            .sum()
    }
}

/// Purifying selection: a fixed per-site, per-state table.
#[derive(Debug, Clone)]
pub struct PurifyingFitness {
    name: String,
    feature: usize,
    table: SiteFitnessTable,
}

impl PurifyingFitness {
    pub fn new(name: impl Into<String>, feature: usize, table: SiteFitnessTable) -> Self {
        Self {
            name: name.into(),
            feature,
            table,
        }
    }

    pub fn table(&self) -> &SiteFitnessTable {
        &self.table
    }
}

impl FitnessFactor for PurifyingFitness {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature(&self) -> Option<usize> {
        Some(self.feature)
    }

    fn compute_log_fitness(&self, states: &[u8]) -> f64 {
        self.table.sum(states)
    }

    fn log_fitness_change(&self, change: &StateChange) -> f64 {
        self.table.get(change.site, change.new_state) - self.table.get(change.site, change.old_state)
    }

    fn update_generation(&mut self, _: usize, _: &GenePool, _: &mut dyn RngCore) -> bool {
        false
    }
}

/// Purifying selection whose optimum moves.
///
/// Each generation every site independently, with probability
/// `change_probability`, swaps the value of its fittest state with that of
/// a randomly chosen less fit state.
#[derive(Debug, Clone)]
pub struct FluctuatingFitness {
    name: String,
    feature: usize,
    table: SiteFitnessTable,
    change_probability: f64,
}

impl FluctuatingFitness {
    pub fn new(
        name: impl Into<String>,
        feature: usize,
        table: SiteFitnessTable,
        change_probability: f64,
    ) -> Result<Self, FitnessError> {
        if !(0.0..=1.0).contains(&change_probability) {
            return Err(FitnessError::InvalidParameter(format!(
                "fluctuation probability {change_probability} outside [0, 1]"
            )));
        }
        Ok(Self {
            name: name.into(),
            feature,
            table,
            change_probability,
        })
    }

    pub fn table(&self) -> &SiteFitnessTable {
        &self.table
    }

    /// Swap the fittest state at `site` with a random less fit one.
    /// Returns `false` if every state is equally fit.
    fn fluctuate<R: Rng + ?Sized>(&mut self, site: usize, rng: &mut R) -> bool {
        let row = self.table.row(site);
        let Some((best, &best_value)) = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
        else {
            return false;
        };
        let lower: Vec<usize> = row
            .iter()
            .enumerate()
            .filter(|(_, &v)| v < best_value)
            .map(|(i, _)| i)
            .collect();
        if lower.is_empty() {
            return false;
        }
        let other = lower[rng.random_range(0..lower.len())];
        self.table.swap(site, best, other);
        true
    }
}

impl FitnessFactor for FluctuatingFitness {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature(&self) -> Option<usize> {
        Some(self.feature)
    }

    fn compute_log_fitness(&self, states: &[u8]) -> f64 {
        self.table.sum(states)
    }

    fn log_fitness_change(&self, change: &StateChange) -> f64 {
        self.table.get(change.site, change.new_state) - self.table.get(change.site, change.old_state)
    }

    fn update_generation(&mut self, _: usize, _: &GenePool, rng: &mut dyn RngCore) -> bool {
        if self.change_probability <= 0.0 {
            return false;
        }
        let mut changed = false;
        for site in 0..self.table.sites() {
            if rng.random_bool(self.change_probability) {
                changed |= self.fluctuate(site, rng);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Sequence;
    use crate::coordinates::GenomeDescription;
    use crate::genome::StorageKind;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use std::str::FromStr;

    #[test]
    fn test_table_from_reference() {
        let table = SiteFitnessTable::from_reference(4, &[0, 3], 0.5).unwrap();
        assert_eq!(table.sites(), 2);
        assert_eq!(table.get(0, 0), 0.0);
        assert!((table.get(0, 1) - 0.5f64.ln()).abs() < 1e-12);
        assert_eq!(table.get(1, 3), 0.0);
        // Out of range sites and states are neutral.
        assert_eq!(table.get(5, 1), 0.0);
        assert_eq!(table.get(0, 9), 0.0);
        assert!(SiteFitnessTable::from_reference(4, &[0], 1.5).is_err());
    }

    #[test]
    fn test_explicit_table_validation() {
        assert!(SiteFitnessTable::new(4, vec![vec![0.0; 4], vec![0.0; 3]]).is_err());
        assert!(SiteFitnessTable::new(4, vec![vec![0.0, f64::NAN, 0.0, 0.0]]).is_err());
        let table = SiteFitnessTable::new(2, vec![vec![0.0, -1.0], vec![-2.0, 0.0]]).unwrap();
        assert_eq!(table.row(1), &[-2.0, 0.0]);
    }

    #[test]
    fn test_purifying_sum_and_change() {
        let table = SiteFitnessTable::new(4, vec![vec![0.0, -1.0, -2.0, -3.0]; 3]).unwrap();
        let factor = PurifyingFitness::new("p", 0, table);
        assert_eq!(factor.compute_log_fitness(&[0, 1, 2]), -3.0);
        // Extra states beyond the table are ignored.
        assert_eq!(factor.compute_log_fitness(&[3, 3, 3, 3, 3]), -9.0);
        let change = StateChange {
            site: 1,
            old_state: 1,
            new_state: 3,
        };
        assert_eq!(factor.log_fitness_change(&change), -2.0);
    }

    #[test]
    fn test_fluctuation_swaps_optimum() {
        let seq = Sequence::from_str("ACGT").unwrap();
        let pool = GenePool::new(seq, GenomeDescription::whole_genome(4), StorageKind::Full);
        let table = SiteFitnessTable::from_reference(4, &[0, 1, 2, 3], 0.5).unwrap();
        let mut factor = FluctuatingFitness::new("f", 0, table, 1.0).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        assert!(factor.update_generation(1, &pool, &mut rng));
        for site in 0..4 {
            let row = factor.table().row(site);
            // Exactly one state remains optimal and it moved off the reference.
            assert_eq!(row.iter().filter(|&&v| v == 0.0).count(), 1);
            assert_ne!(row[site], 0.0);
        }
    }

    #[test]
    fn test_flat_table_never_fluctuates() {
        let seq = Sequence::from_str("AC").unwrap();
        let pool = GenePool::new(seq, GenomeDescription::whole_genome(2), StorageKind::Full);
        let table = SiteFitnessTable::new(4, vec![vec![0.0; 4]; 2]).unwrap();
        let mut factor = FluctuatingFitness::new("f", 0, table, 1.0).unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        assert!(!factor.update_generation(1, &pool, &mut rng));
    }
}
