//! Observers that write population summaries while a simulation runs.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::SamplingError;
use crate::simulation::Population;

/// Records something about the population at sampling points.
pub trait Sampler: fmt::Debug {
    fn sample(&mut self, generation: usize, population: &Population) -> Result<(), SamplingError>;

    /// Flush any buffered output. Called once after the run.
    fn finish(&mut self) -> Result<(), SamplingError> {
        Ok(())
    }
}

const STATISTICS_HEADER: &str = "generation\tsize\tunique_genomes\tmean_fitness\tmin_fitness\tmax_fitness\tmean_distance\tmax_frequency\tdiversity";

/// Tab-separated table with one row of summary statistics per sample.
pub struct StatisticsSampler<W: Write> {
    out: W,
    header_written: bool,
}

impl StatisticsSampler<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SamplingError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> StatisticsSampler<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> fmt::Debug for StatisticsSampler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsSampler")
            .field("header_written", &self.header_written)
            .finish_non_exhaustive()
    }
}

impl<W: Write> Sampler for StatisticsSampler<W> {
    fn sample(&mut self, generation: usize, population: &Population) -> Result<(), SamplingError> {
        if !self.header_written {
            writeln!(self.out, "{STATISTICS_HEADER}")?;
            self.header_written = true;
        }
        let stats = population.statistics();
        writeln!(
            self.out,
            "{generation}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.4}\t{:.4}\t{:.4}",
            population.size(),
            population.pool().unique_genome_count(),
            stats.mean_fitness,
            stats.min_fitness,
            stats.max_fitness,
            stats.mean_distance,
            stats.max_frequency,
            stats.diversity,
        )?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SamplingError> {
        self.out.flush()?;
        Ok(())
    }
}

/// FASTA alignment of up to `sample_size` viruses per sample, taken evenly
/// spaced from the current generation.
///
/// Headers read `>gen{generation}_virus{index}`.
pub struct AlignmentSampler<W: Write> {
    out: W,
    sample_size: usize,
}

impl AlignmentSampler<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>, sample_size: usize) -> Result<Self, SamplingError> {
        Ok(Self::new(BufWriter::new(File::create(path)?), sample_size))
    }
}

impl<W: Write> AlignmentSampler<W> {
    pub fn new(out: W, sample_size: usize) -> Self {
        Self { out, sample_size }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> fmt::Debug for AlignmentSampler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignmentSampler")
            .field("sample_size", &self.sample_size)
            .finish_non_exhaustive()
    }
}

impl<W: Write> Sampler for AlignmentSampler<W> {
    fn sample(&mut self, generation: usize, population: &Population) -> Result<(), SamplingError> {
        let viruses = population.current_generation();
        let count = self.sample_size.min(viruses.len());
        for k in 0..count {
            let index = k * viruses.len() / count;
            let genome = population.pool().genome(viruses[index].genome)?;
            writeln!(self.out, ">gen{generation}_virus{index}")?;
            writeln!(self.out, "{}", genome.to_sequence())?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SamplingError> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Sequence;
    use crate::coordinates::GenomeDescription;
    use crate::evolution::{ClonalReplicator, FitnessProportionalSelector, NoMutation, PopulationSizeModel};
    use crate::fitness::FitnessFunction;
    use crate::genome::{GenePool, StorageKind};
    use std::str::FromStr;

    fn population(size: usize) -> Population {
        let seq = Sequence::from_str("ACGTAC").unwrap();
        let pool = GenePool::new(seq.clone(), GenomeDescription::whole_genome(6), StorageKind::Full);
        let mut population = Population::new(
            pool,
            FitnessFunction::neutral(),
            Box::new(FitnessProportionalSelector),
            Box::new(ClonalReplicator),
            Box::new(NoMutation),
            PopulationSizeModel::Static { size },
        );
        population.seed(seq, size).unwrap();
        population
    }

    #[test]
    fn test_statistics_rows() {
        let population = population(4);
        let mut sampler = StatisticsSampler::new(Vec::new());
        sampler.sample(0, &population).unwrap();
        sampler.sample(5, &population).unwrap();
        sampler.finish().unwrap();
        let text = String::from_utf8(sampler.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("generation\tsize"));
        assert!(lines[1].starts_with("0\t4\t1\t1.000000"));
        assert!(lines[2].starts_with("5\t4\t1"));
        assert_eq!(lines[1].split('\t').count(), 9);
    }

    #[test]
    fn test_alignment_sample_is_capped() {
        let population = population(10);
        let mut sampler = AlignmentSampler::new(Vec::new(), 3);
        sampler.sample(2, &population).unwrap();
        let text = String::from_utf8(sampler.into_inner()).unwrap();
        let headers: Vec<_> = text.lines().filter(|l| l.starts_with('>')).collect();
        assert_eq!(headers, vec![">gen2_virus0", ">gen2_virus3", ">gen2_virus6"]);
        assert!(text.lines().filter(|l| !l.starts_with('>')).all(|l| l == "ACGTAC"));
    }

    #[test]
    fn test_alignment_of_empty_population() {
        let population = population(0);
        let mut sampler = AlignmentSampler::new(Vec::new(), 3);
        sampler.sample(0, &population).unwrap();
        assert!(sampler.into_inner().is_empty());
    }

    #[test]
    fn test_alignment_of_released_genome_fails() {
        let mut population = population(1);
        let id = population.current_generation()[0].genome;
        population.pool_mut().kill_genome(id).unwrap();
        let mut sampler = AlignmentSampler::new(Vec::new(), 1);
        let err = sampler.sample(0, &population).unwrap_err();
        assert!(matches!(
            err,
            SamplingError::Pool(crate::errors::GenePoolError::StaleGenome { .. })
        ));
        assert!(sampler.into_inner().is_empty());
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.tsv");
        let population = population(2);
        let mut sampler = StatisticsSampler::create(&path).unwrap();
        sampler.sample(0, &population).unwrap();
        sampler.finish().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
