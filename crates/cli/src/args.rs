use clap::Args;
use std::path::PathBuf;

use crate::defaults;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override random seed (default: use configured seed)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override sampling interval in generations
    #[arg(long)]
    pub sample_every: Option<usize>,

    /// Write per-generation statistics (TSV) to this file
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// Write sampled sequences (FASTA) to this file
    #[arg(long)]
    pub alignment: Option<PathBuf>,

    /// Viruses per alignment sample (default: use configured size)
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Show progress bar
    #[arg(long)]
    pub progress: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Output configuration path
    #[arg(short, long, default_value = defaults::OUTPUT_CONFIG)]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,

    /// Population size
    #[arg(short = 'n', long, default_value_t = defaults::POPULATION_SIZE)]
    pub population_size: usize,

    /// Number of generations
    #[arg(short = 'g', long, default_value_t = defaults::GENERATIONS)]
    pub generations: usize,

    /// Length of the random founding genome
    #[arg(short = 'l', long, default_value_t = defaults::GENOME_LENGTH)]
    pub genome_length: usize,

    /// Substitution rate per site per generation
    #[arg(long, default_value_t = defaults::SUBSTITUTION_RATE)]
    pub mutation_rate: f64,

    /// Transition/transversion rate ratio
    #[arg(long, default_value_t = defaults::TRANSITION_BIAS)]
    pub transition_bias: f64,

    /// Insertion rate (per base per generation)
    #[arg(long, default_value_t = defaults::INDEL_INS_RATE)]
    pub indel_ins_rate: f64,

    /// Deletion rate (per base per generation)
    #[arg(long, default_value_t = defaults::INDEL_DEL_RATE)]
    pub indel_del_rate: f64,

    /// Geometric parameter p for indel length (higher p = shorter indels)
    #[arg(long, default_value_t = defaults::INDEL_LENGTH_P)]
    pub indel_length_p: f64,

    /// Probability that a replication recombines (0 = clonal)
    #[arg(long, default_value_t = defaults::RECOMBINATION_PROB)]
    pub recombination_prob: f64,

    /// Per-site template switch probability during recombination
    #[arg(long, default_value_t = defaults::BREAKPOINT_PROB)]
    pub breakpoint_prob: f64,

    /// Purifying selection coefficient against non-founder states
    /// (0 = neutral)
    #[arg(short = 's', long, default_value_t = defaults::SELECTION_COEFFICIENT)]
    pub selection: f64,

    /// Store genomes as differences from the founder
    #[arg(long)]
    pub diff_storage: bool,

    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Generations between samples
    #[arg(long, default_value_t = defaults::SAMPLE_EVERY)]
    pub sample_every: usize,
}
