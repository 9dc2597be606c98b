//! Default values for `santa init`.

pub const OUTPUT_CONFIG: &str = "santa.json";

pub const POPULATION_SIZE: usize = 1000;
pub const GENERATIONS: usize = 1000;
pub const GENOME_LENGTH: usize = 1000;

// Evolution
pub const SUBSTITUTION_RATE: f64 = 1e-4;
pub const TRANSITION_BIAS: f64 = 2.0;
pub const INDEL_INS_RATE: f64 = 0.0;
pub const INDEL_DEL_RATE: f64 = 0.0;
pub const INDEL_LENGTH_P: f64 = 0.5;

pub const RECOMBINATION_PROB: f64 = 0.0;
pub const BREAKPOINT_PROB: f64 = 1e-3;

pub const SELECTION_COEFFICIENT: f64 = 0.01;

pub const SAMPLE_EVERY: usize = 10;
