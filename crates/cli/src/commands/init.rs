use anyhow::{Context, Result};
use santa_sim::simulation::{
    Configuration, EpochConfig, FitnessConfig, GenomeConfig, IndelConfig, MutatorConfig,
    PopulationConfig, ReplicatorConfig, SamplingConfig,
};
use santa_sim::genome::StorageKind;
use std::fs;

use crate::args::InitArgs;
use crate::printing::print_parameters;

pub fn write_config(args: &InitArgs) -> Result<()> {
    println!("🧬 Santa - Virus Evolution Simulator");
    println!("============================================\n");

    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.output.display()
        );
    }

    let config = build_config(args);
    let text = config.to_json_pretty().context("Failed to serialize configuration")?;
    fs::write(&args.output, text)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    print_parameters(&config, None);
    println!("✓ Configuration written to {}", args.output.display());
    println!("\n💡 Use 'santa run -c {}' to start", args.output.display());
    Ok(())
}

fn build_config(args: &InitArgs) -> Configuration {
    let indel = (args.indel_ins_rate > 0.0 || args.indel_del_rate > 0.0).then(|| IndelConfig {
        insertion_rate: args.indel_ins_rate,
        deletion_rate: args.indel_del_rate,
        length_p: args.indel_length_p,
    });

    let replicator = if args.recombination_prob > 0.0 {
        ReplicatorConfig::Recombinant {
            recombination_probability: args.recombination_prob,
            breakpoint_probability: args.breakpoint_prob,
            hotspots: Vec::new(),
        }
    } else {
        ReplicatorConfig::Clonal
    };

    let fitness = if args.selection > 0.0 {
        vec![FitnessConfig::Purifying {
            feature: "genome".to_string(),
            selection_coefficient: Some(args.selection),
            table: None,
        }]
    } else {
        Vec::new()
    };

    Configuration {
        seed: args.seed,
        population: PopulationConfig {
            initial_size: args.population_size,
            size_model: None,
        },
        genome: GenomeConfig {
            sequence: None,
            random_length: Some(args.genome_length),
            storage: if args.diff_storage {
                StorageKind::Diff
            } else {
                StorageKind::Full
            },
            features: Vec::new(),
        },
        fitness,
        mutator: Some(MutatorConfig {
            substitution_rate: args.mutation_rate,
            transition_bias: args.transition_bias,
            indel,
        }),
        replicator,
        epochs: vec![EpochConfig {
            name: Some("main".to_string()),
            generations: args.generations,
            mutator: None,
            replicator: None,
            size_model: None,
        }],
        sampling: SamplingConfig {
            interval: args.sample_every,
            ..SamplingConfig::default()
        },
    }
}
