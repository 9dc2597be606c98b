use santa_sim::simulation::{
    Configuration, FitnessConfig, Population, ReplicatorConfig, RunSummary,
};

/// `seed` is the seed actually in use, when one has been drawn.
pub fn print_parameters(config: &Configuration, seed: Option<u64>) {
    println!("\n📋 Simulation Configuration");
    println!("  • Initial Population: {}", config.population.initial_size);
    if let Some(model) = &config.population.size_model {
        println!("  • Size Model: {model:?}");
    }
    println!(
        "  • Generations: {} in {} epoch(s)",
        config.total_generations(),
        config.epochs.len()
    );
    match (config.seed, seed) {
        (Some(seed), _) => println!("  • Random Seed: {seed} [--seed]"),
        (None, Some(seed)) => println!("  • Random Seed: {seed} (drawn) [--seed]"),
        (None, None) => println!("  • Random Seed: Random [--seed]"),
    }

    println!("\n🧬 Genome");
    match (&config.genome.sequence, config.genome.random_length) {
        (Some(sequence), _) => println!("  • Founder: {} bp from configuration", sequence.len()),
        (None, Some(length)) => println!("  • Founder: random, {length} bp"),
        (None, None) => println!("  • Founder: unspecified"),
    }
    println!("  • Storage: {:?}", config.genome.storage);
    for feature in &config.genome.features {
        println!(
            "  • Feature {}: {:?}, {} fragment(s)",
            feature.name,
            feature.feature_type,
            feature.fragments.len()
        );
    }

    println!("\n⚡ Mutation Parameters");
    match &config.mutator {
        Some(mutator) => {
            println!("  • Substitution Rate: {:.2e} /site/gen", mutator.substitution_rate);
            println!("  • Transition Bias: {:.2}", mutator.transition_bias);
            if let Some(indel) = &mutator.indel {
                println!("  • Indel Model: Enabled");
                println!("    - Insertion Rate: {:.2e}", indel.insertion_rate);
                println!("    - Deletion Rate: {:.2e}", indel.deletion_rate);
                println!(
                    "    - Length Param (p): {:.2} (mean len ~{:.1} bp)",
                    indel.length_p,
                    1.0 / indel.length_p
                );
            } else {
                println!("  • Indel Model: Disabled");
            }
        }
        None => println!("  • No mutation"),
    }

    println!("\n🔀 Replication");
    match &config.replicator {
        ReplicatorConfig::Clonal => println!("  • Clonal"),
        ReplicatorConfig::Recombinant {
            recombination_probability,
            breakpoint_probability,
            hotspots,
        } => {
            println!("  • Recombination Probability: {recombination_probability:.2}");
            println!("  • Breakpoint Probability: {breakpoint_probability:.2e} /site");
            if !hotspots.is_empty() {
                println!("  • Hotspots: {}", hotspots.len());
            }
        }
    }

    println!("\n🎯 Fitness & Selection");
    if config.fitness.is_empty() {
        println!("  • Regime: Neutral Evolution (No Selection)");
    } else {
        for factor in &config.fitness {
            match factor {
                FitnessConfig::Neutral => println!("    - Neutral"),
                FitnessConfig::Purifying {
                    feature,
                    selection_coefficient,
                    ..
                } => match selection_coefficient {
                    Some(s) => println!("    - Purifying on {feature}: s={s:.3}"),
                    None => println!("    - Purifying on {feature}: explicit table"),
                },
                FitnessConfig::Fluctuating {
                    feature,
                    selection_coefficient,
                    change_probability,
                } => println!(
                    "    - Fluctuating on {feature}: s={selection_coefficient:.3}, p={change_probability:.2e}"
                ),
                FitnessConfig::Signature {
                    feature,
                    sites,
                    policy,
                } => println!("    - Signature on {feature} ({} sites): {policy:?}", sites.len()),
                FitnessConfig::PopulationSize { carrying_capacity } => {
                    println!("    - Population size: K={carrying_capacity}")
                }
            }
        }
    }
    println!();
}

pub fn print_summary(summary: &RunSummary, population: &Population) {
    println!("\n📊 Final Population");
    println!("  • Generations Run: {}", summary.generations);
    println!("  • Epochs Completed: {}", summary.epochs_completed);
    println!("  • Size: {}", summary.final_size);
    if summary.extinct {
        println!("  • Population went extinct");
        return;
    }
    println!(
        "  • Unique Genomes: {}",
        population.pool().unique_genome_count()
    );
    println!("  • Mean Fitness: {:.6}", population.mean_fitness());
    println!(
        "  • Fitness Range: [{:.6}, {:.6}]",
        population.min_fitness(),
        population.max_fitness()
    );
    println!("  • Mean Distance: {:.4}", population.mean_distance());
    println!("  • Diversity: {:.4}", population.diversity());
}
