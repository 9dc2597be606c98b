use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use santa_sim::simulation::{AlignmentSampler, Configuration, Simulation, StatisticsSampler};

use crate::args::RunArgs;
use crate::printing::{print_parameters, print_summary};

pub fn run_simulation(args: &RunArgs) -> Result<()> {
    println!("🧬 Santa - Running Simulation");
    println!("============================================\n");

    let mut config = Configuration::from_path(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(interval) = args.sample_every {
        config.sampling.interval = interval;
    }

    let mut sim = Simulation::from_config(&config).context("Invalid configuration")?;
    log::info!("loaded {} with seed {}", args.config.display(), sim.seed());
    print_parameters(&config, Some(sim.seed()));

    if let Some(path) = &args.stats {
        let sampler = StatisticsSampler::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        sim.add_sampler(Box::new(sampler));
    }
    if let Some(path) = &args.alignment {
        let size = args.sample_size.unwrap_or(config.sampling.sample_size);
        let sampler = AlignmentSampler::create(path, size)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        sim.add_sampler(Box::new(sampler));
    }

    let total_generations = sim.total_generations();
    println!("Running {total_generations} generations...");

    let pb = if args.progress {
        let pb = ProgressBar::new(total_generations as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {per_sec}",
                )?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let summary = sim
        .run_with(|_| {
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        })
        .context("Simulation aborted")?;

    if let Some(pb) = pb {
        pb.finish_with_message("Done");
    }

    print_summary(&summary, sim.population());
    println!("\n✓ Simulation complete!");
    if let Some(path) = &args.stats {
        println!("  Statistics: {}", path.display());
    }
    if let Some(path) = &args.alignment {
        println!("  Alignment: {}", path.display());
    }

    Ok(())
}
