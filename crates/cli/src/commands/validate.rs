use anyhow::{Context, Result};
use santa_sim::simulation::{Configuration, Simulation};
use std::path::Path;

use crate::printing::print_parameters;

pub fn validate_config(path: &Path) -> Result<()> {
    println!("🔍 Validating configuration: {}", path.display());

    if !path.exists() {
        anyhow::bail!("Configuration file does not exist");
    }

    let config = Configuration::from_path(path).context("Failed to parse configuration")?;
    let sim = Simulation::from_config(&config).context("Invalid configuration")?;

    print_parameters(&config, Some(sim.seed()));
    println!("✓ Configuration is valid");
    println!(
        "  {} generations, {} initial viruses, {} bp founder",
        config.total_generations(),
        sim.population().size(),
        sim.population().pool().master().len()
    );

    Ok(())
}
