use std::path::PathBuf;

use anyhow::Context;
use env_logger::Env;
use log::info;
use vm_plot::chart;
use vm_plot::config::PlotConfig;
use vm_plot::experiment;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = PlotConfig::default();
    if let Some(filename) = std::env::args().nth(1) {
        config.data_file = PathBuf::from(filename);
    }

    let current_dir = std::env::current_dir().context("unable to get current directory")?;
    let data_file = current_dir.join(&config.data_file);
    let file_data = std::fs::read_to_string(&data_file)
        .with_context(|| format!("failed to read {}", data_file.display()))?;

    let table = experiment::parse(&file_data, config.algorithms.as_slice())
        .with_context(|| format!("failed to parse {}", data_file.display()))?;
    info!(
        "parsed {} programs over {} frame counts",
        table.programs().len(),
        table.frame_counts().len()
    );

    chart::check_programs(&table, config.programs.as_slice())?;
    for program in &config.programs {
        chart::render(&table, program, &config)?;
    }

    Ok(())
}
