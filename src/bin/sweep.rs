use anyhow::Context;
use env_logger::Env;
use log::info;
use vm_plot::config::{DEFAULT_DATA_FILE, SweepConfig};
use vm_plot::virtmem;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string());

    let config = SweepConfig::default();
    let table = virtmem::sweep(&config)?;

    std::fs::write(&output, table.to_string())
        .with_context(|| format!("failed to write {output}"))?;
    info!("wrote {output}");

    Ok(())
}
