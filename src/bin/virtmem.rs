use anyhow::Context;
use env_logger::Env;
use vm_plot::virtmem::{self, Algorithm, Program, SimulationParams};

const PAGE_SIZE: usize = 4096;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let [npages, nframes, algorithm, program] = args.as_slice() else {
        println!("use: virtmem <npages> <nframes> <rand|fifo|custom> <sort|scan|focus>");
        std::process::exit(1);
    };

    let params = SimulationParams {
        npages: npages
            .parse()
            .with_context(|| format!("invalid page count '{npages}'"))?,
        nframes: nframes
            .parse()
            .with_context(|| format!("invalid frame count '{nframes}'"))?,
        page_size: PAGE_SIZE,
        algorithm: algorithm.parse::<Algorithm>()?,
        program: program.parse::<Program>()?,
        seed: 0,
    };

    let stats = virtmem::simulate(&params)?;
    println!("{} {} {}", stats.reads, stats.writes, stats.faults);

    Ok(())
}
