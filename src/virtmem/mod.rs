mod page_table;
mod policy;
mod program;

use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::SweepConfig;
use crate::experiment::{MetricSample, ResultTable};

pub use {
    page_table::{Mapping, PageTable, Protection, VirtualMemory},
    policy::{CustomPolicy, FifoPolicy, RandomPolicy, ReplacementPolicy},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    UnknownAlgorithm(String),
    UnknownProgram(String),
    InvalidParams(String),
}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::UnknownAlgorithm(name) => f.write_fmt(format_args!(
                "unknown paging algorithm '{name}' (expected rand, fifo or custom)"
            )),
            SimulationError::UnknownProgram(name) => f.write_fmt(format_args!(
                "unknown program '{name}' (expected sort, scan or focus)"
            )),
            SimulationError::InvalidParams(e) => f.write_fmt(format_args!("{e}")),
        }
    }
}

impl std::error::Error for SimulationError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Algorithm {
    Rand,
    Fifo,
    Custom,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Rand, Algorithm::Fifo, Algorithm::Custom];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Rand => "rand",
            Algorithm::Fifo => "fifo",
            Algorithm::Custom => "custom",
        }
    }

    pub fn policy(self, seed: u64) -> Box<dyn ReplacementPolicy> {
        match self {
            Algorithm::Rand => Box::new(RandomPolicy::new(seed)),
            Algorithm::Fifo => Box::new(FifoPolicy::default()),
            Algorithm::Custom => Box::new(CustomPolicy::new(seed)),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Algorithm {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == s)
            .ok_or_else(|| SimulationError::UnknownAlgorithm(s.to_string()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Program {
    Sort,
    Scan,
    Focus,
}

impl Program {
    pub const ALL: [Program; 3] = [Program::Sort, Program::Scan, Program::Focus];

    pub fn name(self) -> &'static str {
        match self {
            Program::Sort => "sort",
            Program::Scan => "scan",
            Program::Focus => "focus",
        }
    }

    /// Runs the workload and returns its checksum.
    pub fn run(self, memory: &mut VirtualMemory, rng: &mut StdRng) -> u64 {
        match self {
            Program::Sort => program::sort(memory, rng),
            Program::Scan => program::scan(memory),
            Program::Focus => program::focus(memory, rng),
        }
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Program {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Program::ALL
            .into_iter()
            .find(|program| program.name() == s)
            .ok_or_else(|| SimulationError::UnknownProgram(s.to_string()))
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SimulationParams {
    pub npages: usize,
    pub nframes: usize,
    pub page_size: usize,
    pub algorithm: Algorithm,
    pub program: Program,
    pub seed: u64,
}

/// Runs one program under one replacement policy and counts disk traffic.
pub fn simulate(params: &SimulationParams) -> Result<MetricSample, SimulationError> {
    let SimulationParams {
        npages,
        nframes,
        page_size,
        algorithm,
        program,
        seed,
    } = *params;

    if npages == 0 || nframes == 0 || page_size == 0 {
        return Err(SimulationError::InvalidParams(format!(
            "pages ({npages}), frames ({nframes}) and page size ({page_size}) must be positive"
        )));
    }

    let mut memory = VirtualMemory::new(npages, nframes, page_size, algorithm.policy(seed ^ 1));
    let mut rng = StdRng::seed_from_u64(seed);
    let checksum = program.run(&mut memory, &mut rng);

    let stats = memory.stats();
    debug!(
        "{program} result is {checksum} ({algorithm}, {npages} pages, {nframes} frames): {stats:?}"
    );
    Ok(stats)
}

/// Runs every program x algorithm x frame count and collects the results
/// in the same layout a parsed experiment log has.
pub fn sweep(config: &SweepConfig) -> Result<ResultTable, SimulationError> {
    if config.frame_counts.is_empty() {
        return Err(SimulationError::InvalidParams(
            "at least one frame count is required".to_string(),
        ));
    }

    let header = format!("npages {} page_size {}", config.npages, config.page_size);
    let mut table = ResultTable::new(&header, config.frame_counts.clone());

    for &program in &config.programs {
        let program_idx = table.open_program(program.name());
        for &algorithm in &config.algorithms {
            let algorithm_idx = table.program_mut(program_idx).open_algorithm(algorithm.name());
            for &frames in &config.frame_counts {
                let sample = simulate(&SimulationParams {
                    npages: config.npages,
                    nframes: frames as usize,
                    page_size: config.page_size,
                    algorithm,
                    program,
                    seed: config.seed,
                })?;
                info!(
                    "{program} / {algorithm} / {frames} frames: {} reads, {} writes, {} faults",
                    sample.reads, sample.writes, sample.faults
                );
                table
                    .program_mut(program_idx)
                    .push_run(algorithm_idx, frames, sample);
            }
        }
    }

    Ok(table)
}
