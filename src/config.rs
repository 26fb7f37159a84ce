use std::path::PathBuf;

use crate::experiment::FrameCount;
use crate::virtmem::{Algorithm, Program};

pub const DEFAULT_DATA_FILE: &str = "experiment_data";
pub const DEFAULT_ALGORITHMS: [&str; 3] = ["rand", "fifo", "custom"];
pub const DEFAULT_PROGRAMS: [&str; 3] = ["sort", "scan", "focus"];

/// Where to read the experiment log from and which charts to draw.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub data_file: PathBuf,
    pub algorithms: Vec<String>,
    /// programs that get a chart, other programs in the log are parsed but not drawn
    pub programs: Vec<String>,
    pub output_dir: PathBuf,
    pub size: (u32, u32),
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            algorithms: DEFAULT_ALGORITHMS.map(String::from).to_vec(),
            programs: DEFAULT_PROGRAMS.map(String::from).to_vec(),
            output_dir: PathBuf::from("."),
            size: (1024, 768),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub npages: usize,
    pub page_size: usize,
    pub frame_counts: Vec<FrameCount>,
    pub algorithms: Vec<Algorithm>,
    pub programs: Vec<Program>,
    pub seed: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            npages: 100,
            page_size: 4096,
            frame_counts: (1..=10).map(|step| step * 10).collect(),
            algorithms: Algorithm::ALL.to_vec(),
            programs: Program::ALL.to_vec(),
            seed: 0,
        }
    }
}
