use std::path::PathBuf;

use log::info;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;

use crate::config::PlotConfig;
use crate::experiment::{FrameCount, Metric, ProgramResults, ResultTable};

const COLORS: [RGBColor; 3] = [BLUE, GREEN, RED];

#[derive(Debug)]
pub enum ChartError {
    UnknownProgram(String),
    MissingAlgorithm { program: String, algorithm: String },
    Drawing(String),
    Io(std::io::Error),
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::UnknownProgram(program) => {
                f.write_fmt(format_args!("program '{program}' not found in experiment data"))
            }
            ChartError::MissingAlgorithm { program, algorithm } => f.write_fmt(format_args!(
                "program '{program}' has no results for algorithm '{algorithm}'"
            )),
            ChartError::Drawing(e) => f.write_fmt(format_args!("failed to draw chart: {e}")),
            ChartError::Io(e) => f.write_fmt(format_args!("failed to write chart: {e}")),
        }
    }
}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChartError::Io(e) => Some(e),
            _ => None,
        }
    }
}

fn drawing_error<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> ChartError {
    ChartError::Drawing(e.to_string())
}

/// Fails on the first of `programs` the table never declared.
pub fn check_programs<S: AsRef<str>>(
    table: &ResultTable,
    programs: &[S],
) -> Result<(), ChartError> {
    match programs
        .iter()
        .find(|program| table.program(program.as_ref()).is_none())
    {
        Some(missing) => Err(ChartError::UnknownProgram(missing.as_ref().to_string())),
        None => Ok(()),
    }
}

/// Draws the chart of `program` to `<output_dir>/<program>.svg`.
pub fn render(
    table: &ResultTable,
    program: &str,
    config: &PlotConfig,
) -> Result<PathBuf, ChartError> {
    let results = table
        .program(program)
        .ok_or_else(|| ChartError::UnknownProgram(program.to_string()))?;

    std::fs::create_dir_all(&config.output_dir).map_err(ChartError::Io)?;
    let path = config.output_dir.join(format!("{program}.svg"));

    {
        let root = SVGBackend::new(&path, config.size).into_drawing_area();
        draw(
            &root,
            table.frame_counts(),
            results,
            config.algorithms.as_slice(),
        )?;
    }

    info!("wrote chart for '{program}' to {}", path.display());
    Ok(path)
}

/// Same chart as [`render`], returned as an SVG document.
pub fn render_to_string<S: AsRef<str>>(
    table: &ResultTable,
    program: &str,
    algorithms: &[S],
    size: (u32, u32),
) -> Result<String, ChartError> {
    let results = table
        .program(program)
        .ok_or_else(|| ChartError::UnknownProgram(program.to_string()))?;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw(&root, table.frame_counts(), results, algorithms)?;
    }
    Ok(svg)
}

fn draw<DB: DrawingBackend, S: AsRef<str>>(
    root: &DrawingArea<DB, Shift>,
    frame_counts: &[FrameCount],
    results: &ProgramResults,
    algorithms: &[S],
) -> Result<(), ChartError> {
    let series = algorithms
        .iter()
        .map(|algorithm| {
            results
                .algorithm(algorithm.as_ref())
                .ok_or_else(|| ChartError::MissingAlgorithm {
                    program: results.name().to_string(),
                    algorithm: algorithm.as_ref().to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // ranges stay non-empty even at u32::MAX / u64::MAX
    let x_end = frame_counts
        .iter()
        .max()
        .copied()
        .unwrap_or(0)
        .saturating_add(1);
    let x_start = frame_counts
        .iter()
        .min()
        .copied()
        .unwrap_or(0)
        .min(x_end - 1);
    let y_max = series
        .iter()
        .flat_map(|series| series.runs())
        .flat_map(|(_, sample)| Metric::ALL.map(|metric| sample.get(metric)))
        .max()
        .unwrap_or(0);

    root.fill(&WHITE).map_err(drawing_error)?;

    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("Reads, Writes, and Faults for {}", results.name()),
            ("sans-serif", 30),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            x_start..x_end,
            0u64..y_max.saturating_add(y_max / 10).saturating_add(1),
        )
        .map_err(drawing_error)?;

    chart
        .configure_mesh()
        .x_desc("frames")
        .y_desc("reads, writes, faults")
        .x_labels(frame_counts.len())
        .draw()
        .map_err(drawing_error)?;

    for (idx, series) in series.into_iter().enumerate() {
        let style = COLORS[idx % COLORS.len()].stroke_width(2);
        for metric in Metric::ALL {
            let points = series.points(metric);
            let annotation = match metric {
                Metric::Reads => chart.draw_series(DashedLineSeries::new(points, 3, 6, style)),
                Metric::Writes => chart.draw_series(DashedLineSeries::new(points, 10, 5, style)),
                Metric::Faults => chart.draw_series(LineSeries::new(points, style)),
            }
            .map_err(drawing_error)?;

            annotation
                .label(format!("{} {metric}", series.name()))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing_error)?;

    root.present().map_err(drawing_error)
}
