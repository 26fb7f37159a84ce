use log::{debug, warn};
use winnow::ascii::space1;
use winnow::combinator::separated;
use winnow::error::{StrContext, StrContextValue};
use winnow::token::take_while;
use winnow::{ModalResult, Parser};

pub const PROGRAM_MARKER: &str = "program: ";

pub type FrameCount = u32;

#[derive(Debug)]
pub enum ExperimentParseError {
    /// the text ends before the frame-count line
    MissingFrameCounts,
    MissingContext { line: usize, missing: Context },
    MalformedRow { line: usize, message: String },
}

impl std::fmt::Display for ExperimentParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperimentParseError::MissingFrameCounts => {
                f.write_str("missing frame-count line (expected on line 2)")
            }
            ExperimentParseError::MissingContext { line, missing } => f.write_fmt(format_args!(
                "line {line}: data before any {missing} marker"
            )),
            ExperimentParseError::MalformedRow { line, message } => {
                f.write_fmt(format_args!("line {line}: malformed row\n{message}"))
            }
        }
    }
}

impl std::error::Error for ExperimentParseError {}

/// The marker a row or algorithm line was missing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Context {
    Program,
    Algorithm,
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Context::Program => f.write_str("program"),
            Context::Algorithm => f.write_str("algorithm"),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MetricSample {
    pub reads: u64,
    pub writes: u64,
    pub faults: u64,
}

impl MetricSample {
    pub const fn new(reads: u64, writes: u64, faults: u64) -> Self {
        Self {
            reads,
            writes,
            faults,
        }
    }

    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Reads => self.reads,
            Metric::Writes => self.writes,
            Metric::Faults => self.faults,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Metric {
    Reads,
    Writes,
    Faults,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Reads, Metric::Writes, Metric::Faults];
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Reads => f.write_str("disk reads"),
            Metric::Writes => f.write_str("disk writes"),
            Metric::Faults => f.write_str("page faults"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmSeries {
    name: String,
    runs: Vec<(FrameCount, MetricSample)>,
}

impl AlgorithmSeries {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs in order of appearance, each labelled with its frame count.
    pub fn runs(&self) -> &[(FrameCount, MetricSample)] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn points(&self, metric: Metric) -> impl Iterator<Item = (FrameCount, u64)> + Clone + '_ {
        self.runs
            .iter()
            .map(move |(frames, sample)| (*frames, sample.get(metric)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramResults {
    name: String,
    algorithms: Vec<AlgorithmSeries>,
}

impl ProgramResults {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            algorithms: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithms(&self) -> &[AlgorithmSeries] {
        &self.algorithms
    }

    pub fn algorithm(&self, name: &str) -> Option<&AlgorithmSeries> {
        self.algorithms.iter().find(|series| series.name == name)
    }

    /// Opens (or reopens, discarding its runs) the series of `name`.
    pub(crate) fn open_algorithm(&mut self, name: &str) -> usize {
        match self.algorithms.iter().position(|series| series.name == name) {
            Some(idx) => {
                self.algorithms[idx].runs.clear();
                idx
            }
            None => {
                self.algorithms.push(AlgorithmSeries {
                    name: name.to_string(),
                    runs: Vec::new(),
                });
                self.algorithms.len() - 1
            }
        }
    }

    pub(crate) fn push_run(&mut self, algorithm: usize, frames: FrameCount, sample: MetricSample) {
        self.algorithms[algorithm].runs.push((frames, sample));
    }

    fn is_balanced(&self) -> bool {
        self.algorithms
            .windows(2)
            .all(|pair| pair[0].len() == pair[1].len())
    }
}

/// Results of one experiment log: program -> algorithm -> runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    header: String,
    frame_counts: Vec<FrameCount>,
    programs: Vec<ProgramResults>,
}

impl ResultTable {
    pub(crate) fn new(header: &str, frame_counts: Vec<FrameCount>) -> Self {
        Self {
            header: header.to_string(),
            frame_counts,
            programs: Vec::new(),
        }
    }

    /// The first line of the log, kept verbatim and never interpreted.
    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn frame_counts(&self) -> &[FrameCount] {
        &self.frame_counts
    }

    pub fn programs(&self) -> &[ProgramResults] {
        &self.programs
    }

    pub fn program(&self, name: &str) -> Option<&ProgramResults> {
        self.programs.iter().find(|program| program.name == name)
    }

    /// A redeclared program is replaced in place and keeps its position.
    pub(crate) fn open_program(&mut self, name: &str) -> usize {
        match self.programs.iter().position(|program| program.name == name) {
            Some(idx) => {
                self.programs[idx] = ProgramResults::new(name);
                idx
            }
            None => {
                self.programs.push(ProgramResults::new(name));
                self.programs.len() - 1
            }
        }
    }

    pub(crate) fn program_mut(&mut self, idx: usize) -> &mut ProgramResults {
        &mut self.programs[idx]
    }

    fn frame_label(&self, cursor: usize) -> FrameCount {
        self.frame_counts[cursor % self.frame_counts.len()]
    }
}

impl std::fmt::Display for ResultTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.header)?;
        let frame_counts = self
            .frame_counts
            .iter()
            .map(FrameCount::to_string)
            .collect::<Vec<_>>();
        writeln!(f, "{}", frame_counts.join(" "))?;

        for program in &self.programs {
            writeln!(f, "{PROGRAM_MARKER}{}", program.name)?;
            for series in &program.algorithms {
                writeln!(f, "{}", series.name)?;
                for (_, sample) in &series.runs {
                    writeln!(f, "{} {} {}", sample.reads, sample.writes, sample.faults)?;
                }
            }
        }

        Ok(())
    }
}

/// Parser position after the last consumed line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
    program: Option<usize>,
    algorithm: Option<usize>,
    cursor: usize,
}

impl ParseState {
    /// Number of data rows consumed so far, which is also the position in the frame-count cycle.
    pub fn rows(&self) -> usize {
        self.cursor
    }

    pub fn current_program<'t>(&self, table: &'t ResultTable) -> Option<&'t ProgramResults> {
        self.program.and_then(|idx| table.programs.get(idx))
    }

    pub fn current_algorithm<'t>(&self, table: &'t ResultTable) -> Option<&'t AlgorithmSeries> {
        let program = self.current_program(table)?;
        self.algorithm.and_then(|idx| program.algorithms.get(idx))
    }

    fn advance<S: AsRef<str>>(
        &mut self,
        table: &mut ResultTable,
        algorithms: &[S],
        line: usize,
        text: &str,
    ) -> Result<(), ExperimentParseError> {
        if let Some(name) = text.strip_prefix(PROGRAM_MARKER) {
            let name = name.trim();
            debug!("line {line}: program '{name}'");
            self.program = Some(table.open_program(name));
            self.algorithm = None;
        } else if algorithms.iter().any(|algorithm| algorithm.as_ref() == text) {
            let program = self.program.ok_or(ExperimentParseError::MissingContext {
                line,
                missing: Context::Program,
            })?;
            debug!("line {line}: algorithm '{text}'");
            self.algorithm = Some(table.program_mut(program).open_algorithm(text));
        } else {
            let program = self.program.ok_or(ExperimentParseError::MissingContext {
                line,
                missing: Context::Program,
            })?;
            let algorithm = self.algorithm.ok_or(ExperimentParseError::MissingContext {
                line,
                missing: Context::Algorithm,
            })?;
            let sample = metric_row
                .parse(text)
                .map_err(|e| ExperimentParseError::MalformedRow {
                    line,
                    message: e.to_string(),
                })?;

            let frames = table.frame_label(self.cursor);
            table.program_mut(program).push_run(algorithm, frames, sample);
            self.cursor += 1;
        }

        Ok(())
    }
}

pub fn parse<S: AsRef<str>>(
    text: &str,
    algorithms: &[S],
) -> Result<ResultTable, ExperimentParseError> {
    parse_with_state(text, algorithms).map(|(table, _)| table)
}

/// Parses an experiment log in a single forward pass.
///
/// Line 1 is an opaque header, line 2 the frame-count cycle. Every later
/// non-blank line is a program marker, an algorithm marker (one of
/// `algorithms`) or a `reads writes faults` row. Rows are labelled with
/// `frame_counts[i % frame_counts.len()]`, where `i` counts rows from the
/// start of the file, regardless of program or algorithm.
pub fn parse_with_state<S: AsRef<str>>(
    text: &str,
    algorithms: &[S],
) -> Result<(ResultTable, ParseState), ExperimentParseError> {
    let mut lines = text.lines().enumerate().map(|(idx, line)| (idx + 1, line));

    let (Some((_, header)), Some((frames_line, frames_text))) = (lines.next(), lines.next()) else {
        return Err(ExperimentParseError::MissingFrameCounts);
    };

    let frame_counts = frame_count_cycle
        .parse(frames_text.trim())
        .map_err(|e| ExperimentParseError::MalformedRow {
            line: frames_line,
            message: e.to_string(),
        })?;

    let mut table = ResultTable::new(header.trim_end(), frame_counts);
    let mut state = ParseState::default();
    for (line, text) in lines {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        state.advance(&mut table, algorithms, line, text)?;
    }

    for program in table.programs.iter().filter(|program| !program.is_balanced()) {
        let lengths = program
            .algorithms
            .iter()
            .map(|series| format!("{}={}", series.name, series.len()))
            .collect::<Vec<_>>();
        warn!(
            "program '{}' has series of different lengths: {}",
            program.name,
            lengths.join(", ")
        );
    }

    Ok((table, state))
}

fn frame_count_cycle(input: &mut &str) -> ModalResult<Vec<FrameCount>> {
    separated(1.., frame_count, space1)
        .context(StrContext::Label("frame counts"))
        .parse_next(input)
}

fn frame_count(input: &mut &str) -> ModalResult<FrameCount> {
    take_while(1.., '0'..='9')
        .try_map(str::parse::<FrameCount>)
        .verify(|frames: &FrameCount| *frames > 0)
        .context(StrContext::Label("frame count"))
        .context(StrContext::Expected(StrContextValue::Description(
            "a positive integer",
        )))
        .parse_next(input)
}

fn metric_row(input: &mut &str) -> ModalResult<MetricSample> {
    (
        counter.context(StrContext::Label("disk reads")),
        space1,
        counter.context(StrContext::Label("disk writes")),
        space1,
        counter.context(StrContext::Label("page faults")),
    )
        .map(|(reads, _, writes, _, faults)| MetricSample::new(reads, writes, faults))
        .parse_next(input)
}

fn counter(input: &mut &str) -> ModalResult<u64> {
    take_while(1.., '0'..='9')
        .try_map(str::parse::<u64>)
        .context(StrContext::Expected(StrContextValue::Description(
            "a non-negative integer",
        )))
        .parse_next(input)
}

#[cfg(test)]
mod test {
    use super::*;

    const ALGORITHMS: [&str; 3] = ["rand", "fifo", "custom"];

    #[test]
    fn test_cursor_continues_across_algorithms() {
        let text = "header\n5 10\nprogram: sort\nrand\n1 2 3\n4 5 6\nfifo\n7 8 9\n";
        let table = parse(text, &ALGORITHMS).unwrap();

        let sort = table.program("sort").unwrap();
        assert_eq!(
            sort.algorithm("rand").unwrap().runs(),
            &[(5, MetricSample::new(1, 2, 3)), (10, MetricSample::new(4, 5, 6))]
        );
        assert_eq!(
            sort.algorithm("fifo").unwrap().runs(),
            &[(5, MetricSample::new(7, 8, 9))]
        );
    }

    #[test]
    fn test_cursor_is_global_across_programs() {
        let text = r#"runs
            2 4 8
            program: scan
            rand
            1 1 1
            2 2 2
            program: focus
            rand
            3 3 3
            4 4 4
            custom
            5 5 5
        "#;
        let (table, state) = parse_with_state(text, &ALGORITHMS).unwrap();
        assert_eq!(state.rows(), 5);

        let labels = table
            .programs()
            .iter()
            .flat_map(|program| program.algorithms())
            .flat_map(|series| series.runs().iter().map(|(frames, _)| *frames))
            .collect::<Vec<_>>();
        assert_eq!(labels, vec![2, 4, 8, 2, 4]);

        let order = table
            .programs()
            .iter()
            .map(ProgramResults::name)
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["scan", "focus"]);
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let text = "\n  3   6  \n\nprogram: sort  \n\n  custom \n 10\t20   30 \n\n";
        let (table, state) = parse_with_state(text, &ALGORITHMS).unwrap();

        assert_eq!(table.header(), "");
        assert_eq!(table.frame_counts(), &[3, 6]);
        assert_eq!(
            table.program("sort").unwrap().algorithm("custom").unwrap().runs(),
            &[(3, MetricSample::new(10, 20, 30))]
        );
        assert_eq!(state.current_program(&table).unwrap().name(), "sort");
        assert_eq!(state.current_algorithm(&table).unwrap().name(), "custom");
    }

    #[test]
    fn test_row_before_algorithm() {
        let err = parse("header\n5 10\nprogram: sort\n1 2 3\n", &ALGORITHMS).unwrap_err();
        assert!(matches!(
            err,
            ExperimentParseError::MissingContext {
                line: 4,
                missing: Context::Algorithm
            }
        ));
    }

    #[test]
    fn test_row_before_program() {
        let err = parse("header\n5 10\n1 2 3\n", &ALGORITHMS).unwrap_err();
        assert!(matches!(
            err,
            ExperimentParseError::MissingContext {
                line: 3,
                missing: Context::Program
            }
        ));

        let err = parse("header\n5 10\nfifo\n1 2 3\n", &ALGORITHMS).unwrap_err();
        assert!(matches!(
            err,
            ExperimentParseError::MissingContext {
                line: 3,
                missing: Context::Program
            }
        ));
    }

    #[test]
    fn test_new_program_needs_its_own_algorithm() {
        let text = "header\n5\nprogram: sort\nrand\n1 2 3\nprogram: scan\n4 5 6\n";
        let err = parse(text, &ALGORITHMS).unwrap_err();
        assert!(matches!(
            err,
            ExperimentParseError::MissingContext {
                line: 7,
                missing: Context::Algorithm
            }
        ));
    }

    #[test]
    fn test_malformed_rows() {
        for row in ["1 2", "1 2 3 4", "1 two 3", "-1 2 3", "lru"] {
            let text = format!("header\n5 10\nprogram: sort\nrand\n{row}\n");
            let err = parse(&text, &ALGORITHMS).unwrap_err();
            assert!(
                matches!(err, ExperimentParseError::MalformedRow { line: 5, .. }),
                "row '{row}' gave {err:?}"
            );
        }
    }

    #[test]
    fn test_program_marker_must_start_the_line() {
        let text = "header\n5\nprogram: sort\nrand\n1 2 3\n# program: scan\n";
        let err = parse(text, &ALGORITHMS).unwrap_err();
        assert!(matches!(err, ExperimentParseError::MalformedRow { line: 6, .. }));

        let table = parse("header\n5\n   program: scan  \nrand\n1 2 3\n", &ALGORITHMS).unwrap();
        assert!(table.program("scan").is_some());
    }

    #[test]
    fn test_malformed_frame_counts() {
        for frames in ["", "5 x 10", "5 0", "5,10"] {
            let text = format!("header\n{frames}\nprogram: sort\n");
            let err = parse(&text, &ALGORITHMS).unwrap_err();
            assert!(
                matches!(err, ExperimentParseError::MalformedRow { line: 2, .. }),
                "frame counts '{frames}' gave {err:?}"
            );
        }

        assert!(matches!(
            parse("header only", &ALGORITHMS).unwrap_err(),
            ExperimentParseError::MissingFrameCounts
        ));
    }

    #[test]
    fn test_algorithm_set_is_a_parameter() {
        let text = "header\n1 2\nprogram: sort\nlru\n1 2 3\nclock\n4 5 6\n";
        let table = parse(text, &["lru", "clock"]).unwrap();
        let sort = table.program("sort").unwrap();
        assert_eq!(sort.algorithm("lru").unwrap().len(), 1);
        assert_eq!(sort.algorithm("clock").unwrap().runs()[0].0, 2);

        assert!(parse(text, &ALGORITHMS).is_err());
    }

    #[test]
    fn test_redeclared_program_is_replaced() {
        let text = "h\n4\nprogram: sort\nrand\n1 1 1\nprogram: scan\nrand\n2 2 2\nprogram: sort\nfifo\n3 3 3\n";
        let table = parse(text, &ALGORITHMS).unwrap();

        assert_eq!(table.programs()[0].name(), "sort");
        let sort = table.program("sort").unwrap();
        assert!(sort.algorithm("rand").is_none());
        assert_eq!(sort.algorithm("fifo").unwrap().len(), 1);
    }

    #[test]
    fn test_display_parses_back() {
        let text = "npages 100\n10 20\nprogram: sort\nrand\n1 2 3\n4 5 6\nfifo\n7 8 9\n10 11 12\n";
        let table = parse(text, &ALGORITHMS).unwrap();

        assert_eq!(table.to_string(), text);
        assert_eq!(parse(&table.to_string(), &ALGORITHMS).unwrap(), table);
        assert_eq!(parse(text, &ALGORITHMS).unwrap(), table);
    }

    #[test]
    fn test_points() {
        let table = parse("h\n5 10\nprogram: sort\nrand\n1 2 3\n4 5 6\n", &ALGORITHMS).unwrap();
        let rand = table.program("sort").unwrap().algorithm("rand").unwrap();

        assert_eq!(rand.points(Metric::Writes).collect::<Vec<_>>(), vec![(5, 2), (10, 5)]);
        assert_eq!(rand.points(Metric::Faults).collect::<Vec<_>>(), vec![(5, 3), (10, 6)]);
    }
}
