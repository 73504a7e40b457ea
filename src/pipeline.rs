//! The extraction run: locate the bundle, read its tests, aggregate each
//! test's metrics and label them.

use crate::aggregate::{self, AggregateError};
use crate::config::{ConfigError, ExtractConfig};
use crate::flags::{self, FlagError, XcodebuildFlags};
use crate::locate::{self, LocateError};
use crate::output::OutputError;
use crate::reader::{self, ReadError};
use crate::record::{MetricRecord, ResultSet};
use crate::xcresulttool::{ResultSource, ToolError};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Decide which bundle to read.
///
/// An explicit `-resultBundlePath` is used as-is. Otherwise `-project` and
/// `-scheme` are required and the newest matching bundle in DerivedData wins.
pub fn resolve_bundle(
    flags: &XcodebuildFlags,
    config: &ExtractConfig,
) -> Result<PathBuf, PipelineError> {
    if let Some(path) = flags.result_bundle_path() {
        tracing::debug!(path, "using result bundle path from flags");
        return Ok(PathBuf::from(path));
    }

    let project_path = flags.project().ok_or(FlagError::Missing {
        flag: flags::PROJECT,
    })?;
    let project = flags::project_from_project_path(project_path)?;
    let scheme = flags.scheme().ok_or(FlagError::Missing {
        flag: flags::SCHEME,
    })?;
    let root = config.derived_data.resolved_root();
    Ok(locate::find_xcresult_path(&root, &project, scheme)?)
}

/// Read every test in `bundle` and label its fields with `labels`.
///
/// Progress goes to `out`: the test count, then for each test its
/// `device,fields` line and the labelled record.
pub fn extract<S: AsRef<str>>(
    source: &dyn ResultSource,
    bundle: &Path,
    labels: &[S],
    out: &mut dyn Write,
) -> Result<ResultSet, PipelineError> {
    let root = source.get(bundle, None)?;
    let test_id = reader::find_test_id(&root)?;
    let tests_count = reader::find_test_count(&root)?;
    writeln!(out, "Number of Tests={tests_count}")?;

    let device = reader::find_device_info(&root)?;
    let summary_ids = reader::find_summary_ids(source, bundle, &test_id, tests_count)?;

    let mut results = ResultSet::new(device);
    for summary_id in &summary_ids {
        let log = aggregate::export_log(source, bundle, summary_id)?;
        writeln!(out, "{},{log}", results.device_model)?;

        let record = MetricRecord::from_log_line(labels, &log);
        if record.is_empty() {
            tracing::warn!(summary_id = %summary_id, "test summary produced no fields");
        }
        tracing::debug!(
            test = record.fields().first().map_or("", |(_, v)| v.as_str()),
            fields = record.len(),
            "aggregated test"
        );
        writeln!(out, "{record}")?;
        results.push(record);
    }

    Ok(results)
}

/// Any failure of a run. None are recovered from.
#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigError),
    Flag(FlagError),
    Locate(LocateError),
    Tool(ToolError),
    Read(ReadError),
    Aggregate(AggregateError),
    Output(OutputError),
    Io(std::io::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Config(e) => write!(f, "{e}"),
            PipelineError::Flag(e) => write!(f, "{e}"),
            PipelineError::Locate(e) => write!(f, "{e}"),
            PipelineError::Tool(e) => write!(f, "{e}"),
            PipelineError::Read(e) => write!(f, "{e}"),
            PipelineError::Aggregate(e) => write!(f, "{e}"),
            PipelineError::Output(e) => write!(f, "{e}"),
            PipelineError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for PipelineError {
    // The wrapped error's message is already shown, so skip to its cause.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Config(e) => std::error::Error::source(e),
            PipelineError::Flag(e) => std::error::Error::source(e),
            PipelineError::Locate(e) => std::error::Error::source(e),
            PipelineError::Tool(e) => std::error::Error::source(e),
            PipelineError::Read(e) => std::error::Error::source(e),
            PipelineError::Aggregate(e) => std::error::Error::source(e),
            PipelineError::Output(e) => std::error::Error::source(e),
            PipelineError::Io(e) => std::error::Error::source(e),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(e: ConfigError) -> Self {
        PipelineError::Config(e)
    }
}

impl From<FlagError> for PipelineError {
    fn from(e: FlagError) -> Self {
        PipelineError::Flag(e)
    }
}

impl From<LocateError> for PipelineError {
    fn from(e: LocateError) -> Self {
        PipelineError::Locate(e)
    }
}

impl From<ToolError> for PipelineError {
    fn from(e: ToolError) -> Self {
        PipelineError::Tool(e)
    }
}

impl From<ReadError> for PipelineError {
    fn from(e: ReadError) -> Self {
        PipelineError::Read(e)
    }
}

impl From<AggregateError> for PipelineError {
    fn from(e: AggregateError) -> Self {
        PipelineError::Aggregate(e)
    }
}

impl From<OutputError> for PipelineError {
    fn from(e: OutputError) -> Self {
        PipelineError::Output(e)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Io(e)
    }
}
