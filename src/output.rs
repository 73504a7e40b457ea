/// Writes the collected records to the data file, replacing any previous run.
use crate::record::ResultSet;
use std::path::{Path, PathBuf};

/// Write `results` to `path` as a list of dict literals, truncating the file.
pub fn write_data_file(path: &Path, results: &ResultSet) -> Result<(), OutputError> {
    std::fs::write(path, results.to_string()).map_err(|e| OutputError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(
        path = %path.display(),
        records = results.records.len(),
        "wrote data file"
    );
    Ok(())
}

/// Errors from writing the data file.
#[derive(Debug)]
pub enum OutputError {
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::Write { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::Write { source, .. } => Some(source),
        }
    }
}
