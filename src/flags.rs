//! Extraction of the few interesting flags from an xcodebuild command-line.
//!
//! The tool is handed an entire xcodebuild invocation. Most of its flags say
//! nothing about where the result bundle lives, so only the names in
//! [`INTERESTING_FLAGS`] are kept.

use std::collections::BTreeMap;
use std::path::Path;

pub const PROJECT: &str = "-project";
pub const SCHEME: &str = "-scheme";
pub const RESULT_BUNDLE_PATH: &str = "-resultBundlePath";

/// Flags whose values are captured. Everything else is dropped.
pub const INTERESTING_FLAGS: &[&str] = &[RESULT_BUNDLE_PATH, SCHEME, PROJECT];

/// Extension of an Xcode project package.
const PROJECT_EXTENSION: &str = "xcodeproj";

/// Values of the recognized xcodebuild flags, keyed by flag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XcodebuildFlags {
    values: BTreeMap<&'static str, String>,
}

impl XcodebuildFlags {
    /// Scan `args` and capture the token directly after each recognized flag.
    ///
    /// Any other token starting with `-` ends the capture, so a recognized flag
    /// followed by another flag (or by nothing) contributes no value. When a
    /// flag repeats, the last value wins.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let mut values = BTreeMap::new();
        let mut key: Option<&'static str> = None;

        for arg in args {
            let arg = arg.as_ref();
            if arg.starts_with('-') {
                key = INTERESTING_FLAGS.iter().copied().find(|f| *f == arg);
            } else if let Some(k) = key.take() {
                values.insert(k, arg.to_string());
            }
        }

        Self { values }
    }

    pub fn get(&self, flag: &str) -> Option<&str> {
        self.values.get(flag).map(String::as_str)
    }

    pub fn project(&self) -> Option<&str> {
        self.get(PROJECT)
    }

    pub fn scheme(&self) -> Option<&str> {
        self.get(SCHEME)
    }

    pub fn result_bundle_path(&self) -> Option<&str> {
        self.get(RESULT_BUNDLE_PATH)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Extract the project name from the path to a `.xcodeproj`.
///
/// `Client/Example/Client.xcodeproj` yields `Client`.
pub fn project_from_project_path(path: &str) -> Result<String, FlagError> {
    let p = Path::new(path);
    let is_project = p
        .extension()
        .is_some_and(|ext| ext == PROJECT_EXTENSION);
    let stem = p.file_stem().and_then(|s| s.to_str());

    match (is_project, stem) {
        (true, Some(stem)) => {
            tracing::debug!(project = stem, path, "using project from project path");
            Ok(stem.to_string())
        }
        _ => Err(FlagError::InvalidProjectPath {
            path: path.to_string(),
        }),
    }
}

/// Errors from interpreting the xcodebuild flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    /// The `-project` value is not a path to a `.xcodeproj`.
    InvalidProjectPath { path: String },
    /// A flag needed to locate the result bundle was not given.
    Missing { flag: &'static str },
}

impl std::fmt::Display for FlagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagError::InvalidProjectPath { path } => {
                write!(f, "{path} is not a valid project path")
            }
            FlagError::Missing { flag } => {
                write!(f, "missing required xcodebuild flag {flag}")
            }
        }
    }
}

impl std::error::Error for FlagError {}
