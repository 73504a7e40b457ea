//! Navigation of the xcresult action tree.
//!
//! xcresulttool wraps scalars as `{"_value": ...}` and arrays as
//! `{"_values": [...]}`. Every lookup here goes through [`JsonPath`] so a
//! failed step reports the full path it was following.

use crate::xcresulttool::{ResultSource, ToolError};
use serde_json::Value;
use std::path::Path;

/// Step-by-step lookup that remembers where it has been.
struct JsonPath<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> JsonPath<'a> {
    fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: "$".to_string(),
        }
    }

    fn key(self, key: &str) -> Result<Self, ReadError> {
        let path = format!("{}.{key}", self.path);
        match self.value.get(key) {
            Some(value) => Ok(Self { value, path }),
            None => Err(ReadError::Shape { path }),
        }
    }

    /// The `_values` array under the current node.
    fn values(self) -> Result<(&'a [Value], String), ReadError> {
        let next = self.key("_values")?;
        match next.value.as_array() {
            Some(arr) => Ok((arr.as_slice(), next.path)),
            None => Err(ReadError::Shape { path: next.path }),
        }
    }

    fn index(self, i: usize) -> Result<Self, ReadError> {
        let (arr, path) = self.values()?;
        let path = format!("{path}[{i}]");
        match arr.get(i) {
            Some(value) => Ok(Self { value, path }),
            None => Err(ReadError::Shape { path }),
        }
    }

    fn last(self) -> Result<Self, ReadError> {
        let (arr, path) = self.values()?;
        let path = format!("{path}[-1]");
        match arr.last() {
            Some(value) => Ok(Self { value, path }),
            None => Err(ReadError::Shape { path }),
        }
    }

    /// The `_value` scalar under the current node, as text.
    fn scalar(self) -> Result<String, ReadError> {
        let next = self.key("_value")?;
        match next.value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(ReadError::Shape { path: next.path }),
        }
    }
}

/// Model identifier of the device the last action ran on
/// (e.g. `com.apple.iphone-15-pro`).
pub fn find_device_info(root: &Value) -> Result<String, ReadError> {
    JsonPath::root(root)
        .key("actions")
        .and_then(JsonPath::last)
        .and_then(|a| a.key("runDestination"))
        .and_then(|a| a.key("targetDeviceRecord"))
        .and_then(|a| a.key("modelUTI"))
        .and_then(JsonPath::scalar)
        .map_err(|e| e.missing("device info"))
}

/// Id of the last action's test output, suitable for `get --id`.
pub fn find_test_id(root: &Value) -> Result<String, ReadError> {
    let id = JsonPath::root(root)
        .key("actions")
        .and_then(JsonPath::last)
        .and_then(|a| a.key("actionResult"))
        .and_then(|a| a.key("testsRef"))
        .and_then(|a| a.key("id"))
        .and_then(JsonPath::scalar)
        .map_err(|e| e.missing("test id"))?;
    tracing::debug!(test_id = %id, "using test id");
    Ok(id)
}

/// Total number of tests reported for the bundle.
pub fn find_test_count(root: &Value) -> Result<usize, ReadError> {
    let raw = JsonPath::root(root)
        .key("metrics")?
        .key("testsCount")?
        .scalar()?;
    let count = raw
        .trim()
        .parse::<usize>()
        .map_err(|_| ReadError::InvalidCount { value: raw.clone() })?;
    tracing::debug!(count, "using subtest count");
    Ok(count)
}

/// The subtests of a test plan launched from the xcodebuild command-line.
///
/// This is a fixed path: first summary, first testable, then three levels of
/// first-subtest down to the individual tests. Runs started from the Xcode UI
/// put the performance suite elsewhere (e.g. at index 40 of the second level),
/// and plans with several suites need to iterate the second level. Neither is
/// handled; anything not shaped like this fails with a [`ReadError::Shape`].
pub fn command_line_subtests(tests_doc: &Value) -> Result<&[Value], ReadError> {
    let (subtests, _) = JsonPath::root(tests_doc)
        .key("summaries")?
        .index(0)?
        .key("testableSummaries")?
        .index(0)?
        .key("tests")?
        .index(0)?
        .key("subtests")?
        .index(0)?
        .key("subtests")?
        .index(0)?
        .key("subtests")?
        .values()?;
    Ok(subtests)
}

/// Summary ids of the first `count` tests in the run.
///
/// Fails if fewer than `count` tests are present.
pub fn find_summary_ids(
    source: &dyn ResultSource,
    bundle: &Path,
    test_id: &str,
    count: usize,
) -> Result<Vec<String>, ReadError> {
    let doc = source.get(bundle, Some(test_id))?;
    if count == 0 {
        return Ok(Vec::new());
    }
    let subtests = command_line_subtests(&doc)?;

    let mut ids = Vec::with_capacity(count);
    for (i, test) in subtests.iter().take(count).enumerate() {
        let id = JsonPath {
            value: test,
            path: format!("$..subtests._values[{i}]"),
        }
        .key("summaryRef")?
        .key("id")?
        .scalar()?;
        ids.push(id);
    }

    if ids.len() < count {
        return Err(ReadError::Shape {
            path: format!("$..subtests._values[{}]", ids.len()),
        });
    }

    tracing::debug!(?ids, "found summary ids");
    Ok(ids)
}

/// Errors from reading the action tree.
#[derive(Debug)]
pub enum ReadError {
    Tool(ToolError),
    /// A value the pipeline cannot do without is absent.
    Missing { what: &'static str, path: String },
    /// The document does not have the expected shape at `path`.
    Shape { path: String },
    /// `metrics.testsCount` is not a non-negative integer.
    InvalidCount { value: String },
}

impl ReadError {
    fn missing(self, what: &'static str) -> Self {
        match self {
            ReadError::Shape { path } => ReadError::Missing { what, path },
            other => other,
        }
    }
}

impl From<ToolError> for ReadError {
    fn from(e: ToolError) -> Self {
        ReadError::Tool(e)
    }
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Tool(e) => write!(f, "{e}"),
            ReadError::Missing { what, path } => {
                write!(f, "could not find {what} in xcresult (missing {path})")
            }
            ReadError::Shape { path } => {
                write!(f, "unexpected xcresult structure: missing {path}")
            }
            ReadError::InvalidCount { value } => {
                write!(f, "invalid test count {value:?}")
            }
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Tool(e) => std::error::Error::source(e),
            _ => None,
        }
    }
}
