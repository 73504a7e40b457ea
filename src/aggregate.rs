//! Reduction of a test's activity log to a single line of fields.

use crate::xcresulttool::{ResultSource, ToolError};
use serde_json::Value;
use std::path::Path;

/// Fetch the summary `summary_id` and reduce it to a comma-joined line:
/// test name, duration, then one mean per performance metric.
pub fn export_log(
    source: &dyn ResultSource,
    bundle: &Path,
    summary_id: &str,
) -> Result<String, AggregateError> {
    let contents = source.get(bundle, Some(summary_id))?;
    let fields = collect_log_output(&contents)?;
    Ok(fields.join(","))
}

/// Collect the reported fields of one test summary, in order.
///
/// The metric means follow the order of `performanceMetrics._values`; their
/// names are not kept.
pub fn collect_log_output(activity_log: &Value) -> Result<Vec<String>, AggregateError> {
    let mut result = Vec::new();

    if let Some(identifier) = present(activity_log, "identifier") {
        result.push(scalar_text(identifier, "identifier")?);
    }

    if let Some(duration) = present(activity_log, "duration") {
        let secs = number(wrapped(duration, "duration")?, "duration")?;
        result.push(format!("{secs:.2}"));
    }

    if let Some(metrics) = activity_log.get("performanceMetrics") {
        let groups = values(metrics, "performanceMetrics")?;
        for (i, group) in groups.iter().enumerate() {
            let field = format!("performanceMetrics[{i}].measurements");
            let measurements = group
                .get("measurements")
                .ok_or_else(|| AggregateError::Missing {
                    field: field.clone(),
                })?;
            let samples = values(measurements, &field)?
                .iter()
                .map(|m| wrapped(m, &field).and_then(|v| number(v, &field)))
                .collect::<Result<Vec<_>, _>>()?;
            let avg = mean(&samples).ok_or(AggregateError::EmptyMeasurements { field })?;
            result.push(format_mean(avg));
        }
    }

    Ok(result)
}

/// Arithmetic mean, or `None` for no samples.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Shortest text that reads back as the same `f64`; whole numbers keep a
/// trailing `.0` (`2.0`, not `2`). Exponents carry a sign and at least two
/// digits (`1e-05`, `1.5e+16`).
pub fn format_mean(value: f64) -> String {
    let shortest = format!("{value:?}");
    let Some((mantissa, exp)) = shortest.split_once('e') else {
        return shortest;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return shortest;
    };
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
}

/// `obj[key]`, ignoring null and empty objects/strings.
fn present<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    match obj.get(key)? {
        Value::Null => None,
        Value::Object(m) if m.is_empty() => None,
        Value::String(s) if s.is_empty() => None,
        v => Some(v),
    }
}

fn wrapped<'a>(v: &'a Value, field: &str) -> Result<&'a Value, AggregateError> {
    v.get("_value").ok_or_else(|| AggregateError::Missing {
        field: format!("{field}._value"),
    })
}

fn values<'a>(v: &'a Value, field: &str) -> Result<&'a [Value], AggregateError> {
    v.get("_values")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| AggregateError::Missing {
            field: format!("{field}._values"),
        })
}

fn scalar_text(v: &Value, field: &str) -> Result<String, AggregateError> {
    match wrapped(v, field)? {
        Value::String(s) => Ok(s.clone()),
        other => Ok(other.to_string()),
    }
}

/// Parse a number that xcresulttool may encode as a string.
fn number(v: &Value, field: &str) -> Result<f64, AggregateError> {
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AggregateError::InvalidNumber {
        field: field.to_string(),
        value: v.to_string(),
    })
}

/// Errors from reducing a test summary.
#[derive(Debug)]
pub enum AggregateError {
    Tool(ToolError),
    /// A wrapper key the summary format guarantees is absent.
    Missing { field: String },
    InvalidNumber { field: String, value: String },
    /// A metric group with no samples has no mean.
    EmptyMeasurements { field: String },
}

impl From<ToolError> for AggregateError {
    fn from(e: ToolError) -> Self {
        AggregateError::Tool(e)
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::Tool(e) => write!(f, "{e}"),
            AggregateError::Missing { field } => {
                write!(f, "test summary is missing {field}")
            }
            AggregateError::InvalidNumber { field, value } => {
                write!(f, "test summary has non-numeric {field}: {value}")
            }
            AggregateError::EmptyMeasurements { field } => {
                write!(f, "test summary has no samples in {field}")
            }
        }
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AggregateError::Tool(e) => std::error::Error::source(e),
            _ => None,
        }
    }
}
