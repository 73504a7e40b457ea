//! Labelled per-test records.
//!
//! The aggregator emits bare values in encounter order. Labels are attached
//! here purely by position, assuming xcresulttool always reports the metric
//! groups in the same order as [`DEFAULT_LABELS`]. Nothing checks that.

use std::fmt;

/// Labels for a test line: name, duration, then the performance metrics.
pub const DEFAULT_LABELS: &[&str] = &[
    "testName",
    "Duration",
    "Disk Local Writes",
    "Clock Monotonic Time",
    "CPU Time",
    "Memory Physical",
    "CPU Instructions Retired",
    "Memory Peak Physical",
    "CPU Cycles",
];

/// One test's fields as ordered (label, value) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricRecord {
    fields: Vec<(String, String)>,
}

impl MetricRecord {
    /// Split a comma-joined log line and pair each value with the label at
    /// the same position. Extra values or extra labels are dropped.
    pub fn from_log_line<S: AsRef<str>>(labels: &[S], line: &str) -> Self {
        let fields = labels
            .iter()
            .zip(line.split(','))
            .map(|(label, value)| (label.as_ref().to_string(), value.to_string()))
            .collect();
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Renders as a dict literal: `{'testName': 'Suite/test()', 'Duration': '1.20'}`.
impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (label, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", quoted(label), quoted(value))?;
        }
        f.write_str("}")
    }
}

/// All records from one bundle, plus the device they ran on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub device_model: String,
    pub records: Vec<MetricRecord>,
}

impl ResultSet {
    pub fn new(device_model: impl Into<String>) -> Self {
        Self {
            device_model: device_model.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: MetricRecord) {
        self.records.push(record);
    }
}

/// Renders the records as a list literal: `[{...}, {...}]`.
impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{record}")?;
        }
        f.write_str("]")
    }
}

/// Single-quote `s`, switching to double quotes when it contains a single
/// quote and no double quote.
fn quoted(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
