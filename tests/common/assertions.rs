//! Assertion helpers for recorded records and spans.

use sig::backend::{LogRecord, Value};
use sig::Severity;

/// Assert a record's body and severity, including the canonical text.
pub fn assert_record(record: &LogRecord, body: &str, severity: Severity) {
    assert_eq!(record.body, body, "unexpected body in {record:?}");
    assert_eq!(record.severity, severity, "unexpected severity in {record:?}");
    assert_eq!(record.severity_text, severity.as_str());
}

/// Assert a string attribute, last occurrence wins.
pub fn assert_str_attr(record: &LogRecord, key: &str, expected: &str) {
    assert_eq!(
        record.attribute(key),
        Some(&Value::Str(expected.to_string())),
        "attribute {key} in {record:?}"
    );
}

/// The `line` attribute of a record.
pub fn line_of(record: &LogRecord) -> Option<i64> {
    record.attribute("line").and_then(Value::as_int)
}
