//! Trace Parsing
//!
//! Delimiter detection, typed value parsing and the time-column
//! heuristics shared by the emulator and the runner.

use measurement::{Measurement, Value};

/// Pick the delimiter with the highest header-row count among tab,
/// semicolon and comma. Ties resolve tab > semicolon > comma.
pub fn detect_delimiter(header: &str) -> char {
    let tabs = header.matches('\t').count();
    let semicolons = header.matches(';').count();
    let commas = header.matches(',').count();

    if tabs >= semicolons && tabs >= commas {
        '\t'
    } else if semicolons >= commas {
        ';'
    } else {
        ','
    }
}

/// Split the header row into trimmed column names.
pub fn parse_header(header: &str, delimiter: char) -> Vec<String> {
    header
        .split(delimiter)
        .map(|name| name.trim().to_string())
        .collect()
}

/// Parse a single field into a typed value.
///
/// After `,` -> `.` normalization a field containing `.` parses as a
/// float, otherwise as an integer; anything unparseable stays text with
/// its original spelling. Empty fields are absent.
pub fn parse_value(field: &str) -> Option<Value> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }

    let normalized = field.replace(',', ".");
    let parsed = if normalized.contains('.') {
        normalized.parse::<f64>().map(Value::Float).ok()
    } else {
        normalized.parse::<i64>().map(Value::Int).ok()
    };
    Some(parsed.unwrap_or_else(|| Value::Text(field.to_string())))
}

/// Parse one data row into a measurement. Fields beyond the header and
/// columns beyond the row are ignored; empty fields stay absent.
pub fn parse_line(index: u64, line: &str, columns: &[String], delimiter: char) -> Measurement {
    let values = columns
        .iter()
        .zip(line.split(delimiter))
        .filter_map(|(column, field)| parse_value(field).map(|value| (column.clone(), value)))
        .collect();
    Measurement::new(index, values)
}

/// The time column of a measurement: the first column containing `time`,
/// equal to `t`, or containing `delta` (case-insensitive); otherwise the
/// first column.
pub fn time_column(measurement: &Measurement) -> Option<&str> {
    let mut columns = measurement.columns().peekable();
    let first = columns.peek().copied();
    columns
        .find(|name| {
            let lower = name.to_lowercase();
            lower.contains("time") || lower == "t" || lower.contains("delta")
        })
        .or(first)
}

/// Timestamp of a measurement in seconds, read from the given column.
///
/// Numbers are taken as-is; `"D days HH:MM:SS.fff"` strings are expanded;
/// other strings parse as floats after `,` -> `.` normalization.
pub fn time_seconds(measurement: &Measurement, column: &str) -> Option<f64> {
    match measurement.get(column)? {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Text(s) => {
            if s.contains("days") {
                parse_days_timestamp(s)
            } else {
                s.replace(',', ".").parse().ok()
            }
        }
    }
}

/// Timestamp of a measurement in seconds via the time-column heuristic.
pub fn time_value(measurement: &Measurement) -> Option<f64> {
    let column = time_column(measurement)?.to_string();
    time_seconds(measurement, &column)
}

/// Parse `"D days HH:MM:SS.fff"` to seconds:
/// `D * 86400 + HH * 3600 + MM * 60 + SS.fff`.
pub fn parse_days_timestamp(text: &str) -> Option<f64> {
    let (days, clock) = text.split_once(" days ")?;
    let days: i64 = days.trim().parse().ok()?;

    let mut parts = clock.trim().split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(days as f64 * 86400.0 + hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}
