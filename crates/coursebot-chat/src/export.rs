//! Interaction log export.
//!
//! Serializes the session's log entries to CSV for download, one row per
//! Start-stage classification. No schema versioning; the columns are the
//! `LogEntry` fields verbatim.

use std::io::Write;

use crate::error::ChatError;
use crate::state::LogEntry;

const HEADERS: [&str; 5] = [
    "timestamp",
    "user_input",
    "matched_course",
    "score",
    "was_helpful",
];

/// Write the log as CSV to any writer.
///
/// Timestamps are RFC 3339; an unset `was_helpful` serializes as an empty
/// field.
pub fn write_log_csv<W: Write>(log: &[LogEntry], writer: W) -> Result<(), ChatError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADERS)?;

    for entry in log {
        csv_writer.write_record([
            entry.timestamp.to_rfc3339(),
            entry.user_input.clone(),
            entry.matched_course.clone(),
            entry.score.to_string(),
            entry
                .was_helpful
                .map(|h| h.to_string())
                .unwrap_or_default(),
        ])?;
    }

    csv_writer
        .flush()
        .map_err(|e| ChatError::Export(e.to_string()))?;
    Ok(())
}

/// Render the log as a CSV string.
pub fn log_to_csv_string(log: &[LogEntry]) -> Result<String, ChatError> {
    let mut buf = Vec::new();
    write_log_csv(log, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ChatError::Export(e.to_string()))
}
