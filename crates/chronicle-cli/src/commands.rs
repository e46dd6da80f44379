//! Operator commands: schema migration, stream inspection and verification.

use std::io::Write;

use chronicle_core::store::{EventStore, Record, VersionRange};
use chronicle_event_store::PgEventStore;
use uuid::Uuid;

use crate::error::CliError;

/// Outcome of a successful [`verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// The verified stream.
    pub aggregate_id: Uuid,
    /// Number of events in the stream.
    pub events: usize,
    /// Highest version, or 0 for an empty stream.
    pub last_version: i64,
}

/// Applies the event store schema.
///
/// # Errors
///
/// Returns `CliError::Domain` if any DDL statement fails.
pub async fn migrate(store: &PgEventStore) -> Result<(), CliError> {
    store.migrate().await?;
    tracing::info!("event store schema is up to date");
    Ok(())
}

/// Writes one JSON line per record of `aggregate_id` within `range`.
///
/// Each line carries the record metadata and the decoded envelope payload.
/// Returns the number of records written.
///
/// # Errors
///
/// Returns `CliError::Domain` if the load fails or `CliError::Output` if
/// writing fails.
pub async fn inspect<W: Write>(
    store: &dyn EventStore,
    aggregate_id: Uuid,
    range: VersionRange,
    out: &mut W,
) -> Result<usize, CliError> {
    let records = store.load_range(aggregate_id, range).await?;
    for record in &records {
        writeln!(out, "{}", render(record))?;
    }
    Ok(records.len())
}

fn render(record: &Record) -> serde_json::Value {
    let envelope: Option<serde_json::Value> = serde_json::from_str(&record.data).ok();
    let tag = envelope
        .as_ref()
        .and_then(|e| e.get("t"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or(&record.event_type)
        .to_owned();
    let payload = envelope
        .as_ref()
        .and_then(|e| e.get("d"))
        .cloned()
        .unwrap_or_else(|| serde_json::Value::String(record.data.clone()));

    serde_json::json!({
        "version": record.version,
        "type": tag,
        "event_id": record.event_id,
        "correlation_id": record.correlation_id,
        "causation_id": record.causation_id,
        "occurred_at": record.occurred_at,
        "payload": payload,
    })
}

/// Loads a stream and checks its integrity.
///
/// # Errors
///
/// Returns `CliError::Domain` if the load fails, or `CliError::InvalidStream`
/// for the first integrity problem found.
pub async fn verify(store: &dyn EventStore, aggregate_id: Uuid) -> Result<StreamSummary, CliError> {
    let records = store.load(aggregate_id).await?;
    verify_records(aggregate_id, &records)
}

/// Checks that `records` form a valid stream for `aggregate_id`.
///
/// A valid stream belongs entirely to `aggregate_id`, starts at version 1,
/// has no gaps, and every envelope tag matches its `event_type` column.
///
/// # Errors
///
/// Returns `CliError::InvalidStream` describing the first problem found.
pub fn verify_records(aggregate_id: Uuid, records: &[Record]) -> Result<StreamSummary, CliError> {
    let invalid = |reason: String| CliError::InvalidStream {
        aggregate_id,
        reason,
    };

    let mut expected = 1_i64;
    for record in records {
        if record.aggregate_id != aggregate_id {
            return Err(invalid(format!(
                "version {} belongs to aggregate {}",
                record.version, record.aggregate_id
            )));
        }
        if record.version != expected {
            return Err(invalid(format!(
                "expected version {expected}, found {}",
                record.version
            )));
        }
        let envelope: serde_json::Value = serde_json::from_str(&record.data)
            .map_err(|e| invalid(format!("version {} has a malformed envelope: {e}", record.version)))?;
        match envelope.get("t").and_then(serde_json::Value::as_str) {
            Some(tag) if tag == record.event_type => {}
            Some(tag) => {
                return Err(invalid(format!(
                    "version {} is tagged {tag} but stored as {}",
                    record.version, record.event_type
                )));
            }
            None => {
                return Err(invalid(format!(
                    "version {} has no type tag",
                    record.version
                )));
            }
        }
        expected += 1;
    }

    Ok(StreamSummary {
        aggregate_id,
        events: records.len(),
        last_version: expected - 1,
    })
}
