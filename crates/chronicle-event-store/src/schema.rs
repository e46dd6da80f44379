//! Event store database schema.

/// Name of the `(aggregate_id, version)` unique constraint.
pub const STREAM_VERSION_CONSTRAINT: &str = "events_stream_version_key";

/// SQL to create the events table.
///
/// `UNIQUE (aggregate_id, version)` is the durable guard behind optimistic
/// concurrency: two writers racing for the same version cannot both commit.
/// `data` is `TEXT` so payloads come back byte for byte.
pub const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS events (
    id             BIGSERIAL PRIMARY KEY,
    aggregate_id   UUID NOT NULL,
    "type"         VARCHAR(255) NOT NULL,
    version        BIGINT NOT NULL,
    "timestamp"    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    data           TEXT NOT NULL,
    event_id       UUID NOT NULL UNIQUE,
    correlation_id UUID NOT NULL,
    causation_id   UUID NOT NULL,
    CONSTRAINT events_stream_version_key UNIQUE (aggregate_id, version)
);

CREATE INDEX IF NOT EXISTS idx_events_correlation_id
    ON events (correlation_id);
"#;
