//! `PostgreSQL` implementation of the `EventStore` trait.

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, Record, VersionRange, validate_batch};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::schema::{CREATE_EVENTS_TABLE, STREAM_VERSION_CONSTRAINT};

/// PostgreSQL-backed event store.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

fn infrastructure(e: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(Box::new(e))
}

impl PgEventStore {
    /// Creates a new `PgEventStore` over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the database is unreachable.
    #[tracing::instrument(skip_all, fields(max_connections = config.max_connections))]
    pub async fn connect(config: &StoreConfig) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.database_url)
            .await
            .map_err(infrastructure)?;
        Ok(Self::new(pool))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the events table and its indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if any DDL statement fails.
    #[tracing::instrument(skip(self))]
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_EVENTS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(())
    }

    /// Returns the highest persisted version of a stream, or 0.
    async fn max_version(conn: &mut PgConnection, aggregate_id: Uuid) -> Result<i64, sqlx::Error> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id)
                .fetch_one(conn)
                .await?;
        Ok(max.unwrap_or(0))
    }

    fn decode_row(row: &PgRow) -> Result<Record, sqlx::Error> {
        Ok(Record {
            event_id: row.try_get("event_id")?,
            aggregate_id: row.try_get("aggregate_id")?,
            event_type: row.try_get("type")?,
            version: row.try_get("version")?,
            correlation_id: row.try_get("correlation_id")?,
            causation_id: row.try_get("causation_id")?,
            occurred_at: row.try_get("timestamp")?,
            data: row.try_get("data")?,
        })
    }

    /// Maps an insert failure to a conflict when another writer committed the
    /// same version first. Any other failure, a clashing `event_id` included,
    /// stays an infrastructure error.
    async fn insert_failure(
        &self,
        aggregate_id: Uuid,
        attempted: i64,
        error: sqlx::Error,
    ) -> DomainError {
        let version_taken = error.as_database_error().is_some_and(|db| {
            db.is_unique_violation() && db.constraint() == Some(STREAM_VERSION_CONSTRAINT)
        });
        if !version_taken {
            return infrastructure(error);
        }
        let persisted = async {
            let mut conn = self.pool.acquire().await?;
            Self::max_version(&mut conn, aggregate_id).await
        }
        .await;
        match persisted {
            Ok(persisted) => DomainError::ConcurrencyConflict {
                aggregate_id,
                attempted,
                persisted,
            },
            Err(e) => infrastructure(e),
        }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    #[tracing::instrument(skip(self))]
    async fn load_range(
        &self,
        aggregate_id: Uuid,
        range: VersionRange,
    ) -> Result<Vec<Record>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"SELECT event_id, aggregate_id, "type", version, correlation_id, causation_id, "timestamp", data FROM events WHERE aggregate_id = "#,
        );
        qb.push_bind(aggregate_id);
        if let Some(min) = range.min {
            qb.push(" AND version >= ").push_bind(min);
        }
        if let Some(max) = range.max {
            qb.push(" AND version <= ").push_bind(max);
        }
        qb.push(" ORDER BY version ASC");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.iter()
            .map(Self::decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(infrastructure)
    }

    #[tracing::instrument(skip(self, records), fields(event_count = records.len()))]
    async fn append(&self, aggregate_id: Uuid, records: &[Record]) -> Result<(), DomainError> {
        validate_batch(aggregate_id, records)?;
        let Some(first) = records.first() else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        // Serializes appends per stream for the rest of the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(aggregate_id)
            .execute(&mut *tx)
            .await
            .map_err(infrastructure)?;

        let persisted = Self::max_version(&mut tx, aggregate_id)
            .await
            .map_err(infrastructure)?;
        if first.version <= persisted {
            tracing::debug!(attempted = first.version, persisted, "append rejected");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                attempted: first.version,
                persisted,
            });
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            r#"INSERT INTO events (aggregate_id, "type", version, "timestamp", data, event_id, correlation_id, causation_id) "#,
        );
        qb.push_values(records, |mut b, record| {
            b.push_bind(record.aggregate_id)
                .push_bind(record.event_type.as_str())
                .push_bind(record.version)
                .push_bind(record.occurred_at)
                .push_bind(record.data.as_str())
                .push_bind(record.event_id)
                .push_bind(record.correlation_id)
                .push_bind(record.causation_id);
        });

        if let Err(e) = qb.build().execute(&mut *tx).await {
            drop(tx);
            return Err(self.insert_failure(aggregate_id, first.version, e).await);
        }
        tx.commit().await.map_err(infrastructure)?;
        Ok(())
    }
}
