//! Behaviour every `EventStore` backend must share.

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, Record, VersionRange};
use uuid::Uuid;

/// Helper to build a `Record` with sensible defaults.
pub fn make_record(aggregate_id: Uuid, version: i64) -> Record {
    Record {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: "test.recorded".to_owned(),
        version,
        correlation_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        occurred_at: fixed_time(),
        data: format!(r#"{{"t":"test.recorded","d":{{"n":{version}}}}}"#),
    }
}

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

fn versions(records: &[Record]) -> Vec<i64> {
    records.iter().map(|r| r.version).collect()
}

pub async fn load_unknown_aggregate_is_empty(store: &dyn EventStore) {
    let loaded = store.load(Uuid::new_v4()).await.unwrap();

    assert!(loaded.is_empty());
}

pub async fn append_then_load_round_trips(store: &dyn EventStore) {
    // Arrange
    let id = Uuid::new_v4();
    let payloads = [
        r#"{"t":"test.recorded","d":{"name":"Ünïcødé ✓ 書庫"}}"#,
        r#"{"t":"test.recorded","d":{"name":"a\u0000b"}}"#,
        r#"{"t":"test.recorded","d":{"n":1}}"#,
        r#"{"d":{"z":1,"a":2},"t":"test.recorded"}"#,
    ];
    let records: Vec<Record> = payloads
        .iter()
        .zip(1..)
        .map(|(data, version)| Record {
            occurred_at: Utc::now().trunc_subsecs(6),
            data: (*data).to_owned(),
            ..make_record(id, version)
        })
        .collect();

    // Act
    store.append(id, &records).await.unwrap();
    let loaded = store.load(id).await.unwrap();

    // Assert
    assert_eq!(loaded, records);
}

pub async fn appends_are_ordered_by_version(store: &dyn EventStore) {
    let id = Uuid::new_v4();
    let batch = vec![make_record(id, 1), make_record(id, 2), make_record(id, 3)];

    store.append(id, &batch).await.unwrap();
    store.append(id, &[make_record(id, 4)]).await.unwrap();

    assert_eq!(versions(&store.load(id).await.unwrap()), vec![1, 2, 3, 4]);
}

pub async fn stale_append_conflicts_and_writes_nothing(store: &dyn EventStore) {
    // Arrange
    let id = Uuid::new_v4();
    store
        .append(id, &[make_record(id, 1), make_record(id, 2)])
        .await
        .unwrap();

    // Act
    let result = store
        .append(id, &[make_record(id, 2), make_record(id, 3)])
        .await;

    // Assert
    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id,
            attempted,
            persisted,
        }) => {
            assert_eq!(aggregate_id, id);
            assert_eq!(attempted, 2);
            assert_eq!(persisted, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    assert_eq!(versions(&store.load(id).await.unwrap()), vec![1, 2]);
}

pub async fn invalid_batch_writes_nothing(store: &dyn EventStore) {
    let id = Uuid::new_v4();

    let result = store
        .append(id, &[make_record(id, 1), make_record(id, 1)])
        .await;

    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert!(store.load(id).await.unwrap().is_empty());
}

pub async fn empty_batch_is_noop(store: &dyn EventStore) {
    let id = Uuid::new_v4();

    store.append(id, &[]).await.unwrap();

    assert!(store.load(id).await.unwrap().is_empty());
}

pub async fn streams_are_isolated(store: &dyn EventStore) {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    store.append(first, &[make_record(first, 1)]).await.unwrap();
    store.append(second, &[make_record(second, 1)]).await.unwrap();

    let loaded = store.load(first).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].aggregate_id, first);
}

pub async fn load_range_filters_versions(store: &dyn EventStore) {
    let id = Uuid::new_v4();
    let batch: Vec<Record> = (1..=5).map(|v| make_record(id, v)).collect();
    store.append(id, &batch).await.unwrap();

    let middle = store.load_range(id, VersionRange::between(2, 4)).await.unwrap();
    let tail = store.load_range(id, VersionRange::starting_at(4)).await.unwrap();

    assert_eq!(versions(&middle), vec![2, 3, 4]);
    assert_eq!(versions(&tail), vec![4, 5]);
}
