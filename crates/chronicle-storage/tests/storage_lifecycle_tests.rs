//! End-to-end tests: storage commands through the repository, the in-memory
//! store and the in-process broker.

use std::sync::{Arc, Mutex};

use chronicle_core::aggregate::AggregateRoot;
use chronicle_core::broker::{
    ALL_TOPICS, BrokerConfig, EventHandler, HandlerError, InProcessBroker, MessageBroker,
    handler_fn,
};
use chronicle_core::clock::SystemClock;
use chronicle_core::error::DomainError;
use chronicle_core::repository::Repository;
use chronicle_core::store::{EventStore, Record, VersionRange};
use chronicle_event_store::InMemoryEventStore;
use chronicle_storage::application::command_handlers::{
    handle_create_storage, handle_relocate_storage, handle_rename_storage,
};
use chronicle_storage::domain::aggregates::Storage;
use chronicle_storage::domain::commands::{CreateStorage, RelocateStorage, RenameStorage};
use chronicle_storage::domain::events::{self, NAME_SET_EVENT_TYPE};
use chronicle_test_support::{FailingBroker, FixedClock, RecordingBroker};
use uuid::Uuid;

fn repository(
    store: &InMemoryEventStore,
    broker: Arc<dyn MessageBroker>,
) -> Repository<Storage> {
    Repository::new(
        Arc::new(store.clone()),
        broker,
        Arc::new(events::registry().unwrap()),
    )
}

fn create_command(storage_id: Uuid, name: &str) -> CreateStorage {
    CreateStorage {
        correlation_id: Uuid::new_v4(),
        storage_id,
        name: name.to_owned(),
        location: "Basement".to_owned(),
    }
}

#[tokio::test]
async fn test_stale_save_conflicts_and_store_is_unchanged() {
    // Arrange
    let clock = FixedClock::default_instant();
    let store = InMemoryEventStore::new();
    let repo = repository(&store, Arc::new(RecordingBroker::new()));
    let storage_id = Uuid::new_v4();
    handle_create_storage(&create_command(storage_id, "Stack A"), &clock, &repo)
        .await
        .unwrap();

    let mut first = repo.load(storage_id).await.unwrap();
    let mut second = repo.load(storage_id).await.unwrap();
    first.rename("Stack B", Uuid::new_v4(), &clock).unwrap();
    second.rename("Stack C", Uuid::new_v4(), &clock).unwrap();
    repo.save(&mut first).await.unwrap();

    // Act
    let result = repo.save(&mut second).await;

    // Assert
    assert!(result.as_ref().is_err_and(DomainError::is_retryable));
    match result {
        Err(DomainError::ConcurrencyConflict {
            attempted,
            persisted,
            ..
        }) => {
            assert_eq!(attempted, 4);
            assert_eq!(persisted, 4);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
    let reloaded = repo.load(storage_id).await.unwrap();
    assert_eq!(reloaded.name(), "Stack B");
    assert_eq!(reloaded.version(), 4);
}

#[tokio::test]
async fn test_retry_after_conflict_succeeds() {
    let clock = FixedClock::default_instant();
    let store = InMemoryEventStore::new();
    let repo = repository(&store, Arc::new(RecordingBroker::new()));
    let storage_id = Uuid::new_v4();
    handle_create_storage(&create_command(storage_id, "Stack A"), &clock, &repo)
        .await
        .unwrap();
    let mut stale = repo.load(storage_id).await.unwrap();
    let rename = RenameStorage {
        correlation_id: Uuid::new_v4(),
        storage_id,
        name: "Stack B".to_owned(),
    };
    handle_rename_storage(&rename, &clock, &repo).await.unwrap();
    stale.relocate("Attic", Uuid::new_v4(), &clock).unwrap();
    assert!(repo.save(&mut stale).await.is_err());

    let relocate = RelocateStorage {
        correlation_id: Uuid::new_v4(),
        storage_id,
        location: "Attic".to_owned(),
    };
    let result = handle_relocate_storage(&relocate, &clock, &repo).await.unwrap();

    assert_eq!(result.version, 5);
    let storage = repo.load(storage_id).await.unwrap();
    assert_eq!(storage.name(), "Stack B");
    assert_eq!(storage.location(), "Attic");
}

#[tokio::test]
async fn test_duplicate_creation_is_rejected() {
    let clock = FixedClock::default_instant();
    let store = InMemoryEventStore::new();
    let repo = repository(&store, Arc::new(RecordingBroker::new()));
    let storage_id = Uuid::new_v4();
    handle_create_storage(&create_command(storage_id, "Stack A"), &clock, &repo)
        .await
        .unwrap();

    let result = handle_create_storage(&create_command(storage_id, "Stack A"), &clock, &repo).await;

    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert_eq!(store.load(storage_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_replay_is_deterministic() {
    let clock = FixedClock::default_instant();
    let store = InMemoryEventStore::new();
    let repo = repository(&store, Arc::new(RecordingBroker::new()));
    let storage_id = Uuid::new_v4();
    handle_create_storage(&create_command(storage_id, "Ünïcødé ✓ 書庫"), &clock, &repo)
        .await
        .unwrap();

    let first = repo.load(storage_id).await.unwrap();
    let second = repo.load(storage_id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.name(), "Ünïcødé ✓ 書庫");
    assert_eq!(first.version(), 3);
}

#[tokio::test]
async fn test_publish_failure_leaves_events_committed() {
    let clock = FixedClock::default_instant();
    let store = InMemoryEventStore::new();
    let repo = repository(&store, Arc::new(FailingBroker));
    let storage_id = Uuid::new_v4();

    let result = handle_create_storage(&create_command(storage_id, "Stack A"), &clock, &repo).await;

    assert!(result.is_ok());
    assert_eq!(store.load(storage_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_partial_read_returns_requested_versions() {
    let clock = FixedClock::default_instant();
    let store = InMemoryEventStore::new();
    let repo = repository(&store, Arc::new(RecordingBroker::new()));
    let storage_id = Uuid::new_v4();
    handle_create_storage(&create_command(storage_id, "Stack A"), &clock, &repo)
        .await
        .unwrap();

    let tail = store
        .load_range(storage_id, VersionRange::starting_at(2))
        .await
        .unwrap();

    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].event_type, NAME_SET_EVENT_TYPE);
}

#[tokio::test]
async fn test_subscribers_receive_committed_records() {
    // Arrange
    let clock = SystemClock;
    let store = InMemoryEventStore::new();
    let renames: Arc<Mutex<Vec<Record>>> = Arc::default();
    let everything: Arc<Mutex<Vec<Record>>> = Arc::default();
    let (broker, dispatch) = InProcessBroker::builder(BrokerConfig::default())
        .subscribe(NAME_SET_EVENT_TYPE, collect_into(&renames))
        .subscribe(ALL_TOPICS, collect_into(&everything))
        .start();
    let repo = repository(&store, Arc::new(broker));
    let storage_id = Uuid::new_v4();

    // Act
    handle_create_storage(&create_command(storage_id, "Stack A"), &clock, &repo)
        .await
        .unwrap();
    dispatch.shutdown().await;

    // Assert
    let renames = renames.lock().unwrap().clone();
    assert_eq!(renames.len(), 1);
    assert_eq!(renames[0].aggregate_id, storage_id);
    assert_eq!(renames[0].version, 2);
    let mut versions: Vec<i64> = everything.lock().unwrap().iter().map(|r| r.version).collect();
    versions.sort_unstable();
    assert_eq!(versions, vec![1, 2, 3]);
    let stored = store.load(storage_id).await.unwrap();
    assert!(stored.contains(&renames[0]));
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_block_later_saves() {
    // Arrange
    let clock = FixedClock::default_instant();
    let store = InMemoryEventStore::new();
    let everything: Arc<Mutex<Vec<Record>>> = Arc::default();
    let panicking = handler_fn(|bytes: Vec<u8>| async move {
        if !bytes.is_empty() {
            panic!("projection bug");
        }
        Ok::<(), HandlerError>(())
    });
    let (broker, dispatch) = InProcessBroker::builder(BrokerConfig::default())
        .subscribe(NAME_SET_EVENT_TYPE, panicking)
        .subscribe(ALL_TOPICS, collect_into(&everything))
        .start();
    let repo = repository(&store, Arc::new(broker));
    let first_id = Uuid::new_v4();
    let second_id = Uuid::new_v4();

    // Act
    let first = handle_create_storage(&create_command(first_id, "Stack A"), &clock, &repo).await;
    let second = handle_create_storage(&create_command(second_id, "Stack B"), &clock, &repo).await;
    dispatch.shutdown().await;

    // Assert
    assert_eq!(first.unwrap().version, 3);
    assert_eq!(second.unwrap().version, 3);
    assert_eq!(store.load(first_id).await.unwrap().len(), 3);
    assert_eq!(store.load(second_id).await.unwrap().len(), 3);
    let delivered = everything.lock().unwrap();
    assert_eq!(delivered.iter().filter(|r| r.aggregate_id == second_id).count(), 3);
}

fn collect_into(
    sink: &Arc<Mutex<Vec<Record>>>,
) -> Arc<dyn EventHandler> {
    let sink = Arc::clone(sink);
    handler_fn(move |bytes: Vec<u8>| {
        let sink = Arc::clone(&sink);
        async move {
            let record: Record = serde_json::from_slice(&bytes)?;
            sink.lock().unwrap().push(record);
            Ok::<(), HandlerError>(())
        }
    })
}
