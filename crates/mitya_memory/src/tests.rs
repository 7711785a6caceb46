use crate::sqlite::{SqliteStore, StoreConfig, REPUTATION_MAX, REPUTATION_MIN};
use mitya_core::{ContextLog, ReputationLedger, Role, SettingsStore, Turn};
use tempfile::TempDir;

async fn open_store(config: StoreConfig) -> (SqliteStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = SqliteStore::new(dir.path().join("test.db"), config)
        .await
        .expect("Failed to open store");
    (store, dir)
}

#[tokio::test]
async fn test_reputation_missing_row_is_zero() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    assert_eq!(store.reputation(1, 7).await, 0);
}

#[tokio::test]
async fn test_reputation_clamps_on_insert() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    store.adjust(1, 7, "Ann", -200).await;
    assert_eq!(store.reputation(1, 7).await, REPUTATION_MIN);
}

#[tokio::test]
async fn test_reputation_accumulates_and_clamps() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    store.adjust(1, 7, "Ann", 10).await;
    store.adjust(1, 7, "Ann", 5).await;
    assert_eq!(store.reputation(1, 7).await, 15);

    store.adjust(1, 7, "Ann", 300).await;
    assert_eq!(store.reputation(1, 7).await, REPUTATION_MAX);

    // Clamping is not a one-way door
    store.adjust(1, 7, "Ann", -1).await;
    assert_eq!(store.reputation(1, 7).await, REPUTATION_MAX - 1);
}

#[tokio::test]
async fn test_reputation_scoped_per_chat() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    store.adjust(1, 7, "Ann", 5).await;
    store.adjust(2, 7, "Ann", -3).await;
    assert_eq!(store.reputation(1, 7).await, 5);
    assert_eq!(store.reputation(2, 7).await, -3);
}

#[tokio::test]
async fn test_context_bound_and_order() {
    let config = StoreConfig {
        context_window: 20,
        recency_window_hours: None,
    };
    let (store, _dir) = open_store(config).await;

    for i in 1..=30 {
        store
            .append(5, Turn::new(Role::User, format!("msg {}", i)))
            .await
            .unwrap();
    }

    let turns = store.recent(5).await.unwrap();
    assert_eq!(turns.len(), 20);
    assert_eq!(turns[0].content, "msg 11");
    assert_eq!(turns[19].content, "msg 30");
}

#[tokio::test]
async fn test_context_unseen_chat_is_empty() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    assert!(store.recent(42).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_context_roles_survive_round_trip() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    store.append(3, Turn::new(Role::User, "привет")).await.unwrap();
    store
        .append(3, Turn::new(Role::Assistant, "здарова"))
        .await
        .unwrap();

    let turns = store.recent(3).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_context_prune_is_per_chat() {
    let config = StoreConfig {
        context_window: 2,
        recency_window_hours: None,
    };
    let (store, _dir) = open_store(config).await;

    for i in 0..4 {
        store
            .append(1, Turn::new(Role::User, format!("a{}", i)))
            .await
            .unwrap();
        store
            .append(2, Turn::new(Role::User, format!("b{}", i)))
            .await
            .unwrap();
    }

    let a = store.recent(1).await.unwrap();
    let b = store.recent(2).await.unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 2);
    assert_eq!(a[1].content, "a3");
    assert_eq!(b[1].content, "b3");
}

#[tokio::test]
async fn test_recency_window_filters_out_turns() {
    // A zero-hour window puts the cutoff at "now", hiding everything
    // that was appended before the read.
    let config = StoreConfig {
        context_window: 20,
        recency_window_hours: Some(0),
    };
    let (store, _dir) = open_store(config).await;
    store.append(9, Turn::new(Role::User, "старое")).await.unwrap();
    assert!(store.recent(9).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_settings_created_with_defaults() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    let s = store.chat_settings(100).await.unwrap();
    assert!(s.ai_enabled);
    assert!(s.voice_enabled);
    assert_eq!(s.reply_chance, 0);
}

#[tokio::test]
async fn test_settings_updates_stick() {
    let (store, _dir) = open_store(StoreConfig::default()).await;

    store.set_ai_enabled(100, false).await.unwrap();
    store.set_reply_chance(100, 30).await.unwrap();

    let s = store.chat_settings(100).await.unwrap();
    assert!(!s.ai_enabled);
    assert!(s.voice_enabled);
    assert_eq!(s.reply_chance, 30);
}

#[tokio::test]
async fn test_settings_get_or_create_is_stable() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    store.set_reply_chance(100, 50).await.unwrap();
    let first = store.chat_settings(100).await.unwrap();
    let second = store.chat_settings(100).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.reply_chance, 50);
}

#[tokio::test]
async fn test_setter_creates_row_for_unseen_chat() {
    let (store, _dir) = open_store(StoreConfig::default()).await;
    store.set_voice_enabled(7, false).await.unwrap();
    let s = store.chat_settings(7).await.unwrap();
    assert!(!s.voice_enabled);
    assert!(s.ai_enabled);
}

#[tokio::test]
async fn test_migration_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let store = SqliteStore::new(&path, StoreConfig::default()).await.unwrap();
    store.adjust(1, 1, "Ann", 3).await;
    drop(store);

    // Reopening runs the migration again over existing tables
    let store = SqliteStore::new(&path, StoreConfig::default()).await.unwrap();
    assert_eq!(store.reputation(1, 1).await, 3);
}
