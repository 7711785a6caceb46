use mitya_core::{persona, ContextLog, ReputationLedger, Role};
use mitya_memory::{SqliteStore, StoreConfig};
use mitya_reasoning::providers::MockModel;
use mitya_reasoning::{CompletionParams, ConversationEngine, ReplyRequest};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn open_store() -> (Arc<SqliteStore>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = StoreConfig {
        context_window: 20,
        recency_window_hours: None,
    };
    let store = SqliteStore::new(dir.path().join("test.db"), config)
        .await
        .expect("Failed to open store");
    (Arc::new(store), dir)
}

fn engine(store: Arc<SqliteStore>, model: Arc<MockModel>) -> ConversationEngine {
    ConversationEngine::new(
        store.clone(),
        store,
        model,
        "ru",
        CompletionParams::default(),
    )
}

#[tokio::test]
async fn test_reply_appends_both_turns() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::replying("здарова"));
    let engine = engine(store.clone(), model);

    let reply = engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "как дела?".to_string(),
            ..Default::default()
        })
        .await;

    assert_eq!(reply, "здарова");
    let turns = store.recent(1).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "как дела?");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "здарова");
}

#[tokio::test]
async fn test_completion_failure_returns_fallback_and_keeps_user_turn() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::failing());
    let engine = engine(store.clone(), model);

    let reply = engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "ау".to_string(),
            ..Default::default()
        })
        .await;

    assert_eq!(reply, persona::fallback_reply("ru"));
    let turns = store.recent(1).await.unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, Role::User);
}

#[tokio::test]
async fn test_empty_completion_counts_as_failure() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::replying("   "));
    let engine = engine(store.clone(), model);

    let reply = engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "ну".to_string(),
            ..Default::default()
        })
        .await;

    assert_eq!(reply, persona::fallback_reply("ru"));
    assert_eq!(store.recent(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_system_turn_reflects_reputation() {
    let (store, _dir) = open_store().await;
    store.adjust(1, 7, "Ann", 200).await; // clamps to 150, top tier
    let model = Arc::new(MockModel::replying("ок"));
    let engine = engine(store.clone(), model.clone());

    engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "привет".to_string(),
            user_id: Some(7),
            ..Default::default()
        })
        .await;

    let calls = model.chat_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let history = &calls[0];
    assert_eq!(history[0].role, Role::System);
    assert!(history[0].content.contains(persona::attitude_for(150, "ru")));
    assert!(history[0].content.contains(persona::character("ru")));
}

#[tokio::test]
async fn test_unknown_user_gets_neutral_attitude() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::replying("ок"));
    let engine = engine(store.clone(), model.clone());

    engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "привет".to_string(),
            ..Default::default()
        })
        .await;

    let calls = model.chat_calls.lock().unwrap();
    assert!(calls[0][0].content.contains(persona::attitude_for(0, "ru")));
}

#[tokio::test]
async fn test_unsolicited_directive_is_added() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::replying("ок"));
    let engine = engine(store.clone(), model.clone());

    engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "о чем речь".to_string(),
            unsolicited: true,
            ..Default::default()
        })
        .await;
    engine
        .reply(ReplyRequest {
            chat_id: 2,
            text: "о чем речь".to_string(),
            ..Default::default()
        })
        .await;

    let calls = model.chat_calls.lock().unwrap();
    assert!(calls[0][0].content.contains(persona::unsolicited_directive("ru")));
    assert!(!calls[1][0].content.contains(persona::unsolicited_directive("ru")));
}

#[tokio::test]
async fn test_reply_context_spliced_before_user_turn() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::replying("ок"));
    let engine = engine(store.clone(), model.clone());

    engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "а это что было?".to_string(),
            reply_context: Some("вчера я сказал глупость".to_string()),
            ..Default::default()
        })
        .await;

    let calls = model.chat_calls.lock().unwrap();
    let history = &calls[0];
    let n = history.len();
    assert_eq!(history[n - 2].role, Role::Assistant);
    assert_eq!(history[n - 2].content, "вчера я сказал глупость");
    assert_eq!(history[n - 1].role, Role::User);
    assert_eq!(history[n - 1].content, "а это что было?");
}

#[tokio::test]
async fn test_display_name_prefixes_user_turn() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::replying("ок"));
    let engine = engine(store.clone(), model.clone());

    engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "я тут".to_string(),
            display_name: Some("Ann".to_string()),
            ..Default::default()
        })
        .await;

    let turns = store.recent(1).await.unwrap();
    assert_eq!(turns[0].content, "Ann: я тут");
}

#[tokio::test]
async fn test_same_chat_turns_are_serialized() {
    let (store, _dir) = open_store().await;
    let model = Arc::new(MockModel::replying("ок").with_delay(Duration::from_millis(50)));
    let engine = Arc::new(engine(store.clone(), model));

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .reply(ReplyRequest {
                    chat_id: 1,
                    text: "первое".to_string(),
                    ..Default::default()
                })
                .await
        })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .reply(ReplyRequest {
                    chat_id: 1,
                    text: "второе".to_string(),
                    ..Default::default()
                })
                .await
        })
    };
    a.await.unwrap();
    b.await.unwrap();

    // Serialized turns come out as strict user/assistant pairs; an
    // interleaving would leave two user turns back to back.
    let turns = store.recent(1).await.unwrap();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[2].role, Role::User);
    assert_eq!(turns[3].role, Role::Assistant);
}

#[tokio::test]
async fn test_reply_continues_when_history_cannot_be_loaded() {
    // A zero-hour recency window hides even the turn just appended; the
    // engine must still send the current message to the model.
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        context_window: 20,
        recency_window_hours: Some(0),
    };
    let store = Arc::new(
        SqliteStore::new(dir.path().join("test.db"), config)
            .await
            .unwrap(),
    );
    let model = Arc::new(MockModel::replying("ок"));
    let engine = ConversationEngine::new(
        store.clone(),
        store.clone(),
        model.clone(),
        "ru",
        CompletionParams::default(),
    );

    let reply = engine
        .reply(ReplyRequest {
            chat_id: 1,
            text: "эй".to_string(),
            ..Default::default()
        })
        .await;

    assert_eq!(reply, "ок");
    let calls = model.chat_calls.lock().unwrap();
    let history = &calls[0];
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::User);
    assert_eq!(history[1].content, "эй");
}
