//! Chat store behaviour against an in-memory DuckDB database

use datachat_duck::Database;
use datachat_store::{ChatMessage, ChatStore, NewVisualization, StoreError, VisualizationData};
use serde_json::json;
use std::sync::Barrier;
use std::thread;

fn store() -> ChatStore {
    let store = ChatStore::new(Database::in_memory().expect("in-memory database"));
    store.init_schema().expect("schema");
    store
}

fn bar_chart(data: serde_json::Value) -> NewVisualization {
    NewVisualization {
        visualization_type: "bar".to_string(),
        data_json: serde_json::from_value(data).expect("object or array"),
        chart_config: None,
    }
}

#[test]
fn test_create_chat_without_title_uses_default() -> Result<(), StoreError> {
    let store = store();

    let chat = store.create_chat(None)?;
    assert!(chat.title.starts_with("New Chat – "), "title was {}", chat.title);
    assert_eq!(chat.message_count, 0);
    assert_eq!(chat.created_at, chat.updated_at);

    let empty = store.create_chat(Some(""))?;
    assert!(empty.title.starts_with("New Chat – "));

    // Only an absent or empty title is replaced
    let spaces = store.create_chat(Some("   "))?;
    assert_eq!(spaces.title, "   ");

    let named = store.create_chat(Some("Branch sales"))?;
    assert_eq!(named.title, "Branch sales");
    assert_ne!(named.chat_id, chat.chat_id);

    Ok(())
}

#[test]
fn test_message_order_is_sequential() -> Result<(), StoreError> {
    let store = store();
    let chat = store.create_chat(Some("orders"))?;

    for i in 1..=5 {
        let message = store
            .create_message(chat.chat_id, &format!("question {i}"), Some("SELECT 1"))?
            .expect("chat exists");
        assert_eq!(message.message_order, i);
        assert!(message.visualizations.is_empty());
    }

    let detail = store.get_chat_detail(chat.chat_id)?.expect("chat exists");
    let orders: Vec<i64> = detail.messages.iter().map(|m| m.message_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4, 5]);
    assert_eq!(detail.messages[0].message_text, "question 1");
    assert_eq!(detail.messages[0].generated_sql.as_deref(), Some("SELECT 1"));

    // Numbering is per chat
    let other = store.create_chat(Some("other"))?;
    let first = store.create_message(other.chat_id, "hello", None)?.expect("chat exists");
    assert_eq!(first.message_order, 1);
    assert!(first.generated_sql.is_none());

    Ok(())
}

#[test]
fn test_message_order_unique_per_chat() -> Result<(), StoreError> {
    // Two writers racing on max+1 must not both land the same order number
    let db = Database::in_memory().expect("in-memory database");
    ChatStore::new(db.clone()).init_schema()?;
    let conn = db.connect()?;
    conn.execute_batch(
        "INSERT INTO chats VALUES (1, 't', now()::TIMESTAMP, now()::TIMESTAMP);
         INSERT INTO chat_messages VALUES (1, 1, 'a', NULL, 1, now()::TIMESTAMP);",
    )?;
    let duplicate = conn.execute_batch(
        "INSERT INTO chat_messages VALUES (2, 1, 'b', NULL, 1, now()::TIMESTAMP);",
    );
    assert!(duplicate.is_err());

    Ok(())
}

#[test]
fn test_concurrent_writers_never_share_an_order() -> Result<(), StoreError> {
    const WRITERS: usize = 8;

    let store = store();
    let chat = store.create_chat(Some("busy"))?;
    let barrier = Barrier::new(WRITERS);

    let outcomes: Vec<Result<Option<ChatMessage>, StoreError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let (store, barrier) = (store.clone(), &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    store.create_message(chat.chat_id, &format!("writer {i}"), None)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("writer thread")).collect()
    });

    let mut won = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(Some(message)) => won.push(message.message_order),
            Ok(None) => panic!("chat exists"),
            // Losing a write conflict surfaces as a database error
            Err(err) => assert!(matches!(err, StoreError::Database(_)), "unexpected error: {err}"),
        }
    }
    won.sort_unstable();
    assert!(!won.is_empty());
    assert_eq!(won, (1..=won.len() as i64).collect::<Vec<_>>());

    let detail = store.get_chat_detail(chat.chat_id)?.expect("chat exists");
    let stored: Vec<i64> = detail.messages.iter().map(|m| m.message_order).collect();
    assert_eq!(stored, won);

    Ok(())
}

#[test]
fn test_create_message_missing_chat() -> Result<(), StoreError> {
    let store = store();

    assert!(store.create_message(999, "lost", None)?.is_none());
    assert!(store.get_chat_detail(999)?.is_none());

    Ok(())
}

#[test]
fn test_message_bumps_updated_at_and_list_order() -> Result<(), StoreError> {
    let store = store();
    let older = store.create_chat(Some("older"))?;
    let newer = store.create_chat(Some("newer"))?;

    let listed = store.list_chats()?;
    assert_eq!(listed[0].chat_id, newer.chat_id);

    store.create_message(older.chat_id, "bump", None)?;
    store.create_message(older.chat_id, "bump again", None)?;

    let listed = store.list_chats()?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].chat_id, older.chat_id);
    assert_eq!(listed[0].message_count, 2);
    assert_eq!(listed[1].message_count, 0);
    assert!(listed[0].updated_at >= listed[0].created_at);
    assert!(listed[0].updated_at > older.updated_at);

    Ok(())
}

#[test]
fn test_visualization_payload_round_trip() -> Result<(), StoreError> {
    let store = store();
    let chat = store.create_chat(None)?;
    let message = store.create_message(chat.chat_id, "plot it", None)?.expect("chat exists");

    let mut viz = bar_chart(json!({"x": [1, 2, 3]}));
    viz.chart_config = Some(
        json!({"xKey": "branch", "colors": ["#123456"]})
            .as_object()
            .cloned()
            .expect("object"),
    );
    let created = store.create_visualization(message.message_id, &viz)?;
    assert_eq!(created.message_id, message.message_id);

    let array_viz = bar_chart(json!([{"branch": "Center", "total": 1200.5}]));
    store.create_visualization(message.message_id, &array_viz)?;

    let detail = store.get_chat_detail(chat.chat_id)?.expect("chat exists");
    let stored = &detail.messages[0].visualizations;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].viz_id, created.viz_id);
    assert_eq!(serde_json::to_value(&stored[0].data_json).unwrap(), json!({"x": [1, 2, 3]}));
    assert_eq!(
        serde_json::to_value(&stored[0].chart_config).unwrap(),
        json!({"xKey": "branch", "colors": ["#123456"]})
    );
    assert!(matches!(stored[1].data_json, VisualizationData::Array(_)));
    assert!(stored[1].chart_config.is_none());

    Ok(())
}

#[test]
fn test_visualization_for_missing_message_fails() {
    let store = store();

    let err = store
        .create_visualization(42, &bar_chart(json!({"x": []})))
        .expect_err("message 42 does not exist");
    assert!(matches!(err, StoreError::MessageNotFound(42)));
}

#[test]
fn test_message_with_visualization_is_atomic() -> Result<(), StoreError> {
    let store = store();
    let chat = store.create_chat(None)?;

    let viz = bar_chart(json!({"y": [4, 5]}));
    let message = store
        .create_message_with_visualization(chat.chat_id, "with chart", Some("SELECT 2"), Some(&viz))?
        .expect("chat exists");
    assert_eq!(message.visualizations.len(), 1);
    assert_eq!(message.visualizations[0].message_id, message.message_id);

    let detail = store.get_chat_detail(chat.chat_id)?.expect("chat exists");
    assert_eq!(detail.messages[0].visualizations.len(), 1);

    Ok(())
}

#[test]
fn test_update_chat_title() -> Result<(), StoreError> {
    let store = store();
    let chat = store.create_chat(None)?;

    assert!(store.update_chat_title(chat.chat_id, "Renamed")?);
    assert!(!store.update_chat_title(chat.chat_id + 100, "Nobody")?);

    let detail = store.get_chat_detail(chat.chat_id)?.expect("chat exists");
    assert_eq!(detail.title, "Renamed");
    assert!(detail.updated_at >= chat.updated_at);

    Ok(())
}

#[test]
fn test_delete_chat_cascades() -> Result<(), StoreError> {
    let store = store();
    let doomed = store.create_chat(Some("doomed"))?;
    let kept = store.create_chat(Some("kept"))?;

    let message = store.create_message(doomed.chat_id, "m", None)?.expect("chat exists");
    store.create_visualization(message.message_id, &bar_chart(json!([1])))?;
    let kept_message = store.create_message(kept.chat_id, "k", None)?.expect("chat exists");
    store.create_visualization(kept_message.message_id, &bar_chart(json!([2])))?;

    assert!(store.delete_chat(doomed.chat_id)?);
    assert!(!store.delete_chat(doomed.chat_id)?);
    assert!(store.get_chat_detail(doomed.chat_id)?.is_none());

    // The orphaned message id can no longer take visualizations
    assert!(matches!(
        store.create_visualization(message.message_id, &bar_chart(json!([3]))),
        Err(StoreError::MessageNotFound(_))
    ));

    let kept_detail = store.get_chat_detail(kept.chat_id)?.expect("chat exists");
    assert_eq!(kept_detail.messages.len(), 1);
    assert_eq!(kept_detail.messages[0].visualizations.len(), 1);

    Ok(())
}
