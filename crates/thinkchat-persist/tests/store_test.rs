use std::sync::Arc;
use thinkchat_persist::{
    ChatStore, MemoryStore, MessageRole, NewMessage, PersistError, SqliteStore, StoreEvent,
};

async fn stores() -> Vec<(&'static str, Arc<dyn ChatStore>)> {
    vec![
        ("memory", Arc::new(MemoryStore::new())),
        ("sqlite", Arc::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

#[tokio::test]
async fn test_demo_thread_scenario() {
    for (backend, store) in stores().await {
        let older = store.create_thread("Older").await.unwrap();
        let demo = store.create_thread("Demo").await.unwrap();

        let user = store
            .append_message(NewMessage::user(&demo.id, "What is 2+2?"))
            .await
            .unwrap();
        let assistant = store
            .append_message(NewMessage::assistant(&demo.id, "4", "Simple arithmetic."))
            .await
            .unwrap();

        let threads = store.list_threads().await.unwrap();
        assert_eq!(threads[0].title, "Demo", "{backend}");
        assert_eq!(threads[1].id, older.id, "{backend}");

        let messages = store.list_messages(&demo.id).await.unwrap();
        assert_eq!(messages, vec![user, assistant], "{backend}");
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].thought, "Simple arithmetic.");
    }
}

#[tokio::test]
async fn test_updated_at_covers_latest_message() {
    for (backend, store) in stores().await {
        let thread = store.create_thread("Clock").await.unwrap();
        for i in 0..5 {
            let message = store
                .append_message(NewMessage::user(&thread.id, format!("m{i}")))
                .await
                .unwrap();
            let reloaded = store.get_thread(&thread.id).await.unwrap().unwrap();
            assert!(reloaded.updated_at >= message.created_at, "{backend}");
            assert!(reloaded.updated_at >= reloaded.created_at, "{backend}");
        }
    }
}

#[tokio::test]
async fn test_concurrent_appends_keep_order() {
    for (backend, store) in stores().await {
        let a = store.create_thread("A").await.unwrap();
        let b = store.create_thread("B").await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            let thread_id = if i % 2 == 0 { a.id.clone() } else { b.id.clone() };
            handles.push(tokio::spawn(async move {
                store
                    .append_message(NewMessage::user(thread_id, format!("msg {i}")))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for thread_id in [&a.id, &b.id] {
            let messages = store.list_messages(thread_id).await.unwrap();
            assert_eq!(messages.len(), 10, "{backend}");
            assert!(
                messages.windows(2).all(|w| w[0].created_at < w[1].created_at),
                "{backend}: created_at must strictly increase"
            );

            let thread = store.get_thread(thread_id).await.unwrap().unwrap();
            assert_eq!(thread.updated_at, messages[9].created_at, "{backend}");
        }
    }
}

#[tokio::test]
async fn test_unknown_thread() {
    for (backend, store) in stores().await {
        assert!(store.get_thread("ghost").await.unwrap().is_none(), "{backend}");
        assert!(store.list_messages("ghost").await.unwrap().is_empty(), "{backend}");

        let err = store
            .append_message(NewMessage::user("ghost", "boo"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::ThreadNotFound(_)), "{backend}");
    }
}

#[tokio::test]
async fn test_notifications_follow_committed_writes() {
    for (backend, store) in stores().await {
        let mut events = store.subscribe();

        let thread = store.create_thread("Events").await.unwrap();
        match events.recv().await.unwrap() {
            StoreEvent::ThreadCreated { thread_id } => assert_eq!(thread_id, thread.id),
            other => panic!("{backend}: unexpected {other:?}"),
        }

        let message = store
            .append_message(NewMessage::user(&thread.id, "ping"))
            .await
            .unwrap();
        match events.recv().await.unwrap() {
            StoreEvent::MessageAppended { thread_id, message_id } => {
                assert_eq!(thread_id, thread.id);
                assert_eq!(message_id, message.id);
                // Visible by the time the notification arrives
                let messages = store.list_messages(&thread_id).await.unwrap();
                assert!(messages.iter().any(|m| m.id == message_id));
            }
            other => panic!("{backend}: unexpected {other:?}"),
        }

        let _ = store.append_message(NewMessage::user("ghost", "x")).await;
        assert!(events.try_recv().is_err(), "{backend}: failed append must not notify");
    }
}
