// tests/test_chat_api.rs
// End-to-end turns through POST /api/message


use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{
    assert_error, create_test_app, create_test_app_with, reply, send, GatedProvider, StubProvider,
};
use twochat::chat::{ContextConfig, Role, Turn};
use twochat::provider::{ProviderFailure, ProviderReply, SENTINEL_REPLY};
use twochat::store::SessionStore;

#[tokio::test]
async fn test_turn_without_session_creates_one() {
    let provider = StubProvider::with_replies(vec![reply("Great to see you!", 0.85, 0.42)]);
    let app = create_test_app_with(provider, ContextConfig::default()).await;

    let (status, body) = send(&app, "POST", "/api/message", Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::OK);

    let session_id = body["sessionId"].as_str().unwrap();
    let reply = &body["reply"];
    assert_eq!(reply["message"], "Great to see you!");
    assert_eq!(reply["label"], "happy");
    assert_eq!(reply["emotion"]["valence"], 0.85);
    assert_eq!(reply["emotion"]["arousal"], 0.42);
    assert!(reply["timings"]["sent"].is_string());
    assert!(reply["timings"]["thinkingDuration"].is_u64());

    let context = app.provider.last_context();
    assert_eq!(context.len(), 2);
    assert_eq!(context.system_turn().role, Role::System);
    assert_eq!(context.user_turn(), &Turn::user("hi"));

    let messages = app.store.get_session_messages(session_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "Great to see you!");
}

#[tokio::test]
async fn test_history_is_replayed_in_order() {
    let app = create_test_app().await;

    send(
        &app,
        "POST",
        "/api/sessions/replay/messages",
        Some(json!({"role": "system", "content": "stored system note"})),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/sessions/replay/messages",
        Some(json!({"role": "user", "content": "my name is Ada"})),
    )
    .await;
    send(
        &app,
        "POST",
        "/api/sessions/replay/messages",
        Some(json!({"role": "assistant", "content": "Nice to meet you, Ada."})),
    )
    .await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/message",
        Some(json!({"sessionId": "replay", "message": "what is my name?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Stored system turns are not replayed
    let context = app.provider.last_context();
    assert_eq!(
        context.replayed(),
        &[
            Turn::user("my name is Ada"),
            Turn::assistant("Nice to meet you, Ada."),
        ]
    );
    assert_eq!(context.user_turn(), &Turn::user("what is my name?"));
}

#[tokio::test]
async fn test_assistant_label_is_persisted() {
    let provider = StubProvider::with_replies(vec![reply("That is awful.", -0.6, 0.6)]);
    let app = create_test_app_with(provider, ContextConfig::default()).await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/message",
        Some(json!({"sessionId": "moody", "message": "they cancelled my flight"})),
    )
    .await;
    assert_eq!(body["reply"]["label"], "angry");

    let (_, body) = send(&app, "GET", "/api/sessions/moody/messages", None).await;
    let messages = body["messages"].as_array().unwrap();
    assert!(messages[0].get("emotion").is_none());
    assert_eq!(messages[1]["emotion"], "angry");
}

#[tokio::test]
async fn test_provider_failure_returns_sentinel() {
    let provider = StubProvider::with_replies(vec![ProviderReply::failed(ProviderFailure::Http {
        status: 502,
        body: "bad gateway".into(),
    })]);
    let app = create_test_app_with(provider, ContextConfig::default()).await;

    let (status, body) = send(&app, "POST", "/api/message", Some(json!({"message": "hello?"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["message"], SENTINEL_REPLY);
    assert_eq!(body["reply"]["label"], "neutral");
    assert!(body["reply"]["emotion"].is_null());

    // The sentinel is part of history for the next turn
    let (_, body) = send(
        &app,
        "POST",
        "/api/message",
        Some(json!({"sessionId": body["sessionId"], "message": "still there?"})),
    )
    .await;
    assert_eq!(body["reply"]["message"], "ok");
    let context = app.provider.last_context();
    assert_eq!(context.replayed()[1], Turn::assistant(SENTINEL_REPLY));
}

#[tokio::test]
async fn test_turn_budget_applies() {
    let config = ContextConfig {
        max_history_turns: 2,
        ..ContextConfig::default()
    };
    let app = create_test_app_with(StubProvider::new(), config).await;

    for message in ["one", "two", "three"] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/message",
            Some(json!({"sessionId": "budget", "message": message})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let context = app.provider.last_context();
    assert_eq!(context.replayed(), &[Turn::user("two"), Turn::assistant("ok")]);
    assert_eq!(context.user_turn(), &Turn::user("three"));
}

#[tokio::test]
async fn test_message_validation() {
    let app = create_test_app().await;

    let (status, body) = send(&app, "POST", "/api/message", Some(json!({"message": "  "}))).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let too_long = "x".repeat(1025);
    let (status, body) = send(&app, "POST", "/api/message", Some(json!({"message": too_long}))).await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/message",
        Some(json!({"sessionId": "no spaces allowed", "message": "hi"})),
    )
    .await;
    assert_error(status, &body, StatusCode::BAD_REQUEST);

    // Rejected before any side effect
    assert!(app.provider.seen().is_empty());
    assert!(app.store.list_sessions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_message_is_trimmed_before_relay() {
    let app = create_test_app().await;

    send(&app, "POST", "/api/message", Some(json!({"message": "\n  hello  \t"}))).await;
    assert_eq!(app.provider.last_context().user_turn(), &Turn::user("hello"));
}

#[tokio::test]
async fn test_delete_waits_for_turn_in_flight() {
    let app = Arc::new(create_test_app_with(GatedProvider::new(), ContextConfig::default()).await);

    let turn_a = {
        let app = app.clone();
        tokio::spawn(async move {
            send(&*app, "POST", "/api/message", Some(json!({"sessionId": "shared", "message": "A"}))).await
        })
    };
    app.provider.wait_until_entered().await;

    let delete = {
        let app = app.clone();
        tokio::spawn(async move { send(&*app, "DELETE", "/api/sessions/shared", None).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let turn_b = {
        let app = app.clone();
        tokio::spawn(async move {
            send(&*app, "POST", "/api/message", Some(json!({"sessionId": "shared", "message": "B"}))).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Both queue behind turn A
    assert!(!delete.is_finished());
    assert!(!turn_b.is_finished());

    app.provider.open();

    let (status, body) = turn_a.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["message"], "reply 0");

    let (status, _) = delete.await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = turn_b.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["message"], "reply 1");

    // Turn A went away with the session; turn B started a fresh one
    let messages = app.store.get_session_messages("shared").await.unwrap();
    let history: Vec<(Role, &str)> = messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(history, vec![(Role::User, "B"), (Role::Assistant, "reply 1")]);
}

#[tokio::test]
async fn test_saved_message_waits_for_turn_in_flight() {
    let app = Arc::new(create_test_app_with(GatedProvider::new(), ContextConfig::default()).await);

    let turn = {
        let app = app.clone();
        tokio::spawn(async move {
            send(&*app, "POST", "/api/message", Some(json!({"sessionId": "notes", "message": "hi"}))).await
        })
    };
    app.provider.wait_until_entered().await;

    let save = {
        let app = app.clone();
        tokio::spawn(async move {
            send(
                &*app,
                "POST",
                "/api/sessions/notes/messages",
                Some(json!({"role": "user", "content": "later"})),
            )
            .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!save.is_finished());

    app.provider.open();
    turn.await.unwrap();
    let (status, _) = save.await.unwrap();
    assert_eq!(status, StatusCode::CREATED);

    // The reply stays next to the message it answers
    let messages = app.store.get_session_messages("notes").await.unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "reply 0", "later"]);
}
