//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use pokerlog_gateway::api::{ApiState, build_router};
use pokerlog_gateway::db::MessageLogRepo;
use pokerlog_gateway::replies;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{Harness, ScriptedChat, Stage, create_test_account};

/// Build a test API router around a harness
fn build_test_router(h: &Harness, token: Option<&str>) -> axum::Router {
    let state = Arc::new(ApiState {
        db: h.db.clone(),
        router: h.router.clone(),
        webhook_token: token.map(|t| SecretString::from(t.to_string())),
    });
    build_router(state)
}

fn webhook_request(body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/whatsapp")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn text_notification(sender: &str, text: &str) -> String {
    json!({
        "typeWebhook": "incomingMessageReceived",
        "idMessage": "BAE5F4886F7B2C4A",
        "senderData": {
            "chatId": sender,
            "sender": sender,
            "senderName": "Dana"
        },
        "messageData": {
            "typeMessage": "textMessage",
            "textMessageData": { "textMessage": text }
        }
    })
    .to_string()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let h = Harness::new(ScriptedChat::default(), None);
    let app = build_test_router(&h, None);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint() {
    let h = Harness::new(ScriptedChat::default(), None);
    let app = build_test_router(&h, None);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_text_message_is_answered() {
    let h = Harness::new(ScriptedChat::default(), None);
    create_test_account(&h.db, "+972541234567");
    let app = build_test_router(&h, None);

    let response = app
        .oneshot(webhook_request(
            &text_notification("972541234567@c.us", "יש משהו הערב?"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);

    let sent = h.channel.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "972541234567@c.us");
    assert_eq!(sent[0].content, replies::NO_TOURNAMENTS);
}

#[tokio::test]
async fn test_status_notification_is_acknowledged() {
    let h = Harness::new(ScriptedChat::default(), None);
    let app = build_test_router(&h, None);
    let body = json!({
        "typeWebhook": "outgoingMessageStatus",
        "idMessage": "BAE5F4886F7B2C4A",
        "status": "delivered"
    })
    .to_string();

    let response = app.oneshot(webhook_request(&body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let h = Harness::new(ScriptedChat::default(), None);
    let app = build_test_router(&h, None);

    let response = app
        .oneshot(webhook_request("{not json", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["success"], false);
    assert!(h.channel.sent().is_empty());
}

#[tokio::test]
async fn test_message_without_sender_is_rejected() {
    let h = Harness::new(ScriptedChat::default(), None);
    let app = build_test_router(&h, None);
    let body = json!({
        "typeWebhook": "incomingMessageReceived",
        "messageData": {
            "typeMessage": "textMessage",
            "textMessageData": { "textMessage": "hi" }
        }
    })
    .to_string();

    let response = app.oneshot(webhook_request(&body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_requires_token_when_configured() {
    let h = Harness::new(ScriptedChat::default(), None);
    create_test_account(&h.db, "+972541234567");
    let body = text_notification("972541234567@c.us", "שלום");

    let response = build_test_router(&h, Some("s3cret"))
        .oneshot(webhook_request(&body, Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = build_test_router(&h, Some("s3cret"))
        .oneshot(webhook_request(&body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(h.channel.sent().is_empty());

    let response = build_test_router(&h, Some("s3cret"))
        .oneshot(webhook_request(&body, Some("s3cret")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.channel.sent().len(), 1);
}

#[tokio::test]
async fn test_routing_panic_returns_500_and_keeps_log_row() {
    let h = Harness::new(ScriptedChat::panicking_at(Stage::Extraction), None);
    create_test_account(&h.db, "+972541234567");
    let app = build_test_router(&h, None);

    let response = app
        .oneshot(webhook_request(
            &text_notification("972541234567@c.us", "מה עושים עם AA?"),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["success"], false);
    assert!(h.channel.sent().is_empty());

    let log = MessageLogRepo::new(h.db.clone())
        .list_for_sender("972541234567@c.us")
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].content, "מה עושים עם AA?");
}
