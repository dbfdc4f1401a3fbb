//! HTTP integration tests
//!
//! Requests go straight into the router with `oneshot`; no socket is bound.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use ara_mail_templating::config::Settings;
use ara_mail_templating::server::{create_app, AppState, API_KEY_HEADER};

const TEST_KEY: &str = "test-key";

fn app() -> Router {
    let mut settings = Settings::default();
    settings.api.key = Some(TEST_KEY.to_string());
    create_app(AppState::new(settings))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(API_KEY_HEADER, TEST_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["templating"]["enabled"], true);
    assert!(body["templating"]["capabilities"]
        .as_array()
        .unwrap()
        .contains(&json!("number_format")));
}

#[tokio::test]
async fn test_missing_api_key_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/emails/send")
        .header("content-type", "application/json")
        .body(Body::from(json!({"content": "hi"}).to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_api_key_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/templates/validate")
        .header("content-type", "application/json")
        .header(API_KEY_HEADER, "nope")
        .body(Body::from(json!({"source": "{{ x }}"}).to_string()))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_renders_all_fields() {
    let request = post_json(
        "/api/v1/emails/send",
        json!({
            "content": "<p>Hi {{ contact.firstname }}, total {{ orderTotal }}</p>",
            "plain_text": "{% if orderTotal &gt; 10 %}Thanks!{% endif %}",
            "subject": "Order for {{ lead.firstname }}",
            "tokens": {"{orderTotal}": 42},
            "lead": {"firstname": "Ann"}
        }),
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["kind"], "on_send");
    assert_eq!(body["content"], "<p>Hi Ann, total 42</p>");
    assert_eq!(body["plain_text"], "Thanks!");
    assert_eq!(body["subject"], "Order for Ann");
}

#[tokio::test]
async fn test_display_keeps_broken_subject() {
    let request = post_json(
        "/api/v1/emails/display",
        json!({
            "content": "{{ greeting|default('Hello') }}",
            "subject": "{% if %}",
        }),
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["kind"], "on_display");
    assert_eq!(body["content"], "Hello");
    assert_eq!(body["subject"], "{% if %}");
}

#[tokio::test]
async fn test_validate_reports_undefined_variable() {
    let request = post_json(
        "/api/v1/templates/validate",
        json!({
            "source": "Hi {{ lead.firstnme }}",
            "lead": {"firstname": "Ann"}
        }),
    );

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["valid"], false);
    assert!(body.get("rendered").is_none());
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn test_validate_renders_valid_template() {
    let request = post_json(
        "/api/v1/templates/validate",
        json!({
            "source": "{% if total &gt; 1 %}{{ total|number_format(2) }}{% endif %}",
            "tokens": {"{total}": 1500}
        }),
    );

    let response = app().oneshot(request).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["rendered"], "1,500.00");
}

#[tokio::test]
async fn test_validate_rejects_empty_source() {
    let request = post_json("/api/v1/templates/validate", json!({"source": "  "}));

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_stats_reflect_processed_email() {
    let app = app();

    let send = post_json(
        "/api/v1/emails/send",
        json!({"content": "{{ 2 * 3 }}", "subject": "plain"}),
    );
    let response = app.clone().oneshot(send).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["events"]["send_events"], 1);
    assert_eq!(body["content"]["total_rendered"], 1);
    assert_eq!(body["content"]["total_skipped"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_counters() {
    let app = app();
    let send = post_json("/api/v1/emails/send", json!({"content": "{{ 1 }}"}));
    tokio_test::assert_ok!(app.clone().oneshot(send).await);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("ara_mail_content_processed_total"));
}
