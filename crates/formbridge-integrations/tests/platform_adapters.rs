//! Built-in adapters against stub platform APIs.

mod common;

use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use common::{map, spawn, test_env, UNREACHABLE};
use formbridge_core::Error;
use formbridge_integrations::adapters::{HubSpotAdapter, MailchimpAdapter, WebhookAdapter};
use formbridge_integrations::{IntegrationAdapter, Submission};

type Captured = Arc<Mutex<Vec<(String, HeaderMap, Value)>>>;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn submission(data: Value) -> Submission {
    Submission::from_form_data(1, map(data)).unwrap()
}

// ---------------------------------------------------------------
// Mailchimp
// ---------------------------------------------------------------

fn stub_mailchimp(captured: Captured) -> Router {
    Router::new()
        .route(
            "/ping",
            get(|headers: HeaderMap| async move {
                // "formbridge:key-us1"
                if header(&headers, "authorization") == Some("Basic Zm9ybWJyaWRnZTprZXktdXMx") {
                    (StatusCode::OK, Json(json!({"health_status": "Everything's Chimpy!"})))
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"title": "API Key Invalid", "detail": "Your API key may be invalid"})),
                    )
                }
            }),
        )
        .route(
            "/lists/{list_id}/members",
            post(
                move |Path(list_id): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                    let captured = captured.clone();
                    async move {
                        let existing = body["email_address"] == "taken@b.com";
                        captured.lock().unwrap().push((list_id, headers, body));
                        if existing {
                            (
                                StatusCode::BAD_REQUEST,
                                Json(json!({
                                    "title": "Member Exists",
                                    "detail": "taken@b.com is already a list member"
                                })),
                            )
                        } else {
                            (
                                StatusCode::OK,
                                Json(json!({"id": "member-1", "status": "subscribed"})),
                            )
                        }
                    }
                },
            ),
        )
}

#[tokio::test]
async fn test_mailchimp_connection() {
    let env = test_env();
    let base = spawn(stub_mailchimp(Arc::default())).await;
    let adapter = MailchimpAdapter::new(env.ctx.clone()).with_base_url(&base);

    let ok = adapter.test_connection(&map(json!({"api_key": "key-us1"}))).await;
    assert!(ok.success);
    assert_eq!(ok.data.unwrap()["health_status"], "Everything's Chimpy!");

    let bad = adapter.test_connection(&map(json!({"api_key": "nope-us1"}))).await;
    assert_eq!(bad.error.as_deref(), Some("Your API key may be invalid"));

    let missing = adapter.test_connection(&map(json!({}))).await;
    assert_eq!(missing.error.as_deref(), Some("API Key is required"));
}

#[tokio::test]
async fn test_mailchimp_key_without_data_center() {
    let env = test_env();
    let adapter = MailchimpAdapter::new(env.ctx.clone());
    let result = adapter.test_connection(&map(json!({"api_key": "abc"}))).await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("data center"));
}

#[tokio::test]
async fn test_mailchimp_subscribe() {
    let env = test_env();
    let captured = Captured::default();
    let base = spawn(stub_mailchimp(captured.clone())).await;
    let adapter = MailchimpAdapter::new(env.ctx.clone()).with_base_url(&base);
    adapter
        .save_global_settings(&map(json!({"api_key": "key-us1"})))
        .unwrap();

    let settings = map(json!({
        "enabled": true,
        "action": "add_subscriber",
        "list_id": "abc123",
        "tags": "lead, website",
        "double_optin": true,
        "field_mapping": {"email_address": "email", "FNAME": "first"}
    }));
    assert!(adapter.validate_settings(&settings).is_empty());

    let data = adapter
        .process_submission(
            &submission(json!({"form_id": 1, "email": "a@b.com", "first": "Ann", "extra": 1})),
            &settings,
        )
        .await
        .unwrap();
    assert_eq!(data["id"], "member-1");

    let calls = captured.lock().unwrap();
    let (list_id, headers, body) = &calls[0];
    assert_eq!(list_id, "abc123");
    assert!(header(headers, "authorization").unwrap().starts_with("Basic "));
    assert_eq!(
        body,
        &json!({
            "email_address": "a@b.com",
            "status": "pending",
            "merge_fields": {"FNAME": "Ann"},
            "tags": ["lead", "website"]
        })
    );
}

#[tokio::test]
async fn test_mailchimp_existing_member_is_not_updated() {
    let env = test_env();
    let captured = Captured::default();
    let base = spawn(stub_mailchimp(captured.clone())).await;
    let adapter = MailchimpAdapter::new(env.ctx.clone()).with_base_url(&base);
    adapter
        .save_global_settings(&map(json!({"api_key": "key-us1"})))
        .unwrap();

    let actions = adapter.available_actions();
    assert_eq!(actions[0].description, "Add a new contact to an audience");

    let settings = map(json!({
        "enabled": true,
        "action": "add_subscriber",
        "list_id": "abc123",
        "field_mapping": {"email_address": "email", "FNAME": "first"}
    }));
    let err = adapter
        .process_submission(
            &submission(json!({"form_id": 1, "email": "taken@b.com", "first": "New"})),
            &settings,
        )
        .await
        .unwrap_err();
    match err {
        Error::RemoteApi { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "taken@b.com is already a list member");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // One create attempt, no follow-up update.
    assert_eq!(captured.lock().unwrap().len(), 1);
}

#[test]
fn test_mailchimp_validation() {
    let env = test_env();
    let adapter = MailchimpAdapter::new(env.ctx.clone());
    assert_eq!(
        adapter.validate_settings(&map(json!({}))),
        vec!["Action is required", "Audience is required"]
    );
    assert!(adapter
        .field_mapping("add_subscriber")
        .iter()
        .any(|t| t.field == "email_address" && t.required));
    assert_eq!(adapter.settings_fields().len(), 3);
}

// ---------------------------------------------------------------
// HubSpot
// ---------------------------------------------------------------

fn stub_hubspot(captured: Captured) -> Router {
    Router::new()
        .route(
            "/crm/v3/objects/contacts",
            get(
                |headers: HeaderMap, Query(query): Query<std::collections::HashMap<String, String>>| async move {
                    if header(&headers, "authorization") == Some("Bearer pat-1")
                        && query.get("limit").map(String::as_str) == Some("1")
                    {
                        (StatusCode::OK, Json(json!({"results": []})))
                    } else {
                        (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({"status": "error", "message": "Authentication credentials not found"})),
                        )
                    }
                },
            ),
        )
        .route(
            "/crm/v3/objects/{object}",
            post(
                move |Path(object): Path<String>, headers: HeaderMap, Json(body): Json<Value>| {
                    let captured = captured.clone();
                    async move {
                        captured.lock().unwrap().push((object, headers, body));
                        (StatusCode::CREATED, Json(json!({"id": "101"})))
                    }
                },
            ),
        )
}

#[tokio::test]
async fn test_hubspot_connection() {
    let env = test_env();
    let base = spawn(stub_hubspot(Arc::default())).await;
    let adapter = HubSpotAdapter::new(env.ctx.clone()).with_base_url(&base);

    assert!(adapter.test_connection(&map(json!({"access_token": "pat-1"}))).await.success);
    let bad = adapter.test_connection(&map(json!({"access_token": "pat-2"}))).await;
    assert_eq!(bad.error.as_deref(), Some("Authentication credentials not found"));
}

#[tokio::test]
async fn test_hubspot_create_deal_adds_pipeline() {
    let env = test_env();
    let captured = Captured::default();
    let base = spawn(stub_hubspot(captured.clone())).await;
    let adapter = HubSpotAdapter::new(env.ctx.clone()).with_base_url(&base);
    adapter
        .save_global_settings(&map(json!({"access_token": "pat-1"})))
        .unwrap();

    let settings = map(json!({
        "action": "create_deal",
        "pipeline": "default",
        "dealstage": "appointmentscheduled",
        "field_mapping": {"dealname": "subject", "amount": "budget"}
    }));
    adapter
        .process_submission(
            &submission(json!({"form_id": 1, "subject": "Website lead", "budget": 500})),
            &settings,
        )
        .await
        .unwrap();

    let calls = captured.lock().unwrap();
    let (object, headers, body) = &calls[0];
    assert_eq!(object, "deals");
    assert_eq!(header(headers, "authorization"), Some("Bearer pat-1"));
    assert_eq!(
        body,
        &json!({"properties": {
            "dealname": "Website lead",
            "amount": 500,
            "pipeline": "default",
            "dealstage": "appointmentscheduled"
        }})
    );
}

#[tokio::test]
async fn test_hubspot_requires_saved_token() {
    let env = test_env();
    let adapter = HubSpotAdapter::new(env.ctx.clone()).with_base_url(UNREACHABLE);
    let settings = map(json!({"action": "create_contact", "field_mapping": {"email": "email"}}));

    let err = adapter
        .process_submission(&submission(json!({"form_id": 1, "email": "a@b.com"})), &settings)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(msg) if msg.contains("Access Token is required")));
}

#[test]
fn test_hubspot_rejects_unknown_action() {
    let env = test_env();
    let adapter = HubSpotAdapter::new(env.ctx.clone());
    assert_eq!(
        adapter.validate_settings(&map(json!({"action": "create_ticket"}))),
        vec!["Unsupported action: create_ticket"]
    );
    assert!(adapter.validate_settings(&map(json!({"action": "create_contact"}))).is_empty());
}

// ---------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------

fn stub_webhook(captured: Captured) -> Router {
    Router::new().route(
        "/hook",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = captured.clone();
            async move {
                captured.lock().unwrap().push(("hook".into(), headers, body));
                StatusCode::NO_CONTENT
            }
        })
        .get(|| async { "ok" }),
    )
}

#[tokio::test]
async fn test_webhook_forwards_everything_without_mapping() {
    let env = test_env();
    let captured = Captured::default();
    let base = spawn(stub_webhook(captured.clone())).await;
    let adapter = WebhookAdapter::new(env.ctx.clone());
    assert!(adapter.is_configured());
    adapter
        .save_global_settings(&map(json!({"secret": "s3cret"})))
        .unwrap();

    let settings = map(json!({"enabled": true, "action": "send", "url": format!("{}/hook", base)}));
    assert!(adapter.is_enabled(&settings));

    let data = adapter
        .process_submission(
            &submission(json!({"form_id": 1, "email": "a@b.com", "msg": "hi"})),
            &settings,
        )
        .await
        .unwrap();
    assert_eq!(data, Value::Null);

    let calls = captured.lock().unwrap();
    let (_, headers, body) = &calls[0];
    assert_eq!(header(headers, "x-formbridge-secret"), Some("s3cret"));
    assert_eq!(body, &json!({"form_id": 1, "email": "a@b.com", "msg": "hi"}));
}

#[tokio::test]
async fn test_webhook_connection_and_validation() {
    let env = test_env();
    let base = spawn(stub_webhook(Arc::default())).await;
    let adapter = WebhookAdapter::new(env.ctx.clone());

    let ok = adapter
        .test_connection(&map(json!({"url": format!("{}/hook", base)})))
        .await;
    assert!(ok.success);

    let no_url = adapter.test_connection(&map(json!({}))).await;
    assert_eq!(no_url.error.as_deref(), Some("Webhook URL is required"));

    assert_eq!(
        adapter.validate_settings(&map(json!({"action": "send", "url": "ftp://x"}))),
        vec!["Webhook URL must start with http:// or https://"]
    );
}
