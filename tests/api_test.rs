//! HTTP-level tests through the full router.

mod common;

use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use uuid::Uuid;

use procfile_service::RequestContext;

use common::{PNG, TestHarness, approver, request};

fn signature() -> String {
    STANDARD.encode(PNG)
}

fn create_body(equipment_id: Uuid) -> Value {
    json!({
        "equipment_id": equipment_id,
        "file_name": "Barrel and mold temperatures",
        "content": { "barrel_temp_c": 230, "mold_temp_c": 60 },
    })
}

fn decision_body(level: u8, result: &str, opinion: Option<&str>) -> Value {
    json!({
        "level": level,
        "result": result,
        "opinion": opinion,
        "signature_image": signature(),
    })
}

async fn create_via_api(h: &TestHarness) -> String {
    let app = h.router();
    let res = request(
        &app,
        "POST",
        "/api/process-files",
        Some(create_body(h.equipment.id)),
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED, "body: {}", res.body);
    res.body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let h = TestHarness::new().await;
    let app = h.router();

    let res = request(&app, "GET", "/api/process-files", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"], "AUTHENTICATION");

    let req = axum::http::Request::builder()
        .method("GET")
        .uri("/api/process-files")
        .header("x-actor-id", "not-a-uuid")
        .header("x-actor-role", "PROCESS_ENGINEER")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_backends() {
    let h = TestHarness::new().await;
    let res = request(&h.router(), "GET", "/api/health", None, None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "ok");
    assert_eq!(res.body["data"]["store"]["backend"], "memory");
    assert_eq!(res.body["data"]["blobs"]["healthy"], true);
}

#[tokio::test]
async fn test_create_returns_draft_view() {
    let h = TestHarness::new().await;
    let res = request(
        &h.router(),
        "POST",
        "/api/process-files",
        Some(create_body(h.equipment.id)),
        Some(&h.creator),
    )
    .await;

    assert_eq!(res.status, StatusCode::CREATED);
    let data = &res.body["data"];
    assert_eq!(data["status"], "draft");
    assert_eq!(data["status_code"], 0);
    assert_eq!(data["version"], 1);
    assert_eq!(data["is_current"], false);
    assert_eq!(data["is_superseded"], false);
    assert_eq!(data["creator_id"], h.creator.actor_id.to_string());
}

#[tokio::test]
async fn test_create_rejects_blank_name() {
    let h = TestHarness::new().await;
    let mut body = create_body(h.equipment.id);
    body["file_name"] = json!("");

    let res = request(
        &h.router(),
        "POST",
        "/api/process-files",
        Some(body),
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "VALIDATION");
}

#[tokio::test]
async fn test_full_chain_over_http() {
    let h = TestHarness::new().await;
    let app = h.router();
    let id = create_via_api(&h).await;

    let res = request(
        &app,
        "POST",
        &format!("/api/process-files/{id}/submit"),
        Some(json!({ "signature_image": signature() })),
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["data"]["status_code"], 1);

    for level in 1..=3u8 {
        let res = request(
            &app,
            "POST",
            &format!("/api/process-files/{id}/decisions"),
            Some(decision_body(level, "approve", None)),
            Some(&approver(level)),
        )
        .await;
        assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    }

    let res = request(
        &app,
        "GET",
        &format!("/api/process-files/{id}"),
        None,
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    let data = &res.body["data"];
    assert_eq!(data["file"]["status"], "effective");
    assert_eq!(data["file"]["status_code"], 5);
    assert_eq!(data["file"]["is_current"], true);
    assert_eq!(data["approvals"].as_array().unwrap().len(), 3);
    assert_eq!(data["signatures"].as_array().unwrap().len(), 4);
    assert!(data["seal"]["seal_no"].as_str().unwrap().starts_with("SEAL"));

    let res = request(
        &app,
        "GET",
        &format!("/api/equipment/{}/current", h.equipment.id),
        None,
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["id"], id);

    let signature_id = data["signatures"][0]["id"].as_str().unwrap();
    let res = request(
        &app,
        "GET",
        &format!("/api/signatures/{signature_id}/image"),
        None,
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(&res.bytes[..], PNG);
}

#[tokio::test]
async fn test_second_open_document_is_conflict_with_reason() {
    let h = TestHarness::new().await;
    create_via_api(&h).await;

    let res = request(
        &h.router(),
        "POST",
        "/api/process-files",
        Some(create_body(h.equipment.id)),
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"], "CONFLICT");
    assert_eq!(res.body["reason"], "OpenFileExists");
}

#[tokio::test]
async fn test_wrong_state_is_unprocessable() {
    let h = TestHarness::new().await;
    let id = create_via_api(&h).await;

    let res = request(
        &h.router(),
        "POST",
        &format!("/api/process-files/{id}/decisions"),
        Some(decision_body(1, "approve", None)),
        Some(&approver(1)),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"], "STATE");
    assert!(res.body.get("reason").is_none());
}

#[tokio::test]
async fn test_role_mismatch_is_forbidden() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    h.submit(&file).await;

    let res = request(
        &h.router(),
        "POST",
        &format!("/api/process-files/{}/decisions", file.id),
        Some(decision_body(1, "reject", Some("no"))),
        Some(&RequestContext::new(Uuid::new_v4(), "OPERATOR")),
    )
    .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"], "AUTHORIZATION");
}

#[tokio::test]
async fn test_reject_over_http_needs_opinion() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    h.submit(&file).await;
    let app = h.router();
    let path = format!("/api/process-files/{}/decisions", file.id);

    let res = request(
        &app,
        "POST",
        &path,
        Some(decision_body(1, "reject", None)),
        Some(&approver(1)),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = request(
        &app,
        "POST",
        &path,
        Some(decision_body(1, "reject", Some("mold temperature too low"))),
        Some(&approver(1)),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["status"], "rejected");
    assert_eq!(res.body["data"]["status_code"], -1);
}

#[tokio::test]
async fn test_pending_list_is_scoped_to_role() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    h.submit(&file).await;
    let app = h.router();

    let res = request(
        &app,
        "GET",
        "/api/process-files/pending",
        None,
        Some(&approver(1)),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["total"], 1);
    assert_eq!(res.body["data"]["items"][0]["id"], file.id.to_string());

    let res = request(
        &app,
        "GET",
        "/api/process-files/pending",
        None,
        Some(&approver(2)),
    )
    .await;
    assert_eq!(res.body["data"]["total"], 0);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let h = TestHarness::new().await;
    let file = h.create_root().await;
    let app = h.router();

    let res = request(
        &app,
        "GET",
        "/api/process-files?status=draft",
        None,
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["total"], 1);
    assert_eq!(res.body["data"]["items"][0]["id"], file.id.to_string());

    let res = request(
        &app,
        "GET",
        "/api/process-files?status=5",
        None,
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.body["data"]["total"], 0);

    let res = request(
        &app,
        "GET",
        "/api/process-files?status=archived",
        None,
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let h = TestHarness::new().await;
    h.create_root().await;

    let res = request(
        &h.router(),
        "GET",
        &format!("/api/process-files?page={}", u64::MAX),
        None,
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "body: {}", res.body);
    assert_eq!(res.body["data"]["total"], 1);
    assert_eq!(res.body["data"]["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_document_download_over_http() {
    let h = TestHarness::new().await;
    let mut body = create_body(h.equipment.id);
    body["document"] = json!({
        "name": "barrel-setup.xlsx",
        "content_base64": STANDARD.encode(b"PK\x03\x04sheet"),
    });
    let app = h.router();
    let res = request(
        &app,
        "POST",
        "/api/process-files",
        Some(body),
        Some(&h.creator),
    )
    .await;
    assert_eq!(res.status, StatusCode::CREATED);
    let id = res.body["data"]["id"].as_str().unwrap().to_string();

    let req = axum::http::Request::builder()
        .method("GET")
        .uri(format!("/api/process-files/{id}/document"))
        .header("x-actor-id", h.creator.actor_id.to_string())
        .header("x-actor-role", "PROCESS_ENGINEER")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = tower::ServiceExt::oneshot(app, req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let disposition = res
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("barrel-setup.xlsx"));
    let bytes = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"PK\x03\x04sheet");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let h = TestHarness::new().await;
    let app = h.router();
    let missing = Uuid::new_v4();

    for path in [
        format!("/api/process-files/{missing}"),
        format!("/api/process-files/{missing}/lineage"),
        format!("/api/equipment/{missing}/current"),
        format!("/api/equipment/{missing}/process-files"),
    ] {
        let res = request(&app, "GET", &path, None, Some(&h.creator)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND, "path: {path}");
        assert_eq!(res.body["error"], "NOT_FOUND");
    }
}
