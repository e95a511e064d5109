use super::*;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    response::Response,
};
use blob_store::{BlobStore, BuildFile, MemoryBlobStore};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_app_with_limit(max_upload_bytes: usize) -> (Router, Arc<MemoryBlobStore>) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let blobs = Arc::new(MemoryBlobStore::new());
    let state = AppState {
        api: ApiContext {
            storage,
            blobs: blobs.clone(),
            default_container: "builds".to_string(),
        },
        max_upload_bytes,
    };
    (build_router(Arc::new(state)), blobs)
}

async fn test_app() -> (Router, Arc<MemoryBlobStore>) {
    test_app_with_limit(1024 * 1024).await
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");
    app.clone().oneshot(request).await.expect("response")
}

async fn json_body(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

async fn upload_complete_build(blobs: &MemoryBlobStore, path: &str) {
    for file in BuildFile::ALL {
        blobs
            .upload("builds", &file.blob_name(path), vec![7; 4], file.content_headers())
            .await
            .expect("upload");
    }
}

#[tokio::test]
async fn healthz_reports_ok_when_storage_is_ready() {
    let (app, _) = test_app().await;
    let response = send(&app, "GET", "/healthz", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn formation_routes_cover_the_lifecycle() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        "POST",
        "/formations",
        Some(json!({ "name": "Fire safety", "external_id": "fire-101" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let formation_id = json_body(response).await["formation_id"]
        .as_i64()
        .expect("formation id");

    let response = send(
        &app,
        "POST",
        &format!("/formations/{formation_id}/contents"),
        Some(json!({ "kind": "quiz", "title": "Check" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let content_id = json_body(response).await["content_id"]
        .as_i64()
        .expect("content id");

    let response = send(
        &app,
        "PUT",
        &format!("/contents/{content_id}/questions"),
        Some(json!([{
            "text": "Which class?",
            "kind": "single",
            "options": [
                { "text": "A", "is_correct": false },
                { "text": "B", "is_correct": true }
            ]
        }])),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "PUT",
        &format!("/contents/{content_id}/steps"),
        Some(json!([{ "title": "not on a quiz" }])),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "validation");

    let response = send(&app, "GET", &format!("/formations/{formation_id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = json_body(response).await;
    assert_eq!(detail["name"], "Fire safety");
    assert_eq!(detail["content_count"], 1);
    assert_eq!(detail["contents"][0]["questions"][0]["options"][1]["is_correct"], true);

    let response = send(
        &app,
        "POST",
        &format!("/formations/{formation_id}/duplicate"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["name"], "Fire safety (copy)");

    let response = send(&app, "GET", "/formations?search=copy", None).await;
    assert_eq!(json_body(response).await.as_array().map(Vec::len), Some(1));

    let response = send(&app, "DELETE", &format!("/formations/{formation_id}"), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&app, "GET", &format!("/formations/{formation_id}"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["code"], "not_found");
}

#[tokio::test]
async fn malformed_input_gets_a_validation_error_body() {
    let (app, _) = test_app().await;

    let response = send(
        &app,
        "POST",
        "/formations",
        Some(json!({ "description": "no name" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "validation");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("name")));

    let response = send(&app, "GET", "/organizations", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "validation");
    assert!(body["message"].as_str().is_some_and(|m| m.contains("user_id")));

    let response = send(&app, "GET", "/formations/not-a-number", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "validation");

    let request = Request::post("/formations")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "validation");
}

#[tokio::test]
async fn export_and_import_round_trip_over_http() {
    let (app, _) = test_app().await;
    let response = send(
        &app,
        "POST",
        "/formations",
        Some(json!({ "name": "First aid", "external_id": "aid-1" })),
    )
    .await;
    let formation_id = json_body(response).await["formation_id"]
        .as_i64()
        .expect("formation id");

    let response = send(&app, "GET", &format!("/formations/{formation_id}/export"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut document = json_body(response).await;
    assert_eq!(document["version"], 1);

    let response = send(&app, "POST", "/formations/import", Some(document.clone())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    document["formation"]["external_id"] = json!("aid-2");
    let response = send(&app, "POST", "/formations/import", Some(document)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["external_id"], "aid-2");
}

#[tokio::test]
async fn build_upload_association_and_modules() {
    let (app, blobs) = test_app().await;

    let request = Request::post("/builds/upload?path=wisetrainer/Plant.loader.js")
        .body(Body::from("loader"))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["size_bytes"], 6);

    let request = Request::post("/builds/upload?path=../escape.loader.js")
        .body(Body::from("loader"))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/formations",
        Some(json!({ "name": "Plant tour" })),
    )
    .await;
    let formation_id = json_body(response).await["formation_id"]
        .as_i64()
        .expect("formation id");

    let response = send(
        &app,
        "PUT",
        &format!("/formations/{formation_id}/build"),
        Some(json!({ "build_ref": "Plant" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    upload_complete_build(&blobs, "wisetrainer/Plant").await;
    let response = send(
        &app,
        "PUT",
        &format!("/formations/{formation_id}/build"),
        Some(json!({ "build_ref": "Plant", "version": "2" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["build_ref"], "builds:wisetrainer/Plant");

    let response = send(&app, "GET", "/builds", None).await;
    let listings = json_body(response).await;
    assert_eq!(listings[0]["complete"], true);
    assert_eq!(listings[0]["formation_id"], formation_id);

    let modules_uri = "/builds/builds:wisetrainer%2FPlant/modules";
    let response = send(
        &app,
        "PUT",
        modules_uri,
        Some(json!([{
            "module_key": "valve",
            "title": "Valve",
            "kind": "guide",
            "content": { "steps": ["open"] }
        }])),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let module_id = json_body(response).await[0]["module_id"]
        .as_i64()
        .expect("module id");

    let response = send(
        &app,
        "PUT",
        &format!("/modules/{module_id}"),
        Some(json!({ "title": "Main valve" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(&app, "GET", modules_uri, None).await;
    assert_eq!(json_body(response).await[0]["title"], "Main valve");

    let response = send(&app, "GET", &format!("/formations/{formation_id}/build"), None).await;
    assert_eq!(json_body(response).await["modules"][0]["module_key"], "valve");

    let response = send(&app, "DELETE", "/builds/Plant", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let deleted = json_body(response).await;
    assert_eq!(deleted["deleted_blobs"].as_array().map(Vec::len), Some(4));
    assert_eq!(deleted["deleted_record"], true);

    let response = send(&app, "GET", &format!("/formations/{formation_id}/build"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_upload_is_rejected_by_the_body_limit() {
    let (app, blobs) = test_app_with_limit(16).await;
    let request = Request::post("/builds/upload?path=Plant.wasm.gz")
        .header("content-length", "64")
        .body(Body::from(vec![0u8; 64]))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(blobs.get("builds", "Plant.wasm.gz").await.is_none());
}

#[tokio::test]
async fn organization_routes_enforce_roles() {
    let (app, _) = test_app().await;
    let mut users = Vec::new();
    for email in ["owner@acme.test", "outsider@acme.test"] {
        let response = send(&app, "POST", "/users", Some(json!({ "email": email }))).await;
        assert_eq!(response.status(), StatusCode::OK);
        users.push(json_body(response).await["user_id"].as_i64().expect("user id"));
    }
    let (owner, outsider) = (users[0], users[1]);

    let response = send(
        &app,
        "POST",
        &format!("/organizations?user_id={owner}"),
        Some(json!({ "name": "Acme" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let org = json_body(response).await["organization_id"]
        .as_i64()
        .expect("organization id");

    let response = send(
        &app,
        "GET",
        &format!("/organizations/{org}?user_id={outsider}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "forbidden");

    let response = send(
        &app,
        "POST",
        &format!("/organizations/{org}/members?user_id={owner}"),
        Some(json!({ "email": "worker@acme.test", "role": "member" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let worker = json_body(response).await["user_id"]
        .as_i64()
        .expect("worker id");

    let response = send(
        &app,
        "DELETE",
        &format!("/organizations/{org}?user_id={worker}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        "DELETE",
        &format!("/organizations/{org}/members/{owner}?user_id={owner}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "PUT",
        &format!("/organizations/{org}/members/{worker}?user_id={owner}"),
        Some(json!({ "role": "admin" })),
    )
    .await;
    assert_eq!(json_body(response).await["role"], "admin");

    let response = send(&app, "POST", "/formations", Some(json!({ "name": "Fire" }))).await;
    let formation_id = json_body(response).await["formation_id"]
        .as_i64()
        .expect("formation id");
    let response = send(
        &app,
        "POST",
        &format!("/organizations/{org}/trainings?user_id={worker}"),
        Some(json!({ "formation_id": formation_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &app,
        "GET",
        &format!("/organizations/{org}/trainings?user_id={owner}"),
        None,
    )
    .await;
    assert_eq!(json_body(response).await[0]["formation_id"], formation_id);

    let response = send(
        &app,
        "DELETE",
        &format!("/organizations/{org}/trainings/{formation_id}?user_id={owner}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        "DELETE",
        &format!("/organizations/{org}?user_id={owner}"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[test]
fn memory_backend_needs_no_endpoint() {
    let settings = crate::config::settings_from(
        None,
        [("APP__BLOB_BACKEND".to_string(), "memory".to_string())]
            .into_iter()
            .collect(),
    )
    .expect("settings");
    assert!(blob_store_for(&settings).is_ok());
}

#[test]
fn azure_backend_requires_an_endpoint() {
    let settings = crate::config::settings_from(
        None,
        [("APP__BLOB_BACKEND".to_string(), "azure".to_string())]
            .into_iter()
            .collect(),
    )
    .expect("settings");
    assert!(blob_store_for(&settings).is_err());
}
