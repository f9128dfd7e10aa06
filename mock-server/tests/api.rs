use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, ImageRecord, User};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder().uri(uri).body(axum::body::Body::empty()).unwrap()
}

fn upload_request(uri: &str, content_type: &str, body: &'static [u8]) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, content_type)
        .body(axum::body::Body::from(body))
        .unwrap()
}

const UPLOAD_URI: &str = "/users/u1/images/IMG_0001.png/Half%20Dome/400/300/37.864851/119.538523/Austin";

/// Router with user `u1` already registered.
async fn app_with_user() -> Router {
    let app = app();
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/users", r#"{"_id":"u1","name":"Ada"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    app
}

// --- images ---

#[tokio::test]
async fn list_images_empty() {
    let resp = app().oneshot(get("/images")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["records"], serde_json::json!([]));
}

#[tokio::test]
async fn upload_image_returns_201_with_decoded_metadata() {
    let app = app_with_user().await;
    let resp = app
        .clone()
        .oneshot(upload_request(UPLOAD_URI, "image/png", b"\x89PNG\r\n"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let record: ImageRecord = body_json(resp).await;
    assert_eq!(record.file_name, "IMG_0001.png");
    assert_eq!(record.caption, "Half Dome");
    assert_eq!((record.width, record.height), (400, 300));
    assert_eq!(record.location.name, "Austin");
    assert_eq!(record.size, 6);
    assert_eq!(record.content_type, "image/png");
    assert_eq!(record.user.name, "Ada");

    let resp = app.oneshot(get("/images")).await.unwrap();
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 1);
    assert_eq!(body["records"][0]["user"]["_id"], "u1");
}

#[tokio::test]
async fn upload_for_unknown_user_returns_404() {
    let resp = app()
        .oneshot(upload_request(UPLOAD_URI, "image/png", b"png"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_requires_image_content_type() {
    let app = app_with_user().await;
    let resp = app
        .oneshot(upload_request(UPLOAD_URI, "application/json", b"{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn upload_rejects_empty_body() {
    let app = app_with_user().await;
    let resp = app.oneshot(upload_request(UPLOAD_URI, "image/png", b"")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_with_empty_caption_and_city_is_stored() {
    let app = app_with_user().await;
    let resp = app
        .oneshot(upload_request("/users/u1/images/a.png//1/1/0/120/", "image/png", b"png"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let record: ImageRecord = body_json(resp).await;
    assert_eq!(record.caption, "");
    assert_eq!(record.location.name, "");
    assert_eq!(record.location.longitude, 120.0);
}

#[tokio::test]
async fn upload_with_non_numeric_width_is_rejected() {
    let app = app_with_user().await;
    let resp = app
        .oneshot(upload_request(
            "/users/u1/images/a.png/cap/wide/300/1/2/Austin",
            "image/png",
            b"png",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_images_omit_user_field() {
    let app = app_with_user().await;
    app.clone()
        .oneshot(upload_request(UPLOAD_URI, "image/png", b"png"))
        .await
        .unwrap();

    let resp = app.oneshot(get("/users/u1/images")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["fileName"], "IMG_0001.png");
    assert!(records[0].get("user").is_none());
}

#[tokio::test]
async fn user_images_for_unknown_user_returns_404() {
    let resp = app().oneshot(get("/users/nobody/images")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- users ---

#[tokio::test]
async fn get_user_after_create() {
    let app = app_with_user().await;
    let resp = app.oneshot(get("/users/u1")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let user: User = body_json(resp).await;
    assert_eq!(
        user,
        User {
            id: "u1".to_string(),
            name: "Ada".to_string()
        }
    );
}

#[tokio::test]
async fn get_missing_user_returns_404() {
    let resp = app().oneshot(get("/users/nobody")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_duplicate_user_returns_409() {
    let app = app_with_user().await;
    let resp = app
        .oneshot(json_request("POST", "/users", r#"{"_id":"u1","name":"Ada again"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_user_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/users", r#"{"name":"no id"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn list_users_is_sorted_by_id() {
    let app = app_with_user().await;
    app.clone()
        .oneshot(json_request("POST", "/users", r#"{"_id":"u0","name":"Bo"}"#))
        .await
        .unwrap();

    let resp = app.oneshot(get("/users")).await.unwrap();
    let body: serde_json::Value = body_json(resp).await;
    let ids: Vec<&str> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["u0", "u1"]);
}
