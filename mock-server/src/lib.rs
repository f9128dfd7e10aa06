use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub file_name: String,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
    pub content_type: String,
    pub size: usize,
    pub location: Location,
    pub user: User,
}

#[derive(Default)]
pub struct Store {
    pub users: HashMap<String, User>,
    pub images: Vec<ImageRecord>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/images", get(list_images))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/images", get(list_user_images))
        .route(
            "/users/{id}/images/{file_name}/{caption}/{width}/{height}/{latitude}/{longitude}/{city}",
            post(upload_image),
        )
        // An empty city leaves a trailing slash with no final segment.
        .route(
            "/users/{id}/images/{file_name}/{caption}/{width}/{height}/{latitude}/{longitude}/",
            post(upload_image_without_city),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_images(State(db): State<Db>) -> Json<serde_json::Value> {
    let store = db.read().await;
    Json(json!({ "records": store.images }))
}

/// Records are returned without their `user` field; the client already knows
/// whose images it asked for.
async fn list_user_images(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let store = db.read().await;
    if !store.users.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let records: Vec<serde_json::Value> = store
        .images
        .iter()
        .filter(|image| image.user.id == id)
        .map(|image| {
            let mut value = serde_json::to_value(image).unwrap_or_default();
            if let Some(fields) = value.as_object_mut() {
                fields.remove("user");
            }
            value
        })
        .collect();
    Ok(Json(json!({ "records": records })))
}

async fn list_users(State(db): State<Db>) -> Json<serde_json::Value> {
    let store = db.read().await;
    let mut users: Vec<&User> = store.users.values().collect();
    users.sort_by(|a, b| a.id.cmp(&b.id));
    Json(json!({ "records": users }))
}

async fn get_user(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<User>, StatusCode> {
    let store = db.read().await;
    store.users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<User>,
) -> Result<(StatusCode, Json<User>), StatusCode> {
    let mut store = db.write().await;
    if store.users.contains_key(&input.id) {
        return Err(StatusCode::CONFLICT);
    }
    store.users.insert(input.id.clone(), input.clone());
    Ok((StatusCode::CREATED, Json(input)))
}

type UploadPath = (String, String, String, u32, u32, f64, f64);
type UploadPathWithCity = (String, String, String, u32, u32, f64, f64, String);

/// Path metadata of an upload, already percent-decoded by axum.
struct UploadMeta {
    user_id: String,
    file_name: String,
    caption: String,
    width: u32,
    height: u32,
    latitude: f64,
    longitude: f64,
    city: String,
}

impl UploadMeta {
    fn new(path: UploadPath, city: String) -> Self {
        let (user_id, file_name, caption, width, height, latitude, longitude) = path;
        Self {
            user_id,
            file_name,
            caption,
            width,
            height,
            latitude,
            longitude,
            city,
        }
    }
}

async fn upload_image(
    State(db): State<Db>,
    Path((id, file_name, caption, width, height, latitude, longitude, city)): Path<UploadPathWithCity>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ImageRecord>), StatusCode> {
    let meta = UploadMeta::new((id, file_name, caption, width, height, latitude, longitude), city);
    store_upload(db, meta, headers, body).await
}

async fn upload_image_without_city(
    State(db): State<Db>,
    Path(path): Path<UploadPath>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ImageRecord>), StatusCode> {
    store_upload(db, UploadMeta::new(path, String::new()), headers, body).await
}

async fn store_upload(
    db: Db,
    meta: UploadMeta,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ImageRecord>), StatusCode> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut store = db.write().await;
    let user = store.users.get(&meta.user_id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    let record = ImageRecord {
        id: Uuid::new_v4(),
        url: format!("/files/{}/{}", user.id, meta.file_name),
        file_name: meta.file_name,
        caption: meta.caption,
        width: meta.width,
        height: meta.height,
        content_type,
        size: body.len(),
        location: Location {
            name: meta.city,
            latitude: meta.latitude,
            longitude: meta.longitude,
        },
        user,
    };
    info!(file_name = %record.file_name, user = %record.user.id, size = record.size, "image stored");
    store.images.push(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ImageRecord {
        ImageRecord {
            id: Uuid::nil(),
            file_name: "a.png".to_string(),
            caption: "Half Dome".to_string(),
            width: 400,
            height: 300,
            url: "/files/u1/a.png".to_string(),
            content_type: "image/png".to_string(),
            size: 4,
            location: Location {
                name: "Austin".to_string(),
                latitude: 37.5,
                longitude: 119.5,
            },
            user: User {
                id: "u1".to_string(),
                name: "Ada".to_string(),
            },
        }
    }

    #[test]
    fn image_record_uses_client_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["fileName"], "a.png");
        assert_eq!(json["user"]["_id"], "u1");
        assert_eq!(json["location"]["name"], "Austin");
    }

    #[test]
    fn user_requires_id_and_name() {
        let result: Result<User, _> = serde_json::from_str(r#"{"name":"Ada"}"#);
        assert!(result.is_err());
        let user: User = serde_json::from_str(r#"{"_id":"u1","name":"Ada"}"#).unwrap();
        assert_eq!(user.id, "u1");
    }
}
