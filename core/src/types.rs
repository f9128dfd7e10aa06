//! Domain records exchanged with the picfeed backend.
//!
//! # Design
//! The backend stores loosely-shaped documents, so parsing is tolerant:
//! optional fields default, and a record missing a required field
//! (`fileName`, `user`) is dropped rather than failing the whole list.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// Request payload for creating a user. The client chooses the id (it comes
/// from the identity provider), the server only stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

/// Where a photo was taken.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// An image record as listed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub file_name: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub user: User,
}

impl Image {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Deserialize)]
struct RecordList {
    #[serde(default)]
    records: Vec<serde_json::Value>,
}

/// Parse a `{"records": [...]}` envelope.
///
/// A body that is not such an envelope yields an empty list. When `owner` is
/// given, its id and name replace the `user` field of every record; the
/// user-scoped listing omits it.
pub(crate) fn parse_records<T: DeserializeOwned>(body: &str, owner: Option<&User>) -> Vec<T> {
    let list: RecordList = match serde_json::from_str(body) {
        Ok(list) => list,
        Err(e) => {
            debug!(error = %e, "response is not a record list, treating as empty");
            return Vec::new();
        }
    };

    list.records
        .into_iter()
        .filter_map(|mut record| {
            if let (Some(owner), Some(fields)) = (owner, record.as_object_mut()) {
                fields.insert(
                    "user".to_string(),
                    serde_json::json!({ "_id": owner.id, "name": owner.name }),
                );
            }
            match serde_json::from_value(record) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    debug!(error = %e, "skipping malformed record");
                    None
                }
            }
        })
        .collect()
}
