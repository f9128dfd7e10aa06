//! Stateless HTTP request builder and response parser for the picfeed API.
//!
//! # Design
//! `PicClient` holds only a `base_url`. Each endpoint is split into a
//! `build_*` method producing an `HttpRequest` and a `parse_*` method
//! consuming an `HttpResponse`; the round-trip in between belongs to the
//! caller.
//!
//! List endpoints are lenient: once the status is right, an unreadable body
//! is an empty list, not an error.

use bytes::Bytes;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{parse_records, Image, NewUser, User};
use crate::upload::UploadJob;

const IMAGES_ENDPOINT: &str = "images";
const USERS_ENDPOINT: &str = "users";

#[derive(Debug, Clone)]
pub struct PicClient {
    base_url: String,
}

impl PicClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_request_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn get(&self, segments: &[&str]) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: self.url(segments),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_list_images(&self) -> HttpRequest {
        self.get(&[IMAGES_ENDPOINT])
    }

    pub fn build_list_user_images(&self, user_id: &str) -> HttpRequest {
        self.get(&[USERS_ENDPOINT, user_id, IMAGES_ENDPOINT])
    }

    pub fn build_list_users(&self) -> HttpRequest {
        self.get(&[USERS_ENDPOINT])
    }

    pub fn build_get_user(&self, user_id: &str) -> HttpRequest {
        self.get(&[USERS_ENDPOINT, user_id])
    }

    pub fn build_create_user(&self, input: &NewUser) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(input).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: self.url(&[USERS_ENDPOINT]),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(Bytes::from(body)),
        })
    }

    /// Upload metadata travels in the path, the raw image is the body.
    pub fn build_upload_image(&self, job: &UploadJob) -> HttpRequest {
        let (width, height) = job.dimensions();
        let location = job.location();
        let width = width.to_string();
        let height = height.to_string();
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        HttpRequest {
            method: HttpMethod::Post,
            path: self.url(&[
                USERS_ENDPOINT,
                job.owner_id(),
                IMAGES_ENDPOINT,
                job.file_name(),
                job.caption(),
                &width,
                &height,
                &latitude,
                &longitude,
                &location.city,
            ]),
            headers: vec![("content-type".to_string(), job.format().mime().to_string())],
            body: Some(job.data().clone()),
        }
    }

    pub fn parse_list_images(&self, response: HttpResponse) -> Result<Vec<Image>, ApiError> {
        check_status(&response, 200)?;
        Ok(parse_records(&response.body, None))
    }

    /// The user-scoped listing omits the owner, so `owner` is stamped onto
    /// every record.
    pub fn parse_list_user_images(
        &self,
        response: HttpResponse,
        owner: &User,
    ) -> Result<Vec<Image>, ApiError> {
        check_status(&response, 200)?;
        Ok(parse_records(&response.body, Some(owner)))
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<User>, ApiError> {
        check_status(&response, 200)?;
        Ok(parse_records(&response.body, None))
    }

    pub fn parse_get_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, 200)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    pub fn parse_create_user(&self, response: HttpResponse) -> Result<User, ApiError> {
        check_status(&response, 201)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Any 2xx counts as delivered; the body is not inspected.
    pub fn parse_upload_image(&self, response: HttpResponse) -> Result<(), ApiError> {
        if response.is_success() {
            return Ok(());
        }
        Err(status_error(&response))
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(status_error(response))
}

fn status_error(response: &HttpResponse) -> ApiError {
    if response.status == 404 {
        return ApiError::NotFound;
    }
    ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    }
}
