//! The data-access context handed to the UI layer.
//!
//! # Design
//! `DataManager` is built once at startup and passed to whoever needs it;
//! there is no process-wide instance. It pairs the stateless `PicClient`
//! with a `Transport`, keeps the last fetched feed in a `RecordStore`, and
//! forwards uploads to an `UploadHandle`.
//!
//! Query operations never fail: every transport, status or parse error is
//! logged and turned into `None` or an empty list here.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::client::PicClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::events::{DataEvent, EventBus};
use crate::http::{HttpRequest, HttpResponse};
use crate::store::RecordStore;
use crate::transport::Transport;
use crate::types::{Image, NewUser, User};
use crate::upload::{DeliveryCoordinator, JobId, PendingImage, UploadHandle, UploadSnapshot};

pub struct DataManager<T: Transport> {
    client: PicClient,
    transport: Arc<T>,
    events: EventBus,
    store: RwLock<RecordStore>,
    uploads: UploadHandle,
}

impl<T: Transport> std::fmt::Debug for DataManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataManager")
            .field("base_url", &self.client.base_url())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> DataManager<T> {
    /// Must be called from within a tokio runtime; the upload driver is
    /// spawned on it.
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        Self::with_client(PicClient::from_config(config), transport)
    }

    pub fn with_client(client: PicClient, transport: T) -> Self {
        let transport = Arc::new(transport);
        let events = EventBus::default();
        let uploads = UploadHandle::spawn(
            DeliveryCoordinator::new(client.clone()),
            Arc::clone(&transport),
            events.clone(),
        );
        info!(base_url = client.base_url(), "data manager ready");
        Self {
            client,
            transport,
            events,
            store: RwLock::new(RecordStore::default()),
            uploads,
        }
    }

    pub fn client(&self) -> &PicClient {
        &self.client
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataEvent> {
        self.events.subscribe()
    }

    async fn send<R>(
        &self,
        what: &'static str,
        request: HttpRequest,
        parse: impl FnOnce(&PicClient, HttpResponse) -> Result<R, ApiError>,
    ) -> Option<R> {
        debug!(what, path = %request.path, "request");
        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(what, error = %e, "request failed");
                return None;
            }
        };
        match parse(&self.client, response) {
            Ok(parsed) => Some(parsed),
            Err(ApiError::NotFound) => {
                debug!(what, "not found");
                None
            }
            Err(e) => {
                warn!(what, error = %e, "unusable response");
                None
            }
        }
    }

    // --- images ---

    /// Fetch the whole feed into the record store, announcing start and
    /// completion on the event bus. A failed fetch leaves the store as it was
    /// and emits no completion event.
    pub async fn refresh_images(&self) {
        self.events.emit(DataEvent::ImagesFetchStarted);
        if let Some(images) = self.fetch_images().await {
            info!(count = images.len(), "image feed refreshed");
            self.store.write().await.replace_images(images);
            self.events.emit(DataEvent::ImagesRefreshed);
        }
    }

    pub async fn fetch_images(&self) -> Option<Vec<Image>> {
        let request = self.client.build_list_images();
        self.send("list images", request, PicClient::parse_list_images).await
    }

    pub async fn fetch_images_for_user(&self, user_id: &str, user_name: &str) -> Option<Vec<Image>> {
        let owner = User {
            id: user_id.to_string(),
            name: user_name.to_string(),
        };
        let request = self.client.build_list_user_images(user_id);
        self.send("list user images", request, |client, response| {
            client.parse_list_user_images(response, &owner)
        })
        .await
    }

    pub async fn images(&self) -> Vec<Image> {
        self.store.read().await.images().to_vec()
    }

    pub async fn images_for_user(&self, user_id: &str) -> Vec<Image> {
        self.store.read().await.images_for_user(user_id)
    }

    pub async fn has_received_initial_images(&self) -> bool {
        self.store.read().await.has_received_initial_images()
    }

    // --- users ---

    pub async fn fetch_users(&self) -> Option<Vec<User>> {
        let request = self.client.build_list_users();
        self.send("list users", request, PicClient::parse_list_users).await
    }

    pub async fn fetch_user(&self, user_id: &str) -> Option<User> {
        let request = self.client.build_get_user(user_id);
        self.send("get user", request, PicClient::parse_get_user).await
    }

    pub async fn user_exists(&self, user_id: &str) -> bool {
        self.fetch_user(user_id).await.is_some()
    }

    pub async fn create_user(&self, user_id: &str, name: &str) -> Option<User> {
        let input = NewUser {
            id: user_id.to_string(),
            name: name.to_string(),
        };
        let request = match self.client.build_create_user(&input) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "could not build create-user request");
                return None;
            }
        };
        self.send("create user", request, PicClient::parse_create_user).await
    }

    /// `true` if the user exists afterwards, creating it when missing.
    pub async fn ensure_user(&self, user_id: &str, name: &str) -> bool {
        self.get_or_create_user(user_id, name).await.is_some()
    }

    pub async fn get_or_create_user(&self, user_id: &str, name: &str) -> Option<User> {
        if let Some(user) = self.fetch_user(user_id).await {
            return Some(user);
        }
        info!(user_id, "user not found, creating");
        self.create_user(user_id, name).await
    }

    // --- uploads ---

    pub fn submit(&self, image: PendingImage) {
        self.uploads.submit(image);
    }

    pub async fn upload_snapshot(&self) -> Option<UploadSnapshot> {
        self.uploads.snapshot().await
    }

    /// Local copy of an image submitted during this session.
    pub async fn cached_image(&self, id: &JobId) -> Option<Bytes> {
        self.uploads.cached_image(id.clone()).await
    }
}
