//! C-ABI wrapper around `picfeed-core`.
//!
//! # Overview
//! Lets a native mobile host build and parse backend requests and drive the
//! upload coordinator while performing all HTTP itself.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Builders and parsers mirror `PicClient` 1:1; a single `FfiPicResult`
//!   envelope with `FfiDataTag` + `void* data` carries payloads and errors.
//! - The uploader hands out at most one `FfiDispatch` at a time. The host
//!   executes it and reports back through `pic_uploader_complete`, which
//!   may return the next dispatch. Notifications are polled with
//!   `pic_uploader_poll_event`.
//! - The caller owns all returned pointers and must release them with the
//!   matching `pic_free_*` function.

pub mod types;

use std::collections::VecDeque;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Once;

use bytes::Bytes;
use picfeed_core::{
    ClientConfig, DeliveryCoordinator, Geolocation, HttpResponse, JobId, PendingImage, PicClient, TransportError, User,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use types::*;

static INIT_LOGGING: Once = Once::new();

/// Install a `tracing` subscriber writing to stderr. The filter comes from
/// `RUST_LOG`, defaulting to `info`. Calling it more than once is harmless.
#[unsafe(no_mangle)]
pub extern "C" fn pic_init_logging() {
    let _ = catch_unwind(|| {
        INIT_LOGGING.call_once(|| {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .try_init();
            info!("picfeed tracing initialized");
        });
    });
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a `PicClient` bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `pic_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn pic_client_new(base_url: *const c_char) -> *mut FfiPicClient {
    catch_unwind(|| {
        if base_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = read_str(base_url).unwrap_or("");
        Box::into_raw(Box::new(FfiPicClient {
            inner: PicClient::new(url),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a `PicClient` from the JSON settings document.
///
/// Returns null if `config_json` is null, not valid config, or leaves the
/// selected base URL empty.
#[unsafe(no_mangle)]
pub extern "C" fn pic_client_from_config(config_json: *const c_char) -> *mut FfiPicClient {
    catch_unwind(|| {
        let Some(raw) = read_str(config_json) else {
            return std::ptr::null_mut();
        };
        match ClientConfig::from_json_str(raw) {
            Ok(config) => Box::into_raw(Box::new(FfiPicClient {
                inner: PicClient::from_config(&config),
            })),
            Err(e) => {
                warn!(error = %e, "rejecting client config");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `pic_client_new` or `pic_client_from_config`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn pic_client_free(client: *mut FfiPicClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Run `build` against a non-null client, boxing the request for C.
fn build_with(
    client: *const FfiPicClient,
    build: impl FnOnce(&PicClient) -> Option<picfeed_core::HttpRequest>,
) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match build(&client.inner) {
            Some(req) => FfiHttpRequest::from_core(req),
            None => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Build a request listing every image. Returns null if `client` is null.
/// The caller must free the returned pointer with `pic_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn pic_build_list_images(client: *const FfiPicClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_list_images()))
}

/// Build a request listing one user's images.
/// Returns null if `client` or `user_id` is null.
#[unsafe(no_mangle)]
pub extern "C" fn pic_build_list_user_images(
    client: *const FfiPicClient,
    user_id: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| read_str(user_id).map(|id| c.build_list_user_images(id)))
}

/// Build a request listing every user. Returns null if `client` is null.
#[unsafe(no_mangle)]
pub extern "C" fn pic_build_list_users(client: *const FfiPicClient) -> *mut FfiHttpRequest {
    build_with(client, |c| Some(c.build_list_users()))
}

/// Build a request fetching one user.
/// Returns null if `client` or `user_id` is null.
#[unsafe(no_mangle)]
pub extern "C" fn pic_build_get_user(client: *const FfiPicClient, user_id: *const c_char) -> *mut FfiHttpRequest {
    build_with(client, |c| read_str(user_id).map(|id| c.build_get_user(id)))
}

/// Build a request creating a user.
/// Returns null if any argument is null or if serialization fails.
#[unsafe(no_mangle)]
pub extern "C" fn pic_build_create_user(
    client: *const FfiPicClient,
    user_id: *const c_char,
    name: *const c_char,
) -> *mut FfiHttpRequest {
    build_with(client, |c| {
        let input = picfeed_core::NewUser {
            id: read_str(user_id)?.to_string(),
            name: read_str(name)?.to_string(),
        };
        c.build_create_user(&input).ok()
    })
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert an `FfiHttpResponse` to a core `HttpResponse`. A null body reads
/// as the empty string.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse::new(resp.status, read_str(resp.body).unwrap_or(""))
}

/// Null-check `client` and `response`, then run `parse` inside
/// `catch_unwind`.
fn parse_with(
    op: &str,
    client: *const FfiPicClient,
    response: *const FfiHttpResponse,
    parse: impl FnOnce(&PicClient, HttpResponse) -> *mut FfiPicResult,
) -> *mut FfiPicResult {
    catch_unwind(AssertUnwindSafe(|| {
        if client.is_null() {
            return FfiPicResult::null_arg("client");
        }
        if response.is_null() {
            return FfiPicResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        parse(&client.inner, ffi_response_to_core(resp))
    }))
    .unwrap_or_else(|_| FfiPicResult::panic(&format!("panic in {op}")))
}

/// Parse a list-images response. `data_tag = ImageList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn pic_parse_list_images(
    client: *const FfiPicClient,
    response: *const FfiHttpResponse,
) -> *mut FfiPicResult {
    parse_with("pic_parse_list_images", client, response, |c, resp| {
        match c.parse_list_images(resp) {
            Ok(images) => FfiPicResult::ok_image_list(images),
            Err(e) => FfiPicResult::from_error(e),
        }
    })
}

/// Parse a user-images response, stamping `user_id`/`user_name` onto every
/// record. `data_tag = ImageList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn pic_parse_list_user_images(
    client: *const FfiPicClient,
    response: *const FfiHttpResponse,
    user_id: *const c_char,
    user_name: *const c_char,
) -> *mut FfiPicResult {
    parse_with("pic_parse_list_user_images", client, response, |c, resp| {
        let (Some(id), Some(name)) = (read_str(user_id), read_str(user_name)) else {
            return FfiPicResult::null_arg("user");
        };
        let owner = User {
            id: id.to_string(),
            name: name.to_string(),
        };
        match c.parse_list_user_images(resp, &owner) {
            Ok(images) => FfiPicResult::ok_image_list(images),
            Err(e) => FfiPicResult::from_error(e),
        }
    })
}

/// Parse a list-users response. `data_tag = UserList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn pic_parse_list_users(
    client: *const FfiPicClient,
    response: *const FfiHttpResponse,
) -> *mut FfiPicResult {
    parse_with("pic_parse_list_users", client, response, |c, resp| {
        match c.parse_list_users(resp) {
            Ok(users) => FfiPicResult::ok_user_list(users),
            Err(e) => FfiPicResult::from_error(e),
        }
    })
}

/// Parse a get-user response. `data_tag = User` on success.
#[unsafe(no_mangle)]
pub extern "C" fn pic_parse_get_user(
    client: *const FfiPicClient,
    response: *const FfiHttpResponse,
) -> *mut FfiPicResult {
    parse_with("pic_parse_get_user", client, response, |c, resp| {
        match c.parse_get_user(resp) {
            Ok(user) => FfiPicResult::ok_user(user),
            Err(e) => FfiPicResult::from_error(e),
        }
    })
}

/// Parse a create-user response (status 201). `data_tag = User` on success.
#[unsafe(no_mangle)]
pub extern "C" fn pic_parse_create_user(
    client: *const FfiPicClient,
    response: *const FfiHttpResponse,
) -> *mut FfiPicResult {
    parse_with("pic_parse_create_user", client, response, |c, resp| {
        match c.parse_create_user(resp) {
            Ok(user) => FfiPicResult::ok_user(user),
            Err(e) => FfiPicResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Uploader
// ---------------------------------------------------------------------------

/// Create an upload coordinator sending to `base_url`.
///
/// Returns null if `base_url` is null. Free with `pic_uploader_free`.
#[unsafe(no_mangle)]
pub extern "C" fn pic_uploader_new(base_url: *const c_char) -> *mut FfiUploader {
    catch_unwind(|| {
        let Some(url) = read_str(base_url) else {
            return std::ptr::null_mut();
        };
        Box::into_raw(Box::new(FfiUploader {
            inner: DeliveryCoordinator::new(PicClient::new(url)),
            events: VecDeque::new(),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an uploader. Pending jobs are discarded. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn pic_uploader_free(uploader: *mut FfiUploader) {
    if !uploader.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(uploader) });
        }));
    }
}

/// Queue an image for upload.
///
/// Returns the dispatch to execute when the queue was empty, null
/// otherwise (including on null arguments or a duplicate identity). The
/// image bytes are copied. Free a non-null result with `pic_free_dispatch`.
#[unsafe(no_mangle)]
pub extern "C" fn pic_uploader_submit(
    uploader: *mut FfiUploader,
    image: *const FfiPendingImage,
) -> *mut FfiDispatch {
    catch_unwind(AssertUnwindSafe(|| {
        if uploader.is_null() || image.is_null() {
            return std::ptr::null_mut();
        }
        let uploader = unsafe { &mut *uploader };
        let image = unsafe { &*image };
        let (Some(file_name), Some(owner_id)) = (read_str(image.file_name), read_str(image.owner_id)) else {
            return std::ptr::null_mut();
        };
        let data = if image.data.is_null() || image.data_len == 0 {
            Bytes::new()
        } else {
            Bytes::copy_from_slice(unsafe { std::slice::from_raw_parts(image.data, image.data_len) })
        };
        let pending = PendingImage {
            file_name: file_name.to_string(),
            caption: read_str(image.caption).unwrap_or("").to_string(),
            width: image.width,
            height: image.height,
            location: Geolocation {
                latitude: image.latitude,
                longitude: image.longitude,
                city: read_str(image.city).unwrap_or("").to_string(),
            },
            owner_id: owner_id.to_string(),
            format: image_format(image.format),
            data,
        };

        let dispatch = uploader.inner.submit(pending);
        uploader.collect_events();
        FfiDispatch::from_core(dispatch)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Report the outcome of the dispatch for `job_id`.
///
/// Pass `transport_failed = true` when no HTTP response was obtained;
/// otherwise `status` is the response status (any 2xx counts as delivered).
/// Returns the next dispatch, or null when nothing else should be sent.
#[unsafe(no_mangle)]
pub extern "C" fn pic_uploader_complete(
    uploader: *mut FfiUploader,
    job_id: *const c_char,
    status: u16,
    transport_failed: bool,
) -> *mut FfiDispatch {
    catch_unwind(AssertUnwindSafe(|| {
        if uploader.is_null() {
            return std::ptr::null_mut();
        }
        let uploader = unsafe { &mut *uploader };
        let Some(job_id) = read_str(job_id) else {
            return std::ptr::null_mut();
        };
        let outcome = if transport_failed {
            Err(TransportError::Failed("reported by host".to_string()))
        } else {
            Ok(HttpResponse::new(status, ""))
        };

        let dispatch = uploader.inner.complete(&JobId::from(job_id.to_string()), outcome);
        uploader.collect_events();
        FfiDispatch::from_core(dispatch)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Pop the oldest unread notification; `FfiEvent::None` when there is none.
#[unsafe(no_mangle)]
pub extern "C" fn pic_uploader_poll_event(uploader: *mut FfiUploader) -> FfiEvent {
    catch_unwind(AssertUnwindSafe(|| {
        if uploader.is_null() {
            return FfiEvent::None;
        }
        let uploader = unsafe { &mut *uploader };
        uploader.events.pop_front().map(FfiEvent::from).unwrap_or(FfiEvent::None)
    }))
    .unwrap_or(FfiEvent::None)
}

/// Number of queued jobs, including the one in flight.
#[unsafe(no_mangle)]
pub extern "C" fn pic_uploader_pending_count(uploader: *const FfiUploader) -> u32 {
    catch_unwind(AssertUnwindSafe(|| {
        if uploader.is_null() {
            return 0;
        }
        let uploader = unsafe { &*uploader };
        uploader.inner.queue().remaining_count() as u32
    }))
    .unwrap_or(0)
}

/// Copy of the session image for `job_id`; empty when unknown.
/// Free with `pic_free_bytes`.
#[unsafe(no_mangle)]
pub extern "C" fn pic_uploader_cached_image(uploader: *const FfiUploader, job_id: *const c_char) -> FfiBytes {
    catch_unwind(AssertUnwindSafe(|| {
        if uploader.is_null() {
            return FfiBytes::empty();
        }
        let uploader = unsafe { &*uploader };
        read_str(job_id)
            .and_then(|id| uploader.inner.cached_image(&JobId::from(id.to_string())))
            .map(|bytes| FfiBytes::from_slice(&bytes))
            .unwrap_or_else(FfiBytes::empty)
    }))
    .unwrap_or_else(|_| FfiBytes::empty())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `pic_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn pic_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        req.free_fields();
    });
}

/// Free an `FfiDispatch` returned by the uploader. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn pic_free_dispatch(dispatch: *mut FfiDispatch) {
    if dispatch.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let dispatch = unsafe { Box::from_raw(dispatch) };
        free_c_string(dispatch.job_id);
        dispatch.request.free_fields();
    });
}

/// Free a buffer returned by `pic_uploader_cached_image`.
#[unsafe(no_mangle)]
pub extern "C" fn pic_free_bytes(bytes: FfiBytes) {
    let _ = catch_unwind(AssertUnwindSafe(|| bytes.free()));
}

/// Free an `FfiPicResult` returned by any `pic_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn pic_free_result(result: *mut FfiPicResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::None => {}
            FfiDataTag::User => {
                let user = unsafe { Box::from_raw(result.data as *mut FfiUser) };
                user.free_fields();
            }
            FfiDataTag::UserList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiUserList) };
                for user in from_raw_items(list.items, list.len).iter() {
                    user.free_fields();
                }
            }
            FfiDataTag::ImageList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiImageList) };
                for image in from_raw_items(list.items, list.len).iter() {
                    image.free_fields();
                }
            }
        }
    });
}
