//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type with C-compatible representations:
//! `*mut c_char` instead of `String`, pointer + length instead of `Vec` or
//! `Bytes`, and tagged enums with explicit discriminants. Conversion
//! functions live here to keep `lib.rs` focused on the `extern "C"` surface.

use std::collections::VecDeque;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use picfeed_core::error::ApiError;
use picfeed_core::http::HttpMethod;
use picfeed_core::{DataEvent, DeliveryCoordinator, Dispatch, Image, User};
use tracing::warn;

/// Opaque handle to a `PicClient`.
pub struct FfiPicClient {
    pub(crate) inner: picfeed_core::PicClient,
}

/// Opaque handle to an upload coordinator plus the events it produced that
/// the host has not polled yet.
pub struct FfiUploader {
    pub(crate) inner: DeliveryCoordinator,
    pub(crate) events: VecDeque<DataEvent>,
}

impl FfiUploader {
    /// Move freshly produced coordinator events into the poll queue.
    pub(crate) fn collect_events(&mut self) {
        self.events.extend(self.inner.take_events());
    }
}

/// Copy `s` into a heap C string owned by the caller. Interior NULs yield an
/// empty string.
pub(crate) fn c_string(s: impl Into<Vec<u8>>) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

pub(crate) fn c_string_opt(s: Option<String>) -> *mut c_char {
    s.map(c_string).unwrap_or(std::ptr::null_mut())
}

/// Read a caller-provided C string. Null and invalid UTF-8 read as `None`.
/// Non-null pointers must be NUL-terminated.
pub(crate) fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Release a string produced by `c_string`.
pub(crate) fn free_c_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr) });
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// `body` is binary (image uploads) and therefore carries its own length;
/// it is null when the request has no body.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut u8,
    pub body_len: usize,
}

impl FfiHttpRequest {
    pub(crate) fn from_core_value(req: picfeed_core::HttpRequest) -> Self {
        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .into_iter()
                .map(|(k, v)| FfiHeader {
                    key: c_string(k),
                    value: c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };
        let body = FfiBytes::from_slice(req.body.as_deref().unwrap_or_default());

        FfiHttpRequest {
            method: req.method.into(),
            path: c_string(req.path),
            headers,
            headers_len,
            body: body.data,
            body_len: body.len,
        }
    }

    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: picfeed_core::HttpRequest) -> *mut Self {
        Box::into_raw(Box::new(Self::from_core_value(req)))
    }

    /// Release everything the request points to, but not the request itself.
    pub(crate) fn free_fields(&self) {
        free_c_string(self.path);
        if !self.headers.is_null() && self.headers_len > 0 {
            let headers = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    self.headers,
                    self.headers_len as usize,
                ))
            };
            for h in headers.iter() {
                free_c_string(h.key);
                free_c_string(h.value);
            }
        }
        FfiBytes {
            data: self.body,
            len: self.body_len,
        }
        .free();
    }
}

/// The next upload the host must execute, tagged with the job it belongs to.
/// Pass `job_id` back to `pic_uploader_complete` when the request finishes.
#[repr(C)]
pub struct FfiDispatch {
    pub job_id: *mut c_char,
    pub request: FfiHttpRequest,
}

impl FfiDispatch {
    pub(crate) fn from_core(dispatch: Option<Dispatch>) -> *mut Self {
        match dispatch {
            Some(Dispatch { job_id, request }) => Box::into_raw(Box::new(FfiDispatch {
                job_id: c_string(job_id.as_str()),
                request: FfiHttpRequest::from_core_value(request),
            })),
            None => std::ptr::null_mut(),
        }
    }
}

// ---------------------------------------------------------------------------
// Caller-provided input (read, never freed by us)
// ---------------------------------------------------------------------------

/// An HTTP response the host received after executing a request.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

/// Values accepted in `FfiPendingImage::format`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum FfiImageFormat {
    Png = 0,
    Jpeg = 1,
}

/// Decode a caller-supplied format value. Unknown values fall back to PNG.
pub(crate) fn image_format(raw: u32) -> picfeed_core::ImageFormat {
    match raw {
        x if x == FfiImageFormat::Jpeg as u32 => picfeed_core::ImageFormat::Jpeg,
        x if x == FfiImageFormat::Png as u32 => picfeed_core::ImageFormat::Png,
        other => {
            warn!(format = other, "unknown image format, sending as PNG");
            picfeed_core::ImageFormat::Png
        }
    }
}

/// An image the host wants uploaded. `data` is copied during submit.
/// `format` takes an `FfiImageFormat` value.
#[repr(C)]
pub struct FfiPendingImage {
    pub file_name: *const c_char,
    pub caption: *const c_char,
    pub width: u32,
    pub height: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub city: *const c_char,
    pub owner_id: *const c_char,
    pub format: u32,
    pub data: *const u8,
    pub data_len: usize,
}

// ---------------------------------------------------------------------------
// Output buffers
// ---------------------------------------------------------------------------

/// An owned byte buffer. Free with `pic_free_bytes`.
#[repr(C)]
pub struct FfiBytes {
    pub data: *mut u8,
    pub len: usize,
}

impl FfiBytes {
    pub(crate) fn empty() -> Self {
        FfiBytes {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        let boxed: Box<[u8]> = bytes.into();
        let len = boxed.len();
        FfiBytes {
            data: Box::into_raw(boxed) as *mut u8,
            len,
        }
    }

    pub(crate) fn free(self) {
        if !self.data.is_null() && self.len > 0 {
            drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(self.data, self.len)) });
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiEvent {
    None = 0,
    ImagesFetchStarted = 1,
    ImagesRefreshed = 2,
    UploadBegan = 3,
    UploadSucceeded = 4,
    UploadFailed = 5,
}

impl From<DataEvent> for FfiEvent {
    fn from(e: DataEvent) -> Self {
        match e {
            DataEvent::ImagesFetchStarted => FfiEvent::ImagesFetchStarted,
            DataEvent::ImagesRefreshed => FfiEvent::ImagesRefreshed,
            DataEvent::UploadBegan => FfiEvent::UploadBegan,
            DataEvent::UploadSucceeded => FfiEvent::UploadSucceeded,
            DataEvent::UploadFailed => FfiEvent::UploadFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiPicResult`.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NotFound = 1,
    Http = 2,
    Deserialization = 3,
    Serialization = 4,
    Panic = 5,
    NullArg = 6,
}

/// Tag that tells `pic_free_result` what `FfiPicResult::data` points to.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    User = 1,
    UserList = 2,
    ImageList = 3,
}

#[repr(C)]
pub struct FfiUser {
    pub id: *mut c_char,
    pub name: *mut c_char,
}

impl FfiUser {
    fn from_core(user: User) -> Self {
        FfiUser {
            id: c_string(user.id),
            name: c_string(user.name),
        }
    }

    pub(crate) fn free_fields(&self) {
        free_c_string(self.id);
        free_c_string(self.name);
    }
}

#[repr(C)]
pub struct FfiUserList {
    pub items: *mut FfiUser,
    pub len: u32,
}

/// An image record exposed to C. Optional strings are null when absent;
/// `has_location` guards `latitude`/`longitude`.
#[repr(C)]
pub struct FfiImage {
    pub id: *mut c_char,
    pub file_name: *mut c_char,
    pub caption: *mut c_char,
    pub width: u32,
    pub height: u32,
    pub url: *mut c_char,
    pub user_id: *mut c_char,
    pub user_name: *mut c_char,
    pub has_location: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub city: *mut c_char,
}

impl FfiImage {
    fn from_core(image: Image) -> Self {
        let location = image.location.unwrap_or_default();
        FfiImage {
            id: c_string_opt(image.id),
            file_name: c_string(image.file_name),
            caption: c_string(image.caption),
            width: image.width,
            height: image.height,
            url: c_string_opt(image.url),
            user_id: c_string(image.user.id),
            user_name: c_string(image.user.name),
            has_location: location.latitude.is_some() && location.longitude.is_some(),
            latitude: location.latitude.unwrap_or_default(),
            longitude: location.longitude.unwrap_or_default(),
            city: c_string_opt(location.name),
        }
    }

    pub(crate) fn free_fields(&self) {
        for s in [
            self.id,
            self.file_name,
            self.caption,
            self.url,
            self.user_id,
            self.user_name,
            self.city,
        ] {
            free_c_string(s);
        }
    }
}

#[repr(C)]
pub struct FfiImageList {
    pub items: *mut FfiImage,
    pub len: u32,
}

/// Leak `items` as a boxed slice; null when empty.
fn into_raw_items<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    (Box::into_raw(items.into_boxed_slice()) as *mut T, len)
}

/// Reclaim a slice produced by `into_raw_items`.
pub(crate) fn from_raw_items<T>(items: *mut T, len: u32) -> Box<[T]> {
    if items.is_null() || len == 0 {
        return Box::new([]);
    }
    unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(items, len as usize)) }
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the parsed payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null.
#[repr(C)]
pub struct FfiPicResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut std::ffi::c_void,
}

impl FfiPicResult {
    fn ok(data_tag: FfiDataTag, data: *mut std::ffi::c_void) -> *mut Self {
        Box::into_raw(Box::new(FfiPicResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data,
        }))
    }

    fn err(error_code: FfiErrorCode, http_status: u16, msg: &str) -> *mut Self {
        Box::into_raw(Box::new(FfiPicResult {
            error_code,
            error_message: c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok_user(user: User) -> *mut Self {
        let data = Box::into_raw(Box::new(FfiUser::from_core(user)));
        Self::ok(FfiDataTag::User, data as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_user_list(users: Vec<User>) -> *mut Self {
        let (items, len) = into_raw_items(users.into_iter().map(FfiUser::from_core).collect());
        let data = Box::into_raw(Box::new(FfiUserList { items, len }));
        Self::ok(FfiDataTag::UserList, data as *mut std::ffi::c_void)
    }

    pub(crate) fn ok_image_list(images: Vec<Image>) -> *mut Self {
        let (items, len) = into_raw_items(images.into_iter().map(FfiImage::from_core).collect());
        let data = Box::into_raw(Box::new(FfiImageList { items, len }));
        Self::ok(FfiDataTag::ImageList, data as *mut std::ffi::c_void)
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let (code, status) = match &err {
            ApiError::NotFound => (FfiErrorCode::NotFound, 404u16),
            ApiError::HttpError { status, .. } => (FfiErrorCode::Http, *status),
            ApiError::DeserializationError(_) => (FfiErrorCode::Deserialization, 0),
            ApiError::SerializationError(_) => (FfiErrorCode::Serialization, 0),
        };
        Self::err(code, status, &err.to_string())
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::NullArg, 0, &format!("null argument: {name}"))
    }

    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::err(FfiErrorCode::Panic, 0, msg)
    }
}
