//! The seam where requests leave the core.

use std::future::Future;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes `HttpRequest`s. Implemented by the host: a real HTTP client in
/// production, a scripted fake in tests.
///
/// Any response, including 4xx/5xx, is `Ok`; status interpretation belongs
/// to the core. `Err` means no response was obtained.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}
