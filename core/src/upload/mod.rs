//! Sequential delivery of image uploads.
//!
//! `DeliveryCoordinator` owns the `UploadQueue` and `SessionImageCache` and
//! decides what goes out next; `UploadHandle` runs it against a `Transport`.

mod cache;
mod coordinator;
mod driver;
mod job;
mod queue;

pub use cache::SessionImageCache;
pub use coordinator::{DeliveryCoordinator, DeliveryState, Dispatch, UploadSnapshot};
pub use driver::UploadHandle;
pub use job::{Geolocation, ImageFormat, JobId, PendingImage, UploadJob};
pub use queue::UploadQueue;
