//! Single-flight delivery of queued uploads.
//!
//! # Design
//! `DeliveryCoordinator` is a synchronous state machine with no I/O. Every
//! transition that starts an upload returns a `Dispatch`; the caller
//! executes its request and reports the outcome through `complete`, which
//! may return the next `Dispatch`. Notifications accumulate in an outbox
//! drained with `take_events`.
//!
//! Sending starts only when a submission makes the queue length exactly one.
//! After a failed delivery the head stays queued and nothing is resent, so
//! the queue stalls until the host intervenes. Later submissions do not
//! resume it.

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::cache::SessionImageCache;
use super::job::{JobId, PendingImage, UploadJob};
use super::queue::UploadQueue;
use crate::client::PicClient;
use crate::error::TransportError;
use crate::events::DataEvent;
use crate::http::{HttpRequest, HttpResponse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryState {
    /// Nothing in flight.
    Idle,
    /// The job is in flight.
    Sending(JobId),
    /// The job's last delivery failed; it is still the queue head.
    Stalled(JobId),
}

/// A request the caller must execute on behalf of `job_id`.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub job_id: JobId,
    pub request: HttpRequest,
}

/// Point-in-time view of the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub pending: Vec<JobId>,
    pub state: DeliveryState,
}

#[derive(Debug)]
pub struct DeliveryCoordinator {
    client: PicClient,
    queue: UploadQueue,
    cache: SessionImageCache,
    state: DeliveryState,
    outbox: Vec<DataEvent>,
}

impl DeliveryCoordinator {
    pub fn new(client: PicClient) -> Self {
        Self {
            client,
            queue: UploadQueue::new(),
            cache: SessionImageCache::new(),
            state: DeliveryState::Idle,
            outbox: Vec::new(),
        }
    }

    /// Cache the image, queue it, and start sending if the queue was empty.
    ///
    /// An image whose identity is already queued is dropped.
    pub fn submit(&mut self, image: PendingImage) -> Option<Dispatch> {
        let job = UploadJob::new(image);
        if self.queue.contains(job.id()) {
            warn!(job_id = %job.id(), "upload already queued, ignoring submission");
            return None;
        }

        self.cache.put(job.id().clone(), job.data().clone());
        debug!(job_id = %job.id(), pending = self.queue.remaining_count() + 1, "upload queued");
        self.queue.enqueue(job);

        if self.queue.remaining_count() == 1 {
            self.dispatch_head()
        } else {
            None
        }
    }

    /// Record the outcome of the in-flight delivery of `job_id`.
    ///
    /// Completions for any job other than the one in flight are ignored.
    pub fn complete(
        &mut self,
        job_id: &JobId,
        outcome: Result<HttpResponse, TransportError>,
    ) -> Option<Dispatch> {
        if self.in_flight() != Some(job_id) {
            warn!(%job_id, state = ?self.state, "ignoring completion for job not in flight");
            return None;
        }

        let delivered = match outcome {
            Ok(response) => {
                let status = response.status;
                match self.client.parse_upload_image(response) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(%job_id, status, error = %e, "upload rejected");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(%job_id, error = %e, "upload transport failed");
                false
            }
        };

        if delivered {
            self.on_delivered(job_id)
        } else {
            self.on_failed(job_id);
            None
        }
    }

    fn on_delivered(&mut self, job_id: &JobId) -> Option<Dispatch> {
        self.queue.remove_if_matching(job_id);
        self.state = DeliveryState::Idle;
        info!(%job_id, pending = self.queue.remaining_count(), "upload delivered");

        let next = if self.queue.is_empty() {
            None
        } else {
            self.dispatch_head()
        };
        self.outbox.push(DataEvent::UploadSucceeded);
        next
    }

    fn on_failed(&mut self, job_id: &JobId) {
        self.state = DeliveryState::Stalled(job_id.clone());
        warn!(%job_id, pending = self.queue.remaining_count(), "upload failed, queue stalled");
        self.outbox.push(DataEvent::UploadFailed);
    }

    fn dispatch_head(&mut self) -> Option<Dispatch> {
        let job = self.queue.head()?;
        let dispatch = Dispatch {
            job_id: job.id().clone(),
            request: self.client.build_upload_image(job),
        };
        debug!(job_id = %dispatch.job_id, "upload dispatched");
        self.state = DeliveryState::Sending(dispatch.job_id.clone());
        self.outbox.push(DataEvent::UploadBegan);
        Some(dispatch)
    }

    pub fn in_flight(&self) -> Option<&JobId> {
        match &self.state {
            DeliveryState::Sending(id) => Some(id),
            _ => None,
        }
    }

    pub fn state(&self) -> &DeliveryState {
        &self.state
    }

    pub fn queue(&self) -> &UploadQueue {
        &self.queue
    }

    pub fn cached_image(&self, id: &JobId) -> Option<Bytes> {
        self.cache.get(id)
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            pending: self.queue.ids().cloned().collect(),
            state: self.state.clone(),
        }
    }

    /// Drain notifications produced since the last call, oldest first.
    pub fn take_events(&mut self) -> Vec<DataEvent> {
        std::mem::take(&mut self.outbox)
    }
}
