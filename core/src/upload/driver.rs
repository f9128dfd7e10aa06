//! Runs a `DeliveryCoordinator` on a tokio task.
//!
//! The task owns the coordinator outright. Submissions and queries arrive on
//! a command channel; transport calls run in spawned tasks that post their
//! outcome back on a completion channel. Both channels are drained by the
//! same loop, so every coordinator transition happens on one sequence of
//! events and no lock guards the queue.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use super::coordinator::{DeliveryCoordinator, Dispatch, UploadSnapshot};
use super::job::{JobId, PendingImage};
use crate::error::TransportError;
use crate::events::EventBus;
use crate::http::HttpResponse;
use crate::transport::Transport;

enum Command {
    Submit(PendingImage),
    Snapshot(oneshot::Sender<UploadSnapshot>),
    CachedImage(JobId, oneshot::Sender<Option<Bytes>>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Submit(image) => write!(f, "Submit({})", image.file_name),
            Command::Snapshot(_) => f.write_str("Snapshot"),
            Command::CachedImage(id, _) => write!(f, "CachedImage({id})"),
        }
    }
}

struct Completion {
    job_id: JobId,
    outcome: Result<HttpResponse, TransportError>,
}

/// Cheap, cloneable handle to a running upload driver. The driver stops once
/// every handle is dropped.
#[derive(Debug, Clone)]
pub struct UploadHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl UploadHandle {
    /// Spawn the driver on the current tokio runtime.
    pub fn spawn<T: Transport>(coordinator: DeliveryCoordinator, transport: Arc<T>, events: EventBus) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run(coordinator, transport, events, command_rx));
        Self { commands }
    }

    /// Queue an image for upload. Never fails from the caller's side; if the
    /// driver is gone the image is dropped.
    pub fn submit(&self, image: PendingImage) {
        if self.commands.send(Command::Submit(image)).is_err() {
            debug!("upload driver stopped, submission dropped");
        }
    }

    pub async fn snapshot(&self) -> Option<UploadSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    pub async fn cached_image(&self, id: JobId) -> Option<Bytes> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(Command::CachedImage(id, tx)).ok()?;
        rx.await.ok().flatten()
    }
}

async fn run<T: Transport>(
    mut coordinator: DeliveryCoordinator,
    transport: Arc<T>,
    events: EventBus,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let (completion_tx, mut completions) = mpsc::unbounded_channel::<Completion>();

    loop {
        let dispatch = tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                trace!(?command, "upload driver command");
                match command {
                    Command::Submit(image) => coordinator.submit(image),
                    Command::Snapshot(reply) => {
                        let _ = reply.send(coordinator.snapshot());
                        None
                    }
                    Command::CachedImage(id, reply) => {
                        let _ = reply.send(coordinator.cached_image(&id));
                        None
                    }
                }
            }
            Some(done) = completions.recv() => coordinator.complete(&done.job_id, done.outcome),
        };

        events.emit_all(coordinator.take_events());

        if let Some(dispatch) = dispatch {
            send(dispatch, Arc::clone(&transport), completion_tx.clone());
        }
    }

    report_shutdown(&coordinator);
}

/// Jobs still queued when the driver stops are lost, including the one in
/// flight whose completion can no longer be delivered.
fn report_shutdown(coordinator: &DeliveryCoordinator) {
    let pending = coordinator.queue().remaining_count();
    if pending > 0 {
        warn!(pending, state = ?coordinator.state(), "upload driver stopped, undelivered uploads dropped");
    } else {
        debug!("upload driver stopped");
    }
}

fn send<T: Transport>(dispatch: Dispatch, transport: Arc<T>, done: mpsc::UnboundedSender<Completion>) {
    tokio::spawn(async move {
        let Dispatch { job_id, request } = dispatch;
        let outcome = transport.execute(request).await;
        let _ = done.send(Completion { job_id, outcome });
    });
}
