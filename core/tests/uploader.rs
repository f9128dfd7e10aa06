//! Upload driver behavior against a scripted transport.
//!
//! # Design
//! `ScriptedTransport` hands every request to the test together with a
//! oneshot reply slot, so the test decides when and how each upload
//! completes and can observe exactly which calls were issued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use picfeed_core::{
    DataEvent, DeliveryCoordinator, DeliveryState, EventBus, Geolocation, HttpRequest, HttpResponse, ImageFormat,
    JobId, PendingImage, PicClient, Transport, TransportError, UploadHandle,
};
use tokio::sync::{broadcast, mpsc, oneshot};

type Reply = oneshot::Sender<Result<HttpResponse, TransportError>>;

struct ScriptedTransport {
    calls: mpsc::UnboundedSender<(HttpRequest, Reply)>,
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let calls = self.calls.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            calls.send((request, tx)).map_err(|_| TransportError::Closed)?;
            rx.await.map_err(|_| TransportError::Closed)?
        }
    }
}

struct Harness {
    uploads: UploadHandle,
    calls: mpsc::UnboundedReceiver<(HttpRequest, Reply)>,
    events: broadcast::Receiver<DataEvent>,
}

impl Harness {
    fn new() -> Self {
        let (tx, calls) = mpsc::unbounded_channel();
        let bus = EventBus::default();
        let events = bus.subscribe();
        let coordinator = DeliveryCoordinator::new(PicClient::new("http://backend.test"));
        let uploads = UploadHandle::spawn(coordinator, Arc::new(ScriptedTransport { calls: tx }), bus);
        Self { uploads, calls, events }
    }

    async fn next_call(&mut self) -> (HttpRequest, Reply) {
        tokio::time::timeout(Duration::from_secs(5), self.calls.recv())
            .await
            .expect("timed out waiting for transport call")
            .expect("transport dropped")
    }

    /// Let spawned tasks run, then assert nothing reached the transport.
    async fn assert_no_call(&mut self) {
        self.uploads.snapshot().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(self.calls.try_recv().is_err(), "unexpected transport call");
    }

    async fn pending(&self) -> Vec<JobId> {
        self.uploads.snapshot().await.unwrap().pending
    }

    fn drain_events(&mut self) -> Vec<DataEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            seen.push(event);
        }
        seen
    }
}

fn photo(name: &str) -> PendingImage {
    PendingImage {
        file_name: name.to_string(),
        caption: String::new(),
        width: 1,
        height: 1,
        location: Geolocation::default(),
        owner_id: "u1".to_string(),
        format: ImageFormat::Png,
        data: Bytes::from(name.as_bytes().to_vec()),
    }
}

fn id(name: &str) -> JobId {
    JobId::derive(name, "u1")
}

fn for_job(request: &HttpRequest, name: &str) -> bool {
    request.path.contains(&format!("/images/{name}/"))
}

#[tokio::test]
async fn empty_queue_submit_issues_one_call() {
    let mut h = Harness::new();
    h.uploads.submit(photo("a"));

    let (request, _reply) = h.next_call().await;
    assert!(for_job(&request, "a"));
    assert_eq!(h.pending().await, [id("a")]);
    h.assert_no_call().await;
}

#[tokio::test]
async fn burst_issues_single_call_until_completion() {
    let mut h = Harness::new();
    for name in ["a", "b", "c", "d"] {
        h.uploads.submit(photo(name));
    }

    let (first, reply) = h.next_call().await;
    assert!(for_job(&first, "a"));
    assert_eq!(h.pending().await.len(), 4);
    h.assert_no_call().await;

    reply.send(Ok(HttpResponse::new(201, "{}"))).unwrap();
    let (second, _reply) = h.next_call().await;
    assert!(for_job(&second, "b"));
    assert_eq!(h.pending().await, [id("b"), id("c"), id("d")]);
}

#[tokio::test]
async fn scenario_success_failure_then_submit() {
    let mut h = Harness::new();
    for name in ["a", "b", "c"] {
        h.uploads.submit(photo(name));
    }
    let (a, reply_a) = h.next_call().await;
    assert!(for_job(&a, "a"));
    assert_eq!(h.pending().await, [id("a"), id("b"), id("c")]);
    h.assert_no_call().await;

    // Complete A: B goes out automatically.
    reply_a.send(Ok(HttpResponse::new(201, "{}"))).unwrap();
    let (b, reply_b) = h.next_call().await;
    assert!(for_job(&b, "b"));
    assert_eq!(h.pending().await, [id("b"), id("c")]);

    // Fail B: nothing changes, nothing is sent.
    reply_b
        .send(Err(TransportError::Failed("connection reset".to_string())))
        .unwrap();
    h.assert_no_call().await;
    assert_eq!(h.pending().await, [id("b"), id("c")]);
    assert_eq!(
        h.uploads.snapshot().await.unwrap().state,
        DeliveryState::Stalled(id("b"))
    );

    // Submit D: queue grows, still nothing is sent.
    h.uploads.submit(photo("d"));
    h.assert_no_call().await;
    assert_eq!(h.pending().await, [id("b"), id("c"), id("d")]);

    assert_eq!(
        h.drain_events(),
        [
            DataEvent::UploadBegan,
            DataEvent::UploadBegan,
            DataEvent::UploadSucceeded,
            DataEvent::UploadFailed,
        ]
    );
}

#[tokio::test]
async fn calls_follow_submission_order() {
    let mut h = Harness::new();
    let names = ["first", "second", "third", "fourth", "fifth"];
    for name in names {
        h.uploads.submit(photo(name));
    }

    for name in names {
        let (request, reply) = h.next_call().await;
        assert!(for_job(&request, name), "expected {name}, got {}", request.path);
        reply.send(Ok(HttpResponse::new(200, ""))).unwrap();
    }

    h.assert_no_call().await;
    let snapshot = h.uploads.snapshot().await.unwrap();
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.state, DeliveryState::Idle);
}

#[tokio::test]
async fn server_rejection_is_a_failure() {
    let mut h = Harness::new();
    h.uploads.submit(photo("a"));
    h.uploads.submit(photo("b"));

    let (_, reply) = h.next_call().await;
    reply.send(Ok(HttpResponse::new(500, "disk full"))).unwrap();
    h.assert_no_call().await;
    assert_eq!(h.pending().await, [id("a"), id("b")]);
    assert_eq!(h.drain_events(), [DataEvent::UploadBegan, DataEvent::UploadFailed]);
}

#[tokio::test]
async fn cached_image_available_before_delivery() {
    let mut h = Harness::new();
    h.uploads.submit(photo("a"));
    let (_request, _reply) = h.next_call().await;

    let cached = h.uploads.cached_image(id("a")).await.unwrap();
    assert_eq!(&cached[..], b"a");
    assert!(h.uploads.cached_image(id("missing")).await.is_none());
}
