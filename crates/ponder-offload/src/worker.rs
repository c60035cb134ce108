//! Cooperative worker scheduler with cancellation by supersession.
//!
//! The worker context owns one compute unit and one logical search slot.
//! Every incoming request gets the next value of a worker-local sequence
//! counter, overwrites the unit's request region, and (if the unit agrees to
//! start) spawns a local task that alternates `tick` with a cooperative
//! yield:
//!
//! ```text
//!   request ──▶ id = next_id++ ──▶ copy ──▶ begin ──┬─ false ─▶ dropped
//!                                                    │
//!                   ┌────────────────────────────────┘
//!                   ▼
//!            superseded? ── yes ─▶ cancelled (nothing sent)
//!                   │ no
//!                 tick ── done ─▶ read 64 B ─▶ Response
//!                   │ running
//!                 yield ─▶ (message handler may run here)
//! ```
//!
//! A request is superseded once any later request has been received
//! (`id + 1 < next_id`). Nothing is ever sent to the unit to stop it; the old
//! task just notices at its next resume and returns. At most one extra slice
//! of work is wasted per superseded search.
//!
//! Everything runs on one thread. The message handler and the search tasks
//! share state through `Rc`/`Cell`/`RefCell` and never hold a borrow across
//! an `.await`.

use crate::ChannelError;
use crate::channel::{Outbox, WorkerLink};
use crate::message::{Message, MessageKind};
use ponder_core::{
    ComputeUnit, DeferredSink, RequestRecord, Side, TracingSink, UnitError, UnitFactory,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// How a single search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The unit finished and its response was sent.
    Completed,
    /// A newer request arrived first; the result was discarded.
    Cancelled,
    /// The unit refused to start; nothing was sent.
    Rejected,
}

/// Counters describing what the worker has done so far.
///
/// Written by the worker thread, readable from anywhere. Purely diagnostic:
/// the producer protocol never depends on them.
#[derive(Debug, Default)]
pub struct WorkerStats {
    received: AtomicU64,
    ignored: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    cancelled: AtomicU64,
}

impl WorkerStats {
    /// Requests received, ready or not.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Requests dropped because the worker was not initialized (or inert).
    pub fn ignored(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Requests the unit refused to start.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Searches that ran to completion and produced a response.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Searches abandoned because a newer request arrived.
    pub fn cancelled(&self) -> u64 {
        self.cancelled.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Worker-side context: the unit factory plus shared counters.
///
/// Constructed on any thread, then consumed by [`run`](Self::run) on the
/// thread that hosts the worker's event loop.
pub struct WorkerScheduler {
    factory: Box<dyn UnitFactory>,
    stats: Arc<WorkerStats>,
}

impl WorkerScheduler {
    /// Create a scheduler that will build its unit with `factory`.
    pub fn new(factory: impl UnitFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            stats: Arc::new(WorkerStats::default()),
        }
    }

    /// Shared handle to the worker's counters.
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Run the worker event loop until the producer drops its link.
    ///
    /// Must be polled inside a [`tokio::task::LocalSet`]: searches are
    /// spawned with [`tokio::task::spawn_local`].
    pub async fn run(self, link: WorkerLink) {
        let (mut inbox, outbox) = link.split();
        let session = Rc::new(Session::new(self.factory, self.stats));

        while let Some(message) = inbox.recv().await {
            match message {
                Message::Init(image) => session.init(&image),
                Message::Request(record) => {
                    if let Some(id) = session.submit(&record) {
                        let session = Rc::clone(&session);
                        let outbox = outbox.clone();
                        tokio::task::spawn_local(async move {
                            session.drive(id, &outbox).await;
                        });
                    }
                }
                Message::Response(_) => {
                    let err = ChannelError::Unexpected(MessageKind::Response);
                    tracing::warn!(error = %err, "ignoring message from producer");
                }
            }
        }

        tracing::debug!("producer link closed; worker loop exiting");
    }
}

impl std::fmt::Debug for WorkerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerScheduler")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// No init message seen yet.
    Pending,
    /// Unit instantiated and its memory allocated.
    Ready,
    /// Initialization failed; every later message is ignored.
    Inert,
}

/// State shared by the message handler and the search tasks.
struct Session {
    factory: Box<dyn UnitFactory>,
    unit: RefCell<Option<Box<dyn ComputeUnit>>>,
    status: Cell<Status>,
    next_id: Cell<u64>,
    sink: Arc<DeferredSink>,
    epoch: Instant,
    stats: Arc<WorkerStats>,
    link_lost: Cell<bool>,
}

impl Session {
    fn new(factory: Box<dyn UnitFactory>, stats: Arc<WorkerStats>) -> Self {
        Self {
            factory,
            unit: RefCell::new(None),
            status: Cell::new(Status::Pending),
            next_id: Cell::new(0),
            sink: Arc::new(DeferredSink::new()),
            epoch: Instant::now(),
            stats,
            link_lost: Cell::new(false),
        }
    }

    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn init(&self, image: &[u8]) {
        if self.status.get() != Status::Pending {
            tracing::warn!(status = ?self.status.get(), "duplicate init message ignored");
            return;
        }

        let mut unit = match self.factory.instantiate(image, self.sink.clone()) {
            Ok(unit) => unit,
            Err(err) => {
                self.disable(&err);
                return;
            }
        };

        if !unit.allocate_memory() {
            self.disable(&UnitError::Allocate);
            return;
        }

        self.sink.attach(Arc::new(TracingSink::new(Side::Worker.as_str())));
        *self.unit.borrow_mut() = Some(unit);
        self.status.set(Status::Ready);
        tracing::info!(image_bytes = image.len(), "worker compute unit ready");
    }

    fn disable(&self, err: &UnitError) {
        self.status.set(Status::Inert);
        tracing::error!(error = %err, "worker initialization failed; searches disabled");
    }

    /// Register a request and try to start it. Returns the id to drive.
    fn submit(&self, record: &RequestRecord) -> Option<u64> {
        WorkerStats::bump(&self.stats.received);
        if self.status.get() != Status::Ready {
            WorkerStats::bump(&self.stats.ignored);
            tracing::trace!("request before worker ready; ignoring");
            return None;
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let started = {
            let mut guard = self.unit.borrow_mut();
            let unit = guard.as_mut()?;
            unit.request_region_mut().write_record(record);
            unit.begin(self.now_ms())
        };

        if started {
            tracing::trace!(id, "search started");
            Some(id)
        } else {
            self.finish(id, 0, SearchOutcome::Rejected);
            None
        }
    }

    /// Count and log how a search ended.
    fn finish(&self, id: u64, ticks: u64, outcome: SearchOutcome) -> SearchOutcome {
        match outcome {
            SearchOutcome::Completed => {
                WorkerStats::bump(&self.stats.completed);
                tracing::debug!(id, ticks, "search completed");
            }
            SearchOutcome::Cancelled => {
                WorkerStats::bump(&self.stats.cancelled);
                tracing::debug!(id, ticks, "search superseded");
            }
            SearchOutcome::Rejected => {
                WorkerStats::bump(&self.stats.rejected);
                tracing::trace!(id, "search rejected by unit");
            }
        }
        outcome
    }

    fn is_superseded(&self, id: u64) -> bool {
        id + 1 < self.next_id.get()
    }

    /// Tick the search for `id` until it completes or is superseded.
    async fn drive(&self, id: u64, outbox: &Outbox) -> SearchOutcome {
        let mut ticks: u64 = 0;
        loop {
            if self.is_superseded(id) {
                return self.finish(id, ticks, SearchOutcome::Cancelled);
            }

            let running = match self.unit.borrow_mut().as_mut() {
                Some(unit) => unit.tick(self.now_ms()),
                None => return self.finish(id, ticks, SearchOutcome::Cancelled),
            };
            ticks += 1;
            if !running {
                break;
            }

            tokio::task::yield_now().await;
        }

        let record = match self.unit.borrow().as_ref() {
            Some(unit) => unit.response_region(Side::Worker).read_record(),
            None => return self.finish(id, ticks, SearchOutcome::Cancelled),
        };

        if outbox.send(Message::Response(record)).is_err() && !self.link_lost.replace(true) {
            tracing::warn!(id, "producer link disconnected; responses will be dropped");
        }
        self.finish(id, ticks, SearchOutcome::Completed)
    }
}

/// A worker running on its own OS thread.
#[derive(Debug)]
pub struct WorkerHandle {
    thread: std::thread::JoinHandle<()>,
    stats: Arc<WorkerStats>,
}

impl WorkerHandle {
    /// Shared handle to the worker's counters.
    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    /// Wait for the worker thread to exit.
    ///
    /// The worker exits once the producer link has been dropped.
    pub fn join(self) {
        if self.thread.join().is_err() {
            tracing::error!("worker thread panicked");
        }
    }
}

/// Run `scheduler` on a dedicated thread with its own single-threaded runtime.
///
/// If the runtime cannot be built, the failure is logged once and the thread
/// exits; the producer will simply never receive a response.
pub fn spawn_worker(scheduler: WorkerScheduler, link: WorkerLink) -> std::io::Result<WorkerHandle> {
    let stats = scheduler.stats();
    let thread = std::thread::Builder::new()
        .name("ponder-worker".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    let err = UnitError::Runtime(err.to_string());
                    tracing::error!(error = %err, "worker initialization failed");
                    return;
                }
            };
            let local = tokio::task::LocalSet::new();
            local.block_on(&runtime, scheduler.run(link));
        })?;

    Ok(WorkerHandle { thread, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::link;
    use ponder_core::{
        REQUEST_SIZE, Region, RequestRegion, ResponseRecord, ResponseRegion, SharedSink,
        UnitRegions,
    };

    /// Completes on its first tick, echoing the first request byte.
    struct OneShot {
        request: RequestRegion,
        responses: [ResponseRegion; 2],
        allocate: bool,
    }

    impl OneShot {
        fn boxed(allocate: bool) -> Box<dyn ComputeUnit> {
            Box::new(Self {
                request: Region::new(),
                responses: [Region::new(), Region::new()],
                allocate,
            })
        }
    }

    impl UnitRegions for OneShot {
        fn request_region(&self) -> &RequestRegion {
            &self.request
        }
        fn request_region_mut(&mut self) -> &mut RequestRegion {
            &mut self.request
        }
        fn response_region(&self, side: Side) -> &ResponseRegion {
            &self.responses[side as usize]
        }
        fn response_region_mut(&mut self, side: Side) -> &mut ResponseRegion {
            &mut self.responses[side as usize]
        }
    }

    impl ComputeUnit for OneShot {
        fn allocate_memory(&mut self) -> bool {
            self.allocate
        }
        fn begin(&mut self, _now_ms: f64) -> bool {
            true
        }
        fn tick(&mut self, _now_ms: f64) -> bool {
            let first = self.request.as_bytes()[0];
            self.responses[Side::Worker as usize].as_bytes_mut()[0] = first;
            false
        }
    }

    fn request(tag: u8) -> Message {
        let mut bytes = [0u8; REQUEST_SIZE];
        bytes[0] = tag;
        Message::Request(RequestRecord::new(bytes))
    }

    async fn settle() {
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn request_before_init_is_ignored() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = WorkerScheduler::new(|_: &[u8], _: SharedSink| {
                    Ok::<_, UnitError>(OneShot::boxed(true))
                });
                let stats = scheduler.stats();
                let (producer, worker) = link();
                tokio::task::spawn_local(scheduler.run(worker));

                producer.send(request(1)).unwrap();
                settle().await;
                assert_eq!(producer.try_recv().unwrap(), None);
                assert_eq!(stats.ignored(), 1);

                producer.send(Message::Init(Vec::new())).unwrap();
                producer.send(request(2)).unwrap();
                settle().await;

                let mut expected = [0u8; 64];
                expected[0] = 2;
                assert_eq!(
                    producer.try_recv().unwrap(),
                    Some(Message::Response(ResponseRecord::new(expected)))
                );
                assert_eq!(stats.completed(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn allocation_failure_makes_worker_inert() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = WorkerScheduler::new(|_: &[u8], _: SharedSink| {
                    Ok::<_, UnitError>(OneShot::boxed(false))
                });
                let stats = scheduler.stats();
                let (producer, worker) = link();
                tokio::task::spawn_local(scheduler.run(worker));

                producer.send(Message::Init(Vec::new())).unwrap();
                // A second init must not retry initialization.
                producer.send(Message::Init(Vec::new())).unwrap();
                for tag in 0..4 {
                    producer.send(request(tag)).unwrap();
                }
                settle().await;

                assert_eq!(producer.try_recv().unwrap(), None);
                assert_eq!(stats.received(), 4);
                assert_eq!(stats.ignored(), 4);
                assert_eq!(stats.completed(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn instantiate_failure_makes_worker_inert() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = WorkerScheduler::new(|_: &[u8], _: SharedSink| {
                    Err::<Box<dyn ComputeUnit>, _>(UnitError::instantiate("corrupt image"))
                });
                let stats = scheduler.stats();
                let (producer, worker) = link();
                tokio::task::spawn_local(scheduler.run(worker));

                producer.send(Message::Init(b"garbage".to_vec())).unwrap();
                producer.send(request(1)).unwrap();
                settle().await;

                assert_eq!(producer.try_recv().unwrap(), None);
                assert_eq!(stats.ignored(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn response_message_is_ignored() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = WorkerScheduler::new(|_: &[u8], _: SharedSink| {
                    Ok::<_, UnitError>(OneShot::boxed(true))
                });
                let stats = scheduler.stats();
                let (producer, worker) = link();
                tokio::task::spawn_local(scheduler.run(worker));

                producer.send(Message::Init(Vec::new())).unwrap();
                producer
                    .send(Message::Response(ResponseRecord::new([9; 64])))
                    .unwrap();
                producer.send(request(3)).unwrap();
                settle().await;

                let Some(Message::Response(record)) = producer.try_recv().unwrap() else {
                    panic!("expected a response");
                };
                assert_eq!(record.as_bytes()[0], 3);
                assert_eq!(producer.try_recv().unwrap(), None);
                assert!(!producer.is_closed());
                assert_eq!(stats.received(), 1);
                assert_eq!(stats.completed(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn lost_producer_is_noted_once() {
        let (producer, worker) = link();
        let (_inbox, outbox) = worker.split();
        drop(producer);

        let session = Session::new(
            Box::new(|_: &[u8], _: SharedSink| Ok::<_, UnitError>(OneShot::boxed(true))),
            Arc::new(WorkerStats::default()),
        );
        session.init(&[]);

        for tag in 0..2 {
            let id = session.submit(&RequestRecord::new([tag; REQUEST_SIZE])).unwrap();
            assert_eq!(session.drive(id, &outbox).await, SearchOutcome::Completed);
        }
        assert!(session.link_lost.get());
        assert_eq!(session.stats.completed(), 2);
    }

    #[test]
    fn spawned_worker_exits_when_producer_drops() {
        let (producer, worker) = link();
        let handle = spawn_worker(
            WorkerScheduler::new(|_: &[u8], _: SharedSink| Ok::<_, UnitError>(OneShot::boxed(true))),
            worker,
        )
        .unwrap();

        producer.send(Message::Init(Vec::new())).unwrap();
        producer.send(request(7)).unwrap();

        // Blocking wait on the crossbeam side is fine from a plain test thread.
        let stats = handle.stats();
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        let response = loop {
            if let Some(message) = producer.try_recv().unwrap() {
                break message;
            }
            assert!(Instant::now() < deadline, "worker never answered");
            std::thread::yield_now();
        };
        assert_eq!(response.payload()[0], 7);
        assert_eq!(stats.completed(), 1);

        drop(producer);
        handle.join();
    }
}
