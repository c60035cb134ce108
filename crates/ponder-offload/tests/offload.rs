//! End-to-end behavior of the offload protocol.
//!
//! Most scenarios drive the worker on the test's own `LocalSet` so the
//! interleaving of messages and ticks is fully deterministic: nothing on the
//! worker side runs until the test yields.

use ponder_core::{
    ComputeUnit, REQUEST_SIZE, RESPONSE_SIZE, Region, RequestRecord, RequestRegion,
    ResponseRecord, ResponseRegion, SharedSink, Side, UnitError, UnitRegions,
};
use ponder_offload::{
    BudgetFactory, FrameInput, HostEngine, Message, ProducerCoordinator, ProducerLink,
    SoundState, UnitImage, WorkerScheduler, WorkerStats, link, spawn_worker,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Never finishes.
const FOREVER: u8 = u8::MAX;

/// A unit whose behavior is scripted by the request bytes.
///
/// - byte 0: ticks needed to finish ([`FOREVER`] = never)
/// - byte 1: zero makes `begin` refuse
///
/// On completion the response echoes the 56 request bytes followed by the
/// number of ticks taken.
struct ScriptedUnit {
    request: RequestRegion,
    responses: [ResponseRegion; 2],
    needed: u8,
    ticks: u8,
}

impl ScriptedUnit {
    fn factory(_image: &[u8], _sink: SharedSink) -> Result<Box<dyn ComputeUnit>, UnitError> {
        Ok(Box::new(ScriptedUnit {
            request: Region::new(),
            responses: [Region::new(), Region::new()],
            needed: 0,
            ticks: 0,
        }))
    }
}

impl UnitRegions for ScriptedUnit {
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

impl ComputeUnit for ScriptedUnit {
    fn allocate_memory(&mut self) -> bool {
        true
    }

    fn begin(&mut self, _now_ms: f64) -> bool {
        let bytes = self.request.as_bytes();
        if bytes[1] == 0 {
            return false;
        }
        self.needed = bytes[0];
        self.ticks = 0;
        true
    }

    fn tick(&mut self, _now_ms: f64) -> bool {
        self.ticks = self.ticks.saturating_add(1);
        if self.needed == FOREVER || self.ticks < self.needed {
            return true;
        }

        let out = self.responses[Side::Worker as usize].as_bytes_mut();
        out[..REQUEST_SIZE].copy_from_slice(self.request.as_bytes());
        out[REQUEST_SIZE] = self.ticks;
        false
    }
}

fn request(ticks: u8, accept: bool, tag: u8) -> RequestRecord {
    let mut bytes = [0u8; REQUEST_SIZE];
    bytes[0] = ticks;
    bytes[1] = u8::from(accept);
    bytes[2] = tag;
    RequestRecord::new(bytes)
}

fn expected_response(record: &RequestRecord, ticks: u8) -> ResponseRecord {
    let mut bytes = [0u8; RESPONSE_SIZE];
    bytes[..REQUEST_SIZE].copy_from_slice(record.as_bytes());
    bytes[REQUEST_SIZE] = ticks;
    ResponseRecord::new(bytes)
}

/// Give the worker `rounds` scheduling opportunities, collecting responses.
async fn pump(producer: &ProducerLink, rounds: usize) -> Vec<ResponseRecord> {
    let mut out = Vec::new();
    for _ in 0..rounds {
        tokio::task::yield_now().await;
        while let Some(message) = producer.try_recv().unwrap() {
            match message {
                Message::Response(record) => out.push(record),
                other => panic!("unexpected {:?} from worker", other.kind()),
            }
        }
    }
    out
}

/// Start a scripted worker on the current `LocalSet` and initialize it.
fn start_scripted() -> (ProducerLink, Arc<WorkerStats>) {
    let scheduler = WorkerScheduler::new(ScriptedUnit::factory);
    let stats = scheduler.stats();
    let (producer, worker) = link();
    tokio::task::spawn_local(scheduler.run(worker));
    producer.send(Message::Init(Vec::new())).unwrap();
    (producer, stats)
}

#[tokio::test]
async fn only_the_last_of_a_burst_is_answered() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (producer, stats) = start_scripted();

            let burst: Vec<_> = (0..5).map(|tag| request(3, true, tag)).collect();
            for record in &burst {
                producer.send(Message::Request(*record)).unwrap();
            }

            let responses = pump(&producer, 64).await;
            assert_eq!(responses, vec![expected_response(&burst[4], 3)]);
            assert_eq!(stats.completed(), 1);
            assert_eq!(stats.cancelled(), 4);
        })
        .await;
}

#[tokio::test]
async fn completed_search_sends_the_worker_region_verbatim() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (producer, _stats) = start_scripted();

            let mut bytes = [0u8; REQUEST_SIZE];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = 0x40 + i as u8;
            }
            bytes[0] = 2;
            bytes[1] = 1;
            let record = RequestRecord::new(bytes);
            producer.send(Message::Request(record)).unwrap();

            let responses = pump(&producer, 16).await;
            assert_eq!(responses, vec![expected_response(&record, 2)]);
        })
        .await;
}

#[tokio::test]
async fn rejected_start_sends_nothing_and_does_not_delay_the_next() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (producer, stats) = start_scripted();

            producer
                .send(Message::Request(request(1, false, 1)))
                .unwrap();
            let accepted = request(1, true, 2);
            producer.send(Message::Request(accepted)).unwrap();

            // One tick is all the accepted search needs; a handful of
            // scheduling rounds must be enough.
            let responses = pump(&producer, 4).await;
            assert_eq!(responses, vec![expected_response(&accepted, 1)]);
            assert_eq!(stats.rejected(), 1);
            assert_eq!(stats.completed(), 1);
        })
        .await;
}

#[tokio::test]
async fn newer_request_cancels_a_search_in_flight() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (producer, stats) = start_scripted();

            producer
                .send(Message::Request(request(FOREVER, true, 0xA)))
                .unwrap();
            assert!(pump(&producer, 8).await.is_empty());

            let b = request(3, true, 0xB);
            producer.send(Message::Request(b)).unwrap();

            let responses = pump(&producer, 32).await;
            assert_eq!(responses, vec![expected_response(&b, 3)]);
            assert_eq!(stats.cancelled(), 1);
            assert_eq!(stats.completed(), 1);
        })
        .await;
}

#[tokio::test]
async fn rejected_request_still_supersedes_the_one_in_flight() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let (producer, stats) = start_scripted();

            producer
                .send(Message::Request(request(FOREVER, true, 1)))
                .unwrap();
            pump(&producer, 4).await;
            producer
                .send(Message::Request(request(1, false, 2)))
                .unwrap();

            assert!(pump(&producer, 16).await.is_empty());
            assert_eq!(stats.cancelled(), 1);
            assert_eq!(stats.rejected(), 1);
        })
        .await;
}

/// Producer engine that wants a move on two frames `interval` apart and
/// records every distinct response it sees.
struct Demo {
    request: RequestRegion,
    responses: [ResponseRegion; 2],
    interval: u64,
    answers: Vec<u8>,
}

impl UnitRegions for Demo {
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

impl HostEngine for Demo {
    fn step(&mut self, input: &FrameInput) -> bool {
        let answer = self.responses[Side::Producer as usize].as_bytes()[0];
        if answer != 0 && self.answers.last() != Some(&answer) {
            self.answers.push(answer);
        }
        let round = input.frame / self.interval;
        if input.frame % self.interval != 0 || round >= 2 {
            return false;
        }
        let bytes = self.request.as_bytes_mut();
        bytes[0] = round as u8 + 1;
        bytes[48] = 1;
        true
    }

    fn sound_state(&self) -> SoundState {
        SoundState::default()
    }
}

#[test]
fn producer_and_worker_threads_exchange_real_searches() {
    let (producer, worker) = link();
    let handle = spawn_worker(WorkerScheduler::new(BudgetFactory), worker).unwrap();
    let stats = handle.stats();

    let engine = Demo {
        request: Region::new(),
        responses: [Region::new(), Region::new()],
        interval: 50,
        answers: Vec::new(),
    };
    let mut coordinator = ProducerCoordinator::new(engine, producer);
    let image = UnitImage {
        budget_ms: 0.0,
        memory_bytes: 4096,
    };
    coordinator.send_init(image.to_bytes().unwrap());

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut frame = 0;
    while coordinator.engine().answers.len() < 2 {
        assert!(Instant::now() < deadline, "worker never answered");
        coordinator.frame(&FrameInput {
            frame,
            ..FrameInput::default()
        });
        frame += 1;
        std::thread::sleep(Duration::from_micros(100));
    }

    assert_eq!(coordinator.engine().answers, vec![1, 2]);
    assert_eq!(coordinator.requests_issued(), 2);
    assert_eq!(stats.completed(), 2);

    drop(coordinator);
    handle.join();
}
