//! Reset handshake between a coordinator and a running worker over the
//! in-memory message bus

mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use frontier_bus::{InMemoryMessageBus, JsonCodec};
use frontier_interfaces::{Codec, ControlMessage, LogProducer};
use frontier_logging::init_test_tracing;
use frontier_resilience::ManualClock;
use frontier_worker::testing::{BackendCall, CountingSlot, RecordingBackend};
use frontier_worker::{ResetState, Worker};

use common::{fast_config, spawn_main, wait_until};

const WAIT: Duration = Duration::from_secs(5);

/// Coordinator side of the handshake
struct Coordinator {
    bus: InMemoryMessageBus,
    codec: JsonCodec,
}

impl Coordinator {
    fn new(bus: &InMemoryMessageBus) -> Self {
        Self {
            bus: bus.clone(),
            codec: JsonCodec::new(),
        }
    }

    fn send(&self, message: ControlMessage) -> Result<()> {
        let payload = self.codec.encode(message)?;
        self.send_raw(payload)
    }

    fn send_raw(&self, payload: Bytes) -> Result<()> {
        self.bus
            .log(self.bus.reset_topic())
            .in_memory_producer()
            .send(None, payload)?;
        Ok(())
    }

    fn acks(&self) -> Result<Vec<ControlMessage>> {
        let mut acks = Vec::new();
        for record in self.bus.records(self.bus.reset_ack_topic()) {
            assert!(record.key.is_none(), "acks are published without a key");
            acks.push(self.codec.decode(&record.payload)?);
        }
        Ok(acks)
    }
}

struct Fixture {
    worker: Arc<Worker>,
    coordinator: Coordinator,
    backend: Arc<RecordingBackend>,
    slot: Arc<CountingSlot>,
    clock: ManualClock,
}

fn fixture() -> Result<Fixture> {
    init_test_tracing();

    let bus = InMemoryMessageBus::new();
    let backend = Arc::new(RecordingBackend::new());
    let slot = Arc::new(CountingSlot::new());
    let clock = ManualClock::new();

    let mut config = fast_config();
    config.reset.reset_timeout = Duration::from_secs(60);

    let worker = Worker::builder(backend.clone())
        .config(config)
        .message_bus(Arc::new(bus.clone()))
        .slot(slot.clone())
        .clock(Arc::new(clock.clone()))
        .build()?;

    Ok(Fixture {
        worker: Arc::new(worker),
        coordinator: Coordinator::new(&bus),
        backend,
        slot,
        clock,
    })
}

#[test]
fn test_reset_then_reset_done() -> Result<()> {
    let f = fixture()?;
    let main = spawn_main(&f.worker);
    assert!(wait_until(WAIT, || f.slot.count() == 1), "worker never started");

    f.coordinator.send(ControlMessage::Reset)?;
    assert!(wait_until(WAIT, || f.worker.reset_consumer().is_resetting()));

    assert!(f.worker.stop_signal().is_set());
    assert_eq!(f.coordinator.acks()?, vec![ControlMessage::ResetAck]);
    assert_eq!(
        f.backend.calls(),
        vec![BackendCall::Start, BackendCall::Stop, BackendCall::Start]
    );

    f.coordinator.send(ControlMessage::ResetDone)?;
    assert!(wait_until(WAIT, || f.worker.reset_consumer().stats().resumes == 1));
    assert_eq!(f.worker.reset_consumer().state(), ResetState::Normal);

    assert!(!f.worker.stop_signal().is_set());
    assert_eq!(f.slot.count(), 2);
    assert_eq!(f.coordinator.acks()?.len(), 1, "exactly one ack per reset");
    assert_eq!(f.backend.count(BackendCall::Stop), 2);
    assert_eq!(f.backend.count(BackendCall::Start), 3);

    f.worker.shutdown();
    let (main_id, result) = main.join().expect("main context panicked");
    result?;

    assert!(f.backend.all_on(main_id), "backend touched off the main context");
    assert_eq!(f.backend.calls().last(), Some(&BackendCall::Stop));

    let stats = f.worker.reset_consumer().stats();
    assert_eq!(stats.resets, 1);
    assert_eq!(stats.resumes, 1);
    assert_eq!(stats.backend_cycles, 2);
    Ok(())
}

#[test]
fn test_reset_timeout_resumes_worker() -> Result<()> {
    let f = fixture()?;
    let main = spawn_main(&f.worker);

    f.coordinator.send(ControlMessage::Reset)?;
    assert!(wait_until(WAIT, || f.worker.reset_consumer().is_resetting()));

    // Right at the deadline the worker stays paused
    f.clock.advance(Duration::from_secs(60));
    let ticks = f.worker.reset_consumer().periodic_task().ticks();
    assert!(wait_until(WAIT, || f.worker.reset_consumer().periodic_task().ticks() > ticks + 2));
    assert!(f.worker.reset_consumer().is_resetting());
    assert!(f.worker.stop_signal().is_set());

    f.clock.advance(Duration::from_secs(1));
    assert!(wait_until(WAIT, || f.worker.reset_consumer().stats().resumes == 1));
    assert!(!f.worker.reset_consumer().is_resetting());

    assert!(!f.worker.stop_signal().is_set());
    assert_eq!(f.worker.reset_consumer().stats().timeouts, 1);
    assert_eq!(f.backend.count(BackendCall::Stop), 2);

    f.worker.shutdown();
    main.join().expect("main context panicked").1?;
    Ok(())
}

#[test]
fn test_undecodable_message_is_skipped() -> Result<()> {
    let f = fixture()?;
    let main = spawn_main(&f.worker);

    f.coordinator.send_raw(Bytes::from_static(br#"{"type":"reboot"}"#))?;
    f.coordinator.send(ControlMessage::ResetAck)?;
    assert!(wait_until(WAIT, || f.worker.reset_consumer().stats().decode_failures == 1));

    // Give the consumer a few more polls to misbehave
    let ticks = f.worker.reset_consumer().periodic_task().ticks();
    assert!(wait_until(WAIT, || f.worker.reset_consumer().periodic_task().ticks() > ticks + 2));

    assert_eq!(f.worker.reset_consumer().state(), ResetState::Normal);
    assert!(!f.worker.stop_signal().is_set());
    assert!(f.coordinator.acks()?.is_empty());
    assert_eq!(f.backend.calls(), vec![BackendCall::Start]);

    f.worker.shutdown();
    main.join().expect("main context panicked").1?;
    Ok(())
}

#[test]
fn test_consecutive_resets() -> Result<()> {
    let f = fixture()?;
    let main = spawn_main(&f.worker);

    for round in 1..=3usize {
        f.coordinator.send(ControlMessage::Reset)?;
        let acked = || f.coordinator.acks().map(|acks| acks.len()).unwrap_or(0) == round;
        assert!(wait_until(WAIT, acked));

        f.coordinator.send(ControlMessage::ResetDone)?;
        assert!(wait_until(WAIT, || f.worker.reset_consumer().stats().resumes == round as u64));
        assert!(!f.worker.stop_signal().is_set());
    }

    f.worker.shutdown();
    main.join().expect("main context panicked").1?;

    assert_eq!(f.worker.reset_consumer().stats().backend_cycles, 6);
    Ok(())
}
