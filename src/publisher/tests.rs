use super::{DrainReport, Lanes, Outbox, PublishWorker};
use crate::manifest::InMemoryManifestRepository;
use crate::model::{ActuatorState, ActuatorStatus, Message, SensorReading};
use crate::router::MessageRouter;
use crate::transport::MessageSink;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Accepts the first `budget` publishes, refuses the rest.
struct BudgetSink {
    budget: AtomicUsize,
    attempts: AtomicUsize,
    accepted: Mutex<Vec<Message>>,
}

impl BudgetSink {
    fn new(budget: usize) -> Self {
        Self {
            budget: AtomicUsize::new(budget),
            attempts: AtomicUsize::new(0),
            accepted: Mutex::new(Vec::new()),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn accepted(&self) -> Vec<Message> {
        self.accepted.lock().unwrap().clone()
    }
}

impl MessageSink for BudgetSink {
    fn publish(&self, message: &Message) -> bool {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let granted = self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
            .is_ok();
        if granted {
            self.accepted.lock().unwrap().push(message.clone());
        }
        granted
    }
}

fn router_with(sink: Arc<BudgetSink>) -> Arc<MessageRouter> {
    Arc::new(MessageRouter::new(
        "GW",
        Arc::new(InMemoryManifestRepository::new()),
        sink.clone(),
        sink,
        Arc::new(Outbox::in_memory()),
    ))
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

#[test]
fn test_outbox_starts_disconnected_and_signalled() {
    let outbox = Outbox::in_memory();
    assert!(!outbox.is_connected());
    assert!(!outbox.may_publish());
    assert!(outbox.is_running());
    assert!(outbox.is_empty());
}

#[test]
fn test_outbox_lanes_are_separate() {
    let outbox = Outbox::in_memory();
    outbox.put(Lanes::readings, "T", SensorReading::new("T", "1", 0));
    outbox.put(
        Lanes::statuses,
        "T",
        ActuatorStatus::new("T", "on", ActuatorState::Ready),
    );

    assert_eq!(outbox.len(Lanes::readings, "T"), 1);
    assert_eq!(outbox.len(Lanes::statuses, "T"), 1);
    assert_eq!(outbox.len(Lanes::alarms, "T"), 0);

    outbox.remove_first_n(Lanes::readings, "T", 1);
    assert_eq!(outbox.len(Lanes::readings, "T"), 0);
    assert!(!outbox.is_empty());
}

#[test]
fn test_acknowledge_keeps_value_overwritten_in_flight() {
    let outbox = Outbox::in_memory();
    let old = ActuatorStatus::new("SW", "off", ActuatorState::Busy);
    let new = ActuatorStatus::new("SW", "on", ActuatorState::Ready);
    outbox.put(Lanes::statuses, "SW", old.clone());

    let in_flight = outbox.peek_first_n(Lanes::statuses, "SW", 1);
    outbox.put(Lanes::statuses, "SW", new.clone());

    assert!(!outbox.acknowledge(Lanes::statuses, "SW", &in_flight));
    assert_eq!(outbox.get(Lanes::statuses, "SW"), Some(new.clone()));
    assert!(outbox.acknowledge(Lanes::statuses, "SW", &[new]));
    assert!(outbox.is_empty());
}

#[test]
fn test_set_connected_only_opens_gate_while_running() {
    let outbox = Outbox::in_memory();
    outbox.set_connected(true);
    assert!(outbox.may_publish());
    outbox.stop();
    assert!(!outbox.may_publish());
    outbox.set_connected(false);
    assert!(!outbox.is_connected());
}

#[test]
fn test_drain_report_merge() {
    let mut report = DrainReport {
        published: 1,
        ..DrainReport::default()
    };
    report.merge(DrainReport {
        published: 2,
        failed: 1,
        dropped: 0,
    });
    assert_eq!(report.published, 3);
    assert_eq!(report.failed, 1);
    assert!(!report.is_clean());
    assert!(DrainReport::default().is_clean());
}

#[test]
fn test_worker_sends_nothing_while_disconnected() {
    let sink = Arc::new(BudgetSink::new(usize::MAX));
    let router = router_with(sink.clone());
    let mut worker = PublishWorker::start(router.clone(), sink.clone()).unwrap();

    router.add_sensor_reading("T", "1", 0);
    thread::sleep(Duration::from_millis(100));

    assert_eq!(sink.attempts(), 0);
    assert_eq!(router.outbox().len(Lanes::readings, "T"), 1);
    worker.stop();
}

#[test]
fn test_worker_drains_after_connect() {
    let sink = Arc::new(BudgetSink::new(usize::MAX));
    let router = router_with(sink.clone());
    router.add_sensor_reading("T", "1", 10);
    router.add_alarm("HOT", true, 20);

    let mut worker = PublishWorker::start(router.clone(), sink.clone()).unwrap();
    worker.on_connected();

    assert!(wait_until(|| router.outbox().is_empty()));
    let mut channels: Vec<String> = sink
        .accepted()
        .iter()
        .map(|m| m.channel().to_string())
        .collect();
    channels.sort();
    assert_eq!(
        channels,
        vec!["d2p/events/g/GW/r/HOT", "d2p/sensor_reading/g/GW/r/T"]
    );

    // new data wakes the worker again
    router.add_sensor_reading("T", "2", 30);
    assert!(wait_until(|| sink.accepted().len() == 3));
    worker.stop();
}

#[test]
fn test_refused_publish_leaves_backlog_unchanged() {
    let sink = Arc::new(BudgetSink::new(0));
    let router = router_with(sink.clone());
    router.add_sensor_reading("T", "1", 0);
    router.add_sensor_reading("T", "2", 0);

    let mut worker = PublishWorker::start(router.clone(), sink.clone()).unwrap();
    worker.on_connected();

    assert!(wait_until(|| sink.attempts() >= 1));
    worker.stop();

    assert_eq!(sink.attempts(), 1);
    assert_eq!(router.outbox().len(Lanes::readings, "T"), 2);
}

#[test]
fn test_accepted_value_is_sent_exactly_once() {
    let sink = Arc::new(BudgetSink::new(1));
    let router = router_with(sink.clone());
    router.add_actuator_status("SW", "on", ActuatorState::Ready);

    let mut worker = PublishWorker::start(router.clone(), sink.clone()).unwrap();
    worker.on_connected();

    assert!(wait_until(|| router.outbox().is_empty()));
    // a reconnect edge triggers another pass over an empty backlog
    worker.on_disconnected();
    worker.on_connected();
    thread::sleep(Duration::from_millis(100));
    worker.stop();

    assert_eq!(sink.accepted().len(), 1);
    assert_eq!(sink.attempts(), 1);
}

#[test]
fn test_reconnect_retries_refused_batch() {
    let sink = Arc::new(BudgetSink::new(0));
    let router = router_with(sink.clone());
    router.add_alarm("HOT", false, 0);

    let mut worker = PublishWorker::start(router.clone(), sink.clone()).unwrap();
    worker.on_connected();
    assert!(wait_until(|| sink.attempts() == 1));

    sink.budget.store(1, Ordering::SeqCst);
    worker.on_disconnected();
    worker.on_connected();

    assert!(wait_until(|| router.outbox().is_empty()));
    assert_eq!(sink.accepted().len(), 1);
    worker.stop();
}

#[test]
fn test_stop_joins_and_is_idempotent() {
    let sink = Arc::new(BudgetSink::new(usize::MAX));
    let router = router_with(sink.clone());
    let mut worker = PublishWorker::start(router.clone(), sink).unwrap();
    assert!(worker.is_running());

    worker.stop();
    assert!(!worker.is_running());
    assert!(!router.outbox().is_running());
    worker.stop();
}

#[test]
fn test_drop_stops_worker() {
    let sink = Arc::new(BudgetSink::new(usize::MAX));
    let router = router_with(sink.clone());
    {
        let worker = PublishWorker::start(router.clone(), sink.clone()).unwrap();
        worker.on_connected();
    }
    assert!(!router.outbox().is_running());

    router.add_sensor_reading("T", "1", 0);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(sink.attempts(), 0);
}
