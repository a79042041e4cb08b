use acd_queue::{CallHooks, CallQueue, CallState, QueueError, QueuedCall};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Hook {
    Hold(u32),
    Ready(u32),
}

type HookLog = Arc<Mutex<Vec<Hook>>>;

#[derive(Debug)]
struct TestCall {
    tag: u32,
    log: HookLog,
}

impl CallHooks for TestCall {
    fn on_hold(&mut self) {
        self.log.lock().unwrap().push(Hook::Hold(self.tag));
    }

    fn on_ready(&mut self) {
        self.log.lock().unwrap().push(Hook::Ready(self.tag));
    }
}

fn queued(tag: u32, log: &HookLog) -> QueuedCall<TestCall> {
    QueuedCall::new(TestCall {
        tag,
        log: Arc::clone(log),
    })
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn queue_is_empty_at_start() {
    let queue = CallQueue::<TestCall>::new();
    assert_eq!(queue.len(), 0);
    assert!(queue.is_empty());
    assert_eq!(queue.agents_waiting(), 0);
    assert!(queue.queue_snapshot().is_empty());
    assert!(queue.try_next_call().is_none());
}

#[test]
fn enqueue_holds_and_appends() {
    let log = HookLog::default();
    let queue = CallQueue::new();
    let call = queued(1, &log);
    let id = call.id();

    queue.enqueue(call).unwrap();

    let snapshot = queue.queue_snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    assert_eq!(snapshot[0].state, CallState::Held);
    assert_eq!(*log.lock().unwrap(), vec![Hook::Hold(1)]);
}

#[test]
fn next_call_returns_the_enqueued_call() {
    let log = HookLog::default();
    let queue = CallQueue::new();
    queue.enqueue(queued(7, &log)).unwrap();

    let call = queue.next_call().unwrap();
    assert_eq!(call.tag, 7);
    assert_eq!(*log.lock().unwrap(), vec![Hook::Hold(7), Hook::Ready(7)]);
    assert!(queue.is_empty());
}

#[test]
fn agent_blocks_until_a_call_arrives() {
    let log = HookLog::default();
    let queue = Arc::new(CallQueue::<TestCall>::new());

    let agent = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.next_call())
    };

    wait_until("agent to block", || queue.agents_waiting() == 1);
    assert!(!agent.is_finished());

    queue.enqueue(queued(1, &log)).unwrap();
    assert_eq!(queue.agents_waiting(), 0);

    let call = agent.join().unwrap().unwrap();
    assert_eq!(call.tag, 1);
    assert_eq!(*log.lock().unwrap(), vec![Hook::Hold(1), Hook::Ready(1)]);
}

#[test]
fn one_call_unblocks_exactly_one_agent() {
    let log = HookLog::default();
    let queue = Arc::new(CallQueue::<TestCall>::new());
    let (tx, rx) = mpsc::channel();

    let agents: Vec<_> = (0..2)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            thread::spawn(move || {
                let call = queue.next_call().unwrap();
                tx.send(call.tag).unwrap();
            })
        })
        .collect();

    wait_until("both agents to block", || queue.agents_waiting() == 2);

    queue.enqueue(queued(1, &log)).unwrap();
    assert_eq!(queue.agents_waiting(), 1);
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1);
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(queue.agents_waiting(), 1);

    queue.enqueue(queued(2, &log)).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 2);
    for agent in agents {
        agent.join().unwrap();
    }
    assert_eq!(queue.agents_waiting(), 0);
}

#[test]
fn longest_waiting_agent_is_served_first() {
    let log = HookLog::default();
    let queue = Arc::new(CallQueue::<TestCall>::new());
    let (tx, rx) = mpsc::channel();

    let mut agents = Vec::new();
    for name in ["first", "second", "third"] {
        let agent_queue = Arc::clone(&queue);
        let tx = tx.clone();
        agents.push(thread::spawn(move || {
            let call = agent_queue.next_call().unwrap();
            tx.send((name, call.tag)).unwrap();
        }));
        let expected = agents.len();
        wait_until("agent to block", || queue.agents_waiting() == expected);
    }

    for tag in 1..=3 {
        queue.enqueue(queued(tag, &log)).unwrap();
        let delivered = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let expected = match tag {
            1 => "first",
            2 => "second",
            _ => "third",
        };
        assert_eq!(delivered, (expected, tag));
    }
    for agent in agents {
        agent.join().unwrap();
    }
}

#[test]
fn calls_come_out_in_arrival_order() {
    let log = HookLog::default();
    let queue = Arc::new(CallQueue::<TestCall>::new());

    let mut ids = Vec::new();
    for tag in 1..=3 {
        let call = queued(tag, &log);
        ids.push(call.id());
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.enqueue(call))
            .join()
            .unwrap()
            .unwrap();
    }

    let snapshot: Vec<u64> = queue.queue_snapshot().iter().map(|s| s.id).collect();
    assert_eq!(snapshot, ids);

    let order: Vec<u32> = (0..3).map(|_| queue.next_call().unwrap().tag).collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn call_already_held_is_rejected() {
    let log = HookLog::default();
    let queue = CallQueue::new();
    let mut call = queued(1, &log);
    call.hold().unwrap();
    let id = call.id();

    let err = queue.enqueue(call).unwrap_err();
    assert_eq!(
        err,
        QueueError::InvalidTransition {
            id,
            from: CallState::Held,
            to: CallState::Held,
        }
    );
    assert!(queue.is_empty());
    assert_eq!(queue.stats().enqueued, 0);
    assert_eq!(*log.lock().unwrap(), vec![Hook::Hold(1)]);
}

#[test]
fn hooks_fire_once_under_contention() {
    const PRODUCERS: u32 = 8;
    const AGENTS: u32 = 8;
    const PER_PRODUCER: u32 = 250;

    let log = HookLog::default();
    let queue = Arc::new(CallQueue::<TestCall>::new());
    let total = PRODUCERS * PER_PRODUCER;

    let agents: Vec<_> = (0..AGENTS)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                (0..total / AGENTS)
                    .map(|_| queue.next_call().unwrap().tag)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = Arc::clone(&queue);
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for n in 0..PER_PRODUCER {
                    queue.enqueue(queued(p * PER_PRODUCER + n, &log)).unwrap();
                    if n % 16 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    let mut received: Vec<u32> = agents
        .into_iter()
        .flat_map(|agent| agent.join().unwrap())
        .collect();
    received.sort();
    assert_eq!(received, (0..total).collect::<Vec<_>>());

    let mut counts: HashMap<Hook, u32> = HashMap::new();
    for hook in log.lock().unwrap().iter() {
        *counts.entry(*hook).or_default() += 1;
    }
    assert_eq!(counts.len(), 2 * total as usize);
    assert!(counts.values().all(|&n| n == 1));

    let stats = queue.stats();
    assert_eq!(stats.enqueued, total as u64);
    assert_eq!(stats.delivered, total as u64);
    assert_eq!(stats.queued, 0);
    assert_eq!(stats.agents_waiting, 0);
}

#[test]
fn stats_track_queue_depth() {
    let log = HookLog::default();
    let queue = CallQueue::new();
    for tag in 0..5 {
        queue.enqueue(queued(tag, &log)).unwrap();
    }
    queue.next_call().unwrap();
    queue.try_next_call().unwrap().unwrap();

    let stats = queue.stats();
    assert_eq!(stats.enqueued, 5);
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.queued as u64, stats.enqueued - stats.delivered);
    assert_eq!(queue.len(), 3);
}
