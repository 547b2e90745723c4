use handoff_rs::prelude::*;
use handoff_rs::dispatch::Callback;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn runtime(event_loop: &EventLoop, workers: usize) -> Runtime {
    let config = Config::builder().num_threads(workers).build().unwrap();
    Runtime::new(&config, event_loop.handle()).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Progress(u64),
    Complete(std::result::Result<u64, String>),
}

/// Sleeps, reports a fixed list of updates, returns input doubled.
struct Scripted {
    sleep: Duration,
    updates: Vec<u64>,
    fail: bool,
    panic: bool,
    running: AtomicBool,
    overlapped: AtomicBool,
    events: Mutex<Vec<(Event, ThreadId)>>,
}

impl Scripted {
    fn new(sleep_ms: u64, updates: Vec<u64>) -> Self {
        Self {
            sleep: Duration::from_millis(sleep_ms),
            updates,
            fail: false,
            panic: false,
            running: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0, vec![])
        }
    }

    fn panicking() -> Self {
        Self {
            panic: true,
            ..Self::new(0, vec![])
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    fn completed(&self) -> bool {
        self.events
            .lock()
            .iter()
            .any(|(e, _)| matches!(e, Event::Complete(_)))
    }
}

impl Task for Scripted {
    type Params = u64;
    type Update = u64;
    type Output = u64;

    fn run_background(&self, n: u64, progress: &Progress<u64>) -> std::result::Result<u64, BoxError> {
        if self.running.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        thread::sleep(self.sleep);
        for u in &self.updates {
            progress.report(*u);
        }
        self.running.store(false, Ordering::SeqCst);

        if self.panic {
            panic!("scripted panic");
        }
        if self.fail {
            return Err("scripted failure".into());
        }
        Ok(n * 2)
    }

    fn on_progress(&self, update: u64) {
        self.events
            .lock()
            .push((Event::Progress(update), thread::current().id()));
    }

    fn on_complete(&self, outcome: Outcome<u64>) {
        let outcome = outcome.map_err(|e| e.to_string());
        self.events
            .lock()
            .push((Event::Complete(outcome), thread::current().id()));
    }
}

#[test]
fn test_three_tasks_on_two_workers() {
    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 2);

    let tasks: Vec<_> = [(100, 1), (50, 2), (10, 3)]
        .into_iter()
        .map(|(sleep, input)| rt.spawn(Scripted::new(sleep, vec![]), input).unwrap())
        .collect();

    assert!(event_loop.run_until(|| tasks.iter().all(|t| t.task().completed()), WAIT));

    let owner = thread::current().id();
    for (task, input) in tasks.iter().zip([1u64, 2, 3]) {
        let events = task.task().events.lock().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, Event::Complete(Ok(input * 2)));
        assert_eq!(events[0].1, owner);
        assert!(!task.task().overlapped.load(Ordering::SeqCst));
        assert_eq!(task.state(), TaskState::Done);
    }
}

#[test]
fn test_progress_then_complete_order() {
    struct Counting {
        events: Mutex<Vec<String>>,
    }

    impl Task for Counting {
        type Params = ();
        type Update = u32;
        type Output = u32;

        fn run_background(&self, _: (), progress: &Progress<u32>) -> std::result::Result<u32, BoxError> {
            progress.report(1);
            progress.report(2);
            Ok(3)
        }

        fn on_progress(&self, update: u32) {
            self.events.lock().push(format!("progress({})", update));
        }

        fn on_complete(&self, outcome: Outcome<u32>) {
            self.events.lock().push(format!("complete({})", outcome.unwrap()));
        }
    }

    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 2);

    let tasks: Vec<_> = (0..5)
        .map(|_| {
            rt.spawn(
                Counting {
                    events: Mutex::new(Vec::new()),
                },
                (),
            )
            .unwrap()
        })
        .collect();

    assert!(event_loop.run_until(
        || tasks.iter().all(|t| t.task().events.lock().len() == 3),
        WAIT
    ));

    for task in &tasks {
        assert_eq!(
            *task.task().events.lock(),
            vec!["progress(1)", "progress(2)", "complete(3)"]
        );
    }
}

#[test]
fn test_failure_is_delivered_once() {
    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 1);

    let failing = rt.spawn(Scripted::failing(), 1).unwrap();
    let panicking = rt.spawn(Scripted::panicking(), 1).unwrap();

    assert!(event_loop.run_until(
        || failing.task().completed() && panicking.task().completed(),
        WAIT
    ));

    let events = failing.task().events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Complete(Err(msg)) => assert!(msg.contains("scripted failure")),
        other => panic!("unexpected event {:?}", other),
    }

    let events = panicking.task().events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        Event::Complete(Err(msg)) => assert!(msg.contains("scripted panic")),
        other => panic!("unexpected event {:?}", other),
    }

    // the single worker is still alive
    let after = rt.spawn(Scripted::new(0, vec![]), 21).unwrap();
    assert!(event_loop.run_until(|| after.task().completed(), WAIT));
    assert_eq!(after.task().events(), vec![Event::Complete(Ok(42))]);

    // task panics go through the pool's panic handler like raw jobs do
    assert_eq!(rt.stats().panicked, 1);
}

#[test]
fn test_done_implies_result_queued() {
    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 2);

    for _ in 0..50 {
        let task = rt.spawn(Scripted::new(0, vec![]), 1).unwrap();

        // never pump while waiting: Done must already mean "posted"
        let deadline = std::time::Instant::now() + WAIT;
        while task.state() != TaskState::Done {
            assert!(std::time::Instant::now() < deadline, "task never reached Done");
            thread::yield_now();
        }
        assert!(rt.channel().pending() >= 1);
        assert!(event_loop.pending() >= 1);
        assert!(!task.task().completed());

        assert!(event_loop.run_until(|| task.task().completed(), WAIT));
        assert_eq!(rt.channel().pending(), 0);
    }
}

#[test]
fn test_before_start_runs_first_on_submitter() {
    struct Ordered {
        step: AtomicUsize,
        before_start: Mutex<Option<(usize, ThreadId)>>,
        background: Mutex<Option<(usize, ThreadId)>>,
        done: AtomicBool,
    }

    impl Task for Ordered {
        type Params = ();
        type Update = ();
        type Output = ();

        fn before_start(&self) {
            let step = self.step.fetch_add(1, Ordering::SeqCst);
            // linger so a racing worker would show up first
            thread::sleep(Duration::from_millis(20));
            *self.before_start.lock() = Some((step, thread::current().id()));
        }

        fn run_background(&self, _: (), _: &Progress<()>) -> std::result::Result<(), BoxError> {
            let step = self.step.fetch_add(1, Ordering::SeqCst);
            *self.background.lock() = Some((step, thread::current().id()));
            Ok(())
        }

        fn on_complete(&self, _: Outcome<()>) {
            self.done.store(true, Ordering::SeqCst);
        }
    }

    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 2);
    let task = rt
        .spawn(
            Ordered {
                step: AtomicUsize::new(0),
                before_start: Mutex::new(None),
                background: Mutex::new(None),
                done: AtomicBool::new(false),
            },
            (),
        )
        .unwrap();

    let ordered = task.task().clone();
    assert!(event_loop.run_until(|| ordered.done.load(Ordering::SeqCst), WAIT));

    let (before_step, before_thread) = ordered.before_start.lock().take().unwrap();
    let (bg_step, bg_thread) = ordered.background.lock().take().unwrap();
    assert_eq!(before_step, 0);
    assert_eq!(bg_step, 1);
    assert_eq!(before_thread, thread::current().id());
    assert_ne!(bg_thread, thread::current().id());
}

#[test]
fn test_at_most_worker_count_concurrent() {
    struct Gauge {
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    impl Task for Gauge {
        type Params = ();
        type Update = ();
        type Output = ();

        fn run_background(&self, _: (), _: &Progress<()>) -> std::result::Result<(), BoxError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(15));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn on_complete(&self, _: Outcome<()>) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 3);
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    for _ in 0..12 {
        rt.spawn(
            Gauge {
                running: running.clone(),
                peak: peak.clone(),
                finished: finished.clone(),
            },
            (),
        )
        .unwrap();
    }

    assert!(event_loop.run_until(|| finished.load(Ordering::SeqCst) == 12, WAIT));
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[test]
fn test_global_fifo_across_tasks() {
    struct Stamped {
        clock: Arc<Mutex<u64>>,
        delivered: Arc<Mutex<Vec<(usize, Option<u64>)>>>,
        index: usize,
    }

    impl Task for Stamped {
        type Params = ();
        type Update = u64;
        type Output = ();

        fn run_background(&self, _: (), progress: &Progress<u64>) -> std::result::Result<(), BoxError> {
            for _ in 0..20 {
                // stamp and post under one lock so the posting order is known
                let mut clock = self.clock.lock();
                progress.report(*clock);
                *clock += 1;
            }
            Ok(())
        }

        fn on_progress(&self, stamp: u64) {
            self.delivered.lock().push((self.index, Some(stamp)));
        }

        fn on_complete(&self, _: Outcome<()>) {
            self.delivered.lock().push((self.index, None));
        }
    }

    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 4);
    let clock = Arc::new(Mutex::new(0u64));
    let delivered = Arc::new(Mutex::new(Vec::new()));

    for index in 0..8 {
        rt.spawn(
            Stamped {
                clock: clock.clone(),
                delivered: delivered.clone(),
                index,
            },
            (),
        )
        .unwrap();
    }

    assert!(event_loop.run_until(|| delivered.lock().len() == 8 * 21, WAIT));

    let delivered = delivered.lock();
    let stamps: Vec<u64> = delivered.iter().filter_map(|(_, s)| *s).collect();
    assert_eq!(stamps, (0..160).collect::<Vec<u64>>());

    // every task's result comes after all of its own progress
    for index in 0..8 {
        let own: Vec<_> = delivered.iter().filter(|(i, _)| *i == index).collect();
        assert_eq!(own.len(), 21);
        assert!(own[..20].iter().all(|(_, s)| s.is_some()));
        assert!(own[20].1.is_none());
    }
}

#[test]
fn test_custom_owner_context() {
    let queue: Arc<Mutex<VecDeque<Callback>>> = Arc::new(Mutex::new(VecDeque::new()));
    let sink = queue.clone();
    let context = move |cb: Callback| sink.lock().push_back(cb);

    let config = Config::builder().num_threads(2).build().unwrap();
    let rt = Runtime::new(&config, context).unwrap();
    let task = rt.spawn(Scripted::new(0, vec![7]), 4).unwrap();

    let deadline = std::time::Instant::now() + WAIT;
    while !task.task().completed() && std::time::Instant::now() < deadline {
        let next = queue.lock().pop_front();
        match next {
            Some(cb) => cb(),
            None => thread::sleep(Duration::from_millis(1)),
        }
    }

    assert_eq!(
        task.task().events(),
        vec![Event::Progress(7), Event::Complete(Ok(8))]
    );
}

#[test]
fn test_resubmit_is_rejected() {
    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 1);
    let task = AsyncTask::new(Scripted::new(0, vec![]));

    task.submit(&rt, 1).unwrap();
    assert!(matches!(
        task.submit(&rt, 2),
        Err(Error::AlreadySubmitted { .. })
    ));

    assert!(event_loop.run_until(|| task.task().completed(), WAIT));
    assert_eq!(task.task().events(), vec![Event::Complete(Ok(2))]);
    assert_eq!(rt.stats().submitted, 1);
}

#[test]
fn test_undrained_notifications_stay_queued() {
    let event_loop = EventLoop::new();
    let rt = runtime(&event_loop, 1);
    let task = rt.spawn(Scripted::new(0, vec![1, 2, 3]), 5).unwrap();

    // wait for the worker without pumping the owner loop
    rt.shutdown();
    assert_eq!(task.state(), TaskState::Done);
    assert_eq!(rt.channel().pending(), 4);
    assert!(task.task().events().is_empty());

    event_loop.run_pending();
    assert_eq!(rt.channel().pending(), 0);
    assert_eq!(task.task().events().len(), 4);
}
