use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::utils::lock;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation token for one scheduled callback.
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::SeqCst)
    }
}

/// Deferred callbacks. Implementations run tasks one at a time, in deadline order,
/// and skip any whose handle was cancelled before it fired.
pub trait Timer: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

struct Entry<T> {
    deadline: T,
    seq: u64,
    handle: TaskHandle,
    task: Task,
}

impl<T: Ord> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Ord> Eq for Entry<T> {}

impl<T: Ord> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for Entry<T> {
    // Reversed: BinaryHeap is a max-heap, the earliest deadline must come out first
    fn cmp(&self, other: &Self) -> Ordering {
        other.deadline.cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

enum TimerCmd {
    Schedule(Entry<Instant>),
    Shutdown,
}

/// Wall-clock timer backed by one worker thread, so callbacks never overlap.
pub struct ThreadTimer {
    tx: Sender<TimerCmd>,
    seq: Mutex<u64>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let worker = std::thread::Builder::new()
            .name("bitarcade-timer".to_string())
            .spawn(move || Self::run(rx))
            .map_err(|e| log::error!("Could not spawn timer thread: {}", e))
            .ok();

        ThreadTimer { tx, seq: Mutex::new(0), worker }
    }

    fn run(rx: Receiver<TimerCmd>) {
        let mut queue: BinaryHeap<Entry<Instant>> = BinaryHeap::new();

        loop {
            let now = Instant::now();
            while queue.peek().is_some_and(|e| e.deadline <= now) {
                if let Some(entry) = queue.pop() {
                    if !entry.handle.is_cancelled() {
                        (entry.task)();
                    }
                }
            }

            let cmd = match queue.peek() {
                Some(next) => rx.recv_timeout(next.deadline.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match cmd {
                Ok(TimerCmd::Schedule(entry)) => queue.push(entry),
                Ok(TimerCmd::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ThreadTimer {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle::new();
        let seq = {
            let mut seq = lock(&self.seq);
            *seq += 1;
            *seq
        };

        let entry = Entry { deadline: Instant::now() + delay, seq, handle: handle.clone(), task };
        if self.tx.send(TimerCmd::Schedule(entry)).is_err() {
            log::warn!("Timer thread is gone, task dropped");
        }
        handle
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        let _ = self.tx.send(TimerCmd::Shutdown);
        if let Some(worker) = self.worker.take() {
            // A task dropping the last engine handle ends up here on the worker itself
            if worker.thread().id() != std::thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

struct ManualQueue {
    now: Duration,
    seq: u64,
    queue: BinaryHeap<Entry<Duration>>,
}

/// Virtual-time timer: nothing fires until `advance` moves the clock. Used for
/// deterministic tests and offline rendering.
pub struct ManualTimer {
    inner: Mutex<ManualQueue>,
}

impl ManualTimer {
    pub fn new() -> Self {
        ManualTimer {
            inner: Mutex::new(ManualQueue { now: Duration::ZERO, seq: 0, queue: BinaryHeap::new() }),
        }
    }

    pub fn now(&self) -> Duration {
        lock(&self.inner).now
    }

    /// Live (not cancelled) tasks still waiting.
    pub fn pending(&self) -> usize {
        lock(&self.inner).queue.iter().filter(|e| !e.handle.is_cancelled()).count()
    }

    /// Moves virtual time forward, firing due tasks in order. Tasks scheduled by a
    /// firing task are picked up if they fall inside the window.
    pub fn advance(&self, by: Duration) {
        let target = lock(&self.inner).now + by;

        loop {
            let entry = {
                let mut inner = lock(&self.inner);
                match inner.queue.peek() {
                    Some(next) if next.deadline <= target => {
                        let entry = inner.queue.pop();
                        if let Some(e) = &entry {
                            inner.now = e.deadline;
                        }
                        entry
                    }
                    _ => {
                        inner.now = target;
                        None
                    }
                }
            };

            match entry {
                Some(entry) if !entry.handle.is_cancelled() => (entry.task)(),
                Some(_) => {}
                None => break,
            }
        }
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut inner = lock(&self.inner);
        inner.seq += 1;
        let entry = Entry { deadline: inner.now + delay, seq: inner.seq, handle: handle.clone(), task };
        inner.queue.push(entry);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn manual_fires_in_deadline_order() {
        let timer = ManualTimer::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (delay, name) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let log = Arc::clone(&log);
            timer.schedule(ms(delay), Box::new(move || log.lock().unwrap().push(name)));
        }

        timer.advance(ms(15));
        assert_eq!(*log.lock().unwrap(), vec!["a", "a2"]);
        timer.advance(ms(100));
        assert_eq!(*log.lock().unwrap(), vec!["a", "a2", "b", "c"]);
        assert_eq!(timer.now(), ms(115));
    }

    #[test]
    fn manual_skips_cancelled() {
        let timer = ManualTimer::new();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);

        let handle = timer.schedule(ms(10), Box::new(move || flag.store(true, AtomicOrdering::SeqCst)));
        assert_eq!(timer.pending(), 1);
        handle.cancel();
        assert_eq!(timer.pending(), 0);

        timer.advance(ms(50));
        assert!(!fired.load(AtomicOrdering::SeqCst));
    }

    #[test]
    fn manual_chains_within_one_advance() {
        let timer = Arc::new(ManualTimer::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let (t, l) = (Arc::clone(&timer), Arc::clone(&log));
        timer.schedule(ms(10), Box::new(move || {
            l.lock().unwrap().push(t.now());
            let l2 = Arc::clone(&l);
            let t2 = Arc::clone(&t);
            t.schedule(ms(10), Box::new(move || l2.lock().unwrap().push(t2.now())));
        }));

        timer.advance(ms(25));
        assert_eq!(*log.lock().unwrap(), vec![ms(10), ms(20)]);
    }

    #[test]
    fn thread_timer_fires_and_cancels() {
        let timer = ThreadTimer::new();
        let (tx, rx) = mpsc::channel();

        let tx2 = tx.clone();
        let cancelled = timer.schedule(ms(20), Box::new(move || tx2.send("cancelled").unwrap()));
        timer.schedule(ms(40), Box::new(move || tx.send("fired").unwrap()));
        cancelled.cancel();

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok("fired"));
        assert!(rx.recv_timeout(ms(100)).is_err());
    }
}
