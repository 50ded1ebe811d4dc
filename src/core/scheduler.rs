//! Deferred and repeating tasks.
//!
//! Tasks are polled once per tick with the app's elapsed time. The scheduler
//! is a cheap-to-clone handle so a worker thread can hand results back by
//! submitting a task; that submission queue is the only state shared across
//! threads.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bevy::prelude::*;

/// Work run by the scheduler with full world access.
pub type TaskAction = Box<dyn FnMut(&mut World) + Send>;

struct ScheduledTask {
    id: u64,
    /// Milliseconds on the scheduler clock.
    due_at: u64,
    interval: Option<u64>,
    action: TaskAction,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct SchedulerState {
    now: u64,
    next_id: u64,
    pending: Vec<ScheduledTask>,
    /// Cancel flags of the batch currently firing.
    in_flight: Vec<Arc<AtomicBool>>,
}

/// Scheduler for delayed and repeating work.
///
/// # Examples
///
/// ```ignore
/// let handle = scheduler
///     .new_task(|world| world.resource_mut::<Host>().destroy_vehicles())
///     .delay(Duration::from_millis(200))
///     .go();
/// ```
#[derive(Resource, Clone, Default)]
pub struct TaskScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start building a task around `action`. Nothing is queued until
    /// [`TaskBuilder::go`] is called.
    pub fn new_task(&self, action: impl FnMut(&mut World) + Send + 'static) -> TaskBuilder<'_> {
        TaskBuilder {
            scheduler: self,
            action: Box::new(action),
            delay: Duration::ZERO,
            interval: None,
        }
    }

    fn submit(&self, action: TaskAction, delay: Duration, interval: Option<Duration>) -> TaskHandle {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;

        let cancelled = Arc::new(AtomicBool::new(false));
        let due_at = state.now.saturating_add(as_millis(delay));
        state.pending.push(ScheduledTask {
            id,
            due_at,
            interval: interval.map(|i| as_millis(i).max(1)),
            action,
            cancelled: Arc::clone(&cancelled),
        });

        TaskHandle { id, cancelled }
    }

    /// Cancel every outstanding task, including any in the batch currently
    /// firing, and drop the pending set.
    pub fn cancel_all(&self) {
        let mut state = self.lock();
        for task in state.pending.drain(..) {
            task.cancelled.store(true, Ordering::SeqCst);
        }
        for flag in &state.in_flight {
            flag.store(true, Ordering::SeqCst);
        }
        debug!("Cancelled all scheduled tasks");
    }

    /// Number of queued tasks, not counting cancelled ones.
    pub fn pending_count(&self) -> usize {
        self.lock()
            .pending
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Scheduler clock as of the last poll or advance.
    pub fn now(&self) -> Duration {
        Duration::from_millis(self.lock().now)
    }

    /// Move the clock forward to `now` without running anything.
    ///
    /// Delays of tasks submitted afterwards count from `now`. The clock never
    /// moves backwards.
    pub fn advance(&self, now: Duration) {
        let mut state = self.lock();
        state.now = as_millis(now).max(state.now);
    }

    /// Advance the clock to `now` and run every due task.
    ///
    /// Returns how many actions ran. The lock is not held while actions run,
    /// so actions may submit or cancel tasks.
    pub fn poll(&self, now: Duration, world: &mut World) -> usize {
        let mut due = {
            let mut state = self.lock();
            let now = as_millis(now).max(state.now);
            state.now = now;

            let (due, rest): (Vec<_>, Vec<_>) = state
                .pending
                .drain(..)
                .filter(|t| !t.cancelled.load(Ordering::SeqCst))
                .partition(|t| t.due_at <= now);
            state.pending = rest;
            state.in_flight = due.iter().map(|t| Arc::clone(&t.cancelled)).collect();
            due
        };

        if due.is_empty() {
            return 0;
        }

        due.sort_by_key(|t| (t.due_at, t.id));

        let now = self.lock().now;
        let mut ran = 0;
        let mut rearmed = Vec::new();

        for mut task in due {
            if task.cancelled.load(Ordering::SeqCst) {
                continue;
            }

            let result = panic::catch_unwind(AssertUnwindSafe(|| (task.action)(world)));
            ran += 1;

            if let Err(payload) = result {
                error!("Scheduled task {} panicked: {}", task.id, panic_message(&*payload));
            }

            match task.interval {
                Some(interval) if !task.cancelled.load(Ordering::SeqCst) => {
                    task.due_at = now + interval;
                    rearmed.push(task);
                }
                Some(_) => {}
                // A fired one-shot ignores later cancels.
                None => task.cancelled.store(true, Ordering::SeqCst),
            }
        }

        let mut state = self.lock();
        state.in_flight.clear();
        state.pending.extend(rearmed);
        ran
    }
}

fn as_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder returned by [`TaskScheduler::new_task`].
pub struct TaskBuilder<'a> {
    scheduler: &'a TaskScheduler,
    action: TaskAction,
    delay: Duration,
    interval: Option<Duration>,
}

impl TaskBuilder<'_> {
    /// Wait this long before the first run.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Repeat every `interval` after the first run.
    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Queue the task.
    pub fn go(self) -> TaskHandle {
        self.scheduler.submit(self.action, self.delay, self.interval)
    }
}

/// Opaque handle to a queued task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the task from running again. Safe from any thread; repeated
    /// calls are no-ops.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Bring the scheduler clock up to this frame before anything submits tasks.
pub fn sync_scheduler_clock(scheduler: Option<Res<TaskScheduler>>, time: Option<Res<Time>>) {
    if let (Some(scheduler), Some(time)) = (scheduler, time) {
        scheduler.advance(time.elapsed());
    }
}

/// Poll the scheduler with the app's elapsed time.
pub fn tick_scheduler(world: &mut World) {
    let Some(scheduler) = world.get_resource::<TaskScheduler>().cloned() else {
        return;
    };
    let now = world
        .get_resource::<Time>()
        .map(|t| t.elapsed())
        .unwrap_or_default();

    scheduler.poll(now, world);
}
