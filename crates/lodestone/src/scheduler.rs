//! Cooperative frame scheduler.
//!
//! The [`Scheduler`] is a single-threaded queue of timed callbacks. The host
//! drives it once per animation frame with [`Scheduler::step`], or from a
//! plain sleep loop with [`Scheduler::run`] when no frame source exists.
//! Each step performs two passes:
//!
//! 1. **Mark**: every entry whose deadline has passed is invoked with the
//!    elapsed milliseconds since that deadline. Entries that return
//!    [`TimerStatus::Done`] are marked for removal.
//! 2. **Sweep**: marked entries are removed and the earliest pending deadline
//!    decides how the host should wake up next (see [`Wake`]).
//!
//! Callbacks run to completion one after another; there is no preemption. A
//! callback that wants to run again next frame simply returns
//! [`TimerStatus::Continue`].
//!
//! # Example
//!
//! ```
//! # use std::{cell::Cell, rc::Rc};
//! # use lodestone::scheduler::{ManualClock, Scheduler, TimerStatus};
//! let clock = Rc::new(ManualClock::new());
//! let scheduler = Scheduler::with_clock(clock.clone());
//!
//! let calls = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&calls);
//! scheduler.register(
//!     move |_elapsed| {
//!         counter.set(counter.get() + 1);
//!         if counter.get() == 3 { TimerStatus::Done } else { TimerStatus::Continue }
//!     },
//!     0.0,
//! );
//!
//! while !scheduler.is_empty() {
//!     scheduler.flush();
//!     clock.advance(16.0);
//! }
//! assert_eq!(calls.get(), 3);
//! ```

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use log::{debug, trace, warn};

/// Deadlines closer than this are served by the next animation frame rather
/// than a dedicated timeout.
const FRAME_THRESHOLD_MS: f64 = 24.0;

/// Source of the current time in milliseconds.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin. Must never decrease.
    fn now(&self) -> f64;
}

/// Monotonic wall clock measured from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A clock that only moves when told to. Used for deterministic tests and
/// offline layout.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `ms` milliseconds
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    /// Sets the clock to an absolute time; earlier values are ignored
    pub fn set(&self, ms: f64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

/// Value returned by a timer callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    /// Invoke the callback again on the next frame.
    Continue,
    /// Remove the callback from the queue.
    Done,
}

/// Handle to a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// How the host should schedule the next call to [`Scheduler::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// Step again on the next animation frame.
    Frame,
    /// Nothing is due soon; step again after this delay.
    After(Duration),
    /// The queue is empty.
    Idle,
}

type Callback = Box<dyn FnMut(f64) -> TimerStatus>;

struct TimerEntry {
    id: TimerId,
    deadline: f64,
    /// Taken out while the callback runs so the queue stays borrowable.
    callback: Option<Callback>,
    done: bool,
}

#[derive(Default)]
struct Queue {
    entries: Vec<TimerEntry>,
    next_id: u64,
    /// Set during a mark pass to reject re-entrant steps.
    marking: bool,
}

impl Queue {
    fn position(&self, id: TimerId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }
}

/// Ends a mark pass on drop, including when a callback unwinds.
struct MarkPass<'a> {
    queue: &'a RefCell<Queue>,
}

impl Drop for MarkPass<'_> {
    fn drop(&mut self) {
        let Ok(mut queue) = self.queue.try_borrow_mut() else {
            return;
        };
        queue.marking = false;
        // A callback that was taken out and never put back panicked mid-call
        for entry in queue.entries.iter_mut() {
            if entry.callback.is_none() {
                entry.done = true;
            }
        }
    }
}

/// Shared handle to a cooperative callback queue.
///
/// Cloning a `Scheduler` yields another handle to the same queue. The type
/// is deliberately `!Send`: the queue assumes a single thread.
#[derive(Clone)]
pub struct Scheduler {
    queue: Rc<RefCell<Queue>>,
    clock: Rc<dyn Clock>,
}

impl Scheduler {
    /// Creates a scheduler driven by the system clock
    pub fn new() -> Self {
        Self::with_clock(Rc::new(SystemClock::new()))
    }

    /// Creates a scheduler driven by the given clock
    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            queue: Rc::new(RefCell::new(Queue::default())),
            clock,
        }
    }

    /// Current time according to the scheduler's clock, in milliseconds
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Enqueues `callback` to run no earlier than `delay_ms` from now.
    ///
    /// The callback receives the milliseconds elapsed since its deadline and
    /// keeps running every frame until it returns [`TimerStatus::Done`].
    /// Registering from inside another callback is allowed; the new entry is
    /// visited in the same pass if it is already due.
    pub fn register<F>(&self, callback: F, delay_ms: f64) -> TimerId
    where
        F: FnMut(f64) -> TimerStatus + 'static,
    {
        let deadline = self.now() + delay_ms.max(0.0);
        let mut queue = self.queue.borrow_mut();
        let id = TimerId(queue.next_id);
        queue.next_id += 1;
        queue.entries.push(TimerEntry {
            id,
            deadline,
            callback: Some(Box::new(callback)),
            done: false,
        });
        trace!(timer_id = id.0, deadline; "Timer registered");
        id
    }

    /// Marks an entry for removal. It will not be invoked again.
    ///
    /// Returns false if the entry was not queued.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut queue = self.queue.borrow_mut();
        let Some(index) = queue.position(id) else {
            return false;
        };
        let entry = &mut queue.entries[index];
        let was_active = !entry.done;
        entry.done = true;
        entry.callback = None;
        was_active
    }

    /// Returns true if the entry is queued and not yet finished
    pub fn is_active(&self, id: TimerId) -> bool {
        let queue = self.queue.borrow();
        queue
            .position(id)
            .is_some_and(|index| !queue.entries[index].done)
    }

    /// Number of queued entries, including ones awaiting the next sweep
    pub fn len(&self) -> usize {
        self.queue.borrow().entries.len()
    }

    /// Returns true if no entries are queued
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().entries.is_empty()
    }

    /// Runs one frame: a mark pass followed by a sweep pass.
    ///
    /// Returns how the host should schedule the next frame. Calling `step`
    /// from inside a callback does nothing and returns [`Wake::Frame`].
    pub fn step(&self) -> Wake {
        let Some(now) = self.mark() else {
            return Wake::Frame;
        };
        match self.sweep() {
            None => Wake::Idle,
            Some(deadline) => {
                let delay = deadline - now;
                if delay > FRAME_THRESHOLD_MS {
                    Wake::After(Duration::from_secs_f64(delay / 1000.0))
                } else {
                    Wake::Frame
                }
            }
        }
    }

    /// Synchronously invokes every due callback once, without waiting for a
    /// frame, then sweeps finished entries.
    pub fn flush(&self) {
        if self.mark().is_some() {
            self.sweep();
        }
    }

    /// Drives the queue from the current thread until it is empty.
    ///
    /// This is the timeout fallback for hosts without an animation frame
    /// source: due work is stepped every `frame_interval`, and longer gaps
    /// are slept through.
    pub fn run(&self, frame_interval: Duration) {
        loop {
            match self.step() {
                Wake::Idle => break,
                Wake::Frame => thread::sleep(frame_interval),
                Wake::After(delay) => thread::sleep(delay),
            }
        }
        debug!("Scheduler queue drained");
    }

    /// Invokes due callbacks. Returns the time used for the pass, or `None`
    /// when a pass is already running.
    fn mark(&self) -> Option<f64> {
        {
            let mut queue = self.queue.borrow_mut();
            if queue.marking {
                warn!("Ignoring re-entrant scheduler step");
                return None;
            }
            queue.marking = true;
        }
        let _pass = MarkPass { queue: &self.queue };

        let now = self.now();
        let mut index = 0;
        loop {
            // Borrow only long enough to take the callback out, so the
            // callback itself can register or cancel entries.
            let (id, elapsed, mut callback) = {
                let mut queue = self.queue.borrow_mut();
                let Some(entry) = queue.entries.get_mut(index) else {
                    break;
                };
                index += 1;
                if entry.done || now < entry.deadline {
                    continue;
                }
                let Some(callback) = entry.callback.take() else {
                    continue;
                };
                (entry.id, now - entry.deadline, callback)
            };

            let status = callback(elapsed);

            let mut queue = self.queue.borrow_mut();
            if let Some(position) = queue.position(id) {
                let entry = &mut queue.entries[position];
                if status == TimerStatus::Done {
                    entry.done = true;
                } else if !entry.done {
                    entry.callback = Some(callback);
                }
            }
        }

        Some(now)
    }

    /// Removes finished entries and returns the earliest pending deadline.
    fn sweep(&self) -> Option<f64> {
        let mut queue = self.queue.borrow_mut();
        queue.entries.retain(|entry| !entry.done);
        queue
            .entries
            .iter()
            .map(|entry| entry.deadline)
            .min_by(f64::total_cmp)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("entries", &self.len())
            .field("now", &self.now())
            .finish()
    }
}
