//! Runtime helpers for dispatching concurrent work.
//!
//! Work runs on tokio when the caller is inside a runtime and on plain OS
//! threads otherwise, so pipelines can be driven from async services and
//! from ordinary synchronous code alike. Outside a runtime, delayed actions
//! share a single timer thread.

use crate::errors::FlowError;
use parking_lot::{const_mutex, Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::warn;

const WORKER_THREAD_NAME: &str = "chainflow-worker";
const TIMER_THREAD_NAME: &str = "chainflow-timer";

static TIMER: Mutex<Option<Arc<TimerQueue>>> = const_mutex(None);

/// Runs blocking `work` concurrently with the caller.
///
/// Uses tokio's blocking pool inside a runtime, a dedicated thread
/// otherwise.
pub fn dispatch_blocking<F>(work: F) -> Result<(), FlowError>
where
    F: FnOnce() + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        drop(handle.spawn_blocking(work));
        return Ok(());
    }

    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(work)
        .map(drop)
        .map_err(|e| FlowError::Dispatch(e.to_string()))
}

/// Runs `action` once `delay` has elapsed.
///
/// Inside a runtime this is a tokio task. Otherwise the action is queued on
/// the shared timer thread, started on first use. A delay too large to
/// represent never fires.
pub fn schedule_after<F>(delay: Duration, action: F) -> Result<(), FlowError>
where
    F: FnOnce() + Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        drop(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
        return Ok(());
    }

    let Some(deadline) = Instant::now().checked_add(delay) else {
        return Ok(());
    };
    shared_timer()?.push(deadline, Box::new(action));
    Ok(())
}

fn shared_timer() -> Result<Arc<TimerQueue>, FlowError> {
    let mut slot = TIMER.lock();
    if let Some(timer) = slot.as_ref() {
        return Ok(timer.clone());
    }

    let timer = Arc::new(TimerQueue::default());
    let worker = timer.clone();
    thread::Builder::new()
        .name(TIMER_THREAD_NAME.to_string())
        .spawn(move || worker.run())
        .map_err(|e| FlowError::Dispatch(e.to_string()))?;
    *slot = Some(timer.clone());
    Ok(timer)
}

struct TimerEntry {
    deadline: Instant,
    seq: u64,
    action: Box<dyn FnOnce() + Send>,
}

// Reversed so the max-heap yields the earliest deadline first.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

#[derive(Default)]
struct TimerState {
    entries: BinaryHeap<TimerEntry>,
    next_seq: u64,
}

#[derive(Default)]
struct TimerQueue {
    state: Mutex<TimerState>,
    wake: Condvar,
}

impl TimerQueue {
    fn push(&self, deadline: Instant, action: Box<dyn FnOnce() + Send>) {
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push(TimerEntry {
            deadline,
            seq,
            action,
        });
        self.wake.notify_one();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn run(&self) {
        loop {
            let due = {
                let mut state = self.state.lock();
                loop {
                    match state.entries.peek().map(|entry| entry.deadline) {
                        None => self.wake.wait(&mut state),
                        Some(deadline) if deadline <= Instant::now() => {
                            break state.entries.pop();
                        }
                        Some(deadline) => {
                            self.wake.wait_until(&mut state, deadline);
                        }
                    }
                }
            };

            // Actions run outside the lock so they may schedule more timers.
            if let Some(entry) = due {
                if catch_unwind(AssertUnwindSafe(entry.action)).is_err() {
                    warn!("Timer action panicked");
                }
            }
        }
    }
}
