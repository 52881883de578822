//! One-time initialization guard.
//!
//! A server may be told to run a setup action (describing metrics, warming a
//! cache) right before it first binds. [`OnceInit`] makes that action run at
//! most once no matter how many times, or from how many tasks, `start` is
//! called. Callers that arrive while the action is running block until it
//! finishes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// The boxed action held by [`OnceInit`].
pub type InitAction = Box<dyn FnOnce() + Send>;

/// Runs a registered action at most once.
///
/// # Example
///
/// ```
/// use baseapp_server::OnceInit;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&calls);
/// let init = OnceInit::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// assert!(init.run());
/// assert!(!init.run());
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct OnceInit {
    action: Mutex<Option<InitAction>>,
    done: AtomicBool,
}

impl OnceInit {
    /// Creates a guard around `action`.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self::from_action(Some(Box::new(action)))
    }

    /// Creates a guard with nothing to run.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_action(None)
    }

    pub(crate) fn from_action(action: Option<InitAction>) -> Self {
        Self {
            action: Mutex::new(action),
            done: AtomicBool::new(false),
        }
    }

    /// Runs the action if it has not run yet.
    ///
    /// Returns `true` only for the call that executed it. The lock is held
    /// while the action runs, so concurrent callers return after it is done.
    pub fn run(&self) -> bool {
        if self.done.load(Ordering::Acquire) {
            return false;
        }

        let mut slot = self.action.lock();
        let Some(action) = slot.take() else {
            self.done.store(true, Ordering::Release);
            return false;
        };

        action();
        self.done.store(true, Ordering::Release);
        true
    }

    /// Returns `true` once the guard has been triggered.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Returns `true` if an action is still waiting to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.action.lock().is_some()
    }
}

impl Default for OnceInit {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for OnceInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceInit")
            .field("pending", &self.is_pending())
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_empty_guard() {
        let init = OnceInit::empty();
        assert!(!init.is_pending());
        assert!(!init.run());
        assert!(init.is_done());
    }

    #[test]
    fn test_runs_once_sequentially() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let init = OnceInit::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(init.is_pending());
        for _ in 0..5 {
            init.run();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!init.is_pending());
    }

    #[test]
    fn test_concurrent_callers_wait_for_completion() {
        const CALLERS: usize = 16;

        let calls = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicBool::new(false));

        let counter = Arc::clone(&calls);
        let flag = Arc::clone(&finished);
        let init = Arc::new(OnceInit::new(move || {
            thread::sleep(Duration::from_millis(50));
            counter.fetch_add(1, Ordering::SeqCst);
            flag.store(true, Ordering::SeqCst);
        }));

        let barrier = Arc::new(Barrier::new(CALLERS));
        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let init = Arc::clone(&init);
                let barrier = Arc::clone(&barrier);
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    barrier.wait();
                    let ran = init.run();
                    // Every caller, winner or not, observes the finished action.
                    assert!(finished.load(Ordering::SeqCst));
                    ran
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ran| *ran)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_debug() {
        let init = OnceInit::new(|| {});
        assert_eq!(format!("{init:?}"), "OnceInit { pending: true, done: false }");
    }
}
