//! Owner-tracked recursive mutex
//!
//! The window lock has to be re-entered freely by the thread that owns it
//! (native callbacks arriving while an operation is in flight, nested
//! destroys, surface locks nested under window operations) while other
//! threads block. Ownership and depth are observable so callers can decide
//! whether to run a task inline or marshal it to the serialization thread.

use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{WindowError, WindowResult};

/// Snapshot of a lock's owner and recursion depth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockState {
    /// Thread currently holding the lock
    pub owner: Option<ThreadId>,
    /// Number of unmatched `lock()` calls by the owner
    pub depth: usize,
}

/// Reentrant mutex with explicit owner tracking
#[derive(Debug, Default)]
pub struct RecursiveLock {
    state: Mutex<LockState>,
    available: Condvar,
}

impl RecursiveLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, blocking while another thread owns it
    pub fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    return;
                }
                Some(_) => self.available.wait(&mut state),
            }
        }
    }

    /// Acquire the lock, giving up after `timeout`
    ///
    /// Returns `true` if the lock is now held by the current thread.
    pub fn try_lock_for(&self, timeout: Duration) -> bool {
        let me = thread::current().id();
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return true;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    return true;
                }
                Some(_) => {
                    if self.available.wait_until(&mut state, deadline).timed_out()
                        && state.owner.is_some_and(|owner| owner != me)
                    {
                        return false;
                    }
                }
            }
        }
    }

    /// Release one level of the lock
    ///
    /// Fails if the current thread is not the owner.
    pub fn unlock(&self) -> WindowResult<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            return Err(WindowError::Lock(format!(
                "unlock by {:?}, but lock is owned by {:?}",
                me, state.owner
            )));
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.available.notify_one();
        }
        Ok(())
    }

    /// Acquire the lock and release it when the guard is dropped
    pub fn guard(&self) -> RecursiveLockGuard<'_> {
        self.lock();
        RecursiveLockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// True if the calling thread owns the lock
    pub fn is_owned_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// True if any thread owns the lock
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// True if a thread other than the caller owns the lock
    pub fn is_locked_by_other_thread(&self) -> bool {
        let me = thread::current().id();
        self.state.lock().owner.is_some_and(|owner| owner != me)
    }

    /// Current owner, if any
    pub fn owner(&self) -> Option<ThreadId> {
        self.state.lock().owner
    }

    /// Recursion depth of the current owner, zero when unlocked
    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }

    /// Owner and depth in one consistent read
    pub fn snapshot(&self) -> LockState {
        *self.state.lock()
    }

    /// Error unless the current thread owns the lock
    pub fn validate_locked(&self) -> WindowResult<()> {
        if self.is_owned_by_current_thread() {
            Ok(())
        } else {
            Err(WindowError::Lock(format!(
                "not locked by current thread {:?}, owner {:?}",
                thread::current().id(),
                self.owner()
            )))
        }
    }
}

/// Scoped ownership of one [`RecursiveLock`] level
///
/// Must be dropped on the thread that created it.
pub struct RecursiveLockGuard<'a> {
    lock: &'a RecursiveLock,
    _not_send: PhantomData<*const ()>,
}

impl Drop for RecursiveLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            log::error!("RecursiveLockGuard released on the wrong thread: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;

    #[test]
    fn test_reentrant_depth_tracking() {
        let lock = RecursiveLock::new();
        assert!(!lock.is_locked());

        lock.lock();
        lock.lock();
        assert_eq!(lock.depth(), 2);
        assert!(lock.is_owned_by_current_thread());

        lock.unlock().unwrap();
        assert_eq!(lock.depth(), 1);
        lock.unlock().unwrap();
        assert!(!lock.is_locked());
        assert_eq!(lock.owner(), None);
    }

    #[test]
    fn test_unlock_without_ownership_fails() {
        let lock = RecursiveLock::new();
        assert!(matches!(lock.unlock(), Err(WindowError::Lock(_))));
        assert!(lock.validate_locked().is_err());
    }

    #[test]
    fn test_other_thread_blocks_until_release() {
        let lock = Arc::new(RecursiveLock::new());
        lock.lock();

        let (tx, rx) = mpsc::channel();
        let contender = {
            let lock = Arc::clone(&lock);
            std::thread::spawn(move || {
                assert!(lock.is_locked_by_other_thread());
                assert!(!lock.try_lock_for(Duration::from_millis(20)));
                lock.lock();
                tx.send(lock.depth()).unwrap();
                lock.unlock().unwrap();
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
        lock.unlock().unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 1);
        contender.join().unwrap();
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = RecursiveLock::new();
        {
            let _outer = lock.guard();
            let _inner = lock.guard();
            assert_eq!(lock.depth(), 2);
        }
        assert!(!lock.is_locked());
    }
}
