//! Surface lock layered on the window lock
//!
//! A surface lock is a window lock acquisition plus a separate recursion
//! counter. The outermost surface acquisition on a realized window also takes
//! the graphics device lock and the driver's surface lock; both are released
//! by the matching outermost unlock only.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::recursive_lock::RecursiveLock;
use crate::error::WindowResult;

/// Result of a surface lock attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceLockStatus {
    /// The surface is not realized; nothing is held
    NotReady,
    /// Locked, and the native surface changed since the last lock
    Changed,
    /// Locked, surface unchanged
    Success,
}

impl SurfaceLockStatus {
    /// True for the locked outcomes
    pub const fn is_ready(self) -> bool {
        !matches!(self, Self::NotReady)
    }
}

/// Window lock plus surface recursion counter
#[derive(Debug, Default)]
pub struct SurfaceLock {
    window: RecursiveLock,
    surface_depth: AtomicUsize,
    device_held: AtomicBool,
}

impl SurfaceLock {
    /// Create an unlocked surface lock
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying window lock
    pub fn window_lock(&self) -> &RecursiveLock {
        &self.window
    }

    /// Acquire the surface
    ///
    /// Nested acquisitions only bump the counter. The outermost acquisition
    /// fails with [`SurfaceLockStatus::NotReady`] unless `native_valid`; on a
    /// realized window it locks `device` and then runs `lock_native`. Any
    /// not-ready outcome leaves both locks as they were before the call.
    pub fn lock_surface<F>(
        &self,
        native_valid: bool,
        device: &RecursiveLock,
        lock_native: F,
    ) -> SurfaceLockStatus
    where
        F: FnOnce() -> SurfaceLockStatus,
    {
        self.window.lock();
        let depth = self.surface_depth.fetch_add(1, Ordering::SeqCst) + 1;
        if depth > 1 {
            return SurfaceLockStatus::Success;
        }

        let mut status = SurfaceLockStatus::NotReady;
        if native_valid {
            device.lock();
            status = lock_native();
            if status.is_ready() {
                self.device_held.store(true, Ordering::SeqCst);
            } else if let Err(e) = device.unlock() {
                log::error!("device unlock after failed surface lock: {}", e);
            }
        }
        if !status.is_ready() {
            self.surface_depth.fetch_sub(1, Ordering::SeqCst);
            if let Err(e) = self.window.unlock() {
                log::error!("window unlock after failed surface lock: {}", e);
            }
        }
        status
    }

    /// Release one surface level
    ///
    /// The outermost release runs `unlock_native` and releases `device`.
    pub fn unlock_surface<F>(&self, device: &RecursiveLock, unlock_native: F) -> WindowResult<()>
    where
        F: FnOnce(),
    {
        self.window.validate_locked()?;

        if self.surface_depth.load(Ordering::SeqCst) == 1
            && self.device_held.swap(false, Ordering::SeqCst)
        {
            unlock_native();
            device.unlock()?;
        }
        self.surface_depth.fetch_sub(1, Ordering::SeqCst);
        self.window.unlock()
    }

    /// Current surface recursion depth
    pub fn surface_depth(&self) -> usize {
        self.surface_depth.load(Ordering::SeqCst)
    }

    /// True while the outermost surface level holds the device lock
    pub fn holds_device_lock(&self) -> bool {
        self.device_held.load(Ordering::SeqCst)
    }

    /// True if another thread holds the window (and thus possibly the surface)
    pub fn is_locked_by_other_thread(&self) -> bool {
        self.window.is_locked_by_other_thread()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrealized_surface_is_not_ready() {
        let surface = SurfaceLock::new();
        let device = RecursiveLock::new();

        let status = surface.lock_surface(false, &device, || SurfaceLockStatus::Success);
        assert_eq!(status, SurfaceLockStatus::NotReady);
        assert_eq!(surface.surface_depth(), 0);
        assert!(!surface.window_lock().is_locked());
        assert!(!device.is_locked());
    }

    #[test]
    fn test_device_lock_only_on_outermost_level() {
        let surface = SurfaceLock::new();
        let device = RecursiveLock::new();
        let mut native_locks = 0;

        let first = surface.lock_surface(true, &device, || {
            native_locks += 1;
            SurfaceLockStatus::Changed
        });
        assert_eq!(first, SurfaceLockStatus::Changed);
        assert!(surface.holds_device_lock());
        assert_eq!(device.depth(), 1);

        let second = surface.lock_surface(true, &device, || {
            native_locks += 1;
            SurfaceLockStatus::Changed
        });
        assert_eq!(second, SurfaceLockStatus::Success);
        assert_eq!(native_locks, 1);
        assert_eq!(device.depth(), 1);
        assert_eq!(surface.window_lock().depth(), 2);

        let mut native_unlocks = 0;
        surface.unlock_surface(&device, || native_unlocks += 1).unwrap();
        assert_eq!(native_unlocks, 0);
        assert!(device.is_locked());

        surface.unlock_surface(&device, || native_unlocks += 1).unwrap();
        assert_eq!(native_unlocks, 1);
        assert!(!device.is_locked());
        assert!(!surface.window_lock().is_locked());
    }

    #[test]
    fn test_native_lock_failure_releases_everything() {
        let surface = SurfaceLock::new();
        let device = RecursiveLock::new();

        let status = surface.lock_surface(true, &device, || SurfaceLockStatus::NotReady);
        assert!(!status.is_ready());
        assert!(!device.is_locked());
        assert!(!surface.window_lock().is_locked());
    }

    #[test]
    fn test_surface_nested_under_window_lock() {
        let surface = SurfaceLock::new();
        let device = RecursiveLock::new();

        surface.window_lock().lock();
        let status = surface.lock_surface(true, &device, || SurfaceLockStatus::Success);
        assert!(status.is_ready());
        assert_eq!(surface.surface_depth(), 1);
        surface.unlock_surface(&device, || {}).unwrap();
        assert!(surface.window_lock().is_owned_by_current_thread());
        surface.window_lock().unlock().unwrap();
    }

    #[test]
    fn test_unlock_without_lock_fails() {
        let surface = SurfaceLock::new();
        let device = RecursiveLock::new();
        assert!(surface.unlock_surface(&device, || {}).is_err());
    }
}
