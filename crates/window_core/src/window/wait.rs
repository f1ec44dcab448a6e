//! Convergence waits
//!
//! Window managers confirm requests asynchronously. These helpers pump the
//! display and poll until the window reports the requested state or the
//! timeout elapses.

use std::thread;
use std::time::Duration;

use super::Window;
use crate::error::{WindowError, WindowResult};
use crate::foundation::geometry::{Insets, Point, Size};
use crate::foundation::logging::TARGET_WINDOW;
use crate::foundation::time::Stopwatch;

/// Minimum accepted deviation of a window manager placed position
pub const MIN_POSITION_TOLERANCE: i32 = 64;

/// Accepted horizontal/vertical deviation when waiting for a position
///
/// Window managers may place the frame rather than the client area at the
/// requested position, so twice the decoration size is tolerated.
pub fn position_tolerance(insets: &Insets) -> (i32, i32) {
    (
        MIN_POSITION_TOLERANCE.max(insets.left.saturating_mul(2)),
        MIN_POSITION_TOLERANCE.max(insets.top.saturating_mul(2)),
    )
}

/// True if `actual` is within `tolerance` of `target` on both axes
pub fn within_tolerance(actual: Point, target: Point, tolerance: (i32, i32)) -> bool {
    (actual.x - target.x).abs() <= tolerance.0 && (actual.y - target.y).abs() <= tolerance.1
}

impl Window {
    fn poll_until<F>(&self, timeout: Duration, mut reached: F) -> Option<Duration>
    where
        F: FnMut(&Self) -> bool,
    {
        let poll = self.poll_interval();
        let watch = Stopwatch::start_new();
        self.pump();
        loop {
            if reached(self) {
                return Some(timeout.saturating_sub(watch.elapsed()));
            }
            if watch.elapsed() >= timeout {
                return None;
            }
            thread::sleep(poll);
            self.pump();
        }
    }

    /// Wait until the confirmed visibility equals `visible`
    ///
    /// Returns the milliseconds left of `timeout`, or `None` if the state
    /// was not reached and `fail_fast` is off.
    pub fn wait_for_visible(&self, visible: bool, fail_fast: bool, timeout: Duration) -> WindowResult<Option<u64>> {
        let left = self.poll_until(timeout, |w| w.is_visible() == visible);
        match left {
            Some(left) => Ok(Some(u64::try_from(left.as_millis()).unwrap_or(u64::MAX))),
            None if fail_fast => Err(WindowError::Timeout(format!(
                "window {} visibility {} not reached within {:?}",
                self.id(),
                visible,
                timeout
            ))),
            None => {
                log::warn!(
                    target: TARGET_WINDOW,
                    "window {} visibility {} not reached within {:?}: {:?}",
                    self.id(),
                    visible,
                    timeout,
                    self
                );
                Ok(None)
            }
        }
    }

    /// Wait until the client area size equals `width`x`height`
    pub fn wait_for_size(&self, width: i32, height: i32, fail_fast: bool, timeout: Duration) -> WindowResult<bool> {
        let target = Size::new(width, height);
        if self.poll_until(timeout, |w| w.size() == target).is_some() {
            return Ok(true);
        }
        if fail_fast {
            return Err(WindowError::Timeout(format!(
                "window {} size {}x{} not reached within {:?}, is {:?}",
                self.id(),
                width,
                height,
                timeout,
                self.size()
            )));
        }
        log::warn!(
            target: TARGET_WINDOW,
            "window {} size {}x{} not reached within {:?}, is {:?}",
            self.id(),
            width,
            height,
            timeout,
            self.size()
        );
        Ok(false)
    }

    /// Wait until the window sits at (`x`, `y`) within
    /// [`position_tolerance`], or, without `custom` position, until the
    /// window manager reported any position
    pub fn wait_for_position(&self, custom: bool, x: i32, y: i32, timeout: Duration) -> bool {
        let target = Point::new(x, y);
        let tolerance = position_tolerance(&self.insets());
        let reached = self
            .poll_until(timeout, |w| {
                if custom {
                    within_tolerance(w.position(), target, tolerance)
                } else {
                    !w.is_auto_position()
                }
            })
            .is_some();
        if !reached {
            log::warn!(
                target: TARGET_WINDOW,
                "window {} position {:?} (custom {}) not reached within {:?}, is {:?}",
                self.id(),
                target,
                custom,
                timeout,
                self.position()
            );
        }
        reached
    }
}
