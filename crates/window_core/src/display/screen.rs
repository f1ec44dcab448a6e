//! Screens and monitors
//!
//! Monitor enumeration belongs to the driver; a [`Screen`] keeps the
//! resulting viewports, counts the windows referencing it and forwards
//! monitor mode changes to registered listeners.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::Display;
use crate::error::{WindowError, WindowResult};
use crate::events::ListenerList;
use crate::foundation::geometry::Rect;

/// One physical monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorDevice {
    /// Driver assigned identifier, unique per screen
    pub id: u32,
    /// Screen-space rectangle covered by the monitor
    pub viewport: Rect,
}

impl MonitorDevice {
    /// Create a monitor descriptor
    pub const fn new(id: u32, viewport: Rect) -> Self {
        Self { id, viewport }
    }

    /// Bounding box of the viewports, `None` for no monitors
    pub fn union_of_viewports(monitors: &[Self]) -> Option<Rect> {
        Rect::union_all(monitors.iter().map(|m| &m.viewport))
    }
}

/// A monitor mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorModeEvent {
    /// The monitor with its new viewport
    pub monitor: MonitorDevice,
    /// Viewport before the change
    pub previous: Rect,
}

/// Notified around monitor mode changes
pub trait MonitorModeListener: Send + Sync {
    /// A mode change is about to happen
    fn monitor_mode_change_notify(&self, event: &MonitorModeEvent);

    /// A mode change happened (or failed)
    fn monitor_mode_changed(&self, event: &MonitorModeEvent, success: bool);
}

struct ScreenShared {
    display: Display,
    index: usize,
    monitors: RwLock<Vec<MonitorDevice>>,
    references: AtomicUsize,
    listeners: ListenerList<dyn MonitorModeListener>,
}

/// Handle to one screen of a display; clones share the screen
#[derive(Clone)]
pub struct Screen {
    inner: Arc<ScreenShared>,
}

impl Screen {
    /// Screen `index` with the monitors the driver reports
    pub fn open(display: &Display, index: usize) -> WindowResult<Self> {
        let monitors = display
            .native()
            .map(|native| native.monitors(index))
            .unwrap_or_default();
        Self::with_monitors(display, index, monitors)
    }

    /// Screen with an explicit monitor list
    pub fn with_monitors(display: &Display, index: usize, monitors: Vec<MonitorDevice>) -> WindowResult<Self> {
        if monitors.is_empty() {
            return Err(WindowError::InvalidArgument(format!(
                "screen {} of display '{}' has no monitors",
                index,
                display.name()
            )));
        }
        Ok(Self {
            inner: Arc::new(ScreenShared {
                display: display.clone(),
                index,
                monitors: RwLock::new(monitors),
                references: AtomicUsize::new(0),
                listeners: ListenerList::new(),
            }),
        })
    }

    /// Owning display
    pub fn display(&self) -> &Display {
        &self.inner.display
    }

    /// Screen index on its display
    pub fn index(&self) -> usize {
        self.inner.index
    }

    /// Current monitors
    pub fn monitors(&self) -> Vec<MonitorDevice> {
        self.inner.monitors.read().clone()
    }

    /// Monitor by id
    pub fn monitor(&self, id: u32) -> Option<MonitorDevice> {
        self.inner.monitors.read().iter().find(|m| m.id == id).copied()
    }

    /// Monitor covering the largest part of `rect`; the first monitor if
    /// `rect` is off every viewport
    pub fn main_monitor(&self, rect: &Rect) -> MonitorDevice {
        let monitors = self.inner.monitors.read();
        let mut best = monitors[0];
        let mut best_area = 0;
        for monitor in monitors.iter() {
            let area = monitor.viewport.intersection(rect).area();
            if area > best_area {
                best = *monitor;
                best_area = area;
            }
        }
        best
    }

    /// Bounding box of all monitor viewports
    pub fn union_of_viewports(&self) -> Rect {
        MonitorDevice::union_of_viewports(&self.inner.monitors.read()).unwrap_or_default()
    }

    /// Register a window on this screen; returns the new count
    pub fn add_reference(&self) -> usize {
        let count = self.inner.references.fetch_add(1, Ordering::SeqCst) + 1;
        log::trace!("screen {} reference added: {}", self.index(), count);
        count
    }

    /// Release a window's reference; returns the new count
    pub fn remove_reference(&self) -> usize {
        let previous = self
            .inner
            .references
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        let count = previous.saturating_sub(1);
        log::trace!("screen {} reference removed: {}", self.index(), count);
        count
    }

    /// Number of windows referencing this screen
    pub fn reference_count(&self) -> usize {
        self.inner.references.load(Ordering::SeqCst)
    }

    /// Subscribe to monitor mode changes
    pub fn add_monitor_mode_listener(&self, listener: Arc<dyn MonitorModeListener>) {
        self.inner.listeners.add(listener);
    }

    /// Unsubscribe; returns whether the listener was registered
    pub fn remove_monitor_mode_listener(&self, listener: &Arc<dyn MonitorModeListener>) -> bool {
        self.inner.listeners.remove(listener)
    }

    /// Number of monitor mode listeners
    pub fn monitor_mode_listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Apply a new viewport to a monitor, notifying listeners before and
    /// after
    pub fn set_monitor_viewport(&self, id: u32, viewport: Rect) -> WindowResult<()> {
        let previous = self
            .monitor(id)
            .ok_or_else(|| WindowError::InvalidArgument(format!("no monitor {} on screen {}", id, self.index())))?;
        let event = MonitorModeEvent {
            monitor: MonitorDevice::new(id, viewport),
            previous: previous.viewport,
        };

        let listeners = self.inner.listeners.snapshot();
        for listener in listeners.iter() {
            listener.monitor_mode_change_notify(&event);
        }
        {
            let mut monitors = self.inner.monitors.write();
            if let Some(monitor) = monitors.iter_mut().find(|m| m.id == id) {
                monitor.viewport = viewport;
            }
        }
        log::info!("monitor {} viewport {:?} -> {:?}", id, previous.viewport, viewport);
        for listener in listeners.iter() {
            listener.monitor_mode_changed(&event, true);
        }
        Ok(())
    }

    /// True if windows on `self` and `other` can be natively reparented
    /// into each other, i.e. both live on the same display connection
    pub fn is_compatible(&self, other: &Self) -> bool {
        let (a, b) = (self.display(), other.display());
        a.ptr_eq(b) || (a.platform() == b.platform() && a.name() == b.name())
    }

    /// Same screen
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("display", self.display())
            .field("index", &self.index())
            .field("monitors", &self.monitors())
            .field("references", &self.reference_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowConfig;
    use crate::driver::DriverRegistry;
    use parking_lot::Mutex;

    fn screen() -> Screen {
        let display = Display::open(&DriverRegistry::with_defaults(), WindowConfig::default().with_edt(false)).unwrap();
        Screen::with_monitors(
            &display,
            0,
            vec![
                MonitorDevice::new(1, Rect::new(0, 0, 1920, 1080)),
                MonitorDevice::new(2, Rect::new(1920, 0, 1920, 1080)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_main_monitor_by_overlap() {
        let screen = screen();
        assert_eq!(screen.main_monitor(&Rect::new(1800, 100, 400, 300)).id, 2);
        assert_eq!(screen.main_monitor(&Rect::new(100, 100, 400, 300)).id, 1);
        assert_eq!(screen.main_monitor(&Rect::new(-900, -900, 10, 10)).id, 1);
    }

    #[test]
    fn test_union_of_viewports() {
        assert_eq!(screen().union_of_viewports(), Rect::new(0, 0, 3840, 1080));
    }

    #[test]
    fn test_reference_counting() {
        let screen = screen();
        assert_eq!(screen.add_reference(), 1);
        assert_eq!(screen.add_reference(), 2);
        assert_eq!(screen.remove_reference(), 1);
        assert_eq!(screen.remove_reference(), 0);
        assert_eq!(screen.remove_reference(), 0);
    }

    struct Recorder(Mutex<Vec<String>>);

    impl MonitorModeListener for Recorder {
        fn monitor_mode_change_notify(&self, event: &MonitorModeEvent) {
            self.0.lock().push(format!("notify {}", event.monitor.id));
        }

        fn monitor_mode_changed(&self, event: &MonitorModeEvent, success: bool) {
            self.0.lock().push(format!("changed {} {}", event.monitor.id, success));
        }
    }

    #[test]
    fn test_viewport_change_notifies_listeners() {
        let screen = screen();
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let listener: Arc<dyn MonitorModeListener> = recorder.clone();
        screen.add_monitor_mode_listener(Arc::clone(&listener));

        screen.set_monitor_viewport(2, Rect::new(1920, 0, 1280, 720)).unwrap();
        assert_eq!(*recorder.0.lock(), vec!["notify 2", "changed 2 true"]);
        assert_eq!(screen.monitor(2).unwrap().viewport.width, 1280);

        assert!(screen.set_monitor_viewport(9, Rect::new(0, 0, 1, 1)).is_err());
        assert!(screen.remove_monitor_mode_listener(&listener));
    }

    #[test]
    fn test_compatibility() {
        let a = screen();
        let b = Screen::with_monitors(a.display(), 1, a.monitors()).unwrap();
        assert!(a.is_compatible(&b));
        assert!(!a.ptr_eq(&b));
    }
}
