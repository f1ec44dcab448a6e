//! Built-in headless driver
//!
//! Hands out synthetic native handles and confirms every request
//! immediately through the notifier, as a window manager that honors all
//! placement requests would. Used as the default driver and for running
//! the window machinery without a display server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    Capabilities, CreateRequest, DriverFactory, NativeDisplay, NativeHandle, ReconfigureFlags,
    WindowDriver, WindowNotifier,
};
use crate::display::MonitorDevice;
use crate::error::WindowResult;
use crate::foundation::geometry::{Insets, Point, Rect};

/// Registry key of the headless driver
pub const HEADLESS_DRIVER: &str = "headless";

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(0x1000);

/// Factory for headless displays and windows
#[derive(Debug, Clone)]
pub struct HeadlessFactory {
    monitors: Vec<MonitorDevice>,
    insets: Insets,
}

impl HeadlessFactory {
    /// Factory reporting the given monitors and decoration insets
    pub fn new(monitors: Vec<MonitorDevice>, insets: Insets) -> Self {
        Self { monitors, insets }
    }
}

impl Default for HeadlessFactory {
    fn default() -> Self {
        Self::new(vec![MonitorDevice::new(0, Rect::new(0, 0, 1920, 1080))], Insets::ZERO)
    }
}

impl DriverFactory for HeadlessFactory {
    fn platform(&self) -> &str {
        HEADLESS_DRIVER
    }

    fn open_display(&self, name: &str) -> WindowResult<Arc<dyn NativeDisplay>> {
        log::debug!("opening headless display '{}'", name);
        Ok(Arc::new(HeadlessDisplay {
            monitors: self.monitors.clone(),
        }))
    }

    fn create_window_driver(&self, _capabilities: &Capabilities) -> WindowResult<Arc<dyn WindowDriver>> {
        Ok(Arc::new(HeadlessWindowDriver::new(self.insets)))
    }
}

struct HeadlessDisplay {
    monitors: Vec<MonitorDevice>,
}

impl NativeDisplay for HeadlessDisplay {
    fn dispatch_messages(&self) {}

    fn monitors(&self, _screen_index: usize) -> Vec<MonitorDevice> {
        self.monitors.clone()
    }
}

#[derive(Default)]
struct HeadlessState {
    notifier: Option<WindowNotifier>,
    handle: NativeHandle,
}

/// Window driver without a native window behind it
pub struct HeadlessWindowDriver {
    insets: Insets,
    state: Mutex<HeadlessState>,
}

impl HeadlessWindowDriver {
    /// Driver reporting `insets` for decorated windows
    pub fn new(insets: Insets) -> Self {
        Self {
            insets,
            state: Mutex::new(HeadlessState::default()),
        }
    }

    /// Synthetic handle of the realized window, zero if none
    pub fn handle(&self) -> NativeHandle {
        self.state.lock().handle
    }

    fn notifier(&self) -> Option<WindowNotifier> {
        self.state.lock().notifier.clone()
    }

    fn decoration_insets(&self, flags: ReconfigureFlags) -> Insets {
        if flags.contains(ReconfigureFlags::IS_UNDECORATED) {
            Insets::ZERO
        } else {
            self.insets
        }
    }
}

impl WindowDriver for HeadlessWindowDriver {
    fn create_native(&self, request: &CreateRequest<'_>, notifier: &WindowNotifier) -> Option<NativeHandle> {
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.lock();
            state.notifier = Some(notifier.clone());
            state.handle = handle;
        }

        let position = request.position.unwrap_or(Point::new(0, 0));
        notifier.insets_changed(false, self.decoration_insets(request.flags));
        if let Err(e) = notifier.size_changed(false, request.size.width, request.size.height, false) {
            log::warn!("headless create: {}", e);
        }
        notifier.position_changed(false, position.x, position.y);
        notifier.visible_changed(false, true);
        Some(handle)
    }

    fn close_native(&self) -> bool {
        let mut state = self.state.lock();
        state.notifier = None;
        state.handle = 0;
        true
    }

    fn request_focus(&self, _force: bool) {
        if let Some(notifier) = self.notifier() {
            notifier.focus_changed(false, true);
        }
    }

    fn reconfigure(&self, x: i32, y: i32, width: i32, height: i32, flags: ReconfigureFlags) -> bool {
        let Some(notifier) = self.notifier() else {
            return false;
        };
        let visibility = flags.contains(ReconfigureFlags::CHANGE_VISIBILITY);
        let visible = flags.contains(ReconfigureFlags::IS_VISIBLE);

        if visibility && !visible {
            notifier.visible_changed(false, false);
        }
        if flags.contains(ReconfigureFlags::CHANGE_DECORATION) {
            notifier.insets_changed(false, self.decoration_insets(flags));
        }
        if width > 0 && height > 0 {
            if let Err(e) = notifier.size_changed(false, width, height, false) {
                log::warn!("headless reconfigure: {}", e);
            }
        }
        if x >= 0 && y >= 0 {
            notifier.position_changed(false, x, y);
        }
        if visibility && visible {
            notifier.visible_changed(false, true);
        }
        true
    }

    fn update_insets(&self) -> Option<Insets> {
        Some(self.insets)
    }

    fn set_pointer_visible(&self, _visible: bool) -> bool {
        true
    }

    fn confine_pointer(&self, _confine: bool) -> bool {
        true
    }
}
