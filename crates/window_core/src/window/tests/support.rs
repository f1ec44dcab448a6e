//! Recording driver and fixtures shared by the window scenarios

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::WindowConfig;
use crate::display::{Display, MonitorDevice, Screen};
use crate::driver::headless::HeadlessWindowDriver;
use crate::driver::{
    Capabilities, CreateRequest, DriverFactory, DriverRegistry, HeadlessFactory, NativeDisplay, NativeHandle,
    ReconfigureFlags, WindowDriver, WindowNotifier,
};
use crate::error::WindowResult;
use crate::events::{WindowEvent, WindowEventType, WindowListener};
use crate::foundation::geometry::{Insets, Rect};
use crate::foundation::time::ManualClock;

pub const MOCK_DRIVER: &str = "mock";

/// Shared call journal
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Failure knobs, shared by every driver of one factory
#[derive(Default)]
pub struct Knobs {
    pub fail_create: AtomicBool,
    pub fail_reparent: AtomicBool,
    /// Window manager ignores requested positions
    pub pin_position: AtomicBool,
}

pub struct MockFactory {
    inner: HeadlessFactory,
    insets: Insets,
    pub journal: Journal,
    pub knobs: Arc<Knobs>,
}

impl MockFactory {
    pub fn new(monitors: Vec<MonitorDevice>, insets: Insets) -> Self {
        Self {
            inner: HeadlessFactory::new(monitors, insets),
            insets,
            journal: Arc::new(Mutex::new(Vec::new())),
            knobs: Arc::new(Knobs::default()),
        }
    }
}

impl DriverFactory for MockFactory {
    fn platform(&self) -> &str {
        MOCK_DRIVER
    }

    fn open_display(&self, name: &str) -> WindowResult<Arc<dyn NativeDisplay>> {
        self.inner.open_display(name)
    }

    fn create_window_driver(&self, _capabilities: &Capabilities) -> WindowResult<Arc<dyn WindowDriver>> {
        Ok(Arc::new(MockDriver {
            inner: HeadlessWindowDriver::new(self.insets),
            journal: Arc::clone(&self.journal),
            knobs: Arc::clone(&self.knobs),
        }))
    }
}

/// Headless behavior plus a journal of every native call
pub struct MockDriver {
    inner: HeadlessWindowDriver,
    journal: Journal,
    knobs: Arc<Knobs>,
}

impl MockDriver {
    fn record(&self, entry: String) {
        self.journal.lock().push(entry);
    }
}

impl WindowDriver for MockDriver {
    fn create_native(&self, request: &CreateRequest<'_>, notifier: &WindowNotifier) -> Option<NativeHandle> {
        if self.knobs.fail_create.load(Ordering::SeqCst) {
            self.record("create failed".to_string());
            return None;
        }
        let handle = self.inner.create_native(request, notifier)?;
        self.record(format!("create {:#x} parent {:#x}", handle, request.parent_handle));
        Some(handle)
    }

    fn close_native(&self) -> bool {
        self.record(format!("close {:#x}", self.inner.handle()));
        self.inner.close_native()
    }

    fn request_focus(&self, force: bool) {
        self.record(format!("focus {:#x} force {}", self.inner.handle(), force));
        self.inner.request_focus(force);
    }

    fn reconfigure(&self, x: i32, y: i32, width: i32, height: i32, flags: ReconfigureFlags) -> bool {
        self.record(format!("reconfigure {:#x} {}/{} {}x{} {}", self.inner.handle(), x, y, width, height, flags));
        if flags.contains(ReconfigureFlags::CHANGE_PARENTING) && self.knobs.fail_reparent.load(Ordering::SeqCst) {
            return false;
        }
        if self.knobs.pin_position.load(Ordering::SeqCst) {
            return self.inner.reconfigure(-1, -1, width, height, flags);
        }
        self.inner.reconfigure(x, y, width, height, flags)
    }

    fn update_insets(&self) -> Option<Insets> {
        self.inner.update_insets()
    }

    fn set_title(&self, title: &str) {
        self.record(format!("title {}", title));
    }

    fn set_pointer_visible(&self, visible: bool) -> bool {
        self.inner.set_pointer_visible(visible)
    }

    fn confine_pointer(&self, confine: bool) -> bool {
        self.inner.confine_pointer(confine)
    }

    fn warp_pointer(&self, x: i32, y: i32) {
        self.record(format!("warp {}/{}", x, y));
    }

    fn set_keyboard_visible(&self, visible: bool) -> bool {
        visible
    }
}

pub struct Fixture {
    pub display: Display,
    pub screen: Screen,
    pub journal: Journal,
    pub knobs: Arc<Knobs>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn with(config: WindowConfig, monitors: Vec<MonitorDevice>, insets: Insets) -> Self {
        let factory = MockFactory::new(monitors.clone(), insets);
        let journal = Arc::clone(&factory.journal);
        let knobs = Arc::clone(&factory.knobs);
        let mut registry = DriverRegistry::new();
        registry.register(Arc::new(factory));

        let clock = Arc::new(ManualClock::new(10_000));
        let display = Display::open_with_clock(&registry, config, "test", clock.clone()).unwrap();
        let screen = Screen::with_monitors(&display, 0, monitors).unwrap();
        Self {
            display,
            screen,
            journal,
            knobs,
            clock,
        }
    }

    /// One 1920x1080 monitor, serialization thread on, short settle time
    pub fn new() -> Self {
        Self::with(config(true), vec![monitor(0, 0)], Insets::ZERO)
    }

    /// Two side by side 1920x1080 monitors
    pub fn dual_monitor() -> Self {
        Self::with(config(true), vec![monitor(0, 0), monitor(1, 1920)], Insets::ZERO)
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.display.close();
    }
}

pub fn config(edt: bool) -> WindowConfig {
    WindowConfig::new(MOCK_DRIVER)
        .with_edt(edt)
        .with_native_timeout_ms(300)
        .with_reparent_settle_ms(5)
}

pub fn monitor(id: u32, x: i32) -> MonitorDevice {
    MonitorDevice::new(id, Rect::new(x, 0, 1920, 1080))
}

/// Window listener recording event types, optionally per window
#[derive(Default)]
pub struct EventLog {
    pub label: &'static str,
    pub events: Journal,
}

impl EventLog {
    pub fn shared(label: &'static str, events: &Journal) -> Arc<Self> {
        Arc::new(Self {
            label,
            events: Arc::clone(events),
        })
    }

    fn push(&self, event: &WindowEvent) {
        let entry = if self.label.is_empty() {
            format!("{:?}", event.kind)
        } else {
            format!("{} {:?}", self.label, event.kind)
        };
        self.events.lock().push(entry);
    }

    pub fn count(&self, kind: WindowEventType) -> usize {
        let name = format!("{:?}", kind);
        self.events.lock().iter().filter(|e| e.ends_with(&name)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl WindowListener for EventLog {
    fn window_resized(&self, event: &WindowEvent) {
        self.push(event);
    }
    fn window_moved(&self, event: &WindowEvent) {
        self.push(event);
    }
    fn window_destroy_notify(&self, event: &WindowEvent) {
        self.push(event);
    }
    fn window_destroyed(&self, event: &WindowEvent) {
        self.push(event);
    }
    fn window_gained_focus(&self, event: &WindowEvent) {
        self.push(event);
    }
    fn window_lost_focus(&self, event: &WindowEvent) {
        self.push(event);
    }
    fn window_repaint(&self, event: &WindowEvent) {
        self.push(event);
    }
}
