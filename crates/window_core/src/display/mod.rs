//! Display connections
//!
//! A [`Display`] owns everything shared by the windows of one native
//! connection: the serialization thread, the native message pump, the
//! graphics device lock and the deferred event queue.

pub mod screen;

pub use screen::{MonitorDevice, MonitorModeEvent, MonitorModeListener, Screen};

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;

use crate::config::WindowConfig;
use crate::driver::{DriverFactory, DriverRegistry, NativeDisplay};
use crate::edt::Scheduler;
use crate::error::{WindowError, WindowResult};
use crate::events::Event;
use crate::foundation::time::{Clock, SystemClock};
use crate::sync::RecursiveLock;
use crate::window::Window;

/// Name used by [`Display::open`]
pub const DEFAULT_DISPLAY_NAME: &str = "default";

struct QueuedEvent {
    target: Window,
    event: Event,
    done: Option<Sender<()>>,
}

struct DisplayShared {
    name: String,
    config: Arc<WindowConfig>,
    factory: Arc<dyn DriverFactory>,
    native: OnceLock<Arc<dyn NativeDisplay>>,
    edt: OnceLock<Scheduler>,
    device_lock: RecursiveLock,
    events: Mutex<VecDeque<QueuedEvent>>,
    clock: Arc<dyn Clock>,
}

impl DisplayShared {
    fn dispatch_messages_native(&self) {
        if let Some(native) = self.native.get() {
            native.dispatch_messages();
        }
        loop {
            // Pop one at a time: consuming may enqueue more
            let Some(queued) = self.events.lock().pop_front() else {
                break;
            };
            queued.target.consume_event(queued.event);
            if let Some(done) = queued.done {
                let _ = done.send(());
            }
        }
    }
}

/// Handle to one display connection; clones share the connection
#[derive(Clone)]
pub struct Display {
    inner: Arc<DisplayShared>,
}

impl Display {
    /// Open the default display of the configured driver
    pub fn open(registry: &DriverRegistry, config: WindowConfig) -> WindowResult<Self> {
        Self::open_with_clock(registry, config, DEFAULT_DISPLAY_NAME, SystemClock::shared())
    }

    /// Open a named display with an explicit event clock
    pub fn open_with_clock(
        registry: &DriverRegistry,
        config: WindowConfig,
        name: &str,
        clock: Arc<dyn Clock>,
    ) -> WindowResult<Self> {
        config.validate()?;
        let factory = registry.get(&config.driver)?;

        let inner = Arc::new(DisplayShared {
            name: name.to_string(),
            config: Arc::new(config),
            factory: Arc::clone(&factory),
            native: OnceLock::new(),
            edt: OnceLock::new(),
            device_lock: RecursiveLock::new(),
            events: Mutex::new(VecDeque::new()),
            clock,
        });

        if inner.config.edt_enabled {
            let weak = Arc::downgrade(&inner);
            let edt = Scheduler::start(
                format!("{}-{}-edt", inner.config.driver, name),
                inner.config.poll_interval(),
                move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.dispatch_messages_native();
                    }
                },
            )?;
            if inner.edt.set(edt).is_err() {
                return Err(WindowError::Internal("display EDT initialized twice".to_string()));
            }
        }

        let display = Self { inner };
        let display_name = name.to_string();
        let native = display.run_on_edt_sync(move || factory.open_display(&display_name))?;
        if display.inner.native.set(native).is_err() {
            return Err(WindowError::Internal("native display opened twice".to_string()));
        }
        log::info!(
            "opened display '{}' on driver '{}' (EDT {})",
            display.name(),
            display.platform(),
            if display.is_edt_running() { "running" } else { "disabled" }
        );
        Ok(display)
    }

    /// Connection name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Platform key of the driver
    pub fn platform(&self) -> &str {
        self.inner.factory.platform()
    }

    /// Configuration shared by every window on this display
    pub fn config(&self) -> &WindowConfig {
        &self.inner.config
    }

    /// Driver factory backing this display
    pub fn factory(&self) -> &Arc<dyn DriverFactory> {
        &self.inner.factory
    }

    /// Native connection
    pub fn native(&self) -> Option<&Arc<dyn NativeDisplay>> {
        self.inner.native.get()
    }

    /// Event clock
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    /// Current event time in milliseconds
    pub fn now_millis(&self) -> u64 {
        self.inner.clock.now_millis()
    }

    /// Graphics device lock taken by the outermost surface lock of any
    /// window on this display
    pub fn device_lock(&self) -> &RecursiveLock {
        &self.inner.device_lock
    }

    /// True while the serialization thread runs
    pub fn is_edt_running(&self) -> bool {
        self.inner.edt.get().is_some_and(Scheduler::is_running)
    }

    /// True if called on this display's serialization thread
    pub fn is_edt_thread(&self) -> bool {
        self.inner.edt.get().is_some_and(Scheduler::is_current_thread)
    }

    /// Same connection
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `task` on the serialization thread, or inline if there is none
    ///
    /// Returns `Some(result)` unless the task was queued without waiting.
    pub fn run_on_edt<R, F>(&self, wait: bool, task: F) -> WindowResult<Option<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        match self.inner.edt.get() {
            Some(edt) if edt.is_running() => edt.invoke(wait, task),
            _ => Ok(Some(task())),
        }
    }

    /// Run a fallible task on the serialization thread and wait for it
    pub fn run_on_edt_sync<R, F>(&self, task: F) -> WindowResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> WindowResult<R> + Send + 'static,
    {
        self.run_on_edt(true, task)?
            .ok_or_else(|| WindowError::Internal("waited task returned no result".to_string()))?
    }

    /// Pump native messages and deliver queued events on the current thread
    pub fn dispatch_messages_native(&self) {
        self.inner.dispatch_messages_native();
    }

    /// Pump on the serialization thread and wait for it
    pub fn dispatch_messages(&self) -> WindowResult<()> {
        let display = self.clone();
        self.run_on_edt(true, move || display.dispatch_messages_native())?;
        Ok(())
    }

    /// Queue an event for delivery by the message pump
    ///
    /// Without a running serialization thread, or when waiting on it from
    /// the thread itself, the event is consumed immediately.
    pub fn enqueue_event(&self, wait: bool, target: &Window, event: Event) -> WindowResult<()> {
        if !self.is_edt_running() || (wait && self.is_edt_thread()) {
            target.consume_event(event);
            return Ok(());
        }

        let (done, finished) = if wait {
            let (tx, rx) = bounded(1);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        self.inner.events.lock().push_back(QueuedEvent {
            target: target.clone(),
            event,
            done,
        });
        if let Some(finished) = finished {
            finished
                .recv()
                .map_err(|_| WindowError::Scheduler(format!("display '{}' dropped a queued event", self.name())))?;
        }
        Ok(())
    }

    /// Number of events waiting for the pump
    pub fn queued_event_count(&self) -> usize {
        self.inner.events.lock().len()
    }

    /// Stop the serialization thread and release the native connection
    ///
    /// Tasks already queued still run; queued events are dropped.
    pub fn close(&self) {
        if let Some(edt) = self.inner.edt.get() {
            edt.stop();
        }
        let dropped = std::mem::take(&mut *self.inner.events.lock());
        if !dropped.is_empty() {
            log::debug!("display '{}' dropped {} queued events", self.name(), dropped.len());
        }
        if let Some(native) = self.inner.native.get() {
            native.close();
        }
        log::info!("closed display '{}'", self.name());
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("name", &self.inner.name)
            .field("platform", &self.platform())
            .field("edt", &self.is_edt_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::time::ManualClock;

    #[test]
    fn test_open_unknown_driver() {
        let registry = DriverRegistry::with_defaults();
        let result = Display::open(&registry, WindowConfig::new("wayland"));
        assert!(matches!(result, Err(WindowError::UnknownDriver(_))));
    }

    #[test]
    fn test_tasks_run_on_edt() {
        let registry = DriverRegistry::with_defaults();
        let display = Display::open(&registry, WindowConfig::default()).unwrap();
        assert!(display.is_edt_running());
        assert!(!display.is_edt_thread());

        let probe = display.clone();
        let on_edt = display.run_on_edt(true, move || probe.is_edt_thread()).unwrap();
        assert_eq!(on_edt, Some(true));
        display.close();
        assert!(!display.is_edt_running());
    }

    #[test]
    fn test_without_edt_tasks_run_inline() {
        let registry = DriverRegistry::with_defaults();
        let clock = Arc::new(ManualClock::new(500));
        let display =
            Display::open_with_clock(&registry, WindowConfig::default().with_edt(false), "inline", clock)
                .unwrap();
        assert!(!display.is_edt_running());
        assert_eq!(display.now_millis(), 500);

        let caller = std::thread::current().id();
        let ran_on = display.run_on_edt(false, move || std::thread::current().id()).unwrap();
        assert_eq!(ran_on, Some(caller));
    }
}
