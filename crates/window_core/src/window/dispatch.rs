//! Event delivery and coalescing
//!
//! RESIZED and REPAINT events that arrive while any thread holds the window
//! lock are parked in an [`EventCoalescer`] and delivered when the lock is
//! finally released. Parked events older than the configured queued event
//! timeout are dropped at delivery.

use super::Window;
use crate::events::{Event, KeyEvent, MouseEvent, WindowEvent, WindowEventType};
use crate::foundation::logging::TARGET_WINDOW;

/// Events parked while the window lock is held
#[derive(Debug, Default)]
pub struct EventCoalescer {
    repaint: Option<WindowEvent>,
    resized: Option<WindowEvent>,
}

impl EventCoalescer {
    /// Park an event; returns `false` if it was folded into one already
    /// parked
    ///
    /// The first REPAINT wins, RESIZED keeps the latest. Other event types
    /// are not coalesced and are rejected.
    pub fn park(&mut self, event: WindowEvent) -> bool {
        match event.kind {
            WindowEventType::Repaint => {
                if self.repaint.is_some() {
                    return false;
                }
                self.repaint = Some(event);
                true
            }
            WindowEventType::Resized => self.resized.replace(event).is_none(),
            _ => false,
        }
    }

    /// Remove and return the parked events, RESIZED first
    pub fn drain(&mut self) -> Vec<WindowEvent> {
        self.resized.take().into_iter().chain(self.repaint.take()).collect()
    }

    /// Number of parked events
    pub fn len(&self) -> usize {
        usize::from(self.repaint.is_some()) + usize::from(self.resized.is_some())
    }

    /// True if nothing is parked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if a REPAINT is parked
    pub fn has_repaint(&self) -> bool {
        self.repaint.is_some()
    }
}

const fn is_coalesced(kind: WindowEventType) -> bool {
    matches!(kind, WindowEventType::Resized | WindowEventType::Repaint)
}

impl Window {
    /// Deliver an event to this window's listeners
    ///
    /// RESIZED and REPAINT are parked while the window lock is held by any
    /// thread.
    pub fn consume_event(&self, event: Event) {
        match event {
            Event::Window(event) => {
                if is_coalesced(event.kind) {
                    let mut coalescer = self.shared.coalescer.lock();
                    if self.shared.surface.window_lock().is_locked() {
                        let kind = event.kind;
                        if !coalescer.park(event) {
                            log::trace!(target: TARGET_WINDOW, "window {} folded {:?}", self.id(), kind);
                        }
                        return;
                    }
                }
                self.dispatch_window_event(&event);
            }
            Event::Mouse(event) => self.dispatch_mouse_event(&event),
            Event::Key(event) => self.dispatch_key_event(&event),
        }
    }

    /// Create and deliver a window event immediately, bypassing coalescing
    pub fn send_window_event(&self, kind: WindowEventType) {
        let event = WindowEvent::new(kind, self.id(), self.display().now_millis());
        self.dispatch_window_event(&event);
    }

    /// Queue a window event on the display; dropped while unrealized
    pub fn enqueue_window_event(&self, wait: bool, kind: WindowEventType) {
        if !self.is_native_valid() {
            return;
        }
        let display = self.display();
        let event = WindowEvent::new(kind, self.id(), display.now_millis());
        if let Err(e) = display.enqueue_event(wait, self, event.into()) {
            log::warn!(target: TARGET_WINDOW, "window {} enqueue {:?}: {}", self.id(), kind, e);
        }
    }

    pub(crate) fn send_or_enqueue(&self, defer: bool, kind: WindowEventType) {
        if defer {
            self.enqueue_window_event(false, kind);
        } else {
            self.send_window_event(kind);
        }
    }

    /// Consume now, or queue on the display when `defer`
    pub(crate) fn do_event(&self, defer: bool, event: Event) {
        if !defer {
            self.consume_event(event);
            return;
        }
        if let Err(e) = self.display().enqueue_event(false, self, event) {
            log::warn!(target: TARGET_WINDOW, "window {} enqueue: {}", self.id(), e);
        }
    }

    /// Deliver events parked while the lock was held
    ///
    /// Does nothing while any thread still holds the window lock; the last
    /// release flushes.
    pub(crate) fn flush_coalesced_events(&self) {
        let parked = {
            let mut coalescer = self.shared.coalescer.lock();
            if coalescer.is_empty() || self.shared.surface.window_lock().is_locked() {
                return;
            }
            coalescer.drain()
        };
        let display = self.display();
        let now = display.now_millis();
        let timeout = display.config().queued_event_timeout_ms;
        for event in parked {
            let age = now.saturating_sub(event.when);
            if age >= timeout {
                log::debug!(
                    target: TARGET_WINDOW,
                    "window {} dropping stale {:?} ({} ms old)",
                    self.id(),
                    event.kind,
                    age
                );
                continue;
            }
            self.dispatch_window_event(&event);
        }
    }

    /// Number of events parked for delivery at lock release
    pub fn coalesced_event_count(&self) -> usize {
        self.shared.coalescer.lock().len()
    }

    fn dispatch_window_event(&self, event: &WindowEvent) {
        log::trace!(target: TARGET_WINDOW, "window {} dispatch {:?}", self.id(), event.kind);
        for listener in self.shared.window_listeners.snapshot().iter() {
            if event.deliver_to(listener.as_ref()) {
                break;
            }
        }
    }

    fn dispatch_mouse_event(&self, event: &MouseEvent) {
        for listener in self.shared.mouse_listeners.snapshot().iter() {
            if event.deliver_to(listener.as_ref()) {
                break;
            }
        }
    }

    fn dispatch_key_event(&self, event: &KeyEvent) {
        let handler = self.shared.keyboard_focus_handler.lock().clone();
        if let Some(handler) = handler {
            if event.deliver_to(handler.as_ref()) {
                return;
            }
        }
        for listener in self.shared.key_listeners.snapshot().iter() {
            if event.deliver_to(listener.as_ref()) {
                break;
            }
        }
    }
}
