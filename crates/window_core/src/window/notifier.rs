//! Callbacks a driver uses to report native state changes
//!
//! Every callback takes a `defer` flag: `false` delivers resulting events
//! synchronously on the calling thread, `true` queues them on the display.
//! The notifier holds the window weakly; callbacks arriving after the window
//! is gone are ignored.

use std::sync::Weak;

use super::{Window, WindowShared};
use crate::error::{WindowError, WindowResult};
use crate::events::{Event, WindowEvent, WindowEventType};
use crate::foundation::geometry::{Insets, Point, Rect, Size};
use crate::foundation::logging::{TARGET_KEY, TARGET_MOUSE, TARGET_WINDOW};
use crate::input::{KeyInput, MouseInput, PointerContext};

/// Driver-facing handle to a window
#[derive(Clone)]
pub struct WindowNotifier {
    window: Weak<WindowShared>,
}

impl WindowNotifier {
    pub(crate) fn new(window: &Window) -> Self {
        Self {
            window: window.downgrade(),
        }
    }

    /// The window, unless it was dropped
    pub fn window(&self) -> Option<Window> {
        self.window.upgrade().map(Window::from_shared)
    }

    /// Client area size changed
    ///
    /// Ignored when the size is unchanged, unless `force`. A RESIZED event
    /// follows once the window is realized.
    pub fn size_changed(&self, defer: bool, width: i32, height: i32, force: bool) -> WindowResult<()> {
        let Some(window) = self.window() else {
            return Ok(());
        };
        let target = Size::new(width, height);
        if !force && window.size() == target {
            return Ok(());
        }
        if width < 0 || height < 0 {
            return Err(WindowError::InvalidArgument(format!(
                "negative window size {}x{} reported for window {}",
                width,
                height,
                window.id()
            )));
        }
        window.define_size(width, height);
        if window.is_native_valid() {
            window.send_or_enqueue(defer, WindowEventType::Resized);
        }
        Ok(())
    }

    /// Client area position changed
    pub fn position_changed(&self, defer: bool, x: i32, y: i32) {
        let Some(window) = self.window() else {
            return;
        };
        if window.position() == Point::new(x, y) {
            window.state().auto_position = false;
            return;
        }
        window.define_position(x, y);
        window.send_or_enqueue(defer, WindowEventType::Moved);
    }

    /// Native visibility changed
    pub fn visible_changed(&self, _defer: bool, visible: bool) {
        let Some(window) = self.window() else {
            return;
        };
        let mut state = window.state();
        if state.visible != visible {
            log::debug!(target: TARGET_WINDOW, "window {} visible {} -> {}", window.id(), state.visible, visible);
            state.visible = visible;
        }
    }

    /// Keyboard focus changed
    pub fn focus_changed(&self, defer: bool, focus: bool) {
        let Some(window) = self.window() else {
            return;
        };
        let changed = {
            let mut state = window.state();
            let changed = state.broken_focus_change || state.has_focus != focus;
            state.has_focus = focus;
            changed
        };
        if changed {
            let kind = if focus {
                WindowEventType::GainedFocus
            } else {
                WindowEventType::LostFocus
            };
            window.send_or_enqueue(defer, kind);
        }
    }

    /// Decoration insets changed; ignored for undecorated windows and
    /// invalid insets
    pub fn insets_changed(&self, _defer: bool, insets: Insets) {
        let Some(window) = self.window() else {
            return;
        };
        if !insets.is_valid() {
            log::warn!(target: TARGET_WINDOW, "window {} ignoring invalid insets {:?}", window.id(), insets);
            return;
        }
        let mut state = window.state();
        if !state.is_undecorated() && state.insets != insets {
            state.insets = insets;
        }
    }

    /// The window manager asks to close the window
    ///
    /// Returns `true` if the window is no longer realized afterwards.
    pub fn window_destroy_notify(&self, force: bool) -> bool {
        self.window().map_or(true, |window| window.window_destroy_notify(force))
    }

    /// Part of the window needs repainting; an empty region means the whole
    /// client area
    pub fn window_repaint(&self, defer: bool, region: Rect) {
        let Some(window) = self.window() else {
            return;
        };
        if !window.is_native_valid() {
            return;
        }
        let region = if region.width <= 0 || region.height <= 0 {
            Rect::from_parts(Point::new(0, 0), window.size())
        } else {
            region
        };
        let event = WindowEvent::repaint(window.id(), window.display().now_millis(), region);
        window.do_event(defer, event.into());
    }

    /// Raw pointer report; normalized before dispatch
    pub fn mouse_input(&self, defer: bool, input: MouseInput) -> WindowResult<()> {
        let Some(window) = self.window() else {
            return Ok(());
        };
        let ctx = {
            let display = window.display();
            let state = window.state();
            PointerContext {
                source: window.id(),
                size: state.size,
                confined: state.pointer_confined,
                visible: state.pointer_visible,
                when: display.now_millis(),
                click_timeout: display.config().click_timeout_ms,
            }
        };
        let events = window.shared.mouse.lock().process(input, &ctx)?;
        log::trace!(target: TARGET_MOUSE, "window {} mouse input -> {} events", window.id(), events.len());
        for event in events {
            window.do_event(defer, Event::Mouse(event));
        }
        Ok(())
    }

    /// Raw key report; auto-repeat and TYPED synthesis applied before
    /// dispatch
    pub fn key_input(&self, defer: bool, input: KeyInput) -> WindowResult<()> {
        let Some(window) = self.window() else {
            return Ok(());
        };
        let held = window.shared.mouse.lock().held_buttons();
        let when = window.display().now_millis();
        let (event, typed) = window.shared.keys.lock().process(window.id(), input, held, when)?;
        log::trace!(target: TARGET_KEY, "window {} key {:?} code {}", window.id(), event.kind, event.key_code);
        window.do_event(defer, Event::Key(event));
        if let Some(typed) = typed {
            window.do_event(defer, Event::Key(typed));
        }
        Ok(())
    }
}

impl std::fmt::Debug for WindowNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowNotifier")
            .field("alive", &(self.window.strong_count() > 0))
            .finish()
    }
}
