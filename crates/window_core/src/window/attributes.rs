//! Focus, decoration, title, pointer and on-screen keyboard

use super::Window;
use crate::driver::ReconfigureFlags;
use crate::error::WindowResult;
use crate::events::WindowEventType;
use crate::foundation::logging::TARGET_WINDOW;

impl Window {
    /// Request keyboard focus
    ///
    /// Only issued while realized and not already focused, unless the
    /// driver's focus notifications are unreliable. An installed
    /// [`FocusHook`](super::FocusHook) may take over the request.
    pub fn request_focus(&self, wait: bool) -> WindowResult<()> {
        let force = self.has_broken_focus_change();
        self.request_focus_with(wait, false, force)
    }

    pub(crate) fn request_focus_with(&self, wait: bool, skip_hook: bool, force: bool) -> WindowResult<()> {
        if !self.is_native_valid() || (!force && self.has_focus()) {
            return Ok(());
        }
        if !skip_hook {
            let hook = self.shared.focus_hook.lock().clone();
            if hook.is_some_and(|h| h.focus_requested(self)) {
                log::debug!(target: TARGET_WINDOW, "window {} focus request taken by hook", self.id());
                return Ok(());
            }
        }
        let task = move |w: &Self| {
            let _guard = w.lock_window();
            w.driver().request_focus(force);
            Ok(())
        };
        if wait {
            self.run_on_edt(task)
        } else {
            self.run_on_edt_detached(task)
        }
    }

    /// Forced focus request without waiting; errors are logged
    pub(crate) fn request_focus_native(&self, skip_hook: bool) {
        if let Err(e) = self.request_focus_with(false, skip_hook, true) {
            log::warn!(target: TARGET_WINDOW, "window {} focus request: {}", self.id(), e);
        }
    }

    /// Show or hide window decorations
    pub fn set_undecorated(&self, undecorated: bool) -> WindowResult<()> {
        self.run_on_edt(move |w| {
            w.change_state_flag(ReconfigureFlags::CHANGE_DECORATION, undecorated);
            Ok(())
        })
    }

    /// Keep the window above others
    pub fn set_always_on_top(&self, always_on_top: bool) -> WindowResult<()> {
        self.run_on_edt(move |w| {
            w.change_state_flag(ReconfigureFlags::CHANGE_ALWAYS_ON_TOP, always_on_top);
            Ok(())
        })
    }

    fn change_state_flag(&self, change: ReconfigureFlags, value: bool) {
        {
            let _guard = self.lock_window();
            let (changed, fullscreen, visible) = {
                let mut state = self.state();
                let slot = if change == ReconfigureFlags::CHANGE_DECORATION {
                    &mut state.undecorated
                } else {
                    &mut state.always_on_top
                };
                let changed = *slot != value;
                *slot = value;
                (changed, state.fullscreen, state.visible)
            };
            // decorations of a fullscreen window are restored on exit
            let skip = fullscreen && change == ReconfigureFlags::CHANGE_DECORATION;
            if changed && self.is_native_valid() && !skip {
                self.pump();
                let flags = self.reconfigure_flags(change, visible);
                self.reconfigure(self.bounds(), flags);
                self.pump();
            }
        }
        self.send_window_event(WindowEventType::Resized);
    }

    /// Set the window title
    pub fn set_title(&self, title: impl Into<String>) -> WindowResult<()> {
        let title = title.into();
        self.run_on_edt(move |w| {
            w.state().title.clone_from(&title);
            if w.window_handle() != 0 {
                w.driver().set_title(&title);
            }
            Ok(())
        })
    }

    /// Show or hide the pointer over the window
    pub fn set_pointer_visible(&self, visible: bool) -> WindowResult<()> {
        self.run_on_edt(move |w| {
            if w.is_pointer_visible() == visible {
                return Ok(());
            }
            let applied = w.window_handle() == 0 || w.driver().set_pointer_visible(visible);
            if applied {
                w.state().pointer_visible = visible;
            }
            Ok(())
        })
    }

    /// Confine the pointer to the window
    ///
    /// Confining a realized window focuses it and centers the pointer first.
    pub fn confine_pointer(&self, confine: bool) -> WindowResult<()> {
        if self.is_pointer_confined() == confine {
            return Ok(());
        }
        let applied = if self.window_handle() == 0 {
            true
        } else {
            if confine {
                self.request_focus(true)?;
                let size = self.size();
                self.warp_pointer(size.width / 2, size.height / 2)?;
            }
            let applied = self.run_on_edt(move |w| Ok(w.driver().confine_pointer(confine)))?;
            if confine {
                self.sleep_polls(3);
            }
            applied
        };
        if applied {
            self.state().pointer_confined = confine;
        }
        Ok(())
    }

    /// Move the pointer to client coordinates
    pub fn warp_pointer(&self, x: i32, y: i32) -> WindowResult<()> {
        self.run_on_edt(move |w| {
            if w.window_handle() != 0 {
                w.driver().warp_pointer(x, y);
            }
            Ok(())
        })
    }

    /// Show or hide the on-screen keyboard
    pub fn set_keyboard_visible(&self, visible: bool) -> WindowResult<()> {
        self.run_on_edt(move |w| {
            w.apply_keyboard_visible(visible);
            Ok(())
        })
    }

    pub(crate) fn apply_keyboard_visible(&self, visible: bool) {
        let shown = if self.is_native_valid() {
            visible && self.driver().set_keyboard_visible(visible)
        } else {
            visible
        };
        self.state().keyboard_visible = shown;
    }
}
