//! Realization, visibility and destruction
//!
//! A window is realized by its first successful show and may cycle between
//! realized and unrealized any number of times. Showing a window that cannot
//! be realized yet (zero size, parent not realized, driver failure) records
//! the intent; the intent is honored by a later resize, by the parent's
//! realization or by another show.

use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use super::Window;
use crate::driver::{CreateRequest, ReconfigureFlags};
use crate::error::{WindowError, WindowResult};
use crate::events::WindowEventType;
use crate::foundation::logging::TARGET_WINDOW;

/// Behavior on a window manager close request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClosingMode {
    /// Destroy the window
    #[default]
    DisposeOnClose,
    /// Only notify listeners
    DoNothingOnClose,
}

/// Action run instead of [`Window::destroy`] on a close request
pub type DestroyNotifyAction = Arc<dyn Fn(&Window) + Send + Sync>;

/// Rendering collaborator notified around lifecycle transitions
///
/// Every method defaults to doing nothing.
#[allow(unused_variables)]
pub trait LifecycleHook: Send + Sync {
    /// A visibility change finished; reset frame counters
    fn reset_counter(&self) {}

    /// Called at the end of a visibility change, still under the window lock
    fn set_visible_action_post(&self, visible: bool, native_created: bool) {}

    /// The window is about to be destroyed but will be shown again; keep
    /// whatever rendering state can survive recreation
    fn preserve_surface_at_destroy(&self) {}

    /// Destruction starts, window lock not yet taken
    fn destroy_action_pre_lock(&self) {}

    /// Destruction in progress under the window lock, before the native
    /// window is closed
    fn destroy_action_in_lock(&self) {}

    /// Pause rendering; returns whether it was running
    fn pause_rendering_action(&self) -> bool {
        false
    }

    /// Resume rendering paused by [`pause_rendering_action`](Self::pause_rendering_action)
    fn resume_rendering_action(&self) {}
}

/// Gatekeeper for native focus requests
pub trait FocusHook: Send + Sync {
    /// Return `true` if the request was handled and must not reach the
    /// driver
    fn focus_requested(&self, window: &Window) -> bool;
}

impl Window {
    /// Show or hide the window and wait for the outcome
    pub fn set_visible(&self, visible: bool) -> WindowResult<()> {
        self.set_visible_wait(true, visible)
    }

    /// Show or hide the window; `wait` blocks until the serialization
    /// thread ran the change
    pub fn set_visible_wait(&self, wait: bool, visible: bool) -> WindowResult<()> {
        log::debug!(target: TARGET_WINDOW, "window {} set visible {} (wait {})", self.id(), visible, wait);
        if wait {
            self.run_on_edt(move |w| w.set_visible_action(visible))
        } else {
            self.run_on_edt_detached(move |w| w.set_visible_action(visible))
        }
    }

    pub(crate) fn set_visible_action(&self, visible: bool) -> WindowResult<()> {
        let hook = self.lifecycle_hook();
        let mut created = false;
        let mut made_visible = false;
        {
            let _guard = self.lock_window();
            let result = self.apply_visibility(visible, hook.as_deref(), &mut created, &mut made_visible);
            if let Some(hook) = &hook {
                hook.reset_counter();
            }
            result?;
        }
        if created || made_visible {
            self.send_window_event(WindowEventType::Resized);
        }
        Ok(())
    }

    fn apply_visibility(
        &self,
        visible: bool,
        hook: Option<&dyn LifecycleHook>,
        created: &mut bool,
        made_visible: &mut bool,
    ) -> WindowResult<()> {
        if !visible {
            for child in self.children() {
                if let Err(e) = child.set_visible_action(false) {
                    log::warn!(target: TARGET_WINDOW, "window {} hiding child {}: {}", self.id(), child.id(), e);
                }
            }
        }

        let valid = self.is_native_valid();
        let current = self.is_visible();
        if !valid && visible {
            self.state().visible_requested = true;
            let parent_ready = self.parent().map_or(true, |p| p.is_native_valid());
            if !parent_ready {
                log::debug!(target: TARGET_WINDOW, "window {} show pending: parent not realized", self.id());
            } else if self.size().has_area() {
                *created = self.create_native()?;
                *made_visible = *created;
            } else {
                log::debug!(target: TARGET_WINDOW, "window {} show pending: zero size", self.id());
            }
        } else {
            self.state().visible_requested = visible;
            if valid && current != visible {
                self.reconfigure_visibility(visible);
                self.wait_for_visible(visible, false, self.native_timeout())?;
                *made_visible = visible;
            }
        }

        if let Some(hook) = hook {
            hook.set_visible_action_post(visible, *created);
        }

        if visible && self.is_native_valid() {
            for child in self.children() {
                let show = child.state().visible_requested || child.is_native_valid();
                if !show {
                    continue;
                }
                if let Err(e) = child.set_visible_action(true) {
                    log::warn!(target: TARGET_WINDOW, "window {} showing child {}: {}", self.id(), child.id(), e);
                }
            }
        }
        Ok(())
    }

    /// Realize the native window
    ///
    /// Returns whether the window is realized afterwards. Driver failures
    /// leave it unrealized; an unlockable parent surface is an error.
    pub(crate) fn create_native(&self) -> WindowResult<bool> {
        let parent = self.parent();
        if let Some(parent) = &parent {
            if !parent.lock_surface().is_ready() {
                return Err(WindowError::ParentNotReady(format!(
                    "window {} cannot lock parent {}",
                    self.id(),
                    parent.id()
                )));
            }
        }
        let result = self.create_native_with_parent_locked(parent.as_ref());
        if let Some(parent) = &parent {
            if let Err(e) = parent.unlock_surface() {
                log::error!(target: TARGET_WINDOW, "window {} parent unlock: {}", self.id(), e);
            }
        }

        if result? {
            let skip_hook = self.is_fullscreen();
            self.request_focus_native(skip_hook);
            self.pump();
        }
        Ok(self.is_native_valid())
    }

    /// Returns whether creation completed far enough to request focus
    fn create_native_with_parent_locked(&self, parent: Option<&Self>) -> WindowResult<bool> {
        if let Some(parent) = parent {
            let (auto, position) = {
                let state = self.state();
                (state.auto_position, state.position)
            };
            if auto || position.x < 0 || position.y < 0 {
                self.define_position(0, 0);
            }
            let parent_handle = parent.window_handle();
            self.state().parent_handle = parent_handle;
            if parent_handle == 0 {
                return Ok(false);
            }
        }

        self.add_screen_reference();
        let driver = self.driver();
        if !driver.can_create_native() {
            log::debug!(target: TARGET_WINDOW, "window {} driver cannot create yet", self.id());
            return Ok(false);
        }

        let flags = self.reconfigure_flags(ReconfigureFlags::empty(), true);
        let (position, size, parent_handle, title, caps, pointer_visible, pointer_confined, keyboard_visible) = {
            let mut state = self.state();
            state.realizing = true;
            (
                (!state.auto_position).then_some(state.position),
                state.size,
                state.parent_window_handle(),
                state.title.clone(),
                state.chosen_caps.clone(),
                state.pointer_visible,
                state.pointer_confined,
                state.keyboard_visible,
            )
        };
        let request = CreateRequest {
            position,
            size,
            parent_handle,
            flags,
            title: &title,
            capabilities: &caps,
        };
        log::debug!(target: TARGET_WINDOW, "window {} create native {:?}", self.id(), request);

        let handle = driver.create_native(&request, &self.notifier());
        let handle = {
            let mut state = self.state();
            state.realizing = false;
            match handle {
                Some(handle) if handle != 0 => {
                    state.handle = handle;
                    state.destroyed = false;
                    handle
                }
                _ => {
                    drop(state);
                    log::warn!(target: TARGET_WINDOW, "window {} native creation failed", self.id());
                    return Ok(false);
                }
            }
        };
        log::info!(target: TARGET_WINDOW, "window {} realized, handle {:#x}", self.id(), handle);

        self.screen()
            .add_monitor_mode_listener(Arc::clone(&self.shared.monitor_listener));
        driver.set_title(&title);
        driver.set_pointer_visible(pointer_visible);
        driver.confine_pointer(pointer_confined);
        self.apply_keyboard_visible(keyboard_visible);

        let timeout = self.native_timeout();
        if self.wait_for_visible(true, false, timeout)?.is_none() {
            return Ok(false);
        }
        let fullscreen = {
            let mut state = self.state();
            if state.fullscreen {
                state.fullscreen = false;
                Some((state.fullscreen_use_main_monitor, state.fullscreen_monitors.take()))
            } else {
                None
            }
        };
        match fullscreen {
            Some((use_main_monitor, monitors)) => {
                self.state().fullscreen_use_main_monitor = true;
                self.fullscreen_action(true, use_main_monitor, monitors)?;
            }
            None => {
                let custom = position.is_some();
                let target = position.unwrap_or_default();
                self.wait_for_position(custom, target.x, target.y, timeout);
            }
        }
        Ok(true)
    }

    /// Release native resources; the window stays usable and may be shown
    /// again
    ///
    /// Never fails: problems are logged.
    pub fn destroy(&self) {
        // keep a concurrent show from resurrecting the window mid-destroy
        self.state().visible = false;
        let result = self.run_on_edt(|w| {
            w.destroy_action();
            Ok(())
        });
        if let Err(e) = result {
            log::error!(target: TARGET_WINDOW, "window {} destroy: {}", self.id(), e);
        }
    }

    /// [`destroy`](Self::destroy), asking the lifecycle hook to preserve
    /// rendering state first when `preserve` is set
    pub fn destroy_preserving(&self, preserve: bool) {
        if preserve {
            if let Some(hook) = self.lifecycle_hook() {
                hook.preserve_surface_at_destroy();
            }
        }
        self.destroy();
    }

    fn destroy_action(&self) {
        let hook = self.lifecycle_hook();
        let paused = hook.as_ref().is_some_and(|h| h.pause_rendering_action());
        if let Some(hook) = &hook {
            hook.destroy_action_pre_lock();
        }
        {
            let _guard = self.lock_window();
            log::debug!(target: TARGET_WINDOW, "window {} destroy, realized {}", self.id(), self.is_native_valid());
            self.send_window_event(WindowEventType::DestroyNotify);

            for child in self.children() {
                child.window_destroy_notify(true);
            }

            if let Some(hook) = &hook {
                hook.destroy_action_in_lock();
            }

            if self.is_native_valid() {
                self.screen()
                    .remove_monitor_mode_listener(&self.shared.monitor_listener);
                if !self.driver().close_native() {
                    log::warn!(target: TARGET_WINDOW, "window {} native close failed", self.id());
                }
            }
            self.remove_screen_reference();
            self.send_window_event(WindowEventType::Destroyed);

            let mut state = self.state();
            state.handle = 0;
            state.destroyed = true;
            state.realizing = false;
            state.visible = false;
            state.visible_requested = false;
            state.fullscreen = false;
            state.fullscreen_monitors = None;
            state.fullscreen_use_main_monitor = true;
            state.has_focus = false;
            state.parent_handle = 0;
        }
        if paused {
            if let Some(hook) = &hook {
                hook.resume_rendering_action();
            }
        }
    }

    /// Handle a close request from the window manager
    ///
    /// With `force` the window is disposed regardless of its closing mode.
    /// Runs the installed destroy-notify action instead of
    /// [`destroy`](Self::destroy) if there is one. Returns `true` if the
    /// window is no longer realized.
    pub fn window_destroy_notify(&self, force: bool) -> bool {
        if !self.is_native_valid() {
            return true;
        }
        let default_mode = self.closing_mode();
        let mode = if force { ClosingMode::DisposeOnClose } else { default_mode };
        log::debug!(
            target: TARGET_WINDOW,
            "window {} destroy notify, force {}, mode {:?} -> {:?}",
            self.id(),
            force,
            default_mode,
            mode
        );

        match mode {
            ClosingMode::DisposeOnClose => {
                if force {
                    self.set_closing_mode(mode);
                }
                let action = self.shared.destroy_notify_action.lock().clone();
                match action {
                    Some(action) => action(self),
                    None => self.destroy(),
                }
                if force {
                    self.set_closing_mode(default_mode);
                }
            }
            ClosingMode::DoNothingOnClose => self.send_window_event(WindowEventType::DestroyNotify),
        }
        !self.is_native_valid()
    }

    /// Sleep for `count` poll intervals
    pub(crate) fn sleep_polls(&self, count: u32) {
        thread::sleep(self.poll_interval() * count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closing_mode_default_and_serde() {
        assert_eq!(ClosingMode::default(), ClosingMode::DisposeOnClose);
        let text = ron::to_string(&ClosingMode::DoNothingOnClose).unwrap();
        let back: ClosingMode = ron::from_str(&text).unwrap();
        assert_eq!(back, ClosingMode::DoNothingOnClose);
    }
}
