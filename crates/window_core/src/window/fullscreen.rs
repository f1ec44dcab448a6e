//! Fullscreen transitions and monitor mode changes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use super::{Window, WindowShared};
use crate::display::{MonitorDevice, MonitorModeEvent, MonitorModeListener};
use crate::driver::ReconfigureFlags;
use crate::error::{WindowError, WindowResult};
use crate::events::WindowEventType;
use crate::foundation::geometry::{Point, Rect};
use crate::foundation::logging::TARGET_WINDOW;

/// Geometry saved when entering fullscreen
#[derive(Debug, Clone, Default)]
pub struct FullscreenSnapshot {
    /// Client area before entering fullscreen
    pub bounds: Rect,
    /// Parent an off-screen child was detached from, reattached on exit
    pub parent: Option<Window>,
}

impl Window {
    /// Enter or leave fullscreen on the main monitor; returns the resulting
    /// fullscreen state
    ///
    /// For an unrealized window the request is recorded and applied when the
    /// window is realized.
    pub fn set_fullscreen(&self, fullscreen: bool) -> WindowResult<bool> {
        self.set_fullscreen_impl(fullscreen, true, None)
    }

    /// Enter fullscreen spanning `monitors`
    pub fn set_fullscreen_on(&self, monitors: Vec<MonitorDevice>) -> WindowResult<bool> {
        if monitors.is_empty() {
            return Err(WindowError::InvalidArgument(format!(
                "window {} fullscreen needs at least one monitor",
                self.id()
            )));
        }
        self.set_fullscreen_impl(true, false, Some(monitors))
    }

    fn set_fullscreen_impl(
        &self,
        fullscreen: bool,
        use_main_monitor: bool,
        monitors: Option<Vec<MonitorDevice>>,
    ) -> WindowResult<bool> {
        let _serial = self.shared.fullscreen_lock.guard();
        if !self.is_native_valid() {
            let mut state = self.state();
            state.fullscreen = fullscreen;
            state.fullscreen_monitors = monitors;
            state.fullscreen_use_main_monitor = use_main_monitor;
            return Ok(fullscreen);
        }
        if self.is_fullscreen() == fullscreen {
            return Ok(fullscreen);
        }

        let parent = self.parent();
        if fullscreen && self.is_offscreen_instance(parent.as_ref()) {
            let Some(parent) = parent else {
                return Err(WindowError::Internal(format!(
                    "off-screen window {} without parent cannot go fullscreen",
                    self.id()
                )));
            };
            log::debug!(target: TARGET_WINDOW, "window {} detaching from off-screen parent {}", self.id(), parent.id());
            self.state().nfs.parent = Some(parent);
            self.reparent_with(None, true)?;
        }

        self.run_on_edt(move |w| w.fullscreen_action(fullscreen, use_main_monitor, monitors))?;

        if !fullscreen {
            let detached = self.state().nfs.parent.take();
            if let Some(parent) = detached {
                self.reparent_with(Some(&parent), true)?;
            }
        }
        if self.is_visible() {
            let skip_hook = self.is_fullscreen();
            self.request_focus_with(true, skip_hook, true)?;
        }
        Ok(self.is_fullscreen())
    }

    pub(crate) fn fullscreen_action(
        &self,
        fullscreen: bool,
        use_main_monitor: bool,
        monitors: Option<Vec<MonitorDevice>>,
    ) -> WindowResult<()> {
        {
            let _guard = self.lock_window();
            let (bounds, span) = if fullscreen {
                let monitors = match monitors {
                    Some(monitors) => monitors,
                    None if use_main_monitor => vec![self.main_monitor()],
                    None => self.screen().monitors(),
                };
                let viewport = MonitorDevice::union_of_viewports(&monitors).ok_or_else(|| {
                    WindowError::InvalidArgument(format!("window {} fullscreen without monitors", self.id()))
                })?;
                let mut state = self.state();
                state.nfs.bounds = state.bounds();
                state.fullscreen = true;
                (viewport, monitors.len() > 1)
            } else {
                let mut bounds = {
                    let mut state = self.state();
                    state.fullscreen = false;
                    state.nfs.bounds
                };
                if let Some(parent) = self.parent() {
                    bounds = Rect::from_parts(Point::new(0, 0), bounds.size().clamped_to(parent.size()));
                }
                (bounds, false)
            };
            log::info!(
                target: TARGET_WINDOW,
                "window {} fullscreen {} -> {:?} (span {})",
                self.id(),
                fullscreen,
                bounds,
                span
            );

            self.pump();
            let was_visible = self.is_visible();
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
            let mut change = ReconfigureFlags::CHANGE_FULLSCREEN | ReconfigureFlags::CHANGE_DECORATION;
            if parent.is_some() {
                change |= ReconfigureFlags::CHANGE_PARENTING;
            }
            if span {
                change |= ReconfigureFlags::IS_FULLSCREEN_SPAN;
            }
            let flags = self.reconfigure_flags(change, was_visible);
            self.reconfigure(bounds, flags);
            if let Some(parent) = &parent {
                parent.unlock_surface()?;
            }
            self.pump();

            if was_visible {
                let flags = self.reconfigure_flags(ReconfigureFlags::CHANGE_VISIBILITY, true);
                self.reconfigure(bounds, flags);
                let timeout = self.native_timeout();
                self.wait_for_visible(true, false, timeout)?;
                self.pump();
                self.wait_for_size(bounds.width, bounds.height, false, timeout)?;
                self.pump();
            }
        }
        self.send_window_event(WindowEventType::Resized);
        Ok(())
    }
}

/// Keeps a window fitted to its monitor across mode changes
pub(crate) struct WindowMonitorListener {
    window: Weak<WindowShared>,
    paused: AtomicBool,
}

impl WindowMonitorListener {
    pub(crate) const fn new(window: Weak<WindowShared>) -> Self {
        Self {
            window,
            paused: AtomicBool::new(false),
        }
    }

    fn window(&self) -> Option<Window> {
        self.window.upgrade().map(Window::from_shared)
    }
}

impl MonitorModeListener for WindowMonitorListener {
    fn monitor_mode_change_notify(&self, _event: &MonitorModeEvent) {
        let Some(window) = self.window() else {
            return;
        };
        if let Some(hook) = window.lifecycle_hook() {
            self.paused.store(hook.pause_rendering_action(), Ordering::SeqCst);
        }
    }

    fn monitor_mode_changed(&self, event: &MonitorModeEvent, success: bool) {
        let Some(window) = self.window() else {
            return;
        };
        let hook = window.lifecycle_hook();
        if success {
            if !self.paused.load(Ordering::SeqCst) {
                if let Some(hook) = &hook {
                    self.paused.store(hook.pause_rendering_action(), Ordering::SeqCst);
                }
            }
            if !window.is_fullscreen() {
                let main = window.main_monitor();
                if main.id == event.monitor.id {
                    let bounds = window.bounds();
                    let fitted = main.viewport.intersection(&bounds);
                    if bounds.width > fitted.width || bounds.height > fitted.height {
                        log::debug!(
                            target: TARGET_WINDOW,
                            "window {} shrinks to {}x{} on monitor {}",
                            window.id(),
                            fitted.width,
                            fitted.height,
                            main.id
                        );
                        if let Err(e) = window.set_size(fitted.width, fitted.height) {
                            log::warn!(target: TARGET_WINDOW, "window {} fit to monitor: {}", window.id(), e);
                        }
                    }
                }
            }
        }
        if self.paused.swap(false, Ordering::SeqCst) {
            if let Some(hook) = &hook {
                hook.resume_rendering_action();
            }
        }
        window.send_window_event(WindowEventType::Resized);
    }
}
