//! Moving a window between parents
//!
//! [`decide`] is a pure function choosing how a reparent request is carried
//! out; [`Window::reparent_with`] applies the plan under the window lock.
//!
//! Outcomes:
//! - `Nop`: nothing to do
//! - `NativeReparenting`: the driver moves the realized window
//! - `NativeCreation`: the window is (re)created under the new parent
//! - `NativeCreationPending`: creation waits until the window can be realized

use std::thread;
use std::time::Duration;

use super::Window;
use crate::display::Screen;
use crate::driver::{NativeHandle, ReconfigureFlags};
use crate::error::{WindowError, WindowResult};
use crate::events::WindowEventType;
use crate::foundation::geometry::{Point, Rect, Size};
use crate::foundation::logging::TARGET_REPARENT;

/// How a reparent request was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReparentOutcome {
    /// No decision was made
    Invalid,
    /// Already where requested
    Nop,
    /// Creation deferred until the window can be realized
    NativeCreationPending,
    /// Destroyed and created again under the new parent
    NativeCreation,
    /// Moved natively without recreation
    NativeReparenting,
}

/// Where the window is going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparentTarget {
    /// Become a top-level window
    TopLevel,
    /// Become a child of another window
    Child {
        /// Native handle of the new parent, zero if it is not realized
        handle: NativeHandle,
        /// The new parent is the current parent
        same_parent: bool,
        /// The new parent's screen can host this window natively
        compatible_screen: bool,
    },
}

/// Everything [`decide`] looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReparentInputs {
    /// The window currently has a native parent
    pub has_native_parent: bool,
    /// Requested parent
    pub target: ReparentTarget,
    /// Recreate instead of reparenting natively
    pub force: bool,
    /// Client area size after fitting into the new parent
    pub size: Size,
    /// Native resources are realized
    pub realized: bool,
    /// Window is visible
    pub visible: bool,
}

/// What to do for a reparent request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReparentPlan {
    /// Chosen outcome
    pub outcome: ReparentOutcome,
    /// Destroy first; the flag asks to preserve rendering state
    pub destroy: Option<bool>,
    /// Move the window to the new parent's screen
    pub adopt_screen: bool,
}

impl ReparentPlan {
    const fn new(outcome: ReparentOutcome, destroy: Option<bool>, adopt_screen: bool) -> Self {
        Self {
            outcome,
            destroy,
            adopt_screen,
        }
    }
}

const fn creation_by_size(size: Size) -> ReparentOutcome {
    if size.has_area() {
        ReparentOutcome::NativeCreation
    } else {
        ReparentOutcome::NativeCreationPending
    }
}

/// Choose how to carry out a reparent request
pub const fn decide(inputs: &ReparentInputs) -> ReparentPlan {
    match inputs.target {
        ReparentTarget::TopLevel => {
            if !inputs.has_native_parent {
                ReparentPlan::new(ReparentOutcome::Nop, None, false)
            } else if !inputs.realized || inputs.force {
                let preserve = inputs.realized && inputs.visible;
                ReparentPlan::new(creation_by_size(inputs.size), Some(preserve), false)
            } else {
                ReparentPlan::new(ReparentOutcome::NativeReparenting, None, false)
            }
        }
        ReparentTarget::Child {
            handle,
            same_parent,
            compatible_screen,
        } => {
            if handle == 0 {
                ReparentPlan::new(ReparentOutcome::NativeCreationPending, Some(false), true)
            } else if same_parent {
                ReparentPlan::new(ReparentOutcome::Nop, None, false)
            } else if !inputs.realized {
                ReparentPlan::new(creation_by_size(inputs.size), None, true)
            } else if inputs.force || !compatible_screen {
                ReparentPlan::new(ReparentOutcome::NativeCreation, Some(inputs.visible), true)
            } else {
                ReparentPlan::new(ReparentOutcome::NativeReparenting, None, false)
            }
        }
    }
}

impl Window {
    /// Move this window under `parent`, or make it top-level with `None`
    pub fn reparent(&self, parent: Option<&Self>) -> WindowResult<ReparentOutcome> {
        self.reparent_with(parent, false)
    }

    /// [`reparent`](Self::reparent), optionally forcing recreation
    pub fn reparent_with(&self, parent: Option<&Self>, force: bool) -> WindowResult<ReparentOutcome> {
        if parent.is_some_and(|p| p.ptr_eq(self)) {
            return Err(WindowError::InvalidArgument(format!("window {} cannot parent itself", self.id())));
        }
        let parent = parent.cloned();
        self.run_on_edt(move |w| w.reparent_action(parent.as_ref(), force))
    }

    fn reparent_action(&self, new_parent: Option<&Self>, force: bool) -> WindowResult<ReparentOutcome> {
        let hook = self.lifecycle_hook();
        let paused = hook.as_ref().is_some_and(|h| h.pause_rendering_action());
        let result = self.reparent_locked(new_parent, force);
        if paused {
            if let Some(hook) = &hook {
                hook.resume_rendering_action();
            }
        }
        let (outcome, was_visible) = result?;

        if was_visible {
            match outcome {
                ReparentOutcome::NativeReparenting => self.send_window_event(WindowEventType::Resized),
                ReparentOutcome::NativeCreation => {
                    // may run on the new parent's display
                    self.run_on_edt(|w| {
                        let _guard = w.lock_window();
                        w.set_visible_action(true)
                    })?;
                }
                _ => {}
            }
        }
        Ok(outcome)
    }

    fn reparent_locked(&self, new_parent: Option<&Self>, force: bool) -> WindowResult<(ReparentOutcome, bool)> {
        let _guard = self.lock_window();
        let result = self.plan_and_execute(new_parent, force);
        if let Some(hook) = self.lifecycle_hook() {
            hook.reset_counter();
        }
        result
    }

    fn plan_and_execute(&self, new_parent: Option<&Self>, force: bool) -> WindowResult<(ReparentOutcome, bool)> {
        let config_force = self.display().config().force_reparent_recreation;
        let realized = self.is_native_valid();
        let force = force || config_force || (realized && self.is_offscreen_instance(new_parent));
        let was_visible = self.is_visible();
        let old_parent = self.parent();

        let mut bounds = self.bounds();
        let target = match new_parent {
            Some(parent) => {
                bounds = Rect::from_parts(Point::new(0, 0), bounds.size().clamped_to(parent.size()));
                ReparentTarget::Child {
                    handle: parent.surface_handle(),
                    same_parent: old_parent.as_ref().is_some_and(|p| p.ptr_eq(parent)),
                    compatible_screen: self.screen().is_compatible(&parent.screen()),
                }
            }
            None => {
                if old_parent.is_some() {
                    bounds = Rect::from_parts(self.location_on_screen(), bounds.size());
                }
                ReparentTarget::TopLevel
            }
        };
        let inputs = ReparentInputs {
            has_native_parent: self.state().parent_handle != 0,
            target,
            force,
            size: bounds.size(),
            realized,
            visible: was_visible,
        };
        let plan = decide(&inputs);
        log::debug!(target: TARGET_REPARENT, "window {} reparent {:?} -> {:?}", self.id(), inputs, plan);

        if let Some(preserve) = plan.destroy {
            self.destroy_preserving(preserve);
        }
        if plan.adopt_screen {
            if let Some(parent) = new_parent {
                self.adopt_screen(parent.screen())?;
            }
        }
        self.state().parent_handle = match target {
            ReparentTarget::Child { handle, .. } => handle,
            ReparentTarget::TopLevel => 0,
        };

        let mut outcome = plan.outcome;
        if outcome == ReparentOutcome::Invalid {
            return Err(WindowError::Internal(format!("window {} reparent produced no decision", self.id())));
        }

        let parent_changed = match (&old_parent, new_parent) {
            (Some(old), Some(new)) => !old.ptr_eq(new),
            (None, None) => false,
            _ => true,
        };
        if parent_changed {
            if let Some(old) = &old_parent {
                old.remove_child(self);
            }
            self.set_parent(new_parent);
            if let Some(new) = new_parent {
                new.add_child(self);
            }
        }

        match outcome {
            ReparentOutcome::Invalid | ReparentOutcome::Nop => {}
            ReparentOutcome::NativeCreationPending => {
                self.define_position(bounds.x, bounds.y);
                self.define_size(bounds.width, bounds.height);
                if was_visible {
                    self.state().visible_requested = true;
                }
            }
            ReparentOutcome::NativeCreation => {
                self.define_position(bounds.x, bounds.y);
                self.define_size(bounds.width, bounds.height);
            }
            ReparentOutcome::NativeReparenting => {
                if !self.reparent_natively(new_parent, bounds, was_visible) {
                    log::warn!(
                        target: TARGET_REPARENT,
                        "window {} native reparenting failed, recreating",
                        self.id()
                    );
                    self.destroy_preserving(was_visible);
                    outcome = ReparentOutcome::NativeCreation;
                }
            }
        }
        log::info!(target: TARGET_REPARENT, "window {} reparented: {:?}", self.id(), outcome);
        Ok((outcome, was_visible))
    }

    /// Returns `false` if the driver could not move the window
    ///
    /// A parent whose surface cannot be locked also yields `false`; the
    /// caller then recreates the window under the parent instead.
    fn reparent_natively(&self, new_parent: Option<&Self>, bounds: Rect, was_visible: bool) -> bool {
        let timeout = self.native_timeout();
        self.pump();
        if was_visible {
            let flags = self.reconfigure_flags(ReconfigureFlags::CHANGE_VISIBILITY, false);
            self.reconfigure(bounds, flags);
            if let Err(e) = self.wait_for_visible(false, false, timeout) {
                log::warn!(target: TARGET_REPARENT, "window {} hide before reparent: {}", self.id(), e);
            }
            thread::sleep(self.reparent_settle());
            self.pump();
        }

        if let Some(parent) = new_parent {
            if !parent.lock_surface().is_ready() {
                log::warn!(target: TARGET_REPARENT, "window {} parent {} surface not ready", self.id(), parent.id());
                self.keep_bounds(bounds);
                return false;
            }
            self.state().parent_handle = parent.window_handle();
        }
        let flags = self.reconfigure_flags(
            ReconfigureFlags::CHANGE_PARENTING | ReconfigureFlags::CHANGE_DECORATION,
            self.is_visible(),
        );
        let mut ok = self.reconfigure(bounds, flags);
        if let Some(parent) = new_parent {
            if let Err(e) = parent.unlock_surface() {
                log::error!(target: TARGET_REPARENT, "window {} parent unlock: {}", self.id(), e);
            }
        }
        // some window managers never report the new position
        self.define_position(bounds.x, bounds.y);

        if ok {
            self.pump();
            if was_visible {
                let flags = self.reconfigure_flags(ReconfigureFlags::CHANGE_VISIBILITY, true);
                self.reconfigure(bounds, flags);
                ok = matches!(self.wait_for_visible(true, false, timeout), Ok(Some(_)));
                if ok {
                    ok = matches!(self.wait_for_size(bounds.width, bounds.height, false, timeout), Ok(true));
                }
                if ok {
                    self.request_focus_native(false);
                    self.pump();
                }
            }
        }
        if !ok || !was_visible {
            self.keep_bounds(bounds);
        }
        ok
    }

    fn keep_bounds(&self, bounds: Rect) {
        self.define_position(bounds.x, bounds.y);
        self.define_size(bounds.width, bounds.height);
    }

    fn reparent_settle(&self) -> Duration {
        Duration::from_millis(self.display().config().reparent_settle_ms)
    }

    /// Move an unrealized window to `screen`, replacing the driver when the
    /// display connection changes
    fn adopt_screen(&self, screen: Screen) -> WindowResult<()> {
        self.remove_screen_reference();
        let current = self.screen();
        if current.ptr_eq(&screen) {
            return Ok(());
        }
        if !current.display().ptr_eq(screen.display()) {
            let requested = self.requested_capabilities();
            let factory = screen.display().factory();
            let chosen = factory.choose_capabilities(&requested);
            let driver = factory.create_window_driver(&chosen)?;
            let broken_focus_change = driver.has_broken_focus_change();
            *self.shared.driver.lock() = driver;
            let mut state = self.state();
            state.chosen_caps = chosen;
            state.broken_focus_change = broken_focus_change;
        }
        log::debug!(target: TARGET_REPARENT, "window {} moves to screen {}", self.id(), screen.index());
        self.state().screen = screen;
        Ok(())
    }
}
