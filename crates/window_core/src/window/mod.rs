//! Native window lifecycle controller
//!
//! A [`Window`] is a cheap handle to shared state; clones refer to the same
//! window. Every mutating operation is marshaled onto the display's
//! serialization thread (or runs inline when the caller already owns the
//! window lock) and executes under the reentrant window lock.
//!
//! Locking order:
//! 1. window lock ([`RecursiveLock`] inside the [`SurfaceLock`])
//! 2. parent surface lock, only for the duration of one native call
//! 3. the short-lived state mutex, never held across driver calls, listener
//!    callbacks or waits
//!
//! Child windows are owned by their parent and destroyed with it; the parent
//! back-reference is weak.

pub mod dispatch;
pub mod fullscreen;
pub mod lifecycle;
pub mod notifier;
pub mod reparent;
pub mod wait;

mod attributes;
mod placement;

#[cfg(test)]
mod tests;

pub use fullscreen::FullscreenSnapshot;
pub use lifecycle::{ClosingMode, DestroyNotifyAction, FocusHook, LifecycleHook};
pub use notifier::WindowNotifier;
pub use reparent::{ReparentInputs, ReparentOutcome, ReparentPlan, ReparentTarget};

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::display::{Display, MonitorDevice, MonitorModeListener, Screen};
use crate::driver::{Capabilities, NativeHandle, ReconfigureFlags, WindowDriver};
use crate::error::WindowResult;
use crate::events::{KeyListener, ListenerList, MouseListener, WindowId, WindowListener};
use crate::foundation::geometry::{Insets, Point, Rect, Size};
use crate::foundation::logging::TARGET_WINDOW;
use crate::input::{KeyTracker, MouseTracker};
use crate::sync::{LockState, RecursiveLock, SurfaceLock, SurfaceLockStatus};

use dispatch::EventCoalescer;
use fullscreen::WindowMonitorListener;

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

/// Default client area position of a new window
pub const DEFAULT_POSITION: Point = Point::new(64, 64);
/// Default client area size of a new window
pub const DEFAULT_SIZE: Size = Size::new(128, 128);

/// Observable lifecycle state, derived from the window's flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Never realized
    Unrealized,
    /// Native creation in progress
    Realizing,
    /// Realized and confirmed visible
    RealizedVisible,
    /// Realized but hidden
    RealizedHidden,
    /// Native resources released; a later show may realize it again
    Destroyed,
}

struct WindowState {
    screen: Screen,
    screen_referenced: bool,
    requested_caps: Capabilities,
    chosen_caps: Capabilities,

    handle: NativeHandle,
    parent_handle: NativeHandle,
    realizing: bool,
    destroyed: bool,

    visible: bool,
    visible_requested: bool,
    has_focus: bool,
    broken_focus_change: bool,

    fullscreen: bool,
    fullscreen_monitors: Option<Vec<MonitorDevice>>,
    fullscreen_use_main_monitor: bool,
    nfs: FullscreenSnapshot,

    undecorated: bool,
    always_on_top: bool,
    pointer_visible: bool,
    pointer_confined: bool,
    keyboard_visible: bool,

    auto_position: bool,
    position: Point,
    size: Size,
    insets: Insets,
    title: String,
    closing_mode: ClosingMode,
}

impl WindowState {
    fn new(screen: Screen, requested_caps: Capabilities, chosen_caps: Capabilities, broken_focus_change: bool) -> Self {
        Self {
            screen,
            screen_referenced: false,
            requested_caps,
            chosen_caps,
            handle: 0,
            parent_handle: 0,
            realizing: false,
            destroyed: false,
            visible: false,
            visible_requested: false,
            has_focus: false,
            broken_focus_change,
            fullscreen: false,
            fullscreen_monitors: None,
            fullscreen_use_main_monitor: true,
            nfs: FullscreenSnapshot::default(),
            undecorated: false,
            always_on_top: false,
            pointer_visible: true,
            pointer_confined: false,
            keyboard_visible: false,
            auto_position: true,
            position: DEFAULT_POSITION,
            size: DEFAULT_SIZE,
            insets: Insets::ZERO,
            title: "window_core".to_string(),
            closing_mode: ClosingMode::default(),
        }
    }

    const fn parent_window_handle(&self) -> NativeHandle {
        if self.fullscreen {
            0
        } else {
            self.parent_handle
        }
    }

    const fn is_undecorated(&self) -> bool {
        self.parent_handle != 0 || self.undecorated || self.fullscreen
    }

    const fn bounds(&self) -> Rect {
        Rect::from_parts(self.position, self.size)
    }
}

pub(crate) struct WindowShared {
    id: WindowId,
    surface: SurfaceLock,
    fullscreen_lock: RecursiveLock,
    state: Mutex<WindowState>,
    driver: Mutex<Arc<dyn WindowDriver>>,
    parent: Mutex<Weak<WindowShared>>,
    children: Mutex<Vec<Window>>,

    window_listeners: ListenerList<dyn WindowListener>,
    mouse_listeners: ListenerList<dyn MouseListener>,
    key_listeners: ListenerList<dyn KeyListener>,
    keyboard_focus_handler: Mutex<Option<Arc<dyn KeyListener>>>,
    focus_hook: Mutex<Option<Arc<dyn FocusHook>>>,
    lifecycle_hook: Mutex<Option<Arc<dyn LifecycleHook>>>,
    destroy_notify_action: Mutex<Option<DestroyNotifyAction>>,

    coalescer: Mutex<EventCoalescer>,
    mouse: Mutex<MouseTracker>,
    keys: Mutex<KeyTracker>,
    monitor_listener: Arc<dyn MonitorModeListener>,
}

/// Handle to a native window; clones share the window
#[derive(Clone)]
pub struct Window {
    shared: Arc<WindowShared>,
}

/// Scoped ownership of one window lock level
///
/// Dropping the outermost guard delivers events that were coalesced while
/// the lock was held. Must be dropped on the thread that created it.
pub struct WindowLockGuard<'a> {
    window: &'a Window,
    _not_send: PhantomData<*const ()>,
}

impl Drop for WindowLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.window.shared.surface.window_lock().unlock() {
            log::error!(target: TARGET_WINDOW, "window {} unlock: {}", self.window.id(), e);
        }
        self.window.flush_coalesced_events();
    }
}

impl Window {
    /// Create an unrealized top-level window on `screen`
    pub fn create(screen: &Screen, capabilities: Capabilities) -> WindowResult<Self> {
        let display = screen.display();
        let chosen = display.factory().choose_capabilities(&capabilities);
        let driver = display.factory().create_window_driver(&chosen)?;
        let broken_focus_change = driver.has_broken_focus_change();
        let state = WindowState::new(screen.clone(), capabilities, chosen, broken_focus_change);

        let shared = Arc::new_cyclic(|weak: &Weak<WindowShared>| WindowShared {
            id: NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed),
            surface: SurfaceLock::new(),
            fullscreen_lock: RecursiveLock::new(),
            state: Mutex::new(state),
            driver: Mutex::new(driver),
            parent: Mutex::new(Weak::new()),
            children: Mutex::new(Vec::new()),
            window_listeners: ListenerList::new(),
            mouse_listeners: ListenerList::new(),
            key_listeners: ListenerList::new(),
            keyboard_focus_handler: Mutex::new(None),
            focus_hook: Mutex::new(None),
            lifecycle_hook: Mutex::new(None),
            destroy_notify_action: Mutex::new(None),
            coalescer: Mutex::new(EventCoalescer::default()),
            mouse: Mutex::new(MouseTracker::new()),
            keys: Mutex::new(KeyTracker::new()),
            monitor_listener: Arc::new(WindowMonitorListener::new(weak.clone())),
        });
        let window = Self { shared };
        log::debug!(target: TARGET_WINDOW, "created window {} on screen {}", window.id(), screen.index());
        Ok(window)
    }

    /// Create an unrealized child window of `parent`, on the parent's screen
    pub fn create_child(parent: &Self, capabilities: Capabilities) -> WindowResult<Self> {
        let window = Self::create(&parent.screen(), capabilities)?;
        window.set_parent(Some(parent));
        parent.add_child(&window);
        Ok(window)
    }

    fn state(&self) -> MutexGuard<'_, WindowState> {
        self.shared.state.lock()
    }

    pub(crate) fn from_shared(shared: Arc<WindowShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<WindowShared> {
        Arc::downgrade(&self.shared)
    }

    /// Process-unique identifier, used as event source
    pub fn id(&self) -> WindowId {
        self.shared.id
    }

    /// Same window
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Screen the window lives on
    pub fn screen(&self) -> Screen {
        self.state().screen.clone()
    }

    /// Display connection of the window's screen
    pub fn display(&self) -> Display {
        self.state().screen.display().clone()
    }

    pub(crate) fn driver(&self) -> Arc<dyn WindowDriver> {
        Arc::clone(&self.shared.driver.lock())
    }

    /// Notifier a driver reports native state changes through
    pub fn notifier(&self) -> WindowNotifier {
        WindowNotifier::new(self)
    }

    // ------------------------------------------------------------------
    // State queries

    /// Native handle, zero while unrealized
    pub fn window_handle(&self) -> NativeHandle {
        self.state().handle
    }

    /// Native parent handle; zero for top-level and fullscreen windows
    pub fn parent_window_handle(&self) -> NativeHandle {
        self.state().parent_window_handle()
    }

    /// True while native resources are realized
    pub fn is_native_valid(&self) -> bool {
        self.state().handle != 0
    }

    /// Confirmed native visibility
    pub fn is_visible(&self) -> bool {
        self.state().visible
    }

    /// True while a show request waits for realization
    pub fn is_visible_pending(&self) -> bool {
        let state = self.state();
        state.visible_requested && !state.visible
    }

    /// Keyboard focus as last reported by the driver
    pub fn has_focus(&self) -> bool {
        self.state().has_focus
    }

    /// Fullscreen, or fullscreen requested for creation
    pub fn is_fullscreen(&self) -> bool {
        self.state().fullscreen
    }

    /// True for child, explicitly undecorated and fullscreen windows
    pub fn is_undecorated(&self) -> bool {
        self.state().is_undecorated()
    }

    /// Always-on-top flag
    pub fn is_always_on_top(&self) -> bool {
        self.state().always_on_top
    }

    /// Pointer visibility
    pub fn is_pointer_visible(&self) -> bool {
        self.state().pointer_visible
    }

    /// Pointer confinement
    pub fn is_pointer_confined(&self) -> bool {
        self.state().pointer_confined
    }

    /// On-screen keyboard visibility
    pub fn is_keyboard_visible(&self) -> bool {
        self.state().keyboard_visible
    }

    /// True until a position is set or reported by the window manager
    pub fn is_auto_position(&self) -> bool {
        self.state().auto_position
    }

    /// True if the driver's focus notifications are unreliable
    pub fn has_broken_focus_change(&self) -> bool {
        self.state().broken_focus_change
    }

    /// Client area x
    pub fn x(&self) -> i32 {
        self.state().position.x
    }

    /// Client area y
    pub fn y(&self) -> i32 {
        self.state().position.y
    }

    /// Client area width
    pub fn width(&self) -> i32 {
        self.state().size.width
    }

    /// Client area height
    pub fn height(&self) -> i32 {
        self.state().size.height
    }

    /// Client area position
    pub fn position(&self) -> Point {
        self.state().position
    }

    /// Client area size
    pub fn size(&self) -> Size {
        self.state().size
    }

    /// Client area rectangle
    pub fn bounds(&self) -> Rect {
        self.state().bounds()
    }

    /// Window title
    pub fn title(&self) -> String {
        self.state().title.clone()
    }

    /// Capabilities asked for at construction
    pub fn requested_capabilities(&self) -> Capabilities {
        self.state().requested_caps.clone()
    }

    /// Capabilities the driver chose
    pub fn chosen_capabilities(&self) -> Capabilities {
        self.state().chosen_caps.clone()
    }

    /// True if this window or `parent` is backed by an off-screen surface
    pub(crate) fn is_offscreen_instance(&self, parent: Option<&Self>) -> bool {
        !self.state().chosen_caps.onscreen || parent.is_some_and(|p| !p.state().chosen_caps.onscreen)
    }

    /// Geometry saved when fullscreen was entered
    pub fn fullscreen_snapshot(&self) -> FullscreenSnapshot {
        self.state().nfs.clone()
    }

    /// Derived lifecycle state
    pub fn lifecycle_state(&self) -> LifecycleState {
        let state = self.state();
        if state.realizing {
            LifecycleState::Realizing
        } else if state.handle != 0 {
            if state.visible {
                LifecycleState::RealizedVisible
            } else {
                LifecycleState::RealizedHidden
            }
        } else if state.destroyed {
            LifecycleState::Destroyed
        } else {
            LifecycleState::Unrealized
        }
    }

    /// What to do when the window manager asks to close the window
    pub fn closing_mode(&self) -> ClosingMode {
        self.state().closing_mode
    }

    /// Change the close request behavior; returns the previous mode
    pub fn set_closing_mode(&self, mode: ClosingMode) -> ClosingMode {
        std::mem::replace(&mut self.state().closing_mode, mode)
    }

    // ------------------------------------------------------------------
    // Window tree

    /// Parent window, if any
    pub fn parent(&self) -> Option<Self> {
        self.shared.parent.lock().upgrade().map(Self::from_shared)
    }

    /// Snapshot of the child windows
    pub fn children(&self) -> Vec<Self> {
        self.shared.children.lock().clone()
    }

    /// Number of child windows
    pub fn child_count(&self) -> usize {
        self.shared.children.lock().len()
    }

    fn set_parent(&self, parent: Option<&Self>) {
        *self.shared.parent.lock() = parent.map_or_else(Weak::new, Self::downgrade);
    }

    /// Add a child window; returns `false` if it is already a child
    pub(crate) fn add_child(&self, child: &Self) -> bool {
        let mut children = self.shared.children.lock();
        if children.iter().any(|c| c.ptr_eq(child)) {
            return false;
        }
        children.push(child.clone());
        true
    }

    /// Remove a child window; returns whether it was a child
    pub(crate) fn remove_child(&self, child: &Self) -> bool {
        let mut children = self.shared.children.lock();
        let before = children.len();
        children.retain(|c| !c.ptr_eq(child));
        children.len() != before
    }

    // ------------------------------------------------------------------
    // Listeners and hooks

    /// Append a window listener
    pub fn add_window_listener(&self, listener: Arc<dyn WindowListener>) {
        self.shared.window_listeners.add(listener);
    }

    /// Insert a window listener at `index`
    pub fn insert_window_listener(&self, index: usize, listener: Arc<dyn WindowListener>) -> WindowResult<()> {
        self.shared.window_listeners.insert(index, listener)
    }

    /// Remove a window listener
    pub fn remove_window_listener(&self, listener: &Arc<dyn WindowListener>) -> bool {
        self.shared.window_listeners.remove(listener)
    }

    /// Append a mouse listener
    pub fn add_mouse_listener(&self, listener: Arc<dyn MouseListener>) {
        self.shared.mouse_listeners.add(listener);
    }

    /// Insert a mouse listener at `index`
    pub fn insert_mouse_listener(&self, index: usize, listener: Arc<dyn MouseListener>) -> WindowResult<()> {
        self.shared.mouse_listeners.insert(index, listener)
    }

    /// Remove a mouse listener
    pub fn remove_mouse_listener(&self, listener: &Arc<dyn MouseListener>) -> bool {
        self.shared.mouse_listeners.remove(listener)
    }

    /// Append a key listener
    pub fn add_key_listener(&self, listener: Arc<dyn KeyListener>) {
        self.shared.key_listeners.add(listener);
    }

    /// Insert a key listener at `index`
    pub fn insert_key_listener(&self, index: usize, listener: Arc<dyn KeyListener>) -> WindowResult<()> {
        self.shared.key_listeners.insert(index, listener)
    }

    /// Remove a key listener
    pub fn remove_key_listener(&self, listener: &Arc<dyn KeyListener>) -> bool {
        self.shared.key_listeners.remove(listener)
    }

    /// Listener that sees every key event before the key listeners
    pub fn set_keyboard_focus_handler(&self, handler: Option<Arc<dyn KeyListener>>) {
        *self.shared.keyboard_focus_handler.lock() = handler;
    }

    /// Hook consulted before native focus requests
    pub fn set_focus_hook(&self, hook: Option<Arc<dyn FocusHook>>) {
        *self.shared.focus_hook.lock() = hook;
    }

    /// Rendering collaborator notified around lifecycle transitions
    pub fn set_lifecycle_hook(&self, hook: Option<Arc<dyn LifecycleHook>>) {
        *self.shared.lifecycle_hook.lock() = hook;
    }

    /// Action run instead of [`destroy`](Self::destroy) on a close request
    pub fn set_destroy_notify_action(&self, action: Option<DestroyNotifyAction>) {
        *self.shared.destroy_notify_action.lock() = action;
    }

    pub(crate) fn lifecycle_hook(&self) -> Option<Arc<dyn LifecycleHook>> {
        self.shared.lifecycle_hook.lock().clone()
    }

    // ------------------------------------------------------------------
    // Locking

    /// Acquire the window lock
    pub fn lock_window(&self) -> WindowLockGuard<'_> {
        self.shared.surface.window_lock().lock();
        WindowLockGuard {
            window: self,
            _not_send: PhantomData,
        }
    }

    /// Owner and depth of the window lock
    pub fn window_lock_state(&self) -> LockState {
        self.shared.surface.window_lock().snapshot()
    }

    /// True if the calling thread owns the window lock
    pub fn is_window_locked_by_current_thread(&self) -> bool {
        self.shared.surface.window_lock().is_owned_by_current_thread()
    }

    /// Lock the surface for rendering
    ///
    /// The outermost level of a realized window also takes the display's
    /// device lock and the driver's surface lock.
    pub fn lock_surface(&self) -> SurfaceLockStatus {
        let display = self.display();
        let driver = self.driver();
        let window_lock = self.shared.surface.window_lock();
        window_lock.lock();
        let valid = self.is_native_valid();
        let status = self
            .shared
            .surface
            .lock_surface(valid, display.device_lock(), || driver.lock_surface());
        if let Err(e) = window_lock.unlock() {
            log::error!(target: TARGET_WINDOW, "window {} unlock after surface lock: {}", self.id(), e);
        }
        if !status.is_ready() {
            self.flush_coalesced_events();
        }
        status
    }

    /// Release one surface lock level
    pub fn unlock_surface(&self) -> WindowResult<()> {
        let display = self.display();
        let driver = self.driver();
        self.shared
            .surface
            .unlock_surface(display.device_lock(), || driver.unlock_surface())?;
        self.flush_coalesced_events();
        Ok(())
    }

    /// Current surface recursion depth
    pub fn surface_lock_depth(&self) -> usize {
        self.shared.surface.surface_depth()
    }

    /// Native handle read under the surface lock, zero if not ready
    pub(crate) fn surface_handle(&self) -> NativeHandle {
        if !self.lock_surface().is_ready() {
            return 0;
        }
        let handle = self.window_handle();
        if let Err(e) = self.unlock_surface() {
            log::error!(target: TARGET_WINDOW, "window {} surface unlock: {}", self.id(), e);
        }
        handle
    }

    // ------------------------------------------------------------------
    // Scheduling

    /// Run `task` on the serialization thread and wait for its result
    ///
    /// Runs inline when the caller owns the window lock, is the
    /// serialization thread, or no serialization thread is running.
    pub(crate) fn run_on_edt<R, F>(&self, task: F) -> WindowResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&Self) -> WindowResult<R> + Send + 'static,
    {
        if self.is_window_locked_by_current_thread() {
            return task(self);
        }
        let window = self.clone();
        self.display().run_on_edt_sync(move || task(&window))
    }

    /// Like [`run_on_edt`](Self::run_on_edt) without waiting; errors of
    /// the task are logged
    pub(crate) fn run_on_edt_detached<F>(&self, task: F) -> WindowResult<()>
    where
        F: FnOnce(&Self) -> WindowResult<()> + Send + 'static,
    {
        let window = self.clone();
        let run = move || {
            if let Err(e) = task(&window) {
                log::error!(target: TARGET_WINDOW, "window {} task failed: {}", window.id(), e);
            }
        };
        if self.is_window_locked_by_current_thread() {
            run();
            return Ok(());
        }
        self.display().run_on_edt(false, run)?;
        Ok(())
    }

    fn pump(&self) {
        self.display().dispatch_messages_native();
    }

    fn poll_interval(&self) -> Duration {
        self.display().config().poll_interval()
    }

    fn native_timeout(&self) -> Duration {
        self.display().config().native_timeout()
    }

    // ------------------------------------------------------------------
    // Native helpers

    fn define_size(&self, width: i32, height: i32) {
        let mut state = self.state();
        log::trace!(target: TARGET_WINDOW, "window {} define size {:?} -> {}x{}", self.id(), state.size, width, height);
        state.size = Size::new(width, height);
    }

    fn define_position(&self, x: i32, y: i32) {
        let mut state = self.state();
        log::trace!(target: TARGET_WINDOW, "window {} define position {:?} -> {}/{}", self.id(), state.position, x, y);
        state.auto_position = false;
        state.position = Point::new(x, y);
    }

    /// Change flags combined with the window's current state bits
    pub(crate) fn reconfigure_flags(&self, change: ReconfigureFlags, visible: bool) -> ReconfigureFlags {
        let state = self.state();
        let mut flags = change;
        flags.set(ReconfigureFlags::HAS_PARENT, state.parent_window_handle() != 0);
        flags.set(ReconfigureFlags::IS_UNDECORATED, state.is_undecorated());
        flags.set(ReconfigureFlags::IS_FULLSCREEN, state.fullscreen);
        flags.set(ReconfigureFlags::IS_ALWAYS_ON_TOP, state.always_on_top);
        flags.set(ReconfigureFlags::IS_VISIBLE, visible);
        flags
    }

    fn reconfigure(&self, bounds: Rect, flags: ReconfigureFlags) -> bool {
        log::debug!(target: TARGET_WINDOW, "window {} reconfigure {:?} {}", self.id(), bounds, flags);
        let ok = self
            .driver()
            .reconfigure(bounds.x, bounds.y, bounds.width, bounds.height, flags);
        if !ok {
            log::warn!(target: TARGET_WINDOW, "window {} reconfigure {} failed", self.id(), flags);
        }
        ok
    }

    /// Show or hide natively with the current geometry
    fn reconfigure_visibility(&self, visible: bool) -> bool {
        let flags = self.reconfigure_flags(ReconfigureFlags::CHANGE_VISIBILITY, visible);
        self.reconfigure(self.bounds(), flags)
    }

    fn add_screen_reference(&self) {
        let screen = {
            let mut state = self.state();
            if state.screen_referenced {
                return;
            }
            state.screen_referenced = true;
            state.screen.clone()
        };
        screen.add_reference();
    }

    fn remove_screen_reference(&self) {
        let screen = {
            let mut state = self.state();
            if !state.screen_referenced {
                return;
            }
            state.screen_referenced = false;
            state.screen.clone()
        };
        screen.remove_reference();
    }

    /// Monitor covering the largest part of the window
    pub fn main_monitor(&self) -> MonitorDevice {
        let (screen, bounds) = {
            let state = self.state();
            (state.screen.clone(), state.bounds())
        };
        screen.main_monitor(&bounds)
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Window {}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Window")
            .field("id", &self.shared.id)
            .field("handle", &format_args!("{:#x}", state.handle))
            .field("parent_handle", &format_args!("{:#x}", state.parent_handle))
            .field("bounds", &state.bounds())
            .field("visible", &state.visible)
            .field("visible_requested", &state.visible_requested)
            .field("fullscreen", &state.fullscreen)
            .field("focus", &state.has_focus)
            .finish()
    }
}
