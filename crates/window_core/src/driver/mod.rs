//! Platform driver contract and registry
//!
//! A platform plugs in through three traits:
//! - [`DriverFactory`] opens display connections and builds window drivers
//! - [`NativeDisplay`] pumps the native message queue of one connection
//! - [`WindowDriver`] performs the native calls for one window
//!
//! Drivers report failures as indicators (`bool` / `Option`); the window
//! treats a failed call as "state unchanged" and falls back accordingly.
//! Asynchronous native state changes are reported back through the
//! [`WindowNotifier`] handed to [`WindowDriver::create_native`].

pub mod headless;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::display::MonitorDevice;
use crate::error::{WindowError, WindowResult};
use crate::foundation::geometry::{Insets, Point, Size};
use crate::sync::SurfaceLockStatus;

pub use crate::window::notifier::WindowNotifier;
pub use headless::{HeadlessFactory, HEADLESS_DRIVER};

/// Opaque native window handle, zero means unrealized
pub type NativeHandle = u64;

bitflags! {
    /// What a reconfigure call changes and the desired resulting state
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ReconfigureFlags: u32 {
        /// Native parent changes
        const CHANGE_PARENTING = 1 << 0;
        /// Decoration changes
        const CHANGE_DECORATION = 1 << 1;
        /// Fullscreen mode changes
        const CHANGE_FULLSCREEN = 1 << 2;
        /// Always-on-top changes
        const CHANGE_ALWAYS_ON_TOP = 1 << 3;
        /// Visibility changes
        const CHANGE_VISIBILITY = 1 << 4;

        /// Window has a native parent
        const HAS_PARENT = 1 << 8;
        /// Window is undecorated
        const IS_UNDECORATED = 1 << 9;
        /// Window is fullscreen
        const IS_FULLSCREEN = 1 << 10;
        /// Fullscreen spans more than one monitor
        const IS_FULLSCREEN_SPAN = 1 << 11;
        /// Window stays above others
        const IS_ALWAYS_ON_TOP = 1 << 12;
        /// Window is visible
        const IS_VISIBLE = 1 << 13;
    }
}

impl fmt::Display for ReconfigureFlags {
    /// `[*PARENT_true, FS_false_span_false, UNDECOR_true, ALWAYSONTOP_false, VISIBLE_true]`,
    /// with `*` marking the changed properties
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |change: Self| if self.contains(change) { "*" } else { "" };
        write!(
            f,
            "[{}PARENT_{}, {}FS_{}_span_{}, {}UNDECOR_{}, {}ALWAYSONTOP_{}, {}VISIBLE_{}]",
            mark(Self::CHANGE_PARENTING),
            self.contains(Self::HAS_PARENT),
            mark(Self::CHANGE_FULLSCREEN),
            self.contains(Self::IS_FULLSCREEN),
            self.contains(Self::IS_FULLSCREEN_SPAN),
            mark(Self::CHANGE_DECORATION),
            self.contains(Self::IS_UNDECORATED),
            mark(Self::CHANGE_ALWAYS_ON_TOP),
            self.contains(Self::IS_ALWAYS_ON_TOP),
            mark(Self::CHANGE_VISIBILITY),
            self.contains(Self::IS_VISIBLE),
        )
    }
}

/// Requested or chosen surface capabilities
///
/// Capability negotiation itself belongs to the driver; the window only
/// needs to know whether the surface is on-screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    /// Backed by a visible native window rather than an off-screen buffer
    pub onscreen: bool,
    /// Double buffered surface
    pub double_buffered: bool,
    /// Alpha channel bits
    pub alpha_bits: u8,
    /// Depth buffer bits
    pub depth_bits: u8,
}

impl Capabilities {
    /// On-screen, double buffered, 24-bit depth
    pub fn onscreen() -> Self {
        Self::default()
    }

    /// Off-screen surface
    pub fn offscreen() -> Self {
        Self {
            onscreen: false,
            ..Self::default()
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            onscreen: true,
            double_buffered: true,
            alpha_bits: 0,
            depth_bits: 24,
        }
    }
}

/// Everything a driver needs to realize a window
#[derive(Debug, Clone)]
pub struct CreateRequest<'a> {
    /// Client area position, `None` to let the window manager choose
    pub position: Option<Point>,
    /// Client area size
    pub size: Size,
    /// Native parent, zero for a top-level window
    pub parent_handle: NativeHandle,
    /// Desired state bits (`HAS_PARENT`, `IS_UNDECORATED`, ...)
    pub flags: ReconfigureFlags,
    /// Window title
    pub title: &'a str,
    /// Chosen capabilities
    pub capabilities: &'a Capabilities,
}

/// Native calls for one window
///
/// All methods are invoked on the display's serialization thread, or on the
/// thread owning the window lock.
#[allow(unused_variables)]
pub trait WindowDriver: Send + Sync {
    /// Whether native creation can be attempted right now
    fn can_create_native(&self) -> bool {
        true
    }

    /// Realize the window; returns the native handle or `None` on failure
    ///
    /// The driver keeps `notifier` to report asynchronous state changes.
    fn create_native(&self, request: &CreateRequest<'_>, notifier: &WindowNotifier) -> Option<NativeHandle>;

    /// Release the native window; returns `false` if closing failed
    fn close_native(&self) -> bool;

    /// Ask the window manager for keyboard focus
    ///
    /// With `force` the request is issued even if the driver believes the
    /// window already has focus.
    fn request_focus(&self, force: bool);

    /// Apply geometry and state in one call
    ///
    /// Negative `x`/`y` and non-positive `width`/`height` mean unchanged.
    fn reconfigure(&self, x: i32, y: i32, width: i32, height: i32, flags: ReconfigureFlags) -> bool;

    /// Translate client coordinates to screen coordinates; `None` lets the
    /// caller accumulate positions through the parent chain
    fn location_on_screen(&self, x: i32, y: i32) -> Option<Point> {
        None
    }

    /// Current decoration insets, if the driver can query them
    fn update_insets(&self) -> Option<Insets> {
        None
    }

    /// Set the window title
    fn set_title(&self, title: &str) {}

    /// Show or hide the pointer; returns whether the change was applied
    fn set_pointer_visible(&self, visible: bool) -> bool {
        false
    }

    /// Confine the pointer; returns whether the change was applied
    fn confine_pointer(&self, confine: bool) -> bool {
        false
    }

    /// Move the pointer to client coordinates
    fn warp_pointer(&self, x: i32, y: i32) {}

    /// Show or hide an on-screen keyboard; returns whether it succeeded
    fn set_keyboard_visible(&self, visible: bool) -> bool {
        false
    }

    /// Lock the native surface
    fn lock_surface(&self) -> SurfaceLockStatus {
        SurfaceLockStatus::Success
    }

    /// Unlock the native surface
    fn unlock_surface(&self) {}

    /// True if the platform's focus notifications are unreliable, which
    /// makes every focus request forced
    fn has_broken_focus_change(&self) -> bool {
        false
    }
}

/// Native message pump and monitor enumeration of one display connection
pub trait NativeDisplay: Send + Sync {
    /// Process pending native messages
    fn dispatch_messages(&self);

    /// Monitors of the given screen
    fn monitors(&self, screen_index: usize) -> Vec<MonitorDevice>;

    /// Release the connection
    fn close(&self) {}
}

/// Entry point of a platform implementation
pub trait DriverFactory: Send + Sync {
    /// Registry key
    fn platform(&self) -> &str;

    /// Open a display connection
    ///
    /// Called on the display's serialization thread when one is enabled.
    fn open_display(&self, name: &str) -> WindowResult<Arc<dyn NativeDisplay>>;

    /// Pick the capabilities to realize for a request
    fn choose_capabilities(&self, requested: &Capabilities) -> Capabilities {
        requested.clone()
    }

    /// Create the driver for one window
    fn create_window_driver(&self, capabilities: &Capabilities) -> WindowResult<Arc<dyn WindowDriver>>;
}

/// Platform key to factory map, populated at start-up
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in headless driver
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HeadlessFactory::default()));
        registry
    }

    /// Register a factory under its platform key, replacing any previous one
    pub fn register(&mut self, factory: Arc<dyn DriverFactory>) -> Option<Arc<dyn DriverFactory>> {
        log::debug!("registering window driver '{}'", factory.platform());
        self.factories.insert(factory.platform().to_string(), factory)
    }

    /// Look up a factory
    pub fn get(&self, platform: &str) -> WindowResult<Arc<dyn DriverFactory>> {
        self.factories
            .get(platform)
            .cloned()
            .ok_or_else(|| WindowError::UnknownDriver(format!("'{}' (known: {:?})", platform, self.platforms())))
    }

    /// Registered platform keys, sorted
    pub fn platforms(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_debug_string() {
        let flags = ReconfigureFlags::CHANGE_PARENTING
            | ReconfigureFlags::HAS_PARENT
            | ReconfigureFlags::IS_UNDECORATED
            | ReconfigureFlags::IS_VISIBLE;
        assert_eq!(
            flags.to_string(),
            "[*PARENT_true, FS_false_span_false, UNDECOR_true, ALWAYSONTOP_false, VISIBLE_true]"
        );

        let fs = ReconfigureFlags::CHANGE_FULLSCREEN
            | ReconfigureFlags::CHANGE_DECORATION
            | ReconfigureFlags::IS_FULLSCREEN
            | ReconfigureFlags::IS_FULLSCREEN_SPAN;
        assert_eq!(
            fs.to_string(),
            "[PARENT_false, *FS_true_span_true, *UNDECOR_false, ALWAYSONTOP_false, VISIBLE_false]"
        );
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(ReconfigureFlags::CHANGE_VISIBILITY.bits(), 1 << 4);
        assert_eq!(ReconfigureFlags::HAS_PARENT.bits(), 1 << 8);
        assert_eq!(ReconfigureFlags::IS_VISIBLE.bits(), 1 << 13);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = DriverRegistry::with_defaults();
        assert!(registry.get(HEADLESS_DRIVER).is_ok());
        assert_eq!(registry.platforms(), vec![HEADLESS_DRIVER.to_string()]);
        assert!(matches!(registry.get("cocoa"), Err(WindowError::UnknownDriver(_))));
    }
}
