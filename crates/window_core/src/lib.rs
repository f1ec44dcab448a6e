//! # Window Core
//!
//! Native window lifecycle and concurrency controller.
//!
//! Platform windowing APIs are rarely thread-safe. This crate hides a native
//! window behind a uniform [`Window`](window::Window) handle and funnels every
//! native call through one serialization thread per display connection.
//!
//! ## Features
//!
//! - **Lifecycle**: realization on first show, destruction, resurrection
//! - **Reparenting**: native reparenting with recreation fallback
//! - **Fullscreen**: single and multi-monitor spans with exact restore
//! - **Locking**: reentrant window lock plus surface/device lock
//! - **Input**: click counting, enter/exit synthesis, key auto-repeat
//! - **Drivers**: pluggable platforms selected from a registry
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use window_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let display = Display::open(&DriverRegistry::with_defaults(), WindowConfig::default())?;
//!     let screen = Screen::open(&display, 0)?;
//!
//!     let window = Window::create(&screen, Capabilities::onscreen())?;
//!     window.set_size(640, 480)?;
//!     window.set_visible(true)?;
//!
//!     window.destroy();
//!     display.close();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod display;
pub mod driver;
pub mod edt;
pub mod error;
pub mod events;
pub mod foundation;
pub mod input;
pub mod sync;
pub mod window;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, WindowConfig},
        display::{Display, MonitorDevice, Screen},
        driver::{Capabilities, DriverRegistry, ReconfigureFlags, WindowDriver, WindowNotifier},
        error::{WindowError, WindowResult},
        events::{
            Event, KeyEvent, KeyEventType, KeyListener, MouseEvent, MouseEventType, MouseListener,
            WindowEvent, WindowEventType, WindowListener,
        },
        foundation::geometry::{Insets, Point, Rect, Size},
        input::{KeyInput, Modifiers, MouseInput},
        window::{ClosingMode, LifecycleState, ReparentOutcome, Window},
    };
}
