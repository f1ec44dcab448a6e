//! Window demo
//!
//! Opens a GLFW window through `window_core` and exercises the controller:
//! - `F` toggles fullscreen on the main monitor
//! - `D` toggles decorations
//! - `T` toggles always-on-top
//! - `Escape` or closing the window exits
//!
//! Pass `--headless` to run the same sequence against the headless driver.

mod glfw_driver;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use window_core::foundation::logging;
use window_core::prelude::*;

use glfw_driver::{GlfwFactory, GLFW_DRIVER};

const ESCAPE: u16 = 256;
const KEY_D: u16 = b'D' as u16;
const KEY_F: u16 = b'F' as u16;
const KEY_T: u16 = b'T' as u16;

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Window(#[from] WindowError),
}

/// Keyboard shortcuts; the actions run off the serialization thread
struct Shortcuts {
    window: Window,
    quit: Arc<AtomicBool>,
}

impl Shortcuts {
    fn toggle(&self, key_code: u16) -> WindowResult<()> {
        match key_code {
            KEY_F => {
                let fullscreen = !self.window.is_fullscreen();
                self.window.set_fullscreen(fullscreen)?;
            }
            KEY_D => self.window.set_undecorated(!self.window.is_undecorated())?,
            KEY_T => self.window.set_always_on_top(!self.window.is_always_on_top())?,
            ESCAPE => self.quit.store(true, Ordering::SeqCst),
            _ => {}
        }
        Ok(())
    }
}

impl KeyListener for Shortcuts {
    fn key_released(&self, event: &KeyEvent) {
        let key_code = event.key_code;
        let window = self.window.clone();
        let quit = Arc::clone(&self.quit);
        // listeners run on the serialization thread; blocking calls go elsewhere
        thread::spawn(move || {
            let shortcuts = Shortcuts { window, quit };
            if let Err(e) = shortcuts.toggle(key_code) {
                log::error!("shortcut {} failed: {}", key_code, e);
            }
        });
    }
}

struct Logger;

impl WindowListener for Logger {
    fn window_resized(&self, event: &WindowEvent) {
        log::info!("window {} resized", event.source);
    }

    fn window_moved(&self, event: &WindowEvent) {
        log::debug!("window {} moved", event.source);
    }

    fn window_gained_focus(&self, event: &WindowEvent) {
        log::info!("window {} focused", event.source);
    }
}

impl MouseListener for Logger {
    fn mouse_clicked(&self, event: &MouseEvent) {
        log::info!("click x{} at {}/{}", event.click_count, event.x, event.y);
    }
}

fn run(headless: bool) -> Result<(), DemoError> {
    let mut registry = DriverRegistry::with_defaults();
    let config = if headless {
        WindowConfig::default()
    } else {
        registry.register(Arc::new(GlfwFactory));
        WindowConfig::new(GLFW_DRIVER)
    };
    let display = Display::open(&registry, config)?;
    let screen = Screen::open(&display, 0)?;

    let window = Window::create(&screen, Capabilities::onscreen())?;
    let quit = Arc::new(AtomicBool::new(false));
    let closer = Arc::clone(&quit);
    window.set_destroy_notify_action(Some(Arc::new(move |_: &Window| closer.store(true, Ordering::SeqCst))));
    window.add_window_listener(Arc::new(Logger));
    window.add_mouse_listener(Arc::new(Logger));
    window.add_key_listener(Arc::new(Shortcuts {
        window: window.clone(),
        quit: Arc::clone(&quit),
    }));

    window.set_title("window_core demo")?;
    window.set_size(800, 600)?;
    window.set_position(100, 100)?;
    window.set_visible(true)?;
    log::info!("window {} realized at {:?}", window.id(), window.bounds());

    if headless {
        window.set_fullscreen(true)?;
        log::info!("fullscreen bounds {:?}", window.bounds());
        window.set_fullscreen(false)?;
        log::info!("restored bounds {:?}", window.bounds());
        quit.store(true, Ordering::SeqCst);
    }

    while !quit.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(16));
    }

    window.destroy();
    display.close();
    Ok(())
}

fn main() {
    logging::init_with_level("info");
    let headless = std::env::args().any(|arg| arg == "--headless");
    if let Err(e) = run(headless) {
        log::error!("demo failed: {}", e);
        std::process::exit(1);
    }
}
