//! GLFW window driver
//!
//! GLFW objects are not `Send`, so the library context and every native
//! window live in a thread local of the display's serialization thread.
//! Driver calls arriving on any other thread find no context and report
//! failure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glfw::{Action, WindowEvent};
use thiserror::Error;
use window_core::display::MonitorDevice;
use window_core::driver::{
    Capabilities, CreateRequest, DriverFactory, NativeDisplay, NativeHandle, ReconfigureFlags, WindowDriver,
};
use window_core::error::{WindowError, WindowResult};
use window_core::events::{KeyEventType, MouseEventType};
use window_core::input::{KeyInput, Modifiers, MouseInput};
use window_core::prelude::{Insets, Point, Rect, WindowNotifier};

/// Registry key of the GLFW driver
pub const GLFW_DRIVER: &str = "glfw";

/// GLFW setup failures
#[derive(Error, Debug)]
pub enum GlfwError {
    #[error("GLFW initialization failed: {0}")]
    Init(String),

    #[error("GLFW reports no monitors")]
    NoMonitors,
}

impl From<GlfwError> for WindowError {
    fn from(e: GlfwError) -> Self {
        WindowError::Driver(e.to_string())
    }
}

struct NativeWindow {
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, WindowEvent)>,
    notifier: WindowNotifier,
    cursor: Point,
}

struct GlfwContext {
    glfw: glfw::Glfw,
    windows: HashMap<NativeHandle, NativeWindow>,
}

thread_local! {
    static CONTEXT: RefCell<Option<GlfwContext>> = const { RefCell::new(None) };
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Run `f` with the native window `handle` of this thread, if any
fn with_window<R>(handle: NativeHandle, f: impl FnOnce(&mut NativeWindow) -> R) -> Option<R> {
    CONTEXT.with(|context| {
        let mut context = context.borrow_mut();
        let window = context.as_mut()?.windows.get_mut(&handle)?;
        Some(f(window))
    })
}

/// Factory for GLFW displays and windows
#[derive(Debug, Default)]
pub struct GlfwFactory;

impl DriverFactory for GlfwFactory {
    fn platform(&self) -> &str {
        GLFW_DRIVER
    }

    fn open_display(&self, name: &str) -> WindowResult<Arc<dyn NativeDisplay>> {
        let mut glfw = glfw::init(glfw::fail_on_errors).map_err(|e| GlfwError::Init(format!("{:?}", e)))?;
        let monitors = glfw.with_connected_monitors(|_, monitors| {
            monitors
                .iter()
                .enumerate()
                .filter_map(|(id, monitor)| {
                    let mode = monitor.get_video_mode()?;
                    let (x, y) = monitor.get_pos();
                    let id = u32::try_from(id).ok()?;
                    Some(MonitorDevice::new(id, Rect::new(x, y, mode.width as i32, mode.height as i32)))
                })
                .collect::<Vec<_>>()
        });
        if monitors.is_empty() {
            return Err(GlfwError::NoMonitors.into());
        }
        log::info!("GLFW display '{}' with {} monitor(s)", name, monitors.len());

        CONTEXT.with(|context| {
            *context.borrow_mut() = Some(GlfwContext {
                glfw,
                windows: HashMap::new(),
            });
        });
        Ok(Arc::new(GlfwDisplay { monitors }))
    }

    fn create_window_driver(&self, _capabilities: &Capabilities) -> WindowResult<Arc<dyn WindowDriver>> {
        Ok(Arc::new(GlfwWindowDriver::default()))
    }
}

struct GlfwDisplay {
    monitors: Vec<MonitorDevice>,
}

impl NativeDisplay for GlfwDisplay {
    fn dispatch_messages(&self) {
        // Collect first: listeners may call back into the driver
        let pending: Vec<(WindowNotifier, Point, WindowEvent)> = CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            let Some(context) = context.as_mut() else {
                return Vec::new();
            };
            context.glfw.poll_events();
            let mut pending = Vec::new();
            for window in context.windows.values_mut() {
                for (_, event) in glfw::flush_messages(&window.events) {
                    if let WindowEvent::CursorPos(x, y) = event {
                        window.cursor = Point::new(x as i32, y as i32);
                    }
                    pending.push((window.notifier.clone(), window.cursor, event));
                }
            }
            pending
        });

        for (notifier, cursor, event) in pending {
            forward(&notifier, cursor, event);
        }
    }

    fn monitors(&self, _screen_index: usize) -> Vec<MonitorDevice> {
        self.monitors.clone()
    }

    fn close(&self) {
        CONTEXT.with(|context| {
            if let Some(context) = context.borrow_mut().as_mut() {
                context.windows.clear();
            }
        });
    }
}

fn modifiers(mods: glfw::Modifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, mods.contains(glfw::Modifiers::Shift));
    out.set(Modifiers::CTRL, mods.contains(glfw::Modifiers::Control));
    out.set(Modifiers::ALT, mods.contains(glfw::Modifiers::Alt));
    out.set(Modifiers::META, mods.contains(glfw::Modifiers::Super));
    out
}

/// Printable GLFW key codes match ASCII
fn key_char(code: u16) -> char {
    match u8::try_from(code) {
        Ok(byte) if (32..=126).contains(&byte) => char::from(byte).to_ascii_lowercase(),
        _ => '\0',
    }
}

fn forward(notifier: &WindowNotifier, cursor: Point, event: WindowEvent) {
    let result = match event {
        WindowEvent::Pos(x, y) => {
            notifier.position_changed(false, x, y);
            Ok(())
        }
        WindowEvent::Size(width, height) => notifier.size_changed(false, width, height, false),
        WindowEvent::Focus(focused) => {
            notifier.focus_changed(false, focused);
            Ok(())
        }
        WindowEvent::Close => {
            notifier.window_destroy_notify(false);
            Ok(())
        }
        WindowEvent::Refresh => {
            notifier.window_repaint(false, Rect::default());
            Ok(())
        }
        WindowEvent::Iconify(iconified) => {
            notifier.visible_changed(false, !iconified);
            Ok(())
        }
        WindowEvent::CursorPos(..) => {
            notifier.mouse_input(false, MouseInput::new(MouseEventType::Moved, cursor.x, cursor.y))
        }
        WindowEvent::CursorEnter(entered) => {
            let kind = if entered { MouseEventType::Entered } else { MouseEventType::Exited };
            notifier.mouse_input(false, MouseInput::new(kind, cursor.x, cursor.y))
        }
        WindowEvent::MouseButton(button, action, mods) => {
            let kind = if action == Action::Release {
                MouseEventType::Released
            } else {
                MouseEventType::Pressed
            };
            let input = MouseInput::new(kind, cursor.x, cursor.y)
                .with_button(button as u16 + 1)
                .with_modifiers(modifiers(mods));
            notifier.mouse_input(false, input)
        }
        WindowEvent::Scroll(_, dy) => notifier.mouse_input(
            false,
            MouseInput::new(MouseEventType::WheelMoved, cursor.x, cursor.y).with_rotation(dy as f32),
        ),
        WindowEvent::Key(key, _, action, mods) => {
            let Ok(code) = u16::try_from(key as i32) else {
                return;
            };
            let kind = if action == Action::Release {
                KeyEventType::Released
            } else {
                KeyEventType::Pressed
            };
            let input = KeyInput::new(kind, code, key_char(code)).with_modifiers(modifiers(mods));
            notifier.key_input(false, input)
        }
        _ => Ok(()),
    };
    if let Err(e) = result {
        log::warn!("dropping GLFW event: {}", e);
    }
}

/// Driver for one GLFW window
#[derive(Default)]
pub struct GlfwWindowDriver {
    handle: AtomicU64,
}

impl GlfwWindowDriver {
    fn handle(&self) -> NativeHandle {
        self.handle.load(Ordering::SeqCst)
    }

    fn with_native<R>(&self, f: impl FnOnce(&mut NativeWindow) -> R) -> Option<R> {
        let result = with_window(self.handle(), f);
        if result.is_none() {
            log::debug!("GLFW window {:#x} not reachable from this thread", self.handle());
        }
        result
    }
}

impl WindowDriver for GlfwWindowDriver {
    fn create_native(&self, request: &CreateRequest<'_>, notifier: &WindowNotifier) -> Option<NativeHandle> {
        if request.parent_handle != 0 {
            log::warn!("GLFW has no native child windows");
            return None;
        }
        let width = u32::try_from(request.size.width).ok()?;
        let height = u32::try_from(request.size.height).ok()?;

        let created = CONTEXT.with(|context| {
            let mut context = context.borrow_mut();
            let context = context.as_mut()?;
            context.glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
            context.glfw.window_hint(glfw::WindowHint::Visible(false));
            context
                .glfw
                .window_hint(glfw::WindowHint::Decorated(!request.flags.contains(ReconfigureFlags::IS_UNDECORATED)));
            context
                .glfw
                .window_hint(glfw::WindowHint::Floating(request.flags.contains(ReconfigureFlags::IS_ALWAYS_ON_TOP)));

            let (mut window, events) =
                context
                    .glfw
                    .create_window(width, height, request.title, glfw::WindowMode::Windowed)?;
            window.set_all_polling(true);
            if let Some(position) = request.position {
                window.set_pos(position.x, position.y);
            }
            window.show();

            let (x, y) = window.get_pos();
            let (w, h) = window.get_size();
            let (left, top, right, bottom) = window.get_frame_size();

            let handle = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst);
            context.windows.insert(
                handle,
                NativeWindow {
                    window,
                    events,
                    notifier: notifier.clone(),
                    cursor: Point::default(),
                },
            );
            Some((handle, Rect::new(x, y, w, h), Insets::new(left, right, top, bottom)))
        });
        let (handle, bounds, insets) = created?;
        self.handle.store(handle, Ordering::SeqCst);

        notifier.insets_changed(false, insets);
        if let Err(e) = notifier.size_changed(false, bounds.width, bounds.height, false) {
            log::warn!("GLFW create: {}", e);
        }
        notifier.position_changed(false, bounds.x, bounds.y);
        notifier.visible_changed(false, true);
        Some(handle)
    }

    fn close_native(&self) -> bool {
        let handle = self.handle.swap(0, Ordering::SeqCst);
        CONTEXT.with(|context| {
            context
                .borrow_mut()
                .as_mut()
                .is_some_and(|context| context.windows.remove(&handle).is_some())
        })
    }

    fn request_focus(&self, _force: bool) {
        self.with_native(|native| native.window.focus());
    }

    fn reconfigure(&self, x: i32, y: i32, width: i32, height: i32, flags: ReconfigureFlags) -> bool {
        if flags.contains(ReconfigureFlags::CHANGE_PARENTING) && flags.contains(ReconfigureFlags::HAS_PARENT) {
            return false;
        }
        self.with_native(|native| {
            let window = &mut native.window;
            let visibility = flags.contains(ReconfigureFlags::CHANGE_VISIBILITY);
            if visibility && !flags.contains(ReconfigureFlags::IS_VISIBLE) {
                window.hide();
            }
            if flags.intersects(ReconfigureFlags::CHANGE_DECORATION | ReconfigureFlags::CHANGE_FULLSCREEN) {
                window.set_decorated(!flags.contains(ReconfigureFlags::IS_UNDECORATED));
            }
            if flags.contains(ReconfigureFlags::CHANGE_ALWAYS_ON_TOP) {
                window.set_floating(flags.contains(ReconfigureFlags::IS_ALWAYS_ON_TOP));
            }
            if width > 0 && height > 0 {
                window.set_size(width, height);
            }
            if x >= 0 && y >= 0 {
                window.set_pos(x, y);
            }
            if visibility && flags.contains(ReconfigureFlags::IS_VISIBLE) {
                window.show();
            }
        })
        .is_some()
    }

    fn location_on_screen(&self, x: i32, y: i32) -> Option<Point> {
        self.with_native(|native| {
            let (wx, wy) = native.window.get_pos();
            Point::new(wx + x, wy + y)
        })
    }

    fn update_insets(&self) -> Option<Insets> {
        self.with_native(|native| {
            let (left, top, right, bottom) = native.window.get_frame_size();
            Insets::new(left, right, top, bottom)
        })
    }

    fn set_title(&self, title: &str) {
        self.with_native(|native| native.window.set_title(title));
    }

    fn set_pointer_visible(&self, visible: bool) -> bool {
        let mode = if visible {
            glfw::CursorMode::Normal
        } else {
            glfw::CursorMode::Hidden
        };
        self.with_native(|native| native.window.set_cursor_mode(mode)).is_some()
    }

    fn warp_pointer(&self, x: i32, y: i32) {
        self.with_native(|native| native.window.set_cursor_pos(f64::from(x), f64::from(y)));
    }
}
