//! Window, mouse and key events
//!
//! Key principles:
//! - Events are immutable once constructed; only the consumed flag changes
//! - A listener consumes an event to stop it reaching later listeners
//! - Listener lists are copy-on-write, so dispatch iterates a snapshot and
//!   listeners may add or remove listeners while being notified
//! - Delivery is either immediate (`send_*`) or deferred through the
//!   display's event queue (`enqueue_*`)

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{WindowError, WindowResult};
use crate::foundation::geometry::Rect;
use crate::input::Modifiers;

/// Process-unique window identifier used as event source
pub type WindowId = u64;

/// Window event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEventType {
    /// Client area size changed, or a relayout is requested
    Resized,
    /// Client area position changed
    Moved,
    /// The window is about to be destroyed
    DestroyNotify,
    /// Native resources were released
    Destroyed,
    /// Keyboard focus gained
    GainedFocus,
    /// Keyboard focus lost
    LostFocus,
    /// Part of the window needs repainting
    Repaint,
}

/// Window lifecycle and geometry event
#[derive(Debug, Clone)]
pub struct WindowEvent {
    /// Event type
    pub kind: WindowEventType,
    /// Source window
    pub source: WindowId,
    /// Creation time in milliseconds
    pub when: u64,
    /// Dirty region of a repaint event
    pub repaint: Option<Rect>,
    consumed: Cell<bool>,
}

impl WindowEvent {
    /// Create a new window event
    pub fn new(kind: WindowEventType, source: WindowId, when: u64) -> Self {
        Self {
            kind,
            source,
            when,
            repaint: None,
            consumed: Cell::new(false),
        }
    }

    /// Create a repaint event for the given region
    pub fn repaint(source: WindowId, when: u64, region: Rect) -> Self {
        Self {
            repaint: Some(region),
            ..Self::new(WindowEventType::Repaint, source, when)
        }
    }

    /// True once a listener consumed the event
    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }

    /// Mark the event consumed; later listeners won't see it
    pub fn consume(&self) {
        self.consumed.set(true);
    }
}

/// Mouse event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventType {
    /// Press followed by release within the click timeout
    Clicked,
    /// Pointer entered the window
    Entered,
    /// Pointer left the window
    Exited,
    /// Button pressed
    Pressed,
    /// Button released
    Released,
    /// Pointer moved with no button held
    Moved,
    /// Pointer moved with a button held
    Dragged,
    /// Wheel rotated
    WheelMoved,
}

/// Pointer event
#[derive(Debug, Clone)]
pub struct MouseEvent {
    /// Event type
    pub kind: MouseEventType,
    /// Source window
    pub source: WindowId,
    /// Creation time in milliseconds
    pub when: u64,
    /// Keyboard modifiers, held buttons and pointer state
    pub modifiers: Modifiers,
    /// Client area x coordinate
    pub x: i32,
    /// Client area y coordinate
    pub y: i32,
    /// Position in the current click sequence, zero when not applicable
    pub click_count: u16,
    /// 1-based button, zero for none
    pub button: u16,
    /// Wheel rotation
    pub rotation: f32,
    consumed: Cell<bool>,
}

impl MouseEvent {
    /// Create a new mouse event
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: MouseEventType,
        source: WindowId,
        when: u64,
        modifiers: Modifiers,
        x: i32,
        y: i32,
        click_count: u16,
        button: u16,
        rotation: f32,
    ) -> Self {
        Self {
            kind,
            source,
            when,
            modifiers,
            x,
            y,
            click_count,
            button,
            rotation,
            consumed: Cell::new(false),
        }
    }

    /// True once a listener consumed the event
    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }

    /// Mark the event consumed
    pub fn consume(&self) {
        self.consumed.set(true);
    }
}

/// Key event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEventType {
    /// Key pressed (possibly auto-repeated)
    Pressed,
    /// Key released
    Released,
    /// Printable key released; synthesized, never sent by drivers
    Typed,
}

/// Keyboard event
#[derive(Debug, Clone)]
pub struct KeyEvent {
    /// Event type
    pub kind: KeyEventType,
    /// Source window
    pub source: WindowId,
    /// Creation time in milliseconds
    pub when: u64,
    /// Keyboard modifiers plus held mouse buttons
    pub modifiers: Modifiers,
    /// Layout independent key code
    pub key_code: u16,
    /// Layout dependent key symbol
    pub key_symbol: u16,
    /// Produced character, `'\0'` if none
    pub key_char: char,
    consumed: Cell<bool>,
}

impl KeyEvent {
    /// Create a new key event
    pub fn new(
        kind: KeyEventType,
        source: WindowId,
        when: u64,
        modifiers: Modifiers,
        key_code: u16,
        key_symbol: u16,
        key_char: char,
    ) -> Self {
        Self {
            kind,
            source,
            when,
            modifiers,
            key_code,
            key_symbol,
            key_char,
            consumed: Cell::new(false),
        }
    }

    /// True if the key produces a visible character
    pub fn is_printable(&self) -> bool {
        self.key_char != '\0' && !self.key_char.is_control()
    }

    /// True if flagged as keyboard auto-repeat
    pub fn is_auto_repeat(&self) -> bool {
        self.modifiers.contains(Modifiers::AUTOREPEAT)
    }

    /// True once a listener consumed the event
    pub fn is_consumed(&self) -> bool {
        self.consumed.get()
    }

    /// Mark the event consumed
    pub fn consume(&self) {
        self.consumed.set(true);
    }
}

/// Any event a window dispatches
#[derive(Debug, Clone)]
pub enum Event {
    /// Lifecycle or geometry event
    Window(WindowEvent),
    /// Pointer event
    Mouse(MouseEvent),
    /// Keyboard event
    Key(KeyEvent),
}

impl Event {
    /// Creation time in milliseconds
    pub fn when(&self) -> u64 {
        match self {
            Self::Window(e) => e.when,
            Self::Mouse(e) => e.when,
            Self::Key(e) => e.when,
        }
    }

    /// Source window
    pub fn source(&self) -> WindowId {
        match self {
            Self::Window(e) => e.source,
            Self::Mouse(e) => e.source,
            Self::Key(e) => e.source,
        }
    }

    /// True once a listener consumed the event
    pub fn is_consumed(&self) -> bool {
        match self {
            Self::Window(e) => e.is_consumed(),
            Self::Mouse(e) => e.is_consumed(),
            Self::Key(e) => e.is_consumed(),
        }
    }
}

impl From<WindowEvent> for Event {
    fn from(event: WindowEvent) -> Self {
        Self::Window(event)
    }
}

impl From<MouseEvent> for Event {
    fn from(event: MouseEvent) -> Self {
        Self::Mouse(event)
    }
}

impl From<KeyEvent> for Event {
    fn from(event: KeyEvent) -> Self {
        Self::Key(event)
    }
}

/// Receives window lifecycle and geometry events
#[allow(unused_variables)]
pub trait WindowListener: Send + Sync {
    /// Client area size changed
    fn window_resized(&self, event: &WindowEvent) {}
    /// Client area position changed
    fn window_moved(&self, event: &WindowEvent) {}
    /// Window is about to be destroyed
    fn window_destroy_notify(&self, event: &WindowEvent) {}
    /// Native resources released
    fn window_destroyed(&self, event: &WindowEvent) {}
    /// Keyboard focus gained
    fn window_gained_focus(&self, event: &WindowEvent) {}
    /// Keyboard focus lost
    fn window_lost_focus(&self, event: &WindowEvent) {}
    /// Region needs repainting
    fn window_repaint(&self, event: &WindowEvent) {}
}

/// Receives normalized pointer events
#[allow(unused_variables)]
pub trait MouseListener: Send + Sync {
    /// Press and release within the click timeout
    fn mouse_clicked(&self, event: &MouseEvent) {}
    /// Pointer entered
    fn mouse_entered(&self, event: &MouseEvent) {}
    /// Pointer left
    fn mouse_exited(&self, event: &MouseEvent) {}
    /// Button pressed
    fn mouse_pressed(&self, event: &MouseEvent) {}
    /// Button released
    fn mouse_released(&self, event: &MouseEvent) {}
    /// Pointer moved
    fn mouse_moved(&self, event: &MouseEvent) {}
    /// Pointer moved with a button held
    fn mouse_dragged(&self, event: &MouseEvent) {}
    /// Wheel rotated
    fn mouse_wheel_moved(&self, event: &MouseEvent) {}
}

/// Receives key events
#[allow(unused_variables)]
pub trait KeyListener: Send + Sync {
    /// Key pressed
    fn key_pressed(&self, event: &KeyEvent) {}
    /// Key released
    fn key_released(&self, event: &KeyEvent) {}
    /// Printable key released
    fn key_typed(&self, event: &KeyEvent) {}
}

impl WindowEvent {
    /// Deliver to one listener; returns whether the event is now consumed
    pub fn deliver_to(&self, listener: &dyn WindowListener) -> bool {
        match self.kind {
            WindowEventType::Resized => listener.window_resized(self),
            WindowEventType::Moved => listener.window_moved(self),
            WindowEventType::DestroyNotify => listener.window_destroy_notify(self),
            WindowEventType::Destroyed => listener.window_destroyed(self),
            WindowEventType::GainedFocus => listener.window_gained_focus(self),
            WindowEventType::LostFocus => listener.window_lost_focus(self),
            WindowEventType::Repaint => listener.window_repaint(self),
        }
        self.is_consumed()
    }
}

impl MouseEvent {
    /// Deliver to one listener; returns whether the event is now consumed
    pub fn deliver_to(&self, listener: &dyn MouseListener) -> bool {
        match self.kind {
            MouseEventType::Clicked => listener.mouse_clicked(self),
            MouseEventType::Entered => listener.mouse_entered(self),
            MouseEventType::Exited => listener.mouse_exited(self),
            MouseEventType::Pressed => listener.mouse_pressed(self),
            MouseEventType::Released => listener.mouse_released(self),
            MouseEventType::Moved => listener.mouse_moved(self),
            MouseEventType::Dragged => listener.mouse_dragged(self),
            MouseEventType::WheelMoved => listener.mouse_wheel_moved(self),
        }
        self.is_consumed()
    }
}

impl KeyEvent {
    /// Deliver to one listener; returns whether the event is now consumed
    pub fn deliver_to(&self, listener: &dyn KeyListener) -> bool {
        match self.kind {
            KeyEventType::Pressed => listener.key_pressed(self),
            KeyEventType::Released => listener.key_released(self),
            KeyEventType::Typed => listener.key_typed(self),
        }
        self.is_consumed()
    }
}

/// Copy-on-write listener registry
///
/// Mutation clones the list; dispatch works on the snapshot taken when it
/// started.
pub struct ListenerList<T: ?Sized> {
    listeners: Mutex<Arc<Vec<Arc<T>>>>,
}

impl<T: ?Sized> ListenerList<T> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Arc::new(Vec::new())),
        }
    }

    /// Append a listener
    pub fn add(&self, listener: Arc<T>) {
        let mut guard = self.listeners.lock();
        let mut next = Vec::clone(&guard);
        next.push(listener);
        *guard = Arc::new(next);
    }

    /// Insert a listener at `index`
    pub fn insert(&self, index: usize, listener: Arc<T>) -> WindowResult<()> {
        let mut guard = self.listeners.lock();
        if index > guard.len() {
            return Err(WindowError::InvalidArgument(format!(
                "listener index {} out of range 0..={}",
                index,
                guard.len()
            )));
        }
        let mut next = Vec::clone(&guard);
        next.insert(index, listener);
        *guard = Arc::new(next);
        Ok(())
    }

    /// Remove a listener by identity; returns whether it was registered
    pub fn remove(&self, listener: &Arc<T>) -> bool {
        let mut guard = self.listeners.lock();
        let target = Arc::as_ptr(listener).cast::<()>();
        let Some(index) = guard
            .iter()
            .position(|l| Arc::as_ptr(l).cast::<()>() == target)
        else {
            return false;
        };
        let mut next = Vec::clone(&guard);
        next.remove(index);
        *guard = Arc::new(next);
        true
    }

    /// Current listeners
    pub fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        Arc::clone(&self.listeners.lock())
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// True if no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Remove all listeners
    pub fn clear(&self) {
        *self.listeners.lock() = Arc::new(Vec::new());
    }
}

impl<T: ?Sized> Default for ListenerList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for ListenerList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerList").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        name: &'static str,
        consume: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl WindowListener for Recorder {
        fn window_resized(&self, event: &WindowEvent) {
            self.log.lock().push(self.name);
            if self.consume {
                event.consume();
            }
        }
    }

    fn dispatch(list: &ListenerList<dyn WindowListener>, event: &WindowEvent) {
        for listener in list.snapshot().iter() {
            if event.deliver_to(listener.as_ref()) {
                break;
            }
        }
    }

    #[test]
    fn test_consumed_event_stops_propagation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let list: ListenerList<dyn WindowListener> = ListenerList::new();
        list.add(Arc::new(Recorder { name: "first", consume: true, log: Arc::clone(&log) }));
        list.add(Arc::new(Recorder { name: "second", consume: false, log: Arc::clone(&log) }));

        let event = WindowEvent::new(WindowEventType::Resized, 1, 0);
        dispatch(&list, &event);
        assert!(event.is_consumed());
        assert_eq!(*log.lock(), vec!["first"]);
    }

    #[test]
    fn test_insert_and_remove_by_identity() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let list: ListenerList<dyn WindowListener> = ListenerList::new();
        let a: Arc<dyn WindowListener> =
            Arc::new(Recorder { name: "a", consume: false, log: Arc::clone(&log) });
        let b: Arc<dyn WindowListener> =
            Arc::new(Recorder { name: "b", consume: false, log: Arc::clone(&log) });

        list.add(Arc::clone(&a));
        list.insert(0, Arc::clone(&b)).unwrap();
        assert!(list.insert(5, Arc::clone(&b)).is_err());

        dispatch(&list, &WindowEvent::new(WindowEventType::Resized, 1, 0));
        assert_eq!(*log.lock(), vec!["b", "a"]);

        assert!(list.remove(&b));
        assert!(!list.remove(&b));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_snapshot_survives_mutation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let list: ListenerList<dyn WindowListener> = ListenerList::new();
        list.add(Arc::new(Recorder { name: "a", consume: false, log }));

        let snapshot = list.snapshot();
        list.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_printable_keys() {
        let typed = |c| KeyEvent::new(KeyEventType::Released, 1, 0, Modifiers::empty(), 65, 65, c);
        assert!(typed('a').is_printable());
        assert!(!typed('\0').is_printable());
        assert!(!typed('\u{8}').is_printable());
    }
}
