//! Pointer event normalization
//!
//! Per-window state machine turning raw driver reports into the normalized
//! stream: ENTER/EXIT clamping and synthesis, duplicate MOVE suppression,
//! click counting, synthesized CLICKED and DRAGGED re-tagging.

use crate::error::{WindowError, WindowResult};
use crate::events::{MouseEvent, MouseEventType, WindowId};
use crate::foundation::geometry::{Point, Size};
use crate::foundation::logging::TARGET_MOUSE;

use super::Modifiers;

/// Highest valid 1-based mouse button number
pub const BUTTON_COUNT: u16 = 9;

/// A raw pointer report from a driver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseInput {
    /// Reported type; only `Pressed`, `Released`, `Moved`, `Entered`,
    /// `Exited` and `WheelMoved` are meaningful
    pub kind: MouseEventType,
    /// Keyboard modifiers held
    pub modifiers: Modifiers,
    /// Client area x, `-1` for an EXIT with unknown position
    pub x: i32,
    /// Client area y, `-1` for an EXIT with unknown position
    pub y: i32,
    /// 1-based button, zero for none
    pub button: u16,
    /// Wheel rotation
    pub rotation: f32,
}

impl MouseInput {
    /// Report without button or rotation
    pub fn new(kind: MouseEventType, x: i32, y: i32) -> Self {
        Self {
            kind,
            modifiers: Modifiers::empty(),
            x,
            y,
            button: 0,
            rotation: 0.0,
        }
    }

    /// Set the button
    pub fn with_button(mut self, button: u16) -> Self {
        self.button = button;
        self
    }

    /// Set keyboard modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Set wheel rotation
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Window state the tracker needs for one report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerContext {
    /// Source window
    pub source: WindowId,
    /// Current client area size
    pub size: Size,
    /// Pointer confined to the window
    pub confined: bool,
    /// Pointer visible
    pub visible: bool,
    /// Timestamp of the report
    pub when: u64,
    /// Click timeout in milliseconds
    pub click_timeout: u64,
}

/// Per-window pointer state
#[derive(Debug, Clone, Default)]
pub struct MouseTracker {
    last_position: Point,
    in_window: bool,
    last_pressed: u64,
    click_count: u16,
    pressed_button: u16,
    button_mask: Modifiers,
}

impl MouseTracker {
    /// Create a tracker with the pointer outside the window
    pub fn new() -> Self {
        Self::default()
    }

    /// Buttons currently held, as modifier bits
    pub fn held_buttons(&self) -> Modifiers {
        self.button_mask
    }

    /// True after ENTER until EXIT
    pub fn is_in_window(&self) -> bool {
        self.in_window
    }

    /// Last reported in-window pointer position
    pub fn last_position(&self) -> Point {
        self.last_position
    }

    fn clear_press_state(&mut self) {
        self.last_pressed = 0;
        self.click_count = 0;
        self.pressed_button = 0;
        self.button_mask = Modifiers::empty();
    }

    /// Normalize one report into zero or more events, in delivery order
    ///
    /// Fails for a button outside `0..=BUTTON_COUNT`.
    pub fn process(&mut self, input: MouseInput, ctx: &PointerContext) -> WindowResult<Vec<MouseEvent>> {
        let MouseInput { kind, mut modifiers, mut x, mut y, button, rotation } = input;
        let when = ctx.when;

        if matches!(kind, MouseEventType::Entered | MouseEventType::Exited) {
            if kind == MouseEventType::Exited && x == -1 && y == -1 {
                x = self.last_position.x;
                y = self.last_position.y;
            }
            x = x.min(ctx.size.width - 1).max(0);
            y = y.min(ctx.size.height - 1).max(0);
            self.in_window = kind == MouseEventType::Entered;
            self.clear_press_state();
        }
        if x < 0 || y < 0 || x >= ctx.size.width || y >= ctx.size.height {
            log::trace!(target: TARGET_MOUSE, "dropping {:?} outside window at {}/{}", kind, x, y);
            return Ok(Vec::new());
        }

        let mut events = Vec::with_capacity(2);
        if kind == MouseEventType::Moved {
            if !self.in_window {
                self.in_window = true;
                self.clear_press_state();
                events.push(MouseEvent::new(
                    MouseEventType::Entered,
                    ctx.source,
                    when,
                    modifiers,
                    x,
                    y,
                    0,
                    0,
                    0.0,
                ));
            } else if self.last_position == Point::new(x, y) {
                log::trace!(target: TARGET_MOUSE, "skipping MOVE to same position {}/{}", x, y);
                return Ok(Vec::new());
            }
            self.last_position = Point::new(x, y);
        }

        if button > BUTTON_COUNT {
            return Err(WindowError::InvalidArgument(format!("invalid mouse button number {}", button)));
        }
        modifiers |= Modifiers::button_mask(button) | self.button_mask;
        if ctx.confined {
            modifiers |= Modifiers::CONFINED;
        }
        if !ctx.visible {
            modifiers |= Modifiers::INVISIBLE;
        }

        let within_click = |last: u64| when.saturating_sub(last) < ctx.click_timeout;
        let mut clicked = None;
        let event = match kind {
            MouseEventType::Pressed => {
                self.click_count = if within_click(self.last_pressed) {
                    self.click_count.saturating_add(1)
                } else {
                    1
                };
                self.last_pressed = when;
                self.pressed_button = button;
                self.button_mask |= Modifiers::button_mask(button);
                MouseEvent::new(kind, ctx.source, when, modifiers, x, y, self.click_count, button, 0.0)
            }
            MouseEventType::Released => {
                let released =
                    MouseEvent::new(kind, ctx.source, when, modifiers, x, y, self.click_count, button, 0.0);
                if within_click(self.last_pressed) {
                    clicked = Some(MouseEvent::new(
                        MouseEventType::Clicked,
                        ctx.source,
                        when,
                        modifiers,
                        x,
                        y,
                        self.click_count,
                        button,
                        0.0,
                    ));
                } else {
                    self.click_count = 0;
                    self.last_pressed = 0;
                }
                self.pressed_button = 0;
                self.button_mask.remove(Modifiers::button_mask(button));
                released
            }
            MouseEventType::Moved if self.pressed_button > 0 => MouseEvent::new(
                MouseEventType::Dragged,
                ctx.source,
                when,
                modifiers,
                x,
                y,
                1,
                self.pressed_button,
                0.0,
            ),
            MouseEventType::WheelMoved => {
                MouseEvent::new(kind, ctx.source, when, modifiers, x, y, 0, button, rotation)
            }
            _ => MouseEvent::new(kind, ctx.source, when, modifiers, x, y, 0, button, 0.0),
        };
        events.push(event);
        events.extend(clicked);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(when: u64) -> PointerContext {
        PointerContext {
            source: 7,
            size: Size::new(200, 100),
            confined: false,
            visible: true,
            when,
            click_timeout: 300,
        }
    }

    fn kinds(events: &[MouseEvent]) -> Vec<MouseEventType> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_first_move_synthesizes_enter() {
        let mut tracker = MouseTracker::new();
        let events = tracker.process(MouseInput::new(MouseEventType::Moved, 10, 10), &ctx(0)).unwrap();
        assert_eq!(kinds(&events), vec![MouseEventType::Entered, MouseEventType::Moved]);
        assert!(tracker.is_in_window());

        let events = tracker.process(MouseInput::new(MouseEventType::Moved, 10, 10), &ctx(5)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_exit_uses_last_position_and_clamps() {
        let mut tracker = MouseTracker::new();
        tracker.process(MouseInput::new(MouseEventType::Moved, 150, 40), &ctx(0)).unwrap();

        let events = tracker.process(MouseInput::new(MouseEventType::Exited, -1, -1), &ctx(1)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].x, events[0].y), (150, 40));

        let events = tracker.process(MouseInput::new(MouseEventType::Entered, 500, -20), &ctx(2)).unwrap();
        assert_eq!((events[0].x, events[0].y), (199, 0));
    }

    #[test]
    fn test_events_outside_window_are_dropped() {
        let mut tracker = MouseTracker::new();
        let events = tracker
            .process(MouseInput::new(MouseEventType::Pressed, 250, 10).with_button(1), &ctx(0))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_invalid_button() {
        let mut tracker = MouseTracker::new();
        let result = tracker.process(MouseInput::new(MouseEventType::Pressed, 5, 5).with_button(10), &ctx(0));
        assert!(matches!(result, Err(WindowError::InvalidArgument(_))));
    }

    #[test]
    fn test_double_click_counts() {
        let mut tracker = MouseTracker::new();
        let press = MouseInput::new(MouseEventType::Pressed, 20, 20).with_button(1);
        let release = MouseInput::new(MouseEventType::Released, 20, 20).with_button(1);

        let first = tracker.process(press, &ctx(1000)).unwrap();
        assert_eq!(first[0].click_count, 1);
        let first_up = tracker.process(release, &ctx(1050)).unwrap();
        assert_eq!(kinds(&first_up), vec![MouseEventType::Released, MouseEventType::Clicked]);
        assert_eq!(first_up[1].click_count, 1);

        tracker.process(press, &ctx(1150)).unwrap();
        let second_up = tracker.process(release, &ctx(1200)).unwrap();
        assert_eq!(second_up[1].kind, MouseEventType::Clicked);
        assert_eq!(second_up[1].click_count, 2);
    }

    #[test]
    fn test_slow_press_resets_click_count() {
        let mut tracker = MouseTracker::new();
        let press = MouseInput::new(MouseEventType::Pressed, 20, 20).with_button(1);
        let release = MouseInput::new(MouseEventType::Released, 20, 20).with_button(1);

        tracker.process(press, &ctx(0)).unwrap();
        tracker.process(release, &ctx(50)).unwrap();
        let late = tracker.process(press, &ctx(1000)).unwrap();
        assert_eq!(late[0].click_count, 1);

        let late_up = tracker.process(release, &ctx(2000)).unwrap();
        assert_eq!(kinds(&late_up), vec![MouseEventType::Released]);
    }

    #[test]
    fn test_drag_and_button_mask() {
        let mut tracker = MouseTracker::new();
        tracker.process(MouseInput::new(MouseEventType::Moved, 1, 1), &ctx(0)).unwrap();
        tracker
            .process(MouseInput::new(MouseEventType::Pressed, 1, 1).with_button(3), &ctx(10))
            .unwrap();
        assert_eq!(tracker.held_buttons(), Modifiers::BUTTON3);

        let drag = tracker.process(MouseInput::new(MouseEventType::Moved, 5, 5), &ctx(20)).unwrap();
        assert_eq!(drag[0].kind, MouseEventType::Dragged);
        assert_eq!(drag[0].button, 3);
        assert!(drag[0].modifiers.contains(Modifiers::BUTTON3));

        tracker
            .process(MouseInput::new(MouseEventType::Released, 5, 5).with_button(3), &ctx(30))
            .unwrap();
        assert!(tracker.held_buttons().is_empty());
    }

    #[test]
    fn test_pointer_state_modifiers() {
        let mut tracker = MouseTracker::new();
        let mut hidden = ctx(0);
        hidden.visible = false;
        hidden.confined = true;
        let events = tracker.process(MouseInput::new(MouseEventType::Moved, 3, 3), &hidden).unwrap();
        assert!(events[1].modifiers.contains(Modifiers::CONFINED | Modifiers::INVISIBLE));
    }

    #[test]
    fn test_wheel_carries_rotation() {
        let mut tracker = MouseTracker::new();
        let events = tracker
            .process(MouseInput::new(MouseEventType::WheelMoved, 3, 3).with_rotation(1.5), &ctx(0))
            .unwrap();
        assert_eq!(events[0].rotation, 1.5);
    }
}
