//! Input normalization
//!
//! Drivers report raw pointer and key transitions. The trackers here turn
//! them into the normalized event stream listeners see: enter/exit
//! synthesis, click counting, drag tagging, key auto-repeat detection and
//! synthesized typed events.

pub mod keyboard;
pub mod mouse;

pub use keyboard::{KeyInput, KeyTracker, KEY_TRACKING_RANGE};
pub use mouse::{MouseInput, MouseTracker, PointerContext, BUTTON_COUNT};

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifiers, held mouse buttons and pointer state bits carried
    /// by every input event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        /// Shift key held
        const SHIFT = 1 << 0;
        /// Control key held
        const CTRL = 1 << 1;
        /// Meta key held
        const META = 1 << 2;
        /// Alt key held
        const ALT = 1 << 3;
        /// AltGr key held
        const ALT_GRAPH = 1 << 4;

        /// Mouse button 1 held
        const BUTTON1 = 1 << 5;
        /// Mouse button 2 held
        const BUTTON2 = 1 << 6;
        /// Mouse button 3 held
        const BUTTON3 = 1 << 7;
        /// Mouse button 4 held
        const BUTTON4 = 1 << 8;
        /// Mouse button 5 held
        const BUTTON5 = 1 << 9;
        /// Mouse button 6 held
        const BUTTON6 = 1 << 10;
        /// Mouse button 7 held
        const BUTTON7 = 1 << 11;
        /// Mouse button 8 held
        const BUTTON8 = 1 << 12;
        /// Mouse button 9 held
        const BUTTON9 = 1 << 13;

        /// Key event produced by keyboard auto-repeat
        const AUTOREPEAT = 1 << 29;
        /// Pointer is confined to the window
        const CONFINED = 1 << 30;
        /// Pointer is hidden
        const INVISIBLE = 1 << 31;
    }
}

impl Modifiers {
    /// All mouse button bits
    pub const ALL_BUTTONS: Self = Self::from_bits_retain(
        Self::BUTTON1.bits()
            | Self::BUTTON2.bits()
            | Self::BUTTON3.bits()
            | Self::BUTTON4.bits()
            | Self::BUTTON5.bits()
            | Self::BUTTON6.bits()
            | Self::BUTTON7.bits()
            | Self::BUTTON8.bits()
            | Self::BUTTON9.bits(),
    );

    /// Mask bit for a 1-based mouse button; empty for 0 (no button) and
    /// anything past [`BUTTON_COUNT`]
    pub const fn button_mask(button: u16) -> Self {
        if button == 0 || button > BUTTON_COUNT {
            Self::empty()
        } else {
            Self::from_bits_retain(1 << (4 + button as u32))
        }
    }

    /// Held mouse buttons only
    pub fn buttons(self) -> Self {
        self & Self::ALL_BUTTONS
    }

    /// True if any mouse button is held
    pub fn any_button(self) -> bool {
        self.intersects(Self::ALL_BUTTONS)
    }
}
