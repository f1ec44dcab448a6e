//! Key event normalization: auto-repeat tracking and synthesized TYPED

use crate::error::{WindowError, WindowResult};
use crate::events::{KeyEvent, KeyEventType, WindowId};
use crate::foundation::logging::TARGET_KEY;

use super::Modifiers;

/// Highest key code whose pressed state is tracked
pub const KEY_TRACKING_RANGE: u16 = 255;

/// A raw key report from a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    /// `Pressed` or `Released`
    pub kind: KeyEventType,
    /// Keyboard modifiers held
    pub modifiers: Modifiers,
    /// Layout independent key code
    pub key_code: u16,
    /// Layout dependent key symbol
    pub key_symbol: u16,
    /// Produced character, `'\0'` if none
    pub key_char: char,
}

impl KeyInput {
    /// Key report with identical code and symbol
    pub fn new(kind: KeyEventType, key_code: u16, key_char: char) -> Self {
        Self {
            kind,
            modifiers: Modifiers::empty(),
            key_code,
            key_symbol: key_code,
            key_char,
        }
    }

    /// Set keyboard modifiers
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Pressed-key bitset for codes `0..=KEY_TRACKING_RANGE`
#[derive(Debug, Clone, Default)]
pub struct KeyTracker {
    pressed: [u64; 4],
}

impl KeyTracker {
    /// Create a tracker with no key held
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `key_code` is within the tracked range
    pub const fn is_tracked(key_code: u16) -> bool {
        key_code <= KEY_TRACKING_RANGE
    }

    /// Pressed state of a tracked key; untracked keys are never pressed
    pub fn is_pressed(&self, key_code: u16) -> bool {
        if !Self::is_tracked(key_code) {
            return false;
        }
        let (word, bit) = Self::slot(key_code);
        self.pressed[word] & bit != 0
    }

    /// Set the pressed state; returns the previous state
    pub fn set_pressed(&mut self, key_code: u16, pressed: bool) -> bool {
        if !Self::is_tracked(key_code) {
            return false;
        }
        let (word, bit) = Self::slot(key_code);
        let previous = self.pressed[word] & bit != 0;
        if pressed {
            self.pressed[word] |= bit;
        } else {
            self.pressed[word] &= !bit;
        }
        previous
    }

    const fn slot(key_code: u16) -> (usize, u64) {
        ((key_code / 64) as usize, 1 << (key_code % 64))
    }

    /// Normalize a key report
    ///
    /// Returns the event to deliver and, for the release of a printable key
    /// that is not auto-repeated, the synthesized TYPED event that follows
    /// it. `held_buttons` are the mouse buttons currently down.
    pub fn process(
        &mut self,
        source: WindowId,
        input: KeyInput,
        held_buttons: Modifiers,
        when: u64,
    ) -> WindowResult<(KeyEvent, Option<KeyEvent>)> {
        let mut modifiers = input.modifiers | held_buttons.buttons();
        match input.kind {
            KeyEventType::Typed => {
                return Err(WindowError::InvalidArgument(
                    "TYPED key events are synthesized and cannot be sent".to_string(),
                ));
            }
            KeyEventType::Pressed => {
                if self.set_pressed(input.key_code, true) {
                    modifiers |= Modifiers::AUTOREPEAT;
                }
            }
            KeyEventType::Released => {
                if !modifiers.contains(Modifiers::AUTOREPEAT) {
                    self.set_pressed(input.key_code, false);
                }
            }
        }

        let event = KeyEvent::new(
            input.kind,
            source,
            when,
            modifiers,
            input.key_code,
            input.key_symbol,
            input.key_char,
        );
        let typed = (event.kind == KeyEventType::Released && event.is_printable() && !event.is_auto_repeat())
            .then(|| {
                KeyEvent::new(
                    KeyEventType::Typed,
                    source,
                    when,
                    modifiers,
                    input.key_code,
                    input.key_symbol,
                    input.key_char,
                )
            });
        log::trace!(
            target: TARGET_KEY,
            "{:?} code {} char {:?} mods {:?} typed {}",
            event.kind,
            event.key_code,
            event.key_char,
            event.modifiers,
            typed.is_some()
        );
        Ok((event, typed))
    }
}
