//! Size and position

use super::Window;
use crate::driver::ReconfigureFlags;
use crate::error::WindowResult;
use crate::foundation::geometry::{Insets, Point, Rect, Size};
use crate::foundation::logging::TARGET_WINDOW;

impl Window {
    /// Resize the client area
    ///
    /// Ignored while fullscreen. Shrinking a visible window to zero hides it
    /// and keeps the intent to show it; growing a window with a pending show
    /// realizes or re-shows it.
    pub fn set_size(&self, width: i32, height: i32) -> WindowResult<()> {
        self.run_on_edt(move |w| w.set_size_action(width, height))
    }

    /// Resize so the window including decorations is `width`x`height`
    pub fn set_top_level_size(&self, width: i32, height: i32) -> WindowResult<()> {
        let insets = self.insets();
        self.set_size(width - insets.total_width(), height - insets.total_height())
    }

    fn set_size_action(&self, width: i32, height: i32) -> WindowResult<()> {
        let _guard = self.lock_window();
        let (fullscreen, current, visible, requested) = {
            let state = self.state();
            (state.fullscreen, state.size, state.visible, state.visible_requested)
        };
        let target = Size::new(width, height);
        if fullscreen || current == target {
            return Ok(());
        }
        let valid = self.is_native_valid();
        log::debug!(
            target: TARGET_WINDOW,
            "window {} set size {:?} -> {:?}, visible {}, requested {}, realized {}",
            self.id(),
            current,
            target,
            visible,
            requested,
            valid
        );

        if visible && valid && !target.has_area() {
            self.define_size(0, 0);
            self.set_visible_action(false)?;
            self.state().visible_requested = true;
        } else if !visible && requested && target.has_area() {
            self.define_size(width, height);
            self.set_visible_action(true)?;
        } else if visible && valid {
            let flags = self.reconfigure_flags(ReconfigureFlags::empty(), true);
            self.reconfigure(Rect::from_parts(self.position(), target), flags);
            self.wait_for_size(width, height, false, self.native_timeout())?;
        } else {
            self.define_size(width, height);
        }
        Ok(())
    }

    /// Move the client area; turns off automatic placement
    pub fn set_position(&self, x: i32, y: i32) -> WindowResult<()> {
        self.state().auto_position = false;
        self.run_on_edt(move |w| {
            w.set_position_action(x, y);
            Ok(())
        })
    }

    /// Move so the window including decorations starts at (`x`, `y`)
    pub fn set_top_level_position(&self, x: i32, y: i32) -> WindowResult<()> {
        let insets = self.insets();
        self.set_position(x + insets.left, y + insets.top)
    }

    fn set_position_action(&self, x: i32, y: i32) {
        let _guard = self.lock_window();
        let (fullscreen, current, size, visible) = {
            let state = self.state();
            (state.fullscreen, state.position, state.size, state.visible)
        };
        let target = Point::new(x, y);
        if fullscreen || current == target {
            return;
        }
        if self.is_native_valid() {
            let flags = self.reconfigure_flags(ReconfigureFlags::empty(), visible);
            self.reconfigure(Rect::from_parts(target, size), flags);
            // window managers may refuse placement; the miss is logged
            let _reached = self.wait_for_position(true, x, y, self.native_timeout());
        } else {
            self.define_position(x, y);
        }
    }

    /// Decoration insets; zero for undecorated windows
    pub fn insets(&self) -> Insets {
        if self.is_undecorated() {
            return Insets::ZERO;
        }
        if self.is_native_valid() {
            if let Some(insets) = self.driver().update_insets() {
                self.notifier().insets_changed(false, insets);
            }
        }
        self.state().insets
    }

    /// Client area origin in screen coordinates
    ///
    /// Asks the driver while realized; otherwise adds up positions along the
    /// parent chain.
    pub fn location_on_screen(&self) -> Point {
        if self.is_native_valid() {
            let _guard = self.lock_window();
            if let Some(location) = self.driver().location_on_screen(0, 0) {
                return location;
            }
        }
        let position = self.position();
        match self.parent() {
            Some(parent) => {
                let origin = parent.location_on_screen();
                position.translated(origin.x, origin.y)
            }
            None => position,
        }
    }
}
