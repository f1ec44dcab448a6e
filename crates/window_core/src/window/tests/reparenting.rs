//! Moving windows between parents

use std::sync::atomic::Ordering;

use super::support::{config, monitor, Fixture};
use crate::driver::Capabilities;
use crate::foundation::geometry::{Insets, Point, Rect};
use crate::window::{ReparentOutcome, Window};

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(fx: &Fixture, x: i32, y: i32, width: i32, height: i32) -> Window {
        let window = Window::create(&fx.screen, Capabilities::onscreen()).unwrap();
        window.set_position(x, y).unwrap();
        window.set_size(width, height).unwrap();
        window.set_visible(true).unwrap();
        window
    }

    #[test]
    fn test_visible_top_level_reparents_natively() {
        let fx = Fixture::new();
        let parent = shown(&fx, 100, 50, 400, 300);
        let window = shown(&fx, 10, 10, 640, 480);
        let handle = window.window_handle();

        let outcome = window.reparent(Some(&parent)).unwrap();
        assert_eq!(outcome, ReparentOutcome::NativeReparenting);
        assert_eq!(window.window_handle(), handle);
        assert_eq!(window.bounds(), Rect::new(0, 0, 400, 300));
        assert_eq!(window.parent_window_handle(), parent.window_handle());
        assert!(window.parent().is_some_and(|p| p.ptr_eq(&parent)));
        assert_eq!(parent.child_count(), 1);
        assert!(window.is_visible());
        assert!(fx.journal().iter().any(|e| e.contains("*PARENT_true")));
    }

    #[test]
    fn test_top_level_to_top_level_is_nop() {
        let fx = Fixture::new();
        let window = shown(&fx, 10, 10, 200, 100);
        let other = shown(&fx, 300, 10, 200, 100);

        assert_eq!(window.reparent(None).unwrap(), ReparentOutcome::Nop);
        assert!(window.parent().is_none());
        assert_eq!(other.child_count(), 0);
        assert_eq!(window.child_count(), 0);
    }

    #[test]
    fn test_same_parent_is_nop() {
        let fx = Fixture::new();
        let parent = shown(&fx, 0, 0, 400, 300);
        let child = Window::create_child(&parent, Capabilities::onscreen()).unwrap();
        child.set_visible(true).unwrap();

        assert_eq!(child.reparent(Some(&parent)).unwrap(), ReparentOutcome::Nop);
        assert_eq!(parent.child_count(), 1);
    }

    #[test]
    fn test_reparent_to_self_is_rejected() {
        let fx = Fixture::new();
        let window = shown(&fx, 0, 0, 200, 100);
        assert!(window.reparent(Some(&window)).is_err());
    }

    #[test]
    fn test_child_to_top_level_keeps_screen_location() {
        let fx = Fixture::new();
        let parent = shown(&fx, 100, 50, 400, 300);
        let child = Window::create_child(&parent, Capabilities::onscreen()).unwrap();
        child.set_size(200, 100).unwrap();
        child.set_visible(true).unwrap();
        assert_eq!(child.position(), Point::new(0, 0));

        let outcome = child.reparent(None).unwrap();
        assert_eq!(outcome, ReparentOutcome::NativeReparenting);
        assert_eq!(child.position(), Point::new(100, 50));
        assert_eq!(child.parent_window_handle(), 0);
        assert!(child.parent().is_none());
        assert_eq!(parent.child_count(), 0);
        assert!(child.is_visible());
    }

    #[test]
    fn test_failed_native_reparent_recreates() {
        let fx = Fixture::new();
        let parent = shown(&fx, 100, 50, 400, 300);
        let window = shown(&fx, 10, 10, 320, 240);
        let handle = window.window_handle();
        fx.knobs.fail_reparent.store(true, Ordering::SeqCst);

        let outcome = window.reparent(Some(&parent)).unwrap();
        assert_eq!(outcome, ReparentOutcome::NativeCreation);
        assert!(window.is_native_valid());
        assert!(window.is_visible());
        assert_ne!(window.window_handle(), handle);
        assert_eq!(window.parent_window_handle(), parent.window_handle());

        let journal = fx.journal();
        assert!(journal.contains(&format!("close {:#x}", handle)));
        assert!(journal.contains(&format!(
            "create {:#x} parent {:#x}",
            window.window_handle(),
            parent.window_handle()
        )));
    }

    #[test]
    fn test_unrealized_parent_defers_creation() {
        let fx = Fixture::new();
        let parent = Window::create(&fx.screen, Capabilities::onscreen()).unwrap();
        parent.set_size(400, 300).unwrap();
        let window = shown(&fx, 10, 10, 200, 100);

        let outcome = window.reparent(Some(&parent)).unwrap();
        assert_eq!(outcome, ReparentOutcome::NativeCreationPending);
        assert!(!window.is_native_valid());
        assert!(window.is_visible_pending());

        parent.set_visible(true).unwrap();
        assert!(window.is_native_valid());
        assert!(window.is_visible());
        assert_eq!(window.parent_window_handle(), parent.window_handle());
        assert_eq!(window.position(), Point::new(0, 0));
    }

    #[test]
    fn test_forced_recreation_from_config() {
        let fx = Fixture::with(
            config(true).with_forced_reparent_recreation(true),
            vec![monitor(0, 0)],
            Insets::ZERO,
        );
        let parent = shown(&fx, 100, 50, 400, 300);
        let window = shown(&fx, 10, 10, 200, 100);
        let handle = window.window_handle();

        let outcome = window.reparent(Some(&parent)).unwrap();
        assert_eq!(outcome, ReparentOutcome::NativeCreation);
        assert_ne!(window.window_handle(), handle);
        assert_eq!(window.parent_window_handle(), parent.window_handle());
        assert!(window.is_visible());
        assert!(!fx.journal().iter().any(|e| e.contains("*PARENT_true")));
    }

    #[test]
    fn test_unrealized_window_takes_new_parent() {
        let fx = Fixture::new();
        let parent = shown(&fx, 0, 0, 400, 300);
        let window = Window::create(&fx.screen, Capabilities::onscreen()).unwrap();

        assert_eq!(window.reparent(Some(&parent)).unwrap(), ReparentOutcome::NativeCreation);
        assert!(!window.is_native_valid());

        window.set_visible(true).unwrap();
        assert_eq!(window.parent_window_handle(), parent.window_handle());
    }
}
