//! Fullscreen transitions and monitor changes

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::support::{EventLog, Fixture, Journal};
use crate::driver::Capabilities;
use crate::error::WindowError;
use crate::events::WindowEventType;
use crate::foundation::geometry::{Rect, Size};
use crate::window::{LifecycleHook, Window};

/// Counts rendering pauses and resumes
#[derive(Default)]
struct RenderGate {
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

impl LifecycleHook for RenderGate {
    fn pause_rendering_action(&self) -> bool {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn resume_rendering_action(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(fx: &Fixture, bounds: Rect) -> Window {
        let window = Window::create(&fx.screen, Capabilities::onscreen()).unwrap();
        window.set_position(bounds.x, bounds.y).unwrap();
        window.set_size(bounds.width, bounds.height).unwrap();
        window.set_visible(true).unwrap();
        window
    }

    #[test]
    fn test_span_all_monitors_and_restore() {
        let fx = Fixture::dual_monitor();
        let window = shown(&fx, Rect::new(100, 100, 640, 480));
        let events: Journal = Arc::default();
        let log = EventLog::shared("", &events);
        window.add_window_listener(log.clone());

        assert!(window.set_fullscreen_on(fx.screen.monitors()).unwrap());
        assert!(window.is_fullscreen());
        assert_eq!(window.bounds(), Rect::new(0, 0, 3840, 1080));
        assert_eq!(window.fullscreen_snapshot().bounds, Rect::new(100, 100, 640, 480));
        assert!(window.is_undecorated());
        assert!(fx.journal().iter().any(|e| e.contains("*FS_true_span_true")));
        let entered = log.count(WindowEventType::Resized);
        assert!(entered >= 1);

        assert!(!window.set_fullscreen(false).unwrap());
        assert!(!window.is_fullscreen());
        assert_eq!(window.bounds(), Rect::new(100, 100, 640, 480));
        assert!(window.is_visible());
        assert!(log.count(WindowEventType::Resized) > entered);
    }

    #[test]
    fn test_main_monitor_has_largest_overlap() {
        let fx = Fixture::dual_monitor();
        let window = shown(&fx, Rect::new(1800, 100, 640, 480));
        assert_eq!(window.main_monitor().id, 1);

        window.set_fullscreen(true).unwrap();
        assert_eq!(window.bounds(), Rect::new(1920, 0, 1920, 1080));
        assert!(fx.journal().iter().any(|e| e.contains("*FS_true_span_false")));
    }

    #[test]
    fn test_repeated_request_is_noop() {
        let fx = Fixture::new();
        let window = shown(&fx, Rect::new(10, 10, 300, 200));
        window.set_fullscreen(true).unwrap();
        fx.clear_journal();

        assert!(window.set_fullscreen(true).unwrap());
        assert!(fx.journal().is_empty());
    }

    #[test]
    fn test_request_before_realization_applies_on_show() {
        let fx = Fixture::new();
        let window = Window::create(&fx.screen, Capabilities::onscreen()).unwrap();
        assert!(window.set_fullscreen(true).unwrap());
        assert!(!window.is_native_valid());

        window.set_visible(true).unwrap();
        assert!(window.is_fullscreen());
        assert_eq!(window.bounds(), Rect::new(0, 0, 1920, 1080));

        window.set_fullscreen(false).unwrap();
        assert_eq!(window.size(), Size::new(128, 128));
    }

    #[test]
    fn test_size_ignored_while_fullscreen() {
        let fx = Fixture::new();
        let window = shown(&fx, Rect::new(10, 10, 300, 200));
        window.set_fullscreen(true).unwrap();

        window.set_size(100, 100).unwrap();
        window.set_position(5, 5).unwrap();
        assert_eq!(window.bounds(), Rect::new(0, 0, 1920, 1080));
    }

    #[test]
    fn test_empty_monitor_list_rejected() {
        let fx = Fixture::new();
        let window = shown(&fx, Rect::new(10, 10, 300, 200));
        let result = window.set_fullscreen_on(Vec::new());
        assert!(matches!(result, Err(WindowError::InvalidArgument(_))));
        assert!(!window.is_fullscreen());
    }

    #[test]
    fn test_monitor_shrink_fits_window() {
        let fx = Fixture::new();
        let window = shown(&fx, Rect::new(0, 0, 1600, 900));
        let events: Journal = Arc::default();
        let log = EventLog::shared("", &events);
        window.add_window_listener(log.clone());

        fx.screen.set_monitor_viewport(0, Rect::new(0, 0, 1280, 720)).unwrap();
        assert_eq!(window.size(), Size::new(1280, 720));
        assert!(log.count(WindowEventType::Resized) >= 1);
    }

    #[test]
    fn test_monitor_listener_follows_realization() {
        let fx = Fixture::new();
        let window = shown(&fx, Rect::new(0, 0, 300, 200));
        assert_eq!(fx.screen.monitor_mode_listener_count(), 1);

        window.destroy();
        assert_eq!(fx.screen.monitor_mode_listener_count(), 0);

        // a destroyed window is not resized
        fx.screen.set_monitor_viewport(0, Rect::new(0, 0, 200, 100)).unwrap();
        assert_eq!(window.size(), Size::new(300, 200));
    }

    #[test]
    fn test_mode_change_pauses_and_fits_window() {
        let fx = Fixture::new();
        let window = shown(&fx, Rect::new(0, 0, 1920, 1080));
        let gate = Arc::new(RenderGate::default());
        window.set_lifecycle_hook(Some(gate.clone()));
        let events: Journal = Arc::default();
        let log = EventLog::shared("", &events);
        window.add_window_listener(log.clone());

        fx.screen.set_monitor_viewport(0, Rect::new(0, 0, 1280, 720)).unwrap();
        assert_eq!(window.size(), Size::new(1280, 720));
        assert_eq!(gate.pauses.load(Ordering::SeqCst), 1);
        assert_eq!(gate.resumes.load(Ordering::SeqCst), 1);
        assert!(log.count(WindowEventType::Resized) >= 1);
    }

    #[test]
    fn test_offscreen_child_detours_through_top_level() {
        let fx = Fixture::new();
        let parent = shown(&fx, Rect::new(100, 50, 800, 600));
        let child = Window::create_child(&parent, Capabilities::offscreen()).unwrap();
        child.set_size(200, 150).unwrap();
        child.set_visible(true).unwrap();
        assert_eq!(child.parent_window_handle(), parent.window_handle());

        assert!(child.set_fullscreen(true).unwrap());
        assert!(child.parent().is_none());
        assert_eq!(parent.child_count(), 0);
        assert!(child.fullscreen_snapshot().parent.is_some_and(|p| p.ptr_eq(&parent)));
        assert_eq!(child.fullscreen_snapshot().bounds, Rect::new(100, 50, 200, 150));
        assert_eq!(child.bounds(), Rect::new(0, 0, 1920, 1080));

        assert!(!child.set_fullscreen(false).unwrap());
        assert!(child.parent().is_some_and(|p| p.ptr_eq(&parent)));
        assert_eq!(parent.child_count(), 1);
        assert!(child.fullscreen_snapshot().parent.is_none());
        assert!(child.is_visible());
        assert_eq!(child.bounds(), Rect::new(0, 0, 200, 150));
        assert_eq!(child.parent_window_handle(), parent.window_handle());
        let recreated = format!("parent {:#x}", parent.window_handle());
        let last_create = fx.journal().into_iter().rev().find(|e| e.starts_with("create"));
        assert!(last_create.is_some_and(|e| e.ends_with(&recreated)));
    }

    #[test]
    fn test_offscreen_top_level_cannot_go_fullscreen() {
        let fx = Fixture::new();
        let window = Window::create(&fx.screen, Capabilities::offscreen()).unwrap();
        window.set_visible(true).unwrap();
        let result = window.set_fullscreen(true);
        assert!(matches!(result, Err(WindowError::Internal(_))));
        assert!(!window.is_fullscreen());
    }
}
