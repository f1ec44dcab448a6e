//! Event delivery, coalescing under the window lock and stale event drops

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use super::support::{EventLog, Fixture, Journal};
use crate::driver::Capabilities;
use crate::events::{Event, WindowEvent, WindowEventType, WindowListener};
use crate::foundation::geometry::Rect;
use crate::window::Window;

/// Consumes every repaint it sees
struct RepaintSink;

impl WindowListener for RepaintSink {
    fn window_repaint(&self, event: &WindowEvent) {
        event.consume();
    }
}

/// Records the dirty regions of repaint events
#[derive(Default)]
struct RegionLog {
    regions: Mutex<Vec<Rect>>,
}

impl WindowListener for RegionLog {
    fn window_repaint(&self, event: &WindowEvent) {
        self.regions.lock().extend(event.repaint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shown(fx: &Fixture) -> (Window, Arc<EventLog>) {
        let window = Window::create(&fx.screen, Capabilities::onscreen()).unwrap();
        window.set_size(320, 200).unwrap();
        window.set_visible(true).unwrap();
        let events: Journal = Arc::default();
        let log = EventLog::shared("", &events);
        window.add_window_listener(log.clone());
        (window, log)
    }

    fn window_event(window: &Window, fx: &Fixture, kind: WindowEventType) -> Event {
        let when = fx.display.now_millis();
        match kind {
            WindowEventType::Repaint => WindowEvent::repaint(window.id(), when, Rect::new(0, 0, 10, 10)).into(),
            _ => WindowEvent::new(kind, window.id(), when).into(),
        }
    }

    #[test]
    fn test_events_parked_while_locked() {
        let fx = Fixture::new();
        let (window, log) = shown(&fx);

        {
            let _guard = window.lock_window();
            window.consume_event(window_event(&window, &fx, WindowEventType::Repaint));
            window.consume_event(window_event(&window, &fx, WindowEventType::Repaint));
            window.consume_event(window_event(&window, &fx, WindowEventType::Resized));
            window.consume_event(window_event(&window, &fx, WindowEventType::Moved));

            assert_eq!(window.coalesced_event_count(), 2);
            assert_eq!(log.count(WindowEventType::Repaint), 0);
            assert_eq!(log.count(WindowEventType::Resized), 0);
            assert_eq!(log.count(WindowEventType::Moved), 1);
        }

        assert_eq!(window.coalesced_event_count(), 0);
        assert_eq!(log.count(WindowEventType::Repaint), 1);
        assert_eq!(log.count(WindowEventType::Resized), 1);
    }

    #[test]
    fn test_nested_lock_flushes_on_last_release() {
        let fx = Fixture::new();
        let (window, log) = shown(&fx);

        let outer = window.lock_window();
        {
            let _inner = window.lock_window();
            window.consume_event(window_event(&window, &fx, WindowEventType::Resized));
        }
        assert_eq!(window.coalesced_event_count(), 1);
        assert_eq!(log.count(WindowEventType::Resized), 0);

        drop(outer);
        assert_eq!(log.count(WindowEventType::Resized), 1);
    }

    #[test]
    fn test_events_parked_while_other_thread_holds_lock() {
        let fx = Fixture::new();
        let (window, log) = shown(&fx);

        let guard = window.lock_window();
        let other = window.clone();
        let event = window_event(&window, &fx, WindowEventType::Resized);
        thread::spawn(move || other.consume_event(event)).join().unwrap();
        assert_eq!(window.coalesced_event_count(), 1);
        assert_eq!(log.count(WindowEventType::Resized), 0);

        drop(guard);
        assert_eq!(log.count(WindowEventType::Resized), 1);
    }

    #[test]
    fn test_stale_parked_events_dropped() {
        let fx = Fixture::new();
        let (window, log) = shown(&fx);

        {
            let _guard = window.lock_window();
            window.consume_event(window_event(&window, &fx, WindowEventType::Repaint));
            window.consume_event(window_event(&window, &fx, WindowEventType::Resized));
            fx.clock.advance(1300);
        }
        assert_eq!(window.coalesced_event_count(), 0);
        assert_eq!(log.count(WindowEventType::Repaint), 0);
        assert_eq!(log.count(WindowEventType::Resized), 0);

        {
            let _guard = window.lock_window();
            window.consume_event(window_event(&window, &fx, WindowEventType::Repaint));
            fx.clock.advance(1000);
        }
        assert_eq!(log.count(WindowEventType::Repaint), 1);
    }

    #[test]
    fn test_consumed_event_stops_propagation() {
        let fx = Fixture::new();
        let (window, log) = shown(&fx);
        let sink: Arc<dyn WindowListener> = Arc::new(RepaintSink);
        window.insert_window_listener(0, Arc::clone(&sink)).unwrap();

        window.consume_event(window_event(&window, &fx, WindowEventType::Repaint));
        assert_eq!(log.count(WindowEventType::Repaint), 0);

        // other types still pass
        window.consume_event(window_event(&window, &fx, WindowEventType::Moved));
        assert_eq!(log.count(WindowEventType::Moved), 1);

        assert!(window.remove_window_listener(&sink));
        window.consume_event(window_event(&window, &fx, WindowEventType::Repaint));
        assert_eq!(log.count(WindowEventType::Repaint), 1);
    }

    #[test]
    fn test_listener_insert_out_of_range_fails() {
        let fx = Fixture::new();
        let (window, _log) = shown(&fx);
        assert!(window.insert_window_listener(5, Arc::new(RepaintSink)).is_err());
    }

    #[test]
    fn test_deferred_repaint_delivered_by_pump() {
        let fx = Fixture::new();
        let (window, _log) = shown(&fx);
        let regions = Arc::new(RegionLog::default());
        window.add_window_listener(regions.clone());

        window.notifier().window_repaint(true, Rect::default());
        fx.display.dispatch_messages().unwrap();

        assert_eq!(*regions.regions.lock(), vec![Rect::new(0, 0, 320, 200)]);
        assert_eq!(fx.display.queued_event_count(), 0);
    }

    #[test]
    fn test_repaint_ignored_while_unrealized() {
        let fx = Fixture::new();
        let window = Window::create(&fx.screen, Capabilities::onscreen()).unwrap();
        let regions = Arc::new(RegionLog::default());
        window.add_window_listener(regions.clone());

        window.notifier().window_repaint(false, Rect::new(0, 0, 5, 5));
        window.enqueue_window_event(false, WindowEventType::Resized);
        assert!(regions.regions.lock().is_empty());
        assert_eq!(fx.display.queued_event_count(), 0);
    }

    #[test]
    fn test_move_notification_reaches_listeners() {
        let fx = Fixture::new();
        let (window, log) = shown(&fx);
        window.set_position(300, 200).unwrap();
        assert_eq!(log.count(WindowEventType::Moved), 1);
        assert!(!window.is_auto_position());
    }
}
