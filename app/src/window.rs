//! A window driven by a frame-indexed script.

use stratus_graphics::{Extent3d, ManualWindow, WindowState};

/// Event applied to a [`ScriptedWindow`] at a given loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedEvent {
    /// Change the drawable size and raise the resize flag.
    Resize { width: u32, height: u32 },
    /// Ask the loop to stop.
    Close,
}

/// Headless stand-in for an OS window.
///
/// Events fire when [`advance`](Self::advance) reaches their frame.
#[derive(Debug, Clone)]
pub struct ScriptedWindow {
    window: ManualWindow,
    events: Vec<(u64, ScriptedEvent)>,
    next_event: usize,
}

impl ScriptedWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            window: ManualWindow::new(width, height),
            events: Vec::new(),
            next_event: 0,
        }
    }

    /// Schedule `event` for loop iteration `frame`.
    ///
    /// Events on the same frame fire in the order they were added.
    pub fn with_event(mut self, frame: u64, event: ScriptedEvent) -> Self {
        let position = self.events.partition_point(|(at, _)| *at <= frame);
        self.events.insert(position, (frame, event));
        self
    }

    /// Fire every scheduled event up to and including `frame`.
    pub fn advance(&mut self, frame: u64) {
        while let Some(&(at, event)) = self.events.get(self.next_event) {
            if at > frame {
                break;
            }
            self.next_event += 1;
            log::debug!("ScriptedWindow: frame {} fires {:?}", frame, event);
            match event {
                ScriptedEvent::Resize { width, height } => self.window.resize(width, height),
                ScriptedEvent::Close => self.window.request_close(),
            }
        }
    }

    /// Ask the loop to stop.
    pub fn request_close(&mut self) {
        self.window.request_close();
    }

    /// Number of events still waiting to fire.
    pub fn pending_events(&self) -> usize {
        self.events.len() - self.next_event
    }
}

impl WindowState for ScriptedWindow {
    fn drawable_size(&self) -> Extent3d {
        self.window.drawable_size()
    }

    fn resize_pending(&self) -> bool {
        self.window.resize_pending()
    }

    fn close_requested(&self) -> bool {
        self.window.close_requested()
    }

    fn acknowledge_resize(&mut self) {
        self.window.acknowledge_resize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_fire_on_their_frame() {
        let mut window = ScriptedWindow::new(640, 480)
            .with_event(3, ScriptedEvent::Close)
            .with_event(
                1,
                ScriptedEvent::Resize {
                    width: 800,
                    height: 600,
                },
            );
        assert_eq!(window.pending_events(), 2);

        window.advance(0);
        assert!(!window.resize_pending());

        window.advance(1);
        assert!(window.resize_pending());
        assert_eq!(window.drawable_size(), Extent3d::new_2d(800, 600));
        assert!(!window.close_requested());

        window.acknowledge_resize();
        window.advance(5);
        assert!(!window.resize_pending());
        assert!(window.close_requested());
        assert_eq!(window.pending_events(), 0);
    }

    #[test]
    fn test_same_frame_keeps_insertion_order() {
        let mut window = ScriptedWindow::new(100, 100)
            .with_event(
                2,
                ScriptedEvent::Resize {
                    width: 10,
                    height: 10,
                },
            )
            .with_event(
                2,
                ScriptedEvent::Resize {
                    width: 20,
                    height: 20,
                },
            );

        window.advance(2);
        assert_eq!(window.drawable_size(), Extent3d::new_2d(20, 20));
    }
}
