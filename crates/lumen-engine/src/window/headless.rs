use std::collections::VecDeque;

use crate::coords::Extent;

use super::{WindowEvent, WindowSystem};

/// Window without a platform surface; events are scripted with
/// [`push_event`](Self::push_event).
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    size: Extent,
    pending: VecDeque<WindowEvent>,
    closed: bool,
}

impl HeadlessWindow {
    pub fn new(size: Extent) -> Self {
        Self {
            size,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    /// Queues an event for the next [`poll_events`](WindowSystem::poll_events).
    ///
    /// A `Resize` changes the reported size immediately, like a user drag would.
    pub fn push_event(&mut self, event: WindowEvent) {
        if let WindowEvent::Resize(size) = event {
            self.size = size;
        }
        self.pending.push_back(event);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl WindowSystem for HeadlessWindow {
    fn poll_events(&mut self) -> Vec<WindowEvent> {
        self.pending.drain(..).collect()
    }

    fn size(&self) -> Extent {
        self.size
    }

    fn set_size(&mut self, size: Extent) {
        self.size = size;
    }

    fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}
