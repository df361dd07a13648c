// src/scheduler/peek.rs

use crate::types::TaskName;

/// One-slot holding area for a completion event.
///
/// The scheduling loop sometimes has to receive a completion while it is
/// really trying to send a start event, or while it is blocked waiting. The
/// received name is stashed here and consumed first by the next drain step.
#[derive(Debug, Default)]
pub struct PeekBuffer {
    slot: Option<TaskName>,
}

impl PeekBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `name` until the next [`take`](Self::take).
    ///
    /// The slot is always empty here: every stash is preceded by a drain step
    /// that emptied it.
    pub fn stash(&mut self, name: TaskName) {
        debug_assert!(self.slot.is_none(), "peek buffer already holds an event");
        self.slot = Some(name);
    }

    pub fn take(&mut self) -> Option<TaskName> {
        self.slot.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_one_event_until_taken() {
        let mut peek = PeekBuffer::new();
        assert_eq!(peek.take(), None);

        peek.stash("a".to_string());
        assert_eq!(peek.take().as_deref(), Some("a"));
        assert_eq!(peek.take(), None);
    }
}
