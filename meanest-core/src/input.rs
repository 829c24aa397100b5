//! Input capability consumed by the interactive parts of a session.
//!
//! A source only delivers events of kinds that currently have a listener;
//! everything else is dropped, the same way an unhandled key press goes
//! nowhere. [`Listening`] pairs registration with removal on every exit path.

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    Key,
    Wheel,
    PointerMove,
    Click,
}

impl InputKind {
    pub const ALL: [InputKind; 4] = [
        InputKind::Key,
        InputKind::Wheel,
        InputKind::PointerMove,
        InputKind::Click,
    ];

    fn slot(self) -> usize {
        match self {
            InputKind::Key => 0,
            InputKind::Wheel => 1,
            InputKind::PointerMove => 2,
            InputKind::Click => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(Key),
    /// Vertical wheel delta, positive when scrolling down.
    Wheel { delta_y: f64 },
    /// Horizontal pointer position on the display surface.
    PointerMove { x: f64 },
    /// Primary-button click on the display surface.
    Click,
}

impl InputEvent {
    pub fn kind(&self) -> InputKind {
        match self {
            InputEvent::Key(_) => InputKind::Key,
            InputEvent::Wheel { .. } => InputKind::Wheel,
            InputEvent::PointerMove { .. } => InputKind::PointerMove,
            InputEvent::Click => InputKind::Click,
        }
    }
}

pub trait InputSource {
    fn listen(&mut self, kind: InputKind);
    fn unlisten(&mut self, kind: InputKind);
    /// Number of listeners currently registered, over all kinds.
    fn listener_count(&self) -> usize;
    /// Blocks until an event of a listened kind arrives. `None` once the
    /// source is closed.
    fn next_event(&mut self) -> Option<InputEvent>;
}

/// Per-kind listener counts, shared by the concrete sources.
#[derive(Debug, Clone, Default)]
pub struct ListenerSet {
    counts: [usize; 4],
}

impl ListenerSet {
    pub fn add(&mut self, kind: InputKind) {
        self.counts[kind.slot()] += 1;
    }

    pub fn remove(&mut self, kind: InputKind) {
        let slot = &mut self.counts[kind.slot()];
        if *slot == 0 {
            tracing::warn!(?kind, "removing a listener that was never added");
            return;
        }
        *slot -= 1;
    }

    pub fn accepts(&self, kind: InputKind) -> bool {
        self.counts[kind.slot()] > 0
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Registers a set of listeners for as long as it lives.
pub struct Listening<'a, I: InputSource + ?Sized> {
    source: &'a mut I,
    kinds: &'a [InputKind],
}

impl<'a, I: InputSource + ?Sized> Listening<'a, I> {
    pub fn attach(source: &'a mut I, kinds: &'a [InputKind]) -> Self {
        for kind in kinds {
            source.listen(*kind);
        }
        Self { source, kinds }
    }

    pub fn next_event(&mut self) -> Option<InputEvent> {
        self.source.next_event()
    }
}

impl<I: InputSource + ?Sized> Drop for Listening<'_, I> {
    fn drop(&mut self) {
        for kind in self.kinds {
            self.source.unlisten(*kind);
        }
    }
}

/// Replays a fixed list of events. Used by tests and headless runs.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    queue: VecDeque<InputEvent>,
    listeners: ListenerSet,
    pub registrations: usize,
    pub removals: usize,
    pub dropped: usize,
}

impl ScriptedInput {
    pub fn new(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl InputSource for ScriptedInput {
    fn listen(&mut self, kind: InputKind) {
        self.registrations += 1;
        self.listeners.add(kind);
    }

    fn unlisten(&mut self, kind: InputKind) {
        self.removals += 1;
        self.listeners.remove(kind);
    }

    fn listener_count(&self) -> usize {
        self.listeners.total()
    }

    fn next_event(&mut self) -> Option<InputEvent> {
        while let Some(event) = self.queue.pop_front() {
            if self.listeners.accepts(event.kind()) {
                return Some(event);
            }
            self.dropped += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlistened_events_are_dropped() {
        let mut input = ScriptedInput::new([
            InputEvent::Click,
            InputEvent::Wheel { delta_y: 3.0 },
        ]);
        input.listen(InputKind::Wheel);
        assert_eq!(input.next_event(), Some(InputEvent::Wheel { delta_y: 3.0 }));
        assert_eq!(input.dropped, 1);
        assert_eq!(input.next_event(), None);
    }

    #[test]
    fn guard_removes_what_it_added() {
        let mut input = ScriptedInput::new([]);
        {
            let mut guard = Listening::attach(&mut input, &InputKind::ALL);
            assert_eq!(guard.next_event(), None);
        }
        assert_eq!(input.listener_count(), 0);
        assert_eq!(input.registrations, 4);
        assert_eq!(input.removals, 4);
    }

    #[test]
    fn listener_counts_nest() {
        let mut set = ListenerSet::default();
        set.add(InputKind::Key);
        set.add(InputKind::Key);
        set.remove(InputKind::Key);
        assert!(set.accepts(InputKind::Key));
        set.remove(InputKind::Key);
        assert!(!set.accepts(InputKind::Key));
        set.remove(InputKind::Key);
        assert_eq!(set.total(), 0);
    }
}
