use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use meanest_core::input::ListenerSet;
use meanest_core::{InputEvent, InputKind, InputSource, Key};
use winit::event::MouseScrollDelta;
use winit::keyboard::{Key as WinitKey, NamedKey};

/// Wheel lines are scaled to the pixel deltas a browser would report.
const PIXELS_PER_LINE: f64 = 100.0;

type SharedListeners = Arc<Mutex<ListenerSet>>;

fn lock(listeners: &SharedListeners) -> MutexGuard<'_, ListenerSet> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Window-thread end: drops events nobody is listening for.
#[derive(Debug, Clone)]
pub struct InputForwarder {
    tx: Sender<InputEvent>,
    listeners: SharedListeners,
}

/// Session-thread end.
#[derive(Debug)]
pub struct ChannelInput {
    rx: Receiver<InputEvent>,
    listeners: SharedListeners,
}

pub fn input_channel() -> (InputForwarder, ChannelInput) {
    let (tx, rx) = channel();
    let listeners = SharedListeners::default();
    (
        InputForwarder {
            tx,
            listeners: Arc::clone(&listeners),
        },
        ChannelInput { rx, listeners },
    )
}

impl InputForwarder {
    /// False when the event was dropped or the session is gone.
    pub fn forward(&self, event: InputEvent) -> bool {
        if !lock(&self.listeners).accepts(event.kind()) {
            return false;
        }
        self.tx.send(event).is_ok()
    }
}

impl InputSource for ChannelInput {
    fn listen(&mut self, kind: InputKind) {
        lock(&self.listeners).add(kind);
    }

    fn unlisten(&mut self, kind: InputKind) {
        lock(&self.listeners).remove(kind);
    }

    fn listener_count(&self) -> usize {
        lock(&self.listeners).total()
    }

    fn next_event(&mut self) -> Option<InputEvent> {
        loop {
            let event = self.rx.recv().ok()?;
            if lock(&self.listeners).accepts(event.kind()) {
                return Some(event);
            }
            tracing::trace!(?event, "dropped stale input");
        }
    }
}

pub fn map_key(key: &WinitKey) -> Key {
    match key {
        WinitKey::Named(NamedKey::ArrowLeft) => Key::ArrowLeft,
        WinitKey::Named(NamedKey::ArrowRight) => Key::ArrowRight,
        WinitKey::Named(NamedKey::Enter) => Key::Enter,
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        WinitKey::Named(other) => Key::Other(format!("{other:?}")),
        WinitKey::Character(c) => Key::Other(c.to_string()),
        _ => Key::Other("Unidentified".into()),
    }
}

/// Positive `delta_y` means scrolling down, as in the DOM.
pub fn map_wheel(delta: MouseScrollDelta) -> InputEvent {
    let delta_y = match delta {
        MouseScrollDelta::LineDelta(_, y) => -(y as f64) * PIXELS_PER_LINE,
        MouseScrollDelta::PixelDelta(pos) => -pos.y,
    };
    InputEvent::Wheel { delta_y }
}
