//! Event subscriptions and dispatch outcomes.

use crate::event::EventKind;
use crate::host::CanvasId;
use crate::registry::ObjectId;
use std::collections::HashMap;

/// Why an event produced no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No live object listens to this event on this canvas.
    NoSubscribers,
    /// A press or motion happened outside every subregion.
    OutsideSubregion,
    /// A press tried to start a drag while another one is running.
    SessionBusy,
    /// No object reacted to the event.
    NoEffect,
}

/// Result of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Ignored(IgnoreReason),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }
}

/// Callback table: per canvas, the objects listening to each event kind.
#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    table: HashMap<CanvasId, HashMap<EventKind, Vec<ObjectId>>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `id` to `kinds` on `canvas`.
    pub fn connect(&mut self, canvas: CanvasId, id: ObjectId, kinds: &[EventKind]) {
        let per_canvas = self.table.entry(canvas).or_default();
        for kind in kinds {
            let ids = per_canvas.entry(*kind).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    /// Cancel every subscription of `id`.
    pub fn disconnect(&mut self, id: ObjectId) {
        for per_canvas in self.table.values_mut() {
            for ids in per_canvas.values_mut() {
                ids.retain(|o| *o != id);
            }
        }
    }

    /// Subscribers of `kind` on `canvas`, in connection order.
    pub fn subscribers(&self, canvas: CanvasId, kind: EventKind) -> Vec<ObjectId> {
        self.table
            .get(&canvas)
            .and_then(|per_canvas| per_canvas.get(&kind))
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_disconnect() {
        let mut subs = Subscriptions::new();
        let a = ObjectId::new();
        let b = ObjectId::new();
        subs.connect(CanvasId(0), a, &[EventKind::Press, EventKind::Motion]);
        subs.connect(CanvasId(0), b, &[EventKind::Press]);
        subs.connect(CanvasId(0), a, &[EventKind::Press]);

        assert_eq!(subs.subscribers(CanvasId(0), EventKind::Press), vec![a, b]);
        assert!(subs.subscribers(CanvasId(1), EventKind::Press).is_empty());

        subs.disconnect(a);
        assert_eq!(subs.subscribers(CanvasId(0), EventKind::Press), vec![b]);
        assert!(subs.subscribers(CanvasId(0), EventKind::Motion).is_empty());
    }
}
