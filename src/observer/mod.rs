//! One-way notifications out of the trading core.
//!
//! Actors report funds, stock snapshots and log lines through the
//! [`Observer`] trait; the core never blocks on or depends on delivery.
//! The observer handle is injected at construction rather than reached
//! through process-wide state, so tests can swap in a recorder and the
//! demo binary can render through `tracing`.
//!
//! [`Notifier`] pairs the shared observer handle with a per-actor notify
//! gate: a second lock, independent of the state lock, that serializes
//! one actor's outgoing notifications so a slow observer cannot stall
//! trading. The gate is always taken after the state lock has been
//! released and is never held across a counterpart call.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::actors::ActorId;
use crate::model::StockSnapshot;

/// Receiver of per-actor notifications. Implementations must not block.
pub trait Observer: Send + Sync {
    fn funds_updated(&self, id: ActorId, balance: i64);
    fn stock_updated(&self, id: ActorId, snapshot: &StockSnapshot);
    fn log_line(&self, id: ActorId, text: &str);
}

/// Renders notifications as structured tracing events.
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn funds_updated(&self, id: ActorId, balance: i64) {
        info!(actor = id, balance, "funds updated");
    }

    fn stock_updated(&self, id: ActorId, snapshot: &StockSnapshot) {
        info!(actor = id, stock = ?snapshot.0, "stock updated");
    }

    fn log_line(&self, id: ActorId, text: &str) {
        info!(actor = id, "{text}");
    }
}

/// Swallows every notification. Useful for hot test loops.
pub struct NullObserver;

impl Observer for NullObserver {
    fn funds_updated(&self, _id: ActorId, _balance: i64) {}
    fn stock_updated(&self, _id: ActorId, _snapshot: &StockSnapshot) {}
    fn log_line(&self, _id: ActorId, _text: &str) {}
}

/// One captured notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Funds(ActorId, i64),
    Stock(ActorId, StockSnapshot),
    Line(ActorId, String),
}

/// Test double that records every notification in arrival order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().unwrap().clone()
    }

    /// All log lines recorded for `id`, in order.
    pub fn lines_for(&self, id: ActorId) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|ev| match ev {
                ObserverEvent::Line(actor, text) if *actor == id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, ev: ObserverEvent) {
        self.events.lock().unwrap().push(ev);
    }
}

impl Observer for RecordingObserver {
    fn funds_updated(&self, id: ActorId, balance: i64) {
        self.push(ObserverEvent::Funds(id, balance));
    }

    fn stock_updated(&self, id: ActorId, snapshot: &StockSnapshot) {
        self.push(ObserverEvent::Stock(id, snapshot.clone()));
    }

    fn log_line(&self, id: ActorId, text: &str) {
        self.push(ObserverEvent::Line(id, text.to_string()));
    }
}

/// An actor's handle on the observer: the shared `Arc<dyn Observer>`
/// plus the per-actor notify gate.
pub struct Notifier {
    id: ActorId,
    observer: Arc<dyn Observer>,
    gate: Mutex<()>,
}

impl Notifier {
    pub fn new(id: ActorId, observer: Arc<dyn Observer>) -> Self {
        Self {
            id,
            observer,
            gate: Mutex::new(()),
        }
    }

    pub fn log(&self, text: &str) {
        let _gate = self.gate.lock().unwrap();
        self.observer.log_line(self.id, text);
    }

    pub fn funds(&self, balance: i64) {
        let _gate = self.gate.lock().unwrap();
        self.observer.funds_updated(self.id, balance);
    }

    pub fn snapshot(&self, snapshot: &StockSnapshot) {
        let _gate = self.gate.lock().unwrap();
        self.observer.stock_updated(self.id, snapshot);
    }

    /// Funds, stock and a log line under one gate acquisition, so the
    /// three lines of one action stay together in the observer's view.
    pub fn publish(&self, balance: i64, snapshot: &StockSnapshot, text: &str) {
        let _gate = self.gate.lock().unwrap();
        self.observer.funds_updated(self.id, balance);
        self.observer.stock_updated(self.id, snapshot);
        self.observer.log_line(self.id, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemKind, Stock};

    #[test]
    fn publish_keeps_one_action_together() {
        let recorder = Arc::new(RecordingObserver::new());
        let notifier = Notifier::new(4, recorder.clone());

        let mut stock = Stock::new();
        stock.insert(ItemKind::Pill, 1);
        notifier.publish(90, &StockSnapshot::of(&stock), "supplied 1 pill");

        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ObserverEvent::Funds(4, 90));
        assert!(matches!(events[1], ObserverEvent::Stock(4, _)));
        assert_eq!(events[2], ObserverEvent::Line(4, "supplied 1 pill".into()));
    }

    #[test]
    fn lines_are_filtered_per_actor() {
        let recorder = RecordingObserver::new();
        recorder.log_line(1, "one");
        recorder.log_line(2, "two");
        recorder.log_line(1, "three");
        assert_eq!(recorder.lines_for(1), vec!["one", "three"]);
    }
}
