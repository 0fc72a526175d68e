//! Change notifications for observers of a dataset or an import
//!
//! Observers subscribe to an [`EventBus`] and receive [`DatasetEvent`]s over a
//! crossbeam channel. Emitting never blocks: subscribers whose receiver has
//! been dropped are pruned on the next emit.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::color::Color;

/// Events emitted by datasets and importers
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetEvent {
    /// The dirty flag changed
    ModifiedChanged(bool),
    /// A channel was selected or deselected
    SelectionChanged { index: usize, selected: bool },
    /// A channel got a new display color
    ColorChanged { index: usize, color: Color },
    /// Progress bounds of a running import (bytes)
    ProgressRange { min: u64, max: u64 },
    /// Progress of a running import (bytes read out of `range`)
    ProgressUpdated { value: u64, range: u64 },
    /// A running import observed its cancel token
    Cancelled,
    /// A dataset finished loading or importing
    DataLoaded,
}

/// Fan-out of [`DatasetEvent`]s to any number of subscribers
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<DatasetEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer
    pub fn subscribe(&mut self) -> Receiver<DatasetEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Register an existing sender, e.g. one shared by several datasets
    pub fn attach(&mut self, sender: Sender<DatasetEvent>) {
        self.subscribers.push(sender);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Send an event to every subscriber
    pub fn emit(&mut self, event: DatasetEvent) {
        if self.subscribers.is_empty() {
            return;
        }
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_all_subscribers() {
        let mut bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.emit(DatasetEvent::ModifiedChanged(true));

        assert_eq!(rx1.try_recv().unwrap(), DatasetEvent::ModifiedChanged(true));
        assert_eq!(rx2.try_recv().unwrap(), DatasetEvent::ModifiedChanged(true));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(DatasetEvent::DataLoaded);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), DatasetEvent::DataLoaded);
    }

    #[test]
    fn test_attach_shared_sender() {
        let (tx, rx) = unbounded();
        let mut first = EventBus::new();
        let mut second = EventBus::new();
        first.attach(tx.clone());
        second.attach(tx);

        first.emit(DatasetEvent::DataLoaded);
        second.emit(DatasetEvent::Cancelled);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events, vec![DatasetEvent::DataLoaded, DatasetEvent::Cancelled]);
        assert_eq!(first.subscriber_count(), 1);

        drop(rx);
        first.emit(DatasetEvent::DataLoaded);
        assert_eq!(first.subscriber_count(), 0);
    }
}
