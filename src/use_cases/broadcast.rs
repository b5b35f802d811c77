// Fan-out of encoded snapshots to attached clients.

use super::types::{ClientId, SnapshotEncoder};
use crate::domain::Snapshot;
use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneReason {
    /// The client side of the channel is gone.
    Closed,
    /// The client's frame queue is full; it stopped keeping up.
    Lagging,
}

#[derive(Debug, Default, PartialEq)]
pub struct PublishReport {
    pub delivered: usize,
    pub pruned: Vec<(ClientId, PruneReason)>,
}

pub struct Broadcaster {
    clients: Vec<(ClientId, mpsc::Sender<Utf8Bytes>)>,
    encoder: SnapshotEncoder,
}

impl Broadcaster {
    pub fn new(encoder: SnapshotEncoder) -> Self {
        Self {
            clients: Vec::new(),
            encoder,
        }
    }

    /// Attaches a client; re-attaching an id replaces its channel.
    pub fn attach(&mut self, client: ClientId, frames: mpsc::Sender<Utf8Bytes>) {
        match self.clients.iter_mut().find(|(id, _)| *id == client) {
            Some(entry) => entry.1 = frames,
            None => self.clients.push((client, frames)),
        }
    }

    pub fn detach(&mut self, client: ClientId) -> bool {
        let before = self.clients.len();
        self.clients.retain(|(id, _)| *id != client);
        self.clients.len() != before
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, client: ClientId) -> bool {
        self.clients.iter().any(|(id, _)| *id == client)
    }

    /// Drops every channel, which ends the receiving side of each client.
    pub fn clear(&mut self) {
        self.clients.clear();
    }

    /// Encodes `snapshot` once and offers the frame to every client.
    ///
    /// A client whose queue is closed or full is detached; others are unaffected.
    pub fn publish(&mut self, snapshot: &Snapshot) -> Result<PublishReport, serde_json::Error> {
        let frame = (self.encoder)(snapshot)?;
        let mut report = PublishReport::default();

        self.clients.retain(|(id, frames)| match frames.try_send(frame.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                report.pruned.push((*id, PruneReason::Lagging));
                false
            }
            Err(TrySendError::Closed(_)) => {
                report.pruned.push((*id, PruneReason::Closed));
                false
            }
        });
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Metrics;

    fn tick_encoder(snapshot: &Snapshot) -> Result<Utf8Bytes, serde_json::Error> {
        serde_json::to_string(&snapshot.tick).map(Utf8Bytes::from)
    }

    fn snapshot(tick: u64) -> Snapshot {
        Snapshot {
            tick,
            timestamp: 0.0,
            bodies: Vec::new(),
            metrics: Metrics {
                fps: 0.0,
                body_count: 0,
                constraint_count: 0,
                simulation_time: 0.0,
            },
        }
    }

    #[test]
    fn when_one_channel_fails_then_others_still_receive_and_it_is_pruned() {
        let mut broadcaster = Broadcaster::new(tick_encoder);
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, rx2) = mpsc::channel(8);
        let (tx3, mut rx3) = mpsc::channel(8);
        broadcaster.attach(ClientId(1), tx1);
        broadcaster.attach(ClientId(2), tx2);
        broadcaster.attach(ClientId(3), tx3);
        drop(rx2);

        let report = broadcaster.publish(&snapshot(1)).unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(report.pruned, vec![(ClientId(2), PruneReason::Closed)]);
        assert_eq!(rx1.try_recv().unwrap().as_str(), "1");
        assert_eq!(rx3.try_recv().unwrap().as_str(), "1");
        assert!(!broadcaster.contains(ClientId(2)));

        let report = broadcaster.publish(&snapshot(2)).unwrap();
        assert_eq!(report.delivered, 2);
        assert!(report.pruned.is_empty());
        assert_eq!(rx1.try_recv().unwrap().as_str(), "2");
        assert_eq!(rx3.try_recv().unwrap().as_str(), "2");
    }

    #[test]
    fn when_client_queue_is_full_then_client_is_pruned_as_lagging() {
        let mut broadcaster = Broadcaster::new(tick_encoder);
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        broadcaster.attach(ClientId(7), slow_tx);
        broadcaster.attach(ClientId(8), fast_tx);

        broadcaster.publish(&snapshot(1)).unwrap();
        let report = broadcaster.publish(&snapshot(2)).unwrap();

        assert_eq!(report.pruned, vec![(ClientId(7), PruneReason::Lagging)]);
        assert_eq!(broadcaster.len(), 1);
        assert_eq!(fast_rx.try_recv().unwrap().as_str(), "1");
        assert_eq!(fast_rx.try_recv().unwrap().as_str(), "2");
    }

    #[test]
    fn when_client_reattaches_then_it_is_counted_once() {
        let mut broadcaster = Broadcaster::new(tick_encoder);
        let (tx, _rx) = mpsc::channel(1);
        broadcaster.attach(ClientId(1), tx.clone());
        broadcaster.attach(ClientId(1), tx);
        assert_eq!(broadcaster.len(), 1);
        assert!(broadcaster.detach(ClientId(1)));
        assert!(!broadcaster.detach(ClientId(1)));
        assert!(broadcaster.is_empty());
    }
}
