//! AnomalyBus for streaming anomaly records to live observers.
//!
//! Provides a broadcast-based fan-out with sequence numbering and optional
//! correlation tagging, so a harness can attribute anomalies to the
//! migration phase that produced them.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{AnomalyRecord, VerifierConfig};
use crate::domain::ports::DiagnosticSink;

/// Monotonically increasing sequence number assigned by AnomalyBus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceNumber(pub u64);

impl SequenceNumber {
    pub fn zero() -> Self {
        Self(0)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Envelope broadcast to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub sequence: SequenceNumber,
    pub correlation_id: Option<Uuid>,
    pub record: AnomalyRecord,
}

/// Configuration for the AnomalyBus.
#[derive(Debug, Clone)]
pub struct AnomalyBusConfig {
    /// Channel capacity for the broadcast channel.
    pub channel_capacity: usize,
}

impl Default for AnomalyBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl From<&VerifierConfig> for AnomalyBusConfig {
    fn from(config: &VerifierConfig) -> Self {
        Self {
            channel_capacity: config.anomaly_channel_capacity,
        }
    }
}

/// Broadcast fan-out of anomaly records.
pub struct AnomalyBus {
    sender: broadcast::Sender<AnomalyEvent>,
    sequence: AtomicU64,
    correlation_context: RwLock<Option<Uuid>>,
}

impl AnomalyBus {
    /// Create a new AnomalyBus with the given configuration.
    pub fn new(config: &AnomalyBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
            correlation_context: RwLock::new(None),
        }
    }

    /// Publish an anomaly record. Never blocks; lagging subscribers lose the
    /// oldest events.
    pub fn publish(&self, record: AnomalyRecord) -> SequenceNumber {
        let sequence = SequenceNumber(self.sequence.fetch_add(1, Ordering::SeqCst));
        let correlation_id = *self
            .correlation_context
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        // No subscribers is not an error
        let _ = self.sender.send(AnomalyEvent {
            sequence,
            correlation_id,
            record,
        });
        sequence
    }

    /// Subscribe to the anomaly stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AnomalyEvent> {
        self.sender.subscribe()
    }

    /// Get the next sequence number to be assigned.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    /// Start a new correlation context, typically one per migration phase.
    pub fn start_correlation(&self) -> Uuid {
        let id = Uuid::new_v4();
        *self
            .correlation_context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);
        id
    }

    /// End the current correlation context.
    pub fn end_correlation(&self) {
        *self
            .correlation_context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl DiagnosticSink for AnomalyBus {
    fn record(&self, anomaly: &AnomalyRecord) {
        self.publish(anomaly.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AnomalyKind, PlacementStream};

    fn record(partition: &str) -> AnomalyRecord {
        AnomalyRecord::new(
            AnomalyKind::UnderReplicated,
            PlacementStream::Actual,
            "db",
            partition,
            1,
            3,
            13,
        )
    }

    #[tokio::test]
    async fn test_anomaly_bus_sequence_assignment() {
        let bus = AnomalyBus::new(&AnomalyBusConfig::default());
        assert_eq!(bus.current_sequence().0, 0);

        let mut rx = bus.subscribe();

        bus.publish(record("db_0"));
        let event1 = rx.recv().await.unwrap();
        assert_eq!(event1.sequence.0, 0);
        assert_eq!(event1.record.partition, "db_0");

        bus.record(&record("db_1"));
        let event2 = rx.recv().await.unwrap();
        assert_eq!(event2.sequence.0, 1);

        assert_eq!(bus.current_sequence().0, 2);
    }

    #[tokio::test]
    async fn test_anomaly_bus_correlation() {
        let bus = AnomalyBus::new(&AnomalyBusConfig::default());
        let mut rx = bus.subscribe();

        bus.publish(record("db_0"));
        assert!(rx.recv().await.unwrap().correlation_id.is_none());

        let phase = bus.start_correlation();
        bus.publish(record("db_1"));
        assert_eq!(rx.recv().await.unwrap().correlation_id, Some(phase));

        bus.end_correlation();
        bus.publish(record("db_2"));
        assert!(rx.recv().await.unwrap().correlation_id.is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = AnomalyBus::new(&AnomalyBusConfig { channel_capacity: 4 });
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(record("db_0")).0, 0);
        assert_eq!(bus.current_sequence().0, 1);
    }
}
