//! Domain events and the in-process event bus.
//!
//! The bus is a fan-out, not a log: events published while a subscriber is
//! not registered are lost. Components that need durable facts persist them
//! through the store; the bus only exists so producers (directory updates,
//! dispatcher progress, channel lifecycle) never block on consumers.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::contacts::Contact;
use crate::orders::Order;

/// Default fan-out channel capacity.
const DEFAULT_BUS_CAPACITY: usize = 256;

/// Connectivity state of the messaging channel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// A pairing challenge was issued and awaits the operator.
    AwaitingPairing,
    /// The session is connected and can send.
    Ready,
    /// The session dropped.
    Disconnected,
}

/// A domain event. Every variant carries an owned value snapshot — a
/// subscriber can never observe a half-updated contact or campaign.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum DomainEvent {
    /// A contact was created or updated by an inbound message.
    LeadUpdated(Contact),
    /// The router intook an order.
    OrderReceived(Order),
    /// One campaign send was committed.
    CampaignProgress {
        campaign_id: Uuid,
        sent_count: usize,
        target: usize,
        contact_id: String,
    },
    /// Every resolved target of a campaign has been sent to.
    CampaignCompleted { campaign_id: Uuid, sent_count: usize },
    /// Channel connectivity changed.
    ChannelState { state: ChannelState, detail: String },
}

/// In-process publish/subscribe fan-out for domain events.
///
/// Cloning the bus clones the sender side; all clones feed the same
/// subscribers. Dropping a receiver unsubscribes it — events published
/// afterwards are never delivered to it. Each subscriber drains its own
/// receiver in its own task, so a panicking or slow subscriber cannot
/// stall the publisher or its peers; a subscriber that lags past the
/// bus capacity loses its oldest undelivered events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events published from now on. The returned receiver is
    /// the subscription handle; drop it to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to every current subscriber.
    ///
    /// Never blocks and never fails from the producer's point of view —
    /// having no subscribers is a normal state.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(n: usize) -> DomainEvent {
        DomainEvent::CampaignProgress {
            campaign_id: Uuid::nil(),
            sent_count: n,
            target: 10,
            contact_id: format!("contact-{n}"),
        }
    }

    #[tokio::test]
    async fn delivers_to_all_subscribers() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(progress(1));

        assert!(matches!(
            a.recv().await.unwrap(),
            DomainEvent::CampaignProgress { sent_count: 1, .. }
        ));
        assert!(matches!(
            b.recv().await.unwrap(),
            DomainEvent::CampaignProgress { sent_count: 1, .. }
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = EventBus::new();
        bus.publish(progress(1));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_receives_nothing_and_peers_are_unaffected() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let mut b = bus.subscribe();

        drop(a);
        bus.publish(progress(1));

        assert!(matches!(
            b.recv().await.unwrap(),
            DomainEvent::CampaignProgress { sent_count: 1, .. }
        ));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn per_producer_order_is_preserved() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        for n in 0..5 {
            bus.publish(progress(n));
        }

        for expected in 0..5 {
            match rx.recv().await.unwrap() {
                DomainEvent::CampaignProgress { sent_count, .. } => {
                    assert_eq!(sent_count, expected)
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_affect_others() {
        let bus = EventBus::new();
        let mut victim = bus.subscribe();
        let mut survivor = bus.subscribe();

        let crashed = tokio::spawn(async move {
            let _ = victim.recv().await;
            panic!("subscriber crash");
        });

        bus.publish(progress(1));
        let _ = crashed.await; // the panic stays inside its task

        bus.publish(progress(2));
        assert!(matches!(
            survivor.recv().await.unwrap(),
            DomainEvent::CampaignProgress { sent_count: 1, .. }
        ));
        assert!(matches!(
            survivor.recv().await.unwrap(),
            DomainEvent::CampaignProgress { sent_count: 2, .. }
        ));
    }

    #[test]
    fn events_serialize_tagged() {
        let event = DomainEvent::CampaignCompleted {
            campaign_id: Uuid::nil(),
            sent_count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "campaign-completed");
        assert_eq!(json["payload"]["sent_count"], 3);
    }
}
