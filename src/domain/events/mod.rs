//! Domain events.
//!
//! Events fan out in-process over a broadcast channel (UI feedback such as
//! toasts and the order-confirmation transition) and, when a NATS client is
//! configured, to the `zentaro.events.*` subjects as JSON.

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::aggregates::checkout::PaymentMethod;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", content = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart(CartEvent),
    Checkout(CheckoutEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    /// A fire-and-forget remote write failed; local state kept the mutation.
    /// `product_id` is absent for a failed clear-all.
    SyncFailed {
        user_id: Uuid,
        product_id: Option<Uuid>,
    },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutEvent {
    OrderPlaced {
        reference: String,
        user_id: Uuid,
        total: Decimal,
        payment_method: PaymentMethod,
        item_count: u32,
    },
}

impl DomainEvent {
    fn subject(&self) -> &'static str {
        match self {
            Self::Cart(_) => "zentaro.events.cart",
            Self::Checkout(_) => "zentaro.events.checkout",
        }
    }
}

/// Fan-out for domain events. Publishing never blocks and never fails the
/// operation that raised the event.
#[derive(Clone)]
pub struct EventBus {
    local: broadcast::Sender<DomainEvent>,
    nats: Option<async_nats::Client>,
}

impl EventBus {
    pub fn new() -> Self {
        let (local, _) = broadcast::channel(64);
        Self { local, nats: None }
    }

    pub fn with_nats(client: async_nats::Client) -> Self {
        let mut bus = Self::new();
        bus.nats = Some(client);
        bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.local.subscribe()
    }

    pub fn publish(&self, event: DomainEvent) {
        if let Some(nats) = self.nats.clone() {
            let subject = event.subject();
            match serde_json::to_vec(&event) {
                Ok(payload) => {
                    tokio::spawn(async move {
                        if let Err(err) = nats.publish(subject.to_string(), payload.into()).await {
                            tracing::warn!(%subject, error = %err, "event publish failed");
                        }
                    });
                }
                Err(err) => tracing::error!(error = %err, "event serialization failed"),
            }
        }
        // No receivers is fine; the send result only signals that.
        let _ = self.local.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
