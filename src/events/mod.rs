use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the services after successful mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Reference data
    UnitCreated(Uuid),
    UnitDeleted(Uuid),
    CategoryCreated(Uuid),
    CategoryUpdated(Uuid),
    CategoryDeleted(Uuid),
    IngredientCreated(Uuid),
    IngredientUpdated(Uuid),
    IngredientDeleted(Uuid),
    RecipeCreated(Uuid),
    RecipeUpdated(Uuid),
    RecipeDeleted(Uuid),
    ModifierCreated(Uuid),
    ModifierUpdated(Uuid),

    // Inventory
    InventoryRecordCreated(Uuid),
    InventoryAdjusted {
        record_id: Uuid,
        old_qty: rust_decimal::Decimal,
        new_qty: rust_decimal::Decimal,
    },

    // Procurement
    PurchaseOrderCreated {
        purchase_order_id: Uuid,
        po_code: String,
    },
    PurchaseOrderReceived {
        purchase_order_id: Uuid,
        po_code: String,
    },

    // Cart / orders
    CartItemAdded {
        cart_id: Uuid,
        product_id: Uuid,
    },
    CartItemRemoved {
        cart_id: Uuid,
        item_id: Uuid,
    },
    CartCleared(Uuid),
    OrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

/// Cloneable handle for publishing events onto the processing channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged rather than
    /// failing the surrounding operation.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Background consumer draining the event channel. Currently events are
/// logged; downstream integrations subscribe here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(?event, "domain event");
    }
    info!("Event channel closed; processor exiting");
}

/// Convenience constructor wiring a bounded channel to the processor task.
pub fn event_channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (sender, mut rx) = event_channel(8);
        sender
            .send(Event::CartCleared(Uuid::new_v4()))
            .await
            .expect("send should succeed");
        assert!(matches!(rx.recv().await, Some(Event::CartCleared(_))));
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (sender, rx) = event_channel(1);
        drop(rx);
        // Must not panic or error out.
        sender.send_or_log(Event::UnitCreated(Uuid::new_v4())).await;
    }
}
