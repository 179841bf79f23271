use crate::{
    entities::{
        cart, cart_item, order, order_item, Cart, CartItem,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::commerce::{order_service::OrderLineView, price_items, OrderView},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Turns a mutable cart into an immutable order.
///
/// "Read cart, freeze lines, clear cart" runs inside one transaction, so no
/// concurrently added line survives a checkout silently and no order is
/// observable without its items. Each call is an independent attempt; the
/// engine does not deduplicate double submissions (that affordance lives in
/// the UI, which disables submit while a checkout is in flight).
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    fn generate_order_number() -> String {
        format!(
            "ORD{}{:08X}",
            Utc::now().format("%Y%m%d%H%M%S"),
            rand::random::<u32>()
        )
    }

    /// Checks out the owner's cart.
    ///
    /// Fails with `EmptyCart` (state unchanged) when there is nothing to
    /// order, and with `Upstream` when any pricing lookup fails; only a
    /// fully priced cart produces an order. Prices are frozen into the order
    /// lines: later catalog changes never touch placed orders.
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        owner_id: &str,
        input: CheckoutInput,
    ) -> Result<OrderView, ServiceError> {
        let txn = self.db.begin().await?;

        let cart = Cart::find()
            .filter(cart::Column::OwnerId.eq(owner_id))
            .one(&txn)
            .await?
            .ok_or(ServiceError::EmptyCart)?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .order_by_asc(cart_item::Column::Id)
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        // Strict pricing: a vanished product or retired modifier aborts the
        // whole checkout before anything is written.
        let priced = price_items(&txn, &items, true).await?;
        let total: Decimal = priced.iter().map(|l| l.line_subtotal).sum();

        let order_id = Uuid::new_v4();
        let order_number = Self::generate_order_number();
        let now = Utc::now();

        let created = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            owner_id: Set(owner_id.to_string()),
            status: Set(order::OrderStatus::InProgress),
            payment_method: Set(input.payment_method),
            dine_option: Set(input.dine_option),
            total: Set(total),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_insert(e, format!("Order '{}' already exists", order_number))
        })?;

        let mut line_views = Vec::with_capacity(priced.len());
        for line in priced {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                product_name: Set(line.product_name.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.product_price),
                modifiers: Set(serde_json::to_value(&line.modifiers).map_err(|e| {
                    ServiceError::InternalError(format!("Failed to freeze modifiers: {}", e))
                })?),
                line_total: Set(line.line_subtotal),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            line_views.push(OrderLineView {
                id: item.id,
                product_id: line.product_id,
                product_name: line.product_name,
                quantity: line.quantity,
                unit_price: line.product_price,
                modifiers: line.modifiers,
                line_total: line.line_subtotal,
            });
        }

        // Clearing the cart is part of the same atomic unit as order
        // creation.
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        let cart_id = cart.id;
        let mut cart_active: cart::ActiveModel = cart.into();
        cart_active.updated_at = Set(now);
        cart_active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartCleared(cart_id)).await;
        self.event_sender
            .send_or_log(Event::OrderCreated {
                order_id,
                order_number: order_number.clone(),
            })
            .await;

        info!(
            "Checkout for owner {} created order '{}' with {} line(s), total {}",
            owner_id,
            order_number,
            line_views.len(),
            total
        );
        Ok(OrderView::assemble(created, line_views))
    }
}

/// Input for checkout
#[derive(Debug, Deserialize)]
pub struct CheckoutInput {
    pub payment_method: order::PaymentMethod,
    pub dine_option: order::DineOption,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_carry_prefix_and_are_unique() {
        let a = CheckoutService::generate_order_number();
        let b = CheckoutService::generate_order_number();
        assert!(a.starts_with("ORD"));
        assert!(a.len() > "ORD".len() + 14);
        assert_ne!(a, b);
    }
}
