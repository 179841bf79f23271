use crate::{
    entities::{order, order_item, Order, OrderItem},
    errors::ServiceError,
    events::{Event, EventSender},
    services::commerce::ModifierSnapshot,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Read and status-transition surface over placed orders. Order lines are
/// frozen at checkout and never mutable here.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get_order_model(&self, order_number: &str) -> Result<order::Model, ServiceError> {
        Order::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order '{}' not found", order_number)))
    }

    pub async fn get_order(&self, order_number: &str) -> Result<OrderView, ServiceError> {
        let model = self.get_order_model(order_number).await?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(model.id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;

        let mut line_views = Vec::with_capacity(items.len());
        for item in items {
            let modifiers: Vec<ModifierSnapshot> = serde_json::from_value(item.modifiers.clone())
                .map_err(|e| {
                ServiceError::InternalError(format!(
                    "Corrupt modifier snapshot on order item {}: {}",
                    item.id, e
                ))
            })?;
            line_views.push(OrderLineView {
                id: item.id,
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                modifiers,
                line_total: item.line_total,
            });
        }

        Ok(OrderView::assemble(model, line_views))
    }

    /// Lists orders, newest first, optionally scoped to one owner.
    pub async fn list_orders(
        &self,
        owner_id: Option<&str>,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::CreatedAt);
        if let Some(owner_id) = owner_id {
            query = query.filter(order::Column::OwnerId.eq(owner_id));
        }
        Ok(query.all(&*self.db).await?)
    }

    /// Moves an order through its status field. Line items never change.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_number: &str,
        new_status: order::OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let existing = self.get_order_model(order_number).await?;

        use order::OrderStatus::*;
        let allowed = matches!(
            (existing.status, new_status),
            (InProgress, Completed) | (InProgress, Refunded) | (Completed, Refunded)
        );
        if !allowed {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot transition order '{}' from {:?} to {:?}",
                order_number, existing.status, new_status
            )));
        }

        let order_id = existing.id;
        let old_status = existing.status;
        let mut active: order::ActiveModel = existing.into();
        active.status = Set(new_status);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: format!("{:?}", old_status),
                new_status: format!("{:?}", new_status),
            })
            .await;

        info!(
            "Order '{}' moved from {:?} to {:?}",
            order_number, old_status, new_status
        );
        Ok(updated)
    }
}

/// Order with its frozen lines
#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: Uuid,
    pub order_number: String,
    pub owner_id: String,
    pub status: order::OrderStatus,
    pub payment_method: order::PaymentMethod,
    pub dine_option: order::DineOption,
    /// Σ frozen line totals, recomputed from the lines on every read.
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

#[derive(Debug, Serialize)]
pub struct OrderLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub modifiers: Vec<ModifierSnapshot>,
    pub line_total: Decimal,
}

impl OrderView {
    pub(crate) fn assemble(model: order::Model, lines: Vec<OrderLineView>) -> Self {
        let total = lines.iter().map(|l| l.line_total).sum();
        Self {
            id: model.id,
            order_number: model.order_number,
            owner_id: model.owner_id,
            status: model.status,
            payment_method: model.payment_method,
            dine_option: model.dine_option,
            total,
            created_at: model.created_at,
            lines,
        }
    }
}
