use crate::{
    entities::{cart, cart_item, modifier, Cart, CartItem, Modifier, Recipe},
    errors::ServiceError,
    events::{Event, EventSender},
    services::commerce::{price_items, PricedLine},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-owner shopping cart.
///
/// One cart per authenticated owner; all mutations address the owner's cart,
/// so cross-cart locking is never needed. Totals are never stored: every
/// read re-prices the lines against the live catalog, so a cart total cannot
/// drift from its lines.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn find_cart(&self, owner_id: &str) -> Result<Option<cart::Model>, ServiceError> {
        Ok(Cart::find()
            .filter(cart::Column::OwnerId.eq(owner_id))
            .one(&*self.db)
            .await?)
    }

    async fn get_or_create_cart(&self, owner_id: &str) -> Result<cart::Model, ServiceError> {
        if let Some(existing) = self.find_cart(owner_id).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let result = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await;

        match result {
            Ok(created) => Ok(created),
            // Concurrent first-insert for the same owner: the unique index
            // leaves exactly one row, so fall back to fetching it.
            Err(err) => match self.find_cart(owner_id).await? {
                Some(existing) => Ok(existing),
                None => Err(ServiceError::DatabaseError(err)),
            },
        }
    }

    /// Validates modifier selections: dedup while keeping order, then every
    /// id must resolve to an active modifier.
    async fn validate_modifiers(&self, modifier_ids: &[Uuid]) -> Result<Vec<Uuid>, ServiceError> {
        let mut deduped: Vec<Uuid> = Vec::with_capacity(modifier_ids.len());
        for id in modifier_ids {
            if !deduped.contains(id) {
                deduped.push(*id);
            }
        }
        if deduped.is_empty() {
            return Ok(deduped);
        }

        let found = Modifier::find()
            .filter(modifier::Column::Id.is_in(deduped.clone()))
            .filter(modifier::Column::IsActive.eq(true))
            .all(&*self.db)
            .await?;
        if found.len() != deduped.len() {
            return Err(ServiceError::ValidationError(
                "Some modifiers are invalid or inactive".to_string(),
            ));
        }
        Ok(deduped)
    }

    /// Appends a line to the owner's cart. An identical (product,
    /// modifier-set) line already in the cart is NOT merged with the new
    /// one; each add is its own line.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner_id: &str,
        input: AddToCartInput,
    ) -> Result<CartView, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let product = Recipe::find_by_id(input.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let modifier_ids = self.validate_modifiers(&input.modifier_ids).await?;

        let cart = self.get_or_create_cart(owner_id).await?;

        let txn = self.db.begin().await?;
        let now = Utc::now();
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_id: Set(cart.id),
            product_id: Set(product.id),
            quantity: Set(input.quantity),
            modifier_ids: Set(serde_json::json!(modifier_ids)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let cart_id = cart.id;
        let mut cart_active: cart::ActiveModel = cart.into();
        cart_active.updated_at = Set(now);
        cart_active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                cart_id,
                product_id: product.id,
            })
            .await;

        info!(
            "Added '{}' x{} to cart of owner {}",
            product.name, input.quantity, owner_id
        );
        self.get_cart(owner_id).await
    }

    /// Updates a line's quantity and/or modifier selection. A quantity below
    /// 1 is rejected; removal is its own operation.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        owner_id: &str,
        item_id: Uuid,
        input: UpdateCartItemInput,
    ) -> Result<CartView, ServiceError> {
        if let Some(quantity) = input.quantity {
            if quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "Quantity must be at least 1".to_string(),
                ));
            }
        }

        let item = self.owned_item(owner_id, item_id).await?;

        let modifier_ids = match &input.modifier_ids {
            Some(ids) => Some(self.validate_modifiers(ids).await?),
            None => None,
        };

        let mut active: cart_item::ActiveModel = item.into();
        if let Some(quantity) = input.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(ids) = modifier_ids {
            active.modifier_ids = Set(serde_json::json!(ids));
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.get_cart(owner_id).await
    }

    /// Removes a line unconditionally.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        owner_id: &str,
        item_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let item = self.owned_item(owner_id, item_id).await?;

        let cart_id = item.cart_id;
        CartItem::delete_by_id(item.id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartItemRemoved { cart_id, item_id })
            .await;

        self.get_cart(owner_id).await
    }

    /// Resolves a cart item and proves it belongs to the owner's cart.
    async fn owned_item(
        &self,
        owner_id: &str,
        item_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let cart = self
            .find_cart(owner_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if item.cart_id != cart.id {
            return Err(ServiceError::NotFound(format!(
                "Cart item {} not found",
                item_id
            )));
        }
        Ok(item)
    }

    /// Empties the owner's cart. A missing cart is already empty.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, owner_id: &str) -> Result<(), ServiceError> {
        let Some(cart) = self.find_cart(owner_id).await? else {
            return Ok(());
        };

        let txn = self.db.begin().await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        let cart_id = cart.id;
        let mut active: cart::ActiveModel = cart.into();
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartCleared(cart_id)).await;

        info!("Cleared cart of owner {}", owner_id);
        Ok(())
    }

    /// Returns the owner's cart priced against the live catalog. An absent
    /// or just-cleared cart yields the empty view rather than an error, so
    /// read-only polling keeps working across a concurrent checkout.
    pub async fn get_cart(&self, owner_id: &str) -> Result<CartView, ServiceError> {
        let Some(cart) = self.find_cart(owner_id).await? else {
            return Ok(CartView::empty(owner_id));
        };

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .order_by_asc(cart_item::Column::Id)
            .all(&*self.db)
            .await?;

        let lines = price_items(&*self.db, &items, false).await?;
        let total = lines.iter().map(|l| l.line_subtotal).sum();

        Ok(CartView {
            cart_id: Some(cart.id),
            owner_id: owner_id.to_string(),
            lines,
            total,
        })
    }

    /// Lightweight projection for the periodic cart-count poll.
    pub async fn cart_summary(&self, owner_id: &str) -> Result<CartSummary, ServiceError> {
        let view = self.get_cart(owner_id).await?;
        Ok(CartSummary {
            item_count: view.lines.iter().map(|l| l.quantity).sum(),
            total: view.total,
        })
    }
}

/// Priced cart projection
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart_id: Option<Uuid>,
    pub owner_id: String,
    pub lines: Vec<PricedLine>,
    /// Always Σ line subtotals; never stored or settable independently.
    pub total: Decimal,
}

impl CartView {
    fn empty(owner_id: &str) -> Self {
        Self {
            cart_id: None,
            owner_id: owner_id.to_string(),
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }
}

/// Cart-count poll projection
#[derive(Debug, Serialize)]
pub struct CartSummary {
    pub item_count: i32,
    pub total: Decimal,
}

/// Input for adding a cart line
#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub modifier_ids: Vec<Uuid>,
}

/// Input for updating a cart line
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemInput {
    pub quantity: Option<i32>,
    pub modifier_ids: Option<Vec<Uuid>>,
}
