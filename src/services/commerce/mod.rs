//! Cart → checkout → order pipeline.

pub mod cart_service;
pub mod checkout_service;
pub mod order_service;

pub use cart_service::{AddToCartInput, CartService, CartSummary, CartView, UpdateCartItemInput};
pub use checkout_service::{CheckoutInput, CheckoutService};
pub use order_service::{OrderService, OrderView};

use crate::{
    entities::{cart_item, modifier, Modifier, Recipe},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

/// A modifier as priced at a point in time. Stored verbatim inside order
/// lines to give orders price-at-purchase semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

/// A cart line priced against the live catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PricedLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub modifiers: Vec<ModifierSnapshot>,
    pub line_subtotal: Decimal,
}

pub(crate) fn parse_modifier_ids(item: &cart_item::Model) -> Result<Vec<Uuid>, ServiceError> {
    serde_json::from_value(item.modifier_ids.clone()).map_err(|e| {
        ServiceError::InternalError(format!("Corrupt modifier list on cart item {}: {}", item.id, e))
    })
}

/// Prices cart items against the current catalog.
///
/// `strict` is the checkout mode: any vanished product or missing/inactive
/// modifier is an upstream pricing failure that aborts the whole call. In
/// lenient mode (cart views, read-only polling) such lines are skipped with
/// a warning instead.
pub(crate) async fn price_items<C: ConnectionTrait>(
    conn: &C,
    items: &[cart_item::Model],
    strict: bool,
) -> Result<Vec<PricedLine>, ServiceError> {
    let product_ids: HashSet<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, _> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Recipe::find()
            .filter(crate::entities::recipe::Column::Id.is_in(product_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect()
    };

    let mut all_modifier_ids: HashSet<Uuid> = HashSet::new();
    let mut parsed: Vec<(usize, Vec<Uuid>)> = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let ids = parse_modifier_ids(item)?;
        all_modifier_ids.extend(ids.iter().copied());
        parsed.push((idx, ids));
    }

    let modifiers: HashMap<Uuid, modifier::Model> = if all_modifier_ids.is_empty() {
        HashMap::new()
    } else {
        Modifier::find()
            .filter(modifier::Column::Id.is_in(all_modifier_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect()
    };

    let mut lines = Vec::with_capacity(items.len());
    for (idx, modifier_ids) in parsed {
        let item = &items[idx];

        let product = match products.get(&item.product_id) {
            Some(product) => product,
            None if strict => {
                return Err(ServiceError::Upstream(format!(
                    "Pricing lookup failed: product {} no longer exists",
                    item.product_id
                )));
            }
            None => {
                warn!(
                    "Cart item {} references missing product {}; skipped in view",
                    item.id, item.product_id
                );
                continue;
            }
        };

        let mut snapshots = Vec::with_capacity(modifier_ids.len());
        let mut modifier_total = Decimal::ZERO;
        for modifier_id in &modifier_ids {
            match modifiers.get(modifier_id) {
                Some(m) if m.is_active => {
                    modifier_total += m.price;
                    snapshots.push(ModifierSnapshot {
                        id: m.id,
                        name: m.name.clone(),
                        price: m.price,
                    });
                }
                _ if strict => {
                    return Err(ServiceError::Upstream(format!(
                        "Pricing lookup failed: modifier {} is missing or inactive",
                        modifier_id
                    )));
                }
                _ => {
                    warn!(
                        "Cart item {} references unusable modifier {}; dropped from view",
                        item.id, modifier_id
                    );
                }
            }
        }

        let line_subtotal = (product.price + modifier_total) * Decimal::from(item.quantity);
        lines.push(PricedLine {
            id: item.id,
            product_id: item.product_id,
            product_name: product.name.clone(),
            product_price: product.price,
            quantity: item.quantity,
            modifiers: snapshots,
            line_subtotal,
        });
    }

    Ok(lines)
}
