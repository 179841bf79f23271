use crate::{
    entities::{
        category_unit, ingredient, inventory_record, purchase_order, purchase_order_item, unit,
        CategoryUnit, Ingredient, InventoryRecord, PurchaseOrder, PurchaseOrderItem, Unit,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Purchase-order log: supplier receipts that replenish the inventory
/// ledger through an explicit receive step.
#[derive(Clone)]
pub struct ProcurementService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// A validated item ready for insertion.
struct ResolvedItem {
    ingredient: ingredient::Model,
    unit: unit::Model,
    quantity: Decimal,
    unit_price: Decimal,
    vendor: Option<String>,
}

impl ProcurementService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Generates the next `PO-YYYYMMDD-NNNN` code for the given date.
    async fn generate_po_code(&self, order_date: NaiveDate) -> Result<String, ServiceError> {
        let prefix = format!("PO-{}-", order_date.format("%Y%m%d"));

        let existing = PurchaseOrder::find()
            .filter(purchase_order::Column::PoCode.starts_with(prefix.as_str()))
            .all(&*self.db)
            .await?;

        let sequence = existing
            .iter()
            .filter_map(|po| po.po_code.rsplit('-').next())
            .filter_map(|suffix| suffix.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;

        Ok(format!("{}{:04}", prefix, sequence))
    }

    async fn resolve_items(
        &self,
        items: &[PurchaseOrderItemInput],
    ) -> Result<Vec<ResolvedItem>, ServiceError> {
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            let ingredient = Ingredient::find()
                .filter(ingredient::Column::Name.eq(&item.ingredient_name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Ingredient '{}' not found",
                        item.ingredient_name
                    ))
                })?;

            let unit = Unit::find()
                .filter(unit::Column::Name.eq(&item.unit_name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Unit '{}' not found", item.unit_name))
                })?;

            let allowed = CategoryUnit::find()
                .filter(category_unit::Column::CategoryId.eq(ingredient.category_id))
                .filter(category_unit::Column::UnitId.eq(unit.id))
                .one(&*self.db)
                .await?
                .is_some();
            if !allowed {
                return Err(ServiceError::ValidationError(format!(
                    "Unit '{}' is not allowed for ingredient '{}'",
                    unit.name, ingredient.name
                )));
            }

            if item.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for '{}' must be greater than 0",
                    item.ingredient_name
                )));
            }

            let unit_price = item.unit_price.ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Unit price for '{}' is missing",
                    item.ingredient_name
                ))
            })?;
            if unit_price <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Unit price for '{}' must be greater than 0",
                    item.ingredient_name
                )));
            }

            resolved.push(ResolvedItem {
                ingredient,
                unit,
                quantity: item.quantity,
                unit_price,
                vendor: item.vendor.clone(),
            });
        }
        Ok(resolved)
    }

    /// Creates a purchase order with its items in one transaction: subtotals
    /// and the order total are never observable in an inconsistent state.
    #[instrument(skip(self, input))]
    pub async fn create_purchase_order(
        &self,
        input: CreatePurchaseOrderInput,
    ) -> Result<PurchaseOrderView, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "A purchase order needs at least one item".to_string(),
            ));
        }
        if input.order_date > Utc::now().date_naive() {
            return Err(ServiceError::ValidationError(
                "Order date cannot be in the future".to_string(),
            ));
        }

        let resolved = self.resolve_items(&input.items).await?;
        let total: Decimal = resolved
            .iter()
            .map(|item| item.quantity * item.unit_price)
            .sum();

        // Generated outside the transaction; a concurrent create racing on
        // the same code loses to the unique index and surfaces DuplicateKey.
        let po_code = self.generate_po_code(input.order_date).await?;

        let txn = self.db.begin().await?;

        let po = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_code: Set(po_code.clone()),
            store_id: Set(input.store_id.clone()),
            order_date: Set(input.order_date),
            total: Set(total),
            received_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            ServiceError::from_insert(e, format!("Purchase order '{}' already exists", po_code))
        })?;

        let mut item_views = Vec::with_capacity(resolved.len());
        for item in resolved {
            let subtotal = item.quantity * item.unit_price;
            purchase_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_order_id: Set(po.id),
                ingredient_id: Set(item.ingredient.id),
                unit_id: Set(item.unit.id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                vendor: Set(item.vendor.clone()),
                subtotal: Set(subtotal),
            }
            .insert(&txn)
            .await?;

            item_views.push(PurchaseOrderItemView {
                ingredient_name: item.ingredient.name,
                unit_name: item.unit.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                vendor: item.vendor,
                subtotal,
            });
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderCreated {
                purchase_order_id: po.id,
                po_code: po.po_code.clone(),
            })
            .await;

        info!(
            "Created purchase order '{}' with {} item(s), total {}",
            po.po_code,
            item_views.len(),
            po.total
        );
        Ok(PurchaseOrderView::assemble(po, item_views))
    }

    pub async fn get_purchase_order_model(
        &self,
        po_code: &str,
    ) -> Result<purchase_order::Model, ServiceError> {
        PurchaseOrder::find()
            .filter(purchase_order::Column::PoCode.eq(po_code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order '{}' not found", po_code))
            })
    }

    pub async fn get_purchase_order(
        &self,
        po_code: &str,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let po = self.get_purchase_order_model(po_code).await?;
        let items = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
            .all(&*self.db)
            .await?;

        let ingredients: HashMap<Uuid, ingredient::Model> = Ingredient::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();
        let units: HashMap<Uuid, unit::Model> = Unit::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let item_views = items
            .into_iter()
            .map(|item| PurchaseOrderItemView {
                ingredient_name: ingredients
                    .get(&item.ingredient_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                unit_name: units
                    .get(&item.unit_id)
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| "unknown".to_string()),
                quantity: item.quantity,
                unit_price: item.unit_price,
                vendor: item.vendor,
                subtotal: item.subtotal,
            })
            .collect();

        Ok(PurchaseOrderView::assemble(po, item_views))
    }

    /// Lists purchase orders, newest first.
    pub async fn list_purchase_orders(
        &self,
        filter: ListPurchaseOrdersFilter,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let mut query = PurchaseOrder::find()
            .order_by_desc(purchase_order::Column::OrderDate)
            .order_by_desc(purchase_order::Column::PoCode);

        if let Some(store_id) = &filter.store_id {
            query = query.filter(purchase_order::Column::StoreId.eq(store_id));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(purchase_order::Column::OrderDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(purchase_order::Column::OrderDate.lte(date_to));
        }

        Ok(query.all(&*self.db).await?)
    }

    /// Applies a purchase order to the inventory ledger.
    ///
    /// Replenishment is an explicit operation, not a side effect of order
    /// creation: each item increments the actual quantity of the matching
    /// (store, ingredient) record. Items without a record are reported back
    /// as unmatched rather than silently dropped. A purchase order can be
    /// received at most once.
    #[instrument(skip(self))]
    pub async fn receive_purchase_order(
        &self,
        po_code: &str,
    ) -> Result<PurchaseOrderReceipt, ServiceError> {
        let po = self.get_purchase_order_model(po_code).await?;
        if po.received_at.is_some() {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase order '{}' has already been received",
                po_code
            )));
        }

        let items = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(po.id))
            .all(&*self.db)
            .await?;

        let txn = self.db.begin().await?;

        let mut applied = Vec::new();
        let mut unmatched = Vec::new();
        for item in items {
            let record = InventoryRecord::find()
                .filter(inventory_record::Column::StoreId.eq(&po.store_id))
                .filter(inventory_record::Column::IngredientId.eq(item.ingredient_id))
                .one(&txn)
                .await?;

            let ingredient_name = Ingredient::find_by_id(item.ingredient_id)
                .one(&txn)
                .await?
                .map(|i| i.name)
                .unwrap_or_else(|| "unknown".to_string());

            match record {
                Some(record) => {
                    let record_id = record.id;
                    let new_qty = record.actual_qty + item.quantity;
                    let mut active: inventory_record::ActiveModel = record.into();
                    active.actual_qty = Set(new_qty);
                    active.updated_at = Set(Utc::now());
                    active.update(&txn).await?;

                    applied.push(AppliedReceiptLine {
                        record_id,
                        ingredient_name,
                        received_qty: item.quantity,
                        new_actual_qty: new_qty,
                    });
                }
                None => {
                    warn!(
                        "No inventory record for '{}' in store '{}'; receipt line left unmatched",
                        ingredient_name, po.store_id
                    );
                    unmatched.push(ingredient_name);
                }
            }
        }

        let po_id = po.id;
        let mut active: purchase_order::ActiveModel = po.into();
        active.received_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderReceived {
                purchase_order_id: po_id,
                po_code: po_code.to_string(),
            })
            .await;

        info!(
            "Received purchase order '{}': {} line(s) applied, {} unmatched",
            po_code,
            applied.len(),
            unmatched.len()
        );
        Ok(PurchaseOrderReceipt {
            po_code: po_code.to_string(),
            applied,
            unmatched,
        })
    }
}

/// Purchase order with its items
#[derive(Debug, Serialize)]
pub struct PurchaseOrderView {
    pub id: Uuid,
    pub po_code: String,
    pub store_id: String,
    pub order_date: NaiveDate,
    pub total: Decimal,
    pub received_at: Option<DateTime<Utc>>,
    pub items: Vec<PurchaseOrderItemView>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseOrderItemView {
    pub ingredient_name: String,
    pub unit_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub vendor: Option<String>,
    pub subtotal: Decimal,
}

impl PurchaseOrderView {
    fn assemble(po: purchase_order::Model, items: Vec<PurchaseOrderItemView>) -> Self {
        Self {
            id: po.id,
            po_code: po.po_code,
            store_id: po.store_id,
            order_date: po.order_date,
            total: po.total,
            received_at: po.received_at,
            items,
        }
    }
}

/// Result of receiving a purchase order
#[derive(Debug, Serialize)]
pub struct PurchaseOrderReceipt {
    pub po_code: String,
    pub applied: Vec<AppliedReceiptLine>,
    pub unmatched: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AppliedReceiptLine {
    pub record_id: Uuid,
    pub ingredient_name: String,
    pub received_qty: Decimal,
    pub new_actual_qty: Decimal,
}

/// One item of a purchase order payload
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseOrderItemInput {
    pub ingredient_name: String,
    pub unit_name: String,
    pub quantity: Decimal,
    /// Required; an item without a price is rejected.
    pub unit_price: Option<Decimal>,
    pub vendor: Option<String>,
}

/// Input for creating a purchase order
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    pub store_id: String,
    pub order_date: NaiveDate,
    pub items: Vec<PurchaseOrderItemInput>,
}

/// Filters for listing purchase orders
#[derive(Debug, Default, Deserialize)]
pub struct ListPurchaseOrdersFilter {
    pub store_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}
