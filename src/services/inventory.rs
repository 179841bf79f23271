use crate::{
    entities::{
        ingredient, inventory_record, unit, Ingredient, InventoryRecord, Unit,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Whether a record needs restocking.
///
/// Pure derivation, never persisted: actual strictly below standard. The
/// boundary `actual == standard` does not need restocking.
pub fn restock_needed(standard_qty: Decimal, actual_qty: Decimal) -> bool {
    actual_qty < standard_qty
}

/// Per-store stock ledger for ingredients.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_inventory(
        &self,
        input: CreateInventoryInput,
    ) -> Result<InventoryView, ServiceError> {
        let ingredient = Ingredient::find()
            .filter(ingredient::Column::Name.eq(&input.ingredient_name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Ingredient '{}' not found", input.ingredient_name))
            })?;

        let unit = Unit::find()
            .filter(unit::Column::Name.eq(&input.unit_name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Unit '{}' not found", input.unit_name))
            })?;

        if unit.id != ingredient.unit_id {
            return Err(ServiceError::ValidationError(format!(
                "Unit '{}' does not match the registered unit of ingredient '{}'",
                unit.name, ingredient.name
            )));
        }
        if input.standard_qty < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Standard quantity cannot be negative".to_string(),
            ));
        }
        if input.actual_qty < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Actual quantity cannot be negative".to_string(),
            ));
        }

        if InventoryRecord::find()
            .filter(inventory_record::Column::StoreId.eq(&input.store_id))
            .filter(inventory_record::Column::IngredientId.eq(ingredient.id))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateKey(format!(
                "Inventory record for '{}' already exists in store '{}'",
                ingredient.name, input.store_id
            )));
        }

        let now = Utc::now();
        let created = inventory_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(input.store_id.clone()),
            ingredient_id: Set(ingredient.id),
            unit_id: Set(unit.id),
            standard_qty: Set(input.standard_qty),
            actual_qty: Set(input.actual_qty),
            location: Set(input.location),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            ServiceError::from_insert(
                e,
                format!(
                    "Inventory record for '{}' already exists in store '{}'",
                    ingredient.name, input.store_id
                ),
            )
        })?;

        self.event_sender
            .send_or_log(Event::InventoryRecordCreated(created.id))
            .await;

        info!(
            "Created inventory record for '{}' in store '{}'",
            ingredient.name, created.store_id
        );
        Ok(InventoryView::assemble(created, &ingredient, &unit))
    }

    /// Sets the actual quantity (stocktake or manual restock) and stamps the
    /// update time.
    #[instrument(skip(self))]
    pub async fn adjust_actual_qty(
        &self,
        record_id: Uuid,
        new_qty: Decimal,
    ) -> Result<InventoryView, ServiceError> {
        if new_qty < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Actual quantity cannot be negative".to_string(),
            ));
        }

        let record = InventoryRecord::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory record {} not found", record_id))
            })?;

        let old_qty = record.actual_qty;
        let mut active: inventory_record::ActiveModel = record.into();
        active.actual_qty = Set(new_qty);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::InventoryAdjusted {
                record_id,
                old_qty,
                new_qty,
            })
            .await;

        self.view_of(updated).await
    }

    pub async fn get_record(&self, record_id: Uuid) -> Result<InventoryView, ServiceError> {
        let record = InventoryRecord::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory record {} not found", record_id))
            })?;
        self.view_of(record).await
    }

    pub async fn delete_record(&self, record_id: Uuid) -> Result<(), ServiceError> {
        let record = InventoryRecord::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Inventory record {} not found", record_id))
            })?;
        InventoryRecord::delete_by_id(record.id).exec(&*self.db).await?;
        Ok(())
    }

    async fn view_of(&self, record: inventory_record::Model) -> Result<InventoryView, ServiceError> {
        let ingredient = Ingredient::find_by_id(record.ingredient_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Inventory record references a missing ingredient".into())
            })?;
        let unit = Unit::find_by_id(record.unit_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Inventory record references a missing unit".into())
            })?;
        Ok(InventoryView::assemble(record, &ingredient, &unit))
    }

    /// Lists a store's records with orthogonal grouping and sorting: sorting
    /// applies within each group, ascending, ties stable by record id.
    #[instrument(skip(self))]
    pub async fn list_inventory(
        &self,
        store_id: &str,
        group_by: GroupBy,
        sort_by: SortBy,
    ) -> Result<Vec<InventoryGroup>, ServiceError> {
        let records = InventoryRecord::find()
            .filter(inventory_record::Column::StoreId.eq(store_id))
            .order_by_asc(inventory_record::Column::Id)
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

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            let ingredient = ingredients.get(&record.ingredient_id).ok_or_else(|| {
                ServiceError::InternalError("Inventory record references a missing ingredient".into())
            })?;
            let unit = units.get(&record.unit_id).ok_or_else(|| {
                ServiceError::InternalError("Inventory record references a missing unit".into())
            })?;
            views.push(InventoryView::assemble(record, ingredient, unit));
        }

        Ok(group_and_sort(views, group_by, sort_by))
    }
}

/// Splits views into groups and sorts within each group.
fn group_and_sort(views: Vec<InventoryView>, group_by: GroupBy, sort_by: SortBy) -> Vec<InventoryGroup> {
    let mut groups: Vec<InventoryGroup> = match group_by {
        GroupBy::None => vec![InventoryGroup {
            key: "all".to_string(),
            records: views,
        }],
        GroupBy::Location => {
            let mut buckets: Vec<(String, Vec<InventoryView>)> = Vec::new();
            for view in views {
                let key = view
                    .location
                    .clone()
                    .unwrap_or_else(|| "unassigned".to_string());
                match buckets.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, records)) => records.push(view),
                    None => buckets.push((key, vec![view])),
                }
            }
            buckets.sort_by(|(a, _), (b, _)| a.cmp(b));
            buckets
                .into_iter()
                .map(|(key, records)| InventoryGroup { key, records })
                .collect()
        }
        GroupBy::RestockNeeded => {
            let (needed, ok): (Vec<_>, Vec<_>) =
                views.into_iter().partition(|v| v.restock_needed);
            vec![
                InventoryGroup {
                    key: "restock_needed".to_string(),
                    records: needed,
                },
                InventoryGroup {
                    key: "ok".to_string(),
                    records: ok,
                },
            ]
        }
    };

    for group in &mut groups {
        match sort_by {
            SortBy::None => {}
            SortBy::ActualQty => group
                .records
                .sort_by(|a, b| a.actual_qty.cmp(&b.actual_qty).then(a.id.cmp(&b.id))),
            SortBy::StandardQty => group
                .records
                .sort_by(|a, b| a.standard_qty.cmp(&b.standard_qty).then(a.id.cmp(&b.id))),
            SortBy::UpdateTime => group
                .records
                .sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id))),
        }
    }

    groups
}

/// Grouping modes for inventory listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    None,
    Location,
    RestockNeeded,
}

/// Sorting modes for inventory listings (ascending, stable by record id)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    None,
    ActualQty,
    StandardQty,
    UpdateTime,
}

/// Denormalized inventory record with the derived restock flag
#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    pub id: Uuid,
    pub store_id: String,
    pub ingredient_name: String,
    pub unit_abbreviation: String,
    pub standard_qty: Decimal,
    pub actual_qty: Decimal,
    pub location: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub restock_needed: bool,
}

impl InventoryView {
    fn assemble(
        record: inventory_record::Model,
        ingredient: &ingredient::Model,
        unit: &unit::Model,
    ) -> Self {
        Self {
            id: record.id,
            store_id: record.store_id,
            ingredient_name: ingredient.name.clone(),
            unit_abbreviation: unit.abbreviation.clone(),
            standard_qty: record.standard_qty,
            actual_qty: record.actual_qty,
            location: record.location,
            updated_at: record.updated_at,
            restock_needed: restock_needed(record.standard_qty, record.actual_qty),
        }
    }
}

/// One group of an inventory listing
#[derive(Debug, Serialize)]
pub struct InventoryGroup {
    pub key: String,
    pub records: Vec<InventoryView>,
}

/// Input for creating an inventory record
#[derive(Debug, Deserialize)]
pub struct CreateInventoryInput {
    pub store_id: String,
    pub ingredient_name: String,
    pub unit_name: String,
    pub standard_qty: Decimal,
    pub actual_qty: Decimal,
    pub location: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn view(
        id_byte: u8,
        actual: Decimal,
        standard: Decimal,
        location: Option<&str>,
    ) -> InventoryView {
        InventoryView {
            id: Uuid::from_bytes([id_byte; 16]),
            store_id: "store-1".to_string(),
            ingredient_name: format!("ingredient-{}", id_byte),
            unit_abbreviation: "g".to_string(),
            standard_qty: standard,
            actual_qty: actual,
            location: location.map(|s| s.to_string()),
            updated_at: Utc::now(),
            restock_needed: restock_needed(standard, actual),
        }
    }

    #[test]
    fn restock_boundary_is_not_needed() {
        assert!(restock_needed(dec!(50), dec!(30)));
        assert!(!restock_needed(dec!(50), dec!(50)));
        assert!(!restock_needed(dec!(50), dec!(55)));
        assert!(!restock_needed(dec!(0), dec!(0)));
    }

    #[test]
    fn ungrouped_listing_is_a_single_bucket() {
        let groups = group_and_sort(
            vec![view(1, dec!(5), dec!(10), None)],
            GroupBy::None,
            SortBy::None,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "all");
        assert_eq!(groups[0].records.len(), 1);
    }

    #[test]
    fn missing_location_buckets_as_unassigned() {
        let groups = group_and_sort(
            vec![
                view(1, dec!(5), dec!(10), Some("freezer")),
                view(2, dec!(5), dec!(10), None),
                view(3, dec!(5), dec!(10), Some("freezer")),
            ],
            GroupBy::Location,
            SortBy::None,
        );
        let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["freezer", "unassigned"]);
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[1].records.len(), 1);
    }

    #[test]
    fn restock_grouping_matches_derivation() {
        let groups = group_and_sort(
            vec![
                view(1, dec!(30), dec!(50), None),  // needed
                view(2, dec!(50), dec!(50), None),  // boundary: not needed
                view(3, dec!(60), dec!(50), None),  // not needed
            ],
            GroupBy::RestockNeeded,
            SortBy::None,
        );
        assert_eq!(groups[0].key, "restock_needed");
        assert_eq!(groups[0].records.len(), 1);
        assert_eq!(groups[1].key, "ok");
        assert_eq!(groups[1].records.len(), 2);
    }

    #[test]
    fn sorting_is_ascending_and_stable_by_id() {
        let groups = group_and_sort(
            vec![
                view(3, dec!(7), dec!(10), None),
                view(1, dec!(7), dec!(10), None),
                view(2, dec!(2), dec!(10), None),
            ],
            GroupBy::None,
            SortBy::ActualQty,
        );
        let ids: Vec<u8> = groups[0].records.iter().map(|r| r.id.as_bytes()[0]).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn sorting_applies_within_each_group() {
        let groups = group_and_sort(
            vec![
                view(1, dec!(9), dec!(10), Some("shelf")),
                view(2, dec!(1), dec!(10), Some("shelf")),
                view(3, dec!(4), dec!(10), None),
            ],
            GroupBy::Location,
            SortBy::ActualQty,
        );
        assert_eq!(groups[0].key, "shelf");
        let ids: Vec<u8> = groups[0].records.iter().map(|r| r.id.as_bytes()[0]).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
