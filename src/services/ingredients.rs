use crate::{
    entities::{
        category, category_unit, ingredient, inventory_record, recipe_line, unit, Category,
        CategoryUnit, Ingredient, InventoryRecord, RecipeLine, Unit,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::BatchOutcome,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Catalog of raw materials.
///
/// The load-bearing invariant: an ingredient's unit always belongs to its
/// category's allowed-units set, checked on every create and update.
#[derive(Clone)]
pub struct IngredientService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl IngredientService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn unit_allowed_for_category(
        &self,
        category_id: Uuid,
        unit_id: Uuid,
    ) -> Result<bool, ServiceError> {
        Ok(CategoryUnit::find()
            .filter(category_unit::Column::CategoryId.eq(category_id))
            .filter(category_unit::Column::UnitId.eq(unit_id))
            .one(&*self.db)
            .await?
            .is_some())
    }

    #[instrument(skip(self))]
    pub async fn create_ingredient(
        &self,
        input: CreateIngredientInput,
    ) -> Result<IngredientView, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Ingredient name must not be empty".to_string(),
            ));
        }

        let category = Category::find()
            .filter(category::Column::Name.eq(&input.category_name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category '{}' not found", input.category_name))
            })?;

        let unit = Unit::find()
            .filter(unit::Column::Name.eq(&input.unit_name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Unit '{}' not found", input.unit_name))
            })?;

        if !self.unit_allowed_for_category(category.id, unit.id).await? {
            return Err(ServiceError::ValidationError(format!(
                "Unit '{}' is not allowed for category '{}'",
                unit.name, category.name
            )));
        }

        if let Some(threshold) = input.threshold {
            if threshold <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Threshold must be greater than 0".to_string(),
                ));
            }
        }

        if Ingredient::find()
            .filter(ingredient::Column::Name.eq(&name))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateKey(format!(
                "Ingredient '{}' already exists",
                name
            )));
        }

        let now = chrono::Utc::now();
        let model = ingredient::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            category_id: Set(category.id),
            unit_id: Set(unit.id),
            brand: Set(input.brand),
            threshold: Set(input.threshold),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await.map_err(|e| {
            ServiceError::from_insert(e, format!("Ingredient '{}' already exists", name))
        })?;

        self.event_sender
            .send_or_log(Event::IngredientCreated(created.id))
            .await;

        info!("Created ingredient '{}'", created.name);
        Ok(IngredientView::assemble(created, &category, &unit))
    }

    /// Batch creation mirroring the single-item rules: each entry is
    /// validated independently and failures carry the entry name + reason.
    #[instrument(skip(self, inputs))]
    pub async fn create_ingredients_batch(
        &self,
        inputs: Vec<CreateIngredientInput>,
    ) -> Result<BatchOutcome<IngredientView>, ServiceError> {
        let mut outcome = BatchOutcome::new();
        for input in inputs {
            let name = input.name.clone();
            match self.create_ingredient(input).await {
                Ok(view) => outcome.created.push(view),
                Err(err) => outcome.failed.push(crate::services::BatchFailure {
                    name,
                    reason: err.response_message(),
                }),
            }
        }
        Ok(outcome)
    }

    pub async fn get_ingredient_model(&self, name: &str) -> Result<ingredient::Model, ServiceError> {
        Ingredient::find()
            .filter(ingredient::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Ingredient '{}' not found", name)))
    }

    pub async fn get_ingredient(&self, name: &str) -> Result<IngredientView, ServiceError> {
        let model = self.get_ingredient_model(name).await?;
        self.view_of(model).await
    }

    async fn view_of(&self, model: ingredient::Model) -> Result<IngredientView, ServiceError> {
        let category = Category::find_by_id(model.category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Ingredient '{}' references a missing category",
                    model.name
                ))
            })?;
        let unit = Unit::find_by_id(model.unit_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Ingredient '{}' references a missing unit",
                    model.name
                ))
            })?;
        Ok(IngredientView::assemble(model, &category, &unit))
    }

    /// Lists ingredients with optional fuzzy name filter and category filter.
    pub async fn list_ingredients(
        &self,
        q: Option<&str>,
        category_name: Option<&str>,
    ) -> Result<Vec<IngredientView>, ServiceError> {
        let mut query = Ingredient::find().order_by_asc(ingredient::Column::Name);

        if let Some(q) = q {
            query = query.filter(ingredient::Column::Name.contains(q));
        }
        if let Some(category_name) = category_name {
            let category = Category::find()
                .filter(category::Column::Name.eq(category_name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category '{}' not found", category_name))
                })?;
            query = query.filter(ingredient::Column::CategoryId.eq(category.id));
        }

        let models = query.all(&*self.db).await?;

        // Reference tables are small; resolve names through in-memory maps
        // instead of per-row lookups.
        let categories: HashMap<Uuid, category::Model> = Category::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let units: HashMap<Uuid, unit::Model> = Unit::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut views = Vec::with_capacity(models.len());
        for model in models {
            let category = categories.get(&model.category_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Ingredient '{}' references a missing category",
                    model.name
                ))
            })?;
            let unit = units.get(&model.unit_id).ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Ingredient '{}' references a missing unit",
                    model.name
                ))
            })?;
            views.push(IngredientView::assemble(model, category, unit));
        }
        Ok(views)
    }

    /// Updates an ingredient, re-validating the unit-in-category invariant
    /// against the effective (possibly changed) category and unit.
    #[instrument(skip(self))]
    pub async fn update_ingredient(
        &self,
        name: &str,
        input: UpdateIngredientInput,
    ) -> Result<IngredientView, ServiceError> {
        let existing = self.get_ingredient_model(name).await?;

        let category = match &input.category_name {
            Some(category_name) => Category::find()
                .filter(category::Column::Name.eq(category_name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Category '{}' not found", category_name))
                })?,
            None => Category::find_by_id(existing.category_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "Ingredient '{}' references a missing category",
                        name
                    ))
                })?,
        };

        let unit = match &input.unit_name {
            Some(unit_name) => Unit::find()
                .filter(unit::Column::Name.eq(unit_name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Unit '{}' not found", unit_name)))?,
            None => Unit::find_by_id(existing.unit_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "Ingredient '{}' references a missing unit",
                        name
                    ))
                })?,
        };

        if !self.unit_allowed_for_category(category.id, unit.id).await? {
            return Err(ServiceError::ValidationError(format!(
                "Unit '{}' is not allowed for category '{}'",
                unit.name, category.name
            )));
        }

        if let Some(threshold) = input.threshold {
            if threshold <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Threshold must be greater than 0".to_string(),
                ));
            }
        }

        if let Some(new_name) = &input.new_name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Ingredient name must not be empty".to_string(),
                ));
            }
            if new_name != existing.name
                && Ingredient::find()
                    .filter(ingredient::Column::Name.eq(new_name))
                    .one(&*self.db)
                    .await?
                    .is_some()
            {
                return Err(ServiceError::DuplicateKey(format!(
                    "Ingredient '{}' already exists",
                    new_name
                )));
            }
        }

        let ingredient_id = existing.id;
        let mut active: ingredient::ActiveModel = existing.into();
        if let Some(new_name) = input.new_name {
            active.name = Set(new_name.trim().to_string());
        }
        active.category_id = Set(category.id);
        active.unit_id = Set(unit.id);
        if let Some(brand) = input.brand {
            active.brand = Set(Some(brand));
        }
        if let Some(threshold) = input.threshold {
            active.threshold = Set(Some(threshold));
        }
        active.updated_at = Set(chrono::Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::IngredientUpdated(ingredient_id))
            .await;

        Ok(IngredientView::assemble(updated, &category, &unit))
    }

    /// Deletion is blocked while any recipe line or inventory record
    /// references the ingredient.
    #[instrument(skip(self))]
    pub async fn delete_ingredient(&self, name: &str) -> Result<(), ServiceError> {
        let existing = self.get_ingredient_model(name).await?;

        let recipe_refs = RecipeLine::find()
            .filter(recipe_line::Column::IngredientId.eq(existing.id))
            .count(&*self.db)
            .await?;
        if recipe_refs > 0 {
            return Err(ServiceError::ReferentialConflict(format!(
                "Ingredient '{}' is used by {} recipe line(s)",
                name, recipe_refs
            )));
        }

        let inventory_refs = InventoryRecord::find()
            .filter(inventory_record::Column::IngredientId.eq(existing.id))
            .count(&*self.db)
            .await?;
        if inventory_refs > 0 {
            return Err(ServiceError::ReferentialConflict(format!(
                "Ingredient '{}' has {} inventory record(s)",
                name, inventory_refs
            )));
        }

        let ingredient_id = existing.id;
        Ingredient::delete_by_id(ingredient_id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::IngredientDeleted(ingredient_id))
            .await;

        info!("Deleted ingredient '{}'", name);
        Ok(())
    }
}

/// Denormalized ingredient for presentation
#[derive(Debug, Serialize)]
pub struct IngredientView {
    pub id: Uuid,
    pub name: String,
    pub category_name: String,
    pub unit_name: String,
    pub unit_abbreviation: String,
    pub brand: Option<String>,
    pub threshold: Option<Decimal>,
}

impl IngredientView {
    fn assemble(model: ingredient::Model, category: &category::Model, unit: &unit::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category_name: category.name.clone(),
            unit_name: unit.name.clone(),
            unit_abbreviation: unit.abbreviation.clone(),
            brand: model.brand,
            threshold: model.threshold,
        }
    }
}

/// Input for creating an ingredient
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    pub category_name: String,
    pub unit_name: String,
    pub brand: Option<String>,
    pub threshold: Option<Decimal>,
}

/// Input for updating an ingredient
#[derive(Debug, Deserialize)]
pub struct UpdateIngredientInput {
    pub new_name: Option<String>,
    pub category_name: Option<String>,
    pub unit_name: Option<String>,
    pub brand: Option<String>,
    pub threshold: Option<Decimal>,
}
