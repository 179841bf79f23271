use crate::{
    entities::{category, category_unit, ingredient, unit, Category, CategoryUnit, Ingredient, Unit},
    errors::ServiceError,
    events::{Event, EventSender},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Registry of ingredient categories, each restricted to a subset of the
/// known units.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Resolves a list of unit names, failing on the first unknown one.
    async fn resolve_units(&self, names: &[String]) -> Result<Vec<unit::Model>, ServiceError> {
        let mut resolved = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.clone()) {
                continue;
            }
            let unit = Unit::find()
                .filter(unit::Column::Name.eq(name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("Unknown unit '{}'", name))
                })?;
            resolved.push(unit);
        }
        Ok(resolved)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryView, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name must not be empty".to_string(),
            ));
        }
        if input.allowed_unit_names.is_empty() {
            return Err(ServiceError::ValidationError(
                "A category needs at least one allowed unit".to_string(),
            ));
        }

        let allowed_units = self.resolve_units(&input.allowed_unit_names).await?;

        if Category::find()
            .filter(category::Column::Name.eq(&name))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateKey(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let txn = self.db.begin().await?;

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            tag: Set(input.tag),
        };
        let created = model.insert(&txn).await.map_err(|e| {
            ServiceError::from_insert(e, format!("Category '{}' already exists", name))
        })?;

        for unit in &allowed_units {
            category_unit::ActiveModel {
                category_id: Set(created.id),
                unit_id: Set(unit.id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(created.id))
            .await;

        info!(
            "Created category '{}' with {} allowed unit(s)",
            created.name,
            allowed_units.len()
        );
        Ok(CategoryView::assemble(created, allowed_units))
    }

    pub async fn get_category(&self, name: &str) -> Result<CategoryView, ServiceError> {
        let model = self.get_category_model(name).await?;
        let allowed_units = self.allowed_units_of(model.id).await?;
        Ok(CategoryView::assemble(model, allowed_units))
    }

    pub async fn get_category_model(&self, name: &str) -> Result<category::Model, ServiceError> {
        Category::find()
            .filter(category::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category '{}' not found", name)))
    }

    async fn allowed_units_of(&self, category_id: Uuid) -> Result<Vec<unit::Model>, ServiceError> {
        let unit_ids: Vec<Uuid> = CategoryUnit::find()
            .filter(category_unit::Column::CategoryId.eq(category_id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|link| link.unit_id)
            .collect();

        if unit_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(Unit::find()
            .filter(unit::Column::Id.is_in(unit_ids))
            .order_by_asc(unit::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryView>, ServiceError> {
        let categories = Category::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?;

        let mut views = Vec::with_capacity(categories.len());
        for model in categories {
            let allowed_units = self.allowed_units_of(model.id).await?;
            views.push(CategoryView::assemble(model, allowed_units));
        }
        Ok(views)
    }

    /// Updates a category; when the allowed-unit set is replaced, the new set
    /// must stay non-empty and must still cover every existing ingredient of
    /// the category, otherwise those ingredients would be orphaned.
    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        name: &str,
        input: UpdateCategoryInput,
    ) -> Result<CategoryView, ServiceError> {
        let existing = self.get_category_model(name).await?;

        let new_allowed = match &input.allowed_unit_names {
            Some(names) => {
                if names.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "A category needs at least one allowed unit".to_string(),
                    ));
                }
                Some(self.resolve_units(names).await?)
            }
            None => None,
        };

        if let Some(units) = &new_allowed {
            let allowed_ids: HashSet<Uuid> = units.iter().map(|u| u.id).collect();
            let orphaned = Ingredient::find()
                .filter(ingredient::Column::CategoryId.eq(existing.id))
                .filter(ingredient::Column::UnitId.is_not_in(allowed_ids.iter().copied()))
                .count(&*self.db)
                .await?;
            if orphaned > 0 {
                return Err(ServiceError::ReferentialConflict(format!(
                    "{} ingredient(s) of category '{}' use units outside the new allowed set",
                    orphaned, name
                )));
            }
        }

        let txn = self.db.begin().await?;

        let category_id = existing.id;
        let mut active: category::ActiveModel = existing.into();
        if let Some(tag) = input.tag {
            active.tag = Set(Some(tag));
        }
        let updated = active.update(&txn).await?;

        let allowed_units = if let Some(units) = new_allowed {
            CategoryUnit::delete_many()
                .filter(category_unit::Column::CategoryId.eq(category_id))
                .exec(&txn)
                .await?;
            for unit in &units {
                category_unit::ActiveModel {
                    category_id: Set(category_id),
                    unit_id: Set(unit.id),
                }
                .insert(&txn)
                .await?;
            }
            units
        } else {
            Vec::new()
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CategoryUpdated(category_id))
            .await;

        if allowed_units.is_empty() {
            self.get_category(&updated.name).await
        } else {
            Ok(CategoryView::assemble(updated, allowed_units))
        }
    }

    /// Deletion is blocked while any ingredient references the category.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, name: &str) -> Result<(), ServiceError> {
        let existing = self.get_category_model(name).await?;

        let ingredient_refs = Ingredient::find()
            .filter(ingredient::Column::CategoryId.eq(existing.id))
            .count(&*self.db)
            .await?;
        if ingredient_refs > 0 {
            return Err(ServiceError::ReferentialConflict(format!(
                "Category '{}' is used by {} ingredient(s)",
                name, ingredient_refs
            )));
        }

        let txn = self.db.begin().await?;
        CategoryUnit::delete_many()
            .filter(category_unit::Column::CategoryId.eq(existing.id))
            .exec(&txn)
            .await?;
        let category_id = existing.id;
        Category::delete_by_id(category_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CategoryDeleted(category_id))
            .await;

        info!("Deleted category '{}'", name);
        Ok(())
    }
}

/// Category with its resolved allowed units
#[derive(Debug, Serialize)]
pub struct CategoryView {
    pub id: Uuid,
    pub name: String,
    pub tag: Option<String>,
    pub allowed_units: Vec<AllowedUnit>,
}

#[derive(Debug, Serialize)]
pub struct AllowedUnit {
    pub name: String,
    pub abbreviation: String,
}

impl CategoryView {
    fn assemble(model: category::Model, units: Vec<unit::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            tag: model.tag,
            allowed_units: units
                .into_iter()
                .map(|u| AllowedUnit {
                    name: u.name,
                    abbreviation: u.abbreviation,
                })
                .collect(),
        }
    }
}

/// Input for creating a category
#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
    pub tag: Option<String>,
    pub allowed_unit_names: Vec<String>,
}

/// Input for updating a category
#[derive(Debug, Deserialize)]
pub struct UpdateCategoryInput {
    pub tag: Option<String>,
    pub allowed_unit_names: Option<Vec<String>>,
}
