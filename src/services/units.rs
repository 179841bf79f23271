use crate::{
    entities::{category_unit, ingredient, unit, CategoryUnit, Ingredient, Unit},
    errors::ServiceError,
    events::{Event, EventSender},
    services::BatchOutcome,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Registry of measurement units: the leaf of the reference-data graph.
#[derive(Clone)]
pub struct UnitService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl UnitService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_unit(&self, input: CreateUnitInput) -> Result<unit::Model, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Unit name must not be empty".to_string(),
            ));
        }

        if Unit::find()
            .filter(unit::Column::Name.eq(&name))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateKey(format!(
                "Unit '{}' already exists",
                name
            )));
        }

        let model = unit::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            abbreviation: Set(input.abbreviation),
        };

        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_insert(e, format!("Unit '{}' already exists", name)))?;

        self.event_sender
            .send_or_log(Event::UnitCreated(created.id))
            .await;

        info!("Created unit '{}'", created.name);
        Ok(created)
    }

    /// Batch creation: every entry is validated and inserted independently;
    /// failures are reported per entry, never silently skipped.
    #[instrument(skip(self, inputs))]
    pub async fn create_units_batch(
        &self,
        inputs: Vec<CreateUnitInput>,
    ) -> Result<BatchOutcome<unit::Model>, ServiceError> {
        let mut outcome = BatchOutcome::new();
        for input in inputs {
            let name = input.name.clone();
            match self.create_unit(input).await {
                Ok(model) => outcome.created.push(model),
                Err(err) => outcome.failed.push(crate::services::BatchFailure {
                    name,
                    reason: err.response_message(),
                }),
            }
        }
        Ok(outcome)
    }

    pub async fn get_unit(&self, name: &str) -> Result<unit::Model, ServiceError> {
        Unit::find()
            .filter(unit::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Unit '{}' not found", name)))
    }

    pub async fn list_units(&self) -> Result<Vec<unit::Model>, ServiceError> {
        Ok(Unit::find()
            .order_by_asc(unit::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update_unit(
        &self,
        name: &str,
        input: UpdateUnitInput,
    ) -> Result<unit::Model, ServiceError> {
        let existing = self.get_unit(name).await?;

        if let Some(new_name) = &input.name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Unit name must not be empty".to_string(),
                ));
            }
            if new_name != existing.name
                && Unit::find()
                    .filter(unit::Column::Name.eq(new_name))
                    .one(&*self.db)
                    .await?
                    .is_some()
            {
                return Err(ServiceError::DuplicateKey(format!(
                    "Unit '{}' already exists",
                    new_name
                )));
            }
        }

        let mut active: unit::ActiveModel = existing.into();
        if let Some(new_name) = input.name {
            active.name = Set(new_name.trim().to_string());
        }
        if let Some(abbreviation) = input.abbreviation {
            active.abbreviation = Set(abbreviation);
        }

        Ok(active.update(&*self.db).await?)
    }

    /// Deletion is blocked while any category lists the unit or any
    /// ingredient is measured in it.
    #[instrument(skip(self))]
    pub async fn delete_unit(&self, name: &str) -> Result<(), ServiceError> {
        let existing = self.get_unit(name).await?;

        let category_refs = CategoryUnit::find()
            .filter(category_unit::Column::UnitId.eq(existing.id))
            .count(&*self.db)
            .await?;
        if category_refs > 0 {
            return Err(ServiceError::ReferentialConflict(format!(
                "Unit '{}' is listed by {} category(ies)",
                name, category_refs
            )));
        }

        let ingredient_refs = Ingredient::find()
            .filter(ingredient::Column::UnitId.eq(existing.id))
            .count(&*self.db)
            .await?;
        if ingredient_refs > 0 {
            return Err(ServiceError::ReferentialConflict(format!(
                "Unit '{}' is used by {} ingredient(s)",
                name, ingredient_refs
            )));
        }

        let unit_id = existing.id;
        Unit::delete_by_id(unit_id).exec(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UnitDeleted(unit_id))
            .await;

        info!("Deleted unit '{}'", name);
        Ok(())
    }
}

/// Input for creating a unit
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnitInput {
    pub name: String,
    pub abbreviation: String,
}

/// Input for updating a unit
#[derive(Debug, Deserialize)]
pub struct UpdateUnitInput {
    pub name: Option<String>,
    pub abbreviation: Option<String>,
}
