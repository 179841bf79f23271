use crate::{
    entities::{modifier, product_modifier, Modifier, ProductModifier},
    errors::ServiceError,
    events::{Event, EventSender},
    services::recipes::RecipeService,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Catalog of priced add-ons and their links to products.
#[derive(Clone)]
pub struct ModifierService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    recipes: Arc<RecipeService>,
}

impl ModifierService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        recipes: Arc<RecipeService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            recipes,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_modifier(
        &self,
        input: CreateModifierInput,
    ) -> Result<modifier::Model, ServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Modifier name must not be empty".to_string(),
            ));
        }
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Modifier price must not be negative".to_string(),
            ));
        }

        if Modifier::find()
            .filter(modifier::Column::Name.eq(&name))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateKey(format!(
                "Modifier '{}' already exists",
                name
            )));
        }

        let now = chrono::Utc::now();
        let created = modifier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            kind: Set(input.kind),
            price: Set(input.price),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_insert(e, format!("Modifier '{}' already exists", name)))?;

        self.event_sender
            .send_or_log(Event::ModifierCreated(created.id))
            .await;

        info!("Created modifier '{}'", created.name);
        Ok(created)
    }

    pub async fn get_modifier(&self, name: &str) -> Result<modifier::Model, ServiceError> {
        Modifier::find()
            .filter(modifier::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Modifier '{}' not found", name)))
    }

    pub async fn list_modifiers(
        &self,
        active_only: bool,
    ) -> Result<Vec<modifier::Model>, ServiceError> {
        let mut query = Modifier::find().order_by_asc(modifier::Column::Name);
        if active_only {
            query = query.filter(modifier::Column::IsActive.eq(true));
        }
        Ok(query.all(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn update_modifier(
        &self,
        name: &str,
        input: UpdateModifierInput,
    ) -> Result<modifier::Model, ServiceError> {
        let existing = self.get_modifier(name).await?;

        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Modifier price must not be negative".to_string(),
                ));
            }
        }
        if let Some(new_name) = &input.name {
            let new_name = new_name.trim();
            if new_name.is_empty() {
                return Err(ServiceError::ValidationError(
                    "Modifier name must not be empty".to_string(),
                ));
            }
            if new_name != existing.name
                && Modifier::find()
                    .filter(modifier::Column::Name.eq(new_name))
                    .one(&*self.db)
                    .await?
                    .is_some()
            {
                return Err(ServiceError::DuplicateKey(format!(
                    "Modifier '{}' already exists",
                    new_name
                )));
            }
        }

        let modifier_id = existing.id;
        let mut active: modifier::ActiveModel = existing.into();
        if let Some(new_name) = input.name {
            active.name = Set(new_name.trim().to_string());
        }
        if let Some(kind) = input.kind {
            active.kind = Set(kind);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ModifierUpdated(modifier_id))
            .await;

        Ok(updated)
    }

    /// Soft-retires a modifier: existing orders keep their frozen snapshot,
    /// carts can no longer select it.
    pub async fn deactivate_modifier(&self, name: &str) -> Result<modifier::Model, ServiceError> {
        self.update_modifier(
            name,
            UpdateModifierInput {
                name: None,
                kind: None,
                price: None,
                is_active: Some(false),
            },
        )
        .await
    }

    /// Offers a modifier on a product. Idempotent.
    #[instrument(skip(self))]
    pub async fn attach_modifier(
        &self,
        recipe_name: &str,
        modifier_name: &str,
    ) -> Result<(), ServiceError> {
        let recipe = self.recipes.get_recipe_model(recipe_name).await?;
        let modifier = self.get_modifier(modifier_name).await?;

        let exists = ProductModifier::find()
            .filter(product_modifier::Column::ProductId.eq(recipe.id))
            .filter(product_modifier::Column::ModifierId.eq(modifier.id))
            .one(&*self.db)
            .await?
            .is_some();
        if exists {
            return Ok(());
        }

        product_modifier::ActiveModel {
            product_id: Set(recipe.id),
            modifier_id: Set(modifier.id),
        }
        .insert(&*self.db)
        .await?;

        info!(
            "Attached modifier '{}' to recipe '{}'",
            modifier_name, recipe_name
        );
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn detach_modifier(
        &self,
        recipe_name: &str,
        modifier_name: &str,
    ) -> Result<(), ServiceError> {
        let recipe = self.recipes.get_recipe_model(recipe_name).await?;
        let modifier = self.get_modifier(modifier_name).await?;

        ProductModifier::delete_many()
            .filter(product_modifier::Column::ProductId.eq(recipe.id))
            .filter(product_modifier::Column::ModifierId.eq(modifier.id))
            .exec(&*self.db)
            .await?;

        Ok(())
    }

    pub async fn list_modifiers_for_product(
        &self,
        recipe_name: &str,
    ) -> Result<Vec<modifier::Model>, ServiceError> {
        let recipe = self.recipes.get_recipe_model(recipe_name).await?;

        let modifier_ids: Vec<Uuid> = ProductModifier::find()
            .filter(product_modifier::Column::ProductId.eq(recipe.id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|link| link.modifier_id)
            .collect();

        if modifier_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(Modifier::find()
            .filter(modifier::Column::Id.is_in(modifier_ids))
            .order_by_asc(modifier::Column::Name)
            .all(&*self.db)
            .await?)
    }
}

/// Input for creating a modifier
#[derive(Debug, Deserialize)]
pub struct CreateModifierInput {
    pub name: String,
    pub kind: String,
    pub price: Decimal,
}

/// Input for updating a modifier
#[derive(Debug, Deserialize)]
pub struct UpdateModifierInput {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}
