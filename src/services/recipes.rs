use crate::{
    entities::{
        ingredient, product_modifier, recipe, recipe_line, unit, Ingredient, ProductModifier,
        Recipe, RecipeLine, Unit,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Catalog of composed products.
///
/// A recipe's sale price and its ingredient composition are independent
/// facts: the price is set by hand for the cart, never derived from the
/// lines.
#[derive(Clone)]
pub struct RecipeService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

/// A validated line ready for insertion.
struct ResolvedLine {
    ingredient: ingredient::Model,
    unit: unit::Model,
    quantity: Decimal,
}

impl RecipeService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    fn validate_header(
        name: &str,
        prep_time_hours: Decimal,
        price: Decimal,
        lines: &[RecipeLineInput],
    ) -> Result<(), ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Recipe name must not be empty".to_string(),
            ));
        }
        if prep_time_hours <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Prep time must be greater than 0".to_string(),
            ));
        }
        if price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price must not be negative".to_string(),
            ));
        }
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "A recipe needs at least one line".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolves and validates every line: known ingredient, positive
    /// quantity, and a unit equal to the ingredient's registered unit (no
    /// automatic conversion exists, so a mismatch would corrupt costing).
    async fn resolve_lines(
        &self,
        lines: &[RecipeLineInput],
    ) -> Result<Vec<ResolvedLine>, ServiceError> {
        let mut resolved = Vec::with_capacity(lines.len());
        for line in lines {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for '{}' must be greater than 0",
                    line.ingredient_name
                )));
            }

            let ingredient = Ingredient::find()
                .filter(ingredient::Column::Name.eq(&line.ingredient_name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Ingredient '{}' not found",
                        line.ingredient_name
                    ))
                })?;

            let unit = Unit::find()
                .filter(unit::Column::Name.eq(&line.unit_name))
                .one(&*self.db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Unit '{}' not found", line.unit_name))
                })?;

            if unit.id != ingredient.unit_id {
                return Err(ServiceError::ValidationError(format!(
                    "Line unit '{}' does not match the registered unit of ingredient '{}'",
                    unit.name, ingredient.name
                )));
            }

            resolved.push(ResolvedLine {
                ingredient,
                unit,
                quantity: line.quantity,
            });
        }
        Ok(resolved)
    }

    #[instrument(skip(self, input))]
    pub async fn create_recipe(&self, input: CreateRecipeInput) -> Result<RecipeView, ServiceError> {
        let name = input.name.trim().to_string();
        Self::validate_header(&name, input.prep_time_hours, input.price, &input.lines)?;
        let resolved = self.resolve_lines(&input.lines).await?;

        if Recipe::find()
            .filter(recipe::Column::Name.eq(&name))
            .one(&*self.db)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateKey(format!(
                "Recipe '{}' already exists",
                name
            )));
        }

        let txn = self.db.begin().await?;

        let now = chrono::Utc::now();
        let model = recipe::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            prep_time_hours: Set(input.prep_time_hours),
            price: Set(input.price),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&txn).await.map_err(|e| {
            ServiceError::from_insert(e, format!("Recipe '{}' already exists", name))
        })?;

        let mut line_views = Vec::with_capacity(resolved.len());
        for (position, line) in resolved.into_iter().enumerate() {
            recipe_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                recipe_id: Set(created.id),
                ingredient_id: Set(line.ingredient.id),
                quantity: Set(line.quantity),
                unit_id: Set(line.unit.id),
                position: Set(position as i32),
            }
            .insert(&txn)
            .await?;

            line_views.push(RecipeLineView {
                ingredient_name: line.ingredient.name,
                quantity: line.quantity,
                unit_name: line.unit.name,
                position: position as i32,
            });
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::RecipeCreated(created.id))
            .await;

        info!(
            "Created recipe '{}' with {} line(s)",
            created.name,
            line_views.len()
        );
        Ok(RecipeView::assemble(created, line_views))
    }

    /// Full wholesale replacement of the line list (never a merge), together
    /// with the header fields, inside one transaction.
    #[instrument(skip(self, input))]
    pub async fn update_recipe(
        &self,
        name: &str,
        input: UpdateRecipeInput,
    ) -> Result<RecipeView, ServiceError> {
        let existing = self.get_recipe_model(name).await?;
        Self::validate_header(name, input.prep_time_hours, input.price, &input.lines)?;
        let resolved = self.resolve_lines(&input.lines).await?;

        let txn = self.db.begin().await?;

        let recipe_id = existing.id;
        let mut active: recipe::ActiveModel = existing.into();
        active.prep_time_hours = Set(input.prep_time_hours);
        active.price = Set(input.price);
        active.updated_at = Set(chrono::Utc::now());
        let updated = active.update(&txn).await?;

        RecipeLine::delete_many()
            .filter(recipe_line::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await?;

        let mut line_views = Vec::with_capacity(resolved.len());
        for (position, line) in resolved.into_iter().enumerate() {
            recipe_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                recipe_id: Set(recipe_id),
                ingredient_id: Set(line.ingredient.id),
                quantity: Set(line.quantity),
                unit_id: Set(line.unit.id),
                position: Set(position as i32),
            }
            .insert(&txn)
            .await?;

            line_views.push(RecipeLineView {
                ingredient_name: line.ingredient.name,
                quantity: line.quantity,
                unit_name: line.unit.name,
                position: position as i32,
            });
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::RecipeUpdated(recipe_id))
            .await;

        Ok(RecipeView::assemble(updated, line_views))
    }

    /// Sets the customer-facing sale price. Placed orders are never
    /// affected: their prices were frozen at checkout.
    #[instrument(skip(self))]
    pub async fn set_recipe_price(
        &self,
        name: &str,
        price: Decimal,
    ) -> Result<recipe::Model, ServiceError> {
        if price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price must not be negative".to_string(),
            ));
        }
        let existing = self.get_recipe_model(name).await?;
        let recipe_id = existing.id;

        let mut active: recipe::ActiveModel = existing.into();
        active.price = Set(price);
        active.updated_at = Set(chrono::Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::RecipeUpdated(recipe_id))
            .await;

        Ok(updated)
    }

    pub async fn get_recipe_model(&self, name: &str) -> Result<recipe::Model, ServiceError> {
        Recipe::find()
            .filter(recipe::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Recipe '{}' not found", name)))
    }

    pub async fn get_recipe(&self, name: &str) -> Result<RecipeView, ServiceError> {
        let model = self.get_recipe_model(name).await?;

        let lines = RecipeLine::find()
            .filter(recipe_line::Column::RecipeId.eq(model.id))
            .order_by_asc(recipe_line::Column::Position)
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

        let mut line_views = Vec::with_capacity(lines.len());
        for line in lines {
            let ingredient_name = ingredients
                .get(&line.ingredient_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "unknown".to_string());
            let unit_name = units
                .get(&line.unit_id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "unknown".to_string());
            line_views.push(RecipeLineView {
                ingredient_name,
                quantity: line.quantity,
                unit_name,
                position: line.position,
            });
        }

        Ok(RecipeView::assemble(model, line_views))
    }

    pub async fn list_recipes(&self) -> Result<Vec<recipe::Model>, ServiceError> {
        Ok(Recipe::find()
            .order_by_asc(recipe::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Removes a recipe together with its owned lines and modifier links.
    /// Cart lines pointing at it are not blocked; they surface an upstream
    /// pricing failure at checkout instead.
    #[instrument(skip(self))]
    pub async fn delete_recipe(&self, name: &str) -> Result<(), ServiceError> {
        let existing = self.get_recipe_model(name).await?;

        let txn = self.db.begin().await?;
        RecipeLine::delete_many()
            .filter(recipe_line::Column::RecipeId.eq(existing.id))
            .exec(&txn)
            .await?;
        ProductModifier::delete_many()
            .filter(product_modifier::Column::ProductId.eq(existing.id))
            .exec(&txn)
            .await?;
        let recipe_id = existing.id;
        Recipe::delete_by_id(recipe_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::RecipeDeleted(recipe_id))
            .await;

        info!("Deleted recipe '{}'", name);
        Ok(())
    }
}

/// Recipe with its ordered lines
#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub id: Uuid,
    pub name: String,
    pub prep_time_hours: Decimal,
    pub price: Decimal,
    pub lines: Vec<RecipeLineView>,
}

#[derive(Debug, Serialize)]
pub struct RecipeLineView {
    pub ingredient_name: String,
    pub quantity: Decimal,
    pub unit_name: String,
    pub position: i32,
}

impl RecipeView {
    fn assemble(model: recipe::Model, lines: Vec<RecipeLineView>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            prep_time_hours: model.prep_time_hours,
            price: model.price,
            lines,
        }
    }
}

/// One (ingredient, quantity, unit) line of a recipe payload
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeLineInput {
    pub ingredient_name: String,
    pub quantity: Decimal,
    pub unit_name: String,
}

/// Input for creating a recipe
#[derive(Debug, Deserialize)]
pub struct CreateRecipeInput {
    pub name: String,
    pub prep_time_hours: Decimal,
    pub price: Decimal,
    pub lines: Vec<RecipeLineInput>,
}

/// Input for updating a recipe (line list is replaced wholesale)
#[derive(Debug, Deserialize)]
pub struct UpdateRecipeInput {
    pub prep_time_hours: Decimal,
    pub price: Decimal,
    pub lines: Vec<RecipeLineInput>,
}
