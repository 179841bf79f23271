//! HTTP handlers: thin translation between the wire and the services.

pub mod auth;
pub mod carts;
pub mod categories;
pub mod checkout;
pub mod common;
pub mod ingredients;
pub mod inventory;
pub mod orders;
pub mod purchase_orders;
pub mod recipes;
pub mod units;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        categories::CategoryService,
        commerce::{CartService, CheckoutService, OrderService},
        ingredients::IngredientService,
        inventory::InventoryService,
        modifiers::ModifierService,
        procurement::ProcurementService,
        recipes::RecipeService,
        units::UnitService,
    },
};
use std::sync::Arc;

/// Container wiring every domain service to the shared pool and event
/// channel.
#[derive(Clone)]
pub struct AppServices {
    pub units: Arc<UnitService>,
    pub categories: Arc<CategoryService>,
    pub ingredients: Arc<IngredientService>,
    pub recipes: Arc<RecipeService>,
    pub modifiers: Arc<ModifierService>,
    pub inventory: Arc<InventoryService>,
    pub procurement: Arc<ProcurementService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let recipes = Arc::new(RecipeService::new(db.clone(), event_sender.clone()));
        Self {
            units: Arc::new(UnitService::new(db.clone(), event_sender.clone())),
            categories: Arc::new(CategoryService::new(db.clone(), event_sender.clone())),
            ingredients: Arc::new(IngredientService::new(db.clone(), event_sender.clone())),
            modifiers: Arc::new(ModifierService::new(
                db.clone(),
                event_sender.clone(),
                recipes.clone(),
            )),
            recipes,
            inventory: Arc::new(InventoryService::new(db.clone(), event_sender.clone())),
            procurement: Arc::new(ProcurementService::new(db.clone(), event_sender.clone())),
            cart: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            checkout: Arc::new(CheckoutService::new(db.clone(), event_sender.clone())),
            orders: Arc::new(OrderService::new(db, event_sender)),
        }
    }
}
