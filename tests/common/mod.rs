use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use sweetshop_api::{
    app_router,
    auth::AuthService,
    db::{self, DbConfig},
    events,
    handlers::AppServices,
    services::{
        categories::CreateCategoryInput,
        ingredients::CreateIngredientInput,
        modifiers::CreateModifierInput,
        recipes::{CreateRecipeInput, RecipeLineInput},
        units::CreateUnitInput,
    },
    AppState,
};
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database.
pub struct TestApp {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub services: AppServices,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&cfg)
            .await
            .expect("failed to create in-memory test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_sender, event_rx) = events::event_channel(256);
        tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()));
        let config = sweetshop_api::config::load_config().expect("test configuration");
        let auth = AuthService::new("test_signing_secret", Duration::from_secs(3600));

        let state = Arc::new(AppState {
            db: db.clone(),
            config,
            event_sender,
            auth,
            services: services.clone(),
        });

        Self {
            db,
            services,
            state,
        }
    }

    /// Full application router for HTTP-level tests.
    #[allow(dead_code)]
    pub fn router(&self) -> axum::Router {
        app_router(self.state.clone())
    }

    /// Bearer token for the given identity.
    #[allow(dead_code)]
    pub fn token(&self, identity: &str) -> String {
        self.state
            .auth
            .issue_token(identity)
            .expect("token issuance")
    }
}

/// Seeds the 克/水果/草莓 reference chain used across the suites:
/// unit 克 (g), unit 公斤 (kg, registered but NOT allowed for 水果),
/// category 水果 allowing only 克, and ingredient 草莓 measured in 克.
#[allow(dead_code)]
pub async fn seed_fruit_catalog(app: &TestApp) {
    app.services
        .units
        .create_unit(CreateUnitInput {
            name: "克".to_string(),
            abbreviation: "g".to_string(),
        })
        .await
        .expect("unit 克");
    app.services
        .units
        .create_unit(CreateUnitInput {
            name: "公斤".to_string(),
            abbreviation: "kg".to_string(),
        })
        .await
        .expect("unit 公斤");
    app.services
        .categories
        .create_category(CreateCategoryInput {
            name: "水果".to_string(),
            tag: None,
            allowed_unit_names: vec!["克".to_string()],
        })
        .await
        .expect("category 水果");
    app.services
        .ingredients
        .create_ingredient(CreateIngredientInput {
            name: "草莓".to_string(),
            category_name: "水果".to_string(),
            unit_name: "克".to_string(),
            brand: None,
            threshold: None,
        })
        .await
        .expect("ingredient 草莓");
}

/// Creates a sellable product (recipe) composed of one 草莓 line.
#[allow(dead_code)]
pub async fn create_product(app: &TestApp, name: &str, price: Decimal) -> Uuid {
    let recipe = app
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: name.to_string(),
            prep_time_hours: Decimal::ONE,
            price,
            lines: vec![RecipeLineInput {
                ingredient_name: "草莓".to_string(),
                quantity: Decimal::from(100),
                unit_name: "克".to_string(),
            }],
        })
        .await
        .expect("product recipe");
    recipe.id
}

/// Creates an active modifier with the given surcharge.
#[allow(dead_code)]
pub async fn create_modifier(app: &TestApp, name: &str, price: Decimal) -> Uuid {
    let modifier = app
        .services
        .modifiers
        .create_modifier(CreateModifierInput {
            name: name.to_string(),
            kind: "addon".to_string(),
            price,
        })
        .await
        .expect("modifier");
    modifier.id
}
