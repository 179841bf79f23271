//! OpenAPI document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(schemas(crate::errors::ErrorResponse)),
    tags(
        (name = "units", description = "Measurement unit registry"),
        (name = "categories", description = "Ingredient categories with allowed units"),
        (name = "ingredients", description = "Raw material catalog"),
        (name = "recipes", description = "Composed products and their sale prices"),
        (name = "inventory", description = "Per-store stock ledger"),
        (name = "purchase-orders", description = "Supplier receipts and replenishment"),
        (name = "cart", description = "Per-session cart"),
        (name = "orders", description = "Placed orders"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_builds() {
        let doc = ApiDoc::openapi();
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.schemas.contains_key("ErrorResponse")));
    }
}
