mod common;

use common::{create_modifier, create_product, seed_fruit_catalog, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use sweetshop_api::{
    entities::{order::DineOption, order::OrderStatus, order::PaymentMethod, CartItem},
    errors::ServiceError,
    services::commerce::{AddToCartInput, CheckoutInput, UpdateCartItemInput},
};
use uuid::Uuid;

const OWNER: &str = "user-1001";

fn checkout_input() -> CheckoutInput {
    CheckoutInput {
        payment_method: PaymentMethod::Card,
        dine_option: DineOption::TakeOut,
    }
}

#[tokio::test]
async fn absent_cart_reads_as_empty() {
    let app = TestApp::new().await;

    // The cart poll must tolerate a cart that does not exist yet.
    let view = app.services.cart.get_cart(OWNER).await.unwrap();
    assert!(view.cart_id.is_none());
    assert!(view.lines.is_empty());
    assert_eq!(view.total, Decimal::ZERO);

    let summary = app.services.cart.cart_summary(OWNER).await.unwrap();
    assert_eq!(summary.item_count, 0);
    assert_eq!(summary.total, Decimal::ZERO);
}

#[tokio::test]
async fn line_subtotal_includes_modifiers_times_quantity() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;
    let modifier_id = create_modifier(&app, "加奶油", dec!(2.00)).await;

    let view = app
        .services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 3,
                modifier_ids: vec![modifier_id],
            },
        )
        .await
        .unwrap();

    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].line_subtotal, dec!(36.00));
    assert_eq!(view.total, dec!(36.00));
    assert_eq!(view.lines[0].modifiers.len(), 1);
    assert_eq!(view.lines[0].modifiers[0].price, dec!(2.00));
}

#[tokio::test]
async fn identical_lines_are_never_merged() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;

    let add = AddToCartInput {
        product_id,
        quantity: 1,
        modifier_ids: vec![],
    };
    app.services.cart.add_item(OWNER, add).await.unwrap();
    let view = app
        .services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 1,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();

    // Same product, same (empty) modifier set: still two distinct lines.
    assert_eq!(view.lines.len(), 2);
    assert_eq!(view.total, dec!(20.00));
}

#[tokio::test]
async fn cart_total_tracks_add_update_remove() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let cake = create_product(&app, "草莓蛋糕", dec!(10.00)).await;
    let tart = create_product(&app, "草莓挞", dec!(15.50)).await;

    app.services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id: cake,
                quantity: 2,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();
    let view = app
        .services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id: tart,
                quantity: 1,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(view.total, dec!(35.50));

    let line_id = view.lines[0].id;
    let view = app
        .services
        .cart
        .update_item(
            OWNER,
            line_id,
            UpdateCartItemInput {
                quantity: Some(1),
                modifier_ids: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(view.total, dec!(25.50));

    let view = app.services.cart.remove_item(OWNER, line_id).await.unwrap();
    assert_eq!(view.total, dec!(15.50));
    assert_eq!(view.lines.len(), 1);
}

#[tokio::test]
async fn quantity_below_one_is_rejected() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;

    let err = app
        .services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 0,
                modifier_ids: vec![],
            },
        )
        .await
        .expect_err("zero quantity must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let view = app
        .services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 1,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();
    let line_id = view.lines[0].id;

    let err = app
        .services
        .cart
        .update_item(
            OWNER,
            line_id,
            UpdateCartItemInput {
                quantity: Some(0),
                modifier_ids: None,
            },
        )
        .await
        .expect_err("update below one must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn add_item_validates_product_and_modifiers() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;

    let err = app
        .services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id: Uuid::new_v4(),
                quantity: 1,
                modifier_ids: vec![],
            },
        )
        .await
        .expect_err("unknown product must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));

    let modifier_id = create_modifier(&app, "加奶油", dec!(2.00)).await;
    app.services
        .modifiers
        .deactivate_modifier("加奶油")
        .await
        .unwrap();

    let err = app
        .services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 1,
                modifier_ids: vec![modifier_id],
            },
        )
        .await
        .expect_err("inactive modifier must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn cart_reprices_on_every_read() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;

    app.services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 2,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();

    // A catalog price change is visible in the cart immediately: totals are
    // derived, never cached.
    app.services
        .recipes
        .set_recipe_price("草莓蛋糕", dec!(12.00))
        .await
        .unwrap();
    let view = app.services.cart.get_cart(OWNER).await.unwrap();
    assert_eq!(view.total, dec!(24.00));
}

#[tokio::test]
async fn checkout_freezes_prices_and_clears_cart() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;
    let modifier_id = create_modifier(&app, "加奶油", dec!(2.00)).await;

    app.services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 3,
                modifier_ids: vec![modifier_id],
            },
        )
        .await
        .unwrap();

    let order = app
        .services
        .checkout
        .checkout(OWNER, checkout_input())
        .await
        .expect("checkout succeeds");

    assert!(order.order_number.starts_with("ORD"));
    assert_eq!(order.status, OrderStatus::InProgress);
    assert_eq!(order.total, dec!(36.00));
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].unit_price, dec!(10.00));
    assert_eq!(order.lines[0].modifiers[0].price, dec!(2.00));

    // The cart is empty after checkout.
    let view = app.services.cart.get_cart(OWNER).await.unwrap();
    assert!(view.lines.is_empty());
    assert_eq!(view.total, Decimal::ZERO);

    // Price-at-purchase: a later catalog change never touches the order.
    app.services
        .recipes
        .set_recipe_price("草莓蛋糕", dec!(99.00))
        .await
        .unwrap();
    let fetched = app
        .services
        .orders
        .get_order(&order.order_number)
        .await
        .unwrap();
    assert_eq!(fetched.total, dec!(36.00));
    assert_eq!(fetched.lines[0].unit_price, dec!(10.00));
}

#[tokio::test]
async fn checkout_of_empty_cart_fails_and_changes_nothing() {
    let app = TestApp::new().await;

    let err = app
        .services
        .checkout
        .checkout(OWNER, checkout_input())
        .await
        .expect_err("empty cart must fail");
    assert!(matches!(err, ServiceError::EmptyCart));

    let orders = app.services.orders.list_orders(Some(OWNER)).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn checkout_fails_upstream_when_product_vanishes() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;

    app.services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 1,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();

    app.services.recipes.delete_recipe("草莓蛋糕").await.unwrap();

    let err = app
        .services
        .checkout
        .checkout(OWNER, checkout_input())
        .await
        .expect_err("vanished product must abort checkout");
    assert!(matches!(err, ServiceError::Upstream(_)));

    // The aborted checkout neither created an order nor dropped the line.
    let orders = app.services.orders.list_orders(Some(OWNER)).await.unwrap();
    assert!(orders.is_empty());
    let raw_lines = CartItem::find().count(&*app.db).await.unwrap();
    assert_eq!(raw_lines, 1);
}

#[tokio::test]
async fn carts_are_isolated_per_owner() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;

    for owner in ["user-a", "user-b"] {
        app.services
            .cart
            .add_item(
                owner,
                AddToCartInput {
                    product_id,
                    quantity: 1,
                    modifier_ids: vec![],
                },
            )
            .await
            .unwrap();
    }

    app.services
        .checkout
        .checkout("user-a", checkout_input())
        .await
        .unwrap();

    // Checking out A's cart leaves B's untouched.
    let view_a = app.services.cart.get_cart("user-a").await.unwrap();
    assert!(view_a.lines.is_empty());
    let view_b = app.services.cart.get_cart("user-b").await.unwrap();
    assert_eq!(view_b.lines.len(), 1);
}

#[tokio::test]
async fn order_status_transitions_are_restricted() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;
    app.services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 1,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();
    let order = app
        .services
        .checkout
        .checkout(OWNER, checkout_input())
        .await
        .unwrap();

    let updated = app
        .services
        .orders
        .update_status(&order.order_number, OrderStatus::Completed)
        .await
        .expect("in-progress to completed is allowed");
    assert_eq!(updated.status, OrderStatus::Completed);

    let err = app
        .services
        .orders
        .update_status(&order.order_number, OrderStatus::InProgress)
        .await
        .expect_err("moving back to in-progress is not allowed");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let updated = app
        .services
        .orders
        .update_status(&order.order_number, OrderStatus::Refunded)
        .await
        .expect("completed to refunded is allowed");
    assert_eq!(updated.status, OrderStatus::Refunded);
}

#[tokio::test]
async fn clear_cart_empties_and_tolerates_missing_cart() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    let product_id = create_product(&app, "草莓蛋糕", dec!(10.00)).await;

    // Clearing a cart that never existed is a no-op.
    app.services.cart.clear_cart(OWNER).await.unwrap();

    app.services
        .cart
        .add_item(
            OWNER,
            AddToCartInput {
                product_id,
                quantity: 2,
                modifier_ids: vec![],
            },
        )
        .await
        .unwrap();
    app.services.cart.clear_cart(OWNER).await.unwrap();

    let view = app.services.cart.get_cart(OWNER).await.unwrap();
    assert!(view.lines.is_empty());
    assert_eq!(view.total, Decimal::ZERO);
}
