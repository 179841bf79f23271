mod common;

use common::{seed_fruit_catalog, TestApp};
use rust_decimal_macros::dec;
use sweetshop_api::{
    errors::ServiceError,
    services::{
        ingredients::CreateIngredientInput,
        inventory::{CreateInventoryInput, GroupBy, SortBy},
    },
};

fn record_input(ingredient: &str, standard: rust_decimal::Decimal, actual: rust_decimal::Decimal) -> CreateInventoryInput {
    CreateInventoryInput {
        store_id: "store-1".to_string(),
        ingredient_name: ingredient.to_string(),
        unit_name: "克".to_string(),
        standard_qty: standard,
        actual_qty: actual,
        location: None,
    }
}

#[tokio::test]
async fn create_validates_quantities_and_unit() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    let err = app
        .services
        .inventory
        .create_inventory(CreateInventoryInput {
            standard_qty: dec!(-1),
            ..record_input("草莓", dec!(0), dec!(0))
        })
        .await
        .expect_err("negative standard qty must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = app
        .services
        .inventory
        .create_inventory(CreateInventoryInput {
            actual_qty: dec!(-1),
            ..record_input("草莓", dec!(0), dec!(0))
        })
        .await
        .expect_err("negative actual qty must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // 公斤 is a registered unit but not 草莓's registered unit.
    let err = app
        .services
        .inventory
        .create_inventory(CreateInventoryInput {
            unit_name: "公斤".to_string(),
            ..record_input("草莓", dec!(10), dec!(10))
        })
        .await
        .expect_err("mismatched unit must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = app
        .services
        .inventory
        .create_inventory(record_input("芒果", dec!(10), dec!(10)))
        .await
        .expect_err("unknown ingredient must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn one_record_per_store_and_ingredient() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    app.services
        .inventory
        .create_inventory(record_input("草莓", dec!(50), dec!(30)))
        .await
        .expect("first record succeeds");

    let err = app
        .services
        .inventory
        .create_inventory(record_input("草莓", dec!(60), dec!(10)))
        .await
        .expect_err("same (store, ingredient) must fail");
    assert!(matches!(err, ServiceError::DuplicateKey(_)));

    // A different store is a different record.
    app.services
        .inventory
        .create_inventory(CreateInventoryInput {
            store_id: "store-2".to_string(),
            ..record_input("草莓", dec!(60), dec!(10))
        })
        .await
        .expect("other store succeeds");
}

#[tokio::test]
async fn restock_flag_follows_quantities() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    // standard=50, actual=30 → restock needed.
    let record = app
        .services
        .inventory
        .create_inventory(record_input("草莓", dec!(50), dec!(30)))
        .await
        .unwrap();
    assert!(record.restock_needed);

    // +25 → actual 55 → no longer needed.
    let adjusted = app
        .services
        .inventory
        .adjust_actual_qty(record.id, dec!(55))
        .await
        .unwrap();
    assert_eq!(adjusted.actual_qty, dec!(55));
    assert!(!adjusted.restock_needed);

    // Boundary: actual == standard is NOT restock-needed.
    let adjusted = app
        .services
        .inventory
        .adjust_actual_qty(record.id, dec!(50))
        .await
        .unwrap();
    assert!(!adjusted.restock_needed);
}

#[tokio::test]
async fn adjust_rejects_negative_and_stamps_update_time() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    let record = app
        .services
        .inventory
        .create_inventory(record_input("草莓", dec!(50), dec!(30)))
        .await
        .unwrap();
    let before = record.updated_at;

    let err = app
        .services
        .inventory
        .adjust_actual_qty(record.id, dec!(-5))
        .await
        .expect_err("negative adjustment must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // The failed adjustment left the record untouched.
    let unchanged = app.services.inventory.get_record(record.id).await.unwrap();
    assert_eq!(unchanged.actual_qty, dec!(30));

    let adjusted = app
        .services
        .inventory
        .adjust_actual_qty(record.id, dec!(40))
        .await
        .unwrap();
    assert!(adjusted.updated_at >= before);
    assert_eq!(adjusted.actual_qty, dec!(40));
}

#[tokio::test]
async fn listing_groups_and_sorts_orthogonally() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    for name in ["蓝莓", "芒果"] {
        app.services
            .ingredients
            .create_ingredient(CreateIngredientInput {
                name: name.to_string(),
                category_name: "水果".to_string(),
                unit_name: "克".to_string(),
                brand: None,
                threshold: None,
            })
            .await
            .unwrap();
    }

    app.services
        .inventory
        .create_inventory(CreateInventoryInput {
            location: Some("冷藏".to_string()),
            ..record_input("草莓", dec!(50), dec!(30))
        })
        .await
        .unwrap();
    app.services
        .inventory
        .create_inventory(CreateInventoryInput {
            location: Some("冷藏".to_string()),
            ..record_input("蓝莓", dec!(20), dec!(25))
        })
        .await
        .unwrap();
    app.services
        .inventory
        .create_inventory(record_input("芒果", dec!(10), dec!(5)))
        .await
        .unwrap();

    // Group by location: named bucket plus "unassigned".
    let groups = app
        .services
        .inventory
        .list_inventory("store-1", GroupBy::Location, SortBy::ActualQty)
        .await
        .unwrap();
    let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
    assert!(keys.contains(&"冷藏"));
    assert!(keys.contains(&"unassigned"));

    let cold = groups.iter().find(|g| g.key == "冷藏").unwrap();
    // Ascending within the group.
    assert_eq!(cold.records[0].ingredient_name, "蓝莓");
    assert_eq!(cold.records[1].ingredient_name, "草莓");

    // Group by restock flag: the split is exactly the derivation.
    let groups = app
        .services
        .inventory
        .list_inventory("store-1", GroupBy::RestockNeeded, SortBy::None)
        .await
        .unwrap();
    assert_eq!(groups[0].key, "restock_needed");
    let needing: Vec<_> = groups[0]
        .records
        .iter()
        .map(|r| r.ingredient_name.as_str())
        .collect();
    assert_eq!(needing.len(), 2);
    assert!(needing.contains(&"草莓"));
    assert!(needing.contains(&"芒果"));
    assert_eq!(groups[1].key, "ok");
    assert_eq!(groups[1].records.len(), 1);

    // Ungrouped listing is a single bucket scoped to the store.
    let groups = app
        .services
        .inventory
        .list_inventory("store-1", GroupBy::None, SortBy::StandardQty)
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].records.len(), 3);
    let standards: Vec<_> = groups[0].records.iter().map(|r| r.standard_qty).collect();
    assert_eq!(standards, vec![dec!(10), dec!(20), dec!(50)]);

    // Another store sees nothing.
    let groups = app
        .services
        .inventory
        .list_inventory("store-9", GroupBy::None, SortBy::None)
        .await
        .unwrap();
    assert!(groups[0].records.is_empty());
}
