mod common;

use common::{seed_fruit_catalog, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sweetshop_api::{
    errors::ServiceError,
    services::{
        categories::{CreateCategoryInput, UpdateCategoryInput},
        ingredients::{CreateIngredientInput, UpdateIngredientInput},
        recipes::{CreateRecipeInput, RecipeLineInput},
        units::{CreateUnitInput, UpdateUnitInput},
    },
};

fn unit_input(name: &str, abbreviation: &str) -> CreateUnitInput {
    CreateUnitInput {
        name: name.to_string(),
        abbreviation: abbreviation.to_string(),
    }
}

fn ingredient_input(name: &str, category: &str, unit: &str) -> CreateIngredientInput {
    CreateIngredientInput {
        name: name.to_string(),
        category_name: category.to_string(),
        unit_name: unit.to_string(),
        brand: None,
        threshold: None,
    }
}

#[tokio::test]
async fn duplicate_unit_name_is_rejected() {
    let app = TestApp::new().await;

    app.services
        .units
        .create_unit(unit_input("克", "g"))
        .await
        .expect("first create succeeds");

    let err = app
        .services
        .units
        .create_unit(unit_input("克", "gram"))
        .await
        .expect_err("second create must fail");
    assert!(matches!(err, ServiceError::DuplicateKey(_)));
}

#[tokio::test]
async fn empty_unit_name_is_rejected() {
    let app = TestApp::new().await;
    let err = app
        .services
        .units
        .create_unit(unit_input("  ", "g"))
        .await
        .expect_err("blank name must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn unit_batch_reports_each_failure() {
    let app = TestApp::new().await;
    app.services
        .units
        .create_unit(unit_input("克", "g"))
        .await
        .unwrap();

    let outcome = app
        .services
        .units
        .create_units_batch(vec![
            unit_input("升", "L"),
            unit_input("克", "g"), // duplicate
            unit_input("毫升", "ml"),
        ])
        .await
        .expect("batch itself succeeds");

    assert_eq!(outcome.created.len(), 2);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].name, "克");
    assert!(outcome.failed[0].reason.contains("already exists"));
}

#[tokio::test]
async fn category_requires_known_nonempty_unit_set() {
    let app = TestApp::new().await;
    app.services
        .units
        .create_unit(unit_input("克", "g"))
        .await
        .unwrap();

    let err = app
        .services
        .categories
        .create_category(CreateCategoryInput {
            name: "水果".to_string(),
            tag: None,
            allowed_unit_names: vec![],
        })
        .await
        .expect_err("empty allowed set must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = app
        .services
        .categories
        .create_category(CreateCategoryInput {
            name: "水果".to_string(),
            tag: None,
            allowed_unit_names: vec!["夸脱".to_string()],
        })
        .await
        .expect_err("unknown unit must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    app.services
        .categories
        .create_category(CreateCategoryInput {
            name: "水果".to_string(),
            tag: Some("fresh".to_string()),
            allowed_unit_names: vec!["克".to_string()],
        })
        .await
        .expect("valid category succeeds");

    let err = app
        .services
        .categories
        .create_category(CreateCategoryInput {
            name: "水果".to_string(),
            tag: None,
            allowed_unit_names: vec!["克".to_string()],
        })
        .await
        .expect_err("duplicate category must fail");
    assert!(matches!(err, ServiceError::DuplicateKey(_)));
}

#[tokio::test]
async fn strawberry_scenario_enforces_unit_compatibility() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    // The seeded 草莓 sits inside its category's allowed units.
    let view = app.services.ingredients.get_ingredient("草莓").await.unwrap();
    assert_eq!(view.category_name, "水果");
    assert_eq!(view.unit_name, "克");

    // Unregistered unit name.
    let err = app
        .services
        .ingredients
        .create_ingredient(ingredient_input("蓝莓", "水果", "夸脱"))
        .await
        .expect_err("unregistered unit must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Registered unit outside the category's allowed set.
    let err = app
        .services
        .ingredients
        .create_ingredient(ingredient_input("蓝莓", "水果", "公斤"))
        .await
        .expect_err("unit outside allowed set must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Duplicate name.
    let err = app
        .services
        .ingredients
        .create_ingredient(ingredient_input("草莓", "水果", "克"))
        .await
        .expect_err("duplicate ingredient must fail");
    assert!(matches!(err, ServiceError::DuplicateKey(_)));
}

#[tokio::test]
async fn ingredient_threshold_must_be_positive() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    let err = app
        .services
        .ingredients
        .create_ingredient(CreateIngredientInput {
            threshold: Some(dec!(0)),
            ..ingredient_input("蓝莓", "水果", "克")
        })
        .await
        .expect_err("zero threshold must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn ingredient_update_revalidates_unit_invariant() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    // 公斤 exists but is not allowed for 水果.
    let err = app
        .services
        .ingredients
        .update_ingredient(
            "草莓",
            UpdateIngredientInput {
                new_name: None,
                category_name: None,
                unit_name: Some("公斤".to_string()),
                brand: None,
                threshold: None,
            },
        )
        .await
        .expect_err("switch to disallowed unit must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Widen the allowed set, then the same update passes and the invariant
    // holds on the new state.
    app.services
        .categories
        .update_category(
            "水果",
            UpdateCategoryInput {
                tag: None,
                allowed_unit_names: Some(vec!["克".to_string(), "公斤".to_string()]),
            },
        )
        .await
        .expect("widening the allowed set succeeds");

    let view = app
        .services
        .ingredients
        .update_ingredient(
            "草莓",
            UpdateIngredientInput {
                new_name: None,
                category_name: None,
                unit_name: Some("公斤".to_string()),
                brand: None,
                threshold: None,
            },
        )
        .await
        .expect("update succeeds once allowed");
    assert_eq!(view.unit_name, "公斤");
}

#[tokio::test]
async fn category_update_must_not_orphan_ingredients() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    // 草莓 is measured in 克; narrowing the set to 公斤 would orphan it.
    let err = app
        .services
        .categories
        .update_category(
            "水果",
            UpdateCategoryInput {
                tag: None,
                allowed_unit_names: Some(vec!["公斤".to_string()]),
            },
        )
        .await
        .expect_err("narrowing past live ingredients must fail");
    assert!(matches!(err, ServiceError::ReferentialConflict(_)));

    // The allowed set is unchanged after the failed update.
    let view = app.services.categories.get_category("水果").await.unwrap();
    let names: Vec<_> = view.allowed_units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["克"]);
}

#[tokio::test]
async fn unit_deletion_blocked_until_dereferenced() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    // Referenced by category 水果 and ingredient 草莓.
    let err = app
        .services
        .units
        .delete_unit("克")
        .await
        .expect_err("referenced unit must not delete");
    assert!(matches!(err, ServiceError::ReferentialConflict(_)));

    // Remove the referencing ingredient and category, then deletion
    // succeeds.
    app.services
        .ingredients
        .delete_ingredient("草莓")
        .await
        .expect("ingredient deletes");
    app.services
        .categories
        .delete_category("水果")
        .await
        .expect("category deletes");
    app.services
        .units
        .delete_unit("克")
        .await
        .expect("unit deletes once dereferenced");

    let err = app
        .services
        .units
        .get_unit("克")
        .await
        .expect_err("unit is gone");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn category_deletion_blocked_by_ingredients() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    let err = app
        .services
        .categories
        .delete_category("水果")
        .await
        .expect_err("category with ingredients must not delete");
    assert!(matches!(err, ServiceError::ReferentialConflict(_)));
}

#[tokio::test]
async fn ingredient_deletion_blocked_by_recipe_lines() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    app.services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "草莓蛋糕".to_string(),
            prep_time_hours: dec!(2),
            price: dec!(38.00),
            lines: vec![RecipeLineInput {
                ingredient_name: "草莓".to_string(),
                quantity: dec!(200),
                unit_name: "克".to_string(),
            }],
        })
        .await
        .expect("recipe creates");

    let err = app
        .services
        .ingredients
        .delete_ingredient("草莓")
        .await
        .expect_err("ingredient in a recipe must not delete");
    assert!(matches!(err, ServiceError::ReferentialConflict(_)));
}

#[tokio::test]
async fn ingredient_batch_is_per_item() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    let outcome = app
        .services
        .ingredients
        .create_ingredients_batch(vec![
            ingredient_input("蓝莓", "水果", "克"),
            ingredient_input("牛奶", "乳制品", "克"), // unknown category
            ingredient_input("草莓", "水果", "克"),   // duplicate
        ])
        .await
        .expect("batch call succeeds");

    assert_eq!(outcome.created.len(), 1);
    assert_eq!(outcome.created[0].name, "蓝莓");
    assert_eq!(outcome.failed.len(), 2);
    assert!(outcome.failed.iter().any(|f| f.name == "牛奶"));
    assert!(outcome.failed.iter().any(|f| f.name == "草莓"));
    // The good entry of a partially failing batch is persisted.
    assert!(app.services.ingredients.get_ingredient("蓝莓").await.is_ok());
}

#[tokio::test]
async fn unit_rename_checks_uniqueness() {
    let app = TestApp::new().await;
    app.services
        .units
        .create_unit(unit_input("克", "g"))
        .await
        .unwrap();
    app.services
        .units
        .create_unit(unit_input("升", "L"))
        .await
        .unwrap();

    let err = app
        .services
        .units
        .update_unit(
            "升",
            UpdateUnitInput {
                name: Some("克".to_string()),
                abbreviation: None,
            },
        )
        .await
        .expect_err("rename onto an existing unit must fail");
    assert!(matches!(err, ServiceError::DuplicateKey(_)));

    let updated = app
        .services
        .units
        .update_unit(
            "升",
            UpdateUnitInput {
                name: None,
                abbreviation: Some("l".to_string()),
            },
        )
        .await
        .expect("abbreviation-only update succeeds");
    assert_eq!(updated.abbreviation, "l");
}

#[tokio::test]
async fn recipe_price_and_lines_are_independent() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    let recipe = app
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "草莓蛋糕".to_string(),
            prep_time_hours: dec!(2),
            price: dec!(38.00),
            lines: vec![RecipeLineInput {
                ingredient_name: "草莓".to_string(),
                quantity: dec!(200),
                unit_name: "克".to_string(),
            }],
        })
        .await
        .unwrap();
    assert_eq!(recipe.price, dec!(38.00));

    // Changing the sale price leaves the composition untouched.
    app.services
        .recipes
        .set_recipe_price("草莓蛋糕", dec!(42.00))
        .await
        .unwrap();
    let view = app.services.recipes.get_recipe("草莓蛋糕").await.unwrap();
    assert_eq!(view.price, dec!(42.00));
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].quantity, dec!(200));

    let err = app
        .services
        .recipes
        .set_recipe_price("草莓蛋糕", Decimal::NEGATIVE_ONE)
        .await
        .expect_err("negative price must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn recipe_validations() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;

    // Empty line list.
    let err = app
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "空蛋糕".to_string(),
            prep_time_hours: dec!(1),
            price: dec!(10),
            lines: vec![],
        })
        .await
        .expect_err("empty lines must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Non-positive prep time.
    let err = app
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "快蛋糕".to_string(),
            prep_time_hours: dec!(0),
            price: dec!(10),
            lines: vec![RecipeLineInput {
                ingredient_name: "草莓".to_string(),
                quantity: dec!(1),
                unit_name: "克".to_string(),
            }],
        })
        .await
        .expect_err("zero prep time must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Unknown ingredient.
    let err = app
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "芒果蛋糕".to_string(),
            prep_time_hours: dec!(1),
            price: dec!(10),
            lines: vec![RecipeLineInput {
                ingredient_name: "芒果".to_string(),
                quantity: dec!(1),
                unit_name: "克".to_string(),
            }],
        })
        .await
        .expect_err("unknown ingredient must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Line unit differing from the ingredient's registered unit.
    let err = app
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "草莓杯".to_string(),
            prep_time_hours: dec!(1),
            price: dec!(10),
            lines: vec![RecipeLineInput {
                ingredient_name: "草莓".to_string(),
                quantity: dec!(1),
                unit_name: "公斤".to_string(),
            }],
        })
        .await
        .expect_err("mismatched line unit must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn recipe_update_replaces_lines_wholesale() {
    let app = TestApp::new().await;
    seed_fruit_catalog(&app).await;
    app.services
        .ingredients
        .create_ingredient(ingredient_input("蓝莓", "水果", "克"))
        .await
        .unwrap();

    app.services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "水果蛋糕".to_string(),
            prep_time_hours: dec!(2),
            price: dec!(30),
            lines: vec![
                RecipeLineInput {
                    ingredient_name: "草莓".to_string(),
                    quantity: dec!(100),
                    unit_name: "克".to_string(),
                },
                RecipeLineInput {
                    ingredient_name: "蓝莓".to_string(),
                    quantity: dec!(50),
                    unit_name: "克".to_string(),
                },
            ],
        })
        .await
        .unwrap();

    // The replacement list is NOT merged with the old one.
    let view = app
        .services
        .recipes
        .update_recipe(
            "水果蛋糕",
            sweetshop_api::services::recipes::UpdateRecipeInput {
                prep_time_hours: dec!(3),
                price: dec!(32),
                lines: vec![RecipeLineInput {
                    ingredient_name: "蓝莓".to_string(),
                    quantity: dec!(80),
                    unit_name: "克".to_string(),
                }],
            },
        )
        .await
        .expect("update succeeds");

    assert_eq!(view.prep_time_hours, dec!(3));
    assert_eq!(view.lines.len(), 1);
    assert_eq!(view.lines[0].ingredient_name, "蓝莓");
    assert_eq!(view.lines[0].quantity, dec!(80));
    assert_eq!(view.lines[0].position, 0);
}
