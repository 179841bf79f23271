//! Database entities, one module per table.

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod category_unit;
pub mod ingredient;
pub mod inventory_record;
pub mod modifier;
pub mod order;
pub mod order_item;
pub mod product_modifier;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod recipe;
pub mod recipe_line;
pub mod unit;

pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use category::Entity as Category;
pub use category_unit::Entity as CategoryUnit;
pub use ingredient::Entity as Ingredient;
pub use inventory_record::Entity as InventoryRecord;
pub use modifier::Entity as Modifier;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product_modifier::Entity as ProductModifier;
pub use purchase_order::Entity as PurchaseOrder;
pub use purchase_order_item::Entity as PurchaseOrderItem;
pub use recipe::Entity as Recipe;
pub use recipe_line::Entity as RecipeLine;
pub use unit::Entity as Unit;
