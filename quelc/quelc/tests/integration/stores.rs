//! Entity-store fixtures shared by the integration tests.

use quelc::metadata::MemoryEntityStore;

pub fn product_store() -> MemoryEntityStore {
    let mut store = MemoryEntityStore::new();
    store
        .add_entity("Product", "products")
        .key("id")
        .column("id", "id")
        .column("name", "name")
        .column("price", "price")
        .column("catId", "cat_id")
        .many_to_one("category", "Category", "catId")
        .required_relation("category");
    store
        .add_entity("Category", "categories")
        .key("id")
        .column("id", "id_col")
        .column("name", "name_col");
    store
}

pub fn order_store() -> MemoryEntityStore {
    let mut store = MemoryEntityStore::new();
    store
        .add_entity("Order", "orders")
        .key("id")
        .column("id", "id")
        .column("custId", "cust_id");
    store
        .add_entity("Customer", "customers")
        .key("id")
        .column("id", "id")
        .column("name", "name");
    store
}

pub fn user_store() -> MemoryEntityStore {
    let mut store = MemoryEntityStore::new();
    store
        .add_entity("User", "users")
        .key("id")
        .column("id", "id_col")
        .column("name", "name_col");
    store
}
