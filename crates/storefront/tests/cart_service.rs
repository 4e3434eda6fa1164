//! Cart behavior against an in-memory document store: lazy record creation,
//! quantity accumulation, totals, checkout, and revision-race handling.

mod common;

use std::sync::Arc;

use rust_decimal::dec;
use serde_json::json;

use common::{InMemoryStore, seed_product, test_user};
use urban_threads_core::ProductId;
use urban_threads_storefront::services::{CartError, CartService, CatalogService};

fn cart_service(store: &Arc<InMemoryStore>) -> CartService {
    let catalog = CatalogService::new(store.clone());
    CartService::new(store.clone(), catalog)
}

fn seed_user_record(store: &InMemoryStore, cart: serde_json::Value) {
    store.seed(
        "users",
        "user-1",
        json!({
            "email": "jo@example.com",
            "displayName": null,
            "createdAt": "2026-08-01T12:00:00Z",
            "cart": cart,
        }),
    );
}

#[tokio::test]
async fn first_cart_write_creates_the_user_record() {
    let store = Arc::new(InMemoryStore::new());
    let cart = cart_service(&store);
    let user = test_user();

    cart.add_to_cart(&user, &ProductId::new("tee-1"), 1)
        .await
        .expect("add");

    let record = store.fields("users", "user-1").expect("record created");
    assert_eq!(record["email"], "jo@example.com");
    assert!(record["createdAt"].is_string());
    assert_eq!(record["cart"]["tee-1"]["qty"], 1);
    // One create plus one cart merge.
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn adding_twice_accumulates_quantity() {
    let store = Arc::new(InMemoryStore::new());
    let cart = cart_service(&store);
    let user = test_user();
    let tee = ProductId::new("tee-1");

    cart.add_to_cart(&user, &tee, 1).await.expect("first add");
    cart.add_to_cart(&user, &tee, 2).await.expect("second add");

    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"]["tee-1"]["qty"], 3);
    assert_eq!(record["cart"].as_object().expect("cart object").len(), 1);
}

#[tokio::test]
async fn adding_a_second_product_keeps_existing_lines() {
    let store = Arc::new(InMemoryStore::new());
    seed_user_record(&store, json!({ "tee-1": { "qty": 2 } }));
    let cart = cart_service(&store);
    let user = test_user();

    cart.add_to_cart(&user, &ProductId::new("cap-1"), 1)
        .await
        .expect("add");

    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"]["tee-1"]["qty"], 2);
    assert_eq!(record["cart"]["cap-1"]["qty"], 1);
}

#[tokio::test]
async fn zero_quantity_is_stored_not_dropped() {
    let store = Arc::new(InMemoryStore::new());
    let cart = cart_service(&store);
    let user = test_user();

    cart.add_to_cart(&user, &ProductId::new("tee-1"), 0)
        .await
        .expect("add");

    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"]["tee-1"]["qty"], 0);
}

#[tokio::test]
async fn removing_a_line_deletes_only_that_line() {
    let store = Arc::new(InMemoryStore::new());
    seed_user_record(
        &store,
        json!({ "tee-1": { "qty": 2 }, "cap-1": { "qty": 1 } }),
    );
    let cart = cart_service(&store);
    let user = test_user();

    cart.remove_from_cart(&user, &ProductId::new("tee-1"))
        .await
        .expect("remove");

    let record = store.fields("users", "user-1").expect("record");
    assert!(record["cart"]["tee-1"].is_null());
    assert_eq!(record["cart"]["cap-1"]["qty"], 1);
}

#[tokio::test]
async fn removing_an_absent_product_writes_nothing() {
    let store = Arc::new(InMemoryStore::new());
    seed_user_record(&store, json!({ "tee-1": { "qty": 2 } }));
    let cart = cart_service(&store);
    let user = test_user();

    cart.remove_from_cart(&user, &ProductId::new("ghost-9"))
        .await
        .expect("remove is a no-op");

    assert_eq!(store.write_count(), 0);
    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"]["tee-1"]["qty"], 2);
}

#[tokio::test]
async fn removing_with_no_record_writes_nothing() {
    let store = Arc::new(InMemoryStore::new());
    let cart = cart_service(&store);
    let user = test_user();

    cart.remove_from_cart(&user, &ProductId::new("tee-1"))
        .await
        .expect("remove is a no-op");

    assert_eq!(store.write_count(), 0);
    assert!(store.fields("users", "user-1").is_none());
}

#[tokio::test]
async fn load_cart_joins_products_and_totals() {
    let store = Arc::new(InMemoryStore::new());
    seed_product(&store, "tee-1", "Box Tee", 19.99);
    seed_product(&store, "cap-1", "Logo Cap", 5.00);
    seed_user_record(
        &store,
        json!({ "tee-1": { "qty": 3 }, "cap-1": { "qty": 2 } }),
    );
    let cart = cart_service(&store);

    let contents = cart.load_cart(&test_user()).await.expect("load");

    assert_eq!(contents.lines.len(), 2);
    let tee = contents
        .lines
        .iter()
        .find(|line| line.product.id.as_str() == "tee-1")
        .expect("tee line");
    assert_eq!(tee.quantity, 3);
    assert_eq!(tee.subtotal.amount(), dec!(59.97));
    let cap = contents
        .lines
        .iter()
        .find(|line| line.product.id.as_str() == "cap-1")
        .expect("cap line");
    assert_eq!(cap.subtotal.amount(), dec!(10.00));
    assert_eq!(contents.total.amount(), dec!(69.97));
}

#[tokio::test]
async fn load_cart_skips_lines_for_vanished_products() {
    let store = Arc::new(InMemoryStore::new());
    seed_product(&store, "tee-1", "Box Tee", 19.99);
    seed_user_record(
        &store,
        json!({ "tee-1": { "qty": 1 }, "ghost-9": { "qty": 5 } }),
    );
    let cart = cart_service(&store);

    let contents = cart.load_cart(&test_user()).await.expect("load");

    assert_eq!(contents.lines.len(), 1);
    assert_eq!(contents.lines[0].product.id.as_str(), "tee-1");
    assert_eq!(contents.total.amount(), dec!(19.99));
}

#[tokio::test]
async fn load_cart_is_empty_without_a_record() {
    let store = Arc::new(InMemoryStore::new());
    let cart = cart_service(&store);

    let contents = cart.load_cart(&test_user()).await.expect("load");

    assert!(contents.is_empty());
    assert_eq!(contents.total.amount(), dec!(0));
}

#[tokio::test]
async fn checkout_clears_the_cart_but_keeps_the_record() {
    let store = Arc::new(InMemoryStore::new());
    seed_user_record(
        &store,
        json!({ "tee-1": { "qty": 3 }, "cap-1": { "qty": 1 } }),
    );
    let cart = cart_service(&store);

    cart.checkout_cart(&test_user()).await.expect("checkout");

    let record = store.fields("users", "user-1").expect("record survives");
    assert_eq!(record["cart"], json!({}));
    // Only the cart field is touched.
    assert_eq!(record["email"], "jo@example.com");
    assert_eq!(record["createdAt"], "2026-08-01T12:00:00Z");
}

#[tokio::test]
async fn checkout_with_no_record_succeeds_quietly() {
    let store = Arc::new(InMemoryStore::new());
    let cart = cart_service(&store);

    cart.checkout_cart(&test_user()).await.expect("checkout");

    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn failed_checkout_leaves_the_cart_untouched() {
    let store = Arc::new(InMemoryStore::new());
    seed_user_record(&store, json!({ "tee-1": { "qty": 2 } }));
    let cart = cart_service(&store);

    store.set_offline(true);
    let err = cart
        .checkout_cart(&test_user())
        .await
        .expect_err("store is down");
    assert!(matches!(err, CartError::Store(_)));

    store.set_offline(false);
    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"]["tee-1"]["qty"], 2);
}

#[tokio::test]
async fn a_lost_revision_race_is_retried() {
    let store = Arc::new(InMemoryStore::new());
    seed_user_record(&store, json!({}));
    let cart = cart_service(&store);
    let user = test_user();

    store.force_revision_races(1);
    cart.add_to_cart(&user, &ProductId::new("tee-1"), 2)
        .await
        .expect("retry wins");

    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"]["tee-1"]["qty"], 2);
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn persistent_races_surface_contention() {
    let store = Arc::new(InMemoryStore::new());
    seed_user_record(&store, json!({ "tee-1": { "qty": 1 } }));
    let cart = cart_service(&store);
    let user = test_user();

    store.force_revision_races(3);
    let err = cart
        .add_to_cart(&user, &ProductId::new("tee-1"), 1)
        .await
        .expect_err("every attempt loses");
    assert!(matches!(err, CartError::Contention));

    // The update was never applied.
    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"]["tee-1"]["qty"], 1);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn corrupt_record_is_reported_not_overwritten() {
    let store = Arc::new(InMemoryStore::new());
    store.seed("users", "user-1", json!({ "email": 42 }));
    let cart = cart_service(&store);
    let user = test_user();

    let err = cart
        .add_to_cart(&user, &ProductId::new("tee-1"), 1)
        .await
        .expect_err("record does not decode");
    assert!(matches!(err, CartError::Corrupt { .. }));
    assert!(err.to_string().contains("user-1"));

    let err = cart.load_cart(&user).await.expect_err("same on read");
    assert!(matches!(err, CartError::Corrupt { .. }));

    // Nothing was written over the broken record.
    assert_eq!(store.write_count(), 0);
    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record, json!({ "email": 42 }));
}

#[tokio::test]
async fn cart_walkthrough_accumulates_then_clears() {
    let store = Arc::new(InMemoryStore::new());
    seed_product(&store, "shirt-1", "Graphic Tee", 19.99);
    let cart = cart_service(&store);
    let user = test_user();
    let shirt = ProductId::new("shirt-1");

    cart.add_to_cart(&user, &shirt, 1).await.expect("add one");
    cart.add_to_cart(&user, &shirt, 2).await.expect("add two");

    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"], json!({ "shirt-1": { "qty": 3 } }));

    let contents = cart.load_cart(&user).await.expect("load");
    assert_eq!(contents.lines.len(), 1);
    assert_eq!(contents.lines[0].quantity, 3);
    assert_eq!(contents.total.amount(), dec!(59.97));

    cart.remove_from_cart(&user, &shirt).await.expect("remove");
    let record = store.fields("users", "user-1").expect("record");
    assert_eq!(record["cart"], json!({}));

    let contents = cart.load_cart(&user).await.expect("load again");
    assert!(contents.is_empty());
}
