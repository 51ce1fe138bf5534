//! Cart synchronization tests: the store mirrors the backend cart and never
//! commits a line the backend did not accept.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::Ordering;

use serde_json::json;

use roastline_core::{GrindId, Price, ProductId, SubtypeId, UserId};
use roastline_integration_tests::{MockBackend, TEST_USER_ID, cart_store, spawn_backend};
use roastline_storefront::services::{CartError, CartStore};

// =============================================================================
// Helpers
// =============================================================================

fn price(amount: &str) -> Price {
    Price::new(amount.parse().expect("Invalid decimal"))
}

async fn session(backend: &MockBackend) -> (CartStore, UserId) {
    let store = cart_store(backend);
    let user = UserId::new(TEST_USER_ID);
    store.init(user, "test-token").await;
    (store, user)
}

async fn add(
    store: &CartStore,
    user: UserId,
    subtype: &str,
    grind: &str,
    quantity: &str,
) -> Result<roastline_storefront::api::CartLine, CartError> {
    store
        .add_line(
            user,
            ProductId::new("p1"),
            SubtypeId::new(subtype),
            GrindId::new(grind),
            quantity,
            price("14.50"),
        )
        .await
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_add_line_commits_backend_then_mirror() {
    let backend = spawn_backend().await;
    let (store, user) = session(&backend).await;

    let line = add(&store, user, "s1", "g1", "3").await.expect("add failed");
    assert_eq!(line.quantity.get(), 3);

    assert_eq!(backend.state.cart_posts.load(Ordering::SeqCst), 1);
    assert_eq!(store.item_count(user).await, 3);

    let carts = backend.state.carts.lock().await;
    assert_eq!(carts.get(&TEST_USER_ID).map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_repeat_add_merges_into_one_mirror_line() {
    let backend = spawn_backend().await;
    let (store, user) = session(&backend).await;

    add(&store, user, "s1", "g1", "2").await.expect("add failed");
    add(&store, user, "s1", "g1", "3").await.expect("add failed");

    let lines = store.lines(user).await.expect("no session");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity.get(), 5);
    assert_eq!(backend.state.cart_posts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_distinct_grinds_stay_separate_lines() {
    let backend = spawn_backend().await;
    let (store, user) = session(&backend).await;

    add(&store, user, "s1", "g1", "2").await.expect("add failed");
    add(&store, user, "s1", "g2", "1").await.expect("add failed");

    let lines = store.lines(user).await.expect("no session");
    assert_eq!(lines.len(), 2);
    assert_eq!(store.item_count(user).await, 3);
}

#[tokio::test]
async fn test_invalid_quantity_never_reaches_backend() {
    let backend = spawn_backend().await;
    let (store, user) = session(&backend).await;

    for raw in ["0", "51", "", "lots"] {
        let result = add(&store, user, "s1", "g1", raw).await;
        assert!(matches!(result, Err(CartError::InvalidQuantity(_))), "{raw}");
    }

    assert_eq!(backend.state.cart_posts.load(Ordering::SeqCst), 0);
    assert_eq!(store.item_count(user).await, 0);
}

#[tokio::test]
async fn test_backend_rejection_surfaces_verbatim_and_commits_nothing() {
    let backend = spawn_backend().await;
    let (store, user) = session(&backend).await;
    *backend.state.fail_add.lock().await = Some((409, "out of stock".to_string()));

    let err = add(&store, user, "s1", "g1", "2")
        .await
        .expect_err("add should fail");
    assert_eq!(err.to_string(), "out of stock");
    assert_eq!(store.item_count(user).await, 0);
    assert_eq!(backend.state.cart_posts.load(Ordering::SeqCst), 1);

    // The same add succeeds once the backend recovers
    *backend.state.fail_add.lock().await = None;
    add(&store, user, "s1", "g1", "2").await.expect("add failed");
    assert_eq!(store.item_count(user).await, 2);
}

#[tokio::test]
async fn test_load_cart_replaces_mirror_with_backend_state() {
    let backend = spawn_backend().await;
    backend.state.carts.lock().await.insert(
        TEST_USER_ID,
        vec![
            json!({
                "productId": "p1",
                "subtypeIdentifier": "s1",
                "grindType": "g1",
                "quantity": 2,
                "price": "14.50"
            }),
            json!({
                "productId": "p1",
                "subtypeIdentifier": "s2",
                "grindType": "g1",
                "quantity": 1,
                "price": "42.00"
            }),
        ],
    );
    let (store, user) = session(&backend).await;

    let lines = store.load_cart(user).await.expect("load failed");
    assert_eq!(lines.len(), 2);
    assert_eq!(store.item_count(user).await, 3);
    assert_eq!(backend.state.cart_gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_remove_line_updates_backend_and_mirror() {
    let backend = spawn_backend().await;
    let (store, user) = session(&backend).await;
    add(&store, user, "s1", "g1", "2").await.expect("add failed");
    add(&store, user, "s2", "g1", "1").await.expect("add failed");

    store
        .remove_line(user, &SubtypeId::new("s1"))
        .await
        .expect("remove failed");

    let lines = store.lines(user).await.expect("no session");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].subtype_identifier, SubtypeId::new("s2"));

    let carts = backend.state.carts.lock().await;
    assert_eq!(carts.get(&TEST_USER_ID).map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_add_after_teardown_is_rejected() {
    let backend = spawn_backend().await;
    let (store, user) = session(&backend).await;
    store.teardown(user).await;

    let result = add(&store, user, "s1", "g1", "2").await;
    assert!(matches!(result, Err(CartError::NoSession(_))));
    assert_eq!(backend.state.cart_posts.load(Ordering::SeqCst), 0);
}
