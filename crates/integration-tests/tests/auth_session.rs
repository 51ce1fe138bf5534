//! Login, logout, and session-scoped cart behavior over real HTTP.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::Ordering;

use roastline_integration_tests::{TEST_PASSWORD, http_client, login, spawn_storefront};

#[tokio::test]
async fn test_login_lands_on_account_page() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .post(format!("{}/auth/login", storefront.base_url))
        .form(&[("username", "casey"), ("password", TEST_PASSWORD)])
        .send()
        .await
        .expect("Login request failed");

    assert!(resp.status().is_success());
    assert_eq!(resp.url().path(), "/account");
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("casey"));
}

#[tokio::test]
async fn test_failed_login_shows_backend_message_verbatim() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .post(format!("{}/auth/login", storefront.base_url))
        .form(&[("username", "casey"), ("password", "wrong")])
        .send()
        .await
        .expect("Login request failed");

    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Invalid username or password"));
}

#[tokio::test]
async fn test_cart_page_requires_login() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .get(format!("{}/cart", storefront.base_url))
        .send()
        .await
        .expect("Request failed");

    assert_eq!(resp.url().path(), "/auth/login");
}

#[tokio::test]
async fn test_cart_badge_reads_mirror_without_backend_calls() {
    let storefront = spawn_storefront().await;
    let client = http_client();
    login(&client, &storefront, "casey").await;

    let resp = client
        .post(format!("{}/cart/add", storefront.base_url))
        .form(&[
            ("product_id", "p1"),
            ("subtype_id", "s1"),
            ("grind_id", "g1"),
            ("quantity", "3"),
            ("price", "14.50"),
        ])
        .send()
        .await
        .expect("Add request failed");
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get("HX-Trigger")
            .and_then(|v| v.to_str().ok()),
        Some("cart-updated")
    );
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Added to cart"));

    // The badge renders from the local mirror; polling it costs no cart
    // fetches beyond the login hydration.
    let gets_before = storefront.backend.state.cart_gets.load(Ordering::SeqCst);
    for _ in 0..3 {
        let resp = client
            .get(format!("{}/cart/count", storefront.base_url))
            .send()
            .await
            .expect("Count request failed");
        let body = resp.text().await.expect("Failed to read body");
        assert_eq!(body.trim(), "3");
    }
    assert_eq!(
        storefront.backend.state.cart_gets.load(Ordering::SeqCst),
        gets_before
    );
}

#[tokio::test]
async fn test_rejected_add_surfaces_message_and_leaves_badge_empty() {
    let storefront = spawn_storefront().await;
    let client = http_client();
    login(&client, &storefront, "casey").await;

    *storefront.backend.state.fail_add.lock().await = Some((409, "out of stock".to_string()));

    let resp = client
        .post(format!("{}/cart/add", storefront.base_url))
        .form(&[
            ("product_id", "p1"),
            ("subtype_id", "s1"),
            ("grind_id", "g1"),
            ("quantity", "2"),
            ("price", "14.50"),
        ])
        .send()
        .await
        .expect("Add request failed");
    assert_eq!(resp.status().as_u16(), 409);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("out of stock"));

    let resp = client
        .get(format!("{}/cart/count", storefront.base_url))
        .send()
        .await
        .expect("Count request failed");
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.trim().is_empty());
}

#[tokio::test]
async fn test_invalid_quantity_rejected_before_any_cart_post() {
    let storefront = spawn_storefront().await;
    let client = http_client();
    login(&client, &storefront, "casey").await;

    let resp = client
        .post(format!("{}/cart/add", storefront.base_url))
        .form(&[
            ("product_id", "p1"),
            ("subtype_id", "s1"),
            ("grind_id", "g1"),
            ("quantity", "51"),
            ("price", "14.50"),
        ])
        .send()
        .await
        .expect("Add request failed");
    assert_eq!(resp.status().as_u16(), 400);
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Quantity must be at most 50"));

    assert_eq!(
        storefront.backend.state.cart_posts.load(Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_logout_clears_session_and_badge() {
    let storefront = spawn_storefront().await;
    let client = http_client();
    login(&client, &storefront, "casey").await;

    client
        .post(format!("{}/cart/add", storefront.base_url))
        .form(&[
            ("product_id", "p1"),
            ("subtype_id", "s1"),
            ("grind_id", "g1"),
            ("quantity", "2"),
            ("price", "14.50"),
        ])
        .send()
        .await
        .expect("Add request failed");

    let resp = client
        .post(format!("{}/auth/logout", storefront.base_url))
        .send()
        .await
        .expect("Logout request failed");
    assert!(resp.status().is_success());
    assert_eq!(resp.url().path(), "/");

    let resp = client
        .get(format!("{}/cart/count", storefront.base_url))
        .send()
        .await
        .expect("Count request failed");
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.trim().is_empty());

    // Protected pages bounce back to login
    let resp = client
        .get(format!("{}/account", storefront.base_url))
        .send()
        .await
        .expect("Account request failed");
    assert_eq!(resp.url().path(), "/auth/login");
}
