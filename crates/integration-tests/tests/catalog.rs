//! Catalog browsing and inventory editing over real HTTP: URL filters are
//! forwarded to the backend unchanged and edit state stays in the URL.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use roastline_integration_tests::{http_client, login, spawn_storefront};

#[tokio::test]
async fn test_filter_params_forwarded_one_to_one() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .get(format!("{}/products?id=esp&page=2", storefront.base_url))
        .send()
        .await
        .expect("Catalog request failed");
    assert!(resp.status().is_success());

    let queries = storefront.backend.state.product_queries.lock().await;
    let last = queries.last().expect("No catalog query recorded");
    assert_eq!(
        last,
        &vec![
            ("id".to_string(), "esp".to_string()),
            ("page".to_string(), "2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_default_catalog_page_is_served_from_cache() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    for _ in 0..2 {
        let resp = client
            .get(format!("{}/products", storefront.base_url))
            .send()
            .await
            .expect("Catalog request failed");
        assert!(resp.status().is_success());
    }

    let queries = storefront.backend.state.product_queries.lock().await;
    assert_eq!(queries.len(), 1);
}

#[tokio::test]
async fn test_unknown_product_is_404() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .get(format!("{}/products/nope", storefront.base_url))
        .send()
        .await
        .expect("Detail request failed");
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn test_detail_renders_placeholder_for_image_sentinel() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    // The first subtype of p1 carries the "#" image sentinel
    let resp = client
        .get(format!("{}/products/p1", storefront.base_url))
        .send()
        .await
        .expect("Detail request failed");
    assert!(resp.status().is_success());
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("Yirgacheffe"));
    assert!(body.contains("/static/img/default-product.svg"));
}

#[tokio::test]
async fn test_detail_selection_comes_from_url() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .get(format!(
            "{}/products/p1?weight=s2&grind=g2",
            storefront.base_url
        ))
        .send()
        .await
        .expect("Detail request failed");
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("https://cdn.example.com/p1-1kg.jpg"));
    assert!(body.contains("42.00"));
}

#[tokio::test]
async fn test_product_without_subtypes_shows_unavailable_state() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .get(format!("{}/products/bare", storefront.base_url))
        .send()
        .await
        .expect("Detail request failed");
    assert!(resp.status().is_success());
    let body = resp.text().await.expect("Failed to read body");
    assert!(body.contains("currently unavailable"));
}

#[tokio::test]
async fn test_table_edit_marker_is_not_forwarded_to_backend() {
    let storefront = spawn_storefront().await;
    let client = http_client();

    let resp = client
        .get(format!(
            "{}/products/table?page=2&edit=p1:0",
            storefront.base_url
        ))
        .send()
        .await
        .expect("Table request failed");
    assert!(resp.status().is_success());

    let queries = storefront.backend.state.product_queries.lock().await;
    let last = queries.last().expect("No catalog query recorded");
    assert_eq!(last, &vec![("page".to_string(), "2".to_string())]);
}

#[tokio::test]
async fn test_saved_edit_reaches_backend_and_closes_the_row() {
    let storefront = spawn_storefront().await;
    let client = http_client();
    login(&client, &storefront, "casey").await;

    let resp = client
        .post(format!(
            "{}/products/p1/subtypes/0?page=2&edit=p1:0",
            storefront.base_url
        ))
        .form(&[
            ("subtype_id", "s1"),
            ("weight_name", "250g"),
            ("image_url", "#"),
            ("price", "15.00"),
            ("stock", "9"),
        ])
        .send()
        .await
        .expect("Edit request failed");
    assert!(resp.status().is_success());

    // Redirect lands on the table with the filters intact and edit mode off
    assert_eq!(resp.url().path(), "/products/table");
    let query = resp.url().query().unwrap_or_default();
    assert!(query.contains("page=2"));
    assert!(!query.contains("edit="));

    let updates = storefront.backend.state.subtype_updates.lock().await;
    let (prod_id, index, body) = updates.last().expect("No update recorded");
    assert_eq!(prod_id, "p1");
    assert_eq!(*index, 0);
    assert_eq!(body["price"], "15.00");
    assert_eq!(body["stock"], 9);
    assert_eq!(body["weight"]["_id"], "s1");
}

#[tokio::test]
async fn test_rejected_edit_keeps_the_row_open_with_a_message() {
    let storefront = spawn_storefront().await;
    let client = http_client();
    login(&client, &storefront, "casey").await;

    let resp = client
        .post(format!(
            "{}/products/p1/subtypes/0?page=2&edit=p1:0",
            storefront.base_url
        ))
        .form(&[
            ("subtype_id", "s1"),
            ("weight_name", "250g"),
            ("image_url", "#"),
            ("price", "abc"),
            ("stock", "9"),
        ])
        .send()
        .await
        .expect("Edit request failed");

    // Validation failure redirects back into edit mode with the message
    assert_eq!(resp.url().path(), "/products/table");
    let query = resp.url().query().unwrap_or_default();
    assert!(query.contains("edit=p1%3A0"));
    assert!(query.contains("error="));

    assert!(storefront.backend.state.subtype_updates.lock().await.is_empty());
}
