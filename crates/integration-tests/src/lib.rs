//! Integration test support for Roastline.
//!
//! Provides an in-process mock of the commerce backend REST API plus a
//! storefront instance wired to it, so tests exercise the real client,
//! cart store, session, and route code over real HTTP without any external
//! services.
//!
//! # Example
//!
//! ```rust,ignore
//! let storefront = spawn_storefront().await;
//! let client = http_client();
//!
//! login(&client, &storefront, "casey").await;
//! let resp = client
//!     .get(format!("{}/cart", storefront.base_url))
//!     .send()
//!     .await
//!     .expect("request failed");
//! assert!(resp.status().is_success());
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use roastline_storefront::api::ApiClient;
use roastline_storefront::config::StorefrontConfig;
use roastline_storefront::services::CartStore;
use roastline_storefront::state::AppState;
use roastline_storefront::{middleware, routes};

/// The password the mock backend accepts for any username.
pub const TEST_PASSWORD: &str = "brew-day";

/// Bearer token the mock backend issues at login.
pub const TEST_TOKEN: &str = "test-token-abc123";

/// User id the mock backend issues at login.
pub const TEST_USER_ID: i32 = 7;

// =============================================================================
// Mock Backend
// =============================================================================

/// Observable state of the mock backend, shared with the tests.
#[derive(Default)]
pub struct MockState {
    /// Cart lines per user id, as the backend would store them.
    pub carts: Mutex<HashMap<i32, Vec<Value>>>,
    /// Every query-pair list received by `GET /products`.
    pub product_queries: Mutex<Vec<Vec<(String, String)>>>,
    /// Number of `POST /cart` requests received.
    pub cart_posts: AtomicUsize,
    /// Number of `GET /cart/{userId}` requests received.
    pub cart_gets: AtomicUsize,
    /// Subtype updates received: (`prod_id`, index, body).
    pub subtype_updates: Mutex<Vec<(String, usize, Value)>>,
    /// When set, `POST /cart` fails with this status and message.
    pub fail_add: Mutex<Option<(u16, String)>>,
}

/// A running mock backend.
pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

/// Start the mock backend on an ephemeral port.
pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    let app = backend_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Mock backend crashed");
    });

    MockBackend {
        base_url: format!("http://{addr}"),
        state,
    }
}

fn backend_router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/auth/login", post(mock_login))
        .route("/forgot-password", post(mock_forgot_password))
        .route("/products", get(mock_products))
        .route("/product/{id}", get(mock_product))
        .route("/product/{id}/subtypes/{index}", put(mock_update_subtype))
        .route("/countries", get(mock_countries))
        .route("/cart", post(mock_add_to_cart))
        .route("/cart/{user_id}", get(mock_get_cart))
        .route("/cart/{user_id}/{subtype_id}", delete(mock_remove_from_cart))
        .route("/user/{id}", get(mock_user))
        .route("/orders/{user_id}", get(mock_orders))
        .with_state(state)
}

/// The catalog document every test sees for product `p1`.
#[must_use]
pub fn sample_product() -> Value {
    json!({
        "_id": "64f0c1",
        "prod_id": "p1",
        "name": "Yirgacheffe",
        "description": "Floral and bright.",
        "product_category": { "name": "Single Origin" },
        "product_subtypes": [
            {
                "weight": { "_id": "s1", "name": "250g" },
                "price": "14.50",
                "stock": 12,
                "image_url": "#"
            },
            {
                "weight": { "_id": "s2", "name": "1kg" },
                "price": "42.00",
                "stock": 3,
                "image_url": "https://cdn.example.com/p1-1kg.jpg"
            }
        ],
        "grind_types": [
            { "_id": "g1", "name": "Whole Bean" },
            { "_id": "g2", "name": "Espresso" }
        ],
        "countries_origin": ["Ethiopia"],
        "reviews": [{ "rating": "4" }, { "rating": "5" }]
    })
}

/// A product with no subtypes and no grinds, for empty-state tests.
#[must_use]
pub fn bare_product() -> Value {
    json!({
        "_id": "64f0c2",
        "prod_id": "bare",
        "name": "Mystery Lot",
        "product_category": { "name": "Misc" }
    })
}

async fn mock_login(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] == TEST_PASSWORD {
        (
            StatusCode::OK,
            Json(json!({
                "id": TEST_USER_ID,
                "username": body["username"],
                "accessToken": TEST_TOKEN,
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid username or password" })),
        )
    }
}

async fn mock_forgot_password() -> Json<Value> {
    Json(json!({ "message": "ok" }))
}

async fn mock_products(
    State(state): State<Arc<MockState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<Value> {
    state.product_queries.lock().await.push(pairs);
    Json(json!({
        "products": [sample_product(), bare_product()],
        "totalPages": 3,
        "page": 1
    }))
}

async fn mock_product(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "p1" => (StatusCode::OK, Json(sample_product())),
        "bare" => (StatusCode::OK, Json(bare_product())),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Product not found" })),
        ),
    }
}

async fn mock_update_subtype(
    State(state): State<Arc<MockState>>,
    Path((id, index)): Path<(String, usize)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.subtype_updates.lock().await.push((id, index, body));
    Json(json!({ "message": "updated" }))
}

async fn mock_countries() -> Json<Value> {
    Json(json!(["Ethiopia", "Colombia", "Brazil"]))
}

async fn mock_add_to_cart(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.cart_posts.fetch_add(1, Ordering::SeqCst);

    if let Some((status, message)) = state.fail_add.lock().await.clone() {
        return (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(json!({ "message": message })),
        );
    }

    let user_id = body["userId"].as_i64().unwrap_or(0) as i32;
    let product = &body["product"];
    let line = json!({
        "productId": product["id"],
        "subtypeIdentifier": product["subtypeIdentifier"],
        "grindType": product["grindType"],
        "quantity": product["quantity"],
        "price": product["price"],
    });

    state
        .carts
        .lock()
        .await
        .entry(user_id)
        .or_default()
        .push(line.clone());

    (StatusCode::OK, Json(line))
}

async fn mock_get_cart(
    State(state): State<Arc<MockState>>,
    Path(user_id): Path<i32>,
) -> Json<Value> {
    state.cart_gets.fetch_add(1, Ordering::SeqCst);
    let carts = state.carts.lock().await;
    Json(json!(carts.get(&user_id).cloned().unwrap_or_default()))
}

async fn mock_remove_from_cart(
    State(state): State<Arc<MockState>>,
    Path((user_id, subtype_id)): Path<(i32, String)>,
) -> Json<Value> {
    let mut carts = state.carts.lock().await;
    if let Some(lines) = carts.get_mut(&user_id) {
        lines.retain(|l| l["subtypeIdentifier"] != subtype_id.as_str());
    }
    Json(json!({ "message": "removed" }))
}

async fn mock_user(Path(id): Path<i32>) -> Json<Value> {
    Json(json!({
        "username": "casey",
        "email": format!("user{id}@example.com"),
        "company": "Casey's Cafe",
        "address": "12 Bean St",
        "phone": "555-0147",
        "created_at": "2024-03-01"
    }))
}

async fn mock_orders(Path(_user_id): Path<i32>) -> Json<Value> {
    Json(json!([
        { "_id": "ord-1", "total": "29.00", "placed_at": "2025-11-02" }
    ]))
}

// =============================================================================
// Storefront Harness
// =============================================================================

/// A storefront instance wired to its own mock backend.
pub struct TestStorefront {
    pub base_url: String,
    pub backend: MockBackend,
}

/// Start a storefront (routes + sessions) against a fresh mock backend.
pub async fn spawn_storefront() -> TestStorefront {
    let backend = spawn_backend().await;

    let config = StorefrontConfig {
        backend_api_url: backend.base_url.clone(),
        host: "127.0.0.1".parse().expect("Invalid host"),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        sentry_dsn: None,
    };

    let state = AppState::new(config.clone());
    let session_layer = middleware::create_session_layer(&config);
    let app = Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind storefront");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test storefront crashed");
    });

    TestStorefront {
        base_url: format!("http://{addr}"),
        backend,
    }
}

/// Cookie-keeping HTTP client for session flows.
#[must_use]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Log in through the storefront, establishing a session cookie.
pub async fn login(client: &reqwest::Client, storefront: &TestStorefront, username: &str) {
    let resp = client
        .post(format!("{}/auth/login", storefront.base_url))
        .form(&[("username", username), ("password", TEST_PASSWORD)])
        .send()
        .await
        .expect("Login request failed");
    assert!(
        resp.status().is_success(),
        "login did not succeed: {}",
        resp.status()
    );
}

/// A cart store talking directly to the given mock backend, for tests below
/// the HTTP layer.
#[must_use]
pub fn cart_store(backend: &MockBackend) -> CartStore {
    CartStore::new(ApiClient::new(&backend.base_url))
}
