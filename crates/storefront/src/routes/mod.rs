//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Health check
//! GET  /health/ready           - Readiness check (probes the backend)
//!
//! # Products
//! GET  /products               - Catalog listing (filters live in the URL)
//! GET  /products/table         - Inventory table with row-scoped editing
//! POST /products/{id}/subtypes/{index} - Save a subtype edit (requires auth)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (HTMX fragments, requires auth)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add a line (returns result fragment)
//! POST /cart/remove            - Remove a line (returns cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment, no backend call)
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Login action
//! POST /auth/logout            - Logout action
//! GET  /auth/forgot-password   - Forgot password page
//! POST /auth/forgot-password   - Request a reset email
//!
//! # Account (requires auth)
//! GET  /account                - Profile and order history
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/table", get(products::table))
        .route("/{id}/subtypes/{index}", post(products::update_subtype))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).post(auth::forgot_password),
        )
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new().route("/", get(account::index))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product routes
        .nest("/products", product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Account routes
        .nest("/account", account_routes())
        // Auth routes
        .nest("/auth", auth_routes())
}
