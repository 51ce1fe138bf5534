//! REST client implementation for the commerce backend.
//!
//! Plain JSON over `reqwest` 0.13. Catalog reads are cached with `moka`
//! (5-minute TTL); cart, order, and user reads always hit the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use roastline_core::{ProductId, SubtypeId, UserId};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::api::ApiError;
use crate::api::cache::CacheValue;
use crate::api::types::{
    AddToCartRequest, CartLine, CartProductBody, ForgotPasswordRequest, LoginRequest,
    LoginResponse, Product, ProductFilters, ProductPage, ProductSubtype, UserDetail,
};

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the commerce backend REST API.
///
/// Cheap to clone; all clones share one connection pool and one cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new backend API client.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
                cache,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Send a request and decode the JSON response.
    ///
    /// Transport failures surface as [`ApiError::Network`]. Non-success
    /// statuses become [`ApiError::Server`] carrying the backend's own
    /// `message` so views can display it verbatim; 404 becomes
    /// [`ApiError::NotFound`].
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(error_message(&response_text)));
        }

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Backend API returned non-success status"
            );
            return Err(ApiError::Server {
                status,
                message: error_message(&response_text),
            });
        }

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse backend API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get a product by its public id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the request fails.
    #[instrument(skip(self), fields(prod_id = %prod_id))]
    pub async fn get_product(&self, prod_id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{prod_id}");

        // Check cache
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let request = self
            .inner
            .client
            .get(self.endpoint(&format!("/product/{prod_id}")));
        let product: Product = self.execute(request).await?;

        // Cache the result
        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a page of products matching the given filters.
    ///
    /// Filter pairs are forwarded to the backend unchanged. Only the
    /// unfiltered first page is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, filters: &ProductFilters) -> Result<ProductPage, ApiError> {
        let cache_key = format!("products:{}", filters.to_query_string());

        // Check cache (only for the default, unfiltered page)
        if filters.is_default()
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let request = self
            .inner
            .client
            .get(self.endpoint("/products"))
            .query(&filters.as_pairs());
        let page: ProductPage = self.execute(request).await?;

        if filters.is_default() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get the list of origin countries used by catalog filters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_countries(&self) -> Result<Vec<String>, ApiError> {
        let cache_key = "countries".to_string();

        if let Some(CacheValue::Countries(countries)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for countries");
            return Ok(countries);
        }

        let request = self.inner.client.get(self.endpoint("/countries"));
        let countries: Vec<String> = self.execute(request).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Countries(countries.clone()))
            .await;

        Ok(countries)
    }

    /// Update one subtype of a product (inventory edits from the table view).
    ///
    /// Drops all cached catalog entries on success so the next read reflects
    /// the edit.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the edit.
    #[instrument(skip(self, subtype, token), fields(prod_id = %prod_id, index))]
    pub async fn update_product_subtype(
        &self,
        prod_id: &ProductId,
        index: usize,
        subtype: &ProductSubtype,
        token: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .inner
            .client
            .put(self.endpoint(&format!("/product/{prod_id}/subtypes/{index}")))
            .bearer_auth(token)
            .json(subtype);
        let _: serde_json::Value = self.execute(request).await?;

        // Catalog changed; drop cached products and pages
        self.inner.cache.invalidate_all();

        Ok(())
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Add a line to the user's remote cart. Returns the line as the backend
    /// accepted it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the line.
    #[instrument(skip(self, line, token), fields(user_id = %user_id))]
    pub async fn add_cart_line(
        &self,
        user_id: UserId,
        line: &CartLine,
        token: &str,
    ) -> Result<CartLine, ApiError> {
        let body = AddToCartRequest {
            user_id,
            product: CartProductBody {
                id: &line.product_id,
                subtype_identifier: &line.subtype_identifier,
                grind_type: &line.grind_type,
                quantity: line.quantity,
                price: line.price,
            },
        };

        let request = self
            .inner
            .client
            .post(self.endpoint("/cart"))
            .bearer_auth(token)
            .json(&body);
        self.execute(request).await
    }

    /// Fetch the user's full remote cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: UserId, token: &str) -> Result<Vec<CartLine>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint(&format!("/cart/{user_id}")))
            .bearer_auth(token);
        self.execute(request).await
    }

    /// Remove every cart line with the given subtype from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id, subtype_id = %subtype_id))]
    pub async fn remove_cart_line(
        &self,
        user_id: UserId,
        subtype_id: &SubtypeId,
        token: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .inner
            .client
            .delete(self.endpoint(&format!("/cart/{user_id}/{subtype_id}")))
            .bearer_auth(token);
        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    // =========================================================================
    // Auth and Account Methods
    // =========================================================================

    /// Exchange credentials for a session identity and bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Server`] with the backend's message when the
    /// credentials are rejected.
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest { username, password };
        let request = self
            .inner
            .client
            .post(self.endpoint("/auth/login"))
            .json(&body);
        self.execute(request).await
    }

    /// Request a password reset email.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, email))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        let body = ForgotPasswordRequest { email };
        let request = self
            .inner
            .client
            .post(self.endpoint("/forgot-password"))
            .json(&body);
        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    /// Fetch the user's profile details.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: UserId, token: &str) -> Result<UserDetail, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint(&format!("/user/{user_id}")))
            .bearer_auth(token);
        self.execute(request).await
    }

    /// Fetch the user's past purchase orders.
    ///
    /// Orders are opaque to the storefront and kept as raw JSON documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn get_orders(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.endpoint(&format!("/orders/{user_id}")))
            .bearer_auth(token);
        self.execute(request).await
    }
}

/// Extract a display message from an error response body.
///
/// The backend sends `{"message": "..."}` on failures; when the body is not
/// that shape, a truncated copy of the raw body is used instead.
fn error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map_or_else(|_| body.chars().take(200).collect(), |b| b.message)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = ApiClient::new("http://localhost:5000/");
        assert_eq!(
            client.endpoint("/product/p1"),
            "http://localhost:5000/product/p1"
        );
    }

    #[test]
    fn test_error_message_prefers_json_message_field() {
        assert_eq!(
            error_message(r#"{"message": "out of stock"}"#),
            "out of stock"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_error_message_truncates_long_bodies() {
        let long = "x".repeat(500);
        assert_eq!(error_message(&long).len(), 200);
    }
}
