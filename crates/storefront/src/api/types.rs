//! Wire types for the backend commerce API.
//!
//! Field names mirror the backend's JSON exactly: catalog documents use
//! snake_case with Mongo-style `_id` keys, while the cart and auth endpoints
//! use camelCase. Collections the backend may omit deserialize with
//! `#[serde(default)]` so a sparse document never fails to parse.

use std::collections::BTreeMap;

use roastline_core::{GrindId, Price, ProductId, Quantity, SubtypeId, UserId};
use serde::{Deserialize, Serialize};

/// Path of the placeholder shown when a subtype has no image.
pub const DEFAULT_PRODUCT_IMAGE: &str = "/static/img/default-product.svg";

/// Sentinel the backend stores when a subtype has no image.
const NO_IMAGE_SENTINEL: &str = "#";

// =============================================================================
// Catalog
// =============================================================================

/// A named category reference embedded in a product document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRef {
    pub name: String,
}

/// The weight option that identifies a purchasable subtype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weight {
    #[serde(rename = "_id")]
    pub id: SubtypeId,
    pub name: String,
}

/// A grind option (e.g. whole bean, espresso).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grind {
    #[serde(rename = "_id")]
    pub id: GrindId,
    pub name: String,
}

/// A customer review. Ratings arrive as strings and are not guaranteed to
/// parse as numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub rating: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A purchasable variant of a product: one weight at one price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSubtype {
    pub weight: Weight,
    pub price: Price,
    pub stock: i64,
    pub image_url: String,
}

impl ProductSubtype {
    /// The image to display for this subtype.
    ///
    /// The backend stores `"#"` when a subtype has no image; that sentinel
    /// (and an empty string) resolve to the default placeholder.
    #[must_use]
    pub fn image_or_default(&self) -> &str {
        let url = self.image_url.trim();
        if url.is_empty() || url == NO_IMAGE_SENTINEL {
            DEFAULT_PRODUCT_IMAGE
        } else {
            url
        }
    }
}

/// A catalog product document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Internal record id; routing uses `prod_id`.
    #[serde(rename = "_id", default)]
    pub record_id: String,
    pub prod_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub product_category: CategoryRef,
    #[serde(default)]
    pub product_subtypes: Vec<ProductSubtype>,
    #[serde(default)]
    pub grind_types: Vec<Grind>,
    #[serde(default)]
    pub countries_origin: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub farm: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub import_partner: Option<CategoryRef>,
    /// Precomputed average rating on list responses; detail pages compute
    /// their own via [`Self::average_rating`].
    #[serde(default)]
    pub average_rating: Option<f64>,
}

impl Product {
    /// Average of the reviews whose ratings parse as numbers.
    ///
    /// Returns `None` when no review carries a parseable rating, so templates
    /// can render an explicit "no ratings yet" state instead of `NaN`.
    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        let ratings: Vec<f64> = self
            .reviews
            .iter()
            .filter_map(|r| r.rating.trim().parse::<f64>().ok())
            .collect();
        if ratings.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)] // Review counts will never exceed f64 precision
        Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    pub page: u32,
}

// =============================================================================
// Catalog filters
// =============================================================================

/// Catalog filter parameters, mirrored 1:1 from the storefront URL to the
/// backend query string.
///
/// The URL is the single source of truth for the browse state: filters are
/// parsed from the request query, forwarded unchanged, and re-serialized into
/// pagination links. Keys are kept sorted so equivalent filter sets produce
/// identical query strings (and identical cache keys).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    params: BTreeMap<String, String>,
}

impl ProductFilters {
    /// Build filters from decoded query pairs. Empty values are dropped.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let params = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        Self { params }
    }

    /// Get a filter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Remove and return a filter value.
    pub fn take(&mut self, key: &str) -> Option<String> {
        self.params.remove(key)
    }

    /// Set a filter value. An empty value removes the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.params.remove(&key);
        } else {
            self.params.insert(key, value);
        }
    }

    /// The requested page, defaulting to 1.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.get("page").and_then(|p| p.parse().ok()).unwrap_or(1)
    }

    /// A copy of these filters pointing at another page.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        let mut params = self.params.clone();
        if page <= 1 {
            params.remove("page");
        } else {
            params.insert("page".to_string(), page.to_string());
        }
        Self { params }
    }

    /// True when no filter is set and the first page is requested.
    ///
    /// Only default pages are cached; filtered or paginated results always
    /// go to the backend.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.params.keys().all(|k| k == "page") && self.page() == 1
    }

    /// Key/value pairs in stable order, for `reqwest`'s query builder.
    #[must_use]
    pub fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Percent-encoded query string for building storefront links.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.params {
            serializer.append_pair(k, v);
        }
        serializer.finish()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A cart line as the backend reports it.
///
/// A line is keyed by the (product, subtype, grind) triple; `price` is the
/// backend-quoted unit price captured when the line was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub subtype_identifier: SubtypeId,
    pub grind_type: GrindId,
    pub quantity: Quantity,
    pub price: Price,
}

/// Body of `POST /cart`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest<'a> {
    pub user_id: UserId,
    pub product: CartProductBody<'a>,
}

/// The `product` object inside [`AddToCartRequest`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProductBody<'a> {
    pub id: &'a ProductId,
    pub subtype_identifier: &'a SubtypeId,
    pub grind_type: &'a GrindId,
    pub quantity: Quantity,
    pub price: Price,
}

// =============================================================================
// Auth and account
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Successful login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub id: UserId,
    pub username: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

/// Body of `POST /forgot-password`.
#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

/// Profile details for the account page. Everything beyond the username is
/// optional; the backend omits fields a user never filled in.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDetail {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub logo_image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
