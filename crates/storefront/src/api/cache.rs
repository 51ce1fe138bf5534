//! Cache types for backend catalog responses.
//!
//! Only read-only catalog data is cached. Carts, orders, and user profiles
//! are always fetched live.

use crate::api::types::{Product, ProductPage};

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductPage),
    Countries(Vec<String>),
}
