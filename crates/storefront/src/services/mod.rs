//! Business logic built on top of the backend API client.

pub mod cart;

pub use cart::{CartError, CartStore};
