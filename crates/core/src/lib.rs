//! Roastline Core - Shared types library.
//!
//! This crate provides common types used across all Roastline components:
//! - `storefront` - Public-facing coffee storefront
//! - `cli` - Command-line operator tools
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. Everything
//! that talks to the backend commerce API lives in the storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, quantities, and prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
