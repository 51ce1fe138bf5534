//! Server-side cart state synchronized with the backend cart API.
//!
//! The backend owns the cart; [`CartStore`] keeps one in-memory mirror per
//! logged-in user so the header badge and cart page can render without a
//! network round trip. Every mutation goes to the backend first and the
//! mirror is updated only after the backend accepts it, so a failed call
//! leaves the mirror exactly as it was.
//!
//! # Lifecycle
//!
//! - [`CartStore::init`] on login creates an empty mirror bound to the
//!   session's bearer token, then [`CartStore::load_cart`] hydrates it.
//! - [`CartStore::teardown`] on logout discards the mirror.
//!
//! Each `init` stamps the mirror with a fresh epoch. Mutations snapshot the
//! epoch before calling the backend and re-check it before committing, so a
//! response that arrives after logout (or after a re-login) is discarded
//! instead of leaking into the wrong session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use roastline_core::{GrindId, Price, ProductId, Quantity, QuantityError, SubtypeId, UserId};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::api::{ApiClient, ApiError, CartLine};

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The quantity failed local validation. No backend call was made.
    #[error("{0}")]
    InvalidQuantity(#[from] QuantityError),

    /// The user has no active cart session.
    #[error("No active cart session for user {0}")]
    NoSession(UserId),

    /// The session ended while the backend call was in flight; the response
    /// was discarded.
    #[error("Cart session ended before the response arrived")]
    Stale,

    /// The backend call failed. The local mirror is untouched.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// =============================================================================
// CartStore
// =============================================================================

/// Per-user cart mirrors, shared across request handlers.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    api: ApiClient,
    carts: RwLock<HashMap<UserId, CartMirror>>,
    epochs: AtomicU64,
}

/// Local mirror of one user's remote cart.
#[derive(Debug)]
struct CartMirror {
    epoch: u64,
    token: String,
    lines: Vec<CartLine>,
}

impl CartMirror {
    /// Merge a backend-accepted line into the mirror.
    ///
    /// Lines are keyed by the (product, subtype, grind) triple. An existing
    /// line has its quantity incremented (capped at [`Quantity::MAX`]) and
    /// its price refreshed to the backend's latest quote; otherwise the line
    /// is appended.
    fn merge(&mut self, line: CartLine) {
        let existing = self.lines.iter_mut().find(|l| {
            l.product_id == line.product_id
                && l.subtype_identifier == line.subtype_identifier
                && l.grind_type == line.grind_type
        });
        match existing {
            Some(l) => {
                l.quantity = l.quantity.saturating_add(line.quantity);
                l.price = line.price;
            }
            None => self.lines.push(line),
        }
    }
}

impl CartStore {
    /// Create a cart store backed by the given API client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                carts: RwLock::new(HashMap::new()),
                epochs: AtomicU64::new(0),
            }),
        }
    }

    /// Start a cart session for a user, replacing any previous mirror.
    ///
    /// The bearer token is held for the lifetime of the session and sent with
    /// every cart call.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn init(&self, user_id: UserId, token: impl Into<String>) {
        let epoch = self.inner.epochs.fetch_add(1, Ordering::Relaxed) + 1;
        let mut carts = self.inner.carts.write().await;
        carts.insert(
            user_id,
            CartMirror {
                epoch,
                token: token.into(),
                lines: Vec::new(),
            },
        );
        debug!(epoch, "Cart session started");
    }

    /// End a user's cart session and discard the mirror.
    ///
    /// Any backend call still in flight for the old session will fail its
    /// epoch re-check and be discarded.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn teardown(&self, user_id: UserId) {
        let mut carts = self.inner.carts.write().await;
        if carts.remove(&user_id).is_some() {
            debug!("Cart session ended");
        }
    }

    /// Snapshot the session epoch and token before a backend call.
    async fn snapshot(&self, user_id: UserId) -> Result<(u64, String), CartError> {
        let carts = self.inner.carts.read().await;
        carts
            .get(&user_id)
            .map(|m| (m.epoch, m.token.clone()))
            .ok_or(CartError::NoSession(user_id))
    }

    /// Add a line to the user's cart.
    ///
    /// The raw quantity is validated locally first; an out-of-range value is
    /// rejected without touching the backend. On success the backend's
    /// accepted line is merged into the mirror and returned.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for bad input,
    /// [`CartError::NoSession`] when the user is not logged in, and
    /// [`CartError::Api`] when the backend rejects the line (the mirror is
    /// left unchanged).
    #[instrument(skip(self, price), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        subtype_id: SubtypeId,
        grind_id: GrindId,
        quantity: &str,
        price: Price,
    ) -> Result<CartLine, CartError> {
        // Local validation before any backend call
        let quantity = Quantity::parse(quantity)?;

        let (epoch, token) = self.snapshot(user_id).await?;
        let line = CartLine {
            product_id,
            subtype_identifier: subtype_id,
            grind_type: grind_id,
            quantity,
            price,
        };
        let accepted = self.inner.api.add_cart_line(user_id, &line, &token).await?;

        let mut carts = self.inner.carts.write().await;
        let mirror = carts
            .get_mut(&user_id)
            .filter(|m| m.epoch == epoch)
            .ok_or(CartError::Stale)?;
        mirror.merge(accepted.clone());
        Ok(accepted)
    }

    /// Remove every line with the given subtype from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoSession`] when the user is not logged in and
    /// [`CartError::Api`] when the backend call fails (the mirror is left
    /// unchanged).
    #[instrument(skip(self), fields(user_id = %user_id, subtype_id = %subtype_id))]
    pub async fn remove_line(
        &self,
        user_id: UserId,
        subtype_id: &SubtypeId,
    ) -> Result<(), CartError> {
        let (epoch, token) = self.snapshot(user_id).await?;
        self.inner
            .api
            .remove_cart_line(user_id, subtype_id, &token)
            .await?;

        let mut carts = self.inner.carts.write().await;
        let mirror = carts
            .get_mut(&user_id)
            .filter(|m| m.epoch == epoch)
            .ok_or(CartError::Stale)?;
        mirror.lines.retain(|l| l.subtype_identifier != *subtype_id);
        Ok(())
    }

    /// Fetch the user's cart from the backend and replace the mirror with it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoSession`] when the user is not logged in,
    /// [`CartError::Api`] when the fetch fails, and [`CartError::Stale`] when
    /// the session changed while the fetch was in flight.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn load_cart(&self, user_id: UserId) -> Result<Vec<CartLine>, CartError> {
        let (epoch, token) = self.snapshot(user_id).await?;
        let fetched = self.inner.api.get_cart(user_id, &token).await?;

        let mut carts = self.inner.carts.write().await;
        let mirror = carts
            .get_mut(&user_id)
            .filter(|m| m.epoch == epoch)
            .ok_or(CartError::Stale)?;
        mirror.lines = fetched.clone();
        Ok(fetched)
    }

    /// The mirrored cart lines, without a backend call. `None` when the user
    /// has no active session.
    pub async fn lines(&self, user_id: UserId) -> Option<Vec<CartLine>> {
        let carts = self.inner.carts.read().await;
        carts.get(&user_id).map(|m| m.lines.clone())
    }

    /// Total units across all mirrored lines, for the header badge. Zero when
    /// the user has no active session.
    pub async fn item_count(&self, user_id: UserId) -> u32 {
        let carts = self.inner.carts.read().await;
        carts
            .get(&user_id)
            .map(|m| m.lines.iter().map(|l| l.quantity.get()).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    // Nothing listens here; any call that reaches the network fails fast
    // with a connection error.
    fn unreachable_store() -> CartStore {
        CartStore::new(ApiClient::new("http://127.0.0.1:1"))
    }

    fn line(subtype: &str, grind: &str, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new("p1"),
            subtype_identifier: SubtypeId::new(subtype),
            grind_type: GrindId::new(grind),
            quantity: Quantity::new(quantity).unwrap(),
            price: Price::new(Decimal::new(1450, 2)),
        }
    }

    #[tokio::test]
    async fn test_add_line_rejects_invalid_quantity_locally() {
        let store = unreachable_store();
        let user = UserId::new(7);
        store.init(user, "token").await;

        // The backend is unreachable, so these only pass if validation
        // happens before any network call.
        for raw in ["0", "51", "", "lots"] {
            let result = store
                .add_line(
                    user,
                    ProductId::new("p1"),
                    SubtypeId::new("s1"),
                    GrindId::new("g1"),
                    raw,
                    Price::new(Decimal::new(1450, 2)),
                )
                .await;
            assert!(matches!(result, Err(CartError::InvalidQuantity(_))));
        }
        assert_eq!(store.item_count(user).await, 0);
    }

    #[tokio::test]
    async fn test_add_line_requires_session() {
        let store = unreachable_store();
        let result = store
            .add_line(
                UserId::new(7),
                ProductId::new("p1"),
                SubtypeId::new("s1"),
                GrindId::new("g1"),
                "2",
                Price::new(Decimal::new(1450, 2)),
            )
            .await;
        assert!(matches!(result, Err(CartError::NoSession(_))));
    }

    #[tokio::test]
    async fn test_failed_backend_call_leaves_mirror_unchanged() {
        let store = unreachable_store();
        let user = UserId::new(7);
        store.init(user, "token").await;

        let result = store
            .add_line(
                user,
                ProductId::new("p1"),
                SubtypeId::new("s1"),
                GrindId::new("g1"),
                "2",
                Price::new(Decimal::new(1450, 2)),
            )
            .await;
        assert!(matches!(result, Err(CartError::Api(ApiError::Network(_)))));
        assert_eq!(store.item_count(user).await, 0);
        assert_eq!(store.lines(user).await.unwrap(), vec![]);
    }

    #[tokio::test]
    async fn test_teardown_discards_mirror() {
        let store = unreachable_store();
        let user = UserId::new(7);
        store.init(user, "token").await;
        assert!(store.lines(user).await.is_some());

        store.teardown(user).await;
        assert!(store.lines(user).await.is_none());
        assert_eq!(store.item_count(user).await, 0);
    }

    #[tokio::test]
    async fn test_init_replaces_previous_mirror() {
        let store = unreachable_store();
        let user = UserId::new(7);
        store.init(user, "old-token").await;
        {
            let mut carts = store.inner.carts.write().await;
            carts.get_mut(&user).unwrap().lines.push(line("s1", "g1", 3));
        }
        assert_eq!(store.item_count(user).await, 3);

        store.init(user, "new-token").await;
        assert_eq!(store.item_count(user).await, 0);
    }

    #[test]
    fn test_merge_increments_matching_line() {
        let mut mirror = CartMirror {
            epoch: 1,
            token: "token".to_string(),
            lines: vec![line("s1", "g1", 2)],
        };
        mirror.merge(line("s1", "g1", 3));
        assert_eq!(mirror.lines.len(), 1);
        assert_eq!(mirror.lines[0].quantity.get(), 5);
    }

    #[test]
    fn test_merge_caps_at_max_quantity() {
        let mut mirror = CartMirror {
            epoch: 1,
            token: "token".to_string(),
            lines: vec![line("s1", "g1", 49)],
        };
        mirror.merge(line("s1", "g1", 30));
        assert_eq!(mirror.lines[0].quantity.get(), Quantity::MAX);
    }

    #[test]
    fn test_merge_keeps_distinct_grinds_separate() {
        let mut mirror = CartMirror {
            epoch: 1,
            token: "token".to_string(),
            lines: vec![line("s1", "g1", 2)],
        };
        mirror.merge(line("s1", "g2", 1));
        assert_eq!(mirror.lines.len(), 2);
    }
}
