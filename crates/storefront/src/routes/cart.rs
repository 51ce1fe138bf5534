//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! All cart state lives in [`CartStore`]; the session only identifies the
//! user. The count badge reads the local mirror, so it never costs a backend
//! call.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use roastline_core::{GrindId, Price, ProductId, SubtypeId};

use crate::api::{ApiError, CartLine};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::CartError;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_name: String,
    pub weight_name: String,
    pub grind_name: String,
    pub subtype_id: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            item_count: 0,
        }
    }
}

/// Resolve cart lines into display rows.
///
/// Product and option names come from the (cached) catalog; when a lookup
/// fails the raw identifiers are shown instead of failing the whole page.
async fn build_cart_view(state: &AppState, lines: &[CartLine]) -> CartView {
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let product = state.api().get_product(&line.product_id).await.ok();

        let product_name = product
            .as_ref()
            .map_or_else(|| line.product_id.to_string(), |p| p.name.clone());
        let weight_name = product
            .as_ref()
            .and_then(|p| {
                p.product_subtypes
                    .iter()
                    .find(|s| s.weight.id == line.subtype_identifier)
                    .map(|s| s.weight.name.clone())
            })
            .unwrap_or_else(|| line.subtype_identifier.to_string());
        let grind_name = product
            .as_ref()
            .and_then(|p| {
                p.grind_types
                    .iter()
                    .find(|g| g.id == line.grind_type)
                    .map(|g| g.name.clone())
            })
            .unwrap_or_else(|| line.grind_type.to_string());

        items.push(CartItemView {
            product_name,
            weight_name,
            grind_name,
            subtype_id: line.subtype_identifier.to_string(),
            quantity: line.quantity.get(),
            price: line.price.to_string(),
            line_total: line.price.times(line.quantity.get()).to_string(),
        });
    }

    CartView {
        item_count: lines.iter().map(|l| l.quantity.get()).sum(),
        items,
    }
}

// =============================================================================
// Forms and Templates
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub subtype_id: String,
    pub grind_id: String,
    pub quantity: String,
    pub price: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub subtype_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub error: Option<String>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Add-to-cart result fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/add_result.html")]
pub struct AddResultTemplate {
    pub message: String,
    pub ok: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page, refreshed from the backend.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn show(
    State(state): State<AppState>,
    user: RequireAuth,
) -> CartShowTemplate {
    let RequireAuth(user) = user;
    match state.cart().load_cart(user.id).await {
        Ok(lines) => CartShowTemplate {
            cart: build_cart_view(&state, &lines).await,
            error: None,
        },
        Err(e) => {
            tracing::warn!("Failed to load cart: {e}");
            // Fall back to the mirror so a backend blip doesn't blank the page
            let lines = state.cart().lines(user.id).await.unwrap_or_default();
            CartShowTemplate {
                cart: build_cart_view(&state, &lines).await,
                error: Some(display_error(&e)),
            }
        }
    }
}

/// Add an item to the cart (HTMX).
///
/// Returns a result fragment; on success an `HX-Trigger` header tells the
/// header badge to refresh.
#[instrument(skip(state, user, form), fields(user_id = %user.0.id))]
pub async fn add(
    State(state): State<AppState>,
    user: RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let RequireAuth(user) = user;
    let Ok(price) = form.price.trim().parse::<Decimal>() else {
        return (
            StatusCode::BAD_REQUEST,
            AddResultTemplate {
                message: "Invalid price".to_string(),
                ok: false,
            },
        )
            .into_response();
    };

    let result = state
        .cart()
        .add_line(
            user.id,
            ProductId::new(form.product_id),
            SubtypeId::new(form.subtype_id),
            GrindId::new(form.grind_id),
            &form.quantity,
            Price::new(price),
        )
        .await;

    match result {
        Ok(_) => (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            AddResultTemplate {
                message: "Added to cart".to_string(),
                ok: true,
            },
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Failed to add item to cart: {e}");
            (
                error_status(&e),
                AddResultTemplate {
                    message: display_error(&e),
                    ok: false,
                },
            )
                .into_response()
        }
    }
}

/// Remove an item from the cart (HTMX).
#[instrument(skip(state, user, form), fields(user_id = %user.0.id))]
pub async fn remove(
    State(state): State<AppState>,
    user: RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let RequireAuth(user) = user;
    let subtype_id = SubtypeId::new(form.subtype_id);

    let error = match state.cart().remove_line(user.id, &subtype_id).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Failed to remove item from cart: {e}");
            Some(display_error(&e))
        }
    };

    let lines = state.cart().lines(user.id).await.unwrap_or_default();
    let cart = build_cart_view(&state, &lines).await;
    (
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate { cart, error },
    )
        .into_response()
}

/// Get the cart count badge (HTMX). Reads the local mirror; no backend call.
#[instrument(skip(state, user))]
pub async fn count(State(state): State<AppState>, user: OptionalAuth) -> CartCountTemplate {
    let OptionalAuth(user) = user;
    let count = match user {
        Some(user) => state.cart().item_count(user.id).await,
        None => 0,
    };

    CartCountTemplate { count }
}

// =============================================================================
// Helpers
// =============================================================================

/// Turn a cart error into a message fit for the page.
fn display_error(err: &CartError) -> String {
    match err {
        CartError::Api(ApiError::Network(_) | ApiError::Parse(_)) => {
            "Cannot reach the store right now. Please try again.".to_string()
        }
        // Validation and backend messages are written for customers
        other => other.to_string(),
    }
}

/// HTTP status for a failed cart mutation.
fn error_status(err: &CartError) -> StatusCode {
    match err {
        CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
        CartError::NoSession(_) | CartError::Stale => StatusCode::UNAUTHORIZED,
        CartError::Api(api) => match api {
            ApiError::Server { status, .. } => *status,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Network(_) | ApiError::Parse(_) => StatusCode::BAD_GATEWAY,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roastline_core::QuantityError;

    #[test]
    fn test_display_error_passes_backend_message_through() {
        let err = CartError::Api(ApiError::Server {
            status: StatusCode::CONFLICT,
            message: "out of stock".to_string(),
        });
        assert_eq!(display_error(&err), "out of stock");
    }

    #[test]
    fn test_display_error_masks_transport_details() {
        let err = CartError::Api(ApiError::Parse(serde::de::Error::custom("boom")));
        assert_eq!(
            display_error(&err),
            "Cannot reach the store right now. Please try again."
        );
    }

    #[test]
    fn test_display_error_validation_message() {
        let err = CartError::InvalidQuantity(QuantityError::TooLarge { max: 50 });
        assert_eq!(display_error(&err), "Quantity must be at most 50");
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&CartError::InvalidQuantity(QuantityError::Zero)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&CartError::Api(ApiError::Server {
                status: StatusCode::CONFLICT,
                message: String::new(),
            })),
            StatusCode::CONFLICT
        );
    }
}
