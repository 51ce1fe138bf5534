//! Account route handlers.
//!
//! The profile page shows the backend's user document and the user's past
//! orders. Orders are opaque to the storefront and rendered as-is.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::api::{ApiError, UserDetail};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct AccountTemplate {
    pub username: String,
    pub detail: Option<UserDetail>,
    /// Pretty-printed order documents, newest first as the backend sends them.
    pub orders: Vec<String>,
    pub error: Option<String>,
}

/// Display the profile and order history.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn index(State(state): State<AppState>, user: RequireAuth) -> AccountTemplate {
    let RequireAuth(user) = user;

    let (detail, orders) = tokio::join!(
        state.api().get_user(user.id, user.token()),
        state.api().get_orders(user.id, user.token()),
    );

    let mut error = None;
    let detail = match detail {
        Ok(detail) => Some(detail),
        Err(e) => {
            tracing::warn!("Failed to load user profile: {e}");
            error = Some(profile_error(&e));
            None
        }
    };
    let orders = match orders {
        Ok(orders) => orders
            .iter()
            .map(|o| serde_json::to_string_pretty(o).unwrap_or_else(|_| o.to_string()))
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to load order history: {e}");
            if error.is_none() {
                error = Some(profile_error(&e));
            }
            Vec::new()
        }
    };

    AccountTemplate {
        username: user.username,
        detail,
        orders,
        error,
    }
}

fn profile_error(err: &ApiError) -> String {
    match err {
        ApiError::Network(_) | ApiError::Parse(_) => {
            "Cannot reach the store right now. Please try again.".to_string()
        }
        other => other.to_string(),
    }
}
