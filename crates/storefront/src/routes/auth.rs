//! Authentication route handlers.
//!
//! Login delegates credential checking to the backend: a successful
//! `POST /auth/login` returns the user's id, username, and a bearer token,
//! which become the session identity. Login also starts the user's cart
//! session and hydrates it; logout tears it down.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::ApiError;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub username: String,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub message: Option<String>,
    pub error: Option<String>,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Display the login page.
#[instrument(skip(user))]
pub async fn login_page(user: OptionalAuth) -> Response {
    let OptionalAuth(user) = user;
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }
    LoginTemplate {
        username: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle a login attempt.
///
/// On success: store the identity in the session, start the cart session,
/// and hydrate the cart mirror from the backend. A rejected login re-renders
/// the form with the backend's message.
///
/// # Errors
///
/// Returns an error only when the session itself cannot be written.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let response = match state.api().login(&form.username, &form.password).await {
        Ok(login) => login,
        Err(ApiError::Server { message, .. }) => {
            return Ok(LoginTemplate {
                username: form.username,
                error: Some(message),
            }
            .into_response());
        }
        Err(e) => {
            tracing::warn!("Login request failed: {e}");
            return Ok(LoginTemplate {
                username: form.username,
                error: Some("Cannot reach the store right now. Please try again.".to_string()),
            }
            .into_response());
        }
    };

    let user = CurrentUser::new(response.id, response.username, response.access_token);
    set_current_user(&session, &user).await?;
    set_sentry_user(&user.id, Some(&user.username));

    state.cart().init(user.id, user.token()).await;
    if let Err(e) = state.cart().load_cart(user.id).await {
        // The cart page retries; login still succeeds
        tracing::warn!("Failed to hydrate cart after login: {e}");
    }

    Ok(Redirect::to("/account").into_response())
}

/// Handle logout.
///
/// # Errors
///
/// Returns an error if the session cannot be cleared.
#[instrument(skip(state, session, user))]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    user: OptionalAuth,
) -> Result<Redirect, AppError> {
    let OptionalAuth(user) = user;
    if let Some(user) = user {
        state.cart().teardown(user.id).await;
    }
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();

    Ok(Redirect::to("/"))
}

/// Display the forgot password page.
#[instrument]
pub async fn forgot_password_page() -> ForgotPasswordTemplate {
    ForgotPasswordTemplate {
        message: None,
        error: None,
    }
}

/// Request a password reset email.
///
/// Always answers with the same confirmation so the form cannot be used to
/// probe which addresses have accounts.
#[instrument(skip(state, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> ForgotPasswordTemplate {
    match state.api().forgot_password(form.email.trim()).await {
        Ok(()) | Err(ApiError::Server { .. } | ApiError::NotFound(_)) => ForgotPasswordTemplate {
            message: Some(
                "If an account exists for that address, a reset link is on its way.".to_string(),
            ),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Forgot password request failed: {e}");
            ForgotPasswordTemplate {
                message: None,
                error: Some("Cannot reach the store right now. Please try again.".to_string()),
            }
        }
    }
}
