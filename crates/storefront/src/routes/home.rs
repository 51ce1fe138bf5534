//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::api::ProductFilters;
use crate::filters;
use crate::routes::products::ProductCardView;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub featured: Vec<ProductCardView>,
    pub error: Option<String>,
}

/// Display the home page with the first page of the catalog.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> HomeTemplate {
    match state.api().get_products(&ProductFilters::default()).await {
        Ok(page) => HomeTemplate {
            featured: page.products.iter().map(ProductCardView::from).collect(),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Failed to load featured products: {e}");
            HomeTemplate {
                featured: Vec::new(),
                error: Some("The catalog is unavailable right now.".to_string()),
            }
        }
    }
}
