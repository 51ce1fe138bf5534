//! Verify configuration and backend connectivity.

use tracing::info;

use roastline_storefront::api::{ApiClient, ProductFilters};
use roastline_storefront::config::StorefrontConfig;

/// Load the configuration and probe the backend API.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the backend does not
/// answer.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = StorefrontConfig::from_env()?;
    info!(backend = %config.backend_api_url, "Configuration loaded");

    let api = ApiClient::new(&config.backend_api_url);

    let countries = api.get_countries().await?;
    info!(countries = countries.len(), "Countries endpoint reachable");

    let page = api.get_products(&ProductFilters::default()).await?;
    info!(
        products = page.products.len(),
        total_pages = page.total_pages,
        "Catalog endpoint reachable"
    );

    info!("Backend API looks healthy");
    Ok(())
}
