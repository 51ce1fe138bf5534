//! Catalog inspection commands.

use tracing::info;

use roastline_core::ProductId;
use roastline_storefront::api::{ApiClient, ProductFilters};
use roastline_storefront::config::StorefrontConfig;

fn api_from_env() -> Result<ApiClient, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = StorefrontConfig::from_env()?;
    Ok(ApiClient::new(&config.backend_api_url))
}

/// List a page of the catalog.
///
/// # Errors
///
/// Returns an error if the backend request fails.
pub async fn list(page: u32, id: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let api = api_from_env()?;

    let mut filters = ProductFilters::default();
    filters.set("page", page.to_string());
    if let Some(id) = id {
        filters.set("id", id);
    }

    let result = api.get_products(&filters).await?;
    info!(
        page = result.page,
        total_pages = result.total_pages,
        products = result.products.len(),
        "Fetched catalog page"
    );

    for product in &result.products {
        let price = product
            .product_subtypes
            .first()
            .map_or_else(|| "-".to_string(), |s| s.price.to_string());
        info!(
            prod_id = %product.prod_id,
            name = %product.name,
            category = %product.product_category.name,
            subtypes = product.product_subtypes.len(),
            first_price = %price,
            "product"
        );
    }

    Ok(())
}

/// Show one product document as pretty JSON.
///
/// # Errors
///
/// Returns an error if the backend request fails or the product is unknown.
pub async fn show(prod_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let api = api_from_env()?;

    let product = api.get_product(&ProductId::new(prod_id)).await?;
    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&product)?);
    }

    Ok(())
}
