//! Product route handlers: catalog browsing, product detail, and the
//! inventory table.
//!
//! Browse state lives in the URL. Filter parameters are parsed from the
//! request query, forwarded to the backend 1:1, and re-serialized into
//! pagination and selection links, so every catalog view is bookmarkable.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, RawQuery, State},
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use roastline_core::{Price, ProductId, SubtypeId};

use crate::api::types::{DEFAULT_PRODUCT_IMAGE, Weight};
use crate::api::{ApiError, Product, ProductFilters, ProductSubtype, Review};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Product card display data for catalog grids.
pub struct ProductCardView {
    pub prod_id: String,
    pub name: String,
    pub category: String,
    pub price: Option<String>,
    pub image: String,
    pub rating: Option<f64>,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        let first = product.product_subtypes.first();
        Self {
            prod_id: product.prod_id.to_string(),
            name: product.name.clone(),
            category: product.product_category.name.clone(),
            price: first.map(|s| s.price.to_string()),
            image: first.map_or_else(
                || DEFAULT_PRODUCT_IMAGE.to_string(),
                |s| s.image_or_default().to_string(),
            ),
            rating: product.average_rating.or_else(|| product.average_rating()),
        }
    }
}

/// One selectable weight option on the detail page.
pub struct WeightOptionView {
    pub name: String,
    pub href: String,
    pub selected: bool,
}

/// One selectable grind option on the detail page.
pub struct GrindOptionView {
    pub name: String,
    pub href: String,
    pub selected: bool,
}

/// The currently selected subtype, resolved for display and for the
/// add-to-cart form.
pub struct SelectedSubtypeView {
    pub subtype_id: String,
    pub weight_name: String,
    pub price_display: String,
    /// Plain decimal amount for the hidden form field.
    pub price_raw: String,
    pub stock: i64,
    pub image: String,
}

/// Product detail display data.
pub struct ProductDetailView {
    pub prod_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub countries: Vec<String>,
    pub process: Option<String>,
    pub farm: Option<String>,
    pub producer: Option<String>,
    pub import_partner: Option<String>,
    pub weights: Vec<WeightOptionView>,
    pub grinds: Vec<GrindOptionView>,
    pub selected: Option<SelectedSubtypeView>,
    /// Grind id for the hidden form field; `None` when the product has no
    /// grind options.
    pub selected_grind: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Vec<Review>,
}

/// Build the detail view, seeding the selection from the URL or falling back
/// to the first available option.
///
/// Products with no subtypes (or no grinds) produce empty option lists and no
/// selection; the template renders an explicit unavailable state instead of
/// an add-to-cart form.
fn build_detail_view(
    product: &Product,
    weight: Option<&str>,
    grind: Option<&str>,
) -> ProductDetailView {
    let selected_subtype = product
        .product_subtypes
        .iter()
        .find(|s| Some(s.weight.id.as_str()) == weight)
        .or_else(|| product.product_subtypes.first());

    let selected_grind = product
        .grind_types
        .iter()
        .find(|g| Some(g.id.as_str()) == grind)
        .or_else(|| product.grind_types.first());

    let weights = product
        .product_subtypes
        .iter()
        .map(|s| WeightOptionView {
            name: s.weight.name.clone(),
            href: selection_href(
                &product.prod_id,
                Some(s.weight.id.as_str()),
                selected_grind.map(|g| g.id.as_str()),
            ),
            selected: selected_subtype.is_some_and(|sel| sel.weight.id == s.weight.id),
        })
        .collect();

    let grinds = product
        .grind_types
        .iter()
        .map(|g| GrindOptionView {
            name: g.name.clone(),
            href: selection_href(
                &product.prod_id,
                selected_subtype.map(|s| s.weight.id.as_str()),
                Some(g.id.as_str()),
            ),
            selected: selected_grind.is_some_and(|sel| sel.id == g.id),
        })
        .collect();

    ProductDetailView {
        prod_id: product.prod_id.to_string(),
        name: product.name.clone(),
        description: product.description.clone(),
        category: product.product_category.name.clone(),
        countries: product.countries_origin.clone(),
        process: product.process.clone(),
        farm: product.farm.clone(),
        producer: product.producer.clone(),
        import_partner: product.import_partner.as_ref().map(|p| p.name.clone()),
        weights,
        grinds,
        selected: selected_subtype.map(|s| SelectedSubtypeView {
            subtype_id: s.weight.id.to_string(),
            weight_name: s.weight.name.clone(),
            price_display: s.price.to_string(),
            price_raw: s.price.amount().to_string(),
            stock: s.stock,
            image: s.image_or_default().to_string(),
        }),
        selected_grind: selected_grind.map(|g| g.id.to_string()),
        rating: product.average_rating(),
        reviews: product.reviews.clone(),
    }
}

/// Detail-page link that changes one selection while preserving the other.
fn selection_href(prod_id: &ProductId, weight: Option<&str>, grind: Option<&str>) -> String {
    let mut qs = url::form_urlencoded::Serializer::new(String::new());
    if let Some(w) = weight {
        qs.append_pair("weight", w);
    }
    if let Some(g) = grind {
        qs.append_pair("grind", g);
    }
    format!("/products/{prod_id}?{}", qs.finish())
}

/// One row of the inventory table (one subtype of one product).
pub struct TableRowView {
    pub prod_id: String,
    pub name: String,
    pub category: String,
    pub subtype_index: usize,
    pub subtype_id: String,
    pub weight_name: String,
    pub price_display: String,
    pub price_raw: String,
    pub stock: i64,
    pub image_url: String,
    pub editing: bool,
    /// Link that opens this row's edit form.
    pub edit_href: String,
    /// Link that closes the edit form without saving.
    pub cancel_href: String,
    /// POST target for the edit form (carries the current filters).
    pub action: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Catalog listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductCardView>,
    pub countries: Vec<String>,
    pub search_id: String,
    pub search_origin: String,
    pub page: u32,
    pub total_pages: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub error: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductDetailView,
}

/// Inventory table template.
#[derive(Template, WebTemplate)]
#[template(path = "products/table.html")]
pub struct ProductsTableTemplate {
    pub rows: Vec<TableRowView>,
    pub search_id: String,
    pub page: u32,
    pub total_pages: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
    pub error: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Query parameters for the detail-page selection.
#[derive(Debug, Deserialize)]
pub struct SelectionQuery {
    pub weight: Option<String>,
    pub grind: Option<String>,
}

/// Display the catalog listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> ProductsIndexTemplate {
    let query_filters = ProductFilters::from_pairs(query_pairs(query.as_deref()));
    let search_id = query_filters.get("id").unwrap_or_default().to_string();
    let search_origin = query_filters.get("origin").unwrap_or_default().to_string();

    let countries = match state.api().get_countries().await {
        Ok(countries) => countries,
        Err(e) => {
            tracing::warn!("Failed to load origin countries: {e}");
            Vec::new()
        }
    };

    match state.api().get_products(&query_filters).await {
        Ok(result) => ProductsIndexTemplate {
            products: result.products.iter().map(ProductCardView::from).collect(),
            countries,
            search_id,
            search_origin,
            page: result.page,
            total_pages: result.total_pages,
            prev_href: (result.page > 1)
                .then(|| catalog_href("/products", &query_filters.with_page(result.page - 1))),
            next_href: (result.page < result.total_pages)
                .then(|| catalog_href("/products", &query_filters.with_page(result.page + 1))),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Failed to load catalog: {e}");
            ProductsIndexTemplate {
                products: Vec::new(),
                countries,
                search_id,
                search_origin,
                page: 1,
                total_pages: 0,
                prev_href: None,
                next_href: None,
                error: Some(user_message(&e)),
            }
        }
    }
}

/// Display a product detail page.
///
/// # Errors
///
/// Returns 404 when the product does not exist and a gateway error when the
/// backend is unreachable.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(prod_id): Path<String>,
    Query(selection): Query<SelectionQuery>,
) -> Result<ProductShowTemplate, AppError> {
    let prod_id = ProductId::new(prod_id);
    let product = match state.api().get_product(&prod_id).await {
        Ok(product) => product,
        Err(ApiError::NotFound(_)) => {
            return Err(AppError::NotFound(format!("product {prod_id}")));
        }
        Err(e) => return Err(e.into()),
    };

    let view = build_detail_view(
        &product,
        selection.weight.as_deref(),
        selection.grind.as_deref(),
    );
    Ok(ProductShowTemplate { product: view })
}

/// Display the inventory table.
///
/// The `edit` query parameter (`"{prod_id}:{index}"`) marks which row is in
/// edit mode; it is stripped before the filters are forwarded to the backend.
#[instrument(skip(state))]
pub async fn table(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> ProductsTableTemplate {
    let mut query_filters = ProductFilters::from_pairs(query_pairs(query.as_deref()));
    let editing = query_filters.take("edit");
    let error = query_filters.take("error");
    let search_id = query_filters.get("id").unwrap_or_default().to_string();

    match state.api().get_products(&query_filters).await {
        Ok(result) => {
            let rows = result
                .products
                .iter()
                .flat_map(|product| {
                    let filters = &query_filters;
                    let editing = editing.as_deref();
                    product
                        .product_subtypes
                        .iter()
                        .enumerate()
                        .map(move |(index, subtype)| {
                            table_row(product, index, subtype, filters, editing)
                        })
                })
                .collect();

            ProductsTableTemplate {
                rows,
                search_id,
                page: result.page,
                total_pages: result.total_pages,
                prev_href: (result.page > 1).then(|| {
                    catalog_href("/products/table", &query_filters.with_page(result.page - 1))
                }),
                next_href: (result.page < result.total_pages).then(|| {
                    catalog_href("/products/table", &query_filters.with_page(result.page + 1))
                }),
                error,
            }
        }
        Err(e) => {
            tracing::warn!("Failed to load inventory table: {e}");
            ProductsTableTemplate {
                rows: Vec::new(),
                search_id,
                page: 1,
                total_pages: 0,
                prev_href: None,
                next_href: None,
                error: Some(user_message(&e)),
            }
        }
    }
}

/// Form data for a subtype edit.
#[derive(Debug, Deserialize)]
pub struct SubtypeEditForm {
    pub subtype_id: String,
    pub weight_name: String,
    pub image_url: String,
    pub price: String,
    pub stock: String,
}

/// Save an inventory edit.
///
/// Redirects back to the table. The row leaves edit mode only when the
/// backend accepted the change; a rejected edit keeps the row open and shows
/// the backend's message.
#[instrument(skip(state, user, form), fields(prod_id = %prod_id, index))]
pub async fn update_subtype(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path((prod_id, index)): Path<(String, usize)>,
    RawQuery(query): RawQuery,
    Form(form): Form<SubtypeEditForm>,
) -> Redirect {
    let mut query_filters = ProductFilters::from_pairs(query_pairs(query.as_deref()));
    query_filters.take("edit");
    query_filters.take("error");
    let edit_key = format!("{prod_id}:{index}");

    let subtype = match parse_subtype_form(&form) {
        Ok(subtype) => subtype,
        Err(message) => {
            query_filters.set("edit", edit_key);
            query_filters.set("error", message);
            return Redirect::to(&catalog_href("/products/table", &query_filters));
        }
    };

    let prod_id = ProductId::new(prod_id);
    match state
        .api()
        .update_product_subtype(&prod_id, index, &subtype, user.token())
        .await
    {
        Ok(()) => Redirect::to(&catalog_href("/products/table", &query_filters)),
        Err(e) => {
            tracing::warn!("Failed to save subtype edit: {e}");
            query_filters.set("edit", edit_key);
            query_filters.set("error", user_message(&e));
            Redirect::to(&catalog_href("/products/table", &query_filters))
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Decode a raw query string into key/value pairs.
fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Build a catalog link for the given filters.
fn catalog_href(base: &str, filters: &ProductFilters) -> String {
    let qs = filters.to_query_string();
    if qs.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{qs}")
    }
}

/// Build one inventory table row.
fn table_row(
    product: &Product,
    index: usize,
    subtype: &ProductSubtype,
    filters: &ProductFilters,
    editing: Option<&str>,
) -> TableRowView {
    let row_key = format!("{}:{index}", product.prod_id);
    let mut edit_filters = filters.clone();
    edit_filters.set("edit", row_key.clone());

    TableRowView {
        prod_id: product.prod_id.to_string(),
        name: product.name.clone(),
        category: product.product_category.name.clone(),
        subtype_index: index,
        subtype_id: subtype.weight.id.to_string(),
        weight_name: subtype.weight.name.clone(),
        price_display: subtype.price.to_string(),
        price_raw: subtype.price.amount().to_string(),
        stock: subtype.stock,
        image_url: subtype.image_url.clone(),
        editing: editing == Some(row_key.as_str()),
        edit_href: catalog_href("/products/table", &edit_filters),
        cancel_href: catalog_href("/products/table", filters),
        action: {
            let qs = filters.to_query_string();
            if qs.is_empty() {
                format!("/products/{}/subtypes/{index}", product.prod_id)
            } else {
                format!("/products/{}/subtypes/{index}?{qs}", product.prod_id)
            }
        },
    }
}

/// Validate edit form input into a subtype document.
fn parse_subtype_form(form: &SubtypeEditForm) -> Result<ProductSubtype, String> {
    let price = form
        .price
        .trim()
        .parse::<Decimal>()
        .map_err(|_| "Price must be a decimal number".to_string())?;
    if price.is_sign_negative() {
        return Err("Price cannot be negative".to_string());
    }
    let stock = form
        .stock
        .trim()
        .parse::<i64>()
        .map_err(|_| "Stock must be a whole number".to_string())?;
    if stock < 0 {
        return Err("Stock cannot be negative".to_string());
    }

    Ok(ProductSubtype {
        weight: Weight {
            id: SubtypeId::new(form.subtype_id.clone()),
            name: form.weight_name.clone(),
        },
        price: Price::new(price),
        stock,
        image_url: form.image_url.clone(),
    })
}

/// Turn an API error into a message fit for the page.
fn user_message(err: &ApiError) -> String {
    match err {
        ApiError::Network(_) | ApiError::Parse(_) => {
            "Cannot reach the store right now. Please try again.".to_string()
        }
        // Backend messages are written for customers; pass them through
        other => other.to_string(),
    }
}
