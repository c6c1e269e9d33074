//! Product route handlers.
//!
//! All product data comes from the Storefront API client, which caches
//! reads; handlers stay thin and return domain types as JSON.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::Result;
use crate::shopify::types::{Image, ProductPage};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    /// Page size (default 20, capped at 100).
    pub first: Option<i64>,
    /// Opaque pagination cursor from a previous page.
    pub after: Option<String>,
    /// Optional Shopify search query (e.g. `tag:colorgroup:linen-tee`).
    pub q: Option<String>,
}

/// Feature list response.
#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub features: Vec<String>,
}

/// Media response: gallery images plus an optional product video.
#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub images: Vec<Image>,
    pub video_url: Option<String>,
}

/// Summary of a color-group sibling.
#[derive(Debug, Serialize)]
pub struct RelatedProduct {
    pub handle: String,
    pub title: String,
    /// Display color name from the product's `color` metafield.
    pub color: Option<String>,
    pub image: Option<Image>,
    pub available_for_sale: bool,
}

/// List products.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<ProductPage>> {
    let first = query.first.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = state
        .storefront()
        .fetch_all_products(first, query.after, query.q)
        .await?;
    Ok(Json(page))
}

/// Product detail with metafields.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<crate::shopify::types::Product>> {
    let product = state.storefront().get_product_by_handle(&handle).await?;
    Ok(Json(product))
}

/// Feature list from the product's `features` metafield.
///
/// The metafield holds either a JSON string array or a newline-separated
/// list; both parse to the same response. A product without the metafield
/// has an empty feature list, not an error.
#[instrument(skip(state))]
pub async fn features(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<FeaturesResponse>> {
    let product = state.storefront().get_product_by_handle(&handle).await?;
    let namespace = &state.config().shopify.metafield_namespace;

    let features = product
        .metafield(namespace, "features")
        .map(parse_features)
        .unwrap_or_default();

    Ok(Json(FeaturesResponse { features }))
}

/// Gallery images plus the `video_url` metafield, when set.
#[instrument(skip(state))]
pub async fn media(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<MediaResponse>> {
    let product = state.storefront().get_product_by_handle(&handle).await?;
    let namespace = &state.config().shopify.metafield_namespace;

    let video_url = product
        .metafield(namespace, "video_url")
        .map(String::from);

    Ok(Json(MediaResponse {
        images: product.images,
        video_url,
    }))
}

/// Color-group siblings of a product.
#[instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<Vec<RelatedProduct>>> {
    let siblings = state.storefront().get_related_products(&handle).await?;
    let namespace = state.config().shopify.metafield_namespace.clone();

    // The listing query carries no metafields; the per-handle product fetch
    // does, and is cached, so resolving colors stays cheap.
    let mut related = Vec::with_capacity(siblings.len());
    for sibling in siblings {
        let color = match state
            .storefront()
            .get_product_by_handle(&sibling.handle)
            .await
        {
            Ok(full) => full.metafield(&namespace, "color").map(String::from),
            Err(e) => {
                tracing::warn!(handle = %sibling.handle, error = %e, "Failed to resolve sibling color");
                None
            }
        };
        related.push(RelatedProduct {
            handle: sibling.handle,
            title: sibling.title,
            color,
            image: sibling.featured_image,
            available_for_sale: sibling.available_for_sale,
        });
    }

    Ok(Json(related))
}

/// Parse a `features` metafield value.
fn parse_features(raw: &str) -> Vec<String> {
    // Shopify list metafields serialize as a JSON string array
    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return list
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_features_json_array() {
        let parsed = parse_features(r#"["100% cotton", "Pre-shrunk", "Ribbed collar"]"#);
        assert_eq!(parsed, vec!["100% cotton", "Pre-shrunk", "Ribbed collar"]);
    }

    #[test]
    fn test_parse_features_newline_list() {
        let parsed = parse_features("100% cotton\n\nPre-shrunk\n  Ribbed collar  \n");
        assert_eq!(parsed, vec!["100% cotton", "Pre-shrunk", "Ribbed collar"]);
    }

    #[test]
    fn test_parse_features_empty() {
        assert!(parse_features("").is_empty());
        assert!(parse_features("[]").is_empty());
    }
}
