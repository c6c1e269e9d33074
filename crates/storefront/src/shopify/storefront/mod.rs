//! Shopify Storefront API client implementation.
//!
//! Hand-written GraphQL documents (see [`queries`]) executed over `reqwest`,
//! with typed response structs in [`response`]. Product reads are cached
//! using `moka` (5-minute TTL); checkout mutations are never cached.

mod cache;
pub mod queries;
pub mod response;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

use loomline_core::{CheckoutId, LineId};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{
    Checkout, CheckoutLineInput, CheckoutLineUpdate, Product, ProductPage,
};
use crate::shopify::{GraphQLError, ShopifyError};

use cache::CacheValue;
use response::{
    CartCreateData, CartLinesAddData, CartLinesRemoveData, CartLinesUpdateData,
    CartMutationPayload, Envelope, GetCheckoutData, MetafieldsData, ProductByHandleData,
    ProductsData,
};

/// Metafield keys fetched by the secondary product query. All live in the
/// configured namespace; the Storefront API resolves metafields only by
/// explicit identifier.
const METAFIELD_KEYS: &[&str] = &["features", "color", "video_url"];

/// Structured tag prefix grouping color variants of the same garment.
/// Products carrying the same `colorgroup:<id>` tag are color siblings.
const COLOR_GROUP_TAG_PREFIX: &str = "colorgroup:";

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Provides typed access to products, metafields, and checkout session
/// operations. Products and related-product lookups are cached for 5 minutes.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    metafield_namespace: String,
    cache: Cache<String, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let endpoint = format!(
            "https://{}/api/{}/graphql.json",
            config.store, config.api_version
        );
        Self::with_endpoint(
            endpoint,
            config.storefront_private_token.expose_secret(),
            &config.metafield_namespace,
        )
    }

    /// Create a client against an explicit endpoint URL.
    ///
    /// Used by tests to point the client at a local mock server.
    #[must_use]
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        access_token: &str,
        metafield_namespace: &str,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint: endpoint.into(),
                access_token: access_token.to_string(),
                metafield_namespace: metafield_namespace.to_string(),
                cache,
            }),
        }
    }

    /// Execute a GraphQL document.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: String,
        variables: serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let request_body = json!({ "query": query, "variables": variables });

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            // See: https://shopify.dev/docs/storefronts/headless/building-with-the-storefront-api/getting-started
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ))]));
        }

        let envelope: Envelope<T> = match serde_json::from_str(&response_text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            debug!(count = errors.len(), "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        path: e.path,
                    })
                    .collect(),
            ));
        }

        envelope.data.ok_or_else(|| {
            tracing::error!(
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by its handle, metafields included.
    ///
    /// The metafield map comes from a secondary query; if that query fails
    /// the product is still returned with whatever metafields resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(&self, handle: &str) -> Result<Product, ShopifyError> {
        let cache_key = format!("product:{handle}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data: ProductByHandleData = self
            .execute(queries::get_product_by_handle(), json!({ "handle": handle }))
            .await?;

        let node = data
            .product
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?;

        let mut product: Product = node.into();

        // Metafield failures degrade to an empty map, not a failed request
        match self.fetch_metafields(handle).await {
            Ok(metafields) => product.metafields = metafields,
            Err(e) => {
                warn!(error = %e, "Metafield query failed, serving product without metafields");
            }
        }

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a paginated list of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_all_products(
        &self,
        first: i64,
        after: Option<String>,
        query: Option<String>,
    ) -> Result<ProductPage, ShopifyError> {
        let cache_key = format!("products:{}:{:?}", after.as_deref().unwrap_or(""), query);

        // Check cache (only for default listings without search)
        if query.is_none()
            && let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let data: ProductsData = self
            .execute(
                queries::get_products(),
                json!({ "first": first, "after": after, "query": query.clone() }),
            )
            .await?;

        let page: ProductPage = data.products.into();

        if query.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }

        Ok(page)
    }

    /// Get the color-group siblings of a product.
    ///
    /// Siblings share the product's `colorgroup:<id>` tag; a product with
    /// no such tag has no siblings. Results are cached per handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_related_products(&self, handle: &str) -> Result<Vec<Product>, ShopifyError> {
        let cache_key = format!("related:{handle}");

        if let Some(CacheValue::Related(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for related products");
            return Ok(products);
        }

        let product = self.get_product_by_handle(handle).await?;

        let Some(group_tag) = product
            .tags
            .iter()
            .find(|tag| tag.starts_with(COLOR_GROUP_TAG_PREFIX))
        else {
            return Ok(Vec::new());
        };

        let page = self
            .fetch_all_products(50, None, Some(format!("tag:{group_tag}")))
            .await?;

        let related: Vec<Product> = page
            .products
            .into_iter()
            .filter(|sibling| sibling.handle != handle)
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Related(related.clone()))
            .await;

        Ok(related)
    }

    /// Fetch the configured metafields for a product handle.
    async fn fetch_metafields(
        &self,
        handle: &str,
    ) -> Result<BTreeMap<String, String>, ShopifyError> {
        let identifiers: Vec<serde_json::Value> = METAFIELD_KEYS
            .iter()
            .map(|key| json!({ "namespace": self.inner.metafield_namespace, "key": key }))
            .collect();

        let data: MetafieldsData = self
            .execute(
                queries::get_product_metafields(),
                json!({ "handle": handle, "identifiers": identifiers }),
            )
            .await?;

        let metafields = data
            .product
            .map(|p| p.metafields)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|m| (format!("{}.{}", m.namespace, m.key), m.value))
            .collect();

        Ok(metafields)
    }

    // =========================================================================
    // Checkout Methods (not cached - mutable state)
    // =========================================================================

    /// Create a new checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the creation fails or user errors are returned.
    #[instrument(skip(self))]
    pub async fn create_checkout(&self) -> Result<Checkout, ShopifyError> {
        let data: CartCreateData = self
            .execute(queries::create_checkout(), json!({ "input": {} }))
            .await?;

        checkout_from_payload(data.cart_create, "create checkout")
    }

    /// Fetch an existing checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not found or the request fails.
    #[instrument(skip(self), fields(checkout_id = %checkout_id))]
    pub async fn get_checkout(&self, checkout_id: &CheckoutId) -> Result<Checkout, ShopifyError> {
        let data: GetCheckoutData = self
            .execute(queries::get_checkout(), json!({ "id": checkout_id.as_str() }))
            .await?;

        data.cart
            .map(Into::into)
            .ok_or_else(|| ShopifyError::NotFound(format!("Checkout not found: {checkout_id}")))
    }

    /// Add lines to a checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self, lines), fields(checkout_id = %checkout_id))]
    pub async fn add_line_items(
        &self,
        checkout_id: &CheckoutId,
        lines: Vec<CheckoutLineInput>,
    ) -> Result<Checkout, ShopifyError> {
        let lines: Vec<serde_json::Value> = lines
            .into_iter()
            .map(|line| {
                json!({
                    "merchandiseId": line.variant_id.as_str(),
                    "quantity": line.quantity,
                })
            })
            .collect();

        let data: CartLinesAddData = self
            .execute(
                queries::add_line_items(),
                json!({ "cartId": checkout_id.as_str(), "lines": lines }),
            )
            .await?;

        checkout_from_payload(data.cart_lines_add, "add line items")
    }

    /// Update existing checkout lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self, updates), fields(checkout_id = %checkout_id))]
    pub async fn update_line_items(
        &self,
        checkout_id: &CheckoutId,
        updates: Vec<CheckoutLineUpdate>,
    ) -> Result<Checkout, ShopifyError> {
        let lines: Vec<serde_json::Value> = updates
            .into_iter()
            .map(|update| {
                json!({
                    "id": update.line_id.as_str(),
                    "quantity": update.quantity,
                })
            })
            .collect();

        let data: CartLinesUpdateData = self
            .execute(
                queries::update_line_items(),
                json!({ "cartId": checkout_id.as_str(), "lines": lines }),
            )
            .await?;

        checkout_from_payload(data.cart_lines_update, "update line items")
    }

    /// Remove lines from a checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation fails or user errors are returned.
    #[instrument(skip(self, line_ids), fields(checkout_id = %checkout_id))]
    pub async fn remove_line_items(
        &self,
        checkout_id: &CheckoutId,
        line_ids: Vec<LineId>,
    ) -> Result<Checkout, ShopifyError> {
        let line_ids: Vec<&str> = line_ids.iter().map(LineId::as_str).collect();

        let data: CartLinesRemoveData = self
            .execute(
                queries::remove_line_items(),
                json!({ "cartId": checkout_id.as_str(), "lineIds": line_ids }),
            )
            .await?;

        checkout_from_payload(data.cart_lines_remove, "remove line items")
    }
}

/// Unwrap a cart mutation payload into a checkout snapshot.
fn checkout_from_payload(
    payload: Option<CartMutationPayload>,
    action: &str,
) -> Result<Checkout, ShopifyError> {
    if let Some(result) = payload {
        if !result.user_errors.is_empty() {
            return Err(ShopifyError::UserError(
                result
                    .user_errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }

        if let Some(cart) = result.cart {
            return Ok(cart.into());
        }
    }

    Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
        "Failed to {action}"
    ))]))
}
