//! Cart and checkout route handlers.
//!
//! Handlers wrap [`CartService`](crate::services::CartService) operations
//! and respond with a full cart snapshot, so clients never assemble cart
//! state from partial responses.

use axum::{
    Json,
    extract::{Query, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use loomline_core::VariantId;

use crate::error::{AppError, Result};
use crate::models::CartItem;
use crate::services::{CartStore, Notification, SessionCartStore};
use crate::state::AppState;

/// Cart snapshot returned by every cart endpoint.
#[derive(Debug, Serialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub count: u32,
    /// Formatted total, e.g. `"$105.00"`.
    pub total: String,
    pub open: bool,
    pub notifications: Vec<Notification>,
}

/// Add to cart request.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub handle: String,
    pub variant_id: String,
    pub quantity: Option<u32>,
}

/// Update quantity request.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub variant_id: String,
    pub quantity: u32,
    /// Known stock ceiling for the variant; quantities above it clamp.
    pub max_inventory: Option<u32>,
}

/// Remove from cart request.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub variant_id: String,
}

/// Checkout return query parameters.
#[derive(Debug, Deserialize)]
pub struct CheckoutReturnQuery {
    /// The full return URL, when the client forwards it explicitly.
    pub url: Option<String>,
}

/// Completion result for `/checkout/return`.
#[derive(Debug, Serialize)]
pub struct CheckoutReturnResponse {
    pub completed: bool,
}

async fn snapshot(state: &AppState, store: &SessionCartStore) -> Result<CartSnapshot> {
    let service = state.cart();
    Ok(CartSnapshot {
        items: store.items().await?,
        count: service.cart_count(store).await?,
        total: service.cart_total(store).await?.display(),
        open: store.is_open().await?,
        notifications: state.notifications().active(),
    })
}

/// Cart snapshot. Also restores the checkout session, replaying persisted
/// items when Shopify has discarded the old session.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartSnapshot>> {
    let store = SessionCartStore::new(session);
    state.cart().initialize(&store).await?;
    Ok(Json(snapshot(&state, &store).await?))
}

/// Add a variant to the cart.
#[instrument(skip(state, session, request))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartSnapshot>> {
    let store = SessionCartStore::new(session);

    let product = state
        .storefront()
        .get_product_by_handle(&request.handle)
        .await?;
    let variant_id = VariantId::new(request.variant_id);
    let variant = product
        .variants
        .iter()
        .find(|v| v.id == variant_id)
        .ok_or_else(|| AppError::NotFound(format!("Variant not found: {variant_id}")))?;

    state
        .cart()
        .add_to_cart(&store, &product, variant, request.quantity.unwrap_or(1))
        .await?;

    Ok(Json(snapshot(&state, &store).await?))
}

/// Set a line's quantity. Zero removes the line.
#[instrument(skip(state, session, request))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartSnapshot>> {
    let store = SessionCartStore::new(session);
    let variant_id = VariantId::new(request.variant_id);

    state
        .cart()
        .update_quantity(&store, &variant_id, request.quantity, request.max_inventory)
        .await?;

    Ok(Json(snapshot(&state, &store).await?))
}

/// Remove a variant from the cart.
#[instrument(skip(state, session, request))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartSnapshot>> {
    let store = SessionCartStore::new(session);
    let variant_id = VariantId::new(request.variant_id);

    state.cart().remove_from_cart(&store, &variant_id).await?;

    Ok(Json(snapshot(&state, &store).await?))
}

/// Empty the cart. The checkout session is kept for reuse.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartSnapshot>> {
    let store = SessionCartStore::new(session);
    state.cart().clear_cart(&store).await?;
    Ok(Json(snapshot(&state, &store).await?))
}

/// Unit count only, for badge rendering.
#[instrument(skip(state, session))]
pub async fn count(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<serde_json::Value>> {
    let store = SessionCartStore::new(session);
    let count = state.cart().cart_count(&store).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

/// Redirect to the hosted checkout.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Response {
    let store = SessionCartStore::new(session);

    match state.cart().checkout_url(&store).await {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "No checkout available, returning to cart");
            Redirect::to("/cart").into_response()
        }
    }
}

/// Handle the post-checkout return. A completion marker in the forwarded
/// URL (or in this request's own query string) empties the cart.
#[instrument(skip(state, session, query, raw_query))]
pub async fn checkout_return(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CheckoutReturnQuery>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<CheckoutReturnResponse>> {
    let store = SessionCartStore::new(session);

    let return_url = query
        .url
        .unwrap_or_else(|| format!("?{}", raw_query.unwrap_or_default()));

    let completed = state.cart().handle_return_url(&store, &return_url).await?;

    Ok(Json(CheckoutReturnResponse { completed }))
}
