//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (database ping)
//!
//! # Products (JSON)
//! GET  /api/products                  - Product listing (pagination)
//! GET  /api/products/{handle}         - Product detail with metafields
//! GET  /api/products/{handle}/features - Feature list from metafields
//! GET  /api/products/{handle}/media   - Images + optional video source
//! GET  /api/products/{handle}/related - Color-group siblings
//!
//! # Cart (JSON)
//! GET  /cart                          - Cart snapshot
//! POST /cart/add                      - Add a variant
//! POST /cart/update                   - Set a line's quantity
//! POST /cart/remove                   - Remove a variant
//! POST /cart/clear                    - Empty the cart
//! GET  /cart/count                    - Unit count only
//!
//! # Checkout
//! GET  /checkout                      - Redirect to hosted checkout
//! GET  /checkout/return               - Post-checkout completion handling
//! ```

pub mod cart;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{handle}", get(products::show))
        .route("/{handle}/features", get(products::features))
        .route("/{handle}/media", get(products::media))
        .route("/{handle}/related", get(products::related))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Product API
        .nest("/api/products", product_routes())
        // Cart
        .nest("/cart", cart_routes())
        // Checkout redirect + return handling
        .route("/checkout", get(cart::checkout))
        .route("/checkout/return", get(cart::checkout_return))
}
