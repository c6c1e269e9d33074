//! Cache value types for the Storefront client.

use crate::shopify::types::{Product, ProductPage};

/// Values stored in the client's moka cache.
///
/// Boxed where the payload is large to keep the enum small.
#[derive(Clone)]
pub enum CacheValue {
    /// A single product (keyed by handle).
    Product(Box<Product>),
    /// A page of products (keyed by cursor/query).
    Products(ProductPage),
    /// A related-products lookup (keyed by handle).
    Related(Vec<Product>),
}
