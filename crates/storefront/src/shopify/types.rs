//! Domain types for the Shopify Storefront API.
//!
//! These types provide a clean, ergonomic API separate from the raw
//! GraphQL response shapes (see `storefront::response`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use loomline_core::{CheckoutId, LineId, ProductId, VariantId};

// =============================================================================
// Money Types
// =============================================================================

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Decimal amount as string (preserves precision).
    pub amount: String,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

// =============================================================================
// Image Types
// =============================================================================

/// Product image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text for accessibility.
    pub alt_text: Option<String>,
    /// Image width in pixels.
    pub width: Option<i64>,
    /// Image height in pixels.
    pub height: Option<i64>,
}

// =============================================================================
// Product Types
// =============================================================================

/// A product variant (specific purchasable SKU).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title (combination of option values, e.g. "M / Indigo").
    pub title: String,
    /// Whether this variant is available for sale.
    pub available_for_sale: bool,
    /// Quantity available (if inventory tracking enabled).
    pub quantity_available: Option<i64>,
    /// SKU code.
    pub sku: Option<String>,
    /// Current price.
    pub price: Money,
    /// Compare-at price (original price if on sale).
    pub compare_at_price: Option<Money>,
    /// Variant image.
    pub image: Option<Image>,
}

/// A product in the store.
///
/// `metafields` is keyed `namespace.key`; it is populated by a secondary
/// query and may be empty if that query failed (the product itself is
/// still served).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// URL handle.
    pub handle: String,
    /// Product title.
    pub title: String,
    /// Plain text description.
    pub description: String,
    /// Whether any variant is available.
    pub available_for_sale: bool,
    /// Product type/category (e.g. "Hoodie").
    pub product_type: String,
    /// Vendor name.
    pub vendor: String,
    /// Product tags.
    pub tags: Vec<String>,
    /// Featured image.
    pub featured_image: Option<Image>,
    /// All product images.
    pub images: Vec<Image>,
    /// Product variants.
    pub variants: Vec<ProductVariant>,
    /// Metafield map keyed `namespace.key`.
    pub metafields: BTreeMap<String, String>,
}

impl Product {
    /// Look up a metafield value by `namespace.key`.
    #[must_use]
    pub fn metafield(&self, namespace: &str, key: &str) -> Option<&str> {
        self.metafields
            .get(&format!("{namespace}.{key}"))
            .map(String::as_str)
    }
}

// =============================================================================
// Pagination Types
// =============================================================================

/// Pagination information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Cursor for the last item.
    pub end_cursor: Option<String>,
}

/// One page of products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    /// Products in this page.
    pub products: Vec<Product>,
    /// Pagination info.
    pub page_info: PageInfo,
}

// =============================================================================
// Checkout Types
// =============================================================================

/// One line entry within a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLine {
    /// Remote line ID (distinct from the variant id).
    pub id: LineId,
    /// Variant this line purchases.
    pub variant_id: VariantId,
    /// Quantity.
    pub quantity: i64,
    /// Price per unit.
    pub price: Money,
}

/// Normalized snapshot of the remote checkout session.
///
/// Exclusively created and mutated through [`super::StorefrontClient`];
/// consumers only read the returned snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    /// Opaque session identifier.
    pub id: CheckoutId,
    /// Hosted checkout URL the client redirects to for payment.
    pub web_url: String,
    /// Remote mirror of the cart's line entries.
    pub lines: Vec<CheckoutLine>,
}

impl Checkout {
    /// Find the remote line for a variant, if present.
    #[must_use]
    pub fn line_for_variant(&self, variant_id: &VariantId) -> Option<&CheckoutLine> {
        self.lines.iter().find(|line| &line.variant_id == variant_id)
    }
}

/// Input for adding a line to a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLineInput {
    /// Product variant ID.
    pub variant_id: VariantId,
    /// Quantity to add.
    pub quantity: i64,
}

/// Input for updating an existing checkout line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLineUpdate {
    /// Remote line ID.
    pub line_id: LineId,
    /// New quantity.
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(amount: &str) -> Money {
        Money {
            amount: amount.to_string(),
            currency_code: "USD".to_string(),
        }
    }

    #[test]
    fn test_line_for_variant() {
        let checkout = Checkout {
            id: CheckoutId::new("gid://shopify/Cart/1"),
            web_url: "https://checkout.example/1".to_string(),
            lines: vec![
                CheckoutLine {
                    id: LineId::new("line-1"),
                    variant_id: VariantId::new("var-1"),
                    quantity: 2,
                    price: money("10.00"),
                },
                CheckoutLine {
                    id: LineId::new("line-2"),
                    variant_id: VariantId::new("var-2"),
                    quantity: 1,
                    price: money("5.00"),
                },
            ],
        };

        let line = checkout
            .line_for_variant(&VariantId::new("var-2"))
            .expect("line exists");
        assert_eq!(line.id, LineId::new("line-2"));
        assert!(checkout.line_for_variant(&VariantId::new("var-9")).is_none());
    }

    #[test]
    fn test_product_metafield_lookup() {
        let mut metafields = BTreeMap::new();
        metafields.insert("custom.color".to_string(), "Indigo".to_string());

        let product = Product {
            id: ProductId::new("gid://shopify/Product/1"),
            handle: "indigo-hoodie".to_string(),
            title: "Indigo Hoodie".to_string(),
            description: String::new(),
            available_for_sale: true,
            product_type: "Hoodie".to_string(),
            vendor: "Loomline".to_string(),
            tags: vec![],
            featured_image: None,
            images: vec![],
            variants: vec![],
            metafields,
        };

        assert_eq!(product.metafield("custom", "color"), Some("Indigo"));
        assert_eq!(product.metafield("custom", "fit"), None);
    }
}
