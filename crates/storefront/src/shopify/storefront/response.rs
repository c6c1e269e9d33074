//! Raw response shapes for the Storefront API, plus conversions into the
//! domain types in [`crate::shopify::types`].
//!
//! Shapes mirror the documents in [`super::queries`] field for field; the
//! conversions are the only place GraphQL connection/edge noise is allowed.

use serde::Deserialize;

use loomline_core::{CheckoutId, LineId, ProductId, VariantId};

use crate::shopify::types::{
    Checkout, CheckoutLine, Image, Money, PageInfo, Product, ProductPage, ProductVariant,
};

// =============================================================================
// Envelope
// =============================================================================

/// Top-level GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<RawGraphQLError>>,
}

/// Raw GraphQL error entry.
#[derive(Debug, Deserialize)]
pub struct RawGraphQLError {
    pub message: String,
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

/// Raw `userErrors` entry from a mutation payload.
#[derive(Debug, Deserialize)]
pub struct UserErrorNode {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

// =============================================================================
// Connection plumbing
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

impl<T> Connection<T> {
    fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfoNode {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

// =============================================================================
// Product shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyNode {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub quantity_available: Option<i64>,
    pub sku: Option<String>,
    pub price: MoneyNode,
    pub compare_at_price: Option<MoneyNode>,
    pub image: Option<ImageNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub available_for_sale: bool,
    pub product_type: String,
    pub vendor: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub featured_image: Option<ImageNode>,
    pub images: Connection<ImageNode>,
    pub variants: Connection<VariantNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConnectionNode {
    pub edges: Vec<Edge<ProductNode>>,
    pub page_info: PageInfoNode,
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: ProductConnectionNode,
}

#[derive(Debug, Deserialize)]
pub struct ProductByHandleData {
    pub product: Option<ProductNode>,
}

// =============================================================================
// Metafield shapes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MetafieldNode {
    pub namespace: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct MetafieldsProduct {
    /// Identifier-resolved metafields; unset identifiers come back as null.
    pub metafields: Vec<Option<MetafieldNode>>,
}

#[derive(Debug, Deserialize)]
pub struct MetafieldsData {
    pub product: Option<MetafieldsProduct>,
}

// =============================================================================
// Checkout shapes
// =============================================================================

/// A cart line node. Fields are optional because the `lines` connection can
/// also yield `ComponentizableCartLine` nodes that match none of the inline
/// fragment's fields; those are skipped during conversion.
#[derive(Debug, Deserialize)]
pub struct CartLineNode {
    pub id: Option<String>,
    pub quantity: Option<i64>,
    pub merchandise: Option<MerchandiseNode>,
}

#[derive(Debug, Deserialize)]
pub struct MerchandiseNode {
    pub id: String,
    pub price: MoneyNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartNode {
    pub id: String,
    pub checkout_url: String,
    pub lines: Connection<CartLineNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationPayload {
    pub cart: Option<CartNode>,
    #[serde(default)]
    pub user_errors: Vec<UserErrorNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCreateData {
    pub cart_create: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesAddData {
    pub cart_lines_add: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesUpdateData {
    pub cart_lines_update: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinesRemoveData {
    pub cart_lines_remove: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
pub struct GetCheckoutData {
    pub cart: Option<CartNode>,
}

// =============================================================================
// Conversions
// =============================================================================

impl From<MoneyNode> for Money {
    fn from(node: MoneyNode) -> Self {
        Self {
            amount: node.amount,
            currency_code: node.currency_code,
        }
    }
}

impl From<ImageNode> for Image {
    fn from(node: ImageNode) -> Self {
        Self {
            url: node.url,
            alt_text: node.alt_text,
            width: node.width,
            height: node.height,
        }
    }
}

impl From<VariantNode> for ProductVariant {
    fn from(node: VariantNode) -> Self {
        Self {
            id: VariantId::new(node.id),
            title: node.title,
            available_for_sale: node.available_for_sale,
            quantity_available: node.quantity_available,
            sku: node.sku,
            price: node.price.into(),
            compare_at_price: node.compare_at_price.map(Into::into),
            image: node.image.map(Into::into),
        }
    }
}

impl From<ProductNode> for Product {
    fn from(node: ProductNode) -> Self {
        Self {
            id: ProductId::new(node.id),
            handle: node.handle,
            title: node.title,
            description: node.description,
            available_for_sale: node.available_for_sale,
            product_type: node.product_type,
            vendor: node.vendor,
            tags: node.tags,
            featured_image: node.featured_image.map(Into::into),
            images: node.images.into_nodes().into_iter().map(Into::into).collect(),
            variants: node
                .variants
                .into_nodes()
                .into_iter()
                .map(Into::into)
                .collect(),
            // Populated by the secondary metafield query.
            metafields: std::collections::BTreeMap::new(),
        }
    }
}

impl From<ProductConnectionNode> for ProductPage {
    fn from(node: ProductConnectionNode) -> Self {
        Self {
            products: node.edges.into_iter().map(|e| e.node.into()).collect(),
            page_info: PageInfo {
                has_next_page: node.page_info.has_next_page,
                end_cursor: node.page_info.end_cursor,
            },
        }
    }
}

impl CartLineNode {
    fn into_line(self) -> Option<CheckoutLine> {
        let merchandise = self.merchandise?;
        Some(CheckoutLine {
            id: LineId::new(self.id?),
            variant_id: VariantId::new(merchandise.id),
            quantity: self.quantity?,
            price: merchandise.price.into(),
        })
    }
}

impl From<CartNode> for Checkout {
    fn from(node: CartNode) -> Self {
        Self {
            id: CheckoutId::new(node.id),
            web_url: node.checkout_url,
            lines: node
                .lines
                .into_nodes()
                .into_iter()
                .filter_map(CartLineNode::into_line)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_node_conversion_skips_fragmentless_lines() {
        let json = serde_json::json!({
            "id": "gid://shopify/Cart/1",
            "checkoutUrl": "https://loomline.myshopify.com/checkouts/1",
            "lines": {
                "edges": [
                    {"node": {
                        "id": "gid://shopify/CartLine/1",
                        "quantity": 2,
                        "merchandise": {
                            "id": "gid://shopify/ProductVariant/9",
                            "price": {"amount": "35.00", "currencyCode": "USD"}
                        }
                    }},
                    {"node": {}}
                ]
            }
        });

        let node: CartNode = serde_json::from_value(json).expect("cart node parses");
        let checkout: Checkout = node.into();

        assert_eq!(checkout.lines.len(), 1);
        let line = checkout.lines.first().expect("one line");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.variant_id.as_str(), "gid://shopify/ProductVariant/9");
    }

    #[test]
    fn test_product_node_conversion() {
        let json = serde_json::json!({
            "id": "gid://shopify/Product/1",
            "handle": "indigo-hoodie",
            "title": "Indigo Hoodie",
            "description": "Heavyweight fleece.",
            "availableForSale": true,
            "productType": "Hoodie",
            "vendor": "Loomline",
            "tags": ["fleece"],
            "featuredImage": {"url": "https://cdn.example/a.jpg", "altText": null, "width": 800, "height": 800},
            "images": {"edges": [{"node": {"url": "https://cdn.example/a.jpg", "altText": null, "width": 800, "height": 800}}]},
            "variants": {"edges": [{"node": {
                "id": "gid://shopify/ProductVariant/9",
                "title": "M / Indigo",
                "availableForSale": true,
                "quantityAvailable": 3,
                "sku": "LL-HD-M-IND",
                "price": {"amount": "89.00", "currencyCode": "USD"},
                "compareAtPrice": null,
                "image": null
            }}]}
        });

        let node: ProductNode = serde_json::from_value(json).expect("product node parses");
        let product: Product = node.into();

        assert_eq!(product.handle, "indigo-hoodie");
        assert_eq!(product.variants.len(), 1);
        let variant = product.variants.first().expect("one variant");
        assert_eq!(variant.quantity_available, Some(3));
        assert_eq!(variant.price.amount, "89.00");
        assert!(product.metafields.is_empty());
    }

    #[test]
    fn test_envelope_with_errors() {
        let json = r#"{"data": null, "errors": [{"message": "boom", "path": ["cart"]}]}"#;
        let envelope: Envelope<GetCheckoutData> =
            serde_json::from_str(json).expect("envelope parses");
        assert!(envelope.data.is_none());
        let errors = envelope.errors.expect("has errors");
        assert_eq!(errors.first().map(|e| e.message.as_str()), Some("boom"));
    }
}
