//! Session-persisted cart state.
//!
//! Cart contents live in the visitor's session alongside the checkout id,
//! so the cart survives across requests and server restarts. The remote
//! checkout session is the source of truth for line ids; everything else
//! is denormalized here so the cart can render without a product fetch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loomline_core::{CurrencyCode, LineId, Price, PriceInput, ProductId, VariantId};

use crate::shopify::types::{Image, Product, ProductVariant};

/// Session keys for cart state.
pub mod session_keys {
    /// The remote checkout session id, if one has been created.
    pub const CHECKOUT_ID: &str = "checkout_id";
    /// The serialized cart items.
    pub const CART_ITEMS: &str = "cart_items";
    /// Whether the cart drawer is open.
    pub const CART_OPEN: &str = "cart_open";
}

/// A single cart entry. At most one entry exists per variant; adding the
/// same variant again merges into the existing entry's quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product_id: ProductId,
    pub handle: String,
    pub title: String,
    pub variant: CartVariant,
    pub quantity: u32,
    /// Remote checkout line id. `None` until the line has been synchronized
    /// with the checkout session.
    #[serde(default)]
    pub line_id: Option<LineId>,
}

/// The variant snapshot carried by a cart item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartVariant {
    pub id: VariantId,
    pub title: String,
    /// Unit price as a decimal string, e.g. `"35.00"`.
    pub price: String,
    /// Currency the price is denominated in.
    #[serde(default)]
    pub currency_code: CurrencyCode,
    #[serde(default)]
    pub image: Option<Image>,
}

impl CartItem {
    /// Build a cart item from a product and one of its variants.
    #[must_use]
    pub fn from_variant(product: &Product, variant: &ProductVariant, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            handle: product.handle.clone(),
            title: product.title.clone(),
            variant: CartVariant {
                id: variant.id.clone(),
                title: variant.title.clone(),
                price: variant.price.amount.clone(),
                currency_code: CurrencyCode::from(variant.price.currency_code.clone()),
                image: variant
                    .image
                    .clone()
                    .or_else(|| product.featured_image.clone()),
            },
            quantity,
            line_id: None,
        }
    }

    /// Unit price, normalized through [`PriceInput`]. Unparseable prices
    /// count as zero rather than poisoning the cart total.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        PriceInput::Text(self.variant.price.clone())
            .normalize()
            .map_or_else(
                |_| Price::zero(self.variant.currency_code),
                |p| Price::new(p.amount, self.variant.currency_code),
            )
    }

    /// The extended price of this entry.
    #[must_use]
    pub fn line_total(&self) -> Price {
        let unit = self.unit_price();
        Price::new(
            unit.amount * Decimal::from(self.quantity),
            unit.currency_code,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: &str, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new("gid://shopify/Product/1"),
            handle: "rib-knit-tee".to_string(),
            title: "Rib Knit Tee".to_string(),
            variant: CartVariant {
                id: VariantId::new("gid://shopify/ProductVariant/10"),
                title: "M".to_string(),
                price: price.to_string(),
                currency_code: CurrencyCode::USD,
                image: None,
            },
            quantity,
            line_id: None,
        }
    }

    #[test]
    fn test_line_total() {
        let total = item("35.00", 3).line_total();
        assert_eq!(total.amount, Decimal::new(10500, 2));
        assert_eq!(total.display(), "$105.00");
    }

    #[test]
    fn test_bad_price_counts_as_zero() {
        let total = item("not a price", 2).line_total();
        assert_eq!(total.amount, Decimal::ZERO);
        assert_eq!(total.currency_code, CurrencyCode::USD);
    }

    #[test]
    fn test_round_trips_through_session_json() {
        let mut original = item("35.00", 1);
        original.line_id = Some(LineId::new("gid://shopify/CartLine/5"));

        let json = serde_json::to_string(&original).expect("serializes");
        let restored: CartItem = serde_json::from_str(&json).expect("deserializes");

        assert_eq!(restored, original);
    }

    #[test]
    fn test_line_id_defaults_to_none_for_older_sessions() {
        let json = serde_json::json!({
            "product_id": "gid://shopify/Product/1",
            "handle": "rib-knit-tee",
            "title": "Rib Knit Tee",
            "variant": {
                "id": "gid://shopify/ProductVariant/10",
                "title": "M",
                "price": "35.00"
            },
            "quantity": 1
        });

        let item: CartItem = serde_json::from_value(json).expect("deserializes");
        assert!(item.line_id.is_none());
        assert_eq!(item.variant.currency_code, CurrencyCode::USD);
    }
}
