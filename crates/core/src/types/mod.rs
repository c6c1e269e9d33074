//! Core type definitions.

pub mod id;
pub mod price;

pub use id::{CheckoutId, LineId, ProductId, VariantId};
pub use price::{CurrencyCode, Price, PriceError, PriceInput};
