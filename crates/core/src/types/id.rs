//! Newtype IDs for type-safe entity references.
//!
//! Shopify identifies everything by opaque GID strings
//! (`gid://shopify/ProductVariant/1234`). Use the `define_id!` macro to
//! create type-safe wrappers that prevent accidentally mixing IDs from
//! different entity types - a checkout line id is not a variant id, even
//! though both are strings on the wire.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use loomline_core::define_id;
/// define_id!(VariantId);
/// define_id!(LineId);
///
/// let variant = VariantId::new("gid://shopify/ProductVariant/1");
/// let line = LineId::new("gid://shopify/CartLine/1");
///
/// // These are different types, so this won't compile:
/// // let _: VariantId = line;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(ProductId);
define_id!(VariantId);
define_id!(CheckoutId);
define_id!(LineId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_accessors() {
        let id = VariantId::new("gid://shopify/ProductVariant/42");
        assert_eq!(id.as_str(), "gid://shopify/ProductVariant/42");
        assert_eq!(id.to_string(), "gid://shopify/ProductVariant/42");
        assert_eq!(id.into_inner(), "gid://shopify/ProductVariant/42");
    }

    #[test]
    fn test_id_equality() {
        let a = LineId::from("gid://shopify/CartLine/1");
        let b = LineId::new("gid://shopify/CartLine/1".to_string());
        assert_eq!(a, b);
        assert_ne!(a, LineId::from("gid://shopify/CartLine/2"));
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = CheckoutId::new("gid://shopify/Cart/abc");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"gid://shopify/Cart/abc\"");

        let back: CheckoutId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }
}
