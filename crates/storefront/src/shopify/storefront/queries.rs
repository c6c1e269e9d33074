//! GraphQL documents for the Shopify Storefront API.
//!
//! Documents are hand-written and paired with the typed response structs in
//! [`super::response`]. Field selections are kept to what the domain types
//! in [`crate::shopify::types`] actually consume.

/// Shared selection for product fields.
const PRODUCT_FIELDS: &str = r"
fragment ProductFields on Product {
  id
  handle
  title
  description
  availableForSale
  productType
  vendor
  tags
  featuredImage {
    url
    altText
    width
    height
  }
  images(first: 10) {
    edges {
      node {
        url
        altText
        width
        height
      }
    }
  }
  variants(first: 50) {
    edges {
      node {
        id
        title
        availableForSale
        quantityAvailable
        sku
        price {
          amount
          currencyCode
        }
        compareAtPrice {
          amount
          currencyCode
        }
        image {
          url
          altText
          width
          height
        }
      }
    }
  }
}
";

/// Shared selection for checkout session fields.
const CART_FIELDS: &str = r"
fragment CartFields on Cart {
  id
  checkoutUrl
  lines(first: 100) {
    edges {
      node {
        ... on CartLine {
          id
          quantity
          merchandise {
            ... on ProductVariant {
              id
              price {
                amount
                currencyCode
              }
            }
          }
        }
      }
    }
  }
}
";

/// Paginated product listing.
pub fn get_products() -> String {
    format!(
        r"query GetProducts($first: Int!, $after: String, $query: String) {{
  products(first: $first, after: $after, query: $query) {{
    edges {{
      node {{
        ...ProductFields
      }}
    }}
    pageInfo {{
      hasNextPage
      endCursor
    }}
  }}
}}
{PRODUCT_FIELDS}"
    )
}

/// Single product by handle.
pub fn get_product_by_handle() -> String {
    format!(
        r"query GetProductByHandle($handle: String!) {{
  product(handle: $handle) {{
    ...ProductFields
  }}
}}
{PRODUCT_FIELDS}"
    )
}

/// Secondary metafield query for a product handle.
///
/// The Storefront API only resolves metafields by explicit identifier, so
/// the configured namespace/key set is passed as variables.
pub fn get_product_metafields() -> String {
    r"query GetProductMetafields($handle: String!, $identifiers: [HasMetafieldsIdentifier!]!) {
  product(handle: $handle) {
    metafields(identifiers: $identifiers) {
      namespace
      key
      value
    }
  }
}"
    .to_string()
}

/// Create a new checkout session.
pub fn create_checkout() -> String {
    format!(
        r"mutation CreateCheckout($input: CartInput!) {{
  cartCreate(input: $input) {{
    cart {{
      ...CartFields
    }}
    userErrors {{
      field
      message
    }}
  }}
}}
{CART_FIELDS}"
    )
}

/// Fetch an existing checkout session by id.
pub fn get_checkout() -> String {
    format!(
        r"query GetCheckout($id: ID!) {{
  cart(id: $id) {{
    ...CartFields
  }}
}}
{CART_FIELDS}"
    )
}

/// Add lines to a checkout session.
pub fn add_line_items() -> String {
    format!(
        r"mutation AddLineItems($cartId: ID!, $lines: [CartLineInput!]!) {{
  cartLinesAdd(cartId: $cartId, lines: $lines) {{
    cart {{
      ...CartFields
    }}
    userErrors {{
      field
      message
    }}
  }}
}}
{CART_FIELDS}"
    )
}

/// Update existing checkout lines.
pub fn update_line_items() -> String {
    format!(
        r"mutation UpdateLineItems($cartId: ID!, $lines: [CartLineUpdateInput!]!) {{
  cartLinesUpdate(cartId: $cartId, lines: $lines) {{
    cart {{
      ...CartFields
    }}
    userErrors {{
      field
      message
    }}
  }}
}}
{CART_FIELDS}"
    )
}

/// Remove lines from a checkout session.
pub fn remove_line_items() -> String {
    format!(
        r"mutation RemoveLineItems($cartId: ID!, $lineIds: [ID!]!) {{
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {{
    cart {{
      ...CartFields
    }}
    userErrors {{
      field
      message
    }}
  }}
}}
{CART_FIELDS}"
    )
}
