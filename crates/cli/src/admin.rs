//! Shopify Admin API GraphQL client (HIGH PRIVILEGE - offline use only).
//!
//! Token authentication via `X-Shopify-Access-Token`. The client covers
//! only what the metafield commands need; it is not a general Admin API
//! surface.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

/// Errors from the Admin API client.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("GraphQL errors: {0}")]
    GraphQL(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("User error: {0}")]
    UserError(String),
}

/// A product metafield as listed by the Admin API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metafield {
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    errors: Option<Vec<RawError>>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct UserErrorNode {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct ProductNode {
    id: String,
    #[serde(default)]
    metafields: Option<Connection<Metafield>>,
}

#[derive(Debug, Deserialize)]
struct ProductsData {
    products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetData {
    metafields_set: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsDeleteData {
    metafields_delete: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldDefinitionCreateData {
    metafield_definition_create: MutationPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationPayload {
    #[serde(default)]
    user_errors: Vec<UserErrorNode>,
}

impl MutationPayload {
    fn into_result(self) -> Result<(), AdminError> {
        if self.user_errors.is_empty() {
            return Ok(());
        }
        Err(AdminError::UserError(
            self.user_errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; "),
        ))
    }
}

/// Shopify Admin API GraphQL client.
pub struct AdminClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
}

impl AdminClient {
    /// Build a client from `SHOPIFY_STORE`, `SHOPIFY_ADMIN_TOKEN`, and
    /// optional `SHOPIFY_API_VERSION` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing.
    pub fn from_env() -> Result<Self, AdminError> {
        let _ = dotenvy::dotenv();

        let store = require_env("SHOPIFY_STORE")?;
        let access_token = SecretString::from(require_env("SHOPIFY_ADMIN_TOKEN")?);
        let api_version =
            std::env::var("SHOPIFY_API_VERSION").unwrap_or_else(|_| "2026-01".to_string());

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: format!("https://{store}/admin/api/{api_version}/graphql.json"),
            access_token,
        })
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AdminError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", self.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(AdminError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(AdminError::GraphQL(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;

        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            return Err(AdminError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }

        envelope
            .data
            .ok_or_else(|| AdminError::GraphQL("No data in response".to_string()))
    }

    /// Resolve a product handle to its GID.
    #[instrument(skip(self))]
    pub async fn product_id_by_handle(&self, handle: &str) -> Result<String, AdminError> {
        let data: ProductsData = self
            .execute(
                r"query GetProductId($query: String!) {
                    products(first: 1, query: $query) {
                        edges { node { id } }
                    }
                }",
                json!({ "query": format!("handle:{handle}") }),
            )
            .await?;

        data.products
            .edges
            .into_iter()
            .next()
            .map(|edge| edge.node.id)
            .ok_or_else(|| AdminError::NotFound(format!("Product not found: {handle}")))
    }

    /// List a product's metafields.
    #[instrument(skip(self))]
    pub async fn list_metafields(&self, handle: &str) -> Result<Vec<Metafield>, AdminError> {
        let data: ProductsData = self
            .execute(
                r"query GetProductMetafields($query: String!) {
                    products(first: 1, query: $query) {
                        edges { node {
                            id
                            metafields(first: 50) {
                                edges { node { namespace key value type } }
                            }
                        }}
                    }
                }",
                json!({ "query": format!("handle:{handle}") }),
            )
            .await?;

        let product = data
            .products
            .edges
            .into_iter()
            .next()
            .map(|edge| edge.node)
            .ok_or_else(|| AdminError::NotFound(format!("Product not found: {handle}")))?;

        Ok(product
            .metafields
            .map(|connection| connection.edges.into_iter().map(|e| e.node).collect())
            .unwrap_or_default())
    }

    /// Set a metafield on a product.
    #[instrument(skip(self, value))]
    pub async fn set_metafield(
        &self,
        owner_id: &str,
        namespace: &str,
        key: &str,
        value: &str,
        value_type: &str,
    ) -> Result<(), AdminError> {
        let data: MetafieldsSetData = self
            .execute(
                r"mutation SetMetafield($metafields: [MetafieldsSetInput!]!) {
                    metafieldsSet(metafields: $metafields) {
                        userErrors { message }
                    }
                }",
                json!({ "metafields": [{
                    "ownerId": owner_id,
                    "namespace": namespace,
                    "key": key,
                    "value": value,
                    "type": value_type,
                }]}),
            )
            .await?;

        data.metafields_set.into_result()
    }

    /// Delete a metafield from a product.
    #[instrument(skip(self))]
    pub async fn delete_metafield(
        &self,
        owner_id: &str,
        namespace: &str,
        key: &str,
    ) -> Result<(), AdminError> {
        let data: MetafieldsDeleteData = self
            .execute(
                r"mutation DeleteMetafield($metafields: [MetafieldIdentifierInput!]!) {
                    metafieldsDelete(metafields: $metafields) {
                        userErrors { message }
                    }
                }",
                json!({ "metafields": [{
                    "ownerId": owner_id,
                    "namespace": namespace,
                    "key": key,
                }]}),
            )
            .await?;

        data.metafields_delete.into_result()
    }

    /// Create a product metafield definition readable by the Storefront API.
    ///
    /// An already existing definition is not an error.
    #[instrument(skip(self))]
    pub async fn expose_metafield_definition(
        &self,
        namespace: &str,
        key: &str,
        value_type: &str,
    ) -> Result<(), AdminError> {
        let data: MetafieldDefinitionCreateData = self
            .execute(
                r"mutation ExposeMetafieldDefinition($definition: MetafieldDefinitionInput!) {
                    metafieldDefinitionCreate(definition: $definition) {
                        userErrors { message }
                    }
                }",
                json!({ "definition": {
                    "name": key,
                    "namespace": namespace,
                    "key": key,
                    "ownerType": "PRODUCT",
                    "type": value_type,
                    "access": { "storefront": "PUBLIC_READ" },
                }}),
            )
            .await?;

        match data.metafield_definition_create.into_result() {
            // Re-running expose against an existing definition is fine
            Err(AdminError::UserError(message)) if message.contains("taken") => {
                tracing::info!(namespace, key, "Metafield definition already exists");
                Ok(())
            }
            other => other,
        }
    }
}

fn require_env(key: &str) -> Result<String, AdminError> {
    std::env::var(key).map_err(|_| AdminError::MissingEnvVar(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_error_display() {
        let err = AdminError::NotFound("rib-knit-tee".to_string());
        assert_eq!(err.to_string(), "Not found: rib-knit-tee");

        let err = AdminError::RateLimited(4);
        assert_eq!(err.to_string(), "Rate limited, retry after 4 seconds");
    }

    #[test]
    fn test_mutation_payload_joins_user_errors() {
        let payload = MutationPayload {
            user_errors: vec![
                UserErrorNode {
                    message: "Value is invalid".to_string(),
                },
                UserErrorNode {
                    message: "Key is reserved".to_string(),
                },
            ],
        };

        match payload.into_result() {
            Err(AdminError::UserError(message)) => {
                assert_eq!(message, "Value is invalid; Key is reserved");
            }
            other => panic!("expected user error, got {other:?}"),
        }
    }
}
