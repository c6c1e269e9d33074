//! Metafield management commands.
//!
//! These run against the Admin API and cover the maintenance work the
//! storefront never does at runtime: setting feature lists, video URLs,
//! and color names, and exposing definitions to the Storefront API.

use crate::admin::{AdminClient, AdminError};

/// List a product's metafields.
#[allow(clippy::print_stdout)]
pub async fn list(client: &AdminClient, handle: &str) -> Result<(), AdminError> {
    let metafields = client.list_metafields(handle).await?;

    if metafields.is_empty() {
        println!("{handle}: no metafields");
        return Ok(());
    }

    println!("{handle}:");
    for metafield in metafields {
        println!(
            "  {}.{} ({}) = {}",
            metafield.namespace, metafield.key, metafield.value_type, metafield.value
        );
    }
    Ok(())
}

/// Set a metafield value on a product.
#[allow(clippy::print_stdout)]
pub async fn set(
    client: &AdminClient,
    handle: &str,
    namespace: &str,
    key: &str,
    value: &str,
    value_type: &str,
) -> Result<(), AdminError> {
    let owner_id = client.product_id_by_handle(handle).await?;
    client
        .set_metafield(&owner_id, namespace, key, value, value_type)
        .await?;

    println!("Set {namespace}.{key} on {handle}");
    Ok(())
}

/// Remove a metafield from a product.
#[allow(clippy::print_stdout)]
pub async fn unset(
    client: &AdminClient,
    handle: &str,
    namespace: &str,
    key: &str,
) -> Result<(), AdminError> {
    let owner_id = client.product_id_by_handle(handle).await?;
    client.delete_metafield(&owner_id, namespace, key).await?;

    println!("Removed {namespace}.{key} from {handle}");
    Ok(())
}

/// Ensure a metafield definition exists and is Storefront-readable.
#[allow(clippy::print_stdout)]
pub async fn expose(
    client: &AdminClient,
    namespace: &str,
    key: &str,
    value_type: &str,
) -> Result<(), AdminError> {
    client
        .expose_metafield_definition(namespace, key, value_type)
        .await?;

    println!("Exposed {namespace}.{key} to the Storefront API");
    Ok(())
}
