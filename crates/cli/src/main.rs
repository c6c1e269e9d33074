//! Loomline CLI - Shopify metafield management tools.
//!
//! # Usage
//!
//! ```bash
//! # List a product's metafields
//! loom-cli metafields list --handle rib-knit-tee
//!
//! # Set the features metafield
//! loom-cli metafields set --handle rib-knit-tee --key features \
//!     --value '["100% cotton", "Pre-shrunk"]'
//!
//! # Remove a metafield
//! loom-cli metafields unset --handle rib-knit-tee --key video_url
//!
//! # Expose a metafield definition to the Storefront API
//! loom-cli metafields expose --key color
//! ```
//!
//! # Security
//!
//! Runs offline against the Shopify Admin API (`SHOPIFY_ADMIN_TOKEN`).
//! The storefront binary never carries this token.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod admin;
mod commands;

#[derive(Parser)]
#[command(name = "loom-cli")]
#[command(author, version, about = "Loomline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage product metafields
    Metafields {
        #[command(subcommand)]
        action: MetafieldAction,
    },
}

#[derive(Subcommand)]
enum MetafieldAction {
    /// List a product's metafields
    List {
        /// Product handle
        #[arg(long)]
        handle: String,
    },
    /// Set a metafield value
    Set {
        /// Product handle
        #[arg(long)]
        handle: String,

        /// Metafield key
        #[arg(short, long)]
        key: String,

        /// Metafield value
        #[arg(short, long)]
        value: String,

        /// Metafield namespace
        #[arg(short, long, default_value = "custom")]
        namespace: String,

        /// Metafield type
        #[arg(short, long, default_value = "single_line_text_field")]
        r#type: String,
    },
    /// Remove a metafield
    Unset {
        /// Product handle
        #[arg(long)]
        handle: String,

        /// Metafield key
        #[arg(short, long)]
        key: String,

        /// Metafield namespace
        #[arg(short, long, default_value = "custom")]
        namespace: String,
    },
    /// Create a metafield definition exposed to the Storefront API
    Expose {
        /// Metafield key
        #[arg(short, long)]
        key: String,

        /// Metafield namespace
        #[arg(short, long, default_value = "custom")]
        namespace: String,

        /// Metafield type
        #[arg(short, long, default_value = "single_line_text_field")]
        r#type: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let client = admin::AdminClient::from_env()?;

    match cli.command {
        Commands::Metafields { action } => match action {
            MetafieldAction::List { handle } => {
                commands::metafields::list(&client, &handle).await?;
            }
            MetafieldAction::Set {
                handle,
                key,
                value,
                namespace,
                r#type,
            } => {
                commands::metafields::set(&client, &handle, &namespace, &key, &value, &r#type)
                    .await?;
            }
            MetafieldAction::Unset {
                handle,
                key,
                namespace,
            } => {
                commands::metafields::unset(&client, &handle, &namespace, &key).await?;
            }
            MetafieldAction::Expose {
                key,
                namespace,
                r#type,
            } => {
                commands::metafields::expose(&client, &namespace, &key, &r#type).await?;
            }
        },
    }
    Ok(())
}
