//! Loomline Core - Shared types library.
//!
//! This crate provides common types used across all Loomline components:
//! - `storefront` - Public-facing storefront API service
//! - `cli` - Command-line tools for metafield maintenance
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and price normalization

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
