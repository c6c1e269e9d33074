//! CLI command implementations.

pub mod metafields;
