//! Infrastructure layer - External service integrations
//!
//! This layer contains:
//! - Alloy-based Ethereum provider implementations
//! - Tokio runtime bridge running the greeting listener

pub mod ethereum;
pub mod runtime;
