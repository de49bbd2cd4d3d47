//! Ethereum infrastructure - Alloy provider implementations

mod provider;

pub use provider::{create_provider, detect_node_kind, EthereumProvider, ProviderConfig};
