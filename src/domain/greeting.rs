//! Greeting events: the log filter and the bytes32 text decoder

use std::fmt;

use alloy::primitives::{address, Address, B256};
use alloy::rpc::types::{Filter, Log};
use alloy_primitives::keccak256;
use alloy_sol_types::{sol, SolEvent};

sol! {
    /// Emitted by the greeter contract whenever its greeting changes
    #[derive(Debug)]
    event NewGreeting(bytes32 greeting);
}

/// Greeter contract deployed first on a fresh local node
pub const DEFAULT_CONTRACT: Address = address!("e7f1725E7734CE288F8367e1Bb143E90bb3F0512");

pub const DEFAULT_EVENT_SIGNATURE: &str = NewGreeting::SIGNATURE;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid bytes32 string: expected 32 bytes, got {len} (0x{data})")]
    InvalidLength { len: usize, data: String },
    #[error("invalid bytes32 string: no null terminator")]
    MissingNullTerminator,
    #[error("invalid bytes32 string: not valid UTF-8")]
    InvalidUtf8,
    #[error("log has no block number (pending?)")]
    MissingBlockNumber,
}

/// Address + topic pair selecting the logs we listen to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreetingFilter {
    address: Address,
    signature: String,
    topic: B256,
}

impl Default for GreetingFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CONTRACT, DEFAULT_EVENT_SIGNATURE)
    }
}

impl GreetingFilter {
    pub fn new(address: Address, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        let topic = keccak256(signature.as_bytes());
        Self {
            address,
            signature,
            topic,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn topic(&self) -> B256 {
        self.topic
    }

    /// Filter for live subscriptions (no block bounds)
    pub fn to_filter(&self) -> Filter {
        Filter::new()
            .address(self.address)
            .event_signature(self.topic)
    }

    /// Filter for one polling window, both ends inclusive
    pub fn range(&self, from_block: u64, to_block: u64) -> Filter {
        self.to_filter().from_block(from_block).to_block(to_block)
    }

    pub fn describe(&self) -> String {
        format!("{} @ {}", self.signature, self.address)
    }
}

/// Decode a right-padded, null-terminated bytes32 string
pub fn decode_bytes32_string(data: &[u8]) -> Result<String, DecodeError> {
    if data.len() != 32 {
        return Err(DecodeError::InvalidLength {
            len: data.len(),
            data: hex::encode(data),
        });
    }
    if data[31] != 0 {
        return Err(DecodeError::MissingNullTerminator);
    }
    let end = data.iter().position(|b| *b == 0).unwrap_or(31);
    std::str::from_utf8(&data[..end])
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidUtf8)
}

/// A decoded greeting and the block it was emitted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    pub text: String,
    pub block_number: u64,
}

impl Greeting {
    pub fn from_parts(data: &[u8], block_number: Option<u64>) -> Result<Self, DecodeError> {
        let text = decode_bytes32_string(data)?;
        let block_number = block_number.ok_or(DecodeError::MissingBlockNumber)?;
        Ok(Self { text, block_number })
    }

    pub fn from_log(log: &Log) -> Result<Self, DecodeError> {
        Self::from_parts(&log.data().data, log.block_number)
    }
}

impl fmt::Display for Greeting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on Block #{}", self.text, self.block_number)
    }
}
