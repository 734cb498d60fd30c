//! Error types for the ledger

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Invalid chain: {0}")]
    InvalidChain(String),
    #[error("Invalid peer address: {0}")]
    InvalidPeer(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),
    #[error("Block not found: {0}")]
    BlockNotFound(usize),
    #[error("Peer not found: {0}")]
    PeerNotFound(String),
    #[error("Peer unreachable: {0}")]
    PeerUnreachable(String),
    #[error("Malformed chain from peer {peer}: {reason}")]
    MalformedChain { peer: String, reason: String },
    #[error("Mining error: {0}")]
    Mining(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}

impl From<rsa::Error> for ChainError {
    fn from(err: rsa::Error) -> Self {
        ChainError::CryptoError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
