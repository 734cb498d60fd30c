//! Ledgerchain - a proof-of-work transfer ledger with longest-chain consensus
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the canonical block hash, the ledger and chain validation
//! - [`transaction`] - Transfers, the signing payload and transaction admission
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work search and block sealing
//! - [`consensus`] - Longest-valid-chain resolution against peers
//!
//! ## Cryptography
//! - [`crypto`] - RSA key pairs, addresses, PSS signatures
//! - [`wallet`] - Wallet key management
//!
//! ## Networking & Integration
//! - [`network`] - Known peer registry
//! - [`sync`] - Fetching peer chains over HTTP
//! - [`api`] - HTTP interface
//! - [`node`] - Shared node state tying the pieces together
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod consensus;
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;
pub mod wallet;

// ============================================================================
// Networking
// ============================================================================
pub mod network;
pub mod node;
pub mod sync;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
