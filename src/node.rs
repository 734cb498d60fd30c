//! Shared node state
//!
//! One [`Node`] owns everything a process serves: the ledger (chain, pool and
//! balances behind a single lock), the wallet keys, the peer registry and the
//! mining and consensus machinery. Handlers receive it explicitly.

use crate::blockchain::{Block, Ledger};
use crate::config::Config;
use crate::consensus::ConsensusResolver;
use crate::error::{ChainError, Result};
use crate::miner::Miner;
use crate::network::NodeRegistry;
use crate::transaction::{Admission, Transaction};
use crate::wallet::WalletManager;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct Node {
    pub ledger: Arc<RwLock<Ledger>>,
    pub wallets: Arc<WalletManager>,
    pub registry: parking_lot::RwLock<NodeRegistry>,
    resolver: ConsensusResolver,
    miner: Miner,
}

impl Node {
    pub fn new(config: &Config) -> Self {
        let node_identifier = if config.miner.beneficiary_address.is_empty() {
            generate_node_identifier()
        } else {
            config.miner.beneficiary_address.clone()
        };

        let mut registry = NodeRegistry::new();
        for peer in &config.network.bootstrap_peers {
            if let Err(e) = registry.register(peer) {
                warn!(peer = %peer, error = %e, "bootstrap peer ignored");
            }
        }

        info!(node_identifier = %node_identifier, peers = registry.len(), "node.initialized");

        Self {
            ledger: Arc::new(RwLock::new(Ledger::with_allocations(
                config.ledger.genesis_allocations.clone(),
            ))),
            wallets: Arc::new(WalletManager::new(config.wallet.key_bits)),
            registry: parking_lot::RwLock::new(registry),
            resolver: ConsensusResolver::new(config.network.peer_timeout()),
            miner: Miner::new(node_identifier, config.miner.reward),
        }
    }

    /// Address that receives this node's mining rewards.
    pub fn node_identifier(&self) -> &str {
        self.miner.beneficiary()
    }

    pub async fn mine(&self) -> Result<Block> {
        self.miner.mine(&self.ledger).await
    }

    pub async fn submit_transaction(&self, tx: Transaction) -> Result<Admission> {
        let mut ledger = self.ledger.write().await;
        ledger.admit(&self.wallets, tx)
    }

    /// Run consensus against a snapshot of the registered peers.
    pub async fn resolve_conflicts(&self) -> Result<bool> {
        let peers = self.registry.read().list_peers();
        self.resolver.resolve(&self.ledger, &peers).await
    }

    /// Register `peers` atomically; an invalid entry leaves the registry as it was.
    pub fn register_peers(&self, peers: &[String]) -> Result<Vec<String>> {
        let mut registry = self.registry.write();
        registry.register_all(peers)?;
        Ok(registry.list_peers())
    }

    /// Generate a wallet on the blocking pool; RSA key generation is slow.
    pub async fn generate_wallet(&self) -> Result<String> {
        let wallets = self.wallets.clone();
        tokio::task::spawn_blocking(move || wallets.generate_wallet())
            .await
            .map_err(|e| ChainError::CryptoError(format!("wallet generation task failed: {}", e)))?
    }
}

fn generate_node_identifier() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
