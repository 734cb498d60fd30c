//! Longest-valid-chain consensus
//!
//! Resolution snapshots the peer list, fetches every peer's chain without
//! holding the ledger lock, and only takes the write lock to install the
//! winner. A peer chain wins when it is strictly longer than anything seen so
//! far (the local chain included), passes full validation, and never
//! overdraws a sender when replayed over the local genesis allocations. On
//! equal length the first peer in iteration order keeps the lead.

use crate::blockchain::{validate_chain, Balances, Block, Ledger};
use crate::error::Result;
use crate::sync::{PeerChain, PeerClient};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Pick the longest valid chain among `candidates` that beats `local_length`.
/// `balances` supplies the allocations each candidate is replayed over.
pub fn select_longest_chain<I>(
    local_length: usize,
    balances: &Balances,
    candidates: I,
) -> Option<Vec<Block>>
where
    I: IntoIterator<Item = (String, PeerChain)>,
{
    let mut max_length = local_length;
    let mut best = None;

    for (peer, candidate) in candidates {
        if candidate.length != candidate.chain.len() {
            warn!(
                peer = %peer,
                reported = candidate.length,
                actual = candidate.chain.len(),
                "consensus.length_mismatch"
            );
            continue;
        }
        if candidate.length <= max_length {
            continue;
        }
        if let Err(e) = validate_chain(&candidate.chain) {
            warn!(peer = %peer, error = %e, "consensus.invalid_chain");
            continue;
        }
        if let Err(e) = balances.replay(&candidate.chain) {
            warn!(peer = %peer, error = %e, "consensus.overdrawn_chain");
            continue;
        }
        max_length = candidate.length;
        best = Some(candidate.chain);
    }

    best
}

#[derive(Debug, Clone, Default)]
pub struct ConsensusResolver {
    client: PeerClient,
}

impl ConsensusResolver {
    pub fn new(peer_timeout: Duration) -> Self {
        Self {
            client: PeerClient::new(peer_timeout),
        }
    }

    /// Replace the local chain with the longest valid peer chain, if any is
    /// longer. Returns whether a replacement happened. Unreachable or
    /// misbehaving peers are skipped.
    pub async fn resolve(&self, ledger: &RwLock<Ledger>, peers: &[String]) -> Result<bool> {
        let (local_length, balances) = {
            let state = ledger.read().await;
            (state.len(), state.balances().clone())
        };

        let mut candidates = Vec::with_capacity(peers.len());
        for peer in peers {
            match self.client.fetch_chain(peer).await {
                Ok(chain) => candidates.push((peer.clone(), chain)),
                Err(e) => warn!(peer = %peer, error = %e, "consensus.peer_skipped"),
            }
        }

        let Some(chain) = select_longest_chain(local_length, &balances, candidates) else {
            info!(local_length, peers = peers.len(), "consensus.local_authoritative");
            return Ok(false);
        };

        let mut state = ledger.write().await;
        if chain.len() <= state.len() {
            info!(
                local_length = state.len(),
                candidate_length = chain.len(),
                "consensus.local_grew_during_resolution"
            );
            return Ok(false);
        }
        state.replace_chain(chain)?;
        Ok(true)
    }
}
