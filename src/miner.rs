//! Proof-of-work search and block sealing

use crate::blockchain::{Block, Ledger};
use crate::error::{ChainError, Result};
use sha2::{Digest, Sha256};
use std::sync::atomic::Ordering;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// How many candidates are tried between checks of the abort condition.
const ABORT_CHECK_INTERVAL: u64 = 4096;

pub struct ProofOfWork;

impl ProofOfWork {
    /// True when SHA-256 of the decimal string `"{last_proof}{proof}"` has
    /// four leading zero hex digits (16 zero bits).
    pub fn valid_proof(last_proof: u64, proof: u64) -> bool {
        let guess = format!("{}{}", last_proof, proof);
        let digest = Sha256::digest(guess.as_bytes());
        digest[0] == 0 && digest[1] == 0
    }

    /// Smallest non-negative proof valid after `last_proof`.
    pub fn solve(last_proof: u64) -> u64 {
        let mut proof = 0;
        while !Self::valid_proof(last_proof, proof) {
            proof += 1;
        }
        proof
    }

    /// Like [`ProofOfWork::solve`], but gives up with `None` once
    /// `should_abort` returns true.
    pub fn solve_until<F>(last_proof: u64, should_abort: F) -> Option<u64>
    where
        F: Fn() -> bool,
    {
        let mut proof = 0;
        loop {
            if proof % ABORT_CHECK_INTERVAL == 0 && should_abort() {
                return None;
            }
            if Self::valid_proof(last_proof, proof) {
                return Some(proof);
            }
            proof += 1;
        }
    }
}

/// Seals new blocks, paying `reward` to `beneficiary` for each.
#[derive(Debug, Clone)]
pub struct Miner {
    beneficiary: String,
    reward: u64,
}

impl Miner {
    pub fn new(beneficiary: impl Into<String>, reward: u64) -> Self {
        Self {
            beneficiary: beneficiary.into(),
            reward,
        }
    }

    pub fn beneficiary(&self) -> &str {
        &self.beneficiary
    }

    /// Search for the next proof without holding the ledger lock, then seal.
    ///
    /// If the chain changes while searching (a block sealed elsewhere or a
    /// consensus replacement), the search is abandoned and restarted against
    /// the new tip.
    pub async fn mine(&self, ledger: &RwLock<Ledger>) -> Result<Block> {
        loop {
            let (last_proof, last_hash, started_at, epoch) = {
                let state = ledger.read().await;
                let last = state.last_block();
                (last.proof, last.hash()?, state.epoch(), state.epoch_handle())
            };

            let proof = tokio::task::spawn_blocking(move || {
                ProofOfWork::solve_until(last_proof, || {
                    epoch.load(Ordering::Acquire) != started_at
                })
            })
            .await
            .map_err(|e| ChainError::Mining(format!("proof-of-work task failed: {}", e)))?;

            let Some(proof) = proof else {
                debug!("chain tip moved during proof search; restarting");
                continue;
            };

            let mut state = ledger.write().await;
            if state.epoch() != started_at {
                debug!(proof, "chain tip moved before sealing; discarding proof");
                continue;
            }

            state.queue_reward(&self.beneficiary, self.reward);
            let block = state.new_block(proof, Some(last_hash))?;
            info!(
                index = block.index,
                proof = block.proof,
                transactions = block.transactions.len(),
                "block.sealed"
            );
            return Ok(block);
        }
    }
}
