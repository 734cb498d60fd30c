use crate::blockchain::core::chain::Block;
use crate::error::{ChainError, Result};
use std::collections::HashMap;

/// Address balances derived from seeded allocations plus every sealed block.
#[derive(Debug, Clone, Default)]
pub struct Balances {
    allocations: HashMap<String, u64>,
    address_balances: HashMap<String, u64>,
}

impl Balances {
    pub fn new(allocations: HashMap<String, u64>) -> Self {
        Self {
            address_balances: allocations.clone(),
            allocations,
        }
    }

    pub fn get(&self, address: &str) -> u64 {
        self.address_balances.get(address).copied().unwrap_or(0)
    }

    /// Add an external allocation. It survives a replay.
    pub fn seed(&mut self, address: &str, amount: u64) {
        let allocation = self.allocations.entry(address.to_string()).or_insert(0);
        *allocation = allocation.saturating_add(amount);
        self.credit(address, amount);
    }

    /// Credit recipients and debit non-reward senders of `block`.
    pub fn apply_block(&mut self, block: &Block) {
        for tx in &block.transactions {
            if !tx.is_reward() {
                let sender = self.address_balances.entry(tx.sender.clone()).or_insert(0);
                *sender = sender.saturating_sub(tx.amount);
            }
            self.credit(&tx.recipient, tx.amount);
        }
    }

    /// Apply `block`, failing if any transfer exceeds its sender's balance at
    /// that point. Blocks from peers go through here.
    pub fn try_apply_block(&mut self, block: &Block) -> Result<()> {
        for tx in &block.transactions {
            if !tx.is_reward() {
                let available = self.get(&tx.sender);
                if available < tx.amount {
                    return Err(ChainError::InvalidBlock(format!(
                        "Block {} overdraws {}: balance {}, transfer {}.",
                        block.index, tx.sender, available, tx.amount
                    )));
                }
                self.address_balances
                    .insert(tx.sender.clone(), available - tx.amount);
            }
            self.credit(&tx.recipient, tx.amount);
        }
        Ok(())
    }

    /// Balances produced by replaying `chain` on top of the allocations.
    /// `self` is left untouched.
    pub fn replay(&self, chain: &[Block]) -> Result<Balances> {
        let mut replayed = Balances::new(self.allocations.clone());
        for block in chain {
            replayed.try_apply_block(block)?;
        }
        Ok(replayed)
    }

    fn credit(&mut self, address: &str, amount: u64) {
        let balance = self.address_balances.entry(address.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }
}
