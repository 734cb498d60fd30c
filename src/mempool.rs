//! Pending transaction pool

use crate::transaction::Transaction;

/// Transactions accepted but not yet sealed, in admission order.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Empties the pool, returning its contents in admission order.
    pub fn drain(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.transactions)
    }

    /// Total amount `sender` has committed to pending transfers.
    pub fn pending_outgoing(&self, sender: &str) -> u64 {
        self.transactions
            .iter()
            .filter(|tx| !tx.is_reward() && tx.sender == sender)
            .fold(0u64, |acc, tx| acc.saturating_add(tx.amount))
    }

    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&Transaction) -> bool,
    {
        self.transactions.retain(keep);
    }
}
