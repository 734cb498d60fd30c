use crate::blockchain::core::state::Balances;
use crate::blockchain::core::validation::validate_chain;
use crate::error::Result;
use crate::mempool::Mempool;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// Fixed so that independently started nodes agree on block 1.
pub const GENESIS_TIMESTAMP: u64 = 1672531200000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position in the chain.
    pub index: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    pub fn genesis() -> Self {
        Block {
            index: 1,
            timestamp: GENESIS_TIMESTAMP,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Lowercase hex SHA-256 of the block's canonical JSON encoding.
    ///
    /// Object keys are sorted at every depth before encoding, so the digest
    /// depends only on field values, never on construction or map order.
    pub fn hash(&self) -> Result<String> {
        let canonical = canonicalize(serde_json::to_value(self)?);
        let encoded = serde_json::to_vec(&canonical)?;
        Ok(hex::encode(Sha256::digest(&encoded)))
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// The node's ledger state: sealed chain, pending pool and balances.
///
/// The chain is never empty. Every mutation of the chain advances
/// [`Ledger::epoch`], which lets a proof-of-work search running outside the
/// ledger lock notice that the tip it started from is gone.
pub struct Ledger {
    chain: Vec<Block>,
    pub(crate) mempool: Mempool,
    pub(crate) balances: Balances,
    epoch: Arc<AtomicU64>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_allocations(HashMap::new())
    }

    /// Create a ledger whose balances start from the given allocations.
    pub fn with_allocations(allocations: HashMap<String, u64>) -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            mempool: Mempool::new(),
            balances: Balances::new(allocations),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Seal the pending pool into a new block on top of the chain.
    ///
    /// When `previous_hash` is `None` it is computed from the current last block.
    pub fn new_block(&mut self, proof: u64, previous_hash: Option<String>) -> Result<Block> {
        let previous_hash = match previous_hash {
            Some(hash) => hash,
            None => self.last_block().hash()?,
        };

        let block = Block {
            index: self.chain.len() as u64 + 1,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
            transactions: self.mempool.drain(),
            proof,
            previous_hash,
        };

        self.balances.apply_block(&block);
        self.chain.push(block.clone());
        self.epoch.fetch_add(1, Ordering::AcqRel);

        Ok(block)
    }

    pub fn last_block(&self) -> &Block {
        &self.chain[self.chain.len() - 1]
    }

    /// Bounds-checked lookup by 0-based position.
    pub fn get_block(&self, position: usize) -> Option<&Block> {
        self.chain.get(position)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn total_transactions(&self) -> usize {
        self.chain.iter().map(|b| b.transactions.len()).sum()
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        self.mempool.transactions()
    }

    pub fn balance(&self, address: &str) -> u64 {
        self.balances.get(address)
    }

    /// Balance minus whatever the address already has queued in the pool.
    pub fn spendable_balance(&self, address: &str) -> u64 {
        self.balances
            .get(address)
            .saturating_sub(self.mempool.pending_outgoing(address))
    }

    /// Credit `amount` to `address` outside of any block.
    pub fn seed_balance(&mut self, address: &str, amount: u64) {
        self.balances.seed(address, amount);
    }

    /// Queue an unsigned reward transaction for the next block.
    pub fn queue_reward(&mut self, recipient: &str, amount: u64) {
        self.mempool
            .add_transaction(Transaction::reward(recipient, amount));
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn epoch_handle(&self) -> Arc<AtomicU64> {
        self.epoch.clone()
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    /// Validate `chain` as a replacement for this ledger's chain and return
    /// the balances it would produce.
    pub fn check_chain(&self, chain: &[Block]) -> Result<Balances> {
        validate_chain(chain)?;
        self.balances.replay(chain)
    }

    /// Discard the local chain in favour of `chain`.
    ///
    /// The candidate must pass full validation, and replaying it over the
    /// genesis allocations must never overdraw a sender. Balances are rebuilt
    /// from the new chain, and pending transactions that were already sealed
    /// in it, or that the rebuilt balances no longer cover, are dropped. On
    /// error the ledger is unchanged.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<()> {
        let balances = self.check_chain(&chain)?;

        let mut sealed = HashSet::new();
        for block in &chain {
            for tx in &block.transactions {
                sealed.insert(tx.hash()?);
            }
        }

        let old_length = self.chain.len();
        self.chain = chain;
        self.balances = balances;

        let balances = &self.balances;
        let mut committed: HashMap<String, u64> = HashMap::new();
        let before = self.mempool.len();
        self.mempool.retain(|tx| {
            if tx.hash().map(|h| sealed.contains(&h)).unwrap_or(false) {
                return false;
            }
            if tx.is_reward() {
                return true;
            }
            let spent = committed.entry(tx.sender.clone()).or_insert(0);
            let needed = spent.saturating_add(tx.amount);
            if needed > balances.get(&tx.sender) {
                return false;
            }
            *spent = needed;
            true
        });

        self.epoch.fetch_add(1, Ordering::AcqRel);
        info!(
            old_length,
            new_length = self.chain.len(),
            pruned = before - self.mempool.len(),
            "ledger.chain_replaced"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::ProofOfWork;

    fn mine_onto(ledger: &mut Ledger) -> Block {
        let proof = ProofOfWork::solve(ledger.last_block().proof);
        ledger.new_block(proof, None).unwrap()
    }

    #[test]
    fn test_new_ledger_has_only_genesis() {
        let ledger = Ledger::new();
        assert_eq!(ledger.len(), 1);
        let genesis = ledger.last_block();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, GENESIS_PROOF);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.transactions.is_empty());
    }

    #[test]
    fn test_genesis_is_identical_across_ledgers() {
        let a = Ledger::new();
        let b = Ledger::new();
        assert_eq!(a.last_block().hash().unwrap(), b.last_block().hash().unwrap());
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let block = Block::genesis();
        let first = block.hash().unwrap();
        let second = block.clone().hash().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_ignores_key_order_of_source_json() {
        let block = Block::genesis();
        let reordered: Block = serde_json::from_str(
            r#"{"previous_hash":"1","proof":100,"transactions":[],"timestamp":1672531200000,"index":1}"#,
        )
        .unwrap();
        assert_eq!(block.hash().unwrap(), reordered.hash().unwrap());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let block = Block::genesis();
        let mut altered = block.clone();
        altered.proof += 1;
        assert_ne!(block.hash().unwrap(), altered.hash().unwrap());
    }

    #[test]
    fn test_new_block_links_to_previous_and_clears_pool() {
        let mut ledger = Ledger::new();
        ledger.queue_reward("miner", 1);
        let genesis_hash = ledger.last_block().hash().unwrap();

        let block = mine_onto(&mut ledger);

        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(block.transactions.len(), 1);
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(ledger.len(), 2);

        let third = mine_onto(&mut ledger);
        assert_eq!(third.previous_hash, block.hash().unwrap());
        assert!(third.transactions.is_empty());
    }

    #[test]
    fn test_new_block_uses_supplied_previous_hash() {
        let mut ledger = Ledger::new();
        let block = ledger.new_block(7, Some("abc".to_string())).unwrap();
        assert_eq!(block.previous_hash, "abc");
    }

    #[test]
    fn test_get_block_is_bounds_checked() {
        let mut ledger = Ledger::new();
        mine_onto(&mut ledger);

        assert_eq!(ledger.get_block(0).map(|b| b.index), Some(1));
        assert_eq!(ledger.get_block(1).map(|b| b.index), Some(2));
        assert!(ledger.get_block(2).is_none());
        assert!(ledger.get_block(5).is_none());
    }

    #[test]
    fn test_sealing_moves_balances() {
        let mut ledger = Ledger::with_allocations(HashMap::from([("alice".to_string(), 10)]));
        ledger.queue_reward("miner", 1);
        ledger
            .mempool
            .add_transaction(Transaction::new("alice".into(), "bob".into(), 4, None));

        mine_onto(&mut ledger);

        assert_eq!(ledger.balance("alice"), 6);
        assert_eq!(ledger.balance("bob"), 4);
        assert_eq!(ledger.balance("miner"), 1);
        assert_eq!(ledger.total_transactions(), 2);
    }

    #[test]
    fn test_epoch_advances_on_every_seal() {
        let mut ledger = Ledger::new();
        let handle = ledger.epoch_handle();
        assert_eq!(handle.load(Ordering::Acquire), 0);
        mine_onto(&mut ledger);
        mine_onto(&mut ledger);
        assert_eq!(ledger.epoch(), 2);
        assert_eq!(handle.load(Ordering::Acquire), 2);
    }

    #[test]
    fn test_replace_chain_rebuilds_balances_and_prunes_pool() {
        let mut remote = Ledger::with_allocations(HashMap::from([("alice".to_string(), 10)]));
        remote
            .mempool
            .add_transaction(Transaction::new("alice".into(), "bob".into(), 8, None));
        mine_onto(&mut remote);
        mine_onto(&mut remote);

        let mut local = Ledger::with_allocations(HashMap::from([("alice".to_string(), 10)]));
        // Already sealed remotely.
        local
            .mempool
            .add_transaction(Transaction::new("alice".into(), "bob".into(), 8, None));
        // No longer affordable once the remote chain is adopted.
        local
            .mempool
            .add_transaction(Transaction::new("alice".into(), "carol".into(), 5, None));
        local.queue_reward("miner", 1);

        local.replace_chain(remote.blocks().to_vec()).unwrap();

        assert_eq!(local.len(), 3);
        assert_eq!(local.balance("alice"), 2);
        assert_eq!(local.balance("bob"), 8);
        assert_eq!(local.pending_transactions().len(), 1);
        assert!(local.pending_transactions()[0].is_reward());
        assert_eq!(local.epoch(), 1);
    }

    #[test]
    fn test_replace_chain_rejects_overdrawing_transfer() {
        let mut remote = Ledger::with_allocations(HashMap::from([("alice".to_string(), 10)]));
        remote.mempool.add_transaction(Transaction::new(
            "alice".into(),
            "mallory".into(),
            1_000_000,
            None,
        ));
        mine_onto(&mut remote);
        mine_onto(&mut remote);

        let mut local = Ledger::with_allocations(HashMap::from([("alice".to_string(), 10)]));
        mine_onto(&mut local);
        let before = local.blocks().to_vec();

        assert!(local.replace_chain(remote.blocks().to_vec()).is_err());
        assert_eq!(local.blocks(), before.as_slice());
        assert_eq!(local.balance("alice"), 10);
        assert_eq!(local.balance("mallory"), 0);
        assert_eq!(local.epoch(), 1);
    }

    #[test]
    fn test_replace_chain_rejects_invalid_chain() {
        let mut remote = Ledger::new();
        mine_onto(&mut remote);
        let mut forged = remote.blocks().to_vec();
        forged[1].previous_hash = "deadbeef".to_string();

        let mut local = Ledger::new();
        assert!(local.replace_chain(forged).is_err());
        assert_eq!(local.len(), 1);
        assert_eq!(local.epoch(), 0);
    }
}
