/// Admission of transactions into the pending pool
use crate::blockchain::Ledger;
use crate::error::Result;
use crate::transaction::types::{Admission, Transaction};
use crate::wallet::WalletManager;
use tracing::debug;

impl Ledger {
    /// Admit `tx` into the pending pool.
    ///
    /// Checks run in order: the signature must verify against the sender's
    /// wallet, then the sender's spendable balance (balance minus amounts
    /// already pending) must cover `amount`. Rewards from the `"0"` sender
    /// skip both checks.
    pub fn admit(&mut self, wallets: &WalletManager, tx: Transaction) -> Result<Admission> {
        if !tx.is_reward() {
            let payload = tx.payload().to_bytes()?;
            let verified = match &tx.signature {
                Some(signature) => wallets.verify(&tx.sender, signature, &payload),
                None => false,
            };
            if !verified {
                debug!(sender = %tx.sender, "transaction.invalid_signature");
                return Ok(Admission::InvalidSignature);
            }

            let spendable = self.spendable_balance(&tx.sender);
            if spendable < tx.amount {
                debug!(
                    sender = %tx.sender,
                    spendable,
                    amount = tx.amount,
                    "transaction.insufficient_balance"
                );
                return Ok(Admission::InsufficientBalance);
            }
        }

        let index = self.last_block().index + 1;
        self.mempool.add_transaction(tx);
        Ok(Admission::Accepted(index))
    }
}
