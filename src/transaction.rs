//! Transaction module split into types and admission

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Ledger;
    use crate::miner::ProofOfWork;
    use crate::wallet::WalletManager;

    struct Fixture {
        wallets: WalletManager,
        ledger: Ledger,
        alice: String,
    }

    fn fixture(alice_balance: u64) -> Fixture {
        let wallets = WalletManager::new(1024);
        let alice = wallets.generate_wallet().unwrap();
        let mut ledger = Ledger::new();
        ledger.seed_balance(&alice, alice_balance);
        Fixture {
            wallets,
            ledger,
            alice,
        }
    }

    fn signed(f: &Fixture, recipient: &str, amount: u64) -> Transaction {
        let payload = TransferPayload {
            sender: f.alice.clone(),
            recipient: recipient.to_string(),
            amount,
        };
        let signature = f.wallets.sign(&f.alice, &payload.to_bytes().unwrap()).unwrap();
        Transaction::new(f.alice.clone(), recipient.to_string(), amount, Some(signature))
    }

    #[test]
    fn test_payload_encoding_has_fixed_field_order() {
        let payload = TransferPayload {
            sender: "a".into(),
            recipient: "b".into(),
            amount: 5,
        };
        assert_eq!(
            payload.to_bytes().unwrap(),
            br#"{"sender":"a","recipient":"b","amount":5}"#.to_vec()
        );
    }

    #[test]
    fn test_signature_serializes_as_hex() {
        let tx = Transaction::new("a".into(), "b".into(), 1, Some(vec![0xde, 0xad]));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["signature"], "dead");

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);

        let reward = serde_json::to_value(Transaction::reward("m", 1)).unwrap();
        assert!(reward.get("signature").is_none());
    }

    #[test]
    fn test_valid_transaction_is_accepted_for_next_block() {
        let mut f = fixture(10);
        let tx = signed(&f, "bob", 4);

        let outcome = f.ledger.admit(&f.wallets, tx).unwrap();

        assert_eq!(outcome, Admission::Accepted(2));
        assert_eq!(f.ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn test_invalid_signature_rejected_even_with_funds() {
        let mut f = fixture(100);
        let mut tx = signed(&f, "bob", 4);
        tx.amount = 5;

        assert_eq!(
            f.ledger.admit(&f.wallets, tx).unwrap(),
            Admission::InvalidSignature
        );

        let unsigned = Transaction::new(f.alice.clone(), "bob".into(), 1, None);
        assert_eq!(
            f.ledger.admit(&f.wallets, unsigned).unwrap(),
            Admission::InvalidSignature
        );

        let garbage = Transaction::new(f.alice.clone(), "bob".into(), 1, Some(vec![1, 2, 3]));
        assert_eq!(
            f.ledger.admit(&f.wallets, garbage).unwrap(),
            Admission::InvalidSignature
        );
        assert!(f.ledger.pending_transactions().is_empty());
    }

    #[test]
    fn test_insufficient_balance_rejected_with_valid_signature() {
        let mut f = fixture(3);
        let tx = signed(&f, "bob", 4);
        assert_eq!(
            f.ledger.admit(&f.wallets, tx).unwrap(),
            Admission::InsufficientBalance
        );
        assert!(f.ledger.pending_transactions().is_empty());
    }

    #[test]
    fn test_signature_is_checked_before_balance() {
        let mut f = fixture(0);
        let tx = Transaction::new(f.alice.clone(), "bob".into(), 4, Some(vec![0; 128]));
        assert_eq!(
            f.ledger.admit(&f.wallets, tx).unwrap(),
            Admission::InvalidSignature
        );
    }

    #[test]
    fn test_pending_spends_count_against_balance() {
        let mut f = fixture(10);
        let first = signed(&f, "bob", 6);
        let second = signed(&f, "carol", 6);

        assert_eq!(
            f.ledger.admit(&f.wallets, first).unwrap(),
            Admission::Accepted(2)
        );
        assert_eq!(
            f.ledger.admit(&f.wallets, second).unwrap(),
            Admission::InsufficientBalance
        );
    }

    #[test]
    fn test_rewards_skip_signature_and_balance() {
        let mut f = fixture(0);
        let outcome = f
            .ledger
            .admit(&f.wallets, Transaction::reward("miner", 1))
            .unwrap();
        assert_eq!(outcome, Admission::Accepted(2));
    }

    #[test]
    fn test_accepted_transfer_is_settled_on_seal() {
        let mut f = fixture(10);
        let tx = signed(&f, "bob", 4);
        f.ledger.admit(&f.wallets, tx).unwrap();

        let proof = ProofOfWork::solve(f.ledger.last_block().proof);
        let block = f.ledger.new_block(proof, None).unwrap();

        assert_eq!(block.transactions.len(), 1);
        assert_eq!(f.ledger.balance(&f.alice), 6);
        assert_eq!(f.ledger.balance("bob"), 4);
    }
}
