/// Transaction types for the ledger
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sender address that marks a newly issued mining reward.
pub const REWARD_SENDER: &str = "0";

/// A transfer of `amount` from `sender` to `recipient`.
///
/// Every transfer except a mining reward carries an RSA-PSS signature over
/// [`TransferPayload::to_bytes`], made with the sender wallet's key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    #[serde(
        default,
        with = "signature_hex",
        skip_serializing_if = "Option::is_none"
    )]
    pub signature: Option<Vec<u8>>,
}

impl Transaction {
    pub fn new(sender: String, recipient: String, amount: u64, signature: Option<Vec<u8>>) -> Self {
        Self {
            sender,
            recipient,
            amount,
            signature,
        }
    }

    /// An unsigned reward issuing `amount` to `recipient`.
    pub fn reward(recipient: impl Into<String>, amount: u64) -> Self {
        Self::new(REWARD_SENDER.to_string(), recipient.into(), amount, None)
    }

    pub fn is_reward(&self) -> bool {
        self.sender == REWARD_SENDER
    }

    pub fn payload(&self) -> TransferPayload {
        TransferPayload {
            sender: self.sender.clone(),
            recipient: self.recipient.clone(),
            amount: self.amount,
        }
    }

    /// Hex SHA-256 of the serialized transaction, signature included.
    pub fn hash(&self) -> Result<String> {
        let encoded = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&encoded)))
    }
}

/// The exact data a wallet signs for a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPayload {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
}

impl TransferPayload {
    /// Compact JSON with fields in declaration order: sender, recipient, amount.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Outcome of submitting a transaction to the pending pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Queued; the value is the index of the block it is expected to land in.
    /// Advisory only: a concurrent seal or chain replacement can move it.
    Accepted(u64),
    InvalidSignature,
    InsufficientBalance,
}

mod signature_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        signature: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match signature {
            Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|s| hex::decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
