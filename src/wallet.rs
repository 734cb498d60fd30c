//! Wallet key management
//!
//! The node keeps every wallet it generates, private half included, and signs
//! on the owner's behalf. Anyone who can reach the signing endpoint can spend
//! from any such wallet. Clients that want to keep their private key can
//! register only the public half with [`WalletManager::import_public_key`]
//! and submit their own signatures.

use crate::crypto::{self, Address, KeyPair, DEFAULT_KEY_BITS};
use crate::error::{ChainError, Result};
use parking_lot::RwLock;
use rsa::RsaPublicKey;
use std::collections::HashMap;
use tracing::{debug, info};

enum WalletKeys {
    /// Generated by this node; can sign.
    Held(KeyPair),
    /// Imported public key; verify only.
    Imported(RsaPublicKey),
}

impl WalletKeys {
    fn public_key(&self) -> &RsaPublicKey {
        match self {
            WalletKeys::Held(keypair) => keypair.public_key(),
            WalletKeys::Imported(public_key) => public_key,
        }
    }
}

pub struct WalletManager {
    key_bits: usize,
    wallets: RwLock<HashMap<Address, WalletKeys>>,
}

impl Default for WalletManager {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_BITS)
    }
}

impl WalletManager {
    pub fn new(key_bits: usize) -> Self {
        Self {
            key_bits,
            wallets: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh key pair and return its address. CPU heavy: call from a
    /// blocking context.
    pub fn generate_wallet(&self) -> Result<Address> {
        let keypair = KeyPair::generate(self.key_bits)?;
        let address = keypair.address()?;
        self.wallets
            .write()
            .insert(address.clone(), WalletKeys::Held(keypair));
        info!(address = %address, "wallet.created");
        Ok(address)
    }

    /// Register a client-held public key (PEM) and return its address.
    pub fn import_public_key(&self, pem: &str) -> Result<Address> {
        let public_key = crypto::public_key_from_pem(pem)?;
        let address = crypto::address_of(&public_key)?;
        let mut wallets = self.wallets.write();
        if !wallets.contains_key(&address) {
            wallets.insert(address.clone(), WalletKeys::Imported(public_key));
            info!(address = %address, "wallet.imported");
        }
        Ok(address)
    }

    /// Sign `payload` with the private key of `address`.
    pub fn sign(&self, address: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let wallets = self.wallets.read();
        match wallets.get(address) {
            Some(WalletKeys::Held(keypair)) => keypair.sign(payload),
            Some(WalletKeys::Imported(_)) => Err(ChainError::CryptoError(format!(
                "No private key held for wallet {}",
                address
            ))),
            None => Err(ChainError::WalletNotFound(address.to_string())),
        }
    }

    /// Whether `signature` is a valid signature of `payload` by `address`.
    /// Unknown addresses and malformed signatures are simply invalid.
    pub fn verify(&self, address: &str, signature: &[u8], payload: &[u8]) -> bool {
        let wallets = self.wallets.read();
        let Some(keys) = wallets.get(address) else {
            debug!(address, "verify against unknown wallet");
            return false;
        };
        match crypto::verify_signature(keys.public_key(), payload, signature) {
            Ok(()) => true,
            Err(e) => {
                debug!(address, error = %e, "signature rejected");
                false
            }
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.wallets.read().contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.wallets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.read().is_empty()
    }
}
