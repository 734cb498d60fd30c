//! Cryptographic primitives for the ledger
//!
//! Wallets are RSA key pairs. An address is the hex SHA-256 of the public key
//! in SubjectPublicKeyInfo PEM form, and transfers are signed with RSASSA-PSS
//! over SHA-256 (MGF1-SHA-256, maximum salt length for the key).

use crate::error::{ChainError, Result};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

pub const DEFAULT_KEY_BITS: usize = 2048;
/// Smallest modulus accepted for new wallets.
pub const MIN_KEY_BITS: usize = 1024;

/// Hex wallet address.
pub type Address = String;

/// Derive the address of a public key.
pub fn address_of(public_key: &RsaPublicKey) -> Result<Address> {
    let pem = public_key_to_pem(public_key)?;
    Ok(hex::encode(Sha256::digest(pem.as_bytes())))
}

pub fn public_key_to_pem(public_key: &RsaPublicKey) -> Result<String> {
    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| ChainError::CryptoError(format!("Failed to encode public key: {}", e)))
}

pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| ChainError::CryptoError(format!("Invalid public key: {}", e)))
}

/// Largest PSS salt the key admits: `emLen - hLen - 2`, with
/// `emLen = ceil((modBits - 1) / 8)`.
pub fn max_salt_len(public_key: &RsaPublicKey) -> usize {
    let em_len = (public_key.n().bits() + 6) / 8;
    em_len.saturating_sub(<Sha256 as Digest>::output_size() + 2)
}

fn pss(public_key: &RsaPublicKey) -> Pss {
    Pss::new_with_salt::<Sha256>(max_salt_len(public_key))
}

pub struct KeyPair {
    secret_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl KeyPair {
    /// Generates a new RSA key pair with a `bits`-bit modulus using the OS RNG.
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_KEY_BITS {
            return Err(ChainError::CryptoError(format!(
                "Key size must be at least {} bits, got {}",
                MIN_KEY_BITS, bits
            )));
        }
        let secret_key = RsaPrivateKey::new(&mut OsRng, bits)?;
        let public_key = RsaPublicKey::from(&secret_key);
        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn address(&self) -> Result<Address> {
        address_of(&self.public_key)
    }

    /// Signs SHA-256 of `message`. PSS is randomized, so two signatures over
    /// the same message differ.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha256::digest(message);
        Ok(self
            .secret_key
            .sign_with_rng(&mut OsRng, pss(&self.public_key), &digest)?)
    }
}

/// Verifies a PSS signature over `message` with `public_key`.
pub fn verify_signature(public_key: &RsaPublicKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let digest = Sha256::digest(message);
    public_key
        .verify(pss(public_key), &digest, signature)
        .map_err(|_| ChainError::CryptoError("Signature verification failed".to_string()))
}
