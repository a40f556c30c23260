//! # Signer-Agnostic Signature Verification
//!
//! `isValidSignatureNow(signer, hash, signature)` for the two kinds of
//! signer the registry accepts:
//!
//! - **Raw keys.** The signature bytes are an [`AccountSignature`]: the
//!   96-byte concatenation `public_key || ed25519_signature`. It is valid
//!   when `address(public_key) == signer` and the Ed25519 signature verifies
//!   over `hash`.
//! - **Contracts.** If `signer` has a [`ContractSigner`] registered, the
//!   decision is delegated to it (EIP-1271 style). A contract signer can
//!   implement any policy: multisig, session keys, hardware wallets.
//!
//! ## Signed Messages
//!
//! Chips and project keys never sign a protocol hash directly. They sign
//! [`to_signed_message_hash`] of it, which domain-separates registry proofs
//! from any other payload the same key might sign.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use ers_core::{sha256, Address, Bytes32};

use crate::ed25519::{self, PublicKey, Signature};
use crate::error::CryptoError;

/// Prefix bound into every signed-message hash.
pub const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19ERS Signed Message:\n32";

/// `sha256(prefix || hash)`.
pub fn to_signed_message_hash(hash: &Bytes32) -> Bytes32 {
    let mut buf = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 32);
    buf.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    buf.extend_from_slice(hash.as_bytes());
    sha256(&buf)
}

/// A raw-key signature carrying the signer's public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountSignature {
    /// Key that produced the signature.
    pub public_key: PublicKey,
    /// The Ed25519 signature.
    pub signature: Signature,
}

impl AccountSignature {
    /// Wire width: 32-byte key plus 64-byte signature.
    pub const LEN: usize = PublicKey::LEN + Signature::LEN;

    /// Concatenate key and signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::LEN);
        out.extend_from_slice(self.public_key.as_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out
    }

    /// Split a 96-byte blob into key and signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != Self::LEN {
            return Err(CryptoError::SignatureLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut pk = [0u8; 32];
        pk.copy_from_slice(&bytes[..32]);
        let mut sig = [0u8; 64];
        sig.copy_from_slice(&bytes[32..]);
        Ok(Self {
            public_key: PublicKey(pk),
            signature: Signature(sig),
        })
    }

    /// The address this signature claims to come from.
    pub fn signer(&self) -> Address {
        self.public_key.address()
    }

    /// Whether this signature is `signer`'s over `hash`.
    pub fn verify(&self, signer: &Address, hash: &Bytes32) -> bool {
        self.signer() == *signer && ed25519::verify(hash, &self.signature, &self.public_key).is_ok()
    }
}

/// A contract account that validates signatures on its own terms.
pub trait ContractSigner: Send + Sync {
    /// Whether `signature` is acceptable for `hash` right now.
    fn is_valid_signature(&self, hash: &Bytes32, signature: &[u8]) -> bool;
}

/// A contract wallet that accepts a raw-key signature from any one of a
/// fixed set of owner addresses.
#[derive(Debug, Clone, Default)]
pub struct OwnerSetWallet {
    owners: BTreeSet<Address>,
}

impl OwnerSetWallet {
    /// Create a wallet controlled by `owners`.
    pub fn new(owners: impl IntoIterator<Item = Address>) -> Self {
        Self {
            owners: owners.into_iter().collect(),
        }
    }

    /// Whether `address` controls this wallet.
    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }
}

impl ContractSigner for OwnerSetWallet {
    fn is_valid_signature(&self, hash: &Bytes32, signature: &[u8]) -> bool {
        match AccountSignature::from_bytes(signature) {
            Ok(sig) => {
                let signer = sig.signer();
                self.is_owner(&signer) && sig.verify(&signer, hash)
            }
            Err(_) => false,
        }
    }
}

/// Dispatches signature checks to raw-key or contract verification.
#[derive(Clone, Default)]
pub struct SignatureChecker {
    contracts: HashMap<Address, Arc<dyn ContractSigner>>,
}

impl SignatureChecker {
    /// A checker that knows no contract signers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `signer` as the contract deployed at `address`.
    pub fn register_contract(&mut self, address: Address, signer: Arc<dyn ContractSigner>) {
        tracing::debug!(address = %address, "contract signer registered");
        self.contracts.insert(address, signer);
    }

    /// Whether `address` is a registered contract signer.
    pub fn is_contract(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Whether `signature` is a valid signature by `signer` over `hash`.
    pub fn is_valid_signature_now(&self, signer: &Address, hash: &Bytes32, signature: &[u8]) -> bool {
        if signer.is_zero() {
            return false;
        }
        if let Some(contract) = self.contracts.get(signer) {
            return contract.is_valid_signature(hash, signature);
        }
        match AccountSignature::from_bytes(signature) {
            Ok(sig) => sig.verify(signer, hash),
            Err(e) => {
                tracing::debug!(signer = %signer, error = %e, "malformed account signature");
                false
            }
        }
    }
}

impl fmt::Debug for SignatureChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureChecker")
            .field("contracts", &self.contracts.keys().collect::<Vec<_>>())
            .finish()
    }
}
