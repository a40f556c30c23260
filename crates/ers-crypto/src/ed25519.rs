//! # Ed25519 Account Keys
//!
//! Key generation, signing and verification for externally owned accounts
//! and chips. A chip is just an account whose private key never leaves the
//! silicon; both derive their [`Address`] the same way.
//!
//! ## Security Invariant
//!
//! - Signing input is always a 32-byte digest ([`Bytes32`]). Callers hash
//!   their message through `ers_core::abi::Encoder` first, so every signer
//!   and verifier agrees on the preimage layout.
//! - Private keys are never serialized or logged. [`KeyPair`] does not
//!   implement `Serialize` and its `Debug` output is redacted.
//!
//! ## Address Derivation
//!
//! `address = last20(sha256(public_key))`.
//!
//! ## Serde
//!
//! Public keys and signatures serialize as `0x`-prefixed hex strings.

use ed25519_dalek::{Signer, Verifier};
use ers_core::{hex, sha256, Address, Bytes32};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CryptoError;
use crate::signature::{to_signed_message_hash, AccountSignature};

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

/// An Ed25519 key pair.
///
/// Does not implement `Serialize`: private keys must not end up in logs,
/// event records or CLI output.
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ── PublicKey ────────────────────────────────────────────────────────

impl PublicKey {
    /// Width in bytes.
    pub const LEN: usize = 32;

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `0x`-prefixed lower-case hex.
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }

    /// Parse from hex text, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        Ok(Self(hex::decode_fixed::<32>(s)?))
    }

    /// The account address controlled by this key.
    pub fn address(&self) -> Address {
        Address::from_word(&sha256(&self.0))
    }

    /// Convert to a dalek verifying key. Fails for bytes that are not a
    /// valid curve point.
    pub fn to_verifying_key(&self) -> Result<ed25519_dalek::VerifyingKey, CryptoError> {
        ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({}...)", hex::encode(&self.0[..4]))
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ── Signature ────────────────────────────────────────────────────────

impl Signature {
    /// Width in bytes.
    pub const LEN: usize = 64;

    /// Borrow the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// `0x`-prefixed lower-case hex.
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }

    /// Parse from hex text, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        Ok(Self(hex::decode_fixed::<64>(s)?))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0[..4]))
    }
}

// ── KeyPair ──────────────────────────────────────────────────────────

impl KeyPair {
    /// Generate a new random key pair from the OS RNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        Self { signing_key }
    }

    /// Create a key pair from a raw 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// The account address controlled by this key pair.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign a 32-byte digest directly.
    pub fn sign_digest(&self, digest: &Bytes32) -> Signature {
        Signature(self.signing_key.sign(digest.as_bytes()).to_bytes())
    }

    /// Produce an account signature over `digest` as-is.
    pub fn sign_hash(&self, digest: &Bytes32) -> AccountSignature {
        AccountSignature {
            public_key: self.public_key(),
            signature: self.sign_digest(digest),
        }
    }

    /// Produce an account signature over the signed-message hash of
    /// `digest`. This is what chips and project keys emit for custody,
    /// ownership and certificate proofs.
    pub fn sign_message(&self, digest: &Bytes32) -> AccountSignature {
        self.sign_hash(&to_signed_message_hash(digest))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyPair(<private>, address={})", self.address())
    }
}

// ── Verification ─────────────────────────────────────────────────────

/// Verify an Ed25519 signature over a 32-byte digest.
pub fn verify(
    digest: &Bytes32,
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<(), CryptoError> {
    let vk = public_key.to_verifying_key()?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(digest.as_bytes(), &sig)
        .map_err(|e| CryptoError::KeyError(format!("Ed25519 verification failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(tag: &[u8]) -> Bytes32 {
        sha256(tag)
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let d = digest(b"hello");
        let sig = kp.sign_digest(&d);
        verify(&d, &sig, &kp.public_key()).expect("valid signature should verify");
    }

    #[test]
    fn test_verify_wrong_key_fails() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();
        let d = digest(b"m");
        let sig = kp1.sign_digest(&d);
        assert!(verify(&d, &sig, &kp2.public_key()).is_err());
    }

    #[test]
    fn test_verify_wrong_message_fails() {
        let kp = KeyPair::generate();
        let sig = kp.sign_digest(&digest(b"original"));
        assert!(verify(&digest(b"tampered"), &sig, &kp.public_key()).is_err());
    }

    #[test]
    fn test_deterministic_from_seed() {
        let kp1 = KeyPair::from_seed(&[42u8; 32]);
        let kp2 = KeyPair::from_seed(&[42u8; 32]);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.address(), kp2.address());
        let d = digest(b"x");
        assert_eq!(kp1.sign_digest(&d), kp2.sign_digest(&d));
    }

    #[test]
    fn test_address_is_last_20_bytes_of_key_hash() {
        let kp = KeyPair::from_seed(&[1u8; 32]);
        let h = sha256(kp.public_key().as_bytes());
        assert_eq!(kp.address().as_bytes()[..], h.as_bytes()[12..]);
    }

    #[test]
    fn test_public_key_serde_json() {
        let pk = KeyPair::generate().public_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 2 + 2 + 64);
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let kp = KeyPair::generate();
        let sig = kp.sign_digest(&digest(b"y"));
        let parsed = Signature::from_hex(&sig.to_hex()).unwrap();
        assert_eq!(parsed, sig);
    }

    #[test]
    fn test_public_key_invalid_hex() {
        assert!(PublicKey::from_hex("not-hex").is_err());
        assert!(PublicKey::from_hex("aabb").is_err());
    }

    #[test]
    fn test_keypair_debug_redacts_private_key() {
        let kp = KeyPair::from_seed(&[9u8; 32]);
        let dbg = format!("{kp:?}");
        assert!(dbg.contains("<private>"));
        assert!(!dbg.contains(&hex::encode(&[9u8; 32])));
    }
}
