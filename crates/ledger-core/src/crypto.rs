//! Signature capability consumed by validation and mining.
//!
//! The engine only ever asks "does this signature verify over this message
//! for this signer"; [`Secp256k1Verifier`] is the default answer, where a
//! signer is the hex-encoded SEC1 public key (compressed or uncompressed) and
//! a signature is the hex-encoded 64-byte compact ECDSA signature over
//! SHA-256 of the message.

use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey, VerifyOnly};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, signature: &str, message: &str, signer: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("secp256k1: {0}")]
    Secp(#[from] secp256k1::Error),
}

fn message_digest(message: &str) -> Result<Message, CryptoError> {
    let digest = Sha256::digest(message.as_bytes());
    Ok(Message::from_digest_slice(&digest)?)
}

pub struct Secp256k1Verifier {
    secp: Secp256k1<VerifyOnly>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }

    fn try_verify(&self, signature: &str, message: &str, signer: &str) -> Result<(), CryptoError> {
        let public_key = PublicKey::from_slice(&hex::decode(signer)?)?;
        let signature = Signature::from_compact(&hex::decode(signature)?)?;
        let message = message_digest(message)?;
        Ok(self.secp.verify_ecdsa(&message, &signature, &public_key)?)
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, signature: &str, message: &str, signer: &str) -> bool {
        self.try_verify(signature, message, signer).is_ok()
    }
}

fn secret_key(secret_key_hex: &str) -> Result<SecretKey, CryptoError> {
    Ok(SecretKey::from_slice(&hex::decode(secret_key_hex)?)?)
}

/// Sign `message` and return the compact signature as hex.
pub fn sign_message(secret_key_hex: &str, message: &str) -> Result<String, CryptoError> {
    let secp = Secp256k1::signing_only();
    let key = secret_key(secret_key_hex)?;
    let signature = secp.sign_ecdsa(&message_digest(message)?, &key);
    Ok(hex::encode(signature.serialize_compact()))
}

/// Uncompressed public key (the address form) for a secret key.
pub fn public_key_hex(secret_key_hex: &str) -> Result<String, CryptoError> {
    let secp = Secp256k1::signing_only();
    let key = secret_key(secret_key_hex)?;
    Ok(hex::encode(
        PublicKey::from_secret_key(&secp, &key).serialize_uncompressed(),
    ))
}
