//! Signature verification service
//!
//! Validation consumes signatures through the boolean `SignatureVerifier`
//! seam. `Secp256k1Verifier` is the ECDSA implementation used by default:
//! the message is hashed with SHA-256, signatures are DER encoded and
//! public keys are SEC1 encoded.

use crate::error::{ConsensusError, Result};
use crate::types::{ByteString, Hash};
use secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

/// Boolean signature check: does `signature` authorize `message` for `public_key`?
pub trait SignatureVerifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&[u8], &[u8], &[u8]) -> bool,
{
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        self(public_key, message, signature)
    }
}

/// ECDSA over secp256k1
#[derive(Debug, Clone)]
pub struct Secp256k1Verifier {
    secp: Secp256k1<All>,
}

impl Secp256k1Verifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for Secp256k1Verifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let pubkey = match PublicKey::from_slice(public_key) {
            Ok(pk) => pk,
            Err(_) => return false,
        };

        let signature = match Signature::from_der(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };

        let digest = sha256_hash(message);
        let message = match Message::from_digest_slice(&digest) {
            Ok(msg) => msg,
            Err(_) => return false,
        };

        self.secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
    }
}

/// Sign `message` with `secret_key`, returning a DER signature
pub fn sign_message(secret_key: &[u8], message: &[u8]) -> Result<ByteString> {
    let secp = Secp256k1::signing_only();
    let key = SecretKey::from_slice(secret_key)
        .map_err(|e| ConsensusError::InvalidSignature(format!("bad secret key: {}", e)))?;

    let digest = sha256_hash(message);
    let message = Message::from_digest_slice(&digest)
        .map_err(|e| ConsensusError::InvalidSignature(e.to_string()))?;

    Ok(secp.sign_ecdsa(&message, &key).serialize_der().to_vec())
}

/// SEC1 compressed public key for `secret_key`
pub fn public_key_for(secret_key: &[u8]) -> Result<ByteString> {
    let secp = Secp256k1::signing_only();
    let key = SecretKey::from_slice(secret_key)
        .map_err(|e| ConsensusError::InvalidPublicKey(format!("bad secret key: {}", e)))?;
    Ok(PublicKey::from_secret_key(&secp, &key).serialize().to_vec())
}

/// Simple SHA256 hash function
pub(crate) fn sha256_hash(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}
