//! Error types for ledger helpers
//!
//! Invalid blocks and transactions are not errors: they are reported through
//! `ValidationResult` and boolean outcomes. These variants cover the helper
//! surface (signing, configuration) where the caller passed something unusable.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("Transaction validation failed: {0}")]
    TransactionValidation(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ConsensusError {
    fn from(err: serde_json::Error) -> Self {
        ConsensusError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
