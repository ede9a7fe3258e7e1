//! Error types for key derivation, script handling and account bookkeeping

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Seed length out of range: {0} bytes")]
    SeedLength(usize),

    #[error("Key out of range: {0}")]
    KeyRange(String),

    /// Invalid child during BIP32 derivation. Rare and recoverable.
    #[error("Parameter out of range: {0}")]
    ParameterRange(String),

    #[error("Cannot derive a hardened child from a public key")]
    DeriveHardFromPublic,

    #[error("Cannot derive past the maximum key depth")]
    MaxDepthExceeded,

    #[error("Extended key is not private")]
    NotPrivate,

    #[error("Unknown address: {0}")]
    UnknownAddress(String),

    #[error("Script parse failed: {0}")]
    ScriptParse(String),

    #[error("Unsupported script: {0}")]
    UnsupportedScript(String),

    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    #[error("Signature component is zero: {0}")]
    ZeroSignatureComponent(&'static str),

    #[error("Invalid public key: {0}")]
    InvalidPubKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid extended key: {0}")]
    InvalidExtendedKey(String),

    #[error("Wrong network: {0}")]
    WrongNetwork(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("SigHashSingle index {index} out of range for {outputs} outputs")]
    InvalidSigHashSingleIndex { index: usize, outputs: usize },

    #[error("Input index {index} out of range for {inputs} inputs")]
    InvalidInputIndex { index: usize, inputs: usize },

    #[error("Passphrase must not be empty")]
    EmptyPassphrase,

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Key derivation function failed: {0}")]
    Kdf(String),

    #[error("Account is closed")]
    AccountClosed,

    #[error("Account not found: {0}")]
    AccountNotFound(usize),

    #[error("Address index mismatch: {0}")]
    IndexMismatch(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, WalletError>;

/// Outcome of an operation whose failure mode is expected and recoverable.
///
/// `Retry` carries a deterministic stand-in value the caller may use in place
/// of the real result. Fatal failures travel in the surrounding [`Result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derived<T> {
    Ok(T),
    Retry(T),
}

impl<T> Derived<T> {
    pub fn into_inner(self) -> T {
        match self {
            Derived::Ok(v) | Derived::Retry(v) => v,
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Derived::Retry(_))
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::Serialization(e.to_string())
    }
}
