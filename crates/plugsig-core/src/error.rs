//! Error types for envelope parsing, signing, key loading and configuration.
//!
//! Policy outcomes (admit / reject) are not errors; see [`crate::policy::Decision`].

use std::path::PathBuf;

/// A signature-shaped line violated the envelope grammar.
///
/// Line numbers are 1-based and count from the start of the scanned content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    /// Nothing to scan.
    #[error("content is empty")]
    EmptyContent,

    #[error("invalid signature format on line {line}: not valid UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("invalid signature format on line {line}: missing colon separator")]
    MissingSeparator { line: usize },

    #[error("invalid signature format on line {line}: expected 3 pipe-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("invalid signature format on line {line}: must start with 'signature'")]
    MissingTag { line: usize },

    #[error("invalid signature format on line {line}: missing signing protocol")]
    MissingProtocol { line: usize },

    #[error("invalid base64 public key on line {line}: {reason}")]
    InvalidPublicKey { line: usize, reason: String },

    #[error("invalid signature format on line {line}: missing public key")]
    EmptyPublicKey { line: usize },

    #[error("invalid base64 signature on line {line}: {reason}")]
    InvalidSignature { line: usize, reason: String },
}

/// Errors from rewriting an envelope with a new signature.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The existing envelope is malformed; signing on top of it would hide it.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("unsupported signing protocol: {0}")]
    UnsupportedProtocol(String),

    /// A signature line sits below payload content inside the scan window.
    #[error("signature on line {line} follows payload content; move all signature lines to the top of the file")]
    BuriedSignature { line: usize },

    /// Replacing older lines would move a signature line from past the
    /// scan window into it.
    #[error("signature on line {line} would move into the scan window once replaced signatures are dropped; remove it or move it to the top of the file")]
    ShiftedSignature { line: usize },

    #[error("too many signatures: envelope would exceed the {max}-line scan window")]
    EnvelopeFull { max: usize },

    /// The signing capability itself failed.
    #[error("failed to sign content: {reason}")]
    Signer { reason: String },
}

/// Errors from loading a private signing key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("unsupported signing protocol: {0}")]
    UnsupportedProtocol(String),

    /// The key is encrypted and no password was supplied.
    #[error("private key is encrypted; a password is required")]
    PasswordRequired,

    #[error("failed to decrypt private key (wrong password?)")]
    Decrypt,

    #[error("failed to load private key: {reason}")]
    Decode { reason: String },
}

/// Trust configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read protection config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse protection config: {message}")]
    Parse { message: String },

    #[error("signing protocol cannot be empty")]
    EmptyProtocol,

    #[error("unknown signing protocol: {0}")]
    UnknownProtocol(String),

    #[error("public key cannot be empty (protocol {protocol})")]
    EmptyPublicKey { protocol: String },

    #[error("invalid public key for protocol {protocol}: {reason}")]
    InvalidPublicKey { protocol: String, reason: String },

    #[error("owner metadata cannot be empty for public key: {key}")]
    MissingOwner { key: String },

    /// The process-wide policy slot was already filled.
    #[error("protection policy already installed")]
    AlreadyInstalled,
}

impl ConfigError {
    pub(crate) fn parse(err: impl std::fmt::Display) -> Self {
        Self::Parse {
            message: err.to_string(),
        }
    }
}
