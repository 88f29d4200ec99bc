//! Signature envelope codec.
//!
//! An envelope is zero or more comment lines at the top of a plugin file:
//!
//! ```text
//! // signature|<protocol>|<base64-public-key>: <base64-signature>
//! ```
//!
//! Only the first [`SCAN_WINDOW_LINES`] lines are examined. Everything that is
//! not a signature line is payload and is preserved byte-for-byte.

mod lines;
mod parse;
mod strip;


use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

pub use parse::parse_all;
pub use strip::{strip_all, strip_matching, MATCH_PREFIX_LIMIT};

pub(crate) use lines::WindowLines;
pub(crate) use strip::split_envelope;

/// Number of logical lines scanned for signatures.
pub const SCAN_WINDOW_LINES: usize = 50;

/// Leading comment marker of a signature line.
pub const COMMENT_MARKER: &str = "//";

/// First pipe-separated field of every signature line.
pub const SIGNATURE_TAG: &str = "signature";

/// Trimmed prefix that makes a line a signature line.
pub(crate) const LINE_PREFIX: &[u8] = b"// signature|";

/// One signature found in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    /// Signing scheme token, e.g. `ed25519`.
    pub protocol: String,

    /// Public key exactly as written in the file.
    pub public_key_encoded: String,

    /// Decoded public key bytes (never empty).
    pub public_key: Vec<u8>,

    /// Signature exactly as written in the file.
    pub signature_encoded: String,

    /// Decoded signature bytes. May be empty; schemes reject that at verify time.
    pub signature: Vec<u8>,

    /// Original line text without its `\n`.
    pub source_line: String,
}

/// Encode a public key the way it appears in signature lines and configuration.
pub fn encode_public_key(public_key: &[u8]) -> String {
    BASE64.encode(public_key)
}

/// Render one signature line, including the trailing newline.
pub fn format_signature_line(protocol: &str, public_key: &[u8], signature: &[u8]) -> String {
    format!(
        "{COMMENT_MARKER} {SIGNATURE_TAG}|{protocol}|{}: {}\n",
        encode_public_key(public_key),
        BASE64.encode(signature)
    )
}
