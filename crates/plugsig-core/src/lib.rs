//! Embedded plugin signatures and server-side trust policy.
//!
//! Plugin files carry their signatures as a leading comment block:
//!
//! ```text
//! // signature|ed25519|<base64-public-key>: <base64-signature>
//! // signature|ed25519|<another-key>: <another-signature>
//! <plugin source>
//! ```
//!
//! Each signature covers the file with every signature line removed, so keys
//! can be layered on (or re-signed) independently.
//!
//! - [`envelope`]: parse, strip and format signature lines
//! - [`rewrite`]: add or replace one signer's line
//! - [`protocol`]: signing / verification capabilities (`ed25519` and `minisign` built in)
//! - [`config`] and [`registry`]: operator trust configuration
//! - [`policy`]: admit / reject decisions
//! - [`protection`]: the file-serving hook and the process-wide policy slot
//!
//! # Example
//!
//! ```
//! use plugsig_core::config::ProtectionConfig;
//! use plugsig_core::envelope::encode_public_key;
//! use plugsig_core::policy::{Evaluator, ProtectionPolicy};
//! use plugsig_core::protocol::{Capabilities, PrivateKey, SignatureSigner};
//! use plugsig_core::rewrite;
//!
//! # fn example(key: PrivateKey) -> anyhow::Result<()> {
//! let signed = rewrite::sign(b"export default {};\n", &key)?;
//!
//! let caps = Capabilities::builtin();
//! let config = ProtectionConfig::default().with_trusted_key(
//!     key.protocol(),
//!     encode_public_key(&key.public_key()),
//!     "Alice",
//!     None,
//! );
//! let policy = ProtectionPolicy::from_config(&config, &caps)?;
//!
//! let decision = Evaluator::new(Some(&policy), &caps).check(&signed, true)?;
//! assert!(decision.is_allowed());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod envelope;
pub mod error;
pub mod policy;
pub mod protection;
pub mod protocol;
pub mod registry;
pub mod rewrite;

pub use config::{ProtectionConfig, PublicKeyMetadata, PROTECTION_CONFIG_ENV};
pub use envelope::{
    format_signature_line, parse_all, strip_all, strip_matching, ParsedSignature,
    SCAN_WINDOW_LINES,
};
pub use error::{ConfigError, EnvelopeError, KeyError, SignError};
pub use policy::{Admission, Decision, Evaluator, ProtectionPolicy, RejectReason};
pub use protection::{check_file, is_plugin_path};
pub use protocol::{Capabilities, PrivateKey, Protocol, SignatureSigner, SignatureVerifier};
pub use registry::{KeyMetadata, TrustRegistry, TrustedKey};
