//! Trust policy evaluation.
//!
//! Turns the signatures found in a file into an admit / reject decision
//! against the operator's [`TrustRegistry`].
//!
//! # Rules
//!
//! 1. No signatures: allowed unless signing is required.
//! 2. Signatures are walked in file order; the first one whose
//!    `(protocol, public key)` is trusted is verified over the file with *all*
//!    signature lines removed.
//! 3. A trusted match is terminal. If it fails verification the file is
//!    rejected even when other (untrusted) signatures are present.
//! 4. No trusted match: rejected.

use std::fmt;
use std::path::Path;

use crate::config::ProtectionConfig;
use crate::envelope::{parse_all, strip_all, ParsedSignature};
use crate::error::{ConfigError, EnvelopeError};
use crate::protocol::Capabilities;
use crate::registry::TrustRegistry;

const POLICY_NOT_LOADED: &str = "protection config not loaded";

/// Validated protection settings, immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct ProtectionPolicy {
    registry: TrustRegistry,
    allow_unsigned: bool,
}

impl ProtectionPolicy {
    pub fn new(registry: TrustRegistry, allow_unsigned: bool) -> Self {
        Self {
            registry,
            allow_unsigned,
        }
    }

    /// Validate `config` and build the policy.
    pub fn from_config(
        config: &ProtectionConfig,
        capabilities: &Capabilities,
    ) -> Result<Self, ConfigError> {
        let registry = TrustRegistry::from_config(config, capabilities)?;
        Ok(Self::new(registry, config.allow_unsigned_plugins))
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path, capabilities: &Capabilities) -> Result<Self, ConfigError> {
        let config = ProtectionConfig::from_file(path)?;
        let policy = Self::from_config(&config, capabilities)?;
        tracing::info!(
            path = %path.display(),
            trusted_keys = policy.registry.len(),
            allow_unsigned = policy.allow_unsigned,
            "loaded protection config"
        );
        Ok(policy)
    }

    pub fn registry(&self) -> &TrustRegistry {
        &self.registry
    }

    pub fn allow_unsigned(&self) -> bool {
        self.allow_unsigned
    }
}

/// Why content was admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// No signature, and none was required.
    Unsigned,
    /// A trusted key's signature verified.
    Trusted {
        protocol: String,
        public_key_encoded: String,
        owner: String,
    },
    /// Protection does not apply (no policy, or not a plugin file).
    Exempt,
}

/// Why content was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingSignature,
    NoTrustedSignature,
    VerificationFailed { owner: String },
    UnsupportedProtocol(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSignature => f.write_str("missing signature"),
            Self::NoTrustedSignature => f.write_str("no signature from a trusted public key"),
            Self::VerificationFailed { owner } => {
                write!(f, "signature verification failed (key owner: {owner})")
            }
            Self::UnsupportedProtocol(protocol) => {
                write!(f, "unsupported signing protocol: {protocol}")
            }
        }
    }
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed(Admission),
    Rejected(RejectReason),
    /// The server cannot decide: protection is misconfigured.
    ConfigurationError(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed(Admission::Unsigned) => f.write_str("allowed: unsigned"),
            Self::Allowed(Admission::Exempt) => f.write_str("allowed: not protected"),
            Self::Allowed(Admission::Trusted {
                protocol, owner, ..
            }) => write!(f, "allowed: signed by {owner} ({protocol})"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
            Self::ConfigurationError(message) => write!(f, "configuration error: {message}"),
        }
    }
}

/// Applies a policy using a set of verification capabilities.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    policy: Option<&'a ProtectionPolicy>,
    capabilities: &'a Capabilities,
}

impl<'a> Evaluator<'a> {
    pub fn new(policy: Option<&'a ProtectionPolicy>, capabilities: &'a Capabilities) -> Self {
        Self {
            policy,
            capabilities,
        }
    }

    /// Parse `content` and evaluate it. Malformed envelopes are errors.
    pub fn check(&self, content: &[u8], require_signed: bool) -> Result<Decision, EnvelopeError> {
        let signatures = parse_all(content)?;
        Ok(self.evaluate(content, &signatures, require_signed))
    }

    /// Evaluate signatures already parsed from `content`.
    pub fn evaluate(
        &self,
        content: &[u8],
        signatures: &[ParsedSignature],
        require_signed: bool,
    ) -> Decision {
        if signatures.is_empty() && !require_signed {
            tracing::debug!("no signature, unsigned content allowed");
            return Decision::Allowed(Admission::Unsigned);
        }

        let Some(policy) = self.policy else {
            tracing::warn!("signature check requested without a protection config");
            return Decision::ConfigurationError(POLICY_NOT_LOADED.to_string());
        };

        if signatures.is_empty() {
            tracing::warn!("rejected: missing signature");
            return Decision::Rejected(RejectReason::MissingSignature);
        }

        let trusted = signatures.iter().find_map(|sig| {
            policy
                .registry
                .lookup(&sig.protocol, &sig.public_key)
                .map(|key| (sig, key))
        });
        let Some((signature, key)) = trusted else {
            tracing::warn!(
                signatures = signatures.len(),
                "rejected: no signature from a trusted public key"
            );
            return Decision::Rejected(RejectReason::NoTrustedSignature);
        };

        let Some(verifier) = self.capabilities.verifier(&signature.protocol) else {
            tracing::warn!(protocol = %signature.protocol, "rejected: no verifier for protocol");
            return Decision::Rejected(RejectReason::UnsupportedProtocol(
                signature.protocol.clone(),
            ));
        };

        let payload = strip_all(content);
        let owner = key.metadata.owner.clone();
        if !verifier.verify(&signature.public_key, &payload, &signature.signature) {
            tracing::warn!(
                protocol = %signature.protocol,
                owner = %owner,
                "rejected: signature verification failed"
            );
            return Decision::Rejected(RejectReason::VerificationFailed { owner });
        }

        tracing::info!(protocol = %signature.protocol, owner = %owner, "signature trusted");
        Decision::Allowed(Admission::Trusted {
            protocol: signature.protocol.clone(),
            public_key_encoded: signature.public_key_encoded.clone(),
            owner,
        })
    }
}
