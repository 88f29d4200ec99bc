//! Trusted key registry.
//!
//! Built once from a validated [`ProtectionConfig`] and never mutated
//! afterwards, so it can be shared by every verification call without locks.

use std::collections::HashMap;

use crate::config::ProtectionConfig;
use crate::error::ConfigError;
use crate::protocol::Capabilities;

/// Operator-supplied metadata for a trusted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMetadata {
    pub owner: String,
    pub info: Option<String>,
}

/// A trusted key as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    /// Encoded form exactly as written in the configuration.
    pub public_key_encoded: String,
    pub metadata: KeyMetadata,
}

/// Protocol -> decoded public key -> trusted key.
#[derive(Debug, Clone, Default)]
pub struct TrustRegistry {
    keys: HashMap<String, HashMap<Vec<u8>, TrustedKey>>,
}

impl TrustRegistry {
    /// A registry that trusts nobody.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate `config` and build the registry.
    ///
    /// Every protocol must be supported by `capabilities`, every key must
    /// decode and pass the protocol's structural check, and every owner must
    /// be non-empty. The first violation is returned.
    pub fn from_config(
        config: &ProtectionConfig,
        capabilities: &Capabilities,
    ) -> Result<Self, ConfigError> {
        let mut keys: HashMap<String, HashMap<Vec<u8>, TrustedKey>> = HashMap::new();

        for (protocol, entries) in &config.trusted_public_keys {
            if protocol.is_empty() {
                return Err(ConfigError::EmptyProtocol);
            }
            let verifier = capabilities
                .verifier(protocol)
                .ok_or_else(|| ConfigError::UnknownProtocol(protocol.clone()))?;

            let by_key = keys.entry(protocol.clone()).or_default();
            for (encoded, meta) in entries {
                if encoded.is_empty() {
                    return Err(ConfigError::EmptyPublicKey {
                        protocol: protocol.clone(),
                    });
                }

                let decoded = verifier.decode_config_key(encoded).map_err(|reason| {
                    ConfigError::InvalidPublicKey {
                        protocol: protocol.clone(),
                        reason,
                    }
                })?;
                verifier.validate_public_key(&decoded).map_err(|reason| {
                    ConfigError::InvalidPublicKey {
                        protocol: protocol.clone(),
                        reason,
                    }
                })?;

                if meta.owner.trim().is_empty() {
                    return Err(ConfigError::MissingOwner {
                        key: encoded.clone(),
                    });
                }

                by_key.insert(
                    decoded,
                    TrustedKey {
                        public_key_encoded: encoded.clone(),
                        metadata: KeyMetadata {
                            owner: meta.owner.clone(),
                            info: meta.info.clone(),
                        },
                    },
                );
            }
        }

        let registry = Self { keys };
        tracing::debug!(keys = registry.len(), "trust registry built");
        Ok(registry)
    }

    pub fn lookup(&self, protocol: &str, public_key: &[u8]) -> Option<&TrustedKey> {
        self.keys.get(protocol)?.get(public_key)
    }

    pub fn is_trusted(&self, protocol: &str, public_key: &[u8]) -> bool {
        self.lookup(protocol, public_key).is_some()
    }

    /// Total number of trusted keys across protocols.
    pub fn len(&self) -> usize {
        self.keys.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
