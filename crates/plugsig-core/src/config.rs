//! Protection configuration file (TOML).
//!
//! ```toml
//! allow_unsigned_plugins = false
//!
//! [trusted_public_keys.ed25519]
//! "<base64 public key>" = { owner = "Alice", info = "release key" }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming the protection config file.
pub const PROTECTION_CONFIG_ENV: &str = "PLUGSIG_PROTECTION_CONFIG";

/// Raw, unvalidated protection configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtectionConfig {
    /// Serve plugins that carry no signature at all.
    #[serde(default)]
    pub allow_unsigned_plugins: bool,

    /// protocol -> encoded public key -> metadata
    #[serde(default)]
    pub trusted_public_keys: BTreeMap<String, BTreeMap<String, PublicKeyMetadata>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublicKeyMetadata {
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl ProtectionConfig {
    /// Read and parse a config file. Does not validate keys; see
    /// [`ProtectionPolicy::from_config`](crate::policy::ProtectionPolicy::from_config).
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::parse)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(ConfigError::parse)
    }

    /// Add a trusted key entry.
    pub fn with_trusted_key(
        mut self,
        protocol: impl Into<String>,
        public_key_encoded: impl Into<String>,
        owner: impl Into<String>,
        info: Option<&str>,
    ) -> Self {
        self.trusted_public_keys
            .entry(protocol.into())
            .or_default()
            .insert(
                public_key_encoded.into(),
                PublicKeyMetadata {
                    owner: owner.into(),
                    info: info.map(str::to_string),
                },
            );
        self
    }

    pub fn allow_unsigned(mut self, allow: bool) -> Self {
        self.allow_unsigned_plugins = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
allow_unsigned_plugins = true

[trusted_public_keys.ed25519]
"O2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik=" = { owner = "Alice", info = "release key" }
"A6EHv/POEL4dcN0Y50vAmWfk1jCbpQ1fHdyGZBJVMbg=" = { owner = "Bob" }
"#;

    #[test]
    fn test_parse_config_toml() {
        let config = ProtectionConfig::from_toml(SAMPLE).unwrap();
        assert!(config.allow_unsigned_plugins);

        let keys = &config.trusted_public_keys["ed25519"];
        assert_eq!(keys.len(), 2);
        let alice = &keys["O2onvM62pC1io6jQKm8Nc2UyFXcd4kOmOsBIoYtZ2ik="];
        assert_eq!(alice.owner, "Alice");
        assert_eq!(alice.info.as_deref(), Some("release key"));
        assert!(keys["A6EHv/POEL4dcN0Y50vAmWfk1jCbpQ1fHdyGZBJVMbg="]
            .info
            .is_none());
    }

    #[test]
    fn test_defaults() {
        let config = ProtectionConfig::from_toml("").unwrap();
        assert!(!config.allow_unsigned_plugins);
        assert!(config.trusted_public_keys.is_empty());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ProtectionConfig::from_toml("allow_unsigned = true").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_owner_field_rejected() {
        let toml = "[trusted_public_keys.ed25519]\n\"AAAA\" = { info = \"x\" }\n";
        let err = ProtectionConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("owner"));
    }

    #[test]
    fn test_toml_roundtrip_through_builder() {
        let config = ProtectionConfig::default()
            .with_trusted_key("ed25519", "AAAA", "Carol", None)
            .allow_unsigned(true);
        let text = config.to_toml().unwrap();
        assert_eq!(ProtectionConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("protection.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = ProtectionConfig::from_file(&path).unwrap();
        assert_eq!(config.trusted_public_keys["ed25519"].len(), 2);

        let err = ProtectionConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
