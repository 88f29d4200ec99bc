//! File protection hook and the process-wide policy slot.
//!
//! A server loads its [`ProtectionPolicy`] once at startup, installs it here,
//! and consults it for every plugin file it is about to serve. The slot can be
//! filled exactly once; afterwards it is read-only.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::config::PROTECTION_CONFIG_ENV;
use crate::error::{ConfigError, EnvelopeError};
use crate::policy::{Admission, Decision, Evaluator, ProtectionPolicy};
use crate::protocol::Capabilities;

/// Files with this suffix are treated as signable plugins.
pub const PLUGIN_SUFFIX: &str = ".plug.js";

static ACTIVE_POLICY: OnceLock<Option<ProtectionPolicy>> = OnceLock::new();

/// Heuristic: only the suffix is inspected.
pub fn is_plugin_path(path: &str) -> bool {
    path.ends_with(PLUGIN_SUFFIX)
}

/// Decide whether `data` may be served from `path`.
///
/// Without a policy, or for non-plugin paths, protection does not apply.
/// Plugins must be signed unless the policy allows unsigned plugins.
pub fn check_file(
    policy: Option<&ProtectionPolicy>,
    capabilities: &Capabilities,
    path: &str,
    data: &[u8],
) -> Result<Decision, EnvelopeError> {
    let Some(policy) = policy else {
        return Ok(Decision::Allowed(Admission::Exempt));
    };
    if !is_plugin_path(path) {
        return Ok(Decision::Allowed(Admission::Exempt));
    }

    let decision =
        Evaluator::new(Some(policy), capabilities).check(data, !policy.allow_unsigned())?;
    tracing::debug!(path, %decision, "plugin protection check");
    Ok(decision)
}

/// Load the policy named by `PLUGSIG_PROTECTION_CONFIG`.
///
/// Unset or empty means protection is disabled (`Ok(None)`).
pub fn load_policy_from_env(
    capabilities: &Capabilities,
) -> Result<Option<ProtectionPolicy>, ConfigError> {
    match std::env::var_os(PROTECTION_CONFIG_ENV) {
        Some(path) if !path.is_empty() => {
            ProtectionPolicy::load(&PathBuf::from(path), capabilities).map(Some)
        }
        _ => Ok(None),
    }
}

/// Startup hook: load the policy from the environment and install it.
pub fn init_from_env(
    capabilities: &Capabilities,
) -> Result<Option<&'static ProtectionPolicy>, ConfigError> {
    let policy = load_policy_from_env(capabilities)?;
    if policy.is_none() {
        tracing::info!(env = PROTECTION_CONFIG_ENV, "plugin protection disabled");
    }
    install_policy(policy)
}

/// Fill the process-wide slot. Fails if it was already filled.
pub fn install_policy(
    policy: Option<ProtectionPolicy>,
) -> Result<Option<&'static ProtectionPolicy>, ConfigError> {
    ACTIVE_POLICY
        .set(policy)
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    Ok(active_policy())
}

/// The installed policy, if any.
pub fn active_policy() -> Option<&'static ProtectionPolicy> {
    ACTIVE_POLICY.get().and_then(Option::as_ref)
}

/// [`check_file`] against the installed policy.
pub fn check_file_with_active_policy(
    capabilities: &Capabilities,
    path: &str,
    data: &[u8],
) -> Result<Decision, EnvelopeError> {
    check_file(active_policy(), capabilities, path, data)
}
