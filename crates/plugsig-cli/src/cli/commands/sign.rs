//! `plugsig sign` - Add (or replace) this key's signature on a plugin.

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::{Confirm, Password};
use std::fs;
use std::path::{Path, PathBuf};

use plugsig_core::envelope::{encode_public_key, parse_all};
use plugsig_core::{rewrite, PrivateKey, Protocol, SignatureSigner};

use crate::exit_codes::{self, EXIT_SUCCESS};

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Plugin file to sign
    pub file: PathBuf,

    /// Private key file: PKCS#8 PEM for ed25519, a minisign secret key for minisign
    #[arg(long, short)]
    pub key: PathBuf,

    /// Private key password (prompted for encrypted keys if not provided)
    #[arg(long, short, env = "PLUGSIG_KEY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Output file (default: overwrite the input file)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Skip overwrite confirmation
    #[arg(long, short)]
    pub force: bool,

    /// Signing protocol
    #[arg(long, short = 'r', default_value = "ed25519")]
    pub protocol: Protocol,
}

pub fn cmd_sign(args: SignArgs) -> i32 {
    match run_sign(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::for_error(&e)
        }
    }
}

fn run_sign(args: SignArgs) -> Result<()> {
    let output_path = args.output.clone().unwrap_or_else(|| args.file.clone());

    let content = read_plugin(&args.file)?;
    let key = load_private_key(&args.key, args.protocol, args.password.as_deref())?;

    let signed = rewrite::sign(&content, &key)
        .with_context(|| format!("failed to sign plugin: {}", args.file.display()))?;

    if output_path == args.file && !args.force && !confirm_overwrite(&output_path) {
        anyhow::bail!(
            "not overwriting {} (use --force to skip confirmation)",
            output_path.display()
        );
    }

    fs::write(&output_path, &signed).with_context(|| {
        format!("failed to write signed plugin: {}", output_path.display())
    })?;

    let shown = fs::canonicalize(&output_path).unwrap_or(output_path);
    let signatures = parse_all(&signed).map(|s| s.len()).unwrap_or_default();

    println!("Signed plugin: {}", shown.display());
    println!("  protocol:   {}", key.protocol());
    println!("  public_key: {}", encode_public_key(&key.public_key()));
    println!("  signatures: {signatures}");

    Ok(())
}

fn read_plugin(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("plugin file not found: {}", path.display());
    }
    let content =
        fs::read(path).with_context(|| format!("failed to read plugin file: {}", path.display()))?;
    if content.is_empty() {
        anyhow::bail!("plugin file is empty: {}", path.display());
    }
    Ok(content)
}

fn load_private_key(path: &Path, protocol: Protocol, password: Option<&str>) -> Result<PrivateKey> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read key file: {}", path.display()))?;

    let prompted;
    let password = match password {
        Some(password) => Some(password),
        None if PrivateKey::is_encrypted(protocol, &text) => {
            prompted = Password::new()
                .with_prompt("Private key password")
                .interact()
                .context("failed to read private key password")?;
            Some(prompted.as_str())
        }
        None => None,
    };

    let key = PrivateKey::decode(protocol, &text, password)
        .with_context(|| format!("failed to load private key: {}", path.display()))?;
    tracing::debug!(protocol = %protocol, path = %path.display(), "loaded private key");
    Ok(key)
}

/// A terminal that cannot be prompted counts as "no".
fn confirm_overwrite(path: &Path) -> bool {
    Confirm::new()
        .with_prompt(format!("Overwrite {}?", path.display()))
        .default(false)
        .interact()
        .unwrap_or(false)
}
