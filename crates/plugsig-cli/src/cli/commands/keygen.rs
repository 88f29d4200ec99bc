//! `plugsig keygen` - Generate an ed25519 or minisign signing key.

use anyhow::{Context, Result};
use clap::Args;
use dialoguer::Password;
use ed25519_dalek::SigningKey;
use std::fs;
use std::path::PathBuf;

use plugsig_core::envelope::encode_public_key;
use plugsig_core::Protocol;

use crate::exit_codes::{self, EXIT_SUCCESS};

/// A freshly generated key, ready to be written out.
struct GeneratedKey {
    private_text: String,
    /// As written in the protection config.
    public_key: String,
    format: &'static str,
}

fn private_key_file(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Ed25519 => "private_key.pem",
        Protocol::Minisign => "minisign.key",
    }
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the private key
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Force overwrite existing files
    #[arg(long, short)]
    pub force: bool,

    /// Encrypt the private key, prompting for a password if none is given
    #[arg(long)]
    pub encrypt: bool,

    /// Password to encrypt the private key with
    #[arg(long, short, env = "PLUGSIG_KEY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Signing protocol of the new key
    #[arg(long, short = 'r', default_value = "ed25519")]
    pub protocol: Protocol,
}

pub fn cmd_keygen(args: KeygenArgs) -> i32 {
    match run_keygen(args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::for_error(&e)
        }
    }
}

fn run_keygen(args: KeygenArgs) -> Result<()> {
    let protocol = args.protocol;

    if !args.out.exists() {
        fs::create_dir_all(&args.out)
            .with_context(|| format!("failed to create directory: {}", args.out.display()))?;
    }

    let private_path = args.out.join(private_key_file(protocol));
    if private_path.exists() && !args.force {
        anyhow::bail!(
            "private key already exists: {} (use --force to overwrite)",
            private_path.display()
        );
    }

    let password = match args.password {
        Some(password) => Some(password),
        None if args.encrypt => Some(
            Password::new()
                .with_prompt("New private key password")
                .with_confirmation("Confirm password", "Passwords do not match")
                .interact()
                .context("failed to read private key password")?,
        ),
        None => None,
    };

    let key = match protocol {
        Protocol::Ed25519 => generate_ed25519(password.as_deref())?,
        Protocol::Minisign => generate_minisign(password.clone())?,
    };

    fs::write(&private_path, key.private_text.as_bytes())
        .with_context(|| format!("failed to write private key: {}", private_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&private_path, perms)
            .with_context(|| format!("failed to set permissions on: {}", private_path.display()))?;
    }

    tracing::info!(%protocol, encrypted = password.is_some(), "generated signing key");

    println!("Generated {protocol} signing key:");
    println!(
        "  Private key: {} ({}{}, mode 0600)",
        private_path.display(),
        key.format,
        if password.is_some() { ", encrypted" } else { "" }
    );
    println!("  Public key:  {}", key.public_key);
    println!();
    println!("Add this entry to your protection config to trust plugins signed with it:");
    println!();
    println!("[trusted_public_keys.{protocol}]");
    println!("\"{}\" = {{ owner = \"<your name>\" }}", key.public_key);

    Ok(())
}

fn generate_ed25519(password: Option<&str>) -> Result<GeneratedKey> {
    use pkcs8::{EncodePrivateKey, LineEnding};

    let signing_key = SigningKey::generate(&mut rand::thread_rng());
    let private_pem = match password {
        Some(password) => signing_key
            .to_pkcs8_encrypted_pem(&mut rand::thread_rng(), password.as_bytes(), LineEnding::LF)
            .context("failed to encrypt private key as PKCS#8 PEM")?,
        None => signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .context("failed to encode private key as PKCS#8 PEM")?,
    };

    Ok(GeneratedKey {
        private_text: private_pem.to_string(),
        public_key: encode_public_key(signing_key.verifying_key().as_bytes()),
        format: "PKCS#8 PEM",
    })
}

fn generate_minisign(password: Option<String>) -> Result<GeneratedKey> {
    let keypair = match password {
        Some(password) => minisign::KeyPair::generate_encrypted_keypair(Some(password)),
        None => minisign::KeyPair::generate_unencrypted_keypair(),
    }
    .context("failed to generate minisign key pair")?;

    let secret_box = keypair
        .sk
        .to_box(None)
        .context("failed to encode minisign secret key")?;

    Ok(GeneratedKey {
        private_text: secret_box.to_string(),
        public_key: keypair.pk.to_base64(),
        format: "minisign secret key",
    })
}
