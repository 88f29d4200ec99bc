//! `plugsig verify` - Run the server-side protection check on a local file.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use plugsig_core::{Admission, Capabilities, Decision, Evaluator, ProtectionPolicy};

use crate::exit_codes::{self, EXIT_CONFIG_ERROR, EXIT_REJECTED, EXIT_SUCCESS};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Plugin file to check
    pub file: PathBuf,

    /// Protection config (TOML)
    #[arg(long, short, env = "PLUGSIG_PROTECTION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Require a signature even if the config allows unsigned plugins
    #[arg(long)]
    pub require_signed: bool,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn cmd_verify(args: VerifyArgs) -> i32 {
    match run_verify(&args) {
        Ok(code) => code,
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e:#}");
            }
            exit_codes::for_error(&e)
        }
    }
}

fn run_verify(args: &VerifyArgs) -> Result<i32> {
    let capabilities = Capabilities::builtin();

    let policy = match &args.config {
        Some(path) => Some(
            ProtectionPolicy::load(path, &capabilities)
                .with_context(|| format!("invalid protection config: {}", path.display()))?,
        ),
        None => {
            tracing::debug!("no protection config given");
            None
        }
    };

    let content = fs::read(&args.file)
        .with_context(|| format!("failed to read plugin file: {}", args.file.display()))?;

    let require_signed =
        args.require_signed || policy.as_ref().is_some_and(|p| !p.allow_unsigned());

    let decision = Evaluator::new(policy.as_ref(), &capabilities)
        .check(&content, require_signed)
        .with_context(|| format!("malformed signature envelope: {}", args.file.display()))?;

    if !args.quiet {
        report(args, &decision);
    }

    Ok(match decision {
        Decision::Allowed(_) => EXIT_SUCCESS,
        Decision::Rejected(_) => EXIT_REJECTED,
        Decision::ConfigurationError(_) => EXIT_CONFIG_ERROR,
    })
}

fn report(args: &VerifyArgs, decision: &Decision) {
    match decision {
        Decision::Allowed(Admission::Trusted {
            protocol,
            public_key_encoded,
            owner,
        }) => {
            println!("{}: trusted", args.file.display());
            println!("  owner:      {owner}");
            println!("  protocol:   {protocol}");
            println!("  public_key: {public_key_encoded}");
        }
        Decision::Allowed(_) => println!("{}: {decision}", args.file.display()),
        Decision::Rejected(_) | Decision::ConfigurationError(_) => {
            eprintln!("{}: {decision}", args.file.display());
        }
    }
}
