//! `plugsig check` - Run the file-serving protection hook over local files.
//!
//! The policy comes from `PLUGSIG_PROTECTION_CONFIG`, loaded and installed
//! exactly as a server does at startup. Unset or empty disables protection,
//! and only `.plug.js` files are subject to it.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::PathBuf;

use plugsig_core::protection;
use plugsig_core::{Capabilities, Decision, PROTECTION_CONFIG_ENV};

use crate::exit_codes::{self, EXIT_CONFIG_ERROR, EXIT_REJECTED, EXIT_SUCCESS};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Files to check, as the server would serve them
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn cmd_check(args: CheckArgs) -> i32 {
    match run_check(&args) {
        Ok(code) => code,
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e:#}");
            }
            exit_codes::for_error(&e)
        }
    }
}

fn run_check(args: &CheckArgs) -> Result<i32> {
    let capabilities = Capabilities::builtin();
    let policy = protection::init_from_env(&capabilities)
        .with_context(|| format!("invalid protection config (from {PROTECTION_CONFIG_ENV})"))?;
    if policy.is_none() && !args.quiet {
        eprintln!("note: {PROTECTION_CONFIG_ENV} not set, plugin protection is disabled");
    }

    // first failing file decides the exit code
    let mut code = EXIT_SUCCESS;
    for file in &args.files {
        let data = fs::read(file)
            .with_context(|| format!("failed to read file: {}", file.display()))?;
        let path = file.to_string_lossy();

        let decision = protection::check_file_with_active_policy(&capabilities, &path, &data)
            .with_context(|| format!("malformed signature envelope: {}", file.display()))?;

        let failure = match &decision {
            Decision::Allowed(_) => None,
            Decision::Rejected(_) => Some(EXIT_REJECTED),
            Decision::ConfigurationError(_) => Some(EXIT_CONFIG_ERROR),
        };

        if !args.quiet {
            match failure {
                None => println!("{}: {decision}", file.display()),
                Some(_) => eprintln!("{}: {decision}", file.display()),
            }
        }
        if let (EXIT_SUCCESS, Some(failed)) = (code, failure) {
            code = failed;
        }
    }

    Ok(code)
}
