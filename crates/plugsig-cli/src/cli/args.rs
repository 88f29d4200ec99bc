use clap::{Parser, Subcommand};

use super::commands::{
    check::CheckArgs, keygen::KeygenArgs, sign::SignArgs, verify::VerifyArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "plugsig",
    version,
    about = "Sign plugins with embedded signatures and check them against a protection config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign a plugin file, replacing any earlier signature by the same key
    Sign(SignArgs),

    /// Check a plugin file against a protection config
    Verify(VerifyArgs),

    /// Apply the file-serving protection hook, configured from the environment
    Check(CheckArgs),

    /// Generate a signing key
    Keygen(KeygenArgs),
}
