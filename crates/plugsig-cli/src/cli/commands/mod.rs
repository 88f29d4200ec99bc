//! Subcommand implementations. Each returns the process exit code.

pub mod check;
pub mod keygen;
pub mod sign;
pub mod verify;

use super::args::{Cli, Command};

pub fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Sign(args) => sign::cmd_sign(args),
        Command::Verify(args) => verify::cmd_verify(args),
        Command::Check(args) => check::cmd_check(args),
        Command::Keygen(args) => keygen::cmd_keygen(args),
    }
}
