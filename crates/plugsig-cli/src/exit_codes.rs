//! Process exit codes. Scripts depend on these values.

use plugsig_core::{ConfigError, EnvelopeError, SignError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERAL_ERROR: i32 = 1; // I/O, key loading, signing
pub const EXIT_CONFIG_ERROR: i32 = 2; // Protection config missing or invalid
pub const EXIT_REJECTED: i32 = 3; // Trust policy rejected the file
pub const EXIT_MALFORMED: i32 = 4; // Signature envelope is malformed

/// Map a command failure to its exit code.
pub fn for_error(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_CONFIG_ERROR;
    }
    if err.downcast_ref::<EnvelopeError>().is_some() {
        return EXIT_MALFORMED;
    }
    match err.downcast_ref::<SignError>() {
        Some(
            SignError::Envelope(_)
            | SignError::BuriedSignature { .. }
            | SignError::ShiftedSignature { .. },
        ) => EXIT_MALFORMED,
        _ => EXIT_GENERAL_ERROR,
    }
}
