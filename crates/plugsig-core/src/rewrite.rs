//! Envelope rewriting: add or replace one signer's signature.
//!
//! The new line goes first, then the other signers' lines in their original
//! order, then the payload. Re-signing with the same key replaces its old
//! line, so every key appears at most once.

use crate::envelope::{
    format_signature_line, parse_all, split_envelope, strip_all, COMMENT_MARKER,
    SCAN_WINDOW_LINES,
};
use crate::error::SignError;
use crate::protocol::SignatureSigner;

/// Sign `content` with `signer`, keeping every other signer's line.
pub fn sign<S>(content: &[u8], signer: &S) -> Result<Vec<u8>, SignError>
where
    S: SignatureSigner + ?Sized,
{
    let public_key = signer.public_key();
    sign_with(content, signer.protocol(), &public_key, |payload| {
        signer.sign(payload)
    })
}

/// Sign `content` for `(protocol, public_key)` using `sign_fn`.
///
/// `sign_fn` only ever sees the payload: the content with the whole leading
/// signature block removed.
pub fn sign_with<F>(
    content: &[u8],
    protocol: &str,
    public_key: &[u8],
    sign_fn: F,
) -> Result<Vec<u8>, SignError>
where
    F: FnOnce(&[u8]) -> Result<Vec<u8>, SignError>,
{
    if !is_valid_protocol_token(protocol) {
        return Err(SignError::UnsupportedProtocol(protocol.to_string()));
    }
    if public_key.is_empty() {
        return Err(SignError::Signer {
            reason: "signer has an empty public key".into(),
        });
    }

    // refuse to layer a new signature over a malformed envelope
    parse_all(content)?;

    let split = split_envelope(content, protocol, public_key);
    if let Some(line) = split.buried_line {
        return Err(SignError::BuriedSignature { line });
    }
    if split.preserved_count + 1 > SCAN_WINDOW_LINES {
        return Err(SignError::EnvelopeFull {
            max: SCAN_WINDOW_LINES,
        });
    }

    let signature = sign_fn(&split.remainder)?;
    let line = format_signature_line(protocol, public_key, &signature);

    let mut signed =
        Vec::with_capacity(line.len() + split.preserved.len() + split.remainder.len());
    signed.extend_from_slice(line.as_bytes());
    signed.extend_from_slice(&split.preserved);
    signed.extend_from_slice(&split.remainder);

    // Dropping replaced lines shifts everything up. A signature line sitting
    // just past the window would slide in and change what the payload is.
    if strip_all(&signed) != split.remainder {
        let line = split_envelope(&signed, protocol, public_key)
            .buried_line
            .unwrap_or(split.preserved_count + 2);
        return Err(SignError::ShiftedSignature { line });
    }

    tracing::info!(
        protocol,
        replaced = split.removed_count,
        preserved = split.preserved_count,
        payload_bytes = split.remainder.len(),
        "signed content"
    );
    Ok(signed)
}

/// Tokens must survive the line grammar unchanged.
fn is_valid_protocol_token(protocol: &str) -> bool {
    !protocol.is_empty()
        && protocol == protocol.trim()
        && !protocol.contains(['|', ':', '\n', '\r'])
        && !protocol.starts_with(COMMENT_MARKER)
}
