use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::{ParsedSignature, WindowLines, COMMENT_MARKER, SCAN_WINDOW_LINES, SIGNATURE_TAG};
use crate::error::EnvelopeError;

/// Extract every signature in the scan window.
///
/// Finding no signatures is not an error. A single malformed signature line
/// fails the whole call so a tampered entry can never be skipped silently.
pub fn parse_all(content: &[u8]) -> Result<Vec<ParsedSignature>, EnvelopeError> {
    if content.is_empty() {
        return Err(EnvelopeError::EmptyContent);
    }

    let mut signatures = Vec::new();
    for line in WindowLines::new(content, SCAN_WINDOW_LINES) {
        if !line.is_signature() {
            continue;
        }
        signatures.push(parse_line(line.number, line.text)?);
    }

    tracing::debug!(count = signatures.len(), "parsed signature envelope");
    Ok(signatures)
}

/// Parse a line already classified as a signature line.
fn parse_line(number: usize, text: &[u8]) -> Result<ParsedSignature, EnvelopeError> {
    let source_line =
        std::str::from_utf8(text).map_err(|_| EnvelopeError::InvalidUtf8 { line: number })?;

    let trimmed = source_line.trim();
    let body = trimmed
        .strip_prefix(COMMENT_MARKER)
        .unwrap_or(trimmed)
        .trim();

    let (head, tail) = body
        .split_once(':')
        .ok_or(EnvelopeError::MissingSeparator { line: number })?;

    let fields: Vec<&str> = head.trim().split('|').collect();
    if fields.len() != 3 {
        return Err(EnvelopeError::FieldCount {
            line: number,
            found: fields.len(),
        });
    }

    if fields[0] != SIGNATURE_TAG {
        return Err(EnvelopeError::MissingTag { line: number });
    }

    let protocol = fields[1].trim();
    if protocol.is_empty() {
        return Err(EnvelopeError::MissingProtocol { line: number });
    }

    let public_key_encoded = fields[2].trim();
    let public_key =
        BASE64
            .decode(public_key_encoded)
            .map_err(|e| EnvelopeError::InvalidPublicKey {
                line: number,
                reason: e.to_string(),
            })?;
    if public_key.is_empty() {
        return Err(EnvelopeError::EmptyPublicKey { line: number });
    }

    let signature_encoded = tail.trim();
    let signature =
        BASE64
            .decode(signature_encoded)
            .map_err(|e| EnvelopeError::InvalidSignature {
                line: number,
                reason: e.to_string(),
            })?;

    Ok(ParsedSignature {
        protocol: protocol.to_string(),
        public_key_encoded: public_key_encoded.to_string(),
        public_key,
        signature_encoded: signature_encoded.to_string(),
        signature,
        source_line: source_line.to_string(),
    })
}
