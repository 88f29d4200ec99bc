use super::{encode_public_key, parse_all, WindowLines, COMMENT_MARKER, SCAN_WINDOW_LINES, SIGNATURE_TAG};

/// Lines are truncated to this many bytes before the target-key match test.
pub const MATCH_PREFIX_LIMIT: usize = 8 * 1024;

/// Remove every signature line in the scan window.
///
/// All other bytes keep their order, and the final newline is present exactly
/// when it was present in `content`. Malformed envelopes are returned
/// unchanged.
pub fn strip_all(content: &[u8]) -> Vec<u8> {
    match parse_all(content) {
        Ok(signatures) if !signatures.is_empty() => {}
        Ok(_) => return content.to_vec(),
        Err(err) => {
            tracing::debug!(error = %err, "envelope not parseable, leaving content untouched");
            return content.to_vec();
        }
    }

    let mut out = Vec::with_capacity(content.len());
    let mut lines = WindowLines::new(content, SCAN_WINDOW_LINES);
    for line in lines.by_ref() {
        if !line.is_signature() {
            out.extend_from_slice(&content[line.start..line.end]);
        }
    }
    out.extend_from_slice(&content[lines.offset()..]);

    if content.last() != Some(&b'\n') && out.last() == Some(&b'\n') {
        out.pop();
    }
    out
}

/// Separate the leading signature block into "other keys" and payload.
///
/// Returns `(remainder, preserved)`. Lines signed by `(protocol, public_key)`
/// are dropped; other signature lines are kept verbatim in file order, each
/// ending with a single `\n`. The first non-signature line and everything
/// after it is the remainder, untouched.
pub fn strip_matching(content: &[u8], protocol: &str, public_key: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let split = split_envelope(content, protocol, public_key);
    (split.remainder, split.preserved)
}

/// Detailed result of [`strip_matching`], used by the rewriter.
#[derive(Debug, Default)]
pub(crate) struct EnvelopeSplit {
    pub preserved: Vec<u8>,
    pub remainder: Vec<u8>,
    pub preserved_count: usize,
    pub removed_count: usize,
    /// First signature line found below payload content within the window.
    pub buried_line: Option<usize>,
}

pub(crate) fn split_envelope(content: &[u8], protocol: &str, public_key: &[u8]) -> EnvelopeSplit {
    let encoded_key = encode_public_key(public_key);

    let mut split = EnvelopeSplit::default();
    let mut lines = WindowLines::new(content, SCAN_WINDOW_LINES);
    let mut payload_start = None;

    for line in lines.by_ref() {
        if !line.is_signature() {
            payload_start = Some(line.start);
            break;
        }

        if matches_target(line.text, protocol, &encoded_key) {
            split.removed_count += 1;
            continue;
        }

        split.preserved.extend_from_slice(line.text);
        split.preserved.push(b'\n');
        split.preserved_count += 1;
    }

    let remainder_start = match payload_start {
        Some(start) => {
            split.buried_line = lines.find(|l| l.is_signature()).map(|l| l.number);
            start
        }
        None => lines.offset(),
    };
    split.remainder = content[remainder_start..].to_vec();

    tracing::debug!(
        removed = split.removed_count,
        preserved = split.preserved_count,
        "split signature envelope"
    );
    split
}

/// Field-wise comparison of the line head, trimmed the same way the parser
/// trims, so a line matches exactly when it parses to `(protocol, key)`.
fn matches_target(text: &[u8], protocol: &str, encoded_key: &str) -> bool {
    let trimmed = text.trim_ascii();
    let head = &trimmed[..trimmed.len().min(MATCH_PREFIX_LIMIT)];
    let body = head.strip_prefix(COMMENT_MARKER.as_bytes()).unwrap_or(head);
    let Some(colon) = body.iter().position(|&b| b == b':') else {
        return false;
    };

    let mut fields = body[..colon].split(|&b| b == b'|').map(<[u8]>::trim_ascii);
    fields.next() == Some(SIGNATURE_TAG.as_bytes())
        && fields.next() == Some(protocol.as_bytes())
        && fields.next() == Some(encoded_key.as_bytes())
        && fields.next().is_none()
}
