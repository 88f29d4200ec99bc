//! End-to-end signing and trust-policy tests with real ed25519 and minisign keys.

use std::io::Write;

use ed25519_dalek::SigningKey;
use plugsig_core::envelope::{encode_public_key, format_signature_line, parse_all, strip_all};
use plugsig_core::policy::{Admission, Decision, Evaluator, ProtectionPolicy, RejectReason};
use plugsig_core::protocol::{
    Capabilities, MinisignKey, PrivateKey, SignatureSigner, SignatureVerifier,
};
use plugsig_core::{check_file, rewrite, ConfigError, ProtectionConfig, SignError};
use tempfile::NamedTempFile;

const PAYLOAD: &[u8] = b"export default function plug() {\n  return 42;\n}\n";

fn generate_key() -> PrivateKey {
    PrivateKey::Ed25519(SigningKey::generate(&mut rand::thread_rng()))
}

fn generate_minisign_key() -> PrivateKey {
    let keypair = minisign::KeyPair::generate_unencrypted_keypair().unwrap();
    PrivateKey::Minisign(MinisignKey::new(keypair.sk).unwrap())
}

fn encoded(key: &PrivateKey) -> String {
    encode_public_key(&key.public_key())
}

fn policy_trusting(keys: &[(&PrivateKey, &str)], allow_unsigned: bool) -> ProtectionPolicy {
    let config = keys
        .iter()
        .fold(ProtectionConfig::default(), |config, (key, owner)| {
            config.with_trusted_key(key.protocol(), encoded(key), *owner, None)
        })
        .allow_unsigned(allow_unsigned);
    ProtectionPolicy::from_config(&config, &Capabilities::builtin()).unwrap()
}

fn check(policy: Option<&ProtectionPolicy>, content: &[u8], require_signed: bool) -> Decision {
    let caps = Capabilities::builtin();
    Evaluator::new(policy, &caps)
        .check(content, require_signed)
        .unwrap()
}

fn trusted_owner(decision: &Decision) -> Option<&str> {
    match decision {
        Decision::Allowed(Admission::Trusted { owner, .. }) => Some(owner),
        _ => None,
    }
}

// ==================== layered signing ====================

#[test]
fn test_layered_signatures_all_verify() {
    let keys = [generate_key(), generate_key(), generate_key()];

    let mut content = PAYLOAD.to_vec();
    for key in &keys {
        content = rewrite::sign(&content, key).unwrap();
    }

    let sigs = parse_all(&content).unwrap();
    assert_eq!(sigs.len(), 3);
    assert_eq!(strip_all(&content), PAYLOAD.to_vec());

    let caps = Capabilities::builtin();
    let verifier = caps.verifier("ed25519").unwrap();
    let payload = strip_all(&content);
    for sig in &sigs {
        assert!(verifier.verify(&sig.public_key, &payload, &sig.signature));
    }

    // re-signing with the first key replaces its line
    let resigned = rewrite::sign(&content, &keys[0]).unwrap();
    let sigs = parse_all(&resigned).unwrap();
    assert_eq!(sigs.len(), 3);
    assert_eq!(sigs[0].public_key, keys[0].public_key());
    assert_eq!(strip_all(&resigned), PAYLOAD.to_vec());
}

#[test]
fn test_each_layer_trusted_on_its_own() {
    let alice = generate_key();
    let bob = generate_key();
    let content = rewrite::sign(&rewrite::sign(PAYLOAD, &alice).unwrap(), &bob).unwrap();

    let only_alice = policy_trusting(&[(&alice, "Alice")], false);
    assert_eq!(
        trusted_owner(&check(Some(&only_alice), &content, true)),
        Some("Alice")
    );

    let only_bob = policy_trusting(&[(&bob, "Bob")], false);
    assert_eq!(
        trusted_owner(&check(Some(&only_bob), &content, true)),
        Some("Bob")
    );
}

#[test]
fn test_mixed_protocol_layers() {
    let alice = generate_key();
    let carol = generate_minisign_key();

    let content = rewrite::sign(PAYLOAD, &carol).unwrap();
    let content = rewrite::sign(&content, &alice).unwrap();
    let content = rewrite::sign(&content, &alice).unwrap();

    let sigs = parse_all(&content).unwrap();
    let protocols: Vec<&str> = sigs.iter().map(|s| s.protocol.as_str()).collect();
    assert_eq!(protocols, ["ed25519", "minisign"]);
    assert_eq!(strip_all(&content), PAYLOAD.to_vec());

    let only_carol = policy_trusting(&[(&carol, "Carol")], false);
    assert_eq!(
        trusted_owner(&check(Some(&only_carol), &content, true)),
        Some("Carol")
    );
}

#[test]
fn test_minisign_config_uses_key_text() {
    let carol = generate_minisign_key();
    let key_text = String::from_utf8(carol.public_key()).unwrap();
    assert!(key_text.starts_with("RW"));

    let config = ProtectionConfig::default().with_trusted_key("minisign", key_text.as_str(), "Carol", None);
    let policy = ProtectionPolicy::from_config(&config, &Capabilities::builtin()).unwrap();

    let signed = rewrite::sign(PAYLOAD, &carol).unwrap();
    let decision = check(Some(&policy), &signed, true);
    match decision {
        Decision::Allowed(Admission::Trusted {
            protocol,
            public_key_encoded,
            owner,
        }) => {
            assert_eq!(protocol, "minisign");
            assert_eq!(public_key_encoded, encode_public_key(key_text.as_bytes()));
            assert_eq!(owner, "Carol");
        }
        other => panic!("expected trusted, got {other:?}"),
    }

    let mut tampered = signed.clone();
    let last = tampered.len() - 2;
    tampered[last] ^= 0x01;
    assert!(matches!(
        check(Some(&policy), &tampered, true),
        Decision::Rejected(RejectReason::VerificationFailed { .. })
    ));
}

#[test]
fn test_resign_never_produces_unverifiable_output() {
    let alice = generate_key();
    let mallory = generate_key();

    // two stale alice lines, filler to the window edge, a foreign line on 51
    let mut content = Vec::new();
    for _ in 0..2 {
        content.extend_from_slice(format_signature_line("ed25519", &alice.public_key(), &[0; 64]).as_bytes());
    }
    for i in 2..plugsig_core::SCAN_WINDOW_LINES {
        content.extend_from_slice(format!("const filler{i} = {i};\n").as_bytes());
    }
    content.extend_from_slice(format_signature_line("ed25519", &mallory.public_key(), &[0; 64]).as_bytes());
    content.extend_from_slice(PAYLOAD);

    let err = rewrite::sign(&content, &alice).unwrap_err();
    assert!(matches!(err, SignError::ShiftedSignature { line: 50 }), "{err:?}");

    // once the stray line is gone, signing works and verifies
    let cleaned: Vec<u8> = content
        .split_inclusive(|&b| b == b'\n')
        .filter(|line| !line.starts_with(format!("// signature|ed25519|{}", encoded(&mallory)).as_bytes()))
        .flatten()
        .copied()
        .collect();
    let signed = rewrite::sign(&cleaned, &alice).unwrap();
    let policy = policy_trusting(&[(&alice, "Alice")], false);
    assert_eq!(
        trusted_owner(&check(Some(&policy), &signed, true)),
        Some("Alice")
    );
}

// ==================== trust decisions ====================

#[test]
fn test_untrusted_signer_rejected() {
    let alice = generate_key();
    let bob = generate_key();
    let policy = policy_trusting(&[(&alice, "Alice")], false);

    let content = rewrite::sign(PAYLOAD, &bob).unwrap();
    assert_eq!(
        check(Some(&policy), &content, true),
        Decision::Rejected(RejectReason::NoTrustedSignature)
    );
}

#[test]
fn test_first_trusted_signature_wins() {
    let alice = generate_key();
    let bob = generate_key();
    let policy = policy_trusting(&[(&alice, "Alice"), (&bob, "Bob")], false);

    // bob signed last, so his line comes first
    let content = rewrite::sign(&rewrite::sign(PAYLOAD, &alice).unwrap(), &bob).unwrap();
    let decision = check(Some(&policy), &content, true);
    assert_eq!(
        decision,
        Decision::Allowed(Admission::Trusted {
            protocol: "ed25519".into(),
            public_key_encoded: encoded(&bob),
            owner: "Bob".into(),
        })
    );
}

#[test]
fn test_corrupted_trusted_signature_is_terminal() {
    let alice = generate_key();
    let bob = generate_key();
    let policy = policy_trusting(&[(&alice, "Alice"), (&bob, "Bob")], false);

    let mut alice_sig = alice.sign(PAYLOAD).unwrap();
    alice_sig[0] ^= 0x01;
    let bob_sig = bob.sign(PAYLOAD).unwrap();

    let mut content = Vec::new();
    content.extend_from_slice(
        format_signature_line("ed25519", &alice.public_key(), &alice_sig).as_bytes(),
    );
    content.extend_from_slice(format_signature_line("ed25519", &bob.public_key(), &bob_sig).as_bytes());
    content.extend_from_slice(PAYLOAD);

    assert_eq!(
        check(Some(&policy), &content, true),
        Decision::Rejected(RejectReason::VerificationFailed {
            owner: "Alice".into()
        })
    );
}

#[test]
fn test_tampered_payload_rejected() {
    let alice = generate_key();
    let policy = policy_trusting(&[(&alice, "Alice")], false);

    let mut content = rewrite::sign(PAYLOAD, &alice).unwrap();
    let last = content.len() - 3;
    content[last] = b'7';

    let decision = check(Some(&policy), &content, true);
    assert!(matches!(
        decision,
        Decision::Rejected(RejectReason::VerificationFailed { .. })
    ));
}

#[test]
fn test_untrusted_line_before_trusted_one() {
    let alice = generate_key();
    let mallory = generate_key();
    let policy = policy_trusting(&[(&alice, "Alice")], false);

    let content = rewrite::sign(&rewrite::sign(PAYLOAD, &alice).unwrap(), &mallory).unwrap();
    assert_eq!(
        trusted_owner(&check(Some(&policy), &content, true)),
        Some("Alice")
    );
}

// ==================== unsigned content ====================

#[test]
fn test_unsigned_content() {
    let alice = generate_key();
    let strict = policy_trusting(&[(&alice, "Alice")], false);
    let lax = policy_trusting(&[(&alice, "Alice")], true);

    assert_eq!(
        check(Some(&strict), PAYLOAD, true),
        Decision::Rejected(RejectReason::MissingSignature)
    );
    assert_eq!(
        check(Some(&lax), PAYLOAD, false),
        Decision::Allowed(Admission::Unsigned)
    );
}

#[test]
fn test_without_policy() {
    let alice = generate_key();
    let signed = rewrite::sign(PAYLOAD, &alice).unwrap();

    assert_eq!(
        check(None, PAYLOAD, false),
        Decision::Allowed(Admission::Unsigned)
    );
    for (content, require_signed) in [(PAYLOAD, true), (signed.as_slice(), false)] {
        assert_eq!(
            check(None, content, require_signed),
            Decision::ConfigurationError("protection config not loaded".into())
        );
    }
}

#[test]
fn test_malformed_envelope_is_error_not_decision() {
    let caps = Capabilities::builtin();
    let policy = ProtectionPolicy::default();
    let result = Evaluator::new(Some(&policy), &caps).check(b"// signature|ed25519: abc\n", true);
    assert!(result.is_err());
}

// ==================== protection hook ====================

#[test]
fn test_check_file_with_real_keys() {
    let alice = generate_key();
    let policy = policy_trusting(&[(&alice, "Alice")], false);
    let caps = Capabilities::builtin();
    let signed = rewrite::sign(PAYLOAD, &alice).unwrap();

    let decision = check_file(Some(&policy), &caps, "_plug/editor.plug.js", &signed).unwrap();
    assert_eq!(trusted_owner(&decision), Some("Alice"));

    let decision = check_file(Some(&policy), &caps, "_plug/editor.plug.js", PAYLOAD).unwrap();
    assert_eq!(decision, Decision::Rejected(RejectReason::MissingSignature));

    let decision = check_file(Some(&policy), &caps, "notes/index.md", PAYLOAD).unwrap();
    assert_eq!(decision, Decision::Allowed(Admission::Exempt));
}

// ==================== config files ====================

#[test]
fn test_policy_load_from_file() {
    let alice = generate_key();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "allow_unsigned_plugins = false\n\n[trusted_public_keys.ed25519]\n\"{}\" = {{ owner = \"Alice\" }}",
        encoded(&alice)
    )
    .unwrap();

    let policy = ProtectionPolicy::load(file.path(), &Capabilities::builtin()).unwrap();
    assert!(!policy.allow_unsigned());
    assert_eq!(policy.registry().len(), 1);

    let signed = rewrite::sign(PAYLOAD, &alice).unwrap();
    assert_eq!(
        trusted_owner(&check(Some(&policy), &signed, true)),
        Some("Alice")
    );
}

#[test]
fn test_policy_load_rejects_bad_files() {
    let caps = Capabilities::builtin();

    let err = ProtectionPolicy::load(std::path::Path::new("/nonexistent/plugsig.toml"), &caps)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[trusted_public_keys.rsa]\n\"dGVzdA==\" = {{ owner = \"Alice\" }}").unwrap();
    let err = ProtectionPolicy::load(file.path(), &caps).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownProtocol(p) if p == "rsa"));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[trusted_public_keys.minisign]\n\"dGVzdA==\" = {{ owner = \"Alice\" }}").unwrap();
    let err = ProtectionPolicy::load(file.path(), &caps).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPublicKey { .. }), "{err:?}");
}

// ==================== pluggable protocols ====================

/// Toy scheme: the signature is the payload reversed.
struct ReverseVerifier;

impl SignatureVerifier for ReverseVerifier {
    fn protocol(&self) -> &str {
        "reverse"
    }

    fn validate_public_key(&self, public_key: &[u8]) -> Result<(), String> {
        if public_key.len() == 7 {
            Ok(())
        } else {
            Err(format!("expected 7 bytes, got {}", public_key.len()))
        }
    }

    fn verify(&self, _public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
        signature.iter().rev().eq(payload.iter())
    }
}

fn reverse_sign(content: &[u8]) -> Vec<u8> {
    rewrite::sign_with(content, "reverse", b"fakekey", |payload| {
        Ok(payload.iter().rev().copied().collect())
    })
    .unwrap()
}

#[test]
fn test_custom_protocol_verifier() {
    let caps = Capabilities::builtin().with_verifier(ReverseVerifier);
    let config = ProtectionConfig::default().with_trusted_key(
        "reverse",
        encode_public_key(b"fakekey"),
        "Test Harness",
        Some("toy scheme"),
    );
    let policy = ProtectionPolicy::from_config(&config, &caps).unwrap();

    let signed = reverse_sign(PAYLOAD);
    let decision = Evaluator::new(Some(&policy), &caps).check(&signed, true).unwrap();
    assert_eq!(trusted_owner(&decision), Some("Test Harness"));

    // the same registry consulted by a process lacking the verifier
    let builtin = Capabilities::builtin();
    let decision = Evaluator::new(Some(&policy), &builtin)
        .check(&signed, true)
        .unwrap();
    assert_eq!(
        decision,
        Decision::Rejected(RejectReason::UnsupportedProtocol("reverse".into()))
    );
}

#[test]
fn test_custom_protocol_key_validation() {
    let caps = Capabilities::builtin().with_verifier(ReverseVerifier);
    let config = ProtectionConfig::default().with_trusted_key(
        "reverse",
        encode_public_key(b"short"),
        "Test Harness",
        None,
    );
    let err = ProtectionPolicy::from_config(&config, &caps).unwrap_err();
    assert!(err.to_string().contains("expected 7 bytes"));
}
