//! Ed25519 over the raw payload bytes.
//!
//! Public keys travel as the 32-byte verifying key, signatures as the 64-byte
//! signature.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use pkcs8::DecodePrivateKey;

use super::{Protocol, SignatureVerifier};
use crate::error::KeyError;

#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn protocol(&self) -> &str {
        Protocol::Ed25519.as_str()
    }

    fn validate_public_key(&self, public_key: &[u8]) -> Result<(), String> {
        decode_verifying_key(public_key).map(|_| ())
    }

    fn verify(&self, public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = decode_verifying_key(public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(payload, &signature).is_ok()
    }
}

fn decode_verifying_key(public_key: &[u8]) -> Result<VerifyingKey, String> {
    let bytes: &[u8; 32] = public_key
        .try_into()
        .map_err(|_| format!("expected 32 bytes, got {}", public_key.len()))?;
    VerifyingKey::from_bytes(bytes).map_err(|e| e.to_string())
}

pub(super) fn sign(key: &SigningKey, payload: &[u8]) -> Vec<u8> {
    key.sign(payload).to_bytes().to_vec()
}

pub(super) fn decode_pem(pem: &str) -> Result<SigningKey, KeyError> {
    SigningKey::from_pkcs8_pem(pem).map_err(|e| KeyError::Decode {
        reason: e.to_string(),
    })
}

pub(super) fn decode_encrypted_pem(pem: &str, password: &str) -> Result<SigningKey, KeyError> {
    SigningKey::from_pkcs8_encrypted_pem(pem, password).map_err(|_| KeyError::Decrypt)
}
