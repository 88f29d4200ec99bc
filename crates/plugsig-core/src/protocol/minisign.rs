//! minisign signatures (Ed25519 over a BLAKE2b-512 prehash).
//!
//! The public key travels as the minisign key text (`RWQ...`), the signature
//! as the complete minisign signature document including its trusted comment.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use minisign::{PublicKey, SecretKey, SecretKeyBox, SignatureBox};

use super::{Protocol, SignatureVerifier};
use crate::error::{KeyError, SignError};

const UNTRUSTED_COMMENT: &str = "untrusted comment:";

/// KDF tag of a password-protected secret key.
const SCRYPT_KDF: &[u8] = b"Sc";

#[derive(Debug, Clone, Copy, Default)]
pub struct MinisignVerifier;

impl SignatureVerifier for MinisignVerifier {
    fn protocol(&self) -> &str {
        Protocol::Minisign.as_str()
    }

    fn validate_public_key(&self, public_key: &[u8]) -> Result<(), String> {
        decode_public_key(public_key).map(|_| ())
    }

    /// Operators paste the key text as printed by `minisign -G`; the base64
    /// of that text, as found in signature lines, is accepted too.
    fn decode_config_key(&self, configured: &str) -> Result<Vec<u8>, String> {
        if PublicKey::from_base64(configured).is_ok() {
            return Ok(configured.as_bytes().to_vec());
        }
        BASE64
            .decode(configured)
            .map_err(|e| format!("neither minisign key text nor base64: {e}"))
    }

    fn verify(&self, public_key: &[u8], payload: &[u8], signature: &[u8]) -> bool {
        let Ok(key) = decode_public_key(public_key) else {
            return false;
        };
        let Some(signature) = std::str::from_utf8(signature)
            .ok()
            .and_then(|text| SignatureBox::from_string(text).ok())
        else {
            return false;
        };
        minisign::verify(&key, &signature, Cursor::new(payload), true, false, true).is_ok()
    }
}

fn decode_public_key(public_key: &[u8]) -> Result<PublicKey, String> {
    let text = std::str::from_utf8(public_key).map_err(|_| "key text is not UTF-8".to_string())?;
    PublicKey::from_base64(text).map_err(|e| format!("invalid minisign public key: {e}"))
}

/// A decrypted minisign secret key and its public half.
pub struct MinisignKey {
    secret: Box<SecretKey>,
    public: PublicKey,
}

impl MinisignKey {
    pub fn new(secret: SecretKey) -> Result<Self, KeyError> {
        let public = PublicKey::from_secret_key(&secret).map_err(|e| KeyError::Decode {
            reason: e.to_string(),
        })?;
        Ok(Self {
            secret: Box::new(secret),
            public,
        })
    }

    /// `RWQ...` text, as carried in signature lines and trust configs.
    pub fn public_key_text(&self) -> String {
        self.public.to_base64()
    }

    pub(super) fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, SignError> {
        minisign::sign(
            Some(&self.public),
            &self.secret,
            Cursor::new(payload),
            None,
            None,
        )
        .map(|signature| signature.into_string().into_bytes())
        .map_err(|e| SignError::Signer {
            reason: e.to_string(),
        })
    }
}

/// Whether a minisign secret key file is scrypt-encrypted.
pub(super) fn is_encrypted_key(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with(UNTRUSTED_COMMENT))
        .and_then(|line| BASE64.decode(line).ok())
        .is_some_and(|bytes| bytes.get(2..4) == Some(SCRYPT_KDF))
}

pub(super) fn decode_secret_key(text: &str, password: Option<&str>) -> Result<MinisignKey, KeyError> {
    let sk_box = SecretKeyBox::from_string(text).map_err(|e| KeyError::Decode {
        reason: e.to_string(),
    })?;

    let secret = if is_encrypted_key(text) {
        let password = password.ok_or(KeyError::PasswordRequired)?;
        sk_box
            .into_secret_key(Some(password.to_string()))
            .map_err(|_| KeyError::Decrypt)?
    } else {
        sk_box
            .into_unencrypted_secret_key()
            .map_err(|e| KeyError::Decode {
                reason: e.to_string(),
            })?
    };
    MinisignKey::new(secret)
}
