//! Compact JWE serialization for token encryption.
//!
//! Direct symmetric encryption only: `alg=dir` with `enc=A256GCM`.
//! The signed token is the JWE plaintext, so verification always sees
//! a normal JWS after unwrapping.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Deserialize;

use crate::error::AuthError;
use crate::AuthResult;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// The protected header for every token this module produces.
const PROTECTED_HEADER: &str = r#"{"alg":"dir","enc":"A256GCM"}"#;

#[derive(Deserialize)]
struct JweHeader {
    alg: String,
    enc: String,
}

/// Encrypts `plaintext` into a compact JWE string.
///
/// # Errors
///
/// Returns [`AuthError::Internal`] if encryption fails.
pub fn encrypt(plaintext: &str, key: &[u8; 32]) -> AuthResult<String> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| AuthError::internal(format!("invalid JWE key: {e}")))?;

    let protected = URL_SAFE_NO_PAD.encode(PROTECTED_HEADER.as_bytes());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from(nonce_bytes);

    // The base64 protected header is the additional authenticated data.
    let sealed = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext.as_bytes(),
                aad: protected.as_bytes(),
            },
        )
        .map_err(|e| AuthError::internal(format!("JWE encryption failed: {e}")))?;

    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

    // Compact serialization; the encrypted-key segment is empty for
    // direct encryption.
    Ok(format!(
        "{}..{}.{}.{}",
        protected,
        URL_SAFE_NO_PAD.encode(nonce_bytes),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(tag)
    ))
}

/// Decrypts a compact JWE string back to its plaintext.
///
/// Returns `None` for any structural, header, or cryptographic
/// failure.
#[must_use]
pub fn decrypt(token: &str, key: &[u8; 32]) -> Option<String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 5 || !parts[1].is_empty() {
        return None;
    }

    let header_bytes = URL_SAFE_NO_PAD.decode(parts[0]).ok()?;
    let header: JweHeader = serde_json::from_slice(&header_bytes).ok()?;
    if header.alg != "dir" || header.enc != "A256GCM" {
        return None;
    }

    let nonce_bytes = URL_SAFE_NO_PAD.decode(parts[2]).ok()?;
    if nonce_bytes.len() != NONCE_LEN {
        return None;
    }
    let ciphertext = URL_SAFE_NO_PAD.decode(parts[3]).ok()?;
    let tag = URL_SAFE_NO_PAD.decode(parts[4]).ok()?;
    if tag.len() != TAG_LEN {
        return None;
    }

    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);

    let nonce = Nonce::from_slice(&nonce_bytes);
    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &sealed,
                aad: parts[0].as_bytes(),
            },
        )
        .ok()?;

    String::from_utf8(plaintext).ok()
}

/// Returns `true` if `token` has the five-part shape of a compact JWE.
#[must_use]
pub fn looks_like_jwe(token: &str) -> bool {
    token.split('.').count() == 5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = [7u8; 32];
        let jws = "eyJhbGciOiJSUzI1NiJ9.eyJzdWIiOiIxIn0.sig";

        let jwe = encrypt(jws, &key).unwrap();
        assert!(looks_like_jwe(&jwe));
        assert!(!looks_like_jwe(jws));

        assert_eq!(decrypt(&jwe, &key).as_deref(), Some(jws));
    }

    #[test]
    fn test_wrong_key_fails() {
        let jwe = encrypt("payload", &[1u8; 32]).unwrap();
        assert_eq!(decrypt(&jwe, &[2u8; 32]), None);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = [3u8; 32];
        let jwe = encrypt("payload", &key).unwrap();

        let mut parts: Vec<String> = jwe.split('.').map(str::to_string).collect();
        parts[3] = URL_SAFE_NO_PAD.encode(b"tampered");
        assert_eq!(decrypt(&parts.join("."), &key), None);
    }

    #[test]
    fn test_rejects_foreign_headers() {
        let key = [4u8; 32];
        let jwe = encrypt("payload", &key).unwrap();
        let parts: Vec<&str> = jwe.split('.').collect();

        let foreign = URL_SAFE_NO_PAD.encode(br#"{"alg":"RSA-OAEP","enc":"A256GCM"}"#);
        let forged = format!(
            "{}..{}.{}.{}",
            foreign, parts[2], parts[3], parts[4]
        );
        assert_eq!(decrypt(&forged, &key), None);
    }

    #[test]
    fn test_rejects_malformed_input() {
        let key = [5u8; 32];
        assert_eq!(decrypt("not-a-jwe", &key), None);
        assert_eq!(decrypt("a.b.c", &key), None);
        assert_eq!(decrypt("a.b.c.d.e", &key), None);
    }

    #[test]
    fn test_nonces_are_unique() {
        let key = [6u8; 32];
        let a = encrypt("payload", &key).unwrap();
        let b = encrypt("payload", &key).unwrap();
        assert_ne!(a, b);
    }
}
