// Sealed-box encryption for secret store writes

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crypto_box::aead::OsRng;
use crypto_box::PublicKey;

use crate::error::{RefreshError, Result};

/// Seal a plaintext value under the store's base64-encoded X25519
/// public key, returning base64 ciphertext.
///
/// Only the store's private key can open the box. Errors never carry
/// the plaintext.
pub fn seal_for_store(public_key_b64: &str, plaintext: &str) -> Result<String> {
    let key_bytes = BASE64
        .decode(public_key_b64)
        .map_err(|_| RefreshError::Seal("store public key is not valid base64".to_string()))?;

    let key_bytes: [u8; 32] = key_bytes
        .try_into()
        .map_err(|_| RefreshError::Seal("store public key must be 32 bytes".to_string()))?;

    let public_key = PublicKey::from(key_bytes);

    let ciphertext = public_key
        .seal(&mut OsRng, plaintext.as_bytes())
        .map_err(|_| RefreshError::Seal("sealed box encryption failed".to_string()))?;

    Ok(BASE64.encode(ciphertext))
}
