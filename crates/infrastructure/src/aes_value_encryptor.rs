//! AES-256-GCM encryptor for custom field values at rest.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use attrivo_application::ValueEncryptor;
use attrivo_core::{AppError, AppResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const NONCE_LENGTH: usize = 12;

/// AES-256-GCM encryptor storing `base64(nonce || ciphertext)`.
#[derive(Clone)]
pub struct AesValueEncryptor {
    cipher: Aes256Gcm,
}

impl AesValueEncryptor {
    /// Creates a new encryptor from a 32-byte key.
    #[must_use]
    pub fn new(key_bytes: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(key_bytes.into());
        Self { cipher }
    }

    /// Creates a new encryptor from a hex-encoded 32-byte key.
    pub fn from_hex(hex_key: &str) -> AppResult<Self> {
        let decoded = hex::decode(hex_key.trim()).map_err(|error| {
            AppError::Validation(format!("invalid FIELD_VALUE_ENCRYPTION_KEY hex: {error}"))
        })?;

        let key: [u8; 32] = decoded.try_into().map_err(|_| {
            AppError::Validation(
                "FIELD_VALUE_ENCRYPTION_KEY must be exactly 32 bytes (64 hex chars)".to_owned(),
            )
        })?;

        Ok(Self::new(&key))
    }
}

impl ValueEncryptor for AesValueEncryptor {
    fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|error| {
                AppError::Internal(format!("failed to encrypt field value: {error}"))
            })?;

        let mut sealed = Vec::with_capacity(nonce.len() + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(sealed))
    }

    fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        let sealed = STANDARD.decode(ciphertext.trim()).map_err(|error| {
            AppError::Internal(format!("encrypted field value is not base64: {error}"))
        })?;

        if sealed.len() < NONCE_LENGTH {
            return Err(AppError::Internal(
                "encrypted field value too short: missing nonce".to_owned(),
            ));
        }

        let (nonce_bytes, encrypted) = sealed.split_at(NONCE_LENGTH);
        let nonce_array: [u8; NONCE_LENGTH] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::Internal("nonce must be exactly 12 bytes".to_owned()))?;
        let nonce = Nonce::from(nonce_array);

        let plaintext = self.cipher.decrypt(&nonce, encrypted).map_err(|error| {
            AppError::Internal(format!("failed to decrypt field value: {error}"))
        })?;

        String::from_utf8(plaintext).map_err(|error| {
            AppError::Internal(format!("decrypted field value is not utf-8: {error}"))
        })
    }
}
