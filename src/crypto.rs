use aes::Aes256;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::{SecurityKey, SessionError};

/// Size of the random IV prepended to every token.
pub const IV_SIZE: usize = 16;

/// Key size required by [`AesCbcCodec`].
pub const AES_KEY_SIZE: usize = 32;

const BLOCK_SIZE: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Trait for turning store keys into client-facing tokens and back.
///
/// This trait allows pluggable token encodings. The default implementation
/// is [`AesCbcCodec`]. Any implementation must make `decrypt(encrypt(k)) == k`
/// and should make forged tokens fail to decrypt.
///
/// # Example
///
/// ```rust
/// use sessionhub::{AesCbcCodec, Codec, SecurityKey};
///
/// let codec = AesCbcCodec;
/// let key = SecurityKey::new(*b"e9a2f9cbfab74abaa472ff7385dd8224");
///
/// let token = codec.encrypt("6f1c2b4e-0000-4000-8000-000000000000", &key).unwrap();
/// assert_eq!(
///     codec.decrypt(&token, &key).unwrap(),
///     "6f1c2b4e-0000-4000-8000-000000000000"
/// );
/// ```
pub trait Codec: Send + Sync {
    /// Encrypt a store key into an opaque token.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Configuration` if the key is unusable.
    fn encrypt(&self, store_key: &str, key: &SecurityKey) -> Result<String, SessionError>;

    /// Decrypt a token back into its store key.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TokenTampered` if the token does not decode.
    fn decrypt(&self, token: &str, key: &SecurityKey) -> Result<String, SessionError>;

    /// Check the key once, before the codec is used.
    ///
    /// The hub calls this at construction so a bad key never reaches a
    /// request.
    fn validate_key(&self, _key: &SecurityKey) -> Result<(), SessionError> {
        Ok(())
    }
}

/// AES-256-CBC with PKCS7 padding and a random IV per token.
///
/// Token layout: `base64url(iv[16] || ciphertext)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesCbcCodec;

impl Codec for AesCbcCodec {
    fn encrypt(&self, store_key: &str, key: &SecurityKey) -> Result<String, SessionError> {
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut iv);

        let encryptor = Aes256CbcEnc::new_from_slices(key.expose_secret(), &iv)
            .map_err(|_| invalid_key_length(key))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(store_key.as_bytes());

        let mut token = Vec::with_capacity(IV_SIZE + ciphertext.len());
        token.extend_from_slice(&iv);
        token.extend_from_slice(&ciphertext);

        Ok(URL_SAFE.encode(token))
    }

    fn decrypt(&self, token: &str, key: &SecurityKey) -> Result<String, SessionError> {
        let raw = URL_SAFE
            .decode(token)
            .map_err(|e| SessionError::TokenTampered(format!("not base64url: {e}")))?;

        if raw.len() < IV_SIZE {
            return Err(SessionError::TokenTampered(
                "token shorter than its IV".to_owned(),
            ));
        }
        let (iv, ciphertext) = raw.split_at(IV_SIZE);
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(SessionError::TokenTampered(
                "ciphertext is not a whole number of blocks".to_owned(),
            ));
        }

        let decryptor = Aes256CbcDec::new_from_slices(key.expose_secret(), iv)
            .map_err(|_| invalid_key_length(key))?;
        let plaintext = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| SessionError::TokenTampered("bad padding".to_owned()))?;

        String::from_utf8(plaintext)
            .map_err(|_| SessionError::TokenTampered("store key is not utf-8".to_owned()))
    }

    fn validate_key(&self, key: &SecurityKey) -> Result<(), SessionError> {
        if key.len() == AES_KEY_SIZE {
            Ok(())
        } else {
            Err(invalid_key_length(key))
        }
    }
}

fn invalid_key_length(key: &SecurityKey) -> SessionError {
    SessionError::Configuration(format!(
        "security_key must be {AES_KEY_SIZE} bytes, got {}",
        key.len()
    ))
}

/// Generates a fresh store key (a random v4 UUID).
pub fn generate_store_key() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Returns true if `value` has the exact shape produced by
/// [`generate_store_key`].
pub fn is_store_key(value: &str) -> bool {
    Uuid::try_parse(value).is_ok_and(|id| id.hyphenated().to_string() == value)
}
