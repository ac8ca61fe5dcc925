//! Security-focused test suite.
//!
//! Covers token confidentiality, tamper detection and secret redaction.
//! Run with: `cargo test --test security`

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use sessionhub::crypto::{AesCbcCodec, Codec, IV_SIZE, generate_store_key};
use sessionhub::{Hub, HubConfig, InMemorySessionStore, SecurityKey};

fn key() -> SecurityKey {
    SecurityKey::from("e9a2f9cbfab74abaa472ff7385dd8224")
}

fn flip_bit(token: &str, bit: usize) -> String {
    let mut raw = URL_SAFE.decode(token).unwrap();
    raw[bit / 8] ^= 1 << (bit % 8);
    URL_SAFE.encode(raw)
}

// =============================================================================
// Token format
// =============================================================================

#[test]
fn token_does_not_contain_store_key() {
    let store_key = generate_store_key();
    let token = AesCbcCodec.encrypt(&store_key, &key()).unwrap();

    assert!(!token.contains(&store_key));
    assert!(!token.contains(&store_key[..8]));
}

#[test]
fn token_is_url_and_cookie_safe() {
    for _ in 0..64 {
        let token = AesCbcCodec.encrypt(&generate_store_key(), &key()).unwrap();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '=')
        );
    }
}

#[test]
fn same_store_key_never_yields_same_token() {
    let store_key = generate_store_key();
    let mut ivs = HashSet::new();

    for _ in 0..1000 {
        let token = AesCbcCodec.encrypt(&store_key, &key()).unwrap();
        let raw = URL_SAFE.decode(&token).unwrap();
        assert!(ivs.insert(raw[..IV_SIZE].to_vec()));
    }
}

// =============================================================================
// Tamper detection
// =============================================================================

#[test]
fn single_bit_flip_never_recovers_store_key() {
    let store_key = generate_store_key();
    let token = AesCbcCodec.encrypt(&store_key, &key()).unwrap();
    let bits = URL_SAFE.decode(&token).unwrap().len() * 8;

    for bit in 0..bits {
        let flipped = flip_bit(&token, bit);
        if let Ok(decrypted) = AesCbcCodec.decrypt(&flipped, &key()) {
            assert_ne!(decrypted, store_key, "bit {bit} left the store key intact");
        }
    }
}

#[test]
fn last_block_flips_fail_padding() {
    let token = AesCbcCodec.encrypt(&generate_store_key(), &key()).unwrap();
    let len = URL_SAFE.decode(&token).unwrap().len();
    let last_block = (len - 16) * 8..len * 8;

    let rejected = last_block
        .filter(|&bit| {
            AesCbcCodec
                .decrypt(&flip_bit(&token, bit), &key())
                .is_err()
        })
        .count();

    assert!(rejected >= 120, "only {rejected} of 128 flips rejected");
}

#[tokio::test]
async fn flipped_token_never_reaches_original_session() {
    let hub = Hub::new(InMemorySessionStore::new(), HubConfig::new(key())).unwrap();
    let token = hub.new_session_id().await.unwrap();
    let bits = URL_SAFE.decode(&token).unwrap().len() * 8;

    for bit in 0..bits {
        match hub.session_by_id(&flip_bit(&token, bit)).await {
            Err(err) => assert!(err.is_tampered()),
            Ok(session) => assert!(session.is_none(), "bit {bit} resolved a session"),
        }
    }
}

#[tokio::test]
async fn plaintext_store_key_is_rejected() {
    let hub = Hub::new(InMemorySessionStore::new(), HubConfig::new(key())).unwrap();

    let err = hub.session_by_id(&generate_store_key()).await.unwrap_err();
    assert!(err.is_tampered());
}

#[test]
fn wrong_key_cannot_decrypt() {
    let store_key = generate_store_key();
    let token = AesCbcCodec.encrypt(&store_key, &key()).unwrap();
    let other = SecurityKey::from("ffffffffffffffffffffffffffffffff");

    match AesCbcCodec.decrypt(&token, &other) {
        Err(err) => assert!(err.is_tampered()),
        Ok(decrypted) => assert_ne!(decrypted, store_key),
    }
}

// =============================================================================
// Redaction
// =============================================================================

#[test]
fn security_key_is_redacted() {
    let key = key();
    assert!(!format!("{key:?}").contains("e9a2f9cb"));
    assert!(!format!("{key}").contains("e9a2f9cb"));
}

#[tokio::test]
async fn session_debug_hides_token() {
    let hub = Hub::new(InMemorySessionStore::new(), HubConfig::new(key())).unwrap();
    let token = hub.new_session_id().await.unwrap();
    let session = hub.session_by_id(&token).await.unwrap().unwrap();

    assert!(!format!("{session:?}").contains(&token));
}
