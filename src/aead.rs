//! AEAD: AES-256-GCM with a 16-byte IV and 16-byte tag.
//!
//! Ciphertext length always equals plaintext length; the tag travels
//! separately. Every decrypt failure collapses to `DecryptionFailed`.

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use getrandom::getrandom;
use zeroize::Zeroizing;

use crate::error::{ErrorKind, Result};
use crate::wire::{AUTH_TAG_LENGTH, IV_LENGTH, SYMMETRIC_KEY_LENGTH};

/// AES-256-GCM parameterized with the frame format's 16-byte IV.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// GCM plaintext bound: 2^39 - 256 bits.
const MAX_PLAINTEXT_BYTES: u64 = (1 << 36) - 32;

/// Generate a random 16-byte IV. Used during encryption only.
pub fn random_iv() -> Result<[u8; IV_LENGTH]> {
    let mut iv = [0u8; IV_LENGTH];
    getrandom(&mut iv).map_err(|_| ErrorKind::SecretComputationFailed)?;
    Ok(iv)
}

/// Generate a random 32-byte symmetric key.
pub fn random_symmetric_key() -> Result<Zeroizing<[u8; SYMMETRIC_KEY_LENGTH]>> {
    let mut key = Zeroizing::new([0u8; SYMMETRIC_KEY_LENGTH]);
    getrandom(key.as_mut()).map_err(|_| ErrorKind::SecretComputationFailed)?;
    Ok(key)
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm16> {
    if key.len() != SYMMETRIC_KEY_LENGTH {
        return Err(ErrorKind::InvalidAesKeyLength {
            expected: SYMMETRIC_KEY_LENGTH,
            actual: key.len(),
        }
        .into());
    }
    Aes256Gcm16::new_from_slice(key).map_err(|_| {
        ErrorKind::InvalidAesKeyLength {
            expected: SYMMETRIC_KEY_LENGTH,
            actual: key.len(),
        }
        .into()
    })
}

/// Encrypt `plaintext`, returning `(iv, ciphertext, tag)` with a fresh IV.
pub fn encrypt(
    key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<([u8; IV_LENGTH], Vec<u8>, [u8; AUTH_TAG_LENGTH])> {
    let cipher = cipher(key)?;
    let iv = random_iv()?;
    let nonce = Nonce::<U16>::from_slice(&iv);
    let mut combined = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|_| ErrorKind::MessageTooLarge {
            maximum: MAX_PLAINTEXT_BYTES,
            actual: plaintext.len() as u64,
        })?;

    // aes-gcm appends the tag; peel it off so the frame can place it.
    let tag_start = combined.len() - AUTH_TAG_LENGTH;
    let mut tag = [0u8; AUTH_TAG_LENGTH];
    tag.copy_from_slice(&combined[tag_start..]);
    combined.truncate(tag_start);
    Ok((iv, combined, tag))
}

/// Decrypt `(iv, ciphertext, tag)`. Any integrity failure surfaces as
/// `DecryptionFailed`.
pub fn decrypt(
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    if iv.len() != IV_LENGTH {
        return Err(ErrorKind::InvalidIvLength {
            expected: IV_LENGTH,
            actual: iv.len(),
        }
        .into());
    }
    if tag.len() != AUTH_TAG_LENGTH {
        return Err(ErrorKind::InvalidAuthTagLength {
            expected: AUTH_TAG_LENGTH,
            actual: tag.len(),
        }
        .into());
    }
    let cipher = cipher(key)?;
    let nonce = Nonce::<U16>::from_slice(iv);

    let mut combined = Vec::with_capacity(ciphertext.len() + AUTH_TAG_LENGTH);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(nonce, Payload { msg: &combined, aad })
        .map_err(|_| ErrorKind::DecryptionFailed.into())
}

// ---------------------------------------------------------------------------
// Join/split helpers
// ---------------------------------------------------------------------------

/// Concatenate `iv || ciphertext || tag`.
pub fn join_components(iv: &[u8], ciphertext: &[u8], tag: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(iv.len() + ciphertext.len() + tag.len());
    out.extend_from_slice(iv);
    out.extend_from_slice(ciphertext);
    out.extend_from_slice(tag);
    out
}

/// Split `iv || ciphertext || tag` back into its components.
pub fn split_components(data: &[u8]) -> Result<(&[u8], &[u8], &[u8])> {
    if data.len() < IV_LENGTH + AUTH_TAG_LENGTH {
        return Err(ErrorKind::InvalidHeaderLength {
            minimum: IV_LENGTH + AUTH_TAG_LENGTH,
            actual: data.len(),
        }
        .into());
    }
    let (iv, rest) = data.split_at(IV_LENGTH);
    let (ciphertext, tag) = rest.split_at(rest.len() - AUTH_TAG_LENGTH);
    Ok((iv, ciphertext, tag))
}

/// Split `iv || ciphertext_with_tag` (the tag still trailing the ciphertext).
pub fn split_iv_and_tagged(data: &[u8]) -> Result<(&[u8], &[u8])> {
    if data.len() < IV_LENGTH + AUTH_TAG_LENGTH {
        return Err(ErrorKind::InvalidHeaderLength {
            minimum: IV_LENGTH + AUTH_TAG_LENGTH,
            actual: data.len(),
        }
        .into());
    }
    Ok(data.split_at(IV_LENGTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        [0x11; 32]
    }

    #[test]
    fn roundtrip() {
        let (iv, ct, tag) = encrypt(&key(), b"payload", b"").unwrap();
        assert_eq!(ct.len(), 7);
        let pt = decrypt(&key(), &iv, &ct, &tag, b"").unwrap();
        assert_eq!(pt, b"payload");
    }

    #[test]
    fn roundtrip_with_aad() {
        let (iv, ct, tag) = encrypt(&key(), b"payload", b"bound").unwrap();
        assert_eq!(decrypt(&key(), &iv, &ct, &tag, b"bound").unwrap(), b"payload");
        let err = decrypt(&key(), &iv, &ct, &tag, b"other").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DecryptionFailed);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let (iv, mut ct, tag) = encrypt(&key(), b"payload", b"").unwrap();
        ct[0] ^= 0x01;
        let err = decrypt(&key(), &iv, &ct, &tag, b"").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DecryptionFailed);
    }

    #[test]
    fn tampered_tag_fails() {
        let (iv, ct, mut tag) = encrypt(&key(), b"payload", b"").unwrap();
        tag[15] ^= 0x80;
        assert!(decrypt(&key(), &iv, &ct, &tag, b"").is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let (iv, ct, tag) = encrypt(&key(), b"payload", b"").unwrap();
        let err = decrypt(&[0x22; 32], &iv, &ct, &tag, b"").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DecryptionFailed);
    }

    #[test]
    fn length_validation() {
        assert!(matches!(
            encrypt(&[0u8; 16], b"x", b"").unwrap_err().kind(),
            ErrorKind::InvalidAesKeyLength { actual: 16, .. }
        ));
        let (iv, ct, tag) = encrypt(&key(), b"x", b"").unwrap();
        assert!(matches!(
            decrypt(&key(), &iv[..12], &ct, &tag, b"").unwrap_err().kind(),
            ErrorKind::InvalidIvLength { actual: 12, .. }
        ));
        assert!(matches!(
            decrypt(&key(), &iv, &ct, &tag[..8], b"").unwrap_err().kind(),
            ErrorKind::InvalidAuthTagLength { actual: 8, .. }
        ));
    }

    #[test]
    fn join_split_roundtrip() {
        let (iv, ct, tag) = encrypt(&key(), b"some payload", b"").unwrap();
        let joined = join_components(&iv, &ct, &tag);
        let (iv2, ct2, tag2) = split_components(&joined).unwrap();
        assert_eq!(iv2, iv);
        assert_eq!(ct2, &ct[..]);
        assert_eq!(tag2, tag);

        let mut tagged = ct.clone();
        tagged.extend_from_slice(&tag);
        let mut with_iv = iv.to_vec();
        with_iv.extend_from_slice(&tagged);
        let (iv3, rest) = split_iv_and_tagged(&with_iv).unwrap();
        assert_eq!(iv3, iv);
        assert_eq!(rest, &tagged[..]);
    }

    #[test]
    fn fresh_iv_per_encryption() {
        let (iv1, _, _) = encrypt(&key(), b"payload", b"").unwrap();
        let (iv2, _, _) = encrypt(&key(), b"payload", b"").unwrap();
        assert_ne!(iv1, iv2);
    }
}
