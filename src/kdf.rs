//! HKDF-SHA256 (RFC 5869), extract-then-expand.
//!
//! The ECIES paths derive payload and key-wrap keys from an ECDH
//! x-coordinate with no salt and no info.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{ErrorKind, Result};
use crate::wire::SYMMETRIC_KEY_LENGTH;

/// Default output length.
pub const DEFAULT_OUTPUT_LENGTH: usize = SYMMETRIC_KEY_LENGTH;

/// Derive `length` bytes of keying material from `ikm`.
///
/// `salt` defaults to none and `info` to empty, matching the frame codecs.
pub fn derive(
    ikm: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
    length: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = Zeroizing::new(vec![0u8; length]);
    hk.expand(info, &mut okm)
        .map_err(|_| ErrorKind::SecretComputationFailed)?;
    Ok(okm)
}

/// Derive the 32-byte AES key used by the frame codecs (no salt, no info).
pub fn derive_symmetric_key(shared_x: &[u8]) -> Result<Zeroizing<[u8; SYMMETRIC_KEY_LENGTH]>> {
    let hk = Hkdf::<Sha256>::new(None, shared_x);
    let mut okm = Zeroizing::new([0u8; SYMMETRIC_KEY_LENGTH]);
    hk.expand(&[], okm.as_mut())
        .map_err(|_| ErrorKind::SecretComputationFailed)?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_inputs() {
        let a = derive(b"secret", Some(b"salt"), b"info", 32).unwrap();
        let b = derive(b"secret", Some(b"salt"), b"info", 32).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn salt_and_info_change_output() {
        let base = derive(b"secret", None, &[], 32).unwrap();
        let salted = derive(b"secret", Some(b"salt"), &[], 32).unwrap();
        let informed = derive(b"secret", None, b"info", 32).unwrap();
        assert_ne!(*base, *salted);
        assert_ne!(*base, *informed);
    }

    #[test]
    fn rfc5869_case_1_prefix() {
        // RFC 5869 A.1, truncated to the default output length.
        let ikm = [0x0b; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let okm = derive(&ikm, Some(&salt), &info, 32).unwrap();
        assert_eq!(
            hex::encode(&okm[..16]),
            "3cb25f25faacd57a90434f64d0362f2a"
        );
    }

    #[test]
    fn symmetric_key_matches_generic_derive() {
        let shared = [0x42u8; 32];
        let specific = derive_symmetric_key(&shared).unwrap();
        let generic = derive(&shared, None, &[], 32).unwrap();
        assert_eq!(specific.as_slice(), generic.as_slice());
    }

    #[test]
    fn oversized_output_rejected() {
        // HKDF-SHA256 caps output at 255 * 32 bytes.
        assert!(derive(b"secret", None, &[], 255 * 32 + 1).is_err());
    }
}
