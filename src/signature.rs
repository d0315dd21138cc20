//! ECDSA signatures: deterministic (RFC 6979), SHA-256 prehash, compact
//! 64-byte r||s with a lowercase-hex string form.

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};

use crate::error::{EciesError, ErrorKind, Result};
use crate::keys::{normalize_public_key, KeyPair};
use crate::wire::SIGNATURE_LENGTH;

/// Sign `message` with the pair's private scalar.
///
/// The message is hashed with SHA-256 and the nonce is derived per
/// RFC 6979, so the output is stable across runs.
pub fn sign(key: &KeyPair, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH]> {
    let signing_key = SigningKey::from_bytes(&key.secret().to_bytes())
        .map_err(|_| ErrorKind::SecretComputationFailed)?;
    let signature: Signature = signing_key.sign(message);
    let mut out = [0u8; SIGNATURE_LENGTH];
    out.copy_from_slice(&signature.to_bytes());
    Ok(out)
}

/// Verify a compact signature against any accepted public-key form.
///
/// Returns `false` on every failure (wrong signature length, malformed
/// key, parse errors) and never raises.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    if signature.len() != SIGNATURE_LENGTH {
        return false;
    }
    let Ok(normalized) = normalize_public_key(public_key) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_sec1_bytes(&normalized) else {
        return false;
    };
    let Ok(parsed) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify(message, &parsed).is_ok()
}

// ---------------------------------------------------------------------------
// Hex codec
// ---------------------------------------------------------------------------

/// 128 lowercase hex chars, no prefix.
pub fn signature_to_hex(signature: &[u8; SIGNATURE_LENGTH]) -> String {
    hex::encode(signature)
}

pub fn signature_from_hex(text: &str) -> Result<[u8; SIGNATURE_LENGTH]> {
    let bytes = hex::decode(text)
        .map_err(|_| EciesError::new(ErrorKind::InvalidSignatureFormat { length: text.len() }))?;
    if bytes.len() != SIGNATURE_LENGTH {
        return Err(ErrorKind::InvalidSignatureFormat { length: bytes.len() }.into());
    }
    let mut out = [0u8; SIGNATURE_LENGTH];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> KeyPair {
        let mut sk = [0u8; 32];
        sk[31] = 2;
        KeyPair::from_private_bytes(&sk).unwrap()
    }

    #[test]
    fn sign_verify_roundtrip() {
        let key = signer();
        let sig = sign(&key, b"abc").unwrap();
        assert!(verify(&key.public_uncompressed(), b"abc", &sig));
        assert!(verify(&key.public_compressed(), b"abc", &sig));
    }

    #[test]
    fn deterministic_across_runs() {
        let key = signer();
        assert_eq!(sign(&key, b"abc").unwrap(), sign(&key, b"abc").unwrap());
        assert_ne!(sign(&key, b"abc").unwrap(), sign(&key, b"abd").unwrap());
    }

    #[test]
    fn flipped_byte_fails_verification() {
        let key = signer();
        let mut sig = sign(&key, b"abc").unwrap();
        sig[0] ^= 0x01;
        assert!(!verify(&key.public_uncompressed(), b"abc", &sig));
    }

    #[test]
    fn unrelated_key_fails_verification() {
        let key = signer();
        let other = KeyPair::generate().unwrap();
        let sig = sign(&key, b"abc").unwrap();
        assert!(!verify(&other.public_uncompressed(), b"abc", &sig));
    }

    #[test]
    fn verify_never_raises() {
        let key = signer();
        let sig = sign(&key, b"abc").unwrap();
        assert!(!verify(&key.public_uncompressed(), b"abc", &sig[..63]));
        assert!(!verify(&key.public_uncompressed(), b"abc", &[0u8; 64]));
        assert!(!verify(&[], b"abc", &sig));
        assert!(!verify(&[0u8; 65], b"abc", &sig));
    }

    #[test]
    fn hex_codec_roundtrip() {
        let key = signer();
        let sig = sign(&key, b"message").unwrap();
        let text = signature_to_hex(&sig);
        assert_eq!(text.len(), 128);
        assert_eq!(text, text.to_lowercase());
        assert_eq!(signature_from_hex(&text).unwrap(), sig);
    }

    #[test]
    fn malformed_hex_rejected() {
        assert!(matches!(
            signature_from_hex("zz").unwrap_err().kind(),
            ErrorKind::InvalidSignatureFormat { .. }
        ));
        assert!(matches!(
            signature_from_hex("abcd").unwrap_err().kind(),
            ErrorKind::InvalidSignatureFormat { length: 2 }
        ));
    }
}
