//! Single-recipient framing: SIMPLE (no length field) and SINGLE
//! (explicit big-endian data length).
//!
//! ```text
//! SIMPLE: prefix[3] || ephemeral_pk[65] || iv[16] || tag[16] || ciphertext
//! SINGLE: prefix[3] || ephemeral_pk[65] || iv[16] || tag[16] || data_length[8] || ciphertext
//! ```
//!
//! SIMPLE carries no explicit length; callers segmenting a stream must
//! supply the frame size out of band.

use crate::aead;
use crate::error::{EciesError, ErrorKind, Result};
use crate::kdf;
use crate::keys::{ecdh_x, parse_public_key, KeyPair};
use crate::wire::{
    read_prefix, write_prefix, EncryptionType, AUTH_TAG_LENGTH, DATA_LENGTH_SIZE, IV_LENGTH,
    PREFIX_LENGTH, PUBLIC_KEY_LENGTH,
};

/// A parsed SIMPLE or SINGLE frame, borrowing from the input buffer.
#[derive(Debug)]
pub struct SingleFrame<'a> {
    pub encryption_type: EncryptionType,
    pub ephemeral_public_key: &'a [u8; PUBLIC_KEY_LENGTH],
    pub iv: &'a [u8; IV_LENGTH],
    pub auth_tag: &'a [u8; AUTH_TAG_LENGTH],
    /// Present for SINGLE only.
    pub data_length: Option<u64>,
    pub ciphertext: &'a [u8],
}

fn require_single_variant(encryption_type: EncryptionType) -> Result<()> {
    if encryption_type == EncryptionType::Multiple {
        return Err(ErrorKind::InvalidEncryptionType {
            actual: encryption_type.as_byte(),
        }
        .into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Encrypt
// ---------------------------------------------------------------------------

/// Encrypt `plaintext` to `recipient_public_key` (any accepted key form),
/// prepending the caller's opaque `preamble`.
pub fn encrypt(
    encryption_type: EncryptionType,
    recipient_public_key: &[u8],
    plaintext: &[u8],
    preamble: &[u8],
) -> Result<Vec<u8>> {
    require_single_variant(encryption_type)?;
    if plaintext.is_empty() {
        return Err(ErrorKind::CannotEncryptEmptyData.into());
    }

    let recipient = parse_public_key(recipient_public_key)
        .map_err(|e| e.in_operation("encrypt_single"))?;

    let ephemeral = KeyPair::generate()?;
    let shared = ecdh_x(ephemeral.secret(), &recipient);
    let key = kdf::derive_symmetric_key(shared.as_ref())?;
    let (iv, ciphertext, tag) = aead::encrypt(key.as_ref(), plaintext, &[])?;

    let mut out = Vec::with_capacity(
        preamble.len() + encryption_type.fixed_overhead() + ciphertext.len(),
    );
    out.extend_from_slice(preamble);
    write_prefix(&mut out, encryption_type);
    out.extend_from_slice(&ephemeral.public_uncompressed());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&tag);
    if encryption_type == EncryptionType::Single {
        out.extend_from_slice(&(plaintext.len() as u64).to_be_bytes());
    }
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Parse a frame of the expected type, skipping `preamble_len` bytes.
pub fn parse(
    encryption_type: EncryptionType,
    data: &[u8],
    preamble_len: usize,
) -> Result<SingleFrame<'_>> {
    require_single_variant(encryption_type)?;

    let overhead = encryption_type.fixed_overhead();
    let minimum = preamble_len + overhead;
    if data.len() < minimum {
        return Err(ErrorKind::InvalidHeaderLength {
            minimum,
            actual: data.len(),
        }
        .into());
    }

    read_prefix(data, preamble_len, encryption_type)?;

    let key_start = preamble_len + PREFIX_LENGTH;
    let iv_start = key_start + PUBLIC_KEY_LENGTH;
    let tag_start = iv_start + IV_LENGTH;
    let tag_end = tag_start + AUTH_TAG_LENGTH;

    let short = || ErrorKind::InvalidHeaderLength {
        minimum,
        actual: data.len(),
    };
    let ephemeral_public_key: &[u8; PUBLIC_KEY_LENGTH] =
        data[key_start..iv_start].try_into().map_err(|_| short())?;
    let iv: &[u8; IV_LENGTH] = data[iv_start..tag_start].try_into().map_err(|_| short())?;
    let auth_tag: &[u8; AUTH_TAG_LENGTH] =
        data[tag_start..tag_end].try_into().map_err(|_| short())?;

    let (data_length, ciphertext) = match encryption_type {
        EncryptionType::Single => {
            let length_end = tag_end + DATA_LENGTH_SIZE;
            let declared = u64::from_be_bytes(
                data[tag_end..length_end].try_into().map_err(|_| short())?,
            );
            let ciphertext = &data[length_end..];
            let actual = ciphertext.len() as u64;
            if actual < declared {
                return Err(EciesError::new(ErrorKind::DataLengthMismatch {
                    expected: declared,
                    actual,
                })
                .at_position(tag_end));
            }
            if actual > declared {
                return Err(EciesError::new(ErrorKind::EncryptedSizeExceedsExpected {
                    expected: declared,
                    actual,
                })
                .at_position(tag_end));
            }
            (Some(declared), ciphertext)
        }
        _ => (None, &data[tag_end..]),
    };

    Ok(SingleFrame {
        encryption_type,
        ephemeral_public_key,
        iv,
        auth_tag,
        data_length,
        ciphertext,
    })
}

// ---------------------------------------------------------------------------
// Decrypt
// ---------------------------------------------------------------------------

/// Decrypt an already-parsed frame with the recipient's key pair.
pub fn decrypt_parsed(recipient: &KeyPair, frame: &SingleFrame<'_>) -> Result<Vec<u8>> {
    if frame.ciphertext.is_empty() {
        return Err(ErrorKind::CannotDecryptEmptyData.into());
    }
    let ephemeral = parse_public_key(frame.ephemeral_public_key)
        .map_err(|_| ErrorKind::InvalidEphemeralPublicKey)?;
    let shared = ecdh_x(recipient.secret(), &ephemeral);
    let key = kdf::derive_symmetric_key(shared.as_ref())?;
    aead::decrypt(key.as_ref(), frame.iv, frame.ciphertext, frame.auth_tag, &[])
}

/// Parse then decrypt in one step.
pub fn decrypt(
    encryption_type: EncryptionType,
    recipient: &KeyPair,
    data: &[u8],
    preamble_len: usize,
) -> Result<Vec<u8>> {
    if data.len() <= preamble_len {
        return Err(ErrorKind::CannotDecryptEmptyData.into());
    }
    let frame = parse(encryption_type, data, preamble_len)?;
    decrypt_parsed(recipient, &frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{SIMPLE_OVERHEAD, SINGLE_OVERHEAD};

    fn recipient() -> KeyPair {
        KeyPair::from_private_bytes(&[0x01; 32]).unwrap()
    }

    #[test]
    fn simple_roundtrip_layout() {
        let key = recipient();
        let frame = encrypt(EncryptionType::Simple, &key.public_compressed(), b"hello world", &[])
            .unwrap();

        assert_eq!(frame.len(), SIMPLE_OVERHEAD + 11);
        assert_eq!(&frame[..4], &[0x01, 0x01, 0x21, 0x04]);

        let plaintext = decrypt(EncryptionType::Simple, &key, &frame, 0).unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[test]
    fn single_roundtrip_and_length_field() {
        let key = recipient();
        let payload = vec![0xAA; 256];
        let frame =
            encrypt(EncryptionType::Single, &key.public_compressed(), &payload, &[]).unwrap();

        assert_eq!(frame.len(), SINGLE_OVERHEAD + 256);
        assert_eq!(frame[2], 0x42);
        assert_eq!(&frame[100..108], &256u64.to_be_bytes());

        assert_eq!(decrypt(EncryptionType::Single, &key, &frame, 0).unwrap(), payload);
    }

    #[test]
    fn truncated_single_reports_length_mismatch() {
        let key = recipient();
        let frame =
            encrypt(EncryptionType::Single, &key.public_compressed(), &[0xAA; 256], &[]).unwrap();
        let err = parse(EncryptionType::Single, &frame[..frame.len() - 1], 0).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::DataLengthMismatch { expected: 256, actual: 255 }
        ));
    }

    #[test]
    fn oversized_single_reports_excess() {
        let key = recipient();
        let mut frame =
            encrypt(EncryptionType::Single, &key.public_compressed(), b"abc", &[]).unwrap();
        frame.push(0x00);
        let err = parse(EncryptionType::Single, &frame, 0).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::EncryptedSizeExceedsExpected { expected: 3, actual: 4 }
        ));
    }

    #[test]
    fn preamble_is_opaque_and_skipped() {
        let key = recipient();
        let preamble = b"MAGICv1\x00";
        let frame = encrypt(
            EncryptionType::Single,
            &key.public_uncompressed(),
            b"with preamble",
            preamble,
        )
        .unwrap();

        assert_eq!(&frame[..preamble.len()], preamble);
        let parsed = parse(EncryptionType::Single, &frame, preamble.len()).unwrap();
        assert_eq!(parsed.data_length, Some(13));
        assert_eq!(
            decrypt(EncryptionType::Single, &key, &frame, preamble.len()).unwrap(),
            b"with preamble"
        );
    }

    #[test]
    fn wrong_expected_type_rejected() {
        let key = recipient();
        let frame =
            encrypt(EncryptionType::Simple, &key.public_compressed(), b"data", &[]).unwrap();
        let err = parse(EncryptionType::Single, &frame, 0).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::EncryptionTypeMismatch { expected: 0x42, actual: 0x21 }
        ));
    }

    #[test]
    fn version_and_suite_negotiation() {
        let key = recipient();
        let mut frame =
            encrypt(EncryptionType::Simple, &key.public_compressed(), b"data", &[]).unwrap();

        frame[0] = 0x02;
        assert!(matches!(
            parse(EncryptionType::Simple, &frame, 0).unwrap_err().kind(),
            ErrorKind::InvalidVersion { expected: 1, actual: 2 }
        ));

        frame[0] = 0x01;
        frame[1] = 0x07;
        assert!(matches!(
            parse(EncryptionType::Simple, &frame, 0).unwrap_err().kind(),
            ErrorKind::InvalidCipherSuite { expected: 1, actual: 7 }
        ));
    }

    #[test]
    fn short_input_rejected() {
        let err = parse(EncryptionType::Simple, &[0x01, 0x01, 0x21], 0).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidHeaderLength { minimum: 100, actual: 3 }
        ));
    }

    #[test]
    fn empty_plaintext_rejected() {
        let key = recipient();
        let err = encrypt(EncryptionType::Simple, &key.public_compressed(), &[], &[]).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::CannotEncryptEmptyData);
    }

    #[test]
    fn tampering_fails_decryption() {
        let key = recipient();
        let clean =
            encrypt(EncryptionType::Single, &key.public_compressed(), b"sensitive", &[]).unwrap();

        // ciphertext, tag, iv, ephemeral key
        for index in [clean.len() - 1, 90, 70, 10] {
            let mut frame = clean.clone();
            frame[index] ^= 0x01;
            let result = decrypt(EncryptionType::Single, &key, &frame, 0);
            match result {
                Err(e) => assert!(matches!(
                    e.kind(),
                    ErrorKind::DecryptionFailed | ErrorKind::InvalidEphemeralPublicKey
                )),
                Ok(_) => panic!("tampered frame at byte {} decrypted", index),
            }
        }
    }

    #[test]
    fn wrong_recipient_fails() {
        let key = recipient();
        let other = KeyPair::generate().unwrap();
        let frame =
            encrypt(EncryptionType::Simple, &key.public_compressed(), b"data", &[]).unwrap();
        let err = decrypt(EncryptionType::Simple, &other, &frame, 0).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DecryptionFailed);
    }

    #[test]
    fn multiple_type_is_not_accepted_here() {
        let key = recipient();
        assert!(encrypt(EncryptionType::Multiple, &key.public_compressed(), b"x", &[]).is_err());
        assert!(parse(EncryptionType::Multiple, &[0u8; 200], 0).is_err());
    }
}
