//! Wire format constants and the shared frame prefix.
//!
//! Every frame starts with `version[1] || cipher_suite[1] || type[1]`.
//! Multi-byte integers are big-endian. Layouts:
//!
//! ```text
//! SIMPLE   (33): prefix[3] || ephemeral_pk[65] || iv[16] || tag[16]                     = 100
//! SINGLE   (66): SIMPLE layout || data_length[8]                                        = 108
//! MULTIPLE (99): SIMPLE layout || data_length[8] || count[2]
//!                || id[w] * N || wrapped_key[129] * N                                   = 110 + N*(w+129)
//! ```
//!
//! each followed by ciphertext whose length equals the plaintext length
//! (AES-GCM does not expand plaintext; the tag lives in the header).

use crate::error::{EciesError, ErrorKind, Result};

/// Version byte carried by every frame.
pub const VERSION: u8 = 1;

/// Cipher-suite byte: secp256k1 + AES-256-GCM + HKDF-SHA256.
pub const CIPHER_SUITE: u8 = 1;

// ---------------------------------------------------------------------------
// Component sizes
// ---------------------------------------------------------------------------

/// Uncompressed SEC1 public key (0x04 prefix).
pub const PUBLIC_KEY_LENGTH: usize = 65;

/// Legacy raw public key: uncompressed without the 0x04 prefix.
pub const RAW_PUBLIC_KEY_LENGTH: usize = 64;

/// Compressed SEC1 public key (0x02/0x03 prefix).
pub const COMPRESSED_PUBLIC_KEY_LENGTH: usize = 33;

/// Private scalar size.
pub const PRIVATE_KEY_LENGTH: usize = 32;

pub const SYMMETRIC_KEY_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 16;
pub const AUTH_TAG_LENGTH: usize = 16;

/// Compact ECDSA signature: r[32] || s[32].
pub const SIGNATURE_LENGTH: usize = 64;

/// SHA3-512 checksum size.
pub const CHECKSUM_LENGTH: usize = 64;

/// Big-endian u64 payload length field.
pub const DATA_LENGTH_SIZE: usize = 8;

/// Big-endian u16 recipient count field.
pub const RECIPIENT_COUNT_SIZE: usize = 2;

/// Per-recipient wrapped key:
/// recipient_pk[65] || iv[16] || tag[16] || wrapped_content_key[32].
pub const ENCRYPTED_KEY_SIZE: usize =
    PUBLIC_KEY_LENGTH + IV_LENGTH + AUTH_TAG_LENGTH + SYMMETRIC_KEY_LENGTH; // 129

/// Shared prefix: version + cipher suite + encryption type.
pub const PREFIX_LENGTH: usize = 3;

/// SIMPLE fixed overhead.
pub const SIMPLE_OVERHEAD: usize =
    PREFIX_LENGTH + PUBLIC_KEY_LENGTH + IV_LENGTH + AUTH_TAG_LENGTH; // 100

/// SINGLE fixed overhead.
pub const SINGLE_OVERHEAD: usize = SIMPLE_OVERHEAD + DATA_LENGTH_SIZE; // 108

/// MULTIPLE fixed overhead, before the per-recipient tables.
pub const MULTIPLE_FIXED_OVERHEAD: usize =
    SIMPLE_OVERHEAD + DATA_LENGTH_SIZE + RECIPIENT_COUNT_SIZE; // 110

/// Recipient count must fit in a u16.
pub const MAX_RECIPIENTS: usize = u16::MAX as usize;

/// Total MULTIPLE header size for `recipient_count` recipients whose ids are
/// `id_width` bytes wide.
pub fn multiple_overhead(recipient_count: usize, id_width: usize) -> usize {
    MULTIPLE_FIXED_OVERHEAD + recipient_count * (id_width + ENCRYPTED_KEY_SIZE)
}

// ---------------------------------------------------------------------------
// Encryption-type tag
// ---------------------------------------------------------------------------

/// The mode byte embedded in every frame. The byte in the frame is the
/// single source of truth for the framing mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionType {
    /// Single recipient, no explicit length field.
    Simple = 33,
    /// Single recipient with explicit data length.
    Single = 66,
    /// Multi-recipient envelope.
    Multiple = 99,
}

impl EncryptionType {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            33 => Ok(Self::Simple),
            66 => Ok(Self::Single),
            99 => Ok(Self::Multiple),
            other => Err(ErrorKind::InvalidEncryptionType { actual: other }.into()),
        }
    }

    /// Fixed overhead for the single-recipient variants. MULTIPLE overhead
    /// depends on the recipient table; see [`multiple_overhead`].
    pub fn fixed_overhead(self) -> usize {
        match self {
            Self::Simple => SIMPLE_OVERHEAD,
            Self::Single => SINGLE_OVERHEAD,
            Self::Multiple => MULTIPLE_FIXED_OVERHEAD,
        }
    }
}

// ---------------------------------------------------------------------------
// Prefix codec
// ---------------------------------------------------------------------------

/// Append `version || cipher_suite || type` to an output frame.
pub fn write_prefix(out: &mut Vec<u8>, encryption_type: EncryptionType) {
    out.push(VERSION);
    out.push(CIPHER_SUITE);
    out.push(encryption_type.as_byte());
}

/// Validate the prefix at `offset`, requiring `expected` as the type byte.
pub fn read_prefix(data: &[u8], offset: usize, expected: EncryptionType) -> Result<()> {
    let actual = read_frame_type(data, offset)?;
    if actual != expected {
        return Err(EciesError::new(ErrorKind::EncryptionTypeMismatch {
            expected: expected.as_byte(),
            actual: actual.as_byte(),
        })
        .at_position(offset + 2));
    }
    Ok(())
}

/// Validate version and cipher-suite bytes at `offset` and return the frame's
/// declared encryption type.
pub fn read_frame_type(data: &[u8], offset: usize) -> Result<EncryptionType> {
    if data.len() < offset + PREFIX_LENGTH {
        return Err(ErrorKind::InvalidHeaderLength {
            minimum: offset + PREFIX_LENGTH,
            actual: data.len(),
        }
        .into());
    }
    let version = data[offset];
    if version != VERSION {
        return Err(EciesError::new(ErrorKind::InvalidVersion {
            expected: VERSION,
            actual: version,
        })
        .at_position(offset));
    }
    let suite = data[offset + 1];
    if suite != CIPHER_SUITE {
        return Err(EciesError::new(ErrorKind::InvalidCipherSuite {
            expected: CIPHER_SUITE,
            actual: suite,
        })
        .at_position(offset + 1));
    }
    EncryptionType::from_byte(data[offset + 2]).map_err(|e| e.at_position(offset + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overhead_arithmetic() {
        assert_eq!(SIMPLE_OVERHEAD, 100);
        assert_eq!(SINGLE_OVERHEAD, 108);
        assert_eq!(MULTIPLE_FIXED_OVERHEAD, 110);
        assert_eq!(ENCRYPTED_KEY_SIZE, 129);
        assert_eq!(multiple_overhead(2, 12), 110 + 2 * 141);
    }

    #[test]
    fn type_byte_roundtrip() {
        for ty in [EncryptionType::Simple, EncryptionType::Single, EncryptionType::Multiple] {
            assert_eq!(EncryptionType::from_byte(ty.as_byte()).unwrap(), ty);
        }
        assert_eq!(EncryptionType::Simple.as_byte(), 0x21);
        assert_eq!(EncryptionType::Single.as_byte(), 0x42);
        assert_eq!(EncryptionType::Multiple.as_byte(), 0x63);
    }

    #[test]
    fn unknown_type_byte_rejected() {
        let err = EncryptionType::from_byte(0x00).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidEncryptionType { actual: 0 });
    }

    #[test]
    fn prefix_validation_order() {
        let mut frame = Vec::new();
        write_prefix(&mut frame, EncryptionType::Simple);

        let mut bad_version = frame.clone();
        bad_version[0] = 2;
        assert!(matches!(
            read_prefix(&bad_version, 0, EncryptionType::Simple).unwrap_err().kind(),
            ErrorKind::InvalidVersion { actual: 2, .. }
        ));

        let mut bad_suite = frame.clone();
        bad_suite[1] = 9;
        assert!(matches!(
            read_prefix(&bad_suite, 0, EncryptionType::Simple).unwrap_err().kind(),
            ErrorKind::InvalidCipherSuite { actual: 9, .. }
        ));

        assert!(matches!(
            read_prefix(&frame, 0, EncryptionType::Single).unwrap_err().kind(),
            ErrorKind::EncryptionTypeMismatch { expected: 0x42, actual: 0x21 }
        ));
    }

    #[test]
    fn prefix_respects_preamble_offset() {
        let mut frame = vec![0xEE, 0xEE, 0xEE, 0xEE];
        write_prefix(&mut frame, EncryptionType::Multiple);
        assert_eq!(read_frame_type(&frame, 4).unwrap(), EncryptionType::Multiple);
        assert!(read_frame_type(&frame, 0).is_err());
    }
}
