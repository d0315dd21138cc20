//! Frozen cryptographic configuration and the invariant validator.
//!
//! Configurations are owned immutable values: built by merging overrides
//! onto a cloned default, recomputing derived fields, then validating a
//! registry of named invariants. Runtime encrypt/decrypt paths never
//! re-validate.

use std::fmt;
use std::sync::Arc;

use sha3::{Digest, Sha3_512};

use crate::error::{EciesError, ErrorKind, Result};
use crate::id_provider::{IdProvider, ObjectIdProvider};
use crate::mnemonic::{MnemonicStrength, DEFAULT_HD_PATH};
use crate::wire;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Multi-recipient framing constants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipleConstants {
    pub recipient_count_size: usize,
    pub data_length_size: usize,
    /// Derived from the id provider's byte width.
    pub recipient_id_size: usize,
    pub encrypted_key_size: usize,
}

/// Checksum parameters (configuration provenance).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChecksumConstants {
    pub algorithm: String,
    pub length: usize,
}

/// BIP39 seed-derivation parameters, recorded for provenance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pbkdf2Constants {
    pub digest: String,
    pub iterations: u32,
    pub seed_length: usize,
}

/// The complete frozen configuration record.
#[derive(Clone)]
pub struct EciesConstants {
    pub curve_name: String,
    pub hd_path: String,
    pub mnemonic_strength: MnemonicStrength,

    pub symmetric_key_length: usize,
    pub iv_length: usize,
    pub auth_tag_length: usize,

    pub public_key_length: usize,
    pub raw_public_key_length: usize,
    pub compressed_public_key_length: usize,

    pub version: u8,
    pub cipher_suite: u8,

    /// Derived from the id provider's byte width.
    pub member_id_length: usize,

    pub multiple: MultipleConstants,
    pub checksum: ChecksumConstants,
    pub pbkdf2: Pbkdf2Constants,

    pub id_provider: Arc<dyn IdProvider>,
}

impl fmt::Debug for EciesConstants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EciesConstants")
            .field("curve_name", &self.curve_name)
            .field("hd_path", &self.hd_path)
            .field("mnemonic_strength", &self.mnemonic_strength)
            .field("version", &self.version)
            .field("cipher_suite", &self.cipher_suite)
            .field("member_id_length", &self.member_id_length)
            .field("multiple", &self.multiple)
            .field("checksum", &self.checksum)
            .field("pbkdf2", &self.pbkdf2)
            .field("id_provider", &self.id_provider.name())
            .finish()
    }
}

impl Default for EciesConstants {
    fn default() -> Self {
        let id_provider: Arc<dyn IdProvider> = Arc::new(ObjectIdProvider::new());
        let width = id_provider.byte_width();
        Self {
            curve_name: "secp256k1".to_string(),
            hd_path: DEFAULT_HD_PATH.to_string(),
            mnemonic_strength: MnemonicStrength::Bits256,
            symmetric_key_length: wire::SYMMETRIC_KEY_LENGTH,
            iv_length: wire::IV_LENGTH,
            auth_tag_length: wire::AUTH_TAG_LENGTH,
            public_key_length: wire::PUBLIC_KEY_LENGTH,
            raw_public_key_length: wire::RAW_PUBLIC_KEY_LENGTH,
            compressed_public_key_length: wire::COMPRESSED_PUBLIC_KEY_LENGTH,
            version: wire::VERSION,
            cipher_suite: wire::CIPHER_SUITE,
            member_id_length: width,
            multiple: MultipleConstants {
                recipient_count_size: wire::RECIPIENT_COUNT_SIZE,
                data_length_size: wire::DATA_LENGTH_SIZE,
                recipient_id_size: width,
                encrypted_key_size: wire::ENCRYPTED_KEY_SIZE,
            },
            checksum: ChecksumConstants {
                algorithm: "sha3-512".to_string(),
                length: wire::CHECKSUM_LENGTH,
            },
            pbkdf2: Pbkdf2Constants {
                digest: "hmac-sha512".to_string(),
                iterations: 2048,
                seed_length: 64,
            },
            id_provider,
        }
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Caller overrides merged onto a cloned default.
#[derive(Clone, Default)]
pub struct ConfigOverrides {
    pub id_provider: Option<Arc<dyn IdProvider>>,
    pub member_id_length: Option<usize>,
    pub mnemonic_strength: Option<MnemonicStrength>,
    pub hd_path: Option<String>,
    pub recipient_count_size: Option<usize>,
    pub data_length_size: Option<usize>,
    pub encrypted_key_size: Option<usize>,
    pub checksum_length: Option<usize>,
}

/// Merge `overrides` onto the default configuration, recompute derived
/// fields, and validate. The previous configuration is never mutated.
///
/// When both an id provider and a conflicting `member_id_length` are
/// supplied, the provider wins and the length is overwritten silently.
pub fn create_runtime_configuration(overrides: ConfigOverrides) -> Result<EciesConstants> {
    let mut config = EciesConstants::default();

    if let Some(strength) = overrides.mnemonic_strength {
        config.mnemonic_strength = strength;
    }
    if let Some(path) = overrides.hd_path {
        config.hd_path = path;
    }
    if let Some(size) = overrides.recipient_count_size {
        config.multiple.recipient_count_size = size;
    }
    if let Some(size) = overrides.data_length_size {
        config.multiple.data_length_size = size;
    }
    if let Some(size) = overrides.encrypted_key_size {
        config.multiple.encrypted_key_size = size;
    }
    if let Some(length) = overrides.checksum_length {
        config.checksum.length = length;
    }
    if let Some(length) = overrides.member_id_length {
        config.member_id_length = length;
    }
    if let Some(provider) = overrides.id_provider {
        // Provider wins: derived fields always track its width.
        config.member_id_length = provider.byte_width();
        config.multiple.recipient_id_size = provider.byte_width();
        config.id_provider = provider;
    }

    validate_constants(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Invariant validator
// ---------------------------------------------------------------------------

struct Invariant {
    name: &'static str,
    check: fn(&EciesConstants) -> std::result::Result<(), ErrorKind>,
}

const INVARIANTS: &[Invariant] = &[
    Invariant {
        name: "public-key-length",
        check: |c| {
            let expected = c.raw_public_key_length + 1;
            if c.public_key_length == expected {
                Ok(())
            } else {
                Err(ErrorKind::InvalidPublicKeyLengthConstant {
                    expected,
                    actual: c.public_key_length,
                })
            }
        },
    },
    Invariant {
        name: "recipient-count-size",
        check: |c| {
            if c.multiple.recipient_count_size == wire::RECIPIENT_COUNT_SIZE {
                Ok(())
            } else {
                Err(ErrorKind::InvalidRecipientCountSizeConstant {
                    expected: wire::RECIPIENT_COUNT_SIZE,
                    actual: c.multiple.recipient_count_size,
                })
            }
        },
    },
    Invariant {
        name: "data-length-size",
        check: |c| {
            if c.multiple.data_length_size == wire::DATA_LENGTH_SIZE {
                Ok(())
            } else {
                Err(ErrorKind::InvalidDataLengthSizeConstant {
                    expected: wire::DATA_LENGTH_SIZE,
                    actual: c.multiple.data_length_size,
                })
            }
        },
    },
    Invariant {
        name: "recipient-id-size",
        check: |c| {
            let expected = c.id_provider.byte_width();
            if c.multiple.recipient_id_size == expected {
                Ok(())
            } else {
                Err(ErrorKind::InvalidRecipientIdSizeConstant {
                    expected,
                    actual: c.multiple.recipient_id_size,
                })
            }
        },
    },
    Invariant {
        name: "member-id-length",
        check: |c| {
            let expected = c.id_provider.byte_width();
            if c.member_id_length == expected {
                Ok(())
            } else {
                Err(ErrorKind::InvalidRecipientIdSizeConstant {
                    expected,
                    actual: c.member_id_length,
                })
            }
        },
    },
    Invariant {
        name: "encrypted-key-size",
        check: |c| {
            let expected = c.public_key_length
                + c.iv_length
                + c.auth_tag_length
                + c.symmetric_key_length;
            if c.multiple.encrypted_key_size == expected {
                Ok(())
            } else {
                Err(ErrorKind::InvalidEncryptedKeySizeConstant {
                    expected,
                    actual: c.multiple.encrypted_key_size,
                })
            }
        },
    },
    Invariant {
        name: "checksum-length",
        check: |c| {
            if c.checksum.length == wire::CHECKSUM_LENGTH {
                Ok(())
            } else {
                Err(ErrorKind::InvalidChecksumConstants {
                    expected: wire::CHECKSUM_LENGTH,
                    actual: c.checksum.length,
                })
            }
        },
    },
];

/// Run every named invariant; the first failure reports the invariant name
/// plus actual/expected values through its config error kind.
pub fn validate_constants(config: &EciesConstants) -> Result<()> {
    for invariant in INVARIANTS {
        (invariant.check)(config).map_err(|kind| {
            EciesError::new(kind).with_detail(format!("invariant '{}'", invariant.name))
        })?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Canonical checksum
// ---------------------------------------------------------------------------

/// SHA3-512 over a canonical JSON snapshot of the configuration, hex-encoded.
///
/// The snapshot carries the provider's name and width, never the provider
/// itself, so equal-shaped configurations hash identically.
pub fn constants_checksum(config: &EciesConstants) -> String {
    let snapshot = serde_json::json!({
        "curve": config.curve_name,
        "hd_path": config.hd_path,
        "mnemonic_strength_bits": config.mnemonic_strength.bits(),
        "symmetric_key_length": config.symmetric_key_length,
        "iv_length": config.iv_length,
        "auth_tag_length": config.auth_tag_length,
        "public_key_length": config.public_key_length,
        "raw_public_key_length": config.raw_public_key_length,
        "compressed_public_key_length": config.compressed_public_key_length,
        "version": config.version,
        "cipher_suite": config.cipher_suite,
        "member_id_length": config.member_id_length,
        "multiple": {
            "recipient_count_size": config.multiple.recipient_count_size,
            "data_length_size": config.multiple.data_length_size,
            "recipient_id_size": config.multiple.recipient_id_size,
            "encrypted_key_size": config.multiple.encrypted_key_size,
        },
        "checksum": {
            "algorithm": config.checksum.algorithm,
            "length": config.checksum.length,
        },
        "pbkdf2": {
            "digest": config.pbkdf2.digest,
            "iterations": config.pbkdf2.iterations,
            "seed_length": config.pbkdf2.seed_length,
        },
        "id_provider": {
            "name": config.id_provider.name(),
            "byte_width": config.id_provider.byte_width(),
        },
    });
    hex::encode(Sha3_512::digest(snapshot.to_string().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_provider::{CustomFixedWidthProvider, GuidV4Provider};

    #[test]
    fn default_configuration_is_valid() {
        let config = EciesConstants::default();
        validate_constants(&config).unwrap();
        assert_eq!(config.member_id_length, 12);
        assert_eq!(config.multiple.recipient_id_size, 12);
        assert_eq!(config.multiple.encrypted_key_size, 129);
    }

    #[test]
    fn provider_override_recomputes_derived_fields() {
        let config = create_runtime_configuration(ConfigOverrides {
            id_provider: Some(Arc::new(GuidV4Provider::new())),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.member_id_length, 16);
        assert_eq!(config.multiple.recipient_id_size, 16);
    }

    #[test]
    fn provider_wins_over_conflicting_member_id_length() {
        let config = create_runtime_configuration(ConfigOverrides {
            id_provider: Some(Arc::new(CustomFixedWidthProvider::new(20).unwrap())),
            member_id_length: Some(99),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.member_id_length, 20);
    }

    #[test]
    fn bare_member_id_length_override_fails_validation() {
        let err = create_runtime_configuration(ConfigOverrides {
            member_id_length: Some(99),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidRecipientIdSizeConstant { expected: 12, actual: 99 }
        ));
    }

    #[test]
    fn nonstandard_encrypted_key_size_hard_rejected() {
        for bad in [60usize, 64, 128, 130] {
            let err = create_runtime_configuration(ConfigOverrides {
                encrypted_key_size: Some(bad),
                ..Default::default()
            })
            .unwrap_err();
            assert!(matches!(
                err.kind(),
                ErrorKind::InvalidEncryptedKeySizeConstant { expected: 129, .. }
            ));
        }
    }

    #[test]
    fn wire_width_overrides_rejected() {
        assert!(matches!(
            create_runtime_configuration(ConfigOverrides {
                recipient_count_size: Some(4),
                ..Default::default()
            })
            .unwrap_err()
            .kind(),
            ErrorKind::InvalidRecipientCountSizeConstant { expected: 2, actual: 4 }
        ));
        assert!(matches!(
            create_runtime_configuration(ConfigOverrides {
                data_length_size: Some(4),
                ..Default::default()
            })
            .unwrap_err()
            .kind(),
            ErrorKind::InvalidDataLengthSizeConstant { expected: 8, actual: 4 }
        ));
        assert!(matches!(
            create_runtime_configuration(ConfigOverrides {
                checksum_length: Some(32),
                ..Default::default()
            })
            .unwrap_err()
            .kind(),
            ErrorKind::InvalidChecksumConstants { expected: 64, actual: 32 }
        ));
    }

    #[test]
    fn failing_invariant_names_itself() {
        let err = create_runtime_configuration(ConfigOverrides {
            encrypted_key_size: Some(64),
            ..Default::default()
        })
        .unwrap_err();
        let detail = err.context().and_then(|c| c.detail.clone()).unwrap();
        assert!(detail.contains("encrypted-key-size"));
    }

    #[test]
    fn checksum_is_stable_and_width_sensitive() {
        let a = EciesConstants::default();
        let b = EciesConstants::default();
        assert_eq!(constants_checksum(&a), constants_checksum(&b));
        assert_eq!(constants_checksum(&a).len(), 128);

        let wide = create_runtime_configuration(ConfigOverrides {
            id_provider: Some(Arc::new(GuidV4Provider::new())),
            ..Default::default()
        })
        .unwrap();
        assert_ne!(constants_checksum(&a), constants_checksum(&wide));
    }
}
