//! Kinded error taxonomy for the ECIES core.
//!
//! Every failure carries an [`ErrorKind`] plus optional [`ErrorContext`]
//! (operation name, byte position, free-form detail). AEAD integrity
//! failures collapse to [`ErrorKind::DecryptionFailed`]: callers cannot
//! distinguish ciphertext tampering from a key mismatch.

use std::fmt;

use chrono::{DateTime, Utc};

/// Crate-wide result alias.
pub type Result<T, E = EciesError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Error kinds
// ---------------------------------------------------------------------------

/// Canonical failure kinds, grouped by subsystem.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    // --- Wire ---
    InvalidVersion { expected: u8, actual: u8 },
    InvalidCipherSuite { expected: u8, actual: u8 },
    InvalidEncryptionType { actual: u8 },
    EncryptionTypeMismatch { expected: u8, actual: u8 },
    InvalidHeaderLength { minimum: usize, actual: usize },
    DataTooShortForMultiRecipientHeader { required: usize, actual: usize },
    DataLengthMismatch { expected: u64, actual: u64 },
    MessageLengthMismatch { expected: usize, actual: usize },
    EncryptedSizeExceedsExpected { expected: u64, actual: u64 },
    InvalidDataLength,

    // --- Crypto ---
    InvalidPublicKeyFormatOrLength { length: usize },
    InvalidPublicKeyNotOnCurve,
    ReceivedNullOrUndefinedPublicKey,
    InvalidEphemeralPublicKey,
    InvalidSenderPublicKey,
    InvalidRecipientPublicKey,
    InvalidIvLength { expected: usize, actual: usize },
    InvalidAuthTagLength { expected: usize, actual: usize },
    InvalidAesKeyLength { expected: usize, actual: usize },
    SecretComputationFailed,
    DecryptionFailed,
    FailedToDecryptKey,
    CannotEncryptEmptyData,
    CannotDecryptEmptyData,
    MessageTooLarge { maximum: u64, actual: u64 },
    EncryptionCancelled,
    InvalidSignatureFormat { length: usize },

    // --- Multi-recipient ---
    RecipientNotFound,
    DuplicateRecipientId,
    TooManyRecipients { maximum: usize, actual: usize },
    InvalidRecipientCount,
    RecipientCountMismatch { declared: usize, actual: usize },
    RecipientKeyCountMismatch { declared: usize, actual: usize },
    AuthenticationTagRequired,
    InvalidEncryptedKeyLength { expected: usize, actual: usize },
    InvalidRecipientIdLength { expected: usize, actual: usize },

    // --- Mnemonic / KDF ---
    InvalidMnemonic,
    FailedToDeriveRootKey,

    // --- Configuration ---
    InvalidChecksumConstants { expected: usize, actual: usize },
    InvalidEncryptedKeySizeConstant { expected: usize, actual: usize },
    InvalidPublicKeyLengthConstant { expected: usize, actual: usize },
    InvalidRecipientCountSizeConstant { expected: usize, actual: usize },
    InvalidDataLengthSizeConstant { expected: usize, actual: usize },
    InvalidRecipientIdSizeConstant { expected: usize, actual: usize },
    CannotOverwriteDefaultConfiguration,
    IdProviderValidationFailed { provider: String, detail: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVersion { expected, actual } => {
                write!(f, "invalid version: expected {}, got {}", expected, actual)
            }
            Self::InvalidCipherSuite { expected, actual } => {
                write!(f, "invalid cipher suite: expected {}, got {}", expected, actual)
            }
            Self::InvalidEncryptionType { actual } => {
                write!(f, "invalid encryption type byte {:#04x}", actual)
            }
            Self::EncryptionTypeMismatch { expected, actual } => {
                write!(f, "encryption type mismatch: expected {:#04x}, got {:#04x}", expected, actual)
            }
            Self::InvalidHeaderLength { minimum, actual } => {
                write!(f, "header too short: need {} bytes, got {}", minimum, actual)
            }
            Self::DataTooShortForMultiRecipientHeader { required, actual } => {
                write!(f, "data too short for multi-recipient header: need {} bytes, got {}", required, actual)
            }
            Self::DataLengthMismatch { expected, actual } => {
                write!(f, "data length mismatch: declared {}, got {}", expected, actual)
            }
            Self::MessageLengthMismatch { expected, actual } => {
                write!(f, "message length mismatch: expected {}, got {}", expected, actual)
            }
            Self::EncryptedSizeExceedsExpected { expected, actual } => {
                write!(f, "encrypted size exceeds expected: declared {}, got {}", expected, actual)
            }
            Self::InvalidDataLength => write!(f, "data length must be non-zero"),

            Self::InvalidPublicKeyFormatOrLength { length } => {
                write!(f, "invalid public key format or length ({} bytes)", length)
            }
            Self::InvalidPublicKeyNotOnCurve => write!(f, "public key is not a point on secp256k1"),
            Self::ReceivedNullOrUndefinedPublicKey => write!(f, "received empty public key"),
            Self::InvalidEphemeralPublicKey => write!(f, "invalid ephemeral public key"),
            Self::InvalidSenderPublicKey => write!(f, "invalid sender public key"),
            Self::InvalidRecipientPublicKey => write!(f, "invalid recipient public key"),
            Self::InvalidIvLength { expected, actual } => {
                write!(f, "invalid iv length: expected {}, got {}", expected, actual)
            }
            Self::InvalidAuthTagLength { expected, actual } => {
                write!(f, "invalid auth tag length: expected {}, got {}", expected, actual)
            }
            Self::InvalidAesKeyLength { expected, actual } => {
                write!(f, "invalid aes key length: expected {}, got {}", expected, actual)
            }
            Self::SecretComputationFailed => write!(f, "shared secret computation failed"),
            Self::DecryptionFailed => write!(f, "decryption failed"),
            Self::FailedToDecryptKey => write!(f, "failed to decrypt wrapped key"),
            Self::CannotEncryptEmptyData => write!(f, "cannot encrypt empty data"),
            Self::CannotDecryptEmptyData => write!(f, "cannot decrypt empty data"),
            Self::MessageTooLarge { maximum, actual } => {
                write!(f, "message too large: limit {}, got {}", maximum, actual)
            }
            Self::EncryptionCancelled => write!(f, "encryption cancelled"),
            Self::InvalidSignatureFormat { length } => {
                write!(f, "invalid signature format ({} bytes)", length)
            }

            Self::RecipientNotFound => write!(f, "recipient not found in header"),
            Self::DuplicateRecipientId => write!(f, "duplicate recipient id"),
            Self::TooManyRecipients { maximum, actual } => {
                write!(f, "too many recipients: limit {}, got {}", maximum, actual)
            }
            Self::InvalidRecipientCount => write!(f, "recipient count must be non-zero"),
            Self::RecipientCountMismatch { declared, actual } => {
                write!(f, "recipient count mismatch: declared {}, got {}", declared, actual)
            }
            Self::RecipientKeyCountMismatch { declared, actual } => {
                write!(f, "recipient key count mismatch: declared {}, got {}", declared, actual)
            }
            Self::AuthenticationTagRequired => {
                write!(f, "authentication tag is required for multi-recipient encryption")
            }
            Self::InvalidEncryptedKeyLength { expected, actual } => {
                write!(f, "invalid encrypted key length: expected {}, got {}", expected, actual)
            }
            Self::InvalidRecipientIdLength { expected, actual } => {
                write!(f, "invalid recipient id length: expected {}, got {}", expected, actual)
            }

            Self::InvalidMnemonic => write!(f, "invalid mnemonic phrase"),
            Self::FailedToDeriveRootKey => write!(f, "failed to derive root key"),

            Self::InvalidChecksumConstants { expected, actual } => {
                write!(f, "invalid checksum constants: expected {} bytes, got {}", expected, actual)
            }
            Self::InvalidEncryptedKeySizeConstant { expected, actual } => {
                write!(f, "invalid encrypted key size constant: expected {}, got {}", expected, actual)
            }
            Self::InvalidPublicKeyLengthConstant { expected, actual } => {
                write!(f, "invalid public key length constant: expected {}, got {}", expected, actual)
            }
            Self::InvalidRecipientCountSizeConstant { expected, actual } => {
                write!(f, "invalid recipient count size constant: expected {}, got {}", expected, actual)
            }
            Self::InvalidDataLengthSizeConstant { expected, actual } => {
                write!(f, "invalid data length size constant: expected {}, got {}", expected, actual)
            }
            Self::InvalidRecipientIdSizeConstant { expected, actual } => {
                write!(f, "invalid recipient id size constant: expected {}, got {}", expected, actual)
            }
            Self::CannotOverwriteDefaultConfiguration => {
                write!(f, "cannot overwrite the default configuration")
            }
            Self::IdProviderValidationFailed { provider, detail } => {
                write!(f, "id provider '{}' failed validation: {}", provider, detail)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Error with context
// ---------------------------------------------------------------------------

/// Optional context attached to an error at the failure site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorContext {
    /// Operation that failed (e.g. `"encrypt_multiple"`).
    pub operation: &'static str,
    /// Byte offset within the frame, where known.
    pub position: Option<usize>,
    /// Free-form metadata. Never contains key material.
    pub detail: Option<String>,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}

/// The crate error type: a kind plus optional context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EciesError {
    kind: ErrorKind,
    context: Option<Box<ErrorContext>>,
}

impl EciesError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, context: None }
    }

    /// Attach the failing operation's name.
    pub fn in_operation(mut self, operation: &'static str) -> Self {
        self.context_mut().operation = operation;
        self
    }

    /// Attach the byte position within the frame.
    pub fn at_position(mut self, position: usize) -> Self {
        self.context_mut().position = Some(position);
        self
    }

    /// Attach free-form detail. Must not contain key material.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.context_mut().detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_deref()
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        self.context.get_or_insert_with(|| {
            Box::new(ErrorContext {
                operation: "",
                position: None,
                detail: None,
                timestamp: Utc::now(),
            })
        })
    }
}

impl fmt::Display for EciesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)?;
        if let Some(ctx) = &self.context {
            if !ctx.operation.is_empty() {
                write!(f, " [in {}]", ctx.operation)?;
            }
            if let Some(pos) = ctx.position {
                write!(f, " [at byte {}]", pos)?;
            }
            if let Some(detail) = &ctx.detail {
                write!(f, " ({})", detail)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for EciesError {}

impl From<ErrorKind> for EciesError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}
