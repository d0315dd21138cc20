//! Pluggable recipient-identifier providers.
//!
//! A provider fixes the byte width woven into the multi-recipient wire
//! format and knows how to generate, validate, and serialize ids of that
//! width. One provider per service, shared by `Arc`, immutable after
//! registration.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Utc;
use getrandom::getrandom;
use uuid::{Uuid, Variant};

use crate::error::{EciesError, ErrorKind, Result};

/// Provider widths must fit the wire format's one-byte bound.
pub const MAX_ID_WIDTH: usize = 255;

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Capability set for recipient identifiers of a fixed byte width.
///
/// Laws: `from_bytes(to_bytes(id)) == id`, `deserialize(serialize(id)) == id`,
/// and `generate()` returns exactly `byte_width()` bytes satisfying
/// [`IdProvider::validate`].
pub trait IdProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Identifier width in bytes, 1..=255.
    fn byte_width(&self) -> usize;

    /// Produce a fresh identifier.
    fn generate(&self) -> Vec<u8>;

    /// Structural validity of an identifier.
    fn validate(&self, id: &[u8]) -> bool;

    /// Validated copy of an identifier's bytes.
    fn to_bytes(&self, id: &[u8]) -> Result<Vec<u8>> {
        if self.validate(id) {
            Ok(id.to_vec())
        } else {
            Err(ErrorKind::InvalidRecipientIdLength {
                expected: self.byte_width(),
                actual: id.len(),
            }
            .into())
        }
    }

    /// Rebuild an identifier from raw bytes.
    fn from_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.to_bytes(bytes)
    }

    /// String form. Hex by default.
    fn serialize(&self, id: &[u8]) -> Result<String> {
        Ok(hex::encode(self.to_bytes(id)?))
    }

    /// Parse the string form back into an identifier.
    fn deserialize(&self, text: &str) -> Result<Vec<u8>> {
        let bytes = hex::decode(text).map_err(|_| ErrorKind::InvalidRecipientIdLength {
            expected: self.byte_width(),
            actual: text.len() / 2,
        })?;
        self.from_bytes(&bytes)
    }
}

// ---------------------------------------------------------------------------
// ObjectId: 12 bytes, hex serialization
// ---------------------------------------------------------------------------

/// MongoDB-style ObjectId: 4-byte big-endian unix seconds, 5 random bytes,
/// 3-byte big-endian wrapping counter seeded randomly per provider.
pub struct ObjectIdProvider {
    counter: std::sync::atomic::AtomicU32,
}

pub const OBJECT_ID_WIDTH: usize = 12;

impl ObjectIdProvider {
    pub fn new() -> Self {
        let mut seed = [0u8; 4];
        // A zero-seeded counter is still correct, just predictable.
        let _ = getrandom(&mut seed);
        Self {
            counter: std::sync::atomic::AtomicU32::new(u32::from_be_bytes(seed)),
        }
    }
}

impl Default for ObjectIdProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdProvider for ObjectIdProvider {
    fn name(&self) -> &str {
        "object-id"
    }

    fn byte_width(&self) -> usize {
        OBJECT_ID_WIDTH
    }

    fn generate(&self) -> Vec<u8> {
        let mut id = vec![0u8; OBJECT_ID_WIDTH];

        let seconds = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        id[..4].copy_from_slice(&seconds.to_be_bytes());

        let _ = getrandom(&mut id[4..9]);

        let count = self
            .counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        id[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        id
    }

    fn validate(&self, id: &[u8]) -> bool {
        id.len() == OBJECT_ID_WIDTH
    }
}

// ---------------------------------------------------------------------------
// GUID v4: 16 bytes, canonical 8-4-4-4-12 serialization
// ---------------------------------------------------------------------------

/// Random (version 4) UUIDs with RFC 4122 variant bits.
#[derive(Default)]
pub struct GuidV4Provider;

pub const GUID_WIDTH: usize = 16;

impl GuidV4Provider {
    pub fn new() -> Self {
        Self
    }

    fn parse(id: &[u8]) -> Option<Uuid> {
        let uuid = Uuid::from_slice(id).ok()?;
        (uuid.get_version_num() == 4 && uuid.get_variant() == Variant::RFC4122).then_some(uuid)
    }
}

impl IdProvider for GuidV4Provider {
    fn name(&self) -> &str {
        "guid-v4"
    }

    fn byte_width(&self) -> usize {
        GUID_WIDTH
    }

    fn generate(&self) -> Vec<u8> {
        Uuid::new_v4().as_bytes().to_vec()
    }

    fn validate(&self, id: &[u8]) -> bool {
        Self::parse(id).is_some()
    }

    fn serialize(&self, id: &[u8]) -> Result<String> {
        let uuid = Self::parse(id).ok_or(ErrorKind::InvalidRecipientIdLength {
            expected: GUID_WIDTH,
            actual: id.len(),
        })?;
        Ok(uuid.hyphenated().to_string())
    }

    fn deserialize(&self, text: &str) -> Result<Vec<u8>> {
        let uuid = Uuid::parse_str(text).map_err(|_| ErrorKind::InvalidRecipientIdLength {
            expected: GUID_WIDTH,
            actual: text.len(),
        })?;
        self.from_bytes(uuid.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Custom fixed width
// ---------------------------------------------------------------------------

/// Opaque random identifiers of a caller-chosen width.
pub struct CustomFixedWidthProvider {
    width: usize,
    name: String,
}

impl CustomFixedWidthProvider {
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 || width > MAX_ID_WIDTH {
            return Err(ErrorKind::InvalidRecipientIdSizeConstant {
                expected: MAX_ID_WIDTH,
                actual: width,
            }
            .into());
        }
        Ok(Self {
            width,
            name: format!("fixed-width-{}", width),
        })
    }
}

impl IdProvider for CustomFixedWidthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn byte_width(&self) -> usize {
        self.width
    }

    fn generate(&self) -> Vec<u8> {
        let mut id = vec![0u8; self.width];
        let _ = getrandom(&mut id);
        id
    }

    fn validate(&self, id: &[u8]) -> bool {
        id.len() == self.width
    }
}

// ---------------------------------------------------------------------------
// Construction-time validation, cached per instance
// ---------------------------------------------------------------------------

fn validated_cache() -> &'static Mutex<HashSet<usize>> {
    static CACHE: OnceLock<Mutex<HashSet<usize>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Exercise every provider method once and cross-check widths.
///
/// Validation runs once per distinct instance; subsequent calls hit a
/// pointer-keyed cache. Cache writes are idempotent.
pub fn ensure_validated(provider: &Arc<dyn IdProvider>) -> Result<()> {
    let key = Arc::as_ptr(provider) as *const u8 as usize;
    {
        let cache = validated_cache().lock().expect("provider cache poisoned");
        if cache.contains(&key) {
            return Ok(());
        }
    }

    validate_provider(provider.as_ref())?;

    validated_cache()
        .lock()
        .expect("provider cache poisoned")
        .insert(key);
    Ok(())
}

fn validation_err(provider: &dyn IdProvider, detail: impl Into<String>) -> EciesError {
    ErrorKind::IdProviderValidationFailed {
        provider: provider.name().to_string(),
        detail: detail.into(),
    }
    .into()
}

fn validate_provider(provider: &dyn IdProvider) -> Result<()> {
    let width = provider.byte_width();
    if width == 0 || width > MAX_ID_WIDTH {
        return Err(validation_err(provider, format!("byte width {} out of range", width)));
    }

    let id = provider.generate();
    if id.len() != width {
        return Err(validation_err(
            provider,
            format!("generate returned {} bytes, expected {}", id.len(), width),
        ));
    }
    if !provider.validate(&id) {
        return Err(validation_err(provider, "generated id fails validate"));
    }

    let bytes = provider
        .to_bytes(&id)
        .map_err(|e| validation_err(provider, format!("to_bytes failed: {}", e)))?;
    let back = provider
        .from_bytes(&bytes)
        .map_err(|e| validation_err(provider, format!("from_bytes failed: {}", e)))?;
    if back != id {
        return Err(validation_err(provider, "byte round-trip altered the id"));
    }

    let text = provider
        .serialize(&id)
        .map_err(|e| validation_err(provider, format!("serialize failed: {}", e)))?;
    let parsed = provider
        .deserialize(&text)
        .map_err(|e| validation_err(provider, format!("deserialize failed: {}", e)))?;
    if parsed != id {
        return Err(validation_err(provider, "string round-trip altered the id"));
    }

    Ok(())
}
