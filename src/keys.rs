//! secp256k1 key operations: generation, normalization, ECDH.
//!
//! Public keys are accepted compressed (33B, 0x02/0x03), uncompressed
//! (65B, 0x04), or raw legacy (64B, no prefix) and normalized to the
//! canonical uncompressed form. ECDH returns the 32-byte x-coordinate of
//! the shared point, matching classic Node.js `ECDH.computeSecret`.

use k256::elliptic_curve::bigint::{Encoding, NonZero, U384};
use k256::elliptic_curve::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{EciesError, ErrorKind, Result};
use crate::wire::{
    COMPRESSED_PUBLIC_KEY_LENGTH, PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, RAW_PUBLIC_KEY_LENGTH,
};

/// secp256k1 group order minus one, widened to 384 bits for the
/// rejection-free private-key reduction.
const ORDER_MINUS_ONE: U384 = U384::from_be_hex(
    "00000000000000000000000000000000\
     FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364140",
);

// ---------------------------------------------------------------------------
// Key pair
// ---------------------------------------------------------------------------

/// A secp256k1 key pair. The private scalar zeroizes on drop.
#[derive(Debug)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the platform CSPRNG.
    pub fn generate() -> Result<Self> {
        Ok(Self::from_secret(generate_private_key()?))
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Rebuild a key pair from a 32-byte big-endian scalar in [1, n-1].
    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PRIVATE_KEY_LENGTH {
            return Err(EciesError::new(ErrorKind::SecretComputationFailed)
                .with_detail(format!("private key must be {} bytes", PRIVATE_KEY_LENGTH)));
        }
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| EciesError::new(ErrorKind::SecretComputationFailed)
                .with_detail("private scalar out of range"))?;
        Ok(Self::from_secret(secret))
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// The private scalar, big-endian. Zeroized when the caller drops it.
    pub fn private_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LENGTH]> {
        let mut out = Zeroizing::new([0u8; PRIVATE_KEY_LENGTH]);
        out.copy_from_slice(&self.secret.to_bytes());
        out
    }

    pub fn public_compressed(&self) -> [u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
        public_key_to_compressed(&self.public)
    }

    pub fn public_uncompressed(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        public_key_to_uncompressed(&self.public)
    }
}

// ---------------------------------------------------------------------------
// Private-key generation
// ---------------------------------------------------------------------------

/// Draw 48 CSPRNG bytes, reduce the big-endian value mod n-1, add 1.
///
/// The 128-bit oversampling bounds the reduction bias far below 2^-120,
/// and the final +1 shifts the result into [1, n-1] without rejection.
pub fn generate_private_key() -> Result<SecretKey> {
    let mut wide = Zeroizing::new([0u8; 48]);
    OsRng.fill_bytes(wide.as_mut());

    let modulus: NonZero<U384> =
        Option::from(NonZero::new(ORDER_MINUS_ONE)).expect("group order constant is nonzero");
    let value = U384::from_be_slice(wide.as_ref());
    let scalar = value.rem(&modulus).wrapping_add(&U384::ONE);

    let mut bytes = scalar.to_be_bytes();
    let secret = SecretKey::from_slice(&bytes[16..])
        .map_err(|_| EciesError::new(ErrorKind::SecretComputationFailed));
    bytes.zeroize();
    secret
}

// ---------------------------------------------------------------------------
// Public-key normalization
// ---------------------------------------------------------------------------

/// Parse a public key in any accepted form.
pub fn parse_public_key(input: &[u8]) -> Result<PublicKey> {
    if input.is_empty() {
        return Err(ErrorKind::ReceivedNullOrUndefinedPublicKey.into());
    }

    let format_err = || ErrorKind::InvalidPublicKeyFormatOrLength { length: input.len() };

    let mut sec1 = [0u8; PUBLIC_KEY_LENGTH];
    let sec1: &[u8] = match input.len() {
        COMPRESSED_PUBLIC_KEY_LENGTH => {
            if input[0] != 0x02 && input[0] != 0x03 {
                return Err(format_err().into());
            }
            input
        }
        PUBLIC_KEY_LENGTH => {
            if input[0] != 0x04 {
                return Err(format_err().into());
            }
            input
        }
        RAW_PUBLIC_KEY_LENGTH => {
            sec1[0] = 0x04;
            sec1[1..].copy_from_slice(input);
            &sec1
        }
        _ => return Err(format_err().into()),
    };

    // The key body must carry actual coordinates.
    if sec1[1..].iter().all(|&b| b == 0) {
        return Err(format_err().into());
    }

    PublicKey::from_sec1_bytes(sec1).map_err(|_| ErrorKind::InvalidPublicKeyNotOnCurve.into())
}

/// Normalize any accepted public-key form to canonical 65-byte uncompressed.
/// Idempotent: normalizing an already-normalized key is the identity.
pub fn normalize_public_key(input: &[u8]) -> Result<[u8; PUBLIC_KEY_LENGTH]> {
    Ok(public_key_to_uncompressed(&parse_public_key(input)?))
}

pub fn public_key_to_uncompressed(public: &PublicKey) -> [u8; PUBLIC_KEY_LENGTH] {
    let point = public.to_encoded_point(false);
    let mut out = [0u8; PUBLIC_KEY_LENGTH];
    out.copy_from_slice(point.as_bytes());
    out
}

pub fn public_key_to_compressed(public: &PublicKey) -> [u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
    let point = public.to_encoded_point(true);
    let mut out = [0u8; COMPRESSED_PUBLIC_KEY_LENGTH];
    out.copy_from_slice(point.as_bytes());
    out
}

// ---------------------------------------------------------------------------
// ECDH
// ---------------------------------------------------------------------------

/// Compute the shared point and return its 32-byte x-coordinate.
///
/// Infallible for keys that passed construction: a nonzero scalar times a
/// non-identity point of a prime-order group is never the identity.
pub fn ecdh_x(secret: &SecretKey, public: &PublicKey) -> Zeroizing<[u8; 32]> {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(shared.raw_secret_bytes());
    out
}
