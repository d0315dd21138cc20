//! BIP39 mnemonic secrets and BIP32 HD key derivation.
//!
//! A mnemonic is a scoped secret: created from CSPRNG entropy or a
//! user-supplied phrase, checksum-validated, used to derive a seed, and
//! zeroized on drop. Key pairs derive through PBKDF2-HMAC-SHA512 and the
//! configured HD path.

use bip32::{DerivationPath, XPrv};
use bip39::Language;
use k256::SecretKey;
use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{EciesError, ErrorKind, Result};
use crate::keys::KeyPair;

/// Derivation path used for mnemonic-derived keys.
pub const DEFAULT_HD_PATH: &str = "m/44'/60'/0'/0/0";

// ---------------------------------------------------------------------------
// Strength
// ---------------------------------------------------------------------------

/// Allowed entropy strengths for generated mnemonics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MnemonicStrength {
    /// 128 bits of entropy, 12 words.
    Bits128,
    /// 256 bits of entropy, 24 words.
    Bits256,
}

impl MnemonicStrength {
    pub fn bits(self) -> u32 {
        match self {
            Self::Bits128 => 128,
            Self::Bits256 => 256,
        }
    }

    pub fn entropy_len(self) -> usize {
        self.bits() as usize / 8
    }

    pub fn word_count(self) -> usize {
        match self {
            Self::Bits128 => 12,
            Self::Bits256 => 24,
        }
    }
}

// ---------------------------------------------------------------------------
// Mnemonic secret
// ---------------------------------------------------------------------------

/// An owned BIP39 English mnemonic. Zeroized on drop.
#[derive(Debug)]
pub struct Mnemonic {
    inner: bip39::Mnemonic,
}

impl Mnemonic {
    /// Generate a fresh mnemonic at the given strength.
    pub fn generate(strength: MnemonicStrength) -> Result<Self> {
        let mut entropy = Zeroizing::new(vec![0u8; strength.entropy_len()]);
        OsRng.fill_bytes(&mut entropy);
        let inner = bip39::Mnemonic::from_entropy_in(Language::English, &entropy)
            .map_err(|_| ErrorKind::InvalidMnemonic)?;
        Ok(Self { inner })
    }

    /// Accept a user-supplied phrase: lowercase English words separated by
    /// single spaces, 12/15/18/21/24 words, checksum-validated.
    pub fn parse(phrase: &str) -> Result<Self> {
        let inner = bip39::Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|_| ErrorKind::InvalidMnemonic)?;
        Ok(Self { inner })
    }

    pub fn word_count(&self) -> usize {
        self.inner.word_count()
    }

    /// The phrase itself. The returned buffer zeroizes on drop; avoid
    /// copying it further.
    pub fn phrase(&self) -> Zeroizing<String> {
        Zeroizing::new(self.inner.to_string())
    }

    /// PBKDF2-HMAC-SHA512 seed (64 bytes), zeroized on drop.
    pub fn to_seed(&self, passphrase: &str) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.inner.to_seed_normalized(passphrase))
    }

    /// Derive the key pair at `path` (BIP32, secp256k1).
    pub fn derive_keypair(&self, passphrase: &str, path: &str) -> Result<KeyPair> {
        let seed = self.to_seed(passphrase);
        derive_keypair_from_seed(seed.as_ref(), path)
    }
}

impl Drop for Mnemonic {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

/// BIP32 child derivation from a raw seed.
pub fn derive_keypair_from_seed(seed: &[u8], path: &str) -> Result<KeyPair> {
    let path: DerivationPath = path
        .parse()
        .map_err(|_| EciesError::new(ErrorKind::FailedToDeriveRootKey).with_detail("bad HD path"))?;
    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|_| ErrorKind::FailedToDeriveRootKey)?;
    let secret = SecretKey::from_slice(&xprv.private_key().to_bytes())
        .map_err(|_| ErrorKind::FailedToDeriveRootKey)?;
    Ok(KeyPair::from_secret(secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    // BIP39 reference vector (all-zero entropy).
    const VECTOR_PHRASE: &str = "abandon abandon abandon abandon abandon abandon \
         abandon abandon abandon abandon abandon about";

    #[test]
    fn generated_strengths_have_expected_word_counts() {
        assert_eq!(Mnemonic::generate(MnemonicStrength::Bits128).unwrap().word_count(), 12);
        assert_eq!(Mnemonic::generate(MnemonicStrength::Bits256).unwrap().word_count(), 24);
    }

    #[test]
    fn parse_accepts_valid_checksum() {
        let m = Mnemonic::parse(VECTOR_PHRASE).unwrap();
        assert_eq!(m.word_count(), 12);
        assert_eq!(m.phrase().as_str(), VECTOR_PHRASE.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn parse_rejects_bad_checksum_and_garbage() {
        // Last word altered: checksum no longer matches.
        let bad = VECTOR_PHRASE.replace("about", "abandon");
        assert!(matches!(
            Mnemonic::parse(&bad).unwrap_err().kind(),
            ErrorKind::InvalidMnemonic
        ));
        assert!(Mnemonic::parse("definitely not a mnemonic").is_err());
        assert!(Mnemonic::parse("").is_err());
    }

    #[test]
    fn seed_matches_bip39_vector() {
        let m = Mnemonic::parse(VECTOR_PHRASE).unwrap();
        let seed = m.to_seed("TREZOR");
        assert_eq!(
            hex::encode(&seed[..32]),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e5349553"
        );
    }

    #[test]
    fn derivation_is_deterministic() {
        let m = Mnemonic::parse(VECTOR_PHRASE).unwrap();
        let a = m.derive_keypair("", DEFAULT_HD_PATH).unwrap();
        let b = m.derive_keypair("", DEFAULT_HD_PATH).unwrap();
        assert_eq!(*a.private_bytes(), *b.private_bytes());
        assert_eq!(a.public_compressed(), b.public_compressed());
    }

    #[test]
    fn passphrase_and_path_change_the_key() {
        let m = Mnemonic::parse(VECTOR_PHRASE).unwrap();
        let base = m.derive_keypair("", DEFAULT_HD_PATH).unwrap();
        let passworded = m.derive_keypair("trust", DEFAULT_HD_PATH).unwrap();
        let sibling = m.derive_keypair("", "m/44'/60'/0'/0/1").unwrap();
        assert_ne!(*base.private_bytes(), *passworded.private_bytes());
        assert_ne!(*base.private_bytes(), *sibling.private_bytes());
    }

    #[test]
    fn malformed_path_rejected() {
        let m = Mnemonic::parse(VECTOR_PHRASE).unwrap();
        assert!(matches!(
            m.derive_keypair("", "not/a/path").unwrap_err().kind(),
            ErrorKind::FailedToDeriveRootKey
        ));
    }
}
