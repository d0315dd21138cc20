//! ECIES service facade.
//!
//! Thin dispatcher over the frame codecs. Configuration invariants and the
//! id provider are validated once at construction; the codec paths never
//! re-validate.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::constants::{validate_constants, EciesConstants};
use crate::error::Result;
use crate::id_provider::{ensure_validated, IdProvider};
use crate::keys::KeyPair;
use crate::mnemonic::Mnemonic;
use crate::multiple::{self, MultipleFrame, Recipient};
use crate::signature;
use crate::single::{self, SingleFrame};
use crate::wire::{read_frame_type, EncryptionType, SIGNATURE_LENGTH};

/// Any parsed frame. The type byte in the frame decides the variant.
#[derive(Debug)]
pub enum FramedMessage<'a> {
    Simple(SingleFrame<'a>),
    Single(SingleFrame<'a>),
    Multiple(MultipleFrame<'a>),
}

impl FramedMessage<'_> {
    pub fn encryption_type(&self) -> EncryptionType {
        match self {
            Self::Simple(_) => EncryptionType::Simple,
            Self::Single(_) => EncryptionType::Single,
            Self::Multiple(_) => EncryptionType::Multiple,
        }
    }
}

/// The service: construction-time checks plus operation dispatch.
#[derive(Debug)]
pub struct Ecies {
    constants: EciesConstants,
}

impl Ecies {
    /// Validate `constants` and its id provider, then build the service.
    pub fn new(constants: EciesConstants) -> Result<Self> {
        validate_constants(&constants)?;
        ensure_validated(&constants.id_provider)?;
        tracing::debug!(
            provider = constants.id_provider.name(),
            id_width = constants.member_id_length,
            "ecies service constructed"
        );
        Ok(Self { constants })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(EciesConstants::default())
    }

    pub fn constants(&self) -> &EciesConstants {
        &self.constants
    }

    pub fn id_provider(&self) -> &Arc<dyn IdProvider> {
        &self.constants.id_provider
    }

    // -----------------------------------------------------------------------
    // Key material
    // -----------------------------------------------------------------------

    pub fn generate_keypair(&self) -> Result<KeyPair> {
        KeyPair::generate()
    }

    /// Fresh mnemonic at the configured strength.
    pub fn generate_mnemonic(&self) -> Result<Mnemonic> {
        Mnemonic::generate(self.constants.mnemonic_strength)
    }

    /// Derive the key pair at the configured HD path.
    pub fn keypair_from_mnemonic(&self, mnemonic: &Mnemonic, passphrase: &str) -> Result<KeyPair> {
        mnemonic.derive_keypair(passphrase, &self.constants.hd_path)
    }

    pub fn keypair_from_phrase(&self, phrase: &str, passphrase: &str) -> Result<KeyPair> {
        self.keypair_from_mnemonic(&Mnemonic::parse(phrase)?, passphrase)
    }

    // -----------------------------------------------------------------------
    // Single-recipient operations
    // -----------------------------------------------------------------------

    pub fn encrypt_simple(&self, recipient_public_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        single::encrypt(EncryptionType::Simple, recipient_public_key, plaintext, &[])
    }

    pub fn encrypt_simple_with_preamble(
        &self,
        recipient_public_key: &[u8],
        plaintext: &[u8],
        preamble: &[u8],
    ) -> Result<Vec<u8>> {
        single::encrypt(EncryptionType::Simple, recipient_public_key, plaintext, preamble)
    }

    pub fn encrypt_single(&self, recipient_public_key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        single::encrypt(EncryptionType::Single, recipient_public_key, plaintext, &[])
    }

    pub fn encrypt_single_with_preamble(
        &self,
        recipient_public_key: &[u8],
        plaintext: &[u8],
        preamble: &[u8],
    ) -> Result<Vec<u8>> {
        single::encrypt(EncryptionType::Single, recipient_public_key, plaintext, preamble)
    }

    pub fn decrypt_simple(&self, recipient: &KeyPair, data: &[u8]) -> Result<Vec<u8>> {
        single::decrypt(EncryptionType::Simple, recipient, data, 0)
    }

    pub fn decrypt_simple_with_preamble(
        &self,
        recipient: &KeyPair,
        data: &[u8],
        preamble_len: usize,
    ) -> Result<Vec<u8>> {
        single::decrypt(EncryptionType::Simple, recipient, data, preamble_len)
    }

    pub fn decrypt_single(&self, recipient: &KeyPair, data: &[u8]) -> Result<Vec<u8>> {
        single::decrypt(EncryptionType::Single, recipient, data, 0)
    }

    pub fn decrypt_single_with_preamble(
        &self,
        recipient: &KeyPair,
        data: &[u8],
        preamble_len: usize,
    ) -> Result<Vec<u8>> {
        single::decrypt(EncryptionType::Single, recipient, data, preamble_len)
    }

    // -----------------------------------------------------------------------
    // Multi-recipient operations
    // -----------------------------------------------------------------------

    pub fn encrypt_multiple(&self, recipients: &[Recipient], plaintext: &[u8]) -> Result<Vec<u8>> {
        multiple::encrypt(&self.constants, recipients, plaintext, &[], None)
    }

    pub fn encrypt_multiple_with_preamble(
        &self,
        recipients: &[Recipient],
        plaintext: &[u8],
        preamble: &[u8],
    ) -> Result<Vec<u8>> {
        multiple::encrypt(&self.constants, recipients, plaintext, preamble, None)
    }

    /// Cancellable variant; the token is polled at recipient-loop
    /// boundaries.
    pub fn encrypt_multiple_cancellable(
        &self,
        recipients: &[Recipient],
        plaintext: &[u8],
        cancel: &CancelToken,
    ) -> Result<Vec<u8>> {
        multiple::encrypt(&self.constants, recipients, plaintext, &[], Some(cancel))
    }

    pub fn decrypt_multiple(
        &self,
        recipient_id: &[u8],
        recipient: &KeyPair,
        data: &[u8],
    ) -> Result<Vec<u8>> {
        multiple::decrypt(&self.constants, recipient_id, recipient, data, 0)
    }

    pub fn decrypt_multiple_with_preamble(
        &self,
        recipient_id: &[u8],
        recipient: &KeyPair,
        data: &[u8],
        preamble_len: usize,
    ) -> Result<Vec<u8>> {
        multiple::decrypt(&self.constants, recipient_id, recipient, data, preamble_len)
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    /// Parse any frame, dispatching on its embedded type byte.
    pub fn parse<'a>(&self, data: &'a [u8], preamble_len: usize) -> Result<FramedMessage<'a>> {
        match read_frame_type(data, preamble_len)? {
            EncryptionType::Simple => {
                single::parse(EncryptionType::Simple, data, preamble_len).map(FramedMessage::Simple)
            }
            EncryptionType::Single => {
                single::parse(EncryptionType::Single, data, preamble_len).map(FramedMessage::Single)
            }
            EncryptionType::Multiple => {
                multiple::parse(&self.constants, data, preamble_len).map(FramedMessage::Multiple)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Signatures
    // -----------------------------------------------------------------------

    pub fn sign(&self, key: &KeyPair, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH]> {
        signature::sign(key, message)
    }

    pub fn verify(&self, public_key: &[u8], message: &[u8], sig: &[u8]) -> bool {
        signature::verify(public_key, message, sig)
    }

    pub fn signature_to_hex(&self, sig: &[u8; SIGNATURE_LENGTH]) -> String {
        signature::signature_to_hex(sig)
    }

    pub fn signature_from_hex(&self, text: &str) -> Result<[u8; SIGNATURE_LENGTH]> {
        signature::signature_from_hex(text)
    }
}
