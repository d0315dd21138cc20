//! Multi-recipient envelope framing.
//!
//! ```text
//! prefix[3] || ephemeral_pk[65] || iv[16] || tag[16] || data_length[8]
//!           || recipient_count[2] || id[w] * N || wrapped_key[129] * N || ciphertext
//! ```
//!
//! One random content key protects the payload; it is wrapped once per
//! recipient under an ECDH key derived from a single shared ephemeral
//! scalar. Each wrapped key is AEAD-bound to its recipient id:
//!
//! ```text
//! wrapped_key = recipient_pk[65] || iv_i[16] || tag_i[16] || wrapped_content_key[32]
//! ```
//!
//! Ids appear in the header in encrypt-time order; wrapped keys follow the
//! same order, and decrypt locates the caller's id by linear scan.

use std::collections::HashSet;

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::aead;
use crate::cancel::CancelToken;
use crate::constants::EciesConstants;
use crate::error::{EciesError, ErrorKind, Result};
use crate::kdf;
use crate::keys::{ecdh_x, parse_public_key, public_key_to_uncompressed, KeyPair};
use crate::wire::{
    multiple_overhead, read_prefix, write_prefix, EncryptionType, AUTH_TAG_LENGTH,
    DATA_LENGTH_SIZE, ENCRYPTED_KEY_SIZE, IV_LENGTH, MAX_RECIPIENTS, MULTIPLE_FIXED_OVERHEAD,
    PREFIX_LENGTH, PUBLIC_KEY_LENGTH, RECIPIENT_COUNT_SIZE, SYMMETRIC_KEY_LENGTH,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One encryption target: an id of the provider's width plus a public key
/// in any accepted form.
#[derive(Clone, Debug)]
pub struct Recipient {
    pub id: Vec<u8>,
    pub public_key: Vec<u8>,
}

impl Recipient {
    pub fn new(id: impl Into<Vec<u8>>, public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            public_key: public_key.into(),
        }
    }
}

/// One parsed recipient table entry.
#[derive(Clone, Copy, Debug)]
pub struct RecipientEntry<'a> {
    pub id: &'a [u8],
    pub wrapped_key: &'a [u8],
}

/// A parsed MULTIPLE frame, borrowing from the input buffer.
#[derive(Debug)]
pub struct MultipleFrame<'a> {
    pub ephemeral_public_key: &'a [u8; PUBLIC_KEY_LENGTH],
    pub iv: &'a [u8; IV_LENGTH],
    pub auth_tag: &'a [u8; AUTH_TAG_LENGTH],
    pub data_length: u64,
    pub recipients: Vec<RecipientEntry<'a>>,
    pub ciphertext: &'a [u8],
}

impl MultipleFrame<'_> {
    /// Header order is encrypt-time order; first match wins.
    pub fn find_recipient(&self, id: &[u8]) -> Option<usize> {
        self.recipients.iter().position(|entry| entry.id == id)
    }
}

// ---------------------------------------------------------------------------
// Key wrap
// ---------------------------------------------------------------------------

fn wrap_content_key(
    ephemeral: &KeyPair,
    recipient: &Recipient,
    content_key: &[u8; SYMMETRIC_KEY_LENGTH],
) -> Result<[u8; ENCRYPTED_KEY_SIZE]> {
    let public = parse_public_key(&recipient.public_key)
        .map_err(|_| ErrorKind::InvalidRecipientPublicKey)?;
    let shared = ecdh_x(ephemeral.secret(), &public);
    let wrap_key = kdf::derive_symmetric_key(shared.as_ref())?;
    let (iv, wrapped, tag) = aead::encrypt(wrap_key.as_ref(), content_key, &recipient.id)?;

    let mut out = [0u8; ENCRYPTED_KEY_SIZE];
    out[..PUBLIC_KEY_LENGTH].copy_from_slice(&public_key_to_uncompressed(&public));
    let iv_end = PUBLIC_KEY_LENGTH + IV_LENGTH;
    let tag_end = iv_end + AUTH_TAG_LENGTH;
    out[PUBLIC_KEY_LENGTH..iv_end].copy_from_slice(&iv);
    out[iv_end..tag_end].copy_from_slice(&tag);
    out[tag_end..].copy_from_slice(&wrapped);
    Ok(out)
}

fn unwrap_content_key(
    recipient: &KeyPair,
    recipient_id: &[u8],
    ephemeral_public_key: &[u8],
    wrapped_key: &[u8],
) -> Result<Zeroizing<[u8; SYMMETRIC_KEY_LENGTH]>> {
    if wrapped_key.len() != ENCRYPTED_KEY_SIZE {
        return Err(ErrorKind::InvalidEncryptedKeyLength {
            expected: ENCRYPTED_KEY_SIZE,
            actual: wrapped_key.len(),
        }
        .into());
    }

    let iv_end = PUBLIC_KEY_LENGTH + IV_LENGTH;
    let tag_end = iv_end + AUTH_TAG_LENGTH;
    let embedded_key = &wrapped_key[..PUBLIC_KEY_LENGTH];
    let iv = &wrapped_key[PUBLIC_KEY_LENGTH..iv_end];
    let tag = &wrapped_key[iv_end..tag_end];
    let wrapped = &wrapped_key[tag_end..];

    // Address binding: the wrap embeds the recipient key it targeted.
    let expected = recipient.public_uncompressed();
    if !bool::from(embedded_key.ct_eq(&expected)) {
        return Err(ErrorKind::FailedToDecryptKey.into());
    }

    let ephemeral = parse_public_key(ephemeral_public_key)
        .map_err(|_| ErrorKind::InvalidEphemeralPublicKey)?;
    let shared = ecdh_x(recipient.secret(), &ephemeral);
    let wrap_key = kdf::derive_symmetric_key(shared.as_ref())?;

    let content = aead::decrypt(wrap_key.as_ref(), iv, wrapped, tag, recipient_id)
        .map_err(|_| ErrorKind::FailedToDecryptKey)?;
    if content.len() != SYMMETRIC_KEY_LENGTH {
        return Err(ErrorKind::FailedToDecryptKey.into());
    }
    let mut out = Zeroizing::new([0u8; SYMMETRIC_KEY_LENGTH]);
    out.copy_from_slice(&content);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Encrypt
// ---------------------------------------------------------------------------

fn check_recipients(config: &EciesConstants, recipients: &[Recipient]) -> Result<()> {
    if recipients.is_empty() {
        return Err(ErrorKind::InvalidRecipientCount.into());
    }
    if recipients.len() > MAX_RECIPIENTS {
        return Err(ErrorKind::TooManyRecipients {
            maximum: MAX_RECIPIENTS,
            actual: recipients.len(),
        }
        .into());
    }

    let width = config.multiple.recipient_id_size;
    let mut seen: HashSet<&[u8]> = HashSet::with_capacity(recipients.len());
    for recipient in recipients {
        if recipient.id.len() != width {
            return Err(ErrorKind::InvalidRecipientIdLength {
                expected: width,
                actual: recipient.id.len(),
            }
            .into());
        }
        if !seen.insert(recipient.id.as_slice()) {
            return Err(ErrorKind::DuplicateRecipientId.into());
        }
    }
    Ok(())
}

/// Encrypt `plaintext` for every recipient, prepending the caller's opaque
/// `preamble`. Cancellation is honored at each recipient-loop boundary and
/// leaves no partial output.
pub fn encrypt(
    config: &EciesConstants,
    recipients: &[Recipient],
    plaintext: &[u8],
    preamble: &[u8],
    cancel: Option<&CancelToken>,
) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(ErrorKind::CannotEncryptEmptyData.into());
    }
    check_recipients(config, recipients)?;

    let ephemeral = KeyPair::generate()?;
    let content_key = aead::random_symmetric_key()?;
    let (iv, ciphertext, tag) = aead::encrypt(content_key.as_ref(), plaintext, &[])?;

    let mut wrapped_keys = Vec::with_capacity(recipients.len());
    for (index, recipient) in recipients.iter().enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(EciesError::new(ErrorKind::EncryptionCancelled)
                .in_operation("encrypt_multiple"));
        }
        let wrapped = wrap_content_key(&ephemeral, recipient, &content_key)
            .map_err(|e| e.with_detail(format!("recipient {}", index)))?;
        wrapped_keys.push(wrapped);
    }

    assemble(config, recipients, &ephemeral, &iv, &tag, plaintext.len() as u64, &wrapped_keys, &ciphertext, preamble)
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    config: &EciesConstants,
    recipients: &[Recipient],
    ephemeral: &KeyPair,
    iv: &[u8; IV_LENGTH],
    tag: &[u8; AUTH_TAG_LENGTH],
    data_length: u64,
    wrapped_keys: &[[u8; ENCRYPTED_KEY_SIZE]],
    ciphertext: &[u8],
    preamble: &[u8],
) -> Result<Vec<u8>> {
    if wrapped_keys.len() != recipients.len() {
        return Err(ErrorKind::RecipientKeyCountMismatch {
            declared: recipients.len(),
            actual: wrapped_keys.len(),
        }
        .into());
    }

    let width = config.multiple.recipient_id_size;
    let total = preamble.len() + multiple_overhead(recipients.len(), width) + ciphertext.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(preamble);
    write_prefix(&mut out, EncryptionType::Multiple);
    out.extend_from_slice(&ephemeral.public_uncompressed());
    out.extend_from_slice(iv);
    out.extend_from_slice(tag);
    out.extend_from_slice(&data_length.to_be_bytes());
    out.extend_from_slice(&(recipients.len() as u16).to_be_bytes());
    for recipient in recipients {
        out.extend_from_slice(&recipient.id);
    }
    for wrapped in wrapped_keys {
        out.extend_from_slice(wrapped);
    }
    out.extend_from_slice(ciphertext);

    if out.len() != total {
        return Err(ErrorKind::MessageLengthMismatch {
            expected: total,
            actual: out.len(),
        }
        .into());
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Parse a MULTIPLE frame, skipping `preamble_len` bytes.
pub fn parse<'a>(
    config: &EciesConstants,
    data: &'a [u8],
    preamble_len: usize,
) -> Result<MultipleFrame<'a>> {
    let minimum = preamble_len + MULTIPLE_FIXED_OVERHEAD;
    if data.len() < minimum {
        return Err(ErrorKind::InvalidHeaderLength {
            minimum,
            actual: data.len(),
        }
        .into());
    }

    read_prefix(data, preamble_len, EncryptionType::Multiple)?;

    let short = || ErrorKind::InvalidHeaderLength {
        minimum,
        actual: data.len(),
    };
    let key_start = preamble_len + PREFIX_LENGTH;
    let iv_start = key_start + PUBLIC_KEY_LENGTH;
    let tag_start = iv_start + IV_LENGTH;
    let length_start = tag_start + AUTH_TAG_LENGTH;
    let count_start = length_start + DATA_LENGTH_SIZE;
    let ids_start = count_start + RECIPIENT_COUNT_SIZE;

    let ephemeral_public_key: &[u8; PUBLIC_KEY_LENGTH] =
        data[key_start..iv_start].try_into().map_err(|_| short())?;
    let iv: &[u8; IV_LENGTH] = data[iv_start..tag_start].try_into().map_err(|_| short())?;
    let auth_tag: &[u8; AUTH_TAG_LENGTH] =
        data[tag_start..length_start].try_into().map_err(|_| short())?;

    let data_length = u64::from_be_bytes(
        data[length_start..count_start].try_into().map_err(|_| short())?,
    );
    if data_length == 0 {
        return Err(EciesError::new(ErrorKind::InvalidDataLength).at_position(length_start));
    }

    let recipient_count = u16::from_be_bytes(
        data[count_start..ids_start].try_into().map_err(|_| short())?,
    ) as usize;
    if recipient_count == 0 {
        return Err(EciesError::new(ErrorKind::InvalidRecipientCount).at_position(count_start));
    }

    let width = config.multiple.recipient_id_size;
    let header_size = multiple_overhead(recipient_count, width);
    let required = preamble_len + header_size;
    if data.len() < required {
        return Err(ErrorKind::DataTooShortForMultiRecipientHeader {
            required,
            actual: data.len(),
        }
        .into());
    }

    let expected_total = required
        .checked_add(usize::try_from(data_length).map_err(|_| {
            ErrorKind::MessageTooLarge {
                maximum: usize::MAX as u64,
                actual: data_length,
            }
        })?)
        .ok_or(ErrorKind::MessageTooLarge {
            maximum: usize::MAX as u64,
            actual: data_length,
        })?;
    if data.len() != expected_total {
        return Err(ErrorKind::MessageLengthMismatch {
            expected: expected_total,
            actual: data.len(),
        }
        .into());
    }

    let keys_start = ids_start + recipient_count * width;
    let mut recipients = Vec::with_capacity(recipient_count);
    for index in 0..recipient_count {
        let id_start = ids_start + index * width;
        let key_offset = keys_start + index * ENCRYPTED_KEY_SIZE;
        recipients.push(RecipientEntry {
            id: &data[id_start..id_start + width],
            wrapped_key: &data[key_offset..key_offset + ENCRYPTED_KEY_SIZE],
        });
    }

    Ok(MultipleFrame {
        ephemeral_public_key,
        iv,
        auth_tag,
        data_length,
        recipients,
        ciphertext: &data[required..],
    })
}

// ---------------------------------------------------------------------------
// Decrypt
// ---------------------------------------------------------------------------

/// Decrypt an already-parsed frame for the recipient holding `recipient_id`.
pub fn decrypt_parsed(
    frame: &MultipleFrame<'_>,
    recipient_id: &[u8],
    recipient: &KeyPair,
) -> Result<Vec<u8>> {
    let index = frame
        .find_recipient(recipient_id)
        .ok_or(ErrorKind::RecipientNotFound)?;

    let content_key = unwrap_content_key(
        recipient,
        recipient_id,
        frame.ephemeral_public_key,
        frame.recipients[index].wrapped_key,
    )?;

    aead::decrypt(
        content_key.as_ref(),
        frame.iv,
        frame.ciphertext,
        frame.auth_tag,
        &[],
    )
}

/// Parse then decrypt in one step.
pub fn decrypt(
    config: &EciesConstants,
    recipient_id: &[u8],
    recipient: &KeyPair,
    data: &[u8],
    preamble_len: usize,
) -> Result<Vec<u8>> {
    if data.len() <= preamble_len {
        return Err(ErrorKind::CannotDecryptEmptyData.into());
    }
    let frame = parse(config, data, preamble_len)?;
    decrypt_parsed(&frame, recipient_id, recipient)
}
