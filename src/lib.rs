//! # ecies-envelope
//!
//! secp256k1 ECIES with a framed binary message format: single-recipient
//! frames (with or without an explicit length field) and multi-recipient
//! envelopes that wrap one content key per recipient.
//!
//! ## Quick Start
//!
//! ```rust
//! use ecies_envelope::Ecies;
//!
//! let ecies = Ecies::with_defaults().unwrap();
//! let keys = ecies.generate_keypair().unwrap();
//!
//! let frame = ecies.encrypt_single(&keys.public_compressed(), b"secret").unwrap();
//! let plaintext = ecies.decrypt_single(&keys, &frame).unwrap();
//!
//! assert_eq!(plaintext, b"secret");
//! ```
//!
//! Multi-recipient envelopes carry one wrapped key per recipient id:
//!
//! ```rust
//! use ecies_envelope::{Ecies, Recipient};
//!
//! let ecies = Ecies::with_defaults().unwrap();
//! let alice = ecies.generate_keypair().unwrap();
//! let bob = ecies.generate_keypair().unwrap();
//!
//! let recipients = vec![
//!     Recipient::new(ecies.id_provider().generate(), alice.public_compressed().to_vec()),
//!     Recipient::new(ecies.id_provider().generate(), bob.public_compressed().to_vec()),
//! ];
//! let frame = ecies.encrypt_multiple(&recipients, b"broadcast").unwrap();
//!
//! let plaintext = ecies.decrypt_multiple(&recipients[0].id, &alice, &frame).unwrap();
//! assert_eq!(plaintext, b"broadcast");
//! ```
//!
//! ## Properties
//!
//! - **Hybrid KEM/DEM**: per-message ephemeral ECDH + HKDF-SHA256 +
//!   AES-256-GCM
//! - **Stable wire format**: versioned, cipher-suite tagged,
//!   self-describing mode byte
//! - **Pluggable recipient ids**: the provider's byte width is woven into
//!   the multi-recipient header
//! - **Deterministic key derivation**: BIP39 mnemonics through BIP32 HD
//!   paths
//!
//! ## What's NOT Provided
//!
//! - Transport
//! - Key persistence
//! - Plaintext compression
//! - Interactive handshakes or session resumption

#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/ecies-envelope/0.1.0")]

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

pub mod aead;
pub mod cancel;
pub mod constants;
pub mod error;
pub mod id_provider;
pub mod kdf;
pub mod keys;
pub mod mnemonic;
pub mod multiple;
pub mod registry;
pub mod service;
pub mod signature;
pub mod single;
pub mod wire;

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

pub use cancel::CancelToken;
pub use constants::{
    create_runtime_configuration, validate_constants, ChecksumConstants, ConfigOverrides,
    EciesConstants, MultipleConstants, Pbkdf2Constants,
};
pub use error::{EciesError, ErrorKind, Result};
pub use id_provider::{
    CustomFixedWidthProvider, GuidV4Provider, IdProvider, ObjectIdProvider,
};
pub use keys::KeyPair;
pub use mnemonic::{Mnemonic, MnemonicStrength};
pub use multiple::{MultipleFrame, Recipient, RecipientEntry};
pub use registry::{
    ConfigurationRegistry, Provenance, RegisteredConfiguration, DEFAULT_CONFIG_KEY,
};
pub use service::{Ecies, FramedMessage};
pub use single::SingleFrame;
pub use wire::{
    EncryptionType, CIPHER_SUITE, ENCRYPTED_KEY_SIZE, MULTIPLE_FIXED_OVERHEAD, SIMPLE_OVERHEAD,
    SINGLE_OVERHEAD, VERSION,
};
