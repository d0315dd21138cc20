//! Process-wide configuration registry with provenance.
//!
//! Mutation is serialized behind a mutex; reads return cloned snapshots.
//! The registry always holds the default entry: registering over it fails,
//! unregistering it is a no-op, and `clear` reinstates its provenance.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{constants_checksum, validate_constants, EciesConstants};
use crate::error::{ErrorKind, Result};

/// Key of the built-in default configuration.
pub const DEFAULT_CONFIG_KEY: &str = "default";

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where a registered configuration came from.
#[derive(Clone, Debug, Serialize)]
pub struct Provenance {
    /// Free-form source tag (e.g. `"built-in"`, `"tenant-config"`).
    pub source: String,
    pub registered_at: DateTime<Utc>,
    /// SHA3-512 hex of the canonical configuration snapshot.
    pub checksum: String,
    pub description: Option<String>,
}

/// A frozen configuration plus its provenance.
#[derive(Clone)]
pub struct RegisteredConfiguration {
    pub constants: EciesConstants,
    pub provenance: Provenance,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct ConfigurationRegistry {
    entries: Mutex<HashMap<String, RegisteredConfiguration>>,
}

impl ConfigurationRegistry {
    /// A registry holding only the default entry.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(DEFAULT_CONFIG_KEY.to_string(), Self::default_entry());
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// The shared process-wide instance.
    pub fn global() -> &'static ConfigurationRegistry {
        static GLOBAL: OnceLock<ConfigurationRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ConfigurationRegistry::new)
    }

    fn default_entry() -> RegisteredConfiguration {
        let constants = EciesConstants::default();
        let checksum = constants_checksum(&constants);
        RegisteredConfiguration {
            constants,
            provenance: Provenance {
                source: "built-in".to_string(),
                registered_at: Utc::now(),
                checksum,
                description: Some("library default configuration".to_string()),
            },
        }
    }

    /// Register a validated configuration under `key`.
    ///
    /// The default key is reserved. Re-registering another key replaces its
    /// entry and provenance.
    pub fn register(
        &self,
        key: &str,
        constants: EciesConstants,
        source: &str,
        description: Option<String>,
    ) -> Result<()> {
        if key == DEFAULT_CONFIG_KEY {
            return Err(ErrorKind::CannotOverwriteDefaultConfiguration.into());
        }
        validate_constants(&constants)?;

        let checksum = constants_checksum(&constants);
        let entry = RegisteredConfiguration {
            constants,
            provenance: Provenance {
                source: source.to_string(),
                registered_at: Utc::now(),
                checksum: checksum.clone(),
                description,
            },
        };

        let mut entries = self.entries.lock().expect("registry lock poisoned");
        entries.insert(key.to_string(), entry);
        tracing::debug!(key, source, checksum = %&checksum[..16], "registered configuration");
        Ok(())
    }

    /// Snapshot of the entry under `key`, if any.
    pub fn get(&self, key: &str) -> Option<RegisteredConfiguration> {
        self.entries
            .lock()
            .expect("registry lock poisoned")
            .get(key)
            .cloned()
    }

    /// Snapshot of the default entry.
    pub fn default_configuration(&self) -> RegisteredConfiguration {
        self.get(DEFAULT_CONFIG_KEY)
            .expect("default entry is always present")
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .expect("registry lock poisoned")
            .contains_key(key)
    }

    /// Registered keys, default included.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        // The default entry is never removed.
        false
    }

    /// Remove `key`. Returns whether an entry was removed; removing the
    /// default is a no-op.
    pub fn unregister(&self, key: &str) -> bool {
        if key == DEFAULT_CONFIG_KEY {
            return false;
        }
        let removed = self
            .entries
            .lock()
            .expect("registry lock poisoned")
            .remove(key)
            .is_some();
        if removed {
            tracing::debug!(key, "unregistered configuration");
        }
        removed
    }

    /// Remove every non-default entry and reinstate the default provenance.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("registry lock poisoned");
        entries.clear();
        entries.insert(DEFAULT_CONFIG_KEY.to_string(), Self::default_entry());
        tracing::debug!("cleared configuration registry");
    }
}

impl Default for ConfigurationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{create_runtime_configuration, ConfigOverrides};
    use crate::id_provider::GuidV4Provider;
    use std::sync::Arc;

    fn guid_config() -> EciesConstants {
        create_runtime_configuration(ConfigOverrides {
            id_provider: Some(Arc::new(GuidV4Provider::new())),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn starts_with_default_entry() {
        let registry = ConfigurationRegistry::new();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(DEFAULT_CONFIG_KEY));
        let entry = registry.default_configuration();
        assert_eq!(entry.provenance.source, "built-in");
        assert_eq!(entry.provenance.checksum.len(), 128);
    }

    #[test]
    fn register_and_lookup() {
        let registry = ConfigurationRegistry::new();
        registry
            .register("tenant-a", guid_config(), "test", Some("guid ids".into()))
            .unwrap();
        let entry = registry.get("tenant-a").unwrap();
        assert_eq!(entry.constants.member_id_length, 16);
        assert_eq!(entry.provenance.source, "test");
        assert_eq!(registry.keys(), vec!["default".to_string(), "tenant-a".to_string()]);
    }

    #[test]
    fn default_key_is_reserved() {
        let registry = ConfigurationRegistry::new();
        let err = registry
            .register(DEFAULT_CONFIG_KEY, guid_config(), "test", None)
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::CannotOverwriteDefaultConfiguration);
    }

    #[test]
    fn unregister_default_is_noop() {
        let registry = ConfigurationRegistry::new();
        assert!(!registry.unregister(DEFAULT_CONFIG_KEY));
        assert!(registry.contains(DEFAULT_CONFIG_KEY));
    }

    #[test]
    fn unregister_removes_entry() {
        let registry = ConfigurationRegistry::new();
        registry.register("t", guid_config(), "test", None).unwrap();
        assert!(registry.unregister("t"));
        assert!(!registry.unregister("t"));
        assert!(registry.get("t").is_none());
    }

    #[test]
    fn clear_keeps_only_default() {
        let registry = ConfigurationRegistry::new();
        registry.register("a", guid_config(), "test", None).unwrap();
        registry.register("b", guid_config(), "test", None).unwrap();
        registry.clear();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(DEFAULT_CONFIG_KEY));
        assert_eq!(registry.default_configuration().provenance.source, "built-in");
    }

    #[test]
    fn global_registry_is_shared() {
        let registry = ConfigurationRegistry::global();
        assert!(registry.contains(DEFAULT_CONFIG_KEY));
        assert!(std::ptr::eq(registry, ConfigurationRegistry::global()));

        registry.register("global-test-entry", guid_config(), "test", None).unwrap();
        assert!(ConfigurationRegistry::global().contains("global-test-entry"));
        registry.unregister("global-test-entry");
    }

    #[test]
    fn invalid_configuration_rejected_at_register() {
        let registry = ConfigurationRegistry::new();
        let mut broken = EciesConstants::default();
        broken.multiple.encrypted_key_size = 64;
        assert!(registry.register("broken", broken, "test", None).is_err());
        assert!(!registry.contains("broken"));
    }
}
