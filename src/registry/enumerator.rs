//! Error-absorbing enumeration over a [`RegistryProvider`].
//!
//! Every function here treats a missing key, denied access or a failure
//! part way through enumeration the same way: the caller sees fewer (or no)
//! items, and the cause is logged at debug level.

use chrono::{DateTime, Utc};
use log::debug;

use super::{Hive, RawValue, RegistryKey, RegistryProvider, StoreError};
use crate::utils::time::filetime_to_utc;

/// Lazy iterator over the child key names of one key.
///
/// The key handle is held for as long as the iterator lives and is released
/// as soon as enumeration ends, whether that is exhaustion or an error.
pub struct ChildKeys<'a> {
    key: Option<Box<dyn RegistryKey + 'a>>,
    index: u32,
}

impl<'a> ChildKeys<'a> {
    fn empty() -> Self {
        ChildKeys { key: None, index: 0 }
    }
}

impl<'a> Iterator for ChildKeys<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let key = self.key.as_ref()?;
        match key.subkey_name(self.index) {
            Ok(name) => {
                self.index += 1;
                Some(name)
            }
            Err(StoreError::NoMoreItems) => {
                self.key = None;
                None
            }
            Err(e) => {
                debug!("Stopped enumerating subkeys at index {}: {}", self.index, e);
                self.key = None;
                None
            }
        }
    }
}

fn open<'a>(
    provider: &'a dyn RegistryProvider,
    hive: Hive,
    path: &str,
) -> Option<Box<dyn RegistryKey + 'a>> {
    match provider.open_key(hive, path) {
        Ok(key) => Some(key),
        Err(e) => {
            debug!("Could not open {}\\{}: {}", hive, path, e);
            None
        }
    }
}

/// Names of the immediate child keys of `path`, in store order.
///
/// A key that cannot be opened yields an empty sequence.
pub fn list_child_keys<'a>(
    provider: &'a dyn RegistryProvider,
    hive: Hive,
    path: &str,
) -> ChildKeys<'a> {
    match open(provider, hive, path) {
        Some(key) => ChildKeys { key: Some(key), index: 0 },
        None => ChildKeys::empty(),
    }
}

/// All values of `path`, in store order.
///
/// The value count comes from the key's metadata. A value that fails to
/// read is skipped; the rest are still returned.
pub fn list_values(provider: &dyn RegistryProvider, hive: Hive, path: &str) -> Vec<RawValue> {
    let Some(key) = open(provider, hive, path) else {
        return Vec::new();
    };

    let count = match key.info() {
        Ok(info) => info.values,
        Err(e) => {
            debug!("Could not query {}\\{}: {}", hive, path, e);
            return Vec::new();
        }
    };

    let mut values = Vec::with_capacity(count as usize);
    for index in 0..count {
        match key.value_at(index) {
            Ok(value) => values.push(value),
            Err(StoreError::NoMoreItems) => break,
            Err(e) => debug!("Skipping value {} of {}\\{}: {}", index, hive, path, e),
        }
    }
    values
}

/// A single value looked up by name (case-insensitive, as the registry is).
pub fn read_value(
    provider: &dyn RegistryProvider,
    hive: Hive,
    path: &str,
    name: &str,
) -> Option<RawValue> {
    list_values(provider, hive, path)
        .into_iter()
        .find(|value| value.name.eq_ignore_ascii_case(name))
}

/// Last write time of a key, if it can be opened and queried.
pub fn key_last_written(
    provider: &dyn RegistryProvider,
    hive: Hive,
    path: &str,
) -> Option<DateTime<Utc>> {
    let key = open(provider, hive, path)?;
    match key.info() {
        Ok(info) => Some(filetime_to_utc(info.last_write)),
        Err(e) => {
            debug!("Could not query {}\\{}: {}", hive, path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{InMemoryRegistry, KeyInfo, ValueData};
    use std::cell::Cell;

    const INTERFACES: &str = r"SYSTEM\CurrentControlSet\Services\Tcpip\Parameters\Interfaces";

    #[test]
    fn test_child_keys_in_store_order() {
        let mut registry = InMemoryRegistry::new();
        registry.insert_key(Hive::LocalMachine, &format!(r"{}\{{B}}", INTERFACES));
        registry.insert_key(Hive::LocalMachine, &format!(r"{}\{{A}}", INTERFACES));

        let names: Vec<String> =
            list_child_keys(&registry, Hive::LocalMachine, INTERFACES).collect();
        assert_eq!(names, vec!["{B}", "{A}"]);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let registry = InMemoryRegistry::new();

        assert_eq!(list_child_keys(&registry, Hive::LocalMachine, r"SOFTWARE\Nope").count(), 0);
        assert!(list_values(&registry, Hive::LocalMachine, r"SOFTWARE\Nope").is_empty());
        assert!(read_value(&registry, Hive::LocalMachine, r"SOFTWARE\Nope", "x").is_none());
        assert!(key_last_written(&registry, Hive::LocalMachine, r"SOFTWARE\Nope").is_none());
    }

    #[test]
    fn test_denied_key_is_empty() {
        let mut registry = InMemoryRegistry::new();
        registry.set_value(Hive::LocalMachine, r"SAM\Domains", "F", ValueData::DWord(1));
        registry.deny_access(Hive::LocalMachine, r"SAM\Domains");

        assert!(list_values(&registry, Hive::LocalMachine, r"SAM\Domains").is_empty());
    }

    #[test]
    fn test_read_value_ignores_case() {
        let mut registry = InMemoryRegistry::new();
        registry.set_value(
            Hive::LocalMachine,
            r"SOFTWARE\Microsoft\Windows NT\CurrentVersion",
            "ProductName",
            ValueData::String("Windows 10 Pro".into()),
        );

        let value = read_value(
            &registry,
            Hive::LocalMachine,
            r"software\microsoft\windows nt\currentversion",
            "productname",
        );
        assert_eq!(value.map(|v| v.data), Some(ValueData::String("Windows 10 Pro".into())));
    }

    #[test]
    fn test_key_last_written() {
        let mut registry = InMemoryRegistry::new();
        registry.insert_key(Hive::LocalMachine, INTERFACES);
        registry.set_last_write(Hive::LocalMachine, INTERFACES, 132_669_792_000_000_000);

        let written = key_last_written(&registry, Hive::LocalMachine, INTERFACES);
        assert_eq!(written.map(|t| t.to_rfc3339()), Some("2021-06-01T00:00:00+00:00".to_string()));
    }

    /// Key that fails on a chosen index, to exercise mid-enumeration errors.
    struct FlakyKey {
        fail_at: u32,
        reads: Cell<u32>,
    }

    impl RegistryKey for FlakyKey {
        fn subkey_name(&self, index: u32) -> Result<String, StoreError> {
            if index == self.fail_at {
                Err(StoreError::AccessDenied)
            } else {
                Ok(format!("child{}", index))
            }
        }

        fn value_at(&self, index: u32) -> Result<RawValue, StoreError> {
            self.reads.set(self.reads.get() + 1);
            if index == self.fail_at {
                Err(StoreError::AccessDenied)
            } else {
                Ok(RawValue::new(format!("v{}", index), ValueData::DWord(index)))
            }
        }

        fn info(&self) -> Result<KeyInfo, StoreError> {
            Ok(KeyInfo { subkeys: 4, values: 4, last_write: 0 })
        }
    }

    struct FlakyRegistry;

    impl RegistryProvider for FlakyRegistry {
        fn open_key(
            &self,
            _hive: Hive,
            _path: &str,
        ) -> Result<Box<dyn RegistryKey + '_>, StoreError> {
            Ok(Box::new(FlakyKey { fail_at: 2, reads: Cell::new(0) }))
        }
    }

    #[test]
    fn test_enumeration_error_ends_child_keys() {
        let names: Vec<String> = list_child_keys(&FlakyRegistry, Hive::LocalMachine, "x").collect();
        assert_eq!(names, vec!["child0", "child1"]);
    }

    #[test]
    fn test_unreadable_value_is_skipped() {
        let names: Vec<String> = list_values(&FlakyRegistry, Hive::LocalMachine, "x")
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["v0", "v1", "v3"]);
    }
}
