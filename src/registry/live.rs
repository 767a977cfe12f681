use winreg::enums::{
    RegType, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_READ,
};
use winreg::{RegKey, RegValue};

use super::{
    Hive, KeyInfo, RawValue, RegistryKey, RegistryProvider, StoreError, ValueData, ValueKind,
};

/// The registry of the running host, opened read-only.
#[derive(Debug, Default)]
pub struct LiveRegistry;

impl LiveRegistry {
    pub fn new() -> Self {
        LiveRegistry
    }
}

fn root(hive: Hive) -> RegKey {
    match hive {
        Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        Hive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
        Hive::Users => RegKey::predef(HKEY_USERS),
    }
}

fn value_kind(vtype: &RegType) -> ValueKind {
    match vtype {
        RegType::REG_NONE => ValueKind::None,
        RegType::REG_SZ => ValueKind::String,
        RegType::REG_EXPAND_SZ => ValueKind::ExpandString,
        RegType::REG_MULTI_SZ => ValueKind::MultiString,
        RegType::REG_DWORD => ValueKind::DWord,
        RegType::REG_QWORD => ValueKind::QWord,
        RegType::REG_BINARY => ValueKind::Binary,
        other => ValueKind::Other(other.clone() as u32),
    }
}

fn decode(name: String, value: RegValue) -> RawValue {
    let kind = value_kind(&value.vtype);
    RawValue {
        name,
        data: ValueData::from_raw(kind, &value.bytes),
        kind,
    }
}

struct LiveKey {
    key: RegKey,
}

impl RegistryKey for LiveKey {
    fn subkey_name(&self, index: u32) -> Result<String, StoreError> {
        match self.key.enum_keys().nth(index as usize) {
            Some(Ok(name)) => Ok(name),
            Some(Err(e)) => Err(StoreError::from_io(e)),
            None => Err(StoreError::NoMoreItems),
        }
    }

    fn value_at(&self, index: u32) -> Result<RawValue, StoreError> {
        match self.key.enum_values().nth(index as usize) {
            Some(Ok((name, value))) => Ok(decode(name, value)),
            Some(Err(e)) => Err(StoreError::from_io(e)),
            None => Err(StoreError::NoMoreItems),
        }
    }

    fn info(&self) -> Result<KeyInfo, StoreError> {
        let info = self.key.query_info().map_err(StoreError::from_io)?;
        let last_write = (u64::from(info.last_write_time.dwHighDateTime) << 32)
            | u64::from(info.last_write_time.dwLowDateTime);
        Ok(KeyInfo {
            subkeys: info.sub_keys,
            values: info.values,
            last_write,
        })
    }
}

impl RegistryProvider for LiveRegistry {
    fn open_key(&self, hive: Hive, path: &str) -> Result<Box<dyn RegistryKey + '_>, StoreError> {
        let key = root(hive)
            .open_subkey_with_flags(path, KEY_READ)
            .map_err(StoreError::from_io)?;
        Ok(Box::new(LiveKey { key }))
    }
}
