//! Synthetic registry tree held in memory.

use std::collections::HashMap;

use super::{Hive, KeyInfo, RawValue, RegistryKey, RegistryProvider, StoreError, ValueData};

#[derive(Debug, Default, Clone)]
struct Node {
    children: Vec<String>,
    values: Vec<RawValue>,
    last_write: u64,
    denied: bool,
}

/// Registry tree built in code.
///
/// Paths are matched case-insensitively and separators may be `\` or `/`.
/// Child keys and values keep their insertion order, which is the order
/// enumeration reports them in.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRegistry {
    nodes: HashMap<(Hive, String), Node>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split(|c: char| c == '\\' || c == '/').filter(|s| !s.is_empty()).collect()
}

fn normalize(path: &str) -> String {
    segments(path).join("\\").to_lowercase()
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        InMemoryRegistry::default()
    }

    /// Create `path` and any missing ancestors.
    pub fn insert_key(&mut self, hive: Hive, path: &str) -> &mut Self {
        self.nodes.entry((hive, String::new())).or_default();

        let mut current = String::new();
        for segment in segments(path) {
            let parent = current.clone();
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(&segment.to_lowercase());

            if !self.nodes.contains_key(&(hive, current.clone())) {
                self.nodes.insert((hive, current.clone()), Node::default());
                if let Some(node) = self.nodes.get_mut(&(hive, parent)) {
                    node.children.push(segment.to_string());
                }
            }
        }
        self
    }

    fn node_mut(&mut self, hive: Hive, path: &str) -> &mut Node {
        self.insert_key(hive, path);
        self.nodes.entry((hive, normalize(path))).or_default()
    }

    /// Set a value, replacing an existing one of the same name.
    pub fn set_value(&mut self, hive: Hive, path: &str, name: &str, data: ValueData) -> &mut Self {
        let node = self.node_mut(hive, path);
        let value = RawValue::new(name, data);
        match node.values.iter_mut().find(|v| v.name.eq_ignore_ascii_case(name)) {
            Some(existing) => *existing = value,
            None => node.values.push(value),
        }
        self
    }

    pub fn set_last_write(&mut self, hive: Hive, path: &str, filetime: u64) -> &mut Self {
        self.node_mut(hive, path).last_write = filetime;
        self
    }

    /// Make `open_key` on `path` fail with `AccessDenied`.
    pub fn deny_access(&mut self, hive: Hive, path: &str) -> &mut Self {
        self.node_mut(hive, path).denied = true;
        self
    }
}

struct MemoryKey<'a> {
    node: &'a Node,
}

impl RegistryKey for MemoryKey<'_> {
    fn subkey_name(&self, index: u32) -> Result<String, StoreError> {
        self.node
            .children
            .get(index as usize)
            .cloned()
            .ok_or(StoreError::NoMoreItems)
    }

    fn value_at(&self, index: u32) -> Result<RawValue, StoreError> {
        self.node
            .values
            .get(index as usize)
            .cloned()
            .ok_or(StoreError::NoMoreItems)
    }

    fn info(&self) -> Result<KeyInfo, StoreError> {
        Ok(KeyInfo {
            subkeys: self.node.children.len() as u32,
            values: self.node.values.len() as u32,
            last_write: self.node.last_write,
        })
    }
}

impl RegistryProvider for InMemoryRegistry {
    fn open_key(&self, hive: Hive, path: &str) -> Result<Box<dyn RegistryKey + '_>, StoreError> {
        let node = self
            .nodes
            .get(&(hive, normalize(path)))
            .ok_or(StoreError::NotFound)?;
        if node.denied {
            return Err(StoreError::AccessDenied);
        }
        Ok(Box::new(MemoryKey { node }))
    }
}
