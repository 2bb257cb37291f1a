//! String-keyed storage partitioned by owner namespace.
//!
//! Every value is kept as a string regardless of its logical type. Typed
//! readers parse on the way out and fall back to the type's zero value, so a
//! stored `0` and a missing or unparsable value read the same.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreScope {
    /// Persists across runs.
    System,
    /// Cleared whenever a new run starts.
    RunState,
}

/// A value as the store writes it. Booleans use the host's `True`/`False`.
pub trait StoreValue {
    fn to_store_string(&self) -> String;
}

impl StoreValue for bool {
    fn to_store_string(&self) -> String {
        let raw = if *self { "True" } else { "False" };
        raw.to_string()
    }
}

impl<T: StoreValue + ?Sized> StoreValue for &T {
    fn to_store_string(&self) -> String {
        (**self).to_store_string()
    }
}

macro_rules! display_store_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl StoreValue for $ty {
                fn to_store_string(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_store_value!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64, char, str, String);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModdedSaveData {
    owners: BTreeMap<String, BTreeMap<String, String>>,
}

impl ModdedSaveData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: &str, key: &str) -> Option<&str> {
        self.owners
            .get(owner)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn get_as_int(&self, owner: &str, key: &str) -> i32 {
        self.parse_or_default(owner, key)
    }

    pub fn get_as_float(&self, owner: &str, key: &str) -> f32 {
        self.parse_or_default(owner, key)
    }

    pub fn get_as_bool(&self, owner: &str, key: &str) -> bool {
        match self.get(owner, key) {
            Some(raw) if raw.trim().eq_ignore_ascii_case("true") => true,
            Some(raw) if raw.trim().eq_ignore_ascii_case("false") => false,
            Some(raw) => {
                debug!(owner, key, raw, "stored value is not a boolean");
                false
            }
            None => false,
        }
    }

    pub fn set(&mut self, owner: &str, key: &str, value: impl StoreValue) {
        self.owners
            .entry(owner.to_string())
            .or_default()
            .insert(key.to_string(), value.to_store_string());
    }

    pub fn remove(&mut self, owner: &str, key: &str) -> Option<String> {
        let entries = self.owners.get_mut(owner)?;
        let removed = entries.remove(key);
        if entries.is_empty() {
            self.owners.remove(owner);
        }
        removed
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    /// Key/value pairs stored under `owner`, in key order.
    pub fn entries(&self, owner: &str) -> impl Iterator<Item = (&str, &str)> {
        self.owners
            .get(owner)
            .into_iter()
            .flat_map(|entries| entries.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self, owner: &str) -> impl Iterator<Item = &str> {
        self.entries(owner).map(|(k, _)| k)
    }

    /// Total number of stored keys across all owners.
    pub fn len(&self) -> usize {
        self.owners.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.owners.clear();
    }

    fn parse_or_default<T>(&self, owner: &str, key: &str) -> T
    where
        T: std::str::FromStr + Default,
    {
        let Some(raw) = self.get(owner, key) else {
            return T::default();
        };
        match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                debug!(owner, key, raw, "stored value failed to parse; using default");
                T::default()
            }
        }
    }
}

/// Both persisted maps plus the unsaved-changes flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveStore {
    system: ModdedSaveData,
    run_state: ModdedSaveData,
    dirty: bool,
}

impl SaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store freshly read from disk; nothing is pending.
    pub fn from_parts(system: ModdedSaveData, run_state: ModdedSaveData) -> Self {
        Self {
            system,
            run_state,
            dirty: false,
        }
    }

    pub fn system(&self) -> &ModdedSaveData {
        &self.system
    }

    pub fn run_state(&self) -> &ModdedSaveData {
        &self.run_state
    }

    pub fn scope(&self, scope: StoreScope) -> &ModdedSaveData {
        match scope {
            StoreScope::System => &self.system,
            StoreScope::RunState => &self.run_state,
        }
    }

    /// Mutable access to one scope; the store is marked dirty up front.
    pub fn scope_mut(&mut self, scope: StoreScope) -> &mut ModdedSaveData {
        self.dirty = true;
        match scope {
            StoreScope::System => &mut self.system,
            StoreScope::RunState => &mut self.run_state,
        }
    }

    pub fn set(&mut self, scope: StoreScope, owner: &str, key: &str, value: impl StoreValue) {
        self.scope_mut(scope).set(owner, key, value);
    }

    pub fn start_new_run(&mut self) {
        self.run_state.clear();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
