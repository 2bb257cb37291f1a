//! Stable identifiers for `(tag, owner, name)` triples.
//!
//! Allocations live in the system scope of the save store under the
//! configured API owner, keyed `"{tag}_{owner}_{name}"`. The high-water mark
//! is stored next to them and only ever grows; removing content from a
//! registry never hands its identifier back.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CoreConfig, CounterScope};
use crate::core_api::{CoreError, CoreErrorCode};
use crate::reverse_index::ReverseTypeIndex;
use crate::store::{SaveStore, StoreScope};
use crate::type_tag::TypeTag;

/// One persisted allocation, as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationEntry {
    pub tag: TypeTag,
    /// `"{owner}_{name}"`; the split point is not recoverable once stored.
    pub qualified_name: String,
    pub id: i32,
}

/// The `(owner, name)` split that first used a storage key in this process.
/// `_` may appear in either part, so the key alone does not identify it.
#[derive(Debug)]
struct KeyClaim {
    owner: String,
    name: String,
}

impl KeyClaim {
    fn is(&self, owner: &str, name: &str) -> bool {
        self.owner == owner && self.name == name
    }
}

#[derive(Debug)]
pub struct GuidAllocator {
    config: CoreConfig,
    store: Mutex<SaveStore>,
    claims: Mutex<HashMap<String, KeyClaim>>,
    reverse_index: ReverseTypeIndex,
}

pub fn fully_qualified_name(owner: &str, name: &str) -> String {
    format!("{owner}_{name}")
}

pub fn storage_key(tag: TypeTag, owner: &str, name: &str) -> String {
    format!("{}_{}", tag.as_str(), fully_qualified_name(owner, name))
}

impl GuidAllocator {
    pub fn new(config: CoreConfig, store: SaveStore) -> Self {
        Self {
            config,
            store: Mutex::new(store),
            claims: Mutex::new(HashMap::new()),
            reverse_index: ReverseTypeIndex::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn base_offset(&self) -> i32 {
        self.config.base_offset
    }

    pub fn reverse_index(&self) -> &ReverseTypeIndex {
        &self.reverse_index
    }

    fn high_water_key(&self, tag: TypeTag) -> String {
        match self.config.counter_scope {
            CounterScope::Shared => self.config.high_water_key.clone(),
            CounterScope::PerType => format!("{}_{}", self.config.high_water_key, tag.as_str()),
        }
    }

    /// Returns the identifier for the triple, minting one above the
    /// high-water mark the first time it is requested.
    pub fn allocate(&self, tag: TypeTag, owner: &str, name: &str) -> Result<i32, CoreError> {
        if owner.trim().is_empty() {
            return Err(CoreError::invalid_argument(format!(
                "cannot allocate {tag} '{name}': owner namespace is empty"
            )));
        }
        if name.trim().is_empty() {
            return Err(CoreError::invalid_argument(format!(
                "cannot allocate {tag} for '{owner}': logical name is empty"
            )));
        }

        let key = storage_key(tag, owner, name);
        let api_owner = self.config.api_owner.as_str();

        let id = {
            let mut store = self.store.lock();
            let mut claims = self.claims.lock();
            if let Some(claim) = claims.get(&key)
                && !claim.is(owner, name)
            {
                return Err(CoreError::invalid_argument(format!(
                    "{tag} '{name}' from '{owner}' collides with '{}' from '{}' on storage key '{key}'",
                    claim.name, claim.owner
                )));
            }

            let existing = store.system().get_as_int(api_owner, &key);
            let id = if existing != 0 {
                existing
            } else {
                let mark_key = self.high_water_key(tag);
                let mark = store
                    .system()
                    .get_as_int(api_owner, &mark_key)
                    .max(self.config.base_offset);
                let Some(next) = mark.checked_add(1) else {
                    return Err(CoreError::new(
                        CoreErrorCode::Parse,
                        format!("high-water mark '{mark_key}' is exhausted at {mark}"),
                    ));
                };
                let system = store.scope_mut(StoreScope::System);
                system.set(api_owner, &mark_key, next);
                system.set(api_owner, &key, mark);
                debug!(%tag, owner, name, id = mark, "allocated new identifier");
                mark
            };
            claims.entry(key).or_insert_with(|| KeyClaim {
                owner: owner.to_string(),
                name: name.to_string(),
            });
            id
        };

        self.reverse_index.record(id, tag);
        Ok(id)
    }

    /// The identifier previously allocated for the triple, if any.
    pub fn lookup(&self, tag: TypeTag, owner: &str, name: &str) -> Option<i32> {
        let key = storage_key(tag, owner, name);
        if let Some(claim) = self.claims.lock().get(&key)
            && !claim.is(owner, name)
        {
            return None;
        }
        let id = self
            .store
            .lock()
            .system()
            .get_as_int(&self.config.api_owner, &key);
        (id != 0).then_some(id)
    }

    /// Current stored mark for `tag`'s counter; 0 while nothing was allocated.
    pub fn high_water_mark(&self, tag: TypeTag) -> i32 {
        let key = self.high_water_key(tag);
        self.store
            .lock()
            .system()
            .get_as_int(&self.config.api_owner, &key)
    }

    /// Identifiers previously allocated for `tag`, ascending.
    pub fn enumerate_extra_values(&self, tag: TypeTag) -> Vec<i32> {
        let mut values: Vec<i32> = self
            .allocations()
            .into_iter()
            .filter(|entry| entry.tag == tag)
            .map(|entry| entry.id)
            .collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    /// Every persisted allocation, grouped by tag and ordered by identifier.
    pub fn allocations(&self) -> Vec<AllocationEntry> {
        let store = self.store.lock();
        let system = store.system();
        let api_owner = self.config.api_owner.as_str();

        let mut out = Vec::new();
        for (key, _) in system.entries(api_owner) {
            let Some((tag, qualified_name)) = split_storage_key(key) else {
                continue;
            };
            let id = system.get_as_int(api_owner, key);
            if id == 0 {
                continue;
            }
            out.push(AllocationEntry {
                tag,
                qualified_name: qualified_name.to_string(),
                id,
            });
        }
        out.sort_by(|a, b| a.tag.cmp(&b.tag).then(a.id.cmp(&b.id)));
        out
    }

    pub fn with_store<T>(&self, f: impl FnOnce(&SaveStore) -> T) -> T {
        f(&self.store.lock())
    }

    pub fn with_store_mut<T>(&self, f: impl FnOnce(&mut SaveStore) -> T) -> T {
        f(&mut self.store.lock())
    }

    /// Swaps in a freshly loaded store, returning the previous one.
    pub fn replace_store(&self, store: SaveStore) -> SaveStore {
        std::mem::replace(&mut *self.store.lock(), store)
    }
}

fn split_storage_key(key: &str) -> Option<(TypeTag, &str)> {
    TypeTag::ALL.iter().find_map(|tag| {
        key.strip_prefix(tag.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
            .map(|rest| (*tag, rest))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> GuidAllocator {
        GuidAllocator::new(CoreConfig::default(), SaveStore::new())
    }

    #[test]
    fn storage_key_matches_host_layout() {
        assert_eq!(
            storage_key(TypeTag::Ability, "pluginA", "FooAbility"),
            "Ability_pluginA_FooAbility"
        );
    }

    #[test]
    fn first_allocation_starts_at_base_offset() {
        let alloc = allocator();
        assert_eq!(alloc.high_water_mark(TypeTag::Ability), 0);
        assert_eq!(alloc.allocate(TypeTag::Ability, "modA", "Fire").unwrap(), 1000);
        assert_eq!(alloc.high_water_mark(TypeTag::Ability), 1001);
        assert!(alloc.with_store(SaveStore::is_dirty));
    }

    #[test]
    fn low_stored_mark_is_clamped_up() {
        let alloc = allocator();
        alloc.with_store_mut(|s| {
            s.set(StoreScope::System, "cyantist.inscryption.api", "maximumStoredValueForEnum", 12)
        });
        assert_eq!(alloc.allocate(TypeTag::Mask, "modA", "Skull").unwrap(), 1000);
    }

    #[test]
    fn idempotent_path_does_not_write() {
        let alloc = allocator();
        let id = alloc.allocate(TypeTag::Tribe, "modA", "Frogs").unwrap();
        alloc.with_store_mut(SaveStore::mark_clean);

        assert_eq!(alloc.allocate(TypeTag::Tribe, "modA", "Frogs").unwrap(), id);
        assert!(!alloc.with_store(SaveStore::is_dirty));
        assert_eq!(alloc.lookup(TypeTag::Tribe, "modA", "Frogs"), Some(id));
        assert_eq!(alloc.lookup(TypeTag::Tribe, "modA", "Toads"), None);
    }

    #[test]
    fn empty_owner_or_name_is_rejected() {
        let alloc = allocator();
        assert!(alloc.allocate(TypeTag::Ability, "", "Fire").is_err());
        assert!(alloc.allocate(TypeTag::Ability, "modA", "  ").is_err());
        assert_eq!(alloc.high_water_mark(TypeTag::Ability), 0);
    }

    #[test]
    fn per_type_counters_restart_at_base_for_each_tag() {
        let config = CoreConfig {
            counter_scope: CounterScope::PerType,
            ..CoreConfig::default()
        };
        let alloc = GuidAllocator::new(config, SaveStore::new());
        assert_eq!(alloc.allocate(TypeTag::Ability, "modA", "Fire").unwrap(), 1000);
        assert_eq!(alloc.allocate(TypeTag::Mask, "modA", "Fire").unwrap(), 1000);
        assert_eq!(alloc.allocate(TypeTag::Ability, "modA", "Ice").unwrap(), 1001);
        assert_eq!(alloc.high_water_mark(TypeTag::Mask), 1001);
        assert_eq!(
            alloc.reverse_index().lookup_all(1000),
            vec![TypeTag::Ability, TypeTag::Mask]
        );
    }

    #[test]
    fn exhausted_mark_fails_without_writing() {
        let alloc = allocator();
        alloc.with_store_mut(|s| {
            s.set(
                StoreScope::System,
                "cyantist.inscryption.api",
                "maximumStoredValueForEnum",
                i32::MAX,
            );
            s.mark_clean();
        });

        let err = alloc.allocate(TypeTag::Ability, "modA", "Fire").unwrap_err();
        assert_eq!(err.code, CoreErrorCode::Parse);
        assert!(alloc.allocate(TypeTag::Ability, "modB", "Ice").is_err());
        assert_eq!(alloc.high_water_mark(TypeTag::Ability), i32::MAX);
        assert_eq!(alloc.lookup(TypeTag::Ability, "modA", "Fire"), None);
        assert!(!alloc.with_store(SaveStore::is_dirty));
    }

    #[test]
    fn last_representable_identifier_is_still_issued() {
        let alloc = allocator();
        alloc.with_store_mut(|s| {
            s.set(
                StoreScope::System,
                "cyantist.inscryption.api",
                "maximumStoredValueForEnum",
                i32::MAX - 1,
            )
        });

        assert_eq!(alloc.allocate(TypeTag::Mask, "modA", "Skull").unwrap(), i32::MAX - 1);
        assert_eq!(alloc.high_water_mark(TypeTag::Mask), i32::MAX);
        assert!(alloc.allocate(TypeTag::Mask, "modA", "Crown").is_err());
    }

    #[test]
    fn underscore_split_collision_is_rejected() {
        let alloc = allocator();
        assert_eq!(alloc.allocate(TypeTag::Ability, "mod_A", "Fire").unwrap(), 1000);

        let err = alloc.allocate(TypeTag::Ability, "mod", "A_Fire").unwrap_err();
        assert_eq!(err.code, CoreErrorCode::InvalidArgument);
        assert_eq!(alloc.lookup(TypeTag::Ability, "mod", "A_Fire"), None);
        assert_eq!(alloc.lookup(TypeTag::Ability, "mod_A", "Fire"), Some(1000));

        assert_eq!(alloc.allocate(TypeTag::Ability, "mod_A", "Fire").unwrap(), 1000);
        assert_eq!(alloc.allocate(TypeTag::Ability, "mod", "B_Fire").unwrap(), 1001);
    }

    #[test]
    fn split_storage_key_skips_bookkeeping() {
        assert_eq!(split_storage_key("maximumStoredValueForEnum"), None);
        assert_eq!(
            split_storage_key("SpecialStatIcon_modA_Bones"),
            Some((TypeTag::SpecialStatIcon, "modA_Bones"))
        );
        assert_eq!(split_storage_key("Ability_"), None);
    }
}
