//! Base-plus-custom record lists, one per content kind.

mod records;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::allocator::GuidAllocator;
use crate::core_api::CoreError;
use crate::type_tag::TypeTag;

pub use records::{
    ConsumableItem, CustomMask, CustomRegion, CustomTotemTop, FullAbility, FullChallenge,
    FullSpecialTriggeredAbility, FullStatIcon,
};

/// Qualified name of the type the host instantiates to run a record's behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorDescriptor {
    pub type_name: String,
}

impl BehaviorDescriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for BehaviorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name)
    }
}

pub trait RegistryRecord: Clone {
    const TYPE_TAG: TypeTag;

    fn owner(&self) -> &str;
    fn logical_name(&self) -> &str;
    fn display_name(&self) -> &str;
    fn identifier(&self) -> i32;
    fn set_identifier(&mut self, id: i32);
    fn behavior(&self) -> Option<&BehaviorDescriptor>;
}

/// Capability used by the type resolver to map an identifier to behaviour.
pub trait ResolveBehavior {
    fn type_tag(&self) -> TypeTag;
    fn try_resolve(&self, id: i32) -> Option<BehaviorDescriptor>;
    fn find_behavior(&self, type_name: &str) -> Option<BehaviorDescriptor>;
    fn known_ids(&self) -> Vec<i32>;
}

type Listener<R> = Box<dyn Fn(&[R]) + Send + Sync>;

pub struct Registry<R> {
    base: Vec<R>,
    custom: Vec<R>,
    all: Arc<[R]>,
    listeners: Vec<Listener<R>>,
}

impl<R: RegistryRecord> Registry<R> {
    pub fn new(base: Vec<R>) -> Self {
        let all = base.iter().cloned().collect();
        Self {
            base,
            custom: Vec::new(),
            all,
            listeners: Vec::new(),
        }
    }

    pub fn base_items(&self) -> &[R] {
        &self.base
    }

    pub fn custom_items(&self) -> &[R] {
        &self.custom
    }

    /// Base items followed by custom items in insertion order. The returned
    /// snapshot is never touched by later mutations.
    pub fn all(&self) -> Arc<[R]> {
        Arc::clone(&self.all)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Registers a listener fired after every add or remove.
    pub fn on_change(&mut self, listener: impl Fn(&[R]) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Mints (or recovers) the record's identifier and appends it to the
    /// custom list.
    pub fn add(&mut self, mut record: R, allocator: &GuidAllocator) -> Result<R, CoreError> {
        let id = allocator.allocate(R::TYPE_TAG, record.owner(), record.logical_name())?;
        record.set_identifier(id);

        if self.custom.iter().any(|r| r.identifier() == id) {
            warn!(
                tag = %R::TYPE_TAG,
                owner = record.owner(),
                name = record.logical_name(),
                id,
                "record registered twice; both copies stay visible"
            );
        }

        self.custom.push(record.clone());
        debug!(tag = %R::TYPE_TAG, id, name = record.display_name(), "added custom record");
        self.refresh();
        Ok(record)
    }

    /// Removes the first custom record with `id`. Base items cannot be removed
    /// and the identifier stays allocated.
    pub fn remove(&mut self, id: i32) -> Option<R> {
        let index = self.custom.iter().position(|r| r.identifier() == id)?;
        let removed = self.custom.remove(index);
        debug!(tag = %R::TYPE_TAG, id, "removed custom record");
        self.refresh();
        Some(removed)
    }

    pub fn remove_record(&mut self, record: &R) -> Option<R> {
        self.remove(record.identifier())
    }

    pub fn get(&self, id: i32) -> Option<&R> {
        self.all.iter().find(|r| r.identifier() == id)
    }

    pub fn find_by_name(&self, display_name: &str) -> Option<&R> {
        self.all.iter().find(|r| r.display_name() == display_name)
    }

    pub fn find_by_logical_name(&self, owner: &str, name: &str) -> Option<&R> {
        self.all
            .iter()
            .find(|r| r.owner() == owner && r.logical_name() == name)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = i32> + '_ {
        self.all.iter().map(RegistryRecord::identifier)
    }

    fn refresh(&mut self) {
        self.all = self.base.iter().chain(self.custom.iter()).cloned().collect();
        for listener in &self.listeners {
            listener(&self.all);
        }
    }
}

impl<R: RegistryRecord> Default for Registry<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: RegistryRecord + fmt::Debug> fmt::Debug for Registry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tag", &R::TYPE_TAG)
            .field("base", &self.base)
            .field("custom", &self.custom)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<R: RegistryRecord> ResolveBehavior for Registry<R> {
    fn type_tag(&self) -> TypeTag {
        R::TYPE_TAG
    }

    fn try_resolve(&self, id: i32) -> Option<BehaviorDescriptor> {
        self.get(id).and_then(|r| r.behavior().cloned())
    }

    fn find_behavior(&self, type_name: &str) -> Option<BehaviorDescriptor> {
        self.all
            .iter()
            .filter_map(RegistryRecord::behavior)
            .find(|b| b.type_name == type_name)
            .cloned()
    }

    fn known_ids(&self) -> Vec<i32> {
        self.identifiers().collect()
    }
}

/// One registry per content kind, owned together by a session.
#[derive(Debug, Default)]
pub struct RegistrySet {
    pub abilities: Registry<FullAbility>,
    pub special_abilities: Registry<FullSpecialTriggeredAbility>,
    pub stat_icons: Registry<FullStatIcon>,
    pub masks: Registry<CustomMask>,
    pub challenges: Registry<FullChallenge>,
    pub totems: Registry<CustomTotemTop>,
    pub regions: Registry<CustomRegion>,
    pub consumables: Registry<ConsumableItem>,
}

impl RegistrySet {
    /// Registries in resolution order; `Language` has no registry.
    pub fn resolution_order(&self) -> [&dyn ResolveBehavior; 8] {
        [
            &self.abilities,
            &self.special_abilities,
            &self.stat_icons,
            &self.masks,
            &self.challenges,
            &self.totems,
            &self.regions,
            &self.consumables,
        ]
    }

    /// Identifiers currently visible in the registry for `tag`.
    pub fn identifiers(&self, tag: TypeTag) -> Vec<i32> {
        self.resolution_order()
            .into_iter()
            .filter(|registry| registry.type_tag() == tag)
            .flat_map(|registry| registry.known_ids())
            .collect()
    }
}

/// Selects the registry of a [`RegistrySet`] that holds `Self`.
pub trait RegistryKind: RegistryRecord + Sized {
    fn select(set: &RegistrySet) -> &Registry<Self>;
    fn select_mut(set: &mut RegistrySet) -> &mut Registry<Self>;
}

macro_rules! registry_kind {
    ($record:ty, $field:ident) => {
        impl RegistryKind for $record {
            fn select(set: &RegistrySet) -> &Registry<Self> {
                &set.$field
            }

            fn select_mut(set: &mut RegistrySet) -> &mut Registry<Self> {
                &mut set.$field
            }
        }
    };
}

registry_kind!(FullAbility, abilities);
registry_kind!(FullSpecialTriggeredAbility, special_abilities);
registry_kind!(FullStatIcon, stat_icons);
registry_kind!(CustomMask, masks);
registry_kind!(FullChallenge, challenges);
registry_kind!(CustomTotemTop, totems);
registry_kind!(CustomRegion, regions);
registry_kind!(ConsumableItem, consumables);
