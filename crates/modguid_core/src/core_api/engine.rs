use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::allocator::{AllocationEntry, GuidAllocator};
use crate::catalog::HostCatalog;
use crate::config::CoreConfig;
use crate::manifest::{ContentManifest, RegisteredEntry, RegistrationReport};
use crate::registry::{
    BehaviorDescriptor, ConsumableItem, CustomMask, CustomRegion, CustomTotemTop, FullAbility,
    FullChallenge, FullSpecialTriggeredAbility, FullStatIcon, Registry, RegistryKind,
    RegistryRecord, RegistrySet,
};
use crate::resolver::TypeResolver;
use crate::save_file;
use crate::store::{SaveStore, StoreScope, StoreValue};
use crate::type_tag::TypeTag;

use super::error::{CoreError, CoreErrorCode};
use super::types::{OwnerSummary, RegistryCounts, SessionSnapshot};

/// Builds sessions from a configuration and the host's built-in content.
#[derive(Debug, Default, Clone)]
pub struct Engine {
    config: CoreConfig,
    catalog: HostCatalog,
}

/// Everything one process needs: store, allocator, reverse index, every
/// registry and the type resolver. Construct one per save file.
#[derive(Debug)]
pub struct Session {
    allocator: GuidAllocator,
    registries: RegistrySet,
    resolver: TypeResolver,
    path: Option<PathBuf>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CoreConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: HostCatalog::empty(),
        })
    }

    pub fn with_catalog(mut self, catalog: HostCatalog) -> Result<Self, CoreError> {
        catalog.validate(self.config.base_offset)?;
        self.catalog = catalog;
        Ok(self)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn catalog(&self) -> &HostCatalog {
        &self.catalog
    }

    /// `dir` joined with the configured save file name.
    pub fn default_save_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.config.save_file_name)
    }

    pub fn new_session(&self) -> Session {
        self.session_from_store(SaveStore::new(), None)
    }

    /// Opens the save file at `path`; a missing file starts empty and will be
    /// created on the first save.
    pub fn open_path(&self, path: &Path) -> Result<Session, CoreError> {
        let store = save_file::load(path)?;
        Ok(self.session_from_store(store, Some(path.to_path_buf())))
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CoreError> {
        let store = save_file::from_bytes(bytes.as_ref())?;
        Ok(self.session_from_store(store, None))
    }

    fn session_from_store(&self, store: SaveStore, path: Option<PathBuf>) -> Session {
        let catalog = self.catalog.clone();
        let registries = RegistrySet {
            abilities: Registry::new(catalog.abilities),
            special_abilities: Registry::new(catalog.special_abilities),
            stat_icons: Registry::new(catalog.stat_icons),
            masks: Registry::new(catalog.masks),
            challenges: Registry::new(catalog.challenges),
            totems: Registry::new(catalog.totems),
            regions: Registry::new(catalog.regions),
            consumables: Registry::new(catalog.consumables),
        };
        Session {
            allocator: GuidAllocator::new(self.config.clone(), store),
            registries,
            resolver: TypeResolver::new(),
            path,
        }
    }
}

impl Session {
    pub fn config(&self) -> &CoreConfig {
        self.allocator.config()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn allocator(&self) -> &GuidAllocator {
        &self.allocator
    }

    pub fn registries(&self) -> &RegistrySet {
        &self.registries
    }

    pub fn allocate(&self, tag: TypeTag, owner: &str, name: &str) -> Result<i32, CoreError> {
        self.allocator.allocate(tag, owner, name)
    }

    pub fn lookup_allocation(&self, tag: TypeTag, owner: &str, name: &str) -> Option<i32> {
        self.allocator.lookup(tag, owner, name)
    }

    pub fn high_water_mark(&self, tag: TypeTag) -> i32 {
        self.allocator.high_water_mark(tag)
    }

    pub fn extra_values(&self, tag: TypeTag) -> Vec<i32> {
        self.allocator.enumerate_extra_values(tag)
    }

    /// Built-in identifiers of `tag`'s registry together with every
    /// identifier ever allocated for it, ascending.
    pub fn all_values(&self, tag: TypeTag) -> Vec<i32> {
        let mut values: BTreeSet<i32> = self
            .registries
            .identifiers(tag)
            .into_iter()
            .filter(|&id| id < self.config().base_offset)
            .collect();
        values.extend(self.extra_values(tag));
        values.into_iter().collect()
    }

    pub fn reverse_lookup(&self, id: i32) -> Option<TypeTag> {
        self.allocator.reverse_index().lookup(id)
    }

    pub fn allocations(&self) -> Vec<AllocationEntry> {
        self.allocator.allocations()
    }

    pub fn get_value(&self, scope: StoreScope, owner: &str, key: &str) -> Option<String> {
        self.allocator
            .with_store(|store| store.scope(scope).get(owner, key).map(str::to_string))
    }

    pub fn get_value_as_int(&self, scope: StoreScope, owner: &str, key: &str) -> i32 {
        self.allocator
            .with_store(|store| store.scope(scope).get_as_int(owner, key))
    }

    pub fn get_value_as_float(&self, scope: StoreScope, owner: &str, key: &str) -> f32 {
        self.allocator
            .with_store(|store| store.scope(scope).get_as_float(owner, key))
    }

    pub fn get_value_as_bool(&self, scope: StoreScope, owner: &str, key: &str) -> bool {
        self.allocator
            .with_store(|store| store.scope(scope).get_as_bool(owner, key))
    }

    pub fn set_value(&self, scope: StoreScope, owner: &str, key: &str, value: impl StoreValue) {
        self.allocator
            .with_store_mut(|store| store.set(scope, owner, key, value));
    }

    pub fn start_new_run(&self) {
        self.allocator.with_store_mut(SaveStore::start_new_run);
        info!("run state cleared for new run");
    }

    pub fn is_dirty(&self) -> bool {
        self.allocator.with_store(SaveStore::is_dirty)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        self.allocator.with_store(save_file::to_bytes)
    }

    /// Writes to the path the session was opened from.
    pub fn save(&self) -> Result<(), CoreError> {
        let path = self.backing_path()?;
        self.allocator
            .with_store_mut(|store| save_file::save(path, store))
    }

    /// Writes to `path` and makes it the session's backing file.
    pub fn save_to(&mut self, path: &Path) -> Result<(), CoreError> {
        self.allocator
            .with_store_mut(|store| save_file::save(path, store))?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Re-reads the backing file. Unsaved changes are flushed first so the
    /// allocator's counter is never rolled back.
    pub fn reload(&self) -> Result<(), CoreError> {
        let path = self.backing_path()?;
        if self.is_dirty() {
            debug!(path = %path.display(), "flushing dirty store before reload");
            self.save()?;
        }
        let store = save_file::load(path)?;
        self.allocator.replace_store(store);
        self.resolver.clear_cache();
        Ok(())
    }

    fn backing_path(&self) -> Result<&Path, CoreError> {
        self.path.as_deref().ok_or_else(|| {
            CoreError::new(
                CoreErrorCode::UnsupportedOperation,
                "session has no backing save file",
            )
        })
    }

    pub fn registry<R: RegistryKind>(&self) -> &Registry<R> {
        R::select(&self.registries)
    }

    /// Mutable access, e.g. to attach change listeners. Use [`Session::register`]
    /// to add records so identifiers are allocated.
    pub fn registry_mut<R: RegistryKind>(&mut self) -> &mut Registry<R> {
        R::select_mut(&mut self.registries)
    }

    pub fn register<R: RegistryKind>(&mut self, record: R) -> Result<R, CoreError> {
        let added = R::select_mut(&mut self.registries).add(record, &self.allocator)?;
        self.resolver.clear_cache();
        Ok(added)
    }

    pub fn unregister<R: RegistryKind>(&mut self, id: i32) -> Option<R> {
        let removed = R::select_mut(&mut self.registries).remove(id);
        if removed.is_some() {
            self.resolver.clear_cache();
        }
        removed
    }

    pub fn abilities(&self) -> &Registry<FullAbility> {
        &self.registries.abilities
    }

    pub fn special_abilities(&self) -> &Registry<FullSpecialTriggeredAbility> {
        &self.registries.special_abilities
    }

    pub fn stat_icons(&self) -> &Registry<FullStatIcon> {
        &self.registries.stat_icons
    }

    pub fn masks(&self) -> &Registry<CustomMask> {
        &self.registries.masks
    }

    pub fn challenges(&self) -> &Registry<FullChallenge> {
        &self.registries.challenges
    }

    pub fn totems(&self) -> &Registry<CustomTotemTop> {
        &self.registries.totems
    }

    pub fn regions(&self) -> &Registry<CustomRegion> {
        &self.registries.regions
    }

    pub fn consumables(&self) -> &Registry<ConsumableItem> {
        &self.registries.consumables
    }

    /// Registers everything `manifest` declares under its owner.
    pub fn register_manifest(
        &mut self,
        manifest: &ContentManifest,
    ) -> Result<RegistrationReport, CoreError> {
        manifest.validate()?;
        let owner = manifest.owner.as_str();
        let mut report = RegistrationReport {
            owner: owner.to_string(),
            entries: Vec::new(),
        };

        self.register_all(owner, &manifest.abilities, &mut report)?;
        self.register_all(owner, &manifest.special_abilities, &mut report)?;
        self.register_all(owner, &manifest.stat_icons, &mut report)?;
        self.register_all(owner, &manifest.masks, &mut report)?;
        self.register_all(owner, &manifest.challenges, &mut report)?;
        self.register_all(owner, &manifest.totems, &mut report)?;
        self.register_all(owner, &manifest.regions, &mut report)?;
        self.register_all(owner, &manifest.consumables, &mut report)?;

        for language in &manifest.languages {
            let newly_allocated = self
                .lookup_allocation(TypeTag::Language, owner, language)
                .is_none();
            let id = self.allocate(TypeTag::Language, owner, language)?;
            report.entries.push(RegisteredEntry {
                tag: TypeTag::Language,
                name: language.clone(),
                id,
                newly_allocated,
            });
        }

        info!(
            owner,
            registered = report.entries.len(),
            new = report.new_allocations(),
            "registered content manifest"
        );
        Ok(report)
    }

    fn register_all<R: RegistryKind + OwnedRecord>(
        &mut self,
        owner: &str,
        records: &[R],
        report: &mut RegistrationReport,
    ) -> Result<(), CoreError> {
        for record in records {
            let mut record = record.clone();
            record.set_owner(owner);
            let newly_allocated = self
                .lookup_allocation(R::TYPE_TAG, owner, record.logical_name())
                .is_none();
            let added = self.register(record)?;
            report.entries.push(RegisteredEntry {
                tag: R::TYPE_TAG,
                name: added.logical_name().to_string(),
                id: added.identifier(),
                newly_allocated,
            });
        }
        Ok(())
    }

    /// Resolves a content reference to the behaviour registered for it.
    /// `type_name` is either an identifier written as a string or a type
    /// name qualified by `namespace`.
    pub fn resolve_type(&self, namespace: &str, type_name: &str) -> Option<BehaviorDescriptor> {
        self.resolver.resolve(
            namespace,
            type_name,
            self.allocator.reverse_index(),
            &self.registries.resolution_order(),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (dirty, system_key_count, run_key_count, owners) = self.allocator.with_store(|store| {
            let owners: BTreeSet<&str> = store
                .system()
                .owners()
                .chain(store.run_state().owners())
                .collect();
            let owners = owners
                .into_iter()
                .map(|owner| OwnerSummary {
                    owner: owner.to_string(),
                    system_keys: store.system().keys(owner).count(),
                    run_keys: store.run_state().keys(owner).count(),
                })
                .collect::<Vec<_>>();
            (
                store.is_dirty(),
                store.system().len(),
                store.run_state().len(),
                owners,
            )
        });

        let registries = vec![
            counts(&self.registries.abilities),
            counts(&self.registries.special_abilities),
            counts(&self.registries.stat_icons),
            counts(&self.registries.masks),
            counts(&self.registries.challenges),
            counts(&self.registries.totems),
            counts(&self.registries.regions),
            counts(&self.registries.consumables),
        ];

        SessionSnapshot {
            base_offset: self.config().base_offset,
            counter_scope: self.config().counter_scope,
            high_water_mark: self.high_water_mark(TypeTag::Ability),
            dirty,
            system_key_count,
            run_key_count,
            owners,
            registries,
            allocations: self.allocations(),
        }
    }
}

fn counts<R: RegistryRecord>(registry: &Registry<R>) -> RegistryCounts {
    RegistryCounts {
        tag: R::TYPE_TAG,
        base: registry.base_items().len(),
        custom: registry.custom_items().len(),
    }
}

/// Records whose owner can be overwritten when a manifest registers them.
trait OwnedRecord {
    fn set_owner(&mut self, owner: &str);
}

macro_rules! owned_record {
    ($($record:ty),* $(,)?) => {
        $(
            impl OwnedRecord for $record {
                fn set_owner(&mut self, owner: &str) {
                    self.owner = owner.to_string();
                }
            }
        )*
    };
}

owned_record!(
    FullAbility,
    FullSpecialTriggeredAbility,
    FullStatIcon,
    CustomMask,
    FullChallenge,
    CustomTotemTop,
    CustomRegion,
    ConsumableItem,
);
