//! Resolves a content reference found in save data (usually a numeric
//! identifier written as a string) to the behaviour type behind it.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::registry::{BehaviorDescriptor, ResolveBehavior};
use crate::reverse_index::ReverseTypeIndex;

#[derive(Debug, Default)]
pub struct TypeResolver {
    cache: Mutex<HashMap<String, Option<BehaviorDescriptor>>>,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `registries` must be given in resolution order. Results, including
    /// misses, are cached under the original reference string until
    /// [`TypeResolver::clear_cache`] is called.
    pub fn resolve(
        &self,
        namespace: &str,
        type_name: &str,
        reverse_index: &ReverseTypeIndex,
        registries: &[&dyn ResolveBehavior],
    ) -> Option<BehaviorDescriptor> {
        let qualified = if namespace.is_empty() {
            type_name.to_string()
        } else {
            format!("{namespace}.{type_name}")
        };
        let cache_key = match type_name.trim().parse::<i32>() {
            Ok(_) => type_name.trim().to_string(),
            Err(_) => qualified.clone(),
        };

        if let Some(cached) = self.cache.lock().get(&cache_key) {
            return cached.clone();
        }

        let resolved = match type_name.trim().parse::<i32>() {
            Ok(id) => resolve_identifier(id, reverse_index, registries),
            Err(_) => registries
                .iter()
                .find_map(|registry| registry.find_behavior(&qualified)),
        };
        debug!(reference = %cache_key, resolved = ?resolved, "resolved custom type");

        self.cache.lock().insert(cache_key, resolved.clone());
        resolved
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }
}

fn resolve_identifier(
    id: i32,
    reverse_index: &ReverseTypeIndex,
    registries: &[&dyn ResolveBehavior],
) -> Option<BehaviorDescriptor> {
    let hinted = reverse_index.lookup(id).and_then(|tag| {
        registries
            .iter()
            .filter(|registry| registry.type_tag() == tag)
            .find_map(|registry| registry.try_resolve(id))
    });
    hinted.or_else(|| {
        registries
            .iter()
            .find_map(|registry| registry.try_resolve(id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::GuidAllocator;
    use crate::config::{CoreConfig, CounterScope};
    use crate::registry::{FullAbility, FullStatIcon, Registry};
    use crate::store::SaveStore;

    #[test]
    fn reverse_index_hint_picks_the_right_registry_on_collision() {
        let alloc = GuidAllocator::new(
            CoreConfig {
                counter_scope: CounterScope::PerType,
                ..CoreConfig::default()
            },
            SaveStore::new(),
        );
        let mut abilities: Registry<FullAbility> = Registry::default();
        let mut icons: Registry<FullStatIcon> = Registry::default();

        icons
            .add(
                FullStatIcon::new("modA", "Bones", "Bones")
                    .with_behavior(BehaviorDescriptor::new("ModA.BonesStat")),
                &alloc,
            )
            .unwrap();
        abilities
            .add(
                FullAbility::new("modA", "Fire", "Fire")
                    .with_behavior(BehaviorDescriptor::new("ModA.Fire")),
                &alloc,
            )
            .unwrap();

        let resolver = TypeResolver::new();
        let resolved = resolver.resolve(
            "",
            "1000",
            alloc.reverse_index(),
            &[&abilities, &icons],
        );
        assert_eq!(resolved, Some(BehaviorDescriptor::new("ModA.BonesStat")));
    }

    #[test]
    fn caches_misses_until_cleared() {
        let alloc = GuidAllocator::new(CoreConfig::default(), SaveStore::new());
        let mut abilities: Registry<FullAbility> = Registry::default();
        let resolver = TypeResolver::new();

        assert_eq!(
            resolver.resolve("ModA", "Fire", alloc.reverse_index(), &[&abilities]),
            None
        );
        assert_eq!(resolver.cached_len(), 1);

        abilities
            .add(
                FullAbility::new("modA", "Fire", "Fire")
                    .with_behavior(BehaviorDescriptor::new("ModA.Fire")),
                &alloc,
            )
            .unwrap();
        assert_eq!(
            resolver.resolve("ModA", "Fire", alloc.reverse_index(), &[&abilities]),
            None
        );

        resolver.clear_cache();
        assert_eq!(
            resolver.resolve("ModA", "Fire", alloc.reverse_index(), &[&abilities]),
            Some(BehaviorDescriptor::new("ModA.Fire"))
        );
    }
}
