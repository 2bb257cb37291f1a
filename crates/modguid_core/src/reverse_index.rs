use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::warn;

use crate::type_tag::TypeTag;

/// In-memory map from an issued identifier back to the tag that requested it.
///
/// Rebuilt every process start as content re-registers; never persisted.
#[derive(Debug, Default)]
pub struct ReverseTypeIndex {
    entries: RwLock<HashMap<i32, Vec<TypeTag>>>,
}

impl ReverseTypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: i32, tag: TypeTag) {
        let mut entries = self.entries.write();
        let tags = entries.entry(id).or_default();
        if tags.contains(&tag) {
            return;
        }
        if let Some(first) = tags.first() {
            warn!(id, existing = %first, added = %tag, "identifier issued for more than one type tag");
        }
        tags.push(tag);
    }

    pub fn lookup(&self, id: i32) -> Option<TypeTag> {
        self.entries
            .read()
            .get(&id)
            .and_then(|tags| tags.first().copied())
    }

    pub fn lookup_all(&self, id: i32) -> Vec<TypeTag> {
        self.entries.read().get(&id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
