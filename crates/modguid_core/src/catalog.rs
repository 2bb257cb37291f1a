use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::registry::{
    ConsumableItem, CustomMask, CustomRegion, CustomTotemTop, FullAbility, FullChallenge,
    FullSpecialTriggeredAbility, FullStatIcon, RegistryRecord,
};

/// The host's built-in content, used as the base list of every registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostCatalog {
    pub abilities: Vec<FullAbility>,
    pub special_abilities: Vec<FullSpecialTriggeredAbility>,
    pub stat_icons: Vec<FullStatIcon>,
    pub masks: Vec<CustomMask>,
    pub challenges: Vec<FullChallenge>,
    pub totems: Vec<CustomTotemTop>,
    pub regions: Vec<CustomRegion>,
    pub consumables: Vec<ConsumableItem>,
}

impl HostCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load_from_path(path: &Path, base_offset: i32) -> Result<Self, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::PersistenceFailure,
                format!("failed to read host catalog {}: {e}", path.display()),
            )
        })?;
        Self::from_json_slice(&bytes, base_offset)
            .map_err(|e| CoreError::new(e.code, format!("{}: {}", path.display(), e.message)))
    }

    pub fn from_json_slice(bytes: &[u8], base_offset: i32) -> Result<Self, CoreError> {
        let catalog: Self = serde_json::from_slice(bytes).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("invalid host catalog: {e}"),
            )
        })?;
        catalog.validate(base_offset)?;
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
            + self.special_abilities.len()
            + self.stat_icons.len()
            + self.masks.len()
            + self.challenges.len()
            + self.totems.len()
            + self.regions.len()
            + self.consumables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Built-in identifiers must sit below the range the allocator hands out.
    pub fn validate(&self, base_offset: i32) -> Result<(), CoreError> {
        check_native(&self.abilities, base_offset)?;
        check_native(&self.special_abilities, base_offset)?;
        check_native(&self.stat_icons, base_offset)?;
        check_native(&self.masks, base_offset)?;
        check_native(&self.challenges, base_offset)?;
        check_native(&self.totems, base_offset)?;
        check_native(&self.regions, base_offset)?;
        check_native(&self.consumables, base_offset)?;
        Ok(())
    }
}

fn check_native<R: RegistryRecord>(records: &[R], base_offset: i32) -> Result<(), CoreError> {
    match records.iter().find(|r| r.identifier() >= base_offset) {
        Some(record) => Err(CoreError::invalid_argument(format!(
            "built-in {} '{}' uses identifier {} at or above the base offset {base_offset}",
            R::TYPE_TAG,
            record.display_name(),
            record.identifier()
        ))),
        None => Ok(()),
    }
}
