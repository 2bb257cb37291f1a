use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::registry::{
    ConsumableItem, CustomMask, CustomRegion, CustomTotemTop, FullAbility, FullChallenge,
    FullSpecialTriggeredAbility, FullStatIcon, RegistryRecord,
};
use crate::type_tag::TypeTag;

/// Content a single plugin contributes. Every record is registered under
/// `owner`, whatever owner the record itself carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentManifest {
    pub owner: String,
    pub abilities: Vec<FullAbility>,
    pub special_abilities: Vec<FullSpecialTriggeredAbility>,
    pub stat_icons: Vec<FullStatIcon>,
    pub masks: Vec<CustomMask>,
    pub challenges: Vec<FullChallenge>,
    pub totems: Vec<CustomTotemTop>,
    pub regions: Vec<CustomRegion>,
    pub consumables: Vec<ConsumableItem>,
    /// Extra language identifiers the plugin ships translations for.
    pub languages: Vec<String>,
}

impl ContentManifest {
    pub fn load_from_path(path: &Path) -> Result<Self, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::PersistenceFailure,
                format!("failed to read manifest {}: {e}", path.display()),
            )
        })?;
        Self::from_json_slice(&bytes)
            .map_err(|e| CoreError::new(e.code, format!("{}: {}", path.display(), e.message)))
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let manifest: Self = serde_json::from_slice(bytes).map_err(|e| {
            CoreError::new(CoreErrorCode::Parse, format!("invalid content manifest: {e}"))
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Checks everything registration needs up front so a bad entry cannot
    /// leave the manifest half registered.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.owner.trim().is_empty() {
            return Err(CoreError::invalid_argument(
                "content manifest must name its owner",
            ));
        }
        check_names(&self.abilities)?;
        check_names(&self.special_abilities)?;
        check_names(&self.stat_icons)?;
        check_names(&self.masks)?;
        check_names(&self.challenges)?;
        check_names(&self.totems)?;
        check_names(&self.regions)?;
        check_names(&self.consumables)?;
        if let Some(index) = self.languages.iter().position(|l| l.trim().is_empty()) {
            return Err(CoreError::invalid_argument(format!(
                "language #{index} in manifest for '{}' has an empty name",
                self.owner
            )));
        }
        Ok(())
    }
}

fn check_names<R: RegistryRecord>(records: &[R]) -> Result<(), CoreError> {
    match records
        .iter()
        .position(|r| r.logical_name().trim().is_empty())
    {
        Some(index) => Err(CoreError::invalid_argument(format!(
            "{} #{index} in content manifest has an empty name",
            R::TYPE_TAG
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisteredEntry {
    pub tag: TypeTag,
    pub name: String,
    pub id: i32,
    /// False when the identifier was recovered from an earlier allocation.
    pub newly_allocated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrationReport {
    pub owner: String,
    pub entries: Vec<RegisteredEntry>,
}

impl RegistrationReport {
    pub fn new_allocations(&self) -> usize {
        self.entries.iter().filter(|e| e.newly_allocated).count()
    }
}
