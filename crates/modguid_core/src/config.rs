use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};

pub const DEFAULT_BASE_OFFSET: i32 = 1000;
pub const DEFAULT_API_OWNER: &str = "cyantist.inscryption.api";
pub const DEFAULT_HIGH_WATER_KEY: &str = "maximumStoredValueForEnum";
pub const DEFAULT_SAVE_FILE_NAME: &str = "ModdedSaveFile.gwsave";

/// How the high-water mark is shared between type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterScope {
    /// One counter for every tag. Matches the numbering existing saves use.
    #[default]
    Shared,
    /// One counter per tag, stored under `{high_water_key}_{tag}`.
    PerType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub base_offset: i32,
    pub counter_scope: CounterScope,
    /// Owner namespace the allocator writes its bookkeeping under.
    pub api_owner: String,
    pub high_water_key: String,
    pub save_file_name: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_offset: DEFAULT_BASE_OFFSET,
            counter_scope: CounterScope::Shared,
            api_owner: DEFAULT_API_OWNER.to_string(),
            high_water_key: DEFAULT_HIGH_WATER_KEY.to_string(),
            save_file_name: DEFAULT_SAVE_FILE_NAME.to_string(),
        }
    }
}

impl CoreConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::PersistenceFailure,
                format!("failed to read config {}: {e}", path.display()),
            )
        })?;
        Self::from_json_str(&text).map_err(|e| {
            CoreError::new(e.code, format!("{}: {}", path.display(), e.message))
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            CoreError::new(CoreErrorCode::Parse, format!("invalid config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.base_offset <= 0 {
            return Err(CoreError::invalid_argument(format!(
                "base_offset must be positive, got {}",
                self.base_offset
            )));
        }
        for (field, value) in [
            ("api_owner", &self.api_owner),
            ("high_water_key", &self.high_water_key),
            ("save_file_name", &self.save_file_name),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::invalid_argument(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}
