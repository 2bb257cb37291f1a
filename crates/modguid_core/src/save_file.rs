//! On-disk form of the modded save: one JSON document holding the system map
//! and the run-state map as a serialized pair (`Item1`, `Item2`).

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::store::{ModdedSaveData, SaveStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SaveFileDocument {
    #[serde(rename = "Item1", alias = "SaveData", default)]
    system: ModdedSaveData,
    #[serde(rename = "Item2", alias = "RunState", default)]
    run_state: ModdedSaveData,
}

pub fn from_bytes(bytes: &[u8]) -> Result<SaveStore, CoreError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(SaveStore::new());
    }
    let document: SaveFileDocument = serde_json::from_slice(bytes).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Parse,
            format!("failed to parse modded save data: {e}"),
        )
    })?;
    Ok(SaveStore::from_parts(document.system, document.run_state))
}

pub fn to_bytes(store: &SaveStore) -> Result<Vec<u8>, CoreError> {
    let document = SaveFileDocument {
        system: store.system().clone(),
        run_state: store.run_state().clone(),
    };
    serde_json::to_vec_pretty(&document).map_err(|e| {
        CoreError::new(
            CoreErrorCode::PersistenceFailure,
            format!("failed to serialize modded save data: {e}"),
        )
    })
}

/// Reads `path`; a missing file yields two empty stores.
pub fn load(path: &Path) -> Result<SaveStore, CoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no modded save file yet; starting empty");
            return Ok(SaveStore::new());
        }
        Err(e) => {
            return Err(CoreError::persistence(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };
    let store = from_bytes(&bytes)
        .map_err(|e| CoreError::new(e.code, format!("{}: {}", path.display(), e.message)))?;
    info!(
        path = %path.display(),
        system_keys = store.system().len(),
        run_keys = store.run_state().len(),
        "loaded modded save file"
    );
    Ok(store)
}

/// Writes the whole store to `path` and marks it clean.
pub fn save(path: &Path, store: &mut SaveStore) -> Result<(), CoreError> {
    let bytes = to_bytes(store)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| {
            CoreError::persistence(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    fs::write(path, bytes).map_err(|e| {
        CoreError::persistence(format!("failed to write {}: {e}", path.display()))
    })?;
    store.mark_clean();
    info!(path = %path.display(), "saved modded save file");
    Ok(())
}
