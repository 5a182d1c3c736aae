use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use serde_json::Value;

use crate::state::ConnectionConfig;

pub const STORAGE_KEY: &str = "nas_scanner_db_config";

/// Text slot holding the serialized [`ConnectionConfig`].
pub trait ConfigStore: Send + Sync {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, contents: &str) -> Result<()>;
}

/// One JSON file named after [`STORAGE_KEY`].
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{}.json", STORAGE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileStore {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {:?}", self.path)),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
        }
        std::fs::write(&self.path, contents).with_context(|| format!("writing {:?}", self.path))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(contents.into())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self) -> Result<Option<String>> {
        let slot = self.slot.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(slot.clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        *slot = Some(contents.to_string());
        Ok(())
    }
}

/// Headless store: nothing is ever read back, writes are dropped.
pub struct NoopStore;

impl ConfigStore for NoopStore {
    fn read(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn write(&self, _contents: &str) -> Result<()> {
        Ok(())
    }
}

/// Reads the persisted config and merges it over the defaults.
///
/// Absent, unreadable and non-object data yield the default record. Inside
/// an object, each field is taken only if it has the right type.
pub fn load_connection_config(store: &dyn ConfigStore) -> ConnectionConfig {
    let stored = match store.read() {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            debug!("No stored connection config, using defaults");
            return ConnectionConfig::default();
        }
        Err(e) => {
            warn!("Failed to read connection config: {:#}", e);
            return ConnectionConfig::default();
        }
    };
    match merge_over_defaults(&stored) {
        Ok(config) => {
            info!("Connection config loaded ({}:{})", config.host, config.port);
            config
        }
        Err(e) => {
            warn!("Connection config parse failed, using defaults: {:#}", e);
            ConnectionConfig::default()
        }
    }
}

fn merge_over_defaults(stored: &str) -> Result<ConnectionConfig> {
    let value: Value = serde_json::from_str(stored)?;
    let Value::Object(fields) = value else {
        bail!("stored connection config is not an object");
    };

    let mut merged = serde_json::to_value(ConnectionConfig::default())?;
    for (key, value) in fields {
        let Some(slot) = merged.get_mut(key.as_str()) else {
            continue;
        };
        let previous = std::mem::replace(slot, value);
        if serde_json::from_value::<ConnectionConfig>(merged.clone()).is_err() {
            warn!("Ignoring stored connection field {:?}: wrong type", key);
            merged[key.as_str()] = previous;
        }
    }
    Ok(serde_json::from_value(merged)?)
}

pub fn save_connection_config(store: &dyn ConfigStore, config: &ConnectionConfig) -> Result<()> {
    let content = serde_json::to_string(config)?;
    store.write(&content)?;
    info!("Connection config saved");
    Ok(())
}

#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
impl ConfigStore for FailingStore {
    fn read(&self) -> Result<Option<String>> {
        Err(anyhow!("storage unavailable"))
    }

    fn write(&self, _contents: &str) -> Result<()> {
        Err(anyhow!("quota exceeded"))
    }
}
