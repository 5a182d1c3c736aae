use std::sync::Arc;

use log::{debug, info};
use tokio::sync::watch;

use super::{display_error, BusyGuard, Generation};
use crate::backend::Backend;
use crate::state::{ConnectionConfig, NamedConfigEntry};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigurationState {
    pub entries: Vec<NamedConfigEntry>,
    pub is_loading: bool,
    pub is_saving: bool,
    pub error: String,
}

impl ConfigurationState {
    pub fn entry(&self, key: &str) -> Option<&NamedConfigEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Value stored under `key`, or an empty string.
    pub fn value_of(&self, key: &str) -> String {
        self.entry(key).map(|e| e.value.clone()).unwrap_or_default()
    }

    pub fn description_of(&self, key: &str) -> String {
        self.entry(key)
            .and_then(|e| e.description.clone())
            .unwrap_or_default()
    }
}

/// Server-side key/value settings, always mirrored from the last fetch.
pub struct ConfigurationCoordinator {
    backend: Arc<dyn Backend>,
    state: watch::Sender<ConfigurationState>,
    load_generation: Generation,
    save_generation: Generation,
}

impl ConfigurationCoordinator {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            state: watch::Sender::new(ConfigurationState::default()),
            load_generation: Generation::default(),
            save_generation: Generation::default(),
        }
    }

    pub fn snapshot(&self) -> ConfigurationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConfigurationState> {
        self.state.subscribe()
    }

    pub fn value_of(&self, key: &str) -> String {
        self.state.borrow().value_of(key)
    }

    pub fn description_of(&self, key: &str) -> String {
        self.state.borrow().description_of(key)
    }

    /// Fetches the full entry list, replacing the current one on success.
    pub async fn load(&self, db_config: &ConnectionConfig) {
        let tag = self.load_generation.begin();
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error.clear();
        });
        let _loading = BusyGuard::new(&self.state, &self.load_generation, tag, |s| {
            std::mem::replace(&mut s.is_loading, false)
        });

        debug!("get_configurations: generation {}", tag);
        let outcome = self.backend.get_configurations(db_config).await;

        if !self.load_generation.is_current(tag) {
            debug!("get_configurations: dropping stale response {}", tag);
            return;
        }

        self.state.send_modify(|s| {
            match outcome {
                Ok(entries) => {
                    debug!("get_configurations: {} entries", entries.len());
                    s.entries = entries;
                }
                Err(e) => s.error = display_error(&e, "failed to load configurations"),
            }
            s.is_loading = false;
        });
    }

    /// Writes one value, then reloads the whole list from the server.
    pub async fn update(&self, db_config: &ConnectionConfig, key: &str, value: &str) {
        let tag = self.save_generation.begin();
        self.state.send_modify(|s| {
            s.is_saving = true;
            s.error.clear();
        });
        let _saving = BusyGuard::new(&self.state, &self.save_generation, tag, |s| {
            std::mem::replace(&mut s.is_saving, false)
        });

        info!("update_configuration: key=\"{}\"", key);
        match self.backend.update_configuration(db_config, key, value).await {
            Ok(()) => self.load(db_config).await,
            Err(e) if self.save_generation.is_current(tag) => {
                let msg = display_error(&e, "failed to update configuration");
                self.state.send_modify(|s| s.error = msg);
            }
            Err(e) => debug!("update_configuration: dropping stale failure {}: {:#}", tag, e),
        }
    }
}
