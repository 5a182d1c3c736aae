use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::{display_error, BusyGuard, Generation};
use crate::backend::Backend;
use crate::state::{ConnectionConfig, ConnectionStatus};
use crate::storage::{self, ConfigStore};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsState {
    pub config: ConnectionConfig,
    pub is_open: bool,
    pub is_saving: bool,
    pub connection_status: ConnectionStatus,
    /// Last persistence failure, empty when the last save/reset succeeded.
    pub error: String,
}

/// Settings panel: the persisted connection config and its health probe.
pub struct SettingsCoordinator {
    backend: Arc<dyn Backend>,
    store: Arc<dyn ConfigStore>,
    save_delay: Duration,
    state: watch::Sender<SettingsState>,
    probe_generation: Generation,
    save_generation: Generation,
}

impl SettingsCoordinator {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<dyn ConfigStore>, save_delay: Duration) -> Self {
        let config = storage::load_connection_config(store.as_ref());
        Self {
            backend,
            store,
            save_delay,
            state: watch::Sender::new(SettingsState {
                config,
                ..SettingsState::default()
            }),
            probe_generation: Generation::default(),
            save_generation: Generation::default(),
        }
    }

    pub fn snapshot(&self) -> SettingsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SettingsState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> ConnectionConfig {
        self.state.borrow().config.clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.state.borrow().connection_status
    }

    /// Replaces the in-memory config. Nothing is persisted until `save`.
    pub fn set_config(&self, config: ConnectionConfig) {
        self.state.send_if_modified(|s| {
            if s.config == config {
                return false;
            }
            s.config = config;
            true
        });
    }

    pub fn edit_config(&self, edit: impl FnOnce(&mut ConnectionConfig)) {
        self.state.send_modify(|s| edit(&mut s.config));
    }

    pub fn open(&self) {
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.is_open, true));
    }

    pub fn close(&self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.is_open, false));
    }

    /// Probes the current config. Transport failures count as disconnected.
    pub async fn test_connection(&self) -> bool {
        let tag = self.probe_generation.begin();
        self.state
            .send_modify(|s| s.connection_status = ConnectionStatus::Testing);
        let config = self.config();
        let _probe = BusyGuard::new(&self.state, &self.probe_generation, tag, |s| {
            if s.connection_status != ConnectionStatus::Testing {
                return false;
            }
            s.connection_status = ConnectionStatus::Disconnected;
            true
        });

        debug!("test_connection: {}:{}/{}", config.host, config.port, config.database);
        let connected = match self.backend.test_connection(&config).await {
            Ok(connected) => connected,
            Err(e) => {
                warn!("Connection test failed: {:#}", e);
                false
            }
        };

        if self.probe_generation.is_current(tag) {
            let status = if connected {
                ConnectionStatus::Connected
            } else {
                ConnectionStatus::Disconnected
            };
            info!("Connection status: {}", status.label());
            self.state.send_modify(|s| s.connection_status = status);
        } else {
            debug!("test_connection: dropping stale probe {}", tag);
        }
        connected
    }

    /// Persists the config, closes the panel, then probes it.
    ///
    /// A persistence failure is reported in `error`; the probe still runs.
    pub async fn save(&self) {
        let tag = self.save_generation.begin();
        self.state.send_modify(|s| {
            s.is_saving = true;
            s.error.clear();
        });

        {
            let _saving = BusyGuard::new(&self.state, &self.save_generation, tag, |s| {
                std::mem::replace(&mut s.is_saving, false)
            });

            if !self.save_delay.is_zero() {
                tokio::time::sleep(self.save_delay).await;
            }
            if !self.save_generation.is_current(tag) {
                debug!("save: superseded during delay {}", tag);
                return;
            }

            let config = self.config();
            if let Err(e) = storage::save_connection_config(self.store.as_ref(), &config) {
                error!("Failed to save config: {:#}", e);
                let msg = display_error(&e, "failed to save settings");
                self.state.send_modify(|s| s.error = msg);
            }
        }

        self.close();
        self.test_connection().await;
    }

    /// Restores and persists the defaults. Does not probe.
    ///
    /// A pending `save` or probe is superseded and will not write.
    pub fn reset(&self) {
        self.probe_generation.invalidate();
        self.save_generation.invalidate();
        let config = ConnectionConfig::default();
        let persisted = storage::save_connection_config(self.store.as_ref(), &config);
        if let Err(e) = &persisted {
            error!("Failed to save config: {:#}", e);
        }
        self.state.send_modify(|s| {
            s.config = config;
            s.connection_status = ConnectionStatus::Unknown;
            s.is_saving = false;
            s.error = match &persisted {
                Ok(()) => String::new(),
                Err(e) => display_error(e, "failed to save settings"),
            };
        });
    }
}
