// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persisted receiver configuration.
//!
//! Configured receivers are stored as JSON in `devices.json` inside a
//! configuration directory:
//!
//! ```json
//! {
//!   "devices": [
//!     {
//!       "device_id": "nad_192_168_1_10",
//!       "name": "Living Room",
//!       "address": "192.168.1.10",
//!       "port": 23,
//!       "enabled": true
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event::DeviceId;
use crate::types::Endpoint;

/// Environment variable naming the configuration directory.
pub const CONFIG_HOME_ENV: &str = "UC_CONFIG_HOME";

/// File name of the device list.
pub const DEVICES_FILE: &str = "devices.json";

fn default_port() -> u16 {
    Endpoint::DEFAULT_PORT
}

fn default_enabled() -> bool {
    true
}

/// One configured receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Stable identifier, derived from the address.
    pub device_id: DeviceId,
    /// Display name.
    pub name: String,
    /// Host name or IP address.
    pub address: String,
    /// Telnet port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Disabled receivers are kept but not connected.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl DeviceConfig {
    /// Creates an enabled configuration for the receiver at `endpoint`.
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: &Endpoint) -> Self {
        Self {
            device_id: DeviceId::for_endpoint(endpoint),
            name: name.into(),
            address: endpoint.host().to_string(),
            port: endpoint.port(),
            enabled: true,
        }
    }

    /// Sets whether the receiver is enabled.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the validated endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEndpoint` if the stored address or port
    /// is invalid.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        Endpoint::new(self.address.clone(), self.port)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DevicesFile {
    #[serde(default)]
    devices: Vec<DeviceConfig>,
}

/// The receiver list backed by `devices.json`.
///
/// Every mutation is written through to disk.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    devices: Vec<DeviceConfig>,
}

impl ConfigStore {
    /// Opens the store in `dir`, loading `devices.json` if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file exists but cannot be read, or
    /// `ConfigError::Json` if it is not a valid device list.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(DEVICES_FILE);

        if !path.exists() {
            tracing::info!(path = %path.display(), "No configuration file, starting empty");
            return Ok(Self {
                path,
                devices: Vec::new(),
            });
        }

        let contents = fs::read_to_string(&path)?;
        let file: DevicesFile = serde_json::from_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            devices = file.devices.len(),
            "Loaded configuration"
        );

        Ok(Self {
            path,
            devices: file.devices,
        })
    }

    /// Opens the store in the directory named by `UC_CONFIG_HOME`, or the
    /// current directory if it is unset.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::open`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let dir = std::env::var_os(CONFIG_HOME_ENV).map_or_else(|| PathBuf::from("."), PathBuf::from);
        Self::open(dir)
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the device list to disk, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` or `ConfigError::Json` if writing fails.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = DevicesFile {
            devices: self.devices.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, contents)?;

        tracing::info!(
            path = %self.path.display(),
            devices = self.devices.len(),
            "Saved configuration"
        );
        Ok(())
    }

    /// Adds a receiver or replaces the one with the same ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be saved. The list is left as it
    /// was in that case.
    pub fn add(&mut self, device: DeviceConfig) -> Result<(), ConfigError> {
        tracing::info!(device_id = %device.device_id, name = %device.name, "Storing device");
        let previous = self.devices.clone();
        match self
            .devices
            .iter_mut()
            .find(|existing| existing.device_id == device.device_id)
        {
            Some(existing) => *existing = device,
            None => self.devices.push(device),
        }
        self.commit(previous)
    }

    /// Removes a receiver. Returns `false` if it was not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be saved. The receiver stays in
    /// the list in that case.
    pub fn remove(&mut self, device_id: &DeviceId) -> Result<bool, ConfigError> {
        let previous = self.devices.clone();
        self.devices.retain(|device| &device.device_id != device_id);
        if self.devices.len() == previous.len() {
            return Ok(false);
        }
        tracing::info!(device_id = %device_id, "Removed device");
        self.commit(previous)?;
        Ok(true)
    }

    /// Saves the list, restoring `previous` if that fails.
    fn commit(&mut self, previous: Vec<DeviceConfig>) -> Result<(), ConfigError> {
        if let Err(e) = self.save() {
            tracing::warn!(path = %self.path.display(), error = %e, "Saving configuration failed");
            self.devices = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Returns the configuration of one receiver.
    #[must_use]
    pub fn get(&self, device_id: &DeviceId) -> Option<&DeviceConfig> {
        self.devices
            .iter()
            .find(|device| &device.device_id == device_id)
    }

    /// Returns all configured receivers.
    #[must_use]
    pub fn all(&self) -> &[DeviceConfig] {
        &self.devices
    }

    /// Returns the enabled receivers.
    pub fn enabled(&self) -> impl Iterator<Item = &DeviceConfig> {
        self.devices.iter().filter(|device| device.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn living_room() -> DeviceConfig {
        DeviceConfig::new("Living Room", &Endpoint::new("192.168.1.10", 23).unwrap())
    }

    #[test]
    fn device_config_from_endpoint() {
        let config = living_room();
        assert_eq!(config.device_id.as_str(), "nad_192_168_1_10");
        assert_eq!(config.address, "192.168.1.10");
        assert_eq!(config.port, 23);
        assert!(config.enabled);
        assert_eq!(config.endpoint().unwrap().to_string(), "192.168.1.10:23");
    }

    #[test]
    fn device_config_defaults_when_fields_missing() {
        let json = r#"{"device_id":"nad_x","name":"X","address":"10.0.0.9"}"#;
        let config: DeviceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.port, 23);
        assert!(config.enabled);
    }

    #[test]
    fn open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path()).unwrap();
        assert!(store.all().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn add_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path()).unwrap();
        store.add(living_room()).unwrap();

        let reloaded = ConfigStore::open(dir.path()).unwrap();
        assert_eq!(reloaded.all(), [living_room()]);
    }

    #[test]
    fn add_replaces_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path()).unwrap();
        store.add(living_room()).unwrap();

        let mut renamed = living_room();
        renamed.name = "Den".to_string();
        store.add(renamed).unwrap();

        assert_eq!(store.all().len(), 1);
        assert_eq!(store.get(&living_room().device_id).unwrap().name, "Den");
    }

    #[test]
    fn remove_and_enabled_filter() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConfigStore::open(dir.path().join("nested")).unwrap();
        store.add(living_room()).unwrap();
        let kitchen =
            DeviceConfig::new("Kitchen", &Endpoint::new("192.168.1.11", 23).unwrap()).with_enabled(false);
        store.add(kitchen.clone()).unwrap();

        let enabled: Vec<_> = store.enabled().map(|d| d.name.as_str()).collect();
        assert_eq!(enabled, ["Living Room"]);

        assert!(store.remove(&kitchen.device_id).unwrap());
        assert!(!store.remove(&kitchen.device_id).unwrap());
        assert_eq!(ConfigStore::open(dir.path().join("nested")).unwrap().all().len(), 1);
    }

    #[test]
    fn failed_save_keeps_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join("config");
        let mut store = ConfigStore::open(&config_dir).unwrap();
        store.add(living_room()).unwrap();

        // a plain file where the directory should be makes every save fail
        fs::remove_dir_all(&config_dir).unwrap();
        fs::write(&config_dir, "").unwrap();

        let kitchen = DeviceConfig::new("Kitchen", &Endpoint::new("192.168.1.11", 23).unwrap());
        assert!(matches!(store.add(kitchen), Err(ConfigError::Io(_))));
        assert_eq!(store.all(), [living_room()]);

        assert!(matches!(
            store.remove(&living_room().device_id),
            Err(ConfigError::Io(_))
        ));
        assert_eq!(store.all(), [living_room()]);
    }

    #[test]
    fn open_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEVICES_FILE), "{not json").unwrap();
        assert!(matches!(
            ConfigStore::open(dir.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
