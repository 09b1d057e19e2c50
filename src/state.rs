use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, WatchError};
use crate::watch::WatchList;

/// Last status seen per location-key, persisted as a JSON object between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObservedState(BTreeMap<String, Option<String>>);

impl ObservedState {
    /// Load the state file. A missing, unreadable or corrupt file counts as no
    /// state at all; the run starts from all-null.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(state)) => {
                debug!("Loaded {} entries from {:?}", state.len(), path);
                state
            }
            Ok(None) => {
                info!("No state file at {:?}, starting fresh", path);
                Self::default()
            }
            Err(e) => {
                warn!("Ignoring unusable state file: {}", e);
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(WatchError::State {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let state = serde_json::from_str(&raw).map_err(|e| WatchError::State {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        Ok(Some(state))
    }

    /// Write to a sibling temp file, then rename over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| WatchError::State {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| io_err(e.into()))?;
        let tmp = tmp_path(path);
        fs::write(&tmp, json + "\n").map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }

    /// Add a null entry for every watched key that has none.
    pub fn ensure_keys(&mut self, watch: &WatchList) {
        for key in watch.keys() {
            self.0.entry(key.to_string()).or_insert(None);
        }
    }

    /// Status for `key`; absent and null are both `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: &str, status: Option<String>) {
        self.0.insert(key.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

impl FromIterator<(String, Option<String>)> for ObservedState {
    fn from_iter<I: IntoIterator<Item = (String, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "status.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
