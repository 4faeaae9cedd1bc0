use crate::model::Config;
use crate::store::ScheduleStore;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const APP_NAME: &str = "chronoflow";
const TODOS_FILE: &str = "todos.json";
const CONFIG_FILE: &str = "config.json";
const LOG_FILE: &str = "chronoflow.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLocation {
    pub todos: PathBuf,
    pub config: PathBuf,
    pub log: PathBuf,
}

impl DataLocation {
    /// Keeps every file under `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        DataLocation {
            todos: dir.join(TODOS_FILE),
            config: dir.join(CONFIG_FILE),
            log: dir.join(LOG_FILE),
        }
    }
}

pub fn locate(data_dir: Option<&Path>) -> Result<DataLocation> {
    if let Some(dir) = data_dir {
        return Ok(DataLocation::in_dir(dir));
    }
    let dirs = ProjectDirs::from("", "", APP_NAME).context("locating data directory")?;
    Ok(DataLocation {
        todos: dirs.data_dir().join(TODOS_FILE),
        config: dirs.config_dir().join(CONFIG_FILE),
        log: dirs.data_dir().join(LOG_FILE),
    })
}

/// A missing or empty file is an empty store.
pub fn load_store(path: &Path) -> Result<ScheduleStore> {
    match read_json(path).with_context(|| format!("loading tasks from {:?}", path))? {
        Some(store) => Ok(store),
        None => {
            info!(path = %path.display(), "no task file yet, starting empty");
            Ok(ScheduleStore::new())
        }
    }
}

pub fn save_store(path: &Path, store: &ScheduleStore) -> Result<()> {
    write_json(path, store).context("saving tasks")
}

/// A missing file is created with the defaults; an empty one yields the defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    let existed = path.exists();
    let config = read_json::<Config>(path)
        .with_context(|| format!("loading config from {:?}", path))?
        .unwrap_or_default();
    if !existed {
        save_config(path, &config)?;
    }
    if let Err(err) = config.timeline.validate() {
        warn!(path = %path.display(), %err, "timeline config is unusable");
    }
    Ok(config)
}

pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    write_json(path, config).context("saving config")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    if data.trim().is_empty() {
        return Ok(None);
    }
    let value = serde_json::from_str(&data).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(value))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_json::to_string_pretty(value).context("serializing")?;
    fs::write(path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}
