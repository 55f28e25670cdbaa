use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const DATA_DIR_ENV: &str = "SLEEPTRACKER_DATA_DIR";
const DEBUG_ENV: &str = "SLEEPTRACKER_DEBUG";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// File name of the SQLite database inside the data directory.
    pub database_file: String,
    /// Keep sessions in memory only; nothing survives a restart.
    pub in_memory: bool,
    pub verbose_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_file: "sleeptracker.sqlite3".into(),
            in_memory: false,
            verbose_logs: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub settings: Settings,
    debug_env: bool,
}

impl Config {
    /// Resolves the data directory and reads `settings.json` from it, writing
    /// the defaults on first run.
    pub fn load() -> Result<Self> {
        let data_dir = match env::var_os(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or_else(|| anyhow!("no data directory available; set {DATA_DIR_ENV}"))?
                .join("sleeptracker"),
        };
        let debug_env = env::var(DEBUG_ENV)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self::load_from(data_dir, debug_env)
    }

    pub fn load_from(data_dir: PathBuf, debug_env: bool) -> Result<Self> {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let path = data_dir.join(SETTINGS_FILE);
        let settings = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            let defaults = Settings::default();
            persist(&path, &defaults)?;
            defaults
        };

        Ok(Self {
            data_dir,
            settings,
            debug_env,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.settings.database_file)
    }

    pub fn verbose(&self) -> bool {
        self.debug_env || self.settings.verbose_logs
    }
}

fn persist(path: &Path, settings: &Settings) -> Result<()> {
    let serialized = serde_json::to_string_pretty(settings)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}
