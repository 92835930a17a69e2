use anyhow::anyhow;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::{error::WeatherError, model::Location};

pub const LOCATIONS_FILE: &str = "locations.toml";
pub const SETTINGS_FILE: &str = "settings.toml";
pub const OUTPUT_FILE: &str = "weatherapp.txt";

/// How long a cached page stays valid, in seconds.
pub const CACHE_TTL_SECS: u64 = 300;

/// Header set sent with every page request.
pub const REQUEST_HEADERS: &[(&str, &str)] = &[("User-Agent", "Mozilla/5.0 (X11; Ubuntu; Linux x86_64;)")];

/// Filesystem locations used by the application.
#[derive(Debug, Clone)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Target of `--write-file`.
    pub output_file: PathBuf,
}

impl Paths {
    /// Platform directories for config and cache; output goes to the working directory.
    pub fn discover() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("dev", "weatherapp", "weatherapp")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            cache_dir: dirs.cache_dir().to_path_buf(),
            output_file: PathBuf::from(OUTPUT_FILE),
        })
    }

    /// Everything under one root. Used by tests and portable installs.
    pub fn under(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            cache_dir: root.join("cache"),
            output_file: root.join(OUTPUT_FILE),
        }
    }

    pub fn locations_file(&self) -> PathBuf {
        self.config_dir.join(LOCATIONS_FILE)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }
}

/// Read a TOML file, treating a missing file as `T::default()`.
///
/// A file that fails to parse is deleted and reported as
/// [`WeatherError::ConfigParse`] against `owner`.
fn read_toml<T: DeserializeOwned + Default>(path: &Path, owner: &str) -> Result<T, WeatherError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| WeatherError::io(path, e))?;

    match toml::from_str(&contents) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(path = %path.display(), "removing malformed configuration file");
            fs::remove_file(path).map_err(|e| WeatherError::io(path, e))?;
            Err(WeatherError::ConfigParse {
                provider: owner.to_string(),
                path: path.to_path_buf(),
                reason: e.message().to_string(),
            })
        }
    }
}

/// Write a TOML file, creating parent directories as needed.
fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), WeatherError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| WeatherError::io(parent, e))?;
    }

    let toml = toml::to_string_pretty(value).map_err(|e| {
        WeatherError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;

    fs::write(path, toml).map_err(|e| WeatherError::io(path, e))
}

/// Per-provider chosen locations.
///
/// Example TOML:
/// ```toml
/// [accu]
/// name = "Kyiv"
/// url = "https://www.accuweather.com/uk/ua/kyiv/324505/weather-forecast/324505"
/// ```
#[derive(Debug, Clone)]
pub struct LocationStore {
    path: PathBuf,
}

impl LocationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sections(&self, provider: &str) -> Result<BTreeMap<String, Location>, WeatherError> {
        read_toml(&self.path, provider)
    }

    /// The saved location for `provider`, or `default` when none was saved.
    pub fn load(&self, provider: &str, default: Location) -> Result<Location, WeatherError> {
        let mut sections = self.sections(provider)?;
        match sections.remove(provider) {
            Some(saved) => {
                debug!(provider, name = %saved.name, "using configured location");
                Ok(saved)
            }
            None => Ok(default),
        }
    }

    /// Replace the section for `provider`, keeping every other section.
    pub fn save(&self, provider: &str, location: &Location) -> Result<(), WeatherError> {
        let mut sections = self.sections(provider)?;
        sections.insert(provider.to_string(), location.clone());
        write_toml(&self.path, &sections)?;

        info!(provider, name = %location.name, url = %location.url, "location saved");
        Ok(())
    }

    /// Drop the section for `provider`; the file goes away with its last section.
    pub fn reset(&self, provider: &str) -> Result<(), WeatherError> {
        let mut sections = self.sections(provider)?;
        if sections.remove(provider).is_none() {
            return Ok(());
        }

        if sections.is_empty() {
            self.clear()
        } else {
            write_toml(&self.path, &sections)
        }
    }

    /// Delete the whole store.
    pub fn clear(&self) -> Result<(), WeatherError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WeatherError::io(&self.path, e)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    /// Level implied by the `-v` count.
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => LogLevel::Warning,
            1 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    pub const fn all() -> &'static [LogLevel] {
        &[LogLevel::Warning, LogLevel::Info, LogLevel::Debug]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
}

/// The `[app]` section of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub log_level: LogLevel,
    pub log_output: LogOutput,
    pub log_filename: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warning,
            log_output: LogOutput::Console,
            log_filename: "weatherapp.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: AppSettings,
}

impl Settings {
    /// Load settings from disk, or defaults if the file doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self, WeatherError> {
        read_toml(path, "app")
    }

    pub fn save(&self, path: &Path) -> Result<(), WeatherError> {
        write_toml(path, self)
    }
}
