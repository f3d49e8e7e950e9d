//! Program settings, well-known paths and persisted defaults files.
use std::{
    collections::BTreeMap,
    env,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use fs2::FileExt;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    constants::{
        CONFIG_DIR, DEBUG_ENV, DEFAULT_HOST, DEFAULT_PORT, DEFAULTS_FILE_NAME, HOST_ENV,
        NODE_MODULES_DIR, NPMRC_FILE_NAME, PORT_ENV, STRICT_ENV,
    },
    error::ConfigError,
    interpolate::UnresolvedPolicy,
};

/// Everything npkg needs to know about its surroundings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Home directory; install root and config root hang off it.
    pub home: PathBuf,
    /// Supervisor host.
    pub host: String,
    /// Supervisor port.
    pub port: u16,
    /// Print control requests instead of sending them.
    pub dry_run: bool,
    /// How unknown `%{tokens}` are treated during resolution.
    pub policy: UnresolvedPolicy,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = lookup("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingHome)?;

        let host = lookup(HOST_ENV)
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup(PORT_ENV).filter(|port| !port.is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        let dry_run = lookup(DEBUG_ENV).is_some_and(|value| !value.is_empty());
        let policy = match lookup(STRICT_ENV).as_deref().map(str::trim) {
            Some("1") | Some("true") => UnresolvedPolicy::Reject,
            _ => UnresolvedPolicy::Keep,
        };

        Ok(Self {
            home,
            host,
            port,
            dry_run,
            policy,
        })
    }

    /// Base URL of the supervisor.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn paths(&self) -> Paths {
        Paths::new(self.home.clone())
    }
}

/// Well-known locations below the home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    home: PathBuf,
}

impl Paths {
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory holding globally installed packages.
    pub fn node_modules(&self) -> PathBuf {
        self.home.join(NODE_MODULES_DIR)
    }

    /// Install location of a global package.
    pub fn module_dir(&self, name: &str) -> PathBuf {
        self.node_modules().join(name)
    }

    pub fn config_root(&self) -> PathBuf {
        self.home.join(CONFIG_DIR)
    }

    /// Defaults shared by every global package.
    pub fn system_defaults(&self) -> PathBuf {
        self.config_root().join(DEFAULTS_FILE_NAME)
    }

    /// Defaults for one global package.
    pub fn package_defaults(&self, name: &str) -> PathBuf {
        self.config_root().join(name).join(DEFAULTS_FILE_NAME)
    }

    /// Package defaults when `name` is given, system defaults otherwise.
    pub fn defaults_for(&self, name: Option<&str>) -> PathBuf {
        match name {
            Some(name) => self.package_defaults(name),
            None => self.system_defaults(),
        }
    }

    pub fn npmrc(&self) -> PathBuf {
        self.home.join(NPMRC_FILE_NAME)
    }
}

/// A JSON defaults file, kept as raw JSON so `null` placeholders survive edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultsFile {
    path: PathBuf,
    values: Map<String, Value>,
}

impl DefaultsFile {
    /// Loads the file, starting empty when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(values)) => values,
                Ok(_) => {
                    debug!("Ignoring non-object defaults file {:?}", path);
                    Map::new()
                }
                Err(err) => {
                    debug!("Ignoring malformed defaults file {:?}: {err}", path);
                    Map::new()
                }
            },
            Err(err) => {
                debug!("Defaults file {:?} unavailable: {err}", path);
                Map::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    /// Loads, edits and saves the file while holding an exclusive lock.
    pub fn update<F, T>(path: &Path, edit: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut DefaultsFile) -> T,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        FileExt::lock_exclusive(&lock)?;

        let mut file = Self::load(path);
        let result = edit(&mut file);
        let saved = file.save();

        let _ = FileExt::unlock(&lock);
        saved.map(|_| result)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Returns whether the key was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `key` holds something other than `null`, `""` or `false`.
    pub fn is_set(&self, key: &str) -> bool {
        match self.values.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Replaces the file on disk in one rename.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = staging_path(&self.path);
        {
            let mut out = File::create(&staging)?;
            out.write_all(serde_json::to_string(&self.values)?.as_bytes())?;
            out.sync_all()?;
        }
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

/// Renders a stored value the way `config get`/`cat` print it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Parses `key = value` lines from a package manager rc file.
///
/// Blank lines, `#`/`;` comments and lines without `=` are skipped.
pub fn parse_npmrc(content: &str) -> BTreeMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with(';'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Reads and parses a package manager rc file, empty when missing.
pub fn load_npmrc(path: &Path) -> BTreeMap<String, String> {
    match fs::read_to_string(path) {
        Ok(content) => parse_npmrc(&content),
        Err(err) => {
            debug!("No package manager rc at {:?}: {err}", path);
            BTreeMap::new()
        }
    }
}
