//! Configuration Vault – reads/writes `~/.keepsake/config.toml`.

use keepsake_store::storage::DEFAULT_SLOT;
use keepsake_types::Category;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.keepsake/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file holding the journal slot.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    /// Name of the key-value slot the journal lives in.
    #[serde(default = "default_storage_slot")]
    pub storage_slot: String,

    /// Category pre-selected when adding a memory.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Directory export bundles are written to.
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

fn default_storage_path() -> String {
    home_dir().join(".keepsake").join("journal.db").display().to_string()
}
fn default_storage_slot() -> String {
    DEFAULT_SLOT.to_string()
}
fn default_category() -> String {
    Category::General.to_string()
}
fn default_export_dir() -> String {
    ".".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            storage_slot: default_storage_slot(),
            default_category: default_category(),
            export_dir: default_export_dir(),
        }
    }
}

impl Config {
    pub fn category(&self) -> Category {
        Category::from(self.default_category.as_str())
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Return the path to `~/.keepsake/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(&home_dir())
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &Path) -> PathBuf {
    home.join(".keepsake").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Load the config, falling back to defaults (with env overrides) when the
/// file is absent or broken.
pub fn load_or_default() -> Config {
    match load() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            tracing::warn!(error = %e, "config unreadable; using defaults");
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

/// Apply `KEEPSAKE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `KEEPSAKE_STORAGE_PATH` | `storage_path` |
/// | `KEEPSAKE_STORAGE_SLOT` | `storage_slot` |
/// | `KEEPSAKE_DEFAULT_CATEGORY` | `default_category` |
/// | `KEEPSAKE_EXPORT_DIR` | `export_dir` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("KEEPSAKE_STORAGE_PATH") {
        cfg.storage_path = v;
    }
    if let Ok(v) = std::env::var("KEEPSAKE_STORAGE_SLOT")
        && !v.trim().is_empty()
    {
        cfg.storage_slot = v;
    }
    if let Ok(v) = std::env::var("KEEPSAKE_DEFAULT_CATEGORY") {
        cfg.default_category = v;
    }
    if let Ok(v) = std::env::var("KEEPSAKE_EXPORT_DIR") {
        cfg.export_dir = v;
    }
}

/// Save the config to disk, creating `~/.keepsake/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // The journal may hold private photos: owner-only directory.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
