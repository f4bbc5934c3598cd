use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::provider::{CONSOLE_FIELD, DEFAULT_NAMESPACES};
use crate::syntax::parser::DEFAULT_MAX_DEPTH;

const SETTINGS_VERSION: u32 = 1;

/// Compiler configuration stored in the app config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerSettings {
    pub version: u32,
    /// Namespaces imported into every compilation.
    #[serde(default = "default_namespaces")]
    pub default_namespaces: Vec<String>,
    /// Name of the output buffer console calls are redirected to.
    #[serde(default = "default_console_field")]
    pub console_field: String,
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Insert missing `;` in user fragments before compiling.
    #[serde(default = "default_true")]
    pub repair_missing_terminators: bool,
}

fn default_namespaces() -> Vec<String> {
    DEFAULT_NAMESPACES.iter().map(ToString::to_string).collect()
}

fn default_console_field() -> String {
    CONSOLE_FIELD.to_string()
}

fn default_max_nesting_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_true() -> bool {
    true
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            default_namespaces: default_namespaces(),
            console_field: default_console_field(),
            max_nesting_depth: default_max_nesting_depth(),
            repair_missing_terminators: true,
        }
    }
}

/// Load settings from the app config directory. Returns None if no settings file exists.
pub fn load_settings(app_config_dir: &Path) -> Option<CompilerSettings> {
    let path = crate::paths::settings_path(app_config_dir);
    if !path.exists() {
        return None;
    }
    match read_json::<CompilerSettings>(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings file");
            None
        }
    }
}

/// Save settings to the app config directory.
pub fn save_settings(app_config_dir: &Path, settings: &CompilerSettings) -> Result<()> {
    fs::create_dir_all(app_config_dir)?;
    write_json(&crate::paths::settings_path(app_config_dir), settings)
}

/// Per-file mutex map to serialize concurrent writes to the same path.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = LazyLock::new(|| Mutex::new(HashMap::new()));

/// Write `data` to a `.tmp` sibling, fsync, then rename over `path`. The
/// previous file, if any, is kept as `.bak`.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let lock = FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let _guard = lock.lock();

    let file_name = path.file_name().unwrap_or_default();

    let mut tmp_name = OsString::from(file_name);
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(&tmp_name);

    let mut bak_name = OsString::from(file_name);
    bak_name.push(".bak");
    let bak_path = path.with_file_name(&bak_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    // Best-effort backup.
    if path.exists() {
        let _ = fs::rename(path, &bak_path);
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("compilify_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn missing_file_is_none() {
        let dir = scratch("missing");
        assert!(load_settings(&dir).is_none());
    }

    #[test]
    fn round_trip() {
        let dir = scratch("round_trip");
        let settings = CompilerSettings {
            console_field: "__Out".into(),
            max_nesting_depth: 64,
            ..CompilerSettings::default()
        };
        save_settings(&dir, &settings).unwrap();
        let loaded = load_settings(&dir).expect("should load");
        assert_eq!(loaded, settings);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = scratch("defaults");
        fs::create_dir_all(&dir).unwrap();
        fs::write(crate::paths::settings_path(&dir), r#"{"version":1}"#).unwrap();
        let loaded = load_settings(&dir).unwrap();
        assert_eq!(loaded, CompilerSettings::default());
        assert_eq!(loaded.console_field, "__Console");
        assert_eq!(loaded.default_namespaces.len(), 7);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn second_save_keeps_backup() {
        let dir = scratch("backup");
        save_settings(&dir, &CompilerSettings::default()).unwrap();
        save_settings(&dir, &CompilerSettings::default()).unwrap();
        assert!(dir.join("compiler.json.bak").exists());
        assert!(!dir.join("compiler.json.tmp").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_none() {
        let dir = scratch("corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(crate::paths::settings_path(&dir), "{ not json").unwrap();
        assert!(load_settings(&dir).is_none());
        let _ = fs::remove_dir_all(&dir);
    }
}
