//! Purpose: JSON snapshots of the loader environment and load outcome for troubleshooting.
//! Exports: `environment_report`, `load_state_json`, `search_path_entries`,
//! `LIBRARY_PATH_VAR`.
//! Role: Logged at debug level before each load; callers may also surface it directly.
//! Invariants: Reports never fail; resolution errors are embedded as strings.
//! Invariants: Key names are stable; fields are additive-only.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use crate::core::loader::{LoadState, LoaderConfig};
use crate::core::platform::{library_file_name, resolve};

/// Environment variable the platform's dynamic loader searches.
#[cfg(target_os = "macos")]
pub const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
#[cfg(windows)]
pub const LIBRARY_PATH_VAR: &str = "PATH";
#[cfg(not(any(target_os = "macos", windows)))]
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

pub fn search_path_entries(value: &OsStr) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|entry| !entry.as_os_str().is_empty())
        .collect()
}

pub fn environment_report(config: &LoaderConfig) -> Value {
    let mut map = Map::new();
    match resolve() {
        Ok(platform) => {
            map.insert("platform".to_string(), json!(platform.to_string()));
            map.insert(
                "file_name".to_string(),
                json!(library_file_name(&config.base_name, platform).as_str()),
            );
        }
        Err(err) => {
            map.insert("platform_error".to_string(), json!(err.to_string()));
        }
    }
    map.insert("base_name".to_string(), json!(config.base_name));
    map.insert("group".to_string(), json!(config.group));
    map.insert("default_dir".to_string(), path_json(&config.default_dir));
    map.insert("temp_dir".to_string(), path_json(&std::env::temp_dir()));

    let entries = std::env::var_os(LIBRARY_PATH_VAR)
        .map(|value| search_path_entries(&value))
        .unwrap_or_default();
    let on_search_path = entries.iter().any(|entry| entry == &config.default_dir);
    map.insert(
        "search_path".to_string(),
        json!({
            "var": LIBRARY_PATH_VAR,
            "entries": entries.iter().map(|entry| path_json(entry)).collect::<Vec<_>>(),
            "contains_default_dir": on_search_path,
        }),
    );
    Value::Object(map)
}

pub fn load_state_json(state: &LoadState) -> Value {
    match state {
        LoadState::NotAttempted => json!({ "state": "not_attempted" }),
        LoadState::Loaded(library) => json!({
            "state": "loaded",
            "path": path_json(library.path()),
            "resource": library.source().path,
            "sha256": library.source().sha256,
        }),
        LoadState::Failed(cause) => json!({
            "state": "failed",
            "kind": format!("{:?}", cause.kind()),
            "error": cause.to_string(),
        }),
    }
}

fn path_json(path: &Path) -> Value {
    json!(path.display().to_string())
}
