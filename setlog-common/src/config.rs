//! Configuration loading and data folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Data folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(folder) = config.get("data_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_data_folder())
}

/// Get configuration file path for the platform
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("setlog").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/setlog/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("setlog"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/setlog"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_wins() {
        let folder = resolve_data_folder(Some("/tmp/setlog-test"), "SETLOG_UNSET_VAR").unwrap();
        assert_eq!(folder, PathBuf::from("/tmp/setlog-test"));
    }

    #[test]
    fn test_env_var_beats_default() {
        std::env::set_var("SETLOG_TEST_DATA_FOLDER", "/tmp/from-env");
        let folder = resolve_data_folder(None, "SETLOG_TEST_DATA_FOLDER").unwrap();
        assert_eq!(folder, PathBuf::from("/tmp/from-env"));
        std::env::remove_var("SETLOG_TEST_DATA_FOLDER");
    }

    #[test]
    fn test_fallback_is_nonempty() {
        let folder = resolve_data_folder(None, "SETLOG_DEFINITELY_UNSET").unwrap();
        assert!(!folder.as_os_str().is_empty());
    }
}
