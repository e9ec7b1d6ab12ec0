//! Config path resolution

use std::path::PathBuf;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "RAPIDFLECT_CONFIG_DIR";

pub const ENGINE_CONFIG_FILE: &str = "rapidflect.toml";

/// Returns the config directory.
///
/// `RAPIDFLECT_CONFIG_DIR` when set and non-empty, otherwise the current
/// working directory (or `.` if that cannot be determined).
pub fn config_dir() -> PathBuf {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Returns the engine config path.
///
/// Path: `{config_dir}/rapidflect.toml`
pub fn engine_config_path() -> PathBuf {
    config_dir().join(ENGINE_CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_path_format() {
        assert!(engine_config_path().ends_with(ENGINE_CONFIG_FILE));
        assert_eq!(engine_config_path().parent(), Some(config_dir().as_path()));
    }
}
