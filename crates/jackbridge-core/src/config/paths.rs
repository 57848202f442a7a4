//! Standard configuration paths

use std::path::PathBuf;

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Get the default config directory
///
/// Returns: `$XDG_CONFIG_HOME/jackbridge` (or the platform equivalent),
/// falling back to `./jackbridge`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jackbridge")
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_app_name() {
        assert!(default_config_dir().ends_with("jackbridge"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        assert!(default_config_path().ends_with(CONFIG_FILE_NAME));
    }
}
