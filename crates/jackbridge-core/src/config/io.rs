//! YAML configuration loading

use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;

/// Read a YAML config, falling back to `T::default()`
///
/// A missing file is normal (first run) and only logged at info level. An
/// unreadable or malformed file is logged as a warning naming the file and,
/// when known, the line and column of the offending key; startup continues
/// with defaults either way.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("No config at {}, using defaults", path.display());
            return T::default();
        }
        Err(e) => {
            log::warn!("Cannot read config {}: {}; using defaults", path.display(), e);
            return T::default();
        }
    };

    match serde_yaml::from_str::<T>(&contents) {
        Ok(config) => {
            log::info!("Config loaded from {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("{}; using defaults", describe_parse_error(path, &e));
            T::default()
        }
    }
}

/// `file:line:column: message`, or `file: message` without a location
fn describe_parse_error(path: &Path, error: &serde_yaml::Error) -> String {
    match error.location() {
        Some(at) => format!(
            "Invalid config {}:{}:{}: {}",
            path.display(),
            at.line(),
            at.column(),
            error
        ),
        None => format!("Invalid config {}: {}", path.display(), error),
    }
}
