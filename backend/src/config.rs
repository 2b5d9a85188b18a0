//! Runtime settings.
//!
//! Read from the environment after loading a `.env` file if one exists:
//!
//! | Variable            | Meaning                                    | Default |
//! |---------------------|--------------------------------------------|---------|
//! | `CONSTMAN_FILE`     | CSV file used when a command names none    | none    |
//! | `CONSTMAN_LOAD_MODE`| `merge` or `replace` for imports           | `merge` |
//! | `CONSTMAN_QUIET`    | `1`/`true` silences the stderr log echo    | off     |

use std::env;
use std::path::PathBuf;

use crate::collection::LoadMode;
use crate::error::{ConfigError, ConfigResult};

pub const ENV_FILE: &str = "CONSTMAN_FILE";
pub const ENV_LOAD_MODE: &str = "CONSTMAN_LOAD_MODE";
pub const ENV_QUIET: &str = "CONSTMAN_QUIET";

/// Settings shared by the CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub default_file: Option<PathBuf>,
    pub load_mode: LoadMode,
    pub quiet: bool,
}

impl Settings {
    /// Load `.env` (if present) and read settings from the environment.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_file = lookup(ENV_FILE)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let load_mode = match lookup(ENV_LOAD_MODE) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LOAD_MODE,
                value,
            })?,
            None => LoadMode::default(),
        };

        let quiet = match lookup(ENV_QUIET) {
            Some(value) => parse_flag(&value).ok_or(ConfigError::InvalidValue {
                key: ENV_QUIET,
                value,
            })?,
            None => false,
        };

        Ok(Self {
            default_file,
            load_mode,
            quiet,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.load_mode, LoadMode::Merge);
    }

    #[test]
    fn test_values_read() {
        let settings = Settings::from_lookup(lookup(&[
            (ENV_FILE, "data/constants.csv"),
            (ENV_LOAD_MODE, "replace"),
            (ENV_QUIET, "true"),
        ]))
        .unwrap();
        assert_eq!(settings.default_file, Some(PathBuf::from("data/constants.csv")));
        assert_eq!(settings.load_mode, LoadMode::Replace);
        assert!(settings.quiet);
    }

    #[test]
    fn test_invalid_values() {
        let err = Settings::from_lookup(lookup(&[(ENV_LOAD_MODE, "append")])).unwrap_err();
        assert!(err.to_string().contains(ENV_LOAD_MODE));

        let err = Settings::from_lookup(lookup(&[(ENV_QUIET, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_blank_file_ignored() {
        let settings = Settings::from_lookup(lookup(&[(ENV_FILE, "  ")])).unwrap();
        assert!(settings.default_file.is_none());
    }
}
