use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::resolve::DEFAULT_MAX_DEPTH;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read config file {0}: {1}")]
    Io(PathBuf, #[source] io::Error),

    #[error("could not parse config file {0}: {1}")]
    TomlParse(PathBuf, #[source] toml::de::Error),

    #[error("max_depth in {0} must be at least 1")]
    InvalidMaxDepth(PathBuf),
}

/// Settings read from a TOML file.
///
/// ```toml
/// schema = "camel/definitions"
/// max_depth = 16
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Schema file or directory. The packaged camel model is used when unset.
    pub schema: Option<PathBuf>,

    /// Most definitions one inheritance chain may hold, the requested type included.
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            schema: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::TomlParse(path.to_path_buf(), e))?;
        if config.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(path.to_path_buf()));
        }

        // relative schema paths are taken from the config file's directory
        if let Some(dir) = path.parent() {
            config.schema = config.schema.map(|schema| {
                if schema.is_relative() {
                    dir.join(schema)
                } else {
                    schema
                }
            });
        }

        Ok(config)
    }
}
