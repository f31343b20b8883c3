//! External configuration loaders.
//!
//! The resolver only depends on the [`ConfigLoader`] trait. Two loaders ship
//! with the crate: [`EmptyConfigLoader`] for hosts without an external document,
//! and [`TomlConfigLoader`] which flattens a TOML file into dotted keys.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::entity::Configuration;
use super::error::ConfigError;

/// Loads the external configuration document.
///
/// `path` is `None` when the container parameters do not name a document; the
/// loader must then return an empty or default configuration.
pub trait ConfigLoader: Send + Sync {
    fn load(&self, path: Option<&str>) -> Result<Configuration, ConfigError>;
}

/// A loader that never reads anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyConfigLoader;

impl ConfigLoader for EmptyConfigLoader {
    fn load(&self, _path: Option<&str>) -> Result<Configuration, ConfigError> {
        Ok(Configuration::empty())
    }
}

/// Reads a TOML document and flattens it into dotted keys.
///
/// Nested tables become `a.b.c` keys, arrays are rendered as comma-separated
/// values so they can be read back with [`Configuration::get_list`].
#[derive(Clone, Debug, Default)]
pub struct TomlConfigLoader {
    base_dir: Option<PathBuf>,
}

impl TomlConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves relative paths against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn locate(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) if Path::new(path).is_relative() => base.join(path),
            _ => PathBuf::from(path),
        }
    }
}

impl ConfigLoader for TomlConfigLoader {
    fn load(&self, path: Option<&str>) -> Result<Configuration, ConfigError> {
        let Some(path) = path else {
            debug!("No external configuration path; using empty configuration");
            return Ok(Configuration::empty());
        };

        let path = self.locate(path);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let table: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        let mut entries = Vec::new();
        for (key, value) in &table {
            flatten(key, value, &mut entries);
        }

        info!(path = %path.display(), keys = entries.len(), "Loaded external configuration");
        Ok(Configuration::from_pairs(entries))
    }
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, nested) in table {
                flatten(&format!("{prefix}.{key}"), nested, out);
            }
        }
        toml::Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render).collect();
            out.push((prefix.to_owned(), rendered.join(",")));
        }
        scalar => out.push((prefix.to_owned(), render(scalar))),
    }
}

fn render(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
