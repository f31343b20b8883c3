//! Resolution of the effective configuration from container parameters.
//!
//! Container parameters under [`PARAMETER_PREFIX`] form the primary layer. If
//! that layer names an external document under [`CONFIG_PATH_KEY`], the loader
//! reads it and the result becomes the fallback layer.

use std::collections::HashSet;

use tracing::debug;

use super::entity::Configuration;
use super::error::ConfigError;
use super::loader::ConfigLoader;

/// Only container parameters starting with this prefix are recognized.
pub const PARAMETER_PREFIX: &str = "io.engine.";

/// Path of the external configuration document.
pub const CONFIG_PATH_KEY: &str = "engine.config";

/// Display name of the application.
pub const APPLICATION_ID_KEY: &str = "engine.application.id";

/// Comma-separated application modules installed at startup.
pub const APPLICATION_MODULES_KEY: &str = "engine.application.modules";

pub const DEFAULT_APPLICATION_ID: &str = "Application";

/// A read-only scope of named string parameters exposed by the container.
pub trait ParameterScope: Send + Sync {
    fn parameter(&self, name: &str) -> Option<String>;
    fn parameter_names(&self) -> Vec<String>;
}

/// An ordered in-memory [`ParameterScope`].
#[derive(Clone, Debug, Default)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing any previous value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut parameters = Parameters::new();
        for (k, v) in iter {
            parameters.insert(k, v);
        }
        parameters
    }
}

impl ParameterScope for Parameters {
    fn parameter(&self, name: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    fn parameter_names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }
}

/// The effective configuration plus the values extracted from it.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub configuration: Configuration,
    pub application_id: String,
}

/// Merges container parameters with the external configuration document.
///
/// Names are collected from the context scope, then the instance scope, and
/// deduplicated keeping the first occurrence. Values are read from the
/// instance scope first.
pub fn resolve(
    context: &dyn ParameterScope,
    instance: &dyn ParameterScope,
    loader: &dyn ConfigLoader,
) -> Result<ResolvedConfig, ConfigError> {
    let mut seen = HashSet::new();
    let names: Vec<String> = context
        .parameter_names()
        .into_iter()
        .chain(instance.parameter_names())
        .filter(|name| name.starts_with(PARAMETER_PREFIX))
        .filter(|name| seen.insert(name.clone()))
        .collect();

    let pairs = names.into_iter().filter_map(|name| {
        let value = instance
            .parameter(&name)
            .or_else(|| context.parameter(&name))?;
        Some((name[PARAMETER_PREFIX.len()..].to_owned(), value))
    });
    let primary = Configuration::from_pairs(pairs);
    debug!(parameters = primary.len(), "Collected container parameters");

    let external = loader.load(primary.get(CONFIG_PATH_KEY))?;
    let configuration = primary.with_fallback(external);
    let application_id = configuration
        .get_or(APPLICATION_ID_KEY, DEFAULT_APPLICATION_ID)
        .to_owned();

    Ok(ResolvedConfig {
        configuration,
        application_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the path it was asked for and returns a fixed document.
    struct RecordingLoader {
        document: Configuration,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl RecordingLoader {
        fn new(document: Configuration) -> Self {
            Self {
                document,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    impl ConfigLoader for RecordingLoader {
        fn load(&self, path: Option<&str>) -> Result<Configuration, ConfigError> {
            self.requested.lock().unwrap().push(path.map(str::to_owned));
            Ok(self.document.clone())
        }
    }

    struct FailingLoader;

    impl ConfigLoader for FailingLoader {
        fn load(&self, _path: Option<&str>) -> Result<Configuration, ConfigError> {
            Err(ConfigError::Loader("disk on fire".into()))
        }
    }

    #[test]
    fn test_container_parameter_shadows_external_document() {
        let context: Parameters = [("io.engine.foo", "A")].into_iter().collect();
        let loader = RecordingLoader::new(Configuration::from_pairs([("foo", "B"), ("bar", "C")]));

        let resolved = resolve(&context, &Parameters::new(), &loader).unwrap();

        assert_eq!(resolved.configuration.get("foo"), Some("A"));
        assert_eq!(resolved.configuration.get("bar"), Some("C"));
    }

    #[test]
    fn test_default_application_id() {
        let loader = RecordingLoader::new(Configuration::empty());
        let resolved = resolve(&Parameters::new(), &Parameters::new(), &loader).unwrap();
        assert_eq!(resolved.application_id, DEFAULT_APPLICATION_ID);
    }

    #[test]
    fn test_application_id_from_external_document() {
        let loader = RecordingLoader::new(Configuration::from_pairs([(APPLICATION_ID_KEY, "shop")]));
        let resolved = resolve(&Parameters::new(), &Parameters::new(), &loader).unwrap();
        assert_eq!(resolved.application_id, "shop");
    }

    #[test]
    fn test_filters_prefix_and_prefers_instance_scope() {
        let context: Parameters = [
            ("io.engine.engine.config", "app.toml"),
            ("io.engine.shared", "from-context"),
            ("unrelated.param", "ignored"),
        ]
        .into_iter()
        .collect();
        let instance: Parameters = [("io.engine.shared", "from-instance")].into_iter().collect();
        let loader = RecordingLoader::new(Configuration::empty());

        let resolved = resolve(&context, &instance, &loader).unwrap();
        let config = &resolved.configuration;

        assert_eq!(config.get("shared"), Some("from-instance"));
        assert_eq!(config.get("unrelated.param"), None);
        assert_eq!(config.keys(), vec![CONFIG_PATH_KEY, "shared"]);
        assert_eq!(
            *loader.requested.lock().unwrap(),
            vec![Some("app.toml".to_owned())]
        );
    }

    #[test]
    fn test_loader_called_without_path_when_absent() {
        let loader = RecordingLoader::new(Configuration::empty());
        resolve(&Parameters::new(), &Parameters::new(), &loader).unwrap();
        assert_eq!(*loader.requested.lock().unwrap(), vec![None]);
    }

    #[test]
    fn test_loader_failure_is_fatal() {
        let result = resolve(&Parameters::new(), &Parameters::new(), &FailingLoader);
        assert!(matches!(result, Err(ConfigError::Loader(_))));
    }
}
