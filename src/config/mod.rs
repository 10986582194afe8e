//! Configuration loading and management
//!
//! Resources and their dependents are declared statically:
//!
//! ```yaml
//! resources:
//!   - name: organizations
//!     dependents: [memberships]
//!   - name: memberships
//!     path: /organization-memberships
//! query:
//!   zero_bounds: keep
//!   max_per_page: 100
//! cache:
//!   stale_time_secs: 300
//! ```

use crate::core::error::ConfigError;
use crate::core::predicate::ZeroBoundPolicy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use validator::Validate;

static RESOURCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("resource name pattern"));

static RESOURCE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/[A-Za-z0-9_-]+)+$").expect("resource path pattern"));

/// A named, independently cacheable collection of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ResourceDefinition {
    /// Resource name (e.g., "organizations")
    #[validate(regex(path = *RESOURCE_NAME, message = "must be lowercase kebab or snake case"))]
    pub name: String,

    /// API path, defaults to `/{name}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(regex(path = *RESOURCE_PATH, message = "must be an absolute path"))]
    pub path: Option<String>,

    /// Resources whose cached reads go stale when this one is written
    #[serde(default)]
    pub dependents: Vec<String>,
}

impl ResourceDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            dependents: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_dependents<I, S>(mut self, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependents = dependents.into_iter().map(Into::into).collect();
        self
    }

    /// The API path of this resource
    pub fn api_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!("/{}", self.name))
    }
}

/// List query settings shared by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuerySettings {
    /// How `0` numeric bounds are treated
    #[serde(default)]
    pub zero_bounds: ZeroBoundPolicy,

    /// Upper bound for `perPage`
    #[serde(default = "default_max_per_page")]
    #[validate(range(min = 1, max = 1000))]
    pub max_per_page: usize,
}

fn default_max_per_page() -> usize {
    100
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            zero_bounds: ZeroBoundPolicy::default(),
            max_per_page: default_max_per_page(),
        }
    }
}

/// Client cache settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Age after which a cached read is refetched
    ///
    /// Without it entries stay fresh until invalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_time_secs: Option<u64>,
}

impl CacheSettings {
    pub fn stale_time(&self) -> Option<Duration> {
        self.stale_time_secs.map(Duration::from_secs)
    }
}

/// Complete configuration of the API surface
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct ApiConfig {
    /// Declared resources
    #[validate(nested)]
    pub resources: Vec<ResourceDefinition>,

    #[serde(default)]
    #[validate(nested)]
    pub query: QuerySettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl ApiConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("{}: {}", path, e),
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Validate field formats and the dependency declarations
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            message: e.to_string(),
        })?;

        let mut names = HashSet::new();
        let mut paths = HashSet::new();
        for resource in &self.resources {
            if !names.insert(resource.name.as_str()) {
                return Err(ConfigError::DuplicateResource {
                    name: resource.name.clone(),
                });
            }
            let path = resource.api_path();
            if !paths.insert(path.clone()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("resources.{}.path", resource.name),
                    message: format!("path '{}' is already used", path),
                });
            }
        }

        for resource in &self.resources {
            for dependent in &resource.dependents {
                if dependent == &resource.name {
                    return Err(ConfigError::SelfDependency {
                        resource: resource.name.clone(),
                    });
                }
                if !names.contains(dependent.as_str()) {
                    return Err(ConfigError::UnknownDependent {
                        resource: resource.name.clone(),
                        dependent: dependent.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Find a resource definition by name
    pub fn find_resource(&self, name: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Merge multiple configurations
    ///
    /// Resources with the same name are combined: the later path wins and
    /// dependents are unioned in declaration order. Query and cache
    /// settings come from the last configuration.
    pub fn merge(configs: Vec<ApiConfig>) -> Self {
        let mut merged = ApiConfig::default();

        for config in configs {
            for resource in config.resources {
                match merged
                    .resources
                    .iter_mut()
                    .find(|r| r.name == resource.name)
                {
                    Some(existing) => {
                        if resource.path.is_some() {
                            existing.path = resource.path;
                        }
                        for dependent in resource.dependents {
                            if !existing.dependents.contains(&dependent) {
                                existing.dependents.push(dependent);
                            }
                        }
                    }
                    None => merged.resources.push(resource),
                }
            }
            merged.query = config.query;
            merged.cache = config.cache;
        }

        merged
    }

    /// Create a default configuration for testing
    pub fn default_config() -> Self {
        Self {
            resources: vec![
                ResourceDefinition::new("organizations").with_dependents(["memberships"]),
                ResourceDefinition::new("memberships"),
                ResourceDefinition::new("packages").with_dependents(["licenses"]),
                ResourceDefinition::new("licenses"),
            ],
            query: QuerySettings::default(),
            cache: CacheSettings::default(),
        }
    }
}
