//! Render configuration.
//!
//! ```toml
//! backends = ["rhai", "js"]
//!
//! [aliases]
//! ecma = "js"
//! ```

use crate::error::Result;
use flowtable_engine::engine::Registry;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Settings read from a TOML file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Extra language aliases, merged over the defaults.
    pub aliases: BTreeMap<String, String>,
    /// Backends to keep; `None` keeps every compiled-in backend.
    pub backends: Option<Vec<String>>,
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// A registry with the default backends, filtered and aliased per this config.
    pub fn build_registry(&self) -> Result<Registry> {
        let mut registry = Registry::with_default_backends()?;
        if let Some(keep) = &self.backends {
            registry.retain_backends(keep);
        }
        for (alias, target) in &self.aliases {
            registry.add_alias(alias, target);
        }
        log::debug!("backends: {}", registry.backend_names().join(", "));
        Ok(registry)
    }
}
