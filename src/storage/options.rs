use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::hints::FetchHints;
use super::metrics::IteratorMetrics;
use super::qualifier::{IdentityNameSubstitution, MapNameSubstitution, NameSubstitution};
use crate::types::Result;

/// Configuration supplied when constructing an element iterator.
#[derive(Clone)]
pub struct IteratorOptions {
    /// Projection applied when encoding each element.
    pub fetch_hints: FetchHints,
    /// Mapping applied to names stored in qualifiers.
    pub names: Arc<dyn NameSubstitution>,
    /// Optional metrics collection implementation.
    pub metrics: Option<Arc<dyn IteratorMetrics>>,
}

impl Default for IteratorOptions {
    fn default() -> Self {
        Self::new(FetchHints::default())
    }
}

impl IteratorOptions {
    /// Creates options with identity name substitution and no metrics.
    pub fn new(fetch_hints: FetchHints) -> Self {
        Self {
            fetch_hints,
            names: Arc::new(IdentityNameSubstitution),
            metrics: None,
        }
    }

    /// Replaces the fetch hints.
    pub fn fetch_hints(mut self, hints: FetchHints) -> Self {
        self.fetch_hints = hints;
        self
    }

    /// Sets the name substitution.
    pub fn names(mut self, names: Arc<dyn NameSubstitution>) -> Self {
        self.names = names;
        self
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn IteratorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Parses options from a TOML document.
    ///
    /// ```toml
    /// [fetch_hints]
    /// include_all_properties = true
    /// include_out_edge_refs = true
    ///
    /// [name_substitution]
    /// n1 = "firstName"
    /// ```
    ///
    /// Each `name_substitution` entry maps a stored name to its full form.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw: RawOptions = toml::from_str(contents)?;
        let pairs = raw.name_substitution.len();
        let mut options = Self::new(raw.fetch_hints);
        if pairs > 0 {
            options.names = Arc::new(MapNameSubstitution::from_pairs(raw.name_substitution)?);
        }
        debug!(
            name_substitution_pairs = pairs,
            include_hidden = options.fetch_hints.include_hidden,
            "pushdown.options.loaded"
        );
        Ok(options)
    }

    /// Reads and parses a TOML options file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}

impl fmt::Debug for IteratorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IteratorOptions")
            .field("fetch_hints", &self.fetch_hints)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawOptions {
    fetch_hints: FetchHints,
    name_substitution: BTreeMap<String, String>,
}
