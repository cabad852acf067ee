//! Declarative filter policy loaded from TOML or JSON.
//!
//! Only the data half of a policy can be written down: operators, lists,
//! `true`/`false` modifiers and the nesting limit. Transforms, interceptors
//! and field renamers are attached afterwards with the [`FilterOptions`]
//! builder methods.
//!
//! ```toml
//! logical_operators = ["$or", "$and"]
//! whitelist = ["first", "last", "age"]
//! max_depth = 16
//!
//! [modifiers]
//! "$gte" = true
//! "$lt" = true
//! "$where" = false
//! ```

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{FilterOptions, ModifierSpec};
use crate::error::{QueryError, QueryResult};

static ENV_VAR: LazyLock<Option<regex_lite::Regex>> =
    LazyLock::new(|| regex_lite::Regex::new(r"\$\{([^}]+)\}").ok());

/// A single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// `whitelist = "first"`
    One(String),
    /// `whitelist = ["first", "last"]`
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flatten into a list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Filter policy as written in a configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    /// Fields whose value is a list of sub-clauses.
    #[serde(default, alias = "logicalOperators", skip_serializing_if = "Option::is_none")]
    pub logical_operators: Option<OneOrMany>,

    /// Permitted fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitelist: Option<OneOrMany>,

    /// Forbidden fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist: Option<OneOrMany>,

    /// Modifier table. `true` allows, `false` forbids; any other entry is
    /// kept and reported as a server error when a filter uses it.
    #[serde(default)]
    pub modifiers: IndexMap<String, serde_json::Value>,

    /// Nesting limit.
    #[serde(default, alias = "maxDepth", skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    /// Everything else in the document.
    #[serde(flatten)]
    pub unknown: IndexMap<String, serde_json::Value>,
}

impl FilterConfig {
    /// Load from a `.toml` or `.json` file, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        crate::filtrate_debug!(path = %path.display(), "loading filter config");
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::internal(format!("failed to read {}", path.display())).with_source(e)
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    /// Parse from TOML, expanding `${VAR}` references first.
    pub fn from_toml_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| QueryError::invalid_options(e.message()))
    }

    /// Parse from JSON.
    pub fn from_json_str(content: &str) -> QueryResult<Self> {
        serde_json::from_str(content).map_err(QueryError::invalid_options)
    }

    /// Convert to builder options. Unknown keys are carried along so that
    /// [`FilterOptions::validate`] rejects them.
    pub fn into_options(self) -> FilterOptions {
        let modifiers = self
            .modifiers
            .into_iter()
            .map(|(name, entry)| {
                let spec = match entry {
                    serde_json::Value::Bool(allowed) => ModifierSpec::from(allowed),
                    other => ModifierSpec::Malformed(other.to_string()),
                };
                (name, spec)
            })
            .collect();

        FilterOptions {
            logical_operators: self.logical_operators.map(OneOrMany::into_vec),
            modifiers,
            whitelist: self.whitelist.map(OneOrMany::into_vec),
            blacklist: self.blacklist.map(OneOrMany::into_vec),
            max_depth: self.max_depth,
            unknown: self.unknown.into_keys().collect(),
            ..FilterOptions::default()
        }
    }
}

/// Expand environment variables in the format `${VAR_NAME}`.
fn expand_env_vars(content: &str) -> String {
    let Some(re) = ENV_VAR.as_ref() else {
        return content.to_string();
    };

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    result
}
