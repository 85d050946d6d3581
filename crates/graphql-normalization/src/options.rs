use serde::Deserialize;

use crate::constants::MAX_OR_SCOPES;

/// Settings for the normalization of a single subgraph.
///
/// ```toml
/// subgraph_name = "products"
/// max_or_scopes = 16
/// warnings_are_fatal = false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationOptions {
    pub subgraph_name: Option<String>,
    pub max_or_scopes: usize,
    /// Promote every warning to an error.
    pub warnings_are_fatal: bool,
}

impl Default for NormalizationOptions {
    fn default() -> Self {
        NormalizationOptions {
            subgraph_name: None,
            max_or_scopes: MAX_OR_SCOPES,
            warnings_are_fatal: false,
        }
    }
}

impl NormalizationOptions {
    pub fn from_toml_str(toml: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(toml)?)
    }

    pub fn with_subgraph_name(mut self, subgraph_name: impl Into<String>) -> Self {
        self.subgraph_name = Some(subgraph_name.into());
        self
    }

    pub fn with_max_or_scopes(mut self, max_or_scopes: usize) -> Self {
        self.max_or_scopes = max_or_scopes;
        self
    }
}

/// Settings for [crate::batch_normalize_with_options].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchNormalizationOptions {
    /// Normalize subgraphs on the rayon thread pool before merging them. Only has an effect with the
    /// `parallel` feature.
    pub parallel: bool,
    pub max_or_scopes: usize,
}

impl Default for BatchNormalizationOptions {
    fn default() -> Self {
        BatchNormalizationOptions {
            parallel: cfg!(feature = "parallel"),
            max_or_scopes: MAX_OR_SCOPES,
        }
    }
}

impl BatchNormalizationOptions {
    pub fn from_toml_str(toml: &str) -> Result<Self, OptionsError> {
        Ok(toml::from_str(toml)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("invalid normalization options: {0}")]
    Toml(#[from] toml::de::Error),
}
