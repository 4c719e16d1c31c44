//! Optional TOML configuration.
//!
//! ```toml
//! [notation]
//! doc_mode = "inline"
//! recover = false
//!
//! [schema]
//! include_docs = true
//! include_body_types = false
//! namespace_base = "http://www.ccsds.org/schema/malxml"
//! ```
//!
//! `${VAR}` is replaced by the environment variable `VAR` before parsing;
//! unknown variables are left as written.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render::notation::DocMode;
use crate::schema::SchemaOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Pattern(#[from] regex::Error),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotationConfig {
    pub doc_mode: DocMode,
    pub recover: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notation: NotationConfig,
    pub schema: SchemaOptions,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let processed = substitute_env_vars(content)?;
        let config: Config = toml::from_str(&processed)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema.namespace_base.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "schema.namespace_base",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;
    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{var_name}}}"))
    });
    Ok(result.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.notation.doc_mode, DocMode::Inline);
        assert!(config.schema.include_docs);
    }

    #[test]
    fn test_sections() {
        let config = Config::from_toml_str(indoc! {r#"
            [notation]
            doc_mode = "bulk"
            recover = true

            [schema]
            include_body_types = true
            namespace_base = "urn:example"
        "#})
        .unwrap();
        assert_eq!(config.notation.doc_mode, DocMode::Bulk);
        assert!(config.notation.recover);
        assert!(config.schema.include_body_types);
        assert!(config.schema.include_docs);
        assert_eq!(config.schema.namespace_base, "urn:example");
    }

    #[test]
    fn test_unknown_variable_left_in_place() {
        let text = substitute_env_vars("base = \"${MOSDL_SURELY_UNSET_VARIABLE}\"").unwrap();
        assert_eq!(text, "base = \"${MOSDL_SURELY_UNSET_VARIABLE}\"");
    }

    #[test]
    fn test_variable_substituted() {
        let path = std::env::var("PATH").unwrap_or_default();
        let text = substitute_env_vars("x = \"${PATH}\"").unwrap();
        assert_eq!(text, format!("x = \"{path}\""));
    }

    #[test]
    fn test_blank_namespace_rejected() {
        let err = Config::from_toml_str("[schema]\nnamespace_base = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "schema.namespace_base", .. }));
    }

    #[test]
    fn test_bad_doc_mode_rejected() {
        let err = Config::from_toml_str("[notation]\ndoc_mode = \"verbose\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
