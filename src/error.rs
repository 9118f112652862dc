//! Error types for qbuild.

use thiserror::Error;

/// The main error type for qbuild operations.
#[derive(Debug, Error)]
pub enum QbError {
    /// The assembled configuration failed cross-reference validation.
    #[error("Invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    /// The serialized query value is not a usable tree.
    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    /// A field name that is not part of the configuration.
    #[error("Unknown field: '{0}'")]
    UnknownField(String),

    /// Settings file could not be parsed.
    #[error("Settings error: {0}")]
    Settings(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QbError {
    /// Create an invalid tree error.
    pub fn tree(message: impl Into<String>) -> Self {
        Self::InvalidTree(message.into())
    }
}

impl From<toml::de::Error> for QbError {
    fn from(e: toml::de::Error) -> Self {
        Self::Settings(e.to_string())
    }
}

/// One cross-reference problem found while building a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("field '{field}' has type '{ty}' which has no type definition")]
    UnknownType { field: String, ty: String },

    #[error("{owner} references unknown widget '{widget}'")]
    UnknownWidget { owner: String, widget: String },

    #[error("{owner} references unknown operator '{operator}'")]
    UnknownOperator { owner: String, operator: String },

    #[error("field '{field}' references unknown function '{func}'")]
    UnknownFunc { field: String, func: String },

    #[error("cannot patch {kind} '{name}': no base definition")]
    MissingBase { kind: &'static str, name: String },

    #[error("operator '{operator}': {message}")]
    InvalidOperator { operator: String, message: String },

    #[error("unknown default conjunction '{0}'")]
    UnknownConjunction(String),
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for qbuild operations.
pub type QbResult<T> = Result<T, QbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QbError::tree("expected a group");
        assert_eq!(err.to_string(), "Invalid tree: expected a group");
    }

    #[test]
    fn test_config_errors_joined() {
        let err = QbError::Config(vec![
            ConfigError::UnknownWidget {
                owner: "field 'qty'".to_string(),
                widget: "knob".to_string(),
            },
            ConfigError::UnknownConjunction("XOR".to_string()),
        ]);
        assert_eq!(
            err.to_string(),
            "Invalid configuration: field 'qty' references unknown widget 'knob'; \
             unknown default conjunction 'XOR'"
        );
    }
}
