use thiserror::Error;

/// Raised by [`crate::definition::ValueObjectType::define`] when a definition is malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Value objects require a name")]
    MissingName,
    #[error("Value object '{name}' requires a definition")]
    MissingDefinition { name: String },
    #[error("Value object definition '{name}' requires validation")]
    MissingValidation { name: String },
    #[error("Value object definition '{name}' has an invalid property path '{path}'")]
    InvalidPath { name: String, path: String },
    #[error("Value object definition '{name}' cannot use '{property}' as a composite")]
    ReservedName { name: String, property: String },
}

/// Raised while building an instance. Nothing is cached when one of these occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("There is no value to use for '{type_name}'")]
    NoInput { type_name: String },
    #[error("Not a valid value for '{type_name}'")]
    ValidationFailed { type_name: String },
    #[error("Cannot assign to read only property '{path}'")]
    ImmutabilityViolation { path: String },
    #[error("Cannot assign '{path}' beneath a value that is not a record")]
    NotARecord { path: String },
    #[error("Derivation failed: {0}")]
    Derivation(String),
}

#[derive(Error, Debug)]
pub enum KeepsakeError {
    #[error("Config error: {0}")]
    Config(String),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

pub type Result<T> = std::result::Result<T, KeepsakeError>;

// Helper conversions
impl From<config::ConfigError> for KeepsakeError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
