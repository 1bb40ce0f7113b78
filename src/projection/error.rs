use thiserror::Error;

/// Resource or schema misconfiguration; fatal to the batch that hits it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("No editable fields defined in options.")]
    NoEditableFields,

    #[error("Kind '{0}' is not registered with the store")]
    UnknownKind(String),

    #[error("Invalid path provided: '{0}'")]
    InvalidPath(String),

    #[error("Attempting to set sub document when 'ref' option not configured on {kind}.{field}")]
    MissingReference { kind: String, field: String },

    #[error("Field '{field}' references unknown kind '{target}'")]
    UnknownReferenceKind { field: String, target: String },

    #[error("Schema '{0}' must have an _id field.")]
    ReferenceWithoutId(String),
}
