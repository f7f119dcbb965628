use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Field path is empty.
    EmptyPath,
    /// Field path contains an empty segment (leading/trailing/consecutive dots).
    EmptySegment(String),
    /// Field path contains a character the store's query language reserves.
    IllegalCharacter { path: String, ch: char },
    /// A nested set ran into a non-map value at an intermediate segment.
    ScalarIntermediate { path: String, segment: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "field path is empty"),
            Self::EmptySegment(path) => {
                write!(f, "field path '{path}' contains an empty segment")
            }
            Self::IllegalCharacter { path, ch } => {
                write!(f, "field path '{path}' contains illegal character {ch:?}")
            }
            Self::ScalarIntermediate { path, segment } => {
                write!(
                    f,
                    "cannot set '{path}': segment '{segment}' holds a non-map value"
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}
