use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("code length must be between 1 and {max}, got {length}")]
    InvalidLength { length: usize, max: usize },
    #[error("alphabet must not be empty")]
    EmptyAlphabet,
    #[error("alphabet must contain only ASCII alphanumeric characters: {0:?}")]
    InvalidSymbol(char),
    #[error("alphabet contains {0:?} more than once")]
    DuplicateSymbol(char),
}
