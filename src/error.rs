//! Construction errors. Lookups cannot fail.

/// Why a key/value set could not be turned into a trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// `keys` and `values` differ in length.
    LengthMismatch { keys: usize, values: usize },
    /// Two keys are equal under the selected case mode.
    DuplicateKey { first: usize, second: usize },
    /// Two distinct keys that case-insensitive dispatch cannot tell apart,
    /// such as `a@b` and ``a`b``.
    FoldCollision { first: usize, second: usize },
    /// Key indices must fit the 32-bit node fields.
    TooManyKeys(usize),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::LengthMismatch { keys, values } => {
                write!(f, "{} keys but {} values", keys, values)
            }
            BuildError::DuplicateKey { first, second } => {
                write!(f, "keys {} and {} are equal under the case mode", first, second)
            }
            BuildError::FoldCollision { first, second } => {
                write!(f, "keys {} and {} differ only in bit 0x20 outside ASCII letters", first, second)
            }
            BuildError::TooManyKeys(n) => write!(f, "too many keys: {}", n),
        }
    }
}

impl std::error::Error for BuildError {}

/// Result type for trie construction.
pub type Result<T> = std::result::Result<T, BuildError>;
