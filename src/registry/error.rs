//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// `max_sessions` reached
    SessionLimit(usize),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::SessionLimit(max) => {
                write!(f, "Session limit reached ({} sessions)", max)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
