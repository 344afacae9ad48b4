/// Result alias used by every airnav crate
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of centerline processing and registration.
///
/// None of these are fatal for the host application: the fail-soft
/// registration entry points turn them into an identity transform plus a
/// warning, and the tree builder never fails at all.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {what} has {found} valid entries, at least {required} required")]
    InsufficientData {
        what: &'static str,
        found: usize,
        required: usize,
    },

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
