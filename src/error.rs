use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `AbmError` and maps other errors to
/// convert to an `AbmError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum AbmError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// A parameter file that parsed but describes an unusable model.
    ConfigError(String),
    /// Problems in the imported population data that cannot be repaired.
    LoadError(String),
    /// An ID was reserved twice for the same entity type.
    DuplicateId(u64),
    /// No neighborhood in the fallback chain had room for a new household.
    NoLandAvailable(u64),
    ReportError(String),
    AbmError(String),
}

impl From<io::Error> for AbmError {
    fn from(error: io::Error) -> Self {
        AbmError::IoError(error)
    }
}

impl From<serde_json::Error> for AbmError {
    fn from(error: serde_json::Error) -> Self {
        AbmError::JsonError(error)
    }
}

impl From<csv::Error> for AbmError {
    fn from(error: csv::Error) -> Self {
        AbmError::CSVError(error)
    }
}

impl From<String> for AbmError {
    fn from(error: String) -> Self {
        AbmError::AbmError(error)
    }
}

impl From<&str> for AbmError {
    fn from(error: &str) -> Self {
        AbmError::AbmError(error.to_string())
    }
}

impl std::error::Error for AbmError {}

impl Display for AbmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AbmError::NoLandAvailable(hid) => write!(
                f,
                "Error: no neighborhood has land available for household {hid}"
            ),
            AbmError::DuplicateId(id) => write!(f, "Error: ID {id} is already in use"),
            _ => write!(f, "Error: {self:?}"),
        }
    }
}
