use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Credential validation errors
    #[error("Invalid {field}: expected {expected} hex characters, got {actual}")]
    InvalidHexLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid {field}: {value:?} contains a non-hex character")]
    InvalidHexDigit { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    // Parameter validation errors
    #[error("{name} out of range: {value} (valid {min}..={max})")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("Payload too large for DR{data_rate}: {size} bytes exceeds the {max} byte maximum")]
    PayloadTooLarge {
        data_rate: u8,
        size: usize,
        max: usize,
    },

    #[error("Bandwidth index {index} referenced by DR{data_rate} is outside the bandwidth table")]
    InvalidBandwidthIndex { data_rate: u8, index: u8 },

    // Session errors
    #[error("Invalid session transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Wire value errors
    #[error("Unknown {name} code: {code}")]
    UnknownCode { name: &'static str, code: u8 },

    #[error("Unknown AT command: {0}")]
    UnknownCommand(String),

    // Line codec errors
    #[error("Line of {length} bytes exceeds the {max} byte limit")]
    LineTooLong { length: usize, max: usize },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an [`Error::OutOfRange`] with the given bounds.
    pub fn out_of_range(name: &'static str, value: u32, min: u32, max: u32) -> Self {
        Error::OutOfRange {
            name,
            value,
            min,
            max,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
