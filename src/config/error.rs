use thiserror::Error;

/// Error produced while binding or validating relay options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid relay options: {0}")]
    Parse(String),

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("{field} has length {length}, expected {min}..={max}")]
    InvalidLength {
        field: &'static str,
        length: usize,
        min: usize,
        max: usize,
    },
}
