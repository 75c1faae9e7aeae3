use std::fmt;

#[derive(Debug)]
pub enum DedupError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, duplicate archive, etc.).
    ConfigValidation(String),
    /// A source tag with no entry in the instrument age table.
    UnknownArchive(String),
    /// Missing required column in an archive CSV.
    MissingColumn { archive: String, column: String },
    /// Empty cell in a coordinate or epoch column.
    MissingValue { archive: String, row: usize, column: String },
    /// Non-numeric cell in a numeric column.
    NumericParse { archive: String, row: usize, column: String, value: String },
    /// Observation that reached the engine with an invalid field.
    InvalidObservation { id: usize, reason: String },
    /// IO error (file read, CSV write, etc.).
    Io(String),
}

impl fmt::Display for DedupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownArchive(tag) => write!(f, "unknown archive: {tag}"),
            Self::MissingColumn { archive, column } => {
                write!(f, "archive '{archive}': missing column '{column}'")
            }
            Self::MissingValue { archive, row, column } => {
                write!(f, "archive '{archive}', row {row}: missing value in '{column}'")
            }
            Self::NumericParse { archive, row, column, value } => {
                write!(f, "archive '{archive}', row {row}: cannot parse '{value}' in '{column}' as a number")
            }
            Self::InvalidObservation { id, reason } => {
                write!(f, "observation {id}: {reason}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for DedupError {}

impl DedupError {
    /// Precondition failures detected while reading input, before any matching.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingColumn { .. }
                | Self::MissingValue { .. }
                | Self::NumericParse { .. }
                | Self::InvalidObservation { .. }
        )
    }
}
