//! CLI Exit Code Registry
//!
//! Single source of truth for `skymerge` exit codes. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                 |
//! |---------|------------|---------------------------------------------|
//! | 0       | Universal  | Success                                     |
//! | 2       | Universal  | CLI usage error (clap)                      |
//! | 60-69   | dedup      | Config, input and output failures           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `dedup_exit_code` or the command's error handling

use skymerge_dedup::DedupError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
/// Emitted by clap itself; listed here for completeness.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Dedup (60-69)
// =============================================================================

/// Config file could not be parsed or failed validation
/// (bad threshold, duplicate archive, archive without an instrument age).
pub const EXIT_DEDUP_INVALID_CONFIG: u8 = 60;

/// Input could not be loaded: unreadable config or archive file, missing
/// column, missing or non-numeric coordinate/epoch, invalid observation.
pub const EXIT_DEDUP_INPUT: u8 = 61;

/// Deduplicated table, elimination log or JSON summary could not be written.
pub const EXIT_DEDUP_OUTPUT: u8 = 63;

/// Map an engine error to its exit code. Every `DedupError` is raised before
/// or while loading input, so there is no separate engine code; 62 is unused.
pub fn dedup_exit_code(err: &DedupError) -> u8 {
    match err {
        DedupError::ConfigParse(_) | DedupError::ConfigValidation(_) | DedupError::UnknownArchive(_) => {
            EXIT_DEDUP_INVALID_CONFIG
        }
        DedupError::MissingColumn { .. }
        | DedupError::MissingValue { .. }
        | DedupError::NumericParse { .. }
        | DedupError::InvalidObservation { .. }
        | DedupError::Io(_) => EXIT_DEDUP_INPUT,
    }
}
