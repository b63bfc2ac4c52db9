//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `partcheck`. Scripts rely on
//! them, so a code never changes meaning once released.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (no worksheet, unexpected failure)     |
//! | 2    | Usage error (bad arguments, bad lookup URL)          |
//! | 3    | I/O error (unreadable input, unwritable output)      |
//! | 4    | Configuration error (TOML parse or validation)       |
//! | 5    | Deviations found and `--strict` was given            |

/// Command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Unspecified failure. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Bad arguments. clap exits with the same code for its own parse errors.
pub const EXIT_USAGE: u8 = 2;

/// Input could not be read, decoded, or the output could not be written.
pub const EXIT_IO: u8 = 3;

/// Config file did not parse or failed validation.
pub const EXIT_CONFIG: u8 = 4;

/// `compare --strict` found at least one row with a deviation.
pub const EXIT_DEVIATIONS: u8 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_IO, EXIT_CONFIG, EXIT_DEVIATIONS];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
