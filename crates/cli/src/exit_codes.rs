//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Description                                          |
//! |------|------------------------------------------------------|
//! | 0    | Success (including clean no-ops and aborted prompts) |
//! | 1    | Validation or processing error                       |
//! | 2    | CLI usage error (bad args, missing file)             |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant here
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Validation or processing error - invalid field path, bad filter,
/// failed import, store failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;
