//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Success (search found at least one record)      |
//! | 1    | Search ran and found no matches                 |
//! | 2    | CLI usage error (bad args)                      |
//! | 3    | Config file missing, unparseable or invalid     |
//! | 4    | A source file is unavailable; nothing loaded    |
//! | 5    | Output could not be written                     |

/// Success.
pub const EXIT_SUCCESS: u8 = 0;

/// Search ran and matched nothing. Like `grep(1)`, not a failure of the tool.
pub const EXIT_NO_MATCHES: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Config parse or validation failure.
pub const EXIT_CONFIG_INVALID: u8 = 3;

/// Source missing, unreadable or structurally invalid. The load was aborted.
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 4;

/// Writing results (stdout or --output file) failed.
pub const EXIT_OUTPUT: u8 = 5;
