//! Default configuration values shared across the workspace.

/// Expected identifier length (decimal digits) unless configured otherwise.
pub const DEFAULT_RFID_LENGTH: usize = 10;

/// Separator placed between the date prefix and the identifier.
pub const DEFAULT_SEPARATOR: &str = "-";

/// Source address used for simulated datagrams when none is supplied.
pub const DEFAULT_SIMULATED_SOURCE: &str = "127.0.0.1";

/// `chrono` format string for the default date prefix (two-digit year,
/// month, day).
pub const DATE_PREFIX_FORMAT: &str = "%y%m%d";
