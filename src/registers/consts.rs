//! Raw offsets and constants of the MMIOX1 wrapper.

/// Offset of the version register.
pub const OFFSET_VERSION: usize = 0x0000;
/// Offset of the status register.
pub const OFFSET_STATUS: usize = 0x0004;
/// Offset of the configuration register.
pub const OFFSET_CONFIG: usize = 0x0008;
/// Offset of the instruction FIFO write port.
pub const OFFSET_INST_FIFO: usize = 0x000C;
/// Offset of the instruction commit register.
pub const OFFSET_INST_COMMIT: usize = 0x0010;
/// Offset of the log FIFO read port.
pub const OFFSET_LOG_FIFO: usize = 0x0014;

/// Commit flags used for a plain, non-chained submission.
pub const INST_FLAGS_NONE: u32 = 0;

/// Polls of `INST_FULL` before a push gives up.
pub const INST_FULL_POLLS: usize = 1_000_000;
