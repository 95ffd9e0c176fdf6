//! Logging utilities.
//!
//! Centralizes logger initialization. Library code only talks to the `log`
//! facade; guest log pass-through uses the `guest` target so it can be
//! filtered separately (`RUST_LOG=guest=warn,wasmgl_bridge=debug`).

mod init;

pub use init::{init_logging, LoggingConfig, GUEST_TARGET};
