//! Wire format for **wasmgl** command buffers.
//!
//! A guest module records graphics work as fixed-width records in its linear
//! memory and hands the whole batch to the host in one boundary call. This
//! crate defines both halves of that contract so they cannot drift apart.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`op`] | Opcode constants |
//! | [`record`] | `RawRecord`, the 32-byte on-the-wire layout |
//! | [`command`] | `Command`, the typed view of a record |
//! | [`buffer`] | `CommandBuffer`, the guest-side writer |
//! | [`error`] | `DecodeError` |
//!
//! # Quick start
//!
//! ```rust
//! use wasmgl_cmd::{Command, CommandBuffer};
//!
//! let mut cmds = CommandBuffer::new();
//! cmds.push(Command::Viewport { x: 0, y: 0, width: 640, height: 480 });
//! cmds.push(Command::ClearColor { r: 0.1, g: 0.1, b: 0.1, a: 1.0 });
//! cmds.push(Command::Clear { mask: 0x4000 });
//!
//! assert_eq!(cmds.len(), 3);
//! assert_eq!(cmds.as_bytes().len(), 3 * wasmgl_cmd::RECORD_SIZE);
//! ```

pub mod buffer;
pub mod command;
pub mod error;
pub mod op;
pub mod record;

pub use buffer::{CommandBuffer, FrameCounters};
pub use command::Command;
pub use error::DecodeError;
pub use record::{RawRecord, RECORD_SIZE, RECORD_WORDS};
