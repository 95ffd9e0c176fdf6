//! Integer handles for host-owned objects.
//!
//! Guests never see host objects, only 1-based indices into per-context
//! tables. `0` is the null handle: binding calls treat it as "unbind".

mod table;

pub use table::{Handle, HandleTable, ResourceKind, NULL_HANDLE};
