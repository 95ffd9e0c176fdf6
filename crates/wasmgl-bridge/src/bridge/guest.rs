use crate::error::BridgeError;

/// Read-only view of the guest's linear memory for one boundary call.
///
/// Every access is bounds-checked; a pointer/length pair that does not fit is
/// [`BridgeError::MemoryOutOfBounds`].
#[derive(Debug, Copy, Clone)]
pub struct GuestMemory<'a> {
    bytes: &'a [u8],
}

impl<'a> GuestMemory<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `len` bytes starting at `ptr`.
    pub fn slice(&self, ptr: u32, len: usize) -> Result<&'a [u8], BridgeError> {
        let start = ptr as usize;
        start
            .checked_add(len)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or(BridgeError::MemoryOutOfBounds { ptr, len })
    }

    /// The bytes of `count` consecutive `f32`s at `ptr`.
    pub fn f32_bytes(&self, ptr: u32, count: u32) -> Result<&'a [u8], BridgeError> {
        let len = (count as usize)
            .checked_mul(4)
            .ok_or(BridgeError::MemoryOutOfBounds { ptr, len: usize::MAX })?;
        self.slice(ptr, len)
    }

    /// A UTF-8 string of `len` bytes at `ptr`.
    pub fn str(&self, ptr: u32, len: u32) -> Result<&'a str, BridgeError> {
        let bytes = self.slice(ptr, len as usize)?;
        std::str::from_utf8(bytes).map_err(|_| BridgeError::InvalidString { ptr })
    }

    /// A NUL-terminated UTF-8 string at `ptr`.
    pub fn cstr(&self, ptr: u32) -> Result<&'a str, BridgeError> {
        let tail = self.slice(ptr, self.bytes.len().saturating_sub(ptr as usize))?;
        let end = tail
            .iter()
            .position(|&b| b == 0)
            .ok_or(BridgeError::InvalidString { ptr })?;
        std::str::from_utf8(&tail[..end]).map_err(|_| BridgeError::InvalidString { ptr })
    }
}
