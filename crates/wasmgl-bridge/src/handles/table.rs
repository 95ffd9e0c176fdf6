use std::fmt;

use crate::error::BridgeError;

/// Guest-visible handle. `0` is reserved as null.
pub type Handle = i32;

pub const NULL_HANDLE: Handle = 0;

/// What a handle table stores; used in error messages.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Context,
    Shader,
    Program,
    Buffer,
    Texture,
    UniformLocation,
    VertexArray,
    Query,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Context => "context",
            ResourceKind::Shader => "shader",
            ResourceKind::Program => "program",
            ResourceKind::Buffer => "buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::UniformLocation => "uniform location",
            ResourceKind::VertexArray => "vertex array",
            ResourceKind::Query => "query",
        })
    }
}

/// Append-only table mapping 1-based handles to values.
///
/// Entries are never removed or moved, so a handle stays valid for the life
/// of the table. The Nth insert returns handle N.
#[derive(Debug)]
pub struct HandleTable<T> {
    kind: ResourceKind,
    slots: Vec<T>,
}

impl<T> HandleTable<T> {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    /// Appends `value` and returns its handle.
    pub fn insert(&mut self, value: T) -> Handle {
        self.slots.push(value);
        self.slots.len() as Handle
    }

    /// Looks up a handle. Null and out-of-range handles are errors.
    pub fn get(&self, handle: Handle) -> Result<&T, BridgeError> {
        self.index(handle)
            .and_then(|i| self.slots.get(i))
            .ok_or(BridgeError::InvalidHandle { kind: self.kind, handle })
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, BridgeError> {
        let kind = self.kind;
        match self.index(handle) {
            Some(i) => self
                .slots
                .get_mut(i)
                .ok_or(BridgeError::InvalidHandle { kind, handle }),
            None => Err(BridgeError::InvalidHandle { kind, handle }),
        }
    }

    /// Looks up a handle for a binding call: null maps to `Ok(None)` (unbind).
    pub fn binding(&self, handle: Handle) -> Result<Option<&T>, BridgeError> {
        if handle == NULL_HANDLE {
            return Ok(None);
        }
        self.get(handle).map(Some)
    }

    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Iterates `(handle, value)` in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().map(|(i, v)| (i as Handle + 1, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (i as Handle + 1, v))
    }

    fn index(&self, handle: Handle) -> Option<usize> {
        if handle <= NULL_HANDLE {
            return None;
        }
        Some(handle as usize - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> HandleTable<&'static str> {
        HandleTable::new(ResourceKind::Buffer)
    }

    #[test]
    fn handles_are_one_based_and_sequential() {
        let mut t = table();
        assert_eq!(t.insert("a"), 1);
        assert_eq!(t.insert("b"), 2);
        assert_eq!(t.insert("c"), 3);
    }

    #[test]
    fn handles_stay_valid_after_growth() {
        let mut t = table();
        let first = t.insert("first");
        for _ in 0..100 {
            t.insert("filler");
        }
        assert_eq!(t.get(first), Ok(&"first"));
    }

    #[test]
    fn null_handle_is_invalid_for_get() {
        let t = table();
        assert_eq!(
            t.get(0),
            Err(BridgeError::InvalidHandle { kind: ResourceKind::Buffer, handle: 0 })
        );
    }

    #[test]
    fn null_handle_is_unbind_for_binding() {
        let t = table();
        assert_eq!(t.binding(0), Ok(None));
    }

    #[test]
    fn out_of_range_and_negative_handles() {
        let mut t = table();
        t.insert("a");
        assert!(t.get(2).is_err());
        assert!(t.get(-1).is_err());
        assert!(t.binding(2).is_err());
        assert!(t.binding(-3).is_err());
    }

    #[test]
    fn iter_reports_handles() {
        let mut t = table();
        t.insert("a");
        t.insert("b");
        let handles: Vec<_> = t.iter().map(|(h, _)| h).collect();
        assert_eq!(handles, vec![1, 2]);
    }
}
