use crate::handles::Handle;
use crate::texture::RequestId;

/// Functions the guest module exports for the host to call back.
///
/// Both are optional: the defaults do nothing, so a guest that does not
/// export one simply never hears about those events.
pub trait GuestExports {
    fn on_texture_loaded(&mut self, _request: RequestId, _texture: Handle, _width: i32, _height: i32) {}

    fn on_texture_failed(&mut self, _request: RequestId, _code: i32) {}
}

/// A queued callback into the guest.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Notification {
    Loaded {
        request: RequestId,
        texture: Handle,
        width: i32,
        height: i32,
    },
    Failed {
        request: RequestId,
        code: i32,
    },
}

impl Notification {
    pub fn request(&self) -> RequestId {
        match *self {
            Notification::Loaded { request, .. } | Notification::Failed { request, .. } => request,
        }
    }

    pub fn deliver<E: GuestExports + ?Sized>(self, guest: &mut E) {
        match self {
            Notification::Loaded { request, texture, width, height } => {
                guest.on_texture_loaded(request, texture, width, height)
            }
            Notification::Failed { request, code } => guest.on_texture_failed(request, code),
        }
    }
}

/// Collects notifications instead of calling a guest.
impl GuestExports for Vec<Notification> {
    fn on_texture_loaded(&mut self, request: RequestId, texture: Handle, width: i32, height: i32) {
        self.push(Notification::Loaded { request, texture, width, height });
    }

    fn on_texture_failed(&mut self, request: RequestId, code: i32) {
        self.push(Notification::Failed { request, code });
    }
}

/// A guest without texture callbacks.
impl GuestExports for () {}
