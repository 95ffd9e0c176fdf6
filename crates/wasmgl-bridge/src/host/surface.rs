use super::api::GraphicsApi;

/// Resolves a guest surface id (a canvas name, a window label) to a fresh
/// graphics API instance.
pub trait SurfaceProvider {
    type Api: GraphicsApi;

    /// Opens `surface_id`. The error string ends up in
    /// [`BridgeError::ContextCreation`](crate::BridgeError::ContextCreation).
    fn open(&mut self, surface_id: &str) -> Result<Self::Api, String>;
}
