use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::handles::{Handle, HandleTable, ResourceKind};
use crate::host::{GraphicsApi, SurfaceProvider};

use super::state::Context;

/// Every context created so far. Context ids follow the handle rules: the
/// first context is `1` and ids are never reused.
pub struct ContextRegistry<G: GraphicsApi> {
    contexts: HandleTable<Context<G>>,
}

impl<G: GraphicsApi> ContextRegistry<G> {
    pub fn new() -> Self {
        Self {
            contexts: HandleTable::new(ResourceKind::Context),
        }
    }

    /// Opens `surface_id` through `surfaces` and registers a context for it.
    pub fn create<P>(
        &mut self,
        surfaces: &mut P,
        surface_id: &str,
        config: &BridgeConfig,
    ) -> Result<Handle, BridgeError>
    where
        P: SurfaceProvider<Api = G>,
    {
        let api = surfaces
            .open(surface_id)
            .map_err(|reason| BridgeError::ContextCreation {
                surface: surface_id.to_string(),
                reason,
            })?;

        let id = self.contexts.len() as Handle + 1;
        let ctx = Context::new(id, surface_id, api, config);
        Ok(self.contexts.insert(ctx))
    }

    pub fn get(&self, id: Handle) -> Result<&Context<G>, BridgeError> {
        self.contexts.get(id)
    }

    pub fn get_mut(&mut self, id: Handle) -> Result<&mut Context<G>, BridgeError> {
        self.contexts.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Context<G>)> {
        self.contexts.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut Context<G>)> {
        self.contexts.iter_mut()
    }
}

impl<G: GraphicsApi> Default for ContextRegistry<G> {
    fn default() -> Self {
        Self::new()
    }
}
