use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;

use crate::gfx::{GraphicsApi, TextureId};

use super::{RenderTarget, Texture};

/// Kind tag of a managed resource.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Texture,
    RenderTarget,
}

/// Shared handle to a managed resource.
#[derive(Debug, Clone)]
pub enum Resource {
    Texture(Arc<Texture>),
    RenderTarget(Arc<RenderTarget>),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Texture(_) => ResourceKind::Texture,
            Resource::RenderTarget(_) => ResourceKind::RenderTarget,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Texture(t) => t.name(),
            Resource::RenderTarget(rt) => rt.texture().name(),
        }
    }

    /// GPU id of the texture behind this resource.
    pub fn texture_id(&self) -> TextureId {
        match self {
            Resource::Texture(t) => t.texture_id(),
            Resource::RenderTarget(rt) => rt.texture().texture_id(),
        }
    }

    /// Strong handle count, the manager's own entry included.
    pub fn ref_count(&self) -> usize {
        match self {
            Resource::Texture(t) => Arc::strong_count(t),
            Resource::RenderTarget(rt) => Arc::strong_count(rt),
        }
    }

    pub fn as_texture(&self) -> Option<&Arc<Texture>> {
        match self {
            Resource::Texture(t) => Some(t),
            Resource::RenderTarget(_) => None,
        }
    }

    pub fn as_render_target(&self) -> Option<&Arc<RenderTarget>> {
        match self {
            Resource::RenderTarget(rt) => Some(rt),
            Resource::Texture(_) => None,
        }
    }

    fn release(&self, gpu: &mut dyn GraphicsApi) {
        match self {
            Resource::Texture(t) => {
                if !t.is_failed() {
                    gpu.delete_texture(t.texture_id());
                }
            }
            Resource::RenderTarget(rt) => {
                if rt.is_valid() {
                    gpu.delete_framebuffer(rt.framebuffer());
                }
            }
        }
    }
}

/// Authoritative set of shared GPU resources.
///
/// All access serializes on one re-entrant lock, so helpers may call back into
/// the manager while holding it. A resource whose only remaining handle is the
/// manager's own entry is released by the next [`clean`](Self::clean), never
/// earlier.
#[derive(Default)]
pub struct ResourceManager {
    resources: ReentrantMutex<RefCell<Vec<Resource>>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource and returns a handle to it.
    pub fn add(&self, resource: Resource) -> Resource {
        let guard = self.resources.lock();
        log::debug!("resource '{}' ({:?}) registered", resource.name(), resource.kind());
        guard.borrow_mut().push(resource.clone());
        resource
    }

    pub fn add_texture(&self, texture: Texture) -> Arc<Texture> {
        let texture = Arc::new(texture);
        self.add(Resource::Texture(texture.clone()));
        texture
    }

    /// Registers a render target together with its backing texture.
    pub fn add_render_target(&self, target: RenderTarget) -> Arc<RenderTarget> {
        let _guard = self.resources.lock();
        let target = Arc::new(target);
        self.add(Resource::RenderTarget(target.clone()));
        if !target.texture().is_failed() {
            self.add(Resource::Texture(target.texture().clone()));
        }
        target
    }

    pub fn find(&self, name: &str) -> Option<Resource> {
        let guard = self.resources.lock();
        let list = guard.borrow();
        list.iter().find(|r| r.name() == name).cloned()
    }

    /// Linear scan for the resource whose texture carries `id`.
    pub fn find_by_id(&self, id: TextureId) -> Option<Resource> {
        if id.is_none() {
            return None;
        }
        let guard = self.resources.lock();
        let list = guard.borrow();
        list.iter().find(|r| r.texture_id() == id).cloned()
    }

    pub fn find_texture(&self, name: &str) -> Option<Arc<Texture>> {
        let guard = self.resources.lock();
        let list = guard.borrow();
        list.iter()
            .filter_map(Resource::as_texture)
            .find(|t| t.name() == name)
            .cloned()
    }

    pub fn find_texture_by_id(&self, id: TextureId) -> Option<Arc<Texture>> {
        if id.is_none() {
            return None;
        }
        let guard = self.resources.lock();
        let list = guard.borrow();
        list.iter()
            .filter_map(Resource::as_texture)
            .find(|t| t.texture_id() == id)
            .cloned()
    }

    pub fn count(&self) -> usize {
        self.resources.lock().borrow().len()
    }

    pub fn get(&self, index: usize) -> Option<Resource> {
        self.resources.lock().borrow().get(index).cloned()
    }

    /// Clone of the current list, for iteration without holding the lock.
    pub fn snapshot(&self) -> Vec<Resource> {
        self.resources.lock().borrow().clone()
    }

    /// Releases every resource no longer referenced outside the manager.
    ///
    /// Render targets go first, so a target's texture dropped here is released
    /// in the same call. Returns the number of removed resources.
    pub fn clean(&self, gpu: &mut dyn GraphicsApi) -> usize {
        let guard = self.resources.lock();
        let mut removed = 0;

        for kind in [ResourceKind::RenderTarget, ResourceKind::Texture] {
            let released: Vec<Resource> = {
                let mut list = guard.borrow_mut();
                let (dead, live): (Vec<_>, Vec<_>) = list
                    .drain(..)
                    .partition(|r| r.kind() == kind && r.ref_count() == 1);
                *list = live;
                dead
            };

            for resource in &released {
                log::debug!("resource '{}' ({:?}) released", resource.name(), resource.kind());
                resource.release(gpu);
            }
            removed += released.len();
        }

        removed
    }

    /// Releases everything regardless of outstanding handles.
    pub fn release_all(&self, gpu: &mut dyn GraphicsApi) {
        let guard = self.resources.lock();
        let all: Vec<Resource> = guard.borrow_mut().drain(..).collect();

        let (targets, textures): (Vec<_>, Vec<_>) =
            all.into_iter().partition(|r| r.kind() == ResourceKind::RenderTarget);
        for resource in targets.iter().chain(textures.iter()) {
            resource.release(gpu);
        }
        log::debug!("released {} resources", targets.len() + textures.len());
    }
}
