use glam::Vec3;

use crate::handles::{GeometryHandle, MaterialHandle, NodeId, TextureHandle};

/// The calls the instancing core makes into a rendering engine.
///
/// Implementations own the real GPU objects; the core only holds handles.
pub trait SceneBackend {
    /// Create an empty group node under the scene root.
    fn create_group_node(&mut self, name: &str) -> NodeId;

    /// Allocate a float texture of `width` channels by `height` rows.
    fn create_morph_texture(&mut self, width: usize, height: usize) -> TextureHandle;

    fn set_node_scale(&mut self, node: NodeId, scale: Vec3);

    /// Remove a node from its parent.
    fn detach_node(&mut self, node: NodeId);

    fn release_geometry(&mut self, handle: GeometryHandle);

    fn release_material(&mut self, handle: MaterialHandle);

    fn release_texture(&mut self, handle: TextureHandle);
}

/// A backend call, as recorded by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    NodeCreated { node: NodeId, name: String },
    TextureCreated {
        texture: TextureHandle,
        width: usize,
        height: usize,
    },
    NodeScaled { node: NodeId, scale: Vec3 },
    NodeDetached(NodeId),
    GeometryReleased(GeometryHandle),
    MaterialReleased(MaterialHandle),
    TextureReleased(TextureHandle),
}

/// In-memory backend that allocates sequential handles and logs every call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_id: u64,
    events: Vec<BackendEvent>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only access to the call log.
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// Drain and return the call log.
    pub fn drain_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }

    /// Textures created and not yet released.
    pub fn live_textures(&self) -> usize {
        let created = self
            .events
            .iter()
            .filter(|e| matches!(e, BackendEvent::TextureCreated { .. }))
            .count();
        let released = self
            .events
            .iter()
            .filter(|e| matches!(e, BackendEvent::TextureReleased(_)))
            .count();
        created.saturating_sub(released)
    }

    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl SceneBackend for RecordingBackend {
    fn create_group_node(&mut self, name: &str) -> NodeId {
        let node = NodeId(self.allocate());
        self.events.push(BackendEvent::NodeCreated {
            node,
            name: name.to_string(),
        });
        node
    }

    fn create_morph_texture(&mut self, width: usize, height: usize) -> TextureHandle {
        let texture = TextureHandle(self.allocate());
        self.events.push(BackendEvent::TextureCreated {
            texture,
            width,
            height,
        });
        texture
    }

    fn set_node_scale(&mut self, node: NodeId, scale: Vec3) {
        self.events.push(BackendEvent::NodeScaled { node, scale });
    }

    fn detach_node(&mut self, node: NodeId) {
        self.events.push(BackendEvent::NodeDetached(node));
    }

    fn release_geometry(&mut self, handle: GeometryHandle) {
        self.events.push(BackendEvent::GeometryReleased(handle));
    }

    fn release_material(&mut self, handle: MaterialHandle) {
        self.events.push(BackendEvent::MaterialReleased(handle));
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.events.push(BackendEvent::TextureReleased(handle));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_distinct() {
        let mut backend = RecordingBackend::new();
        let a = backend.create_group_node("a");
        let t = backend.create_morph_texture(2, 8);
        let b = backend.create_group_node("b");
        assert_ne!(a, b);
        assert_ne!(a.0, t.0);
        assert_eq!(backend.events().len(), 3);
    }

    #[test]
    fn live_textures_tracks_release() {
        let mut backend = RecordingBackend::new();
        let t1 = backend.create_morph_texture(1, 1);
        backend.create_morph_texture(1, 1);
        assert_eq!(backend.live_textures(), 2);
        backend.release_texture(t1);
        assert_eq!(backend.live_textures(), 1);
    }

    #[test]
    fn drain_events_clears_log() {
        let mut backend = RecordingBackend::new();
        let node = backend.create_group_node("deer");
        backend.detach_node(node);
        let events = backend.drain_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], BackendEvent::NodeDetached(node));
        assert!(backend.events().is_empty());
    }
}
