//! Scene graph handed to the renderer.

use glam::Vec3;

use crate::options::ModelDescriptor;
use crate::transform::Transform;

/// Identifier of an object in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// The virtual object placed on a tracked surface.
///
/// Created once and then repositioned in place; never recreated during a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedObject {
    /// Scene identifier.
    pub id: ObjectId,
    /// Current transform.
    pub transform: Transform,
    /// Geometry and material.
    pub model: ModelDescriptor,
}

impl PlacedObject {
    /// Creates an object at the origin.
    pub fn new(id: ObjectId, model: ModelDescriptor) -> Self {
        Self {
            id,
            transform: Transform::identity(),
            model,
        }
    }
}

/// One drawable entry of the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    /// Identifier.
    pub id: ObjectId,
    /// World transform of the node.
    pub transform: Transform,
    /// What to draw.
    pub model: ModelDescriptor,
}

/// Flat scene graph: a scene-level rotation and the nodes attached to it.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// Scene rotation as Euler angles (XYZ, radians).
    pub rotation: Vec3,
    nodes: Vec<SceneNode>,
    next_id: u64,
}

impl Scene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out an identifier unique within this scene.
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds `object` to the scene, or updates it in place if already present.
    ///
    /// Returns `true` if the object was newly inserted.
    pub fn add(&mut self, object: &PlacedObject) -> bool {
        let node = SceneNode {
            id: object.id,
            transform: object.transform,
            model: object.model,
        };
        if let Some(existing) = self.nodes.iter_mut().find(|n| n.id == object.id) {
            *existing = node;
            false
        } else {
            self.nodes.push(node);
            true
        }
    }

    /// Checks if the scene contains the given object.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Gets a node by identifier.
    pub fn node(&self, id: ObjectId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Returns an iterator over all nodes.
    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter()
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the scene is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
