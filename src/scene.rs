//! Scene graph.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. There is exactly one root,
//! created with the scene and never removed. Removing a subtree frees its slots; ids are not
//! reused, so a stale id simply resolves to `None`.

use std::ops::Mul;

use cgmath::{Matrix3, Matrix4, One, Quaternion, SquareMatrix, Vector3};

use crate::{backend::GeometryId, material::MaterialId};

/// Local transformation: position, rotation (as quaternion) and scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_uniform_scale(mut self, s: f32) -> Self {
        self.scale = Vector3::new(s, s, s);
        self
    }

    pub fn with_position(mut self, p: [f32; 3]) -> Self {
        self.position = p.into();
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Mul<Transform> for Transform {
    type Output = Self;

    fn mul(self, rhs: Transform) -> Self::Output {
        let scaled_rhs_pos = Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        Transform {
            position: self.position + (self.rotation * scaled_rhs_pos),
            rotation: self.rotation * rhs.rotation,
            scale: Vector3::new(
                self.scale.x * rhs.scale.x,
                self.scale.y * rhs.scale.y,
                self.scale.z * rhs.scale.z,
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A geometry drawn with a material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshBinding {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshBinding>,
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::new(),
            mesh: None,
            visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_mesh(mut self, mesh: MeshBinding) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// A mesh node resolved to world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldItem {
    pub node: NodeId,
    pub mesh: MeshBinding,
    pub world: Matrix4<f32>,
    pub normal: Matrix3<f32>,
}

#[derive(Clone, Debug)]
pub struct Scene {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new("root"))],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Attaches `node` below `parent`. Returns `None` if the parent no longer exists.
    pub fn add(&mut self, parent: NodeId, mut node: Node) -> Option<NodeId> {
        self.get(parent)?;
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(Some(node));
        self.get_mut(parent)?.children.push(id);
        Some(id)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |n| n.children.len())
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.child_count(self.root) == 0
    }

    /// Detaches and frees `id` and its descendants, handing back the meshes they carried.
    /// The root itself cannot be removed; asking for it clears its children instead.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<MeshBinding> {
        let mut freed = Vec::new();
        if id == self.root {
            let children = self.get(id).map(|n| n.children.clone()).unwrap_or_default();
            for child in children {
                freed.extend(self.remove_subtree(child));
            }
            return freed;
        }
        let Some(parent) = self.get(id).and_then(|n| n.parent) else {
            return freed;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                freed.extend(node.mesh);
                stack.extend(node.children);
            }
        }
        freed
    }

    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self
            .get(id)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            if let Some(node) = self.get(next) {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// World transform of every visible mesh node, depth first.
    pub fn world_items(&self) -> Vec<WorldItem> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, Matrix4::identity())];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.transform.to_matrix();
            if let Some(mesh) = node.mesh {
                out.push(WorldItem {
                    node: id,
                    mesh,
                    world,
                    normal: normal_matrix(&world),
                });
            }
            stack.extend(node.children.iter().rev().map(|c| (*c, world)));
        }
        out
    }
}

/// Inverse-transpose of the upper 3x3, falling back to the plain 3x3 for degenerate scales.
pub fn normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    use cgmath::Matrix;
    let m = Matrix3::from_cols(
        world.x.truncate(),
        world.y.truncate(),
        world.z.truncate(),
    );
    m.invert().map(|inv| inv.transpose()).unwrap_or(m)
}
