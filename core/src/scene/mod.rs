//! Scene graph nodes and world transforms.
//!
//! Nodes refer to their parent by name, so a parent can be replaced or
//! removed without touching children. Resolution happens on every
//! transform query and reports stale names and cycles as errors.

use std::collections::HashSet;

use glam::{Mat4, Quat, Vec3};
use lumen_derive::LevelEntity;

pub use camera::{Camera, PerspectiveProjection};

use crate::{
    device::ClearBuffer,
    error::{EngineError, EngineResult},
    level::{EntityId, EntityKind, Level},
};

pub mod camera;

/// When a static mesh node is drawn by the frame loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTime {
    /// Once, into the six faces of a cube map, on the first frame.
    PreRender,
    /// Every frame.
    #[default]
    Normal,
}

/// Rotation applied on top of a matrix node, driven by time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spin {
    pub axis: Vec3,
    /// Radians per second.
    pub speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMatrix {
    pub matrix: Mat4,
    pub spin: Option<Spin>,
}

impl Default for NodeMatrix {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
            spin: None,
        }
    }
}

impl NodeMatrix {
    pub fn local_transform(&self, t: f64) -> Mat4 {
        match self.spin {
            Some(spin) => {
                let angle = (spin.speed as f64 * t) as f32;
                self.matrix * Mat4::from_quat(Quat::from_axis_angle(spin.axis.normalize_or_zero(), angle))
            }
            None => self.matrix,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeStaticMesh {
    /// `None` turns the node into a clear operation.
    pub mesh: Option<EntityId>,
    pub material: Option<EntityId>,
    pub clear: ClearBuffer,
    pub render_time: RenderTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Matrix(NodeMatrix),
    Camera(Camera),
    StaticMesh(NodeStaticMesh),
}

#[derive(Debug, Clone, PartialEq, LevelEntity)]
pub struct Node {
    pub parent: Option<String>,
    pub kind: NodeKind,
}

impl Node {
    pub fn matrix(matrix: NodeMatrix) -> Self {
        Self {
            parent: None,
            kind: NodeKind::Matrix(matrix),
        }
    }

    pub fn camera(camera: Camera) -> Self {
        Self {
            parent: None,
            kind: NodeKind::Camera(camera),
        }
    }

    pub fn static_mesh(mesh: NodeStaticMesh) -> Self {
        Self {
            parent: None,
            kind: NodeKind::StaticMesh(mesh),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Cameras and meshes only inherit, they add no transform of their
    /// own.
    pub fn local_transform(&self, t: f64) -> Mat4 {
        match &self.kind {
            NodeKind::Matrix(matrix) => matrix.local_transform(t),
            NodeKind::Camera(_) | NodeKind::StaticMesh(_) => Mat4::IDENTITY,
        }
    }
}

/// `parent_world * local`, walked up the parent chain of `node`.
pub fn world_transform(level: &Level, node: EntityId, t: f64) -> EngineResult<Mat4> {
    let mut visited = HashSet::new();
    let mut locals = Vec::new();
    let mut current = node;
    loop {
        if !visited.insert(current) {
            let name = level.name_of(current).unwrap_or_default();
            return Err(EngineError::CyclicParent(name.to_owned()));
        }
        let current_node = level.get::<Node>(current)?;
        locals.push(current_node.local_transform(t));
        match current_node.parent() {
            Some(parent) => current = level.require_id(EntityKind::Node, parent)?,
            None => break,
        }
    }
    Ok(locals
        .iter()
        .rev()
        .fold(Mat4::IDENTITY, |world, local| world * *local))
}
