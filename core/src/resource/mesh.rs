use std::str::FromStr;

use glam::{Vec2, Vec3};
use lumen_derive::LevelEntity;

use crate::{
    device::{GpuHandle, GraphicsDevice, VertexAttribute},
    error::{EngineError, EngineResult},
    level::{EntityId, EntityStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangle,
    Point,
    Line,
}

impl FromStr for Primitive {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRIANGLE" | "TRIANGLES" => Ok(Primitive::Triangle),
            "POINT" | "POINTS" => Ok(Primitive::Point),
            "LINE" | "LINES" => Ok(Primitive::Line),
            _ => Err(EngineError::UnsupportedPrimitive(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, LevelEntity)]
pub struct Buffer {
    handle: GpuHandle,
    kind: BufferKind,
    size: usize,
}

impl Buffer {
    pub fn create(device: &mut impl GraphicsDevice, kind: BufferKind, data: &[u8]) -> Self {
        Self {
            handle: device.create_buffer(kind, data),
            kind,
            size: data.len(),
        }
    }

    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Indexed geometry ready to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, LevelEntity)]
pub struct StaticMesh {
    vertex_array: GpuHandle,
    index_buffer: EntityId,
    index_size: usize,
    primitive: Primitive,
    clear_depth: bool,
}

impl StaticMesh {
    pub fn new(vertex_array: GpuHandle, index_buffer: EntityId, index_size: usize, primitive: Primitive) -> Self {
        Self {
            vertex_array,
            index_buffer,
            index_size,
            primitive,
            clear_depth: false,
        }
    }

    pub fn vertex_array(&self) -> GpuHandle {
        self.vertex_array
    }

    pub fn index_buffer_id(&self) -> EntityId {
        self.index_buffer
    }

    /// Indices are `u32`.
    pub fn index_count(&self) -> usize {
        self.index_size / std::mem::size_of::<u32>()
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn clear_depth(&self) -> bool {
        self.clear_depth
    }

    pub fn set_clear_depth(&mut self, clear_depth: bool) {
        self.clear_depth = clear_depth;
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Two triangles covering clip space.
    pub fn quad() -> Self {
        Self {
            positions: vec![
                Vec3::new(-1.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
            uvs: vec![
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
            ],
            indices: vec![0, 1, 2, 1, 3, 2],
        }
    }

    /// Unit cube centered on the origin, four vertices per face so
    /// normals stay flat.
    pub fn cube() -> Self {
        let mut data = Self::default();
        let faces = [
            (Vec3::X, Vec3::Y),
            (Vec3::NEG_X, Vec3::Y),
            (Vec3::Y, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::Z),
            (Vec3::Z, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y),
        ];
        for (normal, up) in faces {
            let right = up.cross(normal);
            let base = data.positions.len() as u32;
            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let corner = normal + right * (u * 2.0 - 1.0) + up * (v * 2.0 - 1.0);
                data.positions.push(corner);
                data.normals.push(normal);
                data.uvs.push(Vec2::new(u, v));
            }
            data.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        data
    }
}

/// Uploads `data` and stores its buffers and the resulting mesh under
/// `name`, `name.position`, `name.normal`, `name.uv` and `name.index`.
pub fn create_static_mesh(
    device: &mut impl GraphicsDevice,
    store: &mut impl EntityStore,
    name: &str,
    data: &MeshData,
    primitive: Primitive,
) -> EngineResult<EntityId> {
    let positions = Buffer::create(device, BufferKind::Vertex, bytemuck::cast_slice(&data.positions));
    let normals = Buffer::create(device, BufferKind::Vertex, bytemuck::cast_slice(&data.normals));
    let uvs = Buffer::create(device, BufferKind::Vertex, bytemuck::cast_slice(&data.uvs));
    let indices = Buffer::create(device, BufferKind::Index, bytemuck::cast_slice(&data.indices));

    let vertex_array = device.create_vertex_array(&[
        VertexAttribute {
            location: 0,
            buffer: positions.handle(),
            components: 3,
        },
        VertexAttribute {
            location: 1,
            buffer: normals.handle(),
            components: 3,
        },
        VertexAttribute {
            location: 2,
            buffer: uvs.handle(),
            components: 2,
        },
    ]);

    store.store(format!("{name}.position"), positions)?;
    store.store(format!("{name}.normal"), normals)?;
    store.store(format!("{name}.uv"), uvs)?;
    let index_buffer = store.store(format!("{name}.index"), indices)?;

    let mesh = StaticMesh::new(vertex_array, index_buffer, indices.size(), primitive);
    store.store(name, mesh)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_primitive_names() {
        assert_eq!("triangle".parse::<Primitive>().unwrap(), Primitive::Triangle);
        assert_eq!("LINES".parse::<Primitive>().unwrap(), Primitive::Line);
        assert!(matches!(
            "QUAD".parse::<Primitive>(),
            Err(EngineError::UnsupportedPrimitive(p)) if p == "QUAD"
        ));
    }

    #[test]
    fn test_default_geometry() {
        let quad = MeshData::quad();
        assert_eq!(quad.indices.len(), 6);

        let cube = MeshData::cube();
        assert_eq!(cube.positions.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube
            .positions
            .iter()
            .all(|p| p.abs().max_element() == 1.0));
    }

    #[test]
    fn test_index_count() {
        let mesh = StaticMesh::new(GpuHandle(1), EntityId::NULL, 36 * 4, Primitive::Triangle);
        assert_eq!(mesh.index_count(), 36);
    }
}
