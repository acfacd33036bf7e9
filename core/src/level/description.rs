//! Declarative description of a level and the loader that turns it into
//! GPU resources.

use glam::{IVec2, Mat4, UVec2};

use crate::{
    device::{ClearBuffer, GraphicsDevice},
    error::{EngineError, EngineResult},
    level::{EntityId, EntityKind, Level, LevelBuilder},
    resource::{
        create_static_mesh, Material, MeshData, PixelElementSize, PixelStructure, Primitive, Program, ProgramSource,
        Sampling, StaticMesh, Texture, TextureDesc, TextureKind, TextureSize,
    },
    scene::{Camera, Node, NodeKind, NodeMatrix, NodeStaticMesh, RenderTime, Spin},
};

pub const DEFAULT_QUAD: &str = "QuadMesh";
pub const DEFAULT_CUBE: &str = "CubeMesh";

#[derive(Debug, Clone)]
pub struct TextureDescription {
    pub name: String,
    /// Negative components divide the viewport.
    pub size: IVec2,
    pub element_size: PixelElementSize,
    pub structure: PixelStructure,
    pub cube_map: bool,
    pub mip_levels: u32,
    pub sampling: Sampling,
    pub pixels: Option<Vec<u8>>,
}

impl TextureDescription {
    pub fn new(name: impl Into<String>, size: IVec2, element_size: PixelElementSize, structure: PixelStructure) -> Self {
        Self {
            name: name.into(),
            size,
            element_size,
            structure,
            cube_map: false,
            mip_levels: 1,
            sampling: Sampling::default(),
            pixels: None,
        }
    }

    pub fn to_desc(&self, viewport: UVec2) -> EngineResult<TextureDesc> {
        let size = TextureSize(self.size).resolve(viewport)?;
        Ok(TextureDesc {
            size,
            element_size: self.element_size,
            structure: self.structure,
            kind: if self.cube_map {
                TextureKind::CubeMap
            } else {
                TextureKind::Flat
            },
            mip_levels: self.mip_levels.max(1),
            sampling: self.sampling,
            pixels: self.pixels.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProgramDescription {
    pub name: String,
    /// Stem of the `.vert`/`.frag` pair.
    pub shader: String,
    pub input_samplers: Vec<String>,
    pub output_texture_names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialDescription {
    pub name: String,
    pub program_name: String,
    pub texture_names: Vec<String>,
    /// Sampler slot of each entry in `texture_names`.
    pub inner_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MeshDescription {
    pub name: String,
    pub data: MeshData,
    pub primitive: String,
    pub clear_depth: bool,
}

#[derive(Debug, Clone)]
pub enum MeshReference {
    Quad,
    Cube,
    Named(String),
}

#[derive(Debug, Clone)]
pub enum NodeDescriptionKind {
    Matrix { matrix: Mat4, spin: Option<Spin> },
    Camera(Camera),
    StaticMesh {
        mesh: Option<MeshReference>,
        material: Option<String>,
        clear: ClearBuffer,
        render_time: RenderTime,
    },
}

#[derive(Debug, Clone)]
pub struct NodeDescription {
    pub name: String,
    pub parent: Option<String>,
    pub kind: NodeDescriptionKind,
}

#[derive(Debug, Clone, Default)]
pub struct LevelDescription {
    pub name: String,
    pub textures: Vec<TextureDescription>,
    pub programs: Vec<ProgramDescription>,
    pub materials: Vec<MaterialDescription>,
    pub meshes: Vec<MeshDescription>,
    pub nodes: Vec<NodeDescription>,
    pub default_camera_name: String,
    pub default_texture_name: String,
    pub default_environment_material: Option<String>,
    pub environment_model: Option<Mat4>,
}

/// Creates every resource `description` names and checks the result is
/// a complete level.
///
/// Negative texture sizes are resolved against `viewport`. A quad and a
/// cube are always added as [`DEFAULT_QUAD`] and [`DEFAULT_CUBE`].
pub fn load_level(
    device: &mut impl GraphicsDevice,
    description: &LevelDescription,
    viewport: UVec2,
) -> EngineResult<Level> {
    log::info!("Loading level \"{}\".", description.name);
    let mut builder = Level::builder();

    create_static_mesh(device, &mut builder, DEFAULT_QUAD, &MeshData::quad(), Primitive::Triangle)?;
    create_static_mesh(device, &mut builder, DEFAULT_CUBE, &MeshData::cube(), Primitive::Triangle)?;

    for texture in &description.textures {
        let desc = texture.to_desc(viewport)?;
        builder.add(&texture.name, Texture::create(device, &desc)?)?;
    }
    for program in &description.programs {
        load_program(device, &mut builder, program)?;
    }
    for material in &description.materials {
        load_material(&mut builder, material)?;
    }
    for mesh in &description.meshes {
        let primitive = mesh.primitive.parse::<Primitive>()?;
        let id = create_static_mesh(device, &mut builder, &mesh.name, &mesh.data, primitive)?;
        if mesh.clear_depth {
            builder.level.get_mut::<StaticMesh>(id)?.set_clear_depth(true);
        }
    }
    for node in &description.nodes {
        let loaded = load_node(&builder, node)?;
        builder.add(&node.name, loaded)?;
    }

    builder
        .default_camera(&description.default_camera_name)
        .default_output_texture(&description.default_texture_name)
        .default_quad(DEFAULT_QUAD)
        .default_cube(DEFAULT_CUBE);
    if let Some(environment) = &description.default_environment_material {
        builder.default_environment_material(environment);
    }
    if let Some(model) = description.environment_model {
        builder.environment_model(model);
    }
    builder.build()
}

fn load_program(
    device: &mut impl GraphicsDevice,
    builder: &mut LevelBuilder,
    description: &ProgramDescription,
) -> EngineResult<EntityId> {
    let outputs = description
        .output_texture_names
        .iter()
        .map(|name| builder.require_id(EntityKind::Texture, name))
        .collect::<EngineResult<Vec<_>>>()?;
    let program = Program::create(
        device,
        &ProgramSource::named(&description.shader),
        outputs,
        description.input_samplers.clone(),
    )?;
    builder.add(&description.name, program)
}

fn load_material(builder: &mut LevelBuilder, description: &MaterialDescription) -> EngineResult<EntityId> {
    if description.texture_names.len() != description.inner_names.len() {
        return Err(EngineError::Parse(format!(
            "material \"{}\" has {} textures but {} inner names",
            description.name,
            description.texture_names.len(),
            description.inner_names.len()
        )));
    }
    if description.program_name.is_empty() {
        return Err(EngineError::Parse(format!(
            "material \"{}\" has no program",
            description.name
        )));
    }

    let program = builder.require_id(EntityKind::Program, &description.program_name)?;
    let mut material = Material::new(program);
    for (texture, slot) in description
        .texture_names
        .iter()
        .zip(&description.inner_names)
    {
        material.add_texture(slot, builder.require_id(EntityKind::Texture, texture)?)?;
    }
    builder.add(&description.name, material)
}

fn load_node(builder: &LevelBuilder, description: &NodeDescription) -> EngineResult<Node> {
    let kind = match &description.kind {
        NodeDescriptionKind::Matrix { matrix, spin } => NodeKind::Matrix(NodeMatrix {
            matrix: *matrix,
            spin: *spin,
        }),
        NodeDescriptionKind::Camera(camera) => NodeKind::Camera(*camera),
        NodeDescriptionKind::StaticMesh {
            mesh,
            material,
            clear,
            render_time,
        } => {
            let mesh = match mesh {
                None => None,
                Some(MeshReference::Quad) => Some(builder.require_id(EntityKind::StaticMesh, DEFAULT_QUAD)?),
                Some(MeshReference::Cube) => Some(builder.require_id(EntityKind::StaticMesh, DEFAULT_CUBE)?),
                Some(MeshReference::Named(name)) => Some(builder.require_id(EntityKind::StaticMesh, name)?),
            };
            let material = material
                .as_deref()
                .map(|name| builder.require_id(EntityKind::Material, name))
                .transpose()?;
            NodeKind::StaticMesh(NodeStaticMesh {
                mesh,
                material,
                clear: *clear,
                render_time: *render_time,
            })
        }
    };
    Ok(Node {
        parent: description.parent.clone(),
        kind,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::record::RecordingDevice;

    fn description() -> LevelDescription {
        LevelDescription {
            name: "test".into(),
            textures: vec![
                TextureDescription::new("OutTexture", IVec2::new(-1, -1), PixelElementSize::Byte, PixelStructure::RgbAlpha),
                TextureDescription::new("Albedo", IVec2::new(4, 4), PixelElementSize::Byte, PixelStructure::Rgb),
            ],
            programs: vec![ProgramDescription {
                name: "SimpleProgram".into(),
                shader: "simple".into(),
                input_samplers: vec!["Color".into()],
                output_texture_names: vec!["OutTexture".into()],
            }],
            materials: vec![MaterialDescription {
                name: "SimpleMaterial".into(),
                program_name: "SimpleProgram".into(),
                texture_names: vec!["Albedo".into()],
                inner_names: vec!["Color".into()],
            }],
            meshes: vec![],
            nodes: vec![
                NodeDescription {
                    name: "Cam0".into(),
                    parent: None,
                    kind: NodeDescriptionKind::Camera(Camera::default()),
                },
                NodeDescription {
                    name: "Root".into(),
                    parent: None,
                    kind: NodeDescriptionKind::Matrix {
                        matrix: Mat4::IDENTITY,
                        spin: None,
                    },
                },
                NodeDescription {
                    name: "Quad".into(),
                    parent: Some("Root".into()),
                    kind: NodeDescriptionKind::StaticMesh {
                        mesh: Some(MeshReference::Quad),
                        material: Some("SimpleMaterial".into()),
                        clear: ClearBuffer::empty(),
                        render_time: RenderTime::Normal,
                    },
                },
            ],
            default_camera_name: "Cam0".into(),
            default_texture_name: "OutTexture".into(),
            default_environment_material: None,
            environment_model: None,
        }
    }

    #[test]
    fn test_load() {
        let mut device = RecordingDevice::new();
        let level = load_level(&mut device, &description(), UVec2::new(320, 200)).unwrap();

        let out = level.default_output_texture_id();
        assert_eq!(level.get::<Texture>(out).unwrap().size(), UVec2::new(320, 200));
        let quad = level.require_id(EntityKind::Node, "Quad").unwrap();
        let material = level.require_id(EntityKind::Material, "SimpleMaterial").unwrap();
        let pairs: Vec<_> = level.mesh_materials().collect();
        assert_eq!(pairs, vec![(quad, material, RenderTime::Normal)]);
    }

    #[test]
    fn test_material_name_counts_must_match() {
        let mut description = description();
        description.materials[0].inner_names.push("Extra".into());
        let mut device = RecordingDevice::new();
        assert!(matches!(
            load_level(&mut device, &description, UVec2::ONE),
            Err(EngineError::Parse(_))
        ));
    }

    #[test]
    fn test_material_needs_program() {
        let mut description = description();
        description.materials[0].program_name.clear();
        let mut device = RecordingDevice::new();
        assert!(matches!(
            load_level(&mut device, &description, UVec2::ONE),
            Err(EngineError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_primitive() {
        let mut description = description();
        description.meshes.push(MeshDescription {
            name: "Strip".into(),
            data: MeshData::quad(),
            primitive: "TRIANGLE_STRIP".into(),
            clear_depth: false,
        });
        let mut device = RecordingDevice::new();
        assert!(matches!(
            load_level(&mut device, &description, UVec2::ONE),
            Err(EngineError::UnsupportedPrimitive(_))
        ));
    }

    #[test]
    fn test_cyclic_parents_fail_load() {
        let mut description = description();
        description.nodes[1].parent = Some("Quad".into());
        let mut device = RecordingDevice::new();
        assert!(matches!(
            load_level(&mut device, &description, UVec2::ONE),
            Err(EngineError::CyclicParent(_))
        ));
    }

    #[test]
    fn test_missing_output_texture() {
        let mut description = description();
        description.programs[0].output_texture_names = vec!["Nope".into()];
        let mut device = RecordingDevice::new();
        assert!(matches!(
            load_level(&mut device, &description, UVec2::ONE),
            Err(EngineError::NameNotFound { .. })
        ));
    }
}
