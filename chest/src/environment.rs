//! Image based lighting precomputation.
//!
//! Turns one environment texture into the four maps a PBR material samples:
//! a base cube map, a roughness prefiltered cube map, an irradiance cube map
//! and a BRDF integration lookup texture. The maps are also drawn as a
//! skybox behind the scene.

use glam::UVec2;
use lumen_core::{
    device::{ClearBuffer, GraphicsDevice},
    error::{EngineError, EngineResult},
    level::{EntityId, EntityKind, Level},
    render::{FillPass, Renderer},
    resource::{
        create_static_mesh, Material, MeshData, PixelElementSize, PixelStructure, Primitive, Program, ProgramSource,
        StaticMesh, Texture, TextureDesc, TextureKind,
    },
    scene::{Node, NodeStaticMesh, RenderTime},
};

/// Sampler every bake pass reads its source through.
pub const ENVIRONMENT_SLOT: &str = "Environment";
pub const SKYBOX_SLOT: &str = "Skybox";
pub const ROUGHNESS_UNIFORM: &str = "roughness";
pub const ENVIRONMENT_MATERIAL: &str = "EnvironmentMaterial";
pub const SKYBOX_MESH: &str = "SkyboxMesh";
pub const SKYBOX_NODE: &str = "Skybox";
const CUBE_MAP_TEXTURE: &str = "EnvironmentCubeMap";
const IRRADIANCE_TEXTURE: &str = "Irradiance";

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    pub cube_size: u32,
    pub cube_element_size: PixelElementSize,
    pub prefilter_size: u32,
    pub prefilter_mip_levels: u32,
    pub irradiance_size: u32,
    pub brdf_lut_size: u32,
    /// Element size of the prefilter, irradiance and LUT textures.
    pub element_size: PixelElementSize,
    pub conversion_program: String,
    pub prefilter_program: String,
    pub irradiance_program: String,
    pub brdf_program: String,
    /// Draws the base cube map behind the scene.
    pub skybox_program: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            cube_size: 512,
            cube_element_size: PixelElementSize::Half,
            prefilter_size: 128,
            prefilter_mip_levels: 5,
            irradiance_size: 32,
            brdf_lut_size: 512,
            element_size: PixelElementSize::Float,
            conversion_program: "EquirectangularCubeMap".into(),
            prefilter_program: "MonteCarloPrefilter".into(),
            irradiance_program: "IrradianceCubeMap".into(),
            brdf_program: "IntegrateBRDF".into(),
            skybox_program: "CubeMapDeferred".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentSource {
    /// A flat latitude/longitude panorama, converted to a cube map first.
    Equirectangular(EntityId),
    /// Six faces already stacked in a cube map.
    CubeMap(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentMaps {
    pub cube_map: EntityId,
    pub prefilter: EntityId,
    pub irradiance: EntityId,
    pub brdf_lut: EntityId,
    pub material: EntityId,
    /// Static mesh node drawing the skybox.
    pub skybox: EntityId,
}

/// Roughness a prefilter mip level is convolved with, spread evenly over
/// `[0, 1]`.
pub fn roughness_for_mip(mip: u32, mip_levels: u32) -> f32 {
    if mip_levels <= 1 {
        return 0.;
    }
    mip as f32 / (mip_levels - 1) as f32
}

fn add_program<D: GraphicsDevice>(
    renderer: &mut Renderer<D>,
    level: &mut Level,
    name: &str,
    output: EntityId,
) -> EngineResult<EntityId> {
    let program = Program::create(
        renderer.device_mut(),
        &ProgramSource::named(name),
        vec![output],
        vec![ENVIRONMENT_SLOT.into()],
    )?;
    level.add(name, program)
}

fn add_texture<D: GraphicsDevice>(
    renderer: &mut Renderer<D>,
    level: &mut Level,
    name: &str,
    desc: &TextureDesc,
) -> EngineResult<EntityId> {
    let texture = Texture::create(renderer.device_mut(), desc)?;
    level.add(name, texture)
}

fn base_cube_map<D: GraphicsDevice>(
    renderer: &mut Renderer<D>,
    level: &mut Level,
    source: EnvironmentSource,
    config: &EnvironmentConfig,
) -> EngineResult<EntityId> {
    match source {
        EnvironmentSource::CubeMap(id) => {
            if !level.get::<Texture>(id)?.is_cube_map() {
                return Err(EngineError::TextureKindMismatch {
                    id,
                    expected: TextureKind::CubeMap,
                });
            }
            Ok(id)
        }
        EnvironmentSource::Equirectangular(id) => {
            if level.get::<Texture>(id)?.is_cube_map() {
                return Err(EngineError::TextureKindMismatch {
                    id,
                    expected: TextureKind::Flat,
                });
            }
            let desc = TextureDesc::cube_map(
                UVec2::splat(config.cube_size),
                config.cube_element_size,
                PixelStructure::RgbAlpha,
            );
            let mip_levels = desc.full_mip_chain();
            let desc = desc.with_mip_levels(mip_levels);
            let cube_map = add_texture(renderer, level, CUBE_MAP_TEXTURE, &desc)?;
            let program = add_program(renderer, level, &config.conversion_program, cube_map)?;

            log::info!("Converting equirectangular environment {id} to a cube map.");
            renderer.fill(level, &FillPass::cube_map(program).input(ENVIRONMENT_SLOT, id), |_, _| {})?;
            let handle = level.get::<Texture>(cube_map)?.handle();
            renderer.device_mut().generate_mipmap(TextureKind::CubeMap, handle);
            Ok(cube_map)
        }
    }
}

/// Every name a bake registers must still be free.
fn check_names_free(level: &Level, source: EnvironmentSource, config: &EnvironmentConfig) -> EngineResult<()> {
    let buffers: Vec<_> = ["position", "normal", "uv", "index"]
        .iter()
        .map(|part| format!("{SKYBOX_MESH}.{part}"))
        .collect();
    let mut names = vec![
        (EntityKind::Texture, config.prefilter_program.as_str()),
        (EntityKind::Texture, IRRADIANCE_TEXTURE),
        (EntityKind::Texture, config.brdf_program.as_str()),
        (EntityKind::Program, config.prefilter_program.as_str()),
        (EntityKind::Program, config.irradiance_program.as_str()),
        (EntityKind::Program, config.brdf_program.as_str()),
        (EntityKind::Program, config.skybox_program.as_str()),
        (EntityKind::Material, ENVIRONMENT_MATERIAL),
        (EntityKind::StaticMesh, SKYBOX_MESH),
        (EntityKind::Node, SKYBOX_NODE),
    ];
    if let EnvironmentSource::Equirectangular(_) = source {
        names.push((EntityKind::Texture, CUBE_MAP_TEXTURE));
        names.push((EntityKind::Program, config.conversion_program.as_str()));
    }
    names.extend(buffers.iter().map(|name| (EntityKind::Buffer, name.as_str())));

    match names
        .into_iter()
        .find(|(kind, name)| level.id_from_name_of(*kind, name).is_some())
    {
        Some((kind, name)) => Err(EngineError::DuplicateName {
            category: kind.as_str(),
            name: name.to_owned(),
        }),
        None => Ok(()),
    }
}

/// Adds the cube mesh and node drawing `material` behind everything else.
fn add_skybox<D: GraphicsDevice>(
    renderer: &mut Renderer<D>,
    level: &mut Level,
    material: EntityId,
) -> EngineResult<EntityId> {
    let mesh = create_static_mesh(
        renderer.device_mut(),
        level,
        SKYBOX_MESH,
        &MeshData::cube(),
        Primitive::Triangle,
    )?;
    level.get_mut::<StaticMesh>(mesh)?.set_clear_depth(true);
    level.add(
        SKYBOX_NODE,
        Node::static_mesh(NodeStaticMesh {
            mesh: Some(mesh),
            material: Some(material),
            clear: ClearBuffer::empty(),
            render_time: RenderTime::Normal,
        }),
    )
}

/// Runs the environment passes and registers the results in `level`.
///
/// The returned material holds every map under the slot name the PBR
/// programs sample it through, and becomes the level's default
/// environment material; every other material is drawn with its slots
/// added. A skybox node drawing it is registered as well.
///
/// On failure nothing is left registered in `level`. Names are checked
/// before any device work, so a clash fails without touching the device.
pub fn bake_environment<D: GraphicsDevice>(
    renderer: &mut Renderer<D>,
    level: &mut Level,
    source: EnvironmentSource,
    config: &EnvironmentConfig,
) -> EngineResult<EnvironmentMaps> {
    check_names_free(level, source, config)?;
    let savepoint = level.savepoint();
    let result = bake(renderer, level, source, config);
    if let Err(error) = &result {
        log::error!("Environment bake failed, discarding its resources: {error}");
        level.rollback(savepoint);
    }
    result
}

fn bake<D: GraphicsDevice>(
    renderer: &mut Renderer<D>,
    level: &mut Level,
    source: EnvironmentSource,
    config: &EnvironmentConfig,
) -> EngineResult<EnvironmentMaps> {
    let cube_map = base_cube_map(renderer, level, source, config)?;

    let prefilter_desc = TextureDesc::cube_map(
        UVec2::splat(config.prefilter_size),
        config.element_size,
        PixelStructure::RgbAlpha,
    )
    .with_mip_levels(config.prefilter_mip_levels);
    let prefilter = add_texture(renderer, level, &config.prefilter_program, &prefilter_desc)?;
    let program = add_program(renderer, level, &config.prefilter_program, prefilter)?;
    let mip_levels = prefilter_desc.mip_levels;
    log::info!("Prefiltering environment over {mip_levels} roughness levels.");
    renderer.fill(
        level,
        &FillPass::cube_map(program)
            .input(ENVIRONMENT_SLOT, cube_map)
            .mip_levels(mip_levels),
        |mip, uniforms| uniforms.set(ROUGHNESS_UNIFORM, roughness_for_mip(mip, mip_levels)),
    )?;

    let irradiance_desc = TextureDesc::cube_map(
        UVec2::splat(config.irradiance_size),
        config.element_size,
        PixelStructure::RgbAlpha,
    );
    let irradiance = add_texture(renderer, level, IRRADIANCE_TEXTURE, &irradiance_desc)?;
    let program = add_program(renderer, level, &config.irradiance_program, irradiance)?;
    log::info!("Convolving irradiance.");
    renderer.fill(
        level,
        &FillPass::cube_map(program).input(ENVIRONMENT_SLOT, cube_map),
        |_, _| {},
    )?;

    let lut_desc = TextureDesc::new(UVec2::splat(config.brdf_lut_size), config.element_size, PixelStructure::RgbAlpha);
    let brdf_lut = add_texture(renderer, level, &config.brdf_program, &lut_desc)?;
    let program = add_program(renderer, level, &config.brdf_program, brdf_lut)?;
    log::info!("Integrating BRDF lookup texture.");
    renderer.fill(level, &FillPass::flat(program).input(ENVIRONMENT_SLOT, cube_map), |_, _| {})?;

    let output = level.default_output_texture_id();
    let program = Program::create(
        renderer.device_mut(),
        &ProgramSource::named(&config.skybox_program),
        vec![output],
        vec![SKYBOX_SLOT.into()],
    )?;
    let program = level.add(&config.skybox_program, program)?;
    let mut material = Material::new(program);
    material.add_texture(SKYBOX_SLOT, cube_map)?;
    material.add_texture(ENVIRONMENT_SLOT, cube_map)?;
    material.add_texture("MonteCarloPrefilter", prefilter)?;
    material.add_texture(IRRADIANCE_TEXTURE, irradiance)?;
    material.add_texture("IntegrateBRDF", brdf_lut)?;
    let material = level.add(ENVIRONMENT_MATERIAL, material)?;
    let skybox = add_skybox(renderer, level, material)?;
    level.set_default_environment_material(material)?;

    Ok(EnvironmentMaps {
        cube_map,
        prefilter,
        irradiance,
        brdf_lut,
        material,
        skybox,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roughness_spacing() {
        let values: Vec<_> = (0..5).map(|mip| roughness_for_mip(mip, 5)).collect();
        assert_eq!(values, [0., 0.25, 0.5, 0.75, 1.]);
        assert_eq!(roughness_for_mip(0, 1), 0.);
    }

    #[test]
    fn test_default_config() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.cube_size, 512);
        assert_eq!(config.prefilter_mip_levels, 5);
        assert_eq!(config.irradiance_size, 32);
        assert_eq!(config.skybox_program, "CubeMapDeferred");
    }
}
