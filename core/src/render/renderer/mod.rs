use glam::Mat4;

use crate::{
    device::{ClearBuffer, ColorAttachment, FrameTextureType, GpuHandle, GraphicsDevice, Viewport},
    error::{EngineError, EngineResult},
    level::{EntityId, Level},
    render::{framebuffer::FrameBuffer, uniform::Uniforms},
    resource::{Buffer, Material, Program, ProgramSource, StaticMesh, Texture, TextureKind},
    scene::{self, Node, NodeKind, RenderTime},
    util::cube::{self, CubeFace},
};

mod fill;

pub use fill::{FillPass, FillTarget};

pub const DISPLAY_PROGRAM: &str = "DisplayProgram";
pub const DISPLAY_MATERIAL: &str = "DisplayMaterial";
pub const DISPLAY_SLOT: &str = "Display";

/// Called right before a mesh is drawn, to adjust its uniforms or its
/// material. Material changes persist in the level.
pub type UniformCallback = Box<dyn FnMut(&mut Uniforms, &StaticMesh, &mut Material)>;

#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub viewport: Viewport,
    /// Shader pair the final image is presented with.
    pub display_program: String,
    pub depth_test: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(0, 0, 1280, 720),
            display_program: "display".into(),
            depth_test: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initialized,
}

/// What the current draw left bound, so it can be undone.
#[derive(Debug, Default)]
struct Bindings {
    framebuffer: bool,
    program: bool,
    vertex_array: bool,
    index_buffer: bool,
    textures: Vec<(u32, TextureKind)>,
}

pub struct Renderer<D: GraphicsDevice> {
    device: D,
    viewport: Viewport,
    frame_buffer: FrameBuffer,
    render_buffer: GpuHandle,
    display_program: EntityId,
    display_material: EntityId,
    phase: Phase,
    cube_face: Option<CubeFace>,
    /// Color attachments the last mesh draw left on `frame_buffer`.
    attached_outputs: usize,
    latest_time: f64,
    callback: UniformCallback,
    bindings: Bindings,
}

fn resolve_textures(level: &Level, ids: impl Iterator<Item = EntityId>) -> EngineResult<Vec<(EntityId, Texture)>> {
    ids.map(|id| level.get::<Texture>(id).map(|texture| (id, *texture)))
        .collect()
}

/// Attaches `outputs` in order, selects them as draw buffers and
/// leaves `frame_buffer` bound.
///
/// Cube map outputs are attached through `face`, or their first face when
/// there is none; flat outputs are attached whole.
fn attach_outputs(
    device: &mut impl GraphicsDevice,
    frame_buffer: &FrameBuffer,
    outputs: &[(EntityId, Texture)],
    face: Option<CubeFace>,
    mip: u32,
) -> EngineResult<()> {
    for (index, (_, texture)) in outputs.iter().enumerate() {
        let attachment = ColorAttachment::from_index(index)?;
        let target = match texture.kind() {
            TextureKind::CubeMap => FrameTextureType::CubeFace(face.unwrap_or(CubeFace::PositiveX)),
            TextureKind::Flat => FrameTextureType::Texture2D,
        };
        frame_buffer.attach_texture(device, texture, attachment, target, mip)?;
    }
    frame_buffer.draw_buffers(device, outputs.len());
    frame_buffer.bind(device);
    Ok(())
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Sets up the offscreen framebuffer and registers the display
    /// program and material in `level`.
    pub fn new(level: &mut Level, mut device: D, config: RendererConfig) -> EngineResult<Self> {
        let viewport = config.viewport;
        let frame_buffer = FrameBuffer::new(&mut device);
        let render_buffer = device.create_renderbuffer(viewport.size());
        frame_buffer.attach_depth_stencil(&mut device, render_buffer)?;
        device.set_depth_test(config.depth_test);

        let output = level.default_output_texture_id();
        level.get::<Texture>(output)?;
        let program = Program::create(
            &mut device,
            &ProgramSource::named(&config.display_program),
            Vec::new(),
            vec![DISPLAY_SLOT.to_owned()],
        )?;
        let display_program = level.add(DISPLAY_PROGRAM, program)?;
        let mut material = Material::new(display_program);
        material.add_texture(DISPLAY_SLOT, output)?;
        let display_material = level.add(DISPLAY_MATERIAL, material)?;

        log::info!(
            "Renderer ready, viewport {}x{}.",
            viewport.width,
            viewport.height
        );
        Ok(Self {
            device,
            viewport,
            frame_buffer,
            render_buffer,
            display_program,
            display_material,
            phase: Phase::Uninitialized,
            cube_face: None,
            attached_outputs: 0,
            latest_time: 0.,
            callback: Box::new(|_, _, _| {}),
            bindings: Bindings::default(),
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Releases the framebuffer and depth buffer and hands the device
    /// back.
    pub fn into_device(self) -> D {
        let Self {
            mut device,
            frame_buffer,
            render_buffer,
            ..
        } = self;
        frame_buffer.release(&mut device);
        device.delete_renderbuffer(render_buffer);
        log::info!("Renderer released.");
        device
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_callback(&mut self, callback: impl FnMut(&mut Uniforms, &StaticMesh, &mut Material) + 'static) {
        self.callback = Box::new(callback);
    }

    /// Selects the face cube map outputs are rendered into.
    pub fn set_cube_map_target(&mut self, face: Option<CubeFace>) {
        self.cube_face = face;
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == Phase::Initialized
    }

    pub fn set_depth_test(&mut self, enable: bool) {
        self.device.set_depth_test(enable);
    }

    /// Time passed to the most recent render call.
    pub fn latest_time(&self) -> f64 {
        self.latest_time
    }

    /// Draws a static mesh node with `material`.
    ///
    /// A node without a mesh only clears the buffers named by its clear
    /// flags.
    pub fn render_node(
        &mut self,
        level: &mut Level,
        node_id: EntityId,
        material_id: EntityId,
        projection: Mat4,
        view: Mat4,
        t: f64,
    ) -> EngineResult<()> {
        if node_id.is_null() {
            return Ok(());
        }
        self.latest_time = t;

        let node = level.get::<Node>(node_id)?;
        let NodeKind::StaticMesh(static_mesh) = node.kind() else {
            return Err(EngineError::UnexpectedNode {
                id: node_id,
                expected: "static mesh",
            });
        };

        let Some(mesh_id) = static_mesh.mesh else {
            let mut mask = ClearBuffer::empty();
            if static_mesh.clear.contains(ClearBuffer::COLOR) {
                mask |= ClearBuffer::COLOR;
            }
            if static_mesh.clear.contains(ClearBuffer::DEPTH) {
                mask |= ClearBuffer::DEPTH;
            }
            if !mask.is_empty() {
                self.frame_buffer.bind(&mut self.device);
                self.device.clear(mask);
                self.frame_buffer.unbind(&mut self.device);
            }
            return Ok(());
        };

        let model = scene::world_transform(level, node_id, t)?;
        if material_id.is_null() {
            return Err(EngineError::NoMaterial(node_id));
        }
        let mesh = *level.get::<StaticMesh>(mesh_id)?;
        self.render_mesh(level, &mesh, material_id, projection, view, model, t)
    }

    /// Draws `mesh` into the outputs of the material's program.
    ///
    /// Whatever happens, the device is left with nothing bound.
    #[allow(clippy::too_many_arguments)]
    pub fn render_mesh(
        &mut self,
        level: &mut Level,
        mesh: &StaticMesh,
        material_id: EntityId,
        projection: Mat4,
        view: Mat4,
        model: Mat4,
        t: f64,
    ) -> EngineResult<()> {
        self.latest_time = t;
        let uniforms = Uniforms::new(projection, view, model, level.environment_model(), t);
        let result = self.draw_mesh(level, mesh, material_id, uniforms);
        self.finish(level, material_id);
        if let Err(error) = &result {
            log::error!("Couldn't draw mesh with material {material_id}: {error}");
        }
        result
    }

    fn draw_mesh(&mut self, level: &mut Level, mesh: &StaticMesh, material_id: EntityId, mut uniforms: Uniforms) -> EngineResult<()> {
        self.frame_buffer.bind(&mut self.device);
        self.bindings.framebuffer = true;
        if mesh.clear_depth() {
            self.device.clear(ClearBuffer::DEPTH);
        }

        let program_id = level.get::<Material>(material_id)?.program_id();
        let program = level.get::<Program>(program_id)?.clone();
        if program.output_texture_ids().is_empty() {
            return Err(EngineError::NoProgramOutput(program_id));
        }
        (self.callback)(&mut uniforms, mesh, level.get_mut::<Material>(material_id)?);

        // The environment maps are drawn with, never stored in, the material.
        let mut material = level.get::<Material>(material_id)?.clone();
        if let Some(environment) = level.default_environment_material_id() {
            if environment != material_id {
                material.merge(level.get::<Material>(environment)?);
            }
        }
        material.check_samplers(&program)?;
        let inputs = resolve_textures(level, material.texture_ids())?;
        let outputs = resolve_textures(level, program.output_texture_ids().iter().copied())?;
        let index_buffer = level.get::<Buffer>(mesh.index_buffer_id())?.handle();

        self.use_program(&program, &uniforms);
        self.device.viewport(self.viewport);

        for index in outputs.len()..self.attached_outputs {
            let attachment = ColorAttachment::from_index(index)?;
            self.frame_buffer.detach_texture(&mut self.device, attachment);
        }
        self.attached_outputs = outputs.len();
        attach_outputs(&mut self.device, &self.frame_buffer, &outputs, self.cube_face, 0)?;
        self.bindings.framebuffer = true;

        self.bind_inputs(&program, &mut material, &inputs)?;
        self.draw_indexed(mesh, index_buffer)
    }

    /// Runs every registered mesh/material pair.
    ///
    /// Pre-render pairs are drawn into the six faces of their outputs on
    /// the first call only; normal pairs are drawn every call.
    pub fn render_all_meshes(&mut self, level: &mut Level, projection: Mat4, view: Mat4, t: f64) -> EngineResult<()> {
        self.latest_time = t;
        let first_frame = self.phase == Phase::Uninitialized;
        self.phase = Phase::Initialized;

        let pairs: Vec<_> = level.mesh_materials().collect();
        for (node_id, material_id, render_time) in pairs {
            match render_time {
                RenderTime::PreRender if first_frame => self.capture_cube_map(level, node_id, material_id, t)?,
                RenderTime::PreRender => {}
                RenderTime::Normal => self.render_node(level, node_id, material_id, projection, view, t)?,
            }
        }
        Ok(())
    }

    fn capture_cube_map(&mut self, level: &mut Level, node_id: EntityId, material_id: EntityId, t: f64) -> EngineResult<()> {
        let material = level.get::<Material>(material_id)?;
        let first = material
            .texture_ids()
            .next()
            .ok_or(EngineError::EmptyMaterial(material_id))?;
        let size = level.get::<Texture>(first)?.size();

        let saved_viewport = self.viewport;
        let saved_face = self.cube_face;
        self.viewport = Viewport::new(0, 0, (size.x / 2).max(1), (size.y / 2).max(1));
        log::info!(
            "Pre-rendering node {node_id} into cube map faces at {}x{}.",
            self.viewport.width,
            self.viewport.height
        );

        let projection = cube::cube_map_projection();
        let mut result = Ok(());
        for face in CubeFace::ALL {
            self.cube_face = Some(face);
            result = self.render_node(level, node_id, material_id, projection, face.view(), t);
            if result.is_err() {
                break;
            }
        }

        self.viewport = saved_viewport;
        self.cube_face = saved_face;
        result
    }

    /// Presents the default output texture on the default framebuffer.
    pub fn display(&mut self, level: &mut Level, t: f64) -> EngineResult<()> {
        self.latest_time = t;
        let material_id = self.display_material;
        let result = self.draw_display(level, t);
        self.finish(level, material_id);
        result
    }

    fn draw_display(&mut self, level: &mut Level, t: f64) -> EngineResult<()> {
        self.device.bind_framebuffer(None);
        self.device.viewport(self.viewport);
        self.device.clear(ClearBuffer::COLOR | ClearBuffer::DEPTH);

        let quad = *level.get::<StaticMesh>(level.default_quad_id())?;
        let index_buffer = level.get::<Buffer>(quad.index_buffer_id())?.handle();
        let program = level.get::<Program>(self.display_program)?.clone();
        let inputs = resolve_textures(level, level.get::<Material>(self.display_material)?.texture_ids())?;

        let mut uniforms = Uniforms::default();
        uniforms.time = t;
        self.use_program(&program, &uniforms);
        let material = level.get_mut::<Material>(self.display_material)?;
        self.bind_inputs(&program, material, &inputs)?;
        self.draw_indexed(&quad, index_buffer)
    }

    fn use_program(&mut self, program: &Program, uniforms: &Uniforms) {
        program.use_with(&mut self.device, uniforms);
        self.bindings.program = true;
    }

    /// Gives each input the next texture unit and points its sampler at
    /// it.
    fn bind_inputs(&mut self, program: &Program, material: &mut Material, inputs: &[(EntityId, Texture)]) -> EngineResult<()> {
        for (id, texture) in inputs {
            let (slot, unit) = material.enable_texture(*id)?;
            self.device.bind_texture(unit, texture.kind(), Some(texture.handle()));
            self.bindings.textures.push((unit, texture.kind()));
            self.device
                .set_uniform(program.handle(), slot, &(unit as i32).into());
        }
        Ok(())
    }

    fn draw_indexed(&mut self, mesh: &StaticMesh, index_buffer: GpuHandle) -> EngineResult<()> {
        self.device.bind_vertex_array(Some(mesh.vertex_array()));
        self.bindings.vertex_array = true;
        let count = mesh.index_count();
        if count == 0 {
            log::warn!("Skipping mesh without indices.");
            return Ok(());
        }
        self.device.bind_index_buffer(Some(index_buffer));
        self.bindings.index_buffer = true;
        self.device.draw_elements(mesh.primitive(), count);
        Ok(())
    }

    /// Undoes every binding of the last draw and frees the material's
    /// texture units.
    fn finish(&mut self, level: &mut Level, material_id: EntityId) {
        self.release_bindings();
        if let Ok(material) = level.get_mut::<Material>(material_id) {
            material.disable_all();
        }
    }

    fn release_bindings(&mut self) {
        let bindings = std::mem::take(&mut self.bindings);
        if bindings.index_buffer {
            self.device.bind_index_buffer(None);
        }
        if bindings.program {
            self.device.use_program(None);
        }
        if bindings.vertex_array {
            self.device.bind_vertex_array(None);
        }
        for (unit, kind) in bindings.textures {
            self.device.bind_texture(unit, kind, None);
        }
        if bindings.framebuffer {
            self.device.bind_framebuffer(None);
        }
    }
}
