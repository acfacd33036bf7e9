//! Full-screen passes that fill a program's output textures, used to
//! precompute lookup textures and cube maps.

use super::{attach_outputs, resolve_textures, Renderer};
use crate::{
    device::{ClearBuffer, GpuHandle, GraphicsDevice, Viewport},
    error::{EngineError, EngineResult},
    level::{EntityId, Level},
    render::{framebuffer::FrameBuffer, uniform::Uniforms},
    resource::{Buffer, Material, Program, StaticMesh, Texture},
    util::cube::{self, CubeFace},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillTarget {
    /// Draws the default quad into flat outputs.
    Flat,
    /// Draws the default cube once per face into cube map outputs.
    CubeMap,
}

#[derive(Debug, Clone)]
pub struct FillPass {
    pub program: EntityId,
    pub inputs: Vec<(String, EntityId)>,
    pub target: FillTarget,
    pub mip_levels: u32,
}

impl FillPass {
    pub fn flat(program: EntityId) -> Self {
        Self {
            program,
            inputs: Vec::new(),
            target: FillTarget::Flat,
            mip_levels: 1,
        }
    }

    pub fn cube_map(program: EntityId) -> Self {
        Self {
            target: FillTarget::CubeMap,
            ..Self::flat(program)
        }
    }

    pub fn input(mut self, slot: impl Into<String>, texture: EntityId) -> Self {
        self.inputs.push((slot.into(), texture));
        self
    }

    pub fn mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }
}

struct FillDraw<'a> {
    frame_buffer: &'a FrameBuffer,
    program: &'a Program,
    outputs: &'a [(EntityId, Texture)],
    inputs: &'a [(EntityId, Texture)],
    mesh: StaticMesh,
    index_buffer: GpuHandle,
}

impl<D: GraphicsDevice> Renderer<D> {
    /// Renders `pass.program` into its outputs, once per mip level and
    /// per cube face for cube map targets.
    ///
    /// `per_mip` may add uniforms for each level before it is drawn. The
    /// pass uses a framebuffer of its own; the renderer's framebuffer and
    /// viewport are left untouched.
    pub fn fill(
        &mut self,
        level: &Level,
        pass: &FillPass,
        mut per_mip: impl FnMut(u32, &mut Uniforms),
    ) -> EngineResult<()> {
        let program = level.get::<Program>(pass.program)?.clone();
        if program.output_texture_ids().is_empty() {
            return Err(EngineError::NoProgramOutput(pass.program));
        }
        let outputs = resolve_textures(level, program.output_texture_ids().iter().copied())?;

        let mut material = Material::new(pass.program);
        for (slot, texture) in &pass.inputs {
            material.add_texture(slot.clone(), *texture)?;
        }
        material.check_samplers(&program)?;
        let inputs = resolve_textures(level, material.texture_ids())?;

        let mesh_id = match pass.target {
            FillTarget::Flat => level.default_quad_id(),
            FillTarget::CubeMap => level.default_cube_id(),
        };
        let mesh = *level.get::<StaticMesh>(mesh_id)?;
        let index_buffer = level.get::<Buffer>(mesh.index_buffer_id())?.handle();

        let base_size = outputs[0].1.size();
        let frame_buffer = FrameBuffer::new(&mut self.device);
        let render_buffer = self.device.create_renderbuffer(base_size);
        let draw = FillDraw {
            frame_buffer: &frame_buffer,
            program: &program,
            outputs: &outputs,
            inputs: &inputs,
            mesh,
            index_buffer,
        };

        let mut result = frame_buffer.attach_depth_stencil(&mut self.device, render_buffer);
        if result.is_ok() {
            log::debug!(
                "Filling program {} ({:?}, {} mips) at {}x{}.",
                pass.program,
                pass.target,
                pass.mip_levels,
                base_size.x,
                base_size.y
            );
            for mip in 0..pass.mip_levels.max(1) {
                let mut uniforms = Uniforms::default();
                per_mip(mip, &mut uniforms);
                result = self.fill_level(&draw, &mut material, pass.target, mip, uniforms);
                if result.is_err() {
                    break;
                }
            }
        }

        self.release_bindings();
        material.disable_all();
        frame_buffer.release(&mut self.device);
        self.device.delete_renderbuffer(render_buffer);
        result
    }

    fn fill_level(
        &mut self,
        draw: &FillDraw,
        material: &mut Material,
        target: FillTarget,
        mip: u32,
        mut uniforms: Uniforms,
    ) -> EngineResult<()> {
        let size = draw.outputs[0].1.mip_size(mip);
        self.device.viewport(Viewport::from_size(size));
        match target {
            FillTarget::Flat => self.fill_face(draw, material, None, mip, &uniforms),
            FillTarget::CubeMap => {
                uniforms.projection = cube::cube_map_projection();
                for face in CubeFace::ALL {
                    uniforms.view = face.view();
                    self.fill_face(draw, material, Some(face), mip, &uniforms)?;
                }
                Ok(())
            }
        }
    }

    fn fill_face(
        &mut self,
        draw: &FillDraw,
        material: &mut Material,
        face: Option<CubeFace>,
        mip: u32,
        uniforms: &Uniforms,
    ) -> EngineResult<()> {
        attach_outputs(&mut self.device, draw.frame_buffer, draw.outputs, face, mip)?;
        self.bindings.framebuffer = true;
        self.device.clear(ClearBuffer::COLOR | ClearBuffer::DEPTH);
        self.use_program(draw.program, uniforms);
        self.bind_inputs(draw.program, material, draw.inputs)?;
        self.draw_indexed(&draw.mesh, draw.index_buffer)?;
        self.release_bindings();
        material.disable_all();
        Ok(())
    }
}
