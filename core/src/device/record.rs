//! A [`GraphicsDevice`] that draws nothing and logs every call.
//!
//! It tracks enough state to answer framebuffer completeness queries the
//! way a driver would, which is what headless tests need.

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::UVec2;

use super::{
    ClearBuffer, ColorAttachment, FrameTextureType, FramebufferStatus, GpuHandle, GraphicsDevice,
    VertexAttribute, Viewport,
};
use crate::{
    error::{EngineError, EngineResult},
    render::uniform::UniformValue,
    resource::{BufferKind, Primitive, ProgramSource, TextureDesc, TextureKind},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateTexture {
        texture: GpuHandle,
        kind: TextureKind,
        size: UVec2,
        mip_levels: u32,
    },
    GenerateMipmap(GpuHandle),
    BindTexture {
        unit: u32,
        kind: TextureKind,
        texture: Option<GpuHandle>,
    },
    CreateProgram {
        program: GpuHandle,
        vertex: String,
        fragment: String,
    },
    UseProgram(Option<GpuHandle>),
    SetUniform {
        program: GpuHandle,
        name: String,
        value: UniformValue,
    },
    CreateBuffer {
        buffer: GpuHandle,
        kind: BufferKind,
        len: usize,
    },
    CreateVertexArray(GpuHandle),
    BindVertexArray(Option<GpuHandle>),
    BindIndexBuffer(Option<GpuHandle>),
    DrawElements {
        primitive: Primitive,
        count: usize,
    },
    CreateFramebuffer(GpuHandle),
    DeleteFramebuffer(GpuHandle),
    BindFramebuffer(Option<GpuHandle>),
    AttachTexture {
        attachment: ColorAttachment,
        target: FrameTextureType,
        texture: GpuHandle,
        mip: u32,
    },
    DetachTexture(ColorAttachment),
    DrawBuffers(Vec<ColorAttachment>),
    CreateRenderbuffer(GpuHandle),
    DeleteRenderbuffer(GpuHandle),
    AttachDepthStencil(Option<GpuHandle>),
    Viewport(Viewport),
    Clear(ClearBuffer),
    DepthTest(bool),
}

#[derive(Debug, Default)]
struct FramebufferState {
    colors: BTreeMap<ColorAttachment, (GpuHandle, FrameTextureType, u32)>,
    depth_stencil: Option<GpuHandle>,
    draw_buffers: Vec<ColorAttachment>,
}

#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<Command>,
    next_handle: u32,
    textures: HashMap<GpuHandle, (TextureKind, u32)>,
    framebuffers: HashMap<GpuHandle, FramebufferState>,
    bound_framebuffer: Option<GpuHandle>,
    forced_status: Option<FramebufferStatus>,
    rejected_programs: HashSet<String>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawElements { .. }))
            .count()
    }

    /// Makes every following status query report `status`, or restores
    /// the emulated answer with `None`.
    pub fn force_status(&mut self, status: Option<FramebufferStatus>) {
        self.forced_status = status;
    }

    /// Makes program creation fail for sources whose vertex stage is
    /// `vertex`.
    pub fn reject_program(&mut self, vertex: impl Into<String>) {
        self.rejected_programs.insert(vertex.into());
    }

    pub fn bound_framebuffer(&self) -> Option<GpuHandle> {
        self.bound_framebuffer
    }

    fn handle(&mut self) -> GpuHandle {
        self.next_handle += 1;
        GpuHandle(self.next_handle)
    }

    fn bound_state(&mut self) -> Option<&mut FramebufferState> {
        let bound = self.bound_framebuffer?;
        self.framebuffers.get_mut(&bound)
    }

    fn emulated_status(&self) -> FramebufferStatus {
        let Some(state) = self
            .bound_framebuffer
            .and_then(|bound| self.framebuffers.get(&bound))
        else {
            return FramebufferStatus::Complete;
        };

        if state.colors.is_empty() && state.depth_stencil.is_none() {
            return FramebufferStatus::IncompleteMissingAttachment;
        }

        let attachment_ok = |(texture, target, mip): &(GpuHandle, FrameTextureType, u32)| {
            match self.textures.get(texture) {
                Some((kind, levels)) => {
                    let kind_ok = matches!(
                        (kind, target),
                        (TextureKind::Flat, FrameTextureType::Texture2D)
                            | (TextureKind::CubeMap, FrameTextureType::CubeFace(_))
                    );
                    kind_ok && mip < levels
                }
                None => false,
            }
        };
        if !state.colors.values().all(attachment_ok) {
            return FramebufferStatus::IncompleteAttachment;
        }

        if state
            .draw_buffers
            .iter()
            .any(|attachment| !state.colors.contains_key(attachment))
        {
            return FramebufferStatus::IncompleteDrawBuffer;
        }

        FramebufferStatus::Complete
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> EngineResult<GpuHandle> {
        let texture = self.handle();
        self.textures.insert(texture, (desc.kind, desc.mip_levels.max(1)));
        self.commands.push(Command::CreateTexture {
            texture,
            kind: desc.kind,
            size: desc.size,
            mip_levels: desc.mip_levels,
        });
        Ok(texture)
    }

    fn generate_mipmap(&mut self, _kind: TextureKind, texture: GpuHandle) {
        self.commands.push(Command::GenerateMipmap(texture));
    }

    fn bind_texture(&mut self, unit: u32, kind: TextureKind, texture: Option<GpuHandle>) {
        self.commands.push(Command::BindTexture { unit, kind, texture });
    }

    fn create_program(&mut self, source: &ProgramSource) -> EngineResult<GpuHandle> {
        if self.rejected_programs.contains(&source.vertex) {
            return Err(EngineError::Device(format!(
                "couldn't link program {}",
                source.vertex
            )));
        }
        let program = self.handle();
        self.commands.push(Command::CreateProgram {
            program,
            vertex: source.vertex.clone(),
            fragment: source.fragment.clone(),
        });
        Ok(program)
    }

    fn use_program(&mut self, program: Option<GpuHandle>) {
        self.commands.push(Command::UseProgram(program));
    }

    fn set_uniform(&mut self, program: GpuHandle, name: &str, value: &UniformValue) {
        self.commands.push(Command::SetUniform {
            program,
            name: name.to_owned(),
            value: *value,
        });
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> GpuHandle {
        let buffer = self.handle();
        self.commands.push(Command::CreateBuffer {
            buffer,
            kind,
            len: data.len(),
        });
        buffer
    }

    fn create_vertex_array(&mut self, _attributes: &[VertexAttribute]) -> GpuHandle {
        let vertex_array = self.handle();
        self.commands.push(Command::CreateVertexArray(vertex_array));
        vertex_array
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<GpuHandle>) {
        self.commands.push(Command::BindVertexArray(vertex_array));
    }

    fn bind_index_buffer(&mut self, buffer: Option<GpuHandle>) {
        self.commands.push(Command::BindIndexBuffer(buffer));
    }

    fn draw_elements(&mut self, primitive: Primitive, count: usize) {
        self.commands.push(Command::DrawElements { primitive, count });
    }

    fn create_framebuffer(&mut self) -> GpuHandle {
        let framebuffer = self.handle();
        self.framebuffers.insert(framebuffer, FramebufferState::default());
        self.commands.push(Command::CreateFramebuffer(framebuffer));
        framebuffer
    }

    fn delete_framebuffer(&mut self, framebuffer: GpuHandle) {
        self.framebuffers.remove(&framebuffer);
        if self.bound_framebuffer == Some(framebuffer) {
            self.bound_framebuffer = None;
        }
        self.commands.push(Command::DeleteFramebuffer(framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<GpuHandle>) {
        self.bound_framebuffer = framebuffer;
        self.commands.push(Command::BindFramebuffer(framebuffer));
    }

    fn attach_texture(&mut self, attachment: ColorAttachment, target: FrameTextureType, texture: GpuHandle, mip: u32) {
        if let Some(state) = self.bound_state() {
            state.colors.insert(attachment, (texture, target, mip));
        }
        self.commands.push(Command::AttachTexture {
            attachment,
            target,
            texture,
            mip,
        });
    }

    fn detach_texture(&mut self, attachment: ColorAttachment) {
        if let Some(state) = self.bound_state() {
            state.colors.remove(&attachment);
        }
        self.commands.push(Command::DetachTexture(attachment));
    }

    fn draw_buffers(&mut self, attachments: &[ColorAttachment]) {
        if let Some(state) = self.bound_state() {
            state.draw_buffers = attachments.to_vec();
        }
        self.commands.push(Command::DrawBuffers(attachments.to_vec()));
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        self.forced_status.unwrap_or_else(|| self.emulated_status())
    }

    fn create_renderbuffer(&mut self, _size: UVec2) -> GpuHandle {
        let renderbuffer = self.handle();
        self.commands.push(Command::CreateRenderbuffer(renderbuffer));
        renderbuffer
    }

    fn delete_renderbuffer(&mut self, renderbuffer: GpuHandle) {
        self.commands.push(Command::DeleteRenderbuffer(renderbuffer));
    }

    fn attach_depth_stencil(&mut self, renderbuffer: Option<GpuHandle>) {
        if let Some(state) = self.bound_state() {
            state.depth_stencil = renderbuffer;
        }
        self.commands.push(Command::AttachDepthStencil(renderbuffer));
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::Viewport(viewport));
    }

    fn clear(&mut self, buffers: ClearBuffer) {
        self.commands.push(Command::Clear(buffers));
    }

    fn set_depth_test(&mut self, enable: bool) {
        self.commands.push(Command::DepthTest(enable));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resource::{PixelElementSize, PixelStructure};

    #[test]
    fn test_emulated_completeness() {
        let mut device = RecordingDevice::new();
        assert_eq!(device.framebuffer_status(), FramebufferStatus::Complete);

        let framebuffer = device.create_framebuffer();
        device.bind_framebuffer(Some(framebuffer));
        assert_eq!(
            device.framebuffer_status(),
            FramebufferStatus::IncompleteMissingAttachment
        );

        let desc = TextureDesc::new(UVec2::new(8, 8), PixelElementSize::Float, PixelStructure::RgbAlpha);
        let texture = device.create_texture(&desc).unwrap();
        device.attach_texture(ColorAttachment::Color0, FrameTextureType::Texture2D, texture, 0);
        assert_eq!(device.framebuffer_status(), FramebufferStatus::Complete);

        device.draw_buffers(&[ColorAttachment::Color0, ColorAttachment::Color1]);
        assert_eq!(
            device.framebuffer_status(),
            FramebufferStatus::IncompleteDrawBuffer
        );

        device.draw_buffers(&[ColorAttachment::Color0]);
        device.attach_texture(ColorAttachment::Color0, FrameTextureType::Texture2D, texture, 3);
        assert_eq!(
            device.framebuffer_status(),
            FramebufferStatus::IncompleteAttachment
        );
    }

    #[test]
    fn test_forced_status() {
        let mut device = RecordingDevice::new();
        device.force_status(Some(FramebufferStatus::Unsupported));
        assert_eq!(device.framebuffer_status(), FramebufferStatus::Unsupported);
        device.force_status(None);
        assert_eq!(device.framebuffer_status(), FramebufferStatus::Complete);
    }
}
