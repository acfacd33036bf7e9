//! The thin capability layer between the engine and a graphics API.
//!
//! Everything the renderer does to the GPU goes through
//! [`GraphicsDevice`]. Binding calls take `None` to restore the neutral
//! state.

use std::fmt;

use bitflags::bitflags;
use glam::UVec2;

use crate::{
    error::{EngineError, EngineResult},
    render::uniform::UniformValue,
    resource::{BufferKind, Primitive, ProgramSource, TextureDesc, TextureKind},
    util::cube::CubeFace,
};

pub mod record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuHandle(pub u32);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClearBuffer: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorAttachment {
    Color0,
    Color1,
    Color2,
    Color3,
    Color4,
    Color5,
    Color6,
    Color7,
}

impl ColorAttachment {
    pub const ALL: [ColorAttachment; 8] = [
        ColorAttachment::Color0,
        ColorAttachment::Color1,
        ColorAttachment::Color2,
        ColorAttachment::Color3,
        ColorAttachment::Color4,
        ColorAttachment::Color5,
        ColorAttachment::Color6,
        ColorAttachment::Color7,
    ];

    pub fn from_index(index: usize) -> EngineResult<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(EngineError::InvalidColorAttachment(index))
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// What part of a texture a color attachment points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTextureType {
    Texture2D,
    CubeFace(CubeFace),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    Undefined,
    IncompleteAttachment,
    IncompleteMissingAttachment,
    IncompleteDrawBuffer,
    IncompleteReadBuffer,
    Unsupported,
    IncompleteMultisample,
    IncompleteLayerTargets,
    Unknown(u32),
}

impl FramebufferStatus {
    pub fn is_complete(self) -> bool {
        self == FramebufferStatus::Complete
    }
}

impl fmt::Display for FramebufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.write_str("framebuffer complete"),
            Self::Undefined => f.write_str("framebuffer undefined"),
            Self::IncompleteAttachment => f.write_str("framebuffer incomplete attachment"),
            Self::IncompleteMissingAttachment => f.write_str("framebuffer incomplete missing attachment"),
            Self::IncompleteDrawBuffer => f.write_str("framebuffer incomplete draw buffer"),
            Self::IncompleteReadBuffer => f.write_str("framebuffer incomplete read buffer"),
            Self::Unsupported => f.write_str("framebuffer unsupported"),
            Self::IncompleteMultisample => f.write_str("framebuffer incomplete multisample"),
            Self::IncompleteLayerTargets => f.write_str("framebuffer incomplete layer targets"),
            Self::Unknown(code) => write!(f, "unknown framebuffer status {code:#x}"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_size(size: UVec2) -> Self {
        Self::new(0, 0, size.x, size.y)
    }

    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub buffer: GpuHandle,
    pub components: u32,
}

pub trait GraphicsDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> EngineResult<GpuHandle>;
    fn generate_mipmap(&mut self, kind: TextureKind, texture: GpuHandle);
    fn bind_texture(&mut self, unit: u32, kind: TextureKind, texture: Option<GpuHandle>);

    fn create_program(&mut self, source: &ProgramSource) -> EngineResult<GpuHandle>;
    fn use_program(&mut self, program: Option<GpuHandle>);
    fn set_uniform(&mut self, program: GpuHandle, name: &str, value: &UniformValue);

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> GpuHandle;
    fn create_vertex_array(&mut self, attributes: &[VertexAttribute]) -> GpuHandle;
    fn bind_vertex_array(&mut self, vertex_array: Option<GpuHandle>);
    fn bind_index_buffer(&mut self, buffer: Option<GpuHandle>);
    fn draw_elements(&mut self, primitive: Primitive, count: usize);

    fn create_framebuffer(&mut self) -> GpuHandle;
    fn delete_framebuffer(&mut self, framebuffer: GpuHandle);
    fn bind_framebuffer(&mut self, framebuffer: Option<GpuHandle>);
    fn attach_texture(&mut self, attachment: ColorAttachment, target: FrameTextureType, texture: GpuHandle, mip: u32);
    fn detach_texture(&mut self, attachment: ColorAttachment);
    fn draw_buffers(&mut self, attachments: &[ColorAttachment]);
    fn framebuffer_status(&mut self) -> FramebufferStatus;

    fn create_renderbuffer(&mut self, size: UVec2) -> GpuHandle;
    fn delete_renderbuffer(&mut self, renderbuffer: GpuHandle);
    fn attach_depth_stencil(&mut self, renderbuffer: Option<GpuHandle>);

    fn viewport(&mut self, viewport: Viewport);
    fn clear(&mut self, buffers: ClearBuffer);
    fn set_depth_test(&mut self, enable: bool);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_color_attachment_range() {
        assert_eq!(ColorAttachment::from_index(7).unwrap(), ColorAttachment::Color7);
        assert_eq!(ColorAttachment::Color3.index(), 3);
        assert!(matches!(
            ColorAttachment::from_index(8),
            Err(EngineError::InvalidColorAttachment(8))
        ));
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            FramebufferStatus::IncompleteMissingAttachment.to_string(),
            "framebuffer incomplete missing attachment"
        );
        assert!(FramebufferStatus::Complete.is_complete());
        assert!(!FramebufferStatus::Unknown(3).is_complete());
    }
}
