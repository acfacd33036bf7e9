use crate::{
    device::{ColorAttachment, FrameTextureType, GpuHandle, GraphicsDevice},
    error::{EngineError, EngineResult},
    resource::{Texture, TextureKind, MAX_OUTPUTS},
};

/// An offscreen framebuffer.
///
/// Every operation binds it, does its work and unbinds again, so no
/// call leaves it bound behind the caller's back. Attach operations
/// check completeness right away.
#[derive(Debug)]
pub struct FrameBuffer {
    handle: GpuHandle,
}

impl FrameBuffer {
    pub fn new(device: &mut impl GraphicsDevice) -> Self {
        Self {
            handle: device.create_framebuffer(),
        }
    }

    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    pub fn bind(&self, device: &mut impl GraphicsDevice) {
        device.bind_framebuffer(Some(self.handle));
    }

    pub fn unbind(&self, device: &mut impl GraphicsDevice) {
        device.bind_framebuffer(None);
    }

    pub fn release(self, device: &mut impl GraphicsDevice) {
        device.delete_framebuffer(self.handle);
    }

    pub fn attach_depth_stencil(&self, device: &mut impl GraphicsDevice, render_buffer: GpuHandle) -> EngineResult<()> {
        self.bind(device);
        device.attach_depth_stencil(Some(render_buffer));
        let result = self.check_bound(device, "attaching depth stencil");
        self.unbind(device);
        result
    }

    /// Attaches mip `mip` of `texture` (or one of its cube faces) to
    /// `attachment`.
    pub fn attach_texture(
        &self,
        device: &mut impl GraphicsDevice,
        texture: &Texture,
        attachment: ColorAttachment,
        target: FrameTextureType,
        mip: u32,
    ) -> EngineResult<()> {
        let kind_ok = matches!(
            (texture.kind(), target),
            (TextureKind::Flat, FrameTextureType::Texture2D) | (TextureKind::CubeMap, FrameTextureType::CubeFace(_))
        );
        if !kind_ok || mip >= texture.mip_levels() {
            return Err(EngineError::AttachmentMismatch {
                texture: texture.handle(),
                target,
                mip,
            });
        }

        self.bind(device);
        device.attach_texture(attachment, target, texture.handle(), mip);
        let result = self.check_bound(device, "attaching texture");
        self.unbind(device);
        result
    }

    pub fn detach_texture(&self, device: &mut impl GraphicsDevice, attachment: ColorAttachment) {
        self.bind(device);
        device.detach_texture(attachment);
        self.unbind(device);
    }

    /// Enables the first `count` color attachments as draw targets.
    ///
    /// # Panics
    ///
    /// If `count` is 0 or more than 8.
    pub fn draw_buffers(&self, device: &mut impl GraphicsDevice, count: usize) {
        assert!(
            (1..=MAX_OUTPUTS).contains(&count),
            "draw buffer count must be in 1..=8, got {count}"
        );
        self.bind(device);
        device.draw_buffers(&ColorAttachment::ALL[..count]);
        self.unbind(device);
    }

    pub fn check(&self, device: &mut impl GraphicsDevice, operation: &'static str) -> EngineResult<()> {
        self.bind(device);
        let result = self.check_bound(device, operation);
        self.unbind(device);
        result
    }

    fn check_bound(&self, device: &mut impl GraphicsDevice, operation: &'static str) -> EngineResult<()> {
        let status = device.framebuffer_status();
        if status.is_complete() {
            Ok(())
        } else {
            log::error!("Frame buffer {:?} incomplete after {operation}: {status}.", self.handle);
            Err(EngineError::IncompleteFramebuffer { operation, status })
        }
    }
}
