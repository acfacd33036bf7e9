pub mod framebuffer;
pub mod renderer;
pub mod uniform;

pub use framebuffer::FrameBuffer;
pub use renderer::{FillPass, FillTarget, Renderer, RendererConfig, UniformCallback};
pub use uniform::{UniformValue, Uniforms};
