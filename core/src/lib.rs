use glam::Mat4;

use crate::{
    device::GraphicsDevice,
    error::EngineResult,
    level::{description::LevelDescription, Level},
    render::{Renderer, RendererConfig},
};

pub use glam;
pub use log;

pub mod device;
pub mod error;
pub mod level;
pub mod render;
pub mod resource;
pub mod scene;
pub mod util;

/// A loaded level and the renderer drawing it.
pub struct Engine<D: GraphicsDevice> {
    level: Level,
    renderer: Renderer<D>,
}

impl<D: GraphicsDevice> Engine<D> {
    /// Loads `description` onto `device` and prepares the renderer.
    pub fn startup(mut device: D, description: &LevelDescription, config: RendererConfig) -> EngineResult<Self> {
        let level = level::description::load_level(&mut device, description, config.viewport.size())?;
        Self::with_level(level, device, config)
    }

    pub fn with_level(mut level: Level, device: D, config: RendererConfig) -> EngineResult<Self> {
        let renderer = Renderer::new(&mut level, device, config)?;
        Ok(Self { level, renderer })
    }

    #[inline]
    pub fn level(&self) -> &Level {
        &self.level
    }

    #[inline]
    pub fn level_mut(&mut self) -> &mut Level {
        &mut self.level
    }

    #[inline]
    pub fn renderer(&self) -> &Renderer<D> {
        &self.renderer
    }

    #[inline]
    pub fn renderer_mut(&mut self) -> &mut Renderer<D> {
        &mut self.renderer
    }

    /// Both at once, for passes that need the renderer and the level.
    #[inline]
    pub fn split_mut(&mut self) -> (&mut Renderer<D>, &mut Level) {
        (&mut self.renderer, &mut self.level)
    }

    /// Projection and view of the default camera for the current
    /// viewport.
    pub fn camera_matrices(&self) -> EngineResult<(Mat4, Mat4)> {
        let camera = self.level.default_camera()?;
        Ok((camera.projection(self.renderer.viewport().size()), camera.view()))
    }

    pub fn render_all_meshes(&mut self, projection: Mat4, view: Mat4, t: f64) -> EngineResult<()> {
        self.renderer
            .render_all_meshes(&mut self.level, projection, view, t)
    }

    pub fn display(&mut self, t: f64) -> EngineResult<()> {
        self.renderer.display(&mut self.level, t)
    }

    /// One frame seen through the default camera.
    pub fn render_frame(&mut self, t: f64) -> EngineResult<()> {
        let (projection, view) = self.camera_matrices()?;
        self.render_all_meshes(projection, view, t)?;
        self.display(t)
    }

    pub fn set_depth_test(&mut self, enable: bool) {
        self.renderer.set_depth_test(enable);
    }

    pub fn latest_time(&self) -> f64 {
        self.renderer.latest_time()
    }

    /// Drops the level and returns the device with the renderer's own
    /// objects released.
    pub fn shutdown(self) -> D {
        self.renderer.into_device()
    }
}
