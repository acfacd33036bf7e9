use lumen_derive::LevelEntity;

use crate::{
    device::{GpuHandle, GraphicsDevice},
    error::{EngineError, EngineResult},
    level::EntityId,
    render::uniform::Uniforms,
};

/// Upper bound on simultaneous render targets.
pub const MAX_OUTPUTS: usize = 8;

/// Shader stages a device links into a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub vertex: String,
    pub fragment: String,
}

impl ProgramSource {
    /// Sources for the `name.vert`/`name.frag` pair.
    pub fn named(name: &str) -> Self {
        Self {
            vertex: format!("{name}.vert"),
            fragment: format!("{name}.frag"),
        }
    }
}

/// A linked shader program with the samplers it reads and the textures
/// it renders into.
#[derive(Debug, Clone, PartialEq, LevelEntity)]
pub struct Program {
    handle: GpuHandle,
    outputs: Vec<EntityId>,
    samplers: Vec<String>,
}

impl Program {
    pub fn new(handle: GpuHandle, outputs: Vec<EntityId>, samplers: Vec<String>) -> EngineResult<Self> {
        if outputs.len() > MAX_OUTPUTS {
            return Err(EngineError::TooManyOutputs(outputs.len()));
        }
        Ok(Self {
            handle,
            outputs,
            samplers,
        })
    }

    pub fn create(
        device: &mut impl GraphicsDevice,
        source: &ProgramSource,
        outputs: Vec<EntityId>,
        samplers: Vec<String>,
    ) -> EngineResult<Self> {
        if outputs.len() > MAX_OUTPUTS {
            return Err(EngineError::TooManyOutputs(outputs.len()));
        }
        let handle = device.create_program(source)?;
        Self::new(handle, outputs, samplers)
    }

    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    pub fn output_texture_ids(&self) -> &[EntityId] {
        &self.outputs
    }

    pub fn samplers(&self) -> &[String] {
        &self.samplers
    }

    /// Activates the program and uploads every uniform.
    pub fn use_with(&self, device: &mut impl GraphicsDevice, uniforms: &Uniforms) {
        device.use_program(Some(self.handle));
        for (name, value) in uniforms.iter() {
            device.set_uniform(self.handle, name, &value);
        }
    }
}

#[cfg(test)]
mod test {
    use glam::Mat4;

    use super::*;
    use crate::{
        device::record::{Command, RecordingDevice},
        render::uniform::UniformValue,
    };

    #[test]
    fn test_output_limit() {
        let outputs: Vec<EntityId> = (0..9).map(|_| EntityId::NULL).collect();
        assert!(matches!(
            Program::new(GpuHandle(1), outputs, vec![]),
            Err(EngineError::TooManyOutputs(9))
        ));
    }

    #[test]
    fn test_use_uploads_uniforms() {
        let mut device = RecordingDevice::new();
        let program = Program::create(&mut device, &ProgramSource::named("simple"), vec![], vec![]).unwrap();
        device.take_commands();

        let mut uniforms = Uniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, 2.5);
        uniforms.set("roughness", 0.5f32);
        program.use_with(&mut device, &uniforms);

        let commands = device.take_commands();
        assert_eq!(commands[0], Command::UseProgram(Some(program.handle())));
        assert!(commands.contains(&Command::SetUniform {
            program: program.handle(),
            name: "time_s".into(),
            value: UniformValue::Float(2.5),
        }));
        assert!(commands.contains(&Command::SetUniform {
            program: program.handle(),
            name: "roughness".into(),
            value: UniformValue::Float(0.5),
        }));
    }
}
