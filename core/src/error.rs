use thiserror::Error;

use crate::{
    device::{FrameTextureType, FramebufferStatus, GpuHandle},
    level::{EntityId, EntityKind},
    resource::TextureKind,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No entity with id {0}.")]
    NotFound(EntityId),
    #[error("No {kind} named \"{name}\".")]
    NameNotFound { kind: &'static str, name: String },
    #[error("Entity {id} is a {found}, expected a {expected}.")]
    TypeMismatch {
        id: EntityId,
        expected: EntityKind,
        found: EntityKind,
    },
    #[error("Node {id} is not a {expected} node.")]
    UnexpectedNode { id: EntityId, expected: &'static str },
    #[error("Duplicate {category} name \"{name}\".")]
    DuplicateName { category: &'static str, name: String },
    #[error("Missing default {0}.")]
    MissingDefaultResource(&'static str),
    #[error("Cyclic parent reference through node \"{0}\".")]
    CyclicParent(String),
    #[error("Frame buffer is not complete after {operation}: {status}")]
    IncompleteFramebuffer {
        operation: &'static str,
        status: FramebufferStatus,
    },
    #[error("Couldn't draw primitive {0}.")]
    UnsupportedPrimitive(String),
    #[error("{0}")]
    Parse(String),
    #[error("No material for node {0}.")]
    NoMaterial(EntityId),
    #[error("Program {0} declares no output texture.")]
    NoProgramOutput(EntityId),
    #[error("{0} output textures declared, at most 8 are allowed.")]
    TooManyOutputs(usize),
    #[error("Only color attachments [0-7] are allowed, got {0}.")]
    InvalidColorAttachment(usize),
    #[error("Texture {texture:?} can't be attached as {target:?} (mip {mip}).")]
    AttachmentMismatch {
        texture: GpuHandle,
        target: FrameTextureType,
        mip: u32,
    },
    #[error("Material has no texture for sampler \"{0}\".")]
    MissingSampler(String),
    #[error("All {0} texture units are in use.")]
    TextureUnitsExhausted(usize),
    #[error("Texture {id} is not a {expected:?} texture.")]
    TextureKindMismatch { id: EntityId, expected: TextureKind },
    #[error("Invalid pixel {0}.")]
    InvalidPixelFormat(&'static str),
    #[error("Material {0} has no texture.")]
    EmptyMaterial(EntityId),
    #[error("Device error: {0}")]
    Device(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
