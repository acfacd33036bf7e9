pub mod material;
pub mod mesh;
pub mod program;
pub mod texture;

pub use material::{Material, MAX_TEXTURE_UNITS};
pub use mesh::{create_static_mesh, Buffer, BufferKind, MeshData, Primitive, StaticMesh};
pub use program::{Program, ProgramSource, MAX_OUTPUTS};
pub use texture::{
    PixelElementSize, PixelStructure, Sampling, Texture, TextureDesc, TextureFilter, TextureKind, TextureSize,
    TextureWrap,
};
