pub mod material;

pub use material::{build_material, parse_material, MaterialParseError, MaterialSlot, ParsedMaterial, TextureSource};
