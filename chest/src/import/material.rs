//! Plain-text material descriptions in an MTL-like dialect.
//!
//! ```text
//! Kd 1.0 0.5 0.2
//! map_norm brick_normal.png
//! Pm 0.0
//! Pr 0.8
//! ```

use std::{
    path::{Path, PathBuf},
    str::SplitWhitespace,
};

use glam::UVec2;
use lumen_core::{
    device::GraphicsDevice,
    error::EngineResult,
    level::{EntityId, EntityStore},
    resource::{Material, PixelElementSize, PixelStructure, Texture, TextureDesc},
};
use palette::Srgb;
use thiserror::Error;

use crate::texture::{constant_color, constant_grey, load_texture_desc};

#[derive(Error, Debug, PartialEq)]
pub enum MaterialParseError {
    #[error("Line {line}: no token found.")]
    MissingToken { line: usize },
    #[error("Line {line}: no file name at {statement}.")]
    MissingFileName { line: usize, statement: String },
    #[error("Line {line}: could not get the {component} value for {statement}.")]
    MissingValue {
        line: usize,
        component: char,
        statement: String,
    },
}

pub type MaterialParseResult<T> = Result<T, MaterialParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialSlot {
    Color,
    Normal,
    Metallic,
    Roughness,
    AmbientOcclusion,
}

impl MaterialSlot {
    pub const ALL: [MaterialSlot; 5] = [
        MaterialSlot::Color,
        MaterialSlot::Normal,
        MaterialSlot::Metallic,
        MaterialSlot::Roughness,
        MaterialSlot::AmbientOcclusion,
    ];

    /// Sampler name the slot is bound through.
    pub fn as_str(self) -> &'static str {
        match self {
            MaterialSlot::Color => "Color",
            MaterialSlot::Normal => "Normal",
            MaterialSlot::Metallic => "Metallic",
            MaterialSlot::Roughness => "Roughness",
            MaterialSlot::AmbientOcclusion => "AmbientOcclusion",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    File(PathBuf),
    Rgb([f32; 3]),
    Grey(f32),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMaterial {
    pub color: Option<TextureSource>,
    pub normal: Option<TextureSource>,
    pub metallic: Option<TextureSource>,
    pub roughness: Option<TextureSource>,
    pub ambient_occlusion: Option<TextureSource>,
}

impl ParsedMaterial {
    pub fn slot(&self, slot: MaterialSlot) -> Option<&TextureSource> {
        match slot {
            MaterialSlot::Color => self.color.as_ref(),
            MaterialSlot::Normal => self.normal.as_ref(),
            MaterialSlot::Metallic => self.metallic.as_ref(),
            MaterialSlot::Roughness => self.roughness.as_ref(),
            MaterialSlot::AmbientOcclusion => self.ambient_occlusion.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: MaterialSlot) -> &mut Option<TextureSource> {
        match slot {
            MaterialSlot::Color => &mut self.color,
            MaterialSlot::Normal => &mut self.normal,
            MaterialSlot::Metallic => &mut self.metallic,
            MaterialSlot::Roughness => &mut self.roughness,
            MaterialSlot::AmbientOcclusion => &mut self.ambient_occlusion,
        }
    }
}

enum Value {
    File,
    Rgb,
    Grey,
}

fn statement(token: &str) -> Option<(MaterialSlot, Value)> {
    Some(match token {
        "map_Ka" | "map_Kd" => (MaterialSlot::Color, Value::File),
        "Ka" | "Kd" => (MaterialSlot::Color, Value::Rgb),
        "map_norm" => (MaterialSlot::Normal, Value::File),
        "norm" => (MaterialSlot::Normal, Value::Rgb),
        "map_Pm" => (MaterialSlot::Metallic, Value::File),
        "Pm" => (MaterialSlot::Metallic, Value::Grey),
        "map_Pr" => (MaterialSlot::Roughness, Value::File),
        "Pr" => (MaterialSlot::Roughness, Value::Grey),
        _ => return None,
    })
}

fn float(
    tokens: &mut SplitWhitespace,
    line: usize,
    component: char,
    statement: &str,
) -> MaterialParseResult<f32> {
    tokens
        .next()
        .and_then(|token| token.parse().ok())
        .ok_or_else(|| MaterialParseError::MissingValue {
            line,
            component,
            statement: statement.to_owned(),
        })
}

/// Parses a material description. The first statement for a slot wins
/// and unknown statements are skipped.
pub fn parse_material(source: &str) -> MaterialParseResult<ParsedMaterial> {
    let mut parsed = ParsedMaterial::default();
    for (index, text) in source.lines().enumerate() {
        let line = index + 1;
        if text.is_empty() {
            continue;
        }
        let mut tokens = text.split_whitespace();
        let Some(token) = tokens.next() else {
            return Err(MaterialParseError::MissingToken { line });
        };
        let Some((slot, value)) = statement(token) else {
            continue;
        };
        let source = match value {
            Value::File => TextureSource::File(
                tokens
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| MaterialParseError::MissingFileName {
                        line,
                        statement: token.to_owned(),
                    })?,
            ),
            Value::Rgb => TextureSource::Rgb([
                float(&mut tokens, line, 'r', token)?,
                float(&mut tokens, line, 'g', token)?,
                float(&mut tokens, line, 'b', token)?,
            ]),
            Value::Grey => TextureSource::Grey(float(&mut tokens, line, 'r', token)?),
        };
        parsed.slot_mut(slot).get_or_insert(source);
    }
    Ok(parsed)
}

fn white_pixel() -> TextureDesc {
    TextureDesc::new(UVec2::ONE, PixelElementSize::Byte, PixelStructure::Rgb).with_pixels(vec![255; 3])
}

fn texture_desc(slot: MaterialSlot, source: &TextureSource, base_dir: &Path) -> EngineResult<TextureDesc> {
    Ok(match source {
        TextureSource::File(path) => load_texture_desc(base_dir.join(path))?,
        // Normals are vectors, not colours.
        TextureSource::Rgb([r, g, b]) if slot == MaterialSlot::Normal => {
            TextureDesc::new(UVec2::ONE, PixelElementSize::Float, PixelStructure::Rgb)
                .with_pixels(bytemuck::cast_slice(&[*r, *g, *b]).to_vec())
        }
        TextureSource::Rgb([r, g, b]) => constant_color(Srgb::new(*r, *g, *b)),
        TextureSource::Grey(value) => constant_grey(*value),
    })
}

/// Creates the textures of `parsed` as `"{name}.{slot}"` and returns a
/// material binding them to `program`.
///
/// Slots the description leaves out get no texture, except ambient
/// occlusion which defaults to a white pixel. File paths are relative to
/// `base_dir`.
pub fn build_material(
    device: &mut impl GraphicsDevice,
    store: &mut impl EntityStore,
    name: &str,
    parsed: &ParsedMaterial,
    program: EntityId,
    base_dir: impl AsRef<Path>,
) -> EngineResult<Material> {
    let mut material = Material::new(program);
    for slot in MaterialSlot::ALL {
        let desc = match parsed.slot(slot) {
            Some(source) => texture_desc(slot, source, base_dir.as_ref())?,
            None if slot == MaterialSlot::AmbientOcclusion => white_pixel(),
            None => continue,
        };
        let texture = Texture::create(device, &desc)?;
        let id = store.store(format!("{name}.{}", slot.as_str()), texture)?;
        material.add_texture(slot.as_str(), id)?;
    }
    log::debug!("Built material {name} with {} textures.", material.texture_ids().count());
    Ok(material)
}
