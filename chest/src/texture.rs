use std::path::Path;

use glam::UVec2;
use image::{ColorType, DynamicImage, ImageError};
use lumen_core::{
    error::EngineError,
    resource::{PixelElementSize, PixelStructure, TextureDesc},
};
use palette::{LinSrgb, Srgb};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureLoadError {
    #[error("{0}")]
    Image(#[from] ImageError),
    #[error("Cube map face {face} is {width}x{height}, expected {expected}x{expected}.")]
    FaceSize {
        face: usize,
        width: u32,
        height: u32,
        expected: u32,
    },
}

pub type TextureLoadResult<T> = Result<T, TextureLoadError>;

impl From<TextureLoadError> for EngineError {
    fn from(value: TextureLoadError) -> Self {
        EngineError::Parse(value.to_string())
    }
}

/// Describes `image` as a flat texture, keeping its channel layout and
/// precision where the engine has a matching format.
pub fn texture_desc_from_image(image: &DynamicImage) -> TextureDesc {
    let size = UVec2::new(image.width(), image.height());
    let (element_size, structure, pixels) = match image.color() {
        ColorType::L8 => (PixelElementSize::Byte, PixelStructure::Grey, image.to_luma8().into_raw()),
        ColorType::La8 => (PixelElementSize::Byte, PixelStructure::GreyAlpha, image.to_luma_alpha8().into_raw()),
        ColorType::Rgb8 => (PixelElementSize::Byte, PixelStructure::Rgb, image.to_rgb8().into_raw()),
        ColorType::L16 => (
            PixelElementSize::Short,
            PixelStructure::Grey,
            bytemuck::cast_slice(&image.to_luma16().into_raw()).to_vec(),
        ),
        ColorType::La16 => (
            PixelElementSize::Short,
            PixelStructure::GreyAlpha,
            bytemuck::cast_slice(&image.to_luma_alpha16().into_raw()).to_vec(),
        ),
        ColorType::Rgb16 => (
            PixelElementSize::Short,
            PixelStructure::Rgb,
            bytemuck::cast_slice(&image.to_rgb16().into_raw()).to_vec(),
        ),
        ColorType::Rgba16 => (
            PixelElementSize::Short,
            PixelStructure::RgbAlpha,
            bytemuck::cast_slice(&image.to_rgba16().into_raw()).to_vec(),
        ),
        ColorType::Rgb32F => (
            PixelElementSize::Float,
            PixelStructure::Rgb,
            bytemuck::cast_slice(&image.to_rgb32f().into_raw()).to_vec(),
        ),
        ColorType::Rgba32F => (
            PixelElementSize::Float,
            PixelStructure::RgbAlpha,
            bytemuck::cast_slice(&image.to_rgba32f().into_raw()).to_vec(),
        ),
        _ => (PixelElementSize::Byte, PixelStructure::RgbAlpha, image.to_rgba8().into_raw()),
    };
    TextureDesc::new(size, element_size, structure).with_pixels(pixels)
}

pub fn load_texture_desc(path: impl AsRef<Path>) -> TextureLoadResult<TextureDesc> {
    let image = image::open(path)?;
    Ok(texture_desc_from_image(&image))
}

/// Stacks six square faces, in +X -X +Y -Y +Z -Z order, into one float
/// RGB cube map.
pub fn cube_map_from_faces(faces: &[DynamicImage; 6]) -> TextureLoadResult<TextureDesc> {
    let expected = faces[0].width();
    let mut pixels = Vec::new();
    for (face, image) in faces.iter().enumerate() {
        if image.width() != expected || image.height() != expected {
            return Err(TextureLoadError::FaceSize {
                face,
                width: image.width(),
                height: image.height(),
                expected,
            });
        }
        pixels.extend_from_slice(bytemuck::cast_slice(&image.to_rgb32f().into_raw()));
    }
    Ok(
        TextureDesc::cube_map(UVec2::splat(expected), PixelElementSize::Float, PixelStructure::Rgb)
            .with_pixels(pixels),
    )
}

pub fn load_cube_map_faces<P: AsRef<Path>>(paths: &[P; 6]) -> TextureLoadResult<TextureDesc> {
    let [a, b, c, d, e, f] = paths;
    let faces = [
        image::open(a)?,
        image::open(b)?,
        image::open(c)?,
        image::open(d)?,
        image::open(e)?,
        image::open(f)?,
    ];
    cube_map_from_faces(&faces)
}

/// 1x1 float RGB texture holding `color` in linear space.
pub fn constant_color(color: Srgb) -> TextureDesc {
    let linear: LinSrgb = color.into_linear();
    let data = [linear.red, linear.green, linear.blue];
    TextureDesc::new(UVec2::ONE, PixelElementSize::Float, PixelStructure::Rgb)
        .with_pixels(bytemuck::cast_slice(&data).to_vec())
}

/// 1x1 float grey texture.
pub fn constant_grey(value: f32) -> TextureDesc {
    TextureDesc::new(UVec2::ONE, PixelElementSize::Float, PixelStructure::Grey)
        .with_pixels(bytemuck::bytes_of(&value).to_vec())
}

#[cfg(test)]
mod test {
    use image::{Rgb32FImage, RgbaImage};

    use super::*;

    #[test]
    fn test_rgba8_image() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 3, image::Rgba([1, 2, 3, 4])));
        let desc = texture_desc_from_image(&image);
        assert_eq!(desc.size, UVec2::new(2, 3));
        assert_eq!(desc.element_size, PixelElementSize::Byte);
        assert_eq!(desc.structure, PixelStructure::RgbAlpha);
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_float_image() {
        let image = DynamicImage::ImageRgb32F(Rgb32FImage::from_pixel(4, 4, image::Rgb([0.5, 1.0, 2.0])));
        let desc = texture_desc_from_image(&image);
        assert_eq!(desc.element_size, PixelElementSize::Float);
        assert_eq!(desc.structure, PixelStructure::Rgb);
        assert_eq!(desc.pixels.as_ref().map(Vec::len), Some(4 * 4 * 3 * 4));
    }

    #[test]
    fn test_constant_color_is_linear() {
        let desc = constant_color(Srgb::new(1.0, 0.5, 0.0));
        let pixels = desc.pixels.unwrap();
        let values: &[f32] = bytemuck::cast_slice(&pixels);
        assert_eq!(values[0], 1.0);
        assert!(values[1] > 0.2 && values[1] < 0.25);
        assert_eq!(values[2], 0.0);
        assert!(constant_grey(0.3).validate().is_ok());
    }

    #[test]
    fn test_faces_must_match() {
        let face = || DynamicImage::ImageRgb32F(Rgb32FImage::new(8, 8));
        let mut faces = [face(), face(), face(), face(), face(), face()];
        let desc = cube_map_from_faces(&faces).unwrap();
        assert!(desc.validate().is_ok());

        faces[3] = DynamicImage::ImageRgb32F(Rgb32FImage::new(8, 4));
        assert!(matches!(
            cube_map_from_faces(&faces),
            Err(TextureLoadError::FaceSize { face: 3, .. })
        ));
    }
}
