use glam::{IVec2, UVec2};
use lumen_derive::LevelEntity;

use crate::{
    device::{GpuHandle, GraphicsDevice},
    error::{EngineError, EngineResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Flat,
    CubeMap,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelElementSize {
    #[default]
    Invalid,
    Byte,
    Short,
    Half,
    Float,
}

impl PixelElementSize {
    pub fn bytes(self) -> usize {
        match self {
            PixelElementSize::Invalid => 0,
            PixelElementSize::Byte => 1,
            PixelElementSize::Short | PixelElementSize::Half => 2,
            PixelElementSize::Float => 4,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelStructure {
    #[default]
    Invalid,
    Grey,
    GreyAlpha,
    Rgb,
    RgbAlpha,
}

impl PixelStructure {
    pub fn channels(self) -> usize {
        match self {
            PixelStructure::Invalid => 0,
            PixelStructure::Grey => 1,
            PixelStructure::GreyAlpha => 2,
            PixelStructure::Rgb => 3,
            PixelStructure::RgbAlpha => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    ClampToEdge,
    MirroredRepeat,
    Repeat,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    pub min_filter: Option<TextureFilter>,
    pub mag_filter: Option<TextureFilter>,
    pub wrap_s: Option<TextureWrap>,
    pub wrap_t: Option<TextureWrap>,
}

/// Texture dimension as written in a level description.
///
/// Negative components are divisors of the viewport: `-2` means half
/// the viewport along that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSize(pub IVec2);

impl TextureSize {
    pub fn resolve(self, viewport: UVec2) -> EngineResult<UVec2> {
        let axis = |value: i32, full: u32| match value {
            0 => Err(EngineError::InvalidPixelFormat("size 0")),
            v if v > 0 => Ok(v as u32),
            v => Ok((full / v.unsigned_abs()).max(1)),
        };
        Ok(UVec2::new(axis(self.0.x, viewport.x)?, axis(self.0.y, viewport.y)?))
    }
}

/// Everything needed to create a texture on the device.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub size: UVec2,
    pub element_size: PixelElementSize,
    pub structure: PixelStructure,
    pub kind: TextureKind,
    pub mip_levels: u32,
    pub sampling: Sampling,
    /// Tightly packed pixels; six consecutive faces for cube maps.
    pub pixels: Option<Vec<u8>>,
}

impl TextureDesc {
    pub fn new(size: UVec2, element_size: PixelElementSize, structure: PixelStructure) -> Self {
        Self {
            size,
            element_size,
            structure,
            kind: TextureKind::Flat,
            mip_levels: 1,
            sampling: Sampling::default(),
            pixels: None,
        }
    }

    pub fn cube_map(size: UVec2, element_size: PixelElementSize, structure: PixelStructure) -> Self {
        Self {
            kind: TextureKind::CubeMap,
            ..Self::new(size, element_size, structure)
        }
    }

    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }

    pub fn with_pixels(mut self, pixels: Vec<u8>) -> Self {
        self.pixels = Some(pixels);
        self
    }

    /// Levels of a full mip chain for this size.
    pub fn full_mip_chain(&self) -> u32 {
        32 - self.size.max_element().max(1).leading_zeros()
    }

    pub fn byte_len(&self) -> usize {
        let faces = match self.kind {
            TextureKind::Flat => 1,
            TextureKind::CubeMap => 6,
        };
        self.size.x as usize * self.size.y as usize * self.element_size.bytes() * self.structure.channels() * faces
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.element_size == PixelElementSize::Invalid {
            return Err(EngineError::InvalidPixelFormat("element size"));
        }
        if self.structure == PixelStructure::Invalid {
            return Err(EngineError::InvalidPixelFormat("structure"));
        }
        if self.size.x == 0 || self.size.y == 0 {
            return Err(EngineError::InvalidPixelFormat("size 0"));
        }
        if let Some(pixels) = &self.pixels {
            if pixels.len() != self.byte_len() {
                return Err(EngineError::InvalidPixelFormat("data length"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, LevelEntity)]
pub struct Texture {
    handle: GpuHandle,
    size: UVec2,
    element_size: PixelElementSize,
    structure: PixelStructure,
    kind: TextureKind,
    mip_levels: u32,
}

impl Texture {
    /// Validates `desc` and uploads it.
    pub fn create(device: &mut impl GraphicsDevice, desc: &TextureDesc) -> EngineResult<Self> {
        desc.validate()?;
        let handle = device.create_texture(desc)?;
        log::debug!(
            "Created {:?} texture {}x{} ({:?} {:?}, {} mips).",
            desc.kind,
            desc.size.x,
            desc.size.y,
            desc.structure,
            desc.element_size,
            desc.mip_levels,
        );
        Ok(Self {
            handle,
            size: desc.size,
            element_size: desc.element_size,
            structure: desc.structure,
            kind: desc.kind,
            mip_levels: desc.mip_levels.max(1),
        })
    }

    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn element_size(&self) -> PixelElementSize {
        self.element_size
    }

    pub fn structure(&self) -> PixelStructure {
        self.structure
    }

    pub fn kind(&self) -> TextureKind {
        self.kind
    }

    pub fn is_cube_map(&self) -> bool {
        self.kind == TextureKind::CubeMap
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Size of mip level `mip`, never below 1x1.
    pub fn mip_size(&self, mip: u32) -> UVec2 {
        let axis = |v: u32| v.checked_shr(mip).unwrap_or(0).max(1);
        UVec2::new(axis(self.size.x), axis(self.size.y))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::device::record::RecordingDevice;

    #[test]
    fn test_size_from_viewport() {
        let viewport = UVec2::new(1280, 720);
        assert_eq!(
            TextureSize(IVec2::new(-2, -2)).resolve(viewport).unwrap(),
            UVec2::new(640, 360)
        );
        assert_eq!(
            TextureSize(IVec2::new(-1, 256)).resolve(viewport).unwrap(),
            UVec2::new(1280, 256)
        );
        assert!(TextureSize(IVec2::new(0, 1)).resolve(viewport).is_err());
    }

    #[test]
    fn test_invalid_format_rejected() {
        let mut device = RecordingDevice::new();
        let desc = TextureDesc::new(UVec2::new(4, 4), PixelElementSize::Invalid, PixelStructure::Rgb);
        assert!(matches!(
            Texture::create(&mut device, &desc),
            Err(EngineError::InvalidPixelFormat("element size"))
        ));
        let desc = TextureDesc::new(UVec2::new(4, 4), PixelElementSize::Byte, PixelStructure::Invalid);
        assert!(matches!(
            Texture::create(&mut device, &desc),
            Err(EngineError::InvalidPixelFormat("structure"))
        ));
        let desc = TextureDesc::new(UVec2::new(2, 2), PixelElementSize::Byte, PixelStructure::Rgb)
            .with_pixels(vec![0; 5]);
        assert!(Texture::create(&mut device, &desc).is_err());
        assert!(device.commands().is_empty());
    }

    #[test]
    fn test_mips() {
        let desc = TextureDesc::cube_map(UVec2::splat(512), PixelElementSize::Half, PixelStructure::RgbAlpha);
        assert_eq!(desc.full_mip_chain(), 10);
        assert_eq!(desc.byte_len(), 512 * 512 * 2 * 4 * 6);

        let mut device = RecordingDevice::new();
        let texture = Texture::create(&mut device, &desc.with_mip_levels(5)).unwrap();
        assert!(texture.is_cube_map());
        assert_eq!(texture.mip_size(4), UVec2::splat(32));
        assert_eq!(texture.mip_size(12), UVec2::ONE);

        let flat = TextureDesc::new(UVec2::new(8, 2), PixelElementSize::Byte, PixelStructure::RgbAlpha).with_mip_levels(3);
        let texture = Texture::create(&mut device, &flat).unwrap();
        assert_eq!(texture.mip_size(2), UVec2::new(2, 1));
    }
}
