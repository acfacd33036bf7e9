use glam::{Mat4, Vec2, Vec3, Vec4};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

macro_rules! impl_from_value {
    ($ty: ty, $variant: ident) => {
        impl From<$ty> for UniformValue {
            #[inline]
            fn from(value: $ty) -> Self {
                UniformValue::$variant(value)
            }
        }
    };
}

impl_from_value!(i32, Int);
impl_from_value!(f32, Float);
impl_from_value!(Vec2, Vec2);
impl_from_value!(Vec3, Vec3);
impl_from_value!(Vec4, Vec4);
impl_from_value!(Mat4, Mat4);

pub const PROJECTION: &str = "projection";
pub const VIEW: &str = "view";
pub const MODEL: &str = "model";
pub const ENV_MAP_MODEL: &str = "env_map_model";
pub const TIME: &str = "time_s";

/// Per-draw uniform values.
///
/// The five standard values are always uploaded; anything added with
/// [`Uniforms::set`] follows in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniforms {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
    pub env_map_model: Mat4,
    pub time: f64,
    extra: IndexMap<String, UniformValue>,
}

impl Default for Uniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, Mat4::IDENTITY, 0.)
    }
}

impl Uniforms {
    pub fn new(projection: Mat4, view: Mat4, model: Mat4, env_map_model: Mat4, time: f64) -> Self {
        Self {
            projection,
            view,
            model,
            env_map_model,
            time,
            extra: IndexMap::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<UniformValue>) {
        self.extra.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        match name {
            PROJECTION => Some(self.projection.into()),
            VIEW => Some(self.view.into()),
            MODEL => Some(self.model.into()),
            ENV_MAP_MODEL => Some(self.env_map_model.into()),
            TIME => Some((self.time as f32).into()),
            _ => self.extra.get(name).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, UniformValue)> {
        [
            (PROJECTION, UniformValue::Mat4(self.projection)),
            (VIEW, UniformValue::Mat4(self.view)),
            (MODEL, UniformValue::Mat4(self.model)),
            (ENV_MAP_MODEL, UniformValue::Mat4(self.env_map_model)),
            (TIME, UniformValue::Float(self.time as f32)),
        ]
        .into_iter()
        .chain(self.extra.iter().map(|(name, value)| (name.as_str(), *value)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_standard_values_come_first() {
        let mut uniforms = Uniforms::default();
        uniforms.set("roughness", 0.25f32);
        let names: Vec<_> = uniforms.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            [PROJECTION, VIEW, MODEL, ENV_MAP_MODEL, TIME, "roughness"]
        );
        assert_eq!(uniforms.get("roughness"), Some(UniformValue::Float(0.25)));
        assert_eq!(uniforms.get(MODEL), Some(UniformValue::Mat4(Mat4::IDENTITY)));
        assert_eq!(uniforms.get("missing"), None);
    }
}
