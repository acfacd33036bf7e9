use glam::{Mat4, UVec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveProjection {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for PerspectiveProjection {
    fn default() -> Self {
        Self {
            fov: 65f32.to_radians(),
            aspect_ratio: 16. / 9.,
            near: 0.1,
            far: 1000.,
        }
    }
}

impl PerspectiveProjection {
    #[inline]
    pub fn compute_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov, self.aspect_ratio, self.near, self.far)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: PerspectiveProjection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            up: Vec3::Y,
            projection: PerspectiveProjection::default(),
        }
    }
}

impl Camera {
    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection for a render target of `size`; the stored aspect ratio
    /// is used when `size` is degenerate.
    pub fn projection(&self, size: UVec2) -> Mat4 {
        let mut projection = self.projection;
        if size.x > 0 && size.y > 0 {
            projection.aspect_ratio = size.x as f32 / size.y as f32;
        }
        projection.compute_matrix()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_projection_follows_target_aspect() {
        let camera = Camera::default();
        let wide = camera.projection(UVec2::new(200, 100));
        let expected = PerspectiveProjection {
            aspect_ratio: 2.,
            ..Default::default()
        }
        .compute_matrix();
        assert!(wide.abs_diff_eq(expected, 1e-6));
        assert!(camera
            .projection(UVec2::ZERO)
            .abs_diff_eq(camera.projection.compute_matrix(), 1e-6));
    }

    #[test]
    fn test_view_looks_down_target() {
        let camera = Camera {
            position: Vec3::new(0., 0., 5.),
            target: Vec3::ZERO,
            ..Default::default()
        };
        let origin = camera.view().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0., 0., -5.), 1e-5));
    }
}
