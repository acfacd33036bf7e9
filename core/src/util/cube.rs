use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

pub struct CubeMapFace {
    pub target: Vec3,
    pub up: Vec3,
}

// see https://www.khronos.org/opengl/wiki/Cubemap_Texture
pub const CUBE_MAP_FACES: [CubeMapFace; 6] = [
    // 0 	GL_TEXTURE_CUBE_MAP_POSITIVE_X
    CubeMapFace {
        target: Vec3::X,
        up: Vec3::NEG_Y,
    },
    // 1 	GL_TEXTURE_CUBE_MAP_NEGATIVE_X
    CubeMapFace {
        target: Vec3::NEG_X,
        up: Vec3::NEG_Y,
    },
    // 2 	GL_TEXTURE_CUBE_MAP_POSITIVE_Y
    CubeMapFace {
        target: Vec3::Y,
        up: Vec3::Z,
    },
    // 3 	GL_TEXTURE_CUBE_MAP_NEGATIVE_Y
    CubeMapFace {
        target: Vec3::NEG_Y,
        up: Vec3::NEG_Z,
    },
    // 4 	GL_TEXTURE_CUBE_MAP_POSITIVE_Z
    CubeMapFace {
        target: Vec3::Z,
        up: Vec3::NEG_Y,
    },
    // 5 	GL_TEXTURE_CUBE_MAP_NEGATIVE_Z
    CubeMapFace {
        target: Vec3::NEG_Z,
        up: Vec3::NEG_Y,
    },
];

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn face(self) -> &'static CubeMapFace {
        &CUBE_MAP_FACES[self.index()]
    }

    /// View from the origin through this face.
    pub fn view(self) -> Mat4 {
        let face = self.face();
        Mat4::look_at_rh(Vec3::ZERO, face.target, face.up)
    }
}

/// 90 degree square projection shared by all six faces.
pub fn cube_map_projection() -> Mat4 {
    Mat4::perspective_rh_gl(90f32.to_radians(), 1.0, 0.01, 10.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_faces_look_down_their_axis() {
        for face in CubeFace::ALL {
            let target = face.face().target;
            // Forward is -Z in view space.
            let forward = face.view().transform_vector3(target);
            assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1e-6), "{face:?}");
        }
    }

    #[test]
    fn test_projection_is_square() {
        let projection = cube_map_projection();
        assert!((projection.x_axis.x - projection.y_axis.y).abs() < 1e-6);
        assert!((projection.x_axis.x - 1.0).abs() < 1e-6);
    }
}
