use glam::{Mat3, Mat4, Quat, Vec3};

/// Local placement of an object relative to its parent, stored the way the
/// authoring tool stores it: translation, rotation and a per-axis scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_trs(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Builds a transform from an XYZ euler rotation in radians, applied X first,
    /// then Y, then Z.
    pub fn from_euler_xyz(translation: Vec3, euler: Vec3, scale: Vec3) -> Self {
        let rotation = Quat::from_rotation_z(euler.z)
            * Quat::from_rotation_y(euler.y)
            * Quat::from_rotation_x(euler.x);

        Self::from_trs(translation, rotation, scale)
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Rotation applied after scale, without the translation.
    pub fn linear_matrix(&self) -> Mat3 {
        Mat3::from_quat(self.rotation) * Mat3::from_diagonal(self.scale)
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
