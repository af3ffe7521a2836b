//! Object transforms and the orientation helpers used for placement.

use glam::{Mat4, Quat, Vec3};

/// Horizontal offsets shorter than this leave no usable facing direction.
const MIN_HORIZONTAL_DISTANCE_SQ: f32 = 1e-12;

/// A transformation represented as separate components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation component.
    pub translation: Vec3,
    /// Rotation component as a quaternion.
    pub rotation: Quat,
    /// Scale component.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Creates a new identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Creates a transform from a translation.
    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Creates a transform from a Mat4.
    ///
    /// This decomposition may not be exact for matrices with shear.
    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Converts this transform to a Mat4.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Direction the object's local +Z axis points in world space.
    #[must_use]
    pub fn facing(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Turns the object about +Y so its local +Z axis faces `target`.
    ///
    /// Only the horizontal offset is used, so the object stays upright and its
    /// translation is untouched. A target directly above or below resets the yaw.
    pub fn look_at_yaw(&mut self, target: Vec3) {
        let offset = target - self.translation;
        if offset.x * offset.x + offset.z * offset.z <= MIN_HORIZONTAL_DISTANCE_SQ {
            self.rotation = Quat::IDENTITY;
            return;
        }
        self.rotation = Quat::from_rotation_y(offset.x.atan2(offset.z));
    }

    /// Rotates about the object's own vertical axis.
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation *= Quat::from_rotation_y(angle);
    }

    /// Returns the yaw angle in radians, assuming an upright rotation.
    #[must_use]
    pub fn yaw(&self) -> f32 {
        let facing = self.facing();
        facing.x.atan2(facing.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_from_matrix_round_trip() {
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.3),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let t = Transform::from_matrix(matrix);
        assert!(approx(t.translation, Vec3::new(1.0, 2.0, 3.0)));
        assert!(approx(t.scale, Vec3::splat(2.0)));
    }

    #[test]
    fn test_look_at_yaw_faces_target() {
        let mut t = Transform::from_translation(Vec3::new(1.0, 0.0, 2.0));
        t.look_at_yaw(Vec3::new(0.0, 0.0, 0.0));
        assert!(approx(t.facing(), Vec3::new(-1.0, 0.0, -2.0).normalize()));
        assert!(approx(t.translation, Vec3::new(1.0, 0.0, 2.0)));
    }

    #[test]
    fn test_look_at_yaw_straight_up_resets() {
        let mut t = Transform::from_translation(Vec3::ZERO);
        t.rotation = Quat::from_rotation_y(1.0);
        t.look_at_yaw(Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(t.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_rotate_y_composes() {
        let mut t = Transform::identity();
        t.rotate_y(0.25);
        t.rotate_y(0.5);
        assert!((t.yaw() - 0.75).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn look_at_yaw_stays_upright(
            px in -10.0f32..10.0, py in -3.0f32..3.0, pz in -10.0f32..10.0,
            tx in -10.0f32..10.0, ty in -3.0f32..3.0, tz in -10.0f32..10.0,
        ) {
            let position = Vec3::new(px, py, pz);
            let target = Vec3::new(tx, ty, tz);
            let horizontal = Vec3::new(tx - px, 0.0, tz - pz);
            prop_assume!(horizontal.length() > 1e-2);

            let mut t = Transform::from_translation(position);
            t.look_at_yaw(target);

            let facing = t.facing();
            prop_assert!(facing.y.abs() < 1e-4);
            prop_assert!((facing - horizontal.normalize()).length() < 1e-3);
            prop_assert_eq!(t.translation, position);
        }
    }
}
