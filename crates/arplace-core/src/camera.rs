//! Camera driven by tracked view data.

use glam::{Mat4, Vec2, Vec3};

use crate::xr::{Ray, View};

/// Determinants below this are treated as singular projections.
const SINGULAR_EPSILON: f32 = 1e-12;

/// A camera whose matrices are written directly from tracking data every frame.
///
/// Unlike an orbit camera there is no target or navigation state: the host
/// supplies the projection and the eye pose, and the camera simply holds them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XrCamera {
    /// Projection matrix.
    pub projection: Mat4,
    /// Camera-to-world transform.
    pub world: Mat4,
}

impl Default for XrCamera {
    fn default() -> Self {
        Self {
            projection: Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 1.0, 0.01, 1000.0),
            world: Mat4::IDENTITY,
        }
    }
}

impl XrCamera {
    /// Creates a camera from explicit matrices.
    #[must_use]
    pub fn new(projection: Mat4, world: Mat4) -> Self {
        Self { projection, world }
    }

    /// Builds the camera for one tracked view.
    ///
    /// The world transform is the inverse of the view matrix.
    #[must_use]
    pub fn from_view(view: &View) -> Self {
        Self {
            projection: view.projection_matrix,
            world: view.view_matrix().inverse(),
        }
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.world.inverse()
    }

    /// Returns the camera position in world space.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    /// Returns the camera's forward direction (local -Z) in world space.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.world.transform_vector3(Vec3::NEG_Z).normalize_or_zero()
    }

    /// Casts a ray from the camera through a point in normalized device coordinates.
    ///
    /// `Vec2::ZERO` is the view center. The point is unprojected at mid depth, so
    /// off-axis projections bend the ray the way the host's own raycaster would.
    #[must_use]
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let origin = self.position();
        if self.projection.determinant().abs() < SINGULAR_EPSILON {
            return Ray::new(origin, self.forward());
        }
        let in_camera = self
            .projection
            .inverse()
            .project_point3(Vec3::new(ndc.x, ndc.y, 0.5));
        let in_world = self.world.transform_point3(in_camera);
        let direction = in_world - origin;
        if direction.length_squared() <= f32::EPSILON {
            return Ray::new(origin, self.forward());
        }
        Ray::new(origin, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::Eye;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_from_view_uses_eye_pose() {
        let view = View {
            eye: Eye::Left,
            projection_matrix: Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0),
            transform: Mat4::from_translation(Vec3::new(0.0, 1.6, 0.0)),
        };
        let camera = XrCamera::from_view(&view);
        assert!(approx(camera.position(), Vec3::new(0.0, 1.6, 0.0)));
        assert_eq!(camera.projection, view.projection_matrix);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let camera = XrCamera::new(
            Mat4::perspective_rh(1.0, 1.5, 0.1, 100.0),
            Mat4::from_translation(Vec3::new(0.0, 1.6, 0.0)),
        );
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        assert!(approx(ray.origin, Vec3::new(0.0, 1.6, 0.0)));
        assert!(approx(ray.direction, Vec3::NEG_Z));
    }

    #[test]
    fn test_center_ray_follows_rotation() {
        let rotation = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let camera = XrCamera::new(Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0), rotation);
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        // Yawing +90 degrees turns -Z into -X.
        assert!(approx(ray.direction, Vec3::NEG_X));
    }

    #[test]
    fn test_singular_projection_falls_back_to_forward() {
        let camera = XrCamera::new(Mat4::ZERO, Mat4::IDENTITY);
        let ray = camera.ray_from_ndc(Vec2::ZERO);
        assert!(approx(ray.direction, Vec3::NEG_Z));
    }

    #[test]
    fn test_off_center_ray_tilts() {
        let camera = XrCamera::new(Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0), Mat4::IDENTITY);
        let ray = camera.ray_from_ndc(Vec2::new(0.5, 0.0));
        assert!(ray.direction.x > 0.0);
        assert!(ray.direction.z < 0.0);
    }
}
