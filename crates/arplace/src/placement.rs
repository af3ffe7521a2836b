//! Placement of the single virtual object on a hit surface.

use arplace_core::{HitTestResult, ModelDescriptor, ObjectId, PlacedObject, Scene, Vec3, XrCamera};

/// Owns the placed object for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct PlacementController {
    model: ModelDescriptor,
    object: Option<PlacedObject>,
}

impl PlacementController {
    /// Creates a controller; the object is created on the first hit.
    pub fn new(model: ModelDescriptor) -> Self {
        Self {
            model,
            object: None,
        }
    }

    /// Returns the placed object, if any hit has been applied.
    pub fn object(&self) -> Option<&PlacedObject> {
        self.object.as_ref()
    }

    /// Moves the object to the hit point and turns it toward the camera.
    ///
    /// The object is inserted into `scene` on the first call and updated in
    /// place afterwards.
    pub fn apply_hit(
        &mut self,
        result: &HitTestResult,
        camera: &XrCamera,
        scene: &mut Scene,
    ) -> ObjectId {
        let model = self.model;
        let object = self
            .object
            .get_or_insert_with(|| PlacedObject::new(scene.allocate_id(), model));

        object.transform.translation = result.position();

        let camera_position = camera.position();
        object.transform.look_at_yaw(Vec3::new(
            camera_position.x,
            object.transform.translation.y,
            camera_position.z,
        ));
        object.transform.rotate_y(-scene.rotation.y);

        if scene.add(object) {
            log::info!("Placed object {:?} at {}", object.id, object.transform.translation);
        } else {
            log::trace!("Moved object {:?} to {}", object.id, object.transform.translation);
        }
        object.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arplace_core::Mat4;
    use proptest::prelude::*;

    fn hit_at(position: Vec3) -> HitTestResult {
        HitTestResult {
            hit_matrix: Mat4::from_translation(position),
        }
    }

    fn camera_at(position: Vec3) -> XrCamera {
        XrCamera::new(Mat4::IDENTITY, Mat4::from_translation(position))
    }

    #[test]
    fn test_faces_camera_on_horizontal_plane() {
        let mut controller = PlacementController::new(ModelDescriptor::default());
        let mut scene = Scene::new();

        controller.apply_hit(
            &hit_at(Vec3::new(1.0, 0.0, 2.0)),
            &camera_at(Vec3::new(0.0, 1.6, 0.0)),
            &mut scene,
        );

        let object = controller.object().expect("object placed");
        assert_eq!(object.transform.translation, Vec3::new(1.0, 0.0, 2.0));
        let expected = Vec3::new(-1.0, 0.0, -2.0).normalize();
        assert!((object.transform.facing() - expected).length() < 1e-5);
    }

    #[test]
    fn test_repeat_hit_keeps_single_instance() {
        let mut controller = PlacementController::new(ModelDescriptor::default());
        let mut scene = Scene::new();
        let hit = hit_at(Vec3::new(0.5, -0.2, -1.0));
        let camera = camera_at(Vec3::ZERO);

        let first = controller.apply_hit(&hit, &camera, &mut scene);
        let second = controller.apply_hit(&hit, &camera, &mut scene);

        assert_eq!(first, second);
        assert_eq!(scene.len(), 1);
        let node = scene.node(first).expect("in scene");
        assert_eq!(node.transform.translation, hit.position());
    }

    #[test]
    fn test_scene_rotation_is_compensated() {
        let mut controller = PlacementController::new(ModelDescriptor::default());
        let mut scene = Scene::new();
        scene.rotation.y = 0.4;

        controller.apply_hit(
            &hit_at(Vec3::new(0.0, 0.0, -2.0)),
            &camera_at(Vec3::ZERO),
            &mut scene,
        );

        // Facing the camera along +Z means zero yaw before compensation.
        let yaw = controller.object().expect("placed").transform.yaw();
        assert!((yaw + 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_moves_in_place() {
        let mut controller = PlacementController::new(ModelDescriptor::default());
        let mut scene = Scene::new();
        let camera = camera_at(Vec3::ZERO);

        let id = controller.apply_hit(&hit_at(Vec3::new(1.0, 0.0, 0.0)), &camera, &mut scene);
        controller.apply_hit(&hit_at(Vec3::new(0.0, 0.0, 3.0)), &camera, &mut scene);

        assert_eq!(controller.object().map(|o| o.id), Some(id));
        assert_eq!(
            scene.node(id).map(|n| n.transform.translation),
            Some(Vec3::new(0.0, 0.0, 3.0))
        );
    }

    proptest! {
        #[test]
        fn placement_keeps_hit_height(
            hx in -5.0f32..5.0, hy in -2.0f32..2.0, hz in -5.0f32..5.0,
            cx in -5.0f32..5.0, cy in 0.0f32..2.5, cz in -5.0f32..5.0,
        ) {
            let mut controller = PlacementController::new(ModelDescriptor::default());
            let mut scene = Scene::new();
            let hit = Vec3::new(hx, hy, hz);

            controller.apply_hit(&hit_at(hit), &camera_at(Vec3::new(cx, cy, cz)), &mut scene);

            let object = controller.object().unwrap();
            prop_assert_eq!(object.transform.translation, hit);
            prop_assert!(object.transform.facing().y.abs() < 1e-4);
            prop_assert_eq!(scene.len(), 1);
        }
    }
}
