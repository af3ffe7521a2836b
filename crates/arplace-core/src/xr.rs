//! Contracts for the host tracking platform.
//!
//! The loop never depends on a concrete platform type. Hosts implement [`XrSystem`],
//! [`XrSession`] and [`XrFrame`] for exactly the calls the loop makes.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::render::{GraphicsContext, Viewport};

/// Kind of session requested from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    /// Inline (non-immersive) session.
    Inline,
    /// Immersive VR session.
    ImmersiveVr,
    /// Immersive AR session with camera passthrough.
    #[default]
    ImmersiveAr,
}

impl SessionMode {
    /// Returns the host-facing name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionMode::Inline => "inline",
            SessionMode::ImmersiveVr => "immersive-vr",
            SessionMode::ImmersiveAr => "immersive-ar",
        }
    }
}

/// Kind of reference space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSpaceType {
    /// Origin at the viewer, moves with it.
    Viewer,
    /// Origin near the viewer at session start, stable thereafter.
    #[default]
    Local,
    /// Like `Local` with the origin on the floor.
    LocalFloor,
    /// Floor-level space with known boundaries.
    BoundedFloor,
    /// Large-scale space without boundaries.
    Unbounded,
}

impl ReferenceSpaceType {
    /// Returns the host-facing name of the space type.
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceSpaceType::Viewer => "viewer",
            ReferenceSpaceType::Local => "local",
            ReferenceSpaceType::LocalFloor => "local-floor",
            ReferenceSpaceType::BoundedFloor => "bounded-floor",
            ReferenceSpaceType::Unbounded => "unbounded",
        }
    }
}

/// Targeting mode of an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TargetRayMode {
    /// Ray follows the viewer's gaze.
    Gaze,
    /// Ray comes from a tracked controller.
    TrackedPointer,
    /// Ray comes from a touch on the screen.
    #[default]
    Screen,
}

/// Which hand, if any, an input source is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Handedness {
    /// Not associated with a hand.
    #[default]
    None,
    /// Left hand.
    Left,
    /// Right hand.
    Right,
}

/// Opaque identifier of a host session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

/// Opaque identifier of a host space (reference space or target-ray space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpaceHandle(pub u64);

/// Coordinate frame anchoring every pose and hit-test result of a session.
///
/// Created once per session and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSpace {
    handle: SpaceHandle,
    kind: ReferenceSpaceType,
}

impl ReferenceSpace {
    /// Creates a reference space from a host handle.
    pub fn new(handle: SpaceHandle, kind: ReferenceSpaceType) -> Self {
        Self { handle, kind }
    }

    /// Returns the host handle.
    pub fn handle(&self) -> SpaceHandle {
        self.handle
    }

    /// Returns the space type.
    pub fn kind(&self) -> ReferenceSpaceType {
        self.kind
    }
}

/// An active pointing mechanism, valid only within the frame it was read in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    /// Hand holding the source.
    pub handedness: Handedness,
    /// How the source targets.
    pub target_ray_mode: TargetRayMode,
    /// Space whose pose is the source's target ray.
    pub target_ray_space: SpaceHandle,
}

impl InputSource {
    /// Creates a screen-tap input source.
    pub fn screen(target_ray_space: SpaceHandle) -> Self {
        Self {
            handedness: Handedness::None,
            target_ray_mode: TargetRayMode::Screen,
            target_ray_space,
        }
    }
}

/// Pose of a space relative to a reference space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Rigid transform of the space.
    pub transform: Mat4,
}

/// Which eye a view is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// Monoscopic view.
    None,
    /// Left eye.
    Left,
    /// Right eye.
    Right,
}

/// One rendered view of the viewer pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// Eye this view is for.
    pub eye: Eye,
    /// Projection parameters for the view.
    pub projection_matrix: Mat4,
    /// Pose of the eye in the reference space.
    pub transform: Mat4,
}

impl View {
    /// Returns the view matrix (inverse of the eye pose).
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.inverse()
    }
}

/// Per-frame snapshot of the viewer, with one [`View`] per eye.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerPose {
    /// Pose of the viewer.
    pub transform: Mat4,
    /// Views to render.
    pub views: Vec<View>,
}

/// A ray in reference-space coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing the direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }
}

/// First intersection of a ray with tracked physical geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestResult {
    /// Transform of the hit: translation is the hit point, rotation the surface frame.
    pub hit_matrix: Mat4,
}

impl HitTestResult {
    /// Creates a result from a host-provided column-major array.
    pub fn from_cols_array(cols: &[f32; 16]) -> Self {
        Self {
            hit_matrix: Mat4::from_cols_array(cols),
        }
    }

    /// Returns the translation of the hit.
    pub fn position(&self) -> Vec3 {
        self.hit_matrix.w_axis.truncate()
    }
}

/// Callback invoked by the host on the next display refresh.
pub type FrameCallback = Box<dyn FnOnce(f64, &dyn XrFrame)>;

/// Callback invoked by the host when a hit-test request resolves or rejects.
pub type HitTestCallback = Box<dyn FnOnce(Result<Vec<HitTestResult>>)>;

/// Entry point of the host tracking platform.
pub trait XrSystem {
    /// Session type handed out by this host.
    type Session: XrSession + 'static;

    /// Asks whether a session of the given mode can be created.
    async fn is_session_supported(&self, mode: SessionMode) -> Result<bool>;

    /// Requests a new session.
    async fn request_session(&self, mode: SessionMode) -> Result<Self::Session>;

    /// Whether sessions created by this host can perform hit tests.
    fn supports_hit_test(&self) -> bool;
}

/// An active tracking session.
pub trait XrSession {
    /// Host identifier of the session.
    fn id(&self) -> SessionId;

    /// Requests a reference space of the given type.
    async fn request_reference_space(&self, kind: ReferenceSpaceType) -> Result<ReferenceSpace>;

    /// Schedules `callback` for the next display refresh.
    fn request_animation_frame(&self, callback: FrameCallback) -> Result<()>;

    /// Currently active input sources, in host iteration order.
    fn input_sources(&self) -> Vec<InputSource>;

    /// Casts `ray` against the physical environment. `callback` runs when the host resolves.
    fn request_hit_test(&self, ray: Ray, space: &ReferenceSpace, callback: HitTestCallback);

    /// Viewport of `view` on the session's base layer.
    fn viewport(&self, view: &View) -> Option<Viewport>;

    /// Creates the session's base layer from a graphics context.
    fn set_base_layer(&self, context: GraphicsContext) -> Result<()>;

    /// Whether the session is still tracking.
    fn is_active(&self) -> bool;

    /// Ends the session.
    fn end(&self);
}

/// Tracking data for one display refresh.
pub trait XrFrame {
    /// Pose of the viewer relative to `space`, if tracking is available.
    fn get_viewer_pose(&self, space: &ReferenceSpace) -> Option<ViewerPose>;

    /// Pose of `space` relative to `base`, if available.
    fn get_pose(&self, space: SpaceHandle, base: &ReferenceSpace) -> Option<Pose>;
}
