//! Scripted in-process host.
//!
//! Implements every host contract without a device: sessions queue their frame
//! and hit-test callbacks, and the caller decides when frames run and when (and
//! in which order) hit tests resolve. Used by the test suite and the demos.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arplace_core::{
    ArError, Eye, FrameCallback, GraphicsContext, HitTestCallback, HitTestResult, InputSource,
    Mat4, OutputSurface, Pose, Ray, ReferenceSpace, ReferenceSpaceType, Renderer, RendererConfig,
    Result, Scene, SceneNode, SessionId, SessionMode, SpaceHandle, SurfaceContainer, Vec3, View,
    ViewerPose, Viewport, XrCamera, XrFrame, XrSession, XrSystem,
};

#[derive(Debug, Clone)]
enum SupportAnswer {
    Yes,
    No,
    Reject(String),
}

/// A scripted tracking platform.
#[derive(Debug)]
pub struct SimSystem {
    support: SupportAnswer,
    hit_test_api: bool,
    session_rejection: Option<String>,
    reference_space_failure: Option<String>,
    base_layer_failure: Option<String>,
    scheduling_failure: bool,
    viewport: Viewport,
    support_queries: Cell<usize>,
    session_requests: Cell<usize>,
    next_id: Cell<u64>,
    sessions: RefCell<Vec<SimSession>>,
}

impl Default for SimSystem {
    fn default() -> Self {
        Self {
            support: SupportAnswer::Yes,
            hit_test_api: true,
            session_rejection: None,
            reference_space_failure: None,
            base_layer_failure: None,
            scheduling_failure: false,
            viewport: Viewport::new(0, 0, 1080, 1920),
            support_queries: Cell::new(0),
            session_requests: Cell::new(0),
            next_id: Cell::new(1),
            sessions: RefCell::new(Vec::new()),
        }
    }
}

impl SimSystem {
    /// A host that supports immersive AR with hit-testing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `false` to support queries.
    #[must_use]
    pub fn unsupported(mut self) -> Self {
        self.support = SupportAnswer::No;
        self
    }

    /// Rejects support queries.
    #[must_use]
    pub fn rejecting_support(mut self, reason: impl Into<String>) -> Self {
        self.support = SupportAnswer::Reject(reason.into());
        self
    }

    /// Sessions cannot hit-test.
    #[must_use]
    pub fn without_hit_test(mut self) -> Self {
        self.hit_test_api = false;
        self
    }

    /// Rejects session requests.
    #[must_use]
    pub fn rejecting_sessions(mut self, reason: impl Into<String>) -> Self {
        self.session_rejection = Some(reason.into());
        self
    }

    /// Sessions fail to provide a reference space.
    #[must_use]
    pub fn failing_reference_space(mut self, reason: impl Into<String>) -> Self {
        self.reference_space_failure = Some(reason.into());
        self
    }

    /// Sessions fail to create a base layer.
    #[must_use]
    pub fn failing_base_layer(mut self, reason: impl Into<String>) -> Self {
        self.base_layer_failure = Some(reason.into());
        self
    }

    /// Sessions refuse every frame request, starting with the first.
    #[must_use]
    pub fn failing_scheduling(mut self) -> Self {
        self.scheduling_failure = true;
        self
    }

    /// Sets the full-surface viewport of created sessions.
    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Number of support queries received.
    pub fn support_queries(&self) -> usize {
        self.support_queries.get()
    }

    /// Number of session requests received.
    pub fn session_requests(&self) -> usize {
        self.session_requests.get()
    }

    /// The most recently created session.
    pub fn last_session(&self) -> Option<SimSession> {
        self.sessions.borrow().last().cloned()
    }
}

impl XrSystem for SimSystem {
    type Session = SimSession;

    async fn is_session_supported(&self, _mode: SessionMode) -> Result<bool> {
        self.support_queries.set(self.support_queries.get() + 1);
        match &self.support {
            SupportAnswer::Yes => Ok(true),
            SupportAnswer::No => Ok(false),
            SupportAnswer::Reject(reason) => Err(ArError::UnsupportedEnvironment(reason.clone())),
        }
    }

    async fn request_session(&self, mode: SessionMode) -> Result<SimSession> {
        self.session_requests.set(self.session_requests.get() + 1);
        if let Some(reason) = &self.session_rejection {
            return Err(ArError::SessionRequestFailed(reason.clone()));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        log::debug!("Simulated '{}' session {id} created", mode.as_str());
        let session = SimSession {
            inner: Rc::new(SimSessionInner {
                id: SessionId(id),
                viewport: self.viewport,
                reference_space_failure: self.reference_space_failure.clone(),
                base_layer_failure: self.base_layer_failure.clone(),
                active: Cell::new(true),
                base_layer: Cell::new(None),
                input_sources: RefCell::new(Vec::new()),
                frame_callbacks: RefCell::new(Vec::new()),
                hit_tests: RefCell::new(Vec::new()),
                fail_scheduling: Cell::new(self.scheduling_failure),
                reference_space_requests: Cell::new(0),
                animation_frame_requests: Cell::new(0),
                hit_test_spaces: RefCell::new(Vec::new()),
            }),
        };
        self.sessions.borrow_mut().push(session.clone());
        Ok(session)
    }

    fn supports_hit_test(&self) -> bool {
        self.hit_test_api
    }
}

struct PendingHitTest {
    ray: Ray,
    callback: HitTestCallback,
}

struct SimSessionInner {
    id: SessionId,
    viewport: Viewport,
    reference_space_failure: Option<String>,
    base_layer_failure: Option<String>,
    active: Cell<bool>,
    base_layer: Cell<Option<GraphicsContext>>,
    input_sources: RefCell<Vec<InputSource>>,
    frame_callbacks: RefCell<Vec<FrameCallback>>,
    hit_tests: RefCell<Vec<PendingHitTest>>,
    fail_scheduling: Cell<bool>,
    reference_space_requests: Cell<usize>,
    animation_frame_requests: Cell<usize>,
    hit_test_spaces: RefCell<Vec<SpaceHandle>>,
}

/// A scripted session. Clones share state, so a test can keep a handle.
#[derive(Clone)]
pub struct SimSession {
    inner: Rc<SimSessionInner>,
}

impl std::fmt::Debug for SimSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimSession")
            .field("id", &self.inner.id)
            .field("active", &self.inner.active.get())
            .finish_non_exhaustive()
    }
}

impl SimSession {
    /// Replaces the active input sources.
    pub fn set_input_sources(&self, sources: Vec<InputSource>) {
        *self.inner.input_sources.borrow_mut() = sources;
    }

    /// Makes future `request_animation_frame` calls fail.
    pub fn fail_scheduling(&self, fail: bool) {
        self.inner.fail_scheduling.set(fail);
    }

    /// Runs every queued frame callback once with `frame`. Returns how many ran.
    ///
    /// Callbacks registered while running are queued for the next call.
    pub fn run_frame(&self, time: f64, frame: &SimFrame) -> usize {
        let callbacks = std::mem::take(&mut *self.inner.frame_callbacks.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback(time, frame);
        }
        count
    }

    /// Frame callbacks waiting for the next refresh.
    pub fn pending_frame_callbacks(&self) -> usize {
        self.inner.frame_callbacks.borrow().len()
    }

    /// Hit-test requests waiting for resolution.
    pub fn pending_hit_tests(&self) -> usize {
        self.inner.hit_tests.borrow().len()
    }

    /// Rays of the pending hit-test requests, oldest first.
    pub fn pending_hit_test_rays(&self) -> Vec<Ray> {
        self.inner.hit_tests.borrow().iter().map(|p| p.ray).collect()
    }

    /// Resolves the pending request at `index` (oldest first).
    ///
    /// Returns `false` if there is no such request.
    pub fn resolve_hit_test(&self, index: usize, result: Result<Vec<HitTestResult>>) -> bool {
        let pending = {
            let mut hit_tests = self.inner.hit_tests.borrow_mut();
            if index >= hit_tests.len() {
                return false;
            }
            hit_tests.remove(index)
        };
        (pending.callback)(result);
        true
    }

    /// Drops every pending request without resolving it, as a host may do
    /// when it gives up on a request. Returns how many were dropped.
    pub fn discard_pending_hit_tests(&self) -> usize {
        let pending = std::mem::take(&mut *self.inner.hit_tests.borrow_mut());
        pending.len()
    }

    /// Resolves every pending request with a clone of `hits`.
    pub fn resolve_all_hit_tests(&self, hits: &[HitTestResult]) -> usize {
        let pending = std::mem::take(&mut *self.inner.hit_tests.borrow_mut());
        let count = pending.len();
        for request in pending {
            (request.callback)(Ok(hits.to_vec()));
        }
        count
    }

    /// Number of reference-space requests received.
    pub fn reference_space_requests(&self) -> usize {
        self.inner.reference_space_requests.get()
    }

    /// Number of animation-frame requests received.
    pub fn animation_frame_requests(&self) -> usize {
        self.inner.animation_frame_requests.get()
    }

    /// Reference spaces of every hit-test request received, in order.
    pub fn hit_test_spaces(&self) -> Vec<SpaceHandle> {
        self.inner.hit_test_spaces.borrow().clone()
    }

    /// Graphics context the base layer was created from.
    pub fn base_layer(&self) -> Option<GraphicsContext> {
        self.inner.base_layer.get()
    }
}

impl XrSession for SimSession {
    fn id(&self) -> SessionId {
        self.inner.id
    }

    async fn request_reference_space(&self, kind: ReferenceSpaceType) -> Result<ReferenceSpace> {
        let count = self.inner.reference_space_requests.get() + 1;
        self.inner.reference_space_requests.set(count);
        if !self.inner.active.get() {
            return Err(ArError::SessionEnded);
        }
        if let Some(reason) = &self.inner.reference_space_failure {
            return Err(ArError::ReferenceSpaceFailed(reason.clone()));
        }
        let handle = SpaceHandle(self.inner.id.0 * 1000 + u64::try_from(count).unwrap_or(u64::MAX));
        Ok(ReferenceSpace::new(handle, kind))
    }

    fn request_animation_frame(&self, callback: FrameCallback) -> Result<()> {
        self.inner
            .animation_frame_requests
            .set(self.inner.animation_frame_requests.get() + 1);
        if !self.inner.active.get() {
            return Err(ArError::SessionEnded);
        }
        if self.inner.fail_scheduling.get() {
            return Err(ArError::SchedulingFailed("host refused frame request".into()));
        }
        self.inner.frame_callbacks.borrow_mut().push(callback);
        Ok(())
    }

    fn input_sources(&self) -> Vec<InputSource> {
        self.inner.input_sources.borrow().clone()
    }

    fn request_hit_test(&self, ray: Ray, space: &ReferenceSpace, callback: HitTestCallback) {
        self.inner.hit_test_spaces.borrow_mut().push(space.handle());
        if !self.inner.active.get() {
            callback(Err(ArError::SessionEnded));
            return;
        }
        self.inner
            .hit_tests
            .borrow_mut()
            .push(PendingHitTest { ray, callback });
    }

    fn viewport(&self, view: &View) -> Option<Viewport> {
        let full = self.inner.viewport;
        let half = full.width / 2;
        let viewport = match view.eye {
            Eye::None => full,
            Eye::Left => Viewport::new(full.x, full.y, half, full.height),
            Eye::Right => Viewport::new(
                full.x + i32::try_from(half).unwrap_or(i32::MAX),
                full.y,
                full.width - half,
                full.height,
            ),
        };
        Some(viewport)
    }

    fn set_base_layer(&self, context: GraphicsContext) -> Result<()> {
        if let Some(reason) = &self.inner.base_layer_failure {
            return Err(ArError::SessionRequestFailed(reason.clone()));
        }
        self.inner.base_layer.set(Some(context));
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    fn end(&self) {
        if self.inner.active.replace(false) {
            self.inner.frame_callbacks.borrow_mut().clear();
            log::info!("Simulated session {:?} ended", self.inner.id);
        }
    }
}

/// Tracking data for one simulated refresh.
#[derive(Debug, Clone, Default)]
pub struct SimFrame {
    viewer_pose: Option<ViewerPose>,
    input_poses: Vec<(SpaceHandle, Pose)>,
    queried_spaces: RefCell<Vec<SpaceHandle>>,
}

impl SimFrame {
    /// A frame where the viewer pose is unavailable.
    pub fn tracking_lost() -> Self {
        Self::default()
    }

    /// A frame reporting `pose`.
    pub fn with_viewer_pose(pose: ViewerPose) -> Self {
        Self {
            viewer_pose: Some(pose),
            ..Self::default()
        }
    }

    /// A single-view frame with the viewer at `position`, looking down -Z.
    pub fn mono(position: Vec3) -> Self {
        let transform = Mat4::from_translation(position);
        Self::with_viewer_pose(ViewerPose {
            transform,
            views: vec![View {
                eye: Eye::None,
                projection_matrix: phone_projection(),
                transform,
            }],
        })
    }

    /// A two-view frame with eyes `ipd` apart around `position`, looking down -Z.
    pub fn stereo(position: Vec3, ipd: f32) -> Self {
        let offset = Vec3::new(ipd * 0.5, 0.0, 0.0);
        let view = |eye, at: Vec3| View {
            eye,
            projection_matrix: Mat4::perspective_rh(1.6, 0.9, 0.01, 100.0),
            transform: Mat4::from_translation(at),
        };
        Self::with_viewer_pose(ViewerPose {
            transform: Mat4::from_translation(position),
            views: vec![
                view(Eye::Left, position - offset),
                view(Eye::Right, position + offset),
            ],
        })
    }

    /// Adds a pose for an input source's target-ray space.
    #[must_use]
    pub fn with_input_pose(mut self, space: SpaceHandle, pose: Pose) -> Self {
        self.input_poses.push((space, pose));
        self
    }

    /// Reference spaces this frame was queried with, in order.
    pub fn queried_spaces(&self) -> Vec<SpaceHandle> {
        self.queried_spaces.borrow().clone()
    }
}

impl XrFrame for SimFrame {
    fn get_viewer_pose(&self, space: &ReferenceSpace) -> Option<ViewerPose> {
        self.queried_spaces.borrow_mut().push(space.handle());
        self.viewer_pose.clone()
    }

    fn get_pose(&self, space: SpaceHandle, base: &ReferenceSpace) -> Option<Pose> {
        self.queried_spaces.borrow_mut().push(base.handle());
        self.input_poses
            .iter()
            .find(|(handle, _)| *handle == space)
            .map(|(_, pose)| *pose)
    }
}

fn phone_projection() -> Mat4 {
    Mat4::perspective_rh(1.0, 1080.0 / 1920.0, 0.01, 100.0)
}

/// A renderer call, as recorded by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    /// `configure`.
    Configure {
        /// Output configuration.
        config: RendererConfig,
        /// Reference space poses are interpreted in.
        reference_space: ReferenceSpaceType,
    },
    /// `bind_session`.
    BindSession(SessionId),
    /// `set_viewport`.
    SetViewport(Viewport),
    /// `render`, with a snapshot of the scene.
    Render {
        /// Nodes drawn.
        nodes: Vec<SceneNode>,
        /// Camera used.
        camera: XrCamera,
    },
}

/// A renderer that records every call instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    calls: Vec<RenderCall>,
    surfaces_created: u64,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call, in order.
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Number of `render` calls.
    pub fn render_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::Render { .. }))
            .count()
    }

    /// Viewports set, in order.
    pub fn viewports(&self) -> Vec<Viewport> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::SetViewport(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// Last configuration applied.
    pub fn config(&self) -> Option<RendererConfig> {
        self.calls.iter().rev().find_map(|c| match c {
            RenderCall::Configure { config, .. } => Some(*config),
            _ => None,
        })
    }

    /// Reference space type of the last configuration.
    pub fn reference_space_type(&self) -> Option<ReferenceSpaceType> {
        self.calls.iter().rev().find_map(|c| match c {
            RenderCall::Configure {
                reference_space, ..
            } => Some(*reference_space),
            _ => None,
        })
    }

    /// Session presented to, if any.
    pub fn bound_session(&self) -> Option<SessionId> {
        self.calls.iter().rev().find_map(|c| match c {
            RenderCall::BindSession(id) => Some(*id),
            _ => None,
        })
    }

    /// Nodes and camera of the last `render` call.
    pub fn last_render(&self) -> Option<(Vec<SceneNode>, XrCamera)> {
        self.calls.iter().rev().find_map(|c| match c {
            RenderCall::Render { nodes, camera } => Some((nodes.clone(), *camera)),
            _ => None,
        })
    }

    /// Number of output surfaces created.
    pub fn surfaces_created(&self) -> u64 {
        self.surfaces_created
    }
}

impl Renderer for RecordingRenderer {
    fn create_output_surface(&mut self) -> OutputSurface {
        let id = self.surfaces_created;
        self.surfaces_created += 1;
        OutputSurface {
            id,
            label: format!("ar-output-{id}"),
        }
    }

    fn configure(&mut self, config: &RendererConfig, reference_space: ReferenceSpaceType) {
        self.calls.push(RenderCall::Configure {
            config: *config,
            reference_space,
        });
    }

    fn context(&self) -> GraphicsContext {
        GraphicsContext(1)
    }

    fn bind_session(&mut self, session: SessionId) {
        self.calls.push(RenderCall::BindSession(session));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.calls.push(RenderCall::SetViewport(viewport));
    }

    fn render(&mut self, scene: &Scene, camera: &XrCamera) {
        self.calls.push(RenderCall::Render {
            nodes: scene.iter().copied().collect(),
            camera: *camera,
        });
    }
}

/// A container that remembers what was mounted into it.
#[derive(Debug, Default)]
pub struct SimContainer {
    mounted: Vec<OutputSurface>,
}

impl SimContainer {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounted surfaces, in order.
    pub fn mounted(&self) -> &[OutputSurface] {
        &self.mounted
    }
}

impl SurfaceContainer for SimContainer {
    fn append(&mut self, surface: OutputSurface) {
        log::debug!("Mounted output surface '{}'", surface.label);
        self.mounted.push(surface);
    }

    fn detach(&mut self, id: u64) -> Option<OutputSurface> {
        let index = self.mounted.iter().position(|s| s.id == id)?;
        log::debug!("Detached output surface '{}'", self.mounted[index].label);
        Some(self.mounted.remove(index))
    }
}
