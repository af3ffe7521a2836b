//! The per-frame driver.
//!
//! Each tick re-arms itself with the host before doing any work, then syncs the
//! camera to every tracked view, issues hit tests and renders. Hit-test
//! resolutions arrive later as messages on the same thread and are applied only
//! while the loop is still running.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use arplace_core::{
    ArError, ArOptions, PlacedObject, ReferenceSpace, Renderer, Result, Scene, XrCamera, XrFrame,
    XrSession,
};

use crate::hit_test::{HitTestOutcome, HitTestResolver, Resolution};
use crate::placement::PlacementController;

/// State of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Not started, or stopped after the session ended.
    #[default]
    Stopped,
    /// Re-arming every display refresh.
    Running,
}

/// Counters accumulated over the life of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frame callbacks processed while running.
    pub ticks: u64,
    /// Ticks with no viewer pose.
    pub skipped_frames: u64,
    /// Views rendered.
    pub rendered_views: u64,
    /// Hit-test requests issued.
    pub hit_tests_requested: u64,
    /// Hit tests skipped because too many were in flight.
    pub hit_tests_throttled: u64,
    /// Requests the host rejected.
    pub hit_test_failures: u64,
    /// Requests that resolved with no result.
    pub hit_test_misses: u64,
    /// Hits applied to the placed object.
    pub placements: u64,
    /// Resolutions that arrived after the session ended.
    pub late_resolutions: u64,
}

struct LoopShared<S, R> {
    session: Rc<S>,
    reference_space: ReferenceSpace,
    renderer: RefCell<R>,
    camera: Cell<XrCamera>,
    scene: RefCell<Scene>,
    placement: RefCell<PlacementController>,
    resolver: HitTestResolver,
    state: Cell<LoopState>,
    stats: Cell<FrameStats>,
}

impl<S, R> LoopShared<S, R>
where
    S: XrSession + 'static,
    R: Renderer + 'static,
{
    fn bump(&self, update: impl FnOnce(&mut FrameStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    fn is_live(&self) -> bool {
        self.state.get() == LoopState::Running && self.session.is_active()
    }

    fn stop(&self, reason: &str) {
        if self.state.replace(LoopState::Stopped) == LoopState::Running {
            log::info!("Frame loop for session {:?} stopped: {reason}", self.session.id());
        }
    }

    fn schedule(shared: &Rc<Self>) -> Result<()> {
        let weak = Rc::downgrade(shared);
        shared
            .session
            .request_animation_frame(Box::new(move |time: f64, frame: &dyn XrFrame| {
                if let Some(shared) = weak.upgrade() {
                    Self::tick(&shared, time, frame);
                }
            }))
    }

    fn tick(shared: &Rc<Self>, time: f64, frame: &dyn XrFrame) {
        if shared.state.get() != LoopState::Running {
            log::trace!("Ignoring frame at {time:.1}ms: loop stopped");
            return;
        }
        if !shared.session.is_active() {
            shared.stop("session ended");
            return;
        }
        shared.bump(|s| s.ticks += 1);

        if let Err(e) = Self::schedule(shared) {
            log::error!("Could not schedule next frame: {e}");
            shared.stop("scheduling failed");
        }

        let Some(pose) = frame.get_viewer_pose(&shared.reference_space) else {
            log::debug!("No viewer pose at {time:.1}ms, skipping render");
            shared.bump(|s| s.skipped_frames += 1);
            return;
        };

        for view in &pose.views {
            if let Some(viewport) = shared.session.viewport(view) {
                shared.renderer.borrow_mut().set_viewport(viewport);
            }
            let camera = XrCamera::from_view(view);
            shared.camera.set(camera);

            Self::process_input(shared, frame, &camera);

            shared
                .renderer
                .borrow_mut()
                .render(&shared.scene.borrow(), &camera);
            shared.bump(|s| s.rendered_views += 1);
        }
    }

    fn process_input(shared: &Rc<Self>, frame: &dyn XrFrame, camera: &XrCamera) {
        let weak: Weak<Self> = Rc::downgrade(shared);
        let outcome = shared.resolver.resolve(
            shared.session.as_ref(),
            frame,
            camera,
            &shared.reference_space,
            move |resolution| match weak.upgrade() {
                Some(shared) => shared.on_resolution(resolution),
                None => log::debug!("Hit test resolved after its frame loop was dropped"),
            },
        );
        match outcome {
            HitTestOutcome::Requested => shared.bump(|s| s.hit_tests_requested += 1),
            HitTestOutcome::Throttled => shared.bump(|s| s.hit_tests_throttled += 1),
            HitTestOutcome::NoInputSource | HitTestOutcome::NoInputPose => {}
        }
    }

    fn on_resolution(&self, resolution: Resolution) {
        if !self.is_live() {
            log::debug!("Dropping hit-test resolution for ended session {:?}", self.session.id());
            self.bump(|s| s.late_resolutions += 1);
            return;
        }
        match resolution {
            Resolution::Hit(result) => {
                let camera = self.camera.get();
                self.placement
                    .borrow_mut()
                    .apply_hit(&result, &camera, &mut self.scene.borrow_mut());
                self.bump(|s| s.placements += 1);
            }
            Resolution::Miss => self.bump(|s| s.hit_test_misses += 1),
            Resolution::Failed(_) => self.bump(|s| s.hit_test_failures += 1),
        }
    }
}

/// Drives rendering and hit-testing for one session.
///
/// The loop runs for as long as this value is alive and the session is active.
/// Pending host callbacks hold only weak references to it.
pub struct FrameLoop<S, R> {
    shared: Rc<LoopShared<S, R>>,
}

impl<S, R> FrameLoop<S, R>
where
    S: XrSession + 'static,
    R: Renderer + 'static,
{
    /// Creates a stopped loop for `session`.
    pub fn new(
        session: Rc<S>,
        reference_space: ReferenceSpace,
        renderer: R,
        options: &ArOptions,
    ) -> Self {
        Self {
            shared: Rc::new(LoopShared {
                session,
                reference_space,
                renderer: RefCell::new(renderer),
                camera: Cell::new(XrCamera::default()),
                scene: RefCell::new(Scene::new()),
                placement: RefCell::new(PlacementController::new(options.model)),
                resolver: HitTestResolver::new(
                    options.target_ray_mode,
                    options.max_in_flight_hit_tests,
                ),
                state: Cell::new(LoopState::Stopped),
                stats: Cell::new(FrameStats::default()),
            }),
        }
    }

    /// Schedules the first tick.
    pub fn start(&self) -> Result<()> {
        if !self.shared.session.is_active() {
            return Err(ArError::SessionEnded);
        }
        if self.shared.state.get() == LoopState::Running {
            return Ok(());
        }
        self.shared.state.set(LoopState::Running);
        if let Err(e) = LoopShared::schedule(&self.shared) {
            self.shared.state.set(LoopState::Stopped);
            return Err(match e {
                ArError::SchedulingFailed(_) => e,
                other => ArError::SchedulingFailed(other.to_string()),
            });
        }
        log::info!("Frame loop for session {:?} started", self.shared.session.id());
        Ok(())
    }

    /// Moves the loop to `Stopped` after the host reports the session ended.
    pub fn handle_session_end(&self) {
        self.shared.stop("session end reported");
    }

    /// Current state.
    pub fn state(&self) -> LoopState {
        self.shared.state.get()
    }

    /// Counters so far.
    pub fn stats(&self) -> FrameStats {
        self.shared.stats.get()
    }

    /// The session being driven.
    pub fn session(&self) -> &Rc<S> {
        &self.shared.session
    }

    /// The reference space shared by every frame and hit test.
    pub fn reference_space(&self) -> &ReferenceSpace {
        &self.shared.reference_space
    }

    /// Camera as of the most recently processed view.
    pub fn camera(&self) -> XrCamera {
        self.shared.camera.get()
    }

    /// Placed object, if any hit has been applied.
    pub fn placed_object(&self) -> Option<PlacedObject> {
        self.shared.placement.borrow().object().copied()
    }

    /// Hit-test requests awaiting resolution.
    pub fn in_flight_hit_tests(&self) -> usize {
        self.shared.resolver.in_flight()
    }

    /// Access the scene for reading.
    pub fn with_scene<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Scene) -> T,
    {
        f(&self.shared.scene.borrow())
    }

    /// Access the scene for writing.
    pub fn with_scene_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Scene) -> T,
    {
        f(&mut self.shared.scene.borrow_mut())
    }

    /// Access the renderer.
    pub fn with_renderer<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R) -> T,
    {
        f(&self.shared.renderer.borrow())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RecordingRenderer, SimFrame, SimSession, SimSystem};
    use arplace_core::{
        HitTestResult, InputSource, Mat4, Pose, ReferenceSpaceType, SessionMode, SpaceHandle,
        Vec3, XrSystem,
    };
    use pollster::FutureExt;

    const TAP: SpaceHandle = SpaceHandle(900);

    fn running_loop() -> (SimSession, FrameLoop<SimSession, RecordingRenderer>) {
        let system = SimSystem::new();
        let session = system
            .request_session(SessionMode::ImmersiveAr)
            .block_on()
            .expect("session");
        let space = session
            .request_reference_space(ReferenceSpaceType::Local)
            .block_on()
            .expect("space");
        let frame_loop = FrameLoop::new(
            Rc::new(session.clone()),
            space,
            RecordingRenderer::new(),
            &ArOptions::default(),
        );
        frame_loop.start().expect("start");
        (session, frame_loop)
    }

    fn tapping(frame: SimFrame) -> SimFrame {
        frame.with_input_pose(
            TAP,
            Pose {
                transform: Mat4::IDENTITY,
            },
        )
    }

    #[test]
    fn test_start_schedules_once() {
        let (session, frame_loop) = running_loop();
        assert_eq!(frame_loop.state(), LoopState::Running);
        assert_eq!(session.pending_frame_callbacks(), 1);
        frame_loop.start().expect("second start is a no-op");
        assert_eq!(session.pending_frame_callbacks(), 1);
    }

    #[test]
    fn test_lost_pose_still_reschedules() {
        let (session, frame_loop) = running_loop();
        session.run_frame(16.0, &SimFrame::tracking_lost());

        assert_eq!(session.pending_frame_callbacks(), 1);
        assert_eq!(frame_loop.with_renderer(RecordingRenderer::render_count), 0);
        assert_eq!(frame_loop.stats().skipped_frames, 1);
    }

    #[test]
    fn test_renders_each_view() {
        let (session, frame_loop) = running_loop();
        session.run_frame(16.0, &SimFrame::stereo(Vec3::new(0.0, 1.6, 0.0), 0.064));

        assert_eq!(frame_loop.with_renderer(RecordingRenderer::render_count), 2);
        assert_eq!(frame_loop.with_renderer(|r| r.viewports().len()), 2);
        let camera = frame_loop.camera();
        assert!((camera.position() - Vec3::new(0.032, 1.6, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_hit_places_object() {
        let (session, frame_loop) = running_loop();
        session.set_input_sources(vec![InputSource::screen(TAP)]);
        session.run_frame(16.0, &tapping(SimFrame::mono(Vec3::new(0.0, 1.6, 0.0))));
        assert_eq!(session.pending_hit_tests(), 1);

        session.resolve_hit_test(
            0,
            Ok(vec![HitTestResult {
                hit_matrix: Mat4::from_translation(Vec3::new(0.0, 0.0, -1.5)),
            }]),
        );

        let object = frame_loop.placed_object().expect("placed");
        assert_eq!(object.transform.translation, Vec3::new(0.0, 0.0, -1.5));
        assert_eq!(frame_loop.with_scene(Scene::len), 1);
        assert_eq!(frame_loop.stats().placements, 1);
    }

    #[test]
    fn test_session_end_stops_loop_and_drops_late_hits() {
        let (session, frame_loop) = running_loop();
        session.set_input_sources(vec![InputSource::screen(TAP)]);
        session.run_frame(16.0, &tapping(SimFrame::mono(Vec3::ZERO)));

        session.end();
        frame_loop.handle_session_end();
        assert_eq!(frame_loop.state(), LoopState::Stopped);

        session.resolve_hit_test(
            0,
            Ok(vec![HitTestResult {
                hit_matrix: Mat4::from_translation(Vec3::X),
            }]),
        );
        assert!(frame_loop.placed_object().is_none());
        assert_eq!(frame_loop.stats().late_resolutions, 1);
    }

    #[test]
    fn test_scheduling_failure_stops_after_current_frame() {
        let (session, frame_loop) = running_loop();
        session.fail_scheduling(true);
        session.run_frame(16.0, &SimFrame::mono(Vec3::ZERO));

        assert_eq!(frame_loop.state(), LoopState::Stopped);
        assert_eq!(frame_loop.with_renderer(RecordingRenderer::render_count), 1);
        assert_eq!(session.pending_frame_callbacks(), 0);
    }

    #[test]
    fn test_inactive_session_refuses_start() {
        let system = SimSystem::new();
        let session = system
            .request_session(SessionMode::ImmersiveAr)
            .block_on()
            .expect("session");
        let space = session
            .request_reference_space(ReferenceSpaceType::Local)
            .block_on()
            .expect("space");
        session.end();
        let frame_loop = FrameLoop::new(
            Rc::new(session),
            space,
            RecordingRenderer::new(),
            &ArOptions::default(),
        );
        assert!(matches!(frame_loop.start(), Err(ArError::SessionEnded)));
    }
}
