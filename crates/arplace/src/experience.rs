//! Start-up orchestration: probe, start the session, acquire the space, run the loop.

use std::rc::Rc;

use arplace_core::{
    ArError, ArOptions, OutputSurface, PlacedObject, ReferenceSpace, Renderer, Result, Scene,
    SurfaceContainer, XrCamera, XrSession, XrSystem,
};
use pollster::FutureExt;

use crate::capability;
use crate::frame_loop::{FrameLoop, FrameStats, LoopState};
use crate::reference_space::ReferenceSpaceProvider;
use crate::session;

/// A running AR experience: one session, its frame loop and the placed object.
pub struct ArExperience<S, R> {
    frame_loop: FrameLoop<S, R>,
}

impl<S, R> ArExperience<S, R>
where
    S: XrSession + 'static,
    R: Renderer + 'static,
{
    /// Current frame-loop state.
    pub fn state(&self) -> LoopState {
        self.frame_loop.state()
    }

    /// Frame-loop counters.
    pub fn stats(&self) -> FrameStats {
        self.frame_loop.stats()
    }

    /// The placed object, once a hit has landed.
    pub fn placed_object(&self) -> Option<PlacedObject> {
        self.frame_loop.placed_object()
    }

    /// The session's reference space.
    pub fn reference_space(&self) -> &ReferenceSpace {
        self.frame_loop.reference_space()
    }

    /// The tracking session.
    pub fn session(&self) -> &Rc<S> {
        self.frame_loop.session()
    }

    /// Camera as of the last rendered view.
    pub fn camera(&self) -> XrCamera {
        self.frame_loop.camera()
    }

    /// Hit-test requests awaiting resolution.
    pub fn in_flight_hit_tests(&self) -> usize {
        self.frame_loop.in_flight_hit_tests()
    }

    /// Access the scene for reading.
    pub fn with_scene<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Scene) -> T,
    {
        self.frame_loop.with_scene(f)
    }

    /// Access the scene for writing, e.g. to rotate it.
    pub fn with_scene_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Scene) -> T,
    {
        self.frame_loop.with_scene_mut(f)
    }

    /// Access the renderer.
    pub fn with_renderer<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R) -> T,
    {
        self.frame_loop.with_renderer(f)
    }

    /// Call when the host reports that the session ended.
    ///
    /// Stops the loop; frames and hit-test resolutions that still arrive are ignored.
    pub fn handle_session_end(&self) {
        self.frame_loop.handle_session_end();
    }
}

/// Starts an AR experience.
///
/// `system` is `None` when the host has no tracking interface at all. Nothing
/// is allocated or mounted unless the capability probe succeeds. If the
/// reference space or the first frame cannot be obtained, the session is ended
/// and its surface unmounted again.
pub async fn launch<X, R, C>(
    system: Option<&X>,
    mut renderer: R,
    container: &mut C,
    options: ArOptions,
) -> Result<ArExperience<X::Session, R>>
where
    X: XrSystem,
    R: Renderer + 'static,
    C: SurfaceContainer,
{
    options.validate()?;

    let support = capability::probe(system, options.session_mode).await;
    let Some(system) = system.filter(|_| support.is_supported()) else {
        return Err(ArError::UnsupportedEnvironment(support.to_string()));
    };

    let started = session::start_session(system, &mut renderer, container, &options).await?;
    let session = Rc::new(started.session);
    let surface = started.surface;

    let mut provider = ReferenceSpaceProvider::new(options.reference_space_type);
    let reference_space = match provider.acquire(session.as_ref()).await {
        Ok(space) => space,
        Err(e) => return Err(abandon(session.as_ref(), container, &surface, e)),
    };

    let frame_loop = FrameLoop::new(Rc::clone(&session), reference_space, renderer, &options);
    if let Err(e) = frame_loop.start() {
        return Err(abandon(session.as_ref(), container, &surface, e));
    }

    Ok(ArExperience { frame_loop })
}

/// Ends a session whose start-up cannot complete and unmounts its surface.
fn abandon<S, C>(
    session: &S,
    container: &mut C,
    surface: &OutputSurface,
    error: ArError,
) -> ArError
where
    S: XrSession,
    C: SurfaceContainer,
{
    log::error!("Ending session {:?}: {error}", session.id());
    session.end();
    container.detach(surface.id);
    error
}

/// Blocking variant of [`launch`] for hosts whose start-up futures complete without an executor.
pub fn launch_blocking<X, R, C>(
    system: Option<&X>,
    renderer: R,
    container: &mut C,
    options: ArOptions,
) -> Result<ArExperience<X::Session, R>>
where
    X: XrSystem,
    R: Renderer + 'static,
    C: SurfaceContainer,
{
    launch(system, renderer, container, options).block_on()
}
