//! arplace: an augmented-reality session loop.
//!
//! Establishes an immersive tracking session, keeps a camera in sync with the
//! tracked viewer every display refresh, and hit-tests the view center against
//! the physical environment to place a single virtual object.
//!
//! # Quick Start
//!
//! ```no_run
//! use arplace::sim::{RecordingRenderer, SimContainer, SimSystem};
//! use arplace::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let system = SimSystem::new();
//!     let mut container = SimContainer::new();
//!     let experience = launch_blocking(
//!         Some(&system),
//!         RecordingRenderer::new(),
//!         &mut container,
//!         ArOptions::default(),
//!     )?;
//!     assert_eq!(experience.state(), LoopState::Running);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Control flows leaf-first through:
//!
//! - [`capability`] - probes the host before anything is allocated
//! - [`session`] - requests the session and binds it to the renderer and container
//! - [`reference_space`] - obtains the session's coordinate frame, once
//! - [`frame_loop`] - re-arms every refresh, syncs the camera, renders
//! - [`hit_test`] - turns the active pointer into asynchronous hit tests
//! - [`placement`] - moves the object to the hit and turns it to the viewer
//!
//! Host platforms plug in through the [`XrSystem`], [`XrSession`], [`XrFrame`],
//! [`Renderer`] and [`SurfaceContainer`] traits. [`sim`] provides a scripted host.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod capability;
pub mod experience;
pub mod frame_loop;
pub mod placement;
pub mod reference_space;
pub mod session;
pub mod sim;

// Re-export core types
pub use arplace_core::{
    error::{ArError, Result},
    options::{ArOptions, Material, ModelDescriptor, RendererConfig},
    Eye, GraphicsContext, Handedness, HitTestResult, InputSource, Mat4, ObjectId, OutputSurface,
    PlacedObject, Pose, Quat, Ray, ReferenceSpace, ReferenceSpaceType, Renderer, Scene,
    SessionId, SessionMode, SpaceHandle, SurfaceContainer, TargetRayMode, Transform, Vec2, Vec3,
    View, ViewerPose, Viewport, XrCamera, XrFrame, XrSession, XrSystem,
};

pub use capability::{check_support, Support};
pub use experience::{launch, launch_blocking, ArExperience};
pub use frame_loop::{FrameLoop, FrameStats, LoopState};
pub use hit_test::{HitTestOutcome, HitTestResolver, Resolution};
pub use placement::PlacementController;
pub use reference_space::ReferenceSpaceProvider;
pub use session::{start_session, StartedSession};

/// Initializes `env_logger` from the environment (`RUST_LOG`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
