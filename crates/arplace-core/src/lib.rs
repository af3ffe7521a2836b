//! Core abstractions for arplace-rs.
//!
//! This crate provides the contracts and value types shared by the AR session loop:
//! - [`XrSystem`], [`XrSession`] and [`XrFrame`] traits describing the host tracking platform
//! - [`Renderer`] and [`SurfaceContainer`] traits describing the rendering engine and UI mount
//! - [`XrCamera`], [`Scene`] and [`Transform`] for camera and placement math
//! - Configuration options and error types

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Host traits are consumed from a single thread; Send bounds on their futures are not wanted
#![allow(async_fn_in_trait)]

pub mod camera;
pub mod error;
pub mod options;
pub mod render;
pub mod scene;
pub mod transform;
pub mod xr;

pub use camera::XrCamera;
pub use error::{ArError, Result};
pub use options::{ArOptions, Material, ModelDescriptor, RendererConfig};
pub use render::{GraphicsContext, OutputSurface, Renderer, SurfaceContainer, Viewport};
pub use scene::{ObjectId, PlacedObject, Scene, SceneNode};
pub use transform::Transform;
pub use xr::{
    Eye, FrameCallback, Handedness, HitTestCallback, HitTestResult, InputSource, Pose, Ray,
    ReferenceSpace, ReferenceSpaceType, SessionId, SessionMode, SpaceHandle, TargetRayMode, View,
    ViewerPose, XrFrame, XrSession, XrSystem,
};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
