//! Contracts for the rendering engine and the hosting UI surface.

use crate::camera::XrCamera;
use crate::options::RendererConfig;
use crate::scene::Scene;
use crate::xr::{ReferenceSpaceType, SessionId};

/// A rectangle of the output surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Left edge.
    pub x: i32,
    /// Bottom edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Width over height, or 1.0 for an empty viewport.
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Opaque handle to the renderer's graphics context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicsContext(pub u64);

/// A drawable surface created by the renderer and mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSurface {
    /// Renderer-assigned identifier.
    pub id: u64,
    /// Human-readable label.
    pub label: String,
}

/// The rendering engine, consumed as a black box.
pub trait Renderer {
    /// Creates a drawable surface. It is not visible until mounted.
    fn create_output_surface(&mut self) -> OutputSurface;

    /// Applies output configuration. Tracked poses are interpreted in
    /// `reference_space`, the same type the session's space is requested with.
    fn configure(&mut self, config: &RendererConfig, reference_space: ReferenceSpaceType);

    /// Graphics context the session's base layer is created from.
    fn context(&self) -> GraphicsContext;

    /// Presents to the given session from now on.
    fn bind_session(&mut self, session: SessionId);

    /// Restricts drawing to `viewport`.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Draws `scene` through `camera`.
    fn render(&mut self, scene: &Scene, camera: &XrCamera);
}

/// UI container an output surface is mounted into.
pub trait SurfaceContainer {
    /// Appends `surface` to the container.
    fn append(&mut self, surface: OutputSurface);

    /// Removes the surface with the given id, if mounted.
    fn detach(&mut self, id: u64) -> Option<OutputSurface>;
}
