//! Configuration options for an AR session.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ArError, Result};
use crate::xr::{ReferenceSpaceType, SessionMode, TargetRayMode};

/// Options controlling how the session is requested, rendered and hit-tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArOptions {
    /// Session mode requested from the host.
    pub session_mode: SessionMode,

    /// Reference space used to interpret every pose and hit-test result.
    pub reference_space_type: ReferenceSpaceType,

    /// Targeting mode an input source must report to drive hit-testing.
    pub target_ray_mode: TargetRayMode,

    /// Output configuration handed to the renderer.
    pub renderer: RendererConfig,

    /// Upper bound on hit-test requests awaiting resolution at the same time.
    pub max_in_flight_hit_tests: usize,

    /// The virtual object placed at the hit location.
    pub model: ModelDescriptor,
}

impl Default for ArOptions {
    fn default() -> Self {
        Self {
            session_mode: SessionMode::ImmersiveAr,
            reference_space_type: ReferenceSpaceType::Local,
            target_ray_mode: TargetRayMode::Screen,
            renderer: RendererConfig::default(),
            max_in_flight_hit_tests: 2,
            model: ModelDescriptor::default(),
        }
    }
}

impl ArOptions {
    /// Parses options from a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Loads options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks that the options describe a usable session.
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight_hit_tests == 0 {
            return Err(ArError::InvalidOptions(
                "max_in_flight_hit_tests must be at least 1".into(),
            ));
        }
        if !(self.model.size.is_finite() && self.model.size > 0.0) {
            return Err(ArError::InvalidOptions(format!(
                "model size must be positive, got {}",
                self.model.size
            )));
        }
        Ok(())
    }

    /// Sets the reference space type.
    #[must_use]
    pub fn with_reference_space_type(mut self, kind: ReferenceSpaceType) -> Self {
        self.reference_space_type = kind;
        self
    }

    /// Sets the in-flight hit-test bound.
    #[must_use]
    pub fn with_max_in_flight_hit_tests(mut self, max: usize) -> Self {
        self.max_in_flight_hit_tests = max;
        self
    }

    /// Sets the placed model.
    #[must_use]
    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.model = model;
        self
    }
}

/// Output configuration for the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RendererConfig {
    /// Alpha-blended output so the camera feed shows through.
    pub alpha: bool,
    /// Keep the drawing buffer between frames.
    pub preserve_drawing_buffer: bool,
    /// Clear before each render call. Disabled so stereo views share one buffer.
    pub auto_clear: bool,
    /// Let the renderer manage pose updates from the session's tracking data.
    pub xr_enabled: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            alpha: true,
            preserve_drawing_buffer: true,
            auto_clear: false,
            xr_enabled: true,
        }
    }
}

/// Material applied to the placed model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Material {
    /// Shade by surface normal.
    #[default]
    Normal,
    /// Flat RGB color.
    Flat(Vec3),
}

/// Description of the cube placed on the hit surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDescriptor {
    /// Edge length of the cube, in meters.
    pub size: f32,
    /// Offset baked into the geometry, relative to the object origin.
    pub geometry_offset: Vec3,
    /// Surface material.
    pub material: Material,
}

impl Default for ModelDescriptor {
    fn default() -> Self {
        Self {
            size: 0.1,
            geometry_offset: Vec3::new(0.0, 0.25, 0.0),
            material: Material::Normal,
        }
    }
}
