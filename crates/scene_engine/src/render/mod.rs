//! # Rendering System
//!
//! Two interchangeable backends draw the same scene graph:
//!
//! - **Raster**: one draw object per geometry leaf, tessellated once in a
//!   setup pass and drawn with Phong shading every frame
//! - **Ray trace**: spheres collected into fixed-size uniform arrays and
//!   shaded analytically by a single full-screen quad
//!
//! Both run the three-pass traversal from [`crate::traversal`] and differ only
//! in their [`RenderStrategy`](crate::traversal::RenderStrategy). Picking
//! reuses the same traversal to test cursor rays against fitted bounding
//! spheres. [`SceneRenderer`] owns a device and switches between backends.
//!
//! ## Error model
//!
//! Configuration problems (too many spheres, malformed rays, singular group
//! transforms) are returned as [`RenderError`]. Resources that are not ready
//! yet are not errors: the node is skipped for that frame and logged at
//! `debug`.

pub mod picking;
pub mod raster;
pub mod raytrace;
mod renderer;

pub use picking::{Cursor, PickHit, Picker};
pub use raster::RasterBackend;
pub use raytrace::{RayTraceBackend, SphereUniformBuffer};
pub use renderer::{BackendMode, SceneRenderer};

use thiserror::Error;

use crate::device::{DeviceError, GraphicsDevice, UniformValue};
use crate::foundation::math::Vec3;

/// Errors from rendering, tracing and picking
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Ray direction has zero length or is not finite
    #[error("Invalid ray: direction must be finite and non-zero")]
    InvalidRay,

    /// Sphere radius must be greater than zero
    #[error("Invalid sphere radius {0}; must be greater than zero")]
    InvalidRadius(f64),

    /// More spheres than the ray tracer's uniform arrays hold
    #[error("Sphere capacity of {capacity} exceeded")]
    CapacityExceeded {
        /// Configured capacity
        capacity: usize,
    },

    /// A group transform or camera projection cannot be inverted
    #[error("Transform of '{0}' is singular")]
    SingularTransform(String),

    /// The graphics device rejected a call
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Upload `lightPositions[i]` and `numLights` to the bound program
pub(crate) fn upload_lights(device: &mut dyn GraphicsDevice, positions: &[Vec3]) {
    for (i, position) in positions.iter().enumerate() {
        device.set_uniform(&format!("lightPositions[{i}]"), UniformValue::Vec3(*position));
    }
    device.set_uniform("numLights", UniformValue::Int(i32::try_from(positions.len()).unwrap_or(i32::MAX)));
}
