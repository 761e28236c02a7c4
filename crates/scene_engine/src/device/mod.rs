//! # Graphics Device Boundary
//!
//! The backends never talk to a graphics API directly. They go through
//! [`GraphicsDevice`], which covers exactly what they need:
//!
//! - create a buffer with contents, create a texture from pixels
//! - select one of the fixed shader programs
//! - set a named uniform if the program declares it
//! - bind a texture, draw indexed triangles or a vertex range
//!
//! Uniform sets are best effort: [`GraphicsDevice::set_uniform`] returns
//! whether the uniform exists and never fails.
//!
//! [`RecordingDevice`] implements the trait without a GPU and keeps every
//! call for inspection.

mod recording;

pub use recording::{DeviceCall, RecordingDevice};

use thiserror::Error;

use crate::assets::ImageData;
use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Handle for buffer resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle for texture resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle for linked shader programs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Interleaved vertex attributes
    Vertex,
    /// `u32` triangle indices
    Index,
}

/// The shader programs the backends use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Phong shading with per-vertex color
    FlatColor,
    /// Phong shading with a diffuse texture
    Textured,
    /// Full-screen analytic sphere tracer
    RayTrace,
    /// Translucent bounding sphere overlay
    BoundsOverlay,
}

/// Attribute layout of a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// position: vec3, normal: vec3, color: vec4
    Colored,
    /// position: vec3, normal: vec3, uv: vec2
    Textured,
    /// position: vec2 in clip space
    ScreenQuad,
}

impl VertexLayout {
    /// Number of `f32` components per vertex
    pub const fn floats_per_vertex(self) -> usize {
        match self {
            Self::Colored => 10,
            Self::Textured => 8,
            Self::ScreenQuad => 2,
        }
    }
}

/// Primitive assembly mode for non-indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Independent triangles
    Triangles,
    /// Triangle strip
    TriangleStrip,
}

/// Typed uniform value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// 4x4 matrix
    Mat4(Mat4),
    /// 3 component vector
    Vec3(Vec3),
    /// 4 component vector
    Vec4(Vec4),
    /// Scalar
    Float(f64),
    /// Integer
    Int(i32),
}

/// Device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Handle unknown to this device
    #[error("Invalid handle: {0}")]
    InvalidHandle(u64),

    /// Resource creation failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Draw submitted without a bound program
    #[error("No program bound")]
    NoProgram,
}

/// Result alias for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Minimal graphics device used by the rendering backends
pub trait GraphicsDevice {
    /// Create a buffer holding `contents`
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, contents: &[u8]) -> DeviceResult<BufferHandle>;

    /// Upload an RGBA8 image as a texture
    fn create_texture(&mut self, image: &ImageData) -> DeviceResult<TextureHandle>;

    /// Compile and link one of the fixed programs
    fn create_program(&mut self, kind: ProgramKind) -> DeviceResult<ProgramHandle>;

    /// Make `program` current
    fn use_program(&mut self, program: ProgramHandle) -> DeviceResult<()>;

    /// Set a uniform on the current program; `false` if it is not declared
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool;

    /// Bind a texture to a sampler slot
    fn bind_texture(&mut self, slot: u32, texture: TextureHandle) -> DeviceResult<()>;

    /// Draw `count` indexed vertices as triangles
    fn draw_indexed(
        &mut self,
        vertices: BufferHandle,
        layout: VertexLayout,
        indices: BufferHandle,
        count: u32,
    ) -> DeviceResult<()>;

    /// Draw `count` vertices from the start of `vertices`
    fn draw_arrays(
        &mut self,
        vertices: BufferHandle,
        layout: VertexLayout,
        topology: Topology,
        count: u32,
    ) -> DeviceResult<()>;
}
