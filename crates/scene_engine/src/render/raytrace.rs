//! Analytic sphere ray tracing backend
//!
//! The render pass gathers every sphere leaf into [`SphereUniformBuffer`],
//! three parallel arrays of view space centers, radii and colors. One
//! full-screen quad then runs the per-pixel solve on the device. The same
//! solve is available on the CPU through [`SphereUniformBuffer::shade`] and
//! [`RayTraceBackend::trace_image`].
//!
//! Only spheres are traced; every other leaf is traversed and ignored.

use crate::assets::ImageData;
use crate::config::RayTraceConfig;
use crate::device::{
    BufferHandle, BufferUsage, DeviceError, GraphicsDevice, ProgramHandle, ProgramKind, Topology, UniformValue,
    VertexLayout,
};
use crate::foundation::math::{utils, Mat4, Vec3, Vec4};
use crate::intersection::{Intersection, Ray, Sphere};
use crate::lighting::{phong, PhongCoefficients, SharedPhong};
use crate::scene::SceneGraph;
use crate::traversal::{run_frame, ActiveCamera, FrameContext, GeometryRef, NodeRef, RenderStrategy};

use super::{upload_lights, RenderError, RenderResult};

/// Clip space corners of the full-screen triangle strip
pub const SCREEN_QUAD: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// Color of pixels that hit no sphere
const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Fixed capacity sphere arrays mirroring the shader's uniforms
#[derive(Debug, Clone, PartialEq)]
pub struct SphereUniformBuffer {
    capacity: usize,
    centers: Vec<Vec3>,
    radii: Vec<f64>,
    colors: Vec<Vec4>,
}

impl SphereUniformBuffer {
    /// Empty buffer holding at most `capacity` spheres
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            centers: Vec::with_capacity(capacity),
            radii: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    /// Maximum number of spheres
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of spheres held
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Whether no sphere is held
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Drop all spheres
    pub fn clear(&mut self) {
        self.centers.clear();
        self.radii.clear();
        self.colors.clear();
    }

    /// Append a sphere
    pub fn push(&mut self, center: Vec3, radius: f64, color: Vec4) -> RenderResult<()> {
        if self.len() >= self.capacity {
            return Err(RenderError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(RenderError::InvalidRadius(radius));
        }
        self.centers.push(center);
        self.radii.push(radius);
        self.colors.push(color);
        Ok(())
    }

    /// Sphere centers
    pub fn centers(&self) -> &[Vec3] {
        &self.centers
    }

    /// Sphere radii
    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Sphere colors
    pub fn colors(&self) -> &[Vec4] {
        &self.colors
    }

    /// Nearest sphere hit by `ray`, with its index
    pub fn trace(&self, ray: &Ray) -> Option<(usize, Intersection)> {
        let mut nearest: Option<(usize, Intersection)> = None;
        for (i, (center, radius)) in self.centers.iter().zip(&self.radii).enumerate() {
            let Ok(sphere) = Sphere::new(*center, *radius) else {
                continue;
            };
            let hit = sphere.intersect(ray);
            let closer = nearest.map_or(hit.is_hit(), |(_, best)| hit.closer_than(&best));
            if closer {
                nearest = Some((i, hit));
            }
        }
        nearest
    }

    /// Phong color seen along `ray`, `None` on a miss
    ///
    /// The ray origin is the eye; `lights` must be in the same space.
    pub fn shade(&self, ray: &Ray, lights: &[Vec3], coefficients: &PhongCoefficients) -> Option<Vec4> {
        let (index, hit) = self.trace(ray)?;
        Some(phong(
            &hit.point,
            &hit.normal,
            &ray.origin,
            lights,
            &self.colors[index],
            coefficients,
        ))
    }

    /// Set `sphereCenters[i]`, `sphereRadii[i]`, `sphereColors[i]` and `spheres`
    pub fn upload(&self, device: &mut dyn GraphicsDevice) {
        for (i, center) in self.centers.iter().enumerate() {
            device.set_uniform(&format!("sphereCenters[{i}]"), UniformValue::Vec3(*center));
            device.set_uniform(&format!("sphereRadii[{i}]"), UniformValue::Float(self.radii[i]));
            device.set_uniform(&format!("sphereColors[{i}]"), UniformValue::Vec4(self.colors[i]));
        }
        device.set_uniform("spheres", UniformValue::Int(i32::try_from(self.len()).unwrap_or(i32::MAX)));
    }
}

/// Collects view space spheres during the render pass
struct SphereCollector<'a> {
    spheres: &'a mut SphereUniformBuffer,
}

impl RenderStrategy for SphereCollector<'_> {
    fn begin_frame(&mut self, _frame: &FrameContext, _camera: &ActiveCamera) -> RenderResult<()> {
        self.spheres.clear();
        Ok(())
    }

    fn draw_geometry(
        &mut self,
        node: NodeRef<'_>,
        geometry: GeometryRef<'_>,
        model: &Mat4,
        camera: &ActiveCamera,
    ) -> RenderResult<()> {
        let GeometryRef::Sphere(sphere) = geometry else {
            log::trace!("Ray tracer ignores '{}'", node.id);
            return Ok(());
        };
        let model_view = camera.view * model;
        self.spheres.push(
            utils::transform_point(&model_view, &sphere.center()),
            sphere.radius() * utils::max_axis_scale(&model_view),
            sphere.color,
        )
    }
}

/// Ray tracing backend
#[derive(Debug)]
pub struct RayTraceBackend {
    phong: SharedPhong,
    program: Option<ProgramHandle>,
    quad: Option<BufferHandle>,
    spheres: SphereUniformBuffer,
}

impl RayTraceBackend {
    /// Backend with the configured sphere capacity
    pub fn new(config: &RayTraceConfig, phong: SharedPhong) -> Self {
        Self {
            phong,
            program: None,
            quad: None,
            spheres: SphereUniformBuffer::new(config.max_spheres),
        }
    }

    /// Create the program and the screen quad if not done yet
    pub fn setup(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        if self.program.is_none() {
            self.program = Some(device.create_program(ProgramKind::RayTrace)?);
        }
        if self.quad.is_none() {
            let bytes: &[u8] = bytemuck::cast_slice(&SCREEN_QUAD);
            self.quad = Some(device.create_buffer("screen quad", BufferUsage::Vertex, bytes)?);
        }
        Ok(())
    }

    /// Spheres gathered by the most recent frame
    pub fn spheres(&self) -> &SphereUniformBuffer {
        &self.spheres
    }

    /// Draw one frame; `false` when the scene has no camera
    pub fn render(&mut self, graph: &SceneGraph, device: &mut dyn GraphicsDevice) -> RenderResult<bool> {
        self.setup(device)?;
        let Some(frame) = self.collect(graph)? else {
            return Ok(false);
        };
        let Some(camera) = frame.camera.as_ref() else {
            return Ok(false);
        };
        let (Some(program), Some(quad)) = (self.program, self.quad) else {
            return Err(DeviceError::NoProgram.into());
        };

        let inverse_projection = camera.inverse_projection()?;
        let inverse_view_projection = camera.inverse_view_projection()?;

        device.use_program(program)?;
        self.spheres.upload(device);
        device.set_uniform("invProjection", UniformValue::Mat4(inverse_projection));
        device.set_uniform("invViewProjection", UniformValue::Mat4(inverse_view_projection));
        upload_lights(device, &frame.view_light_positions());
        self.phong.get().upload(device);
        device.draw_arrays(quad, VertexLayout::ScreenQuad, Topology::TriangleStrip, 4)?;

        log::trace!("Ray traced {} sphere(s)", self.spheres.len());
        Ok(true)
    }

    /// Trace a frame on the CPU into an RGBA8 image
    ///
    /// Pixel rays start at the eye and pass through pixel centers on the
    /// near plane. Returns `None` when the scene has no camera.
    pub fn trace_image(&mut self, graph: &SceneGraph, width: u32, height: u32) -> RenderResult<Option<ImageData>> {
        let Some(frame) = self.collect(graph)? else {
            return Ok(None);
        };
        let Some(camera) = frame.camera.as_ref() else {
            return Ok(None);
        };

        let inverse_projection = camera.inverse_projection()?;
        let lights = frame.view_light_positions();
        let coefficients = self.phong.get();

        let mut image = ImageData::solid_color(width, height, BACKGROUND);
        for py in 0..height {
            for px in 0..width {
                let ndc_x = (f64::from(px) + 0.5) / f64::from(width) * 2.0 - 1.0;
                let ndc_y = 1.0 - (f64::from(py) + 0.5) / f64::from(height) * 2.0;
                let near = utils::transform_point(&inverse_projection, &Vec3::new(ndc_x, ndc_y, -1.0));
                let ray = Ray::new(Vec3::zeros(), near)?;

                if let Some(color) = self.spheres.shade(&ray, &lights, &coefficients) {
                    image.put_pixel(px, py, [
                        to_channel(color.x),
                        to_channel(color.y),
                        to_channel(color.z),
                        to_channel(color.w),
                    ]);
                }
            }
        }

        Ok(Some(image))
    }

    /// Gather the frame's spheres; the buffer is left empty on error or
    /// without a camera
    fn collect(&mut self, graph: &SceneGraph) -> RenderResult<Option<FrameContext>> {
        let collected = run_frame(
            graph,
            &mut SphereCollector {
                spheres: &mut self.spheres,
            },
        );
        if !matches!(collected, Ok(Some(_))) {
            self.spheres.clear();
        }
        collected
    }
}

fn to_channel(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
