//! Rasterization backend
//!
//! Geometry leaves are tessellated once by [`RasterBackend::setup`] into
//! device buffers. Every frame then binds the model, view, projection and
//! normal matrices, the view space lights and the Phong coefficients, and
//! issues one indexed draw per ready leaf.

use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::{AssetLoader, ImageData, LoadStatus, PendingLoad, ResourceHandle};
use crate::config::RasterConfig;
use crate::device::{
    BufferHandle, BufferUsage, DeviceError, GraphicsDevice, ProgramHandle, ProgramKind, TextureHandle,
    UniformValue, VertexLayout,
};
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::geometry::{self, GeometryBuffer, Vertex};
use crate::lighting::{PhongCoefficients, SharedPhong};
use crate::scene::{NodeKey, SceneGraph};
use crate::traversal::{
    run_frame, traverse, ActiveCamera, FrameContext, GeometryRef, NodeRef, RenderStrategy, SceneVisitor,
    TransformStack,
};

use super::{upload_lights, RenderResult};

/// Programs the rasterizer draws with
const RASTER_PROGRAMS: [ProgramKind; 2] = [ProgramKind::FlatColor, ProgramKind::Textured];

/// Program for a geometry variant
fn program_for(geometry: GeometryRef<'_>) -> ProgramKind {
    match geometry {
        GeometryRef::TexturedBox(_) => ProgramKind::Textured,
        GeometryRef::Sphere(_) | GeometryRef::AxisAlignedBox(_) | GeometryRef::Pyramid(_) | GeometryRef::Mesh(_) => {
            ProgramKind::FlatColor
        }
    }
}

/// Uploaded geometry of one leaf
#[derive(Debug, Clone)]
struct DrawObject {
    vertices: BufferHandle,
    indices: BufferHandle,
    count: u32,
    layout: VertexLayout,
    program: ProgramKind,
    texture: Option<ResourceHandle>,
}

enum TextureSlot {
    Loading(PendingLoad<ImageData>),
    Ready(TextureHandle),
    Failed,
}

/// Rasterizing backend
pub struct RasterBackend {
    config: RasterConfig,
    phong: SharedPhong,
    loader: Arc<dyn AssetLoader>,
    programs: HashMap<ProgramKind, ProgramHandle>,
    draw_objects: HashMap<NodeKey, DrawObject>,
    textures: HashMap<ResourceHandle, TextureSlot>,
}

impl std::fmt::Debug for RasterBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterBackend")
            .field("config", &self.config)
            .field("draw_objects", &self.draw_objects.len())
            .field("textures", &self.textures.len())
            .finish_non_exhaustive()
    }
}

impl RasterBackend {
    /// Backend loading textures through `loader`
    pub fn new(config: RasterConfig, phong: SharedPhong, loader: Arc<dyn AssetLoader>) -> Self {
        Self {
            config,
            phong,
            loader,
            programs: HashMap::new(),
            draw_objects: HashMap::new(),
            textures: HashMap::new(),
        }
    }

    /// Build draw objects for every leaf that does not have one yet
    ///
    /// Meshes still loading are skipped and picked up by a later call.
    /// Textures are requested here and become usable once their load
    /// completes. Returns the number of draw objects created.
    pub fn setup(&mut self, graph: &SceneGraph, device: &mut dyn GraphicsDevice) -> RenderResult<usize> {
        self.ensure_programs(device)?;

        let mut pass = SetupPass {
            backend: self,
            device,
            created: 0,
        };
        traverse(graph, &mut pass)?;
        let created = pass.created;

        if created > 0 {
            log::info!(
                "Raster setup created {} draw object(s), {} total",
                created,
                self.draw_objects.len()
            );
        }
        Ok(created)
    }

    /// Draw one frame; `false` when the scene has no camera
    pub fn render(&mut self, graph: &SceneGraph, device: &mut dyn GraphicsDevice) -> RenderResult<bool> {
        self.ensure_programs(device)?;
        self.poll_textures(device)?;

        let mut frame = RasterFrame {
            draw_objects: &self.draw_objects,
            programs: &self.programs,
            textures: &self.textures,
            device,
            phong: self.phong.get(),
            lights: Vec::new(),
            bound: None,
            drawn: 0,
        };
        let rendered = run_frame(graph, &mut frame)?.is_some();
        log::trace!("Raster frame drew {} object(s)", frame.drawn);
        Ok(rendered)
    }

    /// Whether `key` has a draw object
    pub fn is_ready(&self, key: NodeKey) -> bool {
        self.draw_objects.contains_key(&key)
    }

    /// Number of draw objects built so far
    pub fn draw_object_count(&self) -> usize {
        self.draw_objects.len()
    }

    /// Forget every draw object, e.g. after the graph was replaced
    pub fn reset(&mut self) {
        self.draw_objects.clear();
    }

    fn ensure_programs(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        for kind in RASTER_PROGRAMS {
            if !self.programs.contains_key(&kind) {
                let handle = device.create_program(kind)?;
                self.programs.insert(kind, handle);
            }
        }
        Ok(())
    }

    fn request_texture(&mut self, handle: &ResourceHandle) {
        if !self.textures.contains_key(handle) {
            log::debug!("Requesting texture {}", handle);
            self.textures
                .insert(handle.clone(), TextureSlot::Loading(self.loader.load_image(handle)));
        }
    }

    fn poll_textures(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        for (handle, slot) in &mut self.textures {
            let TextureSlot::Loading(pending) = slot else {
                continue;
            };
            match pending.poll() {
                LoadStatus::Pending => {}
                LoadStatus::Ready(image) => {
                    *slot = TextureSlot::Ready(device.create_texture(&image)?);
                    log::info!("Texture {} is ready ({}x{})", handle, image.width, image.height);
                }
                LoadStatus::Failed(e) => {
                    log::warn!("Texture {} failed to load: {}", handle, e);
                    *slot = TextureSlot::Failed;
                }
            }
        }
        Ok(())
    }
}

fn upload<V: Vertex>(
    device: &mut dyn GraphicsDevice,
    label: &str,
    geometry: &GeometryBuffer<V>,
    program: ProgramKind,
    texture: Option<ResourceHandle>,
) -> RenderResult<DrawObject> {
    let vertices = device.create_buffer(&format!("{label} vertices"), BufferUsage::Vertex, &geometry.vertex_bytes())?;
    let indices = device.create_buffer(&format!("{label} indices"), BufferUsage::Index, &geometry.index_bytes())?;
    Ok(DrawObject {
        vertices,
        indices,
        count: u32::try_from(geometry.indices.len()).unwrap_or(u32::MAX),
        layout: V::LAYOUT,
        program,
        texture,
    })
}

struct SetupPass<'a> {
    backend: &'a mut RasterBackend,
    device: &'a mut dyn GraphicsDevice,
    created: usize,
}

impl SceneVisitor for SetupPass<'_> {
    fn visit_geometry(&mut self, node: NodeRef<'_>, geometry: GeometryRef<'_>, _stack: &TransformStack) -> RenderResult<()> {
        if self.backend.draw_objects.contains_key(&node.key) {
            return Ok(());
        }

        let program = program_for(geometry);
        let rings = self.backend.config.sphere_rings;
        let device = &mut *self.device;
        let object = match geometry {
            GeometryRef::Sphere(sphere) => {
                let buffer = geometry::sphere_geometry(&sphere.center(), sphere.radius(), &sphere.color, rings);
                upload(device, node.id, &buffer, program, None)?
            }
            GeometryRef::AxisAlignedBox(b) => {
                let buffer = geometry::box_geometry(&b.min_point, &b.max_point, &b.color);
                upload(device, node.id, &buffer, program, None)?
            }
            GeometryRef::TexturedBox(b) => {
                // Normal maps are carried by the node but not sampled
                self.backend.request_texture(&b.texture);
                let buffer = geometry::textured_box_geometry(&b.min_point, &b.max_point);
                upload(device, node.id, &buffer, program, Some(b.texture.clone()))?
            }
            GeometryRef::Pyramid(p) => {
                let buffer = geometry::pyramid_geometry(&p.min_point, &p.max_point, p.height, &p.color);
                upload(device, node.id, &buffer, program, None)?
            }
            GeometryRef::Mesh(mesh) => {
                let Some(data) = mesh.geometry() else {
                    log::debug!("Mesh '{}' ({}) is not loaded yet", node.id, mesh.resource);
                    return Ok(());
                };
                let buffer = geometry::mesh_geometry(data, &mesh.color);
                upload(device, node.id, &buffer, program, None)?
            }
        };

        self.backend.draw_objects.insert(node.key, object);
        self.created += 1;
        Ok(())
    }
}

struct RasterFrame<'a> {
    draw_objects: &'a HashMap<NodeKey, DrawObject>,
    programs: &'a HashMap<ProgramKind, ProgramHandle>,
    textures: &'a HashMap<ResourceHandle, TextureSlot>,
    device: &'a mut dyn GraphicsDevice,
    phong: PhongCoefficients,
    lights: Vec<Vec3>,
    bound: Option<ProgramKind>,
    drawn: usize,
}

impl RasterFrame<'_> {
    fn bind(&mut self, kind: ProgramKind) -> RenderResult<()> {
        if self.bound != Some(kind) {
            let program = self.programs.get(&kind).copied().ok_or(DeviceError::NoProgram)?;
            self.device.use_program(program)?;
            self.bound = Some(kind);
        }
        Ok(())
    }
}

impl RenderStrategy for RasterFrame<'_> {
    fn begin_frame(&mut self, frame: &FrameContext, _camera: &ActiveCamera) -> RenderResult<()> {
        self.lights = frame.view_light_positions();
        Ok(())
    }

    fn draw_geometry(
        &mut self,
        node: NodeRef<'_>,
        _geometry: GeometryRef<'_>,
        model: &Mat4,
        camera: &ActiveCamera,
    ) -> RenderResult<()> {
        let (draw_objects, textures) = (self.draw_objects, self.textures);
        let Some(object) = draw_objects.get(&node.key) else {
            log::debug!("Skipping '{}': no draw object yet", node.id);
            return Ok(());
        };

        let texture = match &object.texture {
            Some(handle) => match textures.get(handle) {
                Some(TextureSlot::Ready(texture)) => Some(*texture),
                _ => {
                    log::debug!("Skipping '{}': texture {} not ready", node.id, handle);
                    return Ok(());
                }
            },
            None => None,
        };

        self.bind(object.program)?;

        let normal = Mat4::normal_matrix(&(camera.view * model)).unwrap_or_else(Mat4::identity);
        let device = &mut *self.device;
        device.set_uniform("M", UniformValue::Mat4(*model));
        device.set_uniform("V", UniformValue::Mat4(camera.view));
        device.set_uniform("P", UniformValue::Mat4(camera.projection));
        device.set_uniform("N", UniformValue::Mat4(normal));
        upload_lights(device, &self.lights);
        self.phong.upload(device);

        if let Some(texture) = texture {
            device.bind_texture(0, texture)?;
            device.set_uniform("sampler", UniformValue::Int(0));
        }

        device.draw_indexed(object.vertices, object.layout, object.indices, object.count)?;
        self.drawn += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, MeshData};
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::foundation::math::Vec4;
    use crate::scene::{BoxNode, CameraNode, LightNode, MeshNode, SphereNode, TexturedBoxNode};

    struct TestLoader {
        images: bool,
    }

    impl AssetLoader for TestLoader {
        fn load_mesh(&self, handle: &ResourceHandle) -> PendingLoad<MeshData> {
            PendingLoad::resolved(handle.clone(), Ok(MeshData::new(vec![Vec3::zeros(), Vec3::x(), Vec3::y()])))
        }

        fn load_image(&self, handle: &ResourceHandle) -> PendingLoad<ImageData> {
            let result = if self.images {
                Ok(ImageData::solid_color(2, 2, [255, 0, 0, 255]))
            } else {
                Err(AssetError::NotFound(handle.to_string()))
            };
            PendingLoad::resolved(handle.clone(), result)
        }
    }

    fn backend(images: bool) -> RasterBackend {
        RasterBackend::new(RasterConfig::default(), SharedPhong::default(), Arc::new(TestLoader { images }))
    }

    fn green() -> Vec4 {
        Vec4::new(0.0, 1.0, 0.0, 1.0)
    }

    fn scene() -> SceneGraph {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        graph
            .add_child(root, "camera", CameraNode::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y()))
            .unwrap();
        graph.add_child(root, "sun", LightNode::default()).unwrap();
        graph.add_child(root, "ball", SphereNode::new(Vec3::zeros(), 1.0, green()).unwrap()).unwrap();
        graph.add_child(root, "crate", BoxNode::new(Vec3::zeros(), Vec3::repeat(1.0), green())).unwrap();
        graph.add_child(root, "teapot", MeshNode::new("teapot.obj", green())).unwrap();
        graph
    }

    #[test]
    fn test_setup_is_incremental() {
        let mut graph = scene();
        let mut device = RecordingDevice::new();
        let mut raster = backend(true);

        assert_eq!(raster.setup(&graph, &mut device).unwrap(), 2);
        assert!(!raster.is_ready(graph.find("teapot").unwrap()));
        assert_eq!(raster.setup(&graph, &mut device).unwrap(), 0);

        graph.request_mesh_loads(&TestLoader { images: true });
        graph.poll_loads();
        assert_eq!(raster.setup(&graph, &mut device).unwrap(), 1);
        assert_eq!(raster.draw_object_count(), 3);
    }

    #[test]
    fn test_render_binds_matrices_lights_and_phong() {
        let graph = scene();
        let mut device = RecordingDevice::new();
        let mut raster = backend(true);
        raster.setup(&graph, &mut device).unwrap();
        device.clear_calls();

        assert!(raster.render(&graph, &mut device).unwrap());
        // Teapot is not loaded and is skipped
        assert_eq!(device.draw_count(), 2);
        assert_eq!(device.uniform("numLights"), Some(&UniformValue::Int(1)));
        assert_eq!(device.uniform("kA"), Some(&UniformValue::Float(0.6)));

        let camera = crate::traversal::discover(&graph).unwrap().camera.unwrap();
        assert_eq!(device.uniform("V"), Some(&UniformValue::Mat4(camera.view)));
        assert_eq!(
            device.uniform("lightPositions[0]"),
            Some(&UniformValue::Vec3(Vec3::new(0.0, 0.0, -5.0)))
        );
        let expected_n = (camera.view * Mat4::identity()).try_inverse().unwrap().transpose();
        assert_eq!(device.uniform("N"), Some(&UniformValue::Mat4(expected_n)));
    }

    #[test]
    fn test_phong_changes_apply_next_frame() {
        let graph = scene();
        let mut device = RecordingDevice::new();
        let phong = SharedPhong::default();
        let mut raster = RasterBackend::new(RasterConfig::default(), phong.clone(), Arc::new(TestLoader { images: true }));
        raster.setup(&graph, &mut device).unwrap();

        phong.update(|c| c.ka = 0.1);
        raster.render(&graph, &mut device).unwrap();
        assert_eq!(device.uniform("kA"), Some(&UniformValue::Float(0.1)));
    }

    #[test]
    fn test_missing_uniforms_do_not_block_draws() {
        let graph = scene();
        let mut device = RecordingDevice::new().without_uniform("N").without_uniform("kS");
        let mut raster = backend(true);
        raster.setup(&graph, &mut device).unwrap();
        raster.render(&graph, &mut device).unwrap();
        assert_eq!(device.draw_count(), 2);
    }

    #[test]
    fn test_textured_box_waits_for_texture() {
        let mut graph = SceneGraph::new("root");
        graph.add_child(graph.root(), "camera", CameraNode::default()).unwrap();
        graph
            .add_child(graph.root(), "wood", TexturedBoxNode::new(Vec3::zeros(), Vec3::repeat(1.0), "wood.png"))
            .unwrap();

        let mut device = RecordingDevice::new();
        let mut broken = backend(false);
        broken.setup(&graph, &mut device).unwrap();
        broken.render(&graph, &mut device).unwrap();
        assert_eq!(device.draw_count(), 0);

        let mut device = RecordingDevice::new();
        let mut raster = backend(true);
        raster.setup(&graph, &mut device).unwrap();
        raster.render(&graph, &mut device).unwrap();
        assert!(device.calls().iter().any(|c| matches!(c, DeviceCall::BindTexture(0, _))));
        assert!(device.calls().iter().any(|c| matches!(
            c,
            DeviceCall::DrawIndexed { program: ProgramKind::Textured, layout: VertexLayout::Textured, count: 36 }
        )));
    }

    #[test]
    fn test_no_camera_draws_nothing() {
        let mut graph = SceneGraph::new("root");
        graph.add_child(graph.root(), "ball", SphereNode::new(Vec3::zeros(), 1.0, green()).unwrap()).unwrap();
        let mut device = RecordingDevice::new();
        let mut raster = backend(true);
        raster.setup(&graph, &mut device).unwrap();
        assert!(!raster.render(&graph, &mut device).unwrap());
        assert_eq!(device.draw_count(), 0);
    }
}
