//! Cursor picking against fitted bounding spheres
//!
//! Each geometry leaf gets a Ritter bounding sphere fitted to its local
//! space vertices the first time it is tested. A pick unprojects the cursor
//! through `inverse(P * V)` at the near and far planes, carries every
//! leaf's sphere into world space with the accumulated transform, and keeps
//! the closest hit.

use std::collections::HashMap;

use crate::bounds::{fit_ritter, BoundingSphere};
use crate::config::PickingConfig;
use crate::device::{
    BufferHandle, BufferUsage, DeviceError, GraphicsDevice, ProgramHandle, ProgramKind, UniformValue, VertexLayout,
};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3, Vec4};
use crate::geometry::{leaf_positions, sphere_geometry};
use crate::intersection::{Intersection, Ray};
use crate::scene::{NodeKey, SceneGraph};
use crate::traversal::{
    discover, run_frame, traverse, ActiveCamera, GeometryRef, NodeRef, RenderStrategy, SceneVisitor,
    TransformStack,
};

use super::RenderResult;

/// Overlay color of the hovered node's bounds
const HOVERED_BOUNDS: [f64; 4] = [1.0, 1.0, 0.0, 0.5];
/// Overlay color of every other node's bounds
const IDLE_BOUNDS: [f64; 4] = [1.0, 0.0, 0.0, 0.5];

/// Cursor position in window pixels, origin at the top left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    /// Pixels from the left edge
    pub x: f64,
    /// Pixels from the top edge
    pub y: f64,
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
}

impl Cursor {
    /// Cursor at `(x, y)` in a `width` by `height` window
    pub fn new(x: f64, y: f64, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized device coordinates, y up
    pub fn to_ndc(&self) -> (f64, f64) {
        let width = f64::from(self.width.max(1));
        let height = f64::from(self.height.max(1));
        (self.x / width * 2.0 - 1.0, 1.0 - self.y / height * 2.0)
    }
}

/// The node under the cursor
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// Node key
    pub key: NodeKey,
    /// Node identifier
    pub id: String,
    /// Hit on the node's world space bounding sphere
    pub intersection: Intersection,
}

/// Bounding sphere picker
#[derive(Debug)]
pub struct Picker {
    config: PickingConfig,
    sphere_rings: u32,
    bounds: HashMap<NodeKey, BoundingSphere>,
    hovered: Option<NodeKey>,
    overlay: Option<OverlayResources>,
}

#[derive(Debug, Clone, Copy)]
struct OverlayResources {
    program: ProgramHandle,
    vertices: BufferHandle,
    indices: BufferHandle,
    count: u32,
}

impl Picker {
    /// Picker tessellating spheres with `sphere_rings` rings for fitting
    pub fn new(config: PickingConfig, sphere_rings: u32) -> Self {
        Self {
            config,
            sphere_rings,
            bounds: HashMap::new(),
            hovered: None,
            overlay: None,
        }
    }

    /// Node hovered by the most recent pick
    pub fn hovered(&self) -> Option<NodeKey> {
        self.hovered
    }

    /// Cached local space bounds of a node, if fitted already
    pub fn cached_bounds(&self, key: NodeKey) -> Option<&BoundingSphere> {
        self.bounds.get(&key)
    }

    /// Drop every cached fit
    pub fn clear_cache(&mut self) {
        self.bounds.clear();
        self.hovered = None;
    }

    /// Closest leaf whose bounds the cursor ray hits
    ///
    /// Updates [`hovered`](Self::hovered). Returns `None` when picking is
    /// disabled, the scene has no camera, or nothing is hit.
    pub fn pick(&mut self, graph: &SceneGraph, ndc: (f64, f64)) -> RenderResult<Option<PickHit>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let frame = discover(graph)?;
        let Some(camera) = frame.camera.as_ref() else {
            self.hovered = None;
            return Ok(None);
        };

        let ray = cursor_ray(camera, ndc)?;
        let mut pass = PickPass {
            picker: self,
            ray,
            best: None,
        };
        traverse(graph, &mut pass)?;
        let best = pass.best;

        self.hovered = best.as_ref().map(|hit| hit.key);
        if let Some(hit) = &best {
            log::debug!("Picked '{}' at distance {:.3}", hit.id, hit.intersection.distance);
        }
        Ok(best)
    }

    /// Draw every fitted bounding sphere as a translucent overlay
    ///
    /// Does nothing unless enabled in [`PickingConfig::draw_bounds`].
    pub fn draw_bounds(&mut self, graph: &SceneGraph, device: &mut dyn GraphicsDevice) -> RenderResult<()> {
        if !self.config.draw_bounds {
            return Ok(());
        }
        let overlay = self.overlay_resources(device)?;
        device.use_program(overlay.program)?;

        let mut frame = OverlayFrame {
            picker: self,
            device,
            overlay,
        };
        run_frame(graph, &mut frame)?;
        Ok(())
    }

    fn overlay_resources(&mut self, device: &mut dyn GraphicsDevice) -> RenderResult<OverlayResources> {
        if let Some(overlay) = self.overlay {
            return Ok(overlay);
        }
        let unit = sphere_geometry(&Vec3::zeros(), 1.0, &Vec4::repeat(1.0), self.sphere_rings);
        let overlay = OverlayResources {
            program: device.create_program(ProgramKind::BoundsOverlay)?,
            vertices: device.create_buffer("bounds vertices", BufferUsage::Vertex, &unit.vertex_bytes())?,
            indices: device.create_buffer("bounds indices", BufferUsage::Index, &unit.index_bytes())?,
            count: u32::try_from(unit.indices.len()).map_err(|_| DeviceError::ResourceCreationFailed("bounds mesh too large".into()))?,
        };
        self.overlay = Some(overlay);
        Ok(overlay)
    }

    /// Local bounds of a leaf, fitted on first use
    ///
    /// Meshes that are not loaded have no bounds yet and are retried later.
    fn local_bounds(&mut self, node: NodeRef<'_>) -> Option<BoundingSphere> {
        if let Some(bounds) = self.bounds.get(&node.key) {
            return Some(*bounds);
        }
        let positions = leaf_positions(node.node, self.sphere_rings)?;
        let fit = fit_ritter(&positions)?;
        log::trace!(
            "Fitted bounds of '{}': radius {:.3} after {} iteration(s)",
            node.id,
            fit.sphere.radius,
            fit.iterations
        );
        self.bounds.insert(node.key, fit.sphere);
        Some(fit.sphere)
    }
}

/// World space ray from the near plane towards the far plane
fn cursor_ray(camera: &ActiveCamera, (x, y): (f64, f64)) -> RenderResult<Ray> {
    let inverse = camera.inverse_view_projection()?;
    let near = utils::transform_point(&inverse, &Vec3::new(x, y, -1.0));
    let far = utils::transform_point(&inverse, &Vec3::new(x, y, 1.0));
    Ray::through(near, far)
}

struct PickPass<'a> {
    picker: &'a mut Picker,
    ray: Ray,
    best: Option<PickHit>,
}

impl SceneVisitor for PickPass<'_> {
    fn visit_geometry(&mut self, node: NodeRef<'_>, _geometry: GeometryRef<'_>, stack: &TransformStack) -> RenderResult<()> {
        let Some(local) = self.picker.local_bounds(node) else {
            log::debug!("No bounds for '{}' yet", node.id);
            return Ok(());
        };

        let hit = local.transformed(stack.top()).intersect_ray(&self.ray);
        let closer = match &self.best {
            Some(best) => hit.closer_than(&best.intersection),
            None => hit.is_hit(),
        };
        if closer {
            self.best = Some(PickHit {
                key: node.key,
                id: node.id.to_string(),
                intersection: hit,
            });
        }
        Ok(())
    }
}

struct OverlayFrame<'a> {
    picker: &'a mut Picker,
    device: &'a mut dyn GraphicsDevice,
    overlay: OverlayResources,
}

impl RenderStrategy for OverlayFrame<'_> {
    fn draw_geometry(
        &mut self,
        node: NodeRef<'_>,
        _geometry: GeometryRef<'_>,
        model: &Mat4,
        camera: &ActiveCamera,
    ) -> RenderResult<()> {
        let Some(bounds) = self.picker.local_bounds(node) else {
            return Ok(());
        };

        let placement = model * Mat4::translation(&bounds.center) * Mat4::scaling(&Vec3::repeat(bounds.radius));
        let color = if self.picker.hovered == Some(node.key) {
            HOVERED_BOUNDS
        } else {
            IDLE_BOUNDS
        };

        let device = &mut *self.device;
        device.set_uniform("M", UniformValue::Mat4(placement));
        device.set_uniform("V", UniformValue::Mat4(camera.view));
        device.set_uniform("P", UniformValue::Mat4(camera.projection));
        device.set_uniform("color", UniformValue::Vec4(Vec4::from(color)));
        device.draw_indexed(
            self.overlay.vertices,
            VertexLayout::Colored,
            self.overlay.indices,
            self.overlay.count,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::RITTER_EPSILON;
    use crate::device::{DeviceCall, RecordingDevice};
    use crate::scene::{BoxNode, CameraNode, MeshNode, SphereNode};
    use approx::assert_relative_eq;

    fn red() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 1.0)
    }

    fn scene() -> SceneGraph {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        graph
            .add_child(root, "camera", CameraNode::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y()))
            .unwrap();
        let left = graph.add_group(root, "left", Mat4::translation(&Vec3::new(-3.0, 0.0, 0.0))).unwrap();
        graph.add_child(left, "ball", SphereNode::new(Vec3::zeros(), 1.0, red()).unwrap()).unwrap();
        graph.add_child(root, "crate", BoxNode::new(Vec3::repeat(-0.5), Vec3::repeat(0.5), red())).unwrap();
        graph.add_child(root, "teapot", MeshNode::new("teapot.obj", red())).unwrap();
        graph
    }

    /// NDC of a world point as seen by the scene camera
    fn project(graph: &SceneGraph, point: Vec3) -> (f64, f64) {
        let camera = discover(graph).unwrap().camera.unwrap();
        let ndc = utils::transform_point(&camera.view_projection(), &point);
        (ndc.x, ndc.y)
    }

    #[test]
    fn test_cursor_to_ndc() {
        let cursor = Cursor::new(0.0, 0.0, 800, 600);
        assert_eq!(cursor.to_ndc(), (-1.0, 1.0));
        let center = Cursor::new(400.0, 300.0, 800, 600);
        assert_eq!(center.to_ndc(), (0.0, 0.0));
    }

    #[test]
    fn test_pick_returns_node_under_cursor() {
        let graph = scene();
        let mut picker = Picker::new(PickingConfig::default(), 30);

        let hit = picker.pick(&graph, project(&graph, Vec3::new(-3.0, 0.0, 0.0))).unwrap().expect("ball hit");
        assert_eq!(hit.id, "ball");
        assert_eq!(picker.hovered(), graph.find("ball"));

        let hit = picker.pick(&graph, (0.0, 0.0)).unwrap().expect("crate hit");
        assert_eq!(hit.id, "crate");
        // Cube bounds have radius sqrt(3)/2 around the origin
        let bounds = picker.cached_bounds(hit.key).unwrap();
        assert_relative_eq!(bounds.radius, 3f64.sqrt() / 2.0, epsilon = RITTER_EPSILON);
    }

    #[test]
    fn test_pick_empty_space() {
        let graph = scene();
        let mut picker = Picker::new(PickingConfig::default(), 30);
        assert!(picker.pick(&graph, (0.95, 0.95)).unwrap().is_none());
        assert!(picker.hovered().is_none());
        // Unloaded mesh never gets bounds
        assert!(picker.cached_bounds(graph.find("teapot").unwrap()).is_none());
    }

    #[test]
    fn test_pick_prefers_nearest() {
        let mut graph = SceneGraph::new("root");
        let root = graph.root();
        graph.add_child(root, "camera", CameraNode::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y())).unwrap();
        graph.add_child(root, "far", SphereNode::new(Vec3::new(0.0, 0.0, -5.0), 1.0, red()).unwrap()).unwrap();
        graph.add_child(root, "near", SphereNode::new(Vec3::new(0.0, 0.0, 3.0), 1.0, red()).unwrap()).unwrap();

        let mut picker = Picker::new(PickingConfig::default(), 30);
        let hit = picker.pick(&graph, (0.0, 0.0)).unwrap().unwrap();
        assert_eq!(hit.id, "near");
    }

    #[test]
    fn test_disabled_picking() {
        let graph = scene();
        let config = PickingConfig {
            enabled: false,
            ..PickingConfig::default()
        };
        let mut picker = Picker::new(config, 30);
        assert!(picker.pick(&graph, (0.0, 0.0)).unwrap().is_none());
    }

    #[test]
    fn test_bounds_overlay_highlights_hovered() {
        let graph = scene();
        let config = PickingConfig {
            draw_bounds: true,
            ..PickingConfig::default()
        };
        let mut picker = Picker::new(config, 30);
        picker.pick(&graph, (0.0, 0.0)).unwrap();

        let mut device = RecordingDevice::new();
        picker.draw_bounds(&graph, &mut device).unwrap();

        // Ball and crate, the unloaded teapot is skipped
        assert_eq!(device.draw_count(), 2);
        let colors: Vec<_> = device
            .calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::SetUniform(name, UniformValue::Vec4(color)) if name == "color" => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(colors, vec![Vec4::from(IDLE_BOUNDS), Vec4::from(HOVERED_BOUNDS)]);
    }
}
