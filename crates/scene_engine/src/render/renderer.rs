//! Backend switching facade

use std::sync::Arc;

use crate::assets::AssetLoader;
use crate::config::EngineConfig;
use crate::device::GraphicsDevice;
use crate::lighting::SharedPhong;
use crate::scene::SceneGraph;

use super::{Cursor, PickHit, Picker, RasterBackend, RayTraceBackend, RenderResult};

/// Which backend draws frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendMode {
    /// Tessellated geometry with Phong shading
    #[default]
    Raster,
    /// Analytic spheres on a full-screen quad
    RayTrace,
}

/// Owns a device and both backends, drawing with one at a time
///
/// The Phong coefficients are shared by both backends through
/// [`SceneRenderer::phong`].
#[derive(Debug)]
pub struct SceneRenderer<D: GraphicsDevice> {
    device: D,
    mode: BackendMode,
    phong: SharedPhong,
    raster: RasterBackend,
    ray_trace: RayTraceBackend,
    picker: Picker,
}

impl<D: GraphicsDevice> SceneRenderer<D> {
    /// Renderer starting in raster mode
    pub fn new(device: D, config: &EngineConfig, loader: Arc<dyn AssetLoader>) -> Self {
        let phong = SharedPhong::new(config.phong);
        Self {
            device,
            mode: BackendMode::default(),
            raster: RasterBackend::new(config.raster.clone(), phong.clone(), loader),
            ray_trace: RayTraceBackend::new(&config.ray_trace, phong.clone()),
            picker: Picker::new(config.picking.clone(), config.raster.sphere_rings),
            phong,
        }
    }

    /// The device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Current backend
    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    /// Handle to the shared Phong coefficients
    pub fn phong(&self) -> &SharedPhong {
        &self.phong
    }

    /// Picker state, e.g. the hovered node
    pub fn picker(&self) -> &Picker {
        &self.picker
    }

    /// Prepare the current backend for `graph`
    ///
    /// Safe to call again after meshes finish loading; only new leaves are
    /// uploaded.
    pub fn setup(&mut self, graph: &SceneGraph) -> RenderResult<()> {
        match self.mode {
            BackendMode::Raster => {
                self.raster.setup(graph, &mut self.device)?;
            }
            BackendMode::RayTrace => self.ray_trace.setup(&mut self.device)?,
        }
        Ok(())
    }

    /// Switch backends, rerunning setup for the new one
    pub fn set_mode(&mut self, mode: BackendMode, graph: &SceneGraph) -> RenderResult<()> {
        if self.mode != mode {
            log::info!("Switching backend from {:?} to {:?}", self.mode, mode);
            self.mode = mode;
        }
        self.setup(graph)
    }

    /// Switch to the other backend
    pub fn toggle_mode(&mut self, graph: &SceneGraph) -> RenderResult<()> {
        let next = match self.mode {
            BackendMode::Raster => BackendMode::RayTrace,
            BackendMode::RayTrace => BackendMode::Raster,
        };
        self.set_mode(next, graph)
    }

    /// Draw one frame with the current backend, then the bounds overlay if
    /// enabled; `false` when the scene has no camera
    pub fn render(&mut self, graph: &SceneGraph) -> RenderResult<bool> {
        let rendered = match self.mode {
            BackendMode::Raster => self.raster.render(graph, &mut self.device)?,
            BackendMode::RayTrace => self.ray_trace.render(graph, &mut self.device)?,
        };
        if rendered {
            self.picker.draw_bounds(graph, &mut self.device)?;
        }
        Ok(rendered)
    }

    /// Pick the node under `cursor`
    pub fn pick(&mut self, graph: &SceneGraph, cursor: Cursor) -> RenderResult<Option<PickHit>> {
        self.picker.pick(graph, cursor.to_ndc())
    }

    /// Forget all per-graph state, for use after the graph was replaced
    pub fn reset(&mut self) {
        self.raster.reset();
        self.picker.clear_cache();
    }
}
