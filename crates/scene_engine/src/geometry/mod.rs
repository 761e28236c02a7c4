//! Geometry for the rasterizer and the bounding-sphere fitter
//!
//! Procedural leaves are tessellated here into [`GeometryBuffer`]s. The same
//! vertex positions feed the Ritter fitter used by picking.

mod tessellation;
mod vertex;

pub use tessellation::{
    flat_normals, leaf_positions, mesh_geometry, pyramid_geometry, sphere_geometry,
    textured_box_geometry, box_geometry,
};
pub use vertex::{ColoredVertex, GeometryBuffer, TexturedVertex, Vertex};
