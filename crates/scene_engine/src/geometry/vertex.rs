//! Vertex layouts and packing
//!
//! Vertices are stored as `f32` arrays and packed into interleaved byte
//! buffers with `bytemuck`, matching [`VertexLayout`].

use crate::device::VertexLayout;
use crate::foundation::math::{Vec3, Vec4};

/// Vertex type with a fixed attribute layout
pub trait Vertex: Copy {
    /// Attribute layout written by [`Vertex::write`]
    const LAYOUT: VertexLayout;

    /// Position attribute
    fn position(&self) -> [f32; 3];

    /// Append this vertex's interleaved attributes
    fn write(&self, out: &mut Vec<f32>);
}

/// Position, normal, color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredVertex {
    /// Local space position
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// RGBA color
    pub color: [f32; 4],
}

impl ColoredVertex {
    /// Build from double precision inputs
    pub fn new(position: &Vec3, normal: &Vec3, color: &Vec4) -> Self {
        Self {
            position: to_f32_3(position),
            normal: to_f32_3(normal),
            color: [color.x as f32, color.y as f32, color.z as f32, color.w as f32],
        }
    }
}

impl Vertex for ColoredVertex {
    const LAYOUT: VertexLayout = VertexLayout::Colored;

    fn position(&self) -> [f32; 3] {
        self.position
    }

    fn write(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        out.extend_from_slice(&self.normal);
        out.extend_from_slice(&self.color);
    }
}

/// Position, normal, texture coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedVertex {
    /// Local space position
    pub position: [f32; 3],
    /// Unit normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub uv: [f32; 2],
}

impl TexturedVertex {
    /// Build from double precision inputs
    pub fn new(position: &Vec3, normal: &Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: to_f32_3(position),
            normal: to_f32_3(normal),
            uv,
        }
    }
}

impl Vertex for TexturedVertex {
    const LAYOUT: VertexLayout = VertexLayout::Textured;

    fn position(&self) -> [f32; 3] {
        self.position
    }

    fn write(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        out.extend_from_slice(&self.normal);
        out.extend_from_slice(&self.uv);
    }
}

fn to_f32_3(v: &Vec3) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

/// Indexed triangle geometry ready for upload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeometryBuffer<V> {
    /// Vertices
    pub vertices: Vec<V>,
    /// Triangle indices
    pub indices: Vec<u32>,
}

impl<V: Vertex> GeometryBuffer<V> {
    /// Geometry drawn in vertex order
    pub fn sequential(vertices: Vec<V>) -> Self {
        let indices = (0..vertices.len() as u32).collect();
        Self { vertices, indices }
    }

    /// Interleaved vertex bytes
    pub fn vertex_bytes(&self) -> Vec<u8> {
        let mut floats = Vec::with_capacity(self.vertices.len() * V::LAYOUT.floats_per_vertex());
        for v in &self.vertices {
            v.write(&mut floats);
        }
        bytemuck::cast_slice(&floats).to_vec()
    }

    /// Index bytes
    pub fn index_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.indices).to_vec()
    }

    /// Vertex positions in double precision
    pub fn positions(&self) -> Vec<Vec3> {
        self.vertices
            .iter()
            .map(|v| {
                let [x, y, z] = v.position();
                Vec3::new(f64::from(x), f64::from(y), f64::from(z))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_packing() {
        let v = ColoredVertex::new(&Vec3::new(1.0, 2.0, 3.0), &Vec3::z(), &Vec4::new(0.5, 0.5, 0.5, 1.0));
        let buffer = GeometryBuffer::sequential(vec![v, v]);
        let bytes = buffer.vertex_bytes();
        assert_eq!(bytes.len(), 2 * 10 * 4);

        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[..3], &[1.0, 2.0, 3.0]);
        assert_eq!(floats[9], 1.0);
        assert_eq!(buffer.index_bytes().len(), 8);
    }
}
