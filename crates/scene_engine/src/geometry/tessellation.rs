//! Procedural tessellation of geometry leaves
//!
//! Box and pyramid faces are emitted as independent triangles so each face
//! keeps its own flat normal. Spheres use a ring grid with smooth normals.

use crate::assets::MeshData;
use crate::foundation::math::{constants::PI, Vec3, Vec4, EPSILON};
use crate::scene::Node;

use super::vertex::{ColoredVertex, GeometryBuffer, TexturedVertex};

/// Corner selectors per box face, two triangles each (false = min, true = max)
const BOX_CORNERS: [[bool; 3]; 36] = [
    // front (+z)
    [false, false, true], [true, false, true], [true, true, true],
    [true, true, true], [false, true, true], [false, false, true],
    // back (-z)
    [true, false, false], [false, false, false], [false, true, false],
    [false, true, false], [true, true, false], [true, false, false],
    // right (+x)
    [true, false, true], [true, false, false], [true, true, false],
    [true, true, false], [true, true, true], [true, false, true],
    // top (+y)
    [false, true, true], [true, true, true], [true, true, false],
    [true, true, false], [false, true, false], [false, true, true],
    // left (-x)
    [false, false, false], [false, false, true], [false, true, true],
    [false, true, true], [false, true, false], [false, false, false],
    // bottom (-y)
    [false, false, false], [true, false, false], [true, false, true],
    [true, false, true], [false, false, true], [false, false, false],
];

/// Outward normal of each box face, in `BOX_CORNERS` order
const BOX_FACE_NORMALS: [[f64; 3]; 6] = [
    [0.0, 0.0, 1.0],
    [0.0, 0.0, -1.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [-1.0, 0.0, 0.0],
    [0.0, -1.0, 0.0],
];

/// Texture coordinates of the six corners of every face
const BOX_FACE_UVS: [[f32; 2]; 6] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];

fn box_points(min: &Vec3, max: &Vec3) -> Vec<Vec3> {
    BOX_CORNERS
        .iter()
        .map(|[x, y, z]| {
            Vec3::new(
                if *x { max.x } else { min.x },
                if *y { max.y } else { min.y },
                if *z { max.z } else { min.z },
            )
        })
        .collect()
}

fn box_normal(vertex_index: usize) -> Vec3 {
    Vec3::from(BOX_FACE_NORMALS[vertex_index / 6])
}

fn pyramid_points(min: &Vec3, max: &Vec3, height: f64) -> Vec<Vec3> {
    let top = Vec3::new((min.x + max.x) / 2.0, min.y + height, (min.z + max.z) / 2.0);
    let corner = |x: f64, z: f64| Vec3::new(x, min.y, z);

    vec![
        // sides
        corner(min.x, max.z), corner(max.x, max.z), top,
        corner(max.x, max.z), corner(max.x, min.z), top,
        corner(min.x, min.z), corner(min.x, max.z), top,
        corner(max.x, min.z), corner(min.x, min.z), top,
        // base
        corner(max.x, min.z), corner(max.x, max.z), corner(min.x, max.z),
        corner(min.x, max.z), corner(min.x, min.z), corner(max.x, min.z),
    ]
}

/// Ring grid of `(position, normal)` pairs
///
/// The polar angle starts one radian early, so the grid overlaps itself
/// instead of pinching at the poles.
fn sphere_points(center: &Vec3, radius: f64, rings: u32) -> Vec<(Vec3, Vec3)> {
    let rings = rings.max(3);
    let step = 2.0 * PI / f64::from(rings);

    let mut points = Vec::with_capacity((rings * rings) as usize);
    for ring in 0..rings {
        for ring2 in 0..rings {
            let theta = f64::from(ring) * step - 1.0;
            let phi = f64::from(ring2) * step;
            let direction = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            points.push((center + direction * radius, direction));
        }
    }
    points
}

/// Flat normal for every triangle of a triangle list, repeated per vertex
///
/// For a triangle `(v1, v2, v3)` the normal is `normalize((v3 − v2) × (v1 − v2))`.
/// Degenerate triangles get a zero normal. Trailing vertices that do not
/// form a whole triangle are ignored.
pub fn flat_normals(positions: &[Vec3]) -> Vec<Vec3> {
    let mut normals = Vec::with_capacity(positions.len());
    for tri in positions.chunks_exact(3) {
        let (v1, v2, v3) = (tri[0], tri[1], tri[2]);
        let normal = (v3 - v2)
            .cross(&(v1 - v2))
            .try_normalize(EPSILON)
            .unwrap_or_else(Vec3::zeros);
        normals.extend([normal; 3]);
    }
    normals
}

/// Tessellated sphere
pub fn sphere_geometry(center: &Vec3, radius: f64, color: &Vec4, rings: u32) -> GeometryBuffer<ColoredVertex> {
    let rings = rings.max(3);
    let vertices = sphere_points(center, radius, rings)
        .iter()
        .map(|(p, n)| ColoredVertex::new(p, n, color))
        .collect();

    let mut indices = Vec::with_capacity(((rings - 1) * rings * 6) as usize);
    for ring in 0..rings - 1 {
        for ring2 in 0..rings {
            let next = (ring2 + 1) % rings;
            indices.extend([
                ring * rings + ring2,
                ring * rings + next,
                (ring + 1) * rings + ring2,
                ring * rings + next,
                (ring + 1) * rings + next,
                (ring + 1) * rings + ring2,
            ]);
        }
    }

    GeometryBuffer { vertices, indices }
}

/// Flat colored box, 36 vertices with per-face normals
pub fn box_geometry(min: &Vec3, max: &Vec3, color: &Vec4) -> GeometryBuffer<ColoredVertex> {
    let vertices = box_points(min, max)
        .iter()
        .enumerate()
        .map(|(i, p)| ColoredVertex::new(p, &box_normal(i), color))
        .collect();
    GeometryBuffer::sequential(vertices)
}

/// Textured box, 36 vertices with per-face normals and UVs
pub fn textured_box_geometry(min: &Vec3, max: &Vec3) -> GeometryBuffer<TexturedVertex> {
    let vertices = box_points(min, max)
        .iter()
        .enumerate()
        .map(|(i, p)| TexturedVertex::new(p, &box_normal(i), BOX_FACE_UVS[i % 6]))
        .collect();
    GeometryBuffer::sequential(vertices)
}

/// Pyramid, 18 vertices with flat normals
pub fn pyramid_geometry(min: &Vec3, max: &Vec3, height: f64, color: &Vec4) -> GeometryBuffer<ColoredVertex> {
    let points = pyramid_points(min, max, height);
    let normals = flat_normals(&points);
    let vertices = points
        .iter()
        .zip(&normals)
        .map(|(p, n)| ColoredVertex::new(p, n, color))
        .collect();
    GeometryBuffer::sequential(vertices)
}

/// Loaded mesh passthrough; flat normals fill in when none were declared
pub fn mesh_geometry(mesh: &MeshData, color: &Vec4) -> GeometryBuffer<ColoredVertex> {
    let with_normals;
    let mesh = if mesh.normals.as_ref().is_some_and(|n| n.len() == mesh.positions.len()) {
        mesh
    } else {
        match mesh.clone().ensure_normals() {
            Ok(fixed) => with_normals = fixed,
            Err(e) => {
                log::warn!("Skipping mesh geometry: {}", e);
                return GeometryBuffer::sequential(Vec::new());
            }
        }
        &with_normals
    };

    let normals = mesh.normals.as_deref().unwrap_or_default();
    let vertices = mesh
        .positions
        .iter()
        .zip(normals)
        .map(|(p, n)| ColoredVertex::new(p, n, color))
        .collect();

    match &mesh.indices {
        Some(indices) => GeometryBuffer {
            vertices,
            indices: indices.clone(),
        },
        None => GeometryBuffer::sequential(vertices),
    }
}

/// Local space vertex positions of a geometry leaf
///
/// `None` for non-geometry nodes and meshes that are not loaded yet.
pub fn leaf_positions(node: &Node, sphere_rings: u32) -> Option<Vec<Vec3>> {
    match node {
        Node::Sphere(sphere) => Some(
            sphere_points(&sphere.center(), sphere.radius(), sphere_rings)
                .into_iter()
                .map(|(p, _)| p)
                .collect(),
        ),
        Node::AxisAlignedBox(b) => Some(box_points(&b.min_point, &b.max_point)),
        Node::TexturedBox(b) => Some(box_points(&b.min_point, &b.max_point)),
        Node::Pyramid(p) => Some(pyramid_points(&p.min_point, &p.max_point, p.height)),
        Node::Mesh(mesh) => mesh.geometry().map(|g| g.positions.clone()),
        Node::Group(_) | Node::Camera(_) | Node::Light(_) => None,
    }
}
