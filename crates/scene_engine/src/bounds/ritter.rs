//! # Ritter Bounding Sphere
//!
//! Approximate enclosing sphere of a vertex cloud:
//!
//! 1. From the first vertex `x`, find the farthest vertex `y`, then the vertex
//!    `z` farthest from `y`. The initial sphere spans `y`..`z`.
//! 2. While some vertex lies outside `radius + ε`, grow the sphere so it
//!    spans that vertex and the antipodal point of the current sphere.
//!
//! The loop is capped at [`RITTER_MAX_ITERATIONS`]. The result is not minimal.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{utils, Mat4, Vec3};
use crate::intersection::{Intersection, Ray, Sphere};

/// Slack allowed when testing containment
pub const RITTER_EPSILON: f64 = 0.005;

/// Upper bound on growth iterations
pub const RITTER_MAX_ITERATIONS: usize = 10;

/// A bounding sphere in a node's local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f64,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Whether `point` lies within `radius + slack`
    pub fn contains(&self, point: &Vec3, slack: f64) -> bool {
        (point - self.center).norm() <= self.radius + slack
    }

    /// The sphere carried through `matrix`
    ///
    /// The radius grows by the matrix's largest axis scale so the result
    /// still encloses the transformed geometry.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            center: utils::transform_point(matrix, &self.center),
            radius: self.radius * utils::max_axis_scale(matrix),
        }
    }

    /// Intersect with a ray; degenerate spheres never hit
    pub fn intersect_ray(&self, ray: &Ray) -> Intersection {
        Sphere::new(self.center, self.radius)
            .map_or_else(|_| Intersection::none(), |sphere| sphere.intersect(ray))
    }
}

/// Outcome of a Ritter fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RitterFit {
    /// The fitted sphere
    pub sphere: BoundingSphere,
    /// Number of growth iterations performed (at most the cap)
    pub iterations: usize,
}

/// Fit a bounding sphere around `points`; `None` for an empty slice
pub fn fit_ritter(points: &[Vec3]) -> Option<RitterFit> {
    let x = points.first()?;
    let y = farthest_from(x, points);
    let z = farthest_from(&y, points);

    let mut center = utils::midpoint(&y, &z);
    let mut radius = (y - z).norm() / 2.0;
    let mut iterations = 0;

    while iterations < RITTER_MAX_ITERATIONS {
        let Some(outlier) = points
            .iter()
            .find(|p| (*p - center).norm() > radius + RITTER_EPSILON)
        else {
            break;
        };

        // An outlier is strictly farther than the radius, so it never
        // coincides with the center.
        let direction = (outlier - center).normalize();
        let antipode = center + direction * -radius;

        radius = (outlier - antipode).norm() / 2.0;
        center = utils::midpoint(outlier, &antipode);
        iterations += 1;
    }

    log::trace!(
        "Ritter fit over {} points: radius {:.4} after {} iterations",
        points.len(),
        radius,
        iterations
    );

    Some(RitterFit {
        sphere: BoundingSphere::new(center, radius),
        iterations,
    })
}

fn farthest_from(origin: &Vec3, points: &[Vec3]) -> Vec3 {
    let mut best = *origin;
    let mut best_distance = -1.0;
    for p in points {
        let d = (p - origin).norm_squared();
        if d > best_distance {
            best_distance = d;
            best = *p;
        }
    }
    best
}
