//! Analytic ray intersection
//!
//! Rays, spheres and ordered hit records. The ray tracer's per-pixel solve,
//! its CPU reference path and cursor picking all go through
//! [`Sphere::intersect`].

mod primitives;

pub use primitives::{Intersection, Ray, Sphere};
