//! Primitive shapes and the ray/sphere solver

use std::cmp::Ordering;

use crate::foundation::math::{Vec3, EPSILON};
use crate::render::{RenderError, RenderResult};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray, always unit length
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray, normalizing `direction`
    ///
    /// A zero-length or non-finite direction is a malformed ray.
    pub fn new(origin: Vec3, direction: Vec3) -> RenderResult<Self> {
        let direction = direction
            .try_normalize(EPSILON)
            .filter(|d| d.iter().all(|c| c.is_finite()))
            .ok_or(RenderError::InvalidRay)?;
        Ok(Self { origin, direction })
    }

    /// Ray starting at `from` and passing through `to`
    pub fn through(from: Vec3, to: Vec3) -> RenderResult<Self> {
        Self::new(from, to - from)
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A sphere with strictly positive radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f64,
}

impl Sphere {
    /// Creates a sphere; `radius` must be finite and greater than zero
    pub fn new(center: Vec3, radius: f64) -> RenderResult<Self> {
        if radius > 0.0 && radius.is_finite() {
            Ok(Self { center, radius })
        } else {
            Err(RenderError::InvalidRadius(radius))
        }
    }

    /// Sphere center
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Sphere radius
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Nearest intersection in front of the ray origin
    ///
    /// The center is projected onto the ray first. A projection at or behind
    /// the origin is a miss even when the infinite line crosses the sphere.
    pub fn intersect(&self, ray: &Ray) -> Intersection {
        let t = (self.center - ray.origin).dot(&ray.direction);
        if t.is_nan() || t <= 0.0 {
            return Intersection::none();
        }

        let y = (self.center - ray.point_at(t)).norm();
        if y.is_nan() || y >= self.radius {
            return Intersection::none();
        }

        let x = (self.radius * self.radius - y * y).sqrt();
        let distance = (t - x).min(t + x);
        if !distance.is_finite() {
            return Intersection::none();
        }

        let point = ray.point_at(distance);
        match (point - self.center).try_normalize(EPSILON) {
            Some(normal) => Intersection::hit(distance, point, normal),
            None => Intersection::none(),
        }
    }
}

/// Result of a ray intersection test
///
/// The default value is the "no intersection yet" sentinel, whose distance is
/// infinite so that any real hit is closer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Distance along the ray
    pub distance: f64,
    /// The point of intersection
    pub point: Vec3,
    /// Outward surface normal at the intersection point
    pub normal: Vec3,
}

impl Default for Intersection {
    fn default() -> Self {
        Self::none()
    }
}

impl Intersection {
    /// The "no intersection" sentinel
    pub fn none() -> Self {
        Self {
            distance: f64::INFINITY,
            point: Vec3::repeat(f64::INFINITY),
            normal: Vec3::zeros(),
        }
    }

    fn hit(distance: f64, point: Vec3, normal: Vec3) -> Self {
        Self { distance, point, normal }
    }

    /// Whether this record is a real hit
    pub fn is_hit(&self) -> bool {
        self.distance.is_finite() && self.distance >= 0.0
    }

    /// Strictly closer than `other`; the sentinel is farther than any hit
    pub fn closer_than(&self, other: &Self) -> bool {
        self.is_hit() && (!other.is_hit() || self.distance < other.distance)
    }

    /// Convert into `Some` when this is a real hit
    pub fn into_hit(self) -> Option<Self> {
        self.is_hit().then_some(self)
    }

    /// Total order by distance with the sentinel last
    pub fn cmp_distance(&self, other: &Self) -> Ordering {
        match (self.is_hit(), other.is_hit()) {
            (true, true) => self.distance.total_cmp(&other.distance),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_sphere() -> Sphere {
        Sphere::new(Vec3::zeros(), 1.0).unwrap()
    }

    #[test]
    fn test_head_on_hit() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0)).unwrap();
        let hit = unit_sphere().intersect(&ray).into_hit().expect("ray should hit");
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-12);
        assert_relative_eq!(hit.point, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_origin_past_center_never_hits() {
        // Origin inside the sphere but beyond its center
        let inside = Ray::new(Vec3::new(0.0, 0.0, 0.5), Vec3::z()).unwrap();
        assert!(!unit_sphere().intersect(&inside).is_hit());

        // Sphere entirely behind the ray
        let behind = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::z()).unwrap();
        assert!(!unit_sphere().intersect(&behind).is_hit());
    }

    #[test]
    fn test_miss_and_grazing() {
        let miss = Ray::new(Vec3::new(2.0, 0.0, -5.0), Vec3::z()).unwrap();
        assert!(!unit_sphere().intersect(&miss).is_hit());

        let grazing = Ray::new(Vec3::new(1.0, 0.0, -5.0), Vec3::z()).unwrap();
        assert!(!unit_sphere().intersect(&grazing).is_hit());
    }

    #[test]
    fn test_direction_is_normalized() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 10.0)).unwrap();
        assert_relative_eq!(ray.direction.norm(), 1.0);
        let hit = unit_sphere().intersect(&ray);
        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(Ray::new(Vec3::zeros(), Vec3::zeros()), Err(RenderError::InvalidRay)));
        assert!(matches!(
            Ray::new(Vec3::zeros(), Vec3::new(f64::NAN, 0.0, 1.0)),
            Err(RenderError::InvalidRay)
        ));
        assert!(matches!(Sphere::new(Vec3::zeros(), 0.0), Err(RenderError::InvalidRadius(_))));
        assert!(matches!(Sphere::new(Vec3::zeros(), -1.0), Err(RenderError::InvalidRadius(_))));
    }

    #[test]
    fn test_closer_than_ordering() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::z()).unwrap();
        let near = unit_sphere().intersect(&ray);
        let far = Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0).unwrap().intersect(&ray);
        let none = Intersection::default();

        assert!(near.closer_than(&far));
        assert!(!far.closer_than(&near));
        assert!(far.closer_than(&none));
        assert!(!none.closer_than(&far));
        assert!(!none.closer_than(&none));
        assert!(!near.closer_than(&near));
        assert_eq!(none.cmp_distance(&near), Ordering::Greater);
    }
}
