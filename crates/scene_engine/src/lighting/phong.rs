//! # Phong Illumination
//!
//! `result = ambient + Σ lights (diffuse + specular)`, each term scaling the
//! material color:
//!
//! - ambient: `color * kA`
//! - diffuse: `color * kD * max(N·L, 0)`
//! - specular: `color * kS * max(R·V, 0)^shininess`, `R = normalize(2(N·L)N − L)`
//!
//! `L` points from the surface towards the light and `V` from the surface
//! towards the eye. The alpha channel of the result is always 1.
//!
//! The coefficients are process-wide. Backends hold a [`SharedPhong`] and
//! read it on every draw, so edits show up on the next frame without
//! rebuilding any backend state.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::device::{GraphicsDevice, UniformValue};
use crate::foundation::math::{Vec3, Vec4, EPSILON};

/// Phong material coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhongCoefficients {
    /// Ambient coefficient
    pub ka: f64,
    /// Diffuse coefficient
    pub kd: f64,
    /// Specular coefficient
    pub ks: f64,
    /// Specular exponent
    pub shininess: f64,
}

impl Default for PhongCoefficients {
    fn default() -> Self {
        Self {
            ka: 0.6,
            kd: 0.6,
            ks: 0.8,
            shininess: 10.0,
        }
    }
}

impl PhongCoefficients {
    /// Upload as the `kA`, `kD`, `kS` and `shininess` uniforms of the bound program
    ///
    /// Uniforms the program does not declare are skipped.
    pub fn upload(&self, device: &mut dyn GraphicsDevice) {
        device.set_uniform("kA", UniformValue::Float(self.ka));
        device.set_uniform("kD", UniformValue::Float(self.kd));
        device.set_uniform("kS", UniformValue::Float(self.ks));
        device.set_uniform("shininess", UniformValue::Float(self.shininess));
    }
}

/// Shared handle to the process-wide coefficients
#[derive(Debug, Clone, Default)]
pub struct SharedPhong(Arc<RwLock<PhongCoefficients>>);

impl SharedPhong {
    /// Create a handle holding `coefficients`
    pub fn new(coefficients: PhongCoefficients) -> Self {
        Self(Arc::new(RwLock::new(coefficients)))
    }

    /// Snapshot of the current coefficients
    pub fn get(&self) -> PhongCoefficients {
        match self.0.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replace the coefficients for every holder of this handle
    pub fn set(&self, coefficients: PhongCoefficients) {
        self.update(|c| *c = coefficients);
    }

    /// Edit the coefficients in place
    pub fn update(&self, f: impl FnOnce(&mut PhongCoefficients)) {
        match self.0.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

/// The three Phong terms, summed over all lights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongTerms {
    /// Ambient contribution
    pub ambient: Vec3,
    /// Diffuse contribution
    pub diffuse: Vec3,
    /// Specular contribution
    pub specular: Vec3,
}

impl PhongTerms {
    /// Final RGBA color with alpha fixed at 1
    pub fn color(&self) -> Vec4 {
        let rgb = self.ambient + self.diffuse + self.specular;
        Vec4::new(rgb.x, rgb.y, rgb.z, 1.0)
    }
}

/// Evaluate each Phong term separately
///
/// Lights coinciding with the surface point contribute nothing.
pub fn phong_terms(
    point: &Vec3,
    normal: &Vec3,
    eye: &Vec3,
    lights: &[Vec3],
    color: &Vec4,
    coefficients: &PhongCoefficients,
) -> PhongTerms {
    let base = color.xyz();
    let n = normal.try_normalize(EPSILON).unwrap_or(*normal);
    let v = (eye - point).try_normalize(EPSILON).unwrap_or_else(Vec3::zeros);

    let mut diffuse = Vec3::zeros();
    let mut specular = Vec3::zeros();

    for light in lights {
        let Some(l) = (light - point).try_normalize(EPSILON) else {
            continue;
        };
        let n_dot_l = n.dot(&l);
        diffuse += base * coefficients.kd * n_dot_l.max(0.0);

        let r = (n * (2.0 * n_dot_l) - l).try_normalize(EPSILON).unwrap_or_else(Vec3::zeros);
        let r_dot_v = r.dot(&v).max(0.0);
        specular += base * coefficients.ks * r_dot_v.powf(coefficients.shininess);
    }

    PhongTerms {
        ambient: base * coefficients.ka,
        diffuse,
        specular,
    }
}

/// Phong color of a surface point
pub fn phong(
    point: &Vec3,
    normal: &Vec3,
    eye: &Vec3,
    lights: &[Vec3],
    color: &Vec4,
    coefficients: &PhongCoefficients,
) -> Vec4 {
    phong_terms(point, normal, eye, lights, color, coefficients).color()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn red() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 0.3)
    }

    #[test]
    fn test_light_at_eye_gives_full_specular() {
        let point = Vec3::zeros();
        let normal = Vec3::z();
        let eye = Vec3::new(0.0, 0.0, 4.0);

        for shininess in [1.0, 10.0, 128.0] {
            let coefficients = PhongCoefficients { shininess, ..Default::default() };
            let terms = phong_terms(&point, &normal, &eye, &[eye], &red(), &coefficients);
            assert_relative_eq!(terms.specular, red().xyz() * coefficients.ks, epsilon = 1e-12);
            assert_relative_eq!(terms.diffuse, red().xyz() * coefficients.kd, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_alpha_is_always_one() {
        let c = phong(&Vec3::zeros(), &Vec3::y(), &Vec3::y(), &[Vec3::x()], &red(), &PhongCoefficients::default());
        assert_relative_eq!(c.w, 1.0);
    }

    #[test]
    fn test_light_behind_surface_is_ambient_only() {
        let coefficients = PhongCoefficients::default();
        let terms = phong_terms(
            &Vec3::zeros(),
            &Vec3::z(),
            &Vec3::new(0.0, 0.0, 1.0),
            &[Vec3::new(0.0, 0.0, -3.0)],
            &red(),
            &coefficients,
        );
        assert_relative_eq!(terms.diffuse, Vec3::zeros());
        assert_relative_eq!(terms.specular, Vec3::zeros());
        assert_relative_eq!(terms.color().xyz(), red().xyz() * 0.6);
    }

    #[test]
    fn test_lights_accumulate() {
        let coefficients = PhongCoefficients::default();
        let light = Vec3::new(0.0, 0.0, 2.0);
        let one = phong_terms(&Vec3::zeros(), &Vec3::z(), &light, &[light], &red(), &coefficients);
        let two = phong_terms(&Vec3::zeros(), &Vec3::z(), &light, &[light, light], &red(), &coefficients);
        assert_relative_eq!(two.diffuse, one.diffuse * 2.0);
        assert_relative_eq!(two.ambient, one.ambient);
    }

    #[test]
    fn test_shared_handle_sees_updates() {
        let shared = SharedPhong::default();
        let other = shared.clone();
        other.update(|c| c.ka = 0.1);
        assert_relative_eq!(shared.get().ka, 0.1);
        shared.set(PhongCoefficients::default());
        assert_relative_eq!(other.get().ka, 0.6);
    }
}
