//! Engine-wide settings
//!
//! [`EngineConfig`] aggregates the tunables of every subsystem so an
//! application can keep them in one `engine.toml` or `engine.ron`.

use serde::{Deserialize, Serialize};

use super::Config;
use crate::lighting::PhongCoefficients;

/// Top level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Illumination coefficients shared by both backends
    pub phong: PhongCoefficients,
    /// Rasterizer settings
    pub raster: RasterConfig,
    /// Ray tracer settings
    pub ray_trace: RayTraceConfig,
    /// Picking settings
    pub picking: PickingConfig,
}

impl Config for EngineConfig {}

/// Rasterizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Latitude/longitude ring count used to tessellate spheres
    pub sphere_rings: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self { sphere_rings: 30 }
    }
}

/// Ray tracer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RayTraceConfig {
    /// Capacity of the sphere uniform arrays; must match the shader's array size
    pub max_spheres: usize,
}

impl Default for RayTraceConfig {
    fn default() -> Self {
        Self { max_spheres: 32 }
    }
}

/// Picking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingConfig {
    /// Whether cursor picking runs at all
    pub enabled: bool,
    /// Whether fitted bounding spheres are drawn as an overlay
    pub draw_bounds: bool,
}

impl Default for PickingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            draw_bounds: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.raster.sphere_rings, 30);
        assert_eq!(config.ray_trace.max_spheres, 32);
        assert!(config.picking.enabled);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str("[ray_trace]\nmax_spheres = 8\n").unwrap();
        assert_eq!(config.ray_trace.max_spheres, 8);
        assert_eq!(config.raster, RasterConfig::default());
        assert_eq!(config.phong, PhongCoefficients::default());
    }

    #[test]
    fn test_ron_file_round_trip() {
        let path = std::env::temp_dir().join(format!("scene_engine_config_{}.ron", std::process::id()));
        let mut config = EngineConfig::default();
        config.phong.shininess = 42.0;
        config.picking.draw_bounds = true;

        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = EngineConfig::default().save_to_file("engine.json");
        assert!(matches!(result, Err(super::super::ConfigError::UnsupportedFormat(_))));
    }
}
