use crate::error::{SculptError, SculptResult};
use crate::grid_encoding::GridLayout;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TEXTURE_SIDE: u32 = 512;
const DEFAULT_SCULPT_SIDE: u32 = 64;
const DEFAULT_BRUSH_SPEED: f32 = 60.0;
const DEFAULT_BRUSH_RADIUS: f32 = 0.04;
const DEFAULT_PAINT_COLOR: u32 = 0xFFAD24;
const DEFAULT_SHADOW_MAP_SIZE: u32 = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One incremental rotation applied while composing the light orientation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotationStep {
    pub axis: Axis,
    pub radians: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Camera-space depth the view starts at; negative looks into the volume.
    pub initial_depth: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    /// Radians of model rotation per full viewport of drag.
    pub rotate_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 58.0,
            near: 0.1,
            far: 1000.0,
            initial_depth: -150.0,
            zoom_min: -500.0,
            zoom_max: -10.0,
            rotate_sensitivity: 30.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub rotation: Vec<RotationStep>,
    /// Half extent of the orthographic shadow frustum.
    pub ortho_extent: f32,
    pub near: f32,
    pub far: f32,
    /// Depth bias subtracted before the shadow comparison.
    pub shadow_bias: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, -85.0],
            rotation: vec![
                RotationStep { axis: Axis::X, radians: 1.578 },
                RotationStep { axis: Axis::Y, radians: -0.9 },
                RotationStep { axis: Axis::X, radians: -0.6 },
                RotationStep { axis: Axis::Z, radians: -0.4 },
            ],
            ortho_extent: 60.0,
            near: 40.0,
            far: 250.0,
            shadow_bias: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SculptConfig {
    /// Side of the square voxel texture.
    pub texture_side: u32,
    /// Side of the voxel cube stored in it.
    pub sculpt_side: u32,
    /// Maximum grid edits per second while the tool is held.
    pub brush_speed: f32,
    /// Brush radius in normalized grid units.
    pub brush_radius: f32,
    /// Packed 0xRRGGBB paint color.
    pub paint_color: u32,
    pub shadows_enabled: bool,
    pub shadow_map_size: u32,
    pub background_color: [f32; 3],
    pub floor_color: [f32; 3],
    pub camera: CameraConfig,
    pub light: LightConfig,
}

impl Default for SculptConfig {
    fn default() -> Self {
        Self {
            texture_side: DEFAULT_TEXTURE_SIDE,
            sculpt_side: DEFAULT_SCULPT_SIDE,
            brush_speed: DEFAULT_BRUSH_SPEED,
            brush_radius: DEFAULT_BRUSH_RADIUS,
            paint_color: DEFAULT_PAINT_COLOR,
            shadows_enabled: true,
            shadow_map_size: DEFAULT_SHADOW_MAP_SIZE,
            background_color: [0.16, 0.17, 0.2],
            floor_color: [0.55, 0.56, 0.6],
            camera: CameraConfig::default(),
            light: LightConfig::default(),
        }
    }
}

impl SculptConfig {
    /// Read a JSON config; missing fields fall back to defaults.
    pub fn load(path: &Path) -> SculptResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SculptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| SculptError::ConfigParse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        log::info!("Loaded sculpt config from {}", path.display());
        Ok(config)
    }

    pub fn grid_layout(&self) -> SculptResult<GridLayout> {
        GridLayout::new(self.texture_side, self.sculpt_side)
    }

    pub fn validate(&self) -> SculptResult<()> {
        self.grid_layout()?;
        if !(self.brush_speed > 0.0) {
            return Err(SculptError::InvalidConfig(format!(
                "brush_speed must be positive, got {}",
                self.brush_speed
            )));
        }
        if self.shadow_map_size == 0 {
            return Err(SculptError::InvalidConfig(
                "shadow_map_size must be non-zero".to_string(),
            ));
        }
        if self.camera.zoom_min > self.camera.zoom_max {
            return Err(SculptError::InvalidConfig(format!(
                "zoom range [{}, {}] is empty",
                self.camera.zoom_min, self.camera.zoom_max
            )));
        }
        if !(self.camera.near > 0.0) || self.camera.far <= self.camera.near {
            return Err(SculptError::InvalidConfig(format!(
                "camera clip range {}..{} is invalid",
                self.camera.near, self.camera.far
            )));
        }
        if self.light.far <= self.light.near || !(self.light.ortho_extent > 0.0) {
            return Err(SculptError::InvalidConfig(
                "light frustum must have positive extent and depth".to_string(),
            ));
        }
        Ok(())
    }
}

/// Split a packed 0xRRGGBB color into normalized channels.
pub fn unpack_rgb(packed: u32) -> [f32; 3] {
    [
        ((packed >> 16) & 0xFF) as f32 / 255.0,
        ((packed >> 8) & 0xFF) as f32 / 255.0,
        (packed & 0xFF) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        SculptConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SculptConfig =
            serde_json::from_str(r#"{ "brush_speed": 30.0, "camera": { "zoom_max": -20.0 } }"#)
                .unwrap();
        assert_eq!(config.brush_speed, 30.0);
        assert_eq!(config.camera.zoom_max, -20.0);
        assert_eq!(config.camera.zoom_min, -500.0);
        assert_eq!(config.texture_side, 512);
        assert_eq!(config.light.rotation.len(), 4);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = SculptConfig::default();
        config.brush_speed = 0.0;
        assert!(config.validate().is_err());

        let mut config = SculptConfig::default();
        config.sculpt_side = 32;
        assert!(config.validate().is_err());

        let mut config = SculptConfig::default();
        config.camera.zoom_min = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unpacks_packed_colors() {
        assert_eq!(unpack_rgb(0xFF0000), [1.0, 0.0, 0.0]);
        let [r, g, b] = unpack_rgb(DEFAULT_PAINT_COLOR);
        assert_eq!(r, 1.0);
        assert!((g - 0.678).abs() < 0.01);
        assert!((b - 0.141).abs() < 0.01);
    }
}
