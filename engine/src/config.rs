use serde::Deserialize;

use crate::projection::ProjectionKind;

/// Object names looked up in the topology artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayerNames {
    pub political: String,
    pub special_zones: String,
    pub ocean: String,
    pub land: String,
    pub urban: String,
    pub physical: String,
    pub rivers: String,
}

impl Default for LayerNames {
    fn default() -> Self {
        Self {
            political: "political".to_string(),
            special_zones: "special_zones".to_string(),
            ocean: "ocean".to_string(),
            land: "land".to_string(),
            urban: "urban".to_string(),
            physical: "physical".to_string(),
            rivers: "rivers".to_string(),
        }
    }
}

/// Tunables for projection fitting, zoom, culling and pointer handling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub projection: ProjectionKind,
    /// Fraction of the canvas left empty on each side when fitting the data extent.
    pub fit_padding: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_sensitivity: f64,
    /// Regions whose projected bbox area (px²) is below this are not drawn on idle frames.
    pub min_draw_area: f64,
    /// Same threshold while a gesture is in flight. Kept at or below one pixel so
    /// a gesture frame drops only sub-pixel regions; terrain and urban shading are
    /// skipped on those frames and come back with the full frame `end_gesture` requests.
    pub min_draw_area_interactive: f64,
    pub hover_interval_ms: f64,
    pub click_slop_px: f64,
    pub layers: LayerNames,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            projection: ProjectionKind::Mercator,
            fit_padding: 0.02,
            min_scale: 1.0,
            max_scale: 50.0,
            zoom_sensitivity: 0.002,
            min_draw_area: 0.25,
            min_draw_area_interactive: 1.0,
            hover_interval_ms: 16.0,
            click_slop_px: 5.0,
            layers: LayerNames::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"max_scale": 20.0, "projection": "equirectangular", "layers": {"political": "regions"}}"#,
        )
        .expect("config should parse");

        assert_eq!(config.max_scale, 20.0);
        assert_eq!(config.min_scale, 1.0);
        assert_eq!(config.projection, ProjectionKind::Equirectangular);
        assert_eq!(config.layers.political, "regions");
        assert_eq!(config.layers.rivers, "rivers");
    }

    #[test]
    fn gesture_culling_stays_sub_pixel() {
        let config = EngineConfig::default();
        assert!(config.min_draw_area <= config.min_draw_area_interactive);
        assert!(config.min_draw_area_interactive <= 1.0);
    }
}
