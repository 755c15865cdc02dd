use crate::region::{TerrainClass, ZoneKind};
use crate::render::surface::{FillStyle, LineStyle};

/// Colors, widths and decorative-layer toggles for one map look.
///
/// Coastline, internal grid and the dynamic border have no toggle: they are always drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderStyle {
    pub background: String,
    pub ocean: FillStyle,
    pub land: FillStyle,
    /// Fill for every interactive region before user colors go on top.
    pub base_fill: String,
    pub show_terrain: bool,
    pub show_urban: bool,
    pub show_rivers: bool,
    pub show_special_zones: bool,
    pub urban: FillStyle,
    pub river: LineStyle,
    pub coastline: LineStyle,
    pub grid: LineStyle,
    pub dynamic_border: LineStyle,
    pub hover: LineStyle,
    pub pending: LineStyle,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: "#aad3df".to_string(),
            ocean: FillStyle::solid("#aad3df"),
            land: FillStyle::solid("#f2efe9"),
            base_fill: "#e8e4da".to_string(),
            show_terrain: true,
            show_urban: true,
            show_rivers: true,
            show_special_zones: true,
            urban: FillStyle {
                color: "#5f5f5f".to_string(),
                opacity: 0.25,
            },
            river: LineStyle::new("#5a9fd4", 0.8, 0.8),
            coastline: LineStyle::new("#333333", 1.2, 0.9),
            grid: LineStyle::new("#888888", 0.4, 0.35),
            dynamic_border: LineStyle::new("#111111", 1.6, 1.0),
            hover: LineStyle::new("#ffffff", 2.0, 1.0),
            pending: LineStyle::new("#ff7a00", 2.0, 1.0).dashed(4.0, 3.0),
        }
    }
}

impl RenderStyle {
    /// Shading for a terrain class; `None` means the class is not drawn.
    pub fn terrain_fill(&self, class: TerrainClass) -> Option<FillStyle> {
        let (color, opacity) = match class {
            TerrainClass::Mountain => ("#8b7355", 0.22),
            TerrainClass::Forest => ("#2e7d32", 0.16),
            TerrainClass::Plain => ("#c5b358", 0.10),
            TerrainClass::Delta => ("#4f8a8b", 0.14),
            TerrainClass::Other => return None,
        };
        Some(FillStyle {
            color: color.to_string(),
            opacity,
        })
    }

    /// Fill and outline for a special zone.
    pub fn zone_style(&self, kind: ZoneKind) -> (FillStyle, LineStyle) {
        match kind {
            ZoneKind::Disputed => (
                FillStyle {
                    color: "#d32f2f".to_string(),
                    opacity: 0.18,
                },
                LineStyle::new("#b71c1c", 1.0, 0.9).dashed(5.0, 3.0),
            ),
            ZoneKind::Wasteland => (
                FillStyle {
                    color: "#6d6d6d".to_string(),
                    opacity: 0.3,
                },
                LineStyle::new("#4a4a4a", 0.8, 0.7),
            ),
            ZoneKind::Other => (
                FillStyle {
                    color: "#7e57c2".to_string(),
                    opacity: 0.15,
                },
                LineStyle::new("#5e35b1", 0.8, 0.7).dashed(2.0, 2.0),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_untagged_terrain_is_hidden() {
        let style = RenderStyle::default();
        for class in [
            TerrainClass::Mountain,
            TerrainClass::Forest,
            TerrainClass::Plain,
            TerrainClass::Delta,
        ] {
            assert!(style.terrain_fill(class).is_some(), "{class:?}");
        }
        assert!(style.terrain_fill(TerrainClass::Other).is_none());
    }

    #[test]
    fn disputed_zones_are_dashed() {
        let (_, outline) = RenderStyle::default().zone_style(ZoneKind::Disputed);
        assert!(outline.dash.is_some());
    }
}
