use geo::{BoundingRect, CoordsIter, MultiLineString, MultiPolygon, Rect};

use crate::topology::ArcTable;

/// One interactive region. Built once at load and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: String,
    pub name: String,
    /// Two-letter owner code, if the artifact carries one.
    pub owner: Option<String>,
    pub geometry: MultiPolygon<f64>,
    /// Geographic bbox; `None` when the geometry is empty or has non-finite coordinates.
    pub bounds: Option<Rect<f64>>,
    /// Forward indices of every arc on this region's boundary.
    pub arcs: Vec<usize>,
}

impl Region {
    pub fn new(
        id: String,
        name: String,
        owner: Option<String>,
        geometry: MultiPolygon<f64>,
        arcs: Vec<usize>,
    ) -> Self {
        let bounds = finite_bounds(&geometry);
        Self {
            id,
            name,
            owner,
            geometry,
            bounds,
            arcs,
        }
    }
}

pub(crate) fn finite_bounds(geometry: &MultiPolygon<f64>) -> Option<Rect<f64>> {
    if !geometry.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return None;
    }
    geometry.bounding_rect()
}

/// A decorative polygon (ocean, land, urban shading).
#[derive(Debug, Clone, PartialEq)]
pub struct AreaFeature {
    pub geometry: MultiPolygon<f64>,
    pub bounds: Option<Rect<f64>>,
}

impl AreaFeature {
    pub fn new(geometry: MultiPolygon<f64>) -> Self {
        let bounds = finite_bounds(&geometry);
        Self { geometry, bounds }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub geometry: MultiLineString<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainClass {
    Mountain,
    Forest,
    Plain,
    Delta,
    Other,
}

impl TerrainClass {
    /// Classify a physical-layer `featurecla` value.
    pub fn from_featurecla(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "range/mtn" | "range/mountain" | "mountain" | "range" => Self::Mountain,
            "forest" => Self::Forest,
            "plain" | "plains" => Self::Plain,
            "delta" => Self::Delta,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainFeature {
    pub class: TerrainClass,
    pub area: AreaFeature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    Disputed,
    Wasteland,
    Other,
}

impl ZoneKind {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "disputed" => Self::Disputed,
            "wasteland" => Self::Wasteland,
            _ => Self::Other,
        }
    }
}

/// A disputed or otherwise special polygon drawn over the political layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialZone {
    pub id: String,
    pub label: String,
    pub kind: ZoneKind,
    pub claimants: Vec<String>,
    pub area: AreaFeature,
}

/// Everything the loader produced from one topology artifact.
#[derive(Debug, Clone, Default)]
pub struct MapData {
    pub regions: Vec<Region>,
    pub arcs: ArcTable,
    pub ocean: Vec<AreaFeature>,
    pub land: Vec<AreaFeature>,
    pub urban: Vec<AreaFeature>,
    pub physical: Vec<TerrainFeature>,
    pub rivers: Vec<LineFeature>,
    pub special_zones: Vec<SpecialZone>,
}

impl MapData {
    /// Interactive layer is present; until then only decorative layers draw and pointer input is ignored.
    pub fn is_ready(&self) -> bool {
        !self.regions.is_empty()
    }
}
