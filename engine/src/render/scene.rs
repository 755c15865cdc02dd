use geo::{LineString, MultiPolygon};

use crate::projection::Projection;
use crate::region::{AreaFeature, MapData, TerrainClass, ZoneKind};
use crate::render::surface::PlanePath;
use crate::spatial::Bounds;
use crate::topology::Polyline;

/// A polygon or line set projected into the pre-zoom plane.
#[derive(Debug, Clone, Default)]
pub struct Shape {
    pub paths: Vec<PlanePath>,
    /// `None` when the geometry could not be bounded; such shapes are never drawn.
    pub bounds: Option<Bounds>,
}

impl Shape {
    pub fn paths(&self) -> impl Iterator<Item = &[(f64, f64)]> {
        self.paths.iter().map(Vec::as_slice)
    }
}

#[derive(Debug, Clone)]
pub struct ZoneShape {
    pub kind: ZoneKind,
    pub shape: Shape,
}

/// Projected geometry for everything the renderer draws. Rebuilt on load and on
/// projection refit; zoom and pan never touch it.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub regions: Vec<Shape>,
    pub arcs: Vec<PlanePath>,
    pub ocean: Vec<Shape>,
    pub land: Vec<Shape>,
    pub urban: Vec<Shape>,
    pub terrain: Vec<(TerrainClass, Shape)>,
    pub rivers: Vec<Shape>,
    pub zones: Vec<ZoneShape>,
}

impl Scene {
    pub fn build(data: &MapData, projection: &Projection) -> Self {
        let areas = |features: &[AreaFeature]| -> Vec<Shape> {
            features
                .iter()
                .map(|f| polygon_shape(&f.geometry, projection))
                .collect()
        };

        Self {
            regions: data
                .regions
                .iter()
                .map(|r| match r.bounds {
                    Some(_) => polygon_shape(&r.geometry, projection),
                    None => Shape::default(),
                })
                .collect(),
            arcs: data.arcs.iter().map(|arc| project_line(arc, projection)).collect(),
            ocean: areas(&data.ocean),
            land: areas(&data.land),
            urban: areas(&data.urban),
            terrain: data
                .physical
                .iter()
                .map(|t| (t.class, polygon_shape(&t.area.geometry, projection)))
                .collect(),
            rivers: data
                .rivers
                .iter()
                .map(|river| {
                    let paths: Vec<PlanePath> = river
                        .geometry
                        .0
                        .iter()
                        .map(|line| project_coords(line, projection))
                        .collect();
                    let bounds = bounds_of(&paths);
                    Shape { paths, bounds }
                })
                .collect(),
            zones: data
                .special_zones
                .iter()
                .map(|zone| ZoneShape {
                    kind: zone.kind,
                    shape: polygon_shape(&zone.area.geometry, projection),
                })
                .collect(),
        }
    }
}

fn project_line(line: &Polyline, projection: &Projection) -> PlanePath {
    line.iter().filter_map(|&c| projection.project(c)).collect()
}

fn project_coords(line: &LineString<f64>, projection: &Projection) -> PlanePath {
    line.0.iter().filter_map(|&c| projection.project(c)).collect()
}

fn polygon_shape(geometry: &MultiPolygon<f64>, projection: &Projection) -> Shape {
    let paths: Vec<PlanePath> = geometry
        .0
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .map(|ring| project_coords(ring, projection))
        .filter(|ring| ring.len() >= 3)
        .collect();
    let bounds = bounds_of(&paths);
    Shape { paths, bounds }
}

fn bounds_of(paths: &[PlanePath]) -> Option<Bounds> {
    paths
        .iter()
        .flatten()
        .map(|&p| Bounds::from_corners(p, p))
        .reduce(|a, b| a.union(&b))
        .filter(Bounds::is_finite)
}
