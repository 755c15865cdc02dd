use tracing::{debug, error, info, warn};

use crate::config::LayerNames;
use crate::error::LoadError;
use crate::region::{
    AreaFeature, LineFeature, MapData, Region, SpecialZone, TerrainClass, TerrainFeature, ZoneKind,
};
use crate::topology::{Polyline, TopoGeometry, Topology};

/// Outcome of unpacking one topology artifact.
///
/// `error` is set when the interactive layer could not be used. In that case
/// `data.regions` is empty while the decorative layers that did decode are kept.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub data: MapData,
    pub error: Option<LoadError>,
    /// Optional layers that were absent or failed to decode.
    pub skipped_layers: Vec<String>,
}

pub fn load(topology: &Topology, layers: &LayerNames) -> LoadReport {
    let arcs = topology.decode_arcs();
    let mut report = LoadReport::default();

    report.data.ocean = optional_layer(topology, &layers.ocean, &mut report.skipped_layers, |g| {
        area(g, &arcs)
    });
    report.data.land = optional_layer(topology, &layers.land, &mut report.skipped_layers, |g| {
        area(g, &arcs)
    });
    report.data.urban = optional_layer(topology, &layers.urban, &mut report.skipped_layers, |g| {
        area(g, &arcs)
    });
    report.data.physical =
        optional_layer(topology, &layers.physical, &mut report.skipped_layers, |g| {
            let class = g
                .property_str("featurecla")
                .map(|c| TerrainClass::from_featurecla(&c))
                .unwrap_or(TerrainClass::Other);
            Ok(area(g, &arcs)?.map(|area| TerrainFeature { class, area }))
        });
    report.data.rivers = optional_layer(topology, &layers.rivers, &mut report.skipped_layers, |g| {
        Ok(g.to_multilinestring(&arcs)?
            .filter(|lines| !lines.0.is_empty())
            .map(|geometry| LineFeature { geometry }))
    });
    report.data.special_zones =
        optional_layer(topology, &layers.special_zones, &mut report.skipped_layers, |g| {
            special_zone(g, &arcs)
        });

    match regions(topology, &layers.political, &arcs) {
        Ok(regions) => {
            info!(
                regions = regions.len(),
                arcs = arcs.len(),
                skipped = report.skipped_layers.len(),
                "topology loaded"
            );
            report.data.regions = regions;
        }
        Err(err) => {
            error!(error = %err, "interactive layer unusable; regions will not be drawn");
            report.error = Some(err);
        }
    }

    report.data.arcs = arcs;
    report
}

fn regions(topology: &Topology, name: &str, arcs: &[Polyline]) -> Result<Vec<Region>, LoadError> {
    let object = topology
        .objects
        .get(name)
        .ok_or_else(|| LoadError::MissingLayer(name.to_string()))?;

    let members = object.members();
    let mut regions = Vec::with_capacity(members.len());
    for (index, geometry) in members.iter().enumerate() {
        let id = geometry.property_str("id").ok_or_else(|| LoadError::MissingId {
            layer: name.to_string(),
            index,
        })?;

        let shape = match geometry.to_multipolygon(arcs) {
            Ok(Some(shape)) => shape,
            Ok(None) => {
                debug!(layer = name, id = %id, "non-polygonal region skipped");
                continue;
            }
            Err(err) => {
                warn!(layer = name, id = %id, error = %err, "region geometry skipped");
                continue;
            }
        };

        let region_name = geometry.property_str("name").unwrap_or_else(|| id.clone());
        let owner = geometry.property_str("cntr_code");
        regions.push(Region::new(id, region_name, owner, shape, geometry.arc_indices()));
    }
    Ok(regions)
}

fn optional_layer<T>(
    topology: &Topology,
    name: &str,
    skipped: &mut Vec<String>,
    decode: impl Fn(&TopoGeometry) -> Result<Option<T>, LoadError>,
) -> Vec<T> {
    let Some(object) = topology.objects.get(name) else {
        debug!(layer = name, "optional layer absent");
        skipped.push(name.to_string());
        return Vec::new();
    };

    let decoded: Result<Vec<_>, _> = object.members().iter().map(&decode).collect();
    match decoded {
        Ok(features) => features.into_iter().flatten().collect(),
        Err(err) => {
            warn!(layer = name, error = %err, "optional layer skipped");
            skipped.push(name.to_string());
            Vec::new()
        }
    }
}

fn area(geometry: &TopoGeometry, arcs: &[Polyline]) -> Result<Option<AreaFeature>, LoadError> {
    Ok(geometry
        .to_multipolygon(arcs)?
        .filter(|shape| !shape.0.is_empty())
        .map(AreaFeature::new))
}

fn special_zone(geometry: &TopoGeometry, arcs: &[Polyline]) -> Result<Option<SpecialZone>, LoadError> {
    let Some(area) = area(geometry, arcs)? else {
        return Ok(None);
    };
    let id = geometry.property_str("id").unwrap_or_default();
    let label = geometry
        .property_str("label")
        .or_else(|| geometry.property_str("name"))
        .unwrap_or_else(|| id.clone());
    let kind = geometry
        .property_str("type")
        .map(|t| ZoneKind::parse(&t))
        .unwrap_or(ZoneKind::Other);
    let claimants = match geometry.properties.get("claimants") {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(serde_json::Value::String(list)) => list
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    Ok(Some(SpecialZone {
        id,
        label,
        kind,
        claimants,
        area,
    }))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::topology::Topology;

    /// Three triangles along the x axis: A = (0,0) (2,0) (1,1), B = (2,0) (1,1) (3,1),
    /// C = (2,0) (4,0) (3,1). A and B share an edge, B and C share an edge, A and C
    /// meet only at the point (2,0).
    ///
    /// Arcs: 0 = A|B, 1 = B|C, 2..=4 exterior.
    pub const THREE_TRIANGLES: &str = r#"{
        "type": "Topology",
        "arcs": [
            [[2, 0], [1, 1]],
            [[2, 0], [3, 1]],
            [[1, 1], [0, 0], [2, 0]],
            [[3, 1], [1, 1]],
            [[3, 1], [4, 0], [2, 0]]
        ],
        "objects": {
            "political": {
                "type": "GeometryCollection",
                "geometries": [
                    {"type": "Polygon", "arcs": [[0, 2]], "properties": {"id": "A", "name": "Alpha", "cntr_code": "AA"}},
                    {"type": "Polygon", "arcs": [[0, -4, -2]], "properties": {"id": "B", "name": "Beta", "cntr_code": "BB"}},
                    {"type": "Polygon", "arcs": [[4, 1]], "properties": {"id": "C", "name": "Gamma", "cntr_code": ""}}
                ]
            },
            "rivers": {
                "type": "GeometryCollection",
                "geometries": [{"type": "LineString", "arcs": [3]}]
            }
        }
    }"#;

    pub fn three_triangles() -> Topology {
        Topology::from_json(THREE_TRIANGLES).expect("fixture topology parses")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::fixtures::three_triangles;

    #[test]
    fn loads_regions_and_decorative_layers() {
        let report = load(&three_triangles(), &LayerNames::default());

        assert!(report.error.is_none());
        let ids: Vec<_> = report.data.regions.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(report.data.regions[0].name, "Alpha");
        assert_eq!(report.data.regions[0].owner.as_deref(), Some("AA"));
        assert_eq!(report.data.regions[2].owner, None);
        assert_eq!(report.data.regions[1].arcs, vec![0, 3, 1]);
        assert_eq!(report.data.rivers.len(), 1);
        assert!(report.skipped_layers.contains(&"ocean".to_string()));
    }

    #[test]
    fn missing_political_layer_keeps_decorative_layers() {
        let layers = LayerNames {
            political: "nope".to_string(),
            ..LayerNames::default()
        };
        let report = load(&three_triangles(), &layers);

        assert!(matches!(report.error, Some(LoadError::MissingLayer(ref name)) if name == "nope"));
        assert!(report.data.regions.is_empty());
        assert!(!report.data.is_ready());
        assert_eq!(report.data.rivers.len(), 1);
    }

    #[test]
    fn feature_without_id_stops_the_interactive_layer() {
        let topology = Topology::from_json(
            r#"{
                "type": "Topology",
                "arcs": [[[0, 0], [1, 0], [0, 1], [0, 0]]],
                "objects": {
                    "political": {
                        "type": "GeometryCollection",
                        "geometries": [
                            {"type": "Polygon", "arcs": [[0]], "properties": {"id": "A"}},
                            {"type": "Polygon", "arcs": [[0]], "properties": {"name": "anonymous"}}
                        ]
                    }
                }
            }"#,
        )
        .expect("topology parses");
        let report = load(&topology, &LayerNames::default());

        assert!(matches!(
            report.error,
            Some(LoadError::MissingId { index: 1, .. })
        ));
        assert!(report.data.regions.is_empty());
    }

    #[test]
    fn special_zone_properties_are_decoded() {
        let topology = Topology::from_json(
            r#"{
                "type": "Topology",
                "arcs": [[[0, 0], [1, 0], [0, 1], [0, 0]]],
                "objects": {
                    "political": {"type": "GeometryCollection", "geometries": []},
                    "special_zones": {
                        "type": "GeometryCollection",
                        "geometries": [{
                            "type": "Polygon",
                            "arcs": [[0]],
                            "properties": {"id": "kashmir", "label": "Kashmir", "type": "disputed", "claimants": ["IN", "PK"]}
                        }]
                    }
                }
            }"#,
        )
        .expect("topology parses");
        let report = load(&topology, &LayerNames::default());

        let zone = &report.data.special_zones[0];
        assert_eq!(zone.label, "Kashmir");
        assert_eq!(zone.kind, ZoneKind::Disputed);
        assert_eq!(zone.claimants, ["IN", "PK"]);
    }
}
