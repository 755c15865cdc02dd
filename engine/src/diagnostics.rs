use std::collections::{BTreeMap, HashMap};

use geo::Area;
use serde::Serialize;

use crate::config::LayerNames;
use crate::region::finite_bounds;
use crate::topology::Topology;

const GIANT_AREA_RATIO: f64 = 0.5;
const WIDEST_COUNT: usize = 10;
const LARGEST_COUNTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSummary {
    pub name: String,
    pub features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionExtent {
    pub id: Option<String>,
    pub owner: Option<String>,
    /// `[min_lon, min_lat, max_lon, max_lat]`
    pub bbox: [f64; 4],
    pub width: f64,
    /// Bbox area as a fraction of the whole extent's bbox area.
    pub area_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryArea {
    pub owner: String,
    /// Planar area in squared degrees.
    pub area: f64,
}

/// Health checks over the interactive layer of a topology artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopologyReport {
    pub objects: Vec<ObjectSummary>,
    pub arc_count: usize,
    pub region_count: usize,
    pub extent: Option<[f64; 4]>,
    pub duplicate_ids: Vec<String>,
    pub missing_ids: usize,
    pub missing_owner: Vec<String>,
    /// Regions whose bbox covers more than half of the full extent; usually projection debris.
    pub giant_artifacts: Vec<RegionExtent>,
    pub widest: Vec<RegionExtent>,
    /// Regions spanning nearly all longitudes, i.e. crossing the antimeridian.
    pub antimeridian: Vec<String>,
    pub largest_countries: Vec<CountryArea>,
    pub problems: Vec<String>,
}

impl TopologyReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
            && self.duplicate_ids.is_empty()
            && self.missing_ids == 0
            && self.giant_artifacts.is_empty()
    }
}

pub fn inspect(topology: &Topology, layers: &LayerNames) -> TopologyReport {
    let mut report = TopologyReport {
        objects: topology
            .objects
            .iter()
            .map(|(name, object)| ObjectSummary {
                name: name.clone(),
                features: object.members().len(),
            })
            .collect(),
        arc_count: topology.arcs.len(),
        ..TopologyReport::default()
    };

    let Some(political) = topology.objects.get(&layers.political) else {
        report
            .problems
            .push(format!("missing interactive layer `{}`", layers.political));
        return report;
    };

    let arcs = topology.decode_arcs();
    let mut extents = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut area_by_owner: BTreeMap<String, f64> = BTreeMap::new();

    for geometry in political.members() {
        report.region_count += 1;
        let id = geometry.property_str("id");
        let owner = geometry.property_str("cntr_code");
        match &id {
            Some(id) => *seen.entry(id.clone()).or_default() += 1,
            None => report.missing_ids += 1,
        }
        if owner.is_none() {
            report
                .missing_owner
                .push(id.clone().unwrap_or_else(|| "<no id>".to_string()));
        }

        let shape = match geometry.to_multipolygon(&arcs) {
            Ok(Some(shape)) => shape,
            Ok(None) => continue,
            Err(err) => {
                report.problems.push(format!(
                    "{}: {err}",
                    id.as_deref().unwrap_or("<no id>")
                ));
                continue;
            }
        };
        if let Some(owner) = &owner {
            *area_by_owner.entry(owner.clone()).or_default() += shape.unsigned_area();
        }
        if let Some(rect) = finite_bounds(&shape) {
            let bbox = [rect.min().x, rect.min().y, rect.max().x, rect.max().y];
            if bbox[0] < -170.0 && bbox[2] > 170.0
                && let Some(id) = &id
            {
                report.antimeridian.push(id.clone());
            }
            extents.push(RegionExtent {
                id,
                owner,
                bbox,
                width: rect.width(),
                area_ratio: 0.0,
            });
        }
    }

    report.duplicate_ids = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| id)
        .collect();
    report.duplicate_ids.sort();

    let extent = extents.iter().map(|e| e.bbox).reduce(|a, b| {
        [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
    });
    report.extent = extent;
    let full_area = extent.map_or(0.0, |e| bbox_area(&e));
    if full_area > 0.0 {
        for entry in &mut extents {
            entry.area_ratio = bbox_area(&entry.bbox) / full_area;
        }
    }

    report.giant_artifacts = extents
        .iter()
        .filter(|e| e.area_ratio > GIANT_AREA_RATIO)
        .cloned()
        .collect();
    report
        .giant_artifacts
        .sort_by(|a, b| b.area_ratio.total_cmp(&a.area_ratio));

    extents.sort_by(|a, b| b.width.total_cmp(&a.width));
    extents.truncate(WIDEST_COUNT);
    report.widest = extents;

    let mut countries: Vec<CountryArea> = area_by_owner
        .into_iter()
        .map(|(owner, area)| CountryArea { owner, area })
        .collect();
    countries.sort_by(|a, b| b.area.total_cmp(&a.area));
    countries.truncate(LARGEST_COUNTRIES);
    report.largest_countries = countries;

    report
}

fn bbox_area(bbox: &[f64; 4]) -> f64 {
    (bbox[2] - bbox[0]).max(0.0) * (bbox[3] - bbox[1]).max(0.0)
}
