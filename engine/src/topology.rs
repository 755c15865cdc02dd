use std::collections::BTreeMap;
use std::rc::Rc;

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::LoadError;

/// An ordered coordinate sequence shared by one or more boundaries.
pub type Polyline = Vec<Coord<f64>>;

/// Decoded arc table, shared between the loader output and the border cache.
pub type ArcTable = Rc<[Polyline]>;

/// The consumed topology artifact: a shared arc list plus named object collections.
#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    pub transform: Option<QuantizeTransform>,
    #[serde(default)]
    pub objects: BTreeMap<String, TopoGeometry>,
}

/// Quantization transform; present when arc positions are delta-encoded integers.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct QuantizeTransform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

/// Arc references of one geometry, shaped by its type.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Polygon(Vec<Vec<i64>>),
    MultiPolygon(Vec<Vec<Vec<i64>>>),
    LineString(Vec<i64>),
    MultiLineString(Vec<Vec<i64>>),
    Collection(Vec<TopoGeometry>),
    Point,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct TopoGeometry {
    pub shape: Shape,
    pub properties: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    arcs: Value,
    #[serde(default)]
    geometries: Vec<TopoGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    id: Option<Value>,
}

impl TryFrom<RawGeometry> for TopoGeometry {
    type Error = String;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        let shape = match raw.kind.as_deref() {
            None => Shape::Empty,
            Some("Polygon") => Shape::Polygon(arc_refs(raw.arcs)?),
            Some("MultiPolygon") => Shape::MultiPolygon(arc_refs(raw.arcs)?),
            Some("LineString") => Shape::LineString(arc_refs(raw.arcs)?),
            Some("MultiLineString") => Shape::MultiLineString(arc_refs(raw.arcs)?),
            Some("GeometryCollection") => Shape::Collection(raw.geometries),
            Some("Point" | "MultiPoint") => Shape::Point,
            Some(other) => return Err(format!("unknown geometry type `{other}`")),
        };

        // A geometry-level id is folded into the properties so readers have one place to look.
        let mut properties = raw.properties.unwrap_or_default();
        if let Some(id) = raw.id.filter(|id| !id.is_null()) {
            properties.entry("id").or_insert(id);
        }

        Ok(Self { shape, properties })
    }
}

fn arc_refs<T: DeserializeOwned + Default>(value: Value) -> Result<T, String> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| e.to_string())
}

impl TopoGeometry {
    /// Members of a collection, or the geometry itself when it is not a collection.
    pub fn members(&self) -> &[TopoGeometry] {
        match &self.shape {
            Shape::Collection(members) => members,
            _ => std::slice::from_ref(self),
        }
    }

    /// A string-valued property; numbers are rendered to text, empty strings are `None`.
    pub fn property_str(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Every arc index this geometry references, normalized to its forward index.
    pub fn arc_indices(&self) -> Vec<usize> {
        let refs: Vec<&i64> = match &self.shape {
            Shape::Polygon(rings) | Shape::MultiLineString(rings) => rings.iter().flatten().collect(),
            Shape::MultiPolygon(polygons) => polygons.iter().flatten().flatten().collect(),
            Shape::LineString(refs) => refs.iter().collect(),
            Shape::Collection(_) | Shape::Point | Shape::Empty => Vec::new(),
        };
        refs.into_iter().map(|&r| arc_slot(r).0).collect()
    }
}

/// Resolve a signed arc reference to `(index, reversed)`.
pub fn arc_slot(reference: i64) -> (usize, bool) {
    if reference < 0 {
        ((!reference) as usize, true)
    } else {
        (reference as usize, false)
    }
}

impl Topology {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode every arc into absolute coordinates, undoing delta quantization if present.
    pub fn decode_arcs(&self) -> ArcTable {
        self.arcs
            .iter()
            .map(|arc| decode_arc(arc, self.transform.as_ref()))
            .collect()
    }
}

fn decode_arc(arc: &[Vec<f64>], transform: Option<&QuantizeTransform>) -> Polyline {
    let mut coords = Vec::with_capacity(arc.len());
    match transform {
        Some(t) => {
            let (mut x, mut y) = (0.0, 0.0);
            for position in arc.iter().filter(|p| p.len() >= 2) {
                x += position[0];
                y += position[1];
                coords.push(Coord {
                    x: x * t.scale[0] + t.translate[0],
                    y: y * t.scale[1] + t.translate[1],
                });
            }
        }
        None => {
            for position in arc.iter().filter(|p| p.len() >= 2) {
                coords.push(Coord {
                    x: position[0],
                    y: position[1],
                });
            }
        }
    }
    coords
}

/// Concatenate the referenced arcs into one ring or line.
///
/// The first point of every arc after the first duplicates the previous arc's last point
/// and is dropped.
pub fn stitch(arcs: &[Polyline], refs: &[i64]) -> Result<Polyline, LoadError> {
    let mut out: Polyline = Vec::new();
    for &reference in refs {
        let (index, reversed) = arc_slot(reference);
        let arc = arcs.get(index).ok_or(LoadError::ArcOutOfRange {
            index: reference,
            arc_count: arcs.len(),
        })?;
        let skip = usize::from(!out.is_empty());
        if reversed {
            out.extend(arc.iter().rev().skip(skip).copied());
        } else {
            out.extend(arc.iter().skip(skip).copied());
        }
    }
    Ok(out)
}

fn polygon_from_rings(arcs: &[Polyline], rings: &[Vec<i64>]) -> Result<Option<Polygon<f64>>, LoadError> {
    let mut stitched = rings
        .iter()
        .map(|ring| stitch(arcs, ring))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|ring| ring.len() >= 3);
    let Some(exterior) = stitched.next() else {
        return Ok(None);
    };
    let interiors = stitched.map(LineString::from).collect();
    Ok(Some(Polygon::new(LineString::from(exterior), interiors)))
}

impl TopoGeometry {
    /// Polygonal geometry as a multipolygon; line and point geometries yield `None`.
    pub fn to_multipolygon(&self, arcs: &[Polyline]) -> Result<Option<MultiPolygon<f64>>, LoadError> {
        let polygons = match &self.shape {
            Shape::Polygon(rings) => polygon_from_rings(arcs, rings)?.into_iter().collect(),
            Shape::MultiPolygon(polygons) => {
                let mut out = Vec::with_capacity(polygons.len());
                for rings in polygons {
                    out.extend(polygon_from_rings(arcs, rings)?);
                }
                out
            }
            Shape::Empty => Vec::new(),
            _ => return Ok(None),
        };
        Ok(Some(MultiPolygon(polygons)))
    }

    /// Linear geometry as a multilinestring; polygonal geometries yield `None`.
    pub fn to_multilinestring(&self, arcs: &[Polyline]) -> Result<Option<MultiLineString<f64>>, LoadError> {
        let lines = match &self.shape {
            Shape::LineString(refs) => vec![stitch(arcs, refs)?],
            Shape::MultiLineString(lines) => lines
                .iter()
                .map(|refs| stitch(arcs, refs))
                .collect::<Result<Vec<_>, _>>()?,
            Shape::Empty => Vec::new(),
            _ => return Ok(None),
        };
        Ok(Some(MultiLineString(
            lines
                .into_iter()
                .filter(|line| line.len() >= 2)
                .map(LineString::from)
                .collect(),
        )))
    }
}
