use geo::Rect;

use crate::projection::Projection;
use crate::region::Region;

/// Axis-aligned box in the projected (pre-zoom) plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            min_x: a.0.min(b.0),
            min_y: a.1.min(b.1),
            max_x: a.0.max(b.0),
            max_y: a.1.max(b.1),
        }
    }

    /// Projected box of a geographic rect. Both supported projections are monotone per axis,
    /// so the corners are enough.
    pub fn project(rect: Rect<f64>, projection: &Projection) -> Option<Self> {
        let a = projection.project(rect.min())?;
        let b = projection.project(rect.max())?;
        Some(Self::from_corners(a, b)).filter(Self::is_finite)
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite() && self.min_y.is_finite() && self.max_x.is_finite() && self.max_y.is_finite()
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    /// Position of the region in the loaded region list.
    pub region: usize,
    pub bounds: Bounds,
    pub centroid: (f64, f64),
}

/// Point quadtree over bbox centroids.
///
/// Each node also records the union of the bboxes stored beneath it, so a point
/// query only descends into nodes that could own a region covering the point.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    entries: Vec<Entry>,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
struct Node {
    quad: Bounds,
    depth: u32,
    extent: Option<Bounds>,
    items: Vec<usize>,
    children: Option<[usize; 4]>,
}

impl Node {
    fn new(quad: Bounds, depth: u32) -> Self {
        Self {
            quad,
            depth,
            extent: None,
            items: Vec::new(),
            children: None,
        }
    }
}

const LEAF_MAX: usize = 8;
const MAX_DEPTH: u32 = 16;

impl SpatialIndex {
    /// Index every region with a finite projected bbox. Degenerate regions are left out.
    pub fn build(regions: &[Region], projection: &Projection) -> Self {
        let entries: Vec<Entry> = regions
            .iter()
            .enumerate()
            .filter_map(|(region, r)| {
                let bounds = Bounds::project(r.bounds?, projection)?;
                Some(Entry {
                    region,
                    bounds,
                    centroid: bounds.center(),
                })
            })
            .collect();

        let Some(root) = entries
            .iter()
            .map(|e| Bounds::from_corners(e.centroid, e.centroid))
            .reduce(|a, b| a.union(&b))
        else {
            return Self::default();
        };

        let mut index = Self {
            entries,
            nodes: vec![Node::new(square(root), 0)],
        };
        for slot in 0..index.entries.len() {
            index.insert(slot);
        }
        index.compute_extents();
        index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn insert(&mut self, slot: usize) {
        let (cx, cy) = self.entries[slot].centroid;
        let mut idx = 0;
        loop {
            if let Some(children) = self.nodes[idx].children {
                idx = children[quadrant(&self.nodes[idx].quad, cx, cy)];
                continue;
            }
            self.nodes[idx].items.push(slot);
            if self.nodes[idx].items.len() > LEAF_MAX && self.nodes[idx].depth < MAX_DEPTH {
                self.split(idx);
            }
            return;
        }
    }

    fn split(&mut self, idx: usize) {
        let quad = self.nodes[idx].quad;
        let depth = self.nodes[idx].depth + 1;
        let (mx, my) = quad.center();
        let first = self.nodes.len();
        for q in [
            Bounds { max_x: mx, max_y: my, ..quad },
            Bounds { min_x: mx, max_y: my, ..quad },
            Bounds { max_x: mx, min_y: my, ..quad },
            Bounds { min_x: mx, min_y: my, ..quad },
        ] {
            self.nodes.push(Node::new(q, depth));
        }
        let children = [first, first + 1, first + 2, first + 3];
        let items = std::mem::take(&mut self.nodes[idx].items);
        self.nodes[idx].children = Some(children);
        for slot in items {
            let (cx, cy) = self.entries[slot].centroid;
            let child = children[quadrant(&quad, cx, cy)];
            self.nodes[child].items.push(slot);
        }
        // Children may overflow again when many centroids coincide; depth bounds the recursion.
        for child in children {
            if self.nodes[child].items.len() > LEAF_MAX && depth < MAX_DEPTH {
                self.split(child);
            }
        }
    }

    fn compute_extents(&mut self) {
        // Children are always pushed after their parent, so reverse order is post-order.
        for idx in (0..self.nodes.len()).rev() {
            let mut extent = self.nodes[idx]
                .items
                .iter()
                .map(|&slot| self.entries[slot].bounds)
                .reduce(|a, b| a.union(&b));
            if let Some(children) = self.nodes[idx].children {
                for child in children {
                    extent = match (extent, self.nodes[child].extent) {
                        (Some(a), Some(b)) => Some(a.union(&b)),
                        (a, b) => a.or(b),
                    };
                }
            }
            self.nodes[idx].extent = extent;
        }
    }

    /// Regions whose projected bbox contains the point, in ascending region order.
    pub fn query(&self, x: f64, y: f64) -> Vec<usize> {
        if self.nodes.is_empty() || !(x.is_finite() && y.is_finite()) {
            return Vec::new();
        }

        let mut hits = Vec::new();
        let mut stack = vec![0];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.extent.is_some_and(|e| e.contains(x, y)) {
                continue;
            }
            for &slot in &node.items {
                let entry = &self.entries[slot];
                if entry.bounds.contains(x, y) {
                    hits.push(entry.region);
                }
            }
            if let Some(children) = node.children {
                stack.extend(children.iter().rev());
            }
        }

        hits.sort_unstable();
        hits
    }
}

fn square(b: Bounds) -> Bounds {
    let side = b.width().max(b.height()).max(1e-9);
    let (cx, cy) = b.center();
    let half = side * 0.5;
    Bounds {
        min_x: cx - half,
        min_y: cy - half,
        max_x: cx + half,
        max_y: cy + half,
    }
}

fn quadrant(quad: &Bounds, x: f64, y: f64) -> usize {
    let (mx, my) = quad.center();
    usize::from(x >= mx) + 2 * usize::from(y >= my)
}
