use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::colors::ColorState;
use crate::region::Region;

/// Indices into the shared arc table selecting one family of border lines.
pub type ArcSet = Rc<[usize]>;

/// How an arc sits relative to the interactive regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcRole {
    /// Bounds exactly one region: coastline.
    Exterior(usize),
    /// Shared by two regions (positions in the region list).
    Interior(usize, usize),
    /// Not part of any region boundary (rivers, decorative layers).
    Unowned,
}

/// A border between `a` and `b` is drawn unless both are filled with the same color.
pub fn border_visible(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

/// Derived border geometry. Coastline and grid depend only on the topology and are
/// computed once; the dynamic border is keyed by the color-state hash.
#[derive(Debug, Default)]
pub struct BorderCache {
    roles: Vec<ArcRole>,
    ids: Vec<String>,
    coastlines: OnceCell<ArcSet>,
    grid: OnceCell<ArcSet>,
    dynamic: RefCell<Option<(u64, ArcSet)>>,
}

impl BorderCache {
    pub fn new(regions: &[Region], arc_count: usize) -> Self {
        let mut owners: Vec<Vec<usize>> = vec![Vec::new(); arc_count];
        for (position, region) in regions.iter().enumerate() {
            for &arc in &region.arcs {
                if let Some(slot) = owners.get_mut(arc)
                    && !slot.contains(&position)
                {
                    slot.push(position);
                }
            }
        }

        let roles = owners
            .into_iter()
            .map(|owners| match owners.as_slice() {
                [] => ArcRole::Unowned,
                [only] => ArcRole::Exterior(*only),
                [a, b, ..] => ArcRole::Interior(*a, *b),
            })
            .collect();

        Self {
            roles,
            ids: regions.iter().map(|r| r.id.clone()).collect(),
            ..Self::default()
        }
    }

    pub fn role(&self, arc: usize) -> Option<ArcRole> {
        self.roles.get(arc).copied()
    }

    pub fn coastlines(&self) -> ArcSet {
        self.coastlines
            .get_or_init(|| self.select(|role| matches!(role, ArcRole::Exterior(_))))
            .clone()
    }

    pub fn grid(&self) -> ArcSet {
        self.grid
            .get_or_init(|| self.select(|role| matches!(role, ArcRole::Interior(..))))
            .clone()
    }

    /// Interior arcs separating differently filled regions. Recomputed only when the
    /// color-state hash differs from the one recorded at the last computation.
    pub fn dynamic_borders(&self, colors: &ColorState) -> ArcSet {
        let hash = colors.content_hash();
        if let Some((cached, arcs)) = self.dynamic.borrow().as_ref()
            && *cached == hash
        {
            return arcs.clone();
        }

        let arcs = self.select(|role| match role {
            ArcRole::Interior(a, b) => border_visible(
                colors.get(&self.ids[a]),
                colors.get(&self.ids[b]),
            ),
            _ => false,
        });
        debug!(arcs = arcs.len(), hash, "dynamic borders recomputed");
        *self.dynamic.borrow_mut() = Some((hash, arcs.clone()));
        arcs
    }

    fn select(&self, keep: impl Fn(ArcRole) -> bool) -> ArcSet {
        self.roles
            .iter()
            .enumerate()
            .filter(|&(_, &role)| keep(role))
            .map(|(arc, _)| arc)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerNames;
    use crate::loader::{fixtures::three_triangles, load};

    fn cache() -> BorderCache {
        let data = load(&three_triangles(), &LayerNames::default()).data;
        BorderCache::new(&data.regions, data.arcs.len())
    }

    #[test]
    fn visibility_rule() {
        assert!(!border_visible(Some("#ff0000"), Some("#ff0000")));
        assert!(border_visible(Some("#ff0000"), None));
        assert!(border_visible(None, None));
        assert!(border_visible(Some("#ff0000"), Some("#00ff00")));
    }

    #[test]
    fn static_sets_are_memoized() {
        let cache = cache();
        assert!(Rc::ptr_eq(&cache.coastlines(), &cache.coastlines()));
        assert!(Rc::ptr_eq(&cache.grid(), &cache.grid()));
    }

    #[test]
    fn exterior_arcs_are_only_coastline() {
        let cache = cache();
        let colors = ColorState::default();

        assert_eq!(&*cache.coastlines(), &[2, 3, 4]);
        assert_eq!(&*cache.grid(), &[0, 1]);
        assert_eq!(&*cache.dynamic_borders(&colors), &[0, 1]);
        assert_eq!(cache.role(0), Some(ArcRole::Interior(0, 1)));
    }

    #[test]
    fn three_triangle_scenario() {
        let cache = cache();
        let mut colors = ColorState::default();
        colors.set("A", "#111");
        colors.set("B", "#111");

        let dynamic = cache.dynamic_borders(&colors);
        assert!(dynamic.contains(&1), "B|C: filled against unfilled");
        assert!(!dynamic.contains(&0), "A|B: same color");
        assert!(cache.coastlines().iter().all(|arc| !dynamic.contains(arc)));
        assert_eq!(&*cache.coastlines(), &[2, 3, 4]);
    }

    #[test]
    fn same_red_suppresses_and_unfilled_neighbour_shows() {
        let cache = cache();
        let mut colors = ColorState::default();
        colors.set("B", "#ff0000");
        colors.set("C", "#ff0000");

        let dynamic = cache.dynamic_borders(&colors);
        assert!(!dynamic.contains(&1));
        assert!(dynamic.contains(&0));
    }

    #[test]
    fn recomputes_on_change_and_reuses_on_no_op() {
        let cache = cache();
        let mut colors = ColorState::default();
        colors.set("A", "#123456");
        colors.set("B", "#654321");

        let before = cache.dynamic_borders(&colors);
        assert!(before.contains(&0));

        colors.set("B", "#123456");
        let after = cache.dynamic_borders(&colors);
        assert!(!Rc::ptr_eq(&before, &after));
        assert!(!after.contains(&0));

        colors.set("B", "#123456");
        assert!(Rc::ptr_eq(&after, &cache.dynamic_borders(&colors)));

        // Touching the map wholesale without changing it still hits the cache.
        colors.map_mut();
        assert!(Rc::ptr_eq(&after, &cache.dynamic_borders(&colors)));
    }
}
