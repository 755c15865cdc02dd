use std::collections::HashMap;

use tracing::warn;

use crate::region::Region;

/// id → region position, id → integer key and key → id.
///
/// Keys start at 1 so that 0 can mean "no region" in the hit raster.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    positions: HashMap<String, usize>,
    keys: HashMap<String, u32>,
    ids: Vec<String>,
}

impl RegionIndex {
    pub fn build(regions: &[Region]) -> Self {
        let mut index = Self {
            positions: HashMap::with_capacity(regions.len()),
            keys: HashMap::with_capacity(regions.len()),
            ids: Vec::with_capacity(regions.len()),
        };
        for (position, region) in regions.iter().enumerate() {
            if index.positions.contains_key(&region.id) {
                warn!(id = %region.id, "duplicate region id; keeping the first");
                continue;
            }
            index.positions.insert(region.id.clone(), position);
            index.ids.push(region.id.clone());
            index.keys.insert(region.id.clone(), index.ids.len() as u32);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn key_of(&self, id: &str) -> Option<u32> {
        self.keys.get(id).copied()
    }

    pub fn id_for_key(&self, key: u32) -> Option<&str> {
        let slot = usize::try_from(key).ok()?.checked_sub(1)?;
        self.ids.get(slot).map(String::as_str)
    }

    pub fn feature<'a>(&self, regions: &'a [Region], id: &str) -> Option<&'a Region> {
        regions.get(self.position(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerNames;
    use crate::loader::{fixtures::three_triangles, load};
    use geo::MultiPolygon;

    #[test]
    fn every_id_resolves_to_its_feature() {
        let regions = load(&three_triangles(), &LayerNames::default()).data.regions;
        let index = RegionIndex::build(&regions);

        for region in &regions {
            assert_eq!(index.feature(&regions, &region.id), Some(region));
            let key = index.key_of(&region.id).expect("every region has a key");
            assert_eq!(index.id_for_key(key), Some(region.id.as_str()));
        }
        assert_eq!(index.feature(&regions, "missing"), None);
        assert_eq!(index.id_for_key(0), None);
    }

    #[test]
    fn duplicate_ids_keep_the_first_feature() {
        let make = |name: &str| {
            Region::new("X".into(), name.into(), None, MultiPolygon(Vec::new()), Vec::new())
        };
        let regions = vec![make("first"), make("second")];
        let index = RegionIndex::build(&regions);

        assert_eq!(index.len(), 1);
        assert_eq!(
            index.feature(&regions, "X").map(|r| r.name.as_str()),
            Some("first")
        );
    }
}
