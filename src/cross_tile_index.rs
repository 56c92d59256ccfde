//! Stable label identity across tiles and zooms.
//!
//! The same conceptual label ("Main St" at roughly one world position)
//! appears in many tiles: zoom neighbors, overscaled parents and their
//! children, reloaded copies. External Placement keys fade state by
//! `cross_tile_id`, so this index hands textually and positionally
//! identical labels the same id: anchors are bucketed by a hash of the
//! label text and matched by rounded zoom-normalized position, with a
//! per-zoom used-id set making matches first-come first-served within a
//! pass.

use std::collections::{BTreeMap, HashMap, HashSet};

use euclid::Point2D;

use crate::{
    bucket::symbol_bucket::SymbolBucket,
    coords::{OverscaledTileID, EXTENT, TILE_SIZE},
    layout::symbol_instance::SymbolInstance,
    TileSpace,
};

/// Grid unit for anchor matching: roughly four screen pixels at the
/// index's own zoom.
const ROUNDING_FACTOR: f64 = TILE_SIZE / EXTENT / 2.0;

struct ScaledAnchor;

#[derive(Clone, Copy, Debug)]
struct IndexedSymbolInstance {
    cross_tile_id: u32,
    coord: Point2D<i64, ScaledAnchor>,
}

/// Anchors of one tile's bucket, keyed by label text hash and rounded
/// into the zoom-normalized grid.
pub struct TileLayerIndex {
    tile_id: OverscaledTileID,
    bucket_instance_id: u32,
    indexed_symbol_instances: HashMap<u64, Vec<IndexedSymbolInstance>>,
}

impl TileLayerIndex {
    fn new(tile_id: OverscaledTileID, bucket: &SymbolBucket) -> Self {
        let mut indexed_symbol_instances: HashMap<u64, Vec<IndexedSymbolInstance>> = HashMap::new();
        for instance in &bucket.symbol_instances {
            indexed_symbol_instances
                .entry(instance.key)
                .or_default()
                .push(IndexedSymbolInstance {
                    cross_tile_id: instance.cross_tile_id,
                    coord: index_scaled_coordinates(&tile_id, instance.anchor.point, &tile_id),
                });
        }
        Self {
            tile_id,
            bucket_instance_id: bucket.bucket_instance_id,
            indexed_symbol_instances,
        }
    }

    /// Claim matching ids for any unmatched instance of `bucket`.
    /// First match wins: an id claimed this pass never matches twice.
    fn find_matches(
        &self,
        instances: &mut [SymbolInstance],
        new_tile_id: &OverscaledTileID,
        zoom_cross_tile_ids: &mut HashSet<u32>,
    ) {
        // A coarser index's grid units cover more of the new tile's, so
        // the tolerance widens with the zoom gap.
        let tolerance = if self.tile_id.canonical.z < new_tile_id.canonical.z {
            1
        } else {
            1 << (self.tile_id.canonical.z - new_tile_id.canonical.z)
        };

        for instance in instances.iter_mut() {
            if instance.cross_tile_id != 0 {
                // Already has a match from an earlier index.
                continue;
            }
            let Some(candidates) = self.indexed_symbol_instances.get(&instance.key) else {
                continue;
            };
            let scaled = index_scaled_coordinates(&self.tile_id, instance.anchor.point, new_tile_id);
            for candidate in candidates {
                // With a 4px grid and tolerance 1 this covers a 12px by
                // 12px area around the candidate.
                if (candidate.coord.x - scaled.x).abs() <= tolerance
                    && (candidate.coord.y - scaled.y).abs() <= tolerance
                    && candidate.cross_tile_id != 0
                    && zoom_cross_tile_ids.insert(candidate.cross_tile_id)
                {
                    instance.cross_tile_id = candidate.cross_tile_id;
                    break;
                }
            }
        }
    }
}

/// Round an anchor of `anchor_tile` into `index_tile`'s grid.
fn index_scaled_coordinates(
    index_tile: &OverscaledTileID,
    anchor: Point2D<f64, TileSpace>,
    anchor_tile: &OverscaledTileID,
) -> Point2D<i64, ScaledAnchor> {
    let zoom_difference = anchor_tile.canonical.z as i32 - index_tile.canonical.z as i32;
    let scale = ROUNDING_FACTOR / f64::powi(2.0, zoom_difference);
    Point2D::new(
        ((anchor_tile.canonical.x as f64 * EXTENT + anchor.x) * scale).floor() as i64,
        ((anchor_tile.canonical.y as f64 * EXTENT + anchor.y) * scale).floor() as i64,
    )
}

/// Monotonic id source shared by every layer of a style.
#[derive(Default)]
struct CrossTileIDs {
    max_cross_tile_id: u32,
}

impl CrossTileIDs {
    fn generate(&mut self) -> u32 {
        self.max_cross_tile_id += 1;
        self.max_cross_tile_id
    }
}

/// Cross-tile state for one symbol layer: per overscaled zoom, the
/// indexed tiles and the set of ids claimed at that zoom.
#[derive(Default)]
pub struct CrossTileSymbolLayerIndex {
    /// overscaled z -> tile key -> index
    indexes: BTreeMap<u8, HashMap<u64, TileLayerIndex>>,
    used_cross_tile_ids: BTreeMap<u8, HashSet<u32>>,
    lng: f64,
}

impl CrossTileSymbolLayerIndex {
    /// When the reference longitude jumps by a whole world copy, every
    /// stored tile moves to the equivalent wrapped address so labels
    /// keep their ids across the antimeridian.
    pub fn handle_wrap_jump(&mut self, lng: f64) {
        let wrap_delta = ((lng - self.lng) / 360.0).round() as i32;
        if wrap_delta != 0 {
            for zoom_indexes in self.indexes.values_mut() {
                let mut rewrapped = HashMap::with_capacity(zoom_indexes.len());
                for (_, mut index) in zoom_indexes.drain() {
                    index.tile_id = index.tile_id.with_wrap(index.tile_id.wrap + wrap_delta);
                    rewrapped.insert(index.tile_id.key(), index);
                }
                *zoom_indexes = rewrapped;
            }
        }
        self.lng = lng;
    }

    /// Index `bucket` for `tile_id`. Returns `false` when the same
    /// bucket is already indexed (a no-op re-add); otherwise matches
    /// the bucket's instances against indexed descendants and the
    /// coarser ancestor cover, assigns fresh ids to the rest, and
    /// returns `true`.
    fn add_bucket(
        &mut self,
        tile_id: &OverscaledTileID,
        bucket: &mut SymbolBucket,
        cross_tile_ids: &mut CrossTileIDs,
    ) -> bool {
        if let Some(existing) = self
            .indexes
            .get(&tile_id.overscaled_z)
            .and_then(|zoom_indexes| zoom_indexes.get(&tile_id.key()))
        {
            if existing.bucket_instance_id == bucket.bucket_instance_id {
                return false;
            }
            // An updated bucket replaces this tile. Release the old
            // copy's ids but keep it indexed: the replacement matches
            // against it below, which is what carries ids (and with
            // them, fade state) across tile reloads.
            let released: Vec<u32> = existing
                .indexed_symbol_instances
                .values()
                .flatten()
                .map(|instance| instance.cross_tile_id)
                .collect();
            if let Some(used) = self.used_cross_tile_ids.get_mut(&tile_id.overscaled_z) {
                for id in released {
                    used.remove(&id);
                }
            }
        }

        for instance in &mut bucket.symbol_instances {
            instance.cross_tile_id = 0;
        }

        let zoom_cross_tile_ids = self.used_cross_tile_ids.entry(tile_id.overscaled_z).or_default();

        for (zoom, zoom_indexes) in &self.indexes {
            if *zoom > tile_id.overscaled_z {
                for child_index in zoom_indexes.values() {
                    if child_index.tile_id.is_child_of(tile_id) {
                        child_index.find_matches(
                            &mut bucket.symbol_instances,
                            tile_id,
                            zoom_cross_tile_ids,
                        );
                    }
                }
            } else {
                let parent_tile_id = tile_id.scaled_to(*zoom);
                if let Some(parent_index) = zoom_indexes.get(&parent_tile_id.key()) {
                    parent_index.find_matches(
                        &mut bucket.symbol_instances,
                        tile_id,
                        zoom_cross_tile_ids,
                    );
                }
            }
        }

        for instance in &mut bucket.symbol_instances {
            if instance.cross_tile_id == 0 {
                instance.cross_tile_id = cross_tile_ids.generate();
                zoom_cross_tile_ids.insert(instance.cross_tile_id);
            }
        }

        self.indexes
            .entry(tile_id.overscaled_z)
            .or_default()
            .insert(tile_id.key(), TileLayerIndex::new(*tile_id, bucket));
        true
    }

    fn remove_bucket_cross_tile_ids(&mut self, zoom: u8, removed: &TileLayerIndex) {
        if let Some(used) = self.used_cross_tile_ids.get_mut(&zoom) {
            for instances in removed.indexed_symbol_instances.values() {
                for instance in instances {
                    used.remove(&instance.cross_tile_id);
                }
            }
        }
    }

    /// Drop indexes whose bucket is no longer in the current tile set,
    /// releasing their ids. Returns whether anything changed.
    fn remove_stale_buckets(&mut self, current_bucket_ids: &HashSet<u32>) -> bool {
        let mut tiles_changed = false;
        let zooms: Vec<u8> = self.indexes.keys().copied().collect();
        for zoom in zooms {
            let stale_keys: Vec<u64> = self
                .indexes
                .get_mut(&zoom)
                .expect("key just listed")
                .iter()
                .filter(|(_, index)| !current_bucket_ids.contains(&index.bucket_instance_id))
                .map(|(key, _)| *key)
                .collect();
            for key in stale_keys {
                let removed = self
                    .indexes
                    .get_mut(&zoom)
                    .expect("key just listed")
                    .remove(&key)
                    .expect("key just listed");
                self.remove_bucket_cross_tile_ids(zoom, &removed);
                tiles_changed = true;
            }
        }
        tiles_changed
    }
}

/// Per-layer cross-tile indexing state for a whole style. Created with
/// the style, fed the current tile set every placement pass, pruned
/// when layers are removed. Callers serialize `add_layer` calls per
/// layer; concurrent updates of one layer are not supported.
#[derive(Default)]
pub struct CrossTileSymbolIndex {
    layer_indexes: HashMap<String, CrossTileSymbolLayerIndex>,
    cross_tile_ids: CrossTileIDs,
    max_bucket_instance_id: u32,
}

impl CrossTileSymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the current tile set of one symbol layer. Returns whether
    /// any bucket was added, replaced or pruned; an unchanged tile set
    /// reports `false` so placement can skip rebuilding.
    pub fn add_layer(
        &mut self,
        layer_id: &str,
        tiles: Vec<(&OverscaledTileID, &mut SymbolBucket)>,
        lng: f64,
    ) -> bool {
        let layer_index = self
            .layer_indexes
            .entry(layer_id.to_string())
            .or_default();

        let mut symbol_buckets_changed = false;
        let mut current_bucket_ids: HashSet<u32> = HashSet::new();

        layer_index.handle_wrap_jump(lng);

        for (tile_id, bucket) in tiles {
            if bucket.bucket_leader_id != layer_id {
                continue;
            }
            if bucket.bucket_instance_id == 0 {
                self.max_bucket_instance_id += 1;
                bucket.bucket_instance_id = self.max_bucket_instance_id;
            }
            if layer_index.add_bucket(tile_id, bucket, &mut self.cross_tile_ids) {
                symbol_buckets_changed = true;
            }
            current_bucket_ids.insert(bucket.bucket_instance_id);
        }

        if layer_index.remove_stale_buckets(&current_bucket_ids) {
            symbol_buckets_changed = true;
        }

        symbol_buckets_changed
    }

    /// Drop state for layers no longer in the style.
    pub fn prune_unused_layers(&mut self, used_layers: &[&str]) {
        self.layer_indexes
            .retain(|layer_id, _| used_layers.contains(&layer_id.as_str()));
    }

    pub fn reset(&mut self) {
        self.layer_indexes.clear();
    }
}

#[cfg(test)]
mod tests {
    use euclid::Point2D;

    use super::*;
    use crate::{
        coords::CanonicalTileID,
        geometry::anchor::Anchor,
        layout::symbol_instance::SymbolInstance,
        util,
    };

    const LAYER: &str = "labels";

    fn anchor_at(x: f64, y: f64) -> Anchor {
        Anchor {
            point: Point2D::new(x, y),
            angle: 0.0,
            segment: None,
        }
    }

    fn bucket_with(instances: Vec<(f64, f64, &str)>) -> SymbolBucket {
        let mut bucket = SymbolBucket::new(
            LAYER.to_string(),
            0.0,
            8.0,
            false,
            false,
            false,
            vec![],
            false,
        );
        for (x, y, text) in instances {
            let key = util::hash(&text.encode_utf16().collect::<Vec<u16>>());
            bucket
                .symbol_instances
                .push(SymbolInstance::for_test(anchor_at(x, y), key));
        }
        bucket
    }

    fn ids(bucket: &SymbolBucket) -> Vec<u32> {
        bucket
            .symbol_instances
            .iter()
            .map(|instance| instance.cross_tile_id)
            .collect()
    }

    fn tile(z: u8, x: u32, y: u32) -> OverscaledTileID {
        OverscaledTileID::new(z, 0, CanonicalTileID::new(z, x, y))
    }

    #[test]
    fn add_layer_is_idempotent_for_an_unchanged_tile_set() {
        let mut index = CrossTileSymbolIndex::new();
        let tile_id = tile(6, 8, 8);
        let mut bucket = bucket_with(vec![(1000.0, 1000.0, "Main St")]);

        assert!(index.add_layer(LAYER, vec![(&tile_id, &mut bucket)], 0.0));
        let first_ids = ids(&bucket);
        assert!(first_ids[0] != 0);

        // Same bucket again: nothing changes, ids are kept.
        assert!(!index.add_layer(LAYER, vec![(&tile_id, &mut bucket)], 0.0));
        assert_eq!(ids(&bucket), first_ids);
    }

    #[test]
    fn child_inherits_the_parent_id() {
        let mut index = CrossTileSymbolIndex::new();
        let parent_id = tile(6, 8, 8);
        let mut parent = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        index.add_layer(LAYER, vec![(&parent_id, &mut parent)], 0.0);
        let stable_id = parent.symbol_instances[0].cross_tile_id;

        // The same label in a child tile: same world position means
        // anchor * 2 minus the child origin within the parent.
        let child_id = tile(7, 16, 16);
        let mut child = bucket_with(vec![(2000.0, 2000.0, "Main St")]);
        index.add_layer(
            LAYER,
            vec![(&parent_id, &mut parent), (&child_id, &mut child)],
            0.0,
        );

        assert_eq!(child.symbol_instances[0].cross_tile_id, stable_id);
    }

    #[test]
    fn first_match_wins_within_a_pass() {
        let mut index = CrossTileSymbolIndex::new();
        let parent_id = tile(6, 8, 8);
        let mut parent = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        index.add_layer(LAYER, vec![(&parent_id, &mut parent)], 0.0);
        let stable_id = parent.symbol_instances[0].cross_tile_id;

        // Two anchors in the child both within tolerance of the one
        // parent anchor: only one of them may claim its id.
        let child_id = tile(7, 16, 16);
        let mut child = bucket_with(vec![
            (2000.0, 2000.0, "Main St"),
            (2004.0, 2000.0, "Main St"),
        ]);
        index.add_layer(
            LAYER,
            vec![(&parent_id, &mut parent), (&child_id, &mut child)],
            0.0,
        );

        let child_ids = ids(&child);
        assert!(child_ids.contains(&stable_id));
        assert_eq!(
            child_ids.iter().filter(|id| **id == stable_id).count(),
            1
        );
        assert!(child_ids.iter().all(|id| *id != 0));
        assert_ne!(child_ids[0], child_ids[1]);
    }

    #[test]
    fn different_text_never_matches() {
        let mut index = CrossTileSymbolIndex::new();
        let parent_id = tile(6, 8, 8);
        let mut parent = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        index.add_layer(LAYER, vec![(&parent_id, &mut parent)], 0.0);

        let child_id = tile(7, 16, 16);
        let mut child = bucket_with(vec![(2000.0, 2000.0, "Side St")]);
        index.add_layer(
            LAYER,
            vec![(&parent_id, &mut parent), (&child_id, &mut child)],
            0.0,
        );

        assert_ne!(
            child.symbol_instances[0].cross_tile_id,
            parent.symbol_instances[0].cross_tile_id
        );
    }

    #[test]
    fn replaced_bucket_releases_its_ids() {
        let mut index = CrossTileSymbolIndex::new();
        let tile_id = tile(6, 8, 8);
        let mut bucket = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        index.add_layer(LAYER, vec![(&tile_id, &mut bucket)], 0.0);
        let old_id = bucket.symbol_instances[0].cross_tile_id;

        // A reparse of the same tile produces a new bucket instance
        // with the same content: it matches the indexed copy and keeps
        // the id.
        let mut reloaded = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        assert!(index.add_layer(LAYER, vec![(&tile_id, &mut reloaded)], 0.0));
        assert_eq!(reloaded.symbol_instances[0].cross_tile_id, old_id);
    }

    #[test]
    fn pruned_tiles_stop_contributing_matches() {
        let mut index = CrossTileSymbolIndex::new();
        let tile_a = tile(6, 8, 8);
        let mut bucket_a = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        index.add_layer(LAYER, vec![(&tile_a, &mut bucket_a)], 0.0);
        let old_id = bucket_a.symbol_instances[0].cross_tile_id;

        // Replace the tile set entirely: the stale bucket is removed.
        let tile_b = tile(6, 9, 8);
        let mut bucket_b = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        assert!(index.add_layer(LAYER, vec![(&tile_b, &mut bucket_b)], 0.0));
        assert_ne!(bucket_b.symbol_instances[0].cross_tile_id, old_id);

        // And an unchanged new set reports no change.
        assert!(!index.add_layer(LAYER, vec![(&tile_b, &mut bucket_b)], 0.0));
    }

    #[test]
    fn wrap_jump_rekeys_stored_tiles() {
        let mut index = CrossTileSymbolIndex::new();
        let tile_id = tile(6, 8, 8);
        let mut bucket = bucket_with(vec![(1000.0, 1000.0, "Main St")]);
        index.add_layer(LAYER, vec![(&tile_id, &mut bucket)], 0.0);
        let stable_id = bucket.symbol_instances[0].cross_tile_id;

        // After a full world wrap the retained tile is re-addressed at
        // wrap 1. The stored index is re-keyed under the new wrap, so
        // re-adding the same bucket finds its own entry and is a no-op
        // that keeps every id.
        let wrapped_tile = tile_id.with_wrap(1);
        assert!(!index.add_layer(LAYER, vec![(&wrapped_tile, &mut bucket)], 360.0));
        assert_eq!(bucket.symbol_instances[0].cross_tile_id, stable_id);
    }
}
