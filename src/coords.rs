//! Tile coordinates and the constants tying tile units to pixels.

/// The logical coordinate square each tile's geometry is normalized into.
pub const EXTENT_UINT: u32 = 4096;
pub const EXTENT: f64 = EXTENT_UINT as f64;

/// Logical rendered size of a tile in pixels at its own zoom level.
pub const TILE_SIZE: f64 = 512.0;

/// How the renderer consumes tiles. In `Tile` mode a single tile is
/// rendered as a still image and labels anchored outside the extent must
/// be kept; in continuous mode neighboring tiles supply them.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MapMode {
    Continuous,
    Tile,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct CanonicalTileID {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl CanonicalTileID {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        debug_assert!(x < 1 << z && y < 1 << z);
        Self { z, x, y }
    }

    pub fn is_child_of(&self, parent: &CanonicalTileID) -> bool {
        if parent.z >= self.z {
            return false;
        }
        let dz = self.z - parent.z;
        parent.x == self.x >> dz && parent.y == self.y >> dz
    }
}

/// A tile address including overscaling: `overscaled_z` may exceed the
/// canonical zoom when a tile is reused at deeper zooms, and `wrap`
/// counts world copies for horizontally repeated maps.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct OverscaledTileID {
    pub overscaled_z: u8,
    pub wrap: i32,
    pub canonical: CanonicalTileID,
}

impl OverscaledTileID {
    pub fn new(overscaled_z: u8, wrap: i32, canonical: CanonicalTileID) -> Self {
        debug_assert!(overscaled_z >= canonical.z);
        Self {
            overscaled_z,
            wrap,
            canonical,
        }
    }

    pub fn overscale_factor(&self) -> u32 {
        1 << (self.overscaled_z - self.canonical.z)
    }

    /// The ancestor cover of this tile at `target_z`. At equal or deeper
    /// zoom only the overscaled zoom changes.
    pub fn scaled_to(&self, target_z: u8) -> OverscaledTileID {
        if target_z >= self.canonical.z {
            OverscaledTileID::new(target_z, self.wrap, self.canonical)
        } else {
            let dz = self.canonical.z - target_z;
            OverscaledTileID::new(
                target_z,
                self.wrap,
                CanonicalTileID {
                    z: target_z,
                    x: self.canonical.x >> dz,
                    y: self.canonical.y >> dz,
                },
            )
        }
    }

    pub fn is_child_of(&self, parent: &OverscaledTileID) -> bool {
        self.wrap == parent.wrap
            && (self.canonical.is_child_of(&parent.canonical)
                || (self.canonical == parent.canonical && self.overscaled_z > parent.overscaled_z))
    }

    pub fn with_wrap(&self, wrap: i32) -> OverscaledTileID {
        OverscaledTileID::new(self.overscaled_z, wrap, self.canonical)
    }

    /// Stable map key. Wrap is folded in so world copies index separately.
    pub fn key(&self) -> u64 {
        crate::util::hash(&[
            self.overscaled_z as i64,
            self.wrap as i64,
            self.canonical.z as i64,
            self.canonical.x as i64,
            self.canonical.y as i64,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_to_ancestor() {
        let id = OverscaledTileID::new(4, 0, CanonicalTileID::new(4, 10, 7));
        let parent = id.scaled_to(2);
        assert_eq!(parent.canonical, CanonicalTileID::new(2, 2, 1));
        assert!(id.is_child_of(&parent));
        assert!(!parent.is_child_of(&id));
    }

    #[test]
    fn overscaled_child() {
        let tile = OverscaledTileID::new(5, 0, CanonicalTileID::new(3, 1, 2));
        let coarser = OverscaledTileID::new(4, 0, CanonicalTileID::new(3, 1, 2));
        assert_eq!(tile.overscale_factor(), 4);
        assert!(tile.is_child_of(&coarser));
    }

    #[test]
    fn wrap_changes_key() {
        let id = OverscaledTileID::new(3, 0, CanonicalTileID::new(3, 1, 1));
        assert_ne!(id.key(), id.with_wrap(1).key());
        assert_eq!(id.key(), id.with_wrap(0).key());
    }
}
