//! Addressing: layered axial coordinates, directions and tile sections.

use std::fmt;

use hexx::Hex;
use serde::{Deserialize, Serialize};

use crate::math::HEX_CORNERS;

/// A tile position: axial `(q, r)` on the horizontal plane plus a layer `z`.
///
/// At most one tile exists per coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct AxialCoord {
    /// Horizontal axial coordinate (`x` = q, `y` = r).
    pub hex: Hex,
    /// Vertical layer.
    pub z: i32,
}

impl AxialCoord {
    /// The origin tile on layer zero.
    pub const ORIGIN: AxialCoord = AxialCoord::new(0, 0, 0);

    /// Builds a coordinate from its three components.
    pub const fn new(q: i32, r: i32, z: i32) -> Self {
        Self {
            hex: Hex::new(q, r),
            z,
        }
    }

    /// Axial `q`.
    pub const fn q(self) -> i32 {
        self.hex.x
    }

    /// Axial `r`.
    pub const fn r(self) -> i32 {
        self.hex.y
    }

    /// Same column, different layer.
    pub const fn with_z(self, z: i32) -> Self {
        Self { hex: self.hex, z }
    }

    /// Horizontal neighbour on the same layer.
    pub fn neighbor(self, direction: HexDirection) -> Self {
        Self {
            hex: self.hex + direction.offset(),
            z: self.z,
        }
    }

    /// The six same-layer neighbours, in [`HexDirection::ALL`] order.
    pub fn neighbors(self) -> [AxialCoord; 6] {
        HexDirection::ALL.map(|d| self.neighbor(d))
    }
}

impl From<[i32; 3]> for AxialCoord {
    fn from([q, r, z]: [i32; 3]) -> Self {
        Self::new(q, r, z)
    }
}

impl From<AxialCoord> for [i32; 3] {
    fn from(c: AxialCoord) -> Self {
        [c.q(), c.r(), c.z]
    }
}

impl fmt::Display for AxialCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.q(), self.r(), self.z)
    }
}

/// Horizontal movement directions for the pointy-top layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HexDirection {
    /// `(1, 0)`
    East,
    /// `(1, -1)`
    NorthEast,
    /// `(0, -1)`
    NorthWest,
    /// `(-1, 0)`
    West,
    /// `(-1, 1)`
    SouthWest,
    /// `(0, 1)`
    SouthEast,
}

impl HexDirection {
    /// All directions, counter-clockwise starting east.
    pub const ALL: [HexDirection; 6] = [
        Self::East,
        Self::NorthEast,
        Self::NorthWest,
        Self::West,
        Self::SouthWest,
        Self::SouthEast,
    ];

    /// Axial unit vector of this direction.
    pub const fn offset(self) -> Hex {
        match self {
            Self::East => Hex::new(1, 0),
            Self::NorthEast => Hex::new(1, -1),
            Self::NorthWest => Hex::new(0, -1),
            Self::West => Hex::new(-1, 0),
            Self::SouthWest => Hex::new(-1, 1),
            Self::SouthEast => Hex::new(0, 1),
        }
    }
}

/// Index of one of the six trapezoidal wedges (always `0..6`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WedgeIndex(u8);

impl WedgeIndex {
    /// # Panics
    /// If `index >= 6`. A wedge index outside the ring is a geometry bug.
    pub fn new(index: usize) -> Self {
        assert!(index < HEX_CORNERS, "wedge index {index} out of range 0..6");
        Self(index as u8)
    }

    /// Fallible constructor for untrusted input (files).
    pub fn try_new(index: usize) -> Option<Self> {
        (index < HEX_CORNERS).then_some(Self(index as u8))
    }

    /// The index as `usize`.
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

/// One of the seven sections of a tile's top face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "SectionRepr", into = "SectionRepr")]
pub enum SectionKind {
    /// The central hexagon.
    #[default]
    Center,
    /// One of the surrounding trapezoids.
    Wedge(WedgeIndex),
}

impl SectionKind {
    /// Number of sections on a tile.
    pub const COUNT: usize = 7;

    /// Shorthand for `SectionKind::Wedge(WedgeIndex::new(index))`.
    pub fn wedge(index: usize) -> Self {
        Self::Wedge(WedgeIndex::new(index))
    }

    /// Slot in a tile's section arrays: 0 for the centre, `1..=6` for wedges.
    pub const fn slot(self) -> usize {
        match self {
            Self::Center => 0,
            Self::Wedge(w) => w.get() + 1,
        }
    }

    /// Inverse of [`SectionKind::slot`].
    pub fn from_slot(slot: usize) -> Self {
        match slot {
            0 => Self::Center,
            s => Self::wedge(s - 1),
        }
    }

    /// Every section, in slot order.
    pub fn all() -> impl Iterator<Item = SectionKind> {
        (0..Self::COUNT).map(Self::from_slot)
    }

    /// Next section in the ring `Center → Wedge0 → … → Wedge5 → Center`.
    pub fn next(self) -> Self {
        Self::from_slot((self.slot() + 1) % Self::COUNT)
    }

    /// Wedge index, if this is a wedge.
    pub fn wedge_index(self) -> Option<usize> {
        match self {
            Self::Center => None,
            Self::Wedge(w) => Some(w.get()),
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Center => write!(f, "center"),
            Self::Wedge(w) => write!(f, "wedge {}", w.get()),
        }
    }
}

/// On-disk shape of [`SectionKind`]: `"center"` or `{ "wedge": i }`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SectionRepr {
    Center,
    Wedge(u8),
}

impl TryFrom<SectionRepr> for SectionKind {
    type Error = String;

    fn try_from(repr: SectionRepr) -> Result<Self, Self::Error> {
        match repr {
            SectionRepr::Center => Ok(Self::Center),
            SectionRepr::Wedge(i) => WedgeIndex::try_new(i as usize)
                .map(Self::Wedge)
                .ok_or_else(|| format!("wedge index {i} out of range 0..6")),
        }
    }
}

impl From<SectionKind> for SectionRepr {
    fn from(kind: SectionKind) -> Self {
        match kind {
            SectionKind::Center => Self::Center,
            SectionKind::Wedge(w) => Self::Wedge(w.0),
        }
    }
}

/// Identity of a single section of a single tile.
///
/// Used as the key for prop placements and section overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionAddress {
    /// Tile coordinate.
    pub coord: AxialCoord,
    /// Section on that tile.
    pub section: SectionKind,
}

impl SectionAddress {
    /// Pairs a coordinate with a section.
    pub const fn new(coord: AxialCoord, section: SectionKind) -> Self {
        Self { coord, section }
    }
}

impl fmt::Display for SectionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.coord, self.section)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn cycling_seven_times_returns_to_start() {
        for start in SectionKind::all() {
            let mut s = start;
            for _ in 0..SectionKind::COUNT {
                s = s.next();
            }
            assert_eq!(s, start);
        }
    }

    #[test]
    fn cycle_visits_center_then_wedges_in_order() {
        let mut s = SectionKind::Center;
        let mut seen = vec![s];
        for _ in 0..6 {
            s = s.next();
            seen.push(s);
        }
        let expected: Vec<_> = std::iter::once(SectionKind::Center)
            .chain((0..6).map(SectionKind::wedge))
            .collect();
        assert_eq!(seen, expected);
        assert_eq!(s.next(), SectionKind::Center);
    }

    #[test]
    fn slot_roundtrip() {
        for slot in 0..SectionKind::COUNT {
            assert_eq!(SectionKind::from_slot(slot).slot(), slot);
        }
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn wedge_index_six_panics() {
        SectionKind::wedge(6);
    }

    #[test]
    fn addresses_compare_by_coord_and_section() {
        let c = AxialCoord::new(1, 2, 3);
        let mut set = HashSet::new();
        set.insert(SectionAddress::new(c, SectionKind::Center));
        set.insert(SectionAddress::new(c, SectionKind::wedge(2)));
        set.insert(SectionAddress::new(c, SectionKind::wedge(2)));
        set.insert(SectionAddress::new(c.with_z(4), SectionKind::wedge(2)));
        assert_eq!(set.len(), 3);
        assert_ne!(
            SectionAddress::new(c, SectionKind::wedge(1)),
            SectionAddress::new(c, SectionKind::wedge(2))
        );
    }

    #[test]
    fn directions_match_axial_unit_vectors() {
        let c = AxialCoord::new(0, 0, 2);
        let offsets: Vec<(i32, i32)> = c.neighbors().iter().map(|n| (n.q(), n.r())).collect();
        assert_eq!(
            offsets,
            vec![(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)]
        );
        assert!(c.neighbors().iter().all(|n| n.z == 2));
    }

    #[test]
    fn section_serializes_as_tag_or_map() {
        let center = serde_json::to_string(&SectionKind::Center).unwrap();
        let wedge = serde_json::to_string(&SectionKind::wedge(4)).unwrap();
        assert_eq!(center, "\"center\"");
        assert_eq!(wedge, "{\"wedge\":4}");
        let back: SectionKind = serde_json::from_str(&wedge).unwrap();
        assert_eq!(back, SectionKind::wedge(4));
    }

    #[test]
    fn section_rejects_out_of_range_wedge_on_load() {
        let parsed: Result<SectionKind, _> = serde_json::from_str("{\"wedge\":9}");
        assert!(parsed.is_err());
    }

    #[test]
    fn coord_serializes_as_triple() {
        let json = serde_json::to_string(&AxialCoord::new(-3, 1, 2)).unwrap();
        assert_eq!(json, "[-3,1,2]");
    }
}
