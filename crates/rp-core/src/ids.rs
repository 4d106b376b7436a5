use core::fmt;

/// Stable integer identifier of a river reach.
///
/// Signed because source datasets use negative values as "no downstream"
/// markers; ids themselves may legitimately be 0.
pub type ReachId = i64;

/// Position of a grid point in the LSM lattice.
///
/// `lon` indexes the fastest-varying (x / west_east) axis, `lat` the
/// (y / south_north) axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellIndex {
    pub lat: usize,
    pub lon: usize,
}

impl CellIndex {
    pub fn new(lon: usize, lat: usize) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Debug for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cell(lon={}, lat={})", self.lon, self.lat)
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lon, self.lat)
    }
}
