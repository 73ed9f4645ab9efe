//! Render-state bits carried by each primitive

use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Render-state bitmask.
///
/// Bits are ordered low to high by how cheaply they flip: primitives are
/// sorted so the high bits change least often. The "not" bits are negated so
/// that ground-level geometry sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attrs(pub u8);

impl Attrs {
    pub const NONE: Attrs = Attrs(0);
    pub const HARD: Attrs = Attrs(1);
    pub const DECK: Attrs = Attrs(2);
    pub const SHINY: Attrs = Attrs(4);
    pub const ALPHA: Attrs = Attrs(8);
    pub const NOT_DRAPED: Attrs = Attrs(16);
    pub const NOT_POLY: Attrs = Attrs(32);

    /// The renderer's implicit state at the top of a file
    pub const DEFAULT: Attrs = Attrs(Self::NOT_DRAPED.0 | Self::NOT_POLY.0);

    /// Bits that decide whether geometry is ground level
    pub const GROUND_MASK: Attrs =
        Attrs(Self::NOT_DRAPED.0 | Self::NOT_POLY.0 | Self::ALPHA.0 | Self::SHINY.0);

    /// Collision bits
    pub const HARDNESS_MASK: Attrs = Attrs(Self::HARD.0 | Self::DECK.0);

    #[inline]
    pub fn contains(self, other: Attrs) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn intersects(self, other: Attrs) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_poly_offset(self) -> bool {
        !self.contains(Self::NOT_POLY)
    }

    #[inline]
    pub fn is_draped(self) -> bool {
        !self.contains(Self::NOT_DRAPED)
    }
}

impl Default for Attrs {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for Attrs {
    type Output = Attrs;
    fn bitor(self, rhs: Attrs) -> Attrs {
        Attrs(self.0 | rhs.0)
    }
}

impl BitOrAssign for Attrs {
    fn bitor_assign(&mut self, rhs: Attrs) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Attrs {
    type Output = Attrs;
    fn bitand(self, rhs: Attrs) -> Attrs {
        Attrs(self.0 & rhs.0)
    }
}
