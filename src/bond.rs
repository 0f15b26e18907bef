use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::atom::EsrType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    /// Explicitly delocalized bond, kept as such rather than kekulized.
    Delocalized,
}

impl BondOrder {
    /// Number of shared electron pairs counted for valence purposes.
    pub fn valence_contribution(self) -> u8 {
        match self {
            Self::Single | Self::Delocalized => 1,
            Self::Double => 2,
            Self::Triple => 3,
        }
    }
}

/// E/Z parity of a double bond, or the axial parity of a hindered single
/// bond (BINAP type chirality).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BondParity {
    #[default]
    None,
    EOr1,
    ZOr2,
    Unknown,
}

impl BondParity {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            1 => Self::EOr1,
            2 => Self::ZOr2,
            3 => Self::Unknown,
            _ => Self::None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::EOr1 => 1,
            Self::ZOr2 => 2,
            Self::Unknown => 3,
        }
    }
}

/// Drawing marker of a bond.
///
/// Wedges are directional: `from` is the atom index at the narrow end, which
/// is the stereo center the wedge describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BondStereo {
    #[default]
    None,
    Up { from: usize },
    Down { from: usize },
    /// Crossed double bond of unknown configuration.
    Cross,
}

bitflags! {
    /// Substructure-query constraints attached to a bond.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct BondQueryFeatures: u32 {
        const SINGLE = 1;
        const DOUBLE = 1 << 1;
        const TRIPLE = 1 << 2;
        const DELOCALIZED = 1 << 3;
        const METAL_LIGAND = 1 << 4;
        const BOND_TYPES = 0b1_1111;
        const NOT_RING = 1 << 5;
        const RING = 1 << 6;
        const RING_STATE = 0b11 << 5;
        const BRIDGE_MIN = 0b1111 << 7;
        const BRIDGE_SPAN = 0b1111 << 11;
        const BRIDGE = 0b1111_1111 << 7;
        const RING_SIZE = 0b111 << 15;
        const AROMATIC = 1 << 19;
        const NOT_AROMATIC = 1 << 20;
        const AROM_STATE = 0b11 << 19;
        const MATCH_STEREO = 1 << 21;
    }
}

impl BondQueryFeatures {
    pub fn field(self, mask: Self) -> u32 {
        (self.bits() & mask.bits()) >> mask.bits().trailing_zeros()
    }

    pub fn with_field(self, mask: Self, value: u32) -> Self {
        let shift = mask.bits().trailing_zeros();
        let bits = (self.bits() & !mask.bits()) | ((value << shift) & mask.bits());
        Self::from_bits_retain(bits)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bond {
    pub order: BondOrder,
    /// Set for bonds transported as aromatic; `order` then holds the
    /// resolved Kekulé assignment.
    pub is_aromatic: bool,
    /// Aromatic bond whose resolved order is raised by one (double to
    /// triple, otherwise to double) after kekulization.
    pub delocalized_high_order: bool,
    pub parity: BondParity,
    pub esr_type: EsrType,
    pub esr_group: u8,
    /// Double bond whose configuration was not transported: it is either
    /// a stereo bond of unknown configuration or no stereo bond at all.
    pub parity_unknown_or_none: bool,
    pub query_features: BondQueryFeatures,
    pub stereo: BondStereo,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }
}

impl crate::traits::HasBondOrder for Bond {
    fn bond_order(&self) -> BondOrder {
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_defaults_to_single() {
        let bond = Bond::default();
        assert_eq!(bond.order, BondOrder::Single);
        assert_eq!(bond.stereo, BondStereo::None);
        assert!(!bond.is_aromatic);
    }

    #[test]
    fn bridge_subfields_share_the_bridge_mask() {
        let qf = BondQueryFeatures::empty().with_field(BondQueryFeatures::BRIDGE, 0x5a);
        assert_eq!(qf.field(BondQueryFeatures::BRIDGE_MIN), 0xa);
        assert_eq!(qf.field(BondQueryFeatures::BRIDGE_SPAN), 0x5);
    }

    #[test]
    fn parity_bits() {
        for bits in 0..4 {
            assert_eq!(BondParity::from_bits(bits).bits(), bits);
        }
    }
}
