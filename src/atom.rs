use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tetrahedral parity of a stereo center.
///
/// Parities are defined on atom indices, not on coordinates: with the
/// neighbours sorted by ascending atom index (an implicit hydrogen or lone
/// pair counting as the highest index), [`Odd`](AtomParity::Odd) and
/// [`Even`](AtomParity::Even) name the two possible handednesses. See
/// [`stereo::atom_parity_from_coordinates`](crate::stereo::atom_parity_from_coordinates)
/// for the geometric definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AtomParity {
    #[default]
    None,
    Odd,
    Even,
    Unknown,
}

impl AtomParity {
    /// Parity from its 2-bit stream value.
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            1 => Self::Odd,
            2 => Self::Even,
            3 => Self::Unknown,
            _ => Self::None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Odd => 1,
            Self::Even => 2,
            Self::Unknown => 3,
        }
    }

    /// `true` for a defined handedness (odd or even).
    pub fn is_defined(self) -> bool {
        matches!(self, Self::Odd | Self::Even)
    }
}

/// Enhanced stereo representation group type.
///
/// `Abs` centers have known absolute configuration. Centers sharing an `And`
/// group are present as a racemic mixture; an `Or` group means one of the two
/// enantiomers, but it is not known which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EsrType {
    #[default]
    Abs,
    And,
    Or,
}

/// Radical state of an atom, stored in the stream as a 2-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Radical {
    #[default]
    None,
    Singlet,
    Doublet,
    Triplet,
}

impl Radical {
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            1 => Self::Singlet,
            2 => Self::Doublet,
            3 => Self::Triplet,
            _ => Self::None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Singlet => 1,
            Self::Doublet => 2,
            Self::Triplet => 3,
        }
    }
}

bitflags! {
    /// Substructure-query constraints attached to an atom.
    ///
    /// Single-bit flags are plain booleans. The multi-bit constants
    /// (`AROM_STATE`, `RING_STATE`, …) are masks over packed sub-fields; use
    /// [`field`](AtomQueryFeatures::field) and
    /// [`with_field`](AtomQueryFeatures::with_field) to read and write them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct AtomQueryFeatures: u32 {
        const ANY = 1;
        const AROMATIC = 1 << 1;
        const NOT_AROMATIC = 1 << 2;
        const AROM_STATE = 0b11 << 1;
        const NOT_CHAIN = 1 << 3;
        const NOT_RING2 = 1 << 4;
        const NOT_RING3 = 1 << 5;
        const NOT_RING4 = 1 << 6;
        const RING_STATE = 0b1111 << 3;
        const HYDROGEN = 0b1111 << 7;
        const MORE_NEIGHBOURS = 1 << 11;
        const NO_MORE_NEIGHBOURS = 1 << 12;
        const MATCH_STEREO = 1 << 13;
        const PI_ELECTRONS = 0b111 << 14;
        const NEIGHBOURS = 0b1_1111 << 17;
        const RING_SIZE = 0b111 << 22;
        const CHARGE = 0b111 << 25;
        const FLAT_NITROGEN = 1 << 28;
    }
}

impl AtomQueryFeatures {
    /// Value of the packed sub-field selected by `mask`, shifted down.
    pub fn field(self, mask: Self) -> u32 {
        (self.bits() & mask.bits()) >> mask.bits().trailing_zeros()
    }

    /// Copy of `self` with the sub-field selected by `mask` replaced.
    pub fn with_field(self, mask: Self, value: u32) -> Self {
        let shift = mask.bits().trailing_zeros();
        let bits = (self.bits() & !mask.bits()) | ((value << shift) & mask.bits());
        Self::from_bits_retain(bits)
    }
}

/// Atom node of a molecule decoded from (or encoded to) an idcode.
///
/// Only the atomic number, charge and mass describe the real chemistry; the
/// remaining fields carry stereo, query and presentation data that the
/// idcode is able to transport.
///
/// # Examples
///
/// ```
/// use idcrab::Atom;
///
/// let nitrogen = Atom::new(7);
/// assert_eq!(nitrogen.atomic_num, 7);
/// assert_eq!(nitrogen.formal_charge, 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Atom {
    /// Atomic number. Values above 118 are pseudo atoms (R-groups, labels).
    pub atomic_num: u8,
    pub formal_charge: i8,
    /// Mass number. `0` means natural isotopic abundance.
    pub isotope: u16,
    pub parity: AtomParity,
    pub esr_type: EsrType,
    /// ESR group number, only meaningful for `And` and `Or` centers.
    pub esr_group: u8,
    pub query_features: AtomQueryFeatures,
    /// Allowed atomic numbers when the atom is a query list.
    pub atom_list: Option<Vec<u8>>,
    pub custom_label: Option<String>,
    pub radical: Radical,
    /// Explicit valence overriding the element default.
    pub abnormal_valence: Option<u8>,
    pub selected: bool,
    /// Reaction mapping number; `0` means unmapped.
    pub map_no: u16,
    /// Whether the mapping number was assigned automatically.
    pub auto_mapped: bool,
    /// Cartesian position. The z component is zero for 2D drawings.
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }
}

impl Default for Atom {
    fn default() -> Self {
        Self {
            atomic_num: 6,
            formal_charge: 0,
            isotope: 0,
            parity: AtomParity::None,
            esr_type: EsrType::Abs,
            esr_group: 0,
            query_features: AtomQueryFeatures::empty(),
            atom_list: None,
            custom_label: None,
            radical: Radical::None,
            abnormal_valence: None,
            selected: false,
            map_no: 0,
            auto_mapped: false,
            position: [0.0; 3],
        }
    }
}

impl crate::traits::HasAtomicNum for Atom {
    fn atomic_num(&self) -> u8 {
        self.atomic_num
    }
}

impl crate::traits::HasFormalCharge for Atom {
    fn formal_charge(&self) -> i8 {
        self.formal_charge
    }
}

impl crate::traits::HasIsotope for Atom {
    fn isotope(&self) -> u16 {
        self.isotope
    }
}

impl crate::traits::HasPosition for Atom {
    fn position(&self) -> [f64; 3] {
        self.position
    }
}
