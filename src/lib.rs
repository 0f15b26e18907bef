pub mod aromaticity;
pub mod atom;
pub mod bond;
pub mod element;
pub mod idcode;
pub mod layout;
pub mod mol;
pub mod rings;
pub mod stereo;
pub mod traits;

pub use aromaticity::{AromaticityResolver, KekuleResolver};
pub use atom::{Atom, AtomParity, AtomQueryFeatures, EsrType, Radical};
pub use bond::{Bond, BondOrder, BondParity, BondQueryFeatures, BondStereo};
pub use idcode::{
    EncoderOptions, IdcodeEncoder, IdcodeError, IdcodeParser, IdcodeVersion, ParserOptions,
};
pub use layout::{CoordinateInventor, TreeLayout};
pub use mol::{Coordinates, Mol, ParityState};
pub use rings::RingInfo;
pub use traits::{HasAtomicNum, HasBondOrder, HasFormalCharge, HasIsotope, HasPosition};

#[cfg(test)]
mod tests;
