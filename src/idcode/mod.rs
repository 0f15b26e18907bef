//! The idcode: a compact printable encoding of a molecular graph.
//!
//! An idcode stores atoms, bonds, charges, stereo parities and query
//! features in a six-bit stream. Coordinates and reaction atom mapping
//! travel in separate payloads next to it.
//!
//! ```
//! use idcrab::idcode;
//!
//! let mol = idcode::parse("HZ@CR@").unwrap();
//! assert_eq!(mol.atom_count(), 2);
//! assert_eq!(idcode::encode(&mol).unwrap(), "di@Ah@");
//! ```

pub mod bits;
pub mod coords;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod extension;
pub mod header;
pub mod inspect;
pub mod mapping;
pub mod record;

pub use decoder::{IdcodeParser, ParserOptions};
pub use encoder::{CoordinateEncoding, Encoded, EncoderOptions, IdcodeEncoder, IdcodeVersion};
pub use error::IdcodeError;
pub use inspect::{
    atom_count, coordinates_are_3d, coordinates_are_absolute, describe, idcode_version,
};
pub use mapping::parse_mapping;

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;

/// Decodes an idcode without coordinates using the default parser.
pub fn parse(idcode: &str) -> Result<Mol<Atom, Bond>, IdcodeError> {
    IdcodeParser::new().parse_str(idcode, None)
}

/// Decodes an idcode together with its coordinate payload.
pub fn parse_with_coordinates(
    idcode: &str,
    coordinates: &str,
) -> Result<Mol<Atom, Bond>, IdcodeError> {
    IdcodeParser::new().parse_str(idcode, Some(coordinates))
}

/// Encodes `mol` as a version 3 idcode and returns only the idcode text.
pub fn encode(mol: &Mol<Atom, Bond>) -> Result<String, IdcodeError> {
    IdcodeEncoder::new().encode(mol).map(|encoded| encoded.idcode)
}
