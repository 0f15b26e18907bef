use super::bits::{BitReader, BitWriter};
use super::error::IdcodeError;

/// Format version of idcodes that carry no explicit version field.
pub const VERSION_2: u32 = 8;
/// Current format version.
pub const VERSION_3: u32 = 9;

/// Leading field pair of every idcode.
///
/// The first nibble is either the atom reference width (values up to 8) or,
/// above 8, a format version. In the versioned form the second nibble is the
/// reference width shared by atoms and bonds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Header {
    Legacy { abits: u32, bbits: u32 },
    Versioned { version: u32, bits: u32 },
}

impl Header {
    pub fn read(r: &mut BitReader<'_>) -> Result<Self, IdcodeError> {
        let first = r.read_bits(4)?;
        let second = r.read_bits(4)?;
        Ok(if first > VERSION_2 {
            Self::Versioned {
                version: first,
                bits: second,
            }
        } else {
            Self::Legacy {
                abits: first,
                bbits: second,
            }
        })
    }

    pub fn write(&self, w: &mut BitWriter) {
        match *self {
            Self::Legacy { abits, bbits } => {
                w.write_bits(abits, 4);
                w.write_bits(bbits, 4);
            }
            Self::Versioned { version, bits } => {
                w.write_bits(version, 4);
                w.write_bits(bits, 4);
            }
        }
    }

    /// Bit width of atom references and atom counts.
    pub fn abits(&self) -> u32 {
        match *self {
            Self::Legacy { abits, .. } => abits,
            Self::Versioned { bits, .. } => bits,
        }
    }

    /// Bit width of bond references and bond counts.
    pub fn bbits(&self) -> u32 {
        match *self {
            Self::Legacy { bbits, .. } => bbits,
            Self::Versioned { bits, .. } => bits,
        }
    }

    pub fn version(&self) -> u32 {
        match *self {
            Self::Legacy { .. } => VERSION_2,
            Self::Versioned { version, .. } => version,
        }
    }

    /// Version 2 stores atom parities in two bits and carries a chiral flag.
    pub fn has_legacy_stereo(&self) -> bool {
        self.version() == VERSION_2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(first: u32, second: u32) -> Header {
        let mut w = BitWriter::new();
        w.write_bits(first, 4);
        w.write_bits(second, 4);
        let bytes = w.finish();
        Header::read(&mut BitReader::start(&bytes, 0).unwrap()).unwrap()
    }

    #[test]
    fn small_first_nibble_is_atom_width() {
        let h = header_of(3, 5);
        assert_eq!(h, Header::Legacy { abits: 3, bbits: 5 });
        assert_eq!(h.version(), VERSION_2);
        assert!(h.has_legacy_stereo());
    }

    #[test]
    fn eight_is_still_a_width() {
        assert_eq!(header_of(8, 8).abits(), 8);
    }

    #[test]
    fn large_first_nibble_is_version() {
        let h = header_of(9, 3);
        assert_eq!(h, Header::Versioned { version: 9, bits: 3 });
        assert_eq!(h.abits(), 3);
        assert_eq!(h.bbits(), 3);
        assert!(!h.has_legacy_stereo());
    }
}
