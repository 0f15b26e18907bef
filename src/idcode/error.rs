use thiserror::Error;

/// Errors produced when decoding or encoding an idcode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdcodeError {
    /// The stream ended before all fields it announces were read.
    #[error("unexpected end of stream at byte {offset}")]
    UnexpectedEnd { offset: usize },
    /// A stream byte lies below the printable bias of 64.
    #[error("invalid byte 0x{byte:02x} at offset {offset}")]
    InvalidByte { offset: usize, byte: u8 },
    /// An atom reference points past the atom count.
    #[error("atom index {index} out of range for {atom_count} atoms")]
    AtomIndexOutOfRange { index: usize, atom_count: usize },
    /// A bond reference points past the bond count.
    #[error("bond index {index} out of range for {bond_count} bonds")]
    BondIndexOutOfRange { index: usize, bond_count: usize },
    /// A spanning-tree parent at or after the atom it carries.
    #[error("atom {atom} cannot hang from atom {parent}")]
    TreeParentNotBefore { atom: usize, parent: usize },
    /// The declared bond count cannot hold the spanning tree.
    #[error("{bonds} bonds cannot connect {atoms} atoms (closure count {closures})")]
    NegativeClosureCount {
        atoms: usize,
        bonds: usize,
        closures: i64,
    },
    /// Extension tag outside the two documented tables.
    #[error("unknown extension tag {tag}")]
    UnknownExtensionTag { tag: u32 },
    /// Coordinate payload in a format this decoder does not know.
    #[error("unsupported coordinate format '{}'", *byte as char)]
    UnsupportedCoordinateFormat { byte: u8 },
    /// Absolute coordinate shift code whose offset would be infinite.
    #[error("coordinate shift code {value} of {bins} has no finite offset")]
    ShiftOutOfRange { value: u32, bins: u64 },
    /// A molecule value that the idcode has no room for.
    #[error("{field} value {value} cannot be encoded")]
    ValueOutOfRange { field: &'static str, value: i64 },
    #[error("{atoms} atoms exceed the format limit of {limit}")]
    TooManyAtoms { atoms: usize, limit: usize },
    /// Grouped (ESR) stereo at this atom needs the version 3 format.
    #[error("stereo group of atom {atom} cannot be written in the version 2 format")]
    LegacyStereoUnsupported { atom: usize },
}
