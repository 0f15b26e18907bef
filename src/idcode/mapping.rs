//! Reaction atom mapping numbers, transported in their own six-bit stream
//! next to the idcode.

use petgraph::graph::NodeIndex;

use super::bits::{needed_bits, BitReader, BitWriter};
use super::error::IdcodeError;
use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::Mol;

/// Reads mapping numbers onto the atoms of `mol`, in atom order.
///
/// When the stream declares both automatic and manual mappings, every atom
/// carries its own flag; otherwise the single kind found applies to all
/// mapped atoms. An empty stream leaves the molecule unchanged.
pub fn parse_mapping(mol: &mut Mol<Atom, Bond>, mapping: &[u8]) -> Result<(), IdcodeError> {
    if mapping.is_empty() {
        return Ok(());
    }
    let mut r = BitReader::start(mapping, 0)?;
    let nbits = r.read_bits(4)?;
    let auto_found = r.read_bit()?;
    let manual_found = r.read_bit()?;

    let mut maps = Vec::with_capacity(mol.atom_count());
    for _ in 0..mol.atom_count() {
        let map_no = r.read_bits(nbits)? as u16;
        let auto = if auto_found && manual_found {
            r.read_bit()?
        } else {
            auto_found
        };
        maps.push((map_no, auto));
    }
    for (i, (map_no, auto)) in maps.into_iter().enumerate() {
        let atom = mol.atom_mut(NodeIndex::new(i));
        atom.map_no = map_no;
        atom.auto_mapped = auto && map_no != 0;
    }
    Ok(())
}

/// Encodes the mapping numbers of `mol` in atom order, or `None` when no
/// atom is mapped.
pub fn encode_mapping(mol: &Mol<Atom, Bond>) -> Result<Option<Vec<u8>>, IdcodeError> {
    let atoms: Vec<&Atom> = mol.atoms().map(|a| mol.atom(a)).collect();
    let max = atoms.iter().map(|a| a.map_no).max().unwrap_or(0);
    if max == 0 {
        return Ok(None);
    }
    let nbits = needed_bits(usize::from(max));
    if nbits > 15 {
        return Err(IdcodeError::ValueOutOfRange {
            field: "mapping number",
            value: i64::from(max),
        });
    }
    let mapped = || atoms.iter().filter(|a| a.map_no != 0);
    let auto_found = mapped().any(|a| a.auto_mapped);
    let manual_found = mapped().any(|a| !a.auto_mapped);

    let mut w = BitWriter::new();
    w.write_bits(nbits, 4);
    w.write_bit(auto_found);
    w.write_bit(manual_found);
    for atom in &atoms {
        w.write_bits(u32::from(atom.map_no), nbits);
        if auto_found && manual_found {
            w.write_bit(atom.auto_mapped);
        }
    }
    Ok(Some(w.finish()))
}
