//! The structural content of one idcode, independent of any molecule type.
//!
//! [`IdcodeRecord`] mirrors the stream field by field. The decoder turns it
//! into a molecule, the encoder builds it from one, and the content dump
//! prints it.

use super::bits::{needed_bits, BitReader, BitWriter};
use super::error::IdcodeError;
use super::extension::ExtensionBlock;
use super::header::Header;
use crate::atom::{AtomParity, EsrType};
use crate::bond::BondParity;

/// Stream code of a bond order.
pub const ORDER_AROMATIC: u8 = 0;
pub const ORDER_SINGLE: u8 = 1;
pub const ORDER_DOUBLE: u8 = 2;
pub const ORDER_TRIPLE: u8 = 3;

const PARITY_1_AND: u32 = 4;
const PARITY_2_AND: u32 = 5;
const PARITY_1_OR: u32 = 6;
const PARITY_2_OR: u32 = 7;
/// Version 2 code for a parity-1 center in AND group 0.
const LEGACY_PARITY_MIX: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomStereoEntry {
    pub atom: usize,
    pub parity: AtomParity,
    pub esr_type: EsrType,
    pub esr_group: u8,
}

/// Parity of a double bond, or of a single bond with axial chirality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondStereoEntry {
    pub bond: usize,
    pub parity: BondParity,
    pub esr_type: EsrType,
    pub esr_group: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdcodeRecord {
    pub header: Header,
    pub atomic_nums: Vec<u8>,
    pub charges: Vec<i8>,
    /// Spanning tree parent of every atom; `None` for atom 0 and for atoms
    /// only reached by closure bonds. Parents never decrease along the atoms.
    pub parents: Vec<Option<usize>>,
    pub closures: Vec<(usize, usize)>,
    /// One of the `ORDER_*` codes per bond.
    pub bond_orders: Vec<u8>,
    pub atom_stereo: Vec<AtomStereoEntry>,
    /// Version 2 only: `false` declares the molecule a racemate.
    pub chiral: Option<bool>,
    pub bond_stereo: Vec<BondStereoEntry>,
    pub fragment: bool,
    pub extensions: Vec<ExtensionBlock>,
}

impl IdcodeRecord {
    /// Record of a molecule without atoms.
    pub fn empty(header: Header, fragment: bool) -> Self {
        Self {
            header,
            atomic_nums: Vec::new(),
            charges: Vec::new(),
            parents: Vec::new(),
            closures: Vec::new(),
            bond_orders: Vec::new(),
            atom_stereo: Vec::new(),
            chiral: None,
            bond_stereo: Vec::new(),
            fragment,
            extensions: Vec::new(),
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atomic_nums.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bond_orders.len()
    }

    /// Bond endpoints in stream order: tree bonds `(parent, child)` by
    /// ascending child, then the closure bonds.
    pub fn bond_atoms(&self) -> Vec<(usize, usize)> {
        self.parents
            .iter()
            .enumerate()
            .filter_map(|(child, parent)| parent.map(|p| (p, child)))
            .chain(self.closures.iter().copied())
            .collect()
    }

    /// Whether the bond's stereo entry is an axial (3-bit) one: its order
    /// was transported as single or aromatic.
    pub fn is_axial_bond(&self, bond: usize) -> bool {
        self.bond_orders
            .get(bond)
            .is_some_and(|&code| code <= ORDER_SINGLE)
    }

    pub fn read(idcode: &[u8]) -> Result<Self, IdcodeError> {
        let mut r = BitReader::start(idcode, 0)?;
        let header = Header::read(&mut r)?;
        let abits = header.abits();
        let bbits = header.bbits();
        if abits == 0 {
            return Ok(Self::empty(header, r.read_bit()?));
        }

        let atoms = r.read_bits(abits)? as usize;
        let bonds = r.read_bits(bbits)? as usize;
        log::debug!(
            "idcode version {}: {atoms} atoms, {bonds} bonds",
            header.version()
        );
        let nitrogens = r.read_bits(abits)?;
        let oxygens = r.read_bits(abits)?;
        let others = r.read_bits(abits)?;
        let charged = r.read_bits(abits)?;

        let mut atomic_nums = vec![6u8; atoms];
        for _ in 0..nitrogens {
            atomic_nums[r.read_index(abits, atoms, true)?] = 7;
        }
        for _ in 0..oxygens {
            atomic_nums[r.read_index(abits, atoms, true)?] = 8;
        }
        for _ in 0..others {
            let atom = r.read_index(abits, atoms, true)?;
            atomic_nums[atom] = r.read_bits(8)? as u8;
        }
        let mut charges = vec![0i8; atoms];
        for _ in 0..charged {
            let atom = r.read_index(abits, atoms, true)?;
            charges[atom] = r.read_bits(4)? as i8 - 8;
        }

        let mut closure_count = 1 + bonds as i64 - atoms as i64;
        let dbits = r.read_bits(4)?;
        let mut base = 0usize;
        let mut parents = Vec::with_capacity(atoms);
        if atoms > 0 {
            parents.push(None);
        }
        for atom in 1..atoms {
            let dif = r.read_bits(dbits)? as usize;
            if dif == 0 {
                closure_count += 1;
                parents.push(None);
                continue;
            }
            base += dif - 1;
            if base >= atom {
                return Err(IdcodeError::TreeParentNotBefore { atom, parent: base });
            }
            parents.push(Some(base));
        }
        if closure_count < 0 {
            return Err(IdcodeError::NegativeClosureCount {
                atoms,
                bonds,
                closures: closure_count,
            });
        }

        let mut closures = Vec::with_capacity(closure_count as usize);
        for _ in 0..closure_count {
            let a = r.read_index(abits, atoms, true)?;
            let b = r.read_index(abits, atoms, true)?;
            closures.push((a, b));
        }

        let bond_orders = (0..bonds)
            .map(|_| r.read_bits(2).map(|code| code as u8))
            .collect::<Result<Vec<_>, _>>()?;

        let mut record = Self {
            header,
            atomic_nums,
            charges,
            parents,
            closures,
            bond_orders,
            atom_stereo: Vec::new(),
            chiral: None,
            bond_stereo: Vec::new(),
            fragment: false,
            extensions: Vec::new(),
        };

        let centers = r.read_bits(abits)?;
        for _ in 0..centers {
            let atom = r.read_index(abits, atoms, true)?;
            let entry = if header.has_legacy_stereo() {
                match r.read_bits(2)? {
                    LEGACY_PARITY_MIX => AtomStereoEntry {
                        atom,
                        parity: AtomParity::Odd,
                        esr_type: EsrType::And,
                        esr_group: 0,
                    },
                    bits => AtomStereoEntry {
                        atom,
                        parity: AtomParity::from_bits(bits),
                        esr_type: EsrType::Abs,
                        esr_group: 0,
                    },
                }
            } else {
                let (bits, esr_type, esr_group) = read_grouped_parity(&mut r)?;
                AtomStereoEntry {
                    atom,
                    parity: AtomParity::from_bits(bits),
                    esr_type,
                    esr_group,
                }
            };
            record.atom_stereo.push(entry);
        }

        if header.has_legacy_stereo() {
            record.chiral = Some(r.read_bit()?);
        }

        let stereo_bonds = r.read_bits(bbits)?;
        for _ in 0..stereo_bonds {
            let bond = r.read_index(bbits, bonds, false)?;
            let entry = if record.is_axial_bond(bond) {
                let (bits, esr_type, esr_group) = read_grouped_parity(&mut r)?;
                BondStereoEntry {
                    bond,
                    parity: BondParity::from_bits(bits),
                    esr_type,
                    esr_group,
                }
            } else {
                BondStereoEntry {
                    bond,
                    parity: BondParity::from_bits(r.read_bits(2)?),
                    esr_type: EsrType::Abs,
                    esr_group: 0,
                }
            };
            record.bond_stereo.push(entry);
        }

        record.fragment = r.read_bit()?;
        record.extensions = ExtensionBlock::read_all(&mut r, &header, atoms, bonds)?;
        Ok(record)
    }

    /// Serializes the record. Atom and bond references must fit the header
    /// widths and tree parents must not decrease.
    pub fn write(&self) -> Vec<u8> {
        let mut w = BitWriter::new();
        self.header.write(&mut w);
        let abits = self.header.abits();
        let bbits = self.header.bbits();
        if abits == 0 {
            w.write_bit(self.fragment);
            return w.finish();
        }

        w.write_bits(self.atom_count() as u32, abits);
        w.write_bits(self.bond_count() as u32, bbits);

        let with_z = |z: u8| -> Vec<usize> {
            (0..self.atom_count())
                .filter(|&i| self.atomic_nums[i] == z)
                .collect()
        };
        let nitrogens = with_z(7);
        let oxygens = with_z(8);
        let others: Vec<usize> = (0..self.atom_count())
            .filter(|&i| !matches!(self.atomic_nums[i], 6..=8))
            .collect();
        let charged: Vec<usize> = (0..self.atom_count())
            .filter(|&i| self.charges[i] != 0)
            .collect();
        w.write_bits(nitrogens.len() as u32, abits);
        w.write_bits(oxygens.len() as u32, abits);
        w.write_bits(others.len() as u32, abits);
        w.write_bits(charged.len() as u32, abits);
        for &atom in nitrogens.iter().chain(&oxygens) {
            w.write_bits(atom as u32, abits);
        }
        for &atom in &others {
            w.write_bits(atom as u32, abits);
            w.write_bits(u32::from(self.atomic_nums[atom]), 8);
        }
        for &atom in &charged {
            w.write_bits(atom as u32, abits);
            w.write_bits((i32::from(self.charges[atom]) + 8) as u32, 4);
        }

        let mut base = 0usize;
        let difs: Vec<usize> = self
            .parents
            .iter()
            .skip(1)
            .map(|parent| match *parent {
                Some(p) => {
                    let dif = p.saturating_sub(base) + 1;
                    base = p;
                    dif
                }
                None => 0,
            })
            .collect();
        let dbits = needed_bits(difs.iter().copied().max().unwrap_or(0));
        w.write_bits(dbits, 4);
        for &dif in &difs {
            w.write_bits(dif as u32, dbits);
        }
        for &(a, b) in &self.closures {
            w.write_bits(a as u32, abits);
            w.write_bits(b as u32, abits);
        }
        for &code in &self.bond_orders {
            w.write_bits(u32::from(code), 2);
        }

        w.write_bits(self.atom_stereo.len() as u32, abits);
        for entry in &self.atom_stereo {
            w.write_bits(entry.atom as u32, abits);
            if self.header.has_legacy_stereo() {
                let code = if entry.esr_type == EsrType::And {
                    LEGACY_PARITY_MIX
                } else {
                    entry.parity.bits()
                };
                w.write_bits(code, 2);
            } else {
                write_grouped_parity(&mut w, entry.parity.bits(), entry.esr_type, entry.esr_group);
            }
        }
        if self.header.has_legacy_stereo() {
            w.write_bit(self.chiral.unwrap_or(true));
        }

        w.write_bits(self.bond_stereo.len() as u32, bbits);
        for entry in &self.bond_stereo {
            w.write_bits(entry.bond as u32, bbits);
            if self.is_axial_bond(entry.bond) {
                write_grouped_parity(&mut w, entry.parity.bits(), entry.esr_type, entry.esr_group);
            } else {
                w.write_bits(entry.parity.bits(), 2);
            }
        }

        w.write_bit(self.fragment);
        ExtensionBlock::write_all(&mut w, &self.header, &self.extensions);
        w.finish()
    }
}

/// Reads a 3-bit parity code and, for grouped codes, the 3-bit group.
/// Returns the plain 2-bit parity value with its ESR type and group.
fn read_grouped_parity(r: &mut BitReader<'_>) -> Result<(u32, EsrType, u8), IdcodeError> {
    let code = r.read_bits(3)?;
    let (bits, esr_type) = match code {
        PARITY_1_AND => (1, EsrType::And),
        PARITY_2_AND => (2, EsrType::And),
        PARITY_1_OR => (1, EsrType::Or),
        PARITY_2_OR => (2, EsrType::Or),
        plain => return Ok((plain, EsrType::Abs, 0)),
    };
    Ok((bits, esr_type, r.read_bits(3)? as u8))
}

fn write_grouped_parity(w: &mut BitWriter, bits: u32, esr_type: EsrType, group: u8) {
    let code = match (esr_type, bits) {
        (EsrType::And, 1) => PARITY_1_AND,
        (EsrType::And, 2) => PARITY_2_AND,
        (EsrType::Or, 1) => PARITY_1_OR,
        (EsrType::Or, 2) => PARITY_2_OR,
        _ => {
            w.write_bits(bits, 3);
            return;
        }
    };
    w.write_bits(code, 3);
    w.write_bits(u32::from(group), 3);
}
