//! Serialization of molecules into idcodes.
//!
//! Atoms are renumbered breadth-first before writing so that every atom's
//! spanning tree parent precedes it and parents never decrease along the
//! stream. The permutation is returned with the encoded text.

use petgraph::graph::{EdgeIndex, NodeIndex};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::bits::needed_bits;
use super::coords::encode_current;
use super::error::IdcodeError;
use super::extension::ExtensionBlock;
use super::header::{Header, VERSION_2, VERSION_3};
use super::mapping::encode_mapping;
use super::record::{
    AtomStereoEntry, BondStereoEntry, IdcodeRecord, ORDER_AROMATIC, ORDER_DOUBLE, ORDER_SINGLE,
    ORDER_TRIPLE,
};
use crate::atom::{Atom, AtomParity, EsrType};
use crate::bond::{Bond, BondOrder, BondParity};
use crate::mol::{Coordinates, Mol};

/// Largest molecule a version 2 idcode can describe.
pub const MAX_LEGACY_ATOMS: usize = 255;
/// Largest atom or bond count of a version 3 idcode.
pub const MAX_ATOMS: usize = 32767;

const DEFAULT_RESOLUTION_2D: u8 = 6;
const DEFAULT_RESOLUTION_3D: u8 = 8;
const MAX_ESR_GROUP: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IdcodeVersion {
    /// Version 8: separate atom and bond widths, two-bit parities and a
    /// chiral flag.
    V2,
    /// Version 9: shared reference width and grouped ESR parities.
    #[default]
    V3,
}

impl IdcodeVersion {
    /// Version number as written to the header.
    pub fn number(self) -> u32 {
        match self {
            Self::V2 => VERSION_2,
            Self::V3 => VERSION_3,
        }
    }
}

/// Which coordinate payload to produce next to the idcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateEncoding {
    None,
    /// Shape only; decoded drawings are scaled to a bond length of 1.5.
    #[default]
    Relative,
    /// Shape plus the original bond length and position of the first atom.
    Absolute,
}

/// Settings of an [`IdcodeEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EncoderOptions {
    pub version: IdcodeVersion,
    pub coordinates: CoordinateEncoding,
    /// Coordinate resolution exponent (1..=15); every coordinate value takes
    /// twice as many bits. Defaults to 6 for 2D and 8 for 3D.
    pub resolution: Option<u8>,
}

impl EncoderOptions {
    pub fn with_version(mut self, version: IdcodeVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_coordinates(mut self, coordinates: CoordinateEncoding) -> Self {
        self.coordinates = coordinates;
        self
    }

    pub fn with_resolution(mut self, resolution: u8) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

/// Output of [`IdcodeEncoder::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub idcode: String,
    pub coordinates: Option<String>,
    pub mapping: Option<String>,
    /// `atom_order[i]` is the index in the encoded molecule of stream atom
    /// `i`, which is atom `i` of the decoded molecule.
    pub atom_order: Vec<usize>,
}

impl Encoded {
    /// The idcode followed by the coordinates, separated by a space.
    pub fn combined(&self) -> String {
        match &self.coordinates {
            Some(coords) => format!("{} {}", self.idcode, coords),
            None => self.idcode.clone(),
        }
    }
}

/// Writes molecules as idcodes.
///
/// ```
/// use idcrab::idcode::IdcodeEncoder;
/// use idcrab::{Atom, Bond, Mol};
///
/// let mut mol = Mol::<Atom, Bond>::new();
/// let a = mol.add_atom(Atom::new(6));
/// let b = mol.add_atom(Atom::new(8));
/// mol.add_bond(a, b, Bond::default());
///
/// let encoded = IdcodeEncoder::new().encode(&mol).unwrap();
/// assert_eq!(encoded.atom_order, vec![0, 1]);
/// assert!(encoded.coordinates.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IdcodeEncoder {
    options: EncoderOptions,
}

/// Breadth-first numbering of a molecule and its bonds in stream order.
struct StreamOrder {
    /// Original atom of every stream atom.
    atoms: Vec<NodeIndex>,
    parents: Vec<Option<usize>>,
    closures: Vec<(usize, usize)>,
    /// Original bond of every stream bond: tree bonds by child, then closures.
    bonds: Vec<EdgeIndex>,
}

impl IdcodeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: EncoderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EncoderOptions {
        &self.options
    }

    pub fn encode(&self, mol: &Mol<Atom, Bond>) -> Result<Encoded, IdcodeError> {
        let limit = match self.options.version {
            IdcodeVersion::V2 => MAX_LEGACY_ATOMS,
            IdcodeVersion::V3 => MAX_ATOMS,
        };
        if mol.atom_count() > limit {
            return Err(IdcodeError::TooManyAtoms {
                atoms: mol.atom_count(),
                limit,
            });
        }
        if mol.bond_count() > MAX_ATOMS {
            return Err(IdcodeError::ValueOutOfRange {
                field: "bond count",
                value: mol.bond_count() as i64,
            });
        }
        let three_d = mol.coordinates() == Coordinates::ThreeD;
        let resolution = self.options.resolution.unwrap_or(if three_d {
            DEFAULT_RESOLUTION_3D
        } else {
            DEFAULT_RESOLUTION_2D
        });
        if !(1..=15).contains(&resolution) {
            return Err(IdcodeError::ValueOutOfRange {
                field: "coordinate resolution",
                value: i64::from(resolution),
            });
        }

        let order = stream_order(mol);
        let stream = renumber(mol, &order);
        let record = self.build_record(&stream, &order)?;
        log::debug!(
            "encoding {} atoms, {} bonds as version {}",
            record.atom_count(),
            record.bond_count(),
            record.header.version()
        );

        let coordinates = match self.options.coordinates {
            _ if mol.coordinates() == Coordinates::None || mol.atom_count() == 0 => None,
            CoordinateEncoding::None => None,
            encoding => {
                let positions: Vec<[f64; 3]> =
                    stream.atoms().map(|a| stream.atom(a).position).collect();
                Some(to_text(encode_current(
                    &positions,
                    &record.bond_atoms(),
                    three_d,
                    encoding == CoordinateEncoding::Absolute,
                    resolution,
                )))
            }
        };

        Ok(Encoded {
            idcode: to_text(record.write()),
            coordinates,
            mapping: encode_mapping(&stream)?.map(to_text),
            atom_order: order.atoms.iter().map(|a| a.index()).collect(),
        })
    }

    fn build_record(
        &self,
        stream: &Mol<Atom, Bond>,
        order: &StreamOrder,
    ) -> Result<IdcodeRecord, IdcodeError> {
        let atoms = stream.atom_count();
        let bonds = stream.bond_count();
        let header = match self.options.version {
            IdcodeVersion::V2 => Header::Legacy {
                abits: needed_bits(atoms),
                bbits: needed_bits(bonds),
            },
            IdcodeVersion::V3 => Header::Versioned {
                version: VERSION_3,
                bits: needed_bits(atoms).max(needed_bits(bonds)),
            },
        };
        let mut record = IdcodeRecord::empty(header, stream.is_fragment());
        if atoms == 0 {
            return Ok(record);
        }

        for idx in stream.atoms() {
            let atom = stream.atom(idx);
            if !(-8..=7).contains(&atom.formal_charge) {
                return Err(IdcodeError::ValueOutOfRange {
                    field: "formal charge",
                    value: i64::from(atom.formal_charge),
                });
            }
            record.atomic_nums.push(atom.atomic_num);
            record.charges.push(atom.formal_charge);
        }
        record.parents = order.parents.clone();
        record.closures = order.closures.clone();
        record.bond_orders = stream.bonds().map(|b| order_code(stream.bond(b))).collect();

        let (atom_stereo, chiral) = match self.options.version {
            IdcodeVersion::V2 => legacy_atom_stereo(stream, order)?,
            IdcodeVersion::V3 => (atom_stereo(stream)?, None),
        };
        record.atom_stereo = atom_stereo;
        record.chiral = chiral;

        for idx in stream.bonds() {
            let bond = stream.bond(idx);
            if bond.parity == BondParity::None {
                continue;
            }
            let grouped = record.is_axial_bond(idx.index())
                && matches!(bond.parity, BondParity::EOr1 | BondParity::ZOr2)
                && bond.esr_type != EsrType::Abs;
            if grouped && bond.esr_group > MAX_ESR_GROUP {
                return Err(IdcodeError::ValueOutOfRange {
                    field: "ESR group",
                    value: i64::from(bond.esr_group),
                });
            }
            record.bond_stereo.push(BondStereoEntry {
                bond: idx.index(),
                parity: bond.parity,
                esr_type: if grouped { bond.esr_type } else { EsrType::Abs },
                esr_group: if grouped { bond.esr_group } else { 0 },
            });
        }

        record.extensions = ExtensionBlock::collect(stream)?;
        Ok(record)
    }
}

/// Numbers the atoms breadth-first, component by component in order of
/// their lowest atom, visiting neighbours in ascending original order.
fn stream_order(mol: &Mol<Atom, Bond>) -> StreamOrder {
    let n = mol.atom_count();
    let mut rank = vec![usize::MAX; n];
    let mut atoms = Vec::with_capacity(n);
    let mut parents = Vec::with_capacity(n);
    let mut tree_bonds = Vec::with_capacity(n);

    for root in mol.atoms() {
        if rank[root.index()] != usize::MAX {
            continue;
        }
        rank[root.index()] = atoms.len();
        atoms.push(root);
        parents.push(None);
        tree_bonds.push(None);

        let mut head = atoms.len() - 1;
        while head < atoms.len() {
            let u = atoms[head];
            let mut next: Vec<(NodeIndex, EdgeIndex)> = mol
                .bonds_of(u)
                .filter_map(|e| mol.other_atom(e, u).map(|v| (v, e)))
                .collect();
            next.sort();
            for (v, e) in next {
                if rank[v.index()] == usize::MAX {
                    rank[v.index()] = atoms.len();
                    atoms.push(v);
                    parents.push(Some(head));
                    tree_bonds.push(Some(e));
                }
            }
            head += 1;
        }
    }

    let mut in_tree = vec![false; mol.bond_count()];
    let mut bonds = Vec::with_capacity(mol.bond_count());
    for e in tree_bonds.iter().flatten() {
        in_tree[e.index()] = true;
        bonds.push(*e);
    }

    // closures run from the lower to the higher stream atom
    let mut closures: Vec<(usize, usize, EdgeIndex)> = mol
        .bonds()
        .filter(|e| !in_tree[e.index()])
        .filter_map(|e| {
            let (a, b) = mol.bond_endpoints(e)?;
            let (ra, rb) = (rank[a.index()], rank[b.index()]);
            Some((ra.min(rb), ra.max(rb), e))
        })
        .collect();
    closures.sort();
    bonds.extend(closures.iter().map(|&(_, _, e)| e));

    StreamOrder {
        atoms,
        parents,
        closures: closures.into_iter().map(|(a, b, _)| (a, b)).collect(),
        bonds,
    }
}

/// Copy of `mol` with atoms and bonds in stream order.
fn renumber(mol: &Mol<Atom, Bond>, order: &StreamOrder) -> Mol<Atom, Bond> {
    let mut stream = Mol::with_capacity(order.atoms.len(), order.bonds.len());
    stream.set_fragment(mol.is_fragment());
    stream.set_coordinates(mol.coordinates());
    for &atom in &order.atoms {
        stream.add_atom(mol.atom(atom).clone());
    }
    let tree = order
        .parents
        .iter()
        .enumerate()
        .filter_map(|(child, parent)| parent.map(|p| (p, child)));
    for ((a, b), &bond) in tree.chain(order.closures.iter().copied()).zip(&order.bonds) {
        stream.add_bond(NodeIndex::new(a), NodeIndex::new(b), mol.bond(bond).clone());
    }
    stream
}

/// Order code such that decoding restores `bond.order`; bonds raised after
/// kekulization are written one step lower.
fn order_code(bond: &Bond) -> u8 {
    if bond.is_aromatic {
        return ORDER_AROMATIC;
    }
    match (bond.order, bond.delocalized_high_order) {
        (BondOrder::Triple, true) => ORDER_DOUBLE,
        (_, true) => ORDER_SINGLE,
        (BondOrder::Double, false) => ORDER_DOUBLE,
        (BondOrder::Triple, false) => ORDER_TRIPLE,
        (BondOrder::Single | BondOrder::Delocalized, false) => ORDER_SINGLE,
    }
}

fn atom_stereo(stream: &Mol<Atom, Bond>) -> Result<Vec<AtomStereoEntry>, IdcodeError> {
    let mut entries = Vec::new();
    for idx in stream.atoms() {
        let atom = stream.atom(idx);
        if atom.parity == AtomParity::None {
            continue;
        }
        let grouped = atom.parity.is_defined() && atom.esr_type != EsrType::Abs;
        if grouped && atom.esr_group > MAX_ESR_GROUP {
            return Err(IdcodeError::ValueOutOfRange {
                field: "ESR group",
                value: i64::from(atom.esr_group),
            });
        }
        entries.push(AtomStereoEntry {
            atom: idx.index(),
            parity: atom.parity,
            esr_type: if grouped { atom.esr_type } else { EsrType::Abs },
            esr_group: if grouped { atom.esr_group } else { 0 },
        });
    }
    Ok(entries)
}

/// Version 2 parities: either every center is in AND group 0 and the
/// molecule is written as a racemate, or centers are absolute with at most
/// parity-1 centers of AND group 0 next to them.
fn legacy_atom_stereo(
    stream: &Mol<Atom, Bond>,
    order: &StreamOrder,
) -> Result<(Vec<AtomStereoEntry>, Option<bool>), IdcodeError> {
    let centers: Vec<(usize, &Atom)> = stream
        .atoms()
        .map(|idx| (idx.index(), stream.atom(idx)))
        .filter(|(_, atom)| atom.parity != AtomParity::None)
        .collect();
    if let Some(&(i, _)) = centers.iter().find(|(_, atom)| !atom.parity.is_defined()) {
        return Err(IdcodeError::LegacyStereoUnsupported {
            atom: order.atoms[i].index(),
        });
    }

    let racemate = !centers.is_empty()
        && centers
            .iter()
            .all(|(_, atom)| atom.esr_type == EsrType::And && atom.esr_group == 0);
    let mut entries = Vec::with_capacity(centers.len());
    for &(i, atom) in &centers {
        let esr_type = match (atom.esr_type, atom.parity, atom.esr_group) {
            _ if racemate => EsrType::Abs,
            (EsrType::Abs, ..) => EsrType::Abs,
            (EsrType::And, AtomParity::Odd, 0) => EsrType::And,
            _ => {
                return Err(IdcodeError::LegacyStereoUnsupported {
                    atom: order.atoms[i].index(),
                })
            }
        };
        entries.push(AtomStereoEntry {
            atom: i,
            parity: atom.parity,
            esr_type,
            esr_group: 0,
        });
    }
    Ok((entries, Some(!racemate)))
}

fn to_text(bytes: Vec<u8>) -> String {
    bytes.into_iter().map(char::from).collect()
}
