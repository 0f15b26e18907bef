//! Reconstruction of a molecule from an idcode and its optional coordinates.

use petgraph::graph::{EdgeIndex, NodeIndex};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::coords::{decode_current, decode_legacy, CoordinateFormat};
use super::error::IdcodeError;
use super::extension::{ExtensionBlock, ExtensionTag};
use super::record::{IdcodeRecord, ORDER_AROMATIC, ORDER_DOUBLE, ORDER_TRIPLE};
use crate::aromaticity::{AromaticityResolver, KekuleResolver};
use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::layout::{CoordinateInventor, TreeLayout};
use crate::mol::{Coordinates, Mol, ParityState};
use crate::rings::RingInfo;
use crate::stereo;

/// Seed used for invented coordinates unless configured otherwise.
pub const DEFAULT_LAYOUT_SEED: u64 = 0x1234567890;

/// Settings of an [`IdcodeParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParserOptions {
    /// Guarantee 2D coordinates on the result: 3D data is discarded and
    /// missing coordinates are invented.
    pub ensure_2d_coordinates: bool,
    pub layout_seed: u64,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            ensure_2d_coordinates: true,
            layout_seed: DEFAULT_LAYOUT_SEED,
        }
    }
}

impl ParserOptions {
    pub fn with_ensure_2d_coordinates(mut self, ensure: bool) -> Self {
        self.ensure_2d_coordinates = ensure;
        self
    }

    pub fn with_layout_seed(mut self, seed: u64) -> Self {
        self.layout_seed = seed;
        self
    }
}

/// Decodes idcodes into [`Mol<Atom, Bond>`].
///
/// The parser owns the two collaborators that finish a decoded molecule: an
/// [`AromaticityResolver`] placing double bonds over bonds transported as
/// aromatic, and a [`CoordinateInventor`] drawing molecules that arrive
/// without 2D coordinates.
///
/// ```
/// use idcrab::idcode::IdcodeParser;
/// use idcrab::mol::Coordinates;
///
/// let parser = IdcodeParser::new();
/// let ethane = parser.parse(b"HZ@CR@", None).unwrap();
/// assert_eq!(ethane.atom_count(), 2);
/// assert_eq!(ethane.coordinates(), Coordinates::TwoD);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IdcodeParser<R = KekuleResolver, I = TreeLayout> {
    options: ParserOptions,
    resolver: R,
    inventor: I,
}

impl IdcodeParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }
}

impl<R, I> IdcodeParser<R, I>
where
    R: AromaticityResolver,
    I: CoordinateInventor,
{
    /// Parser with custom collaborators.
    pub fn with_collaborators(options: ParserOptions, resolver: R, inventor: I) -> Self {
        Self {
            options,
            resolver,
            inventor,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Decodes `idcode` and, if given, its coordinate payload.
    ///
    /// An empty idcode gives an empty molecule and an empty coordinate
    /// payload counts as absent. Nothing is returned unless the whole stream
    /// decoded without error.
    pub fn parse(
        &self,
        idcode: &[u8],
        coordinates: Option<&[u8]>,
    ) -> Result<Mol<Atom, Bond>, IdcodeError> {
        if idcode.is_empty() {
            return Ok(Mol::new());
        }
        let record = IdcodeRecord::read(idcode)?;
        let (mut mol, aromatic) = build_molecule(&record);
        if record.header.abits() == 0 {
            return Ok(mol);
        }

        if let Some(coords) = coordinates.filter(|c| !c.is_empty()) {
            self.place_atoms(&mut mol, &record, coords)?;
        }
        self.finish(&mut mol, &aromatic, &raised_bonds(&record));
        Ok(mol)
    }

    /// [`parse`](Self::parse) for text payloads.
    pub fn parse_str(
        &self,
        idcode: &str,
        coordinates: Option<&str>,
    ) -> Result<Mol<Atom, Bond>, IdcodeError> {
        self.parse(idcode.as_bytes(), coordinates.map(str::as_bytes))
    }

    /// Parses the space separated `idcode coordinates` form in which both
    /// payloads are commonly stored together.
    pub fn parse_combined(&self, text: &str) -> Result<Mol<Atom, Bond>, IdcodeError> {
        let mut parts = text.split_whitespace();
        let idcode = parts.next().unwrap_or("");
        self.parse_str(idcode, parts.next())
    }

    fn place_atoms(
        &self,
        mol: &mut Mol<Atom, Bond>,
        record: &IdcodeRecord,
        coords: &[u8],
    ) -> Result<(), IdcodeError> {
        let bond_atoms = record.bond_atoms();
        let decoded = match CoordinateFormat::detect(coords)? {
            CoordinateFormat::Current => {
                Some(decode_current(coords, record.atom_count(), &bond_atoms)?)
            }
            CoordinateFormat::Legacy => decode_legacy(
                coords,
                &record.parents,
                &bond_atoms,
                self.options.ensure_2d_coordinates,
            )?,
        };
        let Some(decoded) = decoded else {
            log::debug!("discarding 3D legacy coordinates");
            return Ok(());
        };
        for (i, position) in decoded.positions.into_iter().enumerate() {
            mol.atom_mut(NodeIndex::new(i)).position = position;
        }
        mol.set_coordinates(if decoded.three_d {
            Coordinates::ThreeD
        } else {
            Coordinates::TwoD
        });
        Ok(())
    }

    fn finish(&self, mol: &mut Mol<Atom, Bond>, aromatic: &[bool], raised: &[usize]) {
        if !self.resolver.resolve(mol, aromatic) {
            log::warn!("could not place double bonds on every aromatic atom");
        }

        // one step per listed entry: a bond listed twice goes from single to triple
        for &idx in raised {
            let bond = mol.bond_mut(EdgeIndex::new(idx));
            bond.order = if bond.order == BondOrder::Double {
                BondOrder::Triple
            } else {
                BondOrder::Double
            };
        }

        let ensure_2d = self.options.ensure_2d_coordinates;
        let transported_2d = mol.coordinates() == Coordinates::TwoD;
        if transported_2d || ensure_2d {
            let rings = RingInfo::new(mol);
            stereo::mark_unknown_or_none_double_bonds(mol, &rings);
        }
        if !transported_2d && ensure_2d {
            if mol.coordinates() == Coordinates::ThreeD {
                log::debug!("replacing 3D coordinates by a 2D drawing");
            }
            self.inventor.invent(mol, self.options.layout_seed);
        }

        match mol.coordinates() {
            Coordinates::TwoD => {
                stereo::set_stereo_bonds_from_parity(mol);
                stereo::set_unknown_parities_to_explicitly_unknown(mol);
                mol.set_parity_state(ParityState::Derived);
            }
            Coordinates::None => mol.set_parity_state(ParityState::NotComputed),
            Coordinates::ThreeD => {}
        }
    }
}

/// Bond indices listed in delocalized high-order blocks, repeats included.
fn raised_bonds(record: &IdcodeRecord) -> Vec<usize> {
    record
        .extensions
        .iter()
        .flat_map(|block| match block {
            ExtensionBlock::Flags {
                tag: ExtensionTag::DelocalizedHighOrder,
                indices,
            } => indices.as_slice(),
            _ => &[],
        })
        .copied()
        .collect()
}

/// Turns the record into a molecule before any post-processing. Also returns
/// which bonds were transported as aromatic.
fn build_molecule(record: &IdcodeRecord) -> (Mol<Atom, Bond>, Vec<bool>) {
    let mut mol = Mol::with_capacity(record.atom_count(), record.bond_count());
    mol.set_fragment(record.fragment);
    for (&atomic_num, &charge) in record.atomic_nums.iter().zip(&record.charges) {
        mol.add_atom(Atom {
            formal_charge: charge,
            ..Atom::new(atomic_num)
        });
    }

    let mut aromatic = vec![false; record.bond_count()];
    let bonds = record.bond_atoms().into_iter().zip(&record.bond_orders);
    for (i, ((a, b), &code)) in bonds.enumerate() {
        let order = match code {
            ORDER_DOUBLE => BondOrder::Double,
            ORDER_TRIPLE => BondOrder::Triple,
            _ => BondOrder::Single,
        };
        aromatic[i] = code == ORDER_AROMATIC;
        mol.add_bond(
            NodeIndex::new(a),
            NodeIndex::new(b),
            Bond {
                is_aromatic: aromatic[i],
                ..Bond::new(order)
            },
        );
    }

    for entry in &record.atom_stereo {
        let atom = mol.atom_mut(NodeIndex::new(entry.atom));
        atom.parity = entry.parity;
        atom.esr_type = entry.esr_type;
        atom.esr_group = entry.esr_group;
    }
    if record.chiral == Some(false) {
        stereo::set_to_racemate(&mut mol);
    }
    for entry in &record.bond_stereo {
        let bond = mol.bond_mut(EdgeIndex::new(entry.bond));
        bond.parity = entry.parity;
        bond.esr_type = entry.esr_type;
        bond.esr_group = entry.esr_group;
    }

    for block in &record.extensions {
        block.apply(&mut mol);
    }
    (mol, aromatic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomParity;
    use crate::bond::BondParity;
    use crate::idcode::header::Header;
    use crate::idcode::record::{AtomStereoEntry, BondStereoEntry, ORDER_SINGLE};

    fn no_layout() -> IdcodeParser {
        IdcodeParser::with_options(ParserOptions::default().with_ensure_2d_coordinates(false))
    }

    fn chain_record(atomic_nums: &[u8], orders: &[u8]) -> IdcodeRecord {
        let n = atomic_nums.len();
        let mut record = IdcodeRecord::empty(Header::Versioned { version: 9, bits: 4 }, false);
        record.atomic_nums = atomic_nums.to_vec();
        record.charges = vec![0; n];
        record.parents = (0..n).map(|i| i.checked_sub(1)).collect();
        record.bond_orders = orders.to_vec();
        record
    }

    #[test]
    fn empty_idcode_gives_empty_molecule() {
        let mol = IdcodeParser::new().parse(b"", None).unwrap();
        assert_eq!(mol.atom_count(), 0);
        assert_eq!(mol.coordinates(), Coordinates::None);
    }

    #[test]
    fn ethane_without_layout() {
        let mol = no_layout().parse(b"HZ@CR@", None).unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 1);
        assert_eq!(mol.coordinates(), Coordinates::None);
        assert_eq!(mol.parity_state(), ParityState::NotComputed);
        assert_eq!(mol.bond(EdgeIndex::new(0)).order, BondOrder::Single);
    }

    #[test]
    fn ethane_gets_invented_coordinates() {
        let mol = IdcodeParser::new().parse(b"HZ@CR@", None).unwrap();
        assert_eq!(mol.coordinates(), Coordinates::TwoD);
        assert_eq!(mol.parity_state(), ParityState::Derived);
        let len = mol.bond_length(EdgeIndex::new(0)).unwrap();
        assert!((len - 1.5).abs() < 1e-9);
    }

    #[test]
    fn racemate_flag_moves_centers_to_and_group() {
        let mut record = chain_record(&[6, 6, 8], &[ORDER_SINGLE, ORDER_SINGLE]);
        record.header = Header::Legacy { abits: 2, bbits: 2 };
        record.atom_stereo = vec![AtomStereoEntry {
            atom: 1,
            parity: AtomParity::Odd,
            esr_type: crate::atom::EsrType::Abs,
            esr_group: 0,
        }];
        record.chiral = Some(false);
        let (mol, _) = build_molecule(&record);
        let atom = mol.atom(NodeIndex::new(1));
        assert_eq!(atom.esr_type, crate::atom::EsrType::And);
        assert_eq!(atom.esr_group, 0);
    }

    #[test]
    fn aromatic_codes_are_flagged() {
        let record = chain_record(&[6, 6, 6], &[ORDER_AROMATIC, ORDER_DOUBLE]);
        let (mol, aromatic) = build_molecule(&record);
        assert_eq!(aromatic, vec![true, false]);
        assert!(mol.bond(EdgeIndex::new(0)).is_aromatic);
        assert_eq!(mol.bond(EdgeIndex::new(1)).order, BondOrder::Double);
    }

    #[test]
    fn delocalized_high_order_raises_after_resolution() {
        let mut record = chain_record(&[6, 6, 6], &[ORDER_SINGLE, ORDER_DOUBLE]);
        record.extensions = vec![ExtensionBlock::Flags {
            tag: ExtensionTag::DelocalizedHighOrder,
            indices: vec![0, 1],
        }];
        let mol = no_layout().parse(&record.write(), None).unwrap();
        assert_eq!(mol.bond(EdgeIndex::new(0)).order, BondOrder::Double);
        assert_eq!(mol.bond(EdgeIndex::new(1)).order, BondOrder::Triple);
    }

    #[test]
    fn every_high_order_entry_raises_once() {
        let mut record = chain_record(&[6, 6, 6], &[ORDER_SINGLE, ORDER_DOUBLE]);
        record.extensions = vec![ExtensionBlock::Flags {
            tag: ExtensionTag::DelocalizedHighOrder,
            indices: vec![0, 0, 1, 1],
        }];
        let mol = no_layout().parse(&record.write(), None).unwrap();
        assert_eq!(mol.bond(EdgeIndex::new(0)).order, BondOrder::Triple);
        assert_eq!(mol.bond(EdgeIndex::new(1)).order, BondOrder::Double);
        assert!(mol.bond(EdgeIndex::new(0)).delocalized_high_order);
    }

    #[test]
    fn double_bond_without_parity_is_flagged_unless_drawn() {
        // C-C=C-C without a transported configuration
        let record = chain_record(&[6, 6, 6, 6], &[ORDER_SINGLE, ORDER_DOUBLE, ORDER_SINGLE]);
        let bytes = record.write();

        let mol = no_layout().parse(&bytes, None).unwrap();
        assert!(!mol.bond(EdgeIndex::new(1)).parity_unknown_or_none);

        let mol = IdcodeParser::new().parse(&bytes, None).unwrap();
        let bond = mol.bond(EdgeIndex::new(1));
        assert_eq!(bond.parity, BondParity::Unknown);
        assert_eq!(bond.stereo, crate::bond::BondStereo::Cross);
    }

    #[test]
    fn transported_bond_parity_is_kept() {
        let mut record = chain_record(&[6, 6, 6, 6], &[ORDER_SINGLE, ORDER_DOUBLE, ORDER_SINGLE]);
        record.bond_stereo = vec![BondStereoEntry {
            bond: 1,
            parity: BondParity::EOr1,
            esr_type: crate::atom::EsrType::Abs,
            esr_group: 0,
        }];
        let mol = IdcodeParser::new().parse(&record.write(), None).unwrap();
        let bond = mol.bond(EdgeIndex::new(1));
        assert_eq!(bond.parity, BondParity::EOr1);
        assert!(!bond.parity_unknown_or_none);
    }

    #[test]
    fn three_d_coordinates_survive_without_ensure_2d() {
        let record = chain_record(&[6, 8], &[ORDER_SINGLE]);
        let coords = crate::idcode::coords::encode_current(
            &[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
            &record.bond_atoms(),
            true,
            false,
            8,
        );
        let mol = no_layout().parse(&record.write(), Some(&coords)).unwrap();
        assert_eq!(mol.coordinates(), Coordinates::ThreeD);
        assert_eq!(mol.parity_state(), ParityState::Decoded);

        let mol = IdcodeParser::new().parse(&record.write(), Some(&coords)).unwrap();
        assert_eq!(mol.coordinates(), Coordinates::TwoD);
        assert!(mol.atoms().all(|a| mol.atom(a).position[2] == 0.0));
    }

    #[test]
    fn combined_form_splits_on_whitespace() {
        let parser = no_layout();
        let mol = parser.parse_combined("HZ@CR@").unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(
            parser.parse_combined("HZ@CR@ \"abc"),
            Err(IdcodeError::UnsupportedCoordinateFormat { byte: b'"' })
        );
    }

    #[test]
    fn failures_return_no_molecule() {
        assert!(matches!(
            IdcodeParser::new().parse(b"HZ@", None),
            Err(IdcodeError::UnexpectedEnd { .. })
        ));
    }
}
