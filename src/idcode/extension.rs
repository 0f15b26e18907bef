//! Tagged extension blocks that follow the core structure of an idcode.
//!
//! Each block starts with a continuation bit and a 4-bit tag. Tag 15 switches
//! to the second table, so all later tags are read as `16 + tag`; a second
//! switch is not possible. The payload layout of every tag is fixed by
//! [`ExtensionTag::layout`].

use super::bits::{needed_bits, BitReader, BitWriter};
use super::error::IdcodeError;
use super::header::Header;
use crate::atom::{Atom, AtomQueryFeatures, Radical};
use crate::bond::{Bond, BondOrder, BondQueryFeatures};
use crate::mol::Mol;

use petgraph::graph::{EdgeIndex, NodeIndex};

const ESCAPE_CODE: u32 = 15;
const SECOND_TABLE: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionTag {
    NoMoreNeighbours,
    Isotope,
    DelocalizedBond,
    MoreNeighbours,
    AtomRingState,
    AtomAromState,
    AnyAtom,
    Hydrogen,
    AtomList,
    BondRingState,
    BondTypes,
    AtomMatchStereo,
    Bridge,
    PiElectrons,
    Neighbours,
    SecondFeatureSet,
    AtomRingSize,
    AbnormalValence,
    CustomLabel,
    AtomCharge,
    BondRingSize,
    Radical,
    FlatNitrogen,
    BondMatchStereo,
    BondAromState,
    AtomSelection,
    DelocalizedHighOrder,
}

/// What an index inside a block refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Atom,
    Bond,
}

/// Payload layout of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Count, then that many indices.
    Flag(Target),
    /// Count, then (index, value of the given width) pairs.
    Value(Target, u32),
    /// Count, then per atom a 4-bit list length and 8-bit atomic numbers.
    AtomList,
    /// Count and a 4-bit length width, then per atom the length and 7-bit
    /// characters.
    CustomLabel,
    /// One bit per atom, no count.
    Selection,
    /// Switch to the second tag table.
    Escape,
}

impl ExtensionTag {
    pub const ALL: [ExtensionTag; 27] = [
        Self::NoMoreNeighbours,
        Self::Isotope,
        Self::DelocalizedBond,
        Self::MoreNeighbours,
        Self::AtomRingState,
        Self::AtomAromState,
        Self::AnyAtom,
        Self::Hydrogen,
        Self::AtomList,
        Self::BondRingState,
        Self::BondTypes,
        Self::AtomMatchStereo,
        Self::Bridge,
        Self::PiElectrons,
        Self::Neighbours,
        Self::SecondFeatureSet,
        Self::AtomRingSize,
        Self::AbnormalValence,
        Self::CustomLabel,
        Self::AtomCharge,
        Self::BondRingSize,
        Self::Radical,
        Self::FlatNitrogen,
        Self::BondMatchStereo,
        Self::BondAromState,
        Self::AtomSelection,
        Self::DelocalizedHighOrder,
    ];

    /// Tag for an effective code (`0..=26`).
    pub fn from_code(code: u32) -> Result<Self, IdcodeError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(IdcodeError::UnknownExtensionTag { tag: code })
    }

    /// Effective code, counting the second table from 16.
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn layout(self) -> Layout {
        match self {
            Self::NoMoreNeighbours
            | Self::MoreNeighbours
            | Self::AnyAtom
            | Self::AtomMatchStereo
            | Self::FlatNitrogen => Layout::Flag(Target::Atom),
            Self::DelocalizedBond | Self::BondMatchStereo | Self::DelocalizedHighOrder => {
                Layout::Flag(Target::Bond)
            }
            Self::Isotope => Layout::Value(Target::Atom, 8),
            Self::AbnormalValence => Layout::Value(Target::Atom, 4),
            Self::Radical => Layout::Value(Target::Atom, 2),
            Self::AtomList => Layout::AtomList,
            Self::CustomLabel => Layout::CustomLabel,
            Self::AtomSelection => Layout::Selection,
            Self::SecondFeatureSet => Layout::Escape,
            _ => {
                if let Some(mask) = self.atom_query_mask() {
                    Layout::Value(Target::Atom, mask.bits().count_ones())
                } else if let Some(mask) = self.bond_query_mask() {
                    Layout::Value(Target::Bond, mask.bits().count_ones())
                } else {
                    Layout::Escape
                }
            }
        }
    }

    /// Atom query-feature field carried by this tag.
    pub fn atom_query_mask(self) -> Option<AtomQueryFeatures> {
        Some(match self {
            Self::NoMoreNeighbours => AtomQueryFeatures::NO_MORE_NEIGHBOURS,
            Self::MoreNeighbours => AtomQueryFeatures::MORE_NEIGHBOURS,
            Self::AtomRingState => AtomQueryFeatures::RING_STATE,
            Self::AtomAromState => AtomQueryFeatures::AROM_STATE,
            Self::AnyAtom => AtomQueryFeatures::ANY,
            Self::Hydrogen => AtomQueryFeatures::HYDROGEN,
            Self::AtomMatchStereo => AtomQueryFeatures::MATCH_STEREO,
            Self::PiElectrons => AtomQueryFeatures::PI_ELECTRONS,
            Self::Neighbours => AtomQueryFeatures::NEIGHBOURS,
            Self::AtomRingSize => AtomQueryFeatures::RING_SIZE,
            Self::AtomCharge => AtomQueryFeatures::CHARGE,
            Self::FlatNitrogen => AtomQueryFeatures::FLAT_NITROGEN,
            _ => return None,
        })
    }

    /// Bond query-feature field carried by this tag.
    pub fn bond_query_mask(self) -> Option<BondQueryFeatures> {
        Some(match self {
            Self::BondRingState => BondQueryFeatures::RING_STATE,
            Self::BondTypes => BondQueryFeatures::BOND_TYPES,
            Self::Bridge => BondQueryFeatures::BRIDGE,
            Self::BondRingSize => BondQueryFeatures::RING_SIZE,
            Self::BondMatchStereo => BondQueryFeatures::MATCH_STEREO,
            Self::BondAromState => BondQueryFeatures::AROM_STATE,
            _ => return None,
        })
    }

    /// Short name used in content dumps.
    pub fn name(self) -> &'static str {
        match self {
            Self::NoMoreNeighbours => "noMoreNeighbours",
            Self::Isotope => "mass",
            Self::DelocalizedBond => "delocalizedBonds",
            Self::MoreNeighbours => "moreNeighbours",
            Self::AtomRingState => "atomRingState",
            Self::AtomAromState => "atomAromState",
            Self::AnyAtom => "atomAny",
            Self::Hydrogen => "atomHydrogen",
            Self::AtomList => "atomList",
            Self::BondRingState => "bondRingState",
            Self::BondTypes => "bondTypes",
            Self::AtomMatchStereo => "atomMatchStereo",
            Self::Bridge => "bridgeData",
            Self::PiElectrons => "piElectrons",
            Self::Neighbours => "neighbours",
            Self::SecondFeatureSet => "secondFeatureSet",
            Self::AtomRingSize => "atomRingSize",
            Self::AbnormalValence => "abnormalValence",
            Self::CustomLabel => "customLabel",
            Self::AtomCharge => "atomCharge",
            Self::BondRingSize => "bondRingSize",
            Self::Radical => "radical",
            Self::FlatNitrogen => "flatNitrogen",
            Self::BondMatchStereo => "bondMatchStereo",
            Self::BondAromState => "bondAromState",
            Self::AtomSelection => "selection",
            Self::DelocalizedHighOrder => "delocalizedHighOrderBonds",
        }
    }
}

/// One decoded extension block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionBlock {
    Flags {
        tag: ExtensionTag,
        indices: Vec<usize>,
    },
    Values {
        tag: ExtensionTag,
        entries: Vec<(usize, u32)>,
    },
    AtomLists(Vec<(usize, Vec<u8>)>),
    CustomLabels {
        label_bits: u32,
        entries: Vec<(usize, String)>,
    },
    Selection(Vec<bool>),
}

impl ExtensionBlock {
    pub fn tag(&self) -> ExtensionTag {
        match self {
            Self::Flags { tag, .. } | Self::Values { tag, .. } => *tag,
            Self::AtomLists(_) => ExtensionTag::AtomList,
            Self::CustomLabels { .. } => ExtensionTag::CustomLabel,
            Self::Selection(_) => ExtensionTag::AtomSelection,
        }
    }

    /// Reads blocks until the continuation bit is clear.
    pub fn read_all(
        r: &mut BitReader<'_>,
        header: &Header,
        atom_count: usize,
        bond_count: usize,
    ) -> Result<Vec<Self>, IdcodeError> {
        let abits = header.abits();
        let bbits = header.bbits();
        let width = |target: Target| match target {
            Target::Atom => (abits, atom_count, true),
            Target::Bond => (bbits, bond_count, false),
        };

        let mut offset = 0;
        let mut blocks = Vec::new();
        while r.read_bit()? {
            let tag = ExtensionTag::from_code(offset + r.read_bits(4)?)?;
            log::trace!("extension block {} ({})", tag.code(), tag.name());
            let block = match tag.layout() {
                Layout::Escape => {
                    offset = SECOND_TABLE;
                    continue;
                }
                Layout::Flag(target) => {
                    let (bits, len, atoms) = width(target);
                    let count = r.read_bits(bits)?;
                    let indices = (0..count)
                        .map(|_| r.read_index(bits, len, atoms))
                        .collect::<Result<_, _>>()?;
                    Self::Flags { tag, indices }
                }
                Layout::Value(target, value_bits) => {
                    let (bits, len, atoms) = width(target);
                    let count = r.read_bits(bits)?;
                    let mut entries = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let index = r.read_index(bits, len, atoms)?;
                        entries.push((index, r.read_bits(value_bits)?));
                    }
                    Self::Values { tag, entries }
                }
                Layout::AtomList => {
                    let count = r.read_bits(abits)?;
                    let mut entries = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let atom = r.read_index(abits, atom_count, true)?;
                        let len = r.read_bits(4)?;
                        let list = (0..len)
                            .map(|_| r.read_bits(8).map(|z| z as u8))
                            .collect::<Result<_, _>>()?;
                        entries.push((atom, list));
                    }
                    Self::AtomLists(entries)
                }
                Layout::CustomLabel => {
                    let count = r.read_bits(abits)?;
                    let label_bits = r.read_bits(4)?;
                    let mut entries = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        let atom = r.read_index(abits, atom_count, true)?;
                        let len = r.read_bits(label_bits)?;
                        let mut label = String::with_capacity(len as usize);
                        for _ in 0..len {
                            label.push(char::from(r.read_bits(7)? as u8));
                        }
                        entries.push((atom, label));
                    }
                    Self::CustomLabels {
                        label_bits,
                        entries,
                    }
                }
                Layout::Selection => Self::Selection(
                    (0..atom_count)
                        .map(|_| r.read_bit())
                        .collect::<Result<_, _>>()?,
                ),
            };
            blocks.push(block);
        }
        Ok(blocks)
    }

    /// Writes `blocks` (in ascending tag order) and the terminating bit.
    pub fn write_all(w: &mut BitWriter, header: &Header, blocks: &[Self]) {
        let abits = header.abits();
        let bbits = header.bbits();
        let bits_of = |target: Target| match target {
            Target::Atom => abits,
            Target::Bond => bbits,
        };

        let mut offset = 0;
        for block in blocks {
            let code = block.tag().code();
            if code >= SECOND_TABLE && offset == 0 {
                w.write_bit(true);
                w.write_bits(ESCAPE_CODE, 4);
                offset = SECOND_TABLE;
            }
            w.write_bit(true);
            w.write_bits(code - offset, 4);

            match (block, block.tag().layout()) {
                (Self::Flags { indices, .. }, Layout::Flag(target)) => {
                    let bits = bits_of(target);
                    w.write_bits(indices.len() as u32, bits);
                    for &i in indices {
                        w.write_bits(i as u32, bits);
                    }
                }
                (Self::Values { entries, .. }, Layout::Value(target, value_bits)) => {
                    let bits = bits_of(target);
                    w.write_bits(entries.len() as u32, bits);
                    for &(i, v) in entries {
                        w.write_bits(i as u32, bits);
                        w.write_bits(v, value_bits);
                    }
                }
                (Self::AtomLists(entries), _) => {
                    w.write_bits(entries.len() as u32, abits);
                    for (atom, list) in entries {
                        w.write_bits(*atom as u32, abits);
                        w.write_bits(list.len() as u32, 4);
                        for &z in list {
                            w.write_bits(u32::from(z), 8);
                        }
                    }
                }
                (
                    Self::CustomLabels {
                        label_bits,
                        entries,
                    },
                    _,
                ) => {
                    w.write_bits(entries.len() as u32, abits);
                    w.write_bits(*label_bits, 4);
                    for (atom, label) in entries {
                        w.write_bits(*atom as u32, abits);
                        w.write_bits(label.len() as u32, *label_bits);
                        for b in label.bytes() {
                            w.write_bits(u32::from(b), 7);
                        }
                    }
                }
                (Self::Selection(selected), _) => {
                    for &s in selected {
                        w.write_bit(s);
                    }
                }
                // tag and payload kind always agree for blocks built here
                _ => {}
            }
        }
        w.write_bit(false);
    }

    /// Stores the block content on the atoms and bonds of `mol`.
    pub fn apply(&self, mol: &mut Mol<Atom, Bond>) {
        match self {
            Self::Flags { tag, indices } => {
                for &i in indices {
                    apply_value(mol, *tag, i, 1);
                }
            }
            Self::Values { tag, entries } => {
                for &(i, v) in entries {
                    apply_value(mol, *tag, i, v);
                }
            }
            Self::AtomLists(entries) => {
                for (atom, list) in entries {
                    mol.atom_mut(NodeIndex::new(*atom)).atom_list = Some(list.clone());
                }
            }
            Self::CustomLabels { entries, .. } => {
                for (atom, label) in entries {
                    mol.atom_mut(NodeIndex::new(*atom)).custom_label = Some(label.clone());
                }
            }
            Self::Selection(selected) => {
                for (i, &s) in selected.iter().enumerate() {
                    if s {
                        mol.atom_mut(NodeIndex::new(i)).selected = true;
                    }
                }
            }
        }
    }

    /// Builds every block needed to transport the annotations of `mol`,
    /// ordered by tag.
    pub fn collect(mol: &Mol<Atom, Bond>) -> Result<Vec<Self>, IdcodeError> {
        let atoms: Vec<&Atom> = mol.atoms().map(|a| mol.atom(a)).collect();
        let bonds: Vec<&Bond> = mol.bonds().map(|b| mol.bond(b)).collect();
        let mut blocks = Vec::new();

        for tag in ExtensionTag::ALL {
            let block = match tag.layout() {
                Layout::Escape => continue,
                Layout::Flag(_) | Layout::Value(..) => {
                    let mut entries = Vec::new();
                    match tag.layout() {
                        Layout::Flag(Target::Atom) | Layout::Value(Target::Atom, _) => {
                            for (i, atom) in atoms.iter().enumerate() {
                                if let Some(v) = atom_value(atom, tag)? {
                                    entries.push((i, v));
                                }
                            }
                        }
                        _ => {
                            for (i, bond) in bonds.iter().enumerate() {
                                if let Some(v) = bond_value(bond, tag) {
                                    entries.push((i, v));
                                }
                            }
                        }
                    }
                    if entries.is_empty() {
                        continue;
                    }
                    if let Layout::Flag(_) = tag.layout() {
                        Self::Flags {
                            tag,
                            indices: entries.into_iter().map(|(i, _)| i).collect(),
                        }
                    } else {
                        Self::Values { tag, entries }
                    }
                }
                Layout::AtomList => {
                    let mut entries = Vec::new();
                    for (i, atom) in atoms.iter().enumerate() {
                        if let Some(list) = &atom.atom_list {
                            if list.len() > 15 {
                                return Err(IdcodeError::ValueOutOfRange {
                                    field: "atom list length",
                                    value: list.len() as i64,
                                });
                            }
                            entries.push((i, list.clone()));
                        }
                    }
                    if entries.is_empty() {
                        continue;
                    }
                    Self::AtomLists(entries)
                }
                Layout::CustomLabel => {
                    let mut entries = Vec::new();
                    for (i, atom) in atoms.iter().enumerate() {
                        match &atom.custom_label {
                            Some(label) if !label.is_empty() => {
                                if let Some(c) = label.chars().find(|c| !c.is_ascii()) {
                                    return Err(IdcodeError::ValueOutOfRange {
                                        field: "custom label character",
                                        value: c as i64,
                                    });
                                }
                                entries.push((i, label.clone()));
                            }
                            _ => {}
                        }
                    }
                    let Some(longest) = entries.iter().map(|(_, l)| l.len()).max() else {
                        continue;
                    };
                    let label_bits = needed_bits(longest);
                    if label_bits > 15 {
                        return Err(IdcodeError::ValueOutOfRange {
                            field: "custom label length",
                            value: longest as i64,
                        });
                    }
                    Self::CustomLabels {
                        label_bits,
                        entries,
                    }
                }
                Layout::Selection => {
                    if !atoms.iter().any(|a| a.selected) {
                        continue;
                    }
                    Self::Selection(atoms.iter().map(|a| a.selected).collect())
                }
            };
            blocks.push(block);
        }
        Ok(blocks)
    }
}

fn apply_value(mol: &mut Mol<Atom, Bond>, tag: ExtensionTag, index: usize, value: u32) {
    if let Some(mask) = tag.atom_query_mask() {
        let atom = mol.atom_mut(NodeIndex::new(index));
        atom.query_features = atom.query_features.with_field(mask, value);
        return;
    }
    if let Some(mask) = tag.bond_query_mask() {
        let bond = mol.bond_mut(EdgeIndex::new(index));
        bond.query_features = bond.query_features.with_field(mask, value);
        return;
    }
    match tag {
        ExtensionTag::Isotope => mol.atom_mut(NodeIndex::new(index)).isotope = value as u16,
        ExtensionTag::AbnormalValence => {
            mol.atom_mut(NodeIndex::new(index)).abnormal_valence = Some(value as u8)
        }
        ExtensionTag::Radical => {
            mol.atom_mut(NodeIndex::new(index)).radical = Radical::from_bits(value)
        }
        ExtensionTag::DelocalizedBond => {
            mol.bond_mut(EdgeIndex::new(index)).order = BondOrder::Delocalized
        }
        ExtensionTag::DelocalizedHighOrder => {
            mol.bond_mut(EdgeIndex::new(index)).delocalized_high_order = true
        }
        _ => {}
    }
}

fn atom_value(atom: &Atom, tag: ExtensionTag) -> Result<Option<u32>, IdcodeError> {
    if let Some(mask) = tag.atom_query_mask() {
        let v = atom.query_features.field(mask);
        return Ok((v != 0).then_some(v));
    }
    Ok(match tag {
        ExtensionTag::Isotope => {
            if atom.isotope > 255 {
                return Err(IdcodeError::ValueOutOfRange {
                    field: "isotope mass",
                    value: i64::from(atom.isotope),
                });
            }
            (atom.isotope != 0).then_some(u32::from(atom.isotope))
        }
        ExtensionTag::AbnormalValence => match atom.abnormal_valence {
            Some(v) if v > 15 => {
                return Err(IdcodeError::ValueOutOfRange {
                    field: "abnormal valence",
                    value: i64::from(v),
                })
            }
            v => v.map(u32::from),
        },
        ExtensionTag::Radical => (atom.radical != Radical::None).then_some(atom.radical.bits()),
        _ => None,
    })
}

fn bond_value(bond: &Bond, tag: ExtensionTag) -> Option<u32> {
    if let Some(mask) = tag.bond_query_mask() {
        let v = bond.query_features.field(mask);
        return (v != 0).then_some(v);
    }
    match tag {
        ExtensionTag::DelocalizedBond => {
            (bond.order == BondOrder::Delocalized && !bond.is_aromatic).then_some(1)
        }
        ExtensionTag::DelocalizedHighOrder => bond.delocalized_high_order.then_some(1),
        _ => None,
    }
}
