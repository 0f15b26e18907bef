//! Stereo bookkeeping after decoding: racemates, double bonds of unknown
//! configuration and the up/down markers that make parities visible in a
//! 2D drawing.

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::atom::{Atom, AtomParity, EsrType};
use crate::bond::{Bond, BondOrder, BondParity, BondStereo};
use crate::mol::{Coordinates, Mol};
use crate::rings::RingInfo;

const PARITY_EPSILON: f64 = 1e-9;

/// Moves every absolute parity-1/2 stereo center into ESR group AND 0, i.e.
/// declares the molecule a racemate.
pub fn set_to_racemate(mol: &mut Mol<Atom, Bond>) {
    let nodes: Vec<NodeIndex> = mol.atoms().collect();
    for idx in nodes {
        let atom = mol.atom_mut(idx);
        if atom.parity.is_defined() && atom.esr_type == EsrType::Abs {
            atom.esr_type = EsrType::And;
            atom.esr_group = 0;
        }
    }
}

/// Flags double bonds outside small rings that carry no parity: the idcode
/// cannot tell a stereo bond of unknown configuration from a bond that is not
/// stereogenic at all.
pub fn mark_unknown_or_none_double_bonds(mol: &mut Mol<Atom, Bond>, rings: &RingInfo) {
    let edges: Vec<EdgeIndex> = mol.bonds().collect();
    for idx in edges {
        let small_ring = rings.is_small_ring_bond(idx);
        let bond = mol.bond_mut(idx);
        if bond.order == BondOrder::Double && !small_ring && bond.parity == BondParity::None {
            bond.parity_unknown_or_none = true;
        }
    }
}

/// Resolves flagged double bonds: stereogenic ones become explicitly unknown
/// and all double bonds of unknown configuration are drawn crossed.
pub fn set_unknown_parities_to_explicitly_unknown(mol: &mut Mol<Atom, Bond>) {
    let edges: Vec<EdgeIndex> = mol.bonds().collect();
    for idx in edges {
        if mol.bond(idx).parity_unknown_or_none {
            let stereogenic = mol.bond_endpoints(idx).is_some_and(|(a, b)| {
                is_stereogenic_end(mol, a, b) && is_stereogenic_end(mol, b, a)
            });
            let bond = mol.bond_mut(idx);
            bond.parity_unknown_or_none = false;
            if stereogenic {
                bond.parity = BondParity::Unknown;
            }
        }
        let bond = mol.bond_mut(idx);
        if bond.order == BondOrder::Double && bond.parity == BondParity::Unknown {
            bond.stereo = BondStereo::Cross;
        }
    }
}

/// A double bond end is stereogenic when it carries one substituent, or two
/// that differ in element or degree.
fn is_stereogenic_end(mol: &Mol<Atom, Bond>, end: NodeIndex, other: NodeIndex) -> bool {
    let subst: Vec<NodeIndex> = mol.neighbors(end).filter(|&n| n != other).collect();
    match subst.as_slice() {
        [_] => true,
        [a, b] => {
            let key = |n: NodeIndex| (mol.atom(n).atomic_num, mol.neighbors(n).count());
            key(*a) != key(*b)
        }
        _ => false,
    }
}

/// Puts one up or down wedge on every parity-1/2 stereo center so that
/// [`atom_parity_from_coordinates`] reproduces the stored parity.
pub fn set_stereo_bonds_from_parity(mol: &mut Mol<Atom, Bond>) {
    let centers: Vec<NodeIndex> = mol
        .atoms()
        .filter(|&a| mol.atom(a).parity.is_defined())
        .collect();

    for center in centers {
        let Some(bond) = pick_wedge_bond(mol, center) else {
            continue;
        };
        let wanted = mol.atom(center).parity;
        mol.bond_mut(bond).stereo = BondStereo::Up {
            from: center.index(),
        };
        if atom_parity_from_coordinates(mol, center) != wanted {
            mol.bond_mut(bond).stereo = BondStereo::Down {
                from: center.index(),
            };
        }
    }
}

fn pick_wedge_bond(mol: &Mol<Atom, Bond>, center: NodeIndex) -> Option<EdgeIndex> {
    let mut candidates: Vec<(bool, usize, EdgeIndex)> = mol
        .bonds_of(center)
        .filter(|&e| {
            let bond = mol.bond(e);
            bond.order == BondOrder::Single && bond.stereo == BondStereo::None
        })
        .filter_map(|e| {
            let other = mol.other_atom(e, center)?;
            // prefer neighbours that are no stereo centers themselves
            Some((mol.atom(other).parity.is_defined(), other.index(), e))
        })
        .collect();
    candidates.sort();
    candidates.first().map(|&(_, _, e)| e)
}

/// Parity of a stereo center as implied by its geometry.
///
/// The neighbours are taken in ascending atom index; with three neighbours
/// the center itself stands in for the implicit hydrogen, which ranks last.
/// In 2D, wedges pointing away from the center lift their far atom by one
/// unit (up) or lower it (down). The parity is odd when the signed volume
/// `(p1 - p0) · ((p2 - p0) × (p3 - p0))` is negative and even when it is
/// positive; a flat arrangement gives [`AtomParity::None`].
pub fn atom_parity_from_coordinates(mol: &Mol<Atom, Bond>, center: NodeIndex) -> AtomParity {
    let mut neighbours: Vec<(NodeIndex, EdgeIndex)> = mol
        .bonds_of(center)
        .filter_map(|e| Some((mol.other_atom(e, center)?, e)))
        .collect();
    neighbours.sort();
    if !(3..=4).contains(&neighbours.len()) {
        return AtomParity::None;
    }

    let three_d = mol.coordinates() == Coordinates::ThreeD;
    let center_pos = lifted(mol.atom(center).position, 0.0, three_d);
    let mut points: Vec<[f64; 3]> = neighbours
        .iter()
        .map(|&(n, e)| {
            let lift = match mol.bond(e).stereo {
                BondStereo::Up { from } if from == center.index() => 1.0,
                BondStereo::Down { from } if from == center.index() => -1.0,
                _ => 0.0,
            };
            lifted(mol.atom(n).position, lift, three_d)
        })
        .collect();
    if points.len() == 3 {
        points.push(center_pos);
    }

    let det = signed_volume(points[0], points[1], points[2], points[3]);
    if det < -PARITY_EPSILON {
        AtomParity::Odd
    } else if det > PARITY_EPSILON {
        AtomParity::Even
    } else {
        AtomParity::None
    }
}

fn lifted(p: [f64; 3], lift: f64, three_d: bool) -> [f64; 3] {
    if three_d {
        p
    } else {
        [p[0], p[1], lift]
    }
}

fn signed_volume(p0: [f64; 3], p1: [f64; 3], p2: [f64; 3], p3: [f64; 3]) -> f64 {
    let a = sub(p1, p0);
    let b = sub(p2, p0);
    let c = sub(p3, p0);
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}
