//! Placement of double bonds over bonds transported as aromatic.
//!
//! The idcode marks aromatic bonds with a dedicated order code instead of a
//! concrete Kekulé assignment. After decoding, an [`AromaticityResolver`]
//! turns every flagged bond into a single or double bond such that each atom
//! that needs a pi bond receives exactly one.
//!
//! [`KekuleResolver`] implements this with petgraph's general maximum
//! matching over the flagged bonds. Uncharged carbons must be matched;
//! heteroatoms and charged atoms with a free valence may be matched but can
//! also stay saturated (the pyrrole nitrogen, the cyclopentadienyl anion
//! carbon).

use petgraph::algo::maximum_matching;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};

use crate::atom::Atom;
use crate::bond::{Bond, BondOrder};
use crate::element;
use crate::mol::Mol;
use crate::traits::{HasAtomicNum, HasBondOrder, HasFormalCharge};

/// Assigns concrete orders to bonds flagged aromatic.
pub trait AromaticityResolver {
    /// `aromatic[i]` tells whether bond `i` was flagged. Returns `false` when
    /// no assignment gives every required atom a double bond; the molecule is
    /// still left with the best assignment found.
    fn resolve(&self, mol: &mut Mol<Atom, Bond>, aromatic: &[bool]) -> bool;
}

/// Default resolver based on maximum matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct KekuleResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PiNeed {
    None,
    Optional,
    Required,
}

impl AromaticityResolver for KekuleResolver {
    fn resolve(&self, mol: &mut Mol<Atom, Bond>, aromatic: &[bool]) -> bool {
        let flagged: Vec<(EdgeIndex, usize, usize)> = mol
            .bonds()
            .filter(|e| aromatic.get(e.index()).copied().unwrap_or(false))
            .filter_map(|e| {
                let (a, b) = mol.bond_endpoints(e)?;
                Some((e, a.index(), b.index()))
            })
            .collect();
        if flagged.is_empty() {
            return true;
        }

        let n = mol.atom_count();
        let mut touched = vec![false; n];
        for &(_, a, b) in &flagged {
            touched[a] = true;
            touched[b] = true;
        }
        let need: Vec<PiNeed> = mol
            .atoms()
            .map(|atom| {
                if touched[atom.index()] {
                    pi_need(mol, atom, aromatic)
                } else {
                    PiNeed::None
                }
            })
            .collect();
        let required = |i: usize| need[i] == PiNeed::Required;
        let eligible = |i: usize| need[i] != PiNeed::None;

        // Required atoms are first paired among themselves, so that optional
        // atoms only take a double bond when nothing else can.
        let mut mates = pi_matching(n, &flagged, |a, b| required(a) && required(b));
        if (0..n).any(|i| required(i) && mates[i].is_none()) {
            let wider = pi_matching(n, &flagged, |a, b| {
                eligible(a) && eligible(b) && (required(a) || required(b))
            });
            extend_matching(&mut mates, &wider, required);
        }

        for &(e, a, b) in &flagged {
            let bond = mol.bond_mut(e);
            bond.is_aromatic = true;
            bond.order = if mates[a] == Some(b) {
                BondOrder::Double
            } else {
                BondOrder::Single
            };
        }

        let unmatched: Vec<usize> = (0..n)
            .filter(|&i| required(i) && mates[i].is_none())
            .collect();
        if !unmatched.is_empty() {
            log::warn!("no Kekulé structure places a double bond at atoms {unmatched:?}");
            return false;
        }
        true
    }
}

/// Partner of each atom, by atom index.
type Mates = Vec<Option<usize>>;

/// Maximum matching over the flagged bonds that `admit` accepts.
fn pi_matching(
    n: usize,
    flagged: &[(EdgeIndex, usize, usize)],
    admit: impl Fn(usize, usize) -> bool,
) -> Mates {
    let mut graph = UnGraph::<(), ()>::with_capacity(n, flagged.len());
    for _ in 0..n {
        graph.add_node(());
    }
    for &(_, a, b) in flagged {
        if admit(a, b) {
            graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), ());
        }
    }
    let matching = maximum_matching(&graph);
    (0..n)
        .map(|i| matching.mate(NodeIndex::new(i)).map(|m| m.index()))
        .collect()
}

/// Merges a larger matching into `base` without uncovering any atom `base`
/// covers.
///
/// The symmetric difference of two matchings splits into alternating paths
/// and cycles. A path whose two ends are both free in `base` carries one more
/// `wider` edge than `base` edges; switching it to `wider` covers both ends
/// and keeps every inner atom covered. Only paths that cover a required atom
/// this way are switched.
fn extend_matching(base: &mut Mates, wider: &Mates, required: impl Fn(usize) -> bool) {
    let mut seen = vec![false; base.len()];
    for start in 0..base.len() {
        if seen[start] || base[start].is_some() || wider[start].is_none() {
            continue;
        }
        let mut path = vec![start];
        seen[start] = true;
        let mut at = start;
        let mut along_wider = true;
        loop {
            let next = if along_wider { wider[at] } else { base[at] };
            let Some(next) = next.filter(|&v| !seen[v] && base[v] != wider[v]) else {
                break;
            };
            seen[next] = true;
            path.push(next);
            at = next;
            along_wider = !along_wider;
        }
        let end = at;
        let augments = base[end].is_none() && wider[end].is_some();
        if augments && (required(start) || required(end)) {
            for &v in &path {
                base[v] = wider[v];
            }
        }
    }
}

fn pi_need<A, B>(mol: &Mol<A, B>, atom: NodeIndex, aromatic: &[bool]) -> PiNeed
where
    A: HasAtomicNum + HasFormalCharge,
    B: HasBondOrder,
{
    let a = mol.atom(atom);
    let used: u8 = mol
        .bonds_of(atom)
        .map(|e| {
            if aromatic.get(e.index()).copied().unwrap_or(false) {
                1
            } else {
                mol.bond(e).bond_order().valence_contribution()
            }
        })
        .sum();
    let has_pi_bond = mol.bonds_of(atom).any(|e| {
        !aromatic.get(e.index()).copied().unwrap_or(false)
            && mol.bond(e).bond_order().valence_contribution() > 1
    });
    if has_pi_bond {
        return PiNeed::None;
    }
    match element::target_valence(a.atomic_num(), used, a.formal_charge()) {
        Some(target) if target > used => {
            if a.atomic_num() == 6 && a.formal_charge() == 0 {
                PiNeed::Required
            } else {
                PiNeed::Optional
            }
        }
        _ => PiNeed::None,
    }
}
