use std::collections::VecDeque;

use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::mol::Mol;

/// Largest ring still considered small (rigid enough to fix a double bond
/// configuration).
pub const SMALL_RING_LIMIT: usize = 7;

/// Smallest ring size for every bond of a molecule.
#[derive(Debug, Clone)]
pub struct RingInfo {
    bond_ring_size: Vec<Option<usize>>,
}

impl RingInfo {
    pub fn new<A, B>(mol: &Mol<A, B>) -> Self {
        let bond_ring_size = mol
            .bonds()
            .map(|bond| {
                let (a, b) = mol.bond_endpoints(bond)?;
                shortest_detour(mol, bond, a, b).map(|len| len + 1)
            })
            .collect();
        Self { bond_ring_size }
    }

    pub fn smallest_ring_size(&self, bond: EdgeIndex) -> Option<usize> {
        self.bond_ring_size.get(bond.index()).copied().flatten()
    }

    pub fn is_ring_bond(&self, bond: EdgeIndex) -> bool {
        self.smallest_ring_size(bond).is_some()
    }

    pub fn is_small_ring_bond(&self, bond: EdgeIndex) -> bool {
        self.smallest_ring_size(bond)
            .is_some_and(|size| size <= SMALL_RING_LIMIT)
    }
}

/// Number of bonds on the shortest path from `from` to `to` that avoids
/// `excluded`, if any such path exists.
fn shortest_detour<A, B>(
    mol: &Mol<A, B>,
    excluded: EdgeIndex,
    from: NodeIndex,
    to: NodeIndex,
) -> Option<usize> {
    let n = mol.atom_count();
    let mut dist = vec![usize::MAX; n];
    dist[from.index()] = 0;
    let mut queue = VecDeque::new();
    queue.push_back(from);
    while let Some(cur) = queue.pop_front() {
        let d = dist[cur.index()];
        for edge in mol.bonds_of(cur) {
            if edge == excluded {
                continue;
            }
            let Some(nb) = mol.other_atom(edge, cur) else {
                continue;
            };
            if dist[nb.index()] != usize::MAX {
                continue;
            }
            if nb == to {
                return Some(d + 1);
            }
            dist[nb.index()] = d + 1;
            queue.push_back(nb);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::bond::Bond;

    fn ring(size: usize) -> Mol<Atom, Bond> {
        let mut mol = Mol::new();
        let atoms: Vec<_> = (0..size).map(|_| mol.add_atom(Atom::default())).collect();
        for i in 0..size {
            mol.add_bond(atoms[i], atoms[(i + 1) % size], Bond::default());
        }
        mol
    }

    #[test]
    fn chain_has_no_ring_bonds() {
        let mut mol = Mol::<Atom, Bond>::new();
        let a = mol.add_atom(Atom::default());
        let b = mol.add_atom(Atom::default());
        let c = mol.add_atom(Atom::default());
        mol.add_bond(a, b, Bond::default());
        mol.add_bond(b, c, Bond::default());
        let info = RingInfo::new(&mol);
        assert!(mol.bonds().all(|e| !info.is_ring_bond(e)));
    }

    #[test]
    fn benzene_ring_is_small() {
        let mol = ring(6);
        let info = RingInfo::new(&mol);
        for e in mol.bonds() {
            assert_eq!(info.smallest_ring_size(e), Some(6));
            assert!(info.is_small_ring_bond(e));
        }
    }

    #[test]
    fn eight_membered_ring_is_not_small() {
        let mol = ring(8);
        let info = RingInfo::new(&mol);
        for e in mol.bonds() {
            assert!(info.is_ring_bond(e));
            assert!(!info.is_small_ring_bond(e));
        }
    }

    #[test]
    fn fused_bond_takes_smaller_ring() {
        // bicyclo[4.3.0]: shared bond between a 6- and a 5-ring
        let mut mol = ring(6);
        let a = NodeIndex::new(0);
        let b = NodeIndex::new(1);
        let x = mol.add_atom(Atom::default());
        let y = mol.add_atom(Atom::default());
        let z = mol.add_atom(Atom::default());
        mol.add_bond(a, x, Bond::default());
        mol.add_bond(x, y, Bond::default());
        mol.add_bond(y, z, Bond::default());
        mol.add_bond(z, b, Bond::default());
        let info = RingInfo::new(&mol);
        let shared = mol.bond_between(a, b).unwrap();
        assert_eq!(info.smallest_ring_size(shared), Some(5));
    }
}
