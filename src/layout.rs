//! 2D coordinate generation for molecules that arrive without a drawing.
//!
//! The decoder asks a [`CoordinateInventor`] for coordinates whenever 2D
//! coordinates are required but were not transported. The seed is part of the
//! call so that decoding the same idcode twice gives identical drawings.

use std::collections::VecDeque;
use std::f64::consts::PI;

use petgraph::graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::atom::Atom;
use crate::bond::Bond;
use crate::mol::{Coordinates, Mol};

/// Bond length of generated drawings, matching the scale of decoded relative
/// coordinates.
pub const BOND_LENGTH: f64 = 1.5;

const COMPONENT_GAP: f64 = 2.0 * BOND_LENGTH;
const JITTER: f64 = 0.05;

/// Generates 2D atom coordinates.
pub trait CoordinateInventor {
    /// Assigns a 2D position to every atom and marks the molecule as 2D.
    /// The same molecule and seed must always produce the same positions.
    fn invent(&self, mol: &mut Mol<Atom, Bond>, seed: u64);
}

/// Breadth-first tree layout.
///
/// Each connected component is grown outwards from its lowest-numbered atom
/// with zig-zag chains and evenly fanned branches; ring closures are drawn
/// wherever the tree placed their atoms. Components are placed side by side
/// along the x axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeLayout;

impl CoordinateInventor for TreeLayout {
    fn invent(&self, mol: &mut Mol<Atom, Bond>, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = mol.atom_count();
        let mut placed: Vec<Option<[f64; 2]>> = vec![None; n];
        let mut x_offset = 0.0;

        for root in 0..n {
            if placed[root].is_some() {
                continue;
            }
            let component = place_component(mol, NodeIndex::new(root), &mut placed, &mut rng);

            let min_x = component
                .iter()
                .filter_map(|a| placed[a.index()])
                .map(|p| p[0])
                .fold(f64::INFINITY, f64::min);
            let max_x = component
                .iter()
                .filter_map(|a| placed[a.index()])
                .map(|p| p[0])
                .fold(f64::NEG_INFINITY, f64::max);
            let shift = x_offset - min_x;
            for a in &component {
                if let Some(p) = placed[a.index()].as_mut() {
                    p[0] += shift;
                }
            }
            x_offset += (max_x - min_x) + COMPONENT_GAP;
        }

        for (i, pos) in placed.into_iter().enumerate() {
            let [x, y] = pos.unwrap_or([0.0, 0.0]);
            mol.atom_mut(NodeIndex::new(i)).position = [x, y, 0.0];
        }
        mol.set_coordinates(Coordinates::TwoD);
    }
}

fn place_component(
    mol: &Mol<Atom, Bond>,
    root: NodeIndex,
    placed: &mut [Option<[f64; 2]>],
    rng: &mut StdRng,
) -> Vec<NodeIndex> {
    // incoming bond direction and depth of every placed atom
    let mut heading = vec![0.0f64; mol.atom_count()];
    let mut depth = vec![0usize; mol.atom_count()];
    let mut component = vec![root];
    let mut queue = VecDeque::new();
    placed[root.index()] = Some([0.0, 0.0]);
    queue.push_back(root);

    while let Some(u) = queue.pop_front() {
        let mut children: Vec<NodeIndex> = mol
            .neighbors(u)
            .filter(|c| placed[c.index()].is_none())
            .collect();
        children.sort();
        children.dedup();
        if children.is_empty() {
            continue;
        }

        let k = children.len();
        let angles: Vec<f64> = if u == root {
            (0..k)
                .map(|j| PI / 6.0 + 2.0 * PI * j as f64 / k as f64)
                .collect()
        } else if k == 1 {
            let turn = if depth[u.index()] % 2 == 0 { PI / 3.0 } else { -PI / 3.0 };
            vec![heading[u.index()] + turn]
        } else {
            let spread = 4.0 * PI / 3.0;
            (0..k)
                .map(|j| {
                    heading[u.index()] - spread / 2.0 + spread * (j + 1) as f64 / (k + 1) as f64
                })
                .collect()
        };

        let Some(origin) = placed[u.index()] else {
            continue;
        };
        for (child, angle) in children.into_iter().zip(angles) {
            let angle = angle + rng.gen_range(-JITTER..JITTER);
            placed[child.index()] = Some([
                origin[0] + BOND_LENGTH * angle.cos(),
                origin[1] + BOND_LENGTH * angle.sin(),
            ]);
            heading[child.index()] = angle;
            depth[child.index()] = depth[u.index()] + 1;
            component.push(child);
            queue.push_back(child);
        }
    }
    component
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: usize) -> Mol<Atom, Bond> {
        let mut mol = Mol::new();
        let atoms: Vec<_> = (0..len).map(|_| mol.add_atom(Atom::default())).collect();
        for pair in atoms.windows(2) {
            mol.add_bond(pair[0], pair[1], Bond::default());
        }
        mol
    }

    #[test]
    fn bonds_have_standard_length() {
        let mut mol = chain(6);
        TreeLayout.invent(&mut mol, 7);
        assert_eq!(mol.coordinates(), Coordinates::TwoD);
        for bond in mol.bonds() {
            let len = mol.bond_length(bond).unwrap();
            assert!((len - BOND_LENGTH).abs() < 1e-9, "bond length {len}");
        }
    }

    #[test]
    fn same_seed_same_drawing() {
        let mut a = chain(5);
        let mut b = chain(5);
        TreeLayout.invent(&mut a, 0x1234567890);
        TreeLayout.invent(&mut b, 0x1234567890);
        for idx in a.atoms() {
            assert_eq!(a.atom(idx).position, b.atom(idx).position);
        }
    }

    #[test]
    fn components_do_not_overlap() {
        let mut mol = chain(3);
        let x = mol.add_atom(Atom::default());
        let y = mol.add_atom(Atom::default());
        mol.add_bond(x, y, Bond::default());
        TreeLayout.invent(&mut mol, 1);
        let first_max = (0..3)
            .map(|i| mol.atom(NodeIndex::new(i)).position[0])
            .fold(f64::NEG_INFINITY, f64::max);
        let second_min = [x, y]
            .iter()
            .map(|&i| mol.atom(i).position[0])
            .fold(f64::INFINITY, f64::min);
        assert!(second_min > first_max);
    }

    #[test]
    fn isolated_atoms_get_distinct_positions() {
        let mut mol = Mol::<Atom, Bond>::new();
        let a = mol.add_atom(Atom::default());
        let b = mol.add_atom(Atom::default());
        TreeLayout.invent(&mut mol, 3);
        assert_ne!(mol.atom(a).position, mol.atom(b).position);
    }
}
