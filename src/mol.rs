use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::traits::HasPosition;

/// Which atom coordinates a molecule carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Coordinates {
    #[default]
    None,
    TwoD,
    ThreeD,
}

/// How far the stereo parities of a molecule have been processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParityState {
    /// Parities are exactly as transported; nothing was derived from them.
    #[default]
    Decoded,
    /// No 2D coordinates exist, so up/down markers could not be derived and
    /// unknown double bond configurations are not yet recognized.
    NotComputed,
    /// Up/down and cross markers were derived and match the 2D coordinates.
    Derived,
}

/// Molecular graph: atoms are nodes, bonds are edges of an undirected
/// petgraph graph.
///
/// Atom and bond indices are assigned in insertion order and never change,
/// since atoms and bonds are only ever added. Each bond remembers the order of
/// its two atoms as given to [`add_bond`](Mol::add_bond).
pub struct Mol<A, B> {
    graph: UnGraph<A, B>,
    fragment: bool,
    coordinates: Coordinates,
    parity_state: ParityState,
}

impl<A, B> Mol<A, B> {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            fragment: false,
            coordinates: Coordinates::None,
            parity_state: ParityState::Decoded,
        }
    }

    pub fn with_capacity(atoms: usize, bonds: usize) -> Self {
        Self {
            graph: UnGraph::with_capacity(atoms, bonds),
            ..Self::new()
        }
    }

    pub fn graph(&self) -> &UnGraph<A, B> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &A {
        &self.graph[idx]
    }

    pub fn atom_mut(&mut self, idx: NodeIndex) -> &mut A {
        &mut self.graph[idx]
    }

    pub fn bond(&self, idx: EdgeIndex) -> &B {
        &self.graph[idx]
    }

    pub fn bond_mut(&mut self, idx: EdgeIndex) -> &mut B {
        &mut self.graph[idx]
    }

    pub fn add_atom(&mut self, atom: A) -> NodeIndex {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: B) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn bonds_of(&self, idx: NodeIndex) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edges(idx).map(|e| e.id())
    }

    pub fn atoms(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    pub fn bonds(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    pub fn bond_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// The atom at the other end of `bond`, seen from `atom`.
    pub fn other_atom(&self, bond: EdgeIndex, atom: NodeIndex) -> Option<NodeIndex> {
        let (a, b) = self.bond_endpoints(bond)?;
        if a == atom {
            Some(b)
        } else if b == atom {
            Some(a)
        } else {
            None
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    pub fn set_fragment(&mut self, fragment: bool) {
        self.fragment = fragment;
    }

    pub fn coordinates(&self) -> Coordinates {
        self.coordinates
    }

    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = coordinates;
    }

    pub fn parity_state(&self) -> ParityState {
        self.parity_state
    }

    pub fn set_parity_state(&mut self, state: ParityState) {
        self.parity_state = state;
    }
}

impl<A: HasPosition, B> Mol<A, B> {
    /// Length of `bond` in 2D, or in 3D when the molecule carries 3D coordinates.
    pub fn bond_length(&self, bond: EdgeIndex) -> Option<f64> {
        let (a, b) = self.bond_endpoints(bond)?;
        let pa = self.atom(a).position();
        let pb = self.atom(b).position();
        let dz = if self.coordinates == Coordinates::ThreeD {
            pa[2] - pb[2]
        } else {
            0.0
        };
        Some(((pa[0] - pb[0]).powi(2) + (pa[1] - pb[1]).powi(2) + dz * dz).sqrt())
    }

    /// Mean bond length, or `None` for molecules without bonds.
    pub fn average_bond_length(&self) -> Option<f64> {
        if self.bond_count() == 0 {
            return None;
        }
        let total: f64 = self.bonds().filter_map(|b| self.bond_length(b)).sum();
        Some(total / self.bond_count() as f64)
    }
}

impl<A: Clone, B: Clone> Clone for Mol<A, B> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            fragment: self.fragment,
            coordinates: self.coordinates,
            parity_state: self.parity_state,
        }
    }
}

impl<A, B> Default for Mol<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PartialEq, B: PartialEq> PartialEq for Mol<A, B> {
    fn eq(&self, other: &Self) -> bool {
        if self.atom_count() != other.atom_count() || self.bond_count() != other.bond_count() {
            return false;
        }
        if self.atoms().any(|idx| self.atom(idx) != other.atom(idx)) {
            return false;
        }
        for idx in self.bonds() {
            if self.bond(idx) != other.bond(idx)
                || self.bond_endpoints(idx) != other.bond_endpoints(idx)
            {
                return false;
            }
        }
        self.fragment == other.fragment && self.coordinates == other.coordinates
    }
}

impl<A: std::fmt::Debug, B: std::fmt::Debug> std::fmt::Debug for Mol<A, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mol")
            .field("atom_count", &self.atom_count())
            .field("bond_count", &self.bond_count())
            .field("fragment", &self.fragment)
            .field("coordinates", &self.coordinates)
            .field("parity_state", &self.parity_state)
            .finish()
    }
}
