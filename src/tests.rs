use crate::*;
use petgraph::graph::{EdgeIndex, NodeIndex};

#[test]
fn mol_add_atoms_and_bonds() {
    let mut mol = Mol::<Atom, Bond>::new();
    let c = mol.add_atom(Atom::new(6));
    let o = mol.add_atom(Atom::new(8));
    let bond_idx = mol.add_bond(
        c,
        o,
        Bond {
            order: BondOrder::Double,
            ..Bond::default()
        },
    );

    assert_eq!(mol.atom_count(), 2);
    assert_eq!(mol.bond_count(), 1);
    assert_eq!(mol.atom(c).atomic_num, 6);
    assert_eq!(mol.atom(o).atomic_num, 8);
    assert_eq!(mol.bond(bond_idx).order, BondOrder::Double);
}

#[test]
fn mol_neighbors_and_bonds_of() {
    let mut mol = Mol::<Atom, Bond>::new();
    let a = mol.add_atom(Atom::default());
    let b = mol.add_atom(Atom::default());
    let c = mol.add_atom(Atom::default());
    mol.add_bond(a, b, Bond::default());
    mol.add_bond(a, c, Bond::default());

    let neighbors: Vec<_> = mol.neighbors(a).collect();
    assert_eq!(neighbors.len(), 2);

    let incident: Vec<_> = mol.bonds_of(a).collect();
    assert_eq!(incident.len(), 2);
}

#[test]
fn mol_bond_endpoints_keep_insertion_order() {
    let mut mol = Mol::<Atom, Bond>::new();
    let a = mol.add_atom(Atom::default());
    let b = mol.add_atom(Atom::default());
    let c = mol.add_atom(Atom::default());
    let e = mol.add_bond(b, a, Bond::default());

    assert_eq!(mol.bond_between(a, b), Some(e));
    assert_eq!(mol.bond_between(a, c), None);
    assert_eq!(mol.bond_endpoints(e), Some((b, a)));
    assert_eq!(mol.other_atom(e, b), Some(a));
    assert_eq!(mol.other_atom(e, c), None);
}

#[test]
fn mol_flags_default() {
    let mol = Mol::<Atom, Bond>::default();
    assert_eq!(mol.atom_count(), 0);
    assert!(!mol.is_fragment());
    assert_eq!(mol.coordinates(), Coordinates::None);
    assert_eq!(mol.parity_state(), ParityState::Decoded);
}

#[test]
fn atom_trait_impls() {
    let atom = Atom {
        formal_charge: -1,
        isotope: 13,
        position: [1.0, 2.0, 0.0],
        ..Atom::new(6)
    };

    assert_eq!(HasAtomicNum::atomic_num(&atom), 6);
    assert_eq!(HasFormalCharge::formal_charge(&atom), -1);
    assert_eq!(HasIsotope::isotope(&atom), 13);
    assert_eq!(HasPosition::position(&atom), [1.0, 2.0, 0.0]);
}

#[test]
fn bond_defaults() {
    let bond = Bond::default();
    assert_eq!(HasBondOrder::bond_order(&bond), BondOrder::Single);
    assert_eq!(bond.parity, BondParity::None);
    assert_eq!(bond.stereo, BondStereo::None);
    assert!(!bond.is_aromatic);
}

#[test]
fn bond_length_ignores_z_in_2d() {
    let mut mol = Mol::<Atom, Bond>::new();
    let a = mol.add_atom(Atom::default());
    let b = mol.add_atom(Atom {
        position: [3.0, 4.0, 12.0],
        ..Atom::default()
    });
    let e = mol.add_bond(a, b, Bond::default());

    mol.set_coordinates(Coordinates::TwoD);
    assert_eq!(mol.bond_length(e), Some(5.0));
    mol.set_coordinates(Coordinates::ThreeD);
    assert_eq!(mol.bond_length(e), Some(13.0));
}

fn benzene() -> Mol<Atom, Bond> {
    let mut mol = Mol::new();
    let atoms: Vec<NodeIndex> = (0..6).map(|_| mol.add_atom(Atom::new(6))).collect();
    for i in 0..6 {
        mol.add_bond(
            atoms[i],
            atoms[(i + 1) % 6],
            Bond {
                is_aromatic: true,
                ..Bond::default()
            },
        );
    }
    mol
}

#[test]
fn aromatic_ring_is_kekulized_after_decoding() {
    let encoded = IdcodeEncoder::new().encode(&benzene()).unwrap();
    let mol = idcode::parse(&encoded.idcode).unwrap();

    assert_eq!(mol.bond_count(), 6);
    assert!(mol.bonds().all(|e| mol.bond(e).is_aromatic));
    let doubles = mol
        .bonds()
        .filter(|&e| mol.bond(e).order == BondOrder::Double)
        .count();
    assert_eq!(doubles, 3);
    for atom in mol.atoms() {
        let double_bonds = mol
            .bonds_of(atom)
            .filter(|&e| mol.bond(e).order == BondOrder::Double)
            .count();
        assert_eq!(double_bonds, 1);
    }
}

#[test]
fn reencoding_a_decoded_molecule_is_stable() {
    let first = IdcodeEncoder::new().encode(&benzene()).unwrap();
    let mol = idcode::parse(&first.idcode).unwrap();
    let second = IdcodeEncoder::new().encode(&mol).unwrap();
    assert_eq!(second.idcode, first.idcode);
    assert_eq!(second.atom_order, (0..6).collect::<Vec<_>>());
}

#[test]
fn decoded_drawing_uses_standard_bond_length() {
    let mol = idcode::parse(&idcode::encode(&benzene()).unwrap()).unwrap();
    assert_eq!(mol.coordinates(), Coordinates::TwoD);
    // the first five bonds form the spanning tree the drawing grows along
    for i in 0..5 {
        let len = mol.bond_length(EdgeIndex::new(i)).unwrap();
        assert!((len - layout::BOND_LENGTH).abs() < 1e-9, "bond {i}: {len}");
    }
}
