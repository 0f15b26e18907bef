use idcrab::idcode::{
    self, parse_mapping, CoordinateEncoding, EncoderOptions, IdcodeEncoder, IdcodeParser,
    IdcodeVersion, ParserOptions,
};
use idcrab::{
    Atom, AtomParity, AtomQueryFeatures, Bond, BondOrder, BondParity, BondQueryFeatures,
    Coordinates, EsrType, Mol, Radical,
};
use petgraph::graph::{EdgeIndex, NodeIndex};

fn parser() -> IdcodeParser {
    IdcodeParser::with_options(ParserOptions::default().with_ensure_2d_coordinates(false))
}

/// Six-membered ring numbered the way the encoder numbers it: tree bonds
/// 0-1, 0-2, 1-3, 2-4, 3-5 in child order, then the closure 4-5.
fn ring(atomic_nums: [u8; 6]) -> Mol<Atom, Bond> {
    let mut mol = Mol::new();
    for z in atomic_nums {
        mol.add_atom(Atom::new(z));
    }
    for (a, b) in [(0, 1), (0, 2), (1, 3), (2, 4), (3, 5), (4, 5)] {
        mol.add_bond(NodeIndex::new(a), NodeIndex::new(b), Bond::default());
    }
    mol
}

fn roundtrip(mol: &Mol<Atom, Bond>, options: EncoderOptions) -> Mol<Atom, Bond> {
    let encoded = IdcodeEncoder::with_options(options).encode(mol).unwrap();
    let mut decoded = parser()
        .parse_str(&encoded.idcode, encoded.coordinates.as_deref())
        .unwrap();
    if let Some(mapping) = &encoded.mapping {
        parse_mapping(&mut decoded, mapping.as_bytes()).unwrap();
    }
    decoded
}

#[test]
fn annotated_atoms_survive() {
    let mut mol = ring([6, 7, 8, 16, 6, 6]);
    mol.set_fragment(true);
    {
        let a = mol.atom_mut(NodeIndex::new(0));
        a.isotope = 13;
        a.formal_charge = -2;
        a.radical = Radical::Doublet;
    }
    {
        let a = mol.atom_mut(NodeIndex::new(1));
        a.query_features = AtomQueryFeatures::ANY
            .with_field(AtomQueryFeatures::HYDROGEN, 5)
            .with_field(AtomQueryFeatures::RING_SIZE, 6);
        a.atom_list = Some(vec![7, 15, 33]);
    }
    {
        let a = mol.atom_mut(NodeIndex::new(3));
        a.abnormal_valence = Some(6);
        a.custom_label = Some("R12".to_string());
        a.selected = true;
        a.formal_charge = 7;
    }
    {
        let a = mol.atom_mut(NodeIndex::new(4));
        a.query_features = AtomQueryFeatures::FLAT_NITROGEN | AtomQueryFeatures::MATCH_STEREO;
        a.custom_label = Some("x".to_string());
    }
    mol.atom_mut(NodeIndex::new(5)).atomic_num = 120;

    assert_eq!(roundtrip(&mol, EncoderOptions::default()), mol);
}

#[test]
fn annotated_bonds_survive() {
    let mut mol = ring([6; 6]);
    {
        let b = mol.bond_mut(EdgeIndex::new(0));
        b.order = BondOrder::Delocalized;
        b.query_features = BondQueryFeatures::SINGLE | BondQueryFeatures::DOUBLE;
    }
    {
        let b = mol.bond_mut(EdgeIndex::new(2));
        b.order = BondOrder::Triple;
        b.query_features = BondQueryFeatures::RING
            .with_field(BondQueryFeatures::RING_SIZE, 6)
            .with_field(BondQueryFeatures::BRIDGE, 0x35);
    }
    {
        let b = mol.bond_mut(EdgeIndex::new(3));
        b.order = BondOrder::Double;
        b.delocalized_high_order = true;
        b.query_features = BondQueryFeatures::MATCH_STEREO | BondQueryFeatures::AROMATIC;
    }
    {
        let b = mol.bond_mut(EdgeIndex::new(5));
        b.order = BondOrder::Double;
    }

    assert_eq!(roundtrip(&mol, EncoderOptions::default()), mol);
}

#[test]
fn stereo_survives_in_version_3() {
    let mut mol = ring([6; 6]);
    let centers = [
        (0, AtomParity::Odd, EsrType::Abs, 0),
        (1, AtomParity::Even, EsrType::And, 3),
        (2, AtomParity::Odd, EsrType::Or, 7),
        (3, AtomParity::Unknown, EsrType::Abs, 0),
    ];
    for (i, parity, esr_type, esr_group) in centers {
        let a = mol.atom_mut(NodeIndex::new(i));
        a.parity = parity;
        a.esr_type = esr_type;
        a.esr_group = esr_group;
    }
    {
        // axial chirality on a single bond carries its own group
        let b = mol.bond_mut(EdgeIndex::new(1));
        b.parity = BondParity::ZOr2;
        b.esr_type = EsrType::Or;
        b.esr_group = 2;
    }
    {
        let b = mol.bond_mut(EdgeIndex::new(4));
        b.order = BondOrder::Double;
        b.parity = BondParity::EOr1;
    }

    assert_eq!(roundtrip(&mol, EncoderOptions::default()), mol);
}

#[test]
fn version_2_keeps_absolute_and_mixed_centers() {
    let mut mol = ring([6; 6]);
    mol.atom_mut(NodeIndex::new(0)).parity = AtomParity::Even;
    {
        let a = mol.atom_mut(NodeIndex::new(2));
        a.parity = AtomParity::Odd;
        a.esr_type = EsrType::And;
    }
    let options = EncoderOptions::default().with_version(IdcodeVersion::V2);
    let encoded = IdcodeEncoder::with_options(options).encode(&mol).unwrap();
    assert_eq!(idcode::idcode_version(encoded.idcode.as_bytes()).unwrap(), 8);
    assert_eq!(roundtrip(&mol, options), mol);
}

#[test]
fn permutation_maps_decoded_atoms_back() {
    // chain drawn out of order: 4-2-0-3-1
    let mut mol = Mol::<Atom, Bond>::new();
    for z in [6, 7, 8, 9, 17] {
        mol.add_atom(Atom::new(z));
    }
    for (a, b) in [(4, 2), (2, 0), (0, 3), (3, 1)] {
        mol.add_bond(NodeIndex::new(a), NodeIndex::new(b), Bond::default());
    }
    mol.atom_mut(NodeIndex::new(4)).map_no = 9;
    mol.atom_mut(NodeIndex::new(1)).map_no = 2;
    mol.atom_mut(NodeIndex::new(1)).auto_mapped = true;

    let encoded = IdcodeEncoder::new().encode(&mol).unwrap();
    let decoded = roundtrip(&mol, EncoderOptions::default());
    assert_eq!(decoded.atom_count(), 5);
    for (i, &original) in encoded.atom_order.iter().enumerate() {
        assert_eq!(decoded.atom(NodeIndex::new(i)), mol.atom(NodeIndex::new(original)));
    }
    for e in decoded.bonds() {
        let (a, b) = decoded.bond_endpoints(e).unwrap();
        let (oa, ob) = (
            NodeIndex::new(encoded.atom_order[a.index()]),
            NodeIndex::new(encoded.atom_order[b.index()]),
        );
        assert!(mol.bond_between(oa, ob).is_some());
    }
}

#[test]
fn disconnected_components() {
    let mut mol = Mol::<Atom, Bond>::new();
    let na = mol.add_atom(Atom {
        formal_charge: 1,
        ..Atom::new(11)
    });
    let cl = mol.add_atom(Atom {
        formal_charge: -1,
        ..Atom::new(17)
    });
    let c = mol.add_atom(Atom::new(6));
    let o = mol.add_atom(Atom::new(8));
    mol.add_bond(c, o, Bond::default());

    let decoded = roundtrip(&mol, EncoderOptions::default());
    assert_eq!(decoded, mol);
    assert!(decoded.atom(na).formal_charge == 1 && decoded.atom(cl).formal_charge == -1);
}

fn drawn_ring(coordinates: Coordinates) -> Mol<Atom, Bond> {
    let mut mol = ring([6, 6, 6, 6, 6, 8]);
    let positions = [
        [1.0, -2.0, 0.5],
        [2.3, -1.25, 0.5],
        [-0.3, -1.25, 0.7],
        [2.3, 0.25, 0.2],
        [-0.3, 0.25, 0.4],
        [1.0, 1.0, 0.3],
    ];
    for (i, p) in positions.into_iter().enumerate() {
        mol.atom_mut(NodeIndex::new(i)).position = match coordinates {
            Coordinates::ThreeD => p,
            _ => [p[0], p[1], 0.0],
        };
    }
    mol.set_coordinates(coordinates);
    mol
}

fn max_deviation(a: &Mol<Atom, Bond>, b: &Mol<Atom, Bond>) -> f64 {
    a.atoms()
        .flat_map(|i| {
            let (p, q) = (a.atom(i).position, b.atom(i).position);
            (0..3).map(move |axis| (p[axis] - q[axis]).abs())
        })
        .fold(0.0, f64::max)
}

#[test]
fn absolute_3d_coordinates_survive() {
    let mol = drawn_ring(Coordinates::ThreeD);
    let options = EncoderOptions::default().with_coordinates(CoordinateEncoding::Absolute);
    let encoded = IdcodeEncoder::with_options(options).encode(&mol).unwrap();
    let coords = encoded.coordinates.clone().unwrap();
    assert!(idcode::coordinates_are_3d(encoded.idcode.as_bytes(), coords.as_bytes()).unwrap());
    assert!(idcode::coordinates_are_absolute(coords.as_bytes()).unwrap());

    let decoded = roundtrip(&mol, options);
    assert_eq!(decoded.coordinates(), Coordinates::ThreeD);
    let deviation = max_deviation(&mol, &decoded);
    assert!(deviation < 0.05, "deviation {deviation}");
}

#[test]
fn relative_2d_coordinates_keep_the_shape() {
    let mol = drawn_ring(Coordinates::TwoD);
    let decoded = roundtrip(&mol, EncoderOptions::default());
    assert_eq!(decoded.coordinates(), Coordinates::TwoD);

    let avbl = decoded.average_bond_length().unwrap();
    assert!((avbl - 1.5).abs() < 1e-9, "average bond length {avbl}");
    let scale = avbl / mol.average_bond_length().unwrap();
    for e in mol.bonds() {
        let expected = mol.bond_length(e).unwrap() * scale;
        let got = decoded.bond_length(e).unwrap();
        assert!((expected - got).abs() < 0.01, "bond {}: {expected} vs {got}", e.index());
    }
}

#[test]
fn three_d_is_replaced_by_a_drawing_by_default() {
    let mol = drawn_ring(Coordinates::ThreeD);
    let encoded = IdcodeEncoder::new().encode(&mol).unwrap();
    let decoded = IdcodeParser::new()
        .parse_combined(&encoded.combined())
        .unwrap();
    assert_eq!(decoded.coordinates(), Coordinates::TwoD);
    assert!(decoded.atoms().all(|a| decoded.atom(a).position[2] == 0.0));
}

/// Fluoranthene with every bond flagged aromatic, atom `i` of the drawing
/// placed at index `(i + shift) % 16`.
fn fluoranthene(shift: usize) -> Mol<Atom, Bond> {
    let mut bonds: Vec<(usize, usize)> = (0..10).map(|i| (i, (i + 1) % 10)).collect();
    bonds.extend([(4, 9), (0, 10), (8, 11)]);
    bonds.extend((10..16).map(|i| (i, 10 + (i - 9) % 6)));

    let mut mol = Mol::new();
    for _ in 0..16 {
        mol.add_atom(Atom::new(6));
    }
    for (a, b) in bonds {
        let aromatic = Bond {
            is_aromatic: true,
            ..Bond::default()
        };
        mol.add_bond(
            NodeIndex::new((a + shift) % 16),
            NodeIndex::new((b + shift) % 16),
            aromatic,
        );
    }
    mol
}

#[test]
fn fused_aromatics_decode_to_a_full_kekule_structure() {
    for shift in 0..16 {
        let encoded = IdcodeEncoder::new().encode(&fluoranthene(shift)).unwrap();
        let decoded = parser().parse_str(&encoded.idcode, None).unwrap();
        assert_eq!(decoded.bond_count(), 19);
        for atom in decoded.atoms() {
            let doubles = decoded
                .bonds_of(atom)
                .filter(|&e| decoded.bond(e).order == BondOrder::Double)
                .count();
            assert_eq!(doubles, 1, "{} atom {}", encoded.idcode, atom.index());
        }
        assert!(decoded.bonds().all(|e| decoded.bond(e).is_aromatic));
    }
}
