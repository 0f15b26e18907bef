//! Periodic table lookups needed by the codec: element symbols for
//! human-readable dumps and default valences for double bond placement.
//!
//! Atomic numbers above 118 are valid in a molecule (pseudo atoms such as
//! R-groups) but have no element data; the lookups return `None` or an empty
//! valence list for them.

static SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca",
    "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
    "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr",
    "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn",
    "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd",
    "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb",
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th",
    "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm",
    "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds",
    "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Element symbol for atomic numbers 1–118.
pub fn symbol(atomic_num: u8) -> Option<&'static str> {
    match atomic_num {
        1..=118 => Some(SYMBOLS[atomic_num as usize - 1]),
        _ => None,
    }
}

/// Standard valences in ascending order; empty for elements without a
/// well-defined covalent valence.
pub fn default_valences(atomic_num: u8) -> &'static [u8] {
    match atomic_num {
        1 => &[1],
        5 => &[3],
        6 | 14 | 32 => &[4],
        7 | 15 | 33 => &[3, 5],
        8 => &[2],
        9 | 17 | 35 | 85 => &[1],
        16 | 34 | 52 => &[2, 4, 6],
        53 => &[1, 3, 5, 7],
        _ => &[],
    }
}

/// Smallest standard valence, adjusted for a formal charge, that can hold
/// `used` bonding electron pairs.
pub fn target_valence(atomic_num: u8, used: u8, formal_charge: i8) -> Option<u8> {
    let charge = formal_charge as i16;
    default_valences(atomic_num)
        .iter()
        .filter_map(|&v| {
            let adjusted = if atomic_num == 6 || atomic_num == 5 {
                v as i16 - charge.abs()
            } else {
                v as i16 + charge
            };
            (adjusted > 0).then_some(adjusted as u8)
        })
        .find(|&v| v >= used)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_follow_the_periodic_table() {
        assert_eq!(symbol(1), Some("H"));
        assert_eq!(symbol(17), Some("Cl"));
        assert_eq!(symbol(118), Some("Og"));
    }

    #[test]
    fn pseudo_atoms_have_no_symbol() {
        assert_eq!(symbol(0), None);
        assert_eq!(symbol(119), None);
        assert_eq!(symbol(129), None);
    }

    #[test]
    fn valences() {
        assert_eq!(default_valences(6), &[4]);
        assert_eq!(default_valences(7), &[3, 5]);
        assert_eq!(default_valences(26), &[] as &[u8]);
    }

    #[test]
    fn charged_target_valence() {
        // pyridinium nitrogen carries four bonds
        assert_eq!(target_valence(7, 3, 1), Some(4));
        // carbanion and carbocation both lose one bond
        assert_eq!(target_valence(6, 2, -1), Some(3));
        assert_eq!(target_valence(6, 2, 1), Some(3));
        assert_eq!(target_valence(8, 2, 0), Some(2));
        assert_eq!(target_valence(8, 3, 0), None);
    }
}
