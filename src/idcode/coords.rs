//! Atom coordinate payloads that accompany an idcode.
//!
//! Two generations exist, told apart by the first byte:
//!
//! * `!` starts the current bit-packed format: a 3D flag, an absolute flag,
//!   a resolution exponent, then per atom (from atom 1) one value per axis,
//!   relative to a reference atom chosen by [`reference_atoms`]. Absolute
//!   payloads end with the average bond length and the position of atom 0.
//! * Bytes from `'` upwards start the legacy format with one character per
//!   axis and atom, relative to the spanning tree parent.
//!
//! Coordinates are computed in stream atom order, so positions returned here
//! are indexed like the atoms of the decoded record.

use super::bits::{BitReader, BitWriter};
use super::error::IdcodeError;

/// Average bond length of decoded relative coordinates.
pub const TARGET_AVBL: f64 = 1.5;

const CURRENT_FORMAT: u8 = b'!';
const LEGACY_FORMAT: u8 = b'\'';
const LEGACY_ZERO: i32 = 83;
const LEGACY_DIGIT_BASE: i32 = 40;
/// Reference atoms without a tree bond are atom 0, at eight times the step.
const DETACHED_FACTOR: f64 = 8.0;
/// Largest average bond length representable in absolute payloads, over 0.1.
const AVBL_RANGE: f64 = 2000.0;

/// Coordinate payload generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFormat {
    Current,
    Legacy,
}

impl CoordinateFormat {
    pub fn detect(coords: &[u8]) -> Result<Self, IdcodeError> {
        match coords.first() {
            Some(&CURRENT_FORMAT) => Ok(Self::Current),
            Some(&b) if b >= LEGACY_FORMAT => Ok(Self::Legacy),
            Some(&b) => Err(IdcodeError::UnsupportedCoordinateFormat { byte: b }),
            None => Err(IdcodeError::UnexpectedEnd { offset: 0 }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCoordinates {
    pub positions: Vec<[f64; 3]>,
    pub three_d: bool,
    pub absolute: bool,
}

/// Reference atom and step factor for every atom of the current format.
///
/// Atoms are visited in order with a pointer into the bond list: when the
/// next bond ends at the atom, its first atom is the reference (factor 1)
/// and the pointer advances; otherwise atom 0 is the reference (factor 8).
/// Entry 0 is unused.
pub fn reference_atoms(bond_atoms: &[(usize, usize)], atom_count: usize) -> Vec<(usize, f64)> {
    let mut refs = Vec::with_capacity(atom_count);
    let mut bond = 0;
    for atom in 0..atom_count {
        if atom == 0 {
            refs.push((0, 0.0));
        } else if bond < bond_atoms.len() && bond_atoms[bond].1 == atom {
            refs.push((bond_atoms[bond].0, 1.0));
            bond += 1;
        } else {
            refs.push((0, DETACHED_FACTOR));
        }
    }
    refs
}

pub fn decode_avbl(value: u32, bins: u64) -> f64 {
    let steps = bins.saturating_sub(1).max(1) as f64;
    10f64.powf(AVBL_RANGE.log10() * f64::from(value) / steps - 1.0)
}

pub fn encode_avbl(avbl: f64, bins: u64) -> u32 {
    let steps = bins.saturating_sub(1).max(1) as f64;
    let v = ((avbl.log10() + 1.0) * steps / AVBL_RANGE.log10()).round();
    v.clamp(0.0, steps) as u32
}

/// Maps a value to a signed offset; the upper half of the range holds the
/// negative offsets. The last value of either half maps to an infinite
/// offset and is rejected.
pub fn decode_shift(value: u32, bins: u64) -> Result<f64, IdcodeError> {
    let half = (bins / 2) as f64;
    let mut v = f64::from(value);
    let negative = v >= half;
    if negative {
        v -= half;
    }
    let denominator = half - 1.0 - v;
    if denominator == 0.0 {
        return Err(IdcodeError::ShiftOutOfRange { value, bins });
    }
    let f = bins as f64 / 100.0 * v / denominator;
    Ok(if negative { -f } else { f })
}

pub fn encode_shift(shift: f64, bins: u64) -> u32 {
    let half = (bins / 2) as f64;
    let steepness = bins as f64 / 100.0;
    let f = shift.abs();
    let v = (f * (half - 1.0) / (steepness + f))
        .round()
        .clamp(0.0, (half - 2.0).max(0.0));
    if shift < 0.0 {
        (v + half) as u32
    } else {
        v as u32
    }
}

fn average_bond_length(
    positions: &[[f64; 3]],
    bond_atoms: &[(usize, usize)],
    three_d: bool,
) -> Option<f64> {
    if bond_atoms.is_empty() {
        return None;
    }
    let total: f64 = bond_atoms
        .iter()
        .map(|&(a, b)| {
            let (pa, pb) = (positions[a], positions[b]);
            let dz = if three_d { pa[2] - pb[2] } else { 0.0 };
            ((pa[0] - pb[0]).powi(2) + (pa[1] - pb[1]).powi(2) + dz * dz).sqrt()
        })
        .sum();
    let avbl = total / bond_atoms.len() as f64;
    (avbl > 0.0).then_some(avbl)
}

fn axes(three_d: bool) -> usize {
    if three_d {
        3
    } else {
        2
    }
}

/// Decodes a `!` payload. Relative coordinates are scaled to
/// [`TARGET_AVBL`]; absolute ones to their stored bond length and origin.
/// Molecules without bonds count their grid step as bond length.
pub fn decode_current(
    coords: &[u8],
    atom_count: usize,
    bond_atoms: &[(usize, usize)],
) -> Result<DecodedCoordinates, IdcodeError> {
    let mut r = BitReader::start(coords, 1)?;
    let three_d = r.read_bit()?;
    let absolute = r.read_bit()?;
    let resolution = 2 * r.read_bits(4)?;
    let bins = 1u64 << resolution;
    let half = (bins / 2) as f64;

    let mut positions = vec![[0.0f64; 3]; atom_count];
    for (atom, &(from, factor)) in reference_atoms(bond_atoms, atom_count)
        .iter()
        .enumerate()
        .skip(1)
    {
        let mut p = [0.0; 3];
        for (axis, value) in p.iter_mut().enumerate().take(axes(three_d)) {
            *value = positions[from][axis] + factor * (f64::from(r.read_bits(resolution)?) - half);
        }
        positions[atom] = p;
    }

    let (target, offset) = if absolute {
        let target = decode_avbl(r.read_bits(resolution)?, bins);
        let mut offset = [0.0; 3];
        for value in offset.iter_mut().take(axes(three_d)) {
            *value = decode_shift(r.read_bits(resolution)?, bins)?;
        }
        (target, offset)
    } else {
        (TARGET_AVBL, [0.0; 3])
    };
    let factor = target / average_bond_length(&positions, bond_atoms, three_d).unwrap_or(1.0);
    for p in &mut positions {
        for axis in 0..axes(three_d) {
            p[axis] = offset[axis] + factor * p[axis];
        }
    }

    Ok(DecodedCoordinates {
        positions,
        three_d,
        absolute,
    })
}

/// Encodes positions (indexed like the stream atoms) as a `!` payload with
/// values of `2 * resolution` bits.
pub fn encode_current(
    positions: &[[f64; 3]],
    bond_atoms: &[(usize, usize)],
    three_d: bool,
    absolute: bool,
    resolution: u8,
) -> Vec<u8> {
    let bits = 2 * u32::from(resolution);
    let bins = 1u64 << bits;
    let half = (bins / 2) as i64;
    let n = positions.len();
    let refs = reference_atoms(bond_atoms, n);
    let dims = axes(three_d);

    let max_step = refs
        .iter()
        .enumerate()
        .skip(1)
        .flat_map(|(atom, &(from, factor))| {
            (0..dims).map(move |axis| {
                (positions[atom][axis] - positions[from][axis]).abs() / factor
            })
        })
        .fold(0.0f64, f64::max);
    let unit = if max_step > 0.0 && half > 1 {
        max_step / (half - 1) as f64
    } else {
        1.0
    };

    let mut w = BitWriter::new();
    w.write_bits(0, 6);
    w.write_bit(three_d);
    w.write_bit(absolute);
    w.write_bits(u32::from(resolution), 4);

    // grid positions as the decoder will reconstruct them
    let origin = positions.first().copied().unwrap_or([0.0; 3]);
    let mut grid = vec![[0.0f64; 3]; n];
    for (atom, &(from, factor)) in refs.iter().enumerate().skip(1) {
        for axis in 0..dims {
            let wanted = (positions[atom][axis] - origin[axis]) / unit;
            let q = ((wanted - grid[from][axis]) / factor)
                .round()
                .clamp(-half as f64, (half - 1) as f64);
            w.write_bits((q as i64 + half) as u32, bits);
            grid[atom][axis] = grid[from][axis] + factor * q;
        }
    }

    if absolute {
        let grid_avbl = average_bond_length(&grid, bond_atoms, three_d).unwrap_or(1.0);
        w.write_bits(encode_avbl(unit * grid_avbl, bins), bits);
        for &o in origin.iter().take(dims) {
            w.write_bits(encode_shift(o, bins), bits);
        }
    }

    let mut bytes = w.finish();
    // the first six bits only reserve the format byte
    if let Some(first) = bytes.first_mut() {
        *first = CURRENT_FORMAT;
    }
    bytes
}

/// Decodes a legacy payload. `parents` are the spanning tree parents of the
/// record. Returns `None` for 3D data when 2D coordinates are required.
pub fn decode_legacy(
    coords: &[u8],
    parents: &[Option<usize>],
    bond_atoms: &[(usize, usize)],
    ensure_2d: bool,
) -> Result<Option<DecodedCoordinates>, IdcodeError> {
    let n = parents.len();
    if n == 0 {
        return Ok(None);
    }
    let at = |i: usize| -> Result<i32, IdcodeError> {
        coords
            .get(i)
            .map(|&b| i32::from(b))
            .ok_or(IdcodeError::UnexpectedEnd { offset: i })
    };
    let is_quote = |i: usize| coords.get(i) == Some(&LEGACY_FORMAT);

    let mut target = 0.0;
    let mut offset = [0.0; 3];
    // historical encoders terminated the deltas with a quote and appended
    // scale and offsets as two-digit values
    let faulty = is_quote(2 * n - 2) || is_quote(3 * n - 3);
    let (three_d, absolute) = if faulty {
        let three_d = coords.len() == 3 * n - 3 + 9;
        let mut index = if three_d { 3 * n - 3 } else { 2 * n - 2 };
        let digits = |index: usize| -> Result<f64, IdcodeError> {
            Ok(f64::from(
                86 * (at(index + 1)? - LEGACY_DIGIT_BASE) + at(index + 2)? - LEGACY_DIGIT_BASE,
            ))
        };
        target = 10f64.powf(digits(index)? / 2000.0 - 1.0);
        for axis in 0..axes(three_d) {
            index += 2;
            offset[axis] = 10f64.powf(digits(index)? / 1500.0 - 1.0);
        }
        (three_d, true)
    } else {
        (coords.len() == 3 * n - 3, false)
    };

    if ensure_2d && three_d {
        log::debug!("discarding 3D legacy coordinates, 2D coordinates are required");
        return Ok(None);
    }

    let mut positions = vec![[0.0f64; 3]; n];
    for i in 1..n {
        let (from, factor) = match parents[i] {
            Some(p) => (p, 1.0),
            None => (0, DETACHED_FACTOR),
        };
        let base = positions[from];
        let mut p = [
            base[0] + factor * f64::from(at(2 * i - 2)? - LEGACY_ZERO),
            base[1] + factor * f64::from(at(2 * i - 1)? - LEGACY_ZERO),
            0.0,
        ];
        if three_d {
            p[2] = base[2] + factor * f64::from(at(2 * n - 3 + i)? - LEGACY_ZERO);
        }
        positions[i] = p;
    }

    if three_d && !absolute && target == 0.0 {
        target = TARGET_AVBL;
    }
    if target != 0.0 {
        if let Some(avbl) = average_bond_length(&positions, bond_atoms, three_d) {
            let f = target / avbl;
            for p in &mut positions {
                for axis in 0..axes(three_d) {
                    p[axis] = p[axis] * f + offset[axis];
                }
            }
        }
    }

    Ok(Some(DecodedCoordinates {
        positions,
        three_d,
        absolute,
    }))
}
