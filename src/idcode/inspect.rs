//! Probes that look at an idcode or coordinate payload without building a
//! molecule, and a human-readable dump of the stream content.

use super::bits::BitReader;
use super::coords::{decode_current, CoordinateFormat};
use super::error::IdcodeError;
use super::extension::ExtensionBlock;
use super::header::{Header, VERSION_2};
use super::record::{IdcodeRecord, ORDER_AROMATIC, ORDER_DOUBLE, ORDER_SINGLE};
use crate::atom::EsrType;
use crate::element;

/// Version number from the first header nibble.
pub fn idcode_version(idcode: &[u8]) -> Result<u32, IdcodeError> {
    let mut r = BitReader::start(idcode, 0)?;
    let first = r.read_bits(4)?;
    Ok(if first > VERSION_2 { first } else { VERSION_2 })
}

/// Atom count of the idcode starting at byte `offset`; `0` when the buffer
/// ends before it.
pub fn atom_count(idcode: &[u8], offset: usize) -> Result<usize, IdcodeError> {
    if idcode.len() <= offset {
        return Ok(0);
    }
    let mut r = BitReader::start(idcode, offset)?;
    let header = Header::read(&mut r)?;
    Ok(r.read_bits(header.abits())? as usize)
}

/// Whether `coordinates` carries a z axis. Legacy payloads are 3D when they
/// are long enough for three axes and do not end their 2D part with the
/// scale marker.
pub fn coordinates_are_3d(idcode: &[u8], coordinates: &[u8]) -> Result<bool, IdcodeError> {
    if coordinates.is_empty() {
        return Ok(false);
    }
    match CoordinateFormat::detect(coordinates)? {
        CoordinateFormat::Current => BitReader::start(coordinates, 1)?.read_bit(),
        CoordinateFormat::Legacy => {
            let n = atom_count(idcode, 0)?;
            Ok(n != 0
                && coordinates.len() >= 3 * n - 3
                && coordinates.get(2 * n - 2) != Some(&b'\''))
        }
    }
}

/// Whether `coordinates` keeps the original bond length and position.
pub fn coordinates_are_absolute(coordinates: &[u8]) -> Result<bool, IdcodeError> {
    if coordinates.is_empty() {
        return Ok(false);
    }
    match CoordinateFormat::detect(coordinates)? {
        CoordinateFormat::Current => {
            let mut r = BitReader::start(coordinates, 1)?;
            r.read_bit()?;
            r.read_bit()
        }
        CoordinateFormat::Legacy => Ok(coordinates.iter().any(|&b| b == b'\'' || b == b'&')),
    }
}

/// Multi-line listing of everything stored in `idcode` and, for current
/// format payloads, the decoded coordinates.
///
/// ```
/// let dump = idcrab::idcode::describe(b"HZ@CR@", None).unwrap();
/// assert!(dump.contains("bonds: 0-1"));
/// ```
pub fn describe(idcode: &[u8], coordinates: Option<&[u8]>) -> Result<String, IdcodeError> {
    let record = IdcodeRecord::read(idcode)?;
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    line(format!("IDCode: {}", String::from_utf8_lossy(idcode)));
    line(format!(
        "version: {} abits: {} bbits: {}",
        record.header.version(),
        record.header.abits(),
        record.header.bbits()
    ));
    line(format!(
        "atoms: {} bonds: {}",
        record.atom_count(),
        record.bond_count()
    ));

    let atoms_with = |z: u8| -> Vec<String> {
        (0..record.atom_count())
            .filter(|&i| record.atomic_nums[i] == z)
            .map(|i| i.to_string())
            .collect()
    };
    list_line(&mut line, "nitrogens", atoms_with(7));
    list_line(&mut line, "oxygens", atoms_with(8));
    list_line(
        &mut line,
        "otherAtoms",
        (0..record.atom_count())
            .filter(|&i| !matches!(record.atomic_nums[i], 6..=8))
            .map(|i| {
                let z = record.atomic_nums[i];
                match element::symbol(z) {
                    Some(symbol) => format!("{i}:{symbol}"),
                    None => format!("{i}:{z}"),
                }
            })
            .collect(),
    );
    list_line(
        &mut line,
        "chargedAtoms",
        (0..record.atom_count())
            .filter(|&i| record.charges[i] != 0)
            .map(|i| format!("{i}:{}", record.charges[i]))
            .collect(),
    );

    list_line(
        &mut line,
        "bonds",
        record
            .bond_atoms()
            .iter()
            .zip(&record.bond_orders)
            .map(|(&(a, b), &code)| {
                let symbol = match code {
                    ORDER_AROMATIC => '.',
                    ORDER_SINGLE => '-',
                    ORDER_DOUBLE => '=',
                    _ => '#',
                };
                format!("{a}{symbol}{b}")
            })
            .collect(),
    );
    list_line(
        &mut line,
        "parities",
        record
            .atom_stereo
            .iter()
            .map(|e| {
                let parity = parity_text(e.parity.bits(), e.esr_type, e.esr_group);
                format!("{}:{parity}", e.atom)
            })
            .collect(),
    );
    if record.chiral == Some(false) {
        line("isRacemate".to_string());
    }
    list_line(
        &mut line,
        "EZ",
        record
            .bond_stereo
            .iter()
            .map(|e| {
                let parity = parity_text(e.parity.bits(), e.esr_type, e.esr_group);
                format!("{}:{parity}", e.bond)
            })
            .collect(),
    );
    if record.fragment {
        line("isFragment = true".to_string());
    }
    for block in &record.extensions {
        line(format!("{}:{}", block.tag().name(), block_entries(block)));
    }

    if let Some(coords) = coordinates.filter(|c| !c.is_empty()) {
        match CoordinateFormat::detect(coords)? {
            CoordinateFormat::Current => {
                let decoded = decode_current(coords, record.atom_count(), &record.bond_atoms())?;
                let axes = if decoded.three_d { 3 } else { 2 };
                let points: Vec<String> = decoded
                    .positions
                    .iter()
                    .map(|p| {
                        p[..axes]
                            .iter()
                            .map(|v| format!("{v:.3}"))
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect();
                let kind = if decoded.absolute { "absolute" } else { "relative" };
                line(format!("{kind} coords: {}", points.join(" ")));
            }
            CoordinateFormat::Legacy => line("legacy coords".to_string()),
        }
    }
    Ok(out)
}

fn list_line(line: &mut impl FnMut(String), label: &str, items: Vec<String>) {
    if !items.is_empty() {
        line(format!("{label}: {}", items.join(" ")));
    }
}

fn parity_text(bits: u32, esr_type: EsrType, group: u8) -> String {
    match esr_type {
        EsrType::Abs => bits.to_string(),
        EsrType::And => format!("{bits}&{group}"),
        EsrType::Or => format!("{bits}|{group}"),
    }
}

fn block_entries(block: &ExtensionBlock) -> String {
    let items: Vec<String> = match block {
        ExtensionBlock::Flags { indices, .. } => indices.iter().map(|i| i.to_string()).collect(),
        ExtensionBlock::Values { entries, .. } => {
            entries.iter().map(|(i, v)| format!("{i}:{v}")).collect()
        }
        ExtensionBlock::AtomLists(entries) => entries
            .iter()
            .map(|(i, list)| {
                let list: Vec<String> = list.iter().map(|z| z.to_string()).collect();
                format!("{i}:[{}]", list.join(","))
            })
            .collect(),
        ExtensionBlock::CustomLabels { entries, .. } => {
            entries.iter().map(|(i, label)| format!("{i}:{label}")).collect()
        }
        ExtensionBlock::Selection(selected) => selected
            .iter()
            .enumerate()
            .filter(|(_, &s)| s)
            .map(|(i, _)| i.to_string())
            .collect(),
    };
    items.iter().map(|item| format!(" {item}")).collect()
}
