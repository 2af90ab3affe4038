use crate::io::error::Error;
use crate::model::atom::RawAtom;
use crate::model::id::ResidueId;
use crate::model::types::{Element, Point};
use smol_str::SmolStr;
use std::io::BufRead;
use std::str::FromStr;

/// Reads `ATOM`/`HETATM` records in file order.
///
/// Only the first model is read; reading stops at the first `ENDMDL`. Records are returned
/// untouched: altloc codes stay attached and residues are not grouped.
pub fn read<R: BufRead>(reader: R) -> Result<Vec<RawAtom>, Error> {
    let mut atoms = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_num = index + 1;
        let line = line.map_err(|e| Error::from_io(e, None))?;

        if line.starts_with("ENDMDL") {
            break;
        }

        let is_atom = line.starts_with("ATOM  ");
        let is_hetatm = line.starts_with("HETATM");
        if is_atom || is_hetatm {
            atoms.push(parse_atom_record(&line, line_num, is_hetatm)?);
        }
    }

    Ok(atoms)
}

fn parse_atom_record(line: &str, line_num: usize, is_hetatm: bool) -> Result<RawAtom, Error> {
    if line.len() < 54 || !line.is_ascii() {
        return Err(Error::parse(
            "PDB",
            None,
            line_num,
            "Atom record too short or not ASCII",
        ));
    }

    let column = |i: usize| line.as_bytes()[i] as char;
    let optional = |c: char| if c == ' ' { None } else { Some(c) };

    let serial = line[6..11].trim().parse::<u32>().unwrap_or(0);
    let atom_name = line[12..16].trim();
    let altloc = optional(column(16));
    let res_name = line[17..21].trim();
    let chain_id = column(21).to_string();
    let icode = optional(column(26));

    let res_seq = line[22..26]
        .trim()
        .parse::<i32>()
        .map_err(|_| Error::parse("PDB", None, line_num, "Invalid residue sequence number"))?;

    let coord = |range: std::ops::Range<usize>, axis: &str| {
        line[range].trim().parse::<f64>().map_err(|_| {
            Error::parse("PDB", None, line_num, format!("Invalid {} coordinate", axis))
        })
    };
    let pos = Point::new(coord(30..38, "X")?, coord(38..46, "Y")?, coord(46..54, "Z")?);

    let element_str = if line.len() >= 78 { line[76..78].trim() } else { "" };
    let element = if element_str.is_empty() {
        element_from_name(atom_name)
    } else {
        Element::from_str(element_str).unwrap_or(Element::Unknown)
    };

    Ok(RawAtom {
        serial,
        name: SmolStr::new(atom_name),
        element,
        pos,
        altloc,
        res_name: SmolStr::new(res_name),
        res_id: ResidueId::new(chain_id.trim(), res_seq, icode),
        is_hetatm,
    })
}

/// Infers the element from the first letter of an atom name (`1HB2` gives H).
fn element_from_name(name: &str) -> Element {
    name.chars()
        .find(|c| c.is_ascii_alphabetic())
        .and_then(|c| Element::from_str(&c.to_string()).ok())
        .unwrap_or(Element::Unknown)
}
