//! Grouping of raw atom records into residues.
//!
//! Records of one residue must be contiguous in the input; a residue id that reappears after
//! other residues is fatal. Alternate locations are resolved per atom name, preferring the code
//! requested for the residue, and atoms without a code are always kept.

use super::config::Directives;
use super::error::Error;
use crate::model::atom::RawAtom;
use crate::model::id::ResidueId;
use smol_str::SmolStr;
use std::collections::HashSet;

/// Atom records of one residue after altloc selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResidue {
    pub id: ResidueId,
    pub name: SmolStr,
    pub atoms: Vec<RawAtom>,
}

/// Groups `atoms` into residues in input order and applies altloc choices.
///
/// # Errors
///
/// Returns [`Error::InterruptedResidue`] for non-contiguous records, the altloc errors described
/// on [`select_altloc`], and [`Error::DuplicateAtom`] when two kept atoms share a name.
pub fn extract_residues(
    atoms: &[RawAtom],
    directives: &Directives,
) -> Result<Vec<RawResidue>, Error> {
    let mut residues: Vec<RawResidue> = Vec::new();
    let mut closed: HashSet<ResidueId> = HashSet::new();

    for atom in atoms {
        if let Some(current) = residues.last_mut().filter(|r| r.id == atom.res_id) {
            current.atoms.push(atom.clone());
            continue;
        }
        if let Some(previous) = residues.last() {
            closed.insert(previous.id.clone());
        }
        if closed.contains(&atom.res_id) {
            return Err(Error::InterruptedResidue {
                residue: atom.res_id.clone(),
            });
        }
        residues.push(RawResidue {
            id: atom.res_id.clone(),
            name: atom.res_name.clone(),
            atoms: vec![atom.clone()],
        });
    }

    for residue in &mut residues {
        select_altloc(residue, directives)?;
        check_unique_names(residue)?;
    }

    log::debug!("Grouped {} atom records into {} residues", atoms.len(), residues.len());
    Ok(residues)
}

/// Keeps one alternate location per atom name in `residue`.
///
/// The per-residue request beats the default. An atom name that lacks the requested code keeps
/// its first code instead, with a warning.
///
/// # Errors
///
/// [`Error::MissingAltloc`] when a per-residue request names a code absent from the residue, and
/// [`Error::AltlocAmbiguity`] when the residue has codes but nothing was requested.
pub fn select_altloc(residue: &mut RawResidue, directives: &Directives) -> Result<(), Error> {
    let mut codes: Vec<char> = Vec::new();
    for code in residue.atoms.iter().filter_map(|a| a.altloc) {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    if codes.is_empty() {
        return Ok(());
    }

    if let Some(&wanted) = directives.wanted_altloc.get(&residue.id)
        && !codes.contains(&wanted)
    {
        return Err(Error::MissingAltloc {
            residue: residue.id.clone(),
            requested: wanted,
            codes,
        });
    }
    let Some(requested) = directives.requested_altloc(&residue.id) else {
        return Err(Error::AltlocAmbiguity {
            residue: residue.id.clone(),
            codes,
        });
    };

    let mut kept: Vec<(SmolStr, char)> = Vec::new();
    for atom in &residue.atoms {
        let Some(code) = atom.altloc else { continue };
        match kept.iter_mut().find(|(name, _)| *name == atom.name) {
            Some(entry) if code == requested => entry.1 = code,
            Some(_) => {}
            None => kept.push((atom.name.clone(), code)),
        }
    }
    for (name, code) in kept.iter().filter(|(_, code)| *code != requested) {
        log::warn!(
            "Atom {} of residue {} has no altloc '{}'; using '{}' instead",
            name,
            residue.id,
            requested,
            code
        );
    }

    residue.atoms.retain(|a| match a.altloc {
        None => true,
        Some(code) => kept.iter().any(|(name, c)| *name == a.name && *c == code),
    });
    Ok(())
}

fn check_unique_names(residue: &RawResidue) -> Result<(), Error> {
    let mut seen = HashSet::with_capacity(residue.atoms.len());
    for atom in &residue.atoms {
        if !seen.insert(atom.name.as_str()) {
            return Err(Error::DuplicateAtom {
                residue: residue.id.clone(),
                atom: atom.name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Element, Point};

    fn atom(name: &str, res: &str, number: i32, icode: Option<char>) -> RawAtom {
        RawAtom::new(
            name,
            Element::C,
            Point::origin(),
            res,
            ResidueId::new("A", number, icode),
        )
    }

    fn altloc_serine() -> Vec<RawAtom> {
        let mut og_a = atom("OG", "SER", 5, None).with_altloc('A');
        og_a.pos.x = 12.346;
        let mut og_b = atom("OG", "SER", 5, None).with_altloc('B');
        og_b.pos.x = 11.220;
        vec![atom("N", "SER", 5, None), atom("CA", "SER", 5, None), og_a, og_b]
    }

    fn og_x(residues: &[RawResidue]) -> f64 {
        residues[0]
            .atoms
            .iter()
            .find(|a| a.name == "OG")
            .map(|a| a.pos.x)
            .unwrap()
    }

    #[test]
    fn groups_contiguous_records_and_keeps_insertion_codes() {
        let atoms = vec![
            atom("N", "ALA", 82, None),
            atom("CA", "ALA", 82, None),
            atom("N", "GLY", 82, Some('A')),
            atom("N", "GLY", 82, Some('B')),
            atom("N", "SER", 83, None),
        ];
        let residues = extract_residues(&atoms, &Directives::default()).unwrap();

        let ids: Vec<String> = residues.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["A:82", "A:82A", "A:82B", "A:83"]);
        assert_eq!(residues[0].atoms.len(), 2);
        assert_eq!(residues[1].name, "GLY");
    }

    #[test]
    fn reappearing_residue_is_interrupted() {
        let atoms = vec![
            atom("N", "ALA", 1, None),
            atom("N", "GLY", 2, None),
            atom("CA", "ALA", 1, None),
        ];
        let err = extract_residues(&atoms, &Directives::default()).unwrap_err();
        assert!(err.to_string().starts_with("interrupted"));
        assert!(matches!(err, Error::InterruptedResidue { ref residue } if residue.number == 1));
    }

    #[test]
    fn altlocs_without_request_are_ambiguous() {
        let err = extract_residues(&altloc_serine(), &Directives::default()).unwrap_err();
        assert!(err.to_string().contains("altloc"));
        assert!(matches!(err, Error::AltlocAmbiguity { .. }));
    }

    #[test]
    fn default_altloc_selects_matching_atoms() {
        let directives = Directives {
            default_altloc: Some('B'),
            ..Default::default()
        };
        let residues = extract_residues(&altloc_serine(), &directives).unwrap();
        assert_eq!(residues[0].atoms.len(), 3);
        assert!((og_x(&residues) - 11.220).abs() < 1e-9);
    }

    #[test]
    fn per_residue_altloc_beats_default() {
        let mut directives = Directives {
            default_altloc: Some('B'),
            ..Default::default()
        };
        directives.wanted_altloc.insert(ResidueId::new("A", 5, None), 'A');
        let residues = extract_residues(&altloc_serine(), &directives).unwrap();
        assert!((og_x(&residues) - 12.346).abs() < 1e-9);
    }

    #[test]
    fn absent_default_falls_back_to_first_code() {
        let directives = Directives {
            default_altloc: Some('C'),
            ..Default::default()
        };
        let residues = extract_residues(&altloc_serine(), &directives).unwrap();
        assert!((og_x(&residues) - 12.346).abs() < 1e-9);
    }

    #[test]
    fn names_without_the_default_code_keep_their_own() {
        let mut atoms = altloc_serine();
        let mut cb = atom("CB", "SER", 5, None).with_altloc('A');
        cb.pos.x = 7.5;
        atoms.insert(2, cb);
        let directives = Directives {
            default_altloc: Some('B'),
            ..Default::default()
        };

        let residues = extract_residues(&atoms, &directives).unwrap();
        let names: Vec<&str> = residues[0].atoms.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["N", "CA", "CB", "OG"]);
        assert!((og_x(&residues) - 11.220).abs() < 1e-9);
        let cb = residues[0].atoms.iter().find(|a| a.name == "CB").unwrap();
        assert_eq!(cb.altloc, Some('A'));
    }

    #[test]
    fn absent_per_residue_altloc_is_an_error() {
        let mut directives = Directives::default();
        directives.wanted_altloc.insert(ResidueId::new("A", 5, None), 'Z');
        let err = extract_residues(&altloc_serine(), &directives).unwrap_err();
        assert!(matches!(err, Error::MissingAltloc { requested: 'Z', .. }));
    }

    #[test]
    fn per_residue_altloc_on_plain_residue_is_ignored() {
        let mut directives = Directives::default();
        directives.wanted_altloc.insert(ResidueId::new("A", 1, None), 'A');
        let atoms = vec![atom("N", "ALA", 1, None)];
        assert!(extract_residues(&atoms, &directives).is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let atoms = vec![atom("CA", "ALA", 1, None), atom("CA", "ALA", 1, None)];
        let err = extract_residues(&atoms, &Directives::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateAtom { ref atom, .. } if atom == "CA"));
    }
}
