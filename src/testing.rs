//! Synthetic residues built from bundled templates for unit tests.
//!
//! Atom `k` of a residue sits on a small helix around the residue origin, so every pair of
//! atoms in one residue is closer than any covalent bond limit and all template bonds score as
//! consistent. Residues of a chain are spaced 4 Å apart along x.

use crate::model::atom::RawAtom;
use crate::model::id::ResidueId;
use crate::model::template::ResidueTemplate;
use crate::model::types::{Element, Point};
use crate::ops::extract::RawResidue;
use crate::templates;
use smol_str::SmolStr;

pub const RESIDUE_SPACING: f64 = 4.0;

pub fn layout(k: usize, origin: Point) -> Point {
    let angle = k as f64;
    origin + nalgebra::Vector3::new(0.3 * angle.cos(), 0.3 * angle.sin(), 0.05 * angle)
}

pub fn raw_residue(res_name: &str, id: ResidueId, atoms: &[(&str, Element)]) -> RawResidue {
    RawResidue {
        id: id.clone(),
        name: SmolStr::new(res_name),
        atoms: atoms
            .iter()
            .enumerate()
            .map(|(k, (name, element))| {
                RawAtom::new(name, *element, layout(k, Point::origin()), res_name, id.clone())
            })
            .collect(),
    }
}

/// Atom records of `template`, optionally without hydrogens, at `origin`.
pub fn template_atoms(
    template: &ResidueTemplate,
    res_name: &str,
    id: &ResidueId,
    with_hydrogens: bool,
    origin: Point,
) -> Vec<RawAtom> {
    template
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, a)| with_hydrogens || a.element != Element::H)
        .map(|(k, a)| RawAtom::new(&a.name, a.element, layout(k, origin), res_name, id.clone()))
        .collect()
}

pub fn residue_from_template(
    template: &ResidueTemplate,
    res_name: &str,
    id: ResidueId,
    with_hydrogens: bool,
) -> RawResidue {
    RawResidue {
        atoms: template_atoms(template, res_name, &id, with_hydrogens, Point::origin()),
        name: SmolStr::new(res_name),
        id,
    }
}

/// Consecutive residues on chain `chain` numbered from 1.
///
/// Each entry is `(template, residue name)`; the template decides which atoms are written.
pub fn chain_atoms(
    chain: &str,
    residues: &[(&str, &str)],
    with_hydrogens: bool,
) -> Vec<RawAtom> {
    let library = templates::bundled();
    residues
        .iter()
        .enumerate()
        .flat_map(|(i, (template, res_name))| {
            let template = library
                .get(template)
                .unwrap_or_else(|| panic!("no bundled template {}", template));
            let id = ResidueId::new(chain, i as i32 + 1, None);
            let origin = Point::new(i as f64 * RESIDUE_SPACING, 0.0, 0.0);
            template_atoms(template, res_name, &id, with_hydrogens, origin)
        })
        .collect()
}

/// Moves every atom of residue `id` by `offset`.
pub fn shift_residue(atoms: &mut [RawAtom], id: &ResidueId, offset: nalgebra::Vector3<f64>) {
    for atom in atoms.iter_mut().filter(|a| &a.res_id == id) {
        atom.translate_by(&offset);
    }
}

pub fn rid(text: &str) -> ResidueId {
    text.parse().expect("residue id")
}
