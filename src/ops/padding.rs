//! Capping of residue graphs with atoms borrowed from bonded neighbours.
//!
//! A residue cut out of a polymer has dangling valences wherever it bonded to another residue.
//! Padding appends the partner's link atom and its heavy first shell so the fragment sees a
//! chemically sensible environment during preparation; every borrowed atom is flagged as
//! ignored and maps to no authentic atom.

use crate::model::graph::{GraphAtom, PaddedMolecule};
use crate::model::id::ResidueId;
use crate::model::residue::Residue;
use crate::model::types::BondOrder;

/// Builds the padded molecule of `residue`.
///
/// `lookup` resolves bonded neighbours; links whose partner is missing, ignored, or lacks the
/// link atom are left uncapped.
pub fn pad_residue<'a>(
    residue: &Residue,
    lookup: impl Fn(&ResidueId) -> Option<&'a Residue>,
) -> PaddedMolecule {
    let mut padded = PaddedMolecule::from_authentic(residue.graph().clone());

    for link in residue.links() {
        let Some(own) = residue.template_map().get(link.label).copied().flatten() else {
            log::warn!(
                "Residue {} has no observed atom for link {}; bond to {} is not capped",
                residue.id(),
                link.label,
                link.partner
            );
            continue;
        };
        let Some(neighbor) = lookup(&link.partner.residue).filter(|r| r.is_valid()) else {
            continue;
        };
        let Some(anchor) = neighbor
            .template_map()
            .get(link.partner.label)
            .copied()
            .flatten()
        else {
            continue;
        };

        let graph = neighbor.graph();
        let mut cap_atoms = Vec::new();

        let cap = padded.add_padding_atom(capping_atom(&graph.atoms()[anchor]));
        padded.graph.add_bond(own, cap, BondOrder::Single);
        cap_atoms.push(cap);

        for (shell, order) in graph.neighbors(anchor) {
            if !graph.atoms()[shell].element.is_heavy_atom() {
                continue;
            }
            let index = padded.add_padding_atom(capping_atom(&graph.atoms()[shell]));
            padded.graph.add_bond(cap, index, order);
            cap_atoms.push(index);
        }

        for index in cap_atoms {
            let atom = &padded.graph.atoms()[index];
            let open = atom.element.default_valence() as f64 - padded.graph.bond_order_sum(index);
            let implicit = open.round().max(0.0) as u8;
            padded.graph.atoms_mut()[index].implicit_hydrogens = implicit;
        }

        log::debug!(
            "Capped {} with {} atoms from {}",
            residue.id(),
            padded.padding_count(),
            neighbor.id()
        );
    }

    padded
}

fn capping_atom(source: &GraphAtom) -> GraphAtom {
    GraphAtom::new(&source.name, source.element, source.pos, 0)
}
