//! The residue container produced by [`ChorizoBuilder`](crate::ops::ChorizoBuilder).
//!
//! A [`Chorizo`] owns the resolved residues in input order, the canonical set of bonds between
//! residues, and the link points explicitly left open. Residues never hold references to each
//! other; every cross-residue relation is expressed with [`ResidueId`]s and resolved through the
//! container. Mutating operations live in `ops` and keep these invariants:
//!
//! - every bond endpoint names a residue that is present and valid;
//! - a link point is either bonded or listed as a blunt end, never both.

use super::id::{LinkEnd, ResidueId};
use super::residue::{Residue, ResidueLink};
use crate::ops::matcher::MatchSettings;
use crate::ops::prep::Preparer;
use crate::templates::TemplateLibrary;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondKind {
    /// Peptide bond between sequence neighbours.
    Backbone,
    /// Sulfur bridge.
    Disulfide,
}

/// Covalent bond between link points of two residues.
///
/// Endpoints are stored in sorted order so the same bond always compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterResidueBond {
    pub ends: [LinkEnd; 2],
    pub kind: BondKind,
}

impl InterResidueBond {
    pub fn new(a: LinkEnd, b: LinkEnd, kind: BondKind) -> Self {
        let ends = if a <= b { [a, b] } else { [b, a] };
        Self { ends, kind }
    }

    pub fn touches(&self, id: &ResidueId) -> bool {
        self.ends.iter().any(|e| &e.residue == id)
    }

    pub fn connects(&self, a: &ResidueId, b: &ResidueId) -> bool {
        (&self.ends[0].residue == a && &self.ends[1].residue == b)
            || (&self.ends[0].residue == b && &self.ends[1].residue == a)
    }

    /// Endpoint on `id` and the endpoint across the bond.
    pub fn oriented(&self, id: &ResidueId) -> Option<(&LinkEnd, &LinkEnd)> {
        if &self.ends[0].residue == id {
            Some((&self.ends[0], &self.ends[1]))
        } else if &self.ends[1].residue == id {
            Some((&self.ends[1], &self.ends[0]))
        } else {
            None
        }
    }
}

impl fmt::Display for InterResidueBond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            BondKind::Backbone => "backbone",
            BondKind::Disulfide => "disulfide",
        };
        write!(f, "{} - {} ({})", self.ends[0], self.ends[1], kind)
    }
}

pub struct Chorizo {
    pub(crate) residues: Vec<Residue>,
    pub(crate) index: HashMap<ResidueId, usize>,
    pub(crate) bonds: Vec<InterResidueBond>,
    pub(crate) blunt_ends: BTreeSet<LinkEnd>,
    pub(crate) library: Arc<TemplateLibrary>,
    pub(crate) preparer: Box<dyn Preparer>,
    pub(crate) settings: MatchSettings,
}

impl Chorizo {
    pub fn residue(&self, id: &ResidueId) -> Option<&Residue> {
        self.index.get(id).map(|&i| &self.residues[i])
    }

    /// Residues in input order, ignored ones included.
    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residue_ids(&self) -> impl Iterator<Item = &ResidueId> {
        self.residues.iter().map(|r| &r.id)
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn bonds(&self) -> &[InterResidueBond] {
        &self.bonds
    }

    pub fn bonds_of<'a>(
        &'a self,
        id: &'a ResidueId,
    ) -> impl Iterator<Item = &'a InterResidueBond> + 'a {
        self.bonds.iter().filter(move |b| b.touches(id))
    }

    /// Link points explicitly left without a partner.
    pub fn blunt_ends(&self) -> &BTreeSet<LinkEnd> {
        &self.blunt_ends
    }

    pub fn valid_residues(&self) -> impl Iterator<Item = &Residue> {
        self.residues.iter().filter(|r| r.is_valid())
    }

    pub fn ignored_residues(&self) -> impl Iterator<Item = &Residue> {
        self.residues.iter().filter(|r| !r.is_valid())
    }

    pub fn library(&self) -> &Arc<TemplateLibrary> {
        &self.library
    }

    pub(crate) fn reindex(&mut self) {
        self.index = self
            .residues
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
    }

    /// Rebuilds every residue's link view from the bond set.
    pub(crate) fn sync_links(&mut self) {
        self.bonds.sort();
        self.bonds.dedup();
        for residue in &mut self.residues {
            residue.links.clear();
        }
        for bond in &self.bonds {
            for (own, other) in [(&bond.ends[0], &bond.ends[1]), (&bond.ends[1], &bond.ends[0])] {
                if let Some(&i) = self.index.get(&own.residue) {
                    self.residues[i].links.push(ResidueLink {
                        label: own.label,
                        partner: other.clone(),
                    });
                }
            }
        }
    }
}

impl fmt::Debug for Chorizo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chorizo")
            .field("residues", &self.residues.len())
            .field("bonds", &self.bonds)
            .field("blunt_ends", &self.blunt_ends)
            .field("templates", &self.library.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Chorizo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chorizo {{ residues: {}, valid: {}, bonds: {}, blunt ends: {} }}",
            self.residues.len(),
            self.valid_residues().count(),
            self.bonds.len(),
            self.blunt_ends.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end(number: i32, label: usize) -> LinkEnd {
        LinkEnd::new(ResidueId::new("A", number, None), label)
    }

    #[test]
    fn bond_endpoints_are_canonical() {
        let forward = InterResidueBond::new(end(1, 2), end(2, 0), BondKind::Backbone);
        let backward = InterResidueBond::new(end(2, 0), end(1, 2), BondKind::Backbone);
        assert_eq!(forward, backward);
        assert_eq!(forward.ends[0], end(1, 2));
    }

    #[test]
    fn oriented_puts_the_requested_side_first() {
        let bond = InterResidueBond::new(end(4, 5), end(9, 5), BondKind::Disulfide);
        let nine = ResidueId::new("A", 9, None);
        let (own, other) = bond.oriented(&nine).unwrap();
        assert_eq!(own, &end(9, 5));
        assert_eq!(other, &end(4, 5));
        assert!(bond.oriented(&ResidueId::new("B", 9, None)).is_none());
        assert!(bond.connects(&nine, &ResidueId::new("A", 4, None)));
    }

    #[test]
    fn display_names_both_ends() {
        let bond = InterResidueBond::new(end(1, 2), end(2, 0), BondKind::Backbone);
        assert_eq!(bond.to_string(), "A:1#2 - A:2#0 (backbone)");
    }
}
