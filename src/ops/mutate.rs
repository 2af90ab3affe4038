//! Post-construction edits of a [`Chorizo`].
//!
//! Every edit either applies completely or leaves the container untouched: the state is
//! snapshotted first and restored when a later step (re-matching, preparation) fails. Residues
//! whose neighbourhood changed are re-padded and re-prepared.

use super::builder::match_residue;
use super::error::Error;
use super::extract::RawResidue;
use super::matcher;
use super::padding::pad_residue;
use super::prep::Preparer;
use crate::model::chorizo::{Chorizo, InterResidueBond};
use crate::model::graph::PaddedMolecule;
use crate::model::id::{LinkEnd, ResidueId};
use crate::model::params::PreparedAtoms;
use crate::model::residue::Residue;
use crate::model::template::{LinkRole, ResidueTemplate};
use crate::templates::TemplateLibrary;
use std::collections::BTreeSet;
use std::sync::Arc;

struct Snapshot {
    residues: Vec<Residue>,
    bonds: Vec<InterResidueBond>,
    blunt_ends: BTreeSet<LinkEnd>,
}

/// Label on `new` playing the role `end` played on `old`.
fn remap_label(end: &LinkEnd, old: &ResidueTemplate, new: &ResidueTemplate) -> Option<usize> {
    let role = old.link(end.label)?.role;
    new.link_for_role(role).map(|l| l.label())
}

fn template_of<'a>(
    library: &'a TemplateLibrary,
    residue: &Residue,
    action: &'static str,
) -> Result<&'a ResidueTemplate, Error> {
    if !residue.is_valid() {
        return Err(Error::ResidueIgnored {
            residue: residue.id.clone(),
            action,
        });
    }
    let key = residue.template_key().unwrap_or_default();
    library
        .get(key)
        .ok_or_else(|| Error::unknown_template(&residue.id, key))
}

fn raw_copy(residue: &Residue) -> RawResidue {
    RawResidue {
        id: residue.id.clone(),
        name: residue.res_name.clone(),
        atoms: residue.observed.clone(),
    }
}

impl Chorizo {
    /// Replaces the template of a residue.
    ///
    /// The residue is re-resolved as if the template had been forced at construction. Bonds
    /// keep their partners and move to the link of the same role; blunt ends move the same way.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownResidue`], [`Error::UnknownTemplate`], [`Error::ResidueIgnored`], the
    /// override errors of construction, [`Error::LinkMismatch`] when a bonded role is missing
    /// from the new template, and [`Error::DanglingValence`] when one of its link points would
    /// be left open without a blunt-end declaration.
    pub fn set_template(&mut self, id: &ResidueId, key: &str) -> Result<(), Error> {
        let i = self.position(id)?;
        let library = Arc::clone(&self.library);
        let new = library
            .get(key)
            .ok_or_else(|| Error::unknown_template(id, key))?;
        let residue = &self.residues[i];
        let old = template_of(&library, residue, "re-templated")?;

        let mut required = Vec::new();
        for bond in &self.bonds {
            if let Some((own, _)) = bond.oriented(id) {
                let role = old.link(own.label).map(|l| l.role);
                match role.filter(|r| new.has_role(*r)) {
                    Some(role) => required.push(role),
                    None => {
                        let name = role.map(|r| r.name()).unwrap_or("unknown");
                        return Err(Error::link_mismatch(id, key, name));
                    }
                }
            }
        }

        let kept = matcher::check_forced(&raw_copy(residue), new, &required, &self.settings)?;
        let resolved = matcher::resolve(kept, new, true);

        let bonds = self.relabel_bonds(id, old, new);
        let blunt_ends = self.relabel_blunt_ends(id, old, new);
        let dangling: Vec<LinkEnd> = new
            .links()
            .iter()
            .map(|l| LinkEnd::new(id.clone(), l.label()))
            .filter(|end| !blunt_ends.contains(end) && !bonds.iter().any(|b| b.ends.contains(end)))
            .collect();
        if !dangling.is_empty() {
            return Err(Error::DanglingValence { ends: dangling });
        }

        log::info!(
            "Residue {}: template {} -> {}",
            id,
            old.name(),
            new.name()
        );
        let snapshot = self.snapshot();
        let affected = self.neighborhood(id);
        self.residues[i] = resolved;
        self.bonds = bonds;
        self.blunt_ends = blunt_ends;
        self.commit(snapshot, &affected)
    }

    /// Removes a residue and every bond touching it.
    ///
    /// Link points of former partners are recorded as blunt ends.
    pub fn delete_residue(&mut self, id: &ResidueId) -> Result<(), Error> {
        let i = self.position(id)?;
        let snapshot = self.snapshot();
        let mut affected = self.neighborhood(id);
        affected.retain(|other| other != id);

        let (touching, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.bonds).into_iter().partition(|b| b.touches(id));
        self.bonds = kept;
        for bond in &touching {
            if let Some((_, partner)) = bond.oriented(id) {
                log::info!("Link point {} left blunt after deleting {}", partner, id);
                self.blunt_ends.insert(partner.clone());
            }
        }
        self.blunt_ends.retain(|end| &end.residue != id);
        self.residues.remove(i);
        self.reindex();

        log::info!("Deleted residue {} and {} bonds", id, touching.len());
        self.commit(snapshot, &affected)
    }

    /// Removes every bond between `a` and `b` and returns how many were removed.
    ///
    /// Residues chosen by scoring are matched again without the lost link role, so a cystine
    /// whose bridge is cut becomes a cysteine. Link points still open afterwards, and every freed
    /// point of a forced residue, become blunt ends.
    pub fn remove_bonds_between(&mut self, a: &ResidueId, b: &ResidueId) -> Result<usize, Error> {
        self.position(a)?;
        self.position(b)?;
        let removed = self.bonds.iter().filter(|bond| bond.connects(a, b)).count();
        if removed == 0 {
            return Ok(0);
        }

        let snapshot = self.snapshot();
        let mut affected = self.neighborhood(a);
        affected.extend(self.neighborhood(b));
        self.bonds.retain(|bond| !bond.connects(a, b));

        for id in [a, b] {
            if let Err(e) = self.rematch_after_unbonding(id) {
                self.restore(snapshot);
                return Err(e);
            }
        }

        log::info!("Removed {} bonds between {} and {}", removed, a, b);
        affected.sort();
        affected.dedup();
        self.commit(snapshot, &affected)?;
        Ok(removed)
    }

    /// Flags the side chain of a residue as flexible and prepares it again with `preparer`.
    ///
    /// Side-chain atoms are the observed atoms outside the template's rigid core. Returns the
    /// number of flexible atoms.
    ///
    /// # Errors
    ///
    /// [`Error::ResidueIgnored`] for ignored residues and [`Error::NotFlexible`] when the residue
    /// has no side-chain atoms or its side chain is bonded to another residue.
    pub fn flexibilize_sidechain(
        &mut self,
        id: &ResidueId,
        preparer: &dyn Preparer,
    ) -> Result<usize, Error> {
        let i = self.position(id)?;
        let residue = &self.residues[i];
        let template = template_of(&self.library, residue, "made flexible")?;

        let mut flexible = vec![false; residue.graph.len()];
        for (t_index, slot) in residue.template_map.iter().enumerate() {
            if let Some(a_index) = slot {
                flexible[*a_index] = !template.is_rigid(t_index);
            }
        }
        if !flexible.iter().any(|f| *f) {
            return Err(Error::not_flexible(id, "no side chain atoms"));
        }
        for link in &residue.links {
            let on_side_chain = template
                .link(link.label)
                .is_some_and(|l| !template.is_rigid(l.atom));
            if on_side_chain {
                return Err(Error::not_flexible(
                    id,
                    format!("side chain is bonded to {}", link.partner.residue),
                ));
            }
        }

        let prepared = self.pad_and_prepare(i, preparer)?;
        let count = flexible.iter().filter(|f| **f).count();
        let residue = &mut self.residues[i];
        residue.flexible = flexible;
        if let Some((padded, params)) = prepared {
            residue.padded = Some(padded);
            residue.prepared = Some(params);
        }
        log::debug!("Residue {} has {} flexible atoms", id, count);
        Ok(count)
    }

    /// Pads and prepares one residue with the container's preparer.
    pub(crate) fn refresh(&mut self, id: &ResidueId) -> Result<(), Error> {
        let Some(&i) = self.index.get(id) else {
            return Ok(());
        };
        let prepared = self.pad_and_prepare(i, self.preparer.as_ref())?;
        let residue = &mut self.residues[i];
        match prepared {
            Some((padded, params)) => {
                residue.padded = Some(padded);
                residue.prepared = Some(params);
            }
            None => {
                residue.padded = None;
                residue.prepared = None;
            }
        }
        Ok(())
    }

    fn pad_and_prepare(
        &self,
        i: usize,
        preparer: &dyn Preparer,
    ) -> Result<Option<(PaddedMolecule, PreparedAtoms)>, Error> {
        let residue = &self.residues[i];
        if !residue.is_valid() {
            return Ok(None);
        }
        let padded = pad_residue(residue, |id| self.residue(id));
        let prepared = preparer
            .prepare(&padded.graph, &padded.ignore)
            .map_err(|e| Error::preparation(&residue.id, e.to_string()))?;
        if prepared.ignore.len() != padded.len() {
            return Err(Error::preparation(
                &residue.id,
                format!(
                    "{} ignore flags returned for {} atoms",
                    prepared.ignore.len(),
                    padded.len()
                ),
            ));
        }
        Ok(Some((padded, prepared)))
    }

    fn position(&self, id: &ResidueId) -> Result<usize, Error> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::unknown_residue(id))
    }

    /// The residue itself plus every residue bonded to it.
    fn neighborhood(&self, id: &ResidueId) -> Vec<ResidueId> {
        let mut ids = vec![id.clone()];
        ids.extend(
            self.bonds
                .iter()
                .filter_map(|b| b.oriented(id).map(|(_, other)| other.residue.clone())),
        );
        ids
    }

    fn relabel_bonds(
        &self,
        id: &ResidueId,
        old: &ResidueTemplate,
        new: &ResidueTemplate,
    ) -> Vec<InterResidueBond> {
        self.bonds
            .iter()
            .map(|bond| match bond.oriented(id) {
                Some((own, other)) => {
                    let label = remap_label(own, old, new).unwrap_or(own.label);
                    InterResidueBond::new(LinkEnd::new(id.clone(), label), other.clone(), bond.kind)
                }
                None => bond.clone(),
            })
            .collect()
    }

    fn relabel_blunt_ends(
        &self,
        id: &ResidueId,
        old: &ResidueTemplate,
        new: &ResidueTemplate,
    ) -> BTreeSet<LinkEnd> {
        self.blunt_ends
            .iter()
            .filter_map(|end| {
                if &end.residue != id {
                    return Some(end.clone());
                }
                let label = remap_label(end, old, new);
                if label.is_none() {
                    log::debug!("Blunt end {} has no counterpart on {}", end, new.name());
                }
                label.map(|l| LinkEnd::new(id.clone(), l))
            })
            .collect()
    }

    /// Re-matches a residue that just lost bonds and blunts its remaining open link points.
    fn rematch_after_unbonding(&mut self, id: &ResidueId) -> Result<(), Error> {
        let i = self.position(id)?;
        let library = Arc::clone(&self.library);
        let residue = &self.residues[i];
        let old = template_of(&library, residue, "re-matched")?;

        let own_ends: Vec<(LinkEnd, LinkRole)> = self
            .bonds
            .iter()
            .filter_map(|b| b.oriented(id))
            .filter_map(|(own, _)| old.link(own.label).map(|l| (own.clone(), l.role)))
            .collect();

        let new = if residue.forced {
            old
        } else {
            let mut required: Vec<LinkRole> = own_ends.iter().map(|(_, role)| *role).collect();
            required.sort();
            required.dedup();
            let in_disulfide = required.contains(&LinkRole::Disulfide);
            let candidates: Vec<&ResidueTemplate> = library.candidates(&residue.res_name).collect();
            let rematched = match_residue(
                raw_copy(residue),
                &candidates,
                &required,
                in_disulfide,
                &library,
                &self.settings,
                false,
            )?;
            let template = rematched
                .template_key()
                .and_then(|k| library.get(k))
                .unwrap_or(old);
            if template.name() != old.name() {
                log::info!("Residue {}: template {} -> {}", id, old.name(), template.name());
                self.residues[i] = rematched;
            }
            template
        };

        self.bonds = self.relabel_bonds(id, old, new);
        self.blunt_ends = self.relabel_blunt_ends(id, old, new);
        for link in new.links() {
            let end = LinkEnd::new(id.clone(), link.label());
            let bonded = self.bonds.iter().any(|b| b.ends.contains(&end));
            if !bonded && self.blunt_ends.insert(end.clone()) {
                log::info!("Link point {} left blunt", end);
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            residues: self.residues.clone(),
            bonds: self.bonds.clone(),
            blunt_ends: self.blunt_ends.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.residues = snapshot.residues;
        self.bonds = snapshot.bonds;
        self.blunt_ends = snapshot.blunt_ends;
        self.reindex();
    }

    /// Rebuilds link views and re-prepares `affected`, rolling back on failure.
    fn commit(&mut self, snapshot: Snapshot, affected: &[ResidueId]) -> Result<(), Error> {
        self.sync_links();
        for id in affected {
            if let Err(e) = self.refresh(id) {
                self.restore(snapshot);
                return Err(e);
            }
        }
        Ok(())
    }
}
