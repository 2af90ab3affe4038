//! Construction of a [`Chorizo`] from raw atom records.
//!
//! The pipeline runs in one pass: group records into residues, apply deletions and overrides,
//! plan backbone and disulfide links, match every residue against the templates its links
//! allow, realize the links as labelled bonds, validate open link points, then pad and prepare
//! each valid residue.

use super::config::Directives;
use super::error::Error;
use super::extract::{RawResidue, extract_residues};
use super::link::{self, LinkPlan, PlannedLink};
use super::matcher::{self, MatchSettings};
use super::prep::Preparer;
use crate::model::atom::RawAtom;
use crate::model::chorizo::{BondKind, Chorizo};
use crate::model::id::{LinkEnd, ResidueId};
use crate::model::residue::{IgnoreReason, Residue};
use crate::model::template::{LinkRole, ResidueTemplate};
use crate::model::types::Point;
use crate::templates::TemplateLibrary;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Collects directives and builds containers against one template library.
///
/// ```
/// use chorizo_forge::ops::{ChorizoBuilder, FormalChargePreparer};
/// use chorizo_forge::templates;
///
/// let pdb = "\
/// ATOM      1  N   GLY A   1       0.000   0.000   0.000  1.00  0.00           N
/// ATOM      2  CA  GLY A   1       1.458   0.000   0.000  1.00  0.00           C
/// ATOM      3  C   GLY A   1       2.009   1.420   0.000  1.00  0.00           C
/// ATOM      4  O   GLY A   1       1.246   2.390   0.000  1.00  0.00           O
/// ";
/// let chorizo = ChorizoBuilder::new(templates::bundled())
///     .blunt_end("A:1".parse().unwrap(), 0)
///     .blunt_end("A:1".parse().unwrap(), 2)
///     .from_pdb_string(pdb, FormalChargePreparer::default())
///     .unwrap();
/// assert_eq!(chorizo.residues()[0].template_key(), Some("GLY"));
/// ```
#[derive(Debug, Clone)]
pub struct ChorizoBuilder {
    library: Arc<TemplateLibrary>,
    directives: Directives,
}

impl ChorizoBuilder {
    pub fn new(library: Arc<TemplateLibrary>) -> Self {
        Self {
            library,
            directives: Directives::default(),
        }
    }

    pub fn with_directives(mut self, directives: Directives) -> Self {
        self.directives = directives;
        self
    }

    pub fn directives(&self) -> &Directives {
        &self.directives
    }

    pub fn set_template(mut self, id: ResidueId, template: impl Into<String>) -> Self {
        self.directives.templates.insert(id, template.into());
        self
    }

    pub fn delete_residue(mut self, id: ResidueId) -> Self {
        self.directives.delete.insert(id);
        self
    }

    pub fn delete_bonds(mut self, a: ResidueId, b: ResidueId) -> Self {
        self.directives.delete_bonds.push((a, b));
        self
    }

    pub fn blunt_end(mut self, id: ResidueId, label: usize) -> Self {
        self.directives.blunt_ends.insert(LinkEnd::new(id, label));
        self
    }

    pub fn default_altloc(mut self, code: char) -> Self {
        self.directives.default_altloc = Some(code);
        self
    }

    pub fn wanted_altloc(mut self, id: ResidueId, code: char) -> Self {
        self.directives.wanted_altloc.insert(id, code);
        self
    }

    pub fn allow_bad_residues(mut self, allow: bool) -> Self {
        self.directives.allow_bad_residues = allow;
        self
    }

    pub fn max_missing_heavy_atoms(mut self, count: usize) -> Self {
        self.directives.max_missing_heavy_atoms = count;
        self
    }

    pub fn disulfide_cutoff(mut self, cutoff: f64) -> Self {
        self.directives.disulfide_cutoff = cutoff;
        self
    }

    pub fn bond_tolerance(mut self, tolerance: f64) -> Self {
        self.directives.bond_tolerance = tolerance;
        self
    }

    pub fn backbone_cutoff(mut self, cutoff: Option<f64>) -> Self {
        self.directives.backbone_cutoff = cutoff;
        self
    }

    /// Reads PDB text with the shipped reader and builds from its atoms.
    pub fn from_pdb_string<P: Preparer + 'static>(
        &self,
        text: &str,
        preparer: P,
    ) -> Result<Chorizo, Error> {
        let atoms = crate::io::read_pdb_atoms(text.as_bytes())?;
        self.build(&atoms, preparer)
    }

    /// Builds a container from raw atom records in input order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTunable`] for an unusable cutoff or tolerance, and any extraction,
    /// matching or linking error; ignored residues are only tolerated when `allow_bad_residues`
    /// is set.
    pub fn build<P: Preparer + 'static>(
        &self,
        atoms: &[RawAtom],
        preparer: P,
    ) -> Result<Chorizo, Error> {
        let directives = &self.directives;
        directives.validate()?;
        let library = self.library.as_ref();
        let settings = MatchSettings {
            bond_tolerance: directives.bond_tolerance,
            max_missing_heavy_atoms: directives.max_missing_heavy_atoms,
        };

        let extracted = extract_residues(atoms, directives)?;
        check_references(&extracted, directives)?;

        // Backbone adjacency is decided on the undeleted order so a deletion never joins the
        // residues around it.
        let deleted: Vec<bool> = extracted
            .iter()
            .map(|r| directives.delete.contains(&r.id))
            .collect();
        let all_candidates: Vec<Vec<&ResidueTemplate>> = extracted
            .iter()
            .zip(&deleted)
            .map(|(residue, &gone)| {
                if gone {
                    return Ok(Vec::new());
                }
                match directives.templates.get(&residue.id) {
                    Some(key) => library
                        .get(key)
                        .map(|t| vec![t])
                        .ok_or_else(|| Error::unknown_template(&residue.id, key.as_str())),
                    None => Ok(library.candidates(&residue.name).collect()),
                }
            })
            .collect::<Result<_, Error>>()?;

        // A residue no template answers to still occupies its place in the chain, so links
        // toward it are planned; they impose no role on the neighbour and are left blunt.
        let linkable: Vec<(bool, bool)> = all_candidates
            .iter()
            .zip(&deleted)
            .map(|(c, &gone)| match (gone, c.is_empty()) {
                (true, _) => (false, false),
                (false, true) => (true, true),
                (false, false) => (
                    c.iter().any(|t| t.has_role(LinkRole::Next)),
                    c.iter().any(|t| t.has_role(LinkRole::Previous)),
                ),
            })
            .collect();
        let link_atoms: Vec<(Option<Point>, Option<Point>)> = extracted
            .iter()
            .zip(&all_candidates)
            .map(|(r, c)| {
                (
                    link_atom_position(r, c, LinkRole::Next),
                    link_atom_position(r, c, LinkRole::Previous),
                )
            })
            .collect();
        let backbone = link::plan_backbone(&extracted, &linkable, &link_atoms, directives);

        let mut kept_index = vec![None; extracted.len()];
        let mut raw: Vec<RawResidue> = Vec::new();
        let mut candidates: Vec<Vec<&ResidueTemplate>> = Vec::new();
        let mut forced: Vec<Option<&ResidueTemplate>> = Vec::new();
        for (i, (residue, cands)) in extracted.into_iter().zip(all_candidates).enumerate() {
            if deleted[i] {
                log::info!("Deleting residue {} ({})", residue.id, residue.name);
                continue;
            }
            kept_index[i] = Some(raw.len());
            forced.push(
                directives
                    .templates
                    .contains_key(&residue.id)
                    .then(|| cands[0]),
            );
            candidates.push(cands);
            raw.push(residue);
        }

        let mut plan = LinkPlan {
            links: backbone
                .into_iter()
                .filter_map(|l| {
                    Some(PlannedLink {
                        first: kept_index[l.first]?,
                        second: kept_index[l.second]?,
                        kind: l.kind,
                    })
                })
                .collect(),
        };

        for contact in link::find_disulfides(&raw, &forced, library, directives.disulfide_cutoff) {
            let (a, b) = (&raw[contact.first].id, &raw[contact.second].id);
            if directives.bond_deleted(a, b) {
                log::debug!("Disulfide {} - {} removed by directive", a, b);
                continue;
            }
            for side in [contact.first, contact.second] {
                if let Some(template) = forced[side].filter(|t| !t.has_role(LinkRole::Disulfide)) {
                    return Err(Error::DisulfideConflict {
                        first: a.clone(),
                        second: b.clone(),
                        residue: raw[side].id.clone(),
                        template: template.name().to_string(),
                    });
                }
            }
            log::debug!("Disulfide contact {} - {} at {:.2} Å", a, b, contact.distance);
            plan.links.push(PlannedLink {
                first: contact.first,
                second: contact.second,
                kind: BondKind::Disulfide,
            });
        }

        let mut residues = Vec::with_capacity(raw.len());
        for (i, residue) in raw.into_iter().enumerate() {
            let required = plan.binding_roles(i, |partner| !candidates[partner].is_empty());
            let resolved = match forced[i] {
                Some(template) => {
                    let kept = matcher::check_forced(&residue, template, &required, &settings)?;
                    matcher::resolve(kept, template, true)
                }
                None => match_residue(
                    residue,
                    &candidates[i],
                    &required,
                    plan.has_disulfide(i),
                    library,
                    &settings,
                    directives.allow_bad_residues,
                )?,
            };
            residues.push(resolved);
        }

        let (bonds, facing_ignored) = link::realize_links(&plan, &residues, library);
        let blunt_ends = link::validate_blunt_ends(
            &residues,
            &bonds,
            &directives.blunt_ends,
            &facing_ignored,
            library,
        )?;

        let mut chorizo = Chorizo {
            residues,
            index: HashMap::new(),
            bonds,
            blunt_ends,
            library: Arc::clone(&self.library),
            preparer: Box::new(preparer),
            settings,
        };
        chorizo.reindex();
        chorizo.sync_links();
        let ids: Vec<ResidueId> = chorizo.residue_ids().cloned().collect();
        for id in &ids {
            chorizo.refresh(id)?;
        }

        log::info!(
            "Built {} residues ({} ignored) with {} bonds and {} blunt ends",
            chorizo.len(),
            chorizo.ignored_residues().count(),
            chorizo.bonds().len(),
            chorizo.blunt_ends().len()
        );
        Ok(chorizo)
    }
}

/// Every residue named by a directive must exist in the input.
fn check_references(residues: &[RawResidue], directives: &Directives) -> Result<(), Error> {
    let known: HashSet<&ResidueId> = residues.iter().map(|r| &r.id).collect();
    match directives.referenced_residues().find(|id| !known.contains(id)) {
        Some(missing) => Err(Error::unknown_residue(missing)),
        None => Ok(()),
    }
}

fn link_atom_position(
    residue: &RawResidue,
    candidates: &[&ResidueTemplate],
    role: LinkRole,
) -> Option<Point> {
    candidates
        .iter()
        .filter_map(|t| t.link_for_role(role).map(|l| &t.atoms()[l.atom].name))
        .find_map(|name| residue.atoms.iter().find(|a| &a.name == name))
        .map(|a| a.pos)
}

/// Scores the candidates of one residue, restricted by its disulfide status.
///
/// A residue in a sulfur contact only considers templates with a disulfide link; one without
/// a contact prefers templates without it, falling back to the full set when nothing else
/// answers to its name.
pub(crate) fn match_residue(
    residue: RawResidue,
    candidates: &[&ResidueTemplate],
    required: &[LinkRole],
    in_disulfide: bool,
    library: &TemplateLibrary,
    settings: &MatchSettings,
    allow_bad: bool,
) -> Result<Residue, Error> {
    if candidates.is_empty() {
        if allow_bad {
            log::warn!(
                "Residue {} ({}) matches no template name; ignoring it",
                residue.id,
                residue.name
            );
            return Ok(Residue::ignored(
                residue.id,
                residue.name,
                residue.atoms,
                IgnoreReason::UnknownResidueName,
            ));
        }
        return Err(Error::no_matching_template(
            &residue.id,
            residue.name.as_str(),
            "no template answers to this residue name",
        ));
    }

    let restricted: Vec<&ResidueTemplate> = candidates
        .iter()
        .copied()
        .filter(|t| t.has_role(LinkRole::Disulfide) == in_disulfide)
        .collect();
    let pool = if restricted.is_empty() && !in_disulfide {
        candidates
    } else {
        &restricted[..]
    };

    match matcher::select_template(&residue, pool, required, library, settings) {
        Ok((template, report)) => {
            log::debug!(
                "Residue {} ({}) matched {} with score {}",
                residue.id,
                residue.name,
                template.name(),
                report.score
            );
            Ok(matcher::resolve(residue, template, false))
        }
        Err(reason) if allow_bad => {
            log::warn!(
                "Residue {} ({}) has no eligible template ({}); ignoring it",
                residue.id,
                residue.name,
                reason
            );
            Ok(Residue::ignored(
                residue.id,
                residue.name,
                residue.atoms,
                IgnoreReason::NoEligibleTemplate,
            ))
        }
        Err(reason) => Err(Error::no_matching_template(
            &residue.id,
            residue.name.as_str(),
            reason,
        )),
    }
}
