//! Template scoring and selection for one residue.
//!
//! Every candidate is scored against the observed atoms by name: matched atoms and bonds whose
//! observed length is chemically plausible count for the template, while missing heavy atoms
//! and (when the residue carries hydrogens at all) missing hydrogens count against it. Observed
//! atoms the template does not know, or whose element disagrees, make a candidate ineligible.
//! Ties are broken by the variant preference rank, then by preferring non-terminal templates,
//! then by catalog order, so results never depend on hash ordering.

use super::error::Error;
use super::extract::RawResidue;
use crate::model::graph::{GraphAtom, MolGraph};
use crate::model::residue::Residue;
use crate::model::template::{LinkRole, ResidueTemplate};
use crate::model::types::Element;
use crate::templates::TemplateLibrary;
use smol_str::SmolStr;
use std::cmp::Reverse;

/// Matcher tunables carried by a built container so later re-matching behaves the same.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    pub bond_tolerance: f64,
    pub max_missing_heavy_atoms: usize,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            bond_tolerance: super::config::DEFAULT_BOND_TOLERANCE,
            max_missing_heavy_atoms: 0,
        }
    }
}

/// How well one template explains one residue.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub template: SmolStr,
    pub score: i64,
    pub matched: usize,
    pub consistent_bonds: usize,
    pub missing_heavy: Vec<SmolStr>,
    pub missing_hydrogens: usize,
    /// Observed atoms the template does not define.
    pub extra: Vec<SmolStr>,
    /// Shared atom names whose elements disagree.
    pub mismatched: Vec<SmolStr>,
}

impl MatchReport {
    fn problems(&self, settings: &MatchSettings) -> Option<String> {
        let mut issues = Vec::new();
        if !self.extra.is_empty() {
            issues.push(format!("unexpected atoms {}", join(&self.extra)));
        }
        if !self.mismatched.is_empty() {
            issues.push(format!("element mismatch on {}", join(&self.mismatched)));
        }
        if self.missing_heavy.len() > settings.max_missing_heavy_atoms {
            issues.push(format!("missing heavy atoms {}", join(&self.missing_heavy)));
        }
        if issues.is_empty() {
            None
        } else {
            Some(format!("{}: {}", self.template, issues.join("; ")))
        }
    }
}

fn join(names: &[SmolStr]) -> String {
    names.iter().map(SmolStr::as_str).collect::<Vec<_>>().join(",")
}

fn elements_agree(observed: Element, expected: Element) -> bool {
    observed == Element::Unknown || observed == expected
}

/// Scores `template` against the observed atoms of `residue`.
pub fn score_template(
    residue: &RawResidue,
    template: &ResidueTemplate,
    settings: &MatchSettings,
) -> MatchReport {
    let has_hydrogens = residue.atoms.iter().any(|a| a.element == Element::H);
    let observed: Vec<Option<usize>> = template
        .atoms()
        .iter()
        .map(|t| residue.atoms.iter().position(|a| a.name == t.name))
        .collect();

    let mut report = MatchReport {
        template: SmolStr::new(template.name()),
        score: 0,
        matched: 0,
        consistent_bonds: 0,
        missing_heavy: Vec::new(),
        missing_hydrogens: 0,
        extra: Vec::new(),
        mismatched: Vec::new(),
    };

    for (t_atom, obs) in template.atoms().iter().zip(&observed) {
        match obs {
            Some(i) => {
                report.matched += 1;
                if !elements_agree(residue.atoms[*i].element, t_atom.element) {
                    report.mismatched.push(t_atom.name.clone());
                }
            }
            None if t_atom.element.is_heavy_atom() => {
                report.missing_heavy.push(t_atom.name.clone())
            }
            None => report.missing_hydrogens += 1,
        }
    }

    for atom in &residue.atoms {
        if template.atom_index(&atom.name).is_none() {
            report.extra.push(atom.name.clone());
        }
    }

    for bond in template.bonds() {
        let (Some(a), Some(b)) = (observed[bond.a], observed[bond.b]) else {
            continue;
        };
        let limit = template.atoms()[bond.a].element.covalent_radius()
            + template.atoms()[bond.b].element.covalent_radius()
            + settings.bond_tolerance;
        if residue.atoms[a].distance(&residue.atoms[b]) <= limit {
            report.consistent_bonds += 1;
        }
    }

    let hydrogen_penalty = if has_hydrogens {
        report.missing_hydrogens as i64
    } else {
        0
    };
    report.score = 2 * report.matched as i64 + report.consistent_bonds as i64
        - 3 * report.missing_heavy.len() as i64
        - hydrogen_penalty
        - 2 * report.extra.len() as i64
        - 2 * report.mismatched.len() as i64;
    report
}

/// Picks the best eligible candidate.
///
/// # Errors
///
/// A human-readable reason naming each rejected candidate and why, when nothing is eligible.
pub fn select_template<'a>(
    residue: &RawResidue,
    candidates: &[&'a ResidueTemplate],
    required: &[LinkRole],
    library: &TemplateLibrary,
    settings: &MatchSettings,
) -> Result<(&'a ResidueTemplate, MatchReport), String> {
    if candidates.is_empty() {
        return Err("no candidate templates".to_string());
    }

    let mut eligible = Vec::new();
    let mut rejected = Vec::new();
    for &template in candidates {
        let report = score_template(residue, template, settings);
        log::debug!(
            "Residue {} vs {}: score {}, matched {}, bonds {}",
            residue.id,
            template.name(),
            report.score,
            report.matched,
            report.consistent_bonds
        );
        if !template.provides_roles(required) {
            rejected.push(format!("{}: lacks required links", template.name()));
        } else if let Some(problem) = report.problems(settings) {
            rejected.push(problem);
        } else {
            eligible.push((template, report));
        }
    }

    eligible
        .into_iter()
        .min_by_key(|(template, report)| {
            (
                Reverse(report.score),
                template.variant().preference_rank(),
                template.is_terminal(),
                library.position(template.name()).unwrap_or(usize::MAX),
            )
        })
        .ok_or_else(|| rejected.join(" | "))
}

/// Validates an explicitly requested template against the observed atoms.
///
/// Missing-atom tolerance does not apply here; only gross incompatibility is rejected.
/// Observed atoms the template does not define are dropped from the returned residue copy with a
/// warning.
///
/// # Errors
///
/// [`Error::IncompatibleTemplate`] for element disagreement or when fewer than half of the
/// template heavy atoms are observed, and [`Error::LinkMismatch`] when a required role is
/// missing.
pub fn check_forced(
    residue: &RawResidue,
    template: &ResidueTemplate,
    required: &[LinkRole],
    settings: &MatchSettings,
) -> Result<RawResidue, Error> {
    let report = score_template(residue, template, settings);

    if !report.mismatched.is_empty() {
        return Err(Error::incompatible_template(
            &residue.id,
            template.name(),
            format!("element mismatch on {}", join(&report.mismatched)),
        ));
    }

    let heavy = template.heavy_atom_count();
    let observed_heavy = heavy - report.missing_heavy.len();
    if observed_heavy * 2 < heavy {
        return Err(Error::incompatible_template(
            &residue.id,
            template.name(),
            format!("only {} of {} heavy atoms observed", observed_heavy, heavy),
        ));
    }

    if let Some(role) = required.iter().find(|r| !template.has_role(**r)) {
        return Err(Error::link_mismatch(&residue.id, template.name(), role.name()));
    }

    let mut kept = residue.clone();
    if !report.extra.is_empty() {
        log::warn!(
            "Dropping atoms {} of residue {} not defined by forced template {}",
            join(&report.extra),
            residue.id,
            template.name()
        );
        kept.atoms.retain(|a| template.atom_index(&a.name).is_some());
    }
    Ok(kept)
}

/// Builds the resolved residue for a chosen template.
///
/// The authentic graph holds the observed template atoms in template order with template
/// elements, formal charges and bonds. Template hydrogens that were not observed become
/// implicit hydrogens on their heavy neighbour.
pub fn resolve(residue: RawResidue, template: &ResidueTemplate, forced: bool) -> Residue {
    let mut graph = MolGraph::new();
    let mut template_map = vec![None; template.atoms().len()];

    for (t_index, t_atom) in template.atoms().iter().enumerate() {
        if let Some(obs) = residue.atoms.iter().find(|a| a.name == t_atom.name) {
            let index = graph.add_atom(GraphAtom::new(
                &t_atom.name,
                t_atom.element,
                obs.pos,
                t_atom.formal_charge,
            ));
            template_map[t_index] = Some(index);
        }
    }

    for bond in template.bonds() {
        match (template_map[bond.a], template_map[bond.b]) {
            (Some(a), Some(b)) => graph.add_bond(a, b, bond.order),
            (Some(heavy), None) if template.atoms()[bond.b].element == Element::H => {
                graph.atoms_mut()[heavy].implicit_hydrogens += 1;
            }
            (None, Some(heavy)) if template.atoms()[bond.a].element == Element::H => {
                graph.atoms_mut()[heavy].implicit_hydrogens += 1;
            }
            _ => {}
        }
    }

    Residue::resolved(
        residue.id,
        residue.name,
        residue.atoms,
        SmolStr::new(template.name()),
        forced,
        template_map,
        graph,
    )
}
