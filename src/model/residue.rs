use super::atom::RawAtom;
use super::graph::{GraphAtom, MolGraph, PaddedMolecule};
use super::id::{LinkEnd, ResidueId};
use super::params::PreparedAtoms;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// No catalog template answers to the residue name.
    UnknownResidueName,
    /// Candidates exist but none explains the observed atoms within tolerance.
    NoEligibleTemplate,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnknownResidueName => write!(f, "unknown residue name"),
            IgnoreReason::NoEligibleTemplate => write!(f, "no eligible template"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueStatus {
    Valid,
    Ignored(IgnoreReason),
}

/// Residue-side view of an inter-residue bond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueLink {
    /// Link label on this residue.
    pub label: usize,
    /// Link point on the bonded neighbour.
    pub partner: LinkEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub(crate) id: ResidueId,
    pub(crate) res_name: SmolStr,
    pub(crate) observed: Vec<RawAtom>,
    pub(crate) template: Option<SmolStr>,
    pub(crate) forced: bool,
    pub(crate) status: ResidueStatus,
    pub(crate) template_map: Vec<Option<usize>>,
    pub(crate) graph: MolGraph,
    pub(crate) links: Vec<ResidueLink>,
    pub(crate) flexible: Vec<bool>,
    pub(crate) padded: Option<PaddedMolecule>,
    pub(crate) prepared: Option<PreparedAtoms>,
}

impl Residue {
    pub(crate) fn resolved(
        id: ResidueId,
        res_name: SmolStr,
        observed: Vec<RawAtom>,
        template: SmolStr,
        forced: bool,
        template_map: Vec<Option<usize>>,
        graph: MolGraph,
    ) -> Self {
        let n = graph.len();
        Self {
            id,
            res_name,
            observed,
            template: Some(template),
            forced,
            status: ResidueStatus::Valid,
            template_map,
            graph,
            links: Vec::new(),
            flexible: vec![false; n],
            padded: None,
            prepared: None,
        }
    }

    pub(crate) fn ignored(
        id: ResidueId,
        res_name: SmolStr,
        observed: Vec<RawAtom>,
        reason: IgnoreReason,
    ) -> Self {
        let mut graph = MolGraph::new();
        for atom in &observed {
            graph.add_atom(GraphAtom::new(&atom.name, atom.element, atom.pos, 0));
        }
        let n = graph.len();
        Self {
            id,
            res_name,
            observed,
            template: None,
            forced: false,
            status: ResidueStatus::Ignored(reason),
            template_map: Vec::new(),
            graph,
            links: Vec::new(),
            flexible: vec![false; n],
            padded: None,
            prepared: None,
        }
    }

    pub fn id(&self) -> &ResidueId {
        &self.id
    }

    /// Residue name as read from the input.
    pub fn res_name(&self) -> &str {
        &self.res_name
    }

    /// Name of the assigned template, `None` for ignored residues.
    pub fn template_key(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Whether the template was imposed by an override rather than chosen by scoring.
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn status(&self) -> ResidueStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == ResidueStatus::Valid
    }

    /// Atom records kept after altloc selection, in input order.
    pub fn observed_atoms(&self) -> &[RawAtom] {
        &self.observed
    }

    /// Authentic graph: matched atoms in template order with template bonds.
    pub fn graph(&self) -> &MolGraph {
        &self.graph
    }

    /// Template atom index to authentic atom index (`None` when the atom is missing).
    pub fn template_map(&self) -> &[Option<usize>] {
        &self.template_map
    }

    pub fn atom(&self, name: &str) -> Option<&GraphAtom> {
        self.graph.atoms().iter().find(|a| a.name == name)
    }

    pub fn links(&self) -> &[ResidueLink] {
        &self.links
    }

    pub fn is_bonded_to(&self, other: &ResidueId) -> bool {
        self.links.iter().any(|l| &l.partner.residue == other)
    }

    pub fn padded(&self) -> Option<&PaddedMolecule> {
        self.padded.as_ref()
    }

    pub fn prepared(&self) -> Option<&PreparedAtoms> {
        self.prepared.as_ref()
    }

    /// Flexible flags over the authentic atoms.
    pub fn flexible_mask(&self) -> &[bool] {
        &self.flexible
    }

    pub fn flexible_count(&self) -> usize {
        self.flexible.iter().filter(|f| **f).count()
    }

    /// Combined ignore flag of a padded atom: capping atoms plus anything the preparer excluded.
    pub fn is_ignored_atom(&self, padded_index: usize) -> bool {
        let padding = self
            .padded
            .as_ref()
            .and_then(|p| p.ignore.get(padded_index).copied())
            .unwrap_or(true);
        let prepared = self
            .prepared
            .as_ref()
            .and_then(|p| p.ignore.get(padded_index).copied())
            .unwrap_or(false);
        padding || prepared
    }

    /// Sum of partial charges over non-ignored padded atoms.
    pub fn net_charge(&self) -> f64 {
        let Some(prepared) = &self.prepared else {
            return 0.0;
        };
        prepared
            .charges()
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_ignored_atom(*i))
            .map(|(_, q)| q)
            .sum()
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.template, self.status) {
            (Some(template), ResidueStatus::Valid) => write!(
                f,
                "Residue {{ id: {}, name: \"{}\" ({}), atoms: {}, links: {} }}",
                self.id,
                self.res_name,
                template,
                self.graph.len(),
                self.links.len()
            ),
            (_, status) => write!(
                f,
                "Residue {{ id: {}, name: \"{}\", status: {:?}, atoms: {} }}",
                self.id,
                self.res_name,
                status,
                self.observed.len()
            ),
        }
    }
}
