//! Residue templates: the reference chemistry a raw residue is matched against.
//!
//! A template lists atoms with formal charges, intra-residue bonds, link points where
//! neighbouring residues attach, the rigid core used when carving flexible side chains, and a
//! tagged [`ResidueVariant`] that makes protonation and disulfide disambiguation explicit.

use super::types::{BondOrder, Element};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

/// Chemical role of a link point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRole {
    /// Attachment to the preceding residue (peptide `N`).
    Previous,
    /// Attachment to the following residue (peptide `C`).
    Next,
    /// Sulfur bridge to another cysteine-class residue.
    Disulfide,
}

impl LinkRole {
    pub fn name(&self) -> &'static str {
        match self {
            LinkRole::Previous => "previous",
            LinkRole::Next => "next",
            LinkRole::Disulfide => "disulfide",
        }
    }
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Chain terminus a template was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terminus {
    N,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistidineState {
    /// Neutral, proton on `ND1` (HID).
    Delta,
    /// Neutral, proton on `NE2` (HIE).
    Epsilon,
    /// Cationic, both ring nitrogens protonated (HIP).
    Protonated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CysteineState {
    Thiol,
    Disulfide,
    Thiolate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LysineState {
    Protonated,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspartateState {
    Charged,
    Protonated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlutamateState {
    Charged,
    Protonated,
}

/// Chemically equivalent alternatives within one residue kind.
///
/// Variants carry an explicit preference used to break ties between templates that explain
/// the observed atoms equally well: the most common state at physiological pH wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidueVariant {
    #[default]
    Standard,
    Histidine(HistidineState),
    Cysteine(CysteineState),
    Lysine(LysineState),
    Aspartate(AspartateState),
    Glutamate(GlutamateState),
}

impl ResidueVariant {
    /// Tie-break rank, lower is preferred.
    ///
    /// # Returns
    ///
    /// `0` for the default state of a kind, increasing for less common states.
    pub fn preference_rank(&self) -> u8 {
        match self {
            ResidueVariant::Standard => 0,
            ResidueVariant::Histidine(HistidineState::Epsilon) => 0,
            ResidueVariant::Histidine(HistidineState::Delta) => 1,
            ResidueVariant::Histidine(HistidineState::Protonated) => 2,
            ResidueVariant::Cysteine(CysteineState::Thiol) => 0,
            ResidueVariant::Cysteine(CysteineState::Disulfide) => 1,
            ResidueVariant::Cysteine(CysteineState::Thiolate) => 2,
            ResidueVariant::Lysine(LysineState::Protonated) => 0,
            ResidueVariant::Lysine(LysineState::Neutral) => 1,
            ResidueVariant::Aspartate(AspartateState::Charged) => 0,
            ResidueVariant::Aspartate(AspartateState::Protonated) => 1,
            ResidueVariant::Glutamate(GlutamateState::Charged) => 0,
            ResidueVariant::Glutamate(GlutamateState::Protonated) => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAtom {
    pub name: SmolStr,
    pub element: Element,
    pub formal_charge: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateBond {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
}

/// Attachment point of a template; its label is the attachment atom's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPoint {
    pub atom: usize,
    pub role: LinkRole,
}

impl LinkPoint {
    pub fn label(&self) -> usize {
        self.atom
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResidueTemplate {
    pub(crate) name: SmolStr,
    pub(crate) kind: SmolStr,
    pub(crate) variant: ResidueVariant,
    pub(crate) terminus: Option<Terminus>,
    pub(crate) aliases: Vec<SmolStr>,
    pub(crate) atoms: Vec<TemplateAtom>,
    pub(crate) bonds: Vec<TemplateBond>,
    pub(crate) links: Vec<LinkPoint>,
    pub(crate) charge: i32,
    pub(crate) rigid: Vec<bool>,
}

impl ResidueTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Residue kind shared by all variants (e.g. `HIS` for HID/HIE/HIP).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn variant(&self) -> ResidueVariant {
        self.variant
    }

    pub fn terminus(&self) -> Option<Terminus> {
        self.terminus
    }

    pub fn is_terminal(&self) -> bool {
        self.terminus.is_some()
    }

    /// Expected net formal charge.
    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn atoms(&self) -> &[TemplateAtom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[TemplateBond] {
        &self.bonds
    }

    pub fn links(&self) -> &[LinkPoint] {
        &self.links
    }

    pub fn atom_index(&self, name: &str) -> Option<usize> {
        self.atoms.iter().position(|a| a.name == name)
    }

    /// Looks up the link point with the given label.
    pub fn link(&self, label: usize) -> Option<&LinkPoint> {
        self.links.iter().find(|l| l.atom == label)
    }

    pub fn link_for_role(&self, role: LinkRole) -> Option<&LinkPoint> {
        self.links.iter().find(|l| l.role == role)
    }

    pub fn has_role(&self, role: LinkRole) -> bool {
        self.link_for_role(role).is_some()
    }

    pub fn provides_roles(&self, roles: &[LinkRole]) -> bool {
        roles.iter().all(|role| self.has_role(*role))
    }

    /// Whether the atom belongs to the rigid core that stays put when a side chain is carved.
    pub fn is_rigid(&self, index: usize) -> bool {
        self.rigid.get(index).copied().unwrap_or(true)
    }

    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.element.is_heavy_atom()).count()
    }

    /// Iterates `(neighbor_index, order)` pairs of template bonds touching `index`.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (usize, BondOrder)> + '_ {
        self.bonds.iter().filter_map(move |b| {
            if b.a == index {
                Some((b.b, b.order))
            } else if b.b == index {
                Some((b.a, b.order))
            } else {
                None
            }
        })
    }

    /// Whether a residue name column selects this template.
    ///
    /// A template answers to its own name, its kind, and any catalog alias.
    pub fn answers_to(&self, res_name: &str) -> bool {
        self.name == res_name || self.kind == res_name || self.aliases.iter().any(|a| a == res_name)
    }
}

impl fmt::Display for ResidueTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResidueTemplate {{ name: \"{}\", kind: \"{}\", atoms: {}, bonds: {}, links: {}, charge: {} }}",
            self.name,
            self.kind,
            self.atoms.len(),
            self.bonds.len(),
            self.links.len(),
            self.charge
        )
    }
}
