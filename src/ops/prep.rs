//! Per-atom parameter assignment for padded residue graphs.
//!
//! The container hands every padded graph and its ignore mask to a [`Preparer`] and stores the
//! returned columns untouched. [`FormalChargePreparer`] is the reference implementation: partial
//! charges from the template formal charges, AutoDock-style atom types, optional merging of
//! non-polar hydrogens, and user parameters attached through small atom patterns.

use crate::model::graph::MolGraph;
use crate::model::params::{ATOM_TYPE_KEY, CHARGE_KEY, ParamValue, PreparedAtoms};
use crate::model::types::{BondOrder, Element};
use serde::Deserialize;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PrepareError {
    #[error("ignore mask has {mask} entries for a graph of {atoms} atoms")]
    MaskLength { mask: usize, atoms: usize },
    #[error("{0}")]
    Failed(String),
}

/// Assigns per-atom parameters to a molecular graph.
///
/// Implementations must return one value per graph atom in every column and an ignore mask of
/// the same length. Returned ignore flags are OR-ed into the caller's mask; atoms flagged in
/// `ignore` on input must stay flagged.
pub trait Preparer {
    fn prepare(&self, graph: &MolGraph, ignore: &[bool]) -> Result<PreparedAtoms, PrepareError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeModel {
    /// Template formal charges placed on their atoms.
    #[default]
    Formal,
    /// Every atom gets a zero charge.
    Zero,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomParam {
    pub pattern: AtomPattern,
    pub key: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrepConfig {
    /// Folds hydrogens on carbon into their carbon and ignores them.
    pub merge_nonpolar_hydrogens: bool,
    pub charge_model: ChargeModel,
    /// Emit the `atom_type` column.
    pub atom_types: bool,
    pub custom_params: Vec<CustomParam>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            merge_nonpolar_hydrogens: false,
            charge_model: ChargeModel::Formal,
            atom_types: true,
            custom_params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormalChargePreparer {
    config: PrepConfig,
}

impl FormalChargePreparer {
    pub fn new(config: PrepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }
}

impl Preparer for FormalChargePreparer {
    fn prepare(&self, graph: &MolGraph, ignore: &[bool]) -> Result<PreparedAtoms, PrepareError> {
        if ignore.len() != graph.len() {
            return Err(PrepareError::MaskLength {
                mask: ignore.len(),
                atoms: graph.len(),
            });
        }

        let mut charges: Vec<f64> = graph
            .atoms()
            .iter()
            .map(|a| match self.config.charge_model {
                ChargeModel::Formal => a.formal_charge as f64,
                ChargeModel::Zero => 0.0,
            })
            .collect();
        let mut mask = ignore.to_vec();

        if self.config.merge_nonpolar_hydrogens {
            for (h, carbon) in nonpolar_hydrogens(graph) {
                charges[carbon] += charges[h];
                charges[h] = 0.0;
                mask[h] = true;
            }
        }

        let mut params: BTreeMap<String, Vec<ParamValue>> = BTreeMap::new();
        params.insert(
            CHARGE_KEY.to_string(),
            charges.into_iter().map(ParamValue::Number).collect(),
        );
        if self.config.atom_types {
            let types = (0..graph.len())
                .map(|i| ParamValue::Text(SmolStr::new(autodock_type(graph, i))))
                .collect();
            params.insert(ATOM_TYPE_KEY.to_string(), types);
        }

        for custom in &self.config.custom_params {
            let column = params
                .entry(custom.key.clone())
                .or_insert_with(|| vec![ParamValue::Unset; graph.len()]);
            for (i, slot) in column.iter_mut().enumerate() {
                if custom.pattern.matches(graph, i) {
                    *slot = custom.value.clone();
                }
            }
        }

        Ok(PreparedAtoms {
            params,
            ignore: mask,
        })
    }
}

/// `(hydrogen, carbon)` pairs of hydrogens bonded to a carbon.
fn nonpolar_hydrogens(graph: &MolGraph) -> Vec<(usize, usize)> {
    graph
        .atoms()
        .iter()
        .enumerate()
        .filter(|(_, a)| a.element == Element::H)
        .filter_map(|(h, _)| {
            graph
                .neighbors(h)
                .find(|(n, _)| graph.atoms()[*n].element == Element::C)
                .map(|(c, _)| (h, c))
        })
        .collect()
}

fn autodock_type(graph: &MolGraph, index: usize) -> &'static str {
    let atom = &graph.atoms()[index];
    match atom.element {
        Element::H => {
            let polar = graph.neighbors(index).any(|(n, _)| {
                matches!(graph.atoms()[n].element, Element::N | Element::O | Element::S)
            });
            if polar { "HD" } else { "H" }
        }
        Element::C => {
            if graph
                .neighbors(index)
                .any(|(_, order)| order == BondOrder::Aromatic)
            {
                "A"
            } else {
                "C"
            }
        }
        Element::N => {
            let heavy = graph
                .neighbors(index)
                .filter(|(n, _)| graph.atoms()[*n].element.is_heavy_atom())
                .count();
            let acceptor =
                graph.hydrogen_count(index) == 0 && atom.formal_charge == 0 && heavy < 3;
            if acceptor { "NA" } else { "N" }
        }
        Element::O => "OA",
        Element::S => "SA",
        other => other.symbol(),
    }
}

/// A small atom pattern: bracketed alternatives of an element with an optional total hydrogen
/// count, e.g. `[CH2,CH3]`, `N`, `[OH1]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct AtomPattern {
    alternatives: Vec<(Element, Option<usize>)>,
}

impl AtomPattern {
    pub fn matches(&self, graph: &MolGraph, index: usize) -> bool {
        let Some(atom) = graph.atom(index) else {
            return false;
        };
        self.alternatives.iter().any(|(element, hydrogens)| {
            atom.element == *element
                && hydrogens.is_none_or(|count| graph.hydrogen_count(index) == count)
        })
    }
}

impl FromStr for AtomPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = match (trimmed.strip_prefix('['), trimmed.strip_suffix(']')) {
            (Some(_), Some(_)) => &trimmed[1..trimmed.len() - 1],
            (None, None) => trimmed,
            _ => return Err(format!("unbalanced brackets in atom pattern '{}'", s)),
        };

        let alternatives = body
            .split(',')
            .map(|alt| {
                parse_alternative(alt.trim())
                    .ok_or_else(|| format!("invalid atom pattern '{}'", s))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }
}

impl TryFrom<String> for AtomPattern {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for AtomPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .alternatives
            .iter()
            .map(|(element, hydrogens)| match hydrogens {
                Some(n) => format!("{}H{}", element.symbol(), n),
                None => element.symbol().to_string(),
            })
            .collect();
        write!(f, "[{}]", parts.join(","))
    }
}

fn parse_alternative(text: &str) -> Option<(Element, Option<usize>)> {
    let mut chars = text.chars();
    let first = chars.next().filter(char::is_ascii_uppercase)?;
    let rest = chars.as_str();
    let (symbol, rest) = match rest.chars().next() {
        Some(c) if c.is_ascii_lowercase() => (&text[..2], &rest[1..]),
        _ => (&text[..first.len_utf8()], rest),
    };
    let element: Element = symbol.parse().ok()?;

    if rest.is_empty() {
        return Some((element, None));
    }
    let digits = rest.strip_prefix('H')?;
    if digits.is_empty() {
        return Some((element, Some(1)));
    }
    digits.parse().ok().map(|n| (element, Some(n)))
}
