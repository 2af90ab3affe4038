//! JSON document form of a [`Chorizo`].
//!
//! The document stores what cannot be recomputed: residue ids and names, observed atoms with
//! coordinates, template assignments (and whether they were forced), ignore reasons, flexible
//! atoms, bonds and blunt ends. Graphs, padding and parameters are rebuilt on load.

use super::error::Error;
use crate::model::atom::RawAtom;
use crate::model::chorizo::{Chorizo, InterResidueBond};
use crate::model::id::{LinkEnd, ResidueId};
use crate::model::residue::{IgnoreReason, Residue, ResidueStatus};
use crate::model::types::{Element, Point};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChorizoDocument {
    pub residues: Vec<ResidueRecord>,
    #[serde(default)]
    pub bonds: Vec<InterResidueBond>,
    #[serde(default)]
    pub blunt_ends: Vec<LinkEnd>,
    pub bond_tolerance: f64,
    pub max_missing_heavy_atoms: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResidueRecord {
    pub id: ResidueId,
    pub res_name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub forced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<IgnoreReason>,
    pub atoms: Vec<AtomRecord>,
    /// Names of authentic atoms flagged flexible.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flexible: Vec<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AtomRecord {
    pub serial: u32,
    pub name: SmolStr,
    pub element: Element,
    pub pos: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altloc: Option<char>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hetatm: bool,
}

impl AtomRecord {
    pub fn to_raw(&self, res_name: &str, res_id: &ResidueId) -> RawAtom {
        RawAtom {
            serial: self.serial,
            name: self.name.clone(),
            element: self.element,
            pos: self.pos,
            altloc: self.altloc,
            res_name: SmolStr::new(res_name),
            res_id: res_id.clone(),
            is_hetatm: self.hetatm,
        }
    }
}

impl From<&RawAtom> for AtomRecord {
    fn from(atom: &RawAtom) -> Self {
        Self {
            serial: atom.serial,
            name: atom.name.clone(),
            element: atom.element,
            pos: atom.pos,
            altloc: atom.altloc,
            hetatm: atom.is_hetatm,
        }
    }
}

impl From<&Residue> for ResidueRecord {
    fn from(residue: &Residue) -> Self {
        let flexible = residue
            .graph()
            .atoms()
            .iter()
            .zip(residue.flexible_mask())
            .filter(|(_, flexible)| **flexible)
            .map(|(atom, _)| atom.name.clone())
            .collect();
        let ignored = match residue.status() {
            ResidueStatus::Valid => None,
            ResidueStatus::Ignored(reason) => Some(reason),
        };
        Self {
            id: residue.id().clone(),
            res_name: SmolStr::new(residue.res_name()),
            template: residue.template_key().map(SmolStr::new),
            forced: residue.is_forced(),
            ignored,
            atoms: residue.observed_atoms().iter().map(AtomRecord::from).collect(),
            flexible,
        }
    }
}

impl ChorizoDocument {
    pub fn from_chorizo(chorizo: &Chorizo) -> Self {
        Self {
            residues: chorizo.residues().iter().map(ResidueRecord::from).collect(),
            bonds: chorizo.bonds().to_vec(),
            blunt_ends: chorizo.blunt_ends().iter().cloned().collect(),
            bond_tolerance: chorizo.settings.bond_tolerance,
            max_missing_heavy_atoms: chorizo.settings.max_missing_heavy_atoms,
        }
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::chorizo::BondKind;

    const DOCUMENT: &str = r#"{
        "residues": [
            {
                "id": "A:1",
                "res_name": "GLY",
                "template": "GLY",
                "atoms": [
                    { "serial": 1, "name": "N", "element": "N", "pos": [0.0, 0.0, 0.0] },
                    { "serial": 2, "name": "CA", "element": "C", "pos": [1.458, 0.0, 0.0] }
                ]
            },
            {
                "id": "A:1A",
                "res_name": "HOH",
                "ignored": "unknown_residue_name",
                "atoms": [
                    { "serial": 3, "name": "O", "element": "O", "pos": [5.0, 0.0, 0.0], "hetatm": true }
                ]
            }
        ],
        "bonds": [
            { "ends": [{ "residue": "A:1", "label": 2 }, { "residue": "A:2", "label": 0 }], "kind": "backbone" }
        ],
        "bond_tolerance": 0.45,
        "max_missing_heavy_atoms": 0
    }"#;

    #[test]
    fn parses_a_hand_written_document() {
        let document = ChorizoDocument::from_json_str(DOCUMENT).unwrap();

        assert_eq!(document.residues.len(), 2);
        let water = &document.residues[1];
        assert_eq!(water.id, ResidueId::new("A", 1, Some('A')));
        assert_eq!(water.ignored, Some(IgnoreReason::UnknownResidueName));
        assert!(water.atoms[0].hetatm);
        assert_eq!(document.residues[0].atoms[1].pos, Point::new(1.458, 0.0, 0.0));
        assert_eq!(document.bonds[0].kind, BondKind::Backbone);
        assert!(document.blunt_ends.is_empty());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let text = DOCUMENT.replace("\"bond_tolerance\"", "\"tolerance\"");
        let err = ChorizoDocument::from_json_str(&text).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn atom_records_keep_input_details() {
        let raw = RawAtom::new(
            "OG",
            Element::O,
            Point::new(1.0, 2.0, 3.0),
            "SER",
            ResidueId::new("B", 7, None),
        )
        .with_altloc('B');
        let record = AtomRecord::from(&raw);
        assert_eq!(record.to_raw("SER", &raw.res_id), raw);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"altloc\":\"B\""));
        assert!(!json.contains("hetatm"));
    }
}
