//! User directives that steer residue matching and linking.
//!
//! [`Directives`] collects everything a caller can impose on the builder: template overrides,
//! residues and bonds to drop, link points to leave open, altloc choices, and the numeric
//! tolerances of the matcher and link resolver. It deserializes from TOML so the command-line
//! front end can read it from a file:
//!
//! ```toml
//! default_altloc = "A"
//! allow_bad_residues = true
//! delete = ["A:200"]
//! delete_bonds = [["A:6", "A:127"]]
//! blunt_ends = [{ residue = "A:1", label = 0 }]
//!
//! [templates]
//! "A:6" = "CYS"
//!
//! [wanted_altloc]
//! "A:23" = "B"
//! ```

use super::error::Error;
use crate::model::id::{LinkEnd, ResidueId};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Default S–S distance below which two cysteine-class residues are bridged, in ångströms.
pub const DEFAULT_DISULFIDE_CUTOFF: f64 = 2.5;
/// Default slack added to the sum of covalent radii when checking observed bonds.
pub const DEFAULT_BOND_TOLERANCE: f64 = 0.45;

/// Construction directives with matcher and linker tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Directives {
    /// Template forced on a residue, bypassing scoring.
    pub templates: BTreeMap<ResidueId, String>,
    /// Residues dropped before linking.
    pub delete: BTreeSet<ResidueId>,
    /// Residue pairs whose mutual bonds are never created.
    pub delete_bonds: Vec<(ResidueId, ResidueId)>,
    /// Link points allowed to stay open.
    pub blunt_ends: BTreeSet<LinkEnd>,
    /// Altloc applied to every residue that has alternate locations.
    pub default_altloc: Option<char>,
    /// Per-residue altloc, taking precedence over `default_altloc`.
    pub wanted_altloc: BTreeMap<ResidueId, char>,
    /// Keep residues no template explains as ignored instead of failing.
    pub allow_bad_residues: bool,
    /// Heavy atoms a template may lack and still be eligible.
    pub max_missing_heavy_atoms: usize,
    pub disulfide_cutoff: f64,
    pub bond_tolerance: f64,
    /// Maximum C–N distance for a peptide bond; no geometric check when `None`.
    pub backbone_cutoff: Option<f64>,
}

impl Default for Directives {
    fn default() -> Self {
        Self {
            templates: BTreeMap::new(),
            delete: BTreeSet::new(),
            delete_bonds: Vec::new(),
            blunt_ends: BTreeSet::new(),
            default_altloc: None,
            wanted_altloc: BTreeMap::new(),
            allow_bad_residues: false,
            max_missing_heavy_atoms: 0,
            disulfide_cutoff: DEFAULT_DISULFIDE_CUTOFF,
            bond_tolerance: DEFAULT_BOND_TOLERANCE,
            backbone_cutoff: None,
        }
    }
}

impl Directives {
    /// Parses and validates a directives file.
    ///
    /// # Errors
    ///
    /// [`Error::Directives`] for malformed TOML and [`Error::InvalidTunable`] for a distance or
    /// tolerance that is not a finite positive number.
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        let directives: Self = toml::from_str(text)?;
        directives.validate()?;
        Ok(directives)
    }

    /// Rejects tunables that would silently disable bonding or linking.
    pub fn validate(&self) -> Result<(), Error> {
        let tunables = [
            ("disulfide_cutoff", Some(self.disulfide_cutoff)),
            ("bond_tolerance", Some(self.bond_tolerance)),
            ("backbone_cutoff", self.backbone_cutoff),
        ];
        for (name, value) in tunables {
            if let Some(value) = value
                && !(value.is_finite() && value > 0.0)
            {
                return Err(Error::InvalidTunable { name, value });
            }
        }
        Ok(())
    }

    /// Whether bonds between `a` and `b` were excluded.
    pub fn bond_deleted(&self, a: &ResidueId, b: &ResidueId) -> bool {
        self.delete_bonds
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Altloc requested for a residue, per-residue choice first.
    pub fn requested_altloc(&self, id: &ResidueId) -> Option<char> {
        self.wanted_altloc.get(id).copied().or(self.default_altloc)
    }

    /// Every residue id the directives mention, for existence checks.
    pub(crate) fn referenced_residues(&self) -> impl Iterator<Item = &ResidueId> {
        self.templates
            .keys()
            .chain(self.delete.iter())
            .chain(self.delete_bonds.iter().flat_map(|(a, b)| [a, b]))
            .chain(self.blunt_ends.iter().map(|e| &e.residue))
            .chain(self.wanted_altloc.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(text: &str) -> ResidueId {
        text.parse().unwrap()
    }

    #[test]
    fn defaults_match_documented_tunables() {
        let directives = Directives::default();
        assert_eq!(directives.disulfide_cutoff, 2.5);
        assert_eq!(directives.bond_tolerance, 0.45);
        assert_eq!(directives.max_missing_heavy_atoms, 0);
        assert!(directives.backbone_cutoff.is_none());
        assert!(!directives.allow_bad_residues);
    }

    #[test]
    fn parses_full_directives_file() {
        let text = r#"
            default_altloc = "A"
            allow_bad_residues = true
            delete = ["A:200"]
            delete_bonds = [["A:6", "A:127"]]
            blunt_ends = [{ residue = "A:1", label = 0 }]
            disulfide_cutoff = 2.2

            [templates]
            "A:6" = "CYS"

            [wanted_altloc]
            "A:23" = "B"
        "#;
        let directives = Directives::from_toml_str(text).unwrap();

        assert_eq!(directives.default_altloc, Some('A'));
        assert!(directives.allow_bad_residues);
        assert!(directives.delete.contains(&id("A:200")));
        assert!(directives.bond_deleted(&id("A:127"), &id("A:6")));
        assert!(directives.blunt_ends.contains(&LinkEnd::new(id("A:1"), 0)));
        assert_eq!(directives.templates.get(&id("A:6")).map(String::as_str), Some("CYS"));
        assert_eq!(directives.disulfide_cutoff, 2.2);
        assert_eq!(directives.bond_tolerance, 0.45);
        assert_eq!(directives.requested_altloc(&id("A:23")), Some('B'));
        assert_eq!(directives.requested_altloc(&id("A:24")), Some('A'));
        assert_eq!(directives.referenced_residues().count(), 6);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Directives::from_toml_str("delete_residues = []").unwrap_err();
        assert!(matches!(err, Error::Directives(_)));
    }

    #[test]
    fn non_finite_or_negative_tunables_are_rejected() {
        let err = Directives::from_toml_str("disulfide_cutoff = nan").unwrap_err();
        assert!(matches!(err, Error::InvalidTunable { name: "disulfide_cutoff", .. }));

        let err = Directives::from_toml_str("bond_tolerance = -0.1").unwrap_err();
        assert!(matches!(err, Error::InvalidTunable { name: "bond_tolerance", .. }));

        let err = Directives::from_toml_str("backbone_cutoff = inf").unwrap_err();
        assert!(matches!(err, Error::InvalidTunable { name: "backbone_cutoff", .. }));

        assert!(Directives::from_toml_str("backbone_cutoff = 1.6").is_ok());
    }

    #[test]
    fn malformed_residue_id_is_rejected() {
        assert!(Directives::from_toml_str("delete = [\"A-200\"]").is_err());
    }
}
