//! Static parameter export and text serializations of a [`Chorizo`].

use super::error::Error;
use super::matcher::{self, MatchSettings, resolve};
use super::prep::Preparer;
use crate::io::json::{ChorizoDocument, ResidueRecord};
use crate::model::chorizo::Chorizo;
use crate::model::id::{LinkEnd, ResidueId};
use crate::model::params::ParamValue;
use crate::model::residue::Residue;
use crate::model::types::Point;
use crate::ops::extract::RawResidue;
use crate::templates::TemplateLibrary;
use smol_str::SmolStr;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Parameters of every atom that stays fixed during docking.
///
/// All vectors share one length and one order: residue order first, padded-graph order within
/// a residue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticParams {
    pub params: BTreeMap<String, Vec<ParamValue>>,
    pub coords: Vec<Point>,
    /// Owning residue and name of each exported atom.
    pub atoms: Vec<(ResidueId, SmolStr)>,
}

impl StaticParams {
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

impl Chorizo {
    /// Collects parameters of all non-ignored, non-flexible atoms of valid residues.
    ///
    /// Keys are the union over residues; a residue whose preparer did not produce a key
    /// contributes [`ParamValue::Unset`] for it.
    ///
    /// # Errors
    ///
    /// [`Error::ParameterMismatch`] when a parameter column of some residue does not hold one
    /// value per padded atom.
    pub fn export_static_atom_params(&self) -> Result<StaticParams, Error> {
        let keys: BTreeSet<&str> = self
            .valid_residues()
            .filter_map(|r| r.prepared())
            .flat_map(|p| p.params.keys().map(String::as_str))
            .collect();

        let mut out = StaticParams {
            params: keys.iter().map(|k| (k.to_string(), Vec::new())).collect(),
            ..StaticParams::default()
        };

        for residue in self.valid_residues() {
            let (Some(padded), Some(prepared)) = (residue.padded(), residue.prepared()) else {
                continue;
            };
            if let Some((key, column)) = prepared
                .params
                .iter()
                .find(|(_, column)| column.len() != padded.len())
            {
                return Err(Error::ParameterMismatch {
                    residue: residue.id().clone(),
                    details: format!(
                        "'{}' has {} values for {} atoms",
                        key,
                        column.len(),
                        padded.len()
                    ),
                });
            }

            for (p, a) in padded.authentic_pairs() {
                if residue.is_ignored_atom(p) || residue.flexible_mask()[a] {
                    continue;
                }
                for key in &keys {
                    let value = prepared
                        .column(key)
                        .map(|column| column[p].clone())
                        .unwrap_or_default();
                    if let Some(target) = out.params.get_mut(*key) {
                        target.push(value);
                    }
                }
                let atom = &padded.graph.atoms()[p];
                out.coords.push(atom.pos);
                out.atoms.push((residue.id().clone(), atom.name.clone()));
            }
        }

        log::debug!("Exported {} static atoms with {} parameters", out.len(), keys.len());
        Ok(out)
    }

    /// Writes the container as PDB text with template keys as residue names.
    pub fn to_pdb(&self) -> Result<String, Error> {
        let mut buffer = Vec::new();
        crate::io::write_pdb(&mut buffer, self)?;
        String::from_utf8(buffer).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(ChorizoDocument::from_chorizo(self).to_json_string()?)
    }

    /// Rebuilds a container from [`Chorizo::to_json`] output.
    ///
    /// Stored template assignments are applied as given, without re-matching, and every
    /// residue is re-padded and re-prepared with `preparer`.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] for malformed JSON, [`Error::UnknownTemplate`] when `library` lacks a
    /// stored template, and [`Error::Serialization`] for documents that are internally
    /// inconsistent (duplicate residues, bonds to unknown link points, unknown flexible atoms).
    pub fn from_json<P: Preparer + 'static>(
        text: &str,
        library: Arc<TemplateLibrary>,
        preparer: P,
    ) -> Result<Chorizo, Error> {
        let document = ChorizoDocument::from_json_str(text)?;
        let settings = MatchSettings {
            bond_tolerance: document.bond_tolerance,
            max_missing_heavy_atoms: document.max_missing_heavy_atoms,
        };

        let mut seen = HashSet::new();
        let mut residues = Vec::with_capacity(document.residues.len());
        for record in &document.residues {
            if !seen.insert(record.id.clone()) {
                return Err(Error::Serialization(format!(
                    "residue {} appears more than once",
                    record.id
                )));
            }
            residues.push(restore_residue(record, &library, &settings)?);
        }

        let by_id: HashMap<&ResidueId, &Residue> = residues.iter().map(|r| (r.id(), r)).collect();
        let link_exists = |end: &LinkEnd| {
            by_id
                .get(&end.residue)
                .and_then(|r| r.template_key())
                .and_then(|key| library.get(key))
                .is_some_and(|t| t.link(end.label).is_some())
        };
        if let Some(end) = document
            .bonds
            .iter()
            .flat_map(|b| b.ends.iter())
            .find(|end| !link_exists(end))
        {
            return Err(Error::Serialization(format!(
                "bond end {} is not a link point of a valid residue",
                end
            )));
        }

        let declared: BTreeSet<LinkEnd> = document.blunt_ends.into_iter().collect();
        let blunt_ends = super::link::validate_blunt_ends(
            &residues,
            &document.bonds,
            &declared,
            &[],
            &library,
        )?;

        let mut chorizo = Chorizo {
            residues,
            index: HashMap::new(),
            bonds: document.bonds,
            blunt_ends,
            library,
            preparer: Box::new(preparer),
            settings,
        };
        chorizo.reindex();
        chorizo.sync_links();
        let ids: Vec<ResidueId> = chorizo.residue_ids().cloned().collect();
        for id in &ids {
            chorizo.refresh(id)?;
        }

        log::info!("Restored {} residues from JSON", chorizo.len());
        Ok(chorizo)
    }
}

fn restore_residue(
    record: &ResidueRecord,
    library: &TemplateLibrary,
    settings: &MatchSettings,
) -> Result<Residue, Error> {
    let raw = RawResidue {
        id: record.id.clone(),
        name: record.res_name.clone(),
        atoms: record
            .atoms
            .iter()
            .map(|a| a.to_raw(&record.res_name, &record.id))
            .collect(),
    };

    let mut residue = match (&record.template, record.ignored) {
        (Some(key), None) => {
            let template = library
                .get(key)
                .ok_or_else(|| Error::unknown_template(&record.id, key.as_str()))?;
            let kept = matcher::check_forced(&raw, template, &[], settings)?;
            resolve(kept, template, record.forced)
        }
        (None, Some(reason)) => Residue::ignored(raw.id, raw.name, raw.atoms, reason),
        _ => {
            return Err(Error::Serialization(format!(
                "residue {} needs exactly one of a template or an ignore reason",
                record.id
            )));
        }
    };

    for name in &record.flexible {
        let index = residue.graph().position_of(name).ok_or_else(|| {
            Error::Serialization(format!(
                "flexible atom {} is not part of residue {}",
                name, record.id
            ))
        })?;
        residue.flexible[index] = true;
    }
    Ok(residue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::params::{ATOM_TYPE_KEY, CHARGE_KEY};
    use crate::ops::prep::{CustomParam, PrepConfig};
    use crate::ops::{ChorizoBuilder, FormalChargePreparer};
    use crate::templates;
    use crate::testing::{chain_atoms, rid};

    fn capped_chain() -> Chorizo {
        let atoms = chain_atoms("A", &[("NGLY", "GLY"), ("SER", "SER"), ("CALA", "ALA")], true);
        ChorizoBuilder::new(templates::bundled())
            .build(&atoms, FormalChargePreparer::default())
            .unwrap()
    }

    fn templates_of(chorizo: &Chorizo) -> Vec<String> {
        chorizo
            .residues()
            .iter()
            .map(|r| r.template_key().unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn static_params_cover_every_authentic_atom() {
        let config = PrepConfig {
            custom_params: vec![CustomParam {
                pattern: "[CH2]".parse().unwrap(),
                key: "new_param".to_string(),
                value: ParamValue::Number(42.0),
            }],
            ..PrepConfig::default()
        };
        let atoms = chain_atoms("A", &[("NGLY", "GLY"), ("SER", "SER"), ("CALA", "ALA")], true);
        let chorizo = ChorizoBuilder::new(templates::bundled())
            .build(&atoms, FormalChargePreparer::new(config))
            .unwrap();

        let exported = chorizo.export_static_atom_params().unwrap();
        let total: usize = chorizo.residues().iter().map(|r| r.graph().len()).sum();

        assert_eq!(exported.len(), total);
        assert_eq!(exported.atoms.len(), total);
        for key in [CHARGE_KEY, ATOM_TYPE_KEY, "new_param"] {
            assert_eq!(exported.params[key].len(), total, "column {}", key);
        }
        let cb = exported
            .atoms
            .iter()
            .position(|(id, name)| id == &rid("A:2") && name == "CB")
            .unwrap();
        assert_eq!(exported.params["new_param"][cb], ParamValue::Number(42.0));
        let charge: f64 = exported.params[CHARGE_KEY]
            .iter()
            .filter_map(ParamValue::as_number)
            .sum();
        assert!(charge.abs() < 0.002);
    }

    #[test]
    fn flexible_atoms_are_not_exported() {
        let mut chorizo = capped_chain();
        let before = chorizo.export_static_atom_params().unwrap().len();

        let flexible = chorizo
            .flexibilize_sidechain(&rid("A:2"), &FormalChargePreparer::default())
            .unwrap();
        let exported = chorizo.export_static_atom_params().unwrap();

        assert_eq!(exported.len(), before - flexible);
        assert!(!exported.atoms.iter().any(|(_, name)| name == "OG"));
    }

    #[test]
    fn json_round_trip_preserves_the_container() {
        let mut chorizo = capped_chain();
        chorizo
            .flexibilize_sidechain(&rid("A:2"), &FormalChargePreparer::default())
            .unwrap();

        let text = chorizo.to_json().unwrap();
        let preparer = FormalChargePreparer::default();
        let restored = Chorizo::from_json(&text, templates::bundled(), preparer).unwrap();

        assert_eq!(templates_of(&restored), templates_of(&chorizo));
        assert_eq!(restored.bonds(), chorizo.bonds());
        assert_eq!(restored.blunt_ends(), chorizo.blunt_ends());
        let (a, b) = (&chorizo.residues()[1], &restored.residues()[1]);
        assert_eq!(a.flexible_mask(), b.flexible_mask());
        assert_eq!(a.graph(), b.graph());
        assert_eq!(a.observed_atoms(), b.observed_atoms());
        assert_eq!(
            restored.export_static_atom_params().unwrap(),
            chorizo.export_static_atom_params().unwrap()
        );
    }

    #[test]
    fn from_json_rejects_inconsistent_documents() {
        let chorizo = capped_chain();
        let text = chorizo.to_json().unwrap().replace("\"label\": 2", "\"label\": 9");

        let err = Chorizo::from_json(&text, templates::bundled(), FormalChargePreparer::default())
            .expect_err("bond to a missing link point");
        assert!(matches!(err, Error::Serialization(_)));

        let err = Chorizo::from_json("{}", templates::bundled(), FormalChargePreparer::default())
            .expect_err("missing fields");
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn pdb_round_trip_reproduces_template_assignments() {
        let atoms = chain_atoms(
            "A",
            &[("NALA", "ALA"), ("HIE", "HIS"), ("LYN", "LYS"), ("CTYR", "TYR")],
            true,
        );
        let chorizo = ChorizoBuilder::new(templates::bundled())
            .build(&atoms, FormalChargePreparer::default())
            .unwrap();

        let text = chorizo.to_pdb().unwrap();
        let rebuilt = ChorizoBuilder::new(templates::bundled())
            .from_pdb_string(&text, FormalChargePreparer::default())
            .unwrap();

        assert_eq!(templates_of(&rebuilt), vec!["NALA", "HIE", "LYN", "CTYR"]);
        assert_eq!(templates_of(&rebuilt), templates_of(&chorizo));
        assert_eq!(rebuilt.bonds(), chorizo.bonds());
    }
}
