use crate::model::template::{LinkRole, ResidueVariant, Terminus};
use crate::model::types::{BondOrder, Element};
use serde::Deserialize;
use std::collections::BTreeMap;

/// One residue template as written in a catalog file.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TemplateFile {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub variant: ResidueVariant,
    pub charge: i32,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub patches: Vec<String>,
    pub atoms: Vec<AtomRecord>,
    /// Bonds written as `"A-B"`, `"A=B"`, `"A#B"` or `"A:B"` (aromatic).
    #[serde(default)]
    pub bonds: Vec<String>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    /// Rigid-core atom names; the backbone set applies when omitted.
    #[serde(default)]
    pub rigid: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AtomRecord {
    pub name: String,
    pub element: Element,
    #[serde(default)]
    pub charge: i32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LinkRecord {
    pub atom: String,
    pub role: LinkRole,
}

/// Edit that derives a terminal variant from a base template.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PatchRecord {
    pub name: String,
    pub prefix: String,
    pub terminus: Terminus,
    #[serde(default)]
    pub drop_link: Option<LinkRole>,
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub charges: BTreeMap<String, i32>,
    #[serde(default)]
    pub add: Vec<AddedAtom>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct AddedAtom {
    pub name: String,
    pub element: Element,
    #[serde(default)]
    pub charge: i32,
    /// Existing atom the new atom is bonded to.
    pub bond: String,
    #[serde(default)]
    pub order: BondOrder,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PatchFile {
    pub patches: Vec<PatchRecord>,
}

/// User catalog: templates plus any patches they reference.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub templates: Vec<TemplateFile>,
    #[serde(default)]
    pub patches: Vec<PatchRecord>,
}
