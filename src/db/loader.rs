use super::schema::{PatchFile, PatchRecord, TemplateFile};
use crate::model::template::{LinkPoint, ResidueTemplate, TemplateAtom, TemplateBond};
use crate::model::types::BondOrder;
use crate::templates::{LibraryError, TemplateLibrary};
use smol_str::SmolStr;
use std::collections::HashSet;

/// Atoms kept in place when a side chain is carved out, unless a template lists its own.
const BACKBONE_CORE: &[&str] = &["N", "CA", "C", "O", "H", "HA", "HA2", "HA3"];

pub fn load_bundled_library() -> TemplateLibrary {
    let patches: PatchFile = toml::from_str(include_str!("../../templates/patches.toml"))
        .unwrap_or_else(|e| panic!("Failed to parse bundled patches: {}", e));
    let mut files = Vec::new();

    macro_rules! load_template {
        ($path:literal) => {
            let content = include_str!(concat!("../../templates/", $path));
            let file: TemplateFile = toml::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse template file '{}': {}", $path, e));
            files.push(file);
        };
    }

    load_template!("protein/ALA.toml");
    load_template!("protein/GLY.toml");
    load_template!("protein/SER.toml");
    load_template!("protein/LEU.toml");
    load_template!("protein/MET.toml");
    load_template!("protein/TYR.toml");
    load_template!("protein/HIE.toml");
    load_template!("protein/HID.toml");
    load_template!("protein/HIP.toml");
    load_template!("protein/CYS.toml");
    load_template!("protein/CYX.toml");
    load_template!("protein/CYM.toml");
    load_template!("protein/LYS.toml");
    load_template!("protein/LYN.toml");
    load_template!("protein/ASP.toml");
    load_template!("protein/ASH.toml");
    load_template!("protein/GLU.toml");
    load_template!("protein/GLH.toml");
    load_template!("protein/ARG.toml");
    load_template!("protein/ASN.toml");
    load_template!("protein/GLN.toml");
    load_template!("protein/ILE.toml");
    load_template!("protein/VAL.toml");
    load_template!("protein/THR.toml");
    load_template!("protein/PHE.toml");
    load_template!("protein/TRP.toml");
    load_template!("protein/PRO.toml");

    let mut library = TemplateLibrary::new();
    library
        .add_catalog(&files, patches.patches)
        .unwrap_or_else(|e| panic!("Invalid bundled template catalog: {}", e));
    library
}

/// Compiles a catalog template and every terminal variant its patches generate.
pub fn compile_with_patches(
    file: &TemplateFile,
    patches: &[PatchRecord],
) -> Result<Vec<ResidueTemplate>, LibraryError> {
    let base = compile_template(file)?;
    let mut out = Vec::with_capacity(1 + file.patches.len());
    for patch_name in &file.patches {
        let patch = patches
            .iter()
            .find(|p| &p.name == patch_name)
            .ok_or_else(|| LibraryError::UnknownPatch {
                template: file.name.clone(),
                patch: patch_name.clone(),
            })?;
        out.push(apply_patch(&base, patch)?);
    }
    out.insert(0, base);
    Ok(out)
}

pub fn compile_template(file: &TemplateFile) -> Result<ResidueTemplate, LibraryError> {
    let template = &file.name;

    let mut seen = HashSet::new();
    let atoms: Vec<TemplateAtom> = file
        .atoms
        .iter()
        .map(|a| {
            if !seen.insert(a.name.as_str()) {
                return Err(LibraryError::DuplicateAtom {
                    template: template.clone(),
                    atom: a.name.clone(),
                });
            }
            Ok(TemplateAtom {
                name: SmolStr::new(&a.name),
                element: a.element,
                formal_charge: a.charge,
            })
        })
        .collect::<Result<_, _>>()?;

    let index_of = |name: &str, context: &'static str| {
        atoms
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| LibraryError::UnknownAtom {
                template: template.clone(),
                atom: name.to_string(),
                context,
            })
    };

    let mut bonds = Vec::with_capacity(file.bonds.len());
    for spec in &file.bonds {
        let (a, b, order) = split_bond(spec).ok_or_else(|| LibraryError::MalformedBond {
            template: template.clone(),
            bond: spec.clone(),
        })?;
        let (a, b) = (index_of(a, "bond")?, index_of(b, "bond")?);
        if a == b {
            return Err(LibraryError::MalformedBond {
                template: template.clone(),
                bond: spec.clone(),
            });
        }
        bonds.push(TemplateBond { a, b, order });
    }

    let mut links: Vec<LinkPoint> = Vec::with_capacity(file.links.len());
    for link in &file.links {
        if links.iter().any(|l| l.role == link.role) {
            return Err(LibraryError::DuplicateLink {
                template: template.clone(),
                role: link.role,
            });
        }
        links.push(LinkPoint {
            atom: index_of(&link.atom, "link")?,
            role: link.role,
        });
    }

    let rigid = match &file.rigid {
        Some(names) => {
            let mut mask = vec![false; atoms.len()];
            for name in names {
                mask[index_of(name, "rigid core")?] = true;
            }
            mask
        }
        None => atoms
            .iter()
            .map(|a| BACKBONE_CORE.contains(&a.name.as_str()))
            .collect(),
    };

    let computed: i32 = atoms.iter().map(|a| a.formal_charge).sum();
    if computed != file.charge {
        return Err(LibraryError::ChargeMismatch {
            template: template.clone(),
            declared: file.charge,
            computed,
        });
    }

    Ok(ResidueTemplate {
        name: SmolStr::new(template),
        kind: SmolStr::new(&file.kind),
        variant: file.variant,
        terminus: None,
        aliases: file.aliases.iter().map(SmolStr::new).collect(),
        atoms,
        bonds,
        links,
        charge: file.charge,
        rigid,
    })
}

/// Derives a terminal variant: removals first, then charge edits, then additions.
///
/// The variant is named `prefix + base name` and answers to the base name and aliases as well,
/// so evidence such as `OXT` decides between them during matching.
pub fn apply_patch(
    base: &ResidueTemplate,
    patch: &PatchRecord,
) -> Result<ResidueTemplate, LibraryError> {
    let name = format!("{}{}", patch.prefix, base.name);
    let unknown = |atom: &str, context: &'static str| LibraryError::UnknownAtom {
        template: name.clone(),
        atom: atom.to_string(),
        context,
    };

    for removed in &patch.remove {
        if base.atom_index(removed).is_none() {
            return Err(unknown(removed, "patch removal"));
        }
    }

    // Old index -> new index after removals.
    let mut remap = vec![None; base.atoms.len()];
    let mut atoms: Vec<TemplateAtom> = Vec::with_capacity(base.atoms.len() + patch.add.len());
    let mut rigid = Vec::with_capacity(atoms.capacity());
    for (i, atom) in base.atoms.iter().enumerate() {
        if patch.remove.iter().any(|r| r == atom.name.as_str()) {
            continue;
        }
        remap[i] = Some(atoms.len());
        atoms.push(atom.clone());
        rigid.push(base.is_rigid(i));
    }

    let mut bonds: Vec<TemplateBond> = base
        .bonds
        .iter()
        .filter_map(|b| {
            Some(TemplateBond {
                a: remap[b.a]?,
                b: remap[b.b]?,
                order: b.order,
            })
        })
        .collect();

    let mut links = Vec::with_capacity(base.links.len());
    for link in &base.links {
        if Some(link.role) == patch.drop_link {
            continue;
        }
        let atom = remap[link.atom].ok_or_else(|| unknown(&base.atoms[link.atom].name, "link"))?;
        links.push(LinkPoint { atom, role: link.role });
    }

    for (atom_name, charge) in &patch.charges {
        let atom = atoms
            .iter_mut()
            .find(|a| a.name == atom_name.as_str())
            .ok_or_else(|| unknown(atom_name, "patch charge"))?;
        atom.formal_charge = *charge;
    }

    for added in &patch.add {
        if atoms.iter().any(|a| a.name == added.name.as_str()) {
            return Err(LibraryError::DuplicateAtom {
                template: name.clone(),
                atom: added.name.clone(),
            });
        }
        let anchor = atoms
            .iter()
            .position(|a| a.name == added.bond.as_str())
            .ok_or_else(|| unknown(&added.bond, "patch bond"))?;
        atoms.push(TemplateAtom {
            name: SmolStr::new(&added.name),
            element: added.element,
            formal_charge: added.charge,
        });
        rigid.push(rigid[anchor]);
        bonds.push(TemplateBond {
            a: anchor,
            b: atoms.len() - 1,
            order: added.order,
        });
    }

    let mut aliases = base.aliases.clone();
    aliases.push(base.name.clone());

    Ok(ResidueTemplate {
        charge: atoms.iter().map(|a| a.formal_charge).sum(),
        name: SmolStr::new(name),
        kind: base.kind.clone(),
        variant: base.variant,
        terminus: Some(patch.terminus),
        aliases,
        atoms,
        bonds,
        links,
        rigid,
    })
}

fn split_bond(spec: &str) -> Option<(&str, &str, BondOrder)> {
    let at = spec.find(['-', '=', '#', ':'])?;
    let symbol = spec[at..].chars().next()?;
    let order = BondOrder::from_symbol(symbol)?;
    let (a, b) = (spec[..at].trim(), spec[at + 1..].trim());
    if a.is_empty() || b.is_empty() {
        return None;
    }
    Some((a, b, order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::template::LinkRole;
    use crate::model::types::Element;

    fn parse(text: &str) -> TemplateFile {
        toml::from_str(text).expect("template toml")
    }

    const SERINE_LIKE: &str = r#"
        name = "TST"
        kind = "TST"
        charge = 0
        atoms = [
            { name = "N", element = "N" },
            { name = "CA", element = "C" },
            { name = "C", element = "C" },
            { name = "O", element = "O" },
            { name = "OG", element = "O" },
            { name = "H", element = "H" },
        ]
        bonds = ["N-CA", "CA-C", "C=O", "CA-OG", "N-H"]
        links = [
            { atom = "N", role = "previous" },
            { atom = "C", role = "next" },
        ]
    "#;

    #[test]
    fn split_bond_reads_every_order_symbol() {
        assert_eq!(split_bond("N-CA"), Some(("N", "CA", BondOrder::Single)));
        assert_eq!(split_bond("C=O"), Some(("C", "O", BondOrder::Double)));
        assert_eq!(split_bond("C1#N1"), Some(("C1", "N1", BondOrder::Triple)));
        assert_eq!(split_bond("CG:CD1"), Some(("CG", "CD1", BondOrder::Aromatic)));
        assert_eq!(split_bond("CA"), None);
        assert_eq!(split_bond("-CA"), None);
    }

    #[test]
    fn compile_template_resolves_indices_and_default_core() {
        let template = compile_template(&parse(SERINE_LIKE)).unwrap();

        assert_eq!(template.atoms().len(), 6);
        assert_eq!(template.bonds()[2].order, BondOrder::Double);
        assert_eq!(template.link_for_role(LinkRole::Next).map(|l| l.label()), Some(2));
        assert!(template.is_rigid(1));
        assert!(!template.is_rigid(4));
        assert!(template.terminus().is_none());
    }

    #[test]
    fn compile_template_rejects_charge_mismatch() {
        let text = SERINE_LIKE.replace("charge = 0", "charge = 1");
        match compile_template(&parse(&text)) {
            Err(LibraryError::ChargeMismatch { declared, computed, .. }) => {
                assert_eq!((declared, computed), (1, 0));
            }
            other => panic!("expected charge mismatch, got {:?}", other),
        }
    }

    #[test]
    fn compile_template_rejects_unknown_bond_atom() {
        let text = SERINE_LIKE.replace("\"CA-OG\"", "\"CA-OX\"");
        let err = compile_template(&parse(&text)).unwrap_err();
        assert!(matches!(err, LibraryError::UnknownAtom { ref atom, .. } if atom == "OX"));
    }

    #[test]
    fn compile_template_rejects_duplicate_atom_names() {
        let text = SERINE_LIKE.replace(
            "{ name = \"H\", element = \"H\" }",
            "{ name = \"OG\", element = \"O\" }",
        );
        let err = compile_template(&parse(&text)).unwrap_err();
        assert!(matches!(err, LibraryError::DuplicateAtom { .. }));
    }

    #[test]
    fn n_terminal_patch_swaps_hydrogens_and_drops_previous_link() {
        let base = compile_template(&parse(SERINE_LIKE)).unwrap();
        let patches: PatchFile =
            toml::from_str(include_str!("../../templates/patches.toml")).unwrap();
        let nterm = patches.patches.iter().find(|p| p.name == "nterm").unwrap();

        let patched = apply_patch(&base, nterm).unwrap();

        assert_eq!(patched.name(), "NTST");
        assert!(patched.atom_index("H").is_none());
        assert!(patched.atom_index("H3").is_some());
        assert!(!patched.has_role(LinkRole::Previous));
        assert!(patched.has_role(LinkRole::Next));
        assert_eq!(patched.charge(), 1);
        assert!(patched.answers_to("TST"));
        let n = patched.atom_index("N").unwrap();
        let h1 = patched.atom_index("H1").unwrap();
        assert!(patched.neighbors(n).any(|(i, _)| i == h1));
        assert!(patched.is_rigid(h1));
    }

    #[test]
    fn c_terminal_patch_adds_charged_oxt() {
        let base = compile_template(&parse(SERINE_LIKE)).unwrap();
        let patches: PatchFile =
            toml::from_str(include_str!("../../templates/patches.toml")).unwrap();
        let cterm = patches.patches.iter().find(|p| p.name == "cterm").unwrap();

        let patched = apply_patch(&base, cterm).unwrap();

        let oxt = patched.atom_index("OXT").unwrap();
        assert_eq!(patched.atoms()[oxt].element, Element::O);
        assert_eq!(patched.charge(), -1);
        assert!(!patched.has_role(LinkRole::Next));
        // Link labels are atom indices and survive the patch untouched.
        assert_eq!(patched.link_for_role(LinkRole::Previous).map(|l| l.label()), Some(0));
    }

    #[test]
    fn unknown_patch_name_is_reported() {
        let mut file = parse(SERINE_LIKE);
        file.patches = vec!["missing".into()];
        let err = compile_with_patches(&file, &[]).unwrap_err();
        assert!(matches!(err, LibraryError::UnknownPatch { .. }));
    }

    #[test]
    fn bundled_library_loads_with_terminal_variants() {
        let library = load_bundled_library();
        assert!(library.get("HID").is_some());
        assert!(library.get("NMET").is_some());
        assert!(library.get("CTYR").is_some());
        assert_eq!(library.get("CTYR").unwrap().charge(), -1);
        assert_eq!(library.get("NLYS").unwrap().charge(), 2);
    }

    #[test]
    fn bundled_library_covers_the_standard_amino_acids() {
        let library = load_bundled_library();
        let kinds = [
            "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE", "LEU", "LYS",
            "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
        ];
        for kind in kinds {
            assert!(library.candidates(kind).next().is_some(), "{kind} has no template");
        }
        assert_eq!(library.get("ARG").unwrap().charge(), 1);
        assert_eq!(library.get("GLU").unwrap().charge(), -1);
        assert_eq!(library.get("GLH").unwrap().kind(), "GLU");
    }

    #[test]
    fn proline_terminus_adds_two_hydrogens_to_the_ring_nitrogen() {
        let library = load_bundled_library();
        let npro = library.get("NPRO").unwrap();

        assert_eq!(npro.charge(), 1);
        assert!(npro.atom_index("H1").is_none());
        assert!(!npro.has_role(LinkRole::Previous));
        let n = npro.atom_index("N").unwrap();
        let attached: Vec<&str> = npro
            .neighbors(n)
            .map(|(i, _)| npro.atoms()[i].name.as_str())
            .collect();
        for name in ["CA", "CD", "H2", "H3"] {
            assert!(attached.contains(&name), "N lacks {name}");
        }
        assert!((0..npro.atoms().len()).all(|i| npro.is_rigid(i)));
    }
}
