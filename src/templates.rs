//! Residue template catalogs.
//!
//! A [`TemplateLibrary`] holds compiled [`ResidueTemplate`]s in catalog order. The bundled
//! protein catalog is available through [`bundled`]; additional catalogs written in the same
//! TOML format can be layered on top with [`TemplateLibrary::extend_from_toml`].
//!
//! ```
//! use chorizo_forge::templates;
//!
//! let library = templates::bundled();
//! let his: Vec<&str> = library.candidates("HIS").map(|t| t.name()).collect();
//! assert!(his.contains(&"HIE") && his.contains(&"HID") && his.contains(&"HIP"));
//! ```

use crate::db::{self, CatalogFile, PatchRecord};
use crate::model::template::{LinkRole, ResidueTemplate};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to parse template catalog: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("template '{template}' lists atom '{atom}' more than once")]
    DuplicateAtom { template: String, atom: String },

    #[error("template '{template}' references unknown atom '{atom}' in a {context}")]
    UnknownAtom {
        template: String,
        atom: String,
        context: &'static str,
    },

    #[error("template '{template}' has malformed bond '{bond}'")]
    MalformedBond { template: String, bond: String },

    #[error("template '{template}' declares more than one {role} link")]
    DuplicateLink { template: String, role: LinkRole },

    #[error(
        "template '{template}' declares net charge {declared} but its formal charges sum to {computed}"
    )]
    ChargeMismatch {
        template: String,
        declared: i32,
        computed: i32,
    },

    #[error("template '{template}' refers to unknown patch '{patch}'")]
    UnknownPatch { template: String, patch: String },

    #[error("template '{0}' is defined more than once")]
    DuplicateTemplate(String),
}

/// Shared handle to the bundled protein catalog.
pub fn bundled() -> Arc<TemplateLibrary> {
    Arc::clone(db::bundled())
}

/// Looks up a bundled template by name.
pub fn get(name: &str) -> Option<&'static ResidueTemplate> {
    db::bundled().get(name)
}

/// Immutable, ordered catalog of residue templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<ResidueTemplate>,
    by_name: HashMap<SmolStr, usize>,
    patches: Vec<PatchRecord>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a standalone catalog.
    pub fn from_toml_str(text: &str) -> Result<Self, LibraryError> {
        let mut library = Self::new();
        library.extend_from_toml(text)?;
        Ok(library)
    }

    /// Appends the templates of another catalog, keeping existing catalog order.
    ///
    /// Templates in the new catalog may use its own patches or any patch already known to this
    /// library. Nothing is added when any template fails to compile.
    ///
    /// # Returns
    ///
    /// Number of templates added, terminal variants included.
    pub fn extend_from_toml(&mut self, text: &str) -> Result<usize, LibraryError> {
        let catalog: CatalogFile = toml::from_str(text)?;
        self.add_catalog(&catalog.templates, catalog.patches)
    }

    pub(crate) fn add_catalog(
        &mut self,
        files: &[db::TemplateFile],
        patches: Vec<PatchRecord>,
    ) -> Result<usize, LibraryError> {
        let mut known_patches = patches;
        known_patches.extend(self.patches.iter().cloned());

        let mut staged: Vec<ResidueTemplate> = Vec::new();
        for file in files {
            for template in db::compile_with_patches(file, &known_patches)? {
                let clash = self.by_name.contains_key(template.name())
                    || staged.iter().any(|t| t.name() == template.name());
                if clash {
                    return Err(LibraryError::DuplicateTemplate(template.name().to_string()));
                }
                staged.push(template);
            }
        }

        let added = staged.len();
        for template in staged {
            self.by_name.insert(template.name.clone(), self.templates.len());
            self.templates.push(template);
        }
        self.patches = known_patches;
        Ok(added)
    }

    pub fn get(&self, name: &str) -> Option<&ResidueTemplate> {
        self.by_name.get(name).map(|&i| &self.templates[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Catalog position, used as the last tie-break between equally good candidates.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Templates a residue name selects, in catalog order.
    ///
    /// The returned templates borrow the library only, so the name may be dropped while they
    /// are in use.
    pub fn candidates<'a>(
        &'a self,
        res_name: &str,
    ) -> impl Iterator<Item = &'a ResidueTemplate> + use<'a> {
        let res_name = SmolStr::new(res_name);
        self.templates
            .iter()
            .filter(move |t| t.answers_to(&res_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResidueTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
