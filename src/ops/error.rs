use crate::model::id::{LinkEnd, ResidueId};
use crate::templates::LibraryError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "interrupted residue {residue}: its atom records are split by records of other residues"
    )]
    InterruptedResidue { residue: ResidueId },

    #[error(
        "residue {residue} has alternate locations {codes:?} but no altloc was requested; set a default altloc or a per-residue altloc"
    )]
    AltlocAmbiguity { residue: ResidueId, codes: Vec<char> },

    #[error(
        "altloc '{requested}' requested for residue {residue} is not present (found {codes:?})"
    )]
    MissingAltloc {
        residue: ResidueId,
        requested: char,
        codes: Vec<char>,
    },

    #[error("residue {residue} contains atom '{atom}' more than once")]
    DuplicateAtom { residue: ResidueId, atom: String },

    #[error("residue {residue} does not exist")]
    UnknownResidue { residue: ResidueId },

    #[error("template '{template}' requested for residue {residue} is not in the library")]
    UnknownTemplate { residue: ResidueId, template: String },

    #[error("no template matches residue {residue} ({res_name}): {reason}")]
    NoMatchingTemplate {
        residue: ResidueId,
        res_name: String,
        reason: String,
    },

    #[error("template '{template}' is incompatible with residue {residue}: {reason}")]
    IncompatibleTemplate {
        residue: ResidueId,
        template: String,
        reason: String,
    },

    #[error("template '{template}' for residue {residue} has no {role} link required by its bonds")]
    LinkMismatch {
        residue: ResidueId,
        template: String,
        role: &'static str,
    },

    #[error("unsatisfied link points must be declared as blunt ends: {list}", list = EndList(ends))]
    DanglingValence { ends: Vec<LinkEnd> },

    #[error(
        "residues {first} and {second} form a disulfide contact but template '{template}' forced on {residue} has no disulfide link"
    )]
    DisulfideConflict {
        first: ResidueId,
        second: ResidueId,
        residue: ResidueId,
        template: String,
    },

    #[error("parameters of residue {residue} have unequal lengths: {details}")]
    ParameterMismatch { residue: ResidueId, details: String },

    #[error("residue {residue} cannot be made flexible: {reason}")]
    NotFlexible { residue: ResidueId, reason: String },

    #[error("residue {residue} is ignored and cannot be {action}")]
    ResidueIgnored {
        residue: ResidueId,
        action: &'static str,
    },

    #[error("preparation failed for residue {residue}: {details}")]
    Preparation { residue: ResidueId, details: String },

    #[error("{name} must be a finite positive number, got {value}")]
    InvalidTunable { name: &'static str, value: f64 },

    #[error("invalid directives: {0}")]
    Directives(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] crate::io::Error),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl Error {
    pub fn no_matching_template(
        residue: &ResidueId,
        res_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::NoMatchingTemplate {
            residue: residue.clone(),
            res_name: res_name.into(),
            reason: reason.into(),
        }
    }

    pub fn incompatible_template(
        residue: &ResidueId,
        template: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::IncompatibleTemplate {
            residue: residue.clone(),
            template: template.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_template(residue: &ResidueId, template: impl Into<String>) -> Self {
        Self::UnknownTemplate {
            residue: residue.clone(),
            template: template.into(),
        }
    }

    pub fn link_mismatch(
        residue: &ResidueId,
        template: impl Into<String>,
        role: &'static str,
    ) -> Self {
        Self::LinkMismatch {
            residue: residue.clone(),
            template: template.into(),
            role,
        }
    }

    pub fn not_flexible(residue: &ResidueId, reason: impl Into<String>) -> Self {
        Self::NotFlexible {
            residue: residue.clone(),
            reason: reason.into(),
        }
    }

    pub fn preparation(residue: &ResidueId, details: impl Into<String>) -> Self {
        Self::Preparation {
            residue: residue.clone(),
            details: details.into(),
        }
    }

    pub fn unknown_residue(residue: &ResidueId) -> Self {
        Self::UnknownResidue {
            residue: residue.clone(),
        }
    }
}

struct EndList<'a>(&'a [LinkEnd]);

impl fmt::Display for EndList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, end) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", end)?;
        }
        Ok(())
    }
}
