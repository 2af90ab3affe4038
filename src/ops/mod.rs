//! Construction, editing and export of residue chains.
//!
//! [`ChorizoBuilder`] turns raw atoms into a [`crate::model::chorizo::Chorizo`]: residues are
//! grouped and altlocs selected ([`extract`]), templates chosen ([`matcher`]), inter-residue
//! bonds planned and checked ([`link`]), and every residue padded ([`padding`]) and handed to a
//! [`Preparer`] ([`prep`]). Post-construction edits live in [`mutate`]; parameter export and
//! serialization in [`export`].

pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod link;
pub mod matcher;
pub mod mutate;
pub mod padding;
pub mod prep;

pub use builder::ChorizoBuilder;
pub use config::Directives;
pub use error::Error;
pub use export::StaticParams;
pub use matcher::MatchSettings;
pub use prep::{ChargeModel, CustomParam, FormalChargePreparer, PrepConfig, PrepareError, Preparer};
