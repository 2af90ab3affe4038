use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;

/// Parameter key for partial charges.
pub const CHARGE_KEY: &str = "q";
/// Parameter key for docking atom types.
pub const ATOM_TYPE_KEY: &str = "atom_type";

/// One per-atom parameter value produced by a preparer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    #[default]
    Unset,
    Number(f64),
    Text(SmolStr),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Unset => write!(f, "-"),
            ParamValue::Number(v) => write!(f, "{:.4}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Output of a preparer for one padded graph: parameter columns plus its ignore mask.
///
/// Every column is expected to hold one value per padded atom; the container checks this
/// before exporting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PreparedAtoms {
    pub params: BTreeMap<String, Vec<ParamValue>>,
    pub ignore: Vec<bool>,
}

impl PreparedAtoms {
    pub fn column(&self, key: &str) -> Option<&[ParamValue]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Partial charges as numbers; unset entries read as zero.
    pub fn charges(&self) -> Vec<f64> {
        self.column(CHARGE_KEY)
            .map(|col| col.iter().map(|v| v.as_number().unwrap_or(0.0)).collect())
            .unwrap_or_default()
    }
}
