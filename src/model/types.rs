use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Point = Point3<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Element {
    H = 1,
    B = 5,
    C = 6,
    N = 7,
    O = 8,
    F = 9,
    Na = 11,
    Mg = 12,
    P = 15,
    S = 16,
    Cl = 17,
    K = 19,
    Ca = 20,
    Mn = 25,
    Fe = 26,
    Co = 27,
    Ni = 28,
    Cu = 29,
    Zn = 30,
    Se = 34,
    Br = 35,
    I = 53,
    Unknown = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    pub fn value(&self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }

    /// Parses the single-character bond symbol used by template catalogs.
    ///
    /// `-` single, `=` double, `#` triple and `:` aromatic, as in line notations.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '-' => Some(BondOrder::Single),
            '=' => Some(BondOrder::Double),
            '#' => Some(BondOrder::Triple),
            ':' => Some(BondOrder::Aromatic),
            _ => None,
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl FromStr for BondOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "1.0" | "Single" | "single" => Ok(BondOrder::Single),
            "2" | "2.0" | "Double" | "double" => Ok(BondOrder::Double),
            "3" | "3.0" | "Triple" | "triple" => Ok(BondOrder::Triple),
            "1.5" | "Aromatic" | "aromatic" => Ok(BondOrder::Aromatic),
            _ => Err(format!("Invalid bond order: {}", s)),
        }
    }
}

impl Element {
    pub fn symbol(&self) -> &'static str {
        match self {
            Element::H => "H",
            Element::B => "B",
            Element::C => "C",
            Element::N => "N",
            Element::O => "O",
            Element::F => "F",
            Element::Na => "Na",
            Element::Mg => "Mg",
            Element::P => "P",
            Element::S => "S",
            Element::Cl => "Cl",
            Element::K => "K",
            Element::Ca => "Ca",
            Element::Mn => "Mn",
            Element::Fe => "Fe",
            Element::Co => "Co",
            Element::Ni => "Ni",
            Element::Cu => "Cu",
            Element::Zn => "Zn",
            Element::Se => "Se",
            Element::Br => "Br",
            Element::I => "I",
            Element::Unknown => "Unknown",
        }
    }

    pub fn atomic_number(&self) -> u8 {
        *self as u8
    }

    pub fn is_heavy_atom(&self) -> bool {
        !matches!(self, Element::H)
    }

    /// Single-bond covalent radius in ångströms (Cordero et al., 2008).
    pub fn covalent_radius(&self) -> f64 {
        match self {
            Element::H => 0.31,
            Element::B => 0.84,
            Element::C => 0.76,
            Element::N => 0.71,
            Element::O => 0.66,
            Element::F => 0.57,
            Element::Na => 1.66,
            Element::Mg => 1.41,
            Element::P => 1.07,
            Element::S => 1.05,
            Element::Cl => 1.02,
            Element::K => 2.03,
            Element::Ca => 1.76,
            Element::Mn => 1.39,
            Element::Fe => 1.32,
            Element::Co => 1.26,
            Element::Ni => 1.24,
            Element::Cu => 1.32,
            Element::Zn => 1.22,
            Element::Se => 1.20,
            Element::Br => 1.20,
            Element::I => 1.39,
            Element::Unknown => 1.50,
        }
    }

    /// Number of bonds the neutral element forms in organic chemistry.
    ///
    /// Metals and unknown elements report zero, so capping never adds hydrogens to them.
    pub fn default_valence(&self) -> u8 {
        match self {
            Element::H | Element::F | Element::Cl | Element::Br | Element::I => 1,
            Element::O | Element::S | Element::Se => 2,
            Element::B | Element::N | Element::P => 3,
            Element::C => 4,
            _ => 0,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Element {
    type Err = String;

    /// Parses an element symbol regardless of letter case (`"FE"`, `"Fe"` and `"fe"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let normalized: String = match chars.next() {
            Some(first) => std::iter::once(first.to_ascii_uppercase())
                .chain(chars.map(|c| c.to_ascii_lowercase()))
                .collect(),
            None => return Err("Empty element symbol".to_string()),
        };

        match normalized.as_str() {
            "H" | "D" => Ok(Element::H),
            "B" => Ok(Element::B),
            "C" => Ok(Element::C),
            "N" => Ok(Element::N),
            "O" => Ok(Element::O),
            "F" => Ok(Element::F),
            "Na" => Ok(Element::Na),
            "Mg" => Ok(Element::Mg),
            "P" => Ok(Element::P),
            "S" => Ok(Element::S),
            "Cl" => Ok(Element::Cl),
            "K" => Ok(Element::K),
            "Ca" => Ok(Element::Ca),
            "Mn" => Ok(Element::Mn),
            "Fe" => Ok(Element::Fe),
            "Co" => Ok(Element::Co),
            "Ni" => Ok(Element::Ni),
            "Cu" => Ok(Element::Cu),
            "Zn" => Ok(Element::Zn),
            "Se" => Ok(Element::Se),
            "Br" => Ok(Element::Br),
            "I" => Ok(Element::I),
            _ => Err(format!("Invalid element symbol: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_symbol_returns_correct_value() {
        assert_eq!(Element::H.symbol(), "H");
        assert_eq!(Element::C.symbol(), "C");
        assert_eq!(Element::Fe.symbol(), "Fe");
        assert_eq!(Element::Unknown.symbol(), "Unknown");
    }

    #[test]
    fn element_from_str_ignores_letter_case() {
        assert_eq!(Element::from_str("C").unwrap(), Element::C);
        assert_eq!(Element::from_str("FE").unwrap(), Element::Fe);
        assert_eq!(Element::from_str("se").unwrap(), Element::Se);
        assert_eq!(Element::from_str(" N ").unwrap(), Element::N);
        assert_eq!(Element::from_str("D").unwrap(), Element::H);
    }

    #[test]
    fn element_from_str_rejects_unknown_symbols() {
        assert!(Element::from_str("Zz").is_err());
        assert!(Element::from_str("").is_err());
        assert!(Element::from_str("HB").is_err());
    }

    #[test]
    fn element_atomic_number_matches_discriminant() {
        assert_eq!(Element::H.atomic_number(), 1);
        assert_eq!(Element::S.atomic_number(), 16);
        assert_eq!(Element::Unknown.atomic_number(), 0);
    }

    #[test]
    fn element_default_valence_covers_organic_subset() {
        assert_eq!(Element::C.default_valence(), 4);
        assert_eq!(Element::N.default_valence(), 3);
        assert_eq!(Element::O.default_valence(), 2);
        assert_eq!(Element::S.default_valence(), 2);
        assert_eq!(Element::H.default_valence(), 1);
        assert_eq!(Element::Zn.default_valence(), 0);
    }

    #[test]
    fn element_is_heavy_atom_identifies_correctly() {
        assert!(!Element::H.is_heavy_atom());
        assert!(Element::C.is_heavy_atom());
        assert!(Element::Unknown.is_heavy_atom());
    }

    #[test]
    fn bond_order_value_returns_correct_f64() {
        assert_eq!(BondOrder::Single.value(), 1.0);
        assert_eq!(BondOrder::Double.value(), 2.0);
        assert_eq!(BondOrder::Triple.value(), 3.0);
        assert_eq!(BondOrder::Aromatic.value(), 1.5);
    }

    #[test]
    fn bond_order_from_symbol_maps_line_notation() {
        assert_eq!(BondOrder::from_symbol('-'), Some(BondOrder::Single));
        assert_eq!(BondOrder::from_symbol('='), Some(BondOrder::Double));
        assert_eq!(BondOrder::from_symbol('#'), Some(BondOrder::Triple));
        assert_eq!(BondOrder::from_symbol(':'), Some(BondOrder::Aromatic));
        assert_eq!(BondOrder::from_symbol('~'), None);
    }

    #[test]
    fn bond_order_from_str_parses_valid_inputs() {
        assert_eq!(BondOrder::from_str("1").unwrap(), BondOrder::Single);
        assert_eq!(BondOrder::from_str("double").unwrap(), BondOrder::Double);
        assert_eq!(BondOrder::from_str("Triple").unwrap(), BondOrder::Triple);
        assert_eq!(BondOrder::from_str("1.5").unwrap(), BondOrder::Aromatic);
        assert!(BondOrder::from_str("4").is_err());
    }

    #[test]
    fn bond_order_display_formats_correctly() {
        assert_eq!(format!("{}", BondOrder::Single), "1");
        assert_eq!(format!("{}", BondOrder::Aromatic), "1.5");
    }
}
