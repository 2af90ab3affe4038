//! Residue identifiers and link-point addresses.
//!
//! A [`ResidueId`] combines chain, sequence number and insertion code and renders as
//! `"<chain>:<number><icode>"` (for example `"A:82A"` or `":15"` for a blank chain). Every
//! cross-residue reference in the crate goes through these identifiers instead of pointers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chain, sequence number and optional insertion code of one residue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueId {
    /// Chain identifier; empty when the input left the column blank.
    pub chain: SmolStr,
    /// Residue sequence number.
    pub number: i32,
    /// Insertion code distinguishing residues that share a sequence number.
    pub icode: Option<char>,
}

impl ResidueId {
    /// Creates a new identifier.
    ///
    /// # Arguments
    ///
    /// * `chain` - Chain label, may be empty.
    /// * `number` - Residue sequence number.
    /// * `icode` - Optional insertion code.
    pub fn new(chain: &str, number: i32, icode: Option<char>) -> Self {
        Self {
            chain: SmolStr::new(chain),
            number,
            icode,
        }
    }

    /// Reports whether `next` continues the numbering of `self` on the same chain.
    ///
    /// Numbering is contiguous when `next` carries the same sequence number with a different
    /// insertion code (`82` then `82A`) or the following sequence number (`82C` then `83`).
    /// Input order is trusted to place insertion codes correctly.
    ///
    /// # Arguments
    ///
    /// * `next` - Identifier of the residue that follows `self` in the input.
    ///
    /// # Returns
    ///
    /// `true` when a backbone bond between the two residues is sequence-plausible.
    pub fn is_followed_by(&self, next: &ResidueId) -> bool {
        if self.chain != next.chain {
            return false;
        }
        if self.number == next.number {
            return self.icode != next.icode;
        }
        self.number.checked_add(1) == Some(next.number)
    }
}

impl fmt::Display for ResidueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain, self.number)?;
        if let Some(icode) = self.icode {
            write!(f, "{}", icode)?;
        }
        Ok(())
    }
}

/// Error returned when a residue identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid residue identifier '{input}': {reason}")]
pub struct ParseResidueIdError {
    input: String,
    reason: &'static str,
}

impl FromStr for ResidueId {
    type Err = ParseResidueIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseResidueIdError {
            input: s.to_string(),
            reason,
        };

        let (chain, rest) = s.rsplit_once(':').ok_or_else(|| fail("missing ':' separator"))?;
        let rest = rest.trim();

        let (digits, icode) = match rest.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => (&rest[..rest.len() - 1], Some(c)),
            Some(_) => (rest, None),
            None => return Err(fail("missing residue number")),
        };

        let number = digits
            .parse::<i32>()
            .map_err(|_| fail("residue number is not an integer"))?;

        Ok(ResidueId::new(chain.trim(), number, icode))
    }
}

impl Serialize for ResidueId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResidueId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Address of one link point: a residue plus the link label inside its template.
///
/// Link labels are the template atom index of the attachment atom, so a standard amino acid
/// exposes label `0` (`N`) for the preceding residue and label `2` (`C`) for the following one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkEnd {
    pub residue: ResidueId,
    pub label: usize,
}

impl LinkEnd {
    pub fn new(residue: ResidueId, label: usize) -> Self {
        Self { residue, label }
    }
}

impl fmt::Display for LinkEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.residue, self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_id_display_includes_insertion_code() {
        assert_eq!(ResidueId::new("A", 82, None).to_string(), "A:82");
        assert_eq!(ResidueId::new("B", 82, Some('A')).to_string(), "B:82A");
        assert_eq!(ResidueId::new("", 15, None).to_string(), ":15");
    }

    #[test]
    fn residue_id_parses_chain_number_and_icode() {
        let id: ResidueId = "B:82C".parse().unwrap();
        assert_eq!(id.chain, "B");
        assert_eq!(id.number, 82);
        assert_eq!(id.icode, Some('C'));

        let blank: ResidueId = ":15".parse().unwrap();
        assert_eq!(blank.chain, "");
        assert_eq!(blank.number, 15);
        assert_eq!(blank.icode, None);

        let negative: ResidueId = "A:-3".parse().unwrap();
        assert_eq!(negative.number, -3);
    }

    #[test]
    fn residue_id_parse_and_display_round_trip() {
        for text in ["A:1", "B:82A", ":15", "XY:1000Z"] {
            let id: ResidueId = text.parse().unwrap();
            assert_eq!(id.to_string(), text);
        }
    }

    #[test]
    fn residue_id_rejects_malformed_text() {
        assert!("A82".parse::<ResidueId>().is_err());
        assert!("A:".parse::<ResidueId>().is_err());
        assert!("A:x1".parse::<ResidueId>().is_err());
    }

    #[test]
    fn is_followed_by_accepts_insertion_codes_and_increments() {
        let r82 = ResidueId::new("B", 82, None);
        let r82a = ResidueId::new("B", 82, Some('A'));
        let r82c = ResidueId::new("B", 82, Some('C'));
        let r83 = ResidueId::new("B", 83, None);

        assert!(r82.is_followed_by(&r82a));
        assert!(r82c.is_followed_by(&r83));
        assert!(!r82.is_followed_by(&r82));
        assert!(!r82.is_followed_by(&ResidueId::new("B", 84, None)));
        assert!(!r82.is_followed_by(&ResidueId::new("C", 83, None)));
    }

    #[test]
    fn residue_id_serializes_as_string() {
        let id = ResidueId::new("A", 264, None);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"A:264\"");
        let back: ResidueId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn link_end_display_names_residue_and_label() {
        let end = LinkEnd::new(ResidueId::new("A", 1, None), 0);
        assert_eq!(end.to_string(), "A:1#0");
    }
}
