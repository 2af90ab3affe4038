//! Raw atom records as delivered by coordinate readers.
//!
//! A [`RawAtom`] is the unit of input for the builder: one line of a coordinate file with its
//! residue address, alternate-location code and hetero flag still attached. No chemistry has
//! been applied yet; residue grouping and template matching happen downstream.

use super::id::ResidueId;
use super::types::{Element, Point};
use smol_str::SmolStr;
use std::fmt;

/// One atom record prior to residue grouping and altloc selection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAtom {
    /// Serial number from the source file (informational only).
    pub serial: u32,
    /// Atom name as it appears in the source (e.g., `CA`, `HZ3`).
    pub name: SmolStr,
    /// Chemical element, taken from the element column or inferred from the name.
    pub element: Element,
    /// Cartesian coordinates measured in ångströms.
    pub pos: Point,
    /// Alternate-location code, `None` when the column is blank.
    pub altloc: Option<char>,
    /// Residue name column (e.g., `HIS`, `CYX`, `NMET`).
    pub res_name: SmolStr,
    /// Chain, sequence number and insertion code of the owning residue.
    pub res_id: ResidueId,
    /// Whether the record came from a `HETATM` line.
    pub is_hetatm: bool,
}

impl RawAtom {
    /// Creates a record without altloc or hetero flag.
    ///
    /// # Arguments
    ///
    /// * `name` - Atom label such as `"CA"` or `"OXT"`.
    /// * `element` - Chemical identity.
    /// * `pos` - Cartesian coordinates in ångströms.
    /// * `res_name` - Residue name column.
    /// * `res_id` - Residue address.
    ///
    /// # Returns
    ///
    /// A record with serial `0`; readers overwrite it with the file serial.
    pub fn new(
        name: &str,
        element: Element,
        pos: Point,
        res_name: &str,
        res_id: ResidueId,
    ) -> Self {
        Self {
            serial: 0,
            name: SmolStr::new(name),
            element,
            pos,
            altloc: None,
            res_name: SmolStr::new(res_name),
            res_id,
            is_hetatm: false,
        }
    }

    /// Returns a copy tagged with an alternate-location code.
    pub fn with_altloc(mut self, altloc: char) -> Self {
        self.altloc = Some(altloc);
        self
    }

    pub fn distance(&self, other: &RawAtom) -> f64 {
        nalgebra::distance(&self.pos, &other.pos)
    }

    /// Translates the atom by an arbitrary vector in ångströms.
    pub fn translate_by(&mut self, vector: &nalgebra::Vector3<f64>) {
        self.pos += vector;
    }
}

impl fmt::Display for RawAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RawAtom {{ name: \"{}\", residue: {} {}, element: {}, pos: [{:.3}, {:.3}, {:.3}] }}",
            self.name, self.res_name, self.res_id, self.element, self.pos.x, self.pos.y, self.pos.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, pos: Point) -> RawAtom {
        RawAtom::new(name, Element::C, pos, "ALA", ResidueId::new("A", 1, None))
    }

    #[test]
    fn raw_atom_new_has_no_altloc() {
        let atom = sample("CA", Point::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "CA");
        assert_eq!(atom.res_name, "ALA");
        assert_eq!(atom.altloc, None);
        assert!(!atom.is_hetatm);
    }

    #[test]
    fn with_altloc_sets_code() {
        let atom = sample("OG", Point::origin()).with_altloc('B');
        assert_eq!(atom.altloc, Some('B'));
    }

    #[test]
    fn distance_calculates_correctly() {
        let a = sample("A", Point::new(0.0, 0.0, 0.0));
        let b = sample("B", Point::new(3.0, 4.0, 0.0));
        assert!((a.distance(&b) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn translate_by_moves_position() {
        let mut atom = sample("CA", Point::new(1.0, 2.0, 3.0));
        atom.translate_by(&nalgebra::Vector3::new(0.5, -1.0, 2.5));

        assert!((atom.pos.x - 1.5).abs() < 1e-10);
        assert!((atom.pos.y - 1.0).abs() < 1e-10);
        assert!((atom.pos.z - 5.5).abs() < 1e-10);
    }

    #[test]
    fn display_includes_residue_address() {
        let atom = sample("CA", Point::new(1.234, -5.678, 9.012));
        assert_eq!(
            atom.to_string(),
            "RawAtom { name: \"CA\", residue: ALA A:1, element: C, pos: [1.234, -5.678, 9.012] }"
        );
    }
}
