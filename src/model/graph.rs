//! Arena-backed molecular graphs.
//!
//! Atoms live in one contiguous vector and bonds refer to them by index. The same type serves
//! the authentic per-residue graph and the padded graph handed to the preparation stage; the
//! [`PaddedMolecule`] wrapper adds the padded-to-authentic index table and ignore flags.

use super::types::{BondOrder, Element, Point};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphAtom {
    pub name: SmolStr,
    pub element: Element,
    pub pos: Point,
    pub formal_charge: i32,
    /// Hydrogens implied by the chemistry but absent from the coordinates.
    pub implicit_hydrogens: u8,
}

impl GraphAtom {
    pub fn new(name: &str, element: Element, pos: Point, formal_charge: i32) -> Self {
        Self {
            name: SmolStr::new(name),
            element,
            pos,
            formal_charge,
            implicit_hydrogens: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphBond {
    pub a: usize,
    pub b: usize,
    pub order: BondOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MolGraph {
    atoms: Vec<GraphAtom>,
    bonds: Vec<GraphBond>,
}

impl MolGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, atom: GraphAtom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    pub fn add_bond(&mut self, a: usize, b: usize, order: BondOrder) {
        debug_assert!(
            a < self.atoms.len() && b < self.atoms.len() && a != b,
            "bond ({a}, {b}) is out of range for a graph with {} atoms",
            self.atoms.len()
        );
        self.bonds.push(GraphBond { a, b, order });
    }

    pub fn atoms(&self) -> &[GraphAtom] {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut [GraphAtom] {
        &mut self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&GraphAtom> {
        self.atoms.get(index)
    }

    pub fn bonds(&self) -> &[GraphBond] {
        &self.bonds
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.atoms.iter().position(|a| a.name == name)
    }

    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (usize, BondOrder)> + '_ {
        self.bonds.iter().filter_map(move |b| {
            if b.a == index {
                Some((b.b, b.order))
            } else if b.b == index {
                Some((b.a, b.order))
            } else {
                None
            }
        })
    }

    /// Sum of bond orders around an atom, aromatic bonds counting 1.5.
    pub fn bond_order_sum(&self, index: usize) -> f64 {
        self.neighbors(index).map(|(_, order)| order.value()).sum()
    }

    /// Explicit hydrogen neighbours plus implicit hydrogens.
    pub fn hydrogen_count(&self, index: usize) -> usize {
        let explicit = self
            .neighbors(index)
            .filter(|(n, _)| self.atoms[*n].element == Element::H)
            .count();
        explicit + self.atoms[index].implicit_hydrogens as usize
    }

    pub fn net_formal_charge(&self) -> i32 {
        self.atoms.iter().map(|a| a.formal_charge).sum()
    }
}

/// Residue graph augmented with capping atoms from bonded neighbours.
///
/// The leading block of `graph` holds the authentic atoms in their own order, so
/// `authentic_index[i] == Some(i)` there; every capping atom maps to `None` and is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedMolecule {
    pub graph: MolGraph,
    pub authentic_index: Vec<Option<usize>>,
    pub ignore: Vec<bool>,
}

impl PaddedMolecule {
    /// Wraps an authentic graph with an identity index map and nothing ignored.
    pub fn from_authentic(graph: MolGraph) -> Self {
        let n = graph.len();
        Self {
            graph,
            authentic_index: (0..n).map(Some).collect(),
            ignore: vec![false; n],
        }
    }

    /// Appends a capping atom, which is never mapped and always ignored.
    pub fn add_padding_atom(&mut self, atom: GraphAtom) -> usize {
        let index = self.graph.add_atom(atom);
        self.authentic_index.push(None);
        self.ignore.push(true);
        index
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn is_padding(&self, index: usize) -> bool {
        matches!(self.authentic_index.get(index), Some(None))
    }

    /// Iterates `(padded_index, authentic_index)` pairs of the authentic block.
    pub fn authentic_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.authentic_index
            .iter()
            .enumerate()
            .filter_map(|(padded, authentic)| authentic.map(|a| (padded, a)))
    }

    pub fn padding_count(&self) -> usize {
        self.authentic_index.iter().filter(|i| i.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol_fragment() -> MolGraph {
        let mut graph = MolGraph::new();
        let c1 = graph.add_atom(GraphAtom::new("C1", Element::C, Point::origin(), 0));
        let c2 = graph.add_atom(GraphAtom::new("C2", Element::C, Point::new(1.5, 0.0, 0.0), 0));
        let o = graph.add_atom(GraphAtom::new("O", Element::O, Point::new(2.0, 1.4, 0.0), 0));
        let h = graph.add_atom(GraphAtom::new("HO", Element::H, Point::new(2.9, 1.4, 0.0), 0));
        graph.add_bond(c1, c2, BondOrder::Single);
        graph.add_bond(c2, o, BondOrder::Single);
        graph.add_bond(o, h, BondOrder::Single);
        graph.atoms_mut()[c1].implicit_hydrogens = 3;
        graph
    }

    #[test]
    fn neighbors_and_bond_order_sum() {
        let graph = ethanol_fragment();
        let around_c2: Vec<usize> = graph.neighbors(1).map(|(i, _)| i).collect();
        assert_eq!(around_c2, vec![0, 2]);
        assert_eq!(graph.bond_order_sum(1), 2.0);
        assert_eq!(graph.position_of("O"), Some(2));
    }

    #[test]
    fn hydrogen_count_includes_implicit_hydrogens() {
        let graph = ethanol_fragment();
        assert_eq!(graph.hydrogen_count(0), 3);
        assert_eq!(graph.hydrogen_count(2), 1);
        assert_eq!(graph.hydrogen_count(1), 0);
    }

    #[test]
    fn padded_molecule_maps_authentic_block_only() {
        let graph = ethanol_fragment();
        let mut padded = PaddedMolecule::from_authentic(graph);
        let cap = padded.add_padding_atom(GraphAtom::new("CX", Element::C, Point::origin(), 0));

        assert_eq!(padded.len(), 5);
        assert_eq!(padded.padding_count(), 1);
        assert!(padded.is_padding(cap));
        assert!(padded.ignore[cap]);
        assert!(!padded.is_padding(0));
        assert_eq!(padded.authentic_pairs().count(), 4);
        assert!(padded.authentic_pairs().all(|(p, a)| p == a));
    }
}
