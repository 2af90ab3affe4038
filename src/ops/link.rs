//! Inter-residue link planning and blunt-end validation.
//!
//! Links are planned before matching so the roles they need (previous, next, disulfide) can
//! restrict each residue's candidates, then realized as labelled bonds once every residue has
//! a template. Link points left open afterwards must be declared as blunt ends.

use super::config::Directives;
use super::error::Error;
use super::extract::RawResidue;
use crate::model::chorizo::{BondKind, InterResidueBond};
use crate::model::grid::Grid;
use crate::model::id::LinkEnd;
use crate::model::residue::Residue;
use crate::model::template::{LinkRole, ResidueTemplate};
use crate::model::types::Point;
use crate::templates::TemplateLibrary;
use std::collections::BTreeSet;

/// A bond the builder intends to create between two residues, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLink {
    pub first: usize,
    pub second: usize,
    pub kind: BondKind,
}

impl PlannedLink {
    /// Role each side must provide: `(first, second)`.
    pub fn roles(&self) -> (LinkRole, LinkRole) {
        match self.kind {
            BondKind::Backbone => (LinkRole::Next, LinkRole::Previous),
            BondKind::Disulfide => (LinkRole::Disulfide, LinkRole::Disulfide),
        }
    }

    pub fn involves(&self, index: usize) -> bool {
        self.first == index || self.second == index
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPlan {
    pub links: Vec<PlannedLink>,
}

impl LinkPlan {
    /// Roles the planned links demand from residue `index`, sorted and deduplicated.
    pub fn required_roles(&self, index: usize) -> Vec<LinkRole> {
        self.binding_roles(index, |_| true)
    }

    /// Like [`LinkPlan::required_roles`], counting only links whose partner satisfies `binds`.
    ///
    /// A link toward a residue that can never be valid (no template answers to its name)
    /// must not constrain the other side; it is left blunt once matching is done.
    pub fn binding_roles(&self, index: usize, binds: impl Fn(usize) -> bool) -> Vec<LinkRole> {
        let mut roles: Vec<LinkRole> = self
            .links
            .iter()
            .filter_map(|l| {
                let (a, b) = l.roles();
                if l.first == index && binds(l.second) {
                    Some(a)
                } else if l.second == index && binds(l.first) {
                    Some(b)
                } else {
                    None
                }
            })
            .collect();
        roles.sort();
        roles.dedup();
        roles
    }

    pub fn has_disulfide(&self, index: usize) -> bool {
        self.links
            .iter()
            .any(|l| l.kind == BondKind::Disulfide && l.involves(index))
    }
}

/// Detected sulfur contact between two cysteine-class residues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisulfideContact {
    pub first: usize,
    pub second: usize,
    pub distance: f64,
}

/// Sulfur position of a residue whose name (or override) admits a disulfide template.
fn disulfide_anchor(
    residue: &RawResidue,
    forced: Option<&ResidueTemplate>,
    library: &TemplateLibrary,
) -> Option<Point> {
    library
        .candidates(&residue.name)
        .chain(forced)
        .filter_map(|t| t.link_for_role(LinkRole::Disulfide).map(|l| &t.atoms()[l.atom].name))
        .find_map(|name| residue.atoms.iter().find(|a| &a.name == name))
        .map(|a| a.pos)
}

/// Finds sulfur contacts within `cutoff`, pairing each residue at most once.
///
/// Pairs are taken closest first; a residue already paired is skipped for farther partners.
pub fn find_disulfides(
    residues: &[RawResidue],
    forced: &[Option<&ResidueTemplate>],
    library: &TemplateLibrary,
    cutoff: f64,
) -> Vec<DisulfideContact> {
    let anchors: Vec<(Point, usize)> = residues
        .iter()
        .enumerate()
        .filter_map(|(i, r)| disulfide_anchor(r, forced[i], library).map(|p| (p, i)))
        .collect();
    if anchors.len() < 2 || !(cutoff.is_finite() && cutoff > 0.0) {
        return Vec::new();
    }

    let grid = Grid::new(anchors.iter().copied(), cutoff);
    let mut contacts: Vec<DisulfideContact> = Vec::new();
    for (pos, i) in &anchors {
        for (other_pos, j) in grid.within(pos, cutoff) {
            if j > i {
                contacts.push(DisulfideContact {
                    first: *i,
                    second: *j,
                    distance: nalgebra::distance(pos, other_pos),
                });
            }
        }
    }
    contacts.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then(a.first.cmp(&b.first))
            .then(a.second.cmp(&b.second))
    });

    let mut paired = vec![false; residues.len()];
    contacts.retain(|c| {
        if paired[c.first] || paired[c.second] {
            return false;
        }
        paired[c.first] = true;
        paired[c.second] = true;
        true
    });
    contacts
}

/// Plans backbone bonds between input-consecutive residues with contiguous numbering.
///
/// `linkable[i]` tells whether residue `i` has any candidate offering `(next, previous)`.
/// `link_atoms[i]` gives the positions of its `(next, previous)` link atoms for the optional
/// distance check.
pub fn plan_backbone(
    residues: &[RawResidue],
    linkable: &[(bool, bool)],
    link_atoms: &[(Option<Point>, Option<Point>)],
    directives: &Directives,
) -> Vec<PlannedLink> {
    let mut links = Vec::new();
    for i in 1..residues.len() {
        let (a, b) = (&residues[i - 1], &residues[i]);
        if !a.id.is_followed_by(&b.id) || !linkable[i - 1].0 || !linkable[i].1 {
            continue;
        }
        if directives.bond_deleted(&a.id, &b.id) {
            log::debug!("Backbone bond {} - {} removed by directive", a.id, b.id);
            continue;
        }
        if let Some(cutoff) = directives.backbone_cutoff {
            let close = match (link_atoms[i - 1].0, link_atoms[i].1) {
                (Some(c), Some(n)) => nalgebra::distance(&c, &n) <= cutoff,
                _ => false,
            };
            if !close {
                log::debug!("Residues {} and {} are too far apart for a peptide bond", a.id, b.id);
                continue;
            }
        }
        links.push(PlannedLink {
            first: i - 1,
            second: i,
            kind: BondKind::Backbone,
        });
    }
    links
}

/// Turns planned links into labelled bonds between valid residues.
///
/// # Returns
///
/// The bonds, plus the link points of valid residues whose planned partner ended up ignored.
pub fn realize_links(
    plan: &LinkPlan,
    residues: &[Residue],
    library: &TemplateLibrary,
) -> (Vec<InterResidueBond>, Vec<LinkEnd>) {
    let mut bonds = Vec::new();
    let mut facing_ignored = Vec::new();

    let end_of = |index: usize, role: LinkRole| -> Option<LinkEnd> {
        let residue = &residues[index];
        let template = library.get(residue.template_key()?)?;
        let link = template.link_for_role(role)?;
        Some(LinkEnd::new(residue.id().clone(), link.label()))
    };

    for link in &plan.links {
        let (role_a, role_b) = link.roles();
        match (end_of(link.first, role_a), end_of(link.second, role_b)) {
            (Some(a), Some(b)) => bonds.push(InterResidueBond::new(a, b, link.kind)),
            (Some(open), None) | (None, Some(open)) => facing_ignored.push(open),
            (None, None) => {}
        }
    }
    (bonds, facing_ignored)
}

/// Checks every open link point against the declared blunt ends.
///
/// Declarations on missing or ignored residues, on labels that are not link points, or on
/// bonded points are dropped with a warning. Open points facing an ignored residue become
/// blunt implicitly.
///
/// # Errors
///
/// [`Error::DanglingValence`] listing every open, undeclared link point.
pub fn validate_blunt_ends(
    residues: &[Residue],
    bonds: &[InterResidueBond],
    declared: &BTreeSet<LinkEnd>,
    facing_ignored: &[LinkEnd],
    library: &TemplateLibrary,
) -> Result<BTreeSet<LinkEnd>, Error> {
    let bonded: BTreeSet<&LinkEnd> = bonds.iter().flat_map(|b| b.ends.iter()).collect();
    let template_of = |end: &LinkEnd| {
        residues
            .iter()
            .find(|r| r.id() == &end.residue)
            .and_then(|r| r.template_key())
            .and_then(|key| library.get(key))
    };

    let mut blunt = BTreeSet::new();
    for end in declared {
        match template_of(end) {
            None => log::warn!("Blunt end {} is not on a valid residue; ignoring it", end),
            Some(t) if t.link(end.label).is_none() => {
                log::warn!("Blunt end {} names no link point of {}; ignoring it", end, t.name())
            }
            Some(_) if bonded.contains(end) => {
                log::warn!("Blunt end {} is bonded; ignoring it", end)
            }
            Some(_) => {
                blunt.insert(end.clone());
            }
        }
    }

    for end in facing_ignored {
        if !blunt.contains(end) {
            log::warn!("Link point {} faces an ignored residue and is left blunt", end);
            blunt.insert(end.clone());
        }
    }

    let mut dangling = Vec::new();
    for residue in residues.iter().filter(|r| r.is_valid()) {
        let Some(template) = residue.template_key().and_then(|k| library.get(k)) else {
            continue;
        };
        for link in template.links() {
            let end = LinkEnd::new(residue.id().clone(), link.label());
            if !bonded.contains(&end) && !blunt.contains(&end) {
                dangling.push(end);
            }
        }
    }

    if dangling.is_empty() {
        Ok(blunt)
    } else {
        Err(Error::DanglingValence { ends: dangling })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Element;
    use crate::ops::matcher::resolve;
    use crate::testing::{raw_residue, residue_from_template, rid};
    use crate::templates;

    fn sulfur(id: &str, res_name: &str, x: f64) -> RawResidue {
        let mut residue = raw_residue(res_name, rid(id), &[("SG", Element::S)]);
        residue.atoms[0].pos = Point::new(x, 0.0, 0.0);
        residue
    }

    fn link(first: usize, second: usize, kind: BondKind) -> PlannedLink {
        PlannedLink {
            first,
            second,
            kind,
        }
    }

    #[test]
    fn required_roles_follow_bond_sides() {
        let plan = LinkPlan {
            links: vec![
                link(0, 1, BondKind::Backbone),
                link(1, 2, BondKind::Backbone),
                link(1, 5, BondKind::Disulfide),
            ],
        };
        assert_eq!(plan.required_roles(0), vec![LinkRole::Next]);
        assert_eq!(
            plan.required_roles(1),
            vec![LinkRole::Previous, LinkRole::Next, LinkRole::Disulfide]
        );
        assert!(plan.has_disulfide(5));
        assert!(!plan.has_disulfide(0));
    }

    #[test]
    fn binding_roles_skip_partners_that_cannot_bond() {
        let plan = LinkPlan {
            links: vec![link(0, 1, BondKind::Backbone), link(1, 2, BondKind::Backbone)],
        };
        let binds = |partner: usize| partner != 2;

        assert_eq!(plan.binding_roles(1, binds), vec![LinkRole::Previous]);
        assert_eq!(plan.binding_roles(0, binds), vec![LinkRole::Next]);
        assert_eq!(plan.binding_roles(2, binds), vec![LinkRole::Previous]);
    }

    #[test]
    fn disulfides_pair_nearest_partners_once() {
        let library = templates::bundled();
        let residues = vec![
            sulfur("A:1", "CYS", 0.0),
            sulfur("A:2", "CYS", 2.0),
            sulfur("A:3", "CYS", 3.5),
            sulfur("A:4", "ALA", 3.6),
        ];
        let contacts = find_disulfides(&residues, &[None; 4], &library, 2.5);

        assert_eq!(contacts.len(), 1);
        assert_eq!((contacts[0].first, contacts[0].second), (1, 2));
        assert!((contacts[0].distance - 1.5).abs() < 1e-9);
    }

    #[test]
    fn disulfide_search_respects_cutoff() {
        let library = templates::bundled();
        let residues = vec![sulfur("A:1", "CYX", 0.0), sulfur("A:9", "CYX", 2.6)];
        assert!(find_disulfides(&residues, &[None, None], &library, 2.5).is_empty());
        assert_eq!(find_disulfides(&residues, &[None, None], &library, 3.0).len(), 1);
    }

    #[test]
    fn backbone_requires_contiguous_numbering_and_linkable_sides() {
        let residues: Vec<RawResidue> = ["A:1", "A:2", "A:2A", "A:4", "B:5"]
            .iter()
            .map(|id| raw_residue("ALA", rid(id), &[]))
            .collect();
        let linkable = vec![(true, true); 5];
        let atoms = vec![(None, None); 5];

        let links = plan_backbone(&residues, &linkable, &atoms, &Directives::default());
        let pairs: Vec<(usize, usize)> = links.iter().map(|l| (l.first, l.second)).collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);

        let mut blocked = linkable.clone();
        blocked[1] = (false, true);
        let links = plan_backbone(&residues, &blocked, &atoms, &Directives::default());
        assert_eq!(links.len(), 1);
        assert_eq!((links[0].first, links[0].second), (0, 1));
    }

    #[test]
    fn backbone_cutoff_checks_link_atom_distance() {
        let residues: Vec<RawResidue> = ["A:1", "A:2"]
            .iter()
            .map(|id| raw_residue("ALA", rid(id), &[]))
            .collect();
        let linkable = vec![(true, true); 2];
        let atoms = vec![
            (Some(Point::new(0.0, 0.0, 0.0)), None),
            (None, Some(Point::new(1.3, 0.0, 0.0))),
        ];
        let mut directives = Directives {
            backbone_cutoff: Some(2.0),
            ..Default::default()
        };
        assert_eq!(plan_backbone(&residues, &linkable, &atoms, &directives).len(), 1);
        directives.backbone_cutoff = Some(1.0);
        assert!(plan_backbone(&residues, &linkable, &atoms, &directives).is_empty());
    }

    #[test]
    fn open_links_must_be_declared() {
        let library = templates::bundled();
        let ala = library.get("ALA").unwrap();
        let residue = resolve(residue_from_template(ala, "ALA", rid("A:1"), false), ala, false);
        let residues = vec![residue];

        match validate_blunt_ends(&residues, &[], &BTreeSet::new(), &[], &library) {
            Err(Error::DanglingValence { ends }) => {
                assert_eq!(ends, vec![LinkEnd::new(rid("A:1"), 0), LinkEnd::new(rid("A:1"), 2)]);
            }
            other => panic!("expected dangling valence, got {:?}", other),
        }

        let declared: BTreeSet<LinkEnd> =
            [LinkEnd::new(rid("A:1"), 0), LinkEnd::new(rid("A:1"), 2)].into_iter().collect();
        let blunt = validate_blunt_ends(&residues, &[], &declared, &[], &library).unwrap();
        assert_eq!(blunt.len(), 2);
    }

    #[test]
    fn bogus_declarations_are_dropped_and_ignored_partners_are_implicit() {
        let library = templates::bundled();
        let ala = library.get("ALA").unwrap();
        let residue = resolve(residue_from_template(ala, "ALA", rid("A:1"), false), ala, false);
        let residues = vec![residue];

        let declared: BTreeSet<LinkEnd> = [
            LinkEnd::new(rid("A:1"), 0),
            LinkEnd::new(rid("A:1"), 4),
            LinkEnd::new(rid("A:9"), 0),
        ]
        .into_iter()
        .collect();
        let facing = [LinkEnd::new(rid("A:1"), 2)];

        let blunt = validate_blunt_ends(&residues, &[], &declared, &facing, &library).unwrap();
        let expected: BTreeSet<LinkEnd> =
            [LinkEnd::new(rid("A:1"), 0), LinkEnd::new(rid("A:1"), 2)].into_iter().collect();
        assert_eq!(blunt, expected);
    }
}
