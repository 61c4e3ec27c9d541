//! Which nodes and routes a transform wants to see

use crate::scene::Node;

/// Matches every node
pub const ALL: &str = "All";
/// Expands to [`COORDINATE_OWNERS`]
pub const COORDINATE_OWNER: &str = "CoordinateOwner";
/// Expands to [`INTERPOLATORS`]
pub const INTERPOLATOR: &str = "Interpolator";
/// Restricts matching to `DEF` occurrences
pub const DEF: &str = "DEF";

pub const COORDINATE_OWNERS: [&str; 2] = ["IndexedFaceSet", "IndexedLineSet"];

pub const INTERPOLATORS: [&str; 6] = [
    "ColorInterpolator",
    "CoordinateInterpolator",
    "NormalInterpolator",
    "OrientationInterpolator",
    "PositionInterpolator",
    "ScalarInterpolator",
];

/// Node and route interest declared by a transform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchCriteria {
    /// Node type names or the pseudo-categories above
    names: Vec<&'static str>,
    def_only: bool,
    /// Report `USE` nodes too, typed by their target
    def_use: bool,
    routes: bool,
    /// Descend into PROTO bodies
    proto_interior: bool,
}

impl MatchCriteria {
    /// Interested in nothing; the transform works from the token stream
    pub fn none() -> Self {
        Self::default()
    }

    pub fn nodes(names: &[&'static str]) -> Self {
        let mut criteria = Self::default();
        for &name in names {
            if name == DEF {
                criteria.def_only = true;
            } else {
                criteria.names.push(name);
            }
        }
        criteria
    }

    pub fn all() -> Self {
        Self::nodes(&[ALL])
    }

    pub fn with_def_use(mut self) -> Self {
        self.def_use = true;
        self
    }

    pub fn with_routes(mut self) -> Self {
        self.routes = true;
        self
    }

    pub fn with_proto_interior(mut self) -> Self {
        self.proto_interior = true;
        self
    }

    pub fn wants_nodes(&self) -> bool {
        !self.names.is_empty() || self.def_only
    }

    pub fn wants_routes(&self) -> bool {
        self.routes
    }

    pub fn wants_proto_interior(&self) -> bool {
        self.proto_interior
    }

    pub fn is_def_only(&self) -> bool {
        self.def_only
    }

    /// Name under which `node` matches, if it does
    pub fn matches(&self, node: &Node) -> Option<&'static str> {
        if node.is_use() && !self.def_use {
            return None;
        }
        if self.def_only && !node.is_def() && !node.is_use() {
            return None;
        }
        if self.names.is_empty() {
            return self.def_only.then_some(DEF);
        }

        let type_name = node.type_name.as_str();
        self.names.iter().copied().find(|&name| match name {
            ALL => true,
            COORDINATE_OWNER => COORDINATE_OWNERS.contains(&type_name),
            INTERPOLATOR => INTERPOLATORS.contains(&type_name),
            _ => name == type_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_str;
    use crate::scene::{build_scene, NodeId};

    #[test]
    fn test_pseudo_categories() {
        let stream = tokenize_str(
            "IndexedFaceSet {} ScalarInterpolator {} DEF G Group {} Shape {} USE G",
        )
        .unwrap();
        let scene = build_scene(&stream).unwrap();
        let node = |i| scene.node(NodeId(i));

        let owners = MatchCriteria::nodes(&[COORDINATE_OWNER]);
        assert_eq!(owners.matches(node(0)), Some(COORDINATE_OWNER));
        assert_eq!(owners.matches(node(1)), None);

        let interpolators = MatchCriteria::nodes(&[INTERPOLATOR]);
        assert_eq!(interpolators.matches(node(1)), Some(INTERPOLATOR));

        let all = MatchCriteria::all();
        assert!((0..4).all(|i| all.matches(node(i)) == Some(ALL)));
        // USE nodes need DEF/USE interest
        assert_eq!(all.matches(node(4)), None);
        assert_eq!(MatchCriteria::all().with_def_use().matches(node(4)), Some(ALL));

        let defs = MatchCriteria::nodes(&[DEF]);
        assert!(defs.is_def_only());
        assert_eq!(defs.matches(node(2)), Some(DEF));
        assert_eq!(defs.matches(node(3)), None);

        let named = MatchCriteria::nodes(&["Shape"]);
        assert_eq!(named.matches(node(3)), Some("Shape"));
        assert!(!MatchCriteria::none().wants_nodes());
    }
}
