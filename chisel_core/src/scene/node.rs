//! Scene arena
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. A `USE`
//! is its own node whose `target` resolves to the defining node, so the
//! tree never contains shared subtrees. Every element records the token
//! range it came from; transforms register replacements against those.

use super::SceneError;
use serde::Serialize;

/// Stable index of a node in its [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `Type { ... }`, possibly with a `DEF name` prefix
    Instance,
    /// `USE name`; `target` is `None` when the name was never defined
    Use { target: Option<NodeId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// Field name with nothing recognizable after it
    Missing,
    /// Numbers, strings, or booleans
    Scalar,
    /// `[ ... ]`
    List,
    /// A single child node
    Node,
    Null,
    /// `IS interfaceName` inside a PROTO body
    Is,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    /// First token of the field: the name, or the declaration keyword
    pub first_token: usize,
    pub name_token: usize,
    /// Inclusive token range of the value
    pub value: Option<(usize, usize)>,
    pub value_kind: FieldValue,
    /// Nodes appearing in the value
    pub nodes: Vec<NodeId>,
    /// `field`/`exposedField`/`eventIn`/`eventOut` declaration
    pub is_declaration: bool,
}

impl Field {
    pub fn last_token(&self) -> usize {
        self.value.map(|(_, last)| last).unwrap_or(self.name_token)
    }

    /// Value tokens, excluding list brackets
    pub fn value_tokens(&self) -> Option<(usize, usize)> {
        let (first, last) = self.value?;
        match self.value_kind {
            FieldValue::List if last > first + 1 => Some((first + 1, last - 1)),
            FieldValue::List => None,
            _ => Some((first, last)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Node type; for `USE` the type of the target, if resolved
    pub type_name: String,
    pub def_name: Option<String>,
    pub def_token: Option<usize>,
    /// Token of the type name, or of the name after `USE`
    pub name_token: usize,
    /// `DEF`/`USE` keyword or type name
    pub first_token: usize,
    /// Closing brace, or the name after `USE`
    pub last_token: usize,
    pub parent: Option<NodeId>,
    pub parent_field: Option<String>,
    pub fields: Vec<Field>,
    /// Enclosing PROTO declaration, by index into [`Scene::protos`]
    pub proto: Option<usize>,
}

impl Node {
    pub fn is_use(&self) -> bool {
        matches!(self.kind, NodeKind::Use { .. })
    }

    pub fn is_def(&self) -> bool {
        self.def_name.is_some()
    }

    pub fn use_target(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Use { target } => target,
            NodeKind::Instance => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All child nodes across fields, in source order
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.fields.iter().flat_map(|f| f.nodes.iter().copied())
    }

    pub fn token_range(&self) -> (usize, usize) {
        (self.first_token, self.last_token)
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    /// `ROUTE` keyword
    pub first_token: usize,
    pub last_token: usize,
    pub from_node: String,
    pub from_node_token: usize,
    pub from_field: String,
    pub to_node: String,
    pub to_node_token: usize,
    pub to_field: String,
    pub from_target: Option<NodeId>,
    pub to_target: Option<NodeId>,
    /// Node whose body holds the route, `None` at top level
    pub parent: Option<NodeId>,
    pub proto: Option<usize>,
}

impl Route {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none() && self.proto.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ProtoDecl {
    pub name: String,
    pub is_extern: bool,
    /// `PROTO`/`EXTERNPROTO` keyword
    pub first_token: usize,
    pub name_token: usize,
    pub last_token: usize,
    pub interface: Vec<Field>,
    /// Top-level nodes of the body, empty for `EXTERNPROTO`
    pub body: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub(crate) nodes: Vec<Node>,
    pub(crate) roots: Vec<NodeId>,
    pub(crate) routes: Vec<Route>,
    pub(crate) protos: Vec<ProtoDecl>,
    pub(crate) problems: Vec<SceneError>,
}

impl Scene {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id; ids are only handed out by this scene
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn protos(&self) -> &[ProtoDecl] {
        &self.protos
    }

    /// Recoverable problems met while building
    pub fn problems(&self) -> &[SceneError] {
        &self.problems
    }

    pub fn defs(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_def())
    }

    pub fn uses(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_use())
    }

    /// `USE` nodes resolving to `id`
    pub fn uses_of(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        self.uses().filter(move |n| n.use_target() == Some(id))
    }

    /// Routes naming `id` at either end
    pub fn routes_of(&self, id: NodeId) -> impl Iterator<Item = &Route> {
        self.routes
            .iter()
            .filter(move |r| r.from_target == Some(id) || r.to_target == Some(id))
    }

    /// Whether any `USE` or `ROUTE` refers to the node
    pub fn is_referenced(&self, id: NodeId) -> bool {
        self.uses_of(id).next().is_some() || self.routes_of(id).next().is_some()
    }

    /// Later definitions reusing a name already defined in the same scope
    pub fn duplicate_defs(&self) -> Vec<&Node> {
        let mut seen: Vec<(Option<usize>, &str)> = Vec::new();
        let mut duplicates = Vec::new();
        for node in self.defs() {
            let Some(name) = node.def_name.as_deref() else {
                continue;
            };
            let key = (node.proto, name);
            if seen.contains(&key) {
                duplicates.push(node);
            } else {
                seen.push(key);
            }
        }
        duplicates
    }

    /// `USE` nodes whose name never resolved
    pub fn undefined_uses(&self) -> impl Iterator<Item = &Node> {
        self.uses()
            .filter(|n| matches!(n.kind, NodeKind::Use { target: None }))
    }

    /// Ancestors from the parent upwards
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &Node> {
        std::iter::successors(self.node(id).parent.map(|p| self.node(p)), move |n| {
            n.parent.map(|p| self.node(p))
        })
    }
}
