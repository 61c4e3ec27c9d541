//! Structural scene builder
//!
//! Recursive descent over the significant (non-comment) tokens. It knows
//! the shape of VRML statements but not node or field types, so unknown
//! tokens are stepped over instead of rejected. Truncated input closes
//! every open construct at the last token and records the problem.

use super::node::*;
use super::{SceneBuilder, SceneError};
use crate::logging::codes;
use crate::tokens::{is_interface_keyword, TokenKind, TokenStream};
use std::collections::HashMap;
use std::time::Instant;

/// Nesting limit for nodes, which also bounds recursion
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone)]
pub struct StructuralSceneBuilder {
    max_depth: usize,
}

impl StructuralSceneBuilder {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for StructuralSceneBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneBuilder for StructuralSceneBuilder {
    fn build(&mut self, stream: &TokenStream) -> Result<Scene, SceneError> {
        let start_time = Instant::now();
        let mut state = BuildState::new(stream, self.max_depth);

        let (roots, _) = state.statements(None, None, 0, "scene")?;
        let mut scene = state.scene;
        scene.roots = roots;

        for problem in &scene.problems {
            log_warning!(code = problem.error_code(), &problem.to_string(),
                "token" => problem.token());
        }
        log_success!(
            codes::success::SCENE_BUILD_COMPLETE,
            "Scene built",
            "nodes" => scene.nodes.len(),
            "routes" => scene.routes.len(),
            "protos" => scene.protos.len(),
            "problems" => scene.problems.len(),
            "duration_ms" => format!("{:.2}", start_time.elapsed().as_secs_f64() * 1000.0),
        );
        Ok(scene)
    }
}

struct BuildState<'s> {
    stream: &'s TokenStream,
    /// Current significant token, `None` at end of input
    pos: Option<usize>,
    scene: Scene,
    /// DEF namespaces; PROTO bodies get their own
    scopes: Vec<HashMap<String, NodeId>>,
    proto: Option<usize>,
    depth: usize,
    max_depth: usize,
}

impl<'s> BuildState<'s> {
    fn new(stream: &'s TokenStream, max_depth: usize) -> Self {
        let pos = (0..stream.len()).find(|&i| stream.tokens()[i].kind.is_significant());
        Self {
            stream,
            pos,
            scene: Scene::default(),
            scopes: vec![HashMap::new()],
            proto: None,
            depth: 0,
            max_depth,
        }
    }

    // === CURSOR ===

    fn advance(&mut self) {
        self.pos = self.pos.and_then(|p| self.stream.next_significant(p));
    }

    fn at(&self, literal: &str) -> bool {
        self.pos.is_some_and(|p| self.stream.same_as(p, literal))
    }

    fn kind(&self) -> Option<TokenKind> {
        self.pos.and_then(|p| self.stream.kind(p))
    }

    fn last_index(&self) -> usize {
        self.stream.len().saturating_sub(1)
    }

    fn eof(&mut self, context: &'static str, token: usize) {
        log_debug!("Unexpected end of input", "context" => context, "token" => token);
        self.scene
            .problems
            .push(SceneError::UnexpectedEof { context, token });
    }

    fn is_node_start(&self) -> bool {
        let Some(pos) = self.pos else {
            return false;
        };
        match self.stream.kind(pos) {
            Some(TokenKind::Keyword1) => {
                self.stream.same_as(pos, "DEF") || self.stream.same_as(pos, "USE")
            }
            Some(TokenKind::Identifier) => self
                .stream
                .next_significant(pos)
                .is_some_and(|next| self.stream.kind(next) == Some(TokenKind::LeftBrace)),
            _ => false,
        }
    }

    // === SCOPES ===

    fn define(&mut self, name: &str, id: NodeId) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), id);
        }
    }

    fn resolve(&self, name: &str) -> Option<NodeId> {
        self.scopes.last().and_then(|scope| scope.get(name).copied())
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.scene.nodes.len());
        self.scene.nodes.push(Node { id, ..node });
        id
    }

    // === STATEMENTS ===

    /// Statements up to `close` (consumed) or end of input; returns the
    /// nodes found and the closing token
    fn statements(
        &mut self,
        parent: Option<NodeId>,
        close: Option<&str>,
        opened_at: usize,
        context: &'static str,
    ) -> Result<(Vec<NodeId>, usize), SceneError> {
        let mut nodes = Vec::new();
        loop {
            let Some(pos) = self.pos else {
                if close.is_some() {
                    self.eof(context, opened_at);
                }
                return Ok((nodes, self.last_index()));
            };
            if close.is_some_and(|c| self.stream.same_as(pos, c)) {
                self.advance();
                return Ok((nodes, pos));
            }
            if let Some(id) = self.statement(parent)? {
                nodes.push(id);
            }
        }
    }

    /// One statement; always consumes at least one token
    fn statement(&mut self, parent: Option<NodeId>) -> Result<Option<NodeId>, SceneError> {
        if self.at("PROTO") {
            self.proto_declaration(false)?;
            Ok(None)
        } else if self.at("EXTERNPROTO") {
            self.proto_declaration(true)?;
            Ok(None)
        } else if self.at("ROUTE") {
            self.route(parent);
            Ok(None)
        } else if self.is_node_start() {
            self.node(parent, None)
        } else {
            self.advance();
            Ok(None)
        }
    }

    // === NODES ===

    fn node(
        &mut self,
        parent: Option<NodeId>,
        parent_field: Option<&str>,
    ) -> Result<Option<NodeId>, SceneError> {
        let stream = self.stream;
        let Some(first) = self.pos else {
            return Ok(None);
        };

        if stream.same_as(first, "USE") {
            self.advance();
            let Some(name_token) = self.pos else {
                self.eof("USE", first);
                return Ok(None);
            };
            self.advance();
            let target = self.resolve(stream.text(name_token));
            let type_name = target
                .map(|t| self.scene.node(t).type_name.clone())
                .unwrap_or_default();
            let id = self.push_node(Node {
                id: NodeId(0),
                kind: NodeKind::Use { target },
                type_name,
                def_name: None,
                def_token: None,
                name_token,
                first_token: first,
                last_token: name_token,
                parent,
                parent_field: parent_field.map(str::to_string),
                fields: Vec::new(),
                proto: self.proto,
            });
            return Ok(Some(id));
        }

        let mut def = None;
        if stream.same_as(first, "DEF") {
            self.advance();
            let Some(name_token) = self.pos else {
                self.eof("DEF", first);
                return Ok(None);
            };
            self.advance();
            def = Some(name_token);
        }

        let Some(type_token) = self.pos else {
            self.eof("DEF", first);
            return Ok(None);
        };
        let has_body = stream.kind(type_token) == Some(TokenKind::Identifier)
            && stream
                .next_significant(type_token)
                .is_some_and(|next| stream.kind(next) == Some(TokenKind::LeftBrace));
        if !has_body {
            // `DEF name` not followed by a node; the rest is left to the caller
            return Ok(None);
        }
        if self.depth >= self.max_depth {
            return Err(SceneError::NestingTooDeep {
                limit: self.max_depth,
                token: type_token,
            });
        }

        self.advance();
        let open = self.pos.unwrap_or(type_token);
        self.advance();

        let id = self.push_node(Node {
            id: NodeId(0),
            kind: NodeKind::Instance,
            type_name: stream.text(type_token).to_string(),
            def_name: def.map(|t| stream.text(t).to_string()),
            def_token: def.map(|_| first),
            name_token: type_token,
            first_token: first,
            last_token: open,
            parent,
            parent_field: parent_field.map(str::to_string),
            fields: Vec::new(),
            proto: self.proto,
        });

        self.depth += 1;
        let body = self.node_body(id, open);
        self.depth -= 1;
        let (fields, close) = body?;

        let node = &mut self.scene.nodes[id.0];
        node.fields = fields;
        node.last_token = close;

        if let Some(name_token) = def {
            self.define(stream.text(name_token), id);
        }
        Ok(Some(id))
    }

    fn node_body(&mut self, id: NodeId, open: usize) -> Result<(Vec<Field>, usize), SceneError> {
        let stream = self.stream;
        let mut fields = Vec::new();
        loop {
            let Some(pos) = self.pos else {
                self.eof("node body", open);
                return Ok((fields, self.last_index()));
            };
            let text = stream.text(pos);
            match stream.kind(pos) {
                Some(TokenKind::RightBrace) => {
                    self.advance();
                    return Ok((fields, pos));
                }
                Some(TokenKind::Keyword1) if is_interface_keyword(text) => {
                    fields.push(self.declaration(Some(id), true)?);
                }
                Some(TokenKind::Keyword1) if matches!(text, "ROUTE" | "PROTO" | "EXTERNPROTO") => {
                    self.statement(Some(id))?;
                }
                Some(TokenKind::Identifier) => {
                    self.advance();
                    fields.push(self.field_value(Some(id), text, pos, pos, false)?);
                }
                _ => self.advance(),
            }
        }
    }

    // === FIELDS ===

    /// `field|exposedField|eventIn|eventOut Type name [value | IS name]`
    fn declaration(&mut self, owner: Option<NodeId>, with_values: bool) -> Result<Field, SceneError> {
        let stream = self.stream;
        let first = self.pos.unwrap_or_else(|| self.last_index());
        let keyword = stream.text(first);
        self.advance();
        // field type
        self.advance();
        let Some(name_token) = self.pos else {
            self.eof("interface declaration", first);
            return Ok(Field {
                name: String::new(),
                first_token: first,
                name_token: self.last_index(),
                value: None,
                value_kind: FieldValue::Missing,
                nodes: Vec::new(),
                is_declaration: true,
            });
        };
        self.advance();

        let name = stream.text(name_token);
        let takes_value = with_values && matches!(keyword, "field" | "exposedField");
        if takes_value || self.at("IS") {
            self.field_value(owner, name, first, name_token, true)
        } else {
            Ok(Field {
                name: name.to_string(),
                first_token: first,
                name_token,
                value: None,
                value_kind: FieldValue::Missing,
                nodes: Vec::new(),
                is_declaration: true,
            })
        }
    }

    fn field_value(
        &mut self,
        owner: Option<NodeId>,
        name: &str,
        first: usize,
        name_token: usize,
        is_declaration: bool,
    ) -> Result<Field, SceneError> {
        let stream = self.stream;
        let mut field = Field {
            name: name.to_string(),
            first_token: first,
            name_token,
            value: None,
            value_kind: FieldValue::Missing,
            nodes: Vec::new(),
            is_declaration,
        };
        let Some(pos) = self.pos else {
            return Ok(field);
        };

        match stream.kind(pos) {
            Some(TokenKind::Keyword1) if stream.same_as(pos, "IS") => {
                self.advance();
                let target = self.pos.unwrap_or(pos);
                if self.pos.is_some() {
                    self.advance();
                } else {
                    self.eof("IS", pos);
                }
                field.value = Some((pos, target));
                field.value_kind = FieldValue::Is;
            }
            Some(TokenKind::Keyword1) if stream.same_as(pos, "NULL") => {
                self.advance();
                field.value = Some((pos, pos));
                field.value_kind = FieldValue::Null;
            }
            Some(TokenKind::Keyword1) if stream.same_as(pos, "TRUE") || stream.same_as(pos, "FALSE") => {
                self.advance();
                field.value = Some((pos, pos));
                field.value_kind = FieldValue::Scalar;
            }
            Some(TokenKind::Number) => {
                let last = self.run_of(|k| k == TokenKind::Number).unwrap_or(pos);
                field.value = Some((pos, last));
                field.value_kind = FieldValue::Scalar;
            }
            Some(TokenKind::QuotedString) => {
                self.advance();
                let last = self
                    .run_of(|k| k == TokenKind::QuotedStringContinuation)
                    .unwrap_or(pos);
                field.value = Some((pos, last));
                field.value_kind = FieldValue::Scalar;
            }
            Some(TokenKind::LeftBracket) => {
                let (nodes, close) = self.list(owner, name, pos)?;
                field.value = Some((pos, close));
                field.value_kind = FieldValue::List;
                field.nodes = nodes;
            }
            _ if self.is_node_start() => {
                if let Some(id) = self.node(owner, Some(name))? {
                    let child = self.scene.node(id);
                    field.value = Some((child.first_token, child.last_token));
                    field.value_kind = FieldValue::Node;
                    field.nodes.push(id);
                }
            }
            _ => {}
        }
        Ok(field)
    }

    /// Consume tokens while `accept` holds; returns the last one consumed
    fn run_of(&mut self, accept: impl Fn(TokenKind) -> bool) -> Option<usize> {
        let mut last = None;
        while let Some(pos) = self.pos {
            if !self.kind().is_some_and(&accept) {
                break;
            }
            last = Some(pos);
            self.advance();
        }
        last
    }

    fn list(
        &mut self,
        owner: Option<NodeId>,
        name: &str,
        open: usize,
    ) -> Result<(Vec<NodeId>, usize), SceneError> {
        self.advance();
        let mut nodes = Vec::new();
        loop {
            let Some(pos) = self.pos else {
                self.eof("list", open);
                return Ok((nodes, self.last_index()));
            };
            if self.stream.kind(pos) == Some(TokenKind::RightBracket) {
                self.advance();
                return Ok((nodes, pos));
            }
            if self.is_node_start() {
                if let Some(id) = self.node(owner, Some(name))? {
                    nodes.push(id);
                }
            } else {
                self.advance();
            }
        }
    }

    // === PROTO / ROUTE ===

    fn proto_declaration(&mut self, is_extern: bool) -> Result<(), SceneError> {
        let stream = self.stream;
        let Some(first) = self.pos else {
            return Ok(());
        };
        self.advance();
        let Some(name_token) = self.pos else {
            self.eof("PROTO", first);
            return Ok(());
        };
        self.advance();

        let index = self.scene.protos.len();
        self.scene.protos.push(ProtoDecl {
            name: stream.text(name_token).to_string(),
            is_extern,
            first_token: first,
            name_token,
            last_token: name_token,
            interface: Vec::new(),
            body: Vec::new(),
        });

        let outer_proto = self.proto.replace(index);
        self.scopes.push(HashMap::new());
        let parts = self.proto_parts(is_extern, first);
        self.scopes.pop();
        self.proto = outer_proto;
        let (interface, body, last) = parts?;

        let proto = &mut self.scene.protos[index];
        proto.interface = interface;
        proto.body = body;
        proto.last_token = last.max(name_token);
        Ok(())
    }

    fn proto_parts(
        &mut self,
        is_extern: bool,
        first: usize,
    ) -> Result<(Vec<Field>, Vec<NodeId>, usize), SceneError> {
        let stream = self.stream;
        let mut interface = Vec::new();
        let mut last = first;

        if let Some(open) = self.pos.filter(|_| self.kind() == Some(TokenKind::LeftBracket)) {
            self.advance();
            loop {
                let Some(pos) = self.pos else {
                    self.eof("PROTO interface", open);
                    return Ok((interface, Vec::new(), self.last_index()));
                };
                if stream.kind(pos) == Some(TokenKind::RightBracket) {
                    self.advance();
                    last = pos;
                    break;
                }
                if stream.kind(pos) == Some(TokenKind::Keyword1) && is_interface_keyword(stream.text(pos)) {
                    interface.push(self.declaration(None, !is_extern)?);
                } else {
                    self.advance();
                }
            }
        }

        if is_extern {
            if let Some(pos) = self.pos {
                let url = self.field_value(None, "url", pos, pos, false)?;
                last = url.value.map(|(_, end)| end).unwrap_or(last);
            }
            return Ok((interface, Vec::new(), last));
        }

        match self.pos.filter(|_| self.kind() == Some(TokenKind::LeftBrace)) {
            Some(open) => {
                self.advance();
                let (body, close) = self.statements(None, Some("}"), open, "PROTO body")?;
                Ok((interface, body, close))
            }
            None => Ok((interface, Vec::new(), last)),
        }
    }

    /// `ROUTE node.field TO node.field`; malformed routes only consume
    /// the keyword
    fn route(&mut self, parent: Option<NodeId>) {
        let stream = self.stream;
        let Some(first) = self.pos else {
            return;
        };
        self.advance();

        let mut parts = [0usize; 7];
        let mut cursor = self.pos;
        for slot in parts.iter_mut() {
            let Some(pos) = cursor else {
                self.eof("ROUTE", first);
                return;
            };
            *slot = pos;
            cursor = stream.next_significant(pos);
        }
        let is_name = |i: usize| stream.kind(parts[i]) == Some(TokenKind::Identifier);
        let well_formed = is_name(0)
            && stream.same_as(parts[1], ".")
            && is_name(2)
            && stream.same_as(parts[3], "TO")
            && is_name(4)
            && stream.same_as(parts[5], ".")
            && is_name(6);
        if !well_formed {
            log_debug!("Skipping malformed ROUTE", "token" => first);
            return;
        }
        self.pos = cursor;

        let from_node = stream.text(parts[0]);
        let to_node = stream.text(parts[4]);
        self.scene.routes.push(Route {
            first_token: first,
            last_token: parts[6],
            from_node: from_node.to_string(),
            from_node_token: parts[0],
            from_field: stream.text(parts[2]).to_string(),
            to_node: to_node.to_string(),
            to_node_token: parts[4],
            to_field: stream.text(parts[6]).to_string(),
            from_target: self.resolve(from_node),
            to_target: self.resolve(to_node),
            parent,
            proto: self.proto,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_str;
    use assert_matches::assert_matches;

    fn build(source: &str) -> (TokenStream, Scene) {
        let stream = tokenize_str(source).unwrap();
        let scene = StructuralSceneBuilder::new().build(&stream).unwrap();
        (stream, scene)
    }

    #[test]
    fn test_nested_nodes_and_fields() {
        let (stream, scene) = build(
            "#VRML V2.0 utf8\n\
             Transform {\n  translation 1 2 3\n  children [\n    Shape { geometry Box { size 2 2 2 } }\n  ]\n}\n",
        );
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.roots(), &[NodeId(0)]);

        let transform = scene.node(NodeId(0));
        assert_eq!(transform.type_name, "Transform");
        assert_eq!(stream.text(transform.first_token), "Transform");
        assert_eq!(stream.text(transform.last_token), "}");
        assert_eq!(transform.last_token, stream.len() - 1);

        let translation = transform.field("translation").unwrap();
        assert_eq!(translation.value_kind, FieldValue::Scalar);
        let (first, last) = translation.value.unwrap();
        assert_eq!((stream.text(first), stream.text(last)), ("1", "3"));

        let children = transform.field("children").unwrap();
        assert_eq!(children.value_kind, FieldValue::List);
        assert_eq!(children.nodes, vec![NodeId(1)]);

        let shape = scene.node(NodeId(1));
        assert_eq!(shape.parent, Some(NodeId(0)));
        assert_eq!(shape.parent_field.as_deref(), Some("children"));
        let box_node = scene.node(NodeId(2));
        assert_eq!(box_node.parent_field.as_deref(), Some("geometry"));
        assert_eq!(scene.ancestors(NodeId(2)).count(), 2);
    }

    #[test]
    fn test_def_use_resolution() {
        let (stream, scene) = build(
            "DEF Red Material { diffuseColor 1 0 0 }\nShape { appearance Appearance { material USE Red } }\nUSE Missing",
        );
        let red = scene.defs().next().unwrap();
        assert_eq!(red.def_name.as_deref(), Some("Red"));
        assert_eq!(stream.text(red.def_token.unwrap()), "DEF");

        let uses: Vec<&Node> = scene.uses().collect();
        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0].use_target(), Some(red.id));
        assert_eq!(uses[0].type_name, "Material");
        assert!(scene.is_referenced(red.id));

        let undefined: Vec<&Node> = scene.undefined_uses().collect();
        assert_eq!(undefined.len(), 1);
        assert_eq!(stream.text(undefined[0].name_token), "Missing");
    }

    #[test]
    fn test_duplicate_defs() {
        let (_, scene) = build("DEF A Group {} DEF A Group {} DEF B Group {}");
        let duplicates = scene.duplicate_defs();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].id, NodeId(1));
    }

    #[test]
    fn test_routes() {
        let (stream, scene) = build(
            "DEF T TimeSensor {}\nDEF P PositionInterpolator {}\nROUTE T.fraction_changed TO P.set_fraction\nROUTE T.x TO",
        );
        assert_eq!(scene.routes().len(), 1);
        let route = &scene.routes()[0];
        assert!(route.is_top_level());
        assert_eq!(route.from_target, Some(NodeId(0)));
        assert_eq!(route.to_target, Some(NodeId(1)));
        assert_eq!(route.to_field, "set_fraction");
        assert_eq!(stream.text(route.last_token), "set_fraction");
        assert_matches!(
            scene.problems(),
            [SceneError::UnexpectedEof { context: "ROUTE", .. }]
        );
    }

    #[test]
    fn test_proto_scope() {
        let (_, scene) = build(
            "PROTO Box2 [ field SFVec3f size 1 1 1 eventIn SFBool set ] {\n  DEF Inner Box { size IS size }\n}\n\
             DEF Inner Group {}\nBox2 { size 2 2 2 }",
        );
        assert_eq!(scene.protos().len(), 1);
        let proto = &scene.protos()[0];
        assert_eq!(proto.name, "Box2");
        assert_eq!(proto.interface.len(), 2);
        assert!(proto.interface[0].value.is_some());
        assert!(proto.interface[1].value.is_none());
        assert_eq!(proto.body.len(), 1);

        let inner = scene.node(proto.body[0]);
        assert_eq!(inner.proto, Some(0));
        assert_eq!(inner.field("size").unwrap().value_kind, FieldValue::Is);

        // PROTO bodies are their own DEF namespace
        assert!(scene.duplicate_defs().is_empty());
        assert_eq!(scene.roots().len(), 2);
    }

    #[test]
    fn test_externproto() {
        let (stream, scene) = build(
            "EXTERNPROTO Far [ field SFFloat a exposedField SFColor c ] [ \"far.wrl#Far\" \"http://x/far.wrl\" ]\nGroup {}",
        );
        let proto = &scene.protos()[0];
        assert!(proto.is_extern);
        assert_eq!(proto.interface.len(), 2);
        assert_eq!(stream.text(proto.last_token), "]");
        assert_eq!(scene.roots().len(), 1);
    }

    #[test]
    fn test_comments_and_strings() {
        let (_, scene) = build(
            "WorldInfo { # note\n  title \"a\nb\"\n  info [ \"x\" ]\n}",
        );
        let node = scene.node(NodeId(0));
        assert_eq!(node.fields.len(), 2);
        assert_eq!(node.fields[0].value_kind, FieldValue::Scalar);
        assert_eq!(node.fields[1].value_tokens().map(|(a, b)| b - a), Some(0));
    }

    #[test]
    fn test_truncated_input() {
        let (stream, scene) = build("Group { children [ Shape {");
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.node(NodeId(0)).last_token, stream.len() - 1);
        assert_eq!(scene.problems().len(), 3);
    }

    #[test]
    fn test_nesting_limit() {
        let stream = tokenize_str("Group { children [ Group { children [ Group {} ] } ] }").unwrap();
        let result = StructuralSceneBuilder::new().with_max_depth(2).build(&stream);
        assert_matches!(result, Err(SceneError::NestingTooDeep { limit: 2, .. }));
        assert!(StructuralSceneBuilder::new().with_max_depth(3).build(&stream).is_ok());
    }
}
