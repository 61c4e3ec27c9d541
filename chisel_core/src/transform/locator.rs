//! Scene traversal that feeds matching nodes to a transform
//!
//! Depth-first, pre-order, in source order. `USE` nodes are reported but
//! never descended into. PROTO bodies are visited only when the criteria
//! ask for it. A [`NodeSet`] guarantees each node is reported at most once
//! per traversal.

use super::{Transform, TransformContext, TransformError};
use crate::scene::{NodeId, Scene};

/// Bitset over node ids
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    words: Vec<u64>,
}

impl NodeSet {
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            words: vec![0; nodes.div_ceil(64)],
        }
    }

    /// Returns `true` when `id` was not yet present
    pub fn insert(&mut self, id: NodeId) -> bool {
        let (word, bit) = (id.0 / 64, id.0 % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.words
            .get(id.0 / 64)
            .is_some_and(|w| w & (1u64 << (id.0 % 64)) != 0)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocatorStats {
    pub visited: usize,
    pub matched: usize,
    pub routes: usize,
}

pub struct NodeLocator<'s> {
    scene: &'s Scene,
    notified: NodeSet,
}

impl<'s> NodeLocator<'s> {
    pub fn new(scene: &'s Scene) -> Self {
        Self {
            scene,
            notified: NodeSet::with_capacity(scene.len()),
        }
    }

    /// Run one scan of `transform`: `begin_scan`, every matching node and
    /// route, then `end_scan`
    ///
    /// Cancellation is checked before each node; registrations made so far
    /// stay in place.
    pub fn visit<T: Transform + ?Sized>(
        &mut self,
        transform: &mut T,
        ctx: &mut TransformContext<'_>,
    ) -> Result<LocatorStats, TransformError> {
        let scene = self.scene;
        let criteria = transform.criteria();
        let mut stats = LocatorStats::default();
        self.notified.clear();

        transform.begin_scan(ctx)?;

        if criteria.wants_nodes() {
            let mut entries: Vec<NodeId> = scene.roots().to_vec();
            if criteria.wants_proto_interior() {
                for proto in scene.protos() {
                    entries.extend_from_slice(&proto.body);
                }
            }
            entries.sort_by_key(|&id| scene.node(id).first_token);

            let mut stack: Vec<NodeId> = entries.into_iter().rev().collect();
            while let Some(id) = stack.pop() {
                ctx.check_cancelled()?;
                if !self.notified.insert(id) {
                    continue;
                }
                stats.visited += 1;

                let node = scene.node(id);
                if let Some(matched) = criteria.matches(node) {
                    stats.matched += 1;
                    transform.on_node_found(ctx, node, matched)?;
                }
                if !node.is_use() {
                    let children: Vec<NodeId> = node.children().collect();
                    stack.extend(children.into_iter().rev());
                }
            }
        }

        if criteria.wants_routes() {
            for route in scene.routes() {
                ctx.check_cancelled()?;
                if route.proto.is_some() && !criteria.wants_proto_interior() {
                    continue;
                }
                stats.routes += 1;
                transform.on_route_found(ctx, route)?;
            }
        }

        transform.end_scan(ctx)?;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_str;
    use crate::pipeline::CancelToken;
    use crate::printer::TokenPrinter;
    use crate::replace::{RangeReplacer, ReplacementOwner};
    use crate::scene::{build_scene, Node, Route};
    use crate::transform::{Category, MatchCriteria};
    use assert_matches::assert_matches;

    struct Spy {
        criteria: MatchCriteria,
        seen: Vec<String>,
        routes: usize,
        cancel_after: Option<(usize, CancelToken)>,
    }

    impl Spy {
        fn new(criteria: MatchCriteria) -> Self {
            Self {
                criteria,
                seen: Vec::new(),
                routes: 0,
                cancel_after: None,
            }
        }
    }

    impl ReplacementOwner for Spy {
        fn optimize(&mut self, _: &mut TokenPrinter<'_>, _: usize, _: usize, _: usize) {}
    }

    impl Transform for Spy {
        fn key(&self) -> &'static str {
            "spy"
        }

        fn category(&self) -> Category {
            Category::Validators
        }

        fn criteria(&self) -> MatchCriteria {
            self.criteria.clone()
        }

        fn on_node_found(
            &mut self,
            _ctx: &mut TransformContext<'_>,
            node: &Node,
            _matched: &str,
        ) -> Result<(), TransformError> {
            self.seen.push(node.type_name.clone());
            if let Some((limit, token)) = &self.cancel_after {
                if self.seen.len() >= *limit {
                    token.cancel();
                }
            }
            Ok(())
        }

        fn on_route_found(
            &mut self,
            _ctx: &mut TransformContext<'_>,
            _route: &Route,
        ) -> Result<(), TransformError> {
            self.routes += 1;
            Ok(())
        }
    }

    const SCENE: &str = "PROTO P [] { Sphere {} ROUTE A.b TO C.d }\n\
        DEF T Transform { children [ Shape { geometry Box {} } ] }\n\
        Group { children [ Cone {} USE T ] }\n\
        ROUTE T.x TO T.y";

    fn scan(spy: &mut Spy, cancel: &CancelToken) -> Result<LocatorStats, TransformError> {
        let stream = tokenize_str(SCENE).unwrap();
        let scene = build_scene(&stream).unwrap();
        let mut replacer = RangeReplacer::new();
        let mut diagnostics = Vec::new();
        let mut ctx = TransformContext::new(&stream, &scene, &mut replacer, 0, cancel, &mut diagnostics);
        NodeLocator::new(&scene).visit(spy, &mut ctx)
    }

    #[test]
    fn test_source_order_traversal() {
        let mut spy = Spy::new(MatchCriteria::all().with_routes());
        let stats = scan(&mut spy, &CancelToken::new()).unwrap();
        assert_eq!(spy.seen, vec!["Transform", "Shape", "Box", "Group", "Cone"]);
        assert_eq!(spy.routes, 1);
        assert_eq!(stats.matched, 5);
        // the USE node is visited but not matched
        assert_eq!(stats.visited, 6);
    }

    #[test]
    fn test_proto_interior_and_def_use() {
        let criteria = MatchCriteria::all()
            .with_def_use()
            .with_routes()
            .with_proto_interior();
        let mut spy = Spy::new(criteria);
        scan(&mut spy, &CancelToken::new()).unwrap();
        assert_eq!(
            spy.seen,
            vec!["Sphere", "Transform", "Shape", "Box", "Group", "Cone", "Transform"]
        );
        assert_eq!(spy.routes, 2);
    }

    #[test]
    fn test_named_match() {
        let mut spy = Spy::new(MatchCriteria::nodes(&["Box", "Cone"]));
        scan(&mut spy, &CancelToken::new()).unwrap();
        assert_eq!(spy.seen, vec!["Box", "Cone"]);
    }

    #[test]
    fn test_cancellation_stops_traversal() {
        let cancel = CancelToken::new();
        let mut spy = Spy::new(MatchCriteria::all());
        spy.cancel_after = Some((2, cancel.clone()));
        assert_matches!(scan(&mut spy, &cancel), Err(TransformError::Cancelled));
        assert_eq!(spy.seen.len(), 2);
    }

    #[test]
    fn test_node_set() {
        let mut set = NodeSet::with_capacity(10);
        assert!(set.insert(NodeId(3)));
        assert!(!set.insert(NodeId(3)));
        assert!(set.insert(NodeId(130)));
        assert!(set.contains(NodeId(130)));
        assert!(!set.contains(NodeId(4)));
        assert_eq!(set.len(), 2);
        set.clear();
        assert!(set.is_empty());
    }
}
