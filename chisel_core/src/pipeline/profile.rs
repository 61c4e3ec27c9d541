//! Counts compared between passes to detect a fixed point

use crate::scene::Scene;
use crate::tokens::TokenStream;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub tokens: usize,
    pub kind_counts: BTreeMap<&'static str, usize>,
    pub nodes: usize,
    pub routes: usize,
    pub protos: usize,
    pub defs: usize,
}

impl Profile {
    pub fn of(stream: &TokenStream, scene: &Scene) -> Self {
        Self {
            tokens: stream.len(),
            kind_counts: stream.kind_counts(),
            nodes: scene.len(),
            routes: scene.routes().len(),
            protos: scene.protos().len(),
            defs: scene.defs().count(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tokens={} nodes={} routes={} protos={} defs={}",
            self.tokens, self.nodes, self.routes, self.protos, self.defs
        )?;
        for (kind, count) in &self.kind_counts {
            write!(f, " {}={}", kind, count)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_str;
    use crate::scene::build_scene;

    fn profile(source: &str) -> Profile {
        let stream = tokenize_str(source).unwrap();
        let scene = build_scene(&stream).unwrap();
        Profile::of(&stream, &scene)
    }

    #[test]
    fn test_layout_does_not_change_profile() {
        assert_eq!(
            profile("DEF A Group { children [ Shape { } ] }"),
            profile("DEF A Group {\n  children [\n    Shape { }\n  ]\n}\n")
        );
    }

    #[test]
    fn test_counts() {
        let p = profile("DEF A Group { }\nUSE A\nROUTE A.x TO A.y\n");
        assert_eq!(p.nodes, 2);
        assert_eq!(p.routes, 1);
        assert_eq!(p.defs, 1);
        assert_ne!(p, profile("Group { }\nUSE A\nROUTE A.x TO A.y\n"));
        assert!(p.to_string().starts_with("tokens=15 nodes=2"));
    }
}
