//! Scene graph over a token stream
//!
//! The scene is a read-only index into the tokens: nodes, fields, routes
//! and PROTO declarations with the token ranges they occupy. Transforms
//! match against it and register replacements on the stream; they never
//! edit the scene itself.

pub mod builder;
pub mod node;

use crate::logging::codes;
use crate::tokens::TokenStream;

pub use builder::StructuralSceneBuilder;
pub use node::{Field, FieldValue, Node, NodeId, NodeKind, ProtoDecl, Route, Scene};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("Unexpected end of input in {context} (opened at token {token})")]
    UnexpectedEof { context: &'static str, token: usize },

    #[error("Nodes nested deeper than {limit} levels at token {token}")]
    NestingTooDeep { limit: usize, token: usize },
}

impl SceneError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            SceneError::UnexpectedEof { .. } => codes::scene::UNEXPECTED_EOF,
            SceneError::NestingTooDeep { .. } => codes::scene::NESTING_TOO_DEEP,
        }
    }

    /// Token the problem was detected at
    pub fn token(&self) -> usize {
        match self {
            SceneError::UnexpectedEof { token, .. } | SceneError::NestingTooDeep { token, .. } => {
                *token
            }
        }
    }
}

/// Builds a [`Scene`] from a token stream
///
/// Truncated input is recorded in [`Scene::problems`] rather than
/// returned as an error; only conditions that make the scene unusable
/// fail the build.
pub trait SceneBuilder {
    fn build(&mut self, stream: &TokenStream) -> Result<Scene, SceneError>;
}

/// Build a scene with the default structural builder
pub fn build_scene(stream: &TokenStream) -> Result<Scene, SceneError> {
    StructuralSceneBuilder::new().build(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::tokenize_str;

    #[test]
    fn test_build_scene_default() {
        let stream = tokenize_str("Group { children [ Shape {} ] }").unwrap();
        let scene = build_scene(&stream).unwrap();
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.roots().len(), 1);
    }

    #[test]
    fn test_error_codes() {
        let eof = SceneError::UnexpectedEof {
            context: "node body",
            token: 3,
        };
        assert_eq!(eof.error_code(), codes::scene::UNEXPECTED_EOF);
        assert_eq!(eof.token(), 3);
        let deep = SceneError::NestingTooDeep { limit: 2, token: 9 };
        assert_eq!(deep.error_code().as_str(), "E054");
    }
}
