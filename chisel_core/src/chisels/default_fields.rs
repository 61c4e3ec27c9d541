//! Removal of fields that restate the VRML97 default

use crate::printer::TokenPrinter;
use crate::replace::ReplacementOwner;
use crate::scene::{Field, FieldValue, Node};
use crate::tokens::{TokenKind, TokenStream};
use crate::transform::{Category, MatchCriteria, Transform, TransformContext, TransformError};

pub const KEY: &str = "default_fields";

/// (node type, field, default value)
const DEFAULTS: &[(&str, &str, &str)] = &[
    ("Transform", "center", "0 0 0"),
    ("Transform", "rotation", "0 0 1 0"),
    ("Transform", "scale", "1 1 1"),
    ("Transform", "scaleOrientation", "0 0 1 0"),
    ("Transform", "translation", "0 0 0"),
    ("Transform", "bboxCenter", "0 0 0"),
    ("Transform", "bboxSize", "-1 -1 -1"),
    ("Material", "ambientIntensity", "0.2"),
    ("Material", "diffuseColor", "0.8 0.8 0.8"),
    ("Material", "emissiveColor", "0 0 0"),
    ("Material", "shininess", "0.2"),
    ("Material", "specularColor", "0 0 0"),
    ("Material", "transparency", "0"),
    ("IndexedFaceSet", "ccw", "TRUE"),
    ("IndexedFaceSet", "colorPerVertex", "TRUE"),
    ("IndexedFaceSet", "convex", "TRUE"),
    ("IndexedFaceSet", "creaseAngle", "0"),
    ("IndexedFaceSet", "normalPerVertex", "TRUE"),
    ("IndexedFaceSet", "solid", "TRUE"),
    ("IndexedLineSet", "colorPerVertex", "TRUE"),
];

pub fn default_for(node_type: &str, field: &str) -> Option<&'static str> {
    DEFAULTS
        .iter()
        .find(|(t, f, _)| *t == node_type && *f == field)
        .map(|(_, _, value)| *value)
}

/// Whether the field's value tokens spell `default`
fn is_default(stream: &TokenStream, field: &Field, default: &str) -> bool {
    if field.value_kind != FieldValue::Scalar {
        return false;
    }
    let Some((first, last)) = field.value else {
        return false;
    };
    let values: Vec<usize> = (first..=last)
        .filter(|&i| stream.kind(i) != Some(TokenKind::Comment))
        .collect();
    let expected: Vec<&str> = default.split_whitespace().collect();
    if values.len() != expected.len() {
        return false;
    }

    values.iter().zip(expected).all(|(&i, want)| match want.parse::<f64>() {
        Ok(number) => stream.float_value(i) == Some(number),
        Err(_) => stream.text(i) == want,
    })
}

#[derive(Debug, Default)]
pub struct DefaultFields;

impl ReplacementOwner for DefaultFields {
    fn optimize(&mut self, _printer: &mut TokenPrinter<'_>, _param: usize, _start: usize, _end: usize) {}
}

impl Transform for DefaultFields {
    fn key(&self) -> &'static str {
        KEY
    }

    fn category(&self) -> Category {
        Category::Condense
    }

    fn criteria(&self) -> MatchCriteria {
        MatchCriteria::nodes(&["Transform", "Material", "IndexedFaceSet", "IndexedLineSet"])
            .with_proto_interior()
    }

    fn attempt_replacement(
        &mut self,
        ctx: &mut TransformContext<'_>,
        node: &Node,
        _matched: &str,
    ) -> Result<bool, TransformError> {
        let mut replaced = false;
        for field in node.fields.iter().filter(|f| !f.is_declaration) {
            let Some(default) = default_for(&node.type_name, &field.name) else {
                continue;
            };
            if is_default(ctx.stream, field, default) {
                replaced |= ctx.register(field.first_token, Some(field.last_token()), 0)?;
            }
        }
        Ok(replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chisels::testing::run;

    #[test]
    fn test_removes_default_values() {
        let outcome = run(
            Box::new(DefaultFields),
            "Transform {\n  translation 0 0.0 0\n  scale 2 1 1\n  children [\n    Shape {\n      appearance Appearance { material Material { diffuseColor .8 .8 .8 shininess 0.5 } }\n      geometry IndexedFaceSet { solid TRUE ccw FALSE }\n    }\n  ]\n}\n",
        );
        assert_eq!(outcome.requests, 3);
        assert_eq!(
            outcome.text,
            "Transform {\n  scale 2 1 1\n  children [\n    Shape {\n      appearance Appearance { material Material { shininess .5 } }\n      geometry IndexedFaceSet { ccw FALSE }\n    }\n  ]\n}\n"
        );
    }

    #[test]
    fn test_defaults_table() {
        assert_eq!(default_for("Transform", "bboxSize"), Some("-1 -1 -1"));
        assert_eq!(default_for("Material", "shininess"), Some("0.2"));
        assert_eq!(default_for("Shape", "geometry"), None);
    }
}
