use crate::{Cancel, Error, MatchResult, NullProvider, SchemaProvider, TreeBuilder, VariantsTree};
use schema::{types, Position, SchemaDocument, SchemaNode};
use std::sync::Arc;

/// Resolver orchestrates pointer-walking over the variants tree builder.
/// A pure function of (document, position): no state is retained between
/// calls, and concurrent resolutions are fully independent.
pub struct Resolver<'a, P: SchemaProvider = NullProvider> {
    document: &'a SchemaDocument,
    provider: &'a P,
    cancel: Cancel,
}

impl<'a> Resolver<'a, NullProvider> {
    pub fn new(document: &'a SchemaDocument) -> Self {
        Resolver {
            document,
            provider: &NullProvider,
            cancel: Cancel::new(),
        }
    }
}

impl<'a, P: SchemaProvider> Resolver<'a, P> {
    pub fn with_provider(document: &'a SchemaDocument, provider: &'a P) -> Self {
        Resolver {
            document,
            provider,
            cancel: Cancel::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: Cancel) -> Self {
        self.cancel = cancel;
        self
    }

    fn tree(&self, position: &Position, expand_last: bool) -> Result<VariantsTree, Error> {
        TreeBuilder {
            document: self.document,
            provider: self.provider,
            cancel: self.cancel.clone(),
            expand_last,
        }
        .build(self.document.root.clone(), position)
    }

    /// Flatten everything, losing exclusivity. Used where only candidate
    /// discovery matters (completion).
    pub fn resolve(&self, position: &Position) -> Result<Vec<Arc<SchemaNode>>, Error> {
        let result = self.detailed_resolve(position)?;
        Ok(result.all().cloned().collect())
    }

    /// Preserve the Match Result structure. Used by validation, where
    /// `oneOf` exclusivity must be respected.
    pub fn detailed_resolve(&self, position: &Position) -> Result<MatchResult, Error> {
        let tree = self.tree(position, true)?;
        Ok(MatchResult::create(&tree))
    }

    /// Resolve without expanding the final step's alternatives, yielding the
    /// literal terminal schemas (documentation lookup).
    pub fn terminal_resolve(&self, position: &Position) -> Result<Vec<Arc<SchemaNode>>, Error> {
        let tree = self.tree(position, false)?;
        Ok(MatchResult::create(&tree).all().cloned().collect())
    }

    /// Disambiguate among structurally-plausible candidates: prefer the first
    /// whose schema is compatible with the concrete value's type and whose
    /// parent schema is compatible with the value's container. A best-effort
    /// heuristic, not a proof of uniqueness.
    pub fn find_navigation_target(
        &self,
        position: &Position,
        value_types: types::Set,
        container_types: Option<types::Set>,
    ) -> Result<Option<Arc<SchemaNode>>, Error> {
        let tree = self.tree(position, true)?;

        let compatible = |schema: &SchemaNode, of: types::Set| match schema.types {
            Some(declared) => declared.overlaps(of),
            None => true,
        };

        let mut fallback = None;
        for leaf in tree.leaves() {
            let Some(schema) = &leaf.schema else { continue };
            if !compatible(schema, value_types) {
                continue;
            }
            let parent_ok = match (container_types, tree.parent_schema(leaf)) {
                (Some(container), Some(parent)) => compatible(parent, container),
                _ => true,
            };
            if parent_ok {
                return Ok(Some(schema.clone()));
            }
            fallback.get_or_insert_with(|| schema.clone());
        }
        Ok(fallback.or_else(|| {
            tree.leaves()
                .next()
                .and_then(|leaf| leaf.schema.clone())
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn document(raw: serde_json::Value) -> SchemaDocument {
        let url = url::Url::parse("schema://fixture").unwrap();
        schema::read_schema(url, &raw).unwrap()
    }

    fn fragments(candidates: &[Arc<SchemaNode>]) -> Vec<String> {
        candidates
            .iter()
            .map(|s| s.curi.fragment().unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn plain_property_walk() {
        let doc = document(json!({
            "type": "object",
            "properties": {
                "outer": {
                    "type": "object",
                    "properties": {"inner": {"type": "integer"}}
                }
            }
        }));
        let resolver = Resolver::new(&doc);

        let found = resolver
            .resolve(&Position::from_str("/outer/inner"))
            .unwrap();
        assert_eq!(
            vec!["/properties/outer/properties/inner"],
            fragments(&found)
        );
    }

    #[test]
    fn resolve_is_deterministic() {
        let doc = document(json!({
            "properties": {
                "p": {
                    "anyOf": [
                        {"type": "string"},
                        {"type": "integer"},
                        {"$ref": "#/definitions/d"}
                    ]
                }
            },
            "definitions": {"d": {"type": "boolean"}}
        }));
        let resolver = Resolver::new(&doc);
        let position = Position::from_str("/p");

        let first = resolver.detailed_resolve(&position).unwrap();
        let second = resolver.detailed_resolve(&position).unwrap();
        assert_eq!(fragments(&first.matches), fragments(&second.matches));
        assert_eq!(3, first.matches.len());
        assert!(first.exclusive_groups.is_empty());
    }

    #[test]
    fn one_of_branches_are_grouped() {
        let doc = document(json!({
            "properties": {
                "p": {
                    "oneOf": [
                        {"type": "string"},
                        {"type": "number"}
                    ]
                }
            }
        }));
        let resolver = Resolver::new(&doc);

        let result = resolver
            .detailed_resolve(&Position::from_str("/p"))
            .unwrap();
        assert!(result.matches.is_empty());
        assert_eq!(1, result.exclusive_groups.len());
        assert_eq!(
            vec!["/properties/p/oneOf/0", "/properties/p/oneOf/1"],
            fragments(&result.exclusive_groups[0])
        );
    }

    #[test]
    fn all_of_members_resolve_through() {
        let doc = document(json!({
            "allOf": [
                {"properties": {"a": {"type": "string"}}},
                {"properties": {"b": {"type": "integer"}}}
            ]
        }));
        let resolver = Resolver::new(&doc);

        let found = resolver.resolve(&Position::from_str("/b")).unwrap();
        assert_eq!(vec!["/allOf/1/properties/b"], fragments(&found));
    }

    #[test]
    fn additional_properties_false_prunes() {
        let doc = document(json!({
            "properties": {"known": {}},
            "additionalProperties": false
        }));
        let resolver = Resolver::new(&doc);

        let result = resolver
            .detailed_resolve(&Position::from_str("/unknown"))
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn additional_properties_schema_applies() {
        let doc = document(json!({
            "additionalProperties": {"type": "string"}
        }));
        let resolver = Resolver::new(&doc);

        let found = resolver.resolve(&Position::from_str("/anything")).unwrap();
        assert_eq!(vec!["/additionalProperties"], fragments(&found));
    }

    #[test]
    fn type_mismatch_prunes_before_stepping() {
        let doc = document(json!({
            "anyOf": [
                {"type": "string"},
                {"type": "object", "properties": {"p": {"type": "integer"}}}
            ]
        }));
        let resolver = Resolver::new(&doc);

        // Only the object alternative survives a property step.
        let found = resolver.resolve(&Position::from_str("/p")).unwrap();
        assert_eq!(vec!["/anyOf/1/properties/p"], fragments(&found));
    }

    #[test]
    fn tuple_items_and_overflow() {
        let doc = document(json!({
            "items": [{"type": "string"}, {"type": "integer"}],
            "additionalItems": {"type": "boolean"}
        }));
        let resolver = Resolver::new(&doc);

        assert_eq!(
            vec!["/items/1"],
            fragments(&resolver.resolve(&Position::from_str("/1")).unwrap())
        );
        assert_eq!(
            vec!["/additionalItems"],
            fragments(&resolver.resolve(&Position::from_str("/7")).unwrap())
        );
    }

    #[test]
    fn recursive_ref_short_circuits() {
        let doc = document(json!({
            "definitions": {
                "tree": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "kids": {"type": "array", "items": {"$ref": "#/definitions/tree"}}
                    }
                }
            },
            "$ref": "#/definitions/tree"
        }));
        let resolver = Resolver::new(&doc);

        let found = resolver
            .resolve(&Position::from_str("/kids/0/value"))
            .unwrap();
        assert_eq!(
            vec!["/definitions/tree/properties/value"],
            fragments(&found)
        );
    }

    #[test]
    fn unresolved_ref_is_anything() {
        let doc = document(json!({
            "properties": {"p": {"$ref": "http://elsewhere/missing.json"}}
        }));
        let resolver = Resolver::new(&doc);

        // The branch is "anything matches": no candidates, not an error.
        let result = resolver.detailed_resolve(&Position::from_str("/p")).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn terminal_resolve_skips_last_expansion() {
        let doc = document(json!({
            "properties": {
                "p": {
                    "description": "docs live here",
                    "oneOf": [{"type": "string"}, {"type": "number"}]
                }
            }
        }));
        let resolver = Resolver::new(&doc);
        let position = Position::from_str("/p");

        // Documentation lookup wants the literal terminal schema.
        let terminal = resolver.terminal_resolve(&position).unwrap();
        assert_eq!(vec!["/properties/p"], fragments(&terminal));

        // Regular resolution expands it.
        let expanded = resolver.resolve(&position).unwrap();
        assert_eq!(2, expanded.len());
    }

    #[test]
    fn if_then_else_branches_resolve_declared_properties() {
        let doc = document(json!({
            "type": "object",
            "if": {"properties": {"kind": {"const": "a"}}},
            "then": {"properties": {"a_only": {"type": "string"}}},
            "else": {"properties": {"b_only": {"type": "integer"}}}
        }));
        let resolver = Resolver::new(&doc);

        let found = resolver.resolve(&Position::from_str("/a_only")).unwrap();
        assert_eq!(vec!["/then/properties/a_only"], fragments(&found));
    }

    #[test]
    fn navigation_target_prefers_value_compatible_branch() {
        let doc = document(json!({
            "properties": {
                "p": {
                    "oneOf": [
                        {"type": "string", "title": "s"},
                        {"type": "object", "title": "o"}
                    ]
                }
            }
        }));
        let resolver = Resolver::new(&doc);

        let target = resolver
            .find_navigation_target(
                &Position::from_str("/p"),
                types::OBJECT,
                Some(types::OBJECT),
            )
            .unwrap()
            .unwrap();
        assert_eq!(Some("o"), target.title.as_deref());
    }

    #[test]
    fn foreign_document_refs_keep_their_document() {
        struct Pack(Vec<Arc<SchemaDocument>>);
        impl SchemaProvider for Pack {
            fn document(&self, url: &url::Url) -> Option<Arc<SchemaDocument>> {
                self.0.iter().find(|d| &d.url == url).cloned()
            }
        }

        let shared = url::Url::parse("schema://shared").unwrap();
        let shared = Arc::new(
            schema::read_schema(
                shared,
                &json!({
                    "properties": {"q": {"$ref": "#/definitions/d"}},
                    "definitions": {"d": {"type": "boolean"}}
                }),
            )
            .unwrap(),
        );
        let doc = document(json!({
            "properties": {"p": {"$ref": "schema://shared"}},
            "definitions": {"d": {"type": "string"}}
        }));
        let pack = Pack(vec![shared]);
        let resolver = Resolver::with_provider(&doc, &pack);

        // The shared document's internal ref lands in its own definitions.
        let found = resolver.resolve(&Position::from_str("/p/q")).unwrap();
        assert_eq!(1, found.len());
        assert_eq!(
            "schema://shared#/definitions/d",
            found[0].curi.as_str(),
        );
        assert_eq!(Some(types::BOOLEAN), found[0].types);
    }

    #[test]
    fn cancellation_aborts_cleanly() {
        let doc = document(json!({
            "properties": {"p": {"type": "string"}}
        }));
        let cancel = Cancel::new();
        cancel.cancel();
        let resolver = Resolver::new(&doc).with_cancel(cancel);

        assert!(matches!(
            resolver.resolve(&Position::from_str("/p")),
            Err(Error::Cancelled)
        ));
    }
}
