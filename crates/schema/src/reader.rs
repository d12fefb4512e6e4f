use crate::{keywords as kw, types, Additional, IfThenElse, Number, Pattern, SchemaNode};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// Budget of queue-walk steps allowed while stabilizing `$ref` targets.
/// A reference cycle that cannot stabilize within the budget is fatal.
const REF_RESOLUTION_BUDGET: usize = 10_000;

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("expected a schema object or boolean at '{0}'")]
    ExpectedSchema(String),
    #[error("schema reference cycle did not stabilize within {budget} steps (while resolving '{reference}')")]
    Cycle { reference: String, budget: usize },
    #[error("failed to parse schema URL: {0}")]
    Url(#[from] url::ParseError),
}

/// RefTarget is the resolution of one `$ref` string within a document.
#[derive(Debug, Clone)]
pub enum RefTarget {
    Node(Arc<SchemaNode>),
    /// The reference points outside this document (or at nothing). Non-fatal:
    /// the branch resolves as "anything matches", and a schema provider may
    /// still resolve it across documents.
    Unresolved,
}

/// SchemaDocument is a fully read schema: the root node, a pointer index of
/// every node within the document, an `$id` index, and the stabilized
/// resolutions of every intra-document `$ref`.
#[derive(Debug)]
pub struct SchemaDocument {
    pub url: url::Url,
    pub root: Arc<SchemaNode>,
    index: BTreeMap<String, Arc<SchemaNode>>,
    ids: BTreeMap<String, Arc<SchemaNode>>,
    resolved: BTreeMap<String, RefTarget>,
}

impl SchemaDocument {
    /// Look up the stabilized target of a `$ref` string.
    pub fn resolve_ref(&self, reference: &str) -> Option<&RefTarget> {
        self.resolved.get(reference)
    }

    /// Look up a node by its JSON-pointer location within the document.
    pub fn node_at(&self, pointer: &str) -> Option<&Arc<SchemaNode>> {
        self.index.get(pointer)
    }
}

/// Read a raw JSON-like tree into a SchemaDocument.
///
/// The parse is lenient and forward-compatible: unknown keywords are ignored,
/// and a keyword present with the wrong JSON type is skipped. The only fatal
/// outcomes are a non-schema root and a `$ref` cycle which cannot stabilize.
pub fn read_schema(url: url::Url, raw: &Value) -> Result<SchemaDocument, ReadError> {
    let mut reader = Reader {
        url: url.clone(),
        index: BTreeMap::new(),
        ids: BTreeMap::new(),
    };

    let root = match raw {
        Value::Object(_) | Value::Bool(_) => reader.build(raw, String::new()),
        _ => return Err(ReadError::ExpectedSchema(url.to_string())),
    };

    let resolved = reader.stabilize_refs(&root)?;

    Ok(SchemaDocument {
        url,
        root,
        index: reader.index,
        ids: reader.ids,
        resolved,
    })
}

struct Reader {
    url: url::Url,
    index: BTreeMap<String, Arc<SchemaNode>>,
    ids: BTreeMap<String, Arc<SchemaNode>>,
}

impl Reader {
    /// Build the node at `pointer`, bottom-up, registering it (and every
    /// subschema) in the pointer index and the `$id` index.
    fn build(&mut self, raw: &Value, pointer: String) -> Arc<SchemaNode> {
        let mut curi = self.url.clone();
        curi.set_fragment(if pointer.is_empty() {
            None
        } else {
            Some(&pointer)
        });
        let mut node = SchemaNode::new(curi);

        let obj = match raw {
            Value::Object(obj) => obj,
            Value::Bool(b) => {
                node.always = Some(*b);
                return self.register(node, pointer);
            }
            // Not a schema. Treat as the empty schema (lenient).
            _ => return self.register(node, pointer),
        };

        // `if` / `then` / `else` form one conditional group per schema object.
        let mut if_schema = None;
        let mut then_schema = None;
        let mut else_schema = None;

        for (keyword, v) in obj {
            match keyword.as_str() {
                kw::TYPE => node.types = types::Set::from_value(v),
                kw::ENUM => {
                    if let Value::Array(arr) = v {
                        node.enum_values = Some(arr.clone());
                    }
                }
                kw::CONST => node.const_value = Some(v.clone()),

                kw::MINIMUM => node.minimum = Number::from_value(v),
                kw::MAXIMUM => node.maximum = Number::from_value(v),
                kw::EXCLUSIVE_MINIMUM => match v {
                    Value::Number(_) => node.exclusive_minimum = Number::from_value(v),
                    Value::Bool(flag) => node.exclusive_minimum_flag = *flag,
                    _ => (),
                },
                kw::EXCLUSIVE_MAXIMUM => match v {
                    Value::Number(_) => node.exclusive_maximum = Number::from_value(v),
                    Value::Bool(flag) => node.exclusive_maximum_flag = *flag,
                    _ => (),
                },
                kw::MULTIPLE_OF => node.multiple_of = Number::from_value(v),

                kw::MIN_LENGTH => node.min_length = as_usize(v),
                kw::MAX_LENGTH => node.max_length = as_usize(v),
                kw::PATTERN => {
                    if let Value::String(text) = v {
                        node.pattern = Some(Pattern::new(text));
                    }
                }

                kw::MIN_ITEMS => node.min_items = as_usize(v),
                kw::MAX_ITEMS => node.max_items = as_usize(v),
                kw::UNIQUE_ITEMS => {
                    if let Value::Bool(flag) = v {
                        node.unique_items = *flag;
                    }
                }
                kw::ITEMS => match v {
                    Value::Object(_) | Value::Bool(_) => {
                        node.items = Some(self.child(v, &pointer, kw::ITEMS));
                    }
                    Value::Array(arr) => {
                        node.tuple_items = Some(self.tuple(arr, &pointer, kw::ITEMS));
                    }
                    _ => (),
                },
                kw::ADDITIONAL_ITEMS => {
                    node.additional_items = self.additional(v, &pointer, kw::ADDITIONAL_ITEMS);
                }
                kw::CONTAINS => node.contains = Some(self.child(v, &pointer, kw::CONTAINS)),

                kw::PROPERTIES => {
                    if let Value::Object(props) = v {
                        for (name, child) in props {
                            let child = self.named_child(child, &pointer, kw::PROPERTIES, name);
                            node.properties.insert(name.clone(), child);
                        }
                    }
                }
                kw::PATTERN_PROPERTIES => {
                    if let Value::Object(props) = v {
                        for (text, child) in props {
                            let child =
                                self.named_child(child, &pointer, kw::PATTERN_PROPERTIES, text);
                            node.pattern_properties.push((Pattern::new(text), child));
                        }
                    }
                }
                kw::ADDITIONAL_PROPERTIES => {
                    node.additional_properties =
                        self.additional(v, &pointer, kw::ADDITIONAL_PROPERTIES);
                }
                kw::PROPERTY_NAMES => {
                    node.property_names = Some(self.child(v, &pointer, kw::PROPERTY_NAMES));
                }
                kw::REQUIRED => {
                    if let Value::Array(arr) = v {
                        node.required = arr
                            .iter()
                            .filter_map(|item| item.as_str().map(str::to_string))
                            .collect();
                    }
                }
                kw::MIN_PROPERTIES => node.min_properties = as_usize(v),
                kw::MAX_PROPERTIES => node.max_properties = as_usize(v),
                kw::DEPENDENT_REQUIRED => {
                    if let Value::Object(deps) = v {
                        for (name, needs) in deps {
                            if let Some(needs) = as_string_array(needs) {
                                node.property_dependencies.insert(name.clone(), needs);
                            }
                        }
                    }
                }
                kw::DEPENDENT_SCHEMAS => {
                    if let Value::Object(deps) = v {
                        for (name, child) in deps {
                            let child =
                                self.named_child(child, &pointer, kw::DEPENDENT_SCHEMAS, name);
                            node.schema_dependencies.insert(name.clone(), child);
                        }
                    }
                }
                // Draft-04 `dependencies` splits by value shape.
                kw::DEPENDENCIES => {
                    if let Value::Object(deps) = v {
                        for (name, dep) in deps {
                            if let Some(needs) = as_string_array(dep) {
                                node.property_dependencies.insert(name.clone(), needs);
                            } else if matches!(dep, Value::Object(_) | Value::Bool(_)) {
                                let child =
                                    self.named_child(dep, &pointer, kw::DEPENDENCIES, name);
                                node.schema_dependencies.insert(name.clone(), child);
                            }
                        }
                    }
                }

                kw::ALL_OF => node.all_of = self.list(v, &pointer, kw::ALL_OF),
                kw::ANY_OF => node.any_of = self.list(v, &pointer, kw::ANY_OF),
                kw::ONE_OF => node.one_of = self.list(v, &pointer, kw::ONE_OF),
                kw::NOT => node.not = Some(self.child(v, &pointer, kw::NOT)),
                kw::IF => if_schema = Some(self.child(v, &pointer, kw::IF)),
                kw::THEN => then_schema = Some(self.child(v, &pointer, kw::THEN)),
                kw::ELSE => else_schema = Some(self.child(v, &pointer, kw::ELSE)),

                kw::TITLE => node.title = v.as_str().map(str::to_string),
                kw::DESCRIPTION => node.description = v.as_str().map(str::to_string),
                kw::DEFAULT => node.default = Some(v.clone()),
                kw::DEPRECATED => match v {
                    Value::String(message) => node.deprecated = Some(message.clone()),
                    Value::Bool(true) => node.deprecated = Some("deprecated".to_string()),
                    _ => (),
                },
                kw::FORMAT => node.format = v.as_str().map(str::to_string),

                kw::REF => node.reference = v.as_str().map(str::to_string),
                kw::RECURSIVE_REF => {
                    if let Some(reference) = v.as_str() {
                        node.reference = Some(reference.to_string());
                        node.recursive_ref = true;
                    }
                }

                // Definitions play no direct validation role, but their
                // subschemas are read and indexed so `$ref` can reach them.
                kw::DEFS | kw::DEFINITIONS => {
                    if let Value::Object(defs) = v {
                        for (name, child) in defs {
                            self.named_child(child, &pointer, keyword, name);
                        }
                    }
                }

                kw::ID | kw::ID_LEGACY | kw::SCHEMA => (), // Handled below / ignored.

                // Unknown keywords are ignored (forward-compatible).
                _ => (),
            }
        }

        if let Some(r#if) = if_schema {
            node.if_then_else.push(IfThenElse {
                r#if,
                then: then_schema,
                r#else: else_schema,
            });
        }

        let id = obj
            .get(kw::ID)
            .or_else(|| obj.get(kw::ID_LEGACY))
            .and_then(Value::as_str)
            .map(str::to_string);

        let node = self.register(node, pointer);
        if let Some(id) = id {
            self.ids.insert(id, node.clone());
        }
        node
    }

    fn register(&mut self, node: SchemaNode, pointer: String) -> Arc<SchemaNode> {
        let node = Arc::new(node);
        self.index.insert(pointer, node.clone());
        node
    }

    fn child(&mut self, raw: &Value, pointer: &str, keyword: &str) -> Arc<SchemaNode> {
        self.build(raw, format!("{pointer}/{keyword}"))
    }

    fn named_child(
        &mut self,
        raw: &Value,
        pointer: &str,
        keyword: &str,
        name: &str,
    ) -> Arc<SchemaNode> {
        let name = name.replace('~', "~0").replace('/', "~1");
        self.build(raw, format!("{pointer}/{keyword}/{name}"))
    }

    fn tuple(&mut self, arr: &[Value], pointer: &str, keyword: &str) -> Vec<Arc<SchemaNode>> {
        arr.iter()
            .enumerate()
            .map(|(ind, child)| self.build(child, format!("{pointer}/{keyword}/{ind}")))
            .collect()
    }

    fn list(&mut self, raw: &Value, pointer: &str, keyword: &str) -> Option<Vec<Arc<SchemaNode>>> {
        match raw {
            Value::Array(arr) => Some(self.tuple(arr, pointer, keyword)),
            _ => None,
        }
    }

    fn additional(&mut self, raw: &Value, pointer: &str, keyword: &str) -> Option<Additional> {
        match raw {
            Value::Bool(flag) => Some(Additional::Allowed(*flag)),
            Value::Object(_) => Some(Additional::Schema(self.child(raw, pointer, keyword))),
            _ => None,
        }
    }

    /// Walk every `$ref` of the document through a queue until each resolves
    /// to a stable target. Refs-to-refs are re-queued; `#` resolves to the
    /// root; pointer refs walk the index; other refs try the `$id` index and
    /// otherwise stay Unresolved for a cross-document provider.
    fn stabilize_refs(
        &self,
        root: &Arc<SchemaNode>,
    ) -> Result<BTreeMap<String, RefTarget>, ReadError> {
        let mut resolved = BTreeMap::new();
        resolved.insert("#".to_string(), RefTarget::Node(root.clone()));

        let mut queue: VecDeque<String> = self
            .index
            .values()
            .filter_map(|node| node.reference.clone())
            .collect();

        let mut steps = 0;
        while let Some(reference) = queue.pop_front() {
            steps += 1;
            if steps > REF_RESOLUTION_BUDGET {
                return Err(ReadError::Cycle {
                    reference,
                    budget: REF_RESOLUTION_BUDGET,
                });
            }
            if resolved.contains_key(&reference) {
                continue;
            }

            let target = match self.lookup(&reference) {
                Some(target) => target,
                None => {
                    tracing::debug!(%reference, "schema $ref does not resolve within this document");
                    resolved.insert(reference, RefTarget::Unresolved);
                    continue;
                }
            };

            match &target.reference {
                // A ref-to-ref which already stabilized, or which points right
                // back at itself: attach the target as-is. Query-time visited
                // sets short-circuit the recursion.
                Some(next) if *next == reference => {
                    resolved.insert(reference, RefTarget::Node(target));
                }
                Some(next) => match resolved.get(next) {
                    Some(RefTarget::Node(_)) | Some(RefTarget::Unresolved) => {
                        resolved.insert(reference, RefTarget::Node(target));
                    }
                    None => {
                        // Not stable yet. Re-queue behind the inner ref.
                        queue.push_back(next.clone());
                        queue.push_back(reference);
                    }
                },
                None => {
                    resolved.insert(reference, RefTarget::Node(target));
                }
            }
        }

        Ok(resolved)
    }

    fn lookup(&self, reference: &str) -> Option<Arc<SchemaNode>> {
        if let Some(pointer) = reference.strip_prefix('#') {
            if pointer.starts_with('/') {
                return self.index.get(pointer).cloned();
            }
        }
        self.ids.get(reference).cloned()
    }
}

fn as_usize(v: &Value) -> Option<usize> {
    v.as_u64().map(|n| n as usize)
}

fn as_string_array(v: &Value) -> Option<Vec<String>> {
    match v {
        Value::Array(arr) => arr
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}
