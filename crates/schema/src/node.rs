use crate::{types, Number};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pattern holds a `pattern` or `patternProperties` keyword source together
/// with its compiled form. A pattern which fails to compile is kept, so that
/// validation can report the compile error distinctly from a mismatch.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub text: String,
    pub compiled: Result<regex::Regex, String>,
}

impl Pattern {
    pub fn new(text: &str) -> Pattern {
        Pattern {
            text: text.to_string(),
            compiled: regex::Regex::new(text).map_err(|err| err.to_string()),
        }
    }

    /// Whether the pattern matches `haystack`, or None if it didn't compile.
    pub fn matches(&self, haystack: &str) -> Option<bool> {
        match &self.compiled {
            Ok(re) => Some(re.is_match(haystack)),
            Err(_) => None,
        }
    }
}

/// Additional is the policy of `additionalProperties` or `additionalItems`:
/// either an allow flag or a schema which additional members must match.
#[derive(Debug, Clone)]
pub enum Additional {
    Allowed(bool),
    Schema(Arc<SchemaNode>),
}

/// One `if`/`then`/`else` conditional group.
#[derive(Debug, Clone)]
pub struct IfThenElse {
    pub r#if: Arc<SchemaNode>,
    pub then: Option<Arc<SchemaNode>>,
    pub r#else: Option<Arc<SchemaNode>>,
}

/// SchemaNode is one immutable schema object. Its identity is its canonical
/// URI: the owning document URL plus the JSON-pointer fragment of its location
/// within that document. Two nodes with equal identity are interchangeable.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub curi: url::Url,

    /// Some(true) / Some(false) for the boolean schemas `true` / `false`.
    pub always: Option<bool>,

    pub types: Option<types::Set>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,

    // Numeric constraints. Draft-04 expressed exclusivity as boolean flags
    // modifying minimum/maximum; later drafts use standalone numeric bounds.
    // Both forms are stored; the numeric form wins when both are present.
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: Option<Number>,
    pub exclusive_maximum: Option<Number>,
    pub exclusive_minimum_flag: bool,
    pub exclusive_maximum_flag: bool,
    pub multiple_of: Option<Number>,

    // String constraints.
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,

    // Array constraints.
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
    pub items: Option<Arc<SchemaNode>>,
    pub tuple_items: Option<Vec<Arc<SchemaNode>>>,
    pub additional_items: Option<Additional>,
    pub contains: Option<Arc<SchemaNode>>,

    // Object constraints.
    pub properties: BTreeMap<String, Arc<SchemaNode>>,
    pub pattern_properties: Vec<(Pattern, Arc<SchemaNode>)>,
    pub additional_properties: Option<Additional>,
    pub property_names: Option<Arc<SchemaNode>>,
    pub required: Vec<String>,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,
    pub property_dependencies: BTreeMap<String, Vec<String>>,
    pub schema_dependencies: BTreeMap<String, Arc<SchemaNode>>,

    // Combinators.
    pub all_of: Option<Vec<Arc<SchemaNode>>>,
    pub any_of: Option<Vec<Arc<SchemaNode>>>,
    pub one_of: Option<Vec<Arc<SchemaNode>>>,
    pub not: Option<Arc<SchemaNode>>,
    pub if_then_else: Vec<IfThenElse>,

    // Metadata. `format` is stored but never validated.
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub deprecated: Option<String>,
    pub format: Option<String>,

    /// `$ref` target, resolved through the owning document or a provider.
    pub reference: Option<String>,
    pub recursive_ref: bool,

    /// The node this node was merged from, when produced by `merge`.
    pub merged_from: Option<Arc<SchemaNode>>,
    /// Cleared when a merge proves the node can never match any value
    /// (empty type intersection).
    pub valid_by_exclusion: bool,
}

/// PropertyMatch is the three-valued result of locating the schema which
/// governs a named property or array index of this node.
#[derive(Debug, Clone)]
pub enum PropertyMatch<'s> {
    /// A named, pattern, or additional-members schema authorizes the member.
    Schema(&'s Arc<SchemaNode>),
    /// Anything matches: no declared schema, additions implicitly allowed.
    Anything,
    /// Additions are explicitly prohibited and nothing else matched.
    Prohibited,
}

impl SchemaNode {
    pub fn new(curi: url::Url) -> SchemaNode {
        SchemaNode {
            curi,
            always: None,
            types: None,
            enum_values: None,
            const_value: None,
            minimum: None,
            maximum: None,
            exclusive_minimum: None,
            exclusive_maximum: None,
            exclusive_minimum_flag: false,
            exclusive_maximum_flag: false,
            multiple_of: None,
            min_length: None,
            max_length: None,
            pattern: None,
            min_items: None,
            max_items: None,
            unique_items: false,
            items: None,
            tuple_items: None,
            additional_items: None,
            contains: None,
            properties: BTreeMap::new(),
            pattern_properties: Vec::new(),
            additional_properties: None,
            property_names: None,
            required: Vec::new(),
            min_properties: None,
            max_properties: None,
            property_dependencies: BTreeMap::new(),
            schema_dependencies: BTreeMap::new(),
            all_of: None,
            any_of: None,
            one_of: None,
            not: None,
            if_then_else: Vec::new(),
            title: None,
            description: None,
            default: None,
            deprecated: None,
            format: None,
            reference: None,
            recursive_ref: false,
            merged_from: None,
            valid_by_exclusion: true,
        }
    }

    /// An "interesting" node carries composition keywords and must be expanded
    /// into its alternatives before a pointer step can be applied.
    pub fn is_interesting(&self) -> bool {
        self.reference.is_some()
            || self.all_of.is_some()
            || self.any_of.is_some()
            || self.one_of.is_some()
            || !self.if_then_else.is_empty()
    }

    /// Locate the schema governing the named property: an exact `properties`
    /// entry, else the first matching `patternProperties` entry, else the
    /// `additionalProperties` policy.
    pub fn property_schema<'s>(&'s self, name: &str) -> PropertyMatch<'s> {
        if let Some(child) = self.properties.get(name) {
            return PropertyMatch::Schema(child);
        }
        for (pattern, child) in &self.pattern_properties {
            if pattern.matches(name) == Some(true) {
                return PropertyMatch::Schema(child);
            }
        }
        match &self.additional_properties {
            Some(Additional::Schema(child)) => PropertyMatch::Schema(child),
            Some(Additional::Allowed(false)) => PropertyMatch::Prohibited,
            Some(Additional::Allowed(true)) | None => PropertyMatch::Anything,
        }
    }

    /// Locate the schema governing the indexed element: the single `items`
    /// schema, else the tuple `items` entry at the position with the
    /// `additionalItems` policy beyond the tuple, else a property named by the
    /// stringified index (legacy tuple-as-object compatibility).
    pub fn item_schema<'s>(&'s self, index: usize) -> PropertyMatch<'s> {
        if let Some(items) = &self.items {
            return PropertyMatch::Schema(items);
        }
        if let Some(tuple) = &self.tuple_items {
            if let Some(child) = tuple.get(index) {
                return PropertyMatch::Schema(child);
            }
            return match &self.additional_items {
                Some(Additional::Schema(child)) => PropertyMatch::Schema(child),
                Some(Additional::Allowed(false)) => PropertyMatch::Prohibited,
                Some(Additional::Allowed(true)) | None => PropertyMatch::Anything,
            };
        }
        if let Some(child) = self.properties.get(&index.to_string()) {
            return PropertyMatch::Schema(child);
        }
        PropertyMatch::Anything
    }

    /// Merge `other` into `base`, producing a new node with `other`'s
    /// identity. Lists and maps union, scalars are last-writer-wins, and the
    /// type merge keeps the narrowest common type. An empty type intersection
    /// keeps the incoming type but clears `valid_by_exclusion`, so downstream
    /// logic treats the node as non-matching without erroring.
    pub fn merge(base: &Arc<SchemaNode>, other: &Arc<SchemaNode>) -> SchemaNode {
        let mut out = (**base).clone();
        let inc = &**other;

        out.curi = inc.curi.clone();
        out.merged_from = Some(base.clone());

        match (base.types, inc.types) {
            (Some(lhs), Some(rhs)) => {
                let narrowed = lhs & rhs;
                if narrowed.is_empty() {
                    out.types = Some(rhs);
                    out.valid_by_exclusion = false;
                } else {
                    out.types = Some(narrowed);
                }
            }
            (None, Some(rhs)) => out.types = Some(rhs),
            _ => (),
        }

        // Scalars: the incoming writer wins.
        out.always = inc.always.or(out.always);
        out.const_value = inc.const_value.clone().or(out.const_value);
        out.minimum = inc.minimum.or(out.minimum);
        out.maximum = inc.maximum.or(out.maximum);
        out.exclusive_minimum = inc.exclusive_minimum.or(out.exclusive_minimum);
        out.exclusive_maximum = inc.exclusive_maximum.or(out.exclusive_maximum);
        out.exclusive_minimum_flag = inc.exclusive_minimum_flag || out.exclusive_minimum_flag;
        out.exclusive_maximum_flag = inc.exclusive_maximum_flag || out.exclusive_maximum_flag;
        out.multiple_of = inc.multiple_of.or(out.multiple_of);
        out.min_length = inc.min_length.or(out.min_length);
        out.max_length = inc.max_length.or(out.max_length);
        out.pattern = inc.pattern.clone().or(out.pattern);
        out.min_items = inc.min_items.or(out.min_items);
        out.max_items = inc.max_items.or(out.max_items);
        out.unique_items = inc.unique_items || out.unique_items;
        out.items = inc.items.clone().or(out.items);
        out.tuple_items = inc.tuple_items.clone().or(out.tuple_items);
        out.additional_items = inc.additional_items.clone().or(out.additional_items);
        out.contains = inc.contains.clone().or(out.contains);
        out.additional_properties = inc
            .additional_properties
            .clone()
            .or(out.additional_properties);
        out.property_names = inc.property_names.clone().or(out.property_names);
        out.min_properties = inc.min_properties.or(out.min_properties);
        out.max_properties = inc.max_properties.or(out.max_properties);
        out.not = inc.not.clone().or(out.not);
        out.title = inc.title.clone().or(out.title);
        out.description = inc.description.clone().or(out.description);
        out.default = inc.default.clone().or(out.default);
        out.deprecated = inc.deprecated.clone().or(out.deprecated);
        out.format = inc.format.clone().or(out.format);
        out.reference = inc.reference.clone().or(out.reference);
        out.recursive_ref = inc.recursive_ref || out.recursive_ref;
        out.valid_by_exclusion = out.valid_by_exclusion && inc.valid_by_exclusion;

        // Lists and maps union. Map entries of the incoming node win.
        if let Some(inc_enum) = &inc.enum_values {
            let mut merged = out.enum_values.take().unwrap_or_default();
            for value in inc_enum {
                if !merged.contains(value) {
                    merged.push(value.clone());
                }
            }
            out.enum_values = Some(merged);
        }
        out.properties
            .extend(inc.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        out.pattern_properties
            .extend(inc.pattern_properties.iter().cloned());
        for name in &inc.required {
            if !out.required.contains(name) {
                out.required.push(name.clone());
            }
        }
        out.property_dependencies.extend(
            inc.property_dependencies
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        out.schema_dependencies.extend(
            inc.schema_dependencies
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        for (lhs, rhs) in [
            (&mut out.all_of, &inc.all_of),
            (&mut out.any_of, &inc.any_of),
            (&mut out.one_of, &inc.one_of),
        ] {
            if let Some(rhs) = rhs {
                lhs.get_or_insert_with(Vec::new).extend(rhs.iter().cloned());
            }
        }
        out.if_then_else.extend(inc.if_then_else.iter().cloned());

        out
    }
}

impl PartialEq for SchemaNode {
    fn eq(&self, other: &Self) -> bool {
        self.curi == other.curi
    }
}
impl Eq for SchemaNode {}
