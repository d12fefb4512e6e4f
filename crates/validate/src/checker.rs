use crate::error::{IssueData, MissingProperty, Priority, ValidationError};
use crate::value::{AsValue, Field, Fields, Kind, ValueId};
use fxhash::FxHashSet;
use itertools::Itertools;
use resolve::{MatchResult, NullProvider, SchemaProvider};
use schema::{types, Number, PropertyMatch, RefTarget, SchemaDocument, SchemaNode};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Tolerance for `multipleOf` over binary floating point, where a remainder
/// like 0.3 % 0.1 is never exactly zero.
const MULTIPLE_OF_EPSILON: f64 = 1e-6;

/// More than this many low-priority failures in one candidate weighs like a
/// single medium failure during least-wrong selection.
const LOW_FAILURE_CAP: usize = 3;

/// Knobs a host may turn when checking compliance of a whole document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceOptions {
    /// Compare enum strings case-insensitively.
    pub case_insensitive_enums: bool,
    /// Flag undeclared properties even where the schema leaves them open.
    pub force_strict: bool,
    /// Also flag declared-but-absent optional properties.
    pub report_missing_optional_properties: bool,
}

/// Checker walks a concrete value against schema candidates and accumulates
/// diagnostics: at most one per value node, first write wins. Checking a
/// candidate speculatively (combinator alternatives, `not`, `if` predicates)
/// runs in a scratch sub-checker whose errors are merged selectively.
pub struct Checker<'a, P: SchemaProvider = NullProvider> {
    document: &'a SchemaDocument,
    provider: &'a P,
    options: ComplianceOptions,
    errors: Vec<ValidationError>,
    claimed: FxHashSet<ValueId>,
    // (value, schema curi) pairs on the current recursion stack, to cut
    // self-referential schema cycles over a single value node.
    active: FxHashSet<(ValueId, String)>,
}

impl<'a> Checker<'a, NullProvider> {
    pub fn new(document: &'a SchemaDocument) -> Self {
        Checker::with_provider(document, &NullProvider)
    }
}

impl<'a, P: SchemaProvider> Checker<'a, P> {
    pub fn with_provider(document: &'a SchemaDocument, provider: &'a P) -> Self {
        Checker {
            document,
            provider,
            options: ComplianceOptions::default(),
            errors: Vec::new(),
            claimed: FxHashSet::default(),
            active: FxHashSet::default(),
        }
    }

    pub fn with_options(mut self, options: ComplianceOptions) -> Self {
        self.options = options;
        self
    }

    /// Check `value` against a single schema.
    pub fn check_by_schema<N: AsValue>(&mut self, value: &N, schema: &Arc<SchemaNode>) {
        self.check_value(value, schema);
    }

    /// Check `value` against a resolved match result: plain matches use
    /// anyOf semantics, and each exclusive group must match exactly once.
    pub fn check_by_match_result<N: AsValue>(&mut self, value: &N, result: &MatchResult) {
        for group in &result.exclusive_groups {
            self.check_alternatives(value, group, true);
        }
        match result.matches.len() {
            0 => (),
            1 => self.check_value(value, &result.matches[0]),
            _ => self.check_alternatives(value, &result.matches, false),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn check_value<N: AsValue>(&mut self, value: &N, schema: &Arc<SchemaNode>) {
        let key = (value.value_id(), schema.curi.to_string());
        if !self.active.insert(key.clone()) {
            return;
        }
        self.check_keywords(value, schema);
        self.active.remove(&key);
    }

    fn check_keywords<N: AsValue>(&mut self, value: &N, schema: &Arc<SchemaNode>) {
        if schema.always == Some(false) {
            self.report(ValidationError::new(
                value.value_id(),
                "no value can match this schema",
                IssueData::None,
                Priority::NotSchema,
            ));
            return;
        }

        if let Some(reference) = &schema.reference {
            match self.resolve_reference(schema, reference) {
                Some(target) => self.check_value(value, &target),
                // An unresolved reference matches anything; sibling
                // keywords below still apply.
                None => tracing::warn!(%reference, "skipping checks of an unresolved $ref"),
            }
        }

        let observed = observed_types(value);
        let mut kind_checks = true;
        if !schema.valid_by_exclusion {
            self.report_type_error(value, schema.types.unwrap_or(types::INVALID), true);
            kind_checks = false;
        } else if let Some(declared) = schema.types {
            if !declared.overlaps(observed) {
                self.report_type_error(value, declared, false);
                kind_checks = false;
            }
        }

        if kind_checks {
            match value.kind() {
                Kind::String(s) => {
                    self.check_string(value, s, schema);
                    // In loosely-typed formats, numeric-looking text gets its
                    // numeric constraints when the declared types ask for a
                    // number and not a string.
                    if !value.strings_are_typed() {
                        if let (Some(declared), Some(parsed)) = (schema.types, numeric_text(s)) {
                            if !declared.overlaps(types::STRING)
                                && declared.overlaps(types::INT_OR_FRAC)
                            {
                                self.check_number(value, Number::from(parsed), schema);
                            }
                        }
                    }
                }
                Kind::PosInt(n) => self.check_number(value, Number::from(n), schema),
                Kind::NegInt(n) => self.check_number(value, Number::from(n), schema),
                Kind::Float(n) => self.check_number(value, Number::from(n), schema),
                Kind::Array(items) => self.check_array(value, items, schema),
                Kind::Object(fields) => self.check_object(value, fields, schema),
                Kind::Bool(_) | Kind::Null => (),
            }
        }

        self.check_enum(value, schema);

        if let Some(not) = &schema.not {
            // A `not` that syntactically points back at its own containing
            // schema can never be satisfied and is skipped.
            if !self.points_back(not, schema) && self.trial(value, not).is_empty() {
                self.report(ValidationError::new(
                    value.value_id(),
                    "validates against the 'not' schema",
                    IssueData::None,
                    Priority::NotSchema,
                ));
            }
        }

        for group in &schema.if_then_else {
            let branch = if self.trial(value, &group.r#if).is_empty() {
                group.then.as_ref()
            } else {
                group.r#else.as_ref()
            };
            if let Some(branch) = branch {
                self.check_value(value, branch);
            }
        }

        if let Some(members) = &schema.all_of {
            for member in members {
                self.check_value(value, member);
            }
        }
        if let Some(members) = &schema.any_of {
            self.check_alternatives(value, members, false);
        }
        if let Some(members) = &schema.one_of {
            self.check_alternatives(value, members, true);
        }
    }

    /// Validate alternatives: any match suffices, except that an exclusive
    /// (`oneOf`) set matching more than one distinct branch is itself an
    /// error. When nothing matches, the least-wrong failures are reported.
    fn check_alternatives<N: AsValue>(
        &mut self,
        value: &N,
        members: &[Arc<SchemaNode>],
        exclusive: bool,
    ) {
        let mut matched: Vec<&SchemaNode> = Vec::new();
        let mut failures: Vec<Vec<ValidationError>> = Vec::new();

        for member in members {
            let errors = self.trial(value, member);
            if errors.is_empty() {
                if !exclusive {
                    return;
                }
                matched.push(&**member);
            } else {
                failures.push(errors);
            }
        }

        match matched.len() {
            0 => self.merge_least_wrong(value, failures, exclusive),
            1 => (),
            _ => {
                // Branches which are spellings of the same node (e.g. two
                // $refs of one target) are duplicates, not an ambiguity.
                let key = |m: &SchemaNode| {
                    m.reference.clone().unwrap_or_else(|| m.curi.to_string())
                };
                if matched.iter().any(|&m| key(m) != key(matched[0])) {
                    self.report(ValidationError::new(
                        value.value_id(),
                        "validates to more than one variant",
                        IssueData::None,
                        Priority::Medium,
                    ));
                }
            }
        }
    }

    /// Of the failed candidates, keep those in the best severity bucket, then
    /// those with the fewest errors. A single survivor reports verbatim;
    /// several survivors have their same-kind errors coalesced.
    fn merge_least_wrong<N: AsValue>(
        &mut self,
        value: &N,
        mut failures: Vec<Vec<ValidationError>>,
        exclusive: bool,
    ) {
        if failures.is_empty() {
            return;
        }
        let best = failures.iter().map(|f| severity(f)).min().unwrap_or(0);
        failures.retain(|f| severity(f) == best);
        let fewest = failures.iter().map(Vec::len).min().unwrap_or(0);
        failures.retain(|f| f.len() == fewest);

        if failures.len() == 1 {
            self.absorb(failures.into_iter().next().unwrap_or_default());
            return;
        }
        self.coalesce(value, failures, exclusive);
    }

    fn coalesce<N: AsValue>(
        &mut self,
        value: &N,
        failures: Vec<Vec<ValidationError>>,
        exclusive: bool,
    ) {
        let mut merged_types: BTreeMap<ValueId, types::Set> = BTreeMap::new();
        let mut merged_enums: BTreeMap<ValueId, Vec<serde_json::Value>> = BTreeMap::new();
        let mut missing_sets: Vec<Vec<MissingProperty>> = Vec::new();
        let mut rest: Vec<ValidationError> = Vec::new();
        let mut seen: FxHashSet<(ValueId, String)> = FxHashSet::default();

        for error in failures.into_iter().flatten() {
            match &error.issue {
                IssueData::TypeMismatch { expected } | IssueData::ProhibitedType { expected } => {
                    let merged = merged_types.entry(error.value).or_insert(types::INVALID);
                    *merged = *merged | *expected;
                }
                IssueData::NonEnumValue { expected } => {
                    let merged = merged_enums.entry(error.value).or_default();
                    for v in expected {
                        if !merged.contains(v) {
                            merged.push(v.clone());
                        }
                    }
                }
                IssueData::MissingProperty { properties } if error.value == value.value_id() => {
                    if !missing_sets.contains(properties) {
                        missing_sets.push(properties.clone());
                    }
                }
                _ => {
                    if seen.insert((error.value, error.message.clone())) {
                        rest.push(error);
                    }
                }
            }
        }

        for (id, expected) in merged_types {
            self.report(ValidationError::new(
                id,
                type_message(expected),
                IssueData::TypeMismatch { expected },
                Priority::TypeMismatch,
            ));
        }
        for (id, expected) in merged_enums {
            self.report(ValidationError::new(
                id,
                enum_message(&expected),
                IssueData::NonEnumValue { expected },
                Priority::Medium,
            ));
        }
        match missing_sets.len() {
            0 => (),
            1 => {
                let properties = missing_sets.into_iter().next().unwrap_or_default();
                self.report(ValidationError::new(
                    value.value_id(),
                    missing_message(&properties),
                    IssueData::MissingProperty { properties },
                    Priority::MissingProps,
                ));
            }
            _ => {
                let message = format!(
                    "one of the following property sets is required: {}",
                    missing_sets
                        .iter()
                        .map(|set| format!("({})", set.iter().map(|m| &m.name).format(", ")))
                        .format(" or "),
                );
                let issue = if exclusive {
                    IssueData::MissingOneOfProperty {
                        alternatives: missing_sets,
                    }
                } else {
                    IssueData::MissingAnyOfProperty {
                        alternatives: missing_sets,
                    }
                };
                self.report(ValidationError::new(
                    value.value_id(),
                    message,
                    issue,
                    Priority::MissingProps,
                ));
            }
        }
        for error in rest {
            self.report(error);
        }
    }

    fn check_number<N: AsValue>(&mut self, value: &N, number: Number, schema: &SchemaNode) {
        let id = value.value_id();

        if let Some(multiple) = schema.multiple_of {
            let m = multiple.as_f64();
            if m != 0.0 {
                let ratio = number.as_f64() / m;
                if (ratio - ratio.round()).abs() > MULTIPLE_OF_EPSILON {
                    self.report(ValidationError::new(
                        id,
                        format!("is not a multiple of {multiple}"),
                        IssueData::None,
                        Priority::Low,
                    ));
                }
            }
        }

        // Draft-04 expressed exclusivity as a boolean flag on minimum /
        // maximum; the standalone numeric bound wins when both are present.
        match (schema.exclusive_minimum, schema.minimum) {
            (Some(bound), _) | (None, Some(bound))
                if schema.exclusive_minimum_flag || schema.exclusive_minimum.is_some() =>
            {
                if number <= bound {
                    self.report(ValidationError::new(
                        id,
                        format!("less than or equals to an exclusive minimum {bound}"),
                        IssueData::None,
                        Priority::Low,
                    ));
                }
            }
            (None, Some(bound)) => {
                if number < bound {
                    self.report(ValidationError::new(
                        id,
                        format!("less than a minimum {bound}"),
                        IssueData::None,
                        Priority::Low,
                    ));
                }
            }
            _ => (),
        }
        match (schema.exclusive_maximum, schema.maximum) {
            (Some(bound), _) | (None, Some(bound))
                if schema.exclusive_maximum_flag || schema.exclusive_maximum.is_some() =>
            {
                if number >= bound {
                    self.report(ValidationError::new(
                        id,
                        format!("greater than or equals to an exclusive maximum {bound}"),
                        IssueData::None,
                        Priority::Low,
                    ));
                }
            }
            (None, Some(bound)) => {
                if number > bound {
                    self.report(ValidationError::new(
                        id,
                        format!("greater than a maximum {bound}"),
                        IssueData::None,
                        Priority::Low,
                    ));
                }
            }
            _ => (),
        }
    }

    fn check_string<N: AsValue>(&mut self, value: &N, text: &str, schema: &SchemaNode) {
        let id = value.value_id();
        let length = text.chars().count();

        if let Some(min) = schema.min_length {
            if length < min {
                self.report(ValidationError::new(
                    id,
                    format!("shorter than a minimum length {min}"),
                    IssueData::None,
                    Priority::Low,
                ));
            }
        }
        if let Some(max) = schema.max_length {
            if length > max {
                self.report(ValidationError::new(
                    id,
                    format!("longer than a maximum length {max}"),
                    IssueData::None,
                    Priority::Low,
                ));
            }
        }
        if let Some(pattern) = &schema.pattern {
            match &pattern.compiled {
                Ok(re) => {
                    if !re.is_match(text) {
                        self.report(ValidationError::new(
                            id,
                            format!("does not match the pattern '{}'", pattern.text),
                            IssueData::None,
                            Priority::Low,
                        ));
                    }
                }
                Err(err) => self.report(ValidationError::new(
                    id,
                    format!("cannot check the pattern '{}': {err}", pattern.text),
                    IssueData::None,
                    Priority::Low,
                )),
            }
        }
    }

    fn check_array<N: AsValue>(&mut self, value: &N, items: &[N], schema: &Arc<SchemaNode>) {
        let id = value.value_id();

        if let Some(min) = schema.min_items {
            if items.len() < min {
                self.report(ValidationError::new(
                    id,
                    format!("array has fewer items than a minimum {min}"),
                    IssueData::None,
                    Priority::Low,
                ));
            }
        }
        if let Some(max) = schema.max_items {
            if items.len() > max {
                self.report(ValidationError::new(
                    id,
                    format!("array has more items than a maximum {max}"),
                    IssueData::None,
                    Priority::Low,
                ));
            }
        }

        if schema.unique_items {
            // Textual equality; the repeating element is the one flagged.
            let mut seen: FxHashSet<String> = FxHashSet::default();
            for item in items {
                if !seen.insert(item.raw_text()) {
                    self.report(ValidationError::new(
                        item.value_id(),
                        "item is not unique",
                        IssueData::None,
                        Priority::Medium,
                    ));
                }
            }
        }

        for (index, item) in items.iter().enumerate() {
            match schema.item_schema(index) {
                PropertyMatch::Schema(child) => self.check_value(item, child),
                PropertyMatch::Prohibited => self.report(ValidationError::new(
                    item.value_id(),
                    "item is not allowed here",
                    IssueData::None,
                    Priority::Low,
                )),
                PropertyMatch::Anything => (),
            }
        }

        if let Some(contains) = &schema.contains {
            if !items.iter().any(|item| self.trial(item, contains).is_empty()) {
                self.report(ValidationError::new(
                    id,
                    "no item matches the 'contains' schema",
                    IssueData::None,
                    Priority::Medium,
                ));
            }
        }
    }

    fn check_object<N: AsValue>(&mut self, value: &N, fields: &N::Fields, schema: &Arc<SchemaNode>) {
        let id = value.value_id();

        let mut missing: Vec<MissingProperty> = schema
            .required
            .iter()
            .filter(|name| fields.get(name).is_none())
            .map(|name| MissingProperty {
                name: name.clone(),
                default: default_for(schema, name),
            })
            .collect();
        if !missing.is_empty() {
            // Entries with an inferrable default sort first, so a quick-fix
            // fills what it knows about.
            missing.sort_by_key(|m| m.default.is_none());
            self.report(ValidationError::new(
                id,
                missing_message(&missing),
                IssueData::MissingProperty {
                    properties: missing,
                },
                Priority::MissingProps,
            ));
        }

        if self.options.report_missing_optional_properties {
            let optional: Vec<MissingProperty> = schema
                .properties
                .iter()
                .filter(|(name, _)| {
                    !schema.required.contains(name) && fields.get(name).is_none()
                })
                .map(|(name, child)| MissingProperty {
                    name: name.clone(),
                    default: child.default.clone(),
                })
                .collect();
            if !optional.is_empty() {
                let message = format!(
                    "missing optional {}",
                    if optional.len() == 1 { "property" } else { "properties" },
                );
                self.report(ValidationError::new(
                    id,
                    format!(
                        "{} {}",
                        message,
                        optional.iter().map(|m| format!("'{}'", m.name)).format(", "),
                    ),
                    IssueData::MissingProperty {
                        properties: optional,
                    },
                    Priority::Low,
                ));
            }
        }

        if let Some(min) = schema.min_properties {
            if fields.len() < min {
                self.report(ValidationError::new(
                    id,
                    format!("object has fewer properties than a minimum {min}"),
                    IssueData::None,
                    Priority::Low,
                ));
            }
        }
        if let Some(max) = schema.max_properties {
            if fields.len() > max {
                self.report(ValidationError::new(
                    id,
                    format!("object has more properties than a maximum {max}"),
                    IssueData::None,
                    Priority::Low,
                ));
            }
        }

        for (name, needs) in &schema.property_dependencies {
            if fields.get(name).is_none() {
                continue;
            }
            let absent: Vec<&String> = needs.iter().filter(|n| fields.get(n).is_none()).collect();
            if !absent.is_empty() {
                let message = format!(
                    "property '{}' requires {}",
                    name,
                    absent.iter().map(|n| format!("'{n}'")).format(", "),
                );
                let properties = absent
                    .into_iter()
                    .map(|n| MissingProperty {
                        name: n.clone(),
                        default: default_for(schema, n),
                    })
                    .collect();
                self.report(ValidationError::new(
                    id,
                    message,
                    IssueData::MissingProperty { properties },
                    Priority::MissingProps,
                ));
            }
        }
        for (name, dependency) in &schema.schema_dependencies {
            if fields.get(name).is_some() {
                let errors = self.trial(value, dependency);
                self.absorb(errors);
            }
        }

        if let Some(names_schema) = &schema.property_names {
            for field in fields.iter() {
                let name = NameValue {
                    text: field.property().to_string(),
                    id: field.value().value_id(),
                };
                if let Some(error) = self.trial(&name, names_schema).into_iter().next() {
                    self.report(ValidationError::new(
                        name.id,
                        format!("property name '{}' {}", name.text, error.message),
                        IssueData::None,
                        Priority::Low,
                    ));
                }
            }
        }

        for field in fields.iter() {
            let name = field.property();
            let child = field.value();
            match schema.property_schema(name) {
                PropertyMatch::Schema(target) => self.check_value(child, target),
                PropertyMatch::Anything => {
                    if self.options.force_strict && branch_property(schema, name).is_none() {
                        self.report_prohibited(child.value_id(), name);
                    }
                }
                PropertyMatch::Prohibited => {
                    // A property declared only inside an if/then/else branch
                    // is still authorized, and checked against that branch.
                    match branch_property(schema, name) {
                        Some(target) => self.check_value(child, &target),
                        None => self.report_prohibited(child.value_id(), name),
                    }
                }
            }
        }
    }

    fn check_enum<N: AsValue>(&mut self, value: &N, schema: &SchemaNode) {
        let ci = self.options.case_insensitive_enums;
        if let Some(expected) = &schema.const_value {
            if !value_equals(value, expected, ci) {
                self.report(ValidationError::new(
                    value.value_id(),
                    format!("value should be {expected}"),
                    IssueData::NonEnumValue {
                        expected: vec![expected.clone()],
                    },
                    Priority::Medium,
                ));
            }
        }
        if let Some(allowed) = &schema.enum_values {
            if !allowed.iter().any(|v| value_equals(value, v, ci)) {
                self.report(ValidationError::new(
                    value.value_id(),
                    enum_message(allowed),
                    IssueData::NonEnumValue {
                        expected: allowed.clone(),
                    },
                    Priority::Medium,
                ));
            }
        }
    }

    /// Run `value` against `schema` in a scratch sub-checker and return its
    /// errors without committing them.
    fn trial<N: AsValue>(&self, value: &N, schema: &Arc<SchemaNode>) -> Vec<ValidationError> {
        let mut sub = Checker {
            document: self.document,
            provider: self.provider,
            options: self.options,
            errors: Vec::new(),
            claimed: FxHashSet::default(),
            active: self.active.clone(),
        };
        sub.check_value(value, schema);
        sub.errors
    }

    fn absorb(&mut self, errors: Vec<ValidationError>) {
        for error in errors {
            self.report(error);
        }
    }

    fn report(&mut self, error: ValidationError) {
        if self.claimed.insert(error.value) {
            self.errors.push(error);
        }
    }

    fn report_type_error<N: AsValue>(&mut self, value: &N, expected: types::Set, by_exclusion: bool) {
        let issue = if by_exclusion {
            IssueData::ProhibitedType { expected }
        } else {
            IssueData::TypeMismatch { expected }
        };
        self.report(ValidationError::new(
            value.value_id(),
            type_message(expected),
            issue,
            Priority::TypeMismatch,
        ));
    }

    fn report_prohibited(&mut self, id: ValueId, name: &str) {
        self.report(ValidationError::new(
            id,
            format!("property '{name}' is not allowed"),
            IssueData::ProhibitedProperty {
                name: name.to_string(),
            },
            Priority::Low,
        ));
    }

    /// Resolve a `$ref` against the document owning `from`, derived from its
    /// canonical URI. After a cross-document reference, a foreign schema's own
    /// refs resolve within the foreign document, not the query's root.
    fn resolve_reference(&self, from: &SchemaNode, reference: &str) -> Option<Arc<SchemaNode>> {
        let mut base = from.curi.clone();
        base.set_fragment(None);

        if base == self.document.url {
            return match self.document.resolve_ref(reference) {
                Some(RefTarget::Node(node)) => Some(node.clone()),
                Some(RefTarget::Unresolved) | None => {
                    self.provider.resolve_ref(self.document, reference)
                }
            };
        }
        let owner = self.provider.document(&base)?;
        match owner.resolve_ref(reference) {
            Some(RefTarget::Node(node)) => Some(node.clone()),
            Some(RefTarget::Unresolved) | None => self.provider.resolve_ref(&owner, reference),
        }
    }

    fn points_back(&self, not: &SchemaNode, containing: &SchemaNode) -> bool {
        let Some(reference) = &not.reference else {
            return false;
        };
        match self.resolve_reference(not, reference) {
            Some(node) => node.curi == containing.curi,
            None => reference.strip_prefix('#') == containing.curi.fragment(),
        }
    }
}

/// The severity bucket of one failed candidate: 0 is least wrong. Any
/// not-schema failure dominates; a pile of low failures weighs as medium.
fn severity(errors: &[ValidationError]) -> u8 {
    let mut worst = 0;
    let mut low = 0;
    for error in errors {
        let rank = match error.priority {
            Priority::Low => {
                low += 1;
                0
            }
            Priority::Medium => 1,
            Priority::MissingProps => 2,
            Priority::TypeMismatch => 3,
            Priority::NotSchema => return 4,
        };
        worst = worst.max(rank);
    }
    if worst == 0 && low > LOW_FAILURE_CAP {
        worst = 1;
    }
    worst
}

/// The types a concrete value can satisfy. Whole numbers are INTEGER, which
/// is a subset of "number". In formats whose strings aren't definitively
/// typed, numeric-looking text satisfies both string and number declarations.
fn observed_types<N: AsValue>(value: &N) -> types::Set {
    match value.kind() {
        Kind::Array(_) => types::ARRAY,
        Kind::Bool(_) => types::BOOLEAN,
        Kind::Null => types::NULL,
        Kind::Object(_) => types::OBJECT,
        Kind::PosInt(_) | Kind::NegInt(_) => types::INTEGER,
        Kind::Float(f) if f.fract() != 0.0 => types::FRACTIONAL,
        Kind::Float(_) => types::INTEGER,
        Kind::String(_) if value.strings_are_typed() => types::STRING,
        Kind::String(s) => match numeric_text(s) {
            Some(f) if f.fract() != 0.0 => types::STRING | types::FRACTIONAL,
            Some(_) => types::STRING | types::INTEGER,
            None => types::STRING,
        },
    }
}

fn numeric_text(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn type_message(expected: types::Set) -> String {
    if expected.is_empty() {
        "no type can match here".to_string()
    } else if expected.iter().count() == 1 {
        format!("incompatible types: required {expected}")
    } else {
        format!("incompatible types: required one of {expected}")
    }
}

fn enum_message(expected: &[serde_json::Value]) -> String {
    format!("value should be one of: {}", expected.iter().format(", "))
}

fn missing_message(missing: &[MissingProperty]) -> String {
    if missing.len() == 1 {
        format!("missing required property '{}'", missing[0].name)
    } else {
        format!(
            "missing required properties {}",
            missing.iter().map(|m| format!("'{}'", m.name)).format(", "),
        )
    }
}

/// A property name validated as a standalone string value against a
/// `propertyNames` schema, anchored at the property's value node.
struct NameValue {
    text: String,
    id: ValueId,
}

struct NameField<'a>(std::convert::Infallible, std::marker::PhantomData<&'a NameValue>);

impl<'a> Field<'a, NameValue> for NameField<'a> {
    fn property(&self) -> &'a str {
        match self.0 {}
    }
    fn value(&self) -> &'a NameValue {
        match self.0 {}
    }
}

impl Fields<NameValue> for () {
    type Field<'a> = NameField<'a>
    where
        Self: 'a,
        NameValue: 'a;
    type Iter<'a> = std::iter::Empty<NameField<'a>>
    where
        Self: 'a,
        NameValue: 'a;

    fn get(&self, _property: &str) -> Option<&NameValue> {
        None
    }
    fn len(&self) -> usize {
        0
    }
    fn iter(&self) -> Self::Iter<'_> {
        std::iter::empty()
    }
}

impl AsValue for NameValue {
    type Fields = ();

    fn kind(&self) -> Kind<'_, NameValue> {
        Kind::String(&self.text)
    }
    fn value_id(&self) -> ValueId {
        self.id
    }
    fn raw_text(&self) -> String {
        serde_json::Value::from(self.text.as_str()).to_string()
    }
}

fn default_for(schema: &SchemaNode, name: &str) -> Option<serde_json::Value> {
    let child = schema.properties.get(name)?;
    child.default.clone().or_else(|| child.const_value.clone())
}

/// The schema a property declared only within an if/then/else branch is
/// checked against.
fn branch_property(schema: &SchemaNode, name: &str) -> Option<Arc<SchemaNode>> {
    for group in &schema.if_then_else {
        let branches = [Some(&group.r#if), group.then.as_ref(), group.r#else.as_ref()];
        for branch in branches.into_iter().flatten() {
            if let Some(child) = branch.properties.get(name) {
                return Some(child.clone());
            }
        }
    }
    None
}

/// Structural equality of a concrete value against an enum/const value:
/// element-by-element, with 5 == 5.0, never serialized-text comparison.
fn value_equals<N: AsValue>(value: &N, expected: &serde_json::Value, case_insensitive: bool) -> bool {
    use serde_json::Value;
    match (value.kind(), expected) {
        (Kind::Null, Value::Null) => true,
        (Kind::Bool(l), Value::Bool(r)) => l == *r,
        (Kind::String(l), Value::String(r)) => {
            if case_insensitive {
                l.eq_ignore_ascii_case(r)
            } else {
                l == r
            }
        }
        (Kind::PosInt(l), Value::Number(r)) => Number::from(l) == Number::from(r),
        (Kind::NegInt(l), Value::Number(r)) => Number::from(l) == Number::from(r),
        (Kind::Float(l), Value::Number(r)) => Number::from(l) == Number::from(r),
        (Kind::Array(l), Value::Array(r)) => {
            l.len() == r.len()
                && l.iter()
                    .zip(r)
                    .all(|(lv, rv)| value_equals(lv, rv, case_insensitive))
        }
        (Kind::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && r.iter().all(|(k, rv)| match l.get(k) {
                    Some(lv) => value_equals(lv, rv, case_insensitive),
                    None => false,
                })
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::IssueKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn check(raw_schema: serde_json::Value, value: &serde_json::Value) -> Vec<ValidationError> {
        check_with(raw_schema, value, ComplianceOptions::default())
    }

    fn check_with(
        raw_schema: serde_json::Value,
        value: &serde_json::Value,
        options: ComplianceOptions,
    ) -> Vec<ValidationError> {
        let url = url::Url::parse("schema://fixture").unwrap();
        let doc = schema::read_schema(url, &raw_schema).unwrap();
        let root = doc.root.clone();
        let mut checker = Checker::new(&doc).with_options(options);
        checker.check_by_schema(value, &root);
        checker.into_errors()
    }

    fn messages(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.message.as_str()).collect()
    }

    #[test]
    fn type_mismatch() {
        let errors = check(json!({"type": "integer"}), &json!("nope"));
        assert_eq!(vec!["incompatible types: required integer"], messages(&errors));
        assert_eq!(Priority::TypeMismatch, errors[0].priority);
        assert_eq!(IssueKind::TypeMismatch, errors[0].kind());

        assert!(check(json!({"type": ["integer", "null"]}), &json!(null)).is_empty());
        // Whole floats are integers; 5.5 is not.
        assert!(check(json!({"type": "integer"}), &json!(5.0)).is_empty());
        assert_eq!(1, check(json!({"type": "integer"}), &json!(5.5)).len());
    }

    // A scalar of a format whose strings aren't definitively typed, as a
    // host syntax tree would expose one.
    struct Scalar(String);

    struct NoField<'a>(std::convert::Infallible, std::marker::PhantomData<&'a Scalar>);
    impl<'a> crate::Field<'a, Scalar> for NoField<'a> {
        fn property(&self) -> &'a str {
            match self.0 {}
        }
        fn value(&self) -> &'a Scalar {
            match self.0 {}
        }
    }
    impl crate::Fields<Scalar> for () {
        type Field<'a> = NoField<'a>
        where
            Self: 'a,
            Scalar: 'a;
        type Iter<'a> = std::iter::Empty<NoField<'a>>
        where
            Self: 'a,
            Scalar: 'a;

        fn get(&self, _property: &str) -> Option<&Scalar> {
            None
        }
        fn len(&self) -> usize {
            0
        }
        fn iter(&self) -> Self::Iter<'_> {
            std::iter::empty()
        }
    }
    impl AsValue for Scalar {
        type Fields = ();

        fn kind(&self) -> Kind<'_, Scalar> {
            Kind::String(&self.0)
        }
        fn value_id(&self) -> ValueId {
            ValueId(self as *const Scalar as usize)
        }
        fn raw_text(&self) -> String {
            self.0.clone()
        }
        fn strings_are_typed(&self) -> bool {
            false
        }
    }

    fn check_scalar(raw_schema: serde_json::Value, text: &str) -> Vec<ValidationError> {
        let url = url::Url::parse("schema://fixture").unwrap();
        let doc = schema::read_schema(url, &raw_schema).unwrap();
        let root = doc.root.clone();
        let mut checker = Checker::new(&doc);
        checker.check_by_schema(&Scalar(text.to_string()), &root);
        checker.into_errors()
    }

    #[test]
    fn untyped_scalars_coerce_when_string_is_not_declared() {
        let schema = json!({"type": "integer", "minimum": 0});
        assert!(check_scalar(schema.clone(), "5").is_empty());
        assert_eq!(
            vec!["less than a minimum 0"],
            messages(&check_scalar(schema.clone(), "-1")),
        );
        assert_eq!(
            vec!["incompatible types: required integer"],
            messages(&check_scalar(schema, "x")),
        );
        // Declared string: the text stays a string, no numeric checks.
        assert!(check_scalar(json!({"type": "string", "minimum": 10}), "5").is_empty());
    }

    #[test]
    fn typed_strings_never_coerce() {
        // JSON strings are definitively typed: "5" is only a string.
        let schema = json!({"oneOf": [{"type": "string"}, {"type": "number"}]});
        assert!(check(schema.clone(), &json!("5")).is_empty());
        assert!(check(schema, &json!(5)).is_empty());
        assert_eq!(
            vec!["incompatible types: required integer"],
            messages(&check(json!({"type": "integer"}), &json!("5"))),
        );
    }

    #[test]
    fn numeric_bounds_and_exclusivity_forms() {
        let errors = check(json!({"minimum": 0}), &json!(-1));
        assert_eq!(vec!["less than a minimum 0"], messages(&errors));
        assert_eq!(Priority::Low, errors[0].priority);

        // Legacy boolean-exclusive form.
        let legacy = json!({"minimum": 0, "exclusiveMinimum": true});
        assert_eq!(
            vec!["less than or equals to an exclusive minimum 0"],
            messages(&check(legacy.clone(), &json!(0))),
        );
        assert!(check(legacy, &json!(1)).is_empty());

        // Standalone numeric form.
        let modern = json!({"exclusiveMaximum": 10});
        assert_eq!(
            vec!["greater than or equals to an exclusive maximum 10"],
            messages(&check(modern.clone(), &json!(10))),
        );
        assert!(check(modern, &json!(9)).is_empty());
    }

    #[test]
    fn multiple_of_tolerates_float_noise() {
        let schema = json!({"multipleOf": 0.1});
        assert!(check(schema.clone(), &json!(0.3)).is_empty());
        assert_eq!(
            vec!["is not a multiple of 0.1"],
            messages(&check(schema, &json!(0.31))),
        );
    }

    #[test]
    fn string_constraints() {
        let schema = json!({"minLength": 2, "maxLength": 3, "pattern": "^a"});
        assert!(check(schema.clone(), &json!("ab")).is_empty());
        assert_eq!(
            vec!["shorter than a minimum length 2"],
            messages(&check(schema.clone(), &json!("a"))),
        );
        assert_eq!(
            vec!["does not match the pattern '^a'"],
            messages(&check(schema, &json!("ba"))),
        );

        // An uncompilable pattern reports distinctly, not as a mismatch.
        let broken = check(json!({"pattern": "["}), &json!("x"));
        assert!(broken[0].message.starts_with("cannot check the pattern '['"));
    }

    #[test]
    fn unique_items_flags_the_repeating_element() {
        let value = json!([1, 2, 1]);
        let errors = check(json!({"uniqueItems": true}), &value);
        assert_eq!(vec!["item is not unique"], messages(&errors));
        // The second occurrence is the one flagged.
        assert_eq!(value.as_array().unwrap()[2].value_id(), errors[0].value);

        // 1 and 1.0 differ textually.
        assert!(check(json!({"uniqueItems": true}), &json!([1, 1.0])).is_empty());
    }

    #[test]
    fn array_items_and_contains() {
        let value = json!(["a", 2]);
        let errors = check(json!({"items": {"type": "string"}}), &value);
        assert_eq!(vec!["incompatible types: required string"], messages(&errors));
        assert_eq!(value.as_array().unwrap()[1].value_id(), errors[0].value);

        let tuple = json!({
            "items": [{"type": "string"}],
            "additionalItems": false
        });
        assert_eq!(
            vec!["item is not allowed here"],
            messages(&check(tuple, &json!(["a", "b"]))),
        );

        assert_eq!(
            vec!["no item matches the 'contains' schema"],
            messages(&check(json!({"contains": {"type": "string"}}), &json!([1, 2]))),
        );
    }

    #[test]
    fn missing_required_properties_aggregate_into_one_error() {
        let schema = json!({
            "properties": {
                "a": {"type": "integer"},
                "b": {"type": "string", "default": "fallback"}
            },
            "required": ["a", "b"]
        });
        let errors = check(schema, &json!({}));
        assert_eq!(
            vec!["missing required properties 'b', 'a'"],
            messages(&errors),
        );
        match &errors[0].issue {
            IssueData::MissingProperty { properties } => {
                // Default-inferrable entries come first.
                assert_eq!("b", properties[0].name);
                assert_eq!(Some(json!("fallback")), properties[0].default);
                assert_eq!(None, properties[1].default);
            }
            other => panic!("unexpected issue {other:?}"),
        }
        assert_eq!(Priority::MissingProps, errors[0].priority);
    }

    #[test]
    fn prohibited_and_pattern_properties() {
        let schema = json!({
            "properties": {"known": {}},
            "patternProperties": {"^x-": {}},
            "additionalProperties": false
        });
        assert!(check(schema.clone(), &json!({"known": 1, "x-custom": 2})).is_empty());

        let value = json!({"other": 1});
        let errors = check(schema, &value);
        assert_eq!(vec!["property 'other' is not allowed"], messages(&errors));
        assert_eq!(value["other"].value_id(), errors[0].value);
        assert_eq!(IssueKind::ProhibitedProperty, errors[0].kind());
    }

    #[test]
    fn force_strict_prohibits_undeclared_properties() {
        let schema = json!({"properties": {"known": {}}});
        assert!(check(schema.clone(), &json!({"other": 1})).is_empty());

        let options = ComplianceOptions {
            force_strict: true,
            ..ComplianceOptions::default()
        };
        assert_eq!(
            vec!["property 'other' is not allowed"],
            messages(&check_with(schema, &json!({"other": 1}), options)),
        );
    }

    #[test]
    fn report_missing_optional_properties_option() {
        let schema = json!({"properties": {"opt": {"default": 3}}});
        assert!(check(schema.clone(), &json!({})).is_empty());

        let options = ComplianceOptions {
            report_missing_optional_properties: true,
            ..ComplianceOptions::default()
        };
        let errors = check_with(schema, &json!({}), options);
        assert_eq!(vec!["missing optional property 'opt'"], messages(&errors));
        assert_eq!(Priority::Low, errors[0].priority);
    }

    #[test]
    fn dependencies_both_shapes() {
        let schema = json!({
            "dependencies": {
                "credit": ["billing"],
                "shipping": {"required": ["address"]}
            }
        });
        assert!(check(schema.clone(), &json!({})).is_empty());
        assert_eq!(
            vec!["property 'credit' requires 'billing'"],
            messages(&check(schema.clone(), &json!({"credit": 1}))),
        );
        assert_eq!(
            vec!["missing required property 'address'"],
            messages(&check(schema, &json!({"shipping": 1}))),
        );
    }

    #[test]
    fn property_names_constraints() {
        let schema = json!({"propertyNames": {"pattern": "^[a-z]+$"}});
        assert!(check(schema.clone(), &json!({"ok": 1})).is_empty());

        let errors = check(schema, &json!({"Bad": 1}));
        assert_eq!(
            vec!["property name 'Bad' does not match the pattern '^[a-z]+$'"],
            messages(&errors),
        );
    }

    #[test]
    fn property_names_is_a_full_schema() {
        // Names are checked as string values, so any keyword applies.
        let schema = json!({"propertyNames": {"not": {"const": "banned"}}});
        assert!(check(schema.clone(), &json!({"ok": 1})).is_empty());
        assert_eq!(
            vec!["property name 'banned' validates against the 'not' schema"],
            messages(&check(schema, &json!({"banned": 1}))),
        );

        // A boolean false schema prohibits every name.
        let errors = check(json!({"propertyNames": false}), &json!({"any": 1}));
        assert_eq!(1, errors.len());
    }

    #[test]
    fn merged_exclusion_prohibits_every_value() {
        // A host may merge sibling declarations itself and hand the result to
        // check_by_schema; an empty type intersection prohibits every value,
        // including one matching the surviving declared type.
        let url = url::Url::parse("schema://fixture").unwrap();
        let doc = schema::read_schema(
            url,
            &json!({"definitions": {"s": {"type": "string"}, "n": {"type": "integer"}}}),
        )
        .unwrap();
        let s = doc.node_at("/definitions/s").unwrap();
        let n = doc.node_at("/definitions/n").unwrap();
        let merged = Arc::new(SchemaNode::merge(s, n));
        assert!(!merged.valid_by_exclusion);

        let mut checker = Checker::new(&doc);
        checker.check_by_schema(&json!(5), &merged);
        let errors = checker.into_errors();
        assert_eq!(
            vec!["incompatible types: required integer"],
            messages(&errors),
        );
        assert_eq!(IssueKind::ProhibitedType, errors[0].kind());
    }

    #[test]
    fn enum_and_const() {
        let schema = json!({"enum": ["red", "green"]});
        assert!(check(schema.clone(), &json!("red")).is_empty());
        let errors = check(schema.clone(), &json!("blue"));
        assert_eq!(
            vec![r#"value should be one of: "red", "green""#],
            messages(&errors),
        );
        assert_eq!(IssueKind::NonEnumValue, errors[0].kind());

        // Case-insensitive comparison is an option, off by default.
        assert_eq!(1, check(schema.clone(), &json!("RED")).len());
        let options = ComplianceOptions {
            case_insensitive_enums: true,
            ..ComplianceOptions::default()
        };
        assert!(check_with(schema, &json!("RED"), options).is_empty());

        // Structural, not textual: 5.0 equals the constant 5.
        assert!(check(json!({"const": 5}), &json!(5.0)).is_empty());
        assert!(check(json!({"const": {"a": [1]}}), &json!({"a": [1]})).is_empty());
        assert_eq!(1, check(json!({"const": 5}), &json!(6)).len());
    }

    #[test]
    fn not_schema() {
        let errors = check(json!({"not": {"type": "string"}}), &json!("s"));
        assert_eq!(vec!["validates against the 'not' schema"], messages(&errors));
        assert_eq!(Priority::NotSchema, errors[0].priority);

        assert!(check(json!({"not": {"type": "string"}}), &json!(5)).is_empty());

        // A self-referential `not` is unsatisfiable by construction: skipped.
        let schema = json!({
            "definitions": {"d": {"not": {"$ref": "#/definitions/d"}}},
            "$ref": "#/definitions/d"
        });
        assert!(check(schema, &json!(5)).is_empty());
    }

    #[test]
    fn if_then_else_branches() {
        let schema = json!({
            "if": {"properties": {"kind": {"const": "a"}}, "required": ["kind"]},
            "then": {"required": ["a_data"]},
            "else": {"required": ["b_data"]}
        });
        assert!(check(schema.clone(), &json!({"kind": "a", "a_data": 1})).is_empty());
        assert_eq!(
            vec!["missing required property 'a_data'"],
            messages(&check(schema.clone(), &json!({"kind": "a"}))),
        );
        assert_eq!(
            vec!["missing required property 'b_data'"],
            messages(&check(schema, &json!({"kind": "z"}))),
        );
    }

    #[test]
    fn branch_declared_properties_are_not_prohibited() {
        let schema = json!({
            "additionalProperties": false,
            "if": {"properties": {"mode": {"const": "x"}}},
            "then": {"properties": {"extra": {"type": "integer"}}}
        });
        // `extra` is authorized by the branch and checked against it.
        let errors = check(schema.clone(), &json!({"extra": "not-int"}));
        assert_eq!(vec!["incompatible types: required integer"], messages(&errors));
        assert!(check(schema, &json!({"extra": 3})).is_empty());
    }

    #[test]
    fn all_of_composes() {
        let schema = json!({
            "allOf": [
                {"required": ["a"]},
                {"properties": {"a": {"type": "integer"}}}
            ]
        });
        assert!(check(schema.clone(), &json!({"a": 1})).is_empty());
        assert_eq!(
            vec!["missing required property 'a'"],
            messages(&check(schema, &json!({}))),
        );
    }

    #[test]
    fn any_of_picks_the_least_wrong_failure() {
        let schema = json!({
            "anyOf": [
                {"type": "string"},
                {"type": "integer", "minimum": 10}
            ]
        });
        assert!(check(schema.clone(), &json!("s")).is_empty());
        assert!(check(schema.clone(), &json!(11)).is_empty());
        // 5 fails both, but the integer branch fails least: its bound error
        // wins over the type mismatch.
        assert_eq!(
            vec!["less than a minimum 10"],
            messages(&check(schema, &json!(5))),
        );
    }

    #[test]
    fn same_kind_failures_coalesce() {
        let schema = json!({
            "anyOf": [{"type": "string"}, {"type": "integer"}]
        });
        let errors = check(schema, &json!(true));
        assert_eq!(
            vec!["incompatible types: required one of integer, string"],
            messages(&errors),
        );

        let missing = json!({
            "oneOf": [{"required": ["a"]}, {"required": ["b"]}]
        });
        let errors = check(missing, &json!({}));
        assert_eq!(
            vec!["one of the following property sets is required: (a) or (b)"],
            messages(&errors),
        );
        assert_eq!(IssueKind::MissingOneOfProperty, errors[0].kind());
    }

    #[test]
    fn one_of_must_match_exactly_once() {
        let schema = json!({
            "oneOf": [
                {"type": "integer"},
                {"type": "number"}
            ]
        });
        assert!(check(schema.clone(), &json!(5.5)).is_empty());
        assert_eq!(
            vec!["validates to more than one variant"],
            messages(&check(schema, &json!(5))),
        );
    }

    #[test]
    fn duplicate_one_of_branches_are_not_ambiguous() {
        let schema = json!({
            "definitions": {"d": {"type": "integer"}},
            "oneOf": [
                {"$ref": "#/definitions/d"},
                {"$ref": "#/definitions/d"}
            ]
        });
        assert!(check(schema, &json!(5)).is_empty());
    }

    #[test]
    fn reference_chains_and_self_reference_terminate() {
        let schema = json!({
            "definitions": {
                "tree": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "kids": {"items": {"$ref": "#/definitions/tree"}}
                    }
                }
            },
            "$ref": "#/definitions/tree"
        });
        assert!(check(
            schema.clone(),
            &json!({"value": 1, "kids": [{"value": 2, "kids": []}]}),
        )
        .is_empty());

        let value = json!({"kids": [{"value": "bad"}]});
        let errors = check(schema, &value);
        assert_eq!(vec!["incompatible types: required integer"], messages(&errors));

        // A schema that is nothing but a reference to itself loops nowhere.
        assert!(check(json!({"$ref": "#"}), &json!({"free": "form"})).is_empty());
    }

    #[test]
    fn false_schema_matches_nothing() {
        let schema = json!({"properties": {"banned": false}});
        let errors = check(schema, &json!({"banned": 1}));
        assert_eq!(vec!["no value can match this schema"], messages(&errors));
        assert_eq!(Priority::NotSchema, errors[0].priority);
    }

    #[test]
    fn sibling_and_combinator_type_errors_report_once() {
        let schema = json!({
            "oneOf": [{"type": "string"}],
            "type": "number"
        });
        // The outer type check and the failed oneOf trial both target the
        // same node; only the first diagnostic lands.
        let errors = check(schema, &json!(true));
        assert_eq!(1, errors.len());
        assert_eq!(Priority::TypeMismatch, errors[0].priority);
    }

    #[test]
    fn first_write_wins_per_node() {
        // Both the bound and the enum fail; only the first check reports.
        let schema = json!({"minimum": 10, "enum": [20, 30]});
        let errors = check(schema, &json!(5));
        assert_eq!(1, errors.len());
        assert_eq!(vec!["less than a minimum 10"], messages(&errors));
    }
}
