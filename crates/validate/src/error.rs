use crate::value::ValueId;
use schema::types;
use serde_json::Value;

/// Priority ranks a diagnostic by how decisive its failure is. Ordering is
/// most-decisive first: when overlapping diagnostics conflict, only those at
/// the minimum rank survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub enum Priority {
    /// The value's type can never satisfy the schema.
    TypeMismatch,
    /// Required structure is absent but could be added.
    MissingProps,
    Medium,
    Low,
    /// Failure of a `not` schema. During least-wrong candidate selection this
    /// weighs heavier than every other bucket.
    NotSchema,
}

/// IssueKind tags the closed set of machine-readable issue shapes, so hosts
/// can key quick-fixes off the kind without inspecting payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    MissingProperty,
    MissingOneOfProperty,
    MissingAnyOfProperty,
    ProhibitedProperty,
    NonEnumValue,
    ProhibitedType,
    TypeMismatch,
    None,
}

/// One absent property together with its inferrable default, if any.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MissingProperty {
    pub name: String,
    pub default: Option<Value>,
}

/// IssueData is the structured payload of a ValidationError: everything a
/// host needs to offer a fix, beyond the human-readable message.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IssueData {
    /// Required properties are absent. Entries with an inferrable default
    /// sort first.
    MissingProperty { properties: Vec<MissingProperty> },
    /// Exactly one of these property sets must be added.
    MissingOneOfProperty { alternatives: Vec<Vec<MissingProperty>> },
    /// At least one of these property sets must be added.
    MissingAnyOfProperty { alternatives: Vec<Vec<MissingProperty>> },
    /// The named property is not allowed here.
    ProhibitedProperty { name: String },
    /// The value is not among the accepted enum/const values.
    NonEnumValue { expected: Vec<Value> },
    /// The value's type is excluded by a provably-unsatisfiable merge.
    ProhibitedType { expected: types::Set },
    /// The value's type doesn't overlap the declared types.
    TypeMismatch { expected: types::Set },
    /// No structured payload; the message stands alone.
    None,
}

impl IssueData {
    pub fn kind(&self) -> IssueKind {
        match self {
            IssueData::MissingProperty { .. } => IssueKind::MissingProperty,
            IssueData::MissingOneOfProperty { .. } => IssueKind::MissingOneOfProperty,
            IssueData::MissingAnyOfProperty { .. } => IssueKind::MissingAnyOfProperty,
            IssueData::ProhibitedProperty { .. } => IssueKind::ProhibitedProperty,
            IssueData::NonEnumValue { .. } => IssueKind::NonEnumValue,
            IssueData::ProhibitedType { .. } => IssueKind::ProhibitedType,
            IssueData::TypeMismatch { .. } => IssueKind::TypeMismatch,
            IssueData::None => IssueKind::None,
        }
    }
}

/// ValidationError is one diagnostic, anchored to a value node.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationError {
    pub value: ValueId,
    pub message: String,
    pub issue: IssueData,
    pub priority: Priority,
}

impl ValidationError {
    pub fn new(
        value: ValueId,
        message: impl Into<String>,
        issue: IssueData,
        priority: Priority,
    ) -> ValidationError {
        ValidationError {
            value,
            message: message.into(),
            issue,
            priority,
        }
    }

    pub fn kind(&self) -> IssueKind {
        self.issue.kind()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn priority_ranks_most_decisive_first() {
        assert!(Priority::TypeMismatch < Priority::MissingProps);
        assert!(Priority::MissingProps < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert!(Priority::Low < Priority::NotSchema);
    }
}
