use crate::tree::VariantsTree;
use fxhash::FxHashSet;
use schema::SchemaNode;
use std::collections::BTreeMap;
use std::sync::Arc;

/// MatchResult flattens a variants tree into the unconditionally-applicable
/// candidates plus the mutually-exclusive groups produced by `oneOf`
/// expansions. Immutable once produced.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub matches: Vec<Arc<SchemaNode>>,
    pub exclusive_groups: Vec<Vec<Arc<SchemaNode>>>,
}

impl MatchResult {
    /// Flatten by depth-first walk, discarding any/nothing/non-normal leaves
    /// and deduplicating candidates by canonical URI.
    pub fn create(tree: &VariantsTree) -> MatchResult {
        let mut matches = Vec::new();
        let mut groups: BTreeMap<usize, Vec<Arc<SchemaNode>>> = BTreeMap::new();
        let mut seen: FxHashSet<(Option<usize>, String)> = FxHashSet::default();

        for leaf in tree.leaves() {
            let Some(schema) = &leaf.schema else { continue };
            if !seen.insert((leaf.group, schema.curi.to_string())) {
                continue;
            }
            match leaf.group {
                None => matches.push(schema.clone()),
                Some(group) => groups.entry(group).or_default().push(schema.clone()),
            }
        }

        MatchResult {
            matches,
            exclusive_groups: groups.into_values().collect(),
        }
    }

    /// All candidates, losing exclusivity.
    pub fn all(&self) -> impl Iterator<Item = &Arc<SchemaNode>> {
        self.matches
            .iter()
            .chain(self.exclusive_groups.iter().flatten())
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty() && self.exclusive_groups.is_empty()
    }
}
