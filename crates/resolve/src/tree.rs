use crate::{Cancel, Error, SchemaProvider};
use fxhash::FxHashSet;
use schema::{types, Position, PropertyMatch, RefTarget, SchemaDocument, SchemaNode, Step};
use std::collections::VecDeque;
use std::sync::Arc;

/// State is the resolve-state of one tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Normal,
    /// Anything matches at this position: no schema constrains it.
    Any,
    /// A dead branch: the pointer step is impossible under this schema.
    Nothing,
    /// A `$ref` revisited within one query. Attached without re-expanding.
    CyclicRef,
    /// A `$ref` nothing could resolve. Treated as "anything matches".
    UnresolvedRef,
}

/// TreeNode is one candidate within a variants tree. Ephemeral: built fresh
/// per resolution query and discarded after flattening.
#[derive(Debug)]
pub struct TreeNode {
    pub parent: usize,
    pub schema: Option<Arc<SchemaNode>>,
    pub state: State,
    /// Exclusive-group number. Set only within `oneOf` expansions.
    pub group: Option<usize>,
    /// Number of pointer steps already consumed on this branch.
    pub depth: usize,
    pub children: Vec<usize>,
}

/// VariantsTree is an arena of TreeNodes, parent-linked by index.
#[derive(Debug)]
pub struct VariantsTree {
    pub nodes: Vec<TreeNode>,
    position: Position,
}

impl VariantsTree {
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Iterate candidate leaves: Normal-state leaf nodes carrying a schema.
    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes
            .iter()
            .filter(|node| node.children.is_empty() && node.state == State::Normal)
            .filter(|node| node.schema.is_some())
    }

    /// The schema of the nearest ancestor which sits one pointer step above
    /// the given node (the container's schema).
    pub fn parent_schema(&self, node: &TreeNode) -> Option<&Arc<SchemaNode>> {
        let mut at = node.parent;
        loop {
            let parent = &self.nodes[at];
            if parent.depth < node.depth {
                if let Some(schema) = &parent.schema {
                    return Some(schema);
                }
            }
            if at == parent.parent {
                return None; // Reached the root holder.
            }
            at = parent.parent;
        }
    }
}

/// TreeBuilder expands a root schema against a pointer position into a
/// VariantsTree, breadth-first.
pub struct TreeBuilder<'a, P: SchemaProvider> {
    pub document: &'a SchemaDocument,
    pub provider: &'a P,
    pub cancel: Cancel,
    /// When false, the final pointer step attaches the literal terminal
    /// schema without expanding its alternatives (documentation lookup).
    pub expand_last: bool,
}

impl<'a, P: SchemaProvider> TreeBuilder<'a, P> {
    pub fn build(&self, root: Arc<SchemaNode>, position: &Position) -> Result<VariantsTree, Error> {
        let mut tree = VariantsTree {
            nodes: vec![TreeNode {
                parent: 0,
                schema: None,
                state: State::Normal,
                group: None,
                depth: 0,
                children: Vec::new(),
            }],
            position: position.clone(),
        };

        let mut expansion = Expansion {
            builder: self,
            visited: FxHashSet::default(),
            next_group: 0,
            queue: VecDeque::new(),
        };

        let first = attach(&mut tree, 0, Some(root), State::Normal, None, 0);
        expansion.queue.push_back(first);

        while let Some(at) = expansion.queue.pop_front() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            expansion.process(&mut tree, at)?;
        }
        Ok(tree)
    }
}

struct Expansion<'b, 'a, P: SchemaProvider> {
    builder: &'b TreeBuilder<'a, P>,
    /// Per-query visited set of ($ref, depth), short-circuiting recursive
    /// schemas which make no pointer progress.
    visited: FxHashSet<(String, usize)>,
    next_group: usize,
    queue: VecDeque<usize>,
}

impl<'b, 'a, P: SchemaProvider> Expansion<'b, 'a, P> {
    fn process(&mut self, tree: &mut VariantsTree, at: usize) -> Result<(), Error> {
        let node = &tree.nodes[at];
        if node.state != State::Normal {
            return Ok(());
        }
        let schema = match &node.schema {
            Some(schema) => schema.clone(),
            None => return Ok(()),
        };
        let (depth, group) = (node.depth, node.group);
        let total = tree.position().0.len();

        // A merge may have proven this branch can never match.
        if schema.always == Some(false) || !schema.valid_by_exclusion {
            tree.nodes[at].state = State::Nothing;
            return Ok(());
        }

        let may_expand = depth < total || self.builder.expand_last;
        if schema.is_interesting() && may_expand {
            self.expand(tree, at, &schema, depth, group);
            return Ok(());
        }

        if depth == total {
            return Ok(()); // Terminal candidate.
        }

        if schema.always == Some(true) {
            tree.nodes[at].state = State::Any;
            return Ok(());
        }
        self.step(tree, at, &schema, depth, group);
        Ok(())
    }

    /// Apply one pointer step against a non-interesting candidate schema,
    /// yielding a child schema, an "anything matches" leaf, or a dead branch.
    fn step(
        &mut self,
        tree: &mut VariantsTree,
        at: usize,
        schema: &Arc<SchemaNode>,
        depth: usize,
        group: Option<usize>,
    ) {
        let step = tree.position().0[depth].clone();

        // The step's container type must be compatible with the declared
        // types, or the branch is dead without evaluating the step.
        let required = match &step {
            Step::Property(_) => types::OBJECT,
            Step::Index(_) => types::ARRAY | types::OBJECT,
        };
        if let Some(declared) = schema.types {
            if !declared.overlaps(required) {
                tree.nodes[at].state = State::Nothing;
                return;
            }
        }

        let outcome = match &step {
            Step::Property(name) => schema.property_schema(name),
            Step::Index(index) => schema.item_schema(*index),
        };
        match outcome {
            PropertyMatch::Schema(child) => {
                let child = child.clone();
                let attached = attach(tree, at, Some(child), State::Normal, group, depth + 1);
                self.queue.push_back(attached);
            }
            PropertyMatch::Prohibited => tree.nodes[at].state = State::Nothing,
            PropertyMatch::Anything => tree.nodes[at].state = State::Any,
        }
    }

    /// Expand one composition keyword of an interesting schema into sibling
    /// children. A child retaining further composition keywords is re-queued
    /// and expanded again.
    fn expand(
        &mut self,
        tree: &mut VariantsTree,
        at: usize,
        schema: &Arc<SchemaNode>,
        depth: usize,
        group: Option<usize>,
    ) {
        if schema.reference.is_some() {
            self.expand_ref(tree, at, schema, depth, group);
            return;
        }

        if let Some(all_of) = &schema.all_of {
            let base = Arc::new(strip(schema, Keyword::AllOf));
            for member in all_of {
                let merged = Arc::new(SchemaNode::merge(&base, member));
                let attached = attach(tree, at, Some(merged), State::Normal, group, depth);
                self.queue.push_back(attached);
            }
            return;
        }

        if let Some(one_of) = &schema.one_of {
            let exclusive = self.next_group;
            self.next_group += 1;

            let base = Arc::new(strip(schema, Keyword::OneOf));
            for member in one_of {
                let merged = Arc::new(SchemaNode::merge(&base, member));
                let attached =
                    attach(tree, at, Some(merged), State::Normal, Some(exclusive), depth);
                self.queue.push_back(attached);
            }
            return;
        }

        if let Some(any_of) = &schema.any_of {
            let base = Arc::new(strip(schema, Keyword::AnyOf));
            for member in any_of {
                let merged = Arc::new(SchemaNode::merge(&base, member));
                let attached = attach(tree, at, Some(merged), State::Normal, group, depth);
                self.queue.push_back(attached);
            }
            return;
        }

        // if/then/else: the branches are the alternatives.
        let base = Arc::new(strip(schema, Keyword::IfThenElse));
        let mut attached_any = false;
        for ite in &schema.if_then_else {
            for branch in [ite.then.as_ref(), ite.r#else.as_ref()].into_iter().flatten() {
                let merged = Arc::new(SchemaNode::merge(&base, branch));
                let attached = attach(tree, at, Some(merged), State::Normal, group, depth);
                self.queue.push_back(attached);
                attached_any = true;
            }
        }
        if !attached_any {
            let attached = attach(tree, at, Some(base), State::Normal, group, depth);
            self.queue.push_back(attached);
        }
    }

    fn expand_ref(
        &mut self,
        tree: &mut VariantsTree,
        at: usize,
        schema: &Arc<SchemaNode>,
        depth: usize,
        group: Option<usize>,
    ) {
        let reference = match schema.reference.clone() {
            Some(reference) => reference,
            None => return,
        };

        if !self.visited.insert((reference.clone(), depth)) {
            // Recursive schema revisited with no pointer progress: attach as
            // a single non-expanding child.
            attach(tree, at, Some(schema.clone()), State::CyclicRef, group, depth);
            return;
        }

        let target = match self.resolve(schema, &reference) {
            Some(target) => target,
            None => {
                tracing::warn!(%reference, document = %self.builder.document.url,
                    "unresolved schema $ref; treating as matching anything");
                attach(tree, at, None, State::UnresolvedRef, group, depth);
                return;
            }
        };

        // `$ref` with sibling keywords merges the target under the siblings.
        let siblings = strip(schema, Keyword::Ref);
        let child = if is_vacuous(&siblings) {
            target
        } else {
            Arc::new(SchemaNode::merge(&target, &Arc::new(siblings)))
        };
        let attached = attach(tree, at, Some(child), State::Normal, group, depth);
        self.queue.push_back(attached);
    }

    /// Resolve a `$ref` against the document owning `from`, derived from its
    /// canonical URI. Once a branch has crossed into another document, that
    /// document's own resolved table is the one consulted.
    fn resolve(&self, from: &SchemaNode, reference: &str) -> Option<Arc<SchemaNode>> {
        let builder = self.builder;
        let mut base = from.curi.clone();
        base.set_fragment(None);

        if base == builder.document.url {
            return match builder.document.resolve_ref(reference) {
                Some(RefTarget::Node(node)) => Some(node.clone()),
                _ => builder.provider.resolve_ref(builder.document, reference),
            };
        }
        let owner = builder.provider.document(&base)?;
        match owner.resolve_ref(reference) {
            Some(RefTarget::Node(node)) => Some(node.clone()),
            _ => builder.provider.resolve_ref(&owner, reference),
        }
    }
}

fn attach(
    tree: &mut VariantsTree,
    parent: usize,
    schema: Option<Arc<SchemaNode>>,
    state: State,
    group: Option<usize>,
    depth: usize,
) -> usize {
    let at = tree.nodes.len();
    tree.nodes.push(TreeNode {
        parent,
        schema,
        state,
        group,
        depth,
        children: Vec::new(),
    });
    tree.nodes[parent].children.push(at);
    at
}

enum Keyword {
    Ref,
    AllOf,
    AnyOf,
    OneOf,
    IfThenElse,
}

fn strip(schema: &Arc<SchemaNode>, keyword: Keyword) -> SchemaNode {
    let mut out = (**schema).clone();
    match keyword {
        Keyword::Ref => {
            out.reference = None;
            out.recursive_ref = false;
        }
        Keyword::AllOf => out.all_of = None,
        Keyword::AnyOf => out.any_of = None,
        Keyword::OneOf => out.one_of = None,
        Keyword::IfThenElse => out.if_then_else.clear(),
    }
    out
}

/// True if the node constrains nothing (metadata aside), so a `$ref` carrying
/// it as siblings may expand to its target directly.
fn is_vacuous(node: &SchemaNode) -> bool {
    node.always.is_none()
        && node.types.is_none()
        && node.enum_values.is_none()
        && node.const_value.is_none()
        && node.minimum.is_none()
        && node.maximum.is_none()
        && node.exclusive_minimum.is_none()
        && node.exclusive_maximum.is_none()
        && node.multiple_of.is_none()
        && node.min_length.is_none()
        && node.max_length.is_none()
        && node.pattern.is_none()
        && node.min_items.is_none()
        && node.max_items.is_none()
        && !node.unique_items
        && node.items.is_none()
        && node.tuple_items.is_none()
        && node.additional_items.is_none()
        && node.contains.is_none()
        && node.properties.is_empty()
        && node.pattern_properties.is_empty()
        && node.additional_properties.is_none()
        && node.property_names.is_none()
        && node.required.is_empty()
        && node.min_properties.is_none()
        && node.max_properties.is_none()
        && node.property_dependencies.is_empty()
        && node.schema_dependencies.is_empty()
        && node.all_of.is_none()
        && node.any_of.is_none()
        && node.one_of.is_none()
        && node.not.is_none()
        && node.if_then_else.is_empty()
        && node.reference.is_none()
}
