use schema::{RefTarget, SchemaDocument, SchemaNode};
use std::sync::Arc;

/// SchemaProvider is the capability through which `$ref` expansion reaches
/// other documents. It's invoked only at `$ref`-expansion boundaries; the
/// referencing document's own resolved table is always consulted first.
pub trait SchemaProvider {
    /// Fetch the parsed document for the given identity, if known.
    fn document(&self, url: &url::Url) -> Option<Arc<SchemaDocument>>;

    /// Resolve a `$ref` string from within `from` to a node of another
    /// document. The default chases the reference as an absolute-or-relative
    /// URL with an optional pointer fragment.
    fn resolve_ref(&self, from: &SchemaDocument, reference: &str) -> Option<Arc<SchemaNode>> {
        let target = from.url.join(reference).ok()?;

        let mut base = target.clone();
        base.set_fragment(None);
        let document = self.document(&base)?;

        match target.fragment() {
            None | Some("") => Some(document.root.clone()),
            Some(fragment) if fragment.starts_with('/') => document.node_at(fragment).cloned(),
            Some(fragment) => match document.resolve_ref(&format!("#{fragment}")) {
                Some(RefTarget::Node(node)) => Some(node.clone()),
                _ => None,
            },
        }
    }
}

/// NullProvider resolves nothing beyond the referencing document itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProvider;

impl SchemaProvider for NullProvider {
    fn document(&self, _url: &url::Url) -> Option<Arc<SchemaDocument>> {
        None
    }
}
