use crate::specs::store::Document;

// DocStore is a store of documents.
pub trait DocStore: Send + Sync {
    // Put a Document into the store, replacing an existing entry.
    fn put(&mut self, doc: &Document<'_>);
    // Get a Document from the store by its key.
    fn get<'s>(&'s self, key: &str) -> Option<Document<'s>>;
    // Iterate over store Documents having the given prefix.
    fn iter_prefix<'s>(
        &'s self,
        prefix: &str,
    ) -> Box<dyn Iterator<Item = Document<'s>> + Send + Sync + 's>;
}

mod memory;
pub use memory::Store as MemoryStore;

mod service;
pub use service::build as build_service;

fn prefix_range_end(prefix: &[u8]) -> Option<Box<[u8]>> {
    // Find index of last byte that isn't 0xff (the "pivot").
    let pivot = prefix
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, &b)| b != 0xff)
        .next();

    // If found, return a slice through the pivot, which is incremented by one.
    match pivot {
        Some((ind, _)) => {
            let mut e = prefix[..ind + 1].to_owned();
            *e.last_mut().unwrap() += 1;
            Some(e.into_boxed_slice())
        }
        None => None,
    }
}
