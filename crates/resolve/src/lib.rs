//! Schema resolution: given a root schema and a pointer position, expand
//! composition keywords ($ref, allOf/anyOf/oneOf, if/then/else) into a
//! variants tree of candidate schemas, and flatten it into a match result of
//! unconditional candidates plus mutually-exclusive `oneOf` groups.

mod cancel;
mod match_result;
mod provider;
mod resolver;
mod tree;

pub use cancel::{Cancel, Error};
pub use match_result::MatchResult;
pub use provider::{NullProvider, SchemaProvider};
pub use resolver::Resolver;
pub use tree::{State, TreeBuilder, TreeNode, VariantsTree};
