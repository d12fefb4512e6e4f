//! The schema model and reader: immutable schema nodes keyed by canonical
//! URI, built leniently from a raw JSON-like tree, with intra-document `$ref`
//! targets stabilized up front.

mod node;
mod number;
mod pointer;
mod reader;

pub mod keywords;
pub mod types;

pub use node::{Additional, IfThenElse, Pattern, PropertyMatch, SchemaNode};
pub use number::Number;
pub use pointer::{Position, Step};
pub use reader::{read_schema, ReadError, RefTarget, SchemaDocument};
